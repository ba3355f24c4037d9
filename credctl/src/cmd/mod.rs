//! Subcommands.

pub mod basic_auth_secret;

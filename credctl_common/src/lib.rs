//! Code shared between the `credctl` tools: resolving which kind of credential
//! a user asked for, building the matching Kubernetes secret, and handing it
//! to the cluster.

#![warn(missing_docs)]

pub mod errors;
pub mod kind;
pub mod kubernetes;
pub mod payload;
pub mod secret;
pub mod tracing_support;

/// Common imports used by many modules.
pub mod prelude {
    pub use anyhow::{format_err, Context as _};
    pub use serde::{Deserialize, Serialize};
    pub use std::{
        collections::BTreeMap,
        fmt,
        io::Write,
        path::{Path, PathBuf},
    };
    pub use tracing::{debug, error, info, trace, warn};

    pub use super::kind::{
        resolve, CredentialKind, ExplicitKind, KindSelection, RawConfig,
        ResolvedConfig, SecretTarget, ValidationError,
    };
    pub use super::payload::{build, CredentialPayload};
    pub use super::secret::Secret;
    pub use super::{Error, Result};
}

/// Error type for this crate's functions.
pub type Error = anyhow::Error;

/// Result type for this crate's functions.
pub type Result<T, E = Error> = std::result::Result<T, E>;

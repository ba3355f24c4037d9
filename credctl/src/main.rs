//! `credctl`: provision credential secrets on a Kubernetes cluster.

use credctl_common::{prelude::*, quick_main, tracing_support::initialize_tracing};
use structopt::StructOpt;

mod cmd;
mod table;

/// Command-line options, parsed using `structopt`.
///
/// Not `Debug`, because it holds passwords.
#[derive(StructOpt)]
#[structopt(about = "A tool for provisioning credential secrets on Kubernetes.")]
enum Opt {
    /// Basic auth secret commands.
    #[structopt(name = "basic-auth-secret")]
    BasicAuthSecret {
        #[structopt(subcommand)]
        cmd: cmd::basic_auth_secret::Opt,
    },
}

fn run() -> Result<()> {
    initialize_tracing();
    let opt = Opt::from_args();

    match opt {
        Opt::BasicAuthSecret { ref cmd } => cmd::basic_auth_secret::run(cmd),
    }
}

quick_main!(run);

//! The `basic-auth-secret` subcommand.

use credctl_common::Result;
use structopt::StructOpt;

mod create;

/// The `basic-auth-secret` subcommand.
#[derive(StructOpt)]
pub enum Opt {
    /// Create a basic auth secret.
    ///
    /// Use 'kubectl get secret -n <namespace>' to list secrets, and
    /// 'kubectl delete secret <name> -n <namespace>' to delete one.
    #[structopt(name = "create")]
    Create(create::Opt),
}

/// Run the `basic-auth-secret` subcommand.
pub fn run(opt: &Opt) -> Result<()> {
    match opt {
        Opt::Create(opt) => create::run(opt),
    }
}

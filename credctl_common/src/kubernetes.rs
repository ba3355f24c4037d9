//! Tools for talking to Kubernetes.

use serde::de::DeserializeOwned;
use std::{
    io,
    process::{Command, Stdio},
};

use crate::prelude::*;

/// Somewhere we can create secrets.
pub trait SecretSink {
    /// Create `secret`, returning the object as stored by the cluster.
    fn create(&self, secret: &Secret) -> Result<Secret>;
}

/// Talk to the cluster by running `kubectl`.
#[derive(Clone, Debug)]
pub struct Kubectl {
    /// The `kubectl` binary to run.
    program: PathBuf,
}

impl Kubectl {
    /// Run `program` instead of the `kubectl` in our `PATH`.
    pub fn new<P: Into<PathBuf>>(program: P) -> Kubectl {
        Kubectl {
            program: program.into(),
        }
    }

    /// Run `kubectl` with the specified input, capture output as JSON, and
    /// parse it using the specified type.
    pub fn run_with_input_parse_json<T: DeserializeOwned>(
        &self,
        args: &[&str],
        input: &str,
    ) -> Result<T> {
        trace!("running {:?} with {:?}", self.program, args);
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            // Pass `stderr` through on console instead of capturing.
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("error starting kubectl with {:?}", args))?;

        // Dropping `stdin` closes it, so `kubectl` sees the end of its input.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(input.as_bytes()),
            None => Err(io::Error::new(io::ErrorKind::Other, "kubectl stdin is missing")),
        };
        if let Err(err) = written {
            // Don't leave the child running (or unreaped) behind us.
            if let Err(kill_err) = child.kill() {
                trace!("could not kill kubectl: {}", kill_err);
            }
            if let Err(wait_err) = child.wait() {
                warn!("could not wait for kubectl: {}", wait_err);
            }
            return Err(err)
                .with_context(|| format!("error writing input to kubectl {:?}", args));
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("error running kubectl with {:?}", args))?;
        if !output.status.success() {
            return Err(format_err!(
                "error running kubectl with {:?} ({})",
                args,
                output.status,
            ));
        }
        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("error parsing output of kubectl {:?}", args))
    }
}

impl SecretSink for Kubectl {
    fn create(&self, secret: &Secret) -> Result<Secret> {
        debug!(
            name = secret.display_name(),
            secret_type = %secret.secret_type,
            "creating secret"
        );
        let manifest =
            serde_json::to_string(secret).context("error serializing secret")?;
        self.run_with_input_parse_json(&["create", "-f", "-", "-o", "json"], &manifest)
    }
}

#[cfg(unix)]
#[test]
fn parses_json_output() {
    // `cat` ignores our (empty) arguments and echoes its input back.
    let value: serde_json::Value = Kubectl::new("cat")
        .run_with_input_parse_json(&[], r#"{"kind": "Secret"}"#)
        .unwrap();
    assert_eq!(value["kind"], "Secret");
}

#[cfg(unix)]
#[test]
fn reports_failed_commands() {
    let err = Kubectl::new("false")
        .run_with_input_parse_json::<serde_json::Value>(&[], "")
        .unwrap_err();
    assert!(err.to_string().contains("error running kubectl"));
}

#[test]
fn reports_missing_binaries() {
    let err = Kubectl::new("/nonexistent/credctl-test/kubectl")
        .run_with_input_parse_json::<serde_json::Value>(&["version"], "")
        .unwrap_err();
    assert!(err.to_string().contains("error starting kubectl"));
}

#[cfg(unix)]
#[test]
fn reports_unparseable_output() {
    let err = Kubectl::new("cat")
        .run_with_input_parse_json::<serde_json::Value>(&[], "not json")
        .unwrap_err();
    assert!(err.to_string().contains("error parsing output"));
}

#[cfg(unix)]
#[test]
fn reaps_commands_which_ignore_input() {
    // `true` exits without reading, so writing a large input should fail
    // with a broken pipe. Either way, we must return rather than hang.
    let input = "x".repeat(4 << 20);
    let err = Kubectl::new("true")
        .run_with_input_parse_json::<serde_json::Value>(&[], &input)
        .unwrap_err();
    let message = err.to_string();
    assert!(
        message.contains("error writing input") || message.contains("error parsing output"),
        "unexpected error: {}",
        message,
    );
}

//! Error-handling code.

use std::{backtrace::BacktraceStatus, fmt};

use anyhow::Error;

use crate::kind::ValidationError;

/// Exit status for input we couldn't make sense of.
pub const EXIT_USAGE: i32 = 2;

/// Exit status for everything else.
pub const EXIT_FAILURE: i32 = 1;

/// Support for displaying an error with a complete list of causes, and an
/// optional backtrace.
pub trait DisplayCausesAndBacktraceExt {
    /// Display the error and its causes, plus a backtrace (if one was
    /// captured).
    fn display_causes_and_backtrace(&self) -> DisplayCauses<'_>;

    /// Display the error and its causes.
    fn display_causes_without_backtrace(&self) -> DisplayCauses<'_>;
}

impl DisplayCausesAndBacktraceExt for Error {
    fn display_causes_and_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: self,
            show_backtrace: true,
        }
    }

    fn display_causes_without_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: self,
            show_backtrace: false,
        }
    }
}

/// Helper type used to display errors.
pub struct DisplayCauses<'a> {
    /// The error to display.
    err: &'a Error,

    /// Should we show the backtrace?
    show_backtrace: bool,
}

impl fmt::Display for DisplayCauses<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.err)?;
        for cause in self.err.chain().skip(1) {
            writeln!(f, "  caused by: {}", cause)?;
        }

        let backtrace = self.err.backtrace();
        if self.show_backtrace && backtrace.status() == BacktraceStatus::Captured {
            write!(f, "{}", backtrace)?;
        }
        Ok(())
    }
}

/// How should we report `err` to the user, and with what exit status?
/// Validation errors are the user's to fix, so a backtrace would only be
/// noise.
pub fn report(err: &Error) -> (String, i32) {
    if err.downcast_ref::<ValidationError>().is_some() {
        (
            err.display_causes_without_backtrace().to_string(),
            EXIT_USAGE,
        )
    } else {
        (err.display_causes_and_backtrace().to_string(), EXIT_FAILURE)
    }
}

/// Generate a `main` function which calls the specified function. If the
/// function returns `Result::Err(_)`, then `main` will print the error and exit
/// with a non-zero status code.
#[macro_export]
macro_rules! quick_main {
    ($wrapped:ident) => {
        fn main() {
            if let Err(err) = $wrapped() {
                use ::std::io::Write;
                let (message, status) = $crate::errors::report(&err);
                let stderr = ::std::io::stderr();
                write!(&mut stderr.lock(), "{}", message)
                    .expect("Error occurred while trying to display error");
                ::std::process::exit(status);
            }
        }
    };
}

#[test]
fn displays_causes() {
    use anyhow::Context;

    let err = Err::<(), _>(ValidationError::MissingKind)
        .context("could not build secret")
        .unwrap_err();
    let (message, status) = report(&err);
    assert_eq!(status, EXIT_USAGE);
    assert!(message.starts_with("ERROR: could not build secret\n"));
    assert!(message.contains("  caused by: expected --type flag"));
}

#[test]
fn other_errors_are_failures() {
    let err = anyhow::format_err!("error running kubectl");
    let (message, status) = report(&err);
    assert_eq!(status, EXIT_FAILURE);
    assert!(message.starts_with("ERROR: error running kubectl\n"));
}

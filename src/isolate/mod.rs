//! Running one attempt where its death cannot take the harness down with it.
//!
//! [`Isolator`] is the seam between the sweep engine and whatever executes an
//! attempt. [`ProcessIsolator`] re-executes the harness binary; tests plug in
//! simulated checkers.

mod process;

pub use process::ProcessIsolator;

use serde::Serialize;

use crate::error::HarnessError;
use crate::outcome::Attempt;

/// How an isolated attempt ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Termination {
    /// True when the process exited non-zero or was killed by a signal.
    pub abnormal: bool,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    /// Everything the attempt wrote to stderr.
    pub diagnostic: String,
}

impl Termination {
    pub fn completed() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn exited(code: i32, diagnostic: impl Into<String>) -> Self {
        Self {
            abnormal: code != 0,
            exit_code: Some(code),
            signal: None,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn signaled(signal: i32, diagnostic: impl Into<String>) -> Self {
        Self {
            abnormal: true,
            exit_code: None,
            signal: Some(signal),
            diagnostic: diagnostic.into(),
        }
    }

    /// Human-readable status, e.g. `exit code 1` or `signal 6`.
    pub fn status(&self) -> String {
        match (self.exit_code, self.signal) {
            (_, Some(signal)) => format!("signal {signal}"),
            (Some(code), None) => format!("exit code {code}"),
            (None, None) => "unknown status".to_string(),
        }
    }
}

/// Executes attempts in isolation from the caller.
pub trait Isolator {
    /// Run `attempt` and report how it ended. `Err` means the attempt could
    /// not be run at all.
    fn invoke(&self, attempt: &Attempt) -> Result<Termination, HarnessError>;
}

impl<T: Isolator + ?Sized> Isolator for &T {
    fn invoke(&self, attempt: &Attempt) -> Result<Termination, HarnessError> {
        (**self).invoke(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_is_not_abnormal() {
        let t = Termination::completed();
        assert!(!t.abnormal);
        assert_eq!(t.status(), "exit code 0");
    }

    #[test]
    fn nonzero_exit_and_signals_are_abnormal() {
        assert!(Termination::exited(1, "").abnormal);
        assert!(!Termination::exited(0, "noise").abnormal);
        let killed = Termination::signaled(11, "");
        assert!(killed.abnormal);
        assert_eq!(killed.status(), "signal 11");
    }
}

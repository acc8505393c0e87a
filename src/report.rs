//! Per-scenario results.

use core::fmt;

use serde::Serialize;

use crate::error::{CaseFailure, HarnessError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
    /// Not applicable to this configuration (e.g. width above the limit).
    Skipped,
    /// Manual demonstration, never run automatically.
    Disabled,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Status::Passed => "PASS",
            Status::Failed => "FAIL",
            Status::Skipped => "SKIP",
            Status::Disabled => "DISABLED",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub kind: &'static str,
    pub message: String,
    /// Present when the checker itself got an attempt wrong.
    pub case: Option<CaseFailure>,
}

impl From<&HarnessError> for FailureReport {
    fn from(err: &HarnessError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            case: err.case().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub status: Status,
    /// Attempts executed before the scenario finished or failed.
    pub attempts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReport>,
}

impl ScenarioReport {
    pub fn passed(name: &'static str, attempts: usize) -> Self {
        Self {
            name,
            status: Status::Passed,
            attempts,
            reason: None,
            failure: None,
        }
    }

    pub fn failed(name: &'static str, attempts: usize, err: &HarnessError) -> Self {
        Self {
            name,
            status: Status::Failed,
            attempts,
            reason: None,
            failure: Some(FailureReport::from(err)),
        }
    }

    pub fn not_run(name: &'static str, status: Status, reason: impl Into<String>) -> Self {
        Self {
            name,
            status,
            attempts: 0,
            reason: Some(reason.into()),
            failure: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == Status::Failed
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>8}] {} ({} attempts)", self.status, self.name, self.attempts)?;
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        if let Some(failure) = &self.failure {
            write!(f, "\n           {}", failure.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Width;
    use crate::outcome::Attempt;

    #[test]
    fn failed_report_keeps_error_context() {
        let err = HarnessError::Setup {
            attempt: Attempt::new(64, 0, Width::One),
            detail: "allocation failed".into(),
        };
        let report = ScenarioReport::failed("oob_char", 3, &err);
        assert!(report.is_failure());
        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.kind, "setup");
        assert!(failure.case.is_none());
        assert!(report.to_string().contains("setup failure at (size=64, offset=0, width=1)"));
    }

    #[test]
    fn status_column_is_right_aligned() {
        assert_eq!(format!("{:>8}", Status::Passed), "    PASS");
        assert_eq!(format!("{:>8}", Status::Disabled), "DISABLED");
        assert_eq!(
            ScenarioReport::passed("oob_char", 68).to_string(),
            "[    PASS] oob_char (68 attempts)"
        );
    }

    #[test]
    fn json_omits_empty_fields() {
        let json = serde_json::to_value(ScenarioReport::passed("oob_int", 68)).unwrap();
        assert_eq!(json["status"], "passed");
        assert_eq!(json["attempts"], 68);
        assert!(json.get("failure").is_none());
        assert!(json.get("reason").is_none());
    }
}

//! Harness error types.
//!
//! A scenario stops at its first error. Errors never cross scenario
//! boundaries: the runner records them and moves on.

use core::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::outcome::{Attempt, Expected};

/// Lines of a diagnostic worth keeping in a failure report.
const EXCERPT_KEYWORDS: [&str; 5] = ["ERROR", "is located", "SEGV", "panicked", "overrun-harness"];
const EXCERPT_FALLBACK_LINES: usize = 3;

/// What actually happened when an attempt ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observed {
    /// The process finished normally.
    Completed,
    /// The process died. `diagnostic` is an excerpt of its stderr.
    Crashed { status: String, diagnostic: String },
}

impl Observed {
    pub fn crashed(status: impl Into<String>, diagnostic: &str) -> Self {
        Observed::Crashed {
            status: status.into(),
            diagnostic: excerpt(diagnostic),
        }
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Completed => f.write_str("completed normally"),
            Observed::Crashed { status, diagnostic } if diagnostic.is_empty() => {
                write!(f, "crashed ({status}) with no diagnostic")
            }
            Observed::Crashed { status, diagnostic } => {
                write!(f, "crashed ({status}): {diagnostic}")
            }
        }
    }
}

/// A single attempt whose outcome disagreed with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseFailure {
    pub attempt: Attempt,
    pub expected: Expected,
    pub observed: Observed,
    /// Diagnostic regex the crash had to match, for violations.
    pub pattern: Option<String>,
}

impl fmt::Display for CaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, {}",
            self.attempt, self.expected, self.observed
        )?;
        if let Some(pattern) = &self.pattern {
            write!(f, " (wanted /{pattern}/)")?;
        }
        Ok(())
    }
}

/// Errors raised while running a scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("checker mismatch at {0}")]
    Mismatch(Box<CaseFailure>),

    #[error("harness precondition violated at {attempt}: {detail}")]
    Precondition { attempt: Attempt, detail: String },

    #[error("setup failure at {attempt}: {detail}")]
    Setup { attempt: Attempt, detail: String },

    #[error("failed to launch probe {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid diagnostic pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
}

impl HarnessError {
    /// Short machine-readable category used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mismatch(_) => "mismatch",
            Self::Precondition { .. } => "precondition",
            Self::Setup { .. } => "setup",
            Self::Spawn { .. } => "spawn",
            Self::Pattern(_) => "pattern",
            Self::UnknownScenario(_) => "unknown_scenario",
        }
    }

    /// True when the checker itself misbehaved, as opposed to the harness or
    /// its environment.
    pub fn is_checker_failure(&self) -> bool {
        matches!(self, Self::Mismatch(_))
    }

    pub fn case(&self) -> Option<&CaseFailure> {
        match self {
            Self::Mismatch(case) => Some(case),
            _ => None,
        }
    }
}

/// Keep the lines of a diagnostic that identify the report.
pub fn excerpt(diagnostic: &str) -> String {
    let lines: Vec<&str> = diagnostic
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let keyed: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| EXCERPT_KEYWORDS.iter().any(|k| line.contains(k)))
        .collect();
    if keyed.is_empty() {
        lines
            .into_iter()
            .take(EXCERPT_FALLBACK_LINES)
            .collect::<Vec<_>>()
            .join(" | ")
    } else {
        keyed.join(" | ")
    }
}

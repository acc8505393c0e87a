//! Expected diagnostic text for an out-of-bounds report.

use core::fmt;

use regex::Regex;

use crate::outcome::{Direction, Expected};

/// Generic fault indicator accepted in place of a precise right-side report.
/// Some overruns past the end land on an unmapped page and the checker only
/// sees the raw fault.
#[cfg(not(windows))]
pub const FAULT_ALTERNATIVE: Option<&str> = Some("SEGV");
#[cfg(windows)]
pub const FAULT_ALTERNATIVE: Option<&str> = None;

/// Regex a checker diagnostic must match to count as the expected report.
#[derive(Debug, Clone)]
pub struct DiagnosticPattern {
    regex: Regex,
}

impl DiagnosticPattern {
    /// Build the pattern for an access `distance` bytes on the `direction`
    /// side of a valid region.
    ///
    /// The distance must be the first number after "is located", so a
    /// distance of 1 never matches a report of 11 bytes.
    pub fn build(direction: Direction, distance: usize) -> Result<Self, regex::Error> {
        let located = format!("is located[^0-9]*\\b{distance} bytes?\\b.*{direction}");
        let source = match (direction, FAULT_ALTERNATIVE) {
            (Direction::After, Some(fault)) => format!("{located}|{fault}"),
            _ => located,
        };
        Ok(Self {
            regex: Regex::new(&source)?,
        })
    }

    /// Pattern accepting any diagnostic that contains `text` literally.
    pub fn mentions(text: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(&regex::escape(text))?,
        })
    }

    /// Pattern for a violation, or `None` for a safe access.
    pub fn for_expected(expected: Expected) -> Result<Option<Self>, regex::Error> {
        match expected {
            Expected::Safe => Ok(None),
            Expected::Violation {
                direction,
                distance,
            } => Self::build(direction, distance).map(Some),
        }
    }

    pub fn is_match(&self, diagnostic: &str) -> bool {
        self.regex.is_match(diagnostic)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Display for DiagnosticPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

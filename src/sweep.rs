//! Boundary sweep: every offset around the left edge, the interior and the
//! right edge of small allocations, plus the two edges of a large one.

use serde::Serialize;
use tracing::{debug, warn};

use crate::access::{PRECONDITION_MARKER, Width};
use crate::error::{CaseFailure, HarnessError, Observed, excerpt};
use crate::isolate::{Isolator, Termination};
use crate::outcome::{Attempt, Expected};
use crate::pattern::DiagnosticPattern;
use crate::probe::{EXIT_SETUP_FAILURE, SETUP_MARKER};

/// Offsets `-LEFT_REACH..0` are probed before every small allocation.
pub const LEFT_REACH: isize = 5;

/// Small allocation sizes start at the width and grow by `SIZE_STEP`
/// while below `SIZE_LIMIT`.
pub const SIZE_STEP: usize = 5;
pub const SIZE_LIMIT: usize = 20;

/// Default size of the allocation whose edges are probed at the end of a sweep.
pub const DEFAULT_LARGE_MALLOC: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Left,
    Interior,
    Right,
    Large,
}

/// One planned attempt and the zone it was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Case {
    pub zone: Zone,
    pub attempt: Attempt,
    pub expected: Expected,
}

impl Case {
    fn new(zone: Zone, attempt: Attempt) -> Self {
        Self {
            zone,
            attempt,
            expected: attempt.expected(),
        }
    }
}

/// Enumerate the sweep for `width`, in execution order.
///
/// Right-zone offsets that are not a multiple of the width are skipped:
/// partially overlapping unaligned accesses are not required to be caught.
pub fn plan(width: Width, large_size: usize) -> Vec<Case> {
    let w = width.bytes();
    let mut cases = Vec::new();

    for size in (w..SIZE_LIMIT).step_by(SIZE_STEP) {
        let size_i = size as isize;
        let w_i = w as isize;

        for offset in -LEFT_REACH..0 {
            cases.push(Case::new(Zone::Left, Attempt::new(size, offset, width)));
        }
        for offset in 0..=size_i - w_i {
            cases.push(Case::new(Zone::Interior, Attempt::new(size, offset, width)));
        }
        for offset in (size_i - w_i + 1)..=(size_i + 2 * w_i) {
            if offset % w_i != 0 {
                continue;
            }
            cases.push(Case::new(Zone::Right, Attempt::new(size, offset, width)));
        }
    }

    cases.push(Case::new(Zone::Large, Attempt::new(large_size, -1, width)));
    cases.push(Case::new(
        Zone::Large,
        Attempt::new(large_size, large_size as isize, width),
    ));
    cases
}

/// Compare an isolated attempt's ending with what it should have been.
pub fn verify(
    attempt: &Attempt,
    expected: Expected,
    termination: &Termination,
) -> Result<(), HarnessError> {
    let pattern = DiagnosticPattern::for_expected(expected)?;
    verify_against(attempt, expected, pattern.as_ref(), termination)
}

/// Like [`verify`], with the diagnostic pattern supplied by the caller.
/// `None` means the attempt must complete.
pub fn verify_against(
    attempt: &Attempt,
    expected: Expected,
    pattern: Option<&DiagnosticPattern>,
    termination: &Termination,
) -> Result<(), HarnessError> {
    if termination.diagnostic.contains(PRECONDITION_MARKER) {
        return Err(HarnessError::Precondition {
            attempt: *attempt,
            detail: excerpt(&termination.diagnostic),
        });
    }
    if termination.exit_code == Some(EXIT_SETUP_FAILURE)
        || termination.diagnostic.contains(SETUP_MARKER)
    {
        return Err(HarnessError::Setup {
            attempt: *attempt,
            detail: excerpt(&termination.diagnostic),
        });
    }

    let observed = if termination.abnormal {
        Observed::crashed(termination.status(), &termination.diagnostic)
    } else {
        Observed::Completed
    };

    let agrees = match (pattern, termination.abnormal) {
        (None, abnormal) => !abnormal,
        (Some(_), false) => false,
        (Some(pattern), true) => pattern.is_match(&termination.diagnostic),
    };
    if agrees {
        return Ok(());
    }

    Err(HarnessError::Mismatch(Box::new(CaseFailure {
        attempt: *attempt,
        expected,
        observed,
        pattern: pattern.map(|p| p.as_str().to_string()),
    })))
}

/// Drives attempts through an [`Isolator`] and stops at the first mismatch.
pub struct Sweeper<'a> {
    isolator: &'a dyn Isolator,
    attempts: usize,
}

impl<'a> Sweeper<'a> {
    pub fn new(isolator: &'a dyn Isolator) -> Self {
        Self {
            isolator,
            attempts: 0,
        }
    }

    /// Attempts executed so far, including a failing one.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Run `attempt` and check it against its own classification.
    pub fn check(&mut self, attempt: Attempt) -> Result<(), HarnessError> {
        self.check_expected(attempt, attempt.expected())
    }

    pub fn check_expected(
        &mut self,
        attempt: Attempt,
        expected: Expected,
    ) -> Result<(), HarnessError> {
        let pattern = DiagnosticPattern::for_expected(expected)?;
        self.check_against(attempt, expected, pattern.as_ref())
    }

    /// Run an out-of-bounds `attempt` whose report only has to match `pattern`.
    pub fn check_reported(
        &mut self,
        attempt: Attempt,
        pattern: &DiagnosticPattern,
    ) -> Result<(), HarnessError> {
        self.check_against(attempt, attempt.expected(), Some(pattern))
    }

    fn check_against(
        &mut self,
        attempt: Attempt,
        expected: Expected,
        pattern: Option<&DiagnosticPattern>,
    ) -> Result<(), HarnessError> {
        self.attempts += 1;
        let termination = self.isolator.invoke(&attempt)?;
        debug!(
            %attempt,
            %expected,
            status = %termination.status(),
            abnormal = termination.abnormal,
            "attempt finished"
        );
        verify_against(&attempt, expected, pattern, &termination).inspect_err(|err| {
            warn!(%attempt, kind = err.kind(), error = %err, "attempt failed");
        })
    }

    pub fn run_plan(&mut self, cases: &[Case]) -> Result<(), HarnessError> {
        for case in cases {
            self.check_expected(case.attempt, case.expected)?;
        }
        Ok(())
    }

    /// Full boundary sweep for one width.
    pub fn sweep(&mut self, width: Width, large_size: usize) -> Result<(), HarnessError> {
        self.run_plan(&plan(width, large_size))
    }
}

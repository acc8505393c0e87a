//! The child side of a death test: perform exactly one access attempt.
//!
//! The parent re-executes the harness binary as
//! `overrun-harness probe WIDTH SIZE OFFSET [--aligned]`. The child allocates,
//! writes once, releases and exits 0, unless the checker kills it first.

use thiserror::Error;

use crate::access::{self, Width};
use crate::alloc_chain::Allocation;
use crate::outcome::{Alignment, Attempt};

/// Subcommand that runs a single attempt.
pub const SUBCOMMAND: &str = "probe";

/// Flag selecting [`Alignment::Required`].
pub const ALIGNED_FLAG: &str = "--aligned";

/// Exit status reported when the allocation itself fails.
pub const EXIT_SETUP_FAILURE: i32 = 70;

/// Exit status reported for malformed probe arguments.
pub const EXIT_USAGE: i32 = 64;

/// Prefix of the message printed before exiting with [`EXIT_SETUP_FAILURE`].
pub const SETUP_MARKER: &str = "overrun-harness: setup failure";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("usage: probe WIDTH SIZE OFFSET [--aligned]: {0}")]
    Usage(String),

    #[error("overrun-harness: setup failure: allocation of {size} bytes failed")]
    Setup { size: usize },
}

impl ProbeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ProbeError::Usage(_) => EXIT_USAGE,
            ProbeError::Setup { .. } => EXIT_SETUP_FAILURE,
        }
    }
}

/// Command-line arguments that make the harness binary run `attempt`.
pub fn to_args(attempt: &Attempt) -> Vec<String> {
    let mut args = vec![
        SUBCOMMAND.to_string(),
        attempt.width.bytes().to_string(),
        attempt.size.to_string(),
        attempt.offset.to_string(),
    ];
    if attempt.alignment == Alignment::Required {
        args.push(ALIGNED_FLAG.to_string());
    }
    args
}

/// Parse the arguments following the subcommand name.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Attempt, ProbeError> {
    let mut positional = Vec::with_capacity(3);
    let mut alignment = Alignment::Relaxed;
    for arg in args.iter().map(AsRef::as_ref) {
        if arg == ALIGNED_FLAG {
            alignment = Alignment::Required;
        } else {
            positional.push(arg);
        }
    }
    let [width, size, offset] = positional.as_slice() else {
        return Err(ProbeError::Usage(format!(
            "expected 3 positional arguments, got {}",
            positional.len()
        )));
    };

    let width = width
        .parse::<usize>()
        .ok()
        .and_then(Width::from_bytes)
        .ok_or_else(|| ProbeError::Usage(format!("invalid width {width:?}")))?;
    let size = size
        .parse::<usize>()
        .map_err(|e| ProbeError::Usage(format!("invalid size {size:?}: {e}")))?;
    let offset = offset
        .parse::<isize>()
        .map_err(|e| ProbeError::Usage(format!("invalid offset {offset:?}: {e}")))?;

    Ok(Attempt {
        size,
        offset,
        width,
        alignment,
    })
}

/// Run `attempt` in the current process.
///
/// Out-of-bounds attempts are expected never to return: the checker
/// terminates the process during the write.
pub fn execute(attempt: &Attempt) -> Result<(), ProbeError> {
    let block = Allocation::new(attempt.size).ok_or(ProbeError::Setup { size: attempt.size })?;
    let target = block.at(attempt.offset);
    // SAFETY: the target may lie outside the block on purpose. This runs in
    // a process dedicated to the attempt, and reporting the stray write is the
    // checker's job.
    unsafe {
        match attempt.alignment {
            Alignment::Required => access::write_sized_aligned(target, attempt.width),
            Alignment::Relaxed => access::write_sized(target, attempt.width),
        }
    }
    drop(block);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_round_trip_negative_offsets() {
        let attempt = Attempt::aligned(16, -5, Width::Eight);
        let args = to_args(&attempt);
        assert_eq!(args, vec!["probe", "8", "16", "-5", "--aligned"]);
        assert_eq!(parse_args(&args[1..]).unwrap(), attempt);
    }

    #[test]
    fn relaxed_attempt_has_no_flag() {
        let args = to_args(&Attempt::new(10, 3, Width::One));
        assert_eq!(args, vec!["probe", "1", "10", "3"]);
    }

    #[test]
    fn rejects_unsupported_width() {
        let err = parse_args(&["3", "10", "0"]).unwrap_err();
        assert!(matches!(err, ProbeError::Usage(_)));
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn rejects_missing_arguments() {
        assert!(parse_args(&["4", "10"]).is_err());
        assert!(parse_args(&["4", "10", "x"]).is_err());
    }

    #[test]
    fn in_bounds_attempts_complete() {
        for width in Width::ALL {
            for offset in 0..=(16 - width.bytes()) as isize {
                execute(&Attempt::new(16, offset, width)).unwrap();
            }
            execute(&Attempt::aligned(16, 0, width)).unwrap();
        }
    }

    #[test]
    fn setup_failure_has_its_own_exit_code() {
        let err = ProbeError::Setup { size: 1 };
        assert_eq!(err.exit_code(), EXIT_SETUP_FAILURE);
        assert!(err.to_string().starts_with(SETUP_MARKER));
    }
}

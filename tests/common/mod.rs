//! Simulated checkers for driving the catalog without a real sanitizer build.

#![allow(dead_code)]

use std::cell::RefCell;

use overrun_harness::{Alignment, Attempt, Direction, Expected, HarnessError, Isolator, Termination};

const BASE: usize = 0x6020_0000_0010;

fn asan_report(attempt: &Attempt, direction: Direction, distance: usize) -> String {
    let addr = (BASE as isize + attempt.offset) as usize;
    format!(
        "=================================================================\n\
         ==4242==ERROR: AddressSanitizer: heap-buffer-overflow on address {addr:#x}\n\
         WRITE of size {width} at {addr:#x} thread T0\n\
         \x20   #0 0x55d1 in overrun_harness::access::write_aligned\n\
         \n\
         {addr:#x} is located {distance} bytes {direction} {size}-byte region [{BASE:#x},{end:#x})\n\
         allocated by thread T0 here:\n\
         \x20   #0 0x55d2 in malloc\n",
        width = attempt.width.bytes(),
        size = attempt.size,
        end = BASE + attempt.size,
    )
}

fn precondition_violated(attempt: &Attempt) -> bool {
    attempt.alignment == Alignment::Required
        && attempt.offset.rem_euclid(attempt.width.bytes() as isize) != 0
}

/// Behaves like a correct checker: kills exactly the out-of-bounds attempts
/// and reports them the way AddressSanitizer does.
#[derive(Default)]
pub struct SimulatedChecker {
    pub seen: RefCell<Vec<Attempt>>,
}

impl Isolator for SimulatedChecker {
    fn invoke(&self, attempt: &Attempt) -> Result<Termination, HarnessError> {
        self.seen.borrow_mut().push(*attempt);
        if precondition_violated(attempt) {
            return Ok(Termination::signaled(
                6,
                "thread 'main' panicked at src/access.rs:73:5:\n\
                 overrun-harness: precondition violated: misaligned",
            ));
        }
        Ok(match attempt.expected() {
            Expected::Safe => Termination::completed(),
            Expected::Violation {
                direction,
                distance,
            } => Termination::exited(1, asan_report(attempt, direction, distance)),
        })
    }
}

/// Never notices anything.
pub struct BlindChecker;

impl Isolator for BlindChecker {
    fn invoke(&self, _attempt: &Attempt) -> Result<Termination, HarnessError> {
        Ok(Termination::completed())
    }
}

/// Reports right-side overruns one byte further than they are.
pub struct OffByOneChecker;

impl Isolator for OffByOneChecker {
    fn invoke(&self, attempt: &Attempt) -> Result<Termination, HarnessError> {
        Ok(match attempt.expected() {
            Expected::Safe => Termination::completed(),
            Expected::Violation {
                direction: Direction::After,
                distance,
            } => Termination::exited(1, asan_report(attempt, Direction::After, distance + 1)),
            Expected::Violation {
                direction,
                distance,
            } => Termination::exited(1, asan_report(attempt, direction, distance)),
        })
    }
}

/// Flags every access to the last byte of a block, valid or not.
pub struct OverEagerChecker;

impl Isolator for OverEagerChecker {
    fn invoke(&self, attempt: &Attempt) -> Result<Termination, HarnessError> {
        let last = attempt.size as isize - 1;
        let end = attempt.offset + attempt.width.bytes() as isize - 1;
        if attempt.expected().is_safe() && end == last {
            return Ok(Termination::exited(
                1,
                asan_report(attempt, Direction::After, 0),
            ));
        }
        SimulatedChecker::default().invoke(attempt)
    }
}

/// Only ever sees raw faults on the right side, as when the overrun hits an
/// unmapped page.
pub struct FaultOnlyChecker;

impl Isolator for FaultOnlyChecker {
    fn invoke(&self, attempt: &Attempt) -> Result<Termination, HarnessError> {
        match attempt.expected() {
            Expected::Violation {
                direction: Direction::After,
                ..
            } => Ok(Termination::signaled(
                11,
                "==4242==ERROR: AddressSanitizer: SEGV on unknown address 0x7f0000000000",
            )),
            _ => SimulatedChecker::default().invoke(attempt),
        }
    }
}

/// Reports every violation the way HWAddressSanitizer does: a tag mismatch
/// with no byte distance.
pub struct HwasanChecker;

impl Isolator for HwasanChecker {
    fn invoke(&self, attempt: &Attempt) -> Result<Termination, HarnessError> {
        if attempt.expected().is_safe() {
            return Ok(Termination::completed());
        }
        let addr = (BASE as isize + attempt.offset) as usize;
        Ok(Termination::signaled(
            6,
            format!(
                "==3107==ERROR: HWAddressSanitizer: tag-mismatch on address {addr:#x} at pc 0x5555\n\
                 WRITE of size {} at {addr:#x} tags: 2e/08 (ptr/mem) in thread T0\n",
                attempt.width.bytes()
            ),
        ))
    }
}

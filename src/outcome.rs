//! Access attempts and the outcome the checker must produce for each.

use core::fmt;

use serde::Serialize;

use crate::access::Width;

/// Side of the allocation an out-of-bounds access lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Before,
    After,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Before => "before",
            Direction::After => "after",
        })
    }
}

/// What the checker must do with an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expected {
    /// The access completes and the process keeps running.
    Safe,
    /// The process dies and reports the access `distance` bytes on
    /// `direction` side of the allocation.
    Violation { direction: Direction, distance: usize },
}

impl Expected {
    /// Classify a `width`-byte access at `offset` into a `size`-byte block.
    ///
    /// Right-side distances count from the end of the block to the first byte
    /// of the access, so the first byte past the end is distance 0.
    pub fn classify(size: usize, offset: isize, width: Width) -> Expected {
        if offset < 0 {
            return Expected::Violation {
                direction: Direction::Before,
                distance: offset.unsigned_abs(),
            };
        }
        let start = offset.unsigned_abs();
        match start.checked_add(width.bytes()) {
            Some(end) if end <= size => Expected::Safe,
            _ => Expected::Violation {
                direction: Direction::After,
                distance: start.saturating_sub(size),
            },
        }
    }

    pub fn is_safe(&self) -> bool {
        matches!(self, Expected::Safe)
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Safe => f.write_str("safe"),
            Expected::Violation {
                direction,
                distance,
            } => write!(f, "violation {distance} byte(s) {direction}"),
        }
    }
}

/// Alignment contract the probe enforces before writing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Any address; misaligned accesses use an unaligned store.
    #[default]
    Relaxed,
    /// The address must be a multiple of the width. Anything else is a
    /// harness defect.
    Required,
}

/// One write of `width` bytes at `offset` from the start of a fresh
/// `size`-byte allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Attempt {
    pub size: usize,
    pub offset: isize,
    pub width: Width,
    pub alignment: Alignment,
}

impl Attempt {
    pub fn new(size: usize, offset: isize, width: Width) -> Self {
        Self {
            size,
            offset,
            width,
            alignment: Alignment::Relaxed,
        }
    }

    pub fn aligned(size: usize, offset: isize, width: Width) -> Self {
        Self {
            alignment: Alignment::Required,
            ..Self::new(size, offset, width)
        }
    }

    pub fn expected(&self) -> Expected {
        Expected::classify(self.size, self.offset, self.width)
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(size={}, offset={}, width={})",
            self.size,
            self.offset,
            self.width.bytes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn before(distance: usize) -> Expected {
        Expected::Violation {
            direction: Direction::Before,
            distance,
        }
    }

    fn after(distance: usize) -> Expected {
        Expected::Violation {
            direction: Direction::After,
            distance,
        }
    }

    #[test]
    fn ten_byte_block_single_byte_accesses() {
        assert_eq!(Expected::classify(10, -1, Width::One), before(1));
        for offset in 0..10 {
            assert_eq!(Expected::classify(10, offset, Width::One), Expected::Safe);
        }
        assert_eq!(Expected::classify(10, 10, Width::One), after(0));
        assert_eq!(Expected::classify(10, 15, Width::One), after(5));
    }

    #[test]
    fn large_block_edges() {
        let size = 1usize << 24;
        assert_eq!(Expected::classify(size, -1, Width::One), before(1));
        assert_eq!(Expected::classify(size, size as isize, Width::One), after(0));
    }

    #[test]
    fn four_byte_block_four_byte_accesses() {
        assert_eq!(Expected::classify(4, 0, Width::Four), Expected::Safe);
        assert_eq!(Expected::classify(4, -1, Width::Four), before(1));
        assert_eq!(Expected::classify(4, 4, Width::Four), after(0));
        for offset in 1..4 {
            assert!(!Expected::classify(4, offset, Width::Four).is_safe());
        }
    }

    #[test]
    fn access_ending_exactly_at_the_end_is_safe() {
        for width in Width::ALL {
            for size in width.bytes()..32 {
                let offset = (size - width.bytes()) as isize;
                assert!(Expected::classify(size, offset, width).is_safe());
                assert!(!Expected::classify(size, offset + 1, width).is_safe());
            }
        }
    }

    #[test]
    fn partial_overlap_reports_zero_distance() {
        // bytes 6..10 of an 8-byte block straddle the end
        assert_eq!(Expected::classify(8, 6, Width::Four), after(0));
    }

    #[test]
    fn classification_does_not_depend_on_call_order() {
        let forward: Vec<_> = (-8..24)
            .map(|o| Expected::classify(13, o, Width::Two))
            .collect();
        let mut backward: Vec<_> = (-8..24)
            .rev()
            .map(|o| Expected::classify(13, o, Width::Two))
            .collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn attempt_display_names_the_triple() {
        let attempt = Attempt::aligned(16, -3, Width::Eight);
        assert_eq!(attempt.to_string(), "(size=16, offset=-3, width=8)");
        assert_eq!(attempt.alignment, Alignment::Required);
    }
}

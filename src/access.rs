//! Single sized memory writes the optimizer cannot elide.
//!
//! Every write goes through a `#[inline(never)]` function and a
//! `black_box`ed pointer, so the store always reaches the instrumented code
//! of the checker instead of being folded away as a dead store.

use core::fmt;
use core::hint::black_box;
use core::ptr;

use serde::Serialize;

/// Text carried by the panic raised when the harness asks for an aligned write
/// at a misaligned address. The parent process looks for it to tell a harness
/// defect apart from a checker report.
pub const PRECONDITION_MARKER: &str = "overrun-harness: precondition violated";

/// Scalar width of a single access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "usize")]
#[repr(u8)]
pub enum Width {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

impl Width {
    pub const ALL: [Width; 4] = [Width::One, Width::Two, Width::Four, Width::Eight];

    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Widths from 1 up to and including `max_bytes`.
    pub fn up_to(max_bytes: usize) -> impl Iterator<Item = Width> {
        Self::ALL.into_iter().filter(move |w| w.bytes() <= max_bytes)
    }

    pub fn from_bytes(bytes: usize) -> Option<Width> {
        Self::ALL.into_iter().find(|w| w.bytes() == bytes)
    }

    /// True when `addr` satisfies the natural alignment of this width.
    pub fn is_aligned(self, addr: usize) -> bool {
        addr % self.bytes() == 0
    }
}

impl From<Width> for usize {
    fn from(width: Width) -> usize {
        width.bytes()
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.bytes() * 8)
    }
}

/// Write zero into the `width` bytes at `addr`, asserting natural alignment first.
///
/// A misaligned `addr` panics with [`PRECONDITION_MARKER`]: that is a bug in the
/// harness's offset bookkeeping, never a checker result.
///
/// # Safety
/// `addr` is expected to be out of bounds in most calls. The caller must be
/// running in an isolated process that the checker is allowed to terminate.
#[inline(never)]
pub unsafe fn write_sized_aligned(addr: *mut u8, width: Width) {
    assert!(
        width.is_aligned(addr as usize),
        "{PRECONDITION_MARKER}: {addr:p} is not aligned to {} bytes",
        width.bytes()
    );
    // SAFETY: forwarded from the caller; alignment checked above.
    unsafe { write_aligned(addr, width) }
}

/// Write zero into the `width` bytes at `addr` with no alignment requirement.
///
/// Aligned addresses get the natural typed store; the rest get an unaligned
/// typed store of the same width.
///
/// # Safety
/// Same contract as [`write_sized_aligned`].
#[inline(never)]
pub unsafe fn write_sized(addr: *mut u8, width: Width) {
    if width.is_aligned(addr as usize) {
        // SAFETY: forwarded from the caller; alignment just checked.
        unsafe { write_aligned(addr, width) }
    } else {
        // SAFETY: forwarded from the caller.
        unsafe { write_unaligned(addr, width) }
    }
}

#[inline(never)]
unsafe fn write_aligned(addr: *mut u8, width: Width) {
    let addr = black_box(addr);
    // SAFETY: caller guarantees `addr` is aligned for `width`. Validity of the
    // target is deliberately left to the checker.
    unsafe {
        match width {
            Width::One => ptr::write_volatile(addr, 0u8),
            Width::Two => ptr::write_volatile(addr.cast::<u16>(), 0u16),
            Width::Four => ptr::write_volatile(addr.cast::<u32>(), 0u32),
            Width::Eight => ptr::write_volatile(addr.cast::<u64>(), 0u64),
        }
    }
    black_box(addr);
}

#[inline(never)]
unsafe fn write_unaligned(addr: *mut u8, width: Width) {
    let addr = black_box(addr);
    // SAFETY: unaligned stores carry no alignment requirement. Validity of the
    // target is deliberately left to the checker.
    unsafe {
        match width {
            Width::One => ptr::write_unaligned(addr, 0u8),
            Width::Two => ptr::write_unaligned(addr.cast::<u16>(), 0u16),
            Width::Four => ptr::write_unaligned(addr.cast::<u32>(), 0u32),
            Width::Eight => ptr::write_unaligned(addr.cast::<u64>(), 0u64),
        }
    }
    // Publish the pointer after the store so it is not treated as dead.
    black_box(addr);
}

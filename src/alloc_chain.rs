//! Allocation and release behind a fixed stack of non-inlinable frames.
//!
//! The checker symbolizes the allocating and freeing stacks in its report;
//! each call here adds a real frame so those stacks look like application code
//! and the optimizer cannot merge or drop the allocation.

use core::hint::black_box;
use core::ptr::NonNull;

use crate::platform;

/// Number of harness frames between the caller and `malloc`.
pub const ALLOC_DEPTH: usize = 6;

/// Number of harness frames between the caller and `free`.
pub const RELEASE_DEPTH: usize = 5;

const _: () = assert!(ALLOC_DEPTH >= 5 && RELEASE_DEPTH >= 5);

#[cfg(test)]
thread_local! {
    static DEEPEST_STACK: core::cell::RefCell<Option<String>> =
        const { core::cell::RefCell::new(None) };
}

/// Remember the stack at the frame that calls into the C runtime.
#[cfg(test)]
fn record_stack() {
    let trace = std::backtrace::Backtrace::force_capture().to_string();
    DEEPEST_STACK.with(|slot| *slot.borrow_mut() = Some(trace));
}

/// Allocate `size` bytes through the C runtime. Returns null on failure.
#[inline(never)]
pub fn allocate(size: usize) -> *mut u8 {
    let block = alloc_frame_2(size);
    black_box(block)
}

#[inline(never)]
fn alloc_frame_2(size: usize) -> *mut u8 {
    let block = alloc_frame_3(size);
    black_box(block)
}

#[inline(never)]
fn alloc_frame_3(size: usize) -> *mut u8 {
    let block = alloc_frame_4(size);
    black_box(block)
}

#[inline(never)]
fn alloc_frame_4(size: usize) -> *mut u8 {
    let block = alloc_frame_5(size);
    black_box(block)
}

#[inline(never)]
fn alloc_frame_5(size: usize) -> *mut u8 {
    let block = alloc_frame_6(size);
    black_box(block)
}

#[inline(never)]
fn alloc_frame_6(size: usize) -> *mut u8 {
    #[cfg(test)]
    record_stack();
    // SAFETY: malloc is provided by the C runtime (or the checker's interposer).
    let block = unsafe { platform::malloc(black_box(size)) };
    black_box(block)
}

/// Return a block obtained from [`allocate`] to the C runtime.
///
/// # Safety
/// `block` must come from [`allocate`] and must not have been released yet.
#[inline(never)]
pub unsafe fn release(block: *mut u8) {
    unsafe { release_frame_2(block) };
    black_box(());
}

#[inline(never)]
unsafe fn release_frame_2(block: *mut u8) {
    unsafe { release_frame_3(block) };
    black_box(());
}

#[inline(never)]
unsafe fn release_frame_3(block: *mut u8) {
    unsafe { release_frame_4(block) };
    black_box(());
}

#[inline(never)]
unsafe fn release_frame_4(block: *mut u8) {
    unsafe { release_frame_5(block) };
    black_box(());
}

#[inline(never)]
unsafe fn release_frame_5(block: *mut u8) {
    #[cfg(test)]
    record_stack();
    // SAFETY: caller guarantees `block` came from malloc and is still live.
    unsafe { platform::free(black_box(block)) };
    black_box(());
}

/// One heap block owned by a single access attempt.
///
/// Released on drop. When the checker kills the process mid-attempt, drop never
/// runs and the block is leaked together with the process.
#[derive(Debug)]
pub struct Allocation {
    base: NonNull<u8>,
    size: usize,
}

impl Allocation {
    /// Returns `None` when the allocator reports failure.
    pub fn new(size: usize) -> Option<Self> {
        NonNull::new(allocate(size)).map(|base| Self { base, size })
    }

    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Address `offset` bytes from the start of the block. The result may lie
    /// outside the block; no dereference happens here.
    pub fn at(&self, offset: isize) -> *mut u8 {
        self.base.as_ptr().wrapping_offset(offset)
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        // SAFETY: `base` came from `allocate` and is released exactly once here.
        unsafe { release(self.base.as_ptr()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_writable_across_its_whole_extent() {
        let block = Allocation::new(64).expect("64-byte allocation");
        assert_eq!(block.size(), 64);
        // SAFETY: the block owns 64 writable bytes.
        unsafe { core::ptr::write_bytes(block.base(), 0x5A, 64) };
        // SAFETY: offset 63 is the last byte of the block.
        assert_eq!(unsafe { *block.at(63) }, 0x5A);
    }

    #[test]
    fn malloc_alignment_covers_every_width() {
        let block = Allocation::new(3).expect("3-byte allocation");
        for width in crate::access::Width::ALL {
            assert!(width.is_aligned(block.base() as usize));
        }
    }

    fn frames_named(prefix: &str) -> usize {
        let trace = DEEPEST_STACK
            .with(|slot| slot.borrow_mut().take())
            .expect("stack recorded");
        trace.lines().filter(|line| line.contains(prefix)).count()
    }

    #[test]
    fn chains_have_the_declared_number_of_frames() {
        let block = Allocation::new(16).expect("16-byte allocation");
        assert_eq!(frames_named("alloc_chain::alloc"), ALLOC_DEPTH);
        drop(block);
        assert_eq!(frames_named("alloc_chain::release"), RELEASE_DEPTH);
    }

    #[test]
    fn at_computes_addresses_on_both_sides() {
        let block = Allocation::new(10).expect("10-byte allocation");
        let base = block.base() as usize;
        assert_eq!(block.at(-1) as usize, base.wrapping_sub(1));
        assert_eq!(block.at(10) as usize, base + 10);
    }
}

//! C runtime allocator entry points.
//!
//! The checker under test intercepts these symbols, so every allocation the
//! harness makes goes through them rather than through Rust's global allocator.

unsafe extern "C" {
    pub fn malloc(size: usize) -> *mut u8;
    pub fn free(ptr: *mut u8);
}

/// Width in bytes of the platform's native machine word.
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

//! Heap copies of captured input buffers handed across the C boundary.
//!
//! Frames are allocated with the C allocator so a consumer on the other
//! side of the FFI may release them with either `free()` or
//! `release_recorded_frame`.

use std::ptr::{self, NonNull};
use std::slice;

/// One captured buffer of mono `f32` samples owned by the C heap.
pub struct CapturedFrame {
    ptr: NonNull<f32>,
    frames: usize,
}

// SAFETY: the allocation is uniquely owned; nothing else aliases it.
unsafe impl Send for CapturedFrame {}

impl CapturedFrame {
    /// Copy `samples` into a fresh allocation.
    ///
    /// Returns `None` for an empty input or when the allocator fails.
    pub fn copy_from(samples: &[f32]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let bytes = std::mem::size_of_val(samples);
        // SAFETY: size is non-zero; the result is checked for null below.
        let raw = unsafe { libc::malloc(bytes) } as *mut f32;
        let ptr = NonNull::new(raw)?;
        // SAFETY: `ptr` points to `bytes` freshly allocated bytes that do
        // not overlap `samples`.
        unsafe { ptr::copy_nonoverlapping(samples.as_ptr(), ptr.as_ptr(), samples.len()) };
        Some(Self {
            ptr,
            frames: samples.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        // SAFETY: `ptr` owns `frames` initialised samples.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.frames) }
    }

    pub fn as_ptr(&self) -> *const f32 {
        self.ptr.as_ptr()
    }

    /// Give up ownership; the caller must release the pointer later
    pub fn into_raw(self) -> (*mut f32, usize) {
        let raw = (self.ptr.as_ptr(), self.frames);
        std::mem::forget(self);
        raw
    }

    /// Take back ownership of a pointer produced by [`CapturedFrame::into_raw`].
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` with the same `frames`, and must not
    /// have been released already.
    pub unsafe fn from_raw(ptr: NonNull<f32>, frames: usize) -> Self {
        Self { ptr, frames }
    }
}

impl Drop for CapturedFrame {
    fn drop(&mut self) {
        // SAFETY: allocated with libc::malloc in copy_from.
        unsafe { libc::free(self.ptr.as_ptr() as *mut libc::c_void) };
    }
}

/// Release a frame pointer handed to a C consumer. Null is a no-op.
///
/// # Safety
/// `ptr` must be null or a pointer received from a capture callback that
/// has not been released yet.
pub unsafe fn release_raw(ptr: *mut f32) {
    if !ptr.is_null() {
        libc::free(ptr as *mut libc::c_void);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_is_exact() {
        let input = [0.0_f32, -1.0, 0.25, 1.0];
        let frame = CapturedFrame::copy_from(&input).unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.as_slice(), &input);
        assert_ne!(frame.as_ptr(), input.as_ptr());
    }

    #[test]
    fn test_empty_input_is_not_copied() {
        assert!(CapturedFrame::copy_from(&[]).is_none());
    }

    #[test]
    fn test_raw_roundtrip_releases_once() {
        let frame = CapturedFrame::copy_from(&[0.5; 16]).unwrap();
        let (ptr, frames) = frame.into_raw();
        assert_eq!(frames, 16);

        let restored = unsafe { CapturedFrame::from_raw(NonNull::new(ptr).unwrap(), frames) };
        assert_eq!(restored.as_slice()[15], 0.5);
    }

    #[test]
    fn test_release_raw_accepts_null() {
        unsafe { release_raw(ptr::null_mut()) };

        let (ptr, _) = CapturedFrame::copy_from(&[1.0]).unwrap().into_raw();
        unsafe { release_raw(ptr) };
    }
}

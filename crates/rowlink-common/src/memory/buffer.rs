//! Column buffers shared with a native engine.
//!
//! A `ColumnBuffer` is the memory a driver writes a column value into: a
//! fixed-capacity byte region plus a separate length/indicator cell. Both
//! live on the heap at addresses that never change for the lifetime of the
//! buffer, so they can be registered with `SQLBindCol` and filled on every
//! `SQLFetch`.
//!
//! The indicator is authoritative. The number of valid bytes is always read
//! from it, never inferred from the capacity.

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::slice;

use crate::constants::{BUFFER_ALIGNMENT, SQL_NO_TOTAL, SQL_NULL_DATA};

/// Allocates a zeroed region for `capacity` bytes.
///
/// Zero-capacity buffers still own one byte so the pointer handed to a
/// driver is never dangling.
fn allocate(capacity: usize) -> (NonNull<u8>, Layout) {
    let layout = Layout::from_size_align(capacity.max(1), BUFFER_ALIGNMENT)
        .expect("invalid layout for column buffer");

    // SAFETY: layout has a non-zero size
    let ptr = unsafe { alloc::alloc_zeroed(layout) };
    match NonNull::new(ptr) {
        Some(ptr) => (ptr, layout),
        None => alloc::handle_alloc_error(layout),
    }
}

/// What the indicator cell says about the buffer contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// The value is NULL.
    Null,
    /// The driver could not report the total length.
    NoTotal,
    /// The value (or the remainder of it) is this many bytes long.
    Length(usize),
}

impl Indicator {
    /// Interprets a raw indicator value.
    #[must_use]
    pub fn from_raw(raw: isize) -> Self {
        match raw {
            SQL_NULL_DATA => Indicator::Null,
            SQL_NO_TOTAL => Indicator::NoTotal,
            // Other negative values are not defined for fetched data; treat
            // them as an unknown length rather than a huge one.
            n if n < 0 => Indicator::NoTotal,
            n => Indicator::Length(n.unsigned_abs()),
        }
    }

    /// Returns the raw indicator value.
    #[must_use]
    pub fn to_raw(self) -> isize {
        match self {
            Indicator::Null => SQL_NULL_DATA,
            Indicator::NoTotal => SQL_NO_TOTAL,
            Indicator::Length(n) => isize::try_from(n).unwrap_or(isize::MAX),
        }
    }
}

/// A native-facing column buffer.
///
/// # Example
///
/// ```rust
/// use rowlink_common::memory::{ColumnBuffer, Indicator};
///
/// let mut buffer = ColumnBuffer::new(8);
/// buffer.as_mut_slice()[..3].copy_from_slice(b"abc");
/// buffer.set_indicator(3);
///
/// assert_eq!(buffer.indicator(), Indicator::Length(3));
/// assert_eq!(buffer.filled(3), b"abc");
/// ```
pub struct ColumnBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
    capacity: usize,
    indicator: NonNull<isize>,
}

// SAFETY: ColumnBuffer owns its memory and doesn't share it
unsafe impl Send for ColumnBuffer {}

impl ColumnBuffer {
    /// Creates a zeroed buffer with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (ptr, layout) = allocate(capacity);
        Self {
            ptr,
            layout,
            capacity,
            indicator: NonNull::from(Box::leak(Box::new(0isize))),
        }
    }

    /// Returns the capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the capacity as a native buffer length.
    #[inline]
    #[must_use]
    pub fn native_len(&self) -> isize {
        isize::try_from(self.capacity).unwrap_or(isize::MAX)
    }

    /// Returns a raw pointer to the data region.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Returns a mutable raw pointer to the data region.
    #[inline]
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Returns a mutable raw pointer to the indicator cell.
    #[inline]
    #[must_use]
    pub fn indicator_ptr(&mut self) -> *mut isize {
        self.indicator.as_ptr()
    }

    /// Returns the whole data region.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for capacity bytes
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }

    /// Returns the whole data region mutably.
    #[inline]
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for capacity bytes and we have exclusive access
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) }
    }

    /// Returns the first `len` bytes, clamped to the capacity.
    #[inline]
    #[must_use]
    pub fn filled(&self, len: usize) -> &[u8] {
        &self.as_slice()[..len.min(self.capacity)]
    }

    /// Returns the raw indicator value.
    #[inline]
    #[must_use]
    pub fn raw_indicator(&self) -> isize {
        // SAFETY: indicator points to a live cell owned by this buffer
        unsafe { *self.indicator.as_ptr() }
    }

    /// Returns the decoded indicator.
    #[inline]
    #[must_use]
    pub fn indicator(&self) -> Indicator {
        Indicator::from_raw(self.raw_indicator())
    }

    /// Overwrites the indicator cell.
    #[inline]
    pub fn set_indicator(&mut self, raw: isize) {
        // SAFETY: indicator points to a live cell owned by this buffer
        unsafe { *self.indicator.as_ptr() = raw };
    }

    /// Returns true if the indicator marks the value as NULL.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.raw_indicator() == SQL_NULL_DATA
    }

    /// Grows the data region to at least `capacity` bytes.
    ///
    /// Contents are not preserved. Must not be called while the buffer is
    /// bound to a statement, because the engine holds the old address.
    pub fn grow(&mut self, capacity: usize) {
        if capacity <= self.capacity {
            return;
        }

        let (ptr, layout) = allocate(capacity);
        // SAFETY: the old region was allocated with self.layout
        unsafe {
            alloc::dealloc(self.ptr.as_ptr(), self.layout);
        }
        self.ptr = ptr;
        self.layout = layout;
        self.capacity = capacity;
    }

    /// Zeroes the data region and resets the indicator.
    pub fn clear(&mut self) {
        // SAFETY: ptr is valid for capacity bytes
        unsafe {
            std::ptr::write_bytes(self.ptr.as_ptr(), 0, self.capacity);
        }
        self.set_indicator(0);
    }
}

impl Drop for ColumnBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with this layout and indicator came
        // from Box::leak
        unsafe {
            alloc::dealloc(self.ptr.as_ptr(), self.layout);
            drop(Box::from_raw(self.indicator.as_ptr()));
        }
    }
}

impl fmt::Debug for ColumnBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnBuffer")
            .field("capacity", &self.capacity)
            .field("indicator", &self.indicator())
            .field("ptr", &self.ptr)
            .finish()
    }
}

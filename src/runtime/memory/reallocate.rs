//! Free-standing reallocation entry points and the growth policy
//!
//! `reallocate` is the untyped primitive; `resize_array` and `release_array`
//! are the typed compositions callers use for their element buffers. Each
//! fatal entry point has a `try_` twin that reports `AllocError` instead of
//! terminating the process.

use core::alloc::Layout;
use core::mem;
use core::ptr::NonNull;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::allocator::{AllocError, Reallocator, System};

/// Alignment used for untyped blocks (the malloc guarantee on 64-bit targets)
pub const BLOCK_ALIGN: usize = 16;

/// Smallest non-zero capacity handed out by the growth policy
pub const MIN_CAPACITY: usize = 8;

/// Growth policy: floor at `min_capacity`, then double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthPolicy {
    pub min_capacity: usize,
}

impl GrowthPolicy {
    pub const DEFAULT: GrowthPolicy = GrowthPolicy {
        min_capacity: MIN_CAPACITY,
    };

    pub fn new(min_capacity: usize) -> Self {
        Self { min_capacity }
    }

    /// Next capacity for a sequence that must hold at least one more element.
    ///
    /// Doubling saturates at `usize::MAX`; the byte-size computation that
    /// follows reports the overflow.
    #[inline]
    pub fn next_capacity(
        &self,
        capacity: usize,
    ) -> usize {
        if capacity < self.min_capacity {
            self.min_capacity
        } else {
            capacity.saturating_mul(2).max(1)
        }
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Next capacity under the default policy: 8 below 8, doubled otherwise.
#[inline]
pub const fn grow_capacity(capacity: usize) -> usize {
    if capacity < MIN_CAPACITY {
        MIN_CAPACITY
    } else {
        capacity.saturating_mul(2)
    }
}

/// Byte size of `count` elements of `T`.
#[inline]
pub fn array_bytes<T>(count: usize) -> Result<usize, AllocError> {
    Layout::array::<T>(count)
        .map(|layout| layout.size())
        .map_err(|_| AllocError::CapacityOverflow)
}

/// Terminate on an allocation failure.
///
/// Out-of-memory goes through `handle_alloc_error`; a size overflow panics
/// the way `Vec` does.
#[cold]
pub fn handle_failure(err: AllocError) -> ! {
    error!(%err, "unrecoverable allocation failure");
    match err.layout() {
        Some(layout) => std::alloc::handle_alloc_error(layout),
        None => panic!("{}", err),
    }
}

/// Resize an untyped block using the global allocator.
///
/// Terminates the process if a non-zero `new_size` cannot be satisfied.
///
/// # Safety
/// `block` must be `None` with `old_size == 0`, or a block returned by a
/// previous call for exactly `old_size` bytes. The old address must not be
/// used after the call unless it is returned unchanged.
pub unsafe fn reallocate(
    block: Option<NonNull<u8>>,
    old_size: usize,
    new_size: usize,
) -> Option<NonNull<u8>> {
    try_reallocate(block, old_size, new_size).unwrap_or_else(|err| handle_failure(err))
}

/// Fallible form of [`reallocate`].
///
/// # Safety
/// Same contract as [`reallocate`].
pub unsafe fn try_reallocate(
    block: Option<NonNull<u8>>,
    old_size: usize,
    new_size: usize,
) -> Result<Option<NonNull<u8>>, AllocError> {
    System.reallocate(block, old_size, new_size, BLOCK_ALIGN)
}

/// Resize an array of `T` from `old_count` to `new_count` elements.
///
/// # Safety
/// `block` must be `None` with `old_count == 0`, or an array obtained from
/// these helpers holding exactly `old_count` slots. Elements beyond
/// `new_count` are not dropped.
pub unsafe fn resize_array<T>(
    block: Option<NonNull<T>>,
    old_count: usize,
    new_count: usize,
) -> Option<NonNull<T>> {
    try_resize_array(block, old_count, new_count).unwrap_or_else(|err| handle_failure(err))
}

/// Fallible form of [`resize_array`].
///
/// # Safety
/// Same contract as [`resize_array`].
pub unsafe fn try_resize_array<T>(
    block: Option<NonNull<T>>,
    old_count: usize,
    new_count: usize,
) -> Result<Option<NonNull<T>>, AllocError> {
    try_resize_array_in(&mut System, block, old_count, new_count)
}

/// [`try_resize_array`] over an explicit reallocator.
///
/// # Safety
/// Same contract as [`resize_array`], with `block` owned by `realloc`.
pub unsafe fn try_resize_array_in<T, R: Reallocator + ?Sized>(
    realloc: &mut R,
    block: Option<NonNull<T>>,
    old_count: usize,
    new_count: usize,
) -> Result<Option<NonNull<T>>, AllocError> {
    let old_size = array_bytes::<T>(old_count)?;
    let new_size = array_bytes::<T>(new_count)?;
    let block = realloc.reallocate(
        block.map(NonNull::cast),
        old_size,
        new_size,
        mem::align_of::<T>(),
    )?;
    Ok(block.map(NonNull::cast))
}

/// Release an array of `old_count` elements of `T`; always returns `None`.
///
/// # Safety
/// Same contract as [`resize_array`]. Elements are not dropped.
pub unsafe fn release_array<T>(
    block: Option<NonNull<T>>,
    old_count: usize,
) -> Option<NonNull<T>> {
    release_array_in(&mut System, block, old_count)
}

/// [`release_array`] over an explicit reallocator.
///
/// # Safety
/// Same contract as [`resize_array`], with `block` owned by `realloc`.
pub unsafe fn release_array_in<T, R: Reallocator + ?Sized>(
    realloc: &mut R,
    block: Option<NonNull<T>>,
    old_count: usize,
) -> Option<NonNull<T>> {
    // The block exists, so its byte size was computed without overflow before
    let old_size = mem::size_of::<T>() * old_count;
    let released = realloc.reallocate(block.map(NonNull::cast), old_size, 0, mem::align_of::<T>());
    if let Err(err) = released {
        // Releasing cannot fail for a valid block
        handle_failure(err);
    }
    None
}

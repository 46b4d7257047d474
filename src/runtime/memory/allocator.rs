//! Reallocator interface for the lox-memory runtime
//!
//! This module defines the `Reallocator` trait: the single boundary through
//! which every growable buffer of the interpreter obtains, resizes and
//! releases its backing memory.
//!
//! # Design Principles
//! - One operation: `reallocate(block, old_size, new_size, align)`
//! - No ownership logic, just raw memory
//! - Stateless for the system backend; wrappers add bookkeeping

use core::alloc::Layout;
use core::ptr::NonNull;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

/// Memory allocation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The backing allocator could not satisfy the request
    #[error("out of memory: requested {size} bytes (align {align})")]
    OutOfMemory { size: usize, align: usize },

    /// The byte size of the requested capacity does not fit in `isize::MAX`
    #[error("capacity overflow")]
    CapacityOverflow,

    /// Alignment is zero or not a power of two
    #[error("invalid alignment: {0}")]
    InvalidAlignment(usize),
}

impl AllocError {
    /// Layout describing the failed request, if there is one
    pub fn layout(&self) -> Option<Layout> {
        match *self {
            AllocError::OutOfMemory { size, align } => Layout::from_size_align(size, align).ok(),
            _ => None,
        }
    }
}

/// Build the layout for a block, rejecting invalid alignments and sizes.
pub(crate) fn block_layout(
    size: usize,
    align: usize,
) -> Result<Layout, AllocError> {
    if align == 0 || !align.is_power_of_two() {
        return Err(AllocError::InvalidAlignment(align));
    }
    Layout::from_size_align(size, align).map_err(|_| AllocError::CapacityOverflow)
}

/// Core reallocator trait
///
/// Changes the size of a raw block. The table below is the whole contract:
///
/// | `old_size` | `new_size` | effect |
/// |---|---|---|
/// | 0 | >0 | fresh, uninitialized block of `new_size` bytes |
/// | >0 | 0 | block released, returns `None` |
/// | >0 | >0 | block resized; the first `min(old, new)` bytes are preserved |
/// | 0 | 0 | no-op, returns `None` |
///
/// Releasing never fails.
pub trait Reallocator {
    /// Resize `block` from `old_size` to `new_size` bytes.
    ///
    /// # Safety
    /// `block` must be `None` (with `old_size == 0`) or a block previously
    /// returned by this same reallocator for exactly `old_size` bytes and
    /// `align`. After a call that returns `Ok`, the old address must not be
    /// used again unless it was returned unchanged.
    unsafe fn reallocate(
        &mut self,
        block: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Result<Option<NonNull<u8>>, AllocError>;
}

impl<R: Reallocator + ?Sized> Reallocator for &mut R {
    unsafe fn reallocate(
        &mut self,
        block: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Result<Option<NonNull<u8>>, AllocError> {
        (**self).reallocate(block, old_size, new_size, align)
    }
}

/// Reallocator backed by the process-wide global allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct System;

impl Reallocator for System {
    unsafe fn reallocate(
        &mut self,
        block: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Result<Option<NonNull<u8>>, AllocError> {
        match (block, old_size, new_size) {
            (None, _, 0) | (Some(_), 0, 0) => Ok(None),
            (Some(ptr), old, 0) => {
                trace!(old_size = old, "release block");
                // Safety: the caller guarantees `ptr` was allocated with this layout
                std::alloc::dealloc(ptr.as_ptr(), Layout::from_size_align_unchecked(old, align));
                Ok(None)
            }
            (None, _, new) | (Some(_), 0, new) => {
                let layout = block_layout(new, align)?;
                trace!(new_size = new, "allocate block");
                let ptr = std::alloc::alloc(layout);
                NonNull::new(ptr)
                    .map(Some)
                    .ok_or(AllocError::OutOfMemory { size: new, align })
            }
            (Some(ptr), old, new) if old == new => Ok(Some(ptr)),
            (Some(ptr), old, new) => {
                // `realloc` requires the new size to form a valid layout too
                block_layout(new, align)?;
                trace!(old_size = old, new_size = new, "resize block");
                let old_layout = Layout::from_size_align_unchecked(old, align);
                let moved = std::alloc::realloc(ptr.as_ptr(), old_layout, new);
                NonNull::new(moved)
                    .map(Some)
                    .ok_or(AllocError::OutOfMemory { size: new, align })
            }
        }
    }
}

/// What a single reallocation did to a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Allocate,
    Grow,
    Shrink,
    Release,
    Noop,
}

impl TransitionKind {
    /// Classify a `(old_size, new_size)` pair.
    pub fn classify(
        old_size: usize,
        new_size: usize,
    ) -> Self {
        match (old_size, new_size) {
            (o, n) if o == n => TransitionKind::Noop,
            (0, _) => TransitionKind::Allocate,
            (_, 0) => TransitionKind::Release,
            (o, n) if n > o => TransitionKind::Grow,
            _ => TransitionKind::Shrink,
        }
    }
}

/// One recorded call into a reallocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub old_size: usize,
    pub new_size: usize,
    pub kind: TransitionKind,
}

/// Reallocator wrapper that records every successful transition
///
/// Used by tests and the CLI to observe the sizes the growth policy actually
/// asks for. A clone starts with an empty history.
#[derive(Debug, Default)]
pub struct Tracked<R = System> {
    inner: R,
    transitions: Vec<Transition>,
}

impl<R: Reallocator> Tracked<R> {
    /// Wrap `inner`
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            transitions: Vec::new(),
        }
    }

    /// All transitions recorded so far, oldest first
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Number of calls that changed a block's size
    pub fn reallocations(&self) -> usize {
        self.transitions
            .iter()
            .filter(|t| t.kind != TransitionKind::Noop)
            .count()
    }

    /// Forget the recorded history
    pub fn reset(&mut self) {
        self.transitions.clear();
    }
}

impl<R: Clone> Clone for Tracked<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            transitions: Vec::new(),
        }
    }
}

impl<R: Reallocator> Reallocator for Tracked<R> {
    unsafe fn reallocate(
        &mut self,
        block: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Result<Option<NonNull<u8>>, AllocError> {
        let result = self.inner.reallocate(block, old_size, new_size, align)?;
        self.transitions.push(Transition {
            old_size,
            new_size,
            kind: TransitionKind::classify(old_size, new_size),
        });
        Ok(result)
    }
}

/// Reallocator wrapper enforcing a byte budget
///
/// Any request that would take the live byte total above `limit` fails with
/// `AllocError::OutOfMemory`, which makes allocation failure observable
/// without exhausting the machine. A clone owns no blocks, so it starts with
/// the same budget and nothing charged against it.
#[derive(Debug)]
pub struct Limited<R = System> {
    inner: R,
    limit: usize,
    in_use: usize,
}

impl<R: Reallocator> Limited<R> {
    /// Wrap `inner` with a budget of `limit` live bytes
    pub fn new(
        inner: R,
        limit: usize,
    ) -> Self {
        Self {
            inner,
            limit,
            in_use: 0,
        }
    }

    /// Live bytes currently handed out
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Bytes still available
    pub fn remaining(&self) -> usize {
        self.limit - self.in_use
    }
}

impl<R: Clone> Clone for Limited<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limit: self.limit,
            in_use: 0,
        }
    }
}

impl<R: Reallocator> Reallocator for Limited<R> {
    unsafe fn reallocate(
        &mut self,
        block: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Result<Option<NonNull<u8>>, AllocError> {
        // Blocks are only released through this wrapper, so `old_size <= in_use`
        let after = self.in_use - old_size.min(self.in_use);
        if new_size > old_size && new_size > self.limit - after {
            return Err(AllocError::OutOfMemory {
                size: new_size,
                align,
            });
        }
        let result = self.inner.reallocate(block, old_size, new_size, align)?;
        self.in_use = after + new_size;
        Ok(result)
    }
}

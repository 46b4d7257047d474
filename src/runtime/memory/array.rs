//! Growable array with intrinsic count and capacity
//!
//! `DynArray<T>` is the typed container every dynamic sequence of the
//! interpreter (bytecode streams, constant pools, line tables) is built on.
//! It keeps `len <= capacity` itself and obtains all backing memory through a
//! [`Reallocator`], growing with the [`GrowthPolicy`].

use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};
use tracing::debug;

use super::allocator::{AllocError, Reallocator, System};
use super::reallocate::{handle_failure, release_array_in, try_resize_array_in, GrowthPolicy};

/// A contiguous growable array
pub struct DynArray<T, R: Reallocator = System> {
    /// Backing block, `None` while nothing is allocated
    ptr: Option<NonNull<T>>,
    /// Slots in the backing block
    cap: usize,
    /// Initialized slots
    len: usize,
    policy: GrowthPolicy,
    realloc: R,
    _marker: PhantomData<T>,
}

// Safety: `DynArray` owns its elements exclusively, like `Vec`.
unsafe impl<T: Send, R: Reallocator + Send> Send for DynArray<T, R> {}
unsafe impl<T: Sync, R: Reallocator + Sync> Sync for DynArray<T, R> {}

const fn is_zst<T>() -> bool {
    mem::size_of::<T>() == 0
}

impl<T> DynArray<T> {
    /// Create an empty array; nothing is allocated until the first push
    pub fn new() -> Self {
        Self::new_in(System)
    }

    /// Create an array with room for at least `capacity` elements
    pub fn with_capacity(capacity: usize) -> Self {
        let mut array = Self::new();
        array.reserve(capacity);
        array
    }
}

impl<T, R: Reallocator> DynArray<T, R> {
    /// Create an empty array backed by `realloc`
    pub fn new_in(realloc: R) -> Self {
        Self::with_policy_in(GrowthPolicy::DEFAULT, realloc)
    }

    /// Create an empty array with a custom growth policy
    pub fn with_policy_in(
        policy: GrowthPolicy,
        realloc: R,
    ) -> Self {
        Self {
            ptr: None,
            cap: 0,
            len: 0,
            policy,
            realloc,
            _marker: PhantomData,
        }
    }

    /// Number of elements in use
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the current block can hold
    #[inline]
    pub fn capacity(&self) -> usize {
        if is_zst::<T>() {
            usize::MAX
        } else {
            self.cap
        }
    }

    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// The backing reallocator
    pub fn allocator(&self) -> &R {
        &self.realloc
    }

    #[inline]
    fn data(&self) -> NonNull<T> {
        self.ptr.unwrap_or(NonNull::dangling())
    }

    /// Make room for `additional` more elements, growing by the policy.
    pub fn try_reserve(
        &mut self,
        additional: usize,
    ) -> Result<(), AllocError> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(AllocError::CapacityOverflow)?;
        if needed <= self.capacity() {
            return Ok(());
        }

        let mut new_cap = self.cap;
        while new_cap < needed {
            new_cap = self.policy.next_capacity(new_cap);
        }
        self.try_resize(new_cap)
    }

    /// Fatal form of [`try_reserve`](Self::try_reserve)
    pub fn reserve(
        &mut self,
        additional: usize,
    ) {
        if let Err(err) = self.try_reserve(additional) {
            handle_failure(err);
        }
    }

    fn try_resize(
        &mut self,
        new_cap: usize,
    ) -> Result<(), AllocError> {
        debug_assert!(new_cap >= self.len);
        // Safety: `ptr` holds exactly `cap` slots and was obtained from `realloc`
        let ptr = unsafe { try_resize_array_in(&mut self.realloc, self.ptr, self.cap, new_cap)? };
        debug!(old_capacity = self.cap, new_capacity = new_cap, "resize array");
        self.ptr = ptr;
        self.cap = new_cap;
        Ok(())
    }

    /// Append `value`, growing the block when full.
    ///
    /// On failure `value` is dropped and the array is unchanged.
    pub fn try_push(
        &mut self,
        value: T,
    ) -> Result<(), AllocError> {
        if self.len == self.capacity() {
            self.try_reserve(1)?;
        }
        // Safety: `len < capacity`, the slot is allocated and uninitialized
        unsafe {
            self.data().as_ptr().add(self.len).write(value);
        }
        self.len += 1;
        Ok(())
    }

    /// Append `value`; terminates the process if memory runs out
    pub fn push(
        &mut self,
        value: T,
    ) {
        if let Err(err) = self.try_push(value) {
            handle_failure(err);
        }
    }

    /// Remove and return the last element
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // Safety: the slot was initialized and is now outside `len`
        Some(unsafe { self.data().as_ptr().add(self.len).read() })
    }

    /// Shorten to `len` elements, dropping the rest; capacity is kept
    pub fn truncate(
        &mut self,
        len: usize,
    ) {
        if len >= self.len {
            return;
        }
        let tail = self.len - len;
        self.len = len;
        // Safety: slots `len..len + tail` are initialized and no longer reachable
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.data().as_ptr().add(len),
                tail,
            ));
        }
    }

    /// Drop every element; capacity is kept
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Shrink the block to exactly `len` slots
    pub fn shrink_to_fit(&mut self) {
        if is_zst::<T>() || self.cap == self.len {
            return;
        }
        // Shrinking or releasing never fails for a valid block
        if let Err(err) = self.try_resize(self.len) {
            handle_failure(err);
        }
    }

    /// Drop every element and release the block, back to capacity 0
    pub fn free(&mut self) {
        self.clear();
        if self.ptr.is_some() {
            // Safety: `ptr` holds exactly `cap` slots and was obtained from `realloc`
            self.ptr = unsafe { release_array_in(&mut self.realloc, self.ptr.take(), self.cap) };
        }
        self.cap = 0;
    }

    pub fn as_slice(&self) -> &[T] {
        // Safety: the first `len` slots are initialized
        unsafe { core::slice::from_raw_parts(self.data().as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // Safety: the first `len` slots are initialized and uniquely borrowed
        unsafe { core::slice::from_raw_parts_mut(self.data().as_ptr(), self.len) }
    }
}

impl<T, R: Reallocator> Drop for DynArray<T, R> {
    fn drop(&mut self) {
        self.free();
    }
}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R: Reallocator> Deref for DynArray<T, R> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, R: Reallocator> DerefMut for DynArray<T, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug, R: Reallocator> fmt::Debug for DynArray<T, R> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Clone, R: Reallocator + Clone> Clone for DynArray<T, R> {
    fn clone(&self) -> Self {
        let mut array = Self::with_policy_in(self.policy, self.realloc.clone());
        array.extend(self.iter().cloned());
        array
    }
}

impl<T: PartialEq, R: Reallocator> PartialEq<[T]> for DynArray<T, R> {
    fn eq(
        &self,
        other: &[T],
    ) -> bool {
        self.as_slice() == other
    }
}

impl<T, R: Reallocator> Extend<T> for DynArray<T, R> {
    fn extend<I: IntoIterator<Item = T>>(
        &mut self,
        iter: I,
    ) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.push(value);
        }
    }
}

impl<T> FromIterator<T> for DynArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<'a, T, R: Reallocator> IntoIterator for &'a DynArray<T, R> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

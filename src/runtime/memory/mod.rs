//! Memory management for the interpreter's growable buffers
//!
//! Every dynamically sized, contiguous buffer of the interpreter goes through
//! one reallocation primitive. The primitive owns no state: callers hand it a
//! block, the block's current byte size and the size they want, and it
//! allocates, resizes or releases accordingly.
//!
//! # Layers
//! - [`Reallocator`]: the boundary trait, with the [`System`] backend and the
//!   [`Tracked`] / [`Limited`] wrappers
//! - [`reallocate`], [`resize_array`], [`release_array`]: free functions over
//!   the global allocator, fatal on out-of-memory, each with a `try_` twin
//! - [`grow_capacity`] / [`GrowthPolicy`]: floor at 8, then double
//! - [`DynArray`]: typed container with intrinsic count and capacity

mod allocator;
mod array;
mod reallocate;

pub use allocator::{AllocError, Limited, Reallocator, System, Tracked, Transition, TransitionKind};
pub use array::DynArray;
pub use reallocate::{
    array_bytes, grow_capacity, handle_failure, reallocate, release_array, release_array_in,
    resize_array, try_reallocate, try_resize_array, try_resize_array_in, GrowthPolicy,
    BLOCK_ALIGN, MIN_CAPACITY,
};

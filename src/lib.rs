//! lox-memory
//!
//! The reallocation primitive behind a bytecode interpreter's growable
//! buffers: one `reallocate` boundary, the floor-then-double growth policy,
//! and `DynArray<T>`, the typed container built on both.
//!
//! # Example
//!
//! ```
//! use lox_memory::runtime::memory::{grow_capacity, DynArray};
//!
//! let mut code: DynArray<u8> = DynArray::new();
//! code.push(0x01);
//! assert_eq!(code.capacity(), grow_capacity(0));
//! ```

#![doc(html_root_url = "https://docs.rs/lox-memory")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

use serde::Serialize;
use tracing::{debug, info};

use crate::runtime::memory::{DynArray, GrowthPolicy, Limited, System, Tracked, Transition};
use crate::util::config::{FailurePolicy, MemoryConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "lox-memory";

/// Outcome of appending values one at a time into a `DynArray`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthReport {
    /// Elements requested
    pub requested: usize,
    /// Elements actually appended
    pub appended: usize,
    /// Final capacity in elements
    pub capacity: usize,
    /// Size of one element in bytes
    pub element_size: usize,
    /// Every call the reallocator saw while appending
    pub transitions: Vec<Transition>,
    /// Calls that changed a block's size
    pub reallocations: usize,
    /// Error that stopped appending early, if any
    pub error: Option<String>,
}

impl GrowthReport {
    /// Capacities (in elements) after each transition, starting from 0
    pub fn capacities(&self) -> Vec<usize> {
        std::iter::once(0)
            .chain(self.transitions.iter().map(|t| t.new_size / self.element_size))
            .collect()
    }
}

/// Append `count` values into a fresh array under `config` and report what
/// the reallocator observed.
///
/// With `FailurePolicy::Abort` an exhausted heap terminates the process; with
/// `FailurePolicy::Report` appending stops and the error is recorded.
pub fn simulate_growth(
    count: usize,
    config: &MemoryConfig,
) -> Result<GrowthReport> {
    config.validate()?;
    let limit = config.heap_limit.unwrap_or(usize::MAX);
    let realloc = Tracked::new(Limited::new(System, limit));
    let mut array: DynArray<u64, _> = DynArray::with_policy_in(config.growth, realloc);
    debug!(count, limit, "simulate growth");

    let mut error = None;
    for value in 0..count as u64 {
        match config.on_failure {
            FailurePolicy::Abort => array.push(value),
            FailurePolicy::Report => {
                if let Err(err) = array.try_push(value) {
                    info!(appended = array.len(), %err, "growth stopped");
                    error = Some(err.to_string());
                    break;
                }
            }
        }
    }

    Ok(GrowthReport {
        requested: count,
        appended: array.len(),
        capacity: array.capacity(),
        element_size: std::mem::size_of::<u64>(),
        transitions: array.allocator().transitions().to_vec(),
        reallocations: array.allocator().reallocations(),
        error,
    })
}

/// The first `steps` capacities produced by `policy` from `start`
pub fn growth_sequence(
    policy: GrowthPolicy,
    start: usize,
    steps: usize,
) -> Vec<usize> {
    std::iter::successors(Some(start), |&capacity| Some(policy.next_capacity(capacity)))
        .take(steps + 1)
        .collect()
}

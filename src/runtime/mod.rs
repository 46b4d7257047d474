//! Runtime system
//!
//! This module contains the memory management every dynamic buffer of the
//! interpreter is built on.

pub mod memory;

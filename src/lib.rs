//! A streaming SHA-256 engine structured like a hardware accelerator:
//! a byte-ingest/padding controller, per-block compression engines, and an
//! optional multi-lane pipeline that overlaps schedule loading with
//! compression while chaining hash state between lanes.

pub use crate::hasher::{sha256, Hasher};

#[macro_use]
pub mod macros;
pub mod util;

// FIPS 180-4 constants and bit functions
pub mod consts;
pub mod func;

pub mod hash_result;

// ingest/padding controller and word service
pub mod message;

// compression engines and the lane ring
pub mod engine;
pub mod pipeline;

pub mod hasher;

#[cfg(test)] mod test;

//! Query execution.
//!
//! Isolates SQL normalization, safety gating and execution from the
//! workflow controller.

pub mod executor;

pub use executor::SqlExecutor;

//! sqlpilot - natural-language questions answered with self-correcting SQL.
//!
//! This library exposes the core modules for the binary and the integration
//! tests.

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod llm;
pub mod logging;
pub mod query;
pub mod safety;
pub mod server;
pub mod workflow;

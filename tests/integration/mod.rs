//! Integration tests for sqlpilot.

pub mod jobs_test;
pub mod postgres_test;
pub mod workflow_test;

//! Integration tests - planner, builders and runner working together
//!
//! The runner is exercised against an in-memory executor; no ClickHouse
//! server is required.

mod migration_plan_tests;
mod modification_batch_tests;
mod runner_resume_tests;

//! Deterministic, pure logic shared by the control loop.
//!
//! Core modules perform no I/O and never read the clock themselves; instants
//! and random sources are passed in so every decision is reproducible in tests.

pub mod dash;
pub mod geometry;
pub mod leader;
pub mod planner;
pub mod portal;
pub mod snapshot;
pub mod task;

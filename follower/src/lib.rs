//! Leader-follow navigation engine.
//!
//! Keeps a controlled avatar near a leader: follows within a zone, crosses
//! zone boundaries when the leader does, picks up quest items and answers
//! recruit prompts on the way, and recovers when its view of the leader
//! desyncs from where the leader actually is. The engine only observes the
//! game through polled snapshots and only acts through discrete input
//! commands.
//!
//! - **[`core`]**: Pure, deterministic logic (geometry, tasks, leader
//!   tracking, portal choice, queue construction, dash decisions).
//! - **[`io`]**: Collaborator seams (world, path oracle, input), paced input
//!   sequences, the transition gate and configuration.
//!
//! Orchestration modules ([`executor`], [`grace`], [`autopilot`],
//! [`looping`], [`simulate`]) run the control loop on top of them.

pub mod autopilot;
pub mod core;
pub mod executor;
pub mod exit_codes;
pub mod grace;
pub mod io;
pub mod logging;
pub mod looping;
pub mod simulate;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

//! Side-effecting collaborators and the helpers that drive them.

pub mod actions;
pub mod config;
pub mod gate;
pub mod input;
pub mod timeline;
pub mod world;

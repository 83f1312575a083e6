//! Stable exit codes for follower CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed: invalid config, unreadable scenario or any other error.
pub const INVALID: i32 = 1;

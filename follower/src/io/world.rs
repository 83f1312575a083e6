//! Read-side collaborator seams: world polling and the terrain path oracle.
//!
//! Perception and terrain analysis live outside this crate. The control loop
//! only sees them through these traits; tests and `follower simulate` plug in
//! scripted implementations.

use std::sync::Arc;

use anyhow::Result;

pub use crate::core::dash::PathStatus;
use crate::core::geometry::{GridPos, ScreenPoint, WorldPos};
use crate::core::snapshot::WorldSnapshot;

/// Source of world snapshots.
pub trait World: Send + Sync {
    /// Capture the current state. Errors are transient: the caller skips the cycle.
    fn poll(&self) -> Result<WorldSnapshot>;

    /// Project a world position onto the screen, if it is currently on screen.
    fn to_screen(&self, position: WorldPos) -> Option<ScreenPoint>;
}

impl<T: World + ?Sized> World for Arc<T> {
    fn poll(&self) -> Result<WorldSnapshot> {
        (**self).poll()
    }

    fn to_screen(&self, position: WorldPos) -> Option<ScreenPoint> {
        (**self).to_screen(position)
    }
}

pub trait PathOracle: Send + Sync {
    fn path_status(&self, from: GridPos, to: GridPos) -> Result<PathStatus>;
}

/// Oracle that reports the same classification for every query.
#[derive(Debug, Clone, Copy)]
pub struct ConstantOracle(pub PathStatus);

impl PathOracle for ConstantOracle {
    fn path_status(&self, _from: GridPos, _to: GridPos) -> Result<PathStatus> {
        Ok(self.0)
    }
}

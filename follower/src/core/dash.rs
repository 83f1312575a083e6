//! Decide whether a movement step should dash instead of walk.
//!
//! Dashing is a targeted bypass for obstacles the oracle marks as dashable,
//! not a generic way out of blocked paths.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::geometry::GridPos;

/// Classification of the straight path between two grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStatus {
    Clear,
    Blocked,
    /// Obstructed by something a dash can cross.
    Dashable,
}

/// `[dash]` table of the follower config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashConfig {
    pub enabled: bool,
    /// Grid distance band in which dashing is considered.
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_distance: 10.0,
            max_distance: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DashDecision {
    Dash,
    Walk(WalkReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WalkReason {
    Disabled,
    NoPlayerGrid,
    OutOfBand { distance: f32 },
    Path(PathStatus),
    OracleFailed,
}

impl DashDecision {
    pub fn is_dash(&self) -> bool {
        matches!(self, DashDecision::Dash)
    }
}

/// Dash only when enabled, the target lies inside `[min, max]` grid distance,
/// and `path_status` reports the straight path as [`PathStatus::Dashable`].
///
/// `path_status` is only consulted once the cheaper checks pass.
pub fn should_dash<F>(
    config: &DashConfig,
    player: Option<GridPos>,
    target: GridPos,
    path_status: F,
) -> DashDecision
where
    F: FnOnce(GridPos, GridPos) -> Result<PathStatus>,
{
    if !config.enabled {
        return DashDecision::Walk(WalkReason::Disabled);
    }
    let Some(player) = player else {
        return DashDecision::Walk(WalkReason::NoPlayerGrid);
    };

    let distance = player.distance(&target);
    if distance < config.min_distance || distance > config.max_distance {
        debug!(distance, min = config.min_distance, max = config.max_distance, "dash out of band");
        return DashDecision::Walk(WalkReason::OutOfBand { distance });
    }

    match path_status(player, target) {
        Ok(PathStatus::Dashable) => DashDecision::Dash,
        Ok(status) => DashDecision::Walk(WalkReason::Path(status)),
        Err(err) => {
            warn!(error = %err, "path oracle failed; walking");
            DashDecision::Walk(WalkReason::OracleFailed)
        }
    }
}

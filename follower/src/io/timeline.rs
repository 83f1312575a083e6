//! Scripted world that replays a recorded timeline of snapshots.
//!
//! Backs `follower simulate` and the CLI tests. A scenario file is
//! JSON:
//!
//! ```json
//! {
//!   "path_status": "clear",
//!   "frames": [
//!     { "at_ms": 0, "snapshot": { "ready": true, "zone": { "name": "The Coast" } } },
//!     { "at_ms": 2500, "snapshot": { "ready": true, "zone": { "name": "The Ledge" } } }
//!   ]
//! }
//! ```
//!
//! Each poll returns the last frame whose `at_ms` has elapsed since the world
//! was started.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tokio::time::Instant;

use crate::core::geometry::{ScreenPoint, WorldPos};
use crate::core::snapshot::WorldSnapshot;
use crate::io::world::{PathStatus, World};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Answer given by the scripted path oracle.
    #[serde(default = "default_path_status")]
    pub path_status: PathStatus,
    /// Screen pixels per world unit for the flat top-down projection.
    #[serde(default = "default_screen_scale")]
    pub screen_scale: f32,
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    pub at_ms: u64,
    pub snapshot: WorldSnapshot,
}

fn default_path_status() -> PathStatus {
    PathStatus::Clear
}

fn default_screen_scale() -> f32 {
    0.5
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let scenario: Scenario =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    if scenario.frames.is_empty() {
        bail!("scenario {} has no frames", path.display());
    }
    Ok(scenario)
}

#[derive(Debug)]
pub struct TimelineWorld {
    frames: Vec<Frame>,
    screen_scale: f32,
    started: Instant,
}

impl TimelineWorld {
    pub fn new(mut frames: Vec<Frame>, screen_scale: f32) -> Self {
        frames.sort_by_key(|frame| frame.at_ms);
        Self {
            frames,
            screen_scale,
            started: Instant::now(),
        }
    }

    pub fn from_scenario(scenario: Scenario) -> Self {
        Self::new(scenario.frames, scenario.screen_scale)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Frame in effect right now.
    fn current(&self) -> Option<&Frame> {
        let elapsed = self.elapsed().as_millis() as u64;
        self.frames
            .iter()
            .take_while(|frame| frame.at_ms <= elapsed)
            .last()
    }
}

impl World for TimelineWorld {
    fn poll(&self) -> Result<WorldSnapshot> {
        self.current()
            .map(|frame| frame.snapshot.clone())
            .ok_or_else(|| anyhow!("no frame scheduled at {:?}", self.elapsed()))
    }

    /// Flat projection centred on the local player, clamped to the window.
    fn to_screen(&self, position: WorldPos) -> Option<ScreenPoint> {
        let snapshot = &self.current()?.snapshot;
        let window = snapshot.window;
        if window.is_empty() {
            return None;
        }
        let origin = window.center();
        let player = snapshot.player.position;
        let x = origin.x + (position.x - player.x) * self.screen_scale;
        let y = origin.y + (position.y - player.y) * self.screen_scale;
        Some(ScreenPoint::new(
            x.clamp(window.left, window.left + window.width),
            y.clamp(window.top, window.top + window.height),
        ))
    }
}

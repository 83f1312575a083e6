//! Test-only helpers: snapshot builders and a mutable in-memory world.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::TempDir;

use crate::core::geometry::{ScreenPoint, ScreenRect, WorldPos};
use crate::core::snapshot::{
    Avatar, GroundLabel, LocalPlayer, RosterEntry, WorldSnapshot, ZoneInfo,
};
use crate::io::config::{FollowerConfig, write_config};
use crate::io::world::World;

pub const LEADER: &str = "Leader";
pub const FOLLOWER: &str = "Follower";

/// Ready snapshot with the local player at the origin of `zone`.
pub fn base_snapshot(zone: &str) -> WorldSnapshot {
    WorldSnapshot {
        ready: true,
        player: LocalPlayer {
            name: FOLLOWER.to_string(),
            position: WorldPos::default(),
            grid: None,
            alive: true,
        },
        zone: ZoneInfo {
            name: zone.to_string(),
            is_hideout: false,
            tier: 10,
            area_hash: 1,
        },
        window: ScreenRect::new(0.0, 0.0, 1280.0, 720.0),
        ..WorldSnapshot::default()
    }
}

/// Leader visible `leader_x` units east of the player, roster in the same zone.
pub fn synced_snapshot(zone: &str, leader_x: f32) -> WorldSnapshot {
    WorldSnapshot {
        avatars: vec![leader_avatar(leader_x)],
        roster: vec![roster_entry(LEADER, zone)],
        ..base_snapshot(zone)
    }
}

/// Leader absent from the local zone, roster reporting `leader_zone`.
pub fn departed_snapshot(zone: &str, leader_zone: &str) -> WorldSnapshot {
    WorldSnapshot {
        roster: vec![roster_entry(LEADER, leader_zone)],
        ..base_snapshot(zone)
    }
}

pub fn leader_avatar(x: f32) -> Avatar {
    Avatar {
        name: LEADER.to_string(),
        position: WorldPos::new(x, 0.0, 0.0),
    }
}

pub fn roster_entry(name: &str, zone: &str) -> RosterEntry {
    RosterEntry {
        name: name.to_string(),
        zone: zone.to_string(),
        teleport: Some(ScreenRect::new(20.0, 120.0, 24.0, 24.0)),
    }
}

/// Live area-transition label `x` units east of the player.
pub fn portal_label(id: u64, text: &str, x: f32) -> GroundLabel {
    GroundLabel {
        id,
        metadata: "Metadata/MiscObjects/AreaTransition".to_string(),
        text: text.to_string(),
        position: WorldPos::new(x, 0.0, 0.0),
        rect: ScreenRect::new(600.0, 300.0, 80.0, 20.0),
        visible: true,
        valid: true,
        ..GroundLabel::default()
    }
}

/// World whose snapshot tests can rewrite between cycles.
///
/// `to_screen` maps world units one-to-one around the window centre.
#[derive(Debug)]
pub struct SharedWorld {
    snapshot: Mutex<WorldSnapshot>,
}

impl SharedWorld {
    pub fn new(snapshot: WorldSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    pub fn update(&self, edit: impl FnOnce(&mut WorldSnapshot)) {
        let mut guard = self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        edit(&mut *guard);
    }

    pub fn replace(&self, snapshot: WorldSnapshot) {
        self.update(|current| *current = snapshot);
    }

    pub fn current(&self) -> WorldSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl World for SharedWorld {
    fn poll(&self) -> Result<WorldSnapshot> {
        Ok(self.current())
    }

    fn to_screen(&self, position: WorldPos) -> Option<ScreenPoint> {
        let snapshot = self.current();
        let center = snapshot.window.center();
        let player = snapshot.player.position;
        Some(ScreenPoint::new(
            center.x + position.x - player.x,
            center.y + position.y - player.y,
        ))
    }
}

/// Scratch directory for CLI tests.
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create tempdir")?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, name: &str, config: &FollowerConfig) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        write_config(&path, config)?;
        Ok(path)
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        let payload = serde_json::to_string_pretty(value).context("serialize json")?;
        std::fs::write(&path, payload).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

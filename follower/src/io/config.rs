//! Follower configuration stored as TOML (default `follower.toml`).

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use crate::core::dash::DashConfig;
use crate::core::planner::FollowRules;
use crate::io::input::Key;

/// Follower configuration (TOML).
///
/// Edited by humans; missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FollowerConfig {
    /// Party member to follow (matched case-insensitively).
    pub leader_name: String,

    /// Desired maximum follow distance once the leader is nearby.
    pub keep_within_distance: f32,

    /// Beyond this distance the leader counts as "far" and long-range logic applies.
    pub transition_distance: f32,

    /// Keep closing the gap even when the leader is inside `transition_distance`.
    pub close_follow: bool,

    /// How long a changed roster zone must hold before it is trusted.
    pub zone_update_buffer_ms: u64,

    /// Base delay between discrete inputs.
    pub input_frequency_ms: u64,

    /// Pause at the end of every control cycle.
    pub cycle_delay_ms: u64,

    /// Pause when the game is not ready for input.
    pub idle_delay_ms: u64,

    pub keys: KeyConfig,
    pub dash: DashConfig,
    pub grace: GraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeyConfig {
    pub move_key: Key,
    pub dash_key: Key,
}

/// Post-transition grace period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraceConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            move_key: Key::new("T"),
            dash_key: Key::new("W"),
        }
    }
}

impl Default for GraceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            poll_interval_ms: 100,
        }
    }
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            leader_name: String::new(),
            keep_within_distance: 150.0,
            transition_distance: 500.0,
            close_follow: true,
            zone_update_buffer_ms: 2_000,
            input_frequency_ms: 50,
            cycle_delay_ms: 50,
            idle_delay_ms: 100,
            keys: KeyConfig::default(),
            dash: DashConfig::default(),
            grace: GraceConfig::default(),
        }
    }
}

impl GraceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl FollowerConfig {
    /// The subset of the config the planner works from.
    pub fn follow_rules(&self) -> FollowRules {
        FollowRules {
            keep_within: self.keep_within_distance,
            transition: self.transition_distance,
            close_follow: self.close_follow,
            zone_update_buffer: self.zone_update_buffer(),
        }
    }

    pub fn zone_update_buffer(&self) -> Duration {
        Duration::from_millis(self.zone_update_buffer_ms)
    }

    pub fn input_frequency(&self) -> Duration {
        Duration::from_millis(self.input_frequency_ms)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.keep_within_distance.is_nan() || self.keep_within_distance <= 0.0 {
            return Err(anyhow!("keep_within_distance must be > 0"));
        }
        if self.transition_distance.is_nan() || self.transition_distance <= 0.0 {
            return Err(anyhow!("transition_distance must be > 0"));
        }
        if self.cycle_delay_ms == 0 {
            return Err(anyhow!("cycle_delay_ms must be > 0"));
        }
        if self.idle_delay_ms == 0 {
            return Err(anyhow!("idle_delay_ms must be > 0"));
        }
        if self.keys.move_key.is_empty() {
            return Err(anyhow!("keys.move_key must be a non-empty key name"));
        }
        if self.dash.enabled && self.keys.dash_key.is_empty() {
            return Err(anyhow!("keys.dash_key must be set when dash is enabled"));
        }
        if self.dash.min_distance < 0.0 || self.dash.min_distance > self.dash.max_distance {
            return Err(anyhow!(
                "dash band invalid: min_distance {} must be within 0..=max_distance {}",
                self.dash.min_distance,
                self.dash.max_distance
            ));
        }
        if self.grace.timeout_ms == 0 {
            return Err(anyhow!("grace.timeout_ms must be > 0"));
        }
        if self.grace.poll_interval_ms == 0 {
            return Err(anyhow!("grace.poll_interval_ms must be > 0"));
        }
        if self.transition_distance <= self.keep_within_distance {
            warn!(
                transition_distance = self.transition_distance,
                keep_within_distance = self.keep_within_distance,
                "transition_distance should be greater than keep_within_distance"
            );
        }
        Ok(())
    }
}

/// Read the follower config at `path`.
///
/// A missing file is not an error: the follower runs on defaults until
/// `follower init-config` writes one. Parse and validation failures are.
pub fn load_config(path: &Path) -> Result<FollowerConfig> {
    let cfg = match fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<FollowerConfig>(&contents)
            .with_context(|| format!("parse {}", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => FollowerConfig::default(),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    cfg.validate()
        .with_context(|| format!("invalid follower config {}", path.display()))?;
    Ok(cfg)
}

/// Validate `cfg` and write it as TOML, replacing `path` in one rename so a
/// follower reading the file never sees a half-written table.
pub fn write_config(path: &Path, cfg: &FollowerConfig) -> Result<()> {
    cfg.validate()?;
    let body = toml::to_string_pretty(cfg).context("serialize follower config")?;
    replace_file(path, &format!("{body}\n"))
}

fn replace_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    let staged = path.with_extension("toml.tmp");
    fs::write(&staged, contents).with_context(|| format!("stage {}", staged.display()))?;
    fs::rename(&staged, path).with_context(|| format!("replace {}", path.display()))
}

//! Leader resolution and the zone-change reliability buffer.

use std::time::Duration;

use tokio::time::Instant;

use crate::core::snapshot::{Avatar, RosterEntry, WorldSnapshot};

/// Leader state derived from a single snapshot. Never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LeaderState {
    /// The leader's avatar, only when it is resolvable in the local zone.
    pub live: Option<Avatar>,
    /// The leader's party list entry. Independent of `live`.
    pub roster: Option<RosterEntry>,
}

impl LeaderState {
    /// Roster zone equals the zone we are standing in.
    pub fn roster_in_zone(&self, current_zone: &str) -> bool {
        self.roster
            .as_ref()
            .is_some_and(|entry| entry.zone == current_zone)
    }

    /// Leader is fully synced: roster and avatar resolved, same zone as us.
    pub fn is_synced(&self, current_zone: &str) -> bool {
        self.live.is_some() && self.roster_in_zone(current_zone)
    }
}

/// Resolve the leader's avatar and roster entry by case-insensitive name.
///
/// The two lookups are independent; either may come back empty. The local
/// player's own avatar is never returned even if it carries the leader name.
pub fn resolve_leader(snapshot: &WorldSnapshot, leader_name: &str) -> LeaderState {
    if leader_name.trim().is_empty() {
        return LeaderState::default();
    }

    let own_name = snapshot.player.name.as_str();
    let live = snapshot
        .avatars
        .iter()
        .filter(|avatar| !avatar.name.eq_ignore_ascii_case(own_name))
        .find(|avatar| avatar.name.eq_ignore_ascii_case(leader_name))
        .cloned();
    let roster = snapshot
        .roster
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(leader_name))
        .cloned();

    LeaderState { live, roster }
}

/// Debounces the roster's zone field, which updates asynchronously and can
/// briefly report stale values after the leader moves.
#[derive(Debug, Clone, Default)]
pub struct ReliabilityBuffer {
    last_zone: String,
    changed_at: Option<Instant>,
}

impl ReliabilityBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest roster zone. Returns true when the value changed.
    pub fn observe(&mut self, zone: &str, now: Instant) -> bool {
        if self.last_zone == zone {
            return false;
        }
        self.last_zone = zone.to_string();
        self.changed_at = Some(now);
        true
    }

    /// The reading is trustworthy once it is non-empty, differs from our zone,
    /// and has held steady for at least `window`.
    pub fn is_reliable(&self, zone: &str, current_zone: &str, now: Instant, window: Duration) -> bool {
        if zone.is_empty() || zone == current_zone {
            return false;
        }
        match self.changed_at {
            Some(changed_at) => now.saturating_duration_since(changed_at) >= window,
            None => true,
        }
    }

    /// Time left before the current reading becomes trustworthy.
    pub fn remaining(&self, now: Instant, window: Duration) -> Duration {
        match self.changed_at {
            Some(changed_at) => window.saturating_sub(now.saturating_duration_since(changed_at)),
            None => Duration::ZERO,
        }
    }

    pub fn last_zone(&self) -> &str {
        &self.last_zone
    }

    pub fn clear(&mut self) {
        self.last_zone.clear();
        self.changed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::WorldPos;
    use crate::core::snapshot::LocalPlayer;

    fn snapshot_with(avatars: &[&str], roster: &[(&str, &str)]) -> WorldSnapshot {
        WorldSnapshot {
            player: LocalPlayer {
                name: "Follower".to_string(),
                alive: true,
                ..LocalPlayer::default()
            },
            avatars: avatars
                .iter()
                .map(|name| Avatar {
                    name: name.to_string(),
                    position: WorldPos::default(),
                })
                .collect(),
            roster: roster
                .iter()
                .map(|(name, zone)| RosterEntry {
                    name: name.to_string(),
                    zone: zone.to_string(),
                    teleport: None,
                })
                .collect(),
            ..WorldSnapshot::default()
        }
    }

    #[test]
    fn resolves_leader_case_insensitively() {
        let snapshot = snapshot_with(&["Someone", "LeAdEr"], &[("leader", "The Ledge")]);
        let state = resolve_leader(&snapshot, "Leader");
        assert_eq!(state.live.expect("live").name, "LeAdEr");
        assert_eq!(state.roster.expect("roster").zone, "The Ledge");
    }

    #[test]
    fn roster_resolves_without_live_avatar() {
        let snapshot = snapshot_with(&["Someone"], &[("Leader", "The Climb")]);
        let state = resolve_leader(&snapshot, "leader");
        assert!(state.live.is_none());
        assert!(state.roster.is_some());
    }

    #[test]
    fn never_resolves_own_avatar() {
        let snapshot = snapshot_with(&["Follower"], &[]);
        let state = resolve_leader(&snapshot, "follower");
        assert!(state.live.is_none());
    }

    #[test]
    fn empty_leader_name_resolves_nothing() {
        let snapshot = snapshot_with(&[""], &[("", "Zone")]);
        assert_eq!(resolve_leader(&snapshot, "  "), LeaderState::default());
    }

    #[test]
    fn reliability_requires_window_to_elapse() {
        let window = Duration::from_millis(2000);
        let start = Instant::now();
        let mut buffer = ReliabilityBuffer::new();

        assert!(buffer.observe("Zone2", start));
        assert!(!buffer.is_reliable("Zone2", "Zone1", start + Duration::from_millis(1999), window));
        assert!(buffer.is_reliable("Zone2", "Zone1", start + Duration::from_millis(2000), window));
    }

    #[test]
    fn repeated_observation_does_not_reset_timer() {
        let window = Duration::from_millis(500);
        let start = Instant::now();
        let mut buffer = ReliabilityBuffer::new();
        buffer.observe("Zone2", start);
        assert!(!buffer.observe("Zone2", start + Duration::from_millis(400)));
        assert!(buffer.is_reliable("Zone2", "Zone1", start + Duration::from_millis(500), window));
    }

    #[test]
    fn same_or_empty_zone_is_never_reliable() {
        let window = Duration::ZERO;
        let now = Instant::now();
        let buffer = ReliabilityBuffer::new();
        assert!(!buffer.is_reliable("", "Zone1", now, window));
        assert!(!buffer.is_reliable("Zone1", "Zone1", now, window));
    }

    #[test]
    fn clear_forgets_last_zone() {
        let now = Instant::now();
        let mut buffer = ReliabilityBuffer::new();
        buffer.observe("Zone2", now);
        buffer.clear();
        assert_eq!(buffer.last_zone(), "");
        assert_eq!(buffer.remaining(now, Duration::from_secs(2)), Duration::ZERO);
    }
}

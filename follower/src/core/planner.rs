//! Per-cycle queue construction: turn the leader's state into queued tasks.
//!
//! The planner never issues input itself. When the leader left the zone and
//! no portal qualifies it hands the direct teleport back to the caller.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::core::geometry::WorldPos;
use crate::core::leader::{LeaderState, ReliabilityBuffer};
use crate::core::portal::resolve_portal;
use crate::core::snapshot::{RosterEntry, WorldSnapshot};
use crate::core::task::{LabelRef, Task, TaskQueue, TaskType};

/// A portal this close to the player is preferred over walking after the
/// leader jumped away.
pub const NEARBY_PORTAL_RADIUS: f32 = 80.0;
/// Arrival radius of a Transition created from the far-leader branch.
pub const NEARBY_PORTAL_ARRIVAL: f32 = 200.0;
/// Lower bound of the "stationary but far" band.
pub const STATIONARY_MIN_DISTANCE: f32 = 200.0;
/// Upper bound of the "stationary but far" band, also the displacement limit.
pub const STATIONARY_MAX_DISTANCE: f32 = 2000.0;

/// What the planner decided this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// The leader has no roster entry; nothing can be decided.
    NoRoster,
    /// The leader's zone reading is still inside the reliability window.
    Deferred { remaining: Duration },
    /// The leader left and no portal qualifies: click the roster teleport control.
    Teleport(RosterEntry),
    /// Zero or more tasks were appended to the queue.
    Planned { added: usize },
}

/// Follow distances and the zone-change settle window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowRules {
    pub keep_within: f32,
    pub transition: f32,
    pub close_follow: bool,
    pub zone_update_buffer: Duration,
}

/// Inputs for one planning pass.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub snapshot: &'a WorldSnapshot,
    pub leader: &'a LeaderState,
    pub rules: FollowRules,
    /// The transition gate was engaged when the cycle started.
    pub gate_engaged: bool,
    pub now: Instant,
}

/// Queue construction state carried between cycles.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    buffer: ReliabilityBuffer,
    last_leader_pos: Option<WorldPos>,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_leader_pos(&self) -> Option<WorldPos> {
        self.last_leader_pos
    }

    pub fn buffer(&self) -> &ReliabilityBuffer {
        &self.buffer
    }

    /// Forget the leader's last position (after an area change).
    pub fn forget_leader(&mut self) {
        self.last_leader_pos = None;
    }

    pub fn plan<R: Rng + ?Sized>(
        &mut self,
        queue: &mut TaskQueue,
        ctx: &PlanContext<'_>,
        rng: &mut R,
    ) -> PlanOutcome {
        let Some(roster) = ctx.leader.roster.as_ref() else {
            debug!("leader has no roster entry");
            return PlanOutcome::NoRoster;
        };
        let current_zone = ctx.snapshot.zone.name.as_str();

        match &ctx.leader.live {
            None if roster.zone != current_zone && !ctx.gate_engaged => {
                self.plan_leader_left(queue, ctx, roster, rng)
            }
            None => PlanOutcome::Planned { added: 0 },
            Some(avatar) => {
                let added = self.plan_leader_present(queue, ctx, roster, avatar.position, rng);
                self.last_leader_pos = Some(avatar.position);
                PlanOutcome::Planned { added }
            }
        }
    }

    fn plan_leader_left<R: Rng + ?Sized>(
        &mut self,
        queue: &mut TaskQueue,
        ctx: &PlanContext<'_>,
        roster: &RosterEntry,
        rng: &mut R,
    ) -> PlanOutcome {
        let window = ctx.rules.zone_update_buffer;
        if self.buffer.observe(&roster.zone, ctx.now) {
            info!(zone = %roster.zone, "leader zone changed; waiting for it to settle");
        }
        if !self
            .buffer
            .is_reliable(&roster.zone, &ctx.snapshot.zone.name, ctx.now, window)
        {
            let remaining = self.buffer.remaining(ctx.now, window);
            debug!(zone = %roster.zone, ?remaining, "leader zone not reliable yet");
            return PlanOutcome::Deferred { remaining };
        }

        match resolve_portal(ctx.snapshot, roster, self.anchor(ctx.snapshot), rng) {
            Some(choice) => {
                if queue.contains_type(TaskType::Transition) {
                    return PlanOutcome::Planned { added: 0 };
                }
                info!(
                    portal = %choice.label.text,
                    distance = choice.distance_to_player,
                    rules = ?choice.rules,
                    "following leader through portal"
                );
                queue.push(Task::transition(
                    choice.label,
                    ctx.rules.keep_within,
                ));
                PlanOutcome::Planned { added: 1 }
            }
            None => {
                info!(zone = %roster.zone, "no portal towards leader; teleporting");
                PlanOutcome::Teleport(roster.clone())
            }
        }
    }

    /// Plan around a visible leader. Returns how many tasks were appended;
    /// purged tasks are not subtracted.
    fn plan_leader_present<R: Rng + ?Sized>(
        &mut self,
        queue: &mut TaskQueue,
        ctx: &PlanContext<'_>,
        roster: &RosterEntry,
        leader_pos: WorldPos,
        rng: &mut R,
    ) -> usize {
        let rules = ctx.rules;
        let snapshot = ctx.snapshot;
        if !ctx.gate_engaged {
            self.buffer.clear();
        }

        let keep_within = rules.keep_within;
        let transition = rules.transition;
        let distance = snapshot.player.position.distance(&leader_pos);

        if distance >= transition {
            let task = self.plan_far_leader(queue, ctx, roster, leader_pos, distance, rng);
            return task.map_or(0, |task| {
                queue.push(task);
                1
            });
        }

        let purged = queue.purge_long_range();
        if purged > 0 {
            debug!(purged, "leader nearby; dropped long-range tasks");
        }
        let mut added = 0;
        if rules.close_follow && distance >= keep_within {
            queue.push(Task::movement(leader_pos, keep_within));
            added += 1;
        }

        if snapshot.zone.is_hideout {
            return added;
        }
        let player = snapshot.player.position;
        if !queue.contains_type(TaskType::Loot) {
            if let Some(item) = snapshot
                .nearest_quest_item()
                .filter(|item| item.position.distance(&player) < transition)
            {
                debug!(item = %item.text, "queueing quest item pickup");
                queue.push(Task::loot(item.position, transition));
                added += 1;
            }
        }
        if !queue.contains_type(TaskType::FactionOptIn) {
            if let Some(label) = snapshot
                .nearest_recruit()
                .filter(|label| label.position.distance(&player) < transition)
            {
                debug!(label = %label.text, "queueing recruit opt-in");
                queue.push(Task::faction_opt_in(LabelRef::from(label), transition));
                added += 1;
            }
        }
        added
    }

    /// At most one task towards a leader beyond the transition distance.
    fn plan_far_leader<R: Rng + ?Sized>(
        &self,
        queue: &TaskQueue,
        ctx: &PlanContext<'_>,
        roster: &RosterEntry,
        leader_pos: WorldPos,
        distance: f32,
        rng: &mut R,
    ) -> Option<Task> {
        let snapshot = ctx.snapshot;
        let keep_within = ctx.rules.keep_within;
        let moved = self.last_leader_pos.map(|last| last.distance(&leader_pos));
        match moved {
            Some(moved) if moved > ctx.rules.transition => {
                let portal = if ctx.gate_engaged {
                    None
                } else {
                    resolve_portal(snapshot, roster, self.anchor(snapshot), rng)
                        .filter(|choice| choice.distance_to_player < NEARBY_PORTAL_RADIUS)
                };
                match portal {
                    Some(choice) => {
                        debug!(portal = %choice.label.text, "leader jumped; portal nearby");
                        Some(Task::transition(choice.label, NEARBY_PORTAL_ARRIVAL))
                    }
                    None => {
                        debug!(moved, "leader jumped; walking after");
                        Some(Task::movement(leader_pos, keep_within))
                    }
                }
            }
            _ if queue.is_empty() => {
                let moved = moved.unwrap_or(0.0);
                let stationary_far = moved < STATIONARY_MAX_DISTANCE
                    && distance > STATIONARY_MIN_DISTANCE
                    && distance < STATIONARY_MAX_DISTANCE;
                stationary_far.then(|| {
                    debug!(distance, "leader stationary but far");
                    Task::movement(leader_pos, keep_within)
                })
            }
            _ => {
                let spaced = queue
                    .last_target()
                    .is_none_or(|last| last.distance(&leader_pos) >= keep_within);
                spaced.then(|| {
                    debug!(queued = queue.len(), "adding waypoint");
                    Task::movement(leader_pos, keep_within)
                })
            }
        }
    }

    /// Portals are ranked against where the leader was last seen.
    fn anchor(&self, snapshot: &WorldSnapshot) -> WorldPos {
        self.last_leader_pos.unwrap_or(snapshot.player.position)
    }
}

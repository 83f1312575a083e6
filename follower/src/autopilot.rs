//! One control cycle: poll, plan, execute, housekeeping.
//!
//! [`AutoPilot`] owns the task queue and every piece of cross-cycle state.
//! The only thing shared with another task is the [`TransitionGate`], which
//! the spawned grace monitor releases.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::core::geometry::WorldPos;
use crate::core::leader::resolve_leader;
use crate::core::planner::{PlanContext, PlanOutcome, Planner};
use crate::core::snapshot::WorldSnapshot;
use crate::core::task::TaskQueue;
use crate::executor::{StepEnv, StepOutcome, advance};
use crate::grace::{GraceOutcome, run_grace_period};
use crate::io::actions::{Pacer, teleport_to_leader};
use crate::io::config::FollowerConfig;
use crate::io::gate::TransitionGate;
use crate::io::input::InputEffector;
use crate::io::world::{PathOracle, World};

/// Pause while no leader name is configured.
pub const LEADER_UNSET_DELAY: Duration = Duration::from_millis(1000);
/// Pause when the leader has no roster entry.
pub const NO_ROSTER_DELAY: Duration = Duration::from_millis(100);
/// Pause while the leader's zone reading settles.
pub const DEFERRED_DELAY: Duration = Duration::from_millis(200);

/// Identity of the loaded area instance.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AreaKey {
    name: String,
    hash: u64,
}

impl AreaKey {
    fn of(snapshot: &WorldSnapshot) -> Self {
        Self {
            name: snapshot.zone.name.clone(),
            hash: snapshot.zone.area_hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleStatus {
    /// The world could not be polled.
    PollFailed,
    /// Game not ready for input or the player is dead.
    NotReady,
    LeaderUnset,
    /// A full cycle ran. `step` is `None` when execution was skipped.
    Ran {
        plan: PlanOutcome,
        step: Option<StepOutcome>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub status: CycleStatus,
    /// A new area instance was observed this cycle.
    pub area_changed: bool,
    /// A grace monitor finished since the previous cycle.
    pub grace: Option<GraceOutcome>,
}

impl CycleReport {
    fn new(status: CycleStatus) -> Self {
        Self {
            status,
            area_changed: false,
            grace: None,
        }
    }
}

pub struct AutoPilot<W, I, P> {
    world: Arc<W>,
    input: Arc<I>,
    oracle: Arc<P>,
    config: FollowerConfig,
    queue: TaskQueue,
    planner: Planner,
    gate: TransitionGate,
    pacer: Pacer,
    last_player_pos: Option<WorldPos>,
    last_area: Option<AreaKey>,
    grace: Option<JoinHandle<GraceOutcome>>,
    gate_unwatched_since: Option<Instant>,
}

impl<W, I, P> AutoPilot<W, I, P>
where
    W: World + 'static,
    I: InputEffector + 'static,
    P: PathOracle,
{
    pub fn new(
        world: Arc<W>,
        input: Arc<I>,
        oracle: Arc<P>,
        config: FollowerConfig,
        rng: StdRng,
    ) -> Self {
        let pacer = Pacer::new(rng, config.input_frequency());
        Self {
            world,
            input,
            oracle,
            config,
            queue: TaskQueue::new(),
            planner: Planner::new(),
            gate: TransitionGate::new(),
            pacer,
            last_player_pos: None,
            last_area: None,
            grace: None,
            gate_unwatched_since: None,
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn gate(&self) -> &TransitionGate {
        &self.gate
    }

    pub fn config(&self) -> &FollowerConfig {
        &self.config
    }

    pub fn grace_running(&self) -> bool {
        self.grace.is_some()
    }

    /// Run one control cycle, including its trailing waits.
    pub async fn cycle(&mut self) -> CycleReport {
        let grace = self.reap_grace().await;
        let mut report = self.cycle_inner().await;
        // Every exit path, including skipped cycles, counts towards the gate timeout.
        self.watch_gate();
        report.grace = grace;
        report
    }

    async fn cycle_inner(&mut self) -> CycleReport {
        let snapshot = match self.world.poll() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "world poll failed");
                sleep(self.config.idle_delay()).await;
                return CycleReport::new(CycleStatus::PollFailed);
            }
        };
        if !snapshot.ready || !snapshot.player.alive {
            sleep(self.config.idle_delay()).await;
            return CycleReport::new(CycleStatus::NotReady);
        }
        if self.config.leader_name.trim().is_empty() {
            warn!("leader name is not configured");
            sleep(LEADER_UNSET_DELAY).await;
            return CycleReport::new(CycleStatus::LeaderUnset);
        }

        let area_changed = self.track_area(&snapshot);
        let leader = resolve_leader(&snapshot, &self.config.leader_name);
        let ctx = PlanContext {
            snapshot: &snapshot,
            leader: &leader,
            rules: self.config.follow_rules(),
            gate_engaged: self.gate.is_engaged(),
            now: Instant::now(),
        };
        let plan = self
            .planner
            .plan(&mut self.queue, &ctx, self.pacer.rng());

        match &plan {
            PlanOutcome::NoRoster => {
                sleep(NO_ROSTER_DELAY).await;
                return CycleReport {
                    area_changed,
                    ..CycleReport::new(CycleStatus::Ran { plan, step: None })
                };
            }
            PlanOutcome::Deferred { .. } => sleep(DEFERRED_DELAY).await,
            PlanOutcome::Teleport(entry) => {
                let attempt = teleport_to_leader(self.input.as_ref(), &snapshot, entry).await;
                debug!(?attempt, "teleport to leader");
            }
            PlanOutcome::Planned { .. } => {}
        }

        let mut env = StepEnv {
            world: self.world.as_ref(),
            input: self.input.as_ref(),
            oracle: self.oracle.as_ref(),
            config: &self.config,
            gate: &self.gate,
            pacer: &mut self.pacer,
            last_player_pos: self.last_player_pos,
        };
        let step = advance(&mut self.queue, &mut env, &snapshot).await;

        self.last_player_pos = Some(snapshot.player.position);
        sleep(self.config.cycle_delay()).await;

        CycleReport {
            area_changed,
            ..CycleReport::new(CycleStatus::Ran {
                plan,
                step: Some(step),
            })
        }
    }

    /// Detect a newly loaded area. Returns true on change.
    fn track_area(&mut self, snapshot: &WorldSnapshot) -> bool {
        let key = AreaKey::of(snapshot);
        let changed = self.last_area.as_ref().is_some_and(|last| *last != key);
        self.last_area = Some(key);
        if changed {
            self.on_area_change();
        }
        changed
    }

    /// Reset pathing for the new area and, if we caused the change, start the
    /// grace monitor.
    pub fn on_area_change(&mut self) {
        info!(gate = self.gate.is_engaged(), "area changed");
        if self.gate.is_engaged() && self.grace.is_none() {
            let world = Arc::clone(&self.world);
            let input = Arc::clone(&self.input);
            let gate = self.gate.clone();
            let leader = self.config.leader_name.clone();
            let grace = self.config.grace.clone();
            self.grace = Some(tokio::spawn(async move {
                run_grace_period(world.as_ref(), input.as_ref(), &gate, &leader, &grace).await
            }));
        }
        self.queue.clear();
        self.planner.forget_leader();
        self.last_player_pos = None;
    }

    async fn reap_grace(&mut self) -> Option<GraceOutcome> {
        if !self.grace.as_ref().is_some_and(JoinHandle::is_finished) {
            return None;
        }
        let handle = self.grace.take()?;
        match handle.await {
            Ok(outcome) => {
                info!(?outcome, "grace period finished");
                Some(outcome)
            }
            Err(err) => {
                warn!(error = %err, "grace monitor failed");
                self.gate.release();
                None
            }
        }
    }

    /// Release a gate nobody will release: engaged for a full grace timeout
    /// with no monitor running (the area never changed).
    fn watch_gate(&mut self) {
        if !self.gate.is_engaged() || self.grace.is_some() {
            self.gate_unwatched_since = None;
            return;
        }
        let now = Instant::now();
        let since = *self.gate_unwatched_since.get_or_insert(now);
        if now.saturating_duration_since(since) >= self.config.grace.timeout() {
            warn!("transition gate engaged without an area change; releasing");
            self.gate.release();
            self.gate_unwatched_since = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        SharedWorld, departed_snapshot, leader_avatar, portal_label, roster_entry, synced_snapshot,
    };
    use crate::io::input::RecordingInput;
    use crate::io::world::{ConstantOracle, PathStatus};
    use rand::SeedableRng;

    fn pilot(
        world: &Arc<SharedWorld>,
        config: FollowerConfig,
    ) -> (
        AutoPilot<SharedWorld, RecordingInput, ConstantOracle>,
        Arc<RecordingInput>,
    ) {
        let input = Arc::new(RecordingInput::new());
        let pilot = AutoPilot::new(
            Arc::clone(world),
            Arc::clone(&input),
            Arc::new(ConstantOracle(PathStatus::Clear)),
            config,
            StdRng::seed_from_u64(1),
        );
        (pilot, input)
    }

    fn config() -> FollowerConfig {
        FollowerConfig {
            leader_name: "Leader".to_string(),
            ..FollowerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn not_ready_cycle_does_nothing() {
        let mut snapshot = synced_snapshot("Zone1", 100.0);
        snapshot.ready = false;
        let world = Arc::new(SharedWorld::new(snapshot));
        let (mut pilot, input) = pilot(&world, config());

        assert_eq!(pilot.cycle().await.status, CycleStatus::NotReady);
        assert!(input.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unset_leader_name_waits() {
        let world = Arc::new(SharedWorld::new(synced_snapshot("Zone1", 100.0)));
        let (mut pilot, _input) = pilot(&world, FollowerConfig::default());
        let started = Instant::now();

        assert_eq!(pilot.cycle().await.status, CycleStatus::LeaderUnset);
        assert!(started.elapsed() >= LEADER_UNSET_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_roster_skips_execution() {
        let mut snapshot = synced_snapshot("Zone1", 400.0);
        snapshot.roster.clear();
        let world = Arc::new(SharedWorld::new(snapshot));
        let (mut pilot, input) = pilot(&world, config());

        let report = pilot.cycle().await;
        assert_eq!(
            report.status,
            CycleStatus::Ran {
                plan: PlanOutcome::NoRoster,
                step: None
            }
        );
        assert!(input.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn area_change_resets_queue_and_spawns_monitor_when_gated() {
        let world = Arc::new(SharedWorld::new(synced_snapshot("Zone1", 1000.0)));
        let (mut pilot, _input) = pilot(&world, config());
        pilot.cycle().await;
        assert_eq!(pilot.queue().len(), 1);

        pilot.gate().engage();
        world.update(|snapshot| {
            snapshot.zone.name = "Zone2".to_string();
            snapshot.zone.area_hash = 2;
            snapshot.avatars.clear();
            snapshot.roster = vec![roster_entry("Leader", "Zone1")];
        });
        let report = pilot.cycle().await;
        assert!(report.area_changed);
        assert!(pilot.grace_running());
        assert!(pilot.queue().is_empty());

        world.update(|snapshot| {
            snapshot.avatars = vec![leader_avatar(50.0)];
            snapshot.roster = vec![roster_entry("Leader", "Zone2")];
        });
        let mut finished = None;
        for _ in 0..10 {
            let report = pilot.cycle().await;
            if report.grace.is_some() {
                finished = report.grace;
                break;
            }
        }
        assert!(matches!(finished, Some(GraceOutcome::Resolved { .. })));
        assert!(!pilot.gate().is_engaged());
    }

    #[tokio::test(start_paused = true)]
    async fn orphaned_gate_is_released_after_grace_timeout() {
        let world = Arc::new(SharedWorld::new(synced_snapshot("Zone1", 50.0)));
        let (mut pilot, _input) = pilot(&world, config());
        pilot.gate().engage();
        let started = Instant::now();

        while pilot.gate().is_engaged() {
            pilot.cycle().await;
            assert!(started.elapsed() < Duration::from_secs(11), "gate never released");
        }
        assert!(!pilot.grace_running());
    }

    #[tokio::test(start_paused = true)]
    async fn gate_is_released_when_roster_entry_disappears_after_portal_click() {
        let mut snapshot = departed_snapshot("Zone1", "Zone2");
        snapshot.ground = vec![portal_label(5, "Zone2", 60.0)];
        let world = Arc::new(SharedWorld::new(snapshot));
        let (mut pilot, input) = pilot(&world, config());

        while !pilot.gate().is_engaged() {
            pilot.cycle().await;
        }
        assert_eq!(input.clicks(), 1);

        world.update(|snapshot| snapshot.roster.clear());
        let engaged_at = Instant::now();
        while pilot.gate().is_engaged() {
            let report = pilot.cycle().await;
            assert_eq!(
                report.status,
                CycleStatus::Ran {
                    plan: PlanOutcome::NoRoster,
                    step: None
                }
            );
            assert!(
                engaged_at.elapsed() <= pilot.config().grace.timeout() + NO_ROSTER_DELAY,
                "gate held past the grace timeout"
            );
        }
        assert_eq!(input.clicks(), 1);
    }
}

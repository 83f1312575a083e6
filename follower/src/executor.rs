//! Task executor: advance the head of the queue by one step.
//!
//! Each call looks only at the head task, issues at most one input sequence
//! for it, and then either keeps it for the next cycle or removes it. Every
//! lookup failure removes the task instead of surfacing an error; the
//! planner derives a fresh one on a later cycle if it is still needed.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::core::dash::should_dash;
use crate::core::geometry::WorldPos;
use crate::core::snapshot::WorldSnapshot;
use crate::core::task::{TaskKind, TaskQueue, TaskType};
use crate::io::actions::{Pacer, click_at, release_key, report};
use crate::io::config::FollowerConfig;
use crate::io::gate::TransitionGate;
use crate::io::input::InputEffector;
use crate::io::world::{PathOracle, World};

/// Movement completes once the remaining distance is within this multiple
/// of the task's arrival radius (the keep-within distance for follow moves).
pub const MOVEMENT_COMPLETION_FACTOR: f32 = 1.5;

pub const MAX_LOOT_ATTEMPTS: u32 = 2;
pub const MAX_TRANSITION_ATTEMPTS: u32 = 6;
pub const MAX_OPT_IN_ATTEMPTS: u32 = 3;

const LOOT_CLICK_SETTLE: Duration = Duration::from_millis(1000);
const TRANSITION_KEY_RELEASE: Duration = Duration::from_millis(60);
const TRANSITION_HOVER: Duration = Duration::from_millis(100);
const TRANSITION_CLICK_SETTLE: Duration = Duration::from_millis(300);
const OPT_IN_HOVER: Duration = Duration::from_millis(200);
const OPT_IN_CLICK_SETTLE: Duration = Duration::from_millis(500);

/// What happened to the head task this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The queue was empty.
    Idle,
    /// The head task stays queued for another cycle.
    Retained { task: TaskType },
    /// The head task reached its goal and was removed.
    Completed { task: TaskType },
    /// The head task was abandoned.
    Dropped { task: TaskType, reason: DropReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The referenced label or item is gone from the snapshot.
    Vanished,
    /// The target moved beyond the transition distance.
    OutOfRange,
    AttemptsExhausted,
    /// The control to click has no screen geometry.
    NoGeometry,
}

/// Collaborators and per-cycle inputs the executor needs.
pub struct StepEnv<'a, W: ?Sized, I: ?Sized, P: ?Sized> {
    pub world: &'a W,
    pub input: &'a I,
    pub oracle: &'a P,
    pub config: &'a FollowerConfig,
    pub gate: &'a TransitionGate,
    pub pacer: &'a mut Pacer,
    /// Player position at the end of the previous cycle.
    pub last_player_pos: Option<WorldPos>,
}

/// Advance the head of `queue` by one step against `snapshot`.
#[instrument(skip_all, fields(queued = queue.len()))]
pub async fn advance<W, I, P>(
    queue: &mut TaskQueue,
    env: &mut StepEnv<'_, W, I, P>,
    snapshot: &WorldSnapshot,
) -> StepOutcome
where
    W: World + ?Sized,
    I: InputEffector + ?Sized,
    P: PathOracle + ?Sized,
{
    let Some(head) = queue.head() else {
        return StepOutcome::Idle;
    };
    let task = head.task_type();
    let player = snapshot.player.position;

    // The avatar jumped on its own: the portal was already taken.
    if task == TaskType::Transition {
        let moved = env
            .last_player_pos
            .map_or(0.0, |last| last.distance(&player));
        if moved >= env.config.transition_distance {
            debug!(moved, "player already crossed; dropping transition");
            queue.pop_head();
            return StepOutcome::Completed { task };
        }
    }

    match task {
        TaskType::Movement => step_movement(queue, env, snapshot).await,
        TaskType::Loot => step_loot(queue, env, snapshot).await,
        TaskType::Transition => step_transition(queue, env, snapshot).await,
        TaskType::FactionOptIn => step_opt_in(queue, env, snapshot).await,
    }
}

async fn step_movement<W, I, P>(
    queue: &mut TaskQueue,
    env: &mut StepEnv<'_, W, I, P>,
    snapshot: &WorldSnapshot,
) -> StepOutcome
where
    W: World + ?Sized,
    I: InputEffector + ?Sized,
    P: PathOracle + ?Sized,
{
    let Some((target, arrival_radius)) = queue
        .head()
        .map(|task| (task.target(), task.arrival_radius()))
    else {
        return StepOutcome::Idle;
    };
    let remaining = snapshot.player.position.distance(&target);
    let keys = &env.config.keys;

    match env.world.to_screen(target) {
        Some(point) => {
            let oracle = env.oracle;
            let decision = should_dash(
                &env.config.dash,
                snapshot.player.grid,
                target.to_grid(),
                |from, to| oracle.path_status(from, to),
            );
            report(env.input.move_cursor(point, true), "move cursor");
            sleep(env.pacer.jitter()).await;
            if decision.is_dash() {
                debug!(remaining, "dashing");
                report(env.input.key_press(&keys.dash_key), "dash");
                sleep(env.pacer.jitter()).await;
            } else {
                report(env.input.key_down(&keys.move_key), "move key down");
                sleep(env.pacer.jitter()).await;
                report(env.input.key_up(&keys.move_key), "move key up");
            }
        }
        None => debug!(?target, "movement target has no screen position"),
    }

    if remaining <= arrival_radius * MOVEMENT_COMPLETION_FACTOR {
        queue.pop_head();
        StepOutcome::Completed {
            task: TaskType::Movement,
        }
    } else {
        StepOutcome::Retained {
            task: TaskType::Movement,
        }
    }
}

async fn step_loot<W, I, P>(
    queue: &mut TaskQueue,
    env: &mut StepEnv<'_, W, I, P>,
    snapshot: &WorldSnapshot,
) -> StepOutcome
where
    W: World + ?Sized,
    I: InputEffector + ?Sized,
    P: PathOracle + ?Sized,
{
    let task = TaskType::Loot;
    let Some(attempts) = queue.head_mut().map(|head| head.record_attempt()) else {
        return StepOutcome::Idle;
    };
    let player = snapshot.player.position;

    let item = match snapshot.nearest_quest_item() {
        None => return drop_head(queue, task, DropReason::Vanished),
        Some(_) if attempts > MAX_LOOT_ATTEMPTS => {
            return drop_head(queue, task, DropReason::AttemptsExhausted);
        }
        Some(item) if item.position.distance(&player) >= env.config.transition_distance => {
            return drop_head(queue, task, DropReason::OutOfRange);
        }
        Some(item) => item,
    };

    release_key(env.input, &env.config.keys.move_key, env.pacer.input_delay()).await;
    if item.targeted {
        info!(item = %item.text, "picking up quest item");
        report(env.input.left_click(), "loot click");
        sleep(LOOT_CLICK_SETTLE).await;
    } else {
        match snapshot.absolute_center(&item.rect) {
            Some(center) => {
                let point = env.pacer.hover_offset(center);
                report(env.input.move_cursor(point, false), "hover item");
            }
            None => debug!(item = %item.text, "quest item label has no geometry"),
        }
        sleep(env.pacer.hover_delay()).await;
    }
    StepOutcome::Retained { task }
}

async fn step_transition<W, I, P>(
    queue: &mut TaskQueue,
    env: &mut StepEnv<'_, W, I, P>,
    snapshot: &WorldSnapshot,
) -> StepOutcome
where
    W: World + ?Sized,
    I: InputEffector + ?Sized,
    P: PathOracle + ?Sized,
{
    let task = TaskType::Transition;
    let portal_id = match queue.head().map(|head| head.kind()) {
        Some(TaskKind::Transition { portal, .. }) => portal.id,
        _ => return StepOutcome::Idle,
    };
    let Some(label) = snapshot.label(portal_id).filter(|label| label.is_live()) else {
        debug!(portal_id, "portal no longer valid");
        return drop_head(queue, task, DropReason::Vanished);
    };

    if env.gate.engage() {
        info!(portal = %label.text, "transition gate engaged");
    }
    release_key(env.input, &env.config.keys.move_key, TRANSITION_KEY_RELEASE).await;
    match snapshot.absolute_center(&label.rect) {
        Some(point) => {
            click_at(env.input, point, true, TRANSITION_HOVER).await;
        }
        None => debug!(portal = %label.text, "portal label has no geometry"),
    }
    sleep(TRANSITION_CLICK_SETTLE).await;

    let attempts = queue.head_mut().map_or(0, |head| head.record_attempt());
    if attempts > MAX_TRANSITION_ATTEMPTS {
        warn!(attempts, portal = %label.text, "portal never took us; giving up");
        queue.pop_head();
        env.gate.release();
        return StepOutcome::Dropped {
            task,
            reason: DropReason::AttemptsExhausted,
        };
    }
    StepOutcome::Retained { task }
}

async fn step_opt_in<W, I, P>(
    queue: &mut TaskQueue,
    env: &mut StepEnv<'_, W, I, P>,
    snapshot: &WorldSnapshot,
) -> StepOutcome
where
    W: World + ?Sized,
    I: InputEffector + ?Sized,
    P: PathOracle + ?Sized,
{
    let task = TaskType::FactionOptIn;
    let (label_id, attempts) = match queue.head_mut() {
        Some(head) => {
            let attempts = head.record_attempt();
            match head.kind() {
                TaskKind::FactionOptIn { label, .. } => (label.id, attempts),
                _ => return StepOutcome::Idle,
            }
        }
        None => return StepOutcome::Idle,
    };

    let found = snapshot
        .label(label_id)
        .and_then(|label| label.recruit_control().map(|control| (label, *control)));
    let (label, control) = match found {
        None => return drop_head(queue, task, DropReason::Vanished),
        Some(_) if attempts > MAX_OPT_IN_ATTEMPTS => {
            return drop_head(queue, task, DropReason::AttemptsExhausted);
        }
        Some((label, _))
            if label.position.distance(&snapshot.player.position)
                >= env.config.transition_distance =>
        {
            return drop_head(queue, task, DropReason::OutOfRange);
        }
        Some(found) => found,
    };

    release_key(env.input, &env.config.keys.move_key, env.pacer.input_delay()).await;
    let Some(point) = snapshot.absolute_center(&control.rect) else {
        return drop_head(queue, task, DropReason::NoGeometry);
    };
    info!(label = %label.text, "opting in");
    click_at(env.input, point, false, OPT_IN_HOVER).await;
    sleep(OPT_IN_CLICK_SETTLE).await;

    // The prompt disappears once clicked.
    queue.pop_head();
    StepOutcome::Completed { task }
}

fn drop_head(queue: &mut TaskQueue, task: TaskType, reason: DropReason) -> StepOutcome {
    debug!(?task, ?reason, "dropping task");
    queue.pop_head();
    StepOutcome::Dropped { task, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{GridPos, ScreenPoint, ScreenRect};
    use crate::core::snapshot::{GroundLabel, OptInControl};
    use crate::core::task::{LabelRef, Task};
    use crate::io::input::{InputCommand, Key, RecordingInput};
    use crate::io::world::{ConstantOracle, PathStatus};
    use anyhow::Result;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// World that projects everything to a fixed point.
    struct FixedScreen(Option<ScreenPoint>);

    impl World for FixedScreen {
        fn poll(&self) -> Result<WorldSnapshot> {
            Ok(WorldSnapshot::default())
        }

        fn to_screen(&self, _position: WorldPos) -> Option<ScreenPoint> {
            self.0
        }
    }

    struct Harness {
        world: FixedScreen,
        input: RecordingInput,
        oracle: ConstantOracle,
        config: FollowerConfig,
        gate: TransitionGate,
        pacer: Pacer,
        queue: TaskQueue,
        last_player_pos: Option<WorldPos>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                world: FixedScreen(Some(ScreenPoint::new(400.0, 300.0))),
                input: RecordingInput::new(),
                oracle: ConstantOracle(PathStatus::Clear),
                config: FollowerConfig::default(),
                gate: TransitionGate::new(),
                pacer: Pacer::new(StdRng::seed_from_u64(11), Duration::from_millis(50)),
                queue: TaskQueue::new(),
                last_player_pos: None,
            }
        }

        async fn step(&mut self, snapshot: &WorldSnapshot) -> StepOutcome {
            let mut env = StepEnv {
                world: &self.world,
                input: &self.input,
                oracle: &self.oracle,
                config: &self.config,
                gate: &self.gate,
                pacer: &mut self.pacer,
                last_player_pos: self.last_player_pos,
            };
            advance(&mut self.queue, &mut env, snapshot).await
        }
    }

    fn snapshot_with(ground: Vec<GroundLabel>) -> WorldSnapshot {
        WorldSnapshot {
            ready: true,
            window: ScreenRect::new(0.0, 0.0, 800.0, 600.0),
            ground,
            ..WorldSnapshot::default()
        }
    }

    fn portal(id: u64) -> GroundLabel {
        GroundLabel {
            id,
            metadata: "Metadata/MiscObjects/AreaTransition".to_string(),
            text: "The Ledge".to_string(),
            position: WorldPos::new(100.0, 0.0, 0.0),
            rect: ScreenRect::new(100.0, 100.0, 40.0, 20.0),
            visible: true,
            valid: true,
            ..GroundLabel::default()
        }
    }

    fn quest_item(targeted: bool) -> GroundLabel {
        GroundLabel {
            id: 3,
            item_class: Some("QuestItem".to_string()),
            text: "Medicine Chest".to_string(),
            position: WorldPos::new(50.0, 0.0, 0.0),
            rect: ScreenRect::new(200.0, 200.0, 20.0, 10.0),
            visible: true,
            valid: true,
            targeted,
            ..GroundLabel::default()
        }
    }

    fn recruit(distance: f32) -> GroundLabel {
        GroundLabel {
            id: 4,
            metadata: "Metadata/Monsters/Mercenary/MercenaryRecruit".to_string(),
            text: "Recruit".to_string(),
            position: WorldPos::new(distance, 0.0, 0.0),
            visible: true,
            valid: true,
            opt_in: Some(OptInControl {
                rect: ScreenRect::new(300.0, 300.0, 20.0, 20.0),
                visible: true,
            }),
            ..GroundLabel::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_queue_is_idle() {
        let mut harness = Harness::new();
        assert_eq!(harness.step(&snapshot_with(vec![])).await, StepOutcome::Idle);
        assert!(harness.input.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn movement_completes_at_exactly_one_and_a_half_keep_within() {
        let mut harness = Harness::new();
        let keep_within = harness.config.keep_within_distance;
        harness
            .queue
            .push(Task::movement(WorldPos::new(keep_within * 1.5, 0.0, 0.0), keep_within));

        let outcome = harness.step(&snapshot_with(vec![])).await;
        assert_eq!(
            outcome,
            StepOutcome::Completed {
                task: TaskType::Movement
            }
        );
        assert!(harness.queue.is_empty());
        // The walk input is still issued on the final step.
        assert!(
            harness
                .input
                .commands()
                .contains(&InputCommand::KeyDown { key: Key::new("T") })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn movement_beyond_boundary_is_retained() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::movement(WorldPos::new(226.0, 0.0, 0.0), 150.0));
        let outcome = harness.step(&snapshot_with(vec![])).await;
        assert_eq!(
            outcome,
            StepOutcome::Retained {
                task: TaskType::Movement
            }
        );
        assert_eq!(harness.queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn movement_dashes_over_dashable_obstacles() {
        let mut harness = Harness::new();
        harness.oracle = ConstantOracle(PathStatus::Dashable);
        harness.config.dash.enabled = true;
        let target = WorldPos::new(300.0, 0.0, 0.0);
        harness.queue.push(Task::movement(target, 150.0));

        let mut snapshot = snapshot_with(vec![]);
        snapshot.player.grid = Some(GridPos::new(0.0, 0.0));
        harness.step(&snapshot).await;

        let commands = harness.input.commands();
        assert!(commands.contains(&InputCommand::KeyPress { key: Key::new("W") }));
        assert!(
            !commands
                .iter()
                .any(|cmd| matches!(cmd, InputCommand::KeyDown { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn off_screen_movement_issues_no_input() {
        let mut harness = Harness::new();
        harness.world = FixedScreen(None);
        harness
            .queue
            .push(Task::movement(WorldPos::new(1000.0, 0.0, 0.0), 150.0));
        harness.step(&snapshot_with(vec![])).await;
        assert!(harness.input.commands().is_empty());
        assert_eq!(harness.queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transition_engages_gate_and_clicks_portal() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::transition(LabelRef::from(&portal(7)), 150.0));

        let outcome = harness.step(&snapshot_with(vec![portal(7)])).await;
        assert_eq!(
            outcome,
            StepOutcome::Retained {
                task: TaskType::Transition
            }
        );
        assert!(harness.gate.is_engaged());
        assert_eq!(
            harness.input.commands(),
            vec![
                InputCommand::KeyUp { key: Key::new("T") },
                InputCommand::MoveCursor {
                    x: 120.0,
                    y: 110.0,
                    humanized: true
                },
                InputCommand::LeftClick,
            ]
        );
        assert_eq!(harness.queue.head().map(Task::attempts), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn transition_gives_up_after_six_attempts_and_releases_gate() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::transition(LabelRef::from(&portal(7)), 150.0));
        let snapshot = snapshot_with(vec![portal(7)]);

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            harness.step(&snapshot).await;
            assert!(harness.gate.is_engaged());
        }
        let outcome = harness.step(&snapshot).await;
        assert_eq!(
            outcome,
            StepOutcome::Dropped {
                task: TaskType::Transition,
                reason: DropReason::AttemptsExhausted
            }
        );
        assert!(!harness.gate.is_engaged());
        assert!(harness.queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_portal_drops_without_engaging_gate() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::transition(LabelRef::from(&portal(7)), 150.0));
        let mut hidden = portal(7);
        hidden.visible = false;

        let outcome = harness.step(&snapshot_with(vec![hidden])).await;
        assert_eq!(
            outcome,
            StepOutcome::Dropped {
                task: TaskType::Transition,
                reason: DropReason::Vanished
            }
        );
        assert!(!harness.gate.is_engaged());
    }

    #[tokio::test(start_paused = true)]
    async fn transition_completes_when_player_already_crossed() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::transition(LabelRef::from(&portal(7)), 150.0));
        harness.last_player_pos = Some(WorldPos::new(-600.0, 0.0, 0.0));

        let outcome = harness.step(&snapshot_with(vec![portal(7)])).await;
        assert_eq!(
            outcome,
            StepOutcome::Completed {
                task: TaskType::Transition
            }
        );
        assert!(harness.input.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn loot_hovers_then_clicks_once_targeted() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::loot(WorldPos::new(50.0, 0.0, 0.0), 500.0));

        harness.step(&snapshot_with(vec![quest_item(false)])).await;
        let hover = harness.input.drain();
        assert_eq!(hover[0], InputCommand::KeyUp { key: Key::new("T") });
        match hover[1] {
            InputCommand::MoveCursor { x, y, humanized } => {
                assert!((195.0..225.0).contains(&x));
                assert!((195.0..215.0).contains(&y));
                assert!(!humanized);
            }
            ref other => panic!("expected hover, got {other:?}"),
        }

        harness.step(&snapshot_with(vec![quest_item(true)])).await;
        assert_eq!(
            harness.input.drain(),
            vec![InputCommand::KeyUp { key: Key::new("T") }, InputCommand::LeftClick]
        );

        let outcome = harness.step(&snapshot_with(vec![quest_item(true)])).await;
        assert_eq!(
            outcome,
            StepOutcome::Dropped {
                task: TaskType::Loot,
                reason: DropReason::AttemptsExhausted
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn loot_drops_when_item_disappears() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::loot(WorldPos::new(50.0, 0.0, 0.0), 500.0));
        let outcome = harness.step(&snapshot_with(vec![])).await;
        assert_eq!(
            outcome,
            StepOutcome::Dropped {
                task: TaskType::Loot,
                reason: DropReason::Vanished
            }
        );
        assert!(harness.input.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn movement_completion_follows_task_arrival_radius() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::movement(WorldPos::new(300.0, 0.0, 0.0), 200.0));
        let outcome = harness.step(&snapshot_with(vec![])).await;
        assert_eq!(
            outcome,
            StepOutcome::Completed {
                task: TaskType::Movement
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn loot_beyond_transition_distance_is_dropped() {
        let mut harness = Harness::new();
        let mut item = quest_item(true);
        item.position = WorldPos::new(600.0, 0.0, 0.0);
        harness.queue.push(Task::loot(item.position, 500.0));

        let outcome = harness.step(&snapshot_with(vec![item])).await;
        assert_eq!(
            outcome,
            StepOutcome::Dropped {
                task: TaskType::Loot,
                reason: DropReason::OutOfRange
            }
        );
        assert!(harness.queue.is_empty());
        assert!(harness.input.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn opt_in_clicks_control_then_completes() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::faction_opt_in(LabelRef::from(&recruit(60.0)), 500.0));

        let outcome = harness.step(&snapshot_with(vec![recruit(60.0)])).await;
        assert_eq!(
            outcome,
            StepOutcome::Completed {
                task: TaskType::FactionOptIn
            }
        );
        assert_eq!(
            harness.input.commands(),
            vec![
                InputCommand::KeyUp { key: Key::new("T") },
                InputCommand::MoveCursor {
                    x: 310.0,
                    y: 310.0,
                    humanized: false
                },
                InputCommand::LeftClick,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn opt_in_out_of_range_is_dropped() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::faction_opt_in(LabelRef::from(&recruit(900.0)), 500.0));
        let outcome = harness.step(&snapshot_with(vec![recruit(900.0)])).await;
        assert_eq!(
            outcome,
            StepOutcome::Dropped {
                task: TaskType::FactionOptIn,
                reason: DropReason::OutOfRange
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn opt_in_for_vanished_label_is_dropped() {
        let mut harness = Harness::new();
        harness
            .queue
            .push(Task::faction_opt_in(LabelRef::from(&recruit(60.0)), 500.0));

        let outcome = harness.step(&snapshot_with(vec![])).await;
        assert_eq!(
            outcome,
            StepOutcome::Dropped {
                task: TaskType::FactionOptIn,
                reason: DropReason::Vanished
            }
        );
        assert!(harness.input.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn opt_in_without_control_geometry_is_dropped_unclicked() {
        let mut harness = Harness::new();
        let mut label = recruit(60.0);
        label.opt_in = Some(OptInControl {
            rect: ScreenRect::default(),
            visible: true,
        });
        harness
            .queue
            .push(Task::faction_opt_in(LabelRef::from(&label), 500.0));

        let outcome = harness.step(&snapshot_with(vec![label])).await;
        assert_eq!(
            outcome,
            StepOutcome::Dropped {
                task: TaskType::FactionOptIn,
                reason: DropReason::NoGeometry
            }
        );
        assert_eq!(harness.input.clicks(), 0);
        assert!(harness.queue.is_empty());
    }
}

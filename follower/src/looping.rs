//! Multi-cycle driver for `follower simulate` and long-running sessions.

use serde::Serialize;

use crate::autopilot::{AutoPilot, CycleReport, CycleStatus};
use crate::executor::StepOutcome;
use crate::grace::GraceOutcome;
use crate::io::input::InputEffector;
use crate::io::world::{PathOracle, World};

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStop {
    /// The configured cycle budget was used up.
    CycleLimit,
    /// The callback asked to stop.
    Requested,
}

/// Tally of a loop invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub cycles: u64,
    pub idle_cycles: u64,
    pub poll_failures: u64,
    pub area_changes: u64,
    pub tasks_completed: u64,
    pub tasks_dropped: u64,
    pub grace_resolved: u64,
    pub grace_timed_out: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopOutcome {
    pub stop: LoopStop,
    pub summary: LoopSummary,
}

/// Whether the loop should keep going after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl LoopSummary {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        if report.area_changed {
            self.area_changes += 1;
        }
        match report.grace {
            Some(GraceOutcome::Resolved { .. }) => self.grace_resolved += 1,
            Some(GraceOutcome::TimedOut(_)) => self.grace_timed_out += 1,
            None => {}
        }
        match &report.status {
            CycleStatus::PollFailed => self.poll_failures += 1,
            CycleStatus::NotReady | CycleStatus::LeaderUnset => self.idle_cycles += 1,
            CycleStatus::Ran { step, .. } => match step {
                Some(StepOutcome::Completed { .. }) => self.tasks_completed += 1,
                Some(StepOutcome::Dropped { .. }) => self.tasks_dropped += 1,
                Some(StepOutcome::Idle) | None => self.idle_cycles += 1,
                Some(StepOutcome::Retained { .. }) => {}
            },
        }
    }
}

/// Run control cycles until `max_cycles` is reached (forever when `None`) or
/// `on_cycle` returns [`Flow::Stop`].
pub async fn run_loop<W, I, P, F>(
    pilot: &mut AutoPilot<W, I, P>,
    max_cycles: Option<u64>,
    mut on_cycle: F,
) -> LoopOutcome
where
    W: World + 'static,
    I: InputEffector + 'static,
    P: PathOracle,
    F: FnMut(&CycleReport) -> Flow,
{
    let mut summary = LoopSummary::default();
    loop {
        if max_cycles.is_some_and(|limit| summary.cycles >= limit) {
            return LoopOutcome {
                stop: LoopStop::CycleLimit,
                summary,
            };
        }
        let report = pilot.cycle().await;
        summary.record(&report);
        if on_cycle(&report) == Flow::Stop {
            return LoopOutcome {
                stop: LoopStop::Requested,
                summary,
            };
        }
    }
}

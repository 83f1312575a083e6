//! Post-transition grace period.
//!
//! After a self-initiated zone change the leader's avatar takes a moment to
//! resolve. The monitor polls until the leader is synced in our zone or the
//! timeout passes, then releases the transition gate. It never touches the
//! task queue.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};

use crate::core::leader::resolve_leader;
use crate::io::actions::teleport_to_leader;
use crate::io::config::GraceConfig;
use crate::io::gate::TransitionGate;
use crate::io::input::InputEffector;
use crate::io::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraceOutcome {
    /// The leader resolved in our zone.
    Resolved { after: Duration },
    TimedOut(TimeoutCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutCause {
    /// Same zone name, different instance: a forced teleport was issued.
    Deadlock,
    /// The leader apparently moved on; the control loop takes over.
    Unresolved,
}

/// Wait for the leader to sync after a transition. Always releases `gate`.
#[instrument(skip_all, fields(leader = %leader_name))]
pub async fn run_grace_period<W, I>(
    world: &W,
    input: &I,
    gate: &TransitionGate,
    leader_name: &str,
    config: &GraceConfig,
) -> GraceOutcome
where
    W: World + ?Sized,
    I: InputEffector + ?Sized,
{
    let timeout = config.timeout();
    let started = Instant::now();
    let mut ticker = interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(?timeout, "grace period started");

    loop {
        ticker.tick().await;
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            break;
        }
        match world.poll() {
            Ok(snapshot) => {
                let leader = resolve_leader(&snapshot, leader_name);
                if leader.is_synced(&snapshot.zone.name) {
                    info!(?elapsed, zone = %snapshot.zone.name, "leader synced");
                    gate.release();
                    return GraceOutcome::Resolved { after: elapsed };
                }
            }
            Err(err) => debug!(error = %err, "poll failed during grace period"),
        }
    }

    let outcome = match world.poll() {
        Ok(snapshot) => {
            let leader = resolve_leader(&snapshot, leader_name);
            match leader.roster.as_ref() {
                _ if leader.is_synced(&snapshot.zone.name) => GraceOutcome::Resolved {
                    after: started.elapsed(),
                },
                Some(entry) if entry.zone == snapshot.zone.name => {
                    warn!(zone = %snapshot.zone.name, "same zone but leader unresolved; forcing teleport");
                    teleport_to_leader(input, &snapshot, entry).await;
                    GraceOutcome::TimedOut(TimeoutCause::Deadlock)
                }
                _ => {
                    info!("leader did not sync; resuming normal logic");
                    GraceOutcome::TimedOut(TimeoutCause::Unresolved)
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "final grace check failed");
            GraceOutcome::TimedOut(TimeoutCause::Unresolved)
        }
    };
    gate.release();
    outcome
}

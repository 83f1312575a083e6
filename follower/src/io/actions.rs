//! Paced input sequences built from the discrete [`InputEffector`] commands.
//!
//! Waits are explicit `tokio::time::sleep` calls so the control loop yields
//! between inputs, and tests can drive everything under a paused clock.

use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use rand::rngs::StdRng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::core::geometry::ScreenPoint;
use crate::core::snapshot::{RosterEntry, WorldSnapshot};
use crate::io::input::{InputEffector, Key};

const JITTER_BASE_MS: u64 = 30;
const JITTER_SPREAD_MS: u64 = 25;
const HOVER_SPREAD_X: f32 = 15.0;
const HOVER_SPREAD_Y: f32 = 10.0;

/// Settle time around each click of the teleport sequence.
pub const TELEPORT_CLICK_SETTLE: Duration = Duration::from_millis(200);
/// Time for the teleport confirmation popup to close after accepting it.
pub const CONFIRM_DISMISS_SETTLE: Duration = Duration::from_millis(1000);

/// Source of human-looking delays and offsets.
#[derive(Debug)]
pub struct Pacer {
    rng: StdRng,
    input_frequency: Duration,
}

impl Pacer {
    pub fn new(rng: StdRng, input_frequency: Duration) -> Self {
        Self {
            rng,
            input_frequency,
        }
    }

    /// Short reaction delay between a cursor move and a key (30–54 ms).
    pub fn jitter(&mut self) -> Duration {
        Duration::from_millis(JITTER_BASE_MS + self.rng.gen_range(0..JITTER_SPREAD_MS))
    }

    /// Configured base delay between inputs.
    pub fn input_delay(&self) -> Duration {
        self.input_frequency
    }

    /// Delay after hovering an item: 30 ms plus up to one input period.
    pub fn hover_delay(&mut self) -> Duration {
        let spread = self.input_frequency.as_millis() as u64;
        let extra = if spread == 0 {
            0
        } else {
            self.rng.gen_range(0..spread)
        };
        Duration::from_millis(JITTER_BASE_MS + extra)
    }

    /// Random offset applied when hovering a label so the cursor is not pixel-exact.
    pub fn hover_offset(&mut self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(
            point.x + self.rng.gen_range(-HOVER_SPREAD_X..HOVER_SPREAD_X),
            point.y + self.rng.gen_range(-HOVER_SPREAD_Y..HOVER_SPREAD_Y),
        )
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

/// Log and swallow a failed input command. Input failures never stop the loop.
pub fn report(result: Result<()>, what: &'static str) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, action = what, "input command failed");
            false
        }
    }
}

/// Move, settle, click.
pub async fn click_at<I: InputEffector + ?Sized>(
    input: &I,
    point: ScreenPoint,
    humanized: bool,
    settle: Duration,
) -> bool {
    if !report(input.move_cursor(point, humanized), "move cursor") {
        return false;
    }
    sleep(settle).await;
    report(input.left_click(), "left click")
}

/// Release the movement key so a click is not turned into a walk command.
pub async fn release_key<I: InputEffector + ?Sized>(input: &I, key: &Key, settle: Duration) {
    report(input.key_up(key), "key up");
    sleep(settle).await;
}

/// What [`teleport_to_leader`] managed to click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeleportAttempt {
    pub confirm_dismissed: bool,
    pub teleport_clicked: bool,
}

/// Accept an open "teleport to this player?" popup, then click the leader's
/// roster teleport control. Missing geometry turns a step into a no-op.
pub async fn teleport_to_leader<I: InputEffector + ?Sized>(
    input: &I,
    snapshot: &WorldSnapshot,
    leader: &RosterEntry,
) -> TeleportAttempt {
    let mut attempt = TeleportAttempt::default();

    if let Some(point) = snapshot
        .teleport_confirm
        .as_ref()
        .and_then(|rect| snapshot.absolute_center(rect))
    {
        debug!("accepting open teleport confirmation");
        attempt.confirm_dismissed = click_at(input, point, true, TELEPORT_CLICK_SETTLE).await;
        sleep(CONFIRM_DISMISS_SETTLE).await;
    }

    match leader
        .teleport
        .as_ref()
        .and_then(|rect| snapshot.absolute_center(rect))
    {
        Some(point) => {
            attempt.teleport_clicked = click_at(input, point, false, TELEPORT_CLICK_SETTLE).await;
            sleep(TELEPORT_CLICK_SETTLE).await;
        }
        None => debug!(leader = %leader.name, "teleport control has no geometry"),
    }

    attempt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::ScreenRect;
    use crate::io::input::{InputCommand, RecordingInput};
    use rand::SeedableRng;

    fn leader_with_teleport(rect: Option<ScreenRect>) -> RosterEntry {
        RosterEntry {
            name: "Leader".to_string(),
            zone: "The Ledge".to_string(),
            teleport: rect,
        }
    }

    #[test]
    fn jitter_stays_in_range() {
        let mut pacer = Pacer::new(StdRng::seed_from_u64(3), Duration::from_millis(50));
        for _ in 0..200 {
            let delay = pacer.jitter();
            assert!(delay >= Duration::from_millis(30));
            assert!(delay < Duration::from_millis(55));
        }
    }

    #[test]
    fn hover_delay_handles_zero_frequency() {
        let mut pacer = Pacer::new(StdRng::seed_from_u64(3), Duration::ZERO);
        assert_eq!(pacer.hover_delay(), Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn teleport_dismisses_confirmation_first() {
        let input = RecordingInput::new();
        let snapshot = WorldSnapshot {
            window: ScreenRect::new(100.0, 0.0, 800.0, 600.0),
            teleport_confirm: Some(ScreenRect::new(0.0, 0.0, 20.0, 20.0)),
            ..WorldSnapshot::default()
        };
        let leader = leader_with_teleport(Some(ScreenRect::new(40.0, 40.0, 10.0, 10.0)));

        let attempt = teleport_to_leader(&input, &snapshot, &leader).await;
        assert!(attempt.confirm_dismissed);
        assert!(attempt.teleport_clicked);
        assert_eq!(
            input.commands(),
            vec![
                InputCommand::MoveCursor {
                    x: 110.0,
                    y: 10.0,
                    humanized: true
                },
                InputCommand::LeftClick,
                InputCommand::MoveCursor {
                    x: 145.0,
                    y: 45.0,
                    humanized: false
                },
                InputCommand::LeftClick,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn teleport_without_geometry_is_a_no_op() {
        let input = RecordingInput::new();
        let attempt =
            teleport_to_leader(&input, &WorldSnapshot::default(), &leader_with_teleport(None))
                .await;
        assert_eq!(attempt, TeleportAttempt::default());
        assert!(input.commands().is_empty());
    }
}

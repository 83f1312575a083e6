//! Write-side collaborator seam: simulated mouse and keyboard input.
//!
//! Every method is one discrete, atomic command. Timing between commands is
//! owned by the caller (see [`crate::io::actions::Pacer`]).

use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::geometry::ScreenPoint;

/// Key binding name as understood by the input layer (e.g. `"T"`, `"Space"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait InputEffector: Send + Sync {
    /// Place the cursor. `humanized` asks the input layer for a natural-looking path.
    fn move_cursor(&self, to: ScreenPoint, humanized: bool) -> Result<()>;
    fn left_click(&self) -> Result<()>;
    fn key_down(&self, key: &Key) -> Result<()>;
    fn key_up(&self, key: &Key) -> Result<()>;
    fn key_press(&self, key: &Key) -> Result<()>;
}

impl<T: InputEffector + ?Sized> InputEffector for Arc<T> {
    fn move_cursor(&self, to: ScreenPoint, humanized: bool) -> Result<()> {
        (**self).move_cursor(to, humanized)
    }

    fn left_click(&self) -> Result<()> {
        (**self).left_click()
    }

    fn key_down(&self, key: &Key) -> Result<()> {
        (**self).key_down(key)
    }

    fn key_up(&self, key: &Key) -> Result<()> {
        (**self).key_up(key)
    }

    fn key_press(&self, key: &Key) -> Result<()> {
        (**self).key_press(key)
    }
}

/// One issued input command, as recorded by [`RecordingInput`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum InputCommand {
    MoveCursor { x: f32, y: f32, humanized: bool },
    LeftClick,
    KeyDown { key: Key },
    KeyUp { key: Key },
    KeyPress { key: Key },
}

/// Input effector that performs nothing and remembers every command.
///
/// Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct RecordingInput {
    log: Mutex<Vec<InputCommand>>,
}

impl RecordingInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<InputCommand> {
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<InputCommand> {
        std::mem::take(
            &mut *self
                .log
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn clicks(&self) -> usize {
        self.commands()
            .iter()
            .filter(|cmd| matches!(cmd, InputCommand::LeftClick))
            .count()
    }

    fn record(&self, command: InputCommand) -> Result<()> {
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(command);
        Ok(())
    }
}

impl InputEffector for RecordingInput {
    fn move_cursor(&self, to: ScreenPoint, humanized: bool) -> Result<()> {
        self.record(InputCommand::MoveCursor {
            x: to.x,
            y: to.y,
            humanized,
        })
    }

    fn left_click(&self) -> Result<()> {
        self.record(InputCommand::LeftClick)
    }

    fn key_down(&self, key: &Key) -> Result<()> {
        self.record(InputCommand::KeyDown { key: key.clone() })
    }

    fn key_up(&self, key: &Key) -> Result<()> {
        self.record(InputCommand::KeyUp { key: key.clone() })
    }

    fn key_press(&self, key: &Key) -> Result<()> {
        self.record(InputCommand::KeyPress { key: key.clone() })
    }
}

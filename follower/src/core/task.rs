//! Queued navigation and interaction work.
//!
//! The queue is FIFO: the planner appends at the tail and the executor only
//! ever looks at, mutates, or removes the head.

use std::collections::VecDeque;

use crate::core::geometry::WorldPos;
use crate::core::snapshot::GroundLabel;

/// Discriminant used for "is one already queued" checks and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Movement,
    Transition,
    Loot,
    FactionOptIn,
}

/// Stable reference to a ground label, re-resolved by id each cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRef {
    pub id: u64,
    pub position: WorldPos,
    pub text: String,
}

impl From<&GroundLabel> for LabelRef {
    fn from(label: &GroundLabel) -> Self {
        Self {
            id: label.id,
            position: label.position,
            text: label.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    Movement {
        target: WorldPos,
        arrival_radius: f32,
    },
    Transition {
        portal: LabelRef,
        arrival_radius: f32,
    },
    Loot {
        target: WorldPos,
        arrival_radius: f32,
    },
    FactionOptIn {
        label: LabelRef,
        arrival_radius: f32,
    },
}

/// A unit of queued work plus its execution attempt counter.
///
/// `attempts` is owned by the executor: it starts at zero and only moves
/// forward while the task sits at the head of the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    kind: TaskKind,
    attempts: u32,
}

impl Task {
    pub fn new(kind: TaskKind) -> Self {
        Self { kind, attempts: 0 }
    }

    pub fn movement(target: WorldPos, arrival_radius: f32) -> Self {
        Self::new(TaskKind::Movement {
            target,
            arrival_radius,
        })
    }

    pub fn transition(portal: LabelRef, arrival_radius: f32) -> Self {
        Self::new(TaskKind::Transition {
            portal,
            arrival_radius,
        })
    }

    pub fn loot(target: WorldPos, arrival_radius: f32) -> Self {
        Self::new(TaskKind::Loot {
            target,
            arrival_radius,
        })
    }

    pub fn faction_opt_in(label: LabelRef, arrival_radius: f32) -> Self {
        Self::new(TaskKind::FactionOptIn {
            label,
            arrival_radius,
        })
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn task_type(&self) -> TaskType {
        match self.kind {
            TaskKind::Movement { .. } => TaskType::Movement,
            TaskKind::Transition { .. } => TaskType::Transition,
            TaskKind::Loot { .. } => TaskType::Loot,
            TaskKind::FactionOptIn { .. } => TaskType::FactionOptIn,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Count one execution attempt and return the new total.
    pub fn record_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// World position the task is aimed at.
    pub fn target(&self) -> WorldPos {
        match &self.kind {
            TaskKind::Movement { target, .. } | TaskKind::Loot { target, .. } => *target,
            TaskKind::Transition { portal, .. } => portal.position,
            TaskKind::FactionOptIn { label, .. } => label.position,
        }
    }

    pub fn arrival_radius(&self) -> f32 {
        match &self.kind {
            TaskKind::Movement { arrival_radius, .. }
            | TaskKind::Transition { arrival_radius, .. }
            | TaskKind::Loot { arrival_radius, .. }
            | TaskKind::FactionOptIn { arrival_radius, .. } => *arrival_radius,
        }
    }

    /// Long-range goals are obsolete once the leader is close.
    pub fn is_long_range(&self) -> bool {
        matches!(
            self.kind,
            TaskKind::Movement { .. } | TaskKind::Transition { .. }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    pub fn head(&self) -> Option<&Task> {
        self.tasks.front()
    }

    pub fn head_mut(&mut self) -> Option<&mut Task> {
        self.tasks.front_mut()
    }

    pub fn pop_head(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn contains_type(&self, task_type: TaskType) -> bool {
        self.tasks.iter().any(|task| task.task_type() == task_type)
    }

    /// Target of the most recently queued task.
    pub fn last_target(&self) -> Option<WorldPos> {
        self.tasks.back().map(Task::target)
    }

    /// Drop every Movement/Transition task, keeping opportunistic ones in order.
    ///
    /// Returns the number of removed tasks.
    pub fn purge_long_range(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.is_long_range());
        before - self.tasks.len()
    }
}

//! Per-poll view of the world as reported by the perception layer.
//!
//! A [`WorldSnapshot`] is an immutable value: the control loop polls one per
//! cycle and every decision in that cycle is made against it. References into
//! the world that must survive across cycles (queued portals, recruit prompts)
//! are kept as ids and re-resolved against the next snapshot.

use serde::{Deserialize, Serialize};

use crate::core::geometry::{GridPos, ScreenPoint, ScreenRect, WorldPos};

const PORTAL_MARKERS: [&str; 2] = ["areatransition", "portal"];
const RECRUIT_MARKER: &str = "mercenary";
const QUEST_ITEM_CLASS: &str = "QuestItem";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSnapshot {
    /// Game is focused, in game, not loading and no blocking menu is open.
    pub ready: bool,
    pub player: LocalPlayer,
    /// Player avatars currently resolvable in the local zone.
    pub avatars: Vec<Avatar>,
    /// Party list entries, in UI order.
    pub roster: Vec<RosterEntry>,
    pub ground: Vec<GroundLabel>,
    pub zone: ZoneInfo,
    /// Client area of the game window; its origin offsets every UI rect.
    pub window: ScreenRect,
    /// Accept button of the "teleport to this player?" popup, when open.
    pub teleport_confirm: Option<ScreenRect>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalPlayer {
    pub name: String,
    pub position: WorldPos,
    /// Grid position as reported by the game; absent while it cannot be read.
    pub grid: Option<GridPos>,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Avatar {
    pub name: String,
    pub position: WorldPos,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterEntry {
    pub name: String,
    /// Zone the party list reports for this member. Updates lag behind reality.
    pub zone: String,
    /// Client rect of the member's teleport control.
    pub teleport: Option<ScreenRect>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundLabel {
    pub id: u64,
    pub metadata: String,
    /// Base item class for world items (e.g. `QuestItem`).
    pub item_class: Option<String>,
    /// Text rendered on the label (portal destination name, item name).
    pub text: String,
    pub position: WorldPos,
    pub rect: ScreenRect,
    pub visible: bool,
    pub valid: bool,
    /// The label is currently under the cursor / highlighted.
    pub targeted: bool,
    /// Opt-in button nested in a recruit prompt.
    pub opt_in: Option<OptInControl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OptInControl {
    pub rect: ScreenRect,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneInfo {
    pub name: String,
    pub is_hideout: bool,
    /// Monster level of the area; 68 and above is endgame content.
    pub tier: u32,
    /// Changes whenever a new area instance is loaded, even with the same name.
    pub area_hash: u64,
}

impl GroundLabel {
    /// Visible with a valid label; everything else is ignored.
    pub fn is_live(&self) -> bool {
        self.visible && self.valid
    }

    pub fn is_portal(&self) -> bool {
        let metadata = self.metadata.to_lowercase();
        self.is_live() && PORTAL_MARKERS.iter().any(|m| metadata.contains(m))
    }

    pub fn is_quest_item(&self) -> bool {
        self.is_live() && self.item_class.as_deref() == Some(QUEST_ITEM_CLASS)
    }

    /// Opt-in control of a recruit prompt, if this label is one and it is showing.
    pub fn recruit_control(&self) -> Option<&OptInControl> {
        if !self.is_live() || !self.metadata.to_lowercase().contains(RECRUIT_MARKER) {
            return None;
        }
        self.opt_in.as_ref().filter(|control| control.visible)
    }
}

impl WorldSnapshot {
    pub fn label(&self, id: u64) -> Option<&GroundLabel> {
        self.ground.iter().find(|label| label.id == id)
    }

    pub fn portals(&self) -> impl Iterator<Item = &GroundLabel> {
        self.ground.iter().filter(|label| label.is_portal())
    }

    /// Quest item nearest to the local player.
    pub fn nearest_quest_item(&self) -> Option<&GroundLabel> {
        self.nearest_to_player(self.ground.iter().filter(|label| label.is_quest_item()))
    }

    /// Recruit prompt with a visible opt-in control nearest to the local player.
    pub fn nearest_recruit(&self) -> Option<&GroundLabel> {
        self.nearest_to_player(
            self.ground
                .iter()
                .filter(|label| label.recruit_control().is_some()),
        )
    }

    /// Absolute screen point at the centre of a client rect.
    pub fn absolute_center(&self, rect: &ScreenRect) -> Option<ScreenPoint> {
        if rect.is_empty() {
            return None;
        }
        Some(self.window.offset(rect.center()))
    }

    fn nearest_to_player<'a>(
        &self,
        labels: impl Iterator<Item = &'a GroundLabel>,
    ) -> Option<&'a GroundLabel> {
        let origin = self.player.position;
        labels.min_by(|a, b| {
            a.position
                .distance(&origin)
                .total_cmp(&b.position.distance(&origin))
        })
    }
}

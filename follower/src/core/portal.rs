//! Zone-crossing selection: which portal to take, or none (use the roster
//! teleport control instead).

use rand::Rng;

use crate::core::geometry::WorldPos;
use crate::core::snapshot::{GroundLabel, RosterEntry, WorldSnapshot};
use crate::core::task::LabelRef;

/// Areas at or above this tier are endgame: any portal leads somewhere useful.
pub const ENDGAME_TIER: u32 = 68;

/// Rule set the resolver applied for the current zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneRules {
    /// Portals are interchangeable; pick one at random.
    Hideout,
    /// Any portal qualifies; pick the nearest.
    Endgame,
    /// Only portals labelled with the leader's zone qualify.
    Leveling,
}

impl ZoneRules {
    pub fn for_snapshot(snapshot: &WorldSnapshot) -> Self {
        if snapshot.zone.is_hideout {
            ZoneRules::Hideout
        } else if snapshot.zone.tier >= ENDGAME_TIER {
            ZoneRules::Endgame
        } else {
            ZoneRules::Leveling
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortalChoice {
    pub label: LabelRef,
    /// Distance from the local player at resolution time.
    pub distance_to_player: f32,
    pub rules: ZoneRules,
}

/// Pick the best portal towards the leader's roster zone.
///
/// `anchor` is the position candidates are ranked against (last known leader
/// position when there is one). Returns `None` when nothing qualifies, which
/// callers treat as "fall back to the teleport control".
pub fn resolve_portal<R: Rng + ?Sized>(
    snapshot: &WorldSnapshot,
    leader: &RosterEntry,
    anchor: WorldPos,
    rng: &mut R,
) -> Option<PortalChoice> {
    let rules = ZoneRules::for_snapshot(snapshot);
    let mut candidates: Vec<&GroundLabel> = match rules {
        ZoneRules::Hideout | ZoneRules::Endgame => snapshot.portals().collect(),
        ZoneRules::Leveling => {
            let wanted = leader.zone.trim().to_lowercase();
            if wanted.is_empty() {
                return None;
            }
            snapshot
                .portals()
                .filter(|label| label.text.to_lowercase().contains(&wanted))
                .collect()
        }
    };
    if candidates.is_empty() {
        return None;
    }

    candidates.sort_by(|a, b| {
        a.position
            .distance(&anchor)
            .total_cmp(&b.position.distance(&anchor))
            .then_with(|| a.id.cmp(&b.id))
    });

    let chosen = match rules {
        ZoneRules::Hideout => candidates[rng.gen_range(0..candidates.len())],
        ZoneRules::Endgame | ZoneRules::Leveling => candidates[0],
    };

    Some(PortalChoice {
        label: LabelRef::from(chosen),
        distance_to_player: chosen.position.distance(&snapshot.player.position),
        rules,
    })
}

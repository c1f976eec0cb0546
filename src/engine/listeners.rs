//! Protection, command, and kill-location queries.
//!
//! The engine never vetoes anything itself: host-side listeners ask these
//! helpers for a classification plus per-zone policy and enforce the answer.
//! Everything here reads a snapshot, so callers can run on any thread.

use crate::engine::config::keys;
use crate::engine::geometry::{BlockPos, Classification};
use crate::engine::observer::EngineSnapshot;
use crate::engine::owner::CaptureOwner;
use crate::engine::session::CapturePhase;

/// Answer to a "may this happen here" query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Deny(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny(message) => Some(message),
        }
    }
}

/// Whether a block mutation at `pos` should be vetoed. Members of the owning
/// side are never blocked inside their own zone.
pub fn check_block_change(
    snapshot: &EngineSnapshot,
    actor_owner: Option<&CaptureOwner>,
    world: &str,
    pos: BlockPos,
    breaking: bool,
) -> Decision {
    for (point, class) in snapshot.classify(world, pos) {
        let exempt = match (actor_owner, &point.owner) {
            (Some(actor), Some(holder)) => actor.is_same_owner(holder),
            _ => false,
        };
        if exempt {
            continue;
        }
        let zone = Some(point.id.as_str());
        let denied = match class {
            Classification::Inside => {
                let key = if breaking {
                    keys::PROTECT_BLOCK_BREAK
                } else {
                    keys::PROTECT_BLOCK_PLACE
                };
                snapshot.settings.get_bool(zone, key, true)
            }
            Classification::InBuffer(_) => {
                let key = if breaking {
                    keys::PROTECT_BUFFER_BLOCK_BREAK
                } else {
                    keys::PROTECT_BUFFER_BLOCK_PLACE
                };
                snapshot.settings.get_bool(zone, key, false)
            }
            Classification::Outside => false,
        };
        if denied {
            return Decision::Deny(format!("{} is protected ground", point.id));
        }
    }
    Decision::Allow
}

/// Whether a command issued at `pos` should be vetoed. A session in
/// preparation is governed by a laxer policy than an active capture.
pub fn check_command(
    snapshot: &EngineSnapshot,
    world: &str,
    pos: BlockPos,
) -> Decision {
    for (point, class) in snapshot.classify(world, pos) {
        if !class.is_inside() {
            continue;
        }
        let Some(session) = &point.session else {
            continue;
        };
        let zone = Some(point.id.as_str());
        let denied = if session.is_in_preparation_phase() {
            snapshot
                .settings
                .get_bool(zone, keys::BLOCK_COMMANDS_DURING_PREPARATION, false)
        } else {
            matches!(
                session.phase,
                CapturePhase::Active | CapturePhase::Resolving
            ) && snapshot
                .settings
                .get_bool(zone, keys::BLOCK_COMMANDS_DURING_CAPTURE, true)
        };
        if denied {
            return Decision::Deny(format!("commands are locked while {} is contested", point.id));
        }
    }
    Decision::Allow
}

/// The zone id a death location belongs to, for the statistics collaborator.
pub fn zone_for_death(snapshot: &EngineSnapshot, world: &str, pos: BlockPos) -> Option<String> {
    snapshot.zone_at(world, pos).map(|point| point.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::engine::config::SettingsOverlay;
    use crate::engine::geometry::Zone;
    use crate::engine::observer::{PointSnapshot, SessionSnapshot};
    use crate::engine::owner::{CaptureOwner, OwnerKind};
    use crate::engine::spatial::SpatialIndex;

    fn vanguard() -> CaptureOwner {
        CaptureOwner::from_display_name(OwnerKind::Group, Some("Iron Vanguard")).unwrap()
    }

    fn pact() -> CaptureOwner {
        CaptureOwner::from_display_name(OwnerKind::Group, Some("Ashen Pact")).unwrap()
    }

    fn snapshot(session: Option<SessionSnapshot>, global: serde_json::Value) -> EngineSnapshot {
        let zone = Zone::circle("overworld", BlockPos::new(8.0, 64.0, 8.0), 2, 1);
        let mut index = SpatialIndex::default();
        index.insert(&crate::engine::points::PointId::new("ember_keep"), &zone);
        let mut points = HashMap::new();
        points.insert(
            "ember_keep".to_string(),
            PointSnapshot {
                id: "ember_keep".to_string(),
                zone,
                owner: Some(vanguard()),
                active: true,
                captures: 1,
                session,
            },
        );
        EngineSnapshot {
            points,
            index,
            settings: Arc::new(SettingsOverlay::new(global, HashMap::new())),
            ..EngineSnapshot::default()
        }
    }

    #[test]
    fn rival_block_break_in_core_is_denied_by_default() {
        let snap = snapshot(None, serde_json::Value::Null);
        let decision = check_block_change(
            &snap,
            Some(&pact()),
            "overworld",
            BlockPos::new(8.0, 64.0, 8.0),
            true,
        );
        assert!(decision.is_denied());
        assert!(decision.message().unwrap().contains("ember_keep"));
    }

    #[test]
    fn holder_is_exempt_inside_their_own_zone() {
        let snap = snapshot(None, serde_json::Value::Null);
        let decision = check_block_change(
            &snap,
            Some(&vanguard()),
            "overworld",
            BlockPos::new(8.0, 64.0, 8.0),
            true,
        );
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn buffer_policy_is_relaxed_by_default() {
        let snap = snapshot(None, serde_json::Value::Null);
        // Chunk (3, 0): one ring beyond the core.
        let decision = check_block_change(
            &snap,
            Some(&pact()),
            "overworld",
            BlockPos::new(3.0 * 16.0 + 2.0, 64.0, 8.0),
            true,
        );
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn buffer_policy_can_be_tightened() {
        let snap = snapshot(
            None,
            serde_json::json!({ "protection": { "buffer": { "block-break": true } } }),
        );
        let decision = check_block_change(
            &snap,
            Some(&pact()),
            "overworld",
            BlockPos::new(3.0 * 16.0 + 2.0, 64.0, 8.0),
            true,
        );
        assert!(decision.is_denied());
    }

    #[test]
    fn outside_is_never_denied() {
        let snap = snapshot(None, serde_json::Value::Null);
        let decision = check_block_change(
            &snap,
            Some(&pact()),
            "overworld",
            BlockPos::new(200.0, 64.0, 200.0),
            true,
        );
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn commands_lock_during_active_capture_but_not_preparation() {
        let core = BlockPos::new(8.0, 64.0, 8.0);
        let preparing = snapshot(
            Some(SessionSnapshot {
                phase: CapturePhase::Preparation,
                candidate: pact(),
                progress: 0.5,
            }),
            serde_json::Value::Null,
        );
        assert_eq!(check_command(&preparing, "overworld", core), Decision::Allow);

        let capturing = snapshot(
            Some(SessionSnapshot {
                phase: CapturePhase::Active,
                candidate: pact(),
                progress: 0.2,
            }),
            serde_json::Value::Null,
        );
        assert!(check_command(&capturing, "overworld", core).is_denied());
    }

    #[test]
    fn death_location_maps_to_the_covering_zone() {
        let snap = snapshot(None, serde_json::Value::Null);
        assert_eq!(
            zone_for_death(&snap, "overworld", BlockPos::new(8.0, 64.0, 8.0)),
            Some("ember_keep".to_string())
        );
        assert_eq!(zone_for_death(&snap, "nether", BlockPos::new(8.0, 64.0, 8.0)), None);
    }
}

//! Immutable read model refreshed once per tick.
//!
//! Event-side readers (listeners, UI) clone the snapshot out of the shared
//! lock and query it freely; they never touch the ECS world, so a straggling
//! reader can never block the tick.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::engine::config::SettingsOverlay;
use crate::engine::events::CaptureEvent;
use crate::engine::geometry::{BlockPos, Classification, Zone};
use crate::engine::owner::CaptureOwner;
use crate::engine::session::CapturePhase;
use crate::engine::spatial::SpatialIndex;
use crate::engine::stats::KillBoard;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: CapturePhase,
    pub candidate: CaptureOwner,
    /// Completion of the current phase, 0..1.
    pub progress: f64,
}

impl SessionSnapshot {
    pub fn is_in_preparation_phase(&self) -> bool {
        self.phase == CapturePhase::Preparation
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PointSnapshot {
    pub id: String,
    pub zone: Zone,
    pub owner: Option<CaptureOwner>,
    pub active: bool,
    pub captures: u32,
    pub session: Option<SessionSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActorSnapshot {
    pub name: String,
    pub owner: Option<CaptureOwner>,
    pub world: String,
    pub pos: BlockPos,
}

#[derive(Clone, Default)]
pub struct EngineSnapshot {
    pub tick: u64,
    pub points: HashMap<String, PointSnapshot>,
    pub index: SpatialIndex,
    pub settings: Arc<SettingsOverlay>,
    pub actors: Vec<ActorSnapshot>,
    pub events: Vec<CaptureEvent>,
    pub kills: KillBoard,
    pub balances: Vec<(String, f64)>,
}

impl EngineSnapshot {
    pub fn point(&self, id: &str) -> Option<&PointSnapshot> {
        self.points.get(id)
    }

    /// Non-outside classifications for a position, via the spatial index.
    pub fn classify(&self, world: &str, pos: BlockPos) -> Vec<(&PointSnapshot, Classification)> {
        self.index
            .candidates_near(world, pos, 0)
            .into_iter()
            .filter_map(|id| self.points.get(id.as_str()))
            .filter_map(|point| {
                let class = point.zone.classify(world, pos);
                class.is_protected().then_some((point, class))
            })
            .collect()
    }

    /// The zone a position belongs to, core membership taking precedence
    /// over buffer membership when zones overlap.
    pub fn zone_at(&self, world: &str, pos: BlockPos) -> Option<&PointSnapshot> {
        let hits = self.classify(world, pos);
        hits.iter()
            .find(|(_, class)| class.is_inside())
            .or_else(|| hits.first())
            .map(|(point, _)| *point)
    }
}

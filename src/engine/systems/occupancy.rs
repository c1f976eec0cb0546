//! Drains inbound world events and rebuilds the per-point occupancy table.

use std::collections::HashMap;

use bevy_ecs::prelude::*;

use crate::engine::adapters::Adapters;
use crate::engine::events::{
    ActorRef, CaptureEvent, CaptureEventKind, CaptureEventLog, PendingEvents, WorldEvent,
};
use crate::engine::geometry::{BlockPos, Zone};
use crate::engine::owner::CaptureOwner;
use crate::engine::points::{PointId, PointRegistry};
use crate::engine::spatial::SpatialIndex;
use crate::engine::stats::KillBoard;
use crate::engine::EngineTime;

/// Last known position and affiliation per connected actor.
#[derive(Debug, Default, Resource)]
pub struct ActorTable {
    pub actors: HashMap<u64, ActorPresence>,
}

#[derive(Debug, Clone)]
pub struct ActorPresence {
    pub actor: ActorRef,
    pub world: String,
    pub pos: BlockPos,
    pub owner: Option<CaptureOwner>,
}

/// Distinct owners currently standing in each point's core and buffer.
/// Rebuilt from scratch every tick; sessions only ever read it.
#[derive(Debug, Default, Resource)]
pub struct Occupancy {
    pub by_point: HashMap<Entity, PointOccupancy>,
}

#[derive(Debug, Clone, Default)]
pub struct PointOccupancy {
    pub core: Vec<CaptureOwner>,
    pub buffer: Vec<CaptureOwner>,
}

impl PointOccupancy {
    fn add(list: &mut Vec<CaptureOwner>, owner: &CaptureOwner) {
        if !list.contains(owner) {
            list.push(owner.clone());
        }
    }
}

impl Occupancy {
    pub fn core_owners(&self, point: Entity) -> &[CaptureOwner] {
        self.by_point
            .get(&point)
            .map(|occ| occ.core.as_slice())
            .unwrap_or(&[])
    }
}

pub fn occupancy_system(
    mut pending: ResMut<PendingEvents>,
    mut actors: ResMut<ActorTable>,
    mut occupancy: ResMut<Occupancy>,
    mut kills: ResMut<KillBoard>,
    mut log: ResMut<CaptureEventLog>,
    adapters: Res<Adapters>,
    index: Res<SpatialIndex>,
    registry: Res<PointRegistry>,
    time: Res<EngineTime>,
    zones: Query<(&PointId, &Zone)>,
) {
    let events = std::mem::take(&mut pending.0);
    for event in events {
        match event {
            WorldEvent::Move { actor, world, pos } => {
                let owner = adapters.resolve_owner(&actor);
                actors.actors.insert(
                    actor.id,
                    ActorPresence {
                        actor,
                        world,
                        pos,
                        owner,
                    },
                );
            }
            WorldEvent::Quit { actor } => {
                actors.actors.remove(&actor.id);
            }
            WorldEvent::Kill {
                killer,
                victim,
                world,
                pos,
            } => {
                let zone = covering_zone(&index, &registry, &zones, &world, pos);
                if let Some(zone) = zone {
                    kills.record(&zone, &killer.name);
                    log.push(CaptureEvent::new(
                        time.tick,
                        CaptureEventKind::KillRecorded {
                            point: zone,
                            killer: killer.name,
                            victim: victim.name,
                        },
                    ));
                }
            }
            WorldEvent::Notify { actor, message } => {
                log.push(CaptureEvent::new(
                    time.tick,
                    CaptureEventKind::Notification { actor, message },
                ));
            }
        }
    }

    occupancy.by_point.clear();
    for presence in actors.actors.values() {
        let Some(owner) = &presence.owner else {
            continue;
        };
        for id in index.candidates_near(&presence.world, presence.pos, 0) {
            let Some(entity) = registry.entity(&id) else {
                continue;
            };
            let Ok((_, zone)) = zones.get(entity) else {
                continue;
            };
            let class = zone.classify(&presence.world, presence.pos);
            let slot = occupancy.by_point.entry(entity).or_default();
            if class.is_inside() {
                PointOccupancy::add(&mut slot.core, owner);
            } else if class.is_in_buffer() {
                PointOccupancy::add(&mut slot.buffer, owner);
            }
        }
    }
}

fn covering_zone(
    index: &SpatialIndex,
    registry: &PointRegistry,
    zones: &Query<(&PointId, &Zone)>,
    world: &str,
    pos: BlockPos,
) -> Option<String> {
    let mut buffer_hit = None;
    for id in index.candidates_near(world, pos, 0) {
        let Some(entity) = registry.entity(&id) else {
            continue;
        };
        let Ok((point_id, zone)) = zones.get(entity) else {
            continue;
        };
        let class = zone.classify(world, pos);
        if class.is_inside() {
            return Some(point_id.0.clone());
        }
        if class.is_in_buffer() && buffer_hit.is_none() {
            buffer_hit = Some(point_id.0.clone());
        }
    }
    buffer_hit
}

use std::sync::{Arc, RwLock};

use anyhow::bail;
use bevy_ecs::prelude::*;
use bevy_ecs::schedule::Schedule;

pub mod adapters;
pub mod config;
pub mod events;
pub mod geometry;
pub mod listeners;
pub mod observer;
pub mod owner;
pub mod points;
pub mod session;
pub mod spatial;
pub mod stats;
pub mod systems;

pub use adapters::*;
pub use config::*;
pub use events::*;
pub use geometry::*;
pub use listeners::*;
pub use observer::*;
pub use owner::*;
pub use points::*;
pub use session::*;
pub use spatial::*;
pub use stats::*;
pub use systems::*;

/// Monotonic tick counter, incremented before the schedule runs.
#[derive(Debug, Default, Resource)]
pub struct EngineTime {
    pub tick: u64,
}

pub struct EngineWorld {
    world: World,
    schedule: Schedule,
    observer: Arc<RwLock<EngineSnapshot>>,
}

impl EngineWorld {
    #[allow(dead_code)]
    pub fn new(
        config: EngineConfig,
        overlay: SettingsOverlay,
        adapters: Adapters,
        defs: Vec<PointDef>,
    ) -> Self {
        Self::with_observer(
            config,
            overlay,
            adapters,
            defs,
            Arc::new(RwLock::new(EngineSnapshot::default())),
        )
    }

    pub fn with_observer(
        config: EngineConfig,
        overlay: SettingsOverlay,
        adapters: Adapters,
        defs: Vec<PointDef>,
        observer: Arc<RwLock<EngineSnapshot>>,
    ) -> Self {
        let mut world = World::default();
        let log_capacity = config.event_log_capacity;
        world.insert_resource(config);
        world.insert_resource(Settings(Arc::new(overlay)));
        world.insert_resource(adapters);
        world.insert_resource(EngineTime::default());
        world.insert_resource(PendingEvents::default());
        world.insert_resource(ActorTable::default());
        world.insert_resource(Occupancy::default());
        world.insert_resource(KillBoard::default());
        world.insert_resource(CaptureEventLog::new(log_capacity));
        world.insert_resource(PointRegistry::default());
        world.insert_resource(SpatialIndex::default());
        world.insert_resource(DirtyPoints::default());
        world.insert_resource(PendingSideEffects::default());

        seed_points(&mut world, defs);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                occupancy_system,
                session_system,
                resolution_system,
                reward_system,
                standings_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            observer,
        }
    }

    pub fn tick(&mut self) {
        {
            let mut time = self.world.resource_mut::<EngineTime>();
            time.tick += 1;
        }

        self.schedule.run(&mut self.world);
        self.refresh_observer_snapshot();
    }

    pub fn observer(&self) -> Arc<RwLock<EngineSnapshot>> {
        self.observer.clone()
    }

    /// Queues a host world event for the next tick.
    pub fn push_event(&mut self, event: WorldEvent) {
        self.world.resource_mut::<PendingEvents>().0.push(event);
    }

    /// Registers a new capture point. Ids are unique for the lifetime of the
    /// engine; a clashing id is rejected rather than replaced.
    pub fn create_point(&mut self, def: PointDef) -> anyhow::Result<()> {
        let id = PointId::new(def.id.clone());
        if self.world.resource::<PointRegistry>().contains(&id) {
            bail!("capture point '{}' already exists", def.id);
        }
        spawn_point(&mut self.world, def);
        self.world.resource_mut::<DirtyPoints>().0 = true;
        Ok(())
    }

    /// Replaces a point's zone geometry in place. Moving a point across
    /// worlds is a delete-and-recreate, never an update.
    pub fn update_zone(&mut self, id: &str, zone: Zone) -> anyhow::Result<()> {
        let id = PointId::new(id);
        let Some(entity) = self.world.resource::<PointRegistry>().entity(&id) else {
            bail!("unknown capture point '{}'", id);
        };
        let current_world = self
            .world
            .get::<Zone>(entity)
            .map(|current| current.world.clone())
            .unwrap_or_default();
        if current_world != zone.world {
            bail!(
                "capture point '{}' cannot move from world '{}' to '{}'",
                id,
                current_world,
                zone.world
            );
        }
        self.world
            .resource_mut::<SpatialIndex>()
            .reindex(&id, &zone);
        self.world.entity_mut(entity).insert(zone);
        self.world.resource_mut::<DirtyPoints>().0 = true;
        Ok(())
    }

    pub fn set_owner(&mut self, id: &str, owner: Option<CaptureOwner>) -> anyhow::Result<()> {
        let id = PointId::new(id);
        let Some(entity) = self.world.resource::<PointRegistry>().entity(&id) else {
            bail!("unknown capture point '{}'", id);
        };
        self.world.entity_mut(entity).insert(Ownership(owner.clone()));
        self.world.resource_mut::<DirtyPoints>().0 = true;
        self.world
            .resource_mut::<PendingSideEffects>()
            .markers
            .push(MarkerUpdate::Upsert(MarkerInfo {
                point: id.0,
                owner: owner.map(|owner| owner.name().to_string()),
                phase: None,
            }));
        Ok(())
    }

    /// Toggles contest participation. Deactivation drops any live session;
    /// accrued progress is not banked for reactivation.
    pub fn set_active(&mut self, id: &str, active: bool) -> anyhow::Result<()> {
        let id = PointId::new(id);
        let Some(entity) = self.world.resource::<PointRegistry>().entity(&id) else {
            bail!("unknown capture point '{}'", id);
        };
        let mut entry = self.world.entity_mut(entity);
        entry.insert(Activity(active));
        if !active {
            entry.remove::<CaptureSession>();
        }
        self.world.resource_mut::<DirtyPoints>().0 = true;
        Ok(())
    }

    pub fn remove_point(&mut self, id: &str) -> anyhow::Result<()> {
        let id = PointId::new(id);
        let Some(entity) = self.world.resource_mut::<PointRegistry>().remove(&id) else {
            bail!("unknown capture point '{}'", id);
        };
        self.world.resource_mut::<SpatialIndex>().remove(&id);
        self.world.despawn(entity);
        self.world
            .resource_mut::<PendingSideEffects>()
            .markers
            .push(MarkerUpdate::Remove(id.0));
        self.world.resource_mut::<DirtyPoints>().0 = true;
        Ok(())
    }

    /// Swaps in a freshly loaded settings overlay. Takes effect from the
    /// next tick; snapshot holders keep the overlay they cloned.
    pub fn reload_settings(&mut self, overlay: SettingsOverlay) {
        self.world.insert_resource(Settings(Arc::new(overlay)));
    }

    /// Durable view of every point, sorted by id for stable files.
    pub fn point_defs(&mut self) -> Vec<PointDef> {
        let mut query = self
            .world
            .query::<(&PointId, &Zone, &Ownership, &Activity, &CaptureLedger)>();
        let mut defs: Vec<PointDef> = query
            .iter(&self.world)
            .map(|(id, zone, ownership, activity, ledger)| PointDef {
                id: id.0.clone(),
                zone: zone.clone(),
                owner: ownership.0.clone(),
                active: activity.0,
                captured_before: ledger.captured_before,
                captures: ledger.captures,
            })
            .collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// Clears and reports the dirty flag; the runtime persists when true.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.world.resource_mut::<DirtyPoints>().0)
    }

    fn refresh_observer_snapshot(&mut self) {
        let tick = self.world.resource::<EngineTime>().tick;
        let config = self.world.resource::<EngineConfig>().clone();
        let settings = self.world.resource::<Settings>().0.clone();
        let index = self.world.resource::<SpatialIndex>().clone();
        let kills = self.world.resource::<KillBoard>().clone();
        let events = self.world.resource::<CaptureEventLog>().snapshot();
        let balances = self.world.resource::<Adapters>().bank.accounts();

        let actors = {
            let table = self.world.resource::<ActorTable>();
            let mut actors: Vec<ActorSnapshot> = table
                .actors
                .values()
                .map(|presence| ActorSnapshot {
                    name: presence.actor.name.clone(),
                    owner: presence.owner.clone(),
                    world: presence.world.clone(),
                    pos: presence.pos,
                })
                .collect();
            actors.sort_by(|a, b| a.name.cmp(&b.name));
            actors
        };

        let mut query = self.world.query::<(
            &PointId,
            &Zone,
            &Ownership,
            &Activity,
            &CaptureLedger,
            Option<&CaptureSession>,
        )>();
        let points = query
            .iter(&self.world)
            .map(|(id, zone, ownership, activity, ledger, live)| {
                let session = live.map(|live| SessionSnapshot {
                    phase: live.phase,
                    candidate: live.candidate.clone(),
                    progress: session_progress(live, tick, &settings, &config, &id.0),
                });
                (
                    id.0.clone(),
                    PointSnapshot {
                        id: id.0.clone(),
                        zone: zone.clone(),
                        owner: ownership.0.clone(),
                        active: activity.0,
                        captures: ledger.captures,
                        session,
                    },
                )
            })
            .collect();

        if let Ok(mut snapshot) = self.observer.write() {
            *snapshot = EngineSnapshot {
                tick,
                points,
                index,
                settings,
                actors,
                events,
                kills,
                balances,
            };
        }
    }
}

fn session_progress(
    session: &CaptureSession,
    tick: u64,
    settings: &Arc<SettingsOverlay>,
    config: &EngineConfig,
    zone: &str,
) -> f64 {
    let zone = Some(zone);
    let goal = match session.phase {
        CapturePhase::Preparation => ticks_for(
            settings.get_i64(zone, keys::PREPARATION_SECS, DEFAULT_PREPARATION_SECS),
            config.tick_duration,
        ),
        CapturePhase::Active => ticks_for(
            settings.get_i64(zone, keys::CAPTURE_SECS, DEFAULT_CAPTURE_SECS),
            config.tick_duration,
        ),
        CapturePhase::Resolving => return 1.0,
        CapturePhase::Cooldown => ticks_for(
            settings.get_i64(zone, keys::COOLDOWN_SECS, DEFAULT_COOLDOWN_SECS),
            config.tick_duration,
        ),
    };
    let elapsed = match session.phase {
        CapturePhase::Active => session.occupied_ticks,
        _ => session.ticks_in_phase(tick),
    };
    (elapsed as f64 / goal.max(1) as f64).min(1.0)
}

fn seed_points(world: &mut World, defs: Vec<PointDef>) {
    for def in defs {
        let id = PointId::new(def.id.clone());
        if world.resource::<PointRegistry>().contains(&id) {
            tracing::warn!(point = %id, "duplicate capture point id skipped");
            continue;
        }
        spawn_point(world, def);
    }
}

fn spawn_point(world: &mut World, def: PointDef) {
    let id = PointId::new(def.id);
    world.resource_mut::<SpatialIndex>().insert(&id, &def.zone);
    let entity = world
        .spawn((
            id.clone(),
            def.zone,
            Ownership(def.owner),
            Activity(def.active),
            CaptureLedger {
                captured_before: def.captured_before,
                captures: def.captures,
            },
        ))
        .id();
    world.resource_mut::<PointRegistry>().insert(id, entity);
}

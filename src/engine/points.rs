//! Capture point definitions, components, registry, and the durable store.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use bevy_ecs::prelude::{Component, Entity, Resource};
use serde::{Deserialize, Serialize};

use crate::engine::geometry::Zone;
use crate::engine::owner::CaptureOwner;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Component, Serialize, Deserialize)]
pub struct PointId(pub String);

impl PointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current holder of a point. `None` means unclaimed.
#[derive(Debug, Clone, Default, Component)]
pub struct Ownership(pub Option<CaptureOwner>);

/// Whether the point participates in contests at all.
#[derive(Debug, Clone, Copy, Component)]
pub struct Activity(pub bool);

/// Per-point capture bookkeeping that survives ownership changes.
#[derive(Debug, Clone, Copy, Default, Component)]
pub struct CaptureLedger {
    pub captured_before: bool,
    pub captures: u32,
}

/// Durable twin of a capture point entity. Sessions are deliberately not
/// part of this: a contest in progress is abandoned on restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointDef {
    pub id: String,
    pub zone: Zone,
    #[serde(default)]
    pub owner: Option<CaptureOwner>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub captured_before: bool,
    #[serde(default)]
    pub captures: u32,
}

fn default_active() -> bool {
    true
}

impl PointDef {
    pub fn new(id: impl Into<String>, zone: Zone) -> Self {
        Self {
            id: id.into(),
            zone,
            owner: None,
            active: true,
            captured_before: false,
            captures: 0,
        }
    }
}

/// Single source of truth mapping point ids to their entities.
#[derive(Debug, Default, Resource)]
pub struct PointRegistry {
    by_id: HashMap<PointId, Entity>,
}

impl PointRegistry {
    pub fn insert(&mut self, id: PointId, entity: Entity) -> bool {
        if self.by_id.contains_key(&id) {
            return false;
        }
        self.by_id.insert(id, entity);
        true
    }

    pub fn remove(&mut self, id: &PointId) -> Option<Entity> {
        self.by_id.remove(id)
    }

    pub fn entity(&self, id: &PointId) -> Option<Entity> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &PointId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}

/// Set when ownership or definitions changed this tick; the runtime drains
/// it and persists off the tick thread.
#[derive(Debug, Default, Resource)]
pub struct DirtyPoints(pub bool);

/// JSON-file-backed storage for point definitions.
#[derive(Debug, Clone)]
pub struct PointStore {
    path: PathBuf,
}

impl PointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> anyhow::Result<Vec<PointDef>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading capture points {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing capture points {}", self.path.display()))
    }

    pub fn save(&self, defs: &[PointDef]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(defs).context("encoding capture points")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing capture points {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::geometry::BlockPos;

    #[test]
    fn registry_rejects_duplicate_ids() {
        let mut registry = PointRegistry::default();
        let id = PointId::new("ember_keep");
        assert!(registry.insert(id.clone(), Entity::from_raw(1)));
        assert!(!registry.insert(id.clone(), Entity::from_raw(2)));
        assert_eq!(registry.entity(&id), Some(Entity::from_raw(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn point_def_roundtrips_through_json() {
        let def = PointDef::new(
            "ember_keep",
            Zone::circle("overworld", BlockPos::new(100.0, 64.0, -40.0), 3, 1),
        );
        let raw = serde_json::to_string(&def).unwrap();
        let back: PointDef = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.id, "ember_keep");
        assert!(back.active);
        assert!(back.owner.is_none());
    }

    #[test]
    fn missing_fields_default_on_load() {
        let raw = r#"{
            "id": "old_point",
            "zone": {
                "world": "overworld",
                "shape": { "kind": "circle", "center": { "x": 0.0, "y": 64.0, "z": 0.0 }, "radius": 2 },
                "buffer_chunks": 1
            }
        }"#;
        let def: PointDef = serde_json::from_str(raw).unwrap();
        assert!(def.active);
        assert!(!def.captured_before);
        assert_eq!(def.captures, 0);
    }
}

//! Engine runtime configuration and the per-zone settings overlay.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dotted setting paths understood by the engine.
pub mod keys {
    pub const PREPARATION_SECS: &str = "capture.preparation-seconds";
    pub const CAPTURE_SECS: &str = "capture.duration-seconds";
    pub const COOLDOWN_SECS: &str = "capture.cooldown-seconds";
    pub const ABANDON_GRACE_SECS: &str = "capture.abandon-grace-seconds";
    pub const REWARD_AMOUNT: &str = "rewards.capture-amount";
    pub const FIRST_CAPTURE_BONUS: &str = "rewards.first-capture-bonus";
    pub const PROTECT_BLOCK_BREAK: &str = "protection.block-break";
    pub const PROTECT_BLOCK_PLACE: &str = "protection.block-place";
    pub const PROTECT_BUFFER_BLOCK_BREAK: &str = "protection.buffer.block-break";
    pub const PROTECT_BUFFER_BLOCK_PLACE: &str = "protection.buffer.block-place";
    pub const BLOCK_COMMANDS_DURING_CAPTURE: &str = "commands.block-during-capture";
    pub const BLOCK_COMMANDS_DURING_PREPARATION: &str = "commands.block-during-preparation";
}

pub const DEFAULT_PREPARATION_SECS: i64 = 10;
pub const DEFAULT_CAPTURE_SECS: i64 = 60;
pub const DEFAULT_COOLDOWN_SECS: i64 = 300;
pub const DEFAULT_ABANDON_GRACE_SECS: i64 = 5;
pub const DEFAULT_REWARD_AMOUNT: f64 = 250.0;
pub const DEFAULT_FIRST_CAPTURE_BONUS: f64 = 500.0;

#[derive(Debug, Clone, Resource)]
pub struct EngineConfig {
    pub tick_duration: Duration,
    pub points_path: PathBuf,
    pub settings_path: PathBuf,
    pub event_log_capacity: usize,
    /// Standings report cadence, in ticks. Zero disables the report.
    pub standings_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_secs(1),
            points_path: PathBuf::from("config/points.json"),
            settings_path: PathBuf::from("config/settings.json"),
            event_log_capacity: 256,
            standings_interval: 30,
        }
    }
}

/// Two-level setting lookup: a per-zone override document layered over the
/// global defaults document, then the caller-supplied fallback. Malformed or
/// missing entries fall through one level; they never abort anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsOverlay {
    #[serde(default)]
    global: Value,
    #[serde(default)]
    zones: HashMap<String, Value>,
}

impl SettingsOverlay {
    pub fn new(global: Value, zones: HashMap<String, Value>) -> Self {
        Self { global, zones }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings overlay {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings overlay {}", path.display()))
    }

    pub fn get_bool(&self, zone: Option<&str>, path: &str, fallback: bool) -> bool {
        self.typed(zone, path, fallback, Value::as_bool)
    }

    pub fn get_i64(&self, zone: Option<&str>, path: &str, fallback: i64) -> i64 {
        self.typed(zone, path, fallback, Value::as_i64)
    }

    pub fn get_f64(&self, zone: Option<&str>, path: &str, fallback: f64) -> f64 {
        self.typed(zone, path, fallback, Value::as_f64)
    }

    pub fn get_str(&self, zone: Option<&str>, path: &str, fallback: &str) -> String {
        self.typed(zone, path, fallback.to_string(), |value| {
            value.as_str().map(str::to_string)
        })
    }

    fn typed<T>(
        &self,
        zone: Option<&str>,
        path: &str,
        fallback: T,
        cast: impl Fn(&Value) -> Option<T>,
    ) -> T {
        if let Some(zone) = zone {
            if let Some(value) = self.zones.get(zone).and_then(|doc| lookup(doc, path)) {
                if let Some(typed) = cast(value) {
                    return typed;
                }
            }
        }
        if let Some(typed) = lookup(&self.global, path).and_then(|value| cast(value)) {
            return typed;
        }
        fallback
    }
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cursor = doc;
    for segment in path.split('.') {
        cursor = cursor.as_object()?.get(segment)?;
    }
    Some(cursor)
}

/// Shared handle to the latest overlay. Reloads swap the `Arc`, so readers
/// holding a clone keep a consistent view for the duration of one query.
#[derive(Clone, Resource)]
pub struct Settings(pub Arc<SettingsOverlay>);

impl Default for Settings {
    fn default() -> Self {
        Self(Arc::new(SettingsOverlay::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overlay() -> SettingsOverlay {
        let mut zones = HashMap::new();
        zones.insert(
            "ember_keep".to_string(),
            json!({
                "protection": { "block-break": true },
                "capture": { "duration-seconds": 90 }
            }),
        );
        SettingsOverlay::new(
            json!({
                "protection": { "block-break": false },
                "capture": { "preparation-seconds": 15 }
            }),
            zones,
        )
    }

    #[test]
    fn global_default_wins_over_caller_fallback() {
        let overlay = overlay();
        assert!(!overlay.get_bool(Some("somewhere_else"), keys::PROTECT_BLOCK_BREAK, true));
        assert!(!overlay.get_bool(None, keys::PROTECT_BLOCK_BREAK, true));
    }

    #[test]
    fn zone_override_wins_over_global_and_fallback() {
        let overlay = overlay();
        assert!(overlay.get_bool(Some("ember_keep"), keys::PROTECT_BLOCK_BREAK, false));
        assert_eq!(overlay.get_i64(Some("ember_keep"), keys::CAPTURE_SECS, 60), 90);
    }

    #[test]
    fn absent_path_falls_back_to_caller_value() {
        let overlay = overlay();
        assert_eq!(overlay.get_i64(Some("ember_keep"), keys::COOLDOWN_SECS, 300), 300);
        assert_eq!(overlay.get_f64(None, keys::REWARD_AMOUNT, 250.0), 250.0);
    }

    #[test]
    fn malformed_zone_value_falls_through_to_global() {
        let mut zones = HashMap::new();
        zones.insert(
            "ember_keep".to_string(),
            json!({ "capture": { "preparation-seconds": "soon" } }),
        );
        let overlay = SettingsOverlay::new(
            json!({ "capture": { "preparation-seconds": 15 } }),
            zones,
        );
        assert_eq!(
            overlay.get_i64(Some("ember_keep"), keys::PREPARATION_SECS, 10),
            15
        );
    }

    #[test]
    fn empty_overlay_degrades_to_fallback() {
        let overlay = SettingsOverlay::default();
        assert!(overlay.get_bool(Some("anything"), keys::PROTECT_BLOCK_PLACE, true));
        assert_eq!(overlay.get_str(None, "broadcast.channel", "local"), "local");
    }
}

//! Per-zone kill bookkeeping fed by the kill listener.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ZoneKills {
    pub total: u64,
    pub by_killer: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default, Resource, Serialize)]
pub struct KillBoard {
    pub zones: HashMap<String, ZoneKills>,
}

impl KillBoard {
    pub fn record(&mut self, zone: &str, killer: &str) {
        let tally = self.zones.entry(zone.to_string()).or_default();
        tally.total += 1;
        *tally.by_killer.entry(killer.to_string()).or_default() += 1;
    }

    pub fn total_for(&self, zone: &str) -> u64 {
        self.zones.get(zone).map(|tally| tally.total).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kills_accumulate_per_zone_and_killer() {
        let mut board = KillBoard::default();
        board.record("ember_keep", "Saya");
        board.record("ember_keep", "Saya");
        board.record("ember_keep", "Brant");
        board.record("mire_post", "Brant");
        assert_eq!(board.total_for("ember_keep"), 3);
        assert_eq!(board.total_for("mire_post"), 1);
        assert_eq!(board.zones["ember_keep"].by_killer["Saya"], 2);
        assert_eq!(board.total_for("unknown"), 0);
    }
}

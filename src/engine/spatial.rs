//! Chunk-bucketed spatial index over registered capture points.
//!
//! Buckets are populated out to each zone's full reach at registration time,
//! so a query is a handful of map lookups instead of a scan over every point.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::Resource;

use crate::engine::geometry::{chunk_distance, BlockPos, ChunkCoord, Zone};
use crate::engine::points::PointId;

/// Admissibility slack, in chunks, on top of `radius + buffer + margin`.
const INDEX_SLACK: u32 = 1;

#[derive(Debug, Clone)]
struct Anchor {
    world: String,
    chunk: ChunkCoord,
    reach: u32,
}

#[derive(Debug, Clone, Default, Resource)]
pub struct SpatialIndex {
    buckets: HashMap<String, HashMap<ChunkCoord, Vec<PointId>>>,
    anchors: HashMap<PointId, Anchor>,
}

impl SpatialIndex {
    pub fn insert(&mut self, id: &PointId, zone: &Zone) {
        self.remove(id);
        let chunk = zone.center().chunk();
        let reach = zone.reach_chunks();
        let spread = (reach + INDEX_SLACK) as i32;
        let world_buckets = self.buckets.entry(zone.world.clone()).or_default();
        for dx in -spread..=spread {
            for dz in -spread..=spread {
                world_buckets
                    .entry(ChunkCoord::new(chunk.cx + dx, chunk.cz + dz))
                    .or_default()
                    .push(id.clone());
            }
        }
        self.anchors.insert(
            id.clone(),
            Anchor {
                world: zone.world.clone(),
                chunk,
                reach,
            },
        );
    }

    pub fn remove(&mut self, id: &PointId) {
        let Some(anchor) = self.anchors.remove(id) else {
            return;
        };
        if let Some(world_buckets) = self.buckets.get_mut(&anchor.world) {
            let spread = (anchor.reach + INDEX_SLACK) as i32;
            for dx in -spread..=spread {
                for dz in -spread..=spread {
                    let key = ChunkCoord::new(anchor.chunk.cx + dx, anchor.chunk.cz + dz);
                    if let Some(bucket) = world_buckets.get_mut(&key) {
                        bucket.retain(|entry| entry != id);
                        if bucket.is_empty() {
                            world_buckets.remove(&key);
                        }
                    }
                }
            }
            if world_buckets.is_empty() {
                self.buckets.remove(&anchor.world);
            }
        }
    }

    /// Re-buckets a point after its center, shape, or radius changed.
    pub fn reindex(&mut self, id: &PointId, zone: &Zone) {
        self.insert(id, zone);
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Every point whose reach plus `extra_margin` could plausibly cover the
    /// coordinate. Order carries no meaning.
    pub fn candidates_near(
        &self,
        world: &str,
        pos: BlockPos,
        extra_margin: u32,
    ) -> Vec<PointId> {
        let Some(world_buckets) = self.buckets.get(world) else {
            return Vec::new();
        };
        let chunk = pos.chunk();
        let ring = extra_margin as i32;
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for dx in -ring..=ring {
            for dz in -ring..=ring {
                let key = ChunkCoord::new(chunk.cx + dx, chunk.cz + dz);
                let Some(bucket) = world_buckets.get(&key) else {
                    continue;
                };
                for id in bucket {
                    if !seen.insert(id.clone()) {
                        continue;
                    }
                    let anchor = &self.anchors[id];
                    let limit = (anchor.reach + extra_margin + INDEX_SLACK) as f64;
                    if chunk_distance(anchor.chunk, chunk) <= limit {
                        candidates.push(id.clone());
                    }
                }
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::geometry::ZoneShape;

    fn point(id: &str) -> PointId {
        PointId::new(id)
    }

    fn chunk_pos(cx: i32, cz: i32) -> BlockPos {
        ChunkCoord::new(cx, cz).center()
    }

    fn cuboid_zone(half_extent: f64) -> Zone {
        Zone {
            world: "overworld".to_string(),
            shape: ZoneShape::cuboid(
                BlockPos::new(-half_extent, 0.0, -half_extent),
                BlockPos::new(half_extent, 160.0, half_extent),
            ),
            buffer_chunks: 1,
            y_min: None,
            y_max: None,
        }
    }

    #[test]
    fn candidate_within_reach_is_returned() {
        let mut index = SpatialIndex::default();
        index.insert(
            &point("hill"),
            &Zone::circle("overworld", chunk_pos(0, 0), 2, 1),
        );
        let found = index.candidates_near("overworld", chunk_pos(3, 0), 0);
        assert_eq!(found, vec![point("hill")]);
    }

    #[test]
    fn candidate_beyond_reach_is_not_returned() {
        let mut index = SpatialIndex::default();
        index.insert(
            &point("hill"),
            &Zone::circle("overworld", chunk_pos(0, 0), 2, 1),
        );
        assert!(index
            .candidates_near("overworld", chunk_pos(5, 0), 0)
            .is_empty());
    }

    #[test]
    fn extra_margin_extends_the_query() {
        let mut index = SpatialIndex::default();
        index.insert(
            &point("hill"),
            &Zone::circle("overworld", chunk_pos(0, 0), 2, 1),
        );
        assert!(!index
            .candidates_near("overworld", chunk_pos(5, 0), 2)
            .is_empty());
    }

    #[test]
    fn cuboid_buffer_corner_is_admissible() {
        let mut index = SpatialIndex::default();
        let zone = cuboid_zone(80.0);
        index.insert(&point("bastion"), &zone);
        // Diagonal corner of the buffer ring: the straight-line chunk
        // distance exceeds the half-extent alone.
        let pos = BlockPos::new(88.0, 64.0, 88.0);
        assert!(zone.classify("overworld", pos).is_in_buffer());
        assert_eq!(
            index.candidates_near("overworld", pos, 0),
            vec![point("bastion")]
        );
    }

    #[test]
    fn large_cuboid_core_corner_is_admissible() {
        let mut index = SpatialIndex::default();
        let zone = cuboid_zone(144.0);
        index.insert(&point("bastion"), &zone);
        let pos = BlockPos::new(143.0, 64.0, 143.0);
        assert!(zone.classify("overworld", pos).is_inside());
        assert_eq!(
            index.candidates_near("overworld", pos, 0),
            vec![point("bastion")]
        );
    }

    #[test]
    fn queries_are_scoped_per_world() {
        let mut index = SpatialIndex::default();
        index.insert(
            &point("hill"),
            &Zone::circle("overworld", chunk_pos(0, 0), 2, 1),
        );
        assert!(index
            .candidates_near("nether", chunk_pos(0, 0), 0)
            .is_empty());
    }

    #[test]
    fn reindex_moves_the_buckets() {
        let mut index = SpatialIndex::default();
        index.insert(
            &point("hill"),
            &Zone::circle("overworld", chunk_pos(0, 0), 2, 1),
        );
        index.reindex(
            &point("hill"),
            &Zone::circle("overworld", chunk_pos(40, 40), 2, 1),
        );
        assert!(index
            .candidates_near("overworld", chunk_pos(0, 0), 0)
            .is_empty());
        assert_eq!(
            index.candidates_near("overworld", chunk_pos(40, 40), 0),
            vec![point("hill")]
        );
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn removal_clears_all_buckets() {
        let mut index = SpatialIndex::default();
        index.insert(
            &point("hill"),
            &Zone::circle("overworld", chunk_pos(0, 0), 2, 1),
        );
        index.remove(&point("hill"));
        assert!(index.is_empty());
        assert!(index
            .candidates_near("overworld", chunk_pos(0, 0), 0)
            .is_empty());
    }

    #[test]
    fn overlapping_points_both_appear_once() {
        let mut index = SpatialIndex::default();
        index.insert(
            &point("hill"),
            &Zone::circle("overworld", chunk_pos(0, 0), 2, 1),
        );
        index.insert(
            &point("quarry"),
            &Zone::circle("overworld", chunk_pos(2, 0), 2, 1),
        );
        let mut found = index.candidates_near("overworld", chunk_pos(1, 0), 1);
        found.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(found, vec![point("hill"), point("quarry")]);
    }
}

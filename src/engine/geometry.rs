//! Zone geometry: chunk coordinates, shapes, and the membership test.

use serde::{Deserialize, Serialize};

/// Horizontal span of one chunk, in block units.
pub const CHUNK_SIZE: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl BlockPos {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn chunk(&self) -> ChunkCoord {
        ChunkCoord::containing(self.x, self.z)
    }
}

/// Coarse world-partition coordinate (one cell per chunk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    pub fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    pub fn containing(x: f64, z: f64) -> Self {
        Self {
            cx: (x / CHUNK_SIZE).floor() as i32,
            cz: (z / CHUNK_SIZE).floor() as i32,
        }
    }

    pub fn center(&self) -> BlockPos {
        BlockPos::new(
            self.cx as f64 * CHUNK_SIZE + CHUNK_SIZE / 2.0,
            0.0,
            self.cz as f64 * CHUNK_SIZE + CHUNK_SIZE / 2.0,
        )
    }
}

/// Planar distance between two chunks, in chunk units.
pub fn chunk_distance(a: ChunkCoord, b: ChunkCoord) -> f64 {
    let dx = (a.cx - b.cx) as f64;
    let dz = (a.cz - b.cz) as f64;
    (dx * dx + dz * dz).sqrt()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneShape {
    Circle { center: BlockPos, radius: u32 },
    Cuboid { min: BlockPos, max: BlockPos },
}

impl ZoneShape {
    /// Normalizes cuboid corners so `min` holds the lower bound on every axis.
    pub fn cuboid(a: BlockPos, b: BlockPos) -> Self {
        ZoneShape::Cuboid {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn center(&self) -> BlockPos {
        match self {
            ZoneShape::Circle { center, .. } => *center,
            ZoneShape::Cuboid { min, max } => BlockPos::new(
                (min.x + max.x) / 2.0,
                (min.y + max.y) / 2.0,
                (min.z + max.z) / 2.0,
            ),
        }
    }
}

/// Result of a zone membership query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Inside,
    InBuffer(u32),
    Outside,
}

impl Classification {
    pub fn is_inside(&self) -> bool {
        matches!(self, Classification::Inside)
    }

    pub fn is_in_buffer(&self) -> bool {
        matches!(self, Classification::InBuffer(_))
    }

    /// Inside the core or the protective ring.
    pub fn is_protected(&self) -> bool {
        !matches!(self, Classification::Outside)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, bevy_ecs::prelude::Component)]
pub struct Zone {
    pub world: String,
    pub shape: ZoneShape,
    /// Additional protective rings around the core, in chunk units.
    pub buffer_chunks: u32,
    #[serde(default)]
    pub y_min: Option<f64>,
    #[serde(default)]
    pub y_max: Option<f64>,
}

impl Zone {
    pub fn circle(world: impl Into<String>, center: BlockPos, radius: u32, buffer: u32) -> Self {
        Self {
            world: world.into(),
            shape: ZoneShape::Circle { center, radius },
            buffer_chunks: buffer,
            y_min: None,
            y_max: None,
        }
    }

    pub fn center(&self) -> BlockPos {
        self.shape.center()
    }

    /// Farthest chunk distance at which this zone (core + buffer) can matter.
    /// Cuboid reach runs to the corner diagonal, since the admissibility
    /// filter measures Euclidean chunk distance from the center.
    pub fn reach_chunks(&self) -> u32 {
        let core = match &self.shape {
            ZoneShape::Circle { radius, .. } => *radius,
            ZoneShape::Cuboid { min, max } => {
                let half_x = (max.x - min.x) / 2.0;
                let half_z = (max.z - min.z) / 2.0;
                (half_x.hypot(half_z) / CHUNK_SIZE).ceil() as u32
            }
        };
        core + self.buffer_chunks
    }

    /// Classifies a world position against the core and buffer ring.
    ///
    /// A query against a different world is a definitive `Outside`, not an
    /// error: distances are only meaningful inside one coordinate space.
    pub fn classify(&self, world: &str, pos: BlockPos) -> Classification {
        if world != self.world {
            return Classification::Outside;
        }
        if let Some(y_min) = self.y_min {
            if pos.y < y_min {
                return Classification::Outside;
            }
        }
        if let Some(y_max) = self.y_max {
            if pos.y > y_max {
                return Classification::Outside;
            }
        }
        match &self.shape {
            ZoneShape::Circle { center, radius } => {
                let d = chunk_distance(pos.chunk(), center.chunk());
                if d <= *radius as f64 {
                    Classification::Inside
                } else if d <= (*radius + self.buffer_chunks) as f64 {
                    Classification::InBuffer((d - *radius as f64).ceil().max(1.0) as u32)
                } else {
                    Classification::Outside
                }
            }
            ZoneShape::Cuboid { min, max } => {
                let inside_y = pos.y >= min.y && pos.y <= max.y;
                if inside_y
                    && pos.x >= min.x
                    && pos.x <= max.x
                    && pos.z >= min.z
                    && pos.z <= max.z
                {
                    return Classification::Inside;
                }
                let span = self.buffer_chunks as f64 * CHUNK_SIZE;
                if inside_y
                    && pos.x >= min.x - span
                    && pos.x <= max.x + span
                    && pos.z >= min.z - span
                    && pos.z <= max.z + span
                {
                    let over_x = (min.x - pos.x).max(pos.x - max.x).max(0.0);
                    let over_z = (min.z - pos.z).max(pos.z - max.z).max(0.0);
                    let depth = (over_x.max(over_z) / CHUNK_SIZE).ceil().max(1.0) as u32;
                    Classification::InBuffer(depth)
                } else {
                    Classification::Outside
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle_zone(radius: u32, buffer: u32) -> Zone {
        Zone::circle("overworld", BlockPos::new(8.0, 64.0, 8.0), radius, buffer)
    }

    #[test]
    fn chunk_of_negative_coordinates_floors() {
        assert_eq!(ChunkCoord::containing(-0.5, -16.1), ChunkCoord::new(-1, -2));
        assert_eq!(ChunkCoord::containing(15.9, 16.0), ChunkCoord::new(0, 1));
    }

    #[test]
    fn inside_core_within_radius() {
        let zone = circle_zone(3, 1);
        // Center chunk is (0, 0); chunk (2, 0) is two chunk units away.
        assert_eq!(
            zone.classify("overworld", BlockPos::new(40.0, 64.0, 8.0)),
            Classification::Inside
        );
        assert_eq!(
            zone.classify("overworld", BlockPos::new(8.0, 64.0, 8.0)),
            Classification::Inside
        );
    }

    #[test]
    fn one_chunk_beyond_core_is_buffer_depth_one() {
        let zone = circle_zone(3, 1);
        // Chunk (4, 0): distance 4 = radius + 1.
        assert_eq!(
            zone.classify("overworld", BlockPos::new(4.0 * 16.0 + 2.0, 64.0, 8.0)),
            Classification::InBuffer(1)
        );
    }

    #[test]
    fn beyond_buffer_is_outside() {
        let zone = circle_zone(3, 1);
        // Chunk (5, 0): distance 5 > radius + buffer.
        assert_eq!(
            zone.classify("overworld", BlockPos::new(5.0 * 16.0 + 2.0, 64.0, 8.0)),
            Classification::Outside
        );
    }

    #[test]
    fn world_mismatch_short_circuits_to_outside() {
        let zone = circle_zone(3, 1);
        assert_eq!(
            zone.classify("nether", BlockPos::new(8.0, 64.0, 8.0)),
            Classification::Outside
        );
    }

    #[test]
    fn vertical_bound_excludes_circle_membership() {
        let mut zone = circle_zone(3, 1);
        zone.y_max = Some(100.0);
        assert_eq!(
            zone.classify("overworld", BlockPos::new(8.0, 160.0, 8.0)),
            Classification::Outside
        );
        assert_eq!(
            zone.classify("overworld", BlockPos::new(8.0, 64.0, 8.0)),
            Classification::Inside
        );
    }

    #[test]
    fn cuboid_membership_and_buffer() {
        let zone = Zone {
            world: "overworld".to_string(),
            shape: ZoneShape::cuboid(
                BlockPos::new(32.0, 0.0, 32.0),
                BlockPos::new(0.0, 128.0, 0.0),
            ),
            buffer_chunks: 1,
            y_min: None,
            y_max: None,
        };
        assert_eq!(
            zone.classify("overworld", BlockPos::new(16.0, 64.0, 16.0)),
            Classification::Inside
        );
        assert_eq!(
            zone.classify("overworld", BlockPos::new(40.0, 64.0, 16.0)),
            Classification::InBuffer(1)
        );
        assert_eq!(
            zone.classify("overworld", BlockPos::new(64.0, 64.0, 16.0)),
            Classification::Outside
        );
        // Above the box there is no membership at all.
        assert_eq!(
            zone.classify("overworld", BlockPos::new(16.0, 200.0, 16.0)),
            Classification::Outside
        );
    }

    #[test]
    fn cuboid_reach_covers_the_corner_diagonal() {
        let zone = Zone {
            world: "overworld".to_string(),
            shape: ZoneShape::cuboid(
                BlockPos::new(-80.0, 0.0, -80.0),
                BlockPos::new(80.0, 160.0, 80.0),
            ),
            buffer_chunks: 1,
            y_min: None,
            y_max: None,
        };
        // Corner sits hypot(80, 80) = ~113 blocks out: 8 chunks, plus buffer.
        assert_eq!(zone.reach_chunks(), 9);
    }

    #[test]
    fn cuboid_corners_are_normalized() {
        let shape = ZoneShape::cuboid(BlockPos::new(10.0, 5.0, -3.0), BlockPos::new(-2.0, 9.0, 7.0));
        match shape {
            ZoneShape::Cuboid { min, max } => {
                assert_eq!((min.x, min.y, min.z), (-2.0, 5.0, -3.0));
                assert_eq!((max.x, max.y, max.z), (10.0, 9.0, 7.0));
            }
            _ => unreachable!(),
        }
    }
}

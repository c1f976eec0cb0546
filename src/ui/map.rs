use ratatui::{prelude::*, widgets::Widget};

use crate::engine::{
    BlockPos, CapturePhase, ChunkCoord, Classification, EngineSnapshot, PointSnapshot,
};
use crate::ui::MapOverlay;

/// Chunk-granular tactical map. Each chunk renders as a two-column cell so
/// the grid stays roughly square in a terminal.
pub struct MapWidget<'a> {
    pub snapshot: &'a EngineSnapshot,
    pub overlay: MapOverlay,
    pub selected: Option<&'a str>,
}

impl<'a> Widget for MapWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 4 || area.height < 2 {
            return;
        }
        let world = self.focus_world();
        let Some(world) = world else {
            buf.set_string(
                area.x + 1,
                area.y + 1,
                "no capture points registered",
                Style::default().fg(Color::DarkGray),
            );
            return;
        };
        let Some((min_cx, min_cz, max_cx, max_cz)) = self.chunk_bounds(&world) else {
            return;
        };

        let span_x = (max_cx - min_cx + 1).max(1);
        let span_z = (max_cz - min_cz + 1).max(1);
        let cols = (area.width / 2) as i32;
        let rows = area.height as i32;
        let tick = self.snapshot.tick;

        for row in 0..rows {
            for col in 0..cols {
                let cx = min_cx + col * span_x / cols;
                let cz = min_cz + row * span_z / rows;
                let chunk = ChunkCoord::new(cx, cz);
                let (glyph, style) = self.cell(&world, chunk, tick);
                let x = area.x + (col * 2) as u16;
                let y = area.y + row as u16;
                buf.set_string(x, y, glyph, style);
            }
        }

        // Actors over terrain, point markers over actors.
        for actor in &self.snapshot.actors {
            if actor.world != world {
                continue;
            }
            if let Some((x, y)) = self.project(
                area, actor.pos, min_cx, min_cz, span_x, span_z, cols, rows,
            ) {
                let color = actor
                    .owner
                    .as_ref()
                    .map(|owner| owner.color())
                    .unwrap_or(Color::White);
                buf.set_string(x, y, "@", Style::default().fg(color).bold());
            }
        }
        for point in self.snapshot.points.values() {
            if point.zone.world != world {
                continue;
            }
            if let Some((x, y)) = self.project(
                area,
                point.zone.center(),
                min_cx,
                min_cz,
                span_x,
                span_z,
                cols,
                rows,
            ) {
                let glyph = if self.selected == Some(point.id.as_str()) {
                    "◎"
                } else {
                    "◆"
                };
                let mut style = Style::default().fg(point_color(point, MapOverlay::Ownership, tick));
                if point.session.is_some() && tick % 2 == 0 {
                    style = style.fg(Color::White);
                }
                buf.set_string(x, y, glyph, style.bold());
            }
        }
    }
}

impl<'a> MapWidget<'a> {
    /// The world the map shows: the selected point's, else the first by id.
    fn focus_world(&self) -> Option<String> {
        if let Some(point) = self.selected.and_then(|id| self.snapshot.point(id)) {
            return Some(point.zone.world.clone());
        }
        self.snapshot
            .points
            .values()
            .map(|point| &point.zone.world)
            .min()
            .cloned()
    }

    fn chunk_bounds(&self, world: &str) -> Option<(i32, i32, i32, i32)> {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for point in self.snapshot.points.values() {
            if point.zone.world != world {
                continue;
            }
            let chunk = point.zone.center().chunk();
            let reach = point.zone.reach_chunks() as i32 + 2;
            let entry = (
                chunk.cx - reach,
                chunk.cz - reach,
                chunk.cx + reach,
                chunk.cz + reach,
            );
            bounds = Some(match bounds {
                None => entry,
                Some((ax, az, bx, bz)) => (
                    ax.min(entry.0),
                    az.min(entry.1),
                    bx.max(entry.2),
                    bz.max(entry.3),
                ),
            });
        }
        bounds
    }

    fn cell(&self, world: &str, chunk: ChunkCoord, tick: u64) -> (&'static str, Style) {
        let probe = chunk.center();
        let mut best: Option<(&PointSnapshot, Classification)> = None;
        for point in self.snapshot.points.values() {
            if point.zone.world != world {
                continue;
            }
            let probe = BlockPos::new(probe.x, point.zone.center().y, probe.z);
            match point.zone.classify(world, probe) {
                Classification::Inside => {
                    best = Some((point, Classification::Inside));
                    break;
                }
                class @ Classification::InBuffer(_) => {
                    if best.is_none() {
                        best = Some((point, class));
                    }
                }
                Classification::Outside => {}
            }
        }

        match best {
            Some((point, Classification::Inside)) => {
                ("██", Style::default().fg(point_color(point, self.overlay, tick)))
            }
            Some((point, Classification::InBuffer(_))) => (
                "░░",
                Style::default().fg(point_color(point, self.overlay, tick)),
            ),
            _ => ("· ", Style::default().fg(Color::Rgb(60, 70, 80))),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn project(
        &self,
        area: Rect,
        pos: BlockPos,
        min_cx: i32,
        min_cz: i32,
        span_x: i32,
        span_z: i32,
        cols: i32,
        rows: i32,
    ) -> Option<(u16, u16)> {
        let chunk = pos.chunk();
        let col = (chunk.cx - min_cx) * cols / span_x;
        let row = (chunk.cz - min_cz) * rows / span_z;
        if col < 0 || col >= cols || row < 0 || row >= rows {
            return None;
        }
        Some((area.x + (col * 2) as u16, area.y + row as u16))
    }
}

fn point_color(point: &PointSnapshot, overlay: MapOverlay, tick: u64) -> Color {
    match overlay {
        MapOverlay::Ownership => point
            .owner
            .as_ref()
            .map(|owner| owner.color())
            .unwrap_or(Color::DarkGray),
        MapOverlay::Contests => match point.session.as_ref().map(|session| session.phase) {
            Some(CapturePhase::Preparation) => Color::Yellow,
            Some(CapturePhase::Active) => {
                if tick % 2 == 0 {
                    Color::LightRed
                } else {
                    Color::Red
                }
            }
            Some(CapturePhase::Resolving) => Color::Magenta,
            Some(CapturePhase::Cooldown) => Color::Blue,
            None => {
                if point.active {
                    Color::Green
                } else {
                    Color::DarkGray
                }
            }
        },
    }
}

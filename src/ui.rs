mod control;
mod map;
mod panels;

use std::time::Duration;

use ratatui::{
    prelude::*,
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::engine::{CaptureEvent, CaptureEventKind, EngineSnapshot, Sentiment};
use control::render_control_deck;
use map::MapWidget;
use panels::{render_actors_panel, render_economy_panel, render_points_panel};

#[derive(Debug, Clone)]
pub struct ControlState {
    pub paused: bool,
    pub tick_duration: Duration,
    pub preset_status: Vec<PresetStatus>,
    pub map_overlay: MapOverlay,
    pub log_filter: LogFilter,
    pub selected_point: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PresetStatus {
    pub key: char,
    pub label: &'static str,
    pub intent: &'static str,
    pub tick_ms: u64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOverlay {
    Ownership,
    Contests,
}

impl MapOverlay {
    pub fn label(&self) -> &'static str {
        match self {
            MapOverlay::Ownership => "Territory/Holder",
            MapOverlay::Contests => "Contest/Phase",
        }
    }

    pub fn next(self) -> Self {
        match self {
            MapOverlay::Ownership => MapOverlay::Contests,
            MapOverlay::Contests => MapOverlay::Ownership,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFilter {
    All,
    Contest,
    Capture,
    Reward,
    Kill,
}

impl LogFilter {
    pub fn label(&self) -> &'static str {
        match self {
            LogFilter::All => "All",
            LogFilter::Contest => "Contest",
            LogFilter::Capture => "Capture",
            LogFilter::Reward => "Reward",
            LogFilter::Kill => "Kill",
        }
    }

    pub fn next(self) -> Self {
        match self {
            LogFilter::All => LogFilter::Contest,
            LogFilter::Contest => LogFilter::Capture,
            LogFilter::Capture => LogFilter::Reward,
            LogFilter::Reward => LogFilter::Kill,
            LogFilter::Kill => LogFilter::All,
        }
    }

    fn admits(&self, event: &CaptureEvent) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Contest => event.category() == "Contest",
            LogFilter::Capture => event.category() == "Capture",
            LogFilter::Reward => event.category() == "Reward",
            LogFilter::Kill => event.category() == "Kill",
        }
    }
}

pub fn render(frame: &mut Frame, snapshot: &EngineSnapshot, control: &ControlState) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Min(0),
        ])
        .split(frame.size());

    let contested = snapshot
        .points
        .values()
        .filter(|point| point.session.is_some())
        .count();
    let claimed = snapshot
        .points
        .values()
        .filter(|point| point.owner.is_some())
        .count();

    let header_lines = vec![
        Line::from(vec![
            Span::styled(" OUTPOST — capture contest engine ", Style::default().bold()),
            Span::raw(" | "),
            Span::styled(
                format!("Tick {}", snapshot.tick),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(vec![
            Span::styled(
                format!("Points {}", snapshot.points.len()),
                Style::default().fg(Color::White),
            ),
            Span::raw(" | "),
            Span::styled(format!("Claimed {claimed}"), Style::default().fg(Color::Green)),
            Span::raw(" | "),
            Span::styled(
                format!("Contested {contested}"),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw(" | "),
            Span::styled(
                format!("Actors {}", snapshot.actors.len()),
                Style::default().fg(Color::Magenta),
            ),
        ]),
        Line::from(vec![
            Span::styled("Wire ", Style::default().fg(Color::LightYellow).bold()),
            Span::raw("→ "),
            Span::styled(narrative_ticker(snapshot), Style::default().fg(Color::White)),
        ]),
    ];
    let header = Paragraph::new(header_lines).block(Block::new().borders(Borders::TOP));
    frame.render_widget(header, main_layout[0]);

    render_control_deck(frame, main_layout[1], snapshot, control);

    let content_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_layout[2]);

    let top_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(42), Constraint::Percentage(58)])
        .split(content_layout[0]);

    let left_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),
            Constraint::Length(6),
            Constraint::Length(6),
        ])
        .split(top_layout[0]);

    render_points_panel(frame, left_layout[0], snapshot, control);
    render_actors_panel(frame, left_layout[1], snapshot);
    render_economy_panel(frame, left_layout[2], snapshot);

    let map = MapWidget {
        snapshot,
        overlay: control.map_overlay,
        selected: control.selected_point.as_deref(),
    };
    frame.render_widget(map, top_layout[1]);

    render_event_table(frame, content_layout[1], snapshot, control);
}

fn render_event_table(
    frame: &mut Frame,
    area: Rect,
    snapshot: &EngineSnapshot,
    control: &ControlState,
) {
    let header_cells = ["Tick", "Category", "Headline"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::White).bold()));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows: Vec<Row> = snapshot
        .events
        .iter()
        .rev()
        .filter(|event| control.log_filter.admits(event))
        .take(16)
        .map(|event| {
            let style = match event.sentiment() {
                Sentiment::Positive => Style::default().fg(Color::Green),
                Sentiment::Neutral => Style::default().fg(Color::Gray),
                Sentiment::Negative => Style::default().fg(Color::Red),
            };
            let category_style = Style::default().fg(category_color(event.category()));
            Row::new(vec![
                Cell::from(event.tick.to_string()),
                Cell::from(event.category()).style(category_style),
                Cell::from(event.headline()),
            ])
            .height(1)
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Min(30),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(format!("Event Wire — filter {}", control.log_filter.label()))
            .borders(Borders::ALL),
    );
    frame.render_widget(table, area);
}

fn category_color(category: &str) -> Color {
    match category {
        "Contest" => Color::Yellow,
        "Capture" => Color::LightGreen,
        "Reward" => Color::LightCyan,
        "Kill" => Color::LightRed,
        "Notice" => Color::Magenta,
        _ => Color::White,
    }
}

fn narrative_ticker(snapshot: &EngineSnapshot) -> String {
    let mut snippets: Vec<String> = Vec::new();
    for event in snapshot.events.iter().rev().take(3) {
        let snippet = match &event.kind {
            CaptureEventKind::Captured { point, new_owner, .. } => {
                format!("{} falls to {}", point, new_owner.name())
            }
            CaptureEventKind::ControlSeized { point, challenger, .. } => {
                format!("{} seized inside {}", challenger.name(), point)
            }
            CaptureEventKind::KillRecorded { point, killer, .. } => {
                format!("{} hunting in {}", killer, point)
            }
            _ => event.headline(),
        };
        snippets.push(snippet);
    }
    if snippets.is_empty() {
        "Quiet frontier — no recent activity".to_string()
    } else {
        snippets.join(" · ")
    }
}

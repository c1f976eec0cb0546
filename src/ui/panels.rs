use ratatui::{
    prelude::*,
    style::Stylize,
    widgets::{Block, BorderType, Borders, Cell, Row, Table},
};

use super::ControlState;
use crate::engine::EngineSnapshot;

pub fn render_points_panel(
    frame: &mut Frame,
    area: Rect,
    snapshot: &EngineSnapshot,
    control: &ControlState,
) {
    let header_cells = ["Point", "Holder", "Status", "Prog", "Capt", "Kills"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::White).bold()));
    let header = Row::new(header_cells).height(1);

    let mut points: Vec<_> = snapshot.points.values().collect();
    points.sort_by(|a, b| a.id.cmp(&b.id));

    let rows: Vec<Row> = points
        .iter()
        .map(|point| {
            let holder_cell = match &point.owner {
                Some(owner) => Cell::from(owner.name().to_string())
                    .style(Style::default().fg(owner.color())),
                None => Cell::from("unclaimed").style(Style::default().fg(Color::DarkGray)),
            };
            let (status, status_style) = match (&point.session, point.active) {
                (_, false) => ("Dormant".to_string(), Style::default().fg(Color::DarkGray)),
                (Some(session), _) => (
                    format!("{} {}", session.phase.label(), session.candidate.name()),
                    Style::default().fg(Color::Yellow),
                ),
                (None, _) => ("Idle".to_string(), Style::default().fg(Color::Green)),
            };
            let progress = point
                .session
                .as_ref()
                .map(|session| progress_bar(session.progress))
                .unwrap_or_default();

            let mut row_style = Style::default();
            if control.selected_point.as_deref() == Some(point.id.as_str()) {
                row_style = row_style.bold().fg(Color::White);
            }
            Row::new(vec![
                Cell::from(point.id.clone()),
                holder_cell,
                Cell::from(status).style(status_style),
                Cell::from(progress),
                Cell::from(point.captures.to_string()),
                Cell::from(snapshot.kills.total_for(&point.id).to_string()),
            ])
            .style(row_style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Min(18),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(5),
        ],
    )
    .header(header)
    .block(
        Block::bordered()
            .title(" CAPTURE POINTS ")
            .title_style(Style::default().fg(Color::LightCyan).bold())
            .border_type(BorderType::Rounded),
    );
    frame.render_widget(table, area);
}

pub fn render_actors_panel(frame: &mut Frame, area: Rect, snapshot: &EngineSnapshot) {
    let rows: Vec<Row> = snapshot
        .actors
        .iter()
        .take((area.height.saturating_sub(3)) as usize)
        .map(|actor| {
            let side_cell = match &actor.owner {
                Some(owner) => Cell::from(owner.name().to_string())
                    .style(Style::default().fg(owner.color())),
                None => Cell::from("-").style(Style::default().fg(Color::DarkGray)),
            };
            let chunk = actor.pos.chunk();
            let location = snapshot
                .zone_at(&actor.world, actor.pos)
                .map(|point| point.id.clone())
                .unwrap_or_else(|| format!("({}, {})", chunk.cx, chunk.cz));
            Row::new(vec![
                Cell::from(actor.name.clone()),
                side_cell,
                Cell::from(location),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Min(12),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title("Actors"));
    frame.render_widget(table, area);
}

pub fn render_economy_panel(frame: &mut Frame, area: Rect, snapshot: &EngineSnapshot) {
    let rows: Vec<Row> = snapshot
        .balances
        .iter()
        .take((area.height.saturating_sub(3)) as usize)
        .map(|(account, held)| {
            Row::new(vec![
                Cell::from(account.clone()),
                Cell::from(format!("{held:.0}"))
                    .style(Style::default().fg(Color::LightGreen)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Min(18), Constraint::Length(10)]).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Treasury — capture rewards"),
    );
    frame.render_widget(table, area);
}

fn progress_bar(progress: f64) -> String {
    let filled = (progress.clamp(0.0, 1.0) * 5.0).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(5 - filled))
}

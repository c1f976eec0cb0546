use ratatui::{
    prelude::*,
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

use super::ControlState;
use crate::engine::EngineSnapshot;

/// Renders the control deck with status, presets, and the map legend.
pub fn render_control_deck(
    frame: &mut Frame,
    area: Rect,
    snapshot: &EngineSnapshot,
    control: &ControlState,
) {
    let block = Block::default()
        .title("WATCH POST — tempo / overlay / filters")
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(2, 5),
            Constraint::Ratio(2, 5),
            Constraint::Ratio(1, 5),
        ])
        .split(inner);

    let active_preset = control
        .preset_status
        .iter()
        .find(|preset| preset.active)
        .map(|preset| format!("{} [{}]", preset.label, preset.key))
        .unwrap_or_else(|| "Manual".to_string());

    let status_lines = vec![
        Line::from(vec![
            Span::styled(
                if control.paused { "PAUSED" } else { "LIVE" },
                Style::default()
                    .fg(if control.paused {
                        Color::Yellow
                    } else {
                        Color::LightGreen
                    })
                    .bold(),
            ),
            Span::raw(" · Tick "),
            Span::styled(
                format!("{} ms", control.tick_duration.as_millis()),
                Style::default().fg(Color::White),
            ),
            Span::raw(" · Preset "),
            Span::styled(active_preset, Style::default().fg(Color::Magenta)),
        ]),
        Line::from(vec![
            Span::styled("Map ", Style::default().fg(Color::White)),
            Span::styled(
                control.map_overlay.label(),
                Style::default().fg(Color::LightCyan).bold(),
            ),
            Span::raw(" · [ ] cycle · Log "),
            Span::styled(
                control.log_filter.label(),
                Style::default().fg(Color::Cyan).bold(),
            ),
            Span::raw(" · F cycle"),
        ]),
        Line::from(vec![
            Span::raw("Selected "),
            Span::styled(
                control
                    .selected_point
                    .clone()
                    .unwrap_or_else(|| "None".to_string()),
                Style::default().fg(Color::LightGreen),
            ),
            Span::raw(" · Tab cycle points"),
        ]),
        Line::from(vec![
            Span::styled("Hotkeys:", Style::default().fg(Color::Yellow)),
            Span::raw(" Space/P pause  "),
            Span::styled("+-", Style::default().fg(Color::Green)),
            Span::raw(" tick speed  "),
            Span::styled("1~4", Style::default().fg(Color::LightMagenta)),
            Span::raw(" preset  "),
            Span::styled("L", Style::default().fg(Color::LightCyan)),
            Span::raw(" reload settings  "),
            Span::styled("R", Style::default().fg(Color::LightYellow)),
            Span::raw(" reset  "),
            Span::styled("Q", Style::default().fg(Color::Red)),
            Span::raw(" quit"),
        ]),
    ];
    let status_paragraph = Paragraph::new(status_lines).wrap(Wrap { trim: true });
    frame.render_widget(status_paragraph, columns[0]);

    let preset_rows: Vec<Row> = control
        .preset_status
        .iter()
        .map(|preset| {
            let marker = if preset.active { "▶" } else { "·" };
            Row::new(vec![
                Cell::from(format!("{marker} {}", preset.label)),
                Cell::from(format!("{} | {}", preset.key, preset.intent)),
                Cell::from(format!("{} ms", preset.tick_ms)),
            ])
            .style(if preset.active {
                Style::default().fg(Color::LightGreen).bold()
            } else {
                Style::default().fg(Color::White)
            })
        })
        .collect();

    let preset_table = Table::new(
        preset_rows,
        [
            Constraint::Length(12),
            Constraint::Min(16),
            Constraint::Length(9),
        ],
    )
    .header(Row::new(vec!["Preset", "Role", "Tick"]).style(Style::default().fg(Color::White).bold()))
    .block(Block::default().borders(Borders::ALL).title("Tempo Presets"));
    frame.render_widget(preset_table, columns[1]);

    let contested: Vec<&str> = snapshot
        .points
        .values()
        .filter(|point| point.session.is_some())
        .map(|point| point.id.as_str())
        .collect();
    let legend_lines = vec![
        Line::from(vec![
            Span::styled("Map", Style::default().fg(Color::White).bold()),
            Span::raw(" ██ Core | ░░ Buffer | ◆ Point | @ Actor"),
        ]),
        Line::from("Contest colors: prep yellow, active red, cooldown blue"),
        Line::from(if contested.is_empty() {
            "No live contests".to_string()
        } else {
            format!("Live: {}", contested.join(", "))
        }),
        Line::from(format!(
            "Events {} | Accounts {}",
            snapshot.events.len(),
            snapshot.balances.len()
        )),
    ];
    let legend = Paragraph::new(legend_lines)
        .block(Block::default().borders(Borders::ALL).title("Legend"))
        .wrap(Wrap { trim: true });
    frame.render_widget(legend, columns[2]);
}

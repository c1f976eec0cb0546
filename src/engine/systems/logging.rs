//! Colorized standings pulse for quick CLI scanning.

use bevy_ecs::prelude::*;
use colored::{Color, Colorize};
use tracing::info;

use crate::engine::config::EngineConfig;
use crate::engine::events::{CaptureEvent, CaptureEventLog, Sentiment};
use crate::engine::points::{Activity, CaptureLedger, Ownership, PointId};
use crate::engine::session::CaptureSession;
use crate::engine::stats::KillBoard;
use crate::engine::EngineTime;

fn badge(label: &str, color: Color) -> String {
    format!("[{}]", label).color(color).to_string()
}

fn category_color(category: &str) -> Color {
    match category {
        "Contest" => Color::BrightYellow,
        "Capture" => Color::BrightGreen,
        "Reward" => Color::BrightCyan,
        "Kill" => Color::Red,
        "Notice" => Color::BrightMagenta,
        _ => Color::White,
    }
}

fn sentiment_tag(sentiment: Sentiment) -> String {
    match sentiment {
        Sentiment::Positive => badge("Up", Color::BrightGreen),
        Sentiment::Neutral => badge("Flat", Color::BrightBlack),
        Sentiment::Negative => badge("Down", Color::BrightRed),
    }
}

fn format_event_line(event: &CaptureEvent) -> String {
    format!(
        "{} {} {} {}",
        badge(event.category(), category_color(event.category())),
        sentiment_tag(event.sentiment()),
        badge(&format!("Tick {}", event.tick), Color::BrightBlack),
        event.headline()
    )
}

fn format_point_line(
    id: &PointId,
    ownership: &Ownership,
    activity: &Activity,
    ledger: &CaptureLedger,
    session: Option<&CaptureSession>,
    kills: &KillBoard,
) -> String {
    let point_badge = badge(&id.0, Color::BrightWhite);
    let holder = match &ownership.0 {
        Some(owner) => owner.name().color(owner.logging_color()).bold().to_string(),
        None => "unclaimed".color(Color::BrightBlack).to_string(),
    };
    let status_badge = if !activity.0 {
        badge("Dormant", Color::BrightBlack)
    } else {
        match session {
            Some(session) => {
                let contender = session
                    .candidate
                    .name()
                    .color(session.candidate.logging_color())
                    .to_string();
                format!(
                    "{} {}",
                    badge(session.phase.label(), Color::BrightYellow),
                    contender
                )
            }
            None => badge("Idle", Color::BrightGreen),
        }
    };
    let captures_badge = badge(&format!("Captures {}", ledger.captures), Color::BrightCyan);
    let kills_badge = badge(&format!("Kills {}", kills.total_for(&id.0)), Color::Red);

    format!(
        "{} held by {} | {} {} {}",
        point_badge, holder, status_badge, captures_badge, kills_badge
    )
}

pub fn standings_system(
    time: Res<EngineTime>,
    config: Res<EngineConfig>,
    events: Res<CaptureEventLog>,
    kills: Res<KillBoard>,
    points: Query<(
        &PointId,
        &Ownership,
        &Activity,
        &CaptureLedger,
        Option<&CaptureSession>,
    )>,
) {
    if config.standings_interval == 0 || time.tick % config.standings_interval != 0 {
        return;
    }

    let contested = points
        .iter()
        .filter(|(_, _, _, _, session)| session.is_some())
        .count();
    let header_line = format!(
        "{} {} {} {}",
        badge("Standings", Color::BrightWhite),
        badge(&format!("Tick {}", time.tick), Color::BrightBlack),
        badge(&format!("Points {}", points.iter().count()), Color::BrightBlue),
        badge(&format!("Contested {}", contested), Color::BrightYellow),
    );

    let mut lines = vec![header_line];
    let mut rows: Vec<_> = points.iter().collect();
    rows.sort_by(|a, b| a.0 .0.cmp(&b.0 .0));
    for (id, ownership, activity, ledger, session) in rows {
        lines.push(format_point_line(id, ownership, activity, ledger, session, &kills));
    }

    let recent_events: Vec<String> = events
        .snapshot()
        .into_iter()
        .rev()
        .take(3)
        .map(|event| format_event_line(&event))
        .collect();
    if recent_events.is_empty() {
        lines.push(
            "[Event] No recent capture events registered"
                .color(Color::BrightBlack)
                .to_string(),
        );
    } else {
        lines.extend(recent_events);
    }

    let output = lines.join("\n");
    info!("\n{}", output);
}

use std::io::{self, stdout};
use std::panic;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, prelude::*};
use tokio::sync::{Notify, mpsc, watch};
use tracing::warn;

mod engine;
mod feed;
mod ui;

use engine::{
    ActorRef, Adapters, BlockPos, CaptureOwner, EngineConfig, EngineSnapshot, EngineWorld,
    LedgerBank, OwnerKind, PointDef, PointStore, SettingsOverlay, StandaloneDirectory, Zone,
    ZoneShape,
};
use feed::{ActorFeed, Persona};
use ui::{ControlState, LogFilter, MapOverlay, PresetStatus};

#[derive(Clone, Copy)]
struct SpeedPreset {
    key: char,
    label: &'static str,
    intent: &'static str,
    tick_ms: u64,
}

impl SpeedPreset {
    fn duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

const SPEED_PRESETS: [SpeedPreset; 4] = [
    SpeedPreset {
        key: '1',
        label: "Patrol",
        intent: "slow watch",
        tick_ms: 1_600,
    },
    SpeedPreset {
        key: '2',
        label: "Skirmish",
        intent: "steady pace",
        tick_ms: 1_000,
    },
    SpeedPreset {
        key: '3',
        label: "Siege",
        intent: "fast contest",
        tick_ms: 400,
    },
    SpeedPreset {
        key: '4',
        label: "Blitz",
        intent: "stress run",
        tick_ms: 120,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_file = std::fs::File::create("outpost.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(true)
        .init();

    let config = EngineConfig::default();
    let initial_tick_duration = config.tick_duration;
    let settings_path = config.settings_path.clone();

    let overlay = match SettingsOverlay::load(&config.settings_path) {
        Ok(overlay) => overlay,
        Err(err) => {
            warn!(%err, "settings overlay unavailable, using defaults");
            SettingsOverlay::default()
        }
    };
    let store = PointStore::new(&config.points_path);
    let defs = match store.load() {
        Ok(defs) => defs,
        Err(err) => {
            warn!(%err, "point definitions unavailable, seeding demo frontier");
            let defs = demo_points();
            if let Err(err) = store.save(&defs) {
                warn!(%err, "could not persist seeded points");
            }
            defs
        }
    };

    let (tick_duration_tx, mut tick_duration_rx) = watch::channel(initial_tick_duration);
    let (pause_tx, mut pause_rx) = watch::channel(false);
    let (reload_tx, mut reload_rx) = mpsc::unbounded_channel::<SettingsOverlay>();
    let mut active_preset: Option<char> = Some('2');

    let observer = Arc::new(RwLock::new(EngineSnapshot::default()));
    let shutdown_notify = Arc::new(Notify::new());

    let mut roster = ActorFeed::new();
    let adapters = demo_adapters(&mut roster);
    let mut engine =
        EngineWorld::with_observer(config, overlay, adapters, defs, observer.clone());
    engine.tick();

    let observer_for_feed = observer.clone();
    let notify_for_engine = shutdown_notify.clone();
    let engine_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(*tick_duration_rx.borrow());
        let mut paused = *pause_rx.borrow();
        let mut tick: u64 = 0;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if paused {
                        continue;
                    }
                    tick += 1;
                    let snapshot = observer_for_feed
                        .read()
                        .map(|snap| snap.clone())
                        .unwrap_or_default();
                    for event in roster.step(tick, &snapshot) {
                        engine.push_event(event);
                    }
                    engine.tick();
                    if engine.take_dirty() {
                        let defs = engine.point_defs();
                        let store = store.clone();
                        tokio::task::spawn_blocking(move || {
                            if let Err(err) = store.save(&defs) {
                                warn!(%err, "persisting capture points failed");
                            }
                        });
                    }
                },
                result = tick_duration_rx.changed() => {
                    if result.is_ok() {
                        interval = tokio::time::interval(*tick_duration_rx.borrow());
                    } else {
                        break;
                    }
                },
                result = pause_rx.changed() => {
                    if result.is_ok() {
                        paused = *pause_rx.borrow();
                    } else {
                        break;
                    }
                },
                Some(overlay) = reload_rx.recv() => {
                    engine.reload_settings(overlay);
                },
                _ = notify_for_engine.notified() => break,
            }
        }
    });
    let ctrlc_notify = shutdown_notify.clone();
    let ctrl_c_task = tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrlc_notify.notify_waiters();
    });

    let mut terminal = init_terminal()?;
    let mut term_guard = TerminalGuard::new();
    panic::set_hook(Box::new(|info| {
        let _ = restore_terminal();
        eprintln!("panic: {info}");
    }));

    let mut map_overlay = MapOverlay::Ownership;
    let mut log_filter = LogFilter::All;
    let mut selected_point: Option<String> = None;
    let mut app_should_run = true;

    while app_should_run {
        let control_state = ControlState {
            paused: *pause_tx.borrow(),
            tick_duration: *tick_duration_tx.borrow(),
            preset_status: preset_status(active_preset),
            map_overlay,
            log_filter,
            selected_point: selected_point.clone(),
        };

        terminal.draw(|frame| {
            let snapshot = observer.read().expect("observer lock is poisoned").clone();
            ui::render(frame, &snapshot, &control_state);
        })?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => app_should_run = false,
                    KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Char('P') => {
                        let new_state = !*pause_tx.borrow();
                        pause_tx.send(new_state).ok();
                    }
                    KeyCode::Char(c @ '1'..='4') => {
                        if let Some(selected) = apply_preset(c, &tick_duration_tx) {
                            active_preset = Some(selected);
                            pause_tx.send(false).ok();
                        }
                    }
                    KeyCode::Char('+') | KeyCode::Char('=') => {
                        let current = *tick_duration_tx.borrow();
                        active_preset = None;
                        tick_duration_tx
                            .send((current / 2).max(Duration::from_millis(1)))
                            .ok();
                    }
                    KeyCode::Char('-') => {
                        let current = *tick_duration_tx.borrow();
                        active_preset = None;
                        tick_duration_tx.send(current * 2).ok();
                    }
                    KeyCode::Char('[') | KeyCode::Char(']') => {
                        map_overlay = map_overlay.next();
                    }
                    KeyCode::Char('f') | KeyCode::Char('F') => {
                        log_filter = log_filter.next();
                    }
                    KeyCode::Char('l') | KeyCode::Char('L') => {
                        match SettingsOverlay::load(&settings_path) {
                            Ok(overlay) => {
                                reload_tx.send(overlay).ok();
                            }
                            Err(err) => {
                                warn!(%err, "settings reload failed, keeping current overlay");
                            }
                        }
                    }
                    KeyCode::Tab => {
                        let snapshot =
                            observer.read().expect("observer lock is poisoned").clone();
                        selected_point = next_point(&snapshot, selected_point.as_deref());
                    }
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        active_preset = Some('2');
                        tick_duration_tx.send(initial_tick_duration).ok();
                        pause_tx.send(false).ok();
                    }
                    _ => {}
                }
            }
        }

        if ctrl_c_task.is_finished() {
            app_should_run = false;
        }
    }

    shutdown_notify.notify_waiters();
    engine_task.await?;
    restore_terminal()?;
    term_guard.disarm();

    Ok(())
}

fn preset_status(active: Option<char>) -> Vec<PresetStatus> {
    SPEED_PRESETS
        .iter()
        .map(|preset| PresetStatus {
            key: preset.key,
            label: preset.label,
            intent: preset.intent,
            tick_ms: preset.tick_ms,
            active: Some(preset.key) == active,
        })
        .collect()
}

fn apply_preset(key: char, tick_duration_tx: &watch::Sender<Duration>) -> Option<char> {
    let preset = SPEED_PRESETS.iter().find(|p| p.key == key)?;
    tick_duration_tx.send(preset.duration()).ok();
    Some(key)
}

fn next_point(snapshot: &EngineSnapshot, current: Option<&str>) -> Option<String> {
    let mut ids: Vec<&String> = snapshot.points.keys().collect();
    if ids.is_empty() {
        return None;
    }
    ids.sort();
    let next = match current {
        Some(current) => ids
            .iter()
            .position(|id| id.as_str() == current)
            .map(|index| (index + 1) % ids.len())
            .unwrap_or(0),
        None => 0,
    };
    Some(ids[next].clone())
}

/// Demo frontier used when no points file exists yet.
fn demo_points() -> Vec<PointDef> {
    vec![
        PointDef::new(
            "ember_keep",
            Zone::circle("overworld", BlockPos::new(8.0, 64.0, 8.0), 3, 1),
        ),
        PointDef::new(
            "mire_post",
            Zone::circle("overworld", BlockPos::new(420.0, 64.0, -180.0), 2, 1),
        ),
        PointDef::new(
            "gale_rock",
            Zone {
                world: "overworld".to_string(),
                shape: ZoneShape::cuboid(
                    BlockPos::new(-320.0, 0.0, 200.0),
                    BlockPos::new(-240.0, 160.0, 280.0),
                ),
                buffer_chunks: 1,
                y_min: None,
                y_max: None,
            },
        ),
    ]
}

fn demo_adapters(roster: &mut ActorFeed) -> Adapters {
    let vanguard =
        CaptureOwner::from_display_name(OwnerKind::Group, Some("Iron Vanguard")).expect("name");
    let pact =
        CaptureOwner::from_display_name(OwnerKind::Group, Some("Ashen Pact")).expect("name");

    let mut directory = StandaloneDirectory::default();
    let bank = LedgerBank::default()
        .with_account(&vanguard.id, 1_000.0)
        .with_account(&pact.id, 1_000.0);

    let sides = [
        (vanguard, BlockPos::new(-100.0, 64.0, -100.0)),
        (pact, BlockPos::new(520.0, 64.0, -80.0)),
    ];
    let names = [
        ["Saya", "Brant", "Ilka"],
        ["Moss", "Petra", "Voss"],
    ];
    let mut id = 0;
    for ((owner, home), squad) in sides.iter().zip(names.iter()) {
        for name in squad {
            id += 1;
            directory.enroll(name, owner.clone());
            roster.enlist(
                ActorRef::new(id, *name),
                owner.clone(),
                "overworld",
                *home,
                Persona {
                    bold: 0.3 + (id as f32 * 0.13) % 0.6,
                    restless: 0.2 + (id as f32 * 0.29) % 0.6,
                },
            );
        }
    }

    Adapters::standalone(directory, bank)
}

fn init_terminal() -> io::Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Ensures terminal is restored on panic/early-return.
struct TerminalGuard {
    armed: bool,
}

impl TerminalGuard {
    fn new() -> Self {
        Self { armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = restore_terminal();
        }
    }
}

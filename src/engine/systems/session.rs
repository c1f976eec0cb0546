//! Capture session state machine, advanced once per tick.
//!
//! Phase walk: (no session) -> Preparation -> Active -> Resolving ->
//! Cooldown -> (no session). Only core occupancy drives progress; buffer
//! occupancy is protection-only. Accrual is first past the post: a
//! displaced side's progress is wiped and never restored.

use bevy_ecs::prelude::*;

use crate::engine::adapters::{MarkerInfo, MarkerUpdate, PendingSideEffects, RewardRequest};
use crate::engine::config::{self, keys, EngineConfig, Settings};
use crate::engine::events::{CaptureEvent, CaptureEventKind, CaptureEventLog};
use crate::engine::owner::CaptureOwner;
use crate::engine::points::{Activity, CaptureLedger, DirtyPoints, Ownership, PointId};
use crate::engine::session::{ticks_for, CapturePhase, CaptureSession};
use crate::engine::systems::occupancy::Occupancy;
use crate::engine::EngineTime;

struct PhaseTicks {
    preparation: u64,
    capture: u64,
    cooldown: u64,
    grace: u64,
}

fn phase_ticks(settings: &Settings, config: &EngineConfig, zone: &str) -> PhaseTicks {
    let zone = Some(zone);
    let overlay = &settings.0;
    PhaseTicks {
        preparation: ticks_for(
            overlay.get_i64(zone, keys::PREPARATION_SECS, config::DEFAULT_PREPARATION_SECS),
            config.tick_duration,
        ),
        capture: ticks_for(
            overlay.get_i64(zone, keys::CAPTURE_SECS, config::DEFAULT_CAPTURE_SECS),
            config.tick_duration,
        ),
        cooldown: ticks_for(
            overlay.get_i64(zone, keys::COOLDOWN_SECS, config::DEFAULT_COOLDOWN_SECS),
            config.tick_duration,
        ),
        grace: ticks_for(
            overlay.get_i64(
                zone,
                keys::ABANDON_GRACE_SECS,
                config::DEFAULT_ABANDON_GRACE_SECS,
            ),
            config.tick_duration,
        ),
    }
}

fn sole_occupant(core: &[CaptureOwner]) -> Option<&CaptureOwner> {
    match core {
        [only] => Some(only),
        _ => None,
    }
}

fn rival_present(core: &[CaptureOwner], candidate: &CaptureOwner) -> bool {
    core.iter().any(|owner| !owner.is_same_owner(candidate))
}

fn candidate_present(core: &[CaptureOwner], candidate: &CaptureOwner) -> bool {
    core.iter().any(|owner| owner.is_same_owner(candidate))
}

pub fn session_system(
    mut commands: Commands,
    time: Res<EngineTime>,
    config: Res<EngineConfig>,
    settings: Res<Settings>,
    occupancy: Res<Occupancy>,
    mut log: ResMut<CaptureEventLog>,
    mut effects: ResMut<PendingSideEffects>,
    mut points: Query<(
        Entity,
        &PointId,
        &Activity,
        &Ownership,
        Option<&mut CaptureSession>,
    )>,
) {
    for (entity, id, activity, ownership, session) in points.iter_mut() {
        let core = occupancy.core_owners(entity);
        let Some(mut session) = session else {
            // Idle: a lone qualifying occupant in the core opens a contest.
            if !activity.0 {
                continue;
            }
            if let Some(challenger) = sole_occupant(core) {
                commands
                    .entity(entity)
                    .insert(CaptureSession::begin(challenger.clone(), time.tick));
                log.push(CaptureEvent::new(
                    time.tick,
                    CaptureEventKind::ContestStarted {
                        point: id.0.clone(),
                        challenger: challenger.clone(),
                    },
                ));
                effects.markers.push(MarkerUpdate::Upsert(MarkerInfo {
                    point: id.0.clone(),
                    owner: ownership.0.as_ref().map(|owner| owner.name().to_string()),
                    phase: Some(CapturePhase::Preparation),
                }));
            }
            continue;
        };

        let ticks = phase_ticks(&settings, &config, &id.0);
        match session.phase {
            CapturePhase::Preparation => {
                if rival_present(core, &session.candidate) {
                    // Broken occupancy discards the session outright; the
                    // next occupant starts over from zero.
                    discard(&mut commands, entity, id, &session, &mut log, &mut effects, time.tick, ownership, "displaced");
                } else if candidate_present(core, &session.candidate) {
                    session.vacancy_ticks = 0;
                    if session.ticks_in_phase(time.tick) >= ticks.preparation {
                        session.enter(CapturePhase::Active, time.tick);
                        session.occupied_ticks = 0;
                        log.push(CaptureEvent::new(
                            time.tick,
                            CaptureEventKind::ContestEscalated {
                                point: id.0.clone(),
                                challenger: session.candidate.clone(),
                            },
                        ));
                        effects.markers.push(MarkerUpdate::Upsert(MarkerInfo {
                            point: id.0.clone(),
                            owner: ownership.0.as_ref().map(|owner| owner.name().to_string()),
                            phase: Some(CapturePhase::Active),
                        }));
                    }
                } else {
                    session.vacancy_ticks += 1;
                    if session.vacancy_ticks > ticks.grace {
                        discard(&mut commands, entity, id, &session, &mut log, &mut effects, time.tick, ownership, "abandoned");
                    }
                }
            }
            CapturePhase::Active => {
                if let Some(occupant) = sole_occupant(core) {
                    if occupant.is_same_owner(&session.candidate) {
                        session.vacancy_ticks = 0;
                        session.occupied_ticks += 1;
                        if session.occupied_ticks >= ticks.capture {
                            session.enter(CapturePhase::Resolving, time.tick);
                        }
                    } else {
                        let displaced = std::mem::replace(&mut session.candidate, occupant.clone());
                        session.occupied_ticks = 1;
                        session.vacancy_ticks = 0;
                        log.push(CaptureEvent::new(
                            time.tick,
                            CaptureEventKind::ControlSeized {
                                point: id.0.clone(),
                                challenger: occupant.clone(),
                                displaced,
                            },
                        ));
                    }
                } else if core.is_empty() {
                    session.vacancy_ticks += 1;
                    if session.vacancy_ticks > ticks.grace {
                        discard(&mut commands, entity, id, &session, &mut log, &mut effects, time.tick, ownership, "abandoned");
                    }
                } else {
                    // Contested core: nobody accrues, prior progress is lost.
                    session.occupied_ticks = 0;
                    session.vacancy_ticks = 0;
                }
            }
            CapturePhase::Resolving => {
                // Ownership swap happens in resolution_system this tick.
            }
            CapturePhase::Cooldown => {
                if session.ticks_in_phase(time.tick) >= ticks.cooldown {
                    commands.entity(entity).remove::<CaptureSession>();
                    log.push(CaptureEvent::new(
                        time.tick,
                        CaptureEventKind::CooldownEnded { point: id.0.clone() },
                    ));
                    effects.markers.push(MarkerUpdate::Upsert(MarkerInfo {
                        point: id.0.clone(),
                        owner: ownership.0.as_ref().map(|owner| owner.name().to_string()),
                        phase: None,
                    }));
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn discard(
    commands: &mut Commands,
    entity: Entity,
    id: &PointId,
    session: &CaptureSession,
    log: &mut CaptureEventLog,
    effects: &mut PendingSideEffects,
    tick: u64,
    ownership: &Ownership,
    reason: &str,
) {
    commands.entity(entity).remove::<CaptureSession>();
    log.push(CaptureEvent::new(
        tick,
        CaptureEventKind::ContestDiscarded {
            point: id.0.clone(),
            challenger: session.candidate.clone(),
            reason: reason.to_string(),
        },
    ));
    effects.markers.push(MarkerUpdate::Upsert(MarkerInfo {
        point: id.0.clone(),
        owner: ownership.0.as_ref().map(|owner| owner.name().to_string()),
        phase: None,
    }));
}

/// Resolves completed captures: the ownership swap is atomic within the
/// tick, and reward/marker side effects are queued rather than dispatched,
/// so a failing collaborator can never roll the swap back.
pub fn resolution_system(
    time: Res<EngineTime>,
    settings: Res<Settings>,
    mut log: ResMut<CaptureEventLog>,
    mut effects: ResMut<PendingSideEffects>,
    mut dirty: ResMut<DirtyPoints>,
    mut points: Query<(&PointId, &mut Ownership, &mut CaptureLedger, &mut CaptureSession)>,
) {
    for (id, mut ownership, mut ledger, mut session) in points.iter_mut() {
        if session.phase != CapturePhase::Resolving {
            continue;
        }
        let zone = Some(id.0.as_str());
        let previous = ownership.0.replace(session.candidate.clone());
        let first = !ledger.captured_before;
        ledger.captured_before = true;
        ledger.captures += 1;
        dirty.0 = true;

        let mut amount = settings
            .0
            .get_f64(zone, keys::REWARD_AMOUNT, config::DEFAULT_REWARD_AMOUNT);
        if first {
            amount += settings.0.get_f64(
                zone,
                keys::FIRST_CAPTURE_BONUS,
                config::DEFAULT_FIRST_CAPTURE_BONUS,
            );
        }
        if amount > 0.0 {
            effects.rewards.push(RewardRequest {
                point: id.0.clone(),
                owner: session.candidate.clone(),
                amount,
            });
        }
        effects.markers.push(MarkerUpdate::Upsert(MarkerInfo {
            point: id.0.clone(),
            owner: Some(session.candidate.name().to_string()),
            phase: Some(CapturePhase::Cooldown),
        }));
        log.push(CaptureEvent::new(
            time.tick,
            CaptureEventKind::Captured {
                point: id.0.clone(),
                new_owner: session.candidate.clone(),
                previous,
                first,
            },
        ));
        session.enter(CapturePhase::Cooldown, time.tick);
    }
}

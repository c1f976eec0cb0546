//! Ephemeral contest state attached to a capture point while it is fought over.

use std::time::Duration;

use bevy_ecs::prelude::Component;
use serde::Serialize;

use crate::engine::owner::CaptureOwner;

/// Idle is not represented: an idle point simply has no session component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePhase {
    Preparation,
    Active,
    Resolving,
    Cooldown,
}

impl CapturePhase {
    pub fn label(&self) -> &'static str {
        match self {
            CapturePhase::Preparation => "Preparation",
            CapturePhase::Active => "Capturing",
            CapturePhase::Resolving => "Resolving",
            CapturePhase::Cooldown => "Cooldown",
        }
    }
}

/// One live contest. At most one exists per point; the component slot
/// enforces that. Destroyed when the contest resolves or is abandoned.
#[derive(Debug, Clone, Component)]
pub struct CaptureSession {
    pub candidate: CaptureOwner,
    pub phase: CapturePhase,
    pub phase_entered_tick: u64,
    /// Uncontested occupancy accrued in the active phase. First past the
    /// post: a displaced side's accrual is wiped, never banked.
    pub occupied_ticks: u64,
    /// Consecutive ticks the core has been empty; abandonment grace timer.
    pub vacancy_ticks: u64,
}

impl CaptureSession {
    pub fn begin(candidate: CaptureOwner, tick: u64) -> Self {
        Self {
            candidate,
            phase: CapturePhase::Preparation,
            phase_entered_tick: tick,
            occupied_ticks: 0,
            vacancy_ticks: 0,
        }
    }

    /// Collaborators (command filtering in particular) behave differently
    /// before a contest becomes real.
    pub fn is_in_preparation_phase(&self) -> bool {
        self.phase == CapturePhase::Preparation
    }

    pub fn ticks_in_phase(&self, now: u64) -> u64 {
        now.saturating_sub(self.phase_entered_tick)
    }

    pub fn enter(&mut self, phase: CapturePhase, tick: u64) {
        self.phase = phase;
        self.phase_entered_tick = tick;
        self.vacancy_ticks = 0;
    }
}

/// Converts a configured duration in seconds into whole ticks, rounding up
/// so a phase never completes early. Non-positive durations mean one tick.
pub fn ticks_for(seconds: i64, tick_duration: Duration) -> u64 {
    let tick_ms = tick_duration.as_millis().max(1) as u64;
    if seconds <= 0 {
        return 1;
    }
    let total_ms = seconds as u64 * 1000;
    total_ms.div_ceil(tick_ms).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::owner::OwnerKind;

    fn challenger() -> CaptureOwner {
        CaptureOwner::from_display_name(OwnerKind::Group, Some("Iron Vanguard")).unwrap()
    }

    #[test]
    fn new_session_starts_in_preparation() {
        let session = CaptureSession::begin(challenger(), 12);
        assert!(session.is_in_preparation_phase());
        assert_eq!(session.ticks_in_phase(12), 0);
        assert_eq!(session.ticks_in_phase(20), 8);
    }

    #[test]
    fn entering_a_phase_resets_the_grace_timer() {
        let mut session = CaptureSession::begin(challenger(), 0);
        session.vacancy_ticks = 3;
        session.enter(CapturePhase::Active, 10);
        assert_eq!(session.phase, CapturePhase::Active);
        assert_eq!(session.phase_entered_tick, 10);
        assert_eq!(session.vacancy_ticks, 0);
        assert!(!session.is_in_preparation_phase());
    }

    #[test]
    fn seconds_convert_to_whole_ticks_rounding_up() {
        assert_eq!(ticks_for(10, Duration::from_secs(1)), 10);
        assert_eq!(ticks_for(10, Duration::from_millis(400)), 25);
        assert_eq!(ticks_for(1, Duration::from_millis(1600)), 1);
        assert_eq!(ticks_for(3, Duration::from_millis(1600)), 2);
        assert_eq!(ticks_for(0, Duration::from_secs(1)), 1);
    }
}

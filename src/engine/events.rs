//! Inbound world events and the outbound capture event feed.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::engine::geometry::BlockPos;
use crate::engine::owner::CaptureOwner;

/// A real-world actor as the host environment sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: u64,
    pub name: String,
}

impl ActorRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Events fed into the engine from the host world. Protection and command
/// vetoes are decided listener-side before anything reaches the engine, so
/// only occupancy-relevant and bookkeeping events arrive here.
#[derive(Debug, Clone)]
pub enum WorldEvent {
    Move {
        actor: ActorRef,
        world: String,
        pos: BlockPos,
    },
    Quit {
        actor: ActorRef,
    },
    Kill {
        killer: ActorRef,
        victim: ActorRef,
        world: String,
        pos: BlockPos,
    },
    /// Point-in-time message for an acting player, e.g. a veto explanation.
    Notify { actor: String, message: String },
}

/// Inbound queue drained at the start of every tick.
#[derive(Debug, Default, Resource)]
pub struct PendingEvents(pub Vec<WorldEvent>);

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureEventKind {
    ContestStarted {
        point: String,
        challenger: CaptureOwner,
    },
    ContestEscalated {
        point: String,
        challenger: CaptureOwner,
    },
    ControlSeized {
        point: String,
        challenger: CaptureOwner,
        displaced: CaptureOwner,
    },
    ContestDiscarded {
        point: String,
        challenger: CaptureOwner,
        reason: String,
    },
    Captured {
        point: String,
        new_owner: CaptureOwner,
        previous: Option<CaptureOwner>,
        first: bool,
    },
    CooldownEnded {
        point: String,
    },
    RewardPaid {
        point: String,
        owner: CaptureOwner,
        amount: f64,
    },
    RewardSkipped {
        point: String,
        owner: CaptureOwner,
        reason: String,
    },
    KillRecorded {
        point: String,
        killer: String,
        victim: String,
    },
    Notification {
        actor: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureEvent {
    pub tick: u64,
    pub kind: CaptureEventKind,
}

impl CaptureEvent {
    pub fn new(tick: u64, kind: CaptureEventKind) -> Self {
        Self { tick, kind }
    }

    pub fn category(&self) -> &'static str {
        match &self.kind {
            CaptureEventKind::ContestStarted { .. }
            | CaptureEventKind::ContestEscalated { .. }
            | CaptureEventKind::ControlSeized { .. }
            | CaptureEventKind::ContestDiscarded { .. }
            | CaptureEventKind::CooldownEnded { .. } => "Contest",
            CaptureEventKind::Captured { .. } => "Capture",
            CaptureEventKind::RewardPaid { .. } | CaptureEventKind::RewardSkipped { .. } => {
                "Reward"
            }
            CaptureEventKind::KillRecorded { .. } => "Kill",
            CaptureEventKind::Notification { .. } => "Notice",
        }
    }

    pub fn sentiment(&self) -> Sentiment {
        match &self.kind {
            CaptureEventKind::Captured { .. }
            | CaptureEventKind::RewardPaid { .. }
            | CaptureEventKind::ContestEscalated { .. } => Sentiment::Positive,
            CaptureEventKind::ContestDiscarded { .. }
            | CaptureEventKind::RewardSkipped { .. }
            | CaptureEventKind::KillRecorded { .. } => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn headline(&self) -> String {
        match &self.kind {
            CaptureEventKind::ContestStarted { point, challenger } => {
                format!("{} moves on {}", challenger.name(), point)
            }
            CaptureEventKind::ContestEscalated { point, challenger } => {
                format!("{} digs in at {} | capture underway", challenger.name(), point)
            }
            CaptureEventKind::ControlSeized {
                point,
                challenger,
                displaced,
            } => format!(
                "{} pushes {} out of {} | progress reset",
                challenger.name(),
                displaced.name(),
                point
            ),
            CaptureEventKind::ContestDiscarded {
                point,
                challenger,
                reason,
            } => format!("{} loses the push for {} ({})", challenger.name(), point, reason),
            CaptureEventKind::Captured {
                point,
                new_owner,
                previous,
                first,
            } => {
                let from = previous
                    .as_ref()
                    .map(|owner| format!(" from {}", owner.name()))
                    .unwrap_or_default();
                format!(
                    "{} captures {}{}{}",
                    new_owner.name(),
                    point,
                    from,
                    if *first { " | first capture" } else { "" }
                )
            }
            CaptureEventKind::CooldownEnded { point } => {
                format!("{} is contestable again", point)
            }
            CaptureEventKind::RewardPaid {
                point,
                owner,
                amount,
            } => format!("{} rewarded {:.0} for {}", owner.name(), amount, point),
            CaptureEventKind::RewardSkipped {
                point,
                owner,
                reason,
            } => format!("reward for {} at {} skipped: {}", owner.name(), point, reason),
            CaptureEventKind::KillRecorded {
                point,
                killer,
                victim,
            } => format!("{} slain by {} in {}", victim, killer, point),
            CaptureEventKind::Notification { actor, message } => {
                format!("{}: {}", actor, message)
            }
        }
    }
}

/// Bounded feed of engine-side happenings; old entries fall off the front.
#[derive(Debug, Resource)]
pub struct CaptureEventLog {
    events: VecDeque<CaptureEvent>,
    capacity: usize,
}

impl CaptureEventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: CaptureEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn snapshot(&self) -> Vec<CaptureEvent> {
        self.events.iter().cloned().collect()
    }
}

impl Default for CaptureEventLog {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::owner::OwnerKind;

    #[test]
    fn log_drops_oldest_at_capacity() {
        let mut log = CaptureEventLog::new(2);
        for tick in 0..3 {
            log.push(CaptureEvent::new(
                tick,
                CaptureEventKind::CooldownEnded {
                    point: format!("p{tick}"),
                },
            ));
        }
        let events = log.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tick, 1);
        assert_eq!(events[1].tick, 2);
    }

    #[test]
    fn capture_headline_mentions_previous_holder() {
        let winner = CaptureOwner::from_display_name(OwnerKind::Group, Some("Iron Vanguard"))
            .unwrap();
        let loser =
            CaptureOwner::from_display_name(OwnerKind::Group, Some("Ashen Pact")).unwrap();
        let event = CaptureEvent::new(
            7,
            CaptureEventKind::Captured {
                point: "ember_keep".to_string(),
                new_owner: winner,
                previous: Some(loser),
                first: false,
            },
        );
        assert_eq!(event.category(), "Capture");
        assert!(event.headline().contains("Ashen Pact"));
    }
}

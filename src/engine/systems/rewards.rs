//! Dispatches queued side effects to the economy and marker backends.
//!
//! Runs after resolution so every swap this tick is already committed. A
//! failed payout is logged and skipped; engine state is never touched here.

use bevy_ecs::prelude::*;
use tracing::warn;

use crate::engine::adapters::{Adapters, MarkerUpdate, PendingSideEffects};
use crate::engine::events::{CaptureEvent, CaptureEventKind, CaptureEventLog};
use crate::engine::EngineTime;

pub fn reward_system(
    time: Res<EngineTime>,
    adapters: Res<Adapters>,
    mut effects: ResMut<PendingSideEffects>,
    mut log: ResMut<CaptureEventLog>,
) {
    for request in effects.rewards.drain(..) {
        match adapters.pay_capture_reward(&request.owner, request.amount) {
            Ok(()) => {
                log.push(CaptureEvent::new(
                    time.tick,
                    CaptureEventKind::RewardPaid {
                        point: request.point,
                        owner: request.owner,
                        amount: request.amount,
                    },
                ));
            }
            Err(err) => {
                warn!(
                    point = %request.point,
                    owner = %request.owner.name(),
                    amount = request.amount,
                    %err,
                    "capture reward skipped"
                );
                log.push(CaptureEvent::new(
                    time.tick,
                    CaptureEventKind::RewardSkipped {
                        point: request.point,
                        owner: request.owner,
                        reason: err.to_string(),
                    },
                ));
            }
        }
    }

    if !adapters.markers.is_available() {
        effects.markers.clear();
        return;
    }
    for update in effects.markers.drain(..) {
        match update {
            MarkerUpdate::Upsert(info) => adapters.markers.create_or_update(&info),
            MarkerUpdate::Remove(point) => adapters.markers.remove(&point),
        }
    }
}

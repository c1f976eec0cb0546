//! Scripted actor feed for the standalone runtime.
//!
//! Drives the engine the way a host world would: actors roam, push into
//! zones, hold cores, and occasionally fight. Deterministic per tick so two
//! runs with the same roster replay the same contest.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::engine::{
    check_block_change, check_command, ActorRef, BlockPos, CaptureOwner, EngineSnapshot,
    WorldEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Roam,
    Advance,
    Hold,
    Regroup,
}

const ROAM_TRANSITIONS: &[(Intent, f32)] = &[
    (Intent::Roam, 0.3),
    (Intent::Advance, 0.45),
    (Intent::Hold, 0.05),
    (Intent::Regroup, 0.2),
];

const ADVANCE_TRANSITIONS: &[(Intent, f32)] = &[
    (Intent::Advance, 0.55),
    (Intent::Hold, 0.3),
    (Intent::Roam, 0.1),
    (Intent::Regroup, 0.05),
];

const HOLD_TRANSITIONS: &[(Intent, f32)] = &[
    (Intent::Hold, 0.7),
    (Intent::Advance, 0.1),
    (Intent::Roam, 0.05),
    (Intent::Regroup, 0.15),
];

const REGROUP_TRANSITIONS: &[(Intent, f32)] = &[
    (Intent::Regroup, 0.4),
    (Intent::Roam, 0.35),
    (Intent::Advance, 0.25),
];

fn transition_options(intent: Intent) -> &'static [(Intent, f32)] {
    match intent {
        Intent::Roam => ROAM_TRANSITIONS,
        Intent::Advance => ADVANCE_TRANSITIONS,
        Intent::Hold => HOLD_TRANSITIONS,
        Intent::Regroup => REGROUP_TRANSITIONS,
    }
}

/// Fixed temperament per actor; tilts the intent weights.
#[derive(Debug, Clone, Copy)]
pub struct Persona {
    /// Appetite for contesting zones and starting fights.
    pub bold: f32,
    /// Tendency to wander instead of holding ground.
    pub restless: f32,
}

fn persona_modifier(persona: Persona, intent: Intent) -> f32 {
    let modifier = 1.0
        + match intent {
            Intent::Advance => persona.bold * 0.6 - persona.restless * 0.1,
            Intent::Hold => persona.bold * 0.3 - persona.restless * 0.4,
            Intent::Roam => persona.restless * 0.5 - persona.bold * 0.2,
            Intent::Regroup => persona.restless * 0.2 - persona.bold * 0.3,
        };
    modifier.clamp(0.1, 2.5)
}

#[derive(Debug, Clone)]
struct FeedActor {
    actor: ActorRef,
    owner: CaptureOwner,
    world: String,
    pos: BlockPos,
    home: BlockPos,
    intent: Intent,
    target: Option<String>,
}

/// The roster of scripted actors, stepped once per engine tick.
pub struct ActorFeed {
    actors: Vec<(FeedActor, Persona)>,
}

impl ActorFeed {
    pub fn new() -> Self {
        Self { actors: Vec::new() }
    }

    pub fn enlist(
        &mut self,
        actor: ActorRef,
        owner: CaptureOwner,
        world: impl Into<String>,
        home: BlockPos,
        persona: Persona,
    ) {
        self.actors.push((
            FeedActor {
                actor,
                owner,
                world: world.into(),
                pos: home,
                home,
                intent: Intent::Roam,
                target: None,
            },
            persona,
        ));
    }

    /// Advances every actor one step and returns the world events the host
    /// would have delivered for that movement.
    pub fn step(&mut self, tick: u64, snapshot: &EngineSnapshot) -> Vec<WorldEvent> {
        let positions: Vec<(ActorRef, CaptureOwner, String, BlockPos)> = self
            .actors
            .iter()
            .map(|(actor, _)| {
                (
                    actor.actor.clone(),
                    actor.owner.clone(),
                    actor.world.clone(),
                    actor.pos,
                )
            })
            .collect();

        let mut events = Vec::new();
        for (actor, persona) in &mut self.actors {
            let mut rng = SmallRng::seed_from_u64(
                tick.wrapping_mul(97)
                    .wrapping_add(actor.actor.id)
                    .wrapping_mul(53),
            );

            actor.intent = next_intent(actor.intent, *persona, &mut rng);
            match actor.intent {
                Intent::Advance => {
                    if actor.target.is_none() {
                        actor.target = nearest_point(snapshot, &actor.world, actor.pos);
                    }
                    if let Some(center) = actor
                        .target
                        .as_deref()
                        .and_then(|id| snapshot.point(id))
                        .map(|point| point.zone.center())
                    {
                        actor.pos = step_toward(actor.pos, center, 12.0);
                    } else {
                        actor.intent = Intent::Roam;
                    }
                }
                Intent::Hold => {
                    actor.pos.x += rng.gen_range(-2.0..=2.0);
                    actor.pos.z += rng.gen_range(-2.0..=2.0);
                }
                Intent::Roam => {
                    actor.target = None;
                    actor.pos.x += rng.gen_range(-16.0..=16.0);
                    actor.pos.z += rng.gen_range(-16.0..=16.0);
                }
                Intent::Regroup => {
                    actor.target = None;
                    actor.pos = step_toward(actor.pos, actor.home, 16.0);
                }
            }

            events.push(WorldEvent::Move {
                actor: actor.actor.clone(),
                world: actor.world.clone(),
                pos: actor.pos,
            });

            // A rival sharing the same core invites a skirmish.
            if let Some(zone) = snapshot.zone_at(&actor.world, actor.pos) {
                let rival = positions.iter().find(|(other, owner, world, pos)| {
                    other.id != actor.actor.id
                        && world == &actor.world
                        && !owner.is_same_owner(&actor.owner)
                        && snapshot
                            .zone_at(world, *pos)
                            .map(|theirs| theirs.id == zone.id)
                            .unwrap_or(false)
                });
                if let Some((victim, _, world, pos)) = rival {
                    if rng.gen_bool((persona.bold * 0.12).clamp(0.01, 0.5) as f64) {
                        events.push(WorldEvent::Kill {
                            killer: actor.actor.clone(),
                            victim: victim.clone(),
                            world: world.clone(),
                            pos: *pos,
                        });
                    }
                }
            }

            // Occasionally an actor tries to dig where it stands or fires a
            // command; a veto surfaces as a notification, exercising the
            // protection and command paths.
            if rng.gen_bool(0.08) {
                let decision =
                    check_block_change(snapshot, Some(&actor.owner), &actor.world, actor.pos, true);
                if let Some(message) = decision.message() {
                    events.push(WorldEvent::Notify {
                        actor: actor.actor.name.clone(),
                        message: message.to_string(),
                    });
                }
            }
            if rng.gen_bool(0.05) {
                let decision = check_command(snapshot, &actor.world, actor.pos);
                if let Some(message) = decision.message() {
                    events.push(WorldEvent::Notify {
                        actor: actor.actor.name.clone(),
                        message: message.to_string(),
                    });
                }
            }
        }
        events
    }
}

impl Default for ActorFeed {
    fn default() -> Self {
        Self::new()
    }
}

fn next_intent(current: Intent, persona: Persona, rng: &mut SmallRng) -> Intent {
    let options = transition_options(current);
    let weighted: Vec<(Intent, f32)> = options
        .iter()
        .map(|(intent, base)| (*intent, (base * persona_modifier(persona, *intent)).max(0.01)))
        .collect();
    let total: f32 = weighted.iter().map(|(_, weight)| *weight).sum();
    let mut threshold = rng.gen_range(0.0..total);
    for (candidate, weight) in weighted {
        threshold -= weight;
        if threshold <= 0.0 {
            return candidate;
        }
    }
    current
}

fn nearest_point(snapshot: &EngineSnapshot, world: &str, pos: BlockPos) -> Option<String> {
    snapshot
        .points
        .values()
        .filter(|point| point.active && point.zone.world == world)
        .min_by(|a, b| {
            let da = planar_distance(pos, a.zone.center());
            let db = planar_distance(pos, b.zone.center());
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|point| point.id.clone())
}

fn planar_distance(a: BlockPos, b: BlockPos) -> f64 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

fn step_toward(from: BlockPos, to: BlockPos, max_step: f64) -> BlockPos {
    let distance = planar_distance(from, to);
    if distance <= max_step {
        return BlockPos::new(to.x, from.y, to.z);
    }
    let scale = max_step / distance;
    BlockPos::new(
        from.x + (to.x - from.x) * scale,
        from.y,
        from.z + (to.z - from.z) * scale,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::OwnerKind;

    #[test]
    fn step_toward_caps_at_max_step() {
        let from = BlockPos::new(0.0, 64.0, 0.0);
        let to = BlockPos::new(100.0, 64.0, 0.0);
        let stepped = step_toward(from, to, 12.0);
        assert!((stepped.x - 12.0).abs() < 1e-9);
        assert_eq!(stepped.z, 0.0);

        let close = step_toward(BlockPos::new(95.0, 64.0, 0.0), to, 12.0);
        assert_eq!(close.x, 100.0);
    }

    #[test]
    fn feed_is_deterministic_per_tick() {
        let snapshot = EngineSnapshot::default();
        let owner =
            CaptureOwner::from_display_name(OwnerKind::Group, Some("Iron Vanguard")).unwrap();
        let mut a = ActorFeed::new();
        let mut b = ActorFeed::new();
        for feed in [&mut a, &mut b] {
            feed.enlist(
                ActorRef::new(1, "Saya"),
                owner.clone(),
                "overworld",
                BlockPos::new(0.0, 64.0, 0.0),
                Persona {
                    bold: 0.7,
                    restless: 0.3,
                },
            );
        }
        for tick in 1..=20 {
            let left = a.step(tick, &snapshot);
            let right = b.step(tick, &snapshot);
            assert_eq!(left.len(), right.len());
            for (x, y) in left.iter().zip(right.iter()) {
                match (x, y) {
                    (
                        WorldEvent::Move { pos: p, .. },
                        WorldEvent::Move { pos: q, .. },
                    ) => {
                        assert_eq!(p.x, q.x);
                        assert_eq!(p.z, q.z);
                    }
                    _ => {}
                }
            }
        }
    }
}

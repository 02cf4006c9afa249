//! Event-driven вход для physics adapter'а
//!
//! Adapter, который не может вызвать `arbitrate_contact` прямо из pre-solve,
//! пишет `ContactCandidate`; в начале fixed тика каждый candidate
//! арбитрируется и отвечается `ContactResolved` с причиной решения.

use bevy::prelude::*;

use super::arbiter::{arbitrate_contact, ContactOutcome};

/// Event: physics нашла contact projectile → target (physics → ECS)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactCandidate {
    pub projectile: Entity,
    pub target: Entity,
}

/// Event: решение по contact (ECS → physics)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactResolved {
    pub projectile: Entity,
    pub target: Entity,
    pub outcome: ContactOutcome,
}

/// Система (exclusive): candidates в порядке поступления → ContactResolved
pub fn arbitrate_contact_candidates(world: &mut World) {
    let Some(mut candidates_events) = world.get_resource_mut::<Events<ContactCandidate>>() else {
        return;
    };

    let candidates: Vec<ContactCandidate> = candidates_events.drain().collect();
    if candidates.is_empty() {
        return;
    }

    let read_only: &World = world;
    let resolved: Vec<ContactResolved> = candidates
        .iter()
        .map(|candidate| ContactResolved {
            projectile: candidate.projectile,
            target: candidate.target,
            outcome: arbitrate_contact(read_only, candidate.projectile, candidate.target),
        })
        .collect();

    world.send_event_batch(resolved);
}

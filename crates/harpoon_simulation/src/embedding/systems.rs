//! Embedding system implementations
//!
//! # Systems
//!
//! **Intake:**
//! - `process_projectile_hits` — spent + embed
//! - `process_throw_hits` — embed брошенного предмета
//!
//! **Manual removal:**
//! - `start_embed_removals` — `EmbedActivate` → `EmbedRemoval` timer
//! - `tick_embed_removals` — timer → detach + pickup
//!
//! **Observers (lifecycle):**
//! - `on_container_terminating` — target умирает → detach всех members
//! - `on_embedded_terminating` — embedded объект умирает → убрать из container
//! - `on_embeddable_removed` — Embeddable снят → detach

use bevy::prelude::*;
use bevy_rapier3d::prelude::RigidBody;

use super::commands::{CompleteEmbedRemoval, EmbeddingCommandsExt, ForgetEmbedded, ReleaseTornDown};
use super::events::{EmbedActivate, ProjectileHit, ThrowHit};
use crate::components::{EmbedRemoval, Embeddable, EmbeddedContainer, Projectile};
use crate::config::NetworkRole;
use crate::lifecycle::EntityTerminating;
use crate::log;

// ============================================================================
// Intake
// ============================================================================

/// Projectile hit: первый hit делает projectile spent; Embeddable → застревает
pub fn process_projectile_hits(
    mut commands: Commands,
    mut hits: EventReader<ProjectileHit>,
    mut projectiles: Query<(&mut Projectile, Has<Embeddable>)>,
) {
    for hit in hits.read() {
        let Ok((mut projectile, embeddable)) = projectiles.get_mut(hit.projectile) else {
            continue;
        };

        if projectile.spent {
            continue;
        }
        projectile.spent = true;

        if embeddable {
            commands.embed_attach(hit.projectile, hit.target, hit.shooter);
        }
    }
}

/// Throw hit: embed только при `embed_on_throw`
pub fn process_throw_hits(
    mut commands: Commands,
    mut hits: EventReader<ThrowHit>,
    embeddables: Query<&Embeddable>,
) {
    for hit in hits.read() {
        let Ok(embeddable) = embeddables.get(hit.thrown) else {
            continue;
        };

        if embeddable.embed_on_throw {
            commands.embed_attach(hit.thrown, hit.target, None);
        }
    }
}

// ============================================================================
// Manual Removal
// ============================================================================

/// Запуск ручного извлечения (только server, только removable + static)
pub fn start_embed_removals(
    mut commands: Commands,
    mut activations: EventReader<EmbedActivate>,
    role: Option<Res<NetworkRole>>,
    objects: Query<(&Embeddable, Option<&RigidBody>), Without<EmbedRemoval>>,
) {
    let is_server = role.map(|role| role.is_server()).unwrap_or(true);

    for activation in activations.read() {
        if !is_server {
            continue;
        }

        let Ok((embeddable, body)) = objects.get(activation.object) else {
            continue;
        };

        let Some(removal_time) = embeddable.removal_time else {
            continue;
        };

        if !embeddable.is_embedded() || body != Some(&RigidBody::Fixed) {
            continue;
        }

        commands.entity(activation.object).insert(EmbedRemoval {
            user: activation.user,
            remaining: removal_time,
        });

        log(&format!(
            "Embed removal started: {:?} by {:?} ({:.2}s)",
            activation.object, activation.user, removal_time
        ));
    }
}

/// Тик removal timers. Объект уже свободен → timer отменяется.
pub fn tick_embed_removals(
    mut commands: Commands,
    time: Res<Time>,
    mut removals: Query<(Entity, &mut EmbedRemoval, &Embeddable)>,
) {
    let delta = time.delta_secs();

    for (entity, mut removal, embeddable) in removals.iter_mut() {
        if !embeddable.is_embedded() {
            commands.entity(entity).remove::<EmbedRemoval>();
            continue;
        }

        removal.remaining -= delta;
        if removal.remaining > 0.0 {
            continue;
        }

        commands.entity(entity).remove::<EmbedRemoval>();
        commands.queue(CompleteEmbedRemoval {
            object: entity,
            user: removal.user,
        });
    }
}

// ============================================================================
// Lifecycle Observers
// ============================================================================

pub fn on_container_terminating(
    trigger: Trigger<EntityTerminating>,
    containers: Query<(), With<EmbeddedContainer>>,
    mut commands: Commands,
) {
    let container = trigger.target();
    if containers.contains(container) {
        commands.detach_all_embedded(container);
    }
}

pub fn on_embedded_terminating(
    trigger: Trigger<EntityTerminating>,
    embeddables: Query<&Embeddable>,
    mut commands: Commands,
) {
    let object = trigger.target();
    let Ok(embeddable) = embeddables.get(object) else {
        return;
    };

    if let Some(container) = embeddable.embedded_into() {
        commands.queue(ForgetEmbedded { object, container });
    }
}

/// Component teardown: Embeddable удалён (remove или despawn)
pub fn on_embeddable_removed(
    trigger: Trigger<OnRemove, Embeddable>,
    embeddables: Query<&Embeddable>,
    mut commands: Commands,
) {
    let object = trigger.target();
    let Ok(embeddable) = embeddables.get(object) else {
        return;
    };

    if let Some(container) = embeddable.embedded_into() {
        commands.queue(ReleaseTornDown {
            object,
            container,
            delete_on_remove: embeddable.delete_on_remove,
        });
    }
}

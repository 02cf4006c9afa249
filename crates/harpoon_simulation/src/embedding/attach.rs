//! Attach: Free → Embedded
//!
//! 1. velocity = 0, body → Fixed
//! 2. re-parent к target (world pose сохраняется)
//! 3. offset, повёрнутый local rotation + throwing angle
//! 4. sound, embedded_into, membership в EmbeddedContainer
//! 5. `Embedded` (+ `ProjectileEmbedded` для projectile)

use bevy::prelude::*;
use bevy_rapier3d::prelude::{RigidBody, Velocity};

use super::events::{emit, EmbedSoundRequested, Embedded, ProjectileEmbedded};
use super::EmbedError;
use crate::components::{partition_of, Embeddable, EmbeddedContainer, Placement, Projectile, ThrowingAngle};
use crate::lifecycle::{entity_exists, terminating_or_deleted};

/// Застрять `object` в `target`. Только из состояния Free.
///
/// Ошибка = no-op: World не изменён.
pub fn embed_attach(
    world: &mut World,
    object: Entity,
    target: Entity,
    user: Option<Entity>,
) -> Result<(), EmbedError> {
    validate_attach(world, object, target)?;

    let (offset, sound) = {
        let embeddable = world
            .get::<Embeddable>(object)
            .ok_or(EmbedError::NotEmbeddable(object))?;
        (embeddable.offset, embeddable.sound.clone())
    };
    let angle = world
        .get::<ThrowingAngle>(object)
        .map(|throwing| throwing.angle)
        .unwrap_or(0.0);

    let target_global = world.get::<GlobalTransform>(target).copied().unwrap_or_default();
    let object_global = world_pose(world, object);

    let mut local = object_global.reparented_to(&target_global);
    if offset != Vec3::ZERO {
        let rotation = local.rotation * Quat::from_rotation_z(angle);
        local.translation += rotation * offset;
    }

    let placement = world.get::<Placement>(target).map(|placement| Placement {
        map: placement.map,
        grid: partition_of(world, target),
    });

    let mut entity = world.entity_mut(object);
    if let Some(mut velocity) = entity.get_mut::<Velocity>() {
        *velocity = Velocity::zero();
    }
    entity.insert((
        RigidBody::Fixed,
        ChildOf(target),
        local,
        target_global.mul_transform(local),
    ));
    if let Some(placement) = placement {
        entity.insert(placement);
    }
    if let Some(mut embeddable) = entity.get_mut::<Embeddable>() {
        embeddable.embedded_into = Some(target);
    }

    if let Some(sound) = sound {
        emit(world, EmbedSoundRequested { entity: object, sound });
    }

    register_member(world, target, object);

    crate::log(&format!("Embed: {:?} → {:?} (user: {:?})", object, target, user));

    emit(world, Embedded { object, user, target });
    if let Some(projectile) = world.get::<Projectile>(object).cloned() {
        emit(
            world,
            ProjectileEmbedded {
                projectile: object,
                shooter: projectile.shooter,
                weapon: projectile.weapon,
                target,
            },
        );
    }

    Ok(())
}

fn validate_attach(world: &World, object: Entity, target: Entity) -> Result<(), EmbedError> {
    if !entity_exists(world, object) {
        return Err(EmbedError::MissingObject(object));
    }
    if !entity_exists(world, target) {
        return Err(EmbedError::MissingTarget(target));
    }
    if terminating_or_deleted(world, object) {
        return Err(EmbedError::Terminating(object));
    }
    if terminating_or_deleted(world, target) {
        return Err(EmbedError::Terminating(target));
    }
    if object == target {
        return Err(EmbedError::SelfEmbed(object));
    }

    let embeddable = world
        .get::<Embeddable>(object)
        .ok_or(EmbedError::NotEmbeddable(object))?;
    if let Some(current) = embeddable.embedded_into {
        return Err(EmbedError::AlreadyEmbedded { object, target: current });
    }

    Ok(())
}

fn register_member(world: &mut World, target: Entity, object: Entity) {
    let mut entity = world.entity_mut(target);
    if !entity.contains::<EmbeddedContainer>() {
        entity.insert(EmbeddedContainer::default());
    }

    if let Some(mut container) = entity.get_mut::<EmbeddedContainer>() {
        // Free объект не может уже числиться в container
        debug_assert!(
            !container.contains(object),
            "{:?} already registered in container {:?}",
            object,
            target
        );
        container.embedded.insert(object);
    }
}

/// World pose entity: parent global × local, иначе собственный GlobalTransform
pub(crate) fn world_pose(world: &World, entity: Entity) -> GlobalTransform {
    let local = world.get::<Transform>(entity).copied();
    let parent_global = world
        .get::<ChildOf>(entity)
        .and_then(|child_of| world.get::<GlobalTransform>(child_of.parent()));

    match (parent_global, local) {
        (Some(parent), Some(local)) => parent.mul_transform(local),
        _ => world
            .get::<GlobalTransform>(entity)
            .copied()
            .or_else(|| local.map(GlobalTransform::from))
            .unwrap_or_default(),
    }
}

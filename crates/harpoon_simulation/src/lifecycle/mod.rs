//! Entity lifecycle: terminating state + termination notifications
//!
//! Bevy despawn мгновенный, а embedding нуждается в фазе "entity ещё жив, но
//! уже умирает": container должен отпустить embedded объекты ДО того, как
//! recursive despawn заберёт их вместе с родителем.
//!
//! Flow `terminate(entity)`:
//! 1. insert `Terminating` marker
//! 2. trigger `EntityTerminating` (observers: embedding cleanup и т.п.)
//! 3. flush (observer commands применяются здесь)
//! 4. terminate каждого оставшегося child (parent-first, рекурсивно)
//! 5. despawn

use bevy::prelude::*;

/// Marker: entity в процессе уничтожения
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Terminating;

/// Trigger: entity сейчас будет уничтожен (target = умирающая entity)
#[derive(Event, Debug, Clone, Copy)]
pub struct EntityTerminating;

/// Entity существует в World?
pub fn entity_exists(world: &World, entity: Entity) -> bool {
    world.get_entity(entity).is_ok()
}

/// Entity уже удалён или в процессе удаления
pub fn terminating_or_deleted(world: &World, entity: Entity) -> bool {
    match world.get_entity(entity) {
        Ok(entity_ref) => entity_ref.contains::<Terminating>(),
        Err(_) => true,
    }
}

/// Немедленное уничтожение с termination notification.
///
/// Повторный вызов (или вызов на уже умирающей entity) — no-op.
pub fn terminate_entity(world: &mut World, entity: Entity) {
    if terminating_or_deleted(world, entity) {
        return;
    }

    world.entity_mut(entity).insert(Terminating);
    world.trigger_targets(EntityTerminating, entity);
    world.flush();

    // Children, которых observers не отцепили (embedded объекты уже свободны),
    // получают свой EntityTerminating до того, как despawn заберёт их молча
    let children: Vec<Entity> = world
        .get::<Children>(entity)
        .map(|children| children.to_vec())
        .unwrap_or_default();
    for child in children {
        terminate_entity(world, child);
    }

    // Observer мог уже удалить entity сам
    if entity_exists(world, entity) {
        world.despawn(entity);
    }
}

/// Command: отложенное уничтожение (queue delete)
#[derive(Debug, Clone, Copy)]
pub struct TerminateEntity(pub Entity);

impl Command for TerminateEntity {
    fn apply(self, world: &mut World) {
        terminate_entity(world, self.0);
    }
}

pub trait TerminateCommandsExt {
    fn terminate(&mut self, entity: Entity);
}

impl TerminateCommandsExt for Commands<'_, '_> {
    fn terminate(&mut self, entity: Entity) {
        self.queue(TerminateEntity(entity));
    }
}

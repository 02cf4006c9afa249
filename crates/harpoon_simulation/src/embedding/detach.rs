//! Detach: Embedded → Free (или Removed при delete_on_remove на server)
//!
//! Три пути приходят сюда: ручное извлечение, teardown Embeddable компонента,
//! termination container'а. Повторный detach — no-op.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{RigidBody, Sleeping};

use super::attach::world_pose;
use super::events::{emit, Landed};
use super::EmbedError;
use crate::components::{EmbedRemoval, Embeddable, EmbeddedContainer, Placement, Projectile};
use crate::config::NetworkRole;
use crate::lifecycle::{entity_exists, terminate_entity, terminating_or_deleted};

/// Освободить `object` из цели. `user` — инициатор (→ `Landed`).
pub fn embed_detach(world: &mut World, object: Entity, user: Option<Entity>) -> Result<(), EmbedError> {
    if !entity_exists(world, object) {
        return Err(EmbedError::MissingObject(object));
    }
    if terminating_or_deleted(world, object) {
        return Err(EmbedError::Terminating(object));
    }

    let embeddable = world
        .get::<Embeddable>(object)
        .ok_or(EmbedError::NotEmbeddable(object))?;
    let Some(container) = embeddable.embedded_into else {
        return Err(EmbedError::NotEmbedded(object));
    };
    let delete_on_remove = embeddable.delete_on_remove;

    release_membership(world, container, object);
    release_body(world, object, delete_on_remove, user);
    Ok(())
}

/// Detach всех members container'а (snapshot: detach мутирует set).
///
/// Возвращает сколько объектов было освобождено.
pub fn detach_all_embedded(world: &mut World, container: Entity) -> usize {
    let Some(members) = world
        .get::<EmbeddedContainer>(container)
        .map(EmbeddedContainer::snapshot)
    else {
        return 0;
    };

    let mut detached = 0;
    for member in members {
        if terminating_or_deleted(world, member) {
            continue;
        }

        match embed_detach(world, member, None) {
            Ok(()) => detached += 1,
            Err(err) => crate::log_warning(&format!("Detach all from {:?}: {}", container, err)),
        }
    }
    detached
}

/// Membership cleanup. Опустевший container снимается отложенно
/// (world command queue), с повторной проверкой на пустоту.
pub(crate) fn release_membership(world: &mut World, container: Entity, object: Entity) {
    let Some(mut members) = world.get_mut::<EmbeddedContainer>(container) else {
        return;
    };

    members.embedded.remove(&object);
    if !members.is_empty() {
        return;
    }

    world.commands().queue(move |world: &mut World| {
        remove_container_if_empty(world, container);
    });
}

/// Немедленно снять container, если в нём никого не осталось
pub(crate) fn remove_container_if_empty(world: &mut World, container: Entity) {
    let Ok(mut entity) = world.get_entity_mut(container) else {
        return;
    };

    if entity.get::<EmbeddedContainer>().is_some_and(EmbeddedContainer::is_empty) {
        entity.remove::<EmbeddedContainer>();
    }
}

/// Физическое освобождение: dynamic body, world pose без parent'а,
/// сброс владельца projectile'а, wake, `Landed`.
///
/// `delete_on_remove` на server → объект уничтожается, остальное не нужно.
pub(crate) fn release_body(world: &mut World, object: Entity, delete_on_remove: bool, user: Option<Entity>) {
    let is_server = world
        .get_resource::<NetworkRole>()
        .copied()
        .unwrap_or_default()
        .is_server();

    if delete_on_remove && is_server {
        crate::log(&format!("Detach: {:?} deleted on removal", object));
        terminate_entity(world, object);
        return;
    }

    let pose = world_pose(world, object);
    let grid = world
        .get::<Placement>(object)
        .and_then(|placement| placement.grid)
        .filter(|grid| !terminating_or_deleted(world, *grid));

    let mut entity = world.entity_mut(object);
    entity.remove::<(ChildOf, EmbedRemoval)>();
    entity.insert((RigidBody::Dynamic, pose.compute_transform(), pose));

    if let Some(mut placement) = entity.get_mut::<Placement>() {
        placement.grid = grid;
    }
    if let Some(mut embeddable) = entity.get_mut::<Embeddable>() {
        embeddable.embedded_into = None;
    }
    if let Some(mut projectile) = entity.get_mut::<Projectile>() {
        projectile.clear_owner();
    }
    if let Some(mut sleeping) = entity.get_mut::<Sleeping>() {
        sleeping.sleeping = false;
    }

    crate::log(&format!("Detach: {:?} free (user: {:?})", object, user));

    if let Some(user) = user {
        emit(world, Landed { object, user });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::MapId;
    use crate::embedding::embed_attach;

    fn setup() -> (World, Entity, Entity) {
        let mut world = World::new();
        let transform = Transform::from_xyz(5.0, 0.0, 0.0);
        let target = world
            .spawn((transform, GlobalTransform::from(transform), Placement::on_map(MapId(1))))
            .id();
        let arrow = world
            .spawn((
                Embeddable::default(),
                Projectile::fired_by(target, target),
                Transform::from_xyz(4.0, 0.0, 0.0),
                GlobalTransform::from(Transform::from_xyz(4.0, 0.0, 0.0)),
                RigidBody::Dynamic,
                Sleeping::default(),
            ))
            .id();
        (world, target, arrow)
    }

    #[test]
    fn test_detach_restores_free_state() {
        let (mut world, target, arrow) = setup();
        embed_attach(&mut world, arrow, target, None).unwrap();
        world.get_mut::<Sleeping>(arrow).unwrap().sleeping = true;

        embed_detach(&mut world, arrow, None).unwrap();

        assert!(world.get::<ChildOf>(arrow).is_none());
        assert_eq!(*world.get::<RigidBody>(arrow).unwrap(), RigidBody::Dynamic);
        assert!(!world.get::<Embeddable>(arrow).unwrap().is_embedded());
        assert!(!world.get::<Sleeping>(arrow).unwrap().sleeping);

        let projectile = world.get::<Projectile>(arrow).unwrap();
        assert_eq!(projectile.shooter, None);
        assert_eq!(projectile.weapon, None);

        // World pose сохранена после снятия parent'а
        let translation = world.get::<Transform>(arrow).unwrap().translation;
        assert!((translation - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_empty_container_removed_on_flush() {
        let (mut world, target, arrow) = setup();
        embed_attach(&mut world, arrow, target, None).unwrap();
        embed_detach(&mut world, arrow, None).unwrap();

        // Membership уже пуст, сам компонент снимается отложенно
        assert!(world.get::<EmbeddedContainer>(target).unwrap().is_empty());
        world.flush();
        assert!(world.get::<EmbeddedContainer>(target).is_none());
    }

    #[test]
    fn test_deferred_removal_rechecks_emptiness() {
        let (mut world, target, arrow) = setup();
        embed_attach(&mut world, arrow, target, None).unwrap();
        embed_detach(&mut world, arrow, None).unwrap();

        // До flush объект снова застрял → container должен выжить
        embed_attach(&mut world, arrow, target, None).unwrap();
        world.flush();

        let container = world.get::<EmbeddedContainer>(target).unwrap();
        assert!(container.contains(arrow));
    }

    #[test]
    fn test_detach_free_object_is_noop() {
        let (mut world, _, arrow) = setup();

        assert_eq!(embed_detach(&mut world, arrow, None), Err(EmbedError::NotEmbedded(arrow)));
        // Владелец не сброшен — detach не выполнялся
        assert!(world.get::<Projectile>(arrow).unwrap().shooter.is_some());
    }

    #[test]
    fn test_delete_on_remove_only_on_server() {
        let (mut world, target, arrow) = setup();
        world.get_mut::<Embeddable>(arrow).unwrap().delete_on_remove = true;

        world.insert_resource(NetworkRole::Client);
        embed_attach(&mut world, arrow, target, None).unwrap();
        embed_detach(&mut world, arrow, None).unwrap();
        assert!(entity_exists(&world, arrow));

        world.insert_resource(NetworkRole::Server);
        embed_attach(&mut world, arrow, target, None).unwrap();
        embed_detach(&mut world, arrow, None).unwrap();
        assert!(!entity_exists(&world, arrow));

        // Target пережил удаление объекта (не был parent'ом в момент despawn)
        assert!(entity_exists(&world, target));
        world.flush();
        assert!(world.get::<EmbeddedContainer>(target).is_none());
    }

    #[test]
    fn test_detach_all_uses_snapshot() {
        let (mut world, target, arrow) = setup();
        let second = world
            .spawn((Embeddable::default(), Transform::default(), RigidBody::Dynamic))
            .id();
        embed_attach(&mut world, arrow, target, None).unwrap();
        embed_attach(&mut world, second, target, None).unwrap();

        assert_eq!(detach_all_embedded(&mut world, target), 2);
        assert!(world.get::<ChildOf>(arrow).is_none());
        assert!(world.get::<ChildOf>(second).is_none());

        world.flush();
        assert!(world.get::<EmbeddedContainer>(target).is_none());
        assert_eq!(detach_all_embedded(&mut world, target), 0);
    }

    #[test]
    fn test_detach_drops_terminating_grid() {
        let mut world = World::new();
        let ship = world.spawn((crate::components::Grid, Placement::on_map(MapId(1)))).id();
        let wall = world.spawn(Placement::on_grid(MapId(1), ship)).id();
        let arrow = world.spawn((Embeddable::default(), Transform::default())).id();
        embed_attach(&mut world, arrow, wall, None).unwrap();

        world.entity_mut(ship).insert(crate::lifecycle::Terminating);
        embed_detach(&mut world, arrow, None).unwrap();

        assert_eq!(*world.get::<Placement>(arrow).unwrap(), Placement::on_map(MapId(1)));
    }
}

//! Embedding commands (отложенный доступ к World из обычных систем и observers)
//!
//! Ошибки attach/detach здесь логируются и проглатываются: gameplay код
//! не получает ошибок от embedding.

use bevy::prelude::*;

use super::attach::embed_attach;
use super::detach::{detach_all_embedded, embed_detach, release_body, release_membership, remove_container_if_empty};
use super::events::{emit, PickupRequested};
use super::EmbedError;
use crate::components::EmbeddedContainer;
use crate::lifecycle::terminating_or_deleted;
use crate::log_warning;

#[derive(Debug, Clone, Copy)]
pub struct EmbedAttach {
    pub object: Entity,
    pub target: Entity,
    pub user: Option<Entity>,
}

impl Command for EmbedAttach {
    fn apply(self, world: &mut World) {
        report("attach", embed_attach(world, self.object, self.target, self.user));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EmbedDetach {
    pub object: Entity,
    pub user: Option<Entity>,
}

impl Command for EmbedDetach {
    fn apply(self, world: &mut World) {
        report("detach", embed_detach(world, self.object, self.user));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetachAllEmbedded(pub Entity);

impl Command for DetachAllEmbedded {
    fn apply(self, world: &mut World) {
        detach_all_embedded(world, self.0);
    }
}

/// Removal timer истёк: detach с инициатором + запрос pickup
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompleteEmbedRemoval {
    pub object: Entity,
    pub user: Entity,
}

impl Command for CompleteEmbedRemoval {
    fn apply(self, world: &mut World) {
        let result = embed_detach(world, self.object, Some(self.user));
        let released = result.is_ok();
        report("removal", result);

        // delete_on_remove мог уничтожить объект — брать в руки нечего
        if released && !terminating_or_deleted(world, self.object) {
            emit(
                world,
                PickupRequested {
                    user: self.user,
                    item: self.object,
                },
            );
        }
    }
}

/// Embedded объект умирает: только membership, немедленно
#[derive(Debug, Clone, Copy)]
pub(crate) struct ForgetEmbedded {
    pub object: Entity,
    pub container: Entity,
}

impl Command for ForgetEmbedded {
    fn apply(self, world: &mut World) {
        if let Some(mut members) = world.get_mut::<EmbeddedContainer>(self.container) {
            members.embedded.remove(&self.object);
        }
        remove_container_if_empty(world, self.container);
    }
}

/// Embeddable снят с embedded объекта: membership + физическое освобождение
/// (если сам объект ещё жив)
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReleaseTornDown {
    pub object: Entity,
    pub container: Entity,
    pub delete_on_remove: bool,
}

impl Command for ReleaseTornDown {
    fn apply(self, world: &mut World) {
        release_membership(world, self.container, self.object);

        if terminating_or_deleted(world, self.object) {
            return;
        }
        release_body(world, self.object, self.delete_on_remove, None);
    }
}

fn report(operation: &str, result: Result<(), EmbedError>) {
    if let Err(err) = result {
        log_warning(&format!("Embed {} rejected: {}", operation, err));
    }
}

pub trait EmbeddingCommandsExt {
    fn embed_attach(&mut self, object: Entity, target: Entity, user: Option<Entity>);
    fn embed_detach(&mut self, object: Entity, user: Option<Entity>);
    fn detach_all_embedded(&mut self, container: Entity);
}

impl EmbeddingCommandsExt for Commands<'_, '_> {
    fn embed_attach(&mut self, object: Entity, target: Entity, user: Option<Entity>) {
        self.queue(EmbedAttach { object, target, user });
    }

    fn embed_detach(&mut self, object: Entity, user: Option<Entity>) {
        self.queue(EmbedDetach { object, user });
    }

    fn detach_all_embedded(&mut self, container: Entity) {
        self.queue(DetachAllEmbedded(container));
    }
}

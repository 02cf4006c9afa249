//! Embedding компоненты: Embeddable, EmbeddedContainer, ThrowingAngle, EmbedRemoval

use bevy::ecs::entity::EntityHashSet;
use bevy::prelude::*;

/// Объект, который может застрять в цели (стрела, гарпун, нож).
///
/// `embedded_into` меняется ТОЛЬКО через embedding state machine
/// (attach/detach), поэтому поле закрыто: Some ⇔ объект static child цели.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Embeddable {
    pub(crate) embedded_into: Option<Entity>,
    /// Смещение относительно точки попадания (в local space объекта)
    pub offset: Vec3,
    /// Время ручного извлечения (секунды). None = извлечь нельзя.
    pub removal_time: Option<f32>,
    /// Удалить entity при извлечении (только на server)
    pub delete_on_remove: bool,
    /// Застревать при попадании броском
    pub embed_on_throw: bool,
    /// Звук при застревании (проигрывает audio collaborator)
    pub sound: Option<String>,
}

impl Default for Embeddable {
    fn default() -> Self {
        Self {
            embedded_into: None,
            offset: Vec3::ZERO,
            removal_time: Some(3.0),
            delete_on_remove: false,
            embed_on_throw: true,
            sound: None,
        }
    }
}

impl Embeddable {
    pub fn embedded_into(&self) -> Option<Entity> {
        self.embedded_into
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded_into.is_some()
    }

    pub fn is_removable(&self) -> bool {
        self.removal_time.is_some()
    }
}

/// Все объекты, застрявшие в этой цели.
///
/// Только membership (identifier set), lifetime объектов принадлежит World.
/// Компонент существует ⇔ set не пуст.
#[derive(Component, Debug, Default)]
pub struct EmbeddedContainer {
    pub(crate) embedded: EntityHashSet,
}

impl EmbeddedContainer {
    pub fn contains(&self, entity: Entity) -> bool {
        self.embedded.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.embedded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embedded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.embedded.iter().copied()
    }

    /// Snapshot membership (detach мутирует set во время итерации)
    pub fn snapshot(&self) -> Vec<Entity> {
        let mut members: Vec<Entity> = self.iter().collect();
        members.sort();
        members
    }
}

/// Угол броска (радианы, вокруг local Z), добавляется к rotation offset'а
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct ThrowingAngle {
    pub angle: f32,
}

/// Идёт ручное извлечение embedded объекта (do-after).
///
/// Тикает в FixedUpdate; по завершении объект detach'ится с `user`
/// как инициатором.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct EmbedRemoval {
    pub user: Entity,
    pub remaining: f32,
}

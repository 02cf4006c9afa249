//! Embedding events
//!
//! # Architecture
//!
//! **Входы (gameplay / physics → embedding):**
//! - `ProjectileHit` → projectile попал (spent + embed если Embeddable)
//! - `ThrowHit` → брошенный предмет попал (embed если `embed_on_throw`)
//! - `EmbedActivate` → игрок тянет застрявший объект (запускает removal timer)
//!
//! **Выходы (embedding → gameplay / audio / hands):**
//! - `Embedded`, `ProjectileEmbedded` → объект застрял
//! - `Landed` → объект извлечён и упал (только если был инициатор)
//! - `EmbedSoundRequested` → audio collaborator
//! - `PickupRequested` → hands/inventory collaborator после ручного извлечения

use bevy::prelude::*;

// ============================================================================
// Input Events
// ============================================================================

/// Projectile попал в target (после arbitration)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileHit {
    pub projectile: Entity,
    pub target: Entity,
    pub shooter: Option<Entity>,
}

/// Брошенный предмет попал в target
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrowHit {
    pub thrown: Entity,
    pub target: Entity,
}

/// User активировал (в мире) застрявший объект
///
/// # Flow
/// 1. Объект removable + static embedded → `EmbedRemoval` timer
/// 2. Timer истёк → detach (user = инициатор) + `PickupRequested`
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedActivate {
    pub object: Entity,
    pub user: Entity,
}

// ============================================================================
// Output Events
// ============================================================================

/// Объект застрял в target
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Embedded {
    pub object: Entity,
    pub user: Option<Entity>,
    pub target: Entity,
}

/// Настоящий projectile (с Projectile компонентом) застрял в target
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileEmbedded {
    pub projectile: Entity,
    pub shooter: Option<Entity>,
    pub weapon: Option<Entity>,
    pub target: Entity,
}

/// Извлечённый объект упал (detach с инициатором)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landed {
    pub object: Entity,
    pub user: Entity,
}

/// Проиграть звук застревания на entity
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct EmbedSoundRequested {
    pub entity: Entity,
    pub sound: String,
}

/// Положить извлечённый предмет в руку user'а
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupRequested {
    pub user: Entity,
    pub item: Entity,
}

/// Отправить event, если он зарегистрирован (bare World в тестах — тихо пропускаем)
pub(crate) fn emit<E: Event>(world: &mut World, event: E) {
    if world.contains_resource::<Events<E>>() {
        world.send_event(event);
    }
}

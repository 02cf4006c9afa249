//! Embedding module — attach/detach state machine
//!
//! # Architecture
//!
//! **States:** Free → Embedded → Free (detach) | Removed (уничтожен embedded)
//!
//! **Events → Systems flow:**
//! - `ProjectileHit` / `ThrowHit` → `EmbedAttach` command
//! - `EmbedActivate` → `EmbedRemoval` timer → `EmbedDetach` + `PickupRequested`
//!
//! **Lifecycle (observers):**
//! - container terminating → detach всех members (объекты переживают target)
//! - embedded объект terminating → membership cleanup
//! - Embeddable removed → detach
//!
//! Container (`EmbeddedContainer`) существует ⇔ есть хотя бы один member.

use bevy::prelude::*;
use thiserror::Error;

pub mod attach;
pub mod commands;
pub mod detach;
pub mod events;
pub mod systems;


// Re-exports
pub use attach::embed_attach;
pub use commands::{DetachAllEmbedded, EmbedAttach, EmbedDetach, EmbeddingCommandsExt};
pub use detach::{detach_all_embedded, embed_detach};
pub use events::*;
pub use systems::*;

use crate::HarpoonSet;

/// Почему attach/detach оказался no-op
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmbedError {
    #[error("object {0:?} does not exist")]
    MissingObject(Entity),
    #[error("target {0:?} does not exist")]
    MissingTarget(Entity),
    #[error("entity {0:?} is terminating")]
    Terminating(Entity),
    #[error("entity {0:?} has no Embeddable")]
    NotEmbeddable(Entity),
    #[error("entity {0:?} cannot embed into itself")]
    SelfEmbed(Entity),
    #[error("object {object:?} is already embedded into {target:?}")]
    AlreadyEmbedded { object: Entity, target: Entity },
    #[error("object {0:?} is not embedded")]
    NotEmbedded(Entity),
}

/// Embedding plugin
pub struct EmbeddingPlugin;

impl Plugin for EmbeddingPlugin {
    fn build(&self, app: &mut App) {
        app
            // Inputs
            .add_event::<ProjectileHit>()
            .add_event::<ThrowHit>()
            .add_event::<EmbedActivate>()
            // Outputs
            .add_event::<Embedded>()
            .add_event::<ProjectileEmbedded>()
            .add_event::<Landed>()
            .add_event::<EmbedSoundRequested>()
            .add_event::<PickupRequested>()
            // Lifecycle
            .add_observer(on_container_terminating)
            .add_observer(on_embedded_terminating)
            .add_observer(on_embeddable_removed)
            .add_systems(
                FixedUpdate,
                (
                    process_projectile_hits,
                    process_throw_hits,
                    start_embed_removals,
                    tick_embed_removals,
                )
                    .chain()
                    .in_set(HarpoonSet::Embedding),
            );
    }
}

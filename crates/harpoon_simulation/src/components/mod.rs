//! ECS Components
//!
//! Организация по доменам:
//! - projectile: Projectile, Thrown, TargetedProjectile, weapon/target tags, Faction
//! - world: spatial placement (MapId, Placement, Grid) + GridPhase
//! - embedding: Embeddable, EmbeddedContainer, ThrowingAngle, EmbedRemoval
//!
//! Physics state (Velocity, RigidBody, Sleeping) — компоненты bevy_rapier3d.

pub mod embedding;
pub mod projectile;
pub mod world;

// Re-exports для удобного импорта
pub use embedding::*;
pub use projectile::*;
pub use world::*;

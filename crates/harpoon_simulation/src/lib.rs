//! HARPOON Simulation Core
//!
//! Projectile collision arbitration + embedding на Bevy 0.16 ECS (headless).
//!
//! Слои:
//! - arbitration: allow/suppress для каждого contact projectile → target
//! - embedding: attach/detach state machine для застрявших объектов
//! - lifecycle: terminating state + termination notifications
//!
//! Physics/transform — внешний collaborator, его state здесь это
//! компоненты bevy_rapier3d (Velocity, RigidBody, Sleeping).

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod arbitration;
pub mod components;
pub mod config;
pub mod embedding;
pub mod interceptors;
pub mod lifecycle;
pub mod logger;

pub use arbitration::{
    arbitrate_contact, check_collision_attempt, drain_now, ArbitrationPlugin, CollisionArbiter,
    CollisionAttempt, CollisionInterceptor, CollisionInterceptorAppExt, CollisionInterceptors,
    ContactCandidate, ContactOutcome, ContactResolved, DrainReport, Verdict,
};
pub use components::*;
pub use config::{ArbiterConfig, ConfigError, HarpoonConfig, NetworkRole};
pub use embedding::{
    detach_all_embedded, embed_attach, embed_detach, EmbedActivate, EmbedError, Embedded,
    EmbeddingCommandsExt, EmbeddingPlugin, Landed, PickupRequested, ProjectileEmbedded,
    ProjectileHit, ThrowHit,
};
pub use interceptors::{EnergyShield, FactionInterceptor, InterceptorsPlugin, ShieldInterceptor};
pub use lifecycle::{terminate_entity, EntityTerminating, TerminateCommandsExt, Terminating};
pub use logger::{init_logger, log, log_error, log_info, log_warning, set_log_level, LogLevel};

/// Порядок внутри FixedUpdate: сначала решения по contacts, потом embedding
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarpoonSet {
    Arbitration,
    Embedding,
}

/// Главный plugin симуляции (объединяет все подсистемы)
#[derive(Default)]
pub struct SimulationPlugin {
    config: HarpoonConfig,
}

impl SimulationPlugin {
    pub fn with_config(config: HarpoonConfig) -> Self {
        Self { config }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = &self.config;

        app
            // Fixed timestep для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(config.simulation.tick_hz))
            // Детерминистичный RNG
            .insert_resource(DeterministicRng::new(config.simulation.seed))
            .insert_resource(CollisionArbiter::new(config.arbitration.clone()))
            .insert_resource(config.network.role)
            .configure_sets(
                FixedUpdate,
                (HarpoonSet::Arbitration, HarpoonSet::Embedding).chain(),
            )
            .register_type::<Projectile>()
            .register_type::<Embeddable>()
            .register_type::<GridPhase>()
            .register_type::<Placement>()
            .register_type::<EnergyShield>()
            // Подсистемы
            .add_plugins((ArbitrationPlugin, EmbeddingPlugin, InterceptorsPlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

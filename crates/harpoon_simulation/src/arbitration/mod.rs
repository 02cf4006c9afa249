//! Collision arbitration module
//!
//! ECS ответственность:
//! - allow/suppress решение для каждого projectile → target contact
//! - deferred queue + drain cycle (parallel batch при нагрузке)
//! - применение suppress к physics state (owning thread)
//!
//! Physics ответственность (external):
//! - pre-solve hook вызывает `arbitrate_contact` (или пишет `ContactCandidate`)
//! - отменяет contact response при Suppress

use bevy::prelude::*;

pub mod arbiter;
pub mod contacts;
pub mod drain;
pub mod interceptor;
pub mod job;


pub use arbiter::{
    arbitrate_contact, begin_contact_tick, AllowReason, CollisionArbiter, ContactOutcome,
    PendingCollisionCheck, SuppressReason, TakenBatch,
};
pub use contacts::{arbitrate_contact_candidates, ContactCandidate, ContactResolved};
pub use drain::{apply_suppressions, drain_now, drain_pending_checks, DrainReport};
pub use interceptor::{
    check_collision_attempt, CollisionAttempt, CollisionInterceptor, CollisionInterceptorAppExt,
    CollisionInterceptors, Verdict,
};
pub use job::ProjectileCollisionJob;

use crate::HarpoonSet;

/// Arbitration Plugin
///
/// FixedUpdate порядок:
/// 1. begin_contact_tick — сброс tick load
/// 2. arbitrate_contact_candidates — ContactCandidate → ContactResolved
/// 3. drain_pending_checks — отложенные checks (interval / forced size)
pub struct ArbitrationPlugin;

impl Plugin for ArbitrationPlugin {
    fn build(&self, app: &mut App) {
        // CollisionArbiter мог быть вставлен раньше с кастомным config
        app.init_resource::<CollisionArbiter>()
            .init_resource::<CollisionInterceptors>()
            .add_event::<ContactCandidate>()
            .add_event::<ContactResolved>();

        app.add_systems(
            FixedUpdate,
            (
                begin_contact_tick,
                arbitrate_contact_candidates,
                drain_pending_checks,
            )
                .chain()
                .in_set(HarpoonSet::Arbitration),
        );
    }
}

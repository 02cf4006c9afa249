//! Built-in collision interceptors
//!
//! - `ShieldInterceptor` + `EnergyShield` — регистрируется `InterceptorsPlugin`
//! - `FactionInterceptor` — opt-in, friendly pass-through

use bevy::prelude::*;

pub mod faction;
pub mod shield;

pub use faction::FactionInterceptor;
pub use shield::{drain_shields_on_block, recharge_shields, EnergyShield, ShieldInterceptor};

use crate::arbitration::CollisionInterceptorAppExt;
use crate::HarpoonSet;

pub struct InterceptorsPlugin;

impl Plugin for InterceptorsPlugin {
    fn build(&self, app: &mut App) {
        app.add_collision_interceptor(ShieldInterceptor).add_systems(
            FixedUpdate,
            (drain_shields_on_block, recharge_shields)
                .chain()
                .after(HarpoonSet::Arbitration)
                .before(HarpoonSet::Embedding),
        );
    }
}

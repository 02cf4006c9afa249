//! EnergyShield — энергобарьер на target'е
//!
//! - Блокирует только быстрые projectiles (|linvel| > velocity_threshold)
//! - Медленные (брошенные, дрейфующие) проходят сквозь щит
//! - Каждый заблокированный contact тратит `block_cost` энергии
//! - Recharge после `recharge_delay` секунд без блоков

use bevy::prelude::*;
use bevy_rapier3d::prelude::Velocity;

use crate::arbitration::{
    CollisionAttempt, CollisionInterceptor, ContactOutcome, ContactResolved, SuppressReason, Verdict,
};

#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct EnergyShield {
    pub max_energy: f32,
    /// 0.0 = щит пробит
    pub current_energy: f32,
    /// Энергия за один заблокированный contact
    pub block_cost: f32,
    /// Энергия/сек
    pub recharge_rate: f32,
    pub recharge_delay: f32,
    /// Velocity threshold (м/с) для kinetic filtering
    pub velocity_threshold: f32,
    pub recharge_timer: f32,
}

impl Default for EnergyShield {
    fn default() -> Self {
        Self {
            max_energy: 100.0,
            current_energy: 100.0,
            block_cost: 10.0,
            recharge_rate: 10.0,
            recharge_delay: 2.0,
            velocity_threshold: 5.0,
            recharge_timer: 0.0,
        }
    }
}

impl EnergyShield {
    pub fn new(max_energy: f32, block_cost: f32) -> Self {
        Self {
            max_energy,
            current_energy: max_energy,
            block_cost,
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.current_energy > 0.0
    }

    /// Блокирует projectile с такой скоростью?
    pub fn blocks(&self, speed: f32) -> bool {
        self.is_active() && speed > self.velocity_threshold
    }

    pub fn absorb(&mut self) {
        self.current_energy = (self.current_energy - self.block_cost).max(0.0);
        self.recharge_timer = self.recharge_delay;
    }
}

/// Interceptor: target с активным EnergyShield отменяет быстрые contacts
#[derive(Debug, Default, Clone, Copy)]
pub struct ShieldInterceptor;

impl CollisionInterceptor for ShieldInterceptor {
    fn intercept(&self, world: &World, attempt: &CollisionAttempt) -> Verdict {
        let Some(shield) = world.get::<EnergyShield>(attempt.target) else {
            return Verdict::NoOpinion;
        };

        let speed = world
            .get::<Velocity>(attempt.projectile)
            .map(|velocity| velocity.linvel.length())
            .unwrap_or(0.0);

        if shield.blocks(speed) {
            Verdict::Suppress
        } else {
            Verdict::NoOpinion
        }
    }

    fn name(&self) -> &'static str {
        "EnergyShield"
    }
}

/// Система: щит тратит энергию на каждый intercepted contact
pub fn drain_shields_on_block(
    mut resolved: EventReader<ContactResolved>,
    mut shields: Query<&mut EnergyShield>,
) {
    for contact in resolved.read() {
        if contact.outcome != ContactOutcome::Suppress(SuppressReason::Intercepted) {
            continue;
        }

        let Ok(mut shield) = shields.get_mut(contact.target) else {
            continue;
        };

        if shield.is_active() {
            shield.absorb();
            if !shield.is_active() {
                crate::log(&format!("EnergyShield on {:?} depleted", contact.target));
            }
        }
    }
}

/// Система: recharge после delay
pub fn recharge_shields(time: Res<Time>, mut shields: Query<&mut EnergyShield>) {
    let delta = time.delta_secs();

    for mut shield in shields.iter_mut() {
        if shield.recharge_timer > 0.0 {
            shield.recharge_timer = (shield.recharge_timer - delta).max(0.0);
            continue;
        }

        if shield.current_energy < shield.max_energy {
            shield.current_energy = (shield.current_energy + shield.recharge_rate * delta).min(shield.max_energy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shield_blocks_fast_projectiles_only() {
        let mut world = World::new();
        let target = world.spawn(EnergyShield::default()).id();
        let bullet = world.spawn(Velocity::linear(Vec3::new(0.0, 0.0, 80.0))).id();
        let knife = world.spawn(Velocity::linear(Vec3::new(0.0, 0.0, 3.0))).id();

        let interceptor = ShieldInterceptor;
        let verdict = |projectile| interceptor.intercept(&world, &CollisionAttempt { projectile, target });

        assert_eq!(verdict(bullet), Verdict::Suppress);
        assert_eq!(verdict(knife), Verdict::NoOpinion);
    }

    #[test]
    fn test_depleted_shield_lets_everything_through() {
        let mut world = World::new();
        let target = world
            .spawn(EnergyShield {
                current_energy: 0.0,
                ..Default::default()
            })
            .id();
        let bullet = world.spawn(Velocity::linear(Vec3::X * 80.0)).id();

        let verdict = ShieldInterceptor.intercept(&world, &CollisionAttempt { projectile: bullet, target });
        assert_eq!(verdict, Verdict::NoOpinion);
    }

    #[test]
    fn test_absorb_drains_and_delays_recharge() {
        let mut shield = EnergyShield::new(25.0, 10.0);
        shield.absorb();
        shield.absorb();
        shield.absorb();

        assert_eq!(shield.current_energy, 0.0);
        assert!(!shield.is_active());
        assert_eq!(shield.recharge_timer, shield.recharge_delay);
    }
}

//! Friendly pass-through: projectile своей faction пролетает сквозь союзника

use bevy::prelude::*;

use crate::arbitration::{CollisionAttempt, CollisionInterceptor, Verdict};
use crate::components::{Faction, Projectile};

/// Opt-in interceptor (регистрируется вручную через `add_collision_interceptor`)
#[derive(Debug, Default, Clone, Copy)]
pub struct FactionInterceptor;

impl CollisionInterceptor for FactionInterceptor {
    fn intercept(&self, world: &World, attempt: &CollisionAttempt) -> Verdict {
        let Some(shooter) = world
            .get::<Projectile>(attempt.projectile)
            .and_then(|projectile| projectile.shooter)
        else {
            return Verdict::NoOpinion;
        };

        match (world.get::<Faction>(shooter), world.get::<Faction>(attempt.target)) {
            (Some(own), Some(other)) if own == other => Verdict::Suppress,
            _ => Verdict::NoOpinion,
        }
    }

    fn name(&self) -> &'static str {
        "FactionInterceptor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_faction_passes_through() {
        let mut world = World::new();
        let shooter = world.spawn(Faction(1)).id();
        let ally = world.spawn(Faction(1)).id();
        let enemy = world.spawn(Faction(2)).id();
        let neutral = world.spawn_empty().id();
        let bullet = world
            .spawn(Projectile::fired_by(shooter, Entity::PLACEHOLDER))
            .id();

        let verdict = |target| FactionInterceptor.intercept(&world, &CollisionAttempt { projectile: bullet, target });

        assert_eq!(verdict(ally), Verdict::Suppress);
        assert_eq!(verdict(enemy), Verdict::NoOpinion);
        assert_eq!(verdict(neutral), Verdict::NoOpinion);
    }

    #[test]
    fn test_ownerless_projectile_has_no_opinion() {
        let mut world = World::new();
        let ally = world.spawn(Faction(1)).id();
        let stray = world.spawn(Projectile::default()).id();

        let verdict = FactionInterceptor.intercept(&world, &CollisionAttempt { projectile: stray, target: ally });
        assert_eq!(verdict, Verdict::NoOpinion);
    }
}

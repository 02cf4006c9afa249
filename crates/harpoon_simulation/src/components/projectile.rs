//! Projectile компоненты: Projectile, Thrown, TargetedProjectile, tags

use bevy::prelude::*;

/// Летящий (или уже отработавший) projectile.
///
/// Удаление этого компонента = projectile больше не участвует в contact
/// resolution (arbiter снимает его при suppress, entity остаётся как
/// инертное physics body).
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Projectile {
    /// Кто выстрелил
    pub shooter: Option<Entity>,
    /// Из чего выстрелили
    pub weapon: Option<Entity>,
    /// Пролетать сквозь shooter и weapon
    pub ignore_shooter: bool,
    /// Уже попал один раз (дальше только как embedded объект)
    pub spent: bool,
}

impl Projectile {
    pub fn fired_by(shooter: Entity, weapon: Entity) -> Self {
        Self {
            shooter: Some(shooter),
            weapon: Some(weapon),
            ignore_shooter: true,
            spent: false,
        }
    }

    /// Target — это shooter или его weapon?
    pub fn is_own(&self, target: Entity) -> bool {
        self.shooter == Some(target) || self.weapon == Some(target)
    }

    /// Снимает shooter/weapon/spent (projectile снова "ничей")
    pub fn clear_owner(&mut self) {
        self.shooter = None;
        self.weapon = None;
        self.spent = false;
    }
}

/// Marker: entity прилетел броском (а не aimed выстрелом)
#[derive(Component, Debug, Default, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Thrown;

/// Projectile с locked target (homing / aimed at specific entity)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct TargetedProjectile {
    pub target: Entity,
}

/// Tag на weapon: может целиться через собственного shooter'а
#[derive(Component, Debug, Default, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct GunCanAimShooter;

/// Цель требует явного прицеливания (лежачие, crawling).
///
/// При `active && ignore_throw` брошенные предметы пролетают мимо.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct RequireProjectileTarget {
    pub active: bool,
    pub ignore_throw: bool,
}

impl Default for RequireProjectileTarget {
    fn default() -> Self {
        Self {
            active: true,
            ignore_throw: true,
        }
    }
}

impl RequireProjectileTarget {
    pub fn ignores_throws(&self) -> bool {
        self.active && self.ignore_throw
    }
}

/// Faction для friendly pass-through
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
#[reflect(Component)]
pub struct Faction(pub u64);

/// Public mutator: назначить shooter. No-op если не изменился.
pub fn set_shooter(world: &mut World, projectile: Entity, shooter: Entity) -> bool {
    let Some(mut state) = world.get_mut::<Projectile>(projectile) else {
        return false;
    };

    if state.shooter == Some(shooter) {
        return false;
    }

    state.shooter = Some(shooter);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_own_matches_shooter_and_weapon() {
        let mut world = World::new();
        let shooter = world.spawn_empty().id();
        let weapon = world.spawn_empty().id();
        let stranger = world.spawn_empty().id();

        let projectile = Projectile::fired_by(shooter, weapon);
        assert!(projectile.is_own(shooter));
        assert!(projectile.is_own(weapon));
        assert!(!projectile.is_own(stranger));
    }

    #[test]
    fn test_clear_owner() {
        let mut projectile = Projectile::fired_by(Entity::PLACEHOLDER, Entity::PLACEHOLDER);
        projectile.spent = true;
        projectile.clear_owner();

        assert_eq!(projectile.shooter, None);
        assert_eq!(projectile.weapon, None);
        assert!(!projectile.spent);
        assert!(projectile.ignore_shooter);
    }

    #[test]
    fn test_set_shooter_reports_change() {
        let mut world = World::new();
        let shooter = world.spawn_empty().id();
        let projectile = world.spawn(Projectile::default()).id();

        assert!(set_shooter(&mut world, projectile, shooter));
        assert!(!set_shooter(&mut world, projectile, shooter));
        assert_eq!(world.get::<Projectile>(projectile).unwrap().shooter, Some(shooter));

        let not_projectile = world.spawn_empty().id();
        assert!(!set_shooter(&mut world, not_projectile, shooter));
    }

    #[test]
    fn test_require_target_default_ignores_throws() {
        assert!(RequireProjectileTarget::default().ignores_throws());
        let inactive = RequireProjectileTarget {
            active: false,
            ignore_throw: true,
        };
        assert!(!inactive.ignores_throws());
    }
}

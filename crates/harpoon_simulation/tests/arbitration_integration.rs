//! Arbitration integration test
//!
//! Полный SimulationPlugin, physics adapter эмулируется ContactCandidate events.
//!
//! Проверяем:
//! - ContactCandidate → ContactResolved с причиной
//! - Burst нагрузки: deferral + parallel drain, каждый contact решён один раз
//! - EnergyShield (встроен) и FactionInterceptor (opt-in)

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_rapier3d::prelude::Velocity;
use harpoon_simulation::arbitration::{AllowReason, SuppressReason};
use harpoon_simulation::*;

/// Helper: headless App с SimulationPlugin и ручным временем (1 update = 1 fixed tick)
fn create_arbitration_app(config: HarpoonConfig) -> App {
    let mut app = create_headless_app(config.simulation.seed);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)))
        .add_plugins(SimulationPlugin::with_config(config));
    app
}

fn resolved(app: &mut App) -> Vec<ContactResolved> {
    app.world_mut()
        .resource_mut::<Events<ContactResolved>>()
        .drain()
        .collect()
}

fn spawn_bullet(app: &mut App, shooter: Entity, speed: f32) -> Entity {
    app.world_mut()
        .spawn((
            Projectile::fired_by(shooter, shooter),
            Placement::on_map(MapId(0)),
            Velocity::linear(Vec3::Z * speed),
        ))
        .id()
}

#[test]
fn test_candidates_are_answered_with_reasons() {
    let mut app = create_arbitration_app(HarpoonConfig::default());
    let shooter = app.world_mut().spawn(Placement::on_map(MapId(0))).id();
    let target = app.world_mut().spawn(Placement::on_map(MapId(0))).id();
    let far_away = app.world_mut().spawn(Placement::on_map(MapId(7))).id();
    let bullet = spawn_bullet(&mut app, shooter, 40.0);

    app.world_mut().send_event_batch([
        ContactCandidate { projectile: bullet, target },
        ContactCandidate { projectile: bullet, target: shooter },
        ContactCandidate { projectile: bullet, target: far_away },
    ]);
    app.update();

    let outcomes: Vec<ContactOutcome> = resolved(&mut app).iter().map(|contact| contact.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            ContactOutcome::Allow(AllowReason::Default),
            ContactOutcome::Suppress(SuppressReason::OwnShooter),
            ContactOutcome::Suppress(SuppressReason::CrossMap),
        ]
    );
}

#[test]
fn test_burst_defers_and_drains_in_parallel() {
    let mut app = create_arbitration_app(HarpoonConfig::default());
    let shooter = app.world_mut().spawn(Placement::on_map(MapId(0))).id();
    let shielded = app
        .world_mut()
        .spawn((Placement::on_map(MapId(0)), EnergyShield::new(1000.0, 1.0)))
        .id();

    let bullets: Vec<Entity> = (0..20).map(|_| spawn_bullet(&mut app, shooter, 60.0)).collect();
    app.world_mut().send_event_batch(
        bullets
            .iter()
            .map(|bullet| ContactCandidate { projectile: *bullet, target: shielded }),
    );
    app.update();

    let outcomes = resolved(&mut app);
    assert_eq!(outcomes.len(), 20);

    // deferral_threshold = 4: первые 4 синхронно, остальные provisionally allowed
    let immediate = outcomes.iter().take(4);
    assert!(immediate.clone().all(|contact| contact.outcome == ContactOutcome::Suppress(SuppressReason::Intercepted)));
    assert!(outcomes.iter().skip(4).all(|contact| contact.outcome.is_deferred()));

    // Drain в том же тике: 16 >= parallel_threshold
    let arbiter = app.world().resource::<CollisionArbiter>();
    let report = arbiter.last_report().expect("drain ran");
    assert!(report.parallel);
    assert_eq!(report.arbitrated(), 16);
    assert_eq!(report.suppressed().count(), 16);
    assert_eq!(arbiter.pending_len(), 0);

    // Все 20 остановлены: 4 отменены в pre-solve, 16 сняты drain'ом
    for bullet in &bullets[4..] {
        assert!(app.world().get::<Projectile>(*bullet).is_none());
        assert_eq!(app.world().get::<Velocity>(*bullet).unwrap().linvel, Vec3::ZERO);
    }
}

#[test]
fn test_stale_deferred_contact_dropped() {
    let mut app = create_arbitration_app(HarpoonConfig::default());
    let shooter = app.world_mut().spawn(Placement::on_map(MapId(0))).id();
    let target = app.world_mut().spawn(Placement::on_map(MapId(0))).id();
    let bullet = spawn_bullet(&mut app, shooter, 40.0);

    // Очередь уже нагружена → contact откладывается
    {
        let world = app.world();
        let arbiter = world.resource::<CollisionArbiter>();
        for _ in 0..4 {
            arbiter.enqueue(arbitration::PendingCollisionCheck {
                projectile: Entity::PLACEHOLDER,
                state: Projectile::default(),
                target: Entity::PLACEHOLDER,
            });
        }
        assert!(arbitrate_contact(world, bullet, target).is_deferred());
    }

    app.world_mut().despawn(target);
    let report = drain_now(app.world_mut());

    assert_eq!(report.dropped_stale, 5);
    assert_eq!(report.decision_for(bullet), None);
    assert!(app.world().get::<Projectile>(bullet).is_some());
}

#[test]
fn test_shield_lets_slow_objects_through_and_drains() {
    let mut app = create_arbitration_app(HarpoonConfig::default());
    let shooter = app.world_mut().spawn(Placement::on_map(MapId(0))).id();
    let shielded = app
        .world_mut()
        .spawn((Placement::on_map(MapId(0)), EnergyShield::new(20.0, 10.0)))
        .id();

    let slow = spawn_bullet(&mut app, shooter, 1.0);
    let fast = spawn_bullet(&mut app, shooter, 50.0);
    app.world_mut().send_event_batch([
        ContactCandidate { projectile: slow, target: shielded },
        ContactCandidate { projectile: fast, target: shielded },
    ]);
    app.update();

    let outcomes: Vec<ContactOutcome> = resolved(&mut app).iter().map(|contact| contact.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            ContactOutcome::Allow(AllowReason::Default),
            ContactOutcome::Suppress(SuppressReason::Intercepted),
        ]
    );
    assert_eq!(app.world().get::<EnergyShield>(shielded).unwrap().current_energy, 10.0);

    // Ещё один блок → щит пробит, следующий проходит
    let second = spawn_bullet(&mut app, shooter, 50.0);
    let third = spawn_bullet(&mut app, shooter, 50.0);
    app.world_mut().send_event(ContactCandidate { projectile: second, target: shielded });
    app.update();
    app.world_mut().send_event(ContactCandidate { projectile: third, target: shielded });
    app.update();

    let outcomes: Vec<ContactOutcome> = resolved(&mut app).iter().map(|contact| contact.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            ContactOutcome::Suppress(SuppressReason::Intercepted),
            ContactOutcome::Allow(AllowReason::Default),
        ]
    );
}

#[test]
fn test_faction_interceptor_is_opt_in() {
    let mut app = create_arbitration_app(HarpoonConfig::default());
    let shooter = app.world_mut().spawn((Placement::on_map(MapId(0)), Faction(3))).id();
    let ally = app.world_mut().spawn((Placement::on_map(MapId(0)), Faction(3))).id();

    let bullet = spawn_bullet(&mut app, shooter, 40.0);
    app.world_mut().send_event(ContactCandidate { projectile: bullet, target: ally });
    app.update();
    assert_eq!(
        resolved(&mut app)[0].outcome,
        ContactOutcome::Allow(AllowReason::Default)
    );

    app.add_collision_interceptor(FactionInterceptor);
    let bullet = spawn_bullet(&mut app, shooter, 40.0);
    app.world_mut().send_event(ContactCandidate { projectile: bullet, target: ally });
    app.update();
    assert_eq!(
        resolved(&mut app)[0].outcome,
        ContactOutcome::Suppress(SuppressReason::Intercepted)
    );
}

#[test]
fn test_config_changes_deferral_policy() {
    let config = HarpoonConfig::from_toml_str("[arbitration]\nparallel_threshold = 40\n").unwrap();
    let mut app = create_arbitration_app(config);
    let shooter = app.world_mut().spawn(Placement::on_map(MapId(0))).id();
    let target = app.world_mut().spawn(Placement::on_map(MapId(0))).id();

    let bullets: Vec<Entity> = (0..20).map(|_| spawn_bullet(&mut app, shooter, 40.0)).collect();
    app.world_mut().send_event_batch(
        bullets
            .iter()
            .map(|bullet| ContactCandidate { projectile: *bullet, target }),
    );
    app.update();

    // deferral_threshold = 20 → ни один contact не отложен
    let outcomes = resolved(&mut app);
    assert!(outcomes.iter().all(|contact| !contact.outcome.is_deferred()));
    assert!(app.world().resource::<CollisionArbiter>().last_report().is_none());
}

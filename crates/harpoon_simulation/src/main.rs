//! Headless симуляция HARPOON
//!
//! Seeded barrage: стрелок на корабле обстреливает targets, physics adapter
//! эмулируется через ContactCandidate events. Печатает сводку arbitration
//! и embedding.
//!
//! Usage: `harpoon_simulation [seed] [config.toml]`

use std::collections::BTreeMap;

use bevy::prelude::*;
use bevy_rapier3d::prelude::{RigidBody, Velocity};
use rand::Rng;

use harpoon_simulation::*;

const TICKS: usize = 600;
const TARGETS: usize = 12;
const MAX_VOLLEY: usize = 24;

#[derive(Resource)]
struct Barrage {
    shooter: Entity,
    weapon: Entity,
    ship: Entity,
    targets: Vec<Entity>,
}

#[derive(Resource, Default)]
struct BarrageStats {
    fired: usize,
    outcomes: BTreeMap<String, usize>,
    embedded: usize,
    parallel_drains: usize,
    drained: usize,
}

fn main() {
    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(42);

    let mut config = match args.next() {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(err) => {
                log_error(&format!("Config {}: {}", path, err));
                std::process::exit(1);
            }
        },
        None => HarpoonConfig::default(),
    };
    config.simulation.seed = seed;

    println!("Starting HARPOON headless barrage (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin::with_config(config))
        .init_resource::<BarrageStats>()
        .add_systems(Startup, spawn_scene)
        .add_systems(FixedUpdate, fire_volley.before(HarpoonSet::Arbitration))
        .add_systems(
            FixedUpdate,
            (resolve_contacts, count_embeds, collect_drain_report)
                .after(HarpoonSet::Arbitration)
                .before(HarpoonSet::Embedding),
        );

    for tick in 0..TICKS {
        app.update();

        if tick % 100 == 0 {
            let stats = app.world().resource::<BarrageStats>();
            println!(
                "Tick {}: fired {}, embedded {}, drained {}",
                tick, stats.fired, stats.embedded, stats.drained
            );
        }
    }

    print_summary(app.world());
}

fn load_config(path: &str) -> Result<HarpoonConfig, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    Ok(HarpoonConfig::from_toml_str(&source)?)
}

fn spawn_scene(mut commands: Commands, mut rng: ResMut<DeterministicRng>) {
    let map = MapId(1);
    let ship = commands.spawn((Grid, Placement::on_map(map), Transform::default())).id();
    let shooter = commands
        .spawn((Placement::on_grid(map, ship), Faction(1), Transform::default()))
        .id();
    let weapon = commands.spawn(Placement::on_grid(map, ship)).id();

    let mut targets = Vec::with_capacity(TARGETS);
    for i in 0..TARGETS {
        let position = Vec3::new(rng.rng.gen_range(-20.0..20.0), 0.0, 30.0 + i as f32);
        // Часть targets на той же палубе, часть в другом z-level
        let placement = match i % 4 {
            0 => Placement::on_grid(map, ship),
            3 => Placement::on_map(MapId(2)),
            _ => Placement::on_map(map),
        };

        let mut target = commands.spawn((placement, Transform::from_translation(position)));
        if i % 5 == 1 {
            target.insert(EnergyShield::new(50.0, 10.0));
        }
        if i % 6 == 2 {
            target.insert(RequireProjectileTarget::default());
        }
        targets.push(target.id());
    }

    commands.insert_resource(Barrage {
        shooter,
        weapon,
        ship,
        targets,
    });
}

/// Залп: случайное число projectiles (иногда брошенные ножи), каждый сразу
/// касается случайного target'а
fn fire_volley(
    mut commands: Commands,
    mut rng: ResMut<DeterministicRng>,
    barrage: Option<Res<Barrage>>,
    mut stats: ResMut<BarrageStats>,
    mut contacts: EventWriter<ContactCandidate>,
) {
    let Some(barrage) = barrage else {
        return;
    };

    let volley = rng.rng.gen_range(0..=MAX_VOLLEY);
    for _ in 0..volley {
        let target = barrage.targets[rng.rng.gen_range(0..barrage.targets.len())];
        let speed: f32 = rng.rng.gen_range(2.0..90.0);
        let placement = Placement::on_grid(MapId(1), barrage.ship);

        let mut embeddable = Embeddable::default();
        embeddable.removal_time = Some(0.5);
        embeddable.delete_on_remove = rng.rng.gen_bool(0.2);
        let mut projectile = commands.spawn((
            embeddable,
            placement,
            Transform::default(),
            Velocity::linear(Vec3::Z * speed),
            RigidBody::Dynamic,
        ));

        if rng.rng.gen_bool(0.15) {
            projectile.insert(Thrown);
        } else {
            projectile.insert((Projectile::fired_by(barrage.shooter, barrage.weapon), GridPhase::default()));
        }

        contacts.write(ContactCandidate {
            projectile: projectile.id(),
            target,
        });
        stats.fired += 1;
    }
}

/// Allowed contact → hit (thrown → ThrowHit)
fn resolve_contacts(
    mut resolved: EventReader<ContactResolved>,
    thrown: Query<(), With<Thrown>>,
    mut hits: EventWriter<ProjectileHit>,
    mut throws: EventWriter<ThrowHit>,
    mut stats: ResMut<BarrageStats>,
) {
    for contact in resolved.read() {
        *stats.outcomes.entry(format!("{:?}", contact.outcome)).or_insert(0) += 1;

        if contact.outcome.is_suppressed() {
            continue;
        }

        if thrown.contains(contact.projectile) {
            throws.write(ThrowHit {
                thrown: contact.projectile,
                target: contact.target,
            });
        } else {
            hits.write(ProjectileHit {
                projectile: contact.projectile,
                target: contact.target,
                shooter: None,
            });
        }
    }
}

fn count_embeds(mut embedded: EventReader<Embedded>, mut stats: ResMut<BarrageStats>) {
    stats.embedded += embedded.read().count();
}

fn collect_drain_report(arbiter: Res<CollisionArbiter>, mut stats: ResMut<BarrageStats>) {
    if !arbiter.is_changed() {
        return;
    }

    if let Some(report) = arbiter.last_report() {
        stats.drained += report.arbitrated();
        if report.parallel {
            stats.parallel_drains += 1;
        }
    }
}

fn print_summary(world: &World) {
    let stats = world.resource::<BarrageStats>();

    println!("Simulation complete!");
    println!("  fired: {}", stats.fired);
    for (outcome, count) in &stats.outcomes {
        println!("  {}: {}", outcome, count);
    }
    println!("  deferred drained: {} ({} parallel drains)", stats.drained, stats.parallel_drains);
    println!("  embedded: {}", stats.embedded);
}

//! Drain cycle: обработка отложенных collision checks
//!
//! Фазы:
//! 1. take_batch — вынуть очередь, отбросить stale, de-dup по projectile
//! 2. resolve — parallel job (batch >= parallel_threshold) или последовательно
//! 3. apply — ТОЛЬКО owning thread: velocity = 0, снять Projectile

use std::time::Duration;

use bevy::prelude::*;
use bevy_rapier3d::prelude::Velocity;

use super::arbiter::{CollisionArbiter, PendingCollisionCheck};
use super::interceptor::check_collision_attempt;
use super::job::ProjectileCollisionJob;
use crate::components::Projectile;
use crate::config::ArbiterConfig;
use crate::lifecycle::entity_exists;

/// Итог одного drain cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    /// (projectile, suppress) в FIFO порядке batch'а
    pub decisions: Vec<(Entity, bool)>,
    pub dropped_stale: usize,
    pub duplicates: usize,
    pub parallel: bool,
}

impl DrainReport {
    pub fn arbitrated(&self) -> usize {
        self.decisions.len()
    }

    pub fn suppressed(&self) -> impl Iterator<Item = Entity> + '_ {
        self.decisions
            .iter()
            .filter(|(_, suppress)| *suppress)
            .map(|(projectile, _)| *projectile)
    }

    pub fn decision_for(&self, projectile: Entity) -> Option<bool> {
        self.decisions
            .iter()
            .find(|(entity, _)| *entity == projectile)
            .map(|(_, suppress)| *suppress)
    }
}

/// Система (exclusive): drain если пора.
pub fn drain_pending_checks(world: &mut World) {
    let now = world
        .get_resource::<Time>()
        .map(|time| time.elapsed())
        .unwrap_or(Duration::ZERO);

    let due = world
        .get_resource::<CollisionArbiter>()
        .is_some_and(|arbiter| arbiter.drain_due(now));
    if !due {
        return;
    }

    world.resource_mut::<CollisionArbiter>().mark_drained(now);
    drain_now(world);
}

/// Безусловный drain всей очереди.
pub fn drain_now(world: &mut World) -> DrainReport {
    if !world.contains_resource::<CollisionArbiter>() {
        return DrainReport::default();
    }

    let batch = world.resource_scope(|world, mut arbiter: Mut<CollisionArbiter>| arbiter.take_batch(world));
    let config = world.resource::<CollisionArbiter>().config().clone();

    let parallel = batch.checks.len() >= config.parallel_threshold;
    let decisions = resolve_batch(world, &batch.checks, &config, parallel);

    let report = DrainReport {
        decisions,
        dropped_stale: batch.dropped_stale,
        duplicates: batch.duplicates,
        parallel,
    };

    apply_suppressions(world, &report);

    crate::log(&format!(
        "Collision drain: {} arbitrated ({} suppressed), {} stale, {} duplicates, parallel={}",
        report.arbitrated(),
        report.suppressed().count(),
        report.dropped_stale,
        report.duplicates,
        report.parallel
    ));

    world.resource_mut::<CollisionArbiter>().set_last_report(report.clone());
    report
}

/// Решения по batch'у. World read-only.
fn resolve_batch(
    world: &World,
    checks: &[PendingCollisionCheck],
    config: &ArbiterConfig,
    parallel: bool,
) -> Vec<(Entity, bool)> {
    if parallel {
        let job = ProjectileCollisionJob::new(checks, config.chunk_size, config.min_parallel_chunks);
        let results = job.run(world);

        // FIFO порядок batch'а, а не порядок завершения chunks
        return checks
            .iter()
            .filter_map(|check| {
                results
                    .get(&check.projectile)
                    .map(|suppress| (check.projectile, *suppress))
            })
            .collect();
    }

    checks
        .iter()
        .filter(|check| entity_exists(world, check.projectile) && entity_exists(world, check.target))
        .map(|check| {
            (
                check.projectile,
                check_collision_attempt(world, check.projectile, check.target),
            )
        })
        .collect()
}

/// Single writer: suppressed projectile останавливается и перестаёт быть
/// projectile'ом (остаётся инертным physics body).
pub fn apply_suppressions(world: &mut World, report: &DrainReport) {
    for projectile in report.suppressed() {
        let Ok(mut entity) = world.get_entity_mut(projectile) else {
            continue;
        };

        if let Some(mut velocity) = entity.get_mut::<Velocity>() {
            velocity.linvel = Vec3::ZERO;
        }
        entity.remove::<Projectile>();
    }
}

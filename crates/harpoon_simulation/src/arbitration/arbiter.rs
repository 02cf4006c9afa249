//! Collision arbiter: решение allow/suppress для contact projectile → target
//!
//! Вызывается из physics pre-solve ДО contact response. Дешёвые проверки
//! выполняются синхронно всегда; дорогая часть (broadcast interceptors)
//! при нагрузке откладывается в очередь и решается батчем в drain cycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bevy::ecs::entity::EntityHashSet;
use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};

use super::interceptor::check_collision_attempt;
use super::DrainReport;
use crate::components::{
    map_of, partition_of, GridPhase, GunCanAimShooter, Projectile, RequireProjectileTarget,
    TargetedProjectile, Thrown,
};
use crate::config::ArbiterConfig;
use crate::lifecycle::terminating_or_deleted;
use crate::logger::{log_enabled, LogLevel};

/// Отложенный contact, ждущий drain cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCollisionCheck {
    pub projectile: Entity,
    /// Snapshot projectile state на момент contact
    pub state: Projectile,
    pub target: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Брошенный предмет в цель, требующую явного прицеливания
    IgnoredThrow,
    /// Projectile пролетает сквозь своего shooter/weapon
    OwnShooter,
    /// Projectile пролетает сквозь grid, с которого запущен
    GridPhase,
    /// Interceptor (shield и т.п.) отменил contact
    Intercepted,
    /// Projectile и target на разных maps
    CrossMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    Default,
    /// Отложено в очередь, финальное решение в drain
    Deferred,
    /// Weapon целится через shooter'а в locked target
    AimThroughShooter,
    /// У entity нет Projectile (embeddable-only предмет)
    NotAProjectile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    Allow(AllowReason),
    Suppress(SuppressReason),
}

impl ContactOutcome {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, ContactOutcome::Suppress(_))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, ContactOutcome::Allow(AllowReason::Deferred))
    }
}

/// Batch, вынутый из очереди для drain (уже без stale и дубликатов)
#[derive(Debug, Default)]
pub struct TakenBatch {
    pub checks: Vec<PendingCollisionCheck>,
    pub dropped_stale: usize,
    pub duplicates: usize,
}

/// Владелец pending queue и per-drain de-duplication set.
///
/// Queue — MPSC channel: `arbitrate_contact` пишет через `&self` (можно из
/// любого потока pre-solve), drain — единственный consumer.
#[derive(Resource)]
pub struct CollisionArbiter {
    config: ArbiterConfig,
    sender: Sender<PendingCollisionCheck>,
    receiver: Receiver<PendingCollisionCheck>,
    /// Contacts, решённые синхронно в текущем тике (часть load)
    immediate_this_tick: AtomicUsize,
    processed: EntityHashSet,
    last_drain: Option<Duration>,
    last_report: Option<DrainReport>,
}

impl Default for CollisionArbiter {
    fn default() -> Self {
        Self::new(ArbiterConfig::default())
    }
}

impl CollisionArbiter {
    pub fn new(config: ArbiterConfig) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            config,
            sender,
            receiver,
            immediate_this_tick: AtomicUsize::new(0),
            processed: EntityHashSet::default(),
            last_drain: None,
            last_report: None,
        }
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn pending_len(&self) -> usize {
        self.receiver.len()
    }

    /// Текущая нагрузка: queued + синхронно решённые в этом тике.
    ///
    /// Отложенный contact проходит только повторную проверку liveness и
    /// interceptors в drain, cross-map suppression (check 6) для него не
    /// выполняется. Гарантия "другая map → suppress" действует лишь пока
    /// contacts решаются синхронно.
    pub fn load(&self) -> usize {
        self.pending_len() + self.immediate_this_tick.load(Ordering::Relaxed)
    }

    pub fn should_defer(&self) -> bool {
        self.load() >= self.config.deferral_threshold()
    }

    pub fn enqueue(&self, check: PendingCollisionCheck) {
        // receiver живёт в self, channel не может быть disconnected
        if self.sender.send(check).is_err() {
            crate::log_error("CollisionArbiter: pending queue disconnected");
        }
    }

    pub(crate) fn note_immediate(&self) {
        self.immediate_this_tick.fetch_add(1, Ordering::Relaxed);
    }

    pub fn begin_tick(&self) {
        self.immediate_this_tick.store(0, Ordering::Relaxed);
    }

    /// Пора drain: очередь не пуста И (interval прошёл ИЛИ очередь достигла forced size)
    pub fn drain_due(&self, now: Duration) -> bool {
        let pending = self.pending_len();
        if pending == 0 {
            return false;
        }

        let interval_elapsed = match self.last_drain {
            Some(last) => now.saturating_sub(last) > self.config.drain_interval(),
            None => true,
        };

        interval_elapsed || pending >= self.config.forced_drain_len()
    }

    pub(crate) fn mark_drained(&mut self, now: Duration) {
        self.last_drain = Some(now);
    }

    /// Вынимает ВСЮ очередь: stale entries отбрасываются, projectile
    /// попадает в batch не больше одного раза.
    pub fn take_batch(&mut self, world: &World) -> TakenBatch {
        // reset в начале каждого drain, не тащим старые entries дальше
        self.processed.clear();

        let mut batch = TakenBatch::default();
        while let Ok(check) = self.receiver.try_recv() {
            if self.processed.contains(&check.projectile) {
                batch.duplicates += 1;
                continue;
            }

            if terminating_or_deleted(world, check.projectile)
                || terminating_or_deleted(world, check.target)
            {
                batch.dropped_stale += 1;
                continue;
            }

            self.processed.insert(check.projectile);
            batch.checks.push(check);
        }

        batch
    }

    pub fn last_report(&self) -> Option<&DrainReport> {
        self.last_report.as_ref()
    }

    pub(crate) fn set_last_report(&mut self, report: DrainReport) {
        self.last_report = Some(report);
    }
}

/// Pre-solve решение для одного contact. Порядок проверок важен,
/// первое совпадение выигрывает.
pub fn arbitrate_contact(world: &World, projectile: Entity, target: Entity) -> ContactOutcome {
    // 1. Цель требует явного прицеливания, брошенное пролетает
    if let Some(require) = world.get::<RequireProjectileTarget>(target) {
        if require.ignores_throws() && world.get::<Thrown>(projectile).is_some() {
            return ContactOutcome::Suppress(SuppressReason::IgnoredThrow);
        }
    }

    let Some(state) = world.get::<Projectile>(projectile) else {
        return ContactOutcome::Allow(AllowReason::NotAProjectile);
    };

    // 2. Свой shooter / weapon
    if state.ignore_shooter && state.is_own(target) {
        return ContactOutcome::Suppress(SuppressReason::OwnShooter);
    }

    // 3. Grid phasing через собственную платформу
    if let Some(phase) = world.get::<GridPhase>(projectile) {
        if let (Some(source), Some(current)) = (phase.source_grid(), partition_of(world, target)) {
            if source == current {
                return ContactOutcome::Suppress(SuppressReason::GridPhase);
            }
        }
    }

    // 4. Под нагрузкой — в очередь, provisionally allow
    if let Some(arbiter) = world.get_resource::<CollisionArbiter>() {
        if arbiter.should_defer() {
            arbiter.enqueue(PendingCollisionCheck {
                projectile,
                state: state.clone(),
                target,
            });
            if log_enabled(LogLevel::Debug) {
                crate::log(&format!(
                    "Contact {:?} → {:?} deferred (pending: {})",
                    projectile,
                    target,
                    arbiter.pending_len()
                ));
            }
            return ContactOutcome::Allow(AllowReason::Deferred);
        }
        arbiter.note_immediate();
    }

    // 5. Interceptors (shields)
    if check_collision_attempt(world, projectile, target) {
        return ContactOutcome::Suppress(SuppressReason::Intercepted);
    }

    // 6. Разные maps / z-levels
    // Без Placement map неизвестна, сравнивать нечего
    if let (Some(from), Some(to)) = (map_of(world, projectile), map_of(world, target)) {
        if from != to {
            return ContactOutcome::Suppress(SuppressReason::CrossMap);
        }
    }

    // 7. Weapon целится через wielder'а в locked target
    if aims_through_shooter(world, projectile, state, target) {
        return ContactOutcome::Allow(AllowReason::AimThroughShooter);
    }

    ContactOutcome::Allow(AllowReason::Default)
}

fn aims_through_shooter(world: &World, projectile: Entity, state: &Projectile, target: Entity) -> bool {
    if !state.is_own(target) {
        return false;
    }

    let Some(weapon) = state.weapon else {
        return false;
    };

    if world.get::<GunCanAimShooter>(weapon).is_none() {
        return false;
    }

    world
        .get::<TargetedProjectile>(projectile)
        .is_some_and(|targeted| targeted.target == target)
}

/// Система: сброс tick load в начале fixed тика
pub fn begin_contact_tick(arbiter: Res<CollisionArbiter>) {
    arbiter.begin_tick();
}

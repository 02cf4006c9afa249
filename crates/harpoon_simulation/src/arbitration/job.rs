//! Parallel batch job для отложенных collision checks
//!
//! Каждый check независим: chunk'и по `chunk_size` уходят в ComputeTaskPool,
//! World доступен только на чтение. Результат мержится ПОСЛЕ join —
//! partial reads невозможны. Мутации физики делает drain на owning thread.

use bevy::ecs::entity::EntityHashMap;
use bevy::prelude::*;
use bevy::tasks::{ComputeTaskPool, ParallelSlice, TaskPool};

use super::arbiter::PendingCollisionCheck;
use super::interceptor::check_collision_attempt;
use crate::lifecycle::terminating_or_deleted;

pub struct ProjectileCollisionJob<'a> {
    pub checks: &'a [PendingCollisionCheck],
    pub chunk_size: usize,
    /// Меньше стольких chunks → выполняем на текущем потоке
    pub min_parallel_chunks: usize,
}

impl<'a> ProjectileCollisionJob<'a> {
    pub fn new(checks: &'a [PendingCollisionCheck], chunk_size: usize, min_parallel_chunks: usize) -> Self {
        Self {
            checks,
            chunk_size: chunk_size.max(1),
            min_parallel_chunks,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.checks.len().div_ceil(self.chunk_size)
    }

    pub fn runs_parallel(&self) -> bool {
        self.chunk_count() >= self.min_parallel_chunks
    }

    /// projectile → suppress (true = contact отменён).
    ///
    /// Entries с уже мёртвыми entities в результат не попадают.
    pub fn run(&self, world: &World) -> EntityHashMap<bool> {
        let chunk_results: Vec<Vec<(Entity, bool)>> = if self.runs_parallel() {
            let pool = ComputeTaskPool::get_or_init(TaskPool::default);
            self.checks
                .par_chunk_map(pool, self.chunk_size, |_index, chunk| execute_chunk(world, chunk))
        } else {
            vec![execute_chunk(world, self.checks)]
        };

        let mut results = EntityHashMap::default();
        for chunk in chunk_results {
            for (projectile, cancelled) in chunk {
                results.insert(projectile, cancelled);
            }
        }
        results
    }
}

fn execute_chunk(world: &World, chunk: &[PendingCollisionCheck]) -> Vec<(Entity, bool)> {
    chunk
        .iter()
        .filter_map(|check| {
            // Liveness ещё раз: entry мог устареть между take_batch и dispatch
            if terminating_or_deleted(world, check.projectile) || terminating_or_deleted(world, check.target) {
                return None;
            }

            let cancelled = check_collision_attempt(world, check.projectile, check.target);
            Some((check.projectile, cancelled))
        })
        .collect()
}

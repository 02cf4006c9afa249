//! Collision attempt protocol: "хочет ли кто-нибудь запретить этот contact?"
//!
//! Interceptors — явный упорядоченный список (shields, faction filters,
//! third-party gameplay). Каждый возвращает tri-state `Verdict`, первый
//! `Suppress` побеждает и останавливает опрос.
//!
//! Interceptor получает `&World` read-only: он вызывается и из pre-solve
//! (owning thread), и из worker chunks parallel job'а, поэтому мутировать
//! World он не может.

use bevy::prelude::*;

use crate::lifecycle::terminating_or_deleted;
use crate::logger::{log_enabled, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NoOpinion,
    Allow,
    Suppress,
}

/// Projectile собирается коснуться target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionAttempt {
    pub projectile: Entity,
    pub target: Entity,
}

pub trait CollisionInterceptor: Send + Sync + 'static {
    fn intercept(&self, world: &World, attempt: &CollisionAttempt) -> Verdict;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> CollisionInterceptor for F
where
    F: Fn(&World, &CollisionAttempt) -> Verdict + Send + Sync + 'static,
{
    fn intercept(&self, world: &World, attempt: &CollisionAttempt) -> Verdict {
        self(world, attempt)
    }
}

/// Зарегистрированные interceptors (порядок регистрации = порядок опроса)
#[derive(Resource, Default)]
pub struct CollisionInterceptors {
    interceptors: Vec<Box<dyn CollisionInterceptor>>,
}

impl CollisionInterceptors {
    pub fn push(&mut self, interceptor: impl CollisionInterceptor) {
        self.interceptors.push(Box::new(interceptor));
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Опрос всех interceptors; Suppress → сразу выходим.
    pub fn evaluate(&self, world: &World, attempt: &CollisionAttempt) -> Verdict {
        let mut combined = Verdict::NoOpinion;

        for interceptor in &self.interceptors {
            match interceptor.intercept(world, attempt) {
                Verdict::Suppress => {
                    if log_enabled(LogLevel::Debug) {
                        crate::log(&format!(
                            "Collision {:?} → {:?} cancelled by {}",
                            attempt.projectile,
                            attempt.target,
                            interceptor.name()
                        ));
                    }
                    return Verdict::Suppress;
                }
                Verdict::Allow => combined = Verdict::Allow,
                Verdict::NoOpinion => {}
            }
        }

        combined
    }
}

/// Broadcast collision attempt. Возвращает `true` если contact отменён.
///
/// Оба entity должны быть живы — иначе решать нечего (`false`).
pub fn check_collision_attempt(world: &World, projectile: Entity, target: Entity) -> bool {
    if terminating_or_deleted(world, projectile) || terminating_or_deleted(world, target) {
        return false;
    }

    let Some(interceptors) = world.get_resource::<CollisionInterceptors>() else {
        return false;
    };

    let attempt = CollisionAttempt { projectile, target };
    interceptors.evaluate(world, &attempt) == Verdict::Suppress
}

pub trait CollisionInterceptorAppExt {
    fn add_collision_interceptor(&mut self, interceptor: impl CollisionInterceptor) -> &mut Self;
}

impl CollisionInterceptorAppExt for App {
    fn add_collision_interceptor(&mut self, interceptor: impl CollisionInterceptor) -> &mut Self {
        self.init_resource::<CollisionInterceptors>();
        self.world_mut()
            .resource_mut::<CollisionInterceptors>()
            .push(interceptor);
        self
    }
}

//! World positioning компоненты: MapId, Placement, Grid, GridPhase

use bevy::ecs::component::HookContext;
use bevy::ecs::world::DeferredWorld;
use bevy::prelude::*;

/// Simulation layer / map (z-level). Entities на разных maps не коллайдят.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub struct MapId(pub u32);

/// Marker: entity является spatial partition (корабль, станция)
#[derive(Component, Debug, Default, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Grid;

/// Где entity находится: map + (опционально) grid.
///
/// Поддерживается physics/transform collaborator'ом. Embedding копирует
/// placement цели при attach, detach возвращает объект на этот grid/map.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct Placement {
    pub map: MapId,
    pub grid: Option<Entity>,
}

impl Placement {
    pub fn on_map(map: MapId) -> Self {
        Self { map, grid: None }
    }

    pub fn on_grid(map: MapId, grid: Entity) -> Self {
        Self {
            map,
            grid: Some(grid),
        }
    }
}

/// Spatial partition, в которой entity сейчас находится.
///
/// Grid сам по себе — своя partition; остальные берут grid из Placement.
pub fn partition_of(world: &World, entity: Entity) -> Option<Entity> {
    if world.get::<Grid>(entity).is_some() {
        return Some(entity);
    }
    world.get::<Placement>(entity).and_then(|placement| placement.grid)
}

/// Map, на которой entity находится (None если Placement отсутствует)
pub fn map_of(world: &World, entity: Entity) -> Option<MapId> {
    world.get::<Placement>(entity).map(|placement| placement.map)
}

/// Grid phasing: projectile пролетает сквозь grid, с которого был запущен.
///
/// Source grid захватывается ОДИН раз при добавлении компонента (on_add hook)
/// из текущего Placement и больше не меняется. Нет Placement / нет grid →
/// phasing выключен.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[component(on_add = capture_source_grid)]
pub struct GridPhase {
    source_grid: Option<Entity>,
}

impl GridPhase {
    pub fn source_grid(&self) -> Option<Entity> {
        self.source_grid
    }
}

fn capture_source_grid(mut world: DeferredWorld, context: HookContext) {
    let source = world
        .get::<Placement>(context.entity)
        .and_then(|placement| placement.grid);

    if let Some(mut phase) = world.get_mut::<GridPhase>(context.entity) {
        phase.source_grid = source;
    }
}

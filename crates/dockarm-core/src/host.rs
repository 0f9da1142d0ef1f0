//! Entity framework boundary - how docks become (and stop being) entities
//!
//! The scheduler never spawns anything itself. It hands a [`DockSpawn`] to a
//! [`StructureHost`] and gets back an entity handle or a refusal.
//! [`WorldHost`] is the host used by [`DockingEngine`](crate::engine::DockingEngine),
//! spawning straight into the `hecs` world.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{DockArm, Footprint, Name, Position, SequenceNumber, Vec2};
use crate::generation::StructureDefinition;

/// Everything the host needs to realize one dock
#[derive(Debug, Clone, Copy)]
pub struct DockSpawn<'a> {
    pub generator: Entity,
    pub sequence: SequenceNumber,
    pub definition: &'a StructureDefinition,
    pub location: Vec2,
    pub name: &'a str,
}

/// Reasons a host refuses to create an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("location is blocked")]
    LocationBlocked,
    #[error("no capacity for further structures")]
    CapacityExhausted,
}

/// The entity framework as seen by the scheduler.
///
/// `create_entity` must return in bounded time with a definite answer.
/// Handles returned are weak: the host may destroy them at any time without
/// telling the scheduler, which is why `is_alive` exists.
pub trait StructureHost {
    fn create_entity(&mut self, spawn: &DockSpawn<'_>) -> Result<Entity, HostError>;

    /// Destroy an entity. Returns false if it was already gone.
    fn destroy_entity(&mut self, entity: Entity) -> bool;

    fn is_alive(&self, entity: Entity) -> bool;
}

/// A circular region the host refuses to place structures in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExclusionZone {
    pub center: Vec2,
    pub radius: f32,
}

impl ExclusionZone {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Whether a structure of `footprint` radius at `location` would intrude
    pub fn overlaps(&self, location: &Vec2, footprint: f32) -> bool {
        let reach = self.radius + footprint.max(0.0);
        self.center.distance_squared(location) < reach * reach
    }
}

/// Limits enforced by [`WorldHost`] at creation time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostLimits {
    /// Maximum live docking arms across the whole world, `None` for no limit
    pub max_structures: Option<usize>,
    pub exclusion_zones: Vec<ExclusionZone>,
}

/// [`StructureHost`] spawning docks as entities in a `hecs` world
pub struct WorldHost<'w> {
    world: &'w mut World,
    limits: &'w HostLimits,
}

impl<'w> WorldHost<'w> {
    pub fn new(world: &'w mut World, limits: &'w HostLimits) -> Self {
        Self { world, limits }
    }

    fn live_structures(&self) -> usize {
        self.world.query::<&DockArm>().iter().count()
    }
}

impl StructureHost for WorldHost<'_> {
    fn create_entity(&mut self, spawn: &DockSpawn<'_>) -> Result<Entity, HostError> {
        if let Some(max) = self.limits.max_structures {
            if self.live_structures() >= max {
                return Err(HostError::CapacityExhausted);
            }
        }

        let footprint = spawn.definition.footprint_radius;
        if !spawn.location.is_finite()
            || self
                .limits
                .exclusion_zones
                .iter()
                .any(|zone| zone.overlaps(&spawn.location, footprint))
        {
            return Err(HostError::LocationBlocked);
        }

        Ok(self.world.spawn((
            DockArm {
                generator: spawn.generator,
                sequence: spawn.sequence,
                template_id: spawn.definition.id.clone(),
            },
            Position::new(spawn.location),
            Footprint { radius: footprint },
            Name::new(spawn.name),
        )))
    }

    fn destroy_entity(&mut self, entity: Entity) -> bool {
        self.world.despawn(entity).is_ok()
    }

    fn is_alive(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }
}

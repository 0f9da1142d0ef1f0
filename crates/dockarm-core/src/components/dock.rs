//! Station and docking-arm components

use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Identifier of a structure prototype in the [`StructureCatalog`](crate::generation::StructureCatalog)
pub type TemplateId = String;

/// Per-session dock number, starting at 1
pub type SequenceNumber = u32;

/// Marks an entity as a station that docking arms are generated around
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub name: String,
}

impl Station {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Marks a spawned structure as a docking arm and links it to its generator.
///
/// The `generator` handle is weak: the station may be gone by the time the
/// dock is destroyed.
#[derive(Debug, Clone, PartialEq)]
pub struct DockArm {
    pub generator: Entity,
    pub sequence: SequenceNumber,
    pub template_id: TemplateId,
}

/// Physical extent of a spawned structure
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Footprint {
    pub radius: f32,
}

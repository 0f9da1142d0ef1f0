//! Dockarm Core - Docking-Arm Generation and Lifecycle Scheduler
//!
//! Stations periodically unlock new docking arms: destination structures
//! spawned somewhere in a ring around the station. This crate decides *when*
//! an arm may be unlocked, *where* it goes and *how many* may exist, and keeps
//! the books when arms are destroyed by anything else in the game.
//!
//! # Architecture
//!
//! Like the rest of the simulation, state lives in a `hecs` world:
//! - **Entities**: stations (carrying a [`GeneratorState`]) and the spawned docks
//! - **Components**: pure data ([`Station`], [`DockArm`], [`Position`], ...)
//! - **Systems**: the cooldown clock, placement solver, admission controller,
//!   instantiator, lifecycle ledger and the orchestrator tying them together
//!
//! The entity framework itself is a collaborator behind [`StructureHost`].
//! [`WorldHost`] implements it directly on the `hecs` world.
//!
//! # Example
//!
//! ```rust,no_run
//! use dockarm_core::prelude::*;
//!
//! let catalog = StructureCatalog::from_json_str(
//!     r#"[{ "id": "arm_small", "display_name": "Small Arm", "footprint_radius": 8.0 }]"#,
//! ).unwrap();
//!
//! let mut engine = DockingEngine::new(catalog, 42);
//! let config = GeneratorConfig {
//!     template_candidates: vec!["arm_small".into()],
//!     ..Default::default()
//! };
//! engine.add_generator("Outpost 7", Vec2::ZERO, config).unwrap();
//!
//! loop {
//!     for report in engine.update(1.0 / 60.0) {
//!         println!("{:?}", report.outcome);
//!     }
//! }
//! ```

pub mod clock;
pub mod components;
pub mod engine;
pub mod generation;
pub mod host;
pub mod persistence;
pub mod systems;

pub use components::*;
pub use host::{HostError, HostLimits, StructureHost, WorldHost};

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::clock::{Clock, SessionClock, Timestamp};
    pub use crate::components::*;
    pub use crate::engine::{CycleReport, DockingEngine, EngineError};
    pub use crate::generation::{GeneratorConfig, StructureCatalog, StructureDefinition};
    pub use crate::host::{HostLimits, StructureHost, WorldHost};
    pub use crate::systems::{AdmissionDenied, CycleOutcome, InstantiationFailure, PlacementFailure};
}

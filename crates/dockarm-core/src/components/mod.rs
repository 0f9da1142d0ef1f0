//! Component definitions for the ECS world.
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in systems.

mod common;
mod dock;
mod generator;

pub use common::*;
pub use dock::*;
pub use generator::*;

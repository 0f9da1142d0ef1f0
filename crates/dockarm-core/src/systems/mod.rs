//! Systems - the scheduling logic that operates on generator state

pub mod admission;
pub mod cooldown;
pub mod instantiate;
pub mod ledger;
pub mod orchestrator;
pub mod placement;

pub use admission::{AdmissionDenied, Permit};
pub use instantiate::InstantiationFailure;
pub use ledger::{DockLedger, DockRecord};
pub use orchestrator::{run_cycle, CycleOutcome};
pub use placement::{PlacementFailure, PlacementRequest};

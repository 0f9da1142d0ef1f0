//! Generation - configuration, structure templates and dock naming

mod catalog;
mod config;
mod names;

pub use catalog::*;
pub use config::*;
pub use names::*;

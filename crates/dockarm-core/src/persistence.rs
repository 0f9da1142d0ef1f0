//! Save/Load of generator configuration
//!
//! Uses bincode for a compact binary snapshot. Only the persistent half of
//! each generator is written: its configuration, origin, current template
//! and cooldown deadline. Ledgers, sequence counters and the docks themselves
//! are session state and are never saved.

use std::io::{Read, Write};

use hecs::World;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Timestamp;
use crate::components::{GeneratorState, Station, TemplateId, Vec2};
use crate::generation::{ConfigError, GeneratorConfig};

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of every generator
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Session time at save
    pub sim_time: Timestamp,
    pub round: u32,
    pub generators: Vec<SerializableGenerator>,
}

/// Persistent fields of one generator and its station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableGenerator {
    pub station_name: String,
    pub origin: Vec2,
    pub config: GeneratorConfig,
    pub structure_template_id: TemplateId,
    pub next_unlock_at: Timestamp,
}

impl SerializableGenerator {
    fn capture(station: Option<&Station>, state: &GeneratorState) -> Self {
        Self {
            station_name: station.map(|s| s.name.clone()).unwrap_or_default(),
            origin: state.origin(),
            config: state.config().clone(),
            structure_template_id: state.structure_template_id().to_string(),
            next_unlock_at: state.next_unlock_at(),
        }
    }

    /// Rebuild the generator with a fresh session
    pub fn into_state(self) -> GeneratorState {
        GeneratorState::restore(
            self.config,
            self.origin,
            self.structure_template_id,
            self.next_unlock_at,
        )
    }
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("Saved generator '{station}' has an invalid config: {source}")]
    InvalidConfig {
        station: String,
        #[source]
        source: ConfigError,
    },
}

/// Result of loading a save
pub struct LoadedGenerators {
    pub sim_time: Timestamp,
    pub round: u32,
    pub generators: Vec<SerializableGenerator>,
}

/// Write every generator in `world` to `writer`
pub fn save_generators<W: Write>(
    writer: W,
    world: &World,
    sim_time: Timestamp,
    round: u32,
) -> Result<(), SaveError> {
    let mut entries: Vec<_> = world
        .query::<(&GeneratorState, Option<&Station>)>()
        .iter()
        .map(|(entity, (state, station))| (entity, SerializableGenerator::capture(station, state)))
        .collect();
    entries.sort_unstable_by_key(|(entity, _)| *entity);

    let save_data = SaveData {
        version: SAVE_VERSION,
        sim_time,
        round,
        generators: entries.into_iter().map(|(_, g)| g).collect(),
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Read generators back, validating each configuration
pub fn load_generators<R: Read>(reader: R) -> Result<LoadedGenerators, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    for generator in &save_data.generators {
        generator
            .config
            .validate()
            .map_err(|source| SaveError::InvalidConfig {
                station: generator.station_name.clone(),
                source,
            })?;
    }

    Ok(LoadedGenerators {
        sim_time: save_data.sim_time,
        round: save_data.round,
        generators: save_data.generators,
    })
}

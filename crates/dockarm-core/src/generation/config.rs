//! Generator configuration - the immutable tunables of one generator

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::TemplateId;

/// Configuration for a docking-arm generator.
///
/// Supplied once when the generator is created; there is no way to change it
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Seconds between unlocks
    pub unlock_cooldown_secs: f64,
    /// Closest a dock may be spawned to the station
    pub min_spawn_distance: f32,
    /// Farthest a dock may be spawned from the station
    pub max_spawn_distance: f32,
    /// Minimum distance between any two active docks
    pub min_separation: f32,
    /// Samples the placement solver may draw per cycle
    pub max_placement_attempts: u32,
    pub max_concurrent_docks: u32,
    pub max_total_generated: u32,
    /// Templates a dock may be spawned from, one picked per dock
    pub template_candidates: Vec<TemplateId>,
    /// Unlocks available at round start without waiting for the cooldown
    pub initial_unlocks: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            unlock_cooldown_secs: 600.0,
            min_spawn_distance: 64.0,
            max_spawn_distance: 256.0,
            min_separation: 48.0,
            max_placement_attempts: 16,
            max_concurrent_docks: 3,
            max_total_generated: 8,
            template_candidates: vec!["docking_arm_standard".to_string()],
            initial_unlocks: 1,
        }
    }
}

/// Errors that make a configuration unusable
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse generator config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidValue { field: &'static str, value: f64 },
    #[error("spawn distances must satisfy 0 <= min < max (got min {min}, max {max})")]
    InvalidDistance { min: f32, max: f32 },
    #[error("no template candidates configured")]
    NoTemplateCandidates,
}

impl GeneratorConfig {
    /// Parse and validate a configuration from JSON. Missing fields take
    /// their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the scheduler cannot run with.
    ///
    /// `max_concurrent_docks > max_total_generated` is allowed: the total
    /// limit simply wins. It is logged as a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("unlock_cooldown_secs", self.unlock_cooldown_secs)?;
        check_non_negative("min_spawn_distance", self.min_spawn_distance as f64)?;
        check_non_negative("max_spawn_distance", self.max_spawn_distance as f64)?;
        check_non_negative("min_separation", self.min_separation as f64)?;

        if self.min_spawn_distance >= self.max_spawn_distance {
            return Err(ConfigError::InvalidDistance {
                min: self.min_spawn_distance,
                max: self.max_spawn_distance,
            });
        }
        if self.template_candidates.is_empty() {
            return Err(ConfigError::NoTemplateCandidates);
        }

        if self.max_concurrent_docks > self.max_total_generated {
            log::warn!(
                "max_concurrent_docks ({}) exceeds max_total_generated ({}); the total limit will cap generation",
                self.max_concurrent_docks,
                self.max_total_generated
            );
        }
        if self.max_placement_attempts == 0 {
            log::warn!("max_placement_attempts is 0; every placement will fail");
        }

        Ok(())
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = GeneratorConfig::from_json_str(
            r#"{ "unlock_cooldown_secs": 120.0, "template_candidates": ["arm_small", "arm_large"] }"#,
        )
        .unwrap();

        assert_eq!(config.unlock_cooldown_secs, 120.0);
        assert_eq!(config.template_candidates.len(), 2);
        assert_eq!(config.max_spawn_distance, 256.0);
    }

    #[test]
    fn test_rejects_inverted_distances() {
        let config = GeneratorConfig {
            min_spawn_distance: 300.0,
            max_spawn_distance: 200.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDistance { .. })
        ));

        let degenerate = GeneratorConfig {
            min_spawn_distance: 100.0,
            max_spawn_distance: 100.0,
            ..Default::default()
        };
        assert!(degenerate.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let negative = GeneratorConfig {
            unlock_cooldown_secs: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::InvalidValue { field: "unlock_cooldown_secs", .. })
        ));

        let nan = GeneratorConfig {
            min_separation: f32::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_candidates() {
        let config = GeneratorConfig {
            template_candidates: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoTemplateCandidates)
        ));
    }

    #[test]
    fn test_concurrent_above_total_is_only_a_warning() {
        let config = GeneratorConfig {
            max_concurrent_docks: 10,
            max_total_generated: 2,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            GeneratorConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}

//! Structure template catalog - the read-only set of dock prototypes

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::TemplateId;

/// A dock prototype the host knows how to load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDefinition {
    pub id: TemplateId,
    pub display_name: String,
    /// Radius the structure occupies around its spawn point
    #[serde(default)]
    pub footprint_radius: f32,
    /// Stored grid/map definition the host loads for this structure
    #[serde(default)]
    pub grid_path: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse structure catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate structure template id '{0}'")]
    DuplicateTemplate(TemplateId),
    #[error("structure template with empty id")]
    EmptyId,
}

/// Lookup table of structure definitions, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct StructureCatalog {
    definitions: HashMap<TemplateId, StructureDefinition>,
}

impl StructureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(
        definitions: impl IntoIterator<Item = StructureDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut map = HashMap::new();
        for definition in definitions {
            if definition.id.is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if map.contains_key(&definition.id) {
                return Err(CatalogError::DuplicateTemplate(definition.id));
            }
            map.insert(definition.id.clone(), definition);
        }
        Ok(Self { definitions: map })
    }

    /// Load from a JSON array of definitions
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let definitions: Vec<StructureDefinition> = serde_json::from_str(json)?;
        Self::from_definitions(definitions)
    }

    pub fn resolve(&self, id: &str) -> Option<&StructureDefinition> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Pick one of `candidates` at random, skipping ids this catalog cannot
    /// resolve. `None` when none of them resolve.
    pub fn choose_from<'c>(&self, candidates: &'c [TemplateId], rng: &mut impl Rng) -> Option<&'c TemplateId> {
        let known: Vec<&TemplateId> = candidates.iter().filter(|id| self.contains(id)).collect();
        known.choose(rng).copied()
    }

    /// Template ids in sorted order
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_JSON: &str = r#"[
        { "id": "arm_small", "display_name": "Small Docking Arm", "footprint_radius": 8.0 },
        { "id": "arm_large", "display_name": "Large Docking Arm", "footprint_radius": 20.0,
          "grid_path": "maps/arms/large.yml" }
    ]"#;

    #[test]
    fn test_load_and_resolve() {
        let catalog = StructureCatalog::from_json_str(CATALOG_JSON).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.ids(), vec!["arm_large", "arm_small"]);

        let large = catalog.resolve("arm_large").unwrap();
        assert_eq!(large.footprint_radius, 20.0);
        assert_eq!(large.grid_path.as_deref(), Some("maps/arms/large.yml"));
        assert!(catalog.resolve("arm_small").unwrap().grid_path.is_none());
        assert!(catalog.resolve("arm_missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[
            { "id": "arm", "display_name": "A" },
            { "id": "arm", "display_name": "B" }
        ]"#;
        assert!(matches!(
            StructureCatalog::from_json_str(json),
            Err(CatalogError::DuplicateTemplate(id)) if id == "arm"
        ));
    }

    #[test]
    fn test_empty_id_rejected() {
        let json = r#"[{ "id": "", "display_name": "Nameless" }]"#;
        assert!(matches!(
            StructureCatalog::from_json_str(json),
            Err(CatalogError::EmptyId)
        ));
    }

    #[test]
    fn test_choose_from_skips_unknown_candidates() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let catalog = StructureCatalog::from_json_str(CATALOG_JSON).unwrap();
        let candidates: Vec<TemplateId> = vec!["ghost".into(), "arm_small".into()];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(catalog.choose_from(&candidates, &mut rng).map(String::as_str), Some("arm_small"));
        }

        let unknown: Vec<TemplateId> = vec!["ghost".into()];
        assert!(catalog.choose_from(&unknown, &mut rng).is_none());
        assert!(catalog.choose_from(&[], &mut rng).is_none());
    }
}

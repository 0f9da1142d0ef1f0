//! Structure instantiator - turns an admitted placement into a live entity

use hecs::Entity;
use thiserror::Error;

use crate::components::{SequenceNumber, TemplateId, Vec2};
use crate::generation::StructureCatalog;
use crate::host::{DockSpawn, HostError, StructureHost};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstantiationFailure {
    /// Configuration fault: retrying will never help
    #[error("structure template '{0}' not found")]
    TemplateNotFound(TemplateId),
    #[error("location {0:?} was rejected by the host")]
    LocationInvalid(Vec2),
    #[error("host refused to create more structures")]
    ResourceExhausted,
}

impl InstantiationFailure {
    /// Whether a later cycle could succeed with the same configuration
    pub fn is_transient(&self) -> bool {
        !matches!(self, InstantiationFailure::TemplateNotFound(_))
    }

    fn from_host(error: HostError, location: Vec2) -> Self {
        match error {
            HostError::LocationBlocked => InstantiationFailure::LocationInvalid(location),
            HostError::CapacityExhausted => InstantiationFailure::ResourceExhausted,
        }
    }
}

/// One dock waiting to be realized
#[derive(Debug, Clone, Copy)]
pub struct InstantiationRequest<'a> {
    pub generator: Entity,
    pub sequence: SequenceNumber,
    pub template_id: &'a str,
    pub location: Vec2,
    pub name: &'a str,
}

/// Resolve the template and ask the host for exactly one entity.
///
/// A single call with a definite answer; there is no retry here.
pub fn instantiate<H: StructureHost + ?Sized>(
    catalog: &StructureCatalog,
    host: &mut H,
    request: &InstantiationRequest<'_>,
) -> Result<Entity, InstantiationFailure> {
    let definition = catalog
        .resolve(request.template_id)
        .ok_or_else(|| InstantiationFailure::TemplateNotFound(request.template_id.to_string()))?;

    let spawn = DockSpawn {
        generator: request.generator,
        sequence: request.sequence,
        definition,
        location: request.location,
        name: request.name,
    };
    host.create_entity(&spawn)
        .map_err(|e| InstantiationFailure::from_host(e, request.location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::DockArm;
    use crate::generation::StructureDefinition;
    use crate::host::{ExclusionZone, HostLimits, WorldHost};
    use hecs::World;

    fn catalog() -> StructureCatalog {
        StructureCatalog::from_definitions([StructureDefinition {
            id: "arm".into(),
            display_name: "Arm".into(),
            footprint_radius: 4.0,
            grid_path: None,
        }])
        .unwrap()
    }

    fn request(generator: Entity, template_id: &str, location: Vec2) -> InstantiationRequest<'_> {
        InstantiationRequest {
            generator,
            sequence: 3,
            template_id,
            location,
            name: "Dock Charlie-03",
        }
    }

    #[test]
    fn test_instantiate_spawns_dock() {
        let mut world = World::new();
        let generator = world.spawn(());
        let limits = HostLimits::default();
        let catalog = catalog();

        let entity = {
            let mut host = WorldHost::new(&mut world, &limits);
            instantiate(&catalog, &mut host, &request(generator, "arm", Vec2::new(90.0, 0.0))).unwrap()
        };

        let arm = world.get::<&DockArm>(entity).unwrap();
        assert_eq!(arm.sequence, 3);
        assert_eq!(arm.generator, generator);
    }

    #[test]
    fn test_unknown_template() {
        let mut world = World::new();
        let generator = world.spawn(());
        let limits = HostLimits::default();
        let mut host = WorldHost::new(&mut world, &limits);

        let err = instantiate(&catalog(), &mut host, &request(generator, "ghost", Vec2::new(90.0, 0.0)))
            .unwrap_err();
        assert_eq!(err, InstantiationFailure::TemplateNotFound("ghost".into()));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_host_errors_are_mapped() {
        let mut world = World::new();
        let generator = world.spawn(());
        let limits = HostLimits {
            max_structures: Some(0),
            exclusion_zones: vec![ExclusionZone::new(Vec2::new(90.0, 0.0), 5.0)],
        };
        let mut host = WorldHost::new(&mut world, &limits);

        let err = instantiate(&catalog(), &mut host, &request(generator, "arm", Vec2::new(90.0, 0.0)))
            .unwrap_err();
        assert_eq!(err, InstantiationFailure::ResourceExhausted);
        assert!(err.is_transient());

        let blocked = HostLimits {
            max_structures: None,
            exclusion_zones: vec![ExclusionZone::new(Vec2::new(90.0, 0.0), 5.0)],
        };
        let mut host = WorldHost::new(&mut world, &blocked);
        let err = instantiate(&catalog(), &mut host, &request(generator, "arm", Vec2::new(90.0, 0.0)))
            .unwrap_err();
        assert_eq!(err, InstantiationFailure::LocationInvalid(Vec2::new(90.0, 0.0)));
    }
}

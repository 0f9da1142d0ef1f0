//! Generator orchestrator - one scheduling cycle per opportunity
//!
//! ```text
//! Idle ──cooldown──▶ AwaitingAdmission ──permit──▶ Placing ──location──▶ Instantiating ──entity──▶ Idle
//!                          │ denied                   │ exhausted             │ failed (permit released)
//!                          ▼                          ▼                       ▼
//!                         Idle                       Idle                    Idle
//! ```
//!
//! Every terminal outcome re-arms the cooldown, failures included, so a
//! generator that cannot spawn degrades to one attempt per cooldown instead
//! of retrying every tick. A cycle either commits one dock with a live entity
//! or leaves the ledger and sequence counter untouched.

use hecs::Entity;
use rand::Rng;

use super::admission::{self, AdmissionDenied};
use super::cooldown;
use super::instantiate::{self, InstantiationFailure, InstantiationRequest};
use super::ledger::{self, DockRecord};
use super::placement::{self, PlacementFailure, PlacementRequest};
use crate::clock::Timestamp;
use crate::components::{CyclePhase, GeneratorState};
use crate::generation::{dock_name, StructureCatalog};
use crate::host::StructureHost;

/// How a scheduling opportunity ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Cooldown still running; nothing was attempted and nothing re-armed
    NotEligible,
    Denied(AdmissionDenied),
    PlacementFailed(PlacementFailure),
    InstantiationFailed(InstantiationFailure),
    Spawned(DockRecord),
}

impl CycleOutcome {
    /// Whether the cycle ran to a terminal outcome (and re-armed the cooldown)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CycleOutcome::NotEligible)
    }

    pub fn spawned(&self) -> Option<&DockRecord> {
        match self {
            CycleOutcome::Spawned(record) => Some(record),
            _ => None,
        }
    }
}

/// Run one scheduling cycle for `generator` at `now`.
pub fn run_cycle<H: StructureHost + ?Sized>(
    generator: Entity,
    state: &mut GeneratorState,
    catalog: &StructureCatalog,
    host: &mut H,
    rng: &mut impl Rng,
    now: Timestamp,
) -> CycleOutcome {
    if !cooldown::is_eligible(state, now) {
        return CycleOutcome::NotEligible;
    }

    state.session.stats.cycles += 1;
    let outcome = attempt(generator, state, catalog, host, rng, now);
    record_stats(state, &outcome);
    log_outcome(generator, state, &outcome);

    if matches!(
        outcome,
        CycleOutcome::Spawned(_) | CycleOutcome::InstantiationFailed(InstantiationFailure::TemplateNotFound(_))
    ) {
        reroll_template(state, catalog, rng);
    }

    // Once the deadline has passed, initial unlocks run back to back and the
    // last one starts the real cooldown
    if state.session.initial_unlocks_remaining > 0 {
        state.session.initial_unlocks_remaining -= 1;
    }
    if state.session.initial_unlocks_remaining > 0 {
        cooldown::arm_for(state, now, 0.0);
    } else {
        cooldown::arm(state, now);
    }
    state.session.phase = CyclePhase::Idle;

    outcome
}

fn attempt<H: StructureHost + ?Sized>(
    generator: Entity,
    state: &mut GeneratorState,
    catalog: &StructureCatalog,
    host: &mut H,
    rng: &mut impl Rng,
    now: Timestamp,
) -> CycleOutcome {
    state.session.phase = CyclePhase::AwaitingAdmission;
    let permit = match admission::try_admit(state) {
        Ok(permit) => permit,
        Err(denied) => return CycleOutcome::Denied(denied),
    };

    state.session.phase = CyclePhase::Placing;
    let occupied = state.session.ledger.active_locations();
    let request = PlacementRequest {
        origin: state.origin,
        min_distance: state.config.min_spawn_distance,
        max_distance: state.config.max_spawn_distance,
        occupied: &occupied,
        min_separation: state.config.min_separation,
        max_attempts: state.config.max_placement_attempts,
    };
    let location = match placement::solve(&request, rng) {
        Ok(location) => location,
        Err(failure) => {
            admission::release(state, permit);
            return CycleOutcome::PlacementFailed(failure);
        }
    };

    state.session.phase = CyclePhase::Instantiating;
    let sequence = state.session.ledger.next_sequence();
    let name = dock_name(sequence);
    let request = InstantiationRequest {
        generator,
        sequence,
        template_id: &state.structure_template_id,
        location,
        name: &name,
    };
    let entity = match instantiate::instantiate(catalog, host, &request) {
        Ok(entity) => entity,
        Err(failure) => {
            admission::release(state, permit);
            return CycleOutcome::InstantiationFailed(failure);
        }
    };

    let record = ledger::record(state, permit, name, location, entity, now);
    CycleOutcome::Spawned(record)
}

/// Pick the template for the next dock among candidates the catalog knows
fn reroll_template(state: &mut GeneratorState, catalog: &StructureCatalog, rng: &mut impl Rng) {
    if let Some(next) = catalog.choose_from(&state.config.template_candidates, rng) {
        state.structure_template_id = next.clone();
    }
}

fn record_stats(state: &mut GeneratorState, outcome: &CycleOutcome) {
    let stats = &mut state.session.stats;
    match outcome {
        CycleOutcome::NotEligible => {}
        CycleOutcome::Denied(AdmissionDenied::ConcurrentLimitReached) => stats.denied_concurrent += 1,
        CycleOutcome::Denied(AdmissionDenied::TotalLimitReached) => stats.denied_total += 1,
        CycleOutcome::PlacementFailed(_) => stats.placement_failures += 1,
        CycleOutcome::InstantiationFailed(InstantiationFailure::TemplateNotFound(_)) => {
            stats.template_not_found += 1
        }
        CycleOutcome::InstantiationFailed(InstantiationFailure::LocationInvalid(_)) => {
            stats.location_invalid += 1
        }
        CycleOutcome::InstantiationFailed(InstantiationFailure::ResourceExhausted) => {
            stats.resource_exhausted += 1
        }
        CycleOutcome::Spawned(_) => stats.spawned += 1,
    }
}

fn log_outcome(generator: Entity, state: &GeneratorState, outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::NotEligible => {}
        CycleOutcome::Spawned(record) => log::info!(
            "Generator {:?} spawned {} (#{}, '{}') at ({:.1}, {:.1})",
            generator,
            record.name,
            record.id,
            record.template_id,
            record.location.x,
            record.location.y
        ),
        CycleOutcome::Denied(reason) => {
            log::debug!("Generator {:?} denied: {}", generator, reason)
        }
        CycleOutcome::PlacementFailed(failure) => {
            log::debug!("Generator {:?} placement failed: {}", generator, failure)
        }
        CycleOutcome::InstantiationFailed(failure @ InstantiationFailure::TemplateNotFound(_)) => {
            log::error!(
                "Generator {:?} cannot spawn docks: {} (candidates: {:?})",
                generator,
                failure,
                state.config.template_candidates
            )
        }
        CycleOutcome::InstantiationFailed(failure) => {
            log::warn!("Generator {:?} instantiation failed: {}", generator, failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Vec2;
    use crate::generation::{GeneratorConfig, StructureDefinition};
    use crate::host::{HostLimits, WorldHost};
    use hecs::World;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        world: World,
        limits: HostLimits,
        catalog: StructureCatalog,
        rng: StdRng,
        generator: Entity,
        state: GeneratorState,
    }

    impl Fixture {
        fn new(config: GeneratorConfig) -> Self {
            let mut world = World::new();
            let generator = world.spawn(());
            let catalog = StructureCatalog::from_definitions([StructureDefinition {
                id: "arm".into(),
                display_name: "Arm".into(),
                footprint_radius: 4.0,
                grid_path: None,
            }])
            .unwrap();
            let mut rng = StdRng::seed_from_u64(99);
            let state = GeneratorState::new(config, Vec2::ZERO, Timestamp::ZERO, &mut rng);
            Self {
                world,
                limits: HostLimits::default(),
                catalog,
                rng,
                generator,
                state,
            }
        }

        fn cycle(&mut self, now: f64) -> CycleOutcome {
            let mut host = WorldHost::new(&mut self.world, &self.limits);
            run_cycle(
                self.generator,
                &mut self.state,
                &self.catalog,
                &mut host,
                &mut self.rng,
                Timestamp::from_secs(now),
            )
        }
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            unlock_cooldown_secs: 60.0,
            max_concurrent_docks: 2,
            max_total_generated: 5,
            template_candidates: vec!["arm".into()],
            initial_unlocks: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_cycle_spawns_and_arms() {
        let mut f = Fixture::new(config());
        let outcome = f.cycle(0.0);

        let record = outcome.spawned().expect("should spawn");
        assert_eq!(record.id, 1);
        assert_eq!(record.name, "Dock Alpha-01");
        assert!(f.world.contains(record.entity));
        assert_eq!(f.state.next_unlock_at(), Timestamp::from_secs(60.0));
        assert_eq!(f.state.phase(), CyclePhase::Idle);
        assert_eq!(f.state.stats().spawned, 1);
    }

    #[test]
    fn test_cooldown_gates_cycles() {
        let mut f = Fixture::new(config());
        f.cycle(0.0);

        assert_eq!(f.cycle(30.0), CycleOutcome::NotEligible);
        assert_eq!(f.cycle(59.9), CycleOutcome::NotEligible);
        assert_eq!(f.state.stats().cycles, 1);
        assert!(f.cycle(60.0).spawned().is_some());
        assert_eq!(f.state.next_unlock_at(), Timestamp::from_secs(120.0));
    }

    #[test]
    fn test_initial_unlocks_run_back_to_back() {
        let mut f = Fixture::new(GeneratorConfig {
            initial_unlocks: 2,
            ..config()
        });

        assert!(f.cycle(0.0).spawned().is_some());
        assert_eq!(f.state.next_unlock_at(), Timestamp::from_secs(0.0));
        assert!(f.cycle(0.5).spawned().is_some());
        assert_eq!(f.state.next_unlock_at(), Timestamp::from_secs(60.5));
        assert_eq!(f.cycle(1.0), CycleOutcome::NotEligible);
    }

    #[test]
    fn test_denial_still_rearms() {
        let mut f = Fixture::new(GeneratorConfig {
            max_concurrent_docks: 1,
            ..config()
        });
        f.cycle(0.0);

        assert_eq!(
            f.cycle(60.0),
            CycleOutcome::Denied(AdmissionDenied::ConcurrentLimitReached)
        );
        assert_eq!(f.state.next_unlock_at(), Timestamp::from_secs(120.0));
        assert_eq!(f.state.generated_count(), 1);
        assert_eq!(f.state.stats().denied_concurrent, 1);
    }

    #[test]
    fn test_placement_failure_releases_permit() {
        let mut f = Fixture::new(GeneratorConfig {
            min_separation: 10_000.0,
            ..config()
        });
        assert!(f.cycle(0.0).spawned().is_some());

        let outcome = f.cycle(60.0);
        assert!(matches!(outcome, CycleOutcome::PlacementFailed(_)));
        assert_eq!(f.state.in_flight(), 0);
        assert_eq!(f.state.generated_count(), 1);
        assert_eq!(f.state.dock_sequence_counter(), 2);
        assert_eq!(f.state.next_unlock_at(), Timestamp::from_secs(120.0));
    }

    #[test]
    fn test_missing_template_commits_nothing() {
        let mut f = Fixture::new(GeneratorConfig {
            template_candidates: vec!["ghost".into()],
            ..config()
        });

        let outcome = f.cycle(0.0);
        assert_eq!(
            outcome,
            CycleOutcome::InstantiationFailed(InstantiationFailure::TemplateNotFound("ghost".into()))
        );
        assert_eq!(f.state.generated_count(), 0);
        assert_eq!(f.state.dock_sequence_counter(), 1);
        assert_eq!(f.state.in_flight(), 0);
        assert_eq!(f.cycle(10.0), CycleOutcome::NotEligible);
        assert_eq!(f.world.query::<&crate::components::DockArm>().iter().count(), 0);
    }

    #[test]
    fn test_host_exhaustion_is_retried_next_cooldown() {
        let mut f = Fixture::new(config());
        f.limits.max_structures = Some(0);

        assert_eq!(
            f.cycle(0.0),
            CycleOutcome::InstantiationFailed(InstantiationFailure::ResourceExhausted)
        );
        f.limits.max_structures = None;
        assert_eq!(f.cycle(30.0), CycleOutcome::NotEligible);
        assert!(f.cycle(60.0).spawned().is_some());
        assert_eq!(f.state.stats().resource_exhausted, 1);
    }

    #[test]
    fn test_restored_generator_waits_for_its_deadline() {
        let mut f = Fixture::new(config());
        f.state = GeneratorState::restore(config(), Vec2::ZERO, "arm".into(), Timestamp::from_secs(100.0));
        assert_eq!(f.state.initial_unlocks_remaining(), 1);

        assert_eq!(f.cycle(5.0), CycleOutcome::NotEligible);
        assert_eq!(f.cycle(99.9), CycleOutcome::NotEligible);
        assert_eq!(f.state.generated_count(), 0);

        let record = f.cycle(100.0).spawned().cloned().expect("should spawn at the deadline");
        assert_eq!(record.created_at, Timestamp::from_secs(100.0));
        assert_eq!(f.state.initial_unlocks_remaining(), 0);
        assert_eq!(f.state.next_unlock_at(), Timestamp::from_secs(160.0));
    }

    #[test]
    fn test_unknown_candidate_is_rerolled_after_failure() {
        let candidates = GeneratorConfig {
            template_candidates: vec!["ghost".into(), "arm".into()],
            ..config()
        };
        let mut f = Fixture::new(candidates.clone());
        f.state = GeneratorState::restore(candidates, Vec2::ZERO, "ghost".into(), Timestamp::ZERO);

        assert_eq!(
            f.cycle(0.0),
            CycleOutcome::InstantiationFailed(InstantiationFailure::TemplateNotFound("ghost".into()))
        );
        assert_eq!(f.state.structure_template_id(), "arm");

        for i in 1..=2 {
            let outcome = f.cycle(60.0 * i as f64);
            assert!(outcome.spawned().is_some(), "cycle {}: {:?}", i, outcome);
            assert_eq!(f.state.structure_template_id(), "arm");
        }
        assert_eq!(f.state.stats().template_not_found, 1);
    }
}

//! Docking engine - main entry point for running the scheduler

use std::sync::mpsc::{self, Receiver, Sender};

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::clock::{Clock, SessionClock, Timestamp};
use crate::components::*;
use crate::generation::{ConfigError, GeneratorConfig, StructureCatalog};
use crate::host::{HostLimits, StructureHost, WorldHost};
use crate::systems::{ledger, run_cycle, CycleOutcome};

/// Default time between scheduling opportunities, in seconds
const DEFAULT_SCHEDULING_INTERVAL: f64 = 1.0;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid generator configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("entity {0:?} has no docking-arm generator")]
    UnknownGenerator(Entity),
}

/// Result of one generator's scheduling opportunity
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub generator: Entity,
    pub at: Timestamp,
    pub outcome: CycleOutcome,
}

/// Main scheduling engine.
///
/// Owns the world, the template catalog and the session clock. All generator
/// state is mutated from the thread calling [`update`](Self::update);
/// destruction notices from elsewhere come in through [`notifier`](Self::notifier).
pub struct DockingEngine {
    /// ECS world containing stations and spawned docks
    pub world: World,
    catalog: StructureCatalog,
    clock: SessionClock,
    rng: StdRng,
    host_limits: HostLimits,
    notify_tx: Sender<Entity>,
    notify_rx: Receiver<Entity>,
    scheduling_interval: f64,
    last_schedule: Option<Timestamp>,
    round: u32,
}

impl DockingEngine {
    /// Create an empty engine. `seed` drives every placement and template pick.
    pub fn new(catalog: StructureCatalog, seed: u64) -> Self {
        let (notify_tx, notify_rx) = mpsc::channel();
        Self {
            world: World::new(),
            catalog,
            clock: SessionClock::new(),
            rng: StdRng::seed_from_u64(seed),
            host_limits: HostLimits::default(),
            notify_tx,
            notify_rx,
            scheduling_interval: DEFAULT_SCHEDULING_INTERVAL,
            last_schedule: None,
            round: 1,
        }
    }

    pub fn with_host_limits(mut self, limits: HostLimits) -> Self {
        self.host_limits = limits;
        self
    }

    /// Seconds between scheduling opportunities. Zero schedules every update.
    pub fn set_scheduling_interval(&mut self, secs: f64) {
        self.scheduling_interval = if secs.is_finite() { secs.max(0.0) } else { DEFAULT_SCHEDULING_INTERVAL };
    }

    pub fn catalog(&self) -> &StructureCatalog {
        &self.catalog
    }

    pub fn host_limits(&self) -> &HostLimits {
        &self.host_limits
    }

    /// Attach a generator to a new station entity at `origin`
    pub fn add_generator(
        &mut self,
        name: impl Into<String>,
        origin: Vec2,
        config: GeneratorConfig,
    ) -> Result<Entity, EngineError> {
        config.validate()?;
        for candidate in &config.template_candidates {
            if !self.catalog.contains(candidate) {
                log::warn!("Template candidate '{}' is not in the structure catalog", candidate);
            }
        }

        let name = name.into();
        let mut state = GeneratorState::new(config, origin, self.clock.now(), &mut self.rng);
        if !self.catalog.contains(&state.structure_template_id) {
            if let Some(known) = self.catalog.choose_from(&state.config.template_candidates, &mut self.rng) {
                state.structure_template_id = known.clone();
            }
        }
        log::info!(
            "Station '{}' generator online at ({:.1}, {:.1}), first unlock at {:.1}s",
            name,
            origin.x,
            origin.y,
            state.next_unlock_at().as_secs()
        );
        Ok(self.world.spawn((Station::new(name), Position::new(origin), state)))
    }

    /// Destroy a station together with its generator. Docks it spawned are
    /// left to the world.
    pub fn remove_generator(&mut self, generator: Entity) -> Result<GeneratorState, EngineError> {
        let state = self
            .world
            .remove_one::<GeneratorState>(generator)
            .map_err(|_| EngineError::UnknownGenerator(generator))?;
        if let Err(e) = self.world.despawn(generator) {
            log::warn!("Station {:?} lost its entity before removal: {}", generator, e);
        }
        Ok(state)
    }

    /// Update the simulation by `delta_seconds` of wall time.
    ///
    /// Returns the terminal outcome of every generator that got past its
    /// cooldown this update.
    pub fn update(&mut self, delta_seconds: f32) -> Vec<CycleReport> {
        self.clock.advance(delta_seconds);
        self.process_notifications();

        let now = self.clock.now();
        if let Some(last) = self.last_schedule {
            if now.since(last) < self.scheduling_interval || now == last {
                return Vec::new();
            }
        }
        self.last_schedule = Some(now);
        self.run_generators()
    }

    /// Give every generator a scheduling opportunity at the current time,
    /// regardless of the scheduling interval.
    pub fn run_generators(&mut self) -> Vec<CycleReport> {
        self.process_notifications();
        let now = self.clock.now();

        let mut generators: Vec<Entity> = self
            .world
            .query::<&GeneratorState>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();
        generators.sort_unstable();

        let mut reports = Vec::new();
        for generator in generators {
            // Detach the state so the host can mutate the world during the cycle
            let Ok(mut state) = self.world.remove_one::<GeneratorState>(generator) else {
                continue;
            };

            let outcome = {
                let mut host = WorldHost::new(&mut self.world, &self.host_limits);
                run_cycle(generator, &mut state, &self.catalog, &mut host, &mut self.rng, now)
            };

            if let Err(e) = self.world.insert_one(generator, state) {
                log::error!("Generator {:?} vanished during its cycle: {}", generator, e);
                continue;
            }
            if outcome.is_terminal() {
                reports.push(CycleReport {
                    generator,
                    at: now,
                    outcome,
                });
            }
        }
        reports
    }

    /// Sender for destruction notices from anywhere. Notices are applied at
    /// the start of the next update.
    pub fn notifier(&self) -> Sender<Entity> {
        self.notify_tx.clone()
    }

    /// Deliver a destruction notice right away
    pub fn notify_destroyed(&mut self, entity: Entity) {
        for (_, state) in self.world.query_mut::<&mut GeneratorState>() {
            ledger::retire(state, entity);
        }
    }

    /// Destroy a dock entity and retire it from its generator's ledger
    pub fn destroy_dock(&mut self, dock: Entity) -> bool {
        let destroyed = WorldHost::new(&mut self.world, &self.host_limits).destroy_entity(dock);
        self.notify_destroyed(dock);
        destroyed
    }

    /// Apply queued notices, then retire any active dock whose entity is gone
    fn process_notifications(&mut self) {
        let pending: Vec<Entity> = self.notify_rx.try_iter().collect();
        for entity in pending {
            self.notify_destroyed(entity);
        }

        let world = &self.world;
        for (generator, state) in world.query::<&mut GeneratorState>().iter() {
            let pruned = ledger::prune_dead(state, |e| world.contains(e));
            if pruned > 0 {
                log::debug!("Generator {:?} retired {} docks destroyed without notice", generator, pruned);
            }
        }
    }

    /// End the round: destroy every live dock and reset all session state.
    ///
    /// Cooldown deadlines survive since they are persistent; sequence numbers
    /// start again from 1.
    pub fn restart_round(&mut self) {
        let docks: Vec<Entity> = self
            .world
            .query::<&DockArm>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();
        let destroyed = docks.len();
        for dock in docks {
            let _ = self.world.despawn(dock);
        }

        for (_, state) in self.world.query_mut::<&mut GeneratorState>() {
            state.reset_session();
        }
        // Notices about the old round's docks are moot
        while self.notify_rx.try_recv().is_ok() {}

        self.round += 1;
        log::info!("Round {} started, {} docks cleared", self.round, destroyed);
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn resume(&mut self) {
        self.clock.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.clock.set_time_scale(scale);
    }

    /// Current session time
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn generator(&self, generator: Entity) -> Option<hecs::Ref<'_, GeneratorState>> {
        self.world.get::<&GeneratorState>(generator).ok()
    }

    /// All generator entities in creation order
    pub fn generators(&self) -> Vec<Entity> {
        let mut generators: Vec<Entity> = self
            .world
            .query::<&GeneratorState>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();
        generators.sort_unstable();
        generators
    }

    pub fn generator_count(&self) -> usize {
        self.world.query::<&GeneratorState>().iter().count()
    }

    /// Count live docking arms
    pub fn dock_count(&self) -> usize {
        self.world.query::<&DockArm>().iter().count()
    }

    /// Every broken invariant across all generators
    pub fn invariant_violations(&self) -> Vec<(Entity, String)> {
        self.world
            .query::<&GeneratorState>()
            .iter()
            .flat_map(|(entity, state)| {
                state
                    .invariant_violations()
                    .into_iter()
                    .map(move |v| (entity, v))
            })
            .collect()
    }

    /// Save the persistent part of every generator to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), crate::persistence::SaveError> {
        crate::persistence::save_generators(writer, &self.world, self.clock.now(), self.round)
    }

    /// Replace the world with a saved set of generators.
    ///
    /// Docks are not saved: the loaded session starts empty, with each
    /// generator's cooldown deadline where it was.
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), crate::persistence::SaveError> {
        let loaded = crate::persistence::load_generators(reader)?;

        let mut world = World::new();
        for saved in loaded.generators {
            let origin = saved.origin;
            let name = saved.station_name.clone();
            world.spawn((Station::new(name), Position::new(origin), saved.into_state()));
        }

        self.world = world;
        self.clock = SessionClock::starting_at(loaded.sim_time);
        self.round = loaded.round;
        self.last_schedule = None;
        while self.notify_rx.try_recv().is_ok() {}
        Ok(())
    }
}

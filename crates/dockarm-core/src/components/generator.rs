//! Docking-arm generator component - one per station

use std::sync::atomic::{AtomicU64, Ordering};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{SequenceNumber, TemplateId, Vec2};
use crate::clock::Timestamp;
use crate::generation::GeneratorConfig;
use crate::systems::DockLedger;

/// Where a generator is inside its scheduling cycle.
///
/// Every cycle starts and ends in `Idle`; the other phases are only
/// observable from inside the orchestrator and its collaborators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CyclePhase {
    #[default]
    Idle,
    AwaitingAdmission,
    Placing,
    Instantiating,
}

/// Session counters, reset with the rest of the session state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorStats {
    /// Cycles that got past the cooldown gate
    pub cycles: u32,
    pub spawned: u32,
    pub denied_concurrent: u32,
    pub denied_total: u32,
    pub placement_failures: u32,
    pub template_not_found: u32,
    pub location_invalid: u32,
    pub resource_exhausted: u32,
}

impl GeneratorStats {
    pub fn failures(&self) -> u32 {
        self.placement_failures + self.template_not_found + self.location_invalid + self.resource_exhausted
    }
}

/// Everything that lives only as long as a round.
///
/// None of this is ever saved: a new round (or a loaded save) starts from
/// dock #1 with an empty ledger.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Unique per session; permits are tagged with it
    pub(crate) id: u64,
    pub(crate) ledger: DockLedger,
    /// Permits granted but not yet committed or released
    pub(crate) in_flight: u32,
    pub(crate) initial_unlocks_remaining: u32,
    pub(crate) phase: CyclePhase,
    pub(crate) stats: GeneratorStats,
}

impl SessionState {
    pub fn new(initial_unlocks: u32) -> Self {
        static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            ledger: DockLedger::new(),
            in_flight: 0,
            initial_unlocks_remaining: initial_unlocks,
            phase: CyclePhase::Idle,
            stats: GeneratorStats::default(),
        }
    }
}

/// Generator component attached to a station entity.
///
/// Configuration is fixed at creation. `next_unlock_at` is only ever moved
/// forward, and only by the orchestrator.
#[derive(Debug, Clone)]
pub struct GeneratorState {
    pub(crate) config: GeneratorConfig,
    pub(crate) origin: Vec2,
    pub(crate) structure_template_id: TemplateId,
    pub(crate) next_unlock_at: Timestamp,
    pub(crate) session: SessionState,
}

impl GeneratorState {
    /// Create a generator at `origin`, picking its first template from the
    /// configured candidates.
    ///
    /// With initial unlocks configured the generator is eligible right away,
    /// otherwise the first unlock waits one full cooldown.
    pub fn new(config: GeneratorConfig, origin: Vec2, now: Timestamp, rng: &mut impl Rng) -> Self {
        let structure_template_id = config
            .template_candidates
            .choose(rng)
            .cloned()
            .unwrap_or_default();
        let next_unlock_at = if config.initial_unlocks > 0 {
            now
        } else {
            now.after(config.unlock_cooldown_secs)
        };
        Self::restore(config, origin, structure_template_id, next_unlock_at)
    }

    /// Rebuild a generator from its persistent fields with a fresh session.
    /// Restored initial unlocks still wait for `next_unlock_at`.
    pub fn restore(
        config: GeneratorConfig,
        origin: Vec2,
        structure_template_id: TemplateId,
        next_unlock_at: Timestamp,
    ) -> Self {
        let session = SessionState::new(config.initial_unlocks);
        Self {
            config,
            origin,
            structure_template_id,
            next_unlock_at,
            session,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Reference point every dock distance is measured from
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Template the next dock will be spawned from
    pub fn structure_template_id(&self) -> &str {
        &self.structure_template_id
    }

    pub fn next_unlock_at(&self) -> Timestamp {
        self.next_unlock_at
    }

    pub fn unlock_cooldown_secs(&self) -> f64 {
        self.config.unlock_cooldown_secs
    }

    pub fn ledger(&self) -> &DockLedger {
        &self.session.ledger
    }

    pub fn stats(&self) -> &GeneratorStats {
        &self.session.stats
    }

    pub fn phase(&self) -> CyclePhase {
        self.session.phase
    }

    pub fn initial_unlocks_remaining(&self) -> u32 {
        self.session.initial_unlocks_remaining
    }

    pub fn in_flight(&self) -> u32 {
        self.session.in_flight
    }

    pub fn active_count(&self) -> usize {
        self.session.ledger.active_len()
    }

    pub fn generated_count(&self) -> usize {
        self.session.ledger.generated_len()
    }

    /// Number the next successfully spawned dock will get
    pub fn dock_sequence_counter(&self) -> SequenceNumber {
        self.session.ledger.next_sequence()
    }

    /// Drop everything session-scoped. The cooldown deadline is persistent
    /// and stays where it is.
    pub(crate) fn reset_session(&mut self) {
        self.session = SessionState::new(self.config.initial_unlocks);
    }

    /// Describe every broken capacity or placement invariant. Empty when healthy.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let ledger = &self.session.ledger;

        if ledger.active_len() > self.config.max_concurrent_docks as usize {
            violations.push(format!(
                "{} active docks exceed concurrent limit {}",
                ledger.active_len(),
                self.config.max_concurrent_docks
            ));
        }
        if ledger.generated_len() > self.config.max_total_generated as usize {
            violations.push(format!(
                "{} generated docks exceed total limit {}",
                ledger.generated_len(),
                self.config.max_total_generated
            ));
        }
        if self.session.phase != CyclePhase::Idle {
            violations.push(format!("generator left in phase {:?}", self.session.phase));
        }

        let active: Vec<_> = ledger.active().collect();
        for record in &active {
            if ledger.get(record.id).map(|r| r.entity) != Some(record.entity) {
                violations.push(format!("active dock #{} missing from history", record.id));
            }

            // f32 slack for sampled radii
            let distance = record.location.distance(&self.origin);
            if distance < self.config.min_spawn_distance - 1e-2
                || distance > self.config.max_spawn_distance + 1e-2
            {
                violations.push(format!(
                    "dock #{} at distance {:.2} outside [{}, {}]",
                    record.id, distance, self.config.min_spawn_distance, self.config.max_spawn_distance
                ));
            }
        }
        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                if a.location.distance(&b.location) < self.config.min_separation - 1e-2 {
                    violations.push(format!("docks #{} and #{} overlap", a.id, b.id));
                }
            }
        }

        violations
    }
}

//! Lifecycle ledger - the authoritative record of every dock in a round
//!
//! Records live in an arena indexed by sequence number. History is
//! append-only; only the active set shrinks. Entity handles are weak and may
//! point at entities that no longer exist, so callers holding a host should
//! [`prune_dead`] before trusting the active set.

use std::collections::{BTreeSet, HashMap};

use hecs::Entity;

use super::admission::{self, Permit};
use crate::clock::Timestamp;
use crate::components::{GeneratorState, SequenceNumber, TemplateId, Vec2};

/// One dock that was successfully spawned this round
#[derive(Debug, Clone, PartialEq)]
pub struct DockRecord {
    pub id: SequenceNumber,
    pub name: String,
    pub template_id: TemplateId,
    pub location: Vec2,
    /// Weak handle; the entity framework owns the entity
    pub entity: Entity,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct DockLedger {
    /// `records[i]` has id `i + 1`
    records: Vec<DockRecord>,
    active: BTreeSet<SequenceNumber>,
    by_entity: HashMap<Entity, SequenceNumber>,
    next_sequence: SequenceNumber,
}

impl DockLedger {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            active: BTreeSet::new(),
            by_entity: HashMap::new(),
            next_sequence: 1,
        }
    }

    /// Sequence number the next recorded dock will receive
    pub fn next_sequence(&self) -> SequenceNumber {
        self.next_sequence
    }

    pub fn get(&self, id: SequenceNumber) -> Option<&DockRecord> {
        let index = id.checked_sub(1)? as usize;
        self.records.get(index)
    }

    pub fn find_by_entity(&self, entity: Entity) -> Option<&DockRecord> {
        self.by_entity.get(&entity).and_then(|id| self.get(*id))
    }

    /// Full history in spawn order
    pub fn generated(&self) -> &[DockRecord] {
        &self.records
    }

    /// Currently active docks in spawn order
    pub fn active(&self) -> impl Iterator<Item = &DockRecord> + '_ {
        self.active.iter().filter_map(|id| self.get(*id))
    }

    pub fn active_entities(&self) -> Vec<Entity> {
        self.active().map(|r| r.entity).collect()
    }

    pub fn active_locations(&self) -> Vec<Vec2> {
        self.active().map(|r| r.location).collect()
    }

    pub fn is_active(&self, entity: Entity) -> bool {
        self.by_entity
            .get(&entity)
            .is_some_and(|id| self.active.contains(id))
    }

    pub fn generated_len(&self) -> usize {
        self.records.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    fn push(
        &mut self,
        name: String,
        template_id: TemplateId,
        location: Vec2,
        entity: Entity,
        now: Timestamp,
    ) -> &DockRecord {
        let id = self.next_sequence;
        self.next_sequence += 1;
        self.records.push(DockRecord {
            id,
            name,
            template_id,
            location,
            entity,
            created_at: now,
        });
        self.active.insert(id);
        self.by_entity.insert(entity, id);
        &self.records[self.records.len() - 1]
    }

    fn deactivate(&mut self, entity: Entity) -> bool {
        match self.by_entity.get(&entity) {
            Some(id) => self.active.remove(id),
            None => false,
        }
    }
}

impl Default for DockLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Commit a spawned dock: consumes the permit, assigns the next sequence
/// number, appends to history and marks the dock active.
pub fn record(
    state: &mut GeneratorState,
    permit: Permit,
    name: String,
    location: Vec2,
    entity: Entity,
    now: Timestamp,
) -> DockRecord {
    admission::redeem(state, permit);
    let template_id = state.structure_template_id.clone();
    state
        .session
        .ledger
        .push(name, template_id, location, entity, now)
        .clone()
}

/// Remove a dock from the active set after its entity was destroyed.
///
/// Idempotent: unknown and already-retired handles are ignored. Returns
/// whether anything changed.
pub fn retire(state: &mut GeneratorState, entity: Entity) -> bool {
    state.session.ledger.deactivate(entity)
}

/// Retire every active dock whose entity `is_alive` no longer reports.
/// Returns how many were retired.
pub fn prune_dead(state: &mut GeneratorState, is_alive: impl Fn(Entity) -> bool) -> usize {
    let dead: Vec<Entity> = state
        .session
        .ledger
        .active()
        .map(|r| r.entity)
        .filter(|e| !is_alive(*e))
        .collect();
    dead.into_iter().filter(|e| retire(state, *e)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GeneratorConfig;
    use crate::systems::admission::try_admit;
    use hecs::World;

    fn state() -> GeneratorState {
        let config = GeneratorConfig {
            max_concurrent_docks: 4,
            max_total_generated: 10,
            ..Default::default()
        };
        GeneratorState::restore(config, Vec2::ZERO, "docking_arm_standard".into(), Timestamp::ZERO)
    }

    fn record_one(state: &mut GeneratorState, entity: Entity, x: f32) -> DockRecord {
        let permit = try_admit(state).unwrap();
        record(state, permit, format!("dock {x}"), Vec2::new(x, 0.0), entity, Timestamp::from_secs(x as f64))
    }

    #[test]
    fn test_record_assigns_sequence() {
        let mut world = World::new();
        let mut s = state();
        let a = record_one(&mut s, world.spawn(()), 100.0);
        let b = record_one(&mut s, world.spawn(()), 200.0);

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(s.dock_sequence_counter(), 3);
        assert_eq!(s.generated_count(), 2);
        assert_eq!(s.active_count(), 2);
        assert_eq!(s.in_flight(), 0);
        assert_eq!(s.ledger().get(2), Some(&b));
        assert_eq!(s.ledger().get(0), None);
        assert_eq!(b.template_id, "docking_arm_standard");
    }

    #[test]
    fn test_retire_is_idempotent() {
        let mut world = World::new();
        let mut s = state();
        let entity = world.spawn(());
        record_one(&mut s, entity, 100.0);

        assert!(retire(&mut s, entity));
        assert_eq!(s.active_count(), 0);
        assert!(!retire(&mut s, entity));
        assert_eq!(s.active_count(), 0);
        assert_eq!(s.generated_count(), 1);
    }

    #[test]
    fn test_retire_unknown_entity_is_noop() {
        let mut world = World::new();
        let mut s = state();
        let tracked = world.spawn(());
        let stranger = world.spawn(());
        record_one(&mut s, tracked, 100.0);

        assert!(!retire(&mut s, stranger));
        assert!(s.ledger().is_active(tracked));
    }

    #[test]
    fn test_history_survives_retirement() {
        let mut world = World::new();
        let mut s = state();
        let first = world.spawn(());
        let second = world.spawn(());
        record_one(&mut s, first, 100.0);
        record_one(&mut s, second, 200.0);
        retire(&mut s, first);

        let active: Vec<_> = s.ledger().active().map(|r| r.id).collect();
        assert_eq!(active, vec![2]);
        assert_eq!(s.ledger().generated().len(), 2);
        assert_eq!(s.ledger().find_by_entity(first).map(|r| r.id), Some(1));
        assert_eq!(s.ledger().active_locations(), vec![Vec2::new(200.0, 0.0)]);
    }

    #[test]
    fn test_prune_dead_handles() {
        let mut world = World::new();
        let mut s = state();
        let alive = world.spawn(());
        let doomed = world.spawn(());
        record_one(&mut s, alive, 100.0);
        record_one(&mut s, doomed, 200.0);

        world.despawn(doomed).unwrap();
        assert_eq!(prune_dead(&mut s, |e| world.contains(e)), 1);
        assert_eq!(s.ledger().active_entities(), vec![alive]);
        assert_eq!(prune_dead(&mut s, |e| world.contains(e)), 0);
    }
}

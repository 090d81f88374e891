//! Persistence collaborator interface and the scope-keyed debounce
//! scheduler. Every call is fire-and-forget: a rejected write is logged,
//! never retried and never rolled back locally. The in-memory store stays
//! the source of visual truth until the next authoritative reload.

use crate::model::{EntityId, ScopeId, ScopeKind};
use crate::store::OrderingStore;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("rejected by backend: {0}")]
    Rejected(String),
}

/// The reorder/move endpoints owned by the backend. Implementations are
/// expected to translate these into REST calls.
pub trait Persistence {
    fn reorder_phases(
        &mut self,
        journey_id: &str,
        phase_ids: &[EntityId],
    ) -> Result<(), PersistError>;

    fn reorder_steps(&mut self, phase_id: &str, step_ids: &[EntityId])
    -> Result<(), PersistError>;

    fn reorder_cards(&mut self, step_id: &str, card_ids: &[EntityId]) -> Result<(), PersistError>;

    fn move_step_to_phase(
        &mut self,
        step_id: &str,
        target_phase_id: &str,
    ) -> Result<(), PersistError>;

    fn move_card_to_step(&mut self, card_id: &str, target_step_id: &str)
    -> Result<(), PersistError>;
}

/// Coalesces repeated persistence requests for one scope into a single
/// call carrying the order at flush time. A drag gesture can cross a scope
/// boundary several times per second; persisting every micro-move would
/// flood the network and risk out-of-order writes.
///
/// Time is passed in explicitly so the host's frame/timer loop drives
/// flushing and tests can inject it.
#[derive(Debug)]
pub struct PersistScheduler {
    debounce: Duration,
    pending: HashMap<ScopeId, Instant>,
}

impl PersistScheduler {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms),
            pending: HashMap::new(),
        }
    }

    /// Request a persistence write for `scope`. Re-scheduling a scope
    /// supersedes its pending deadline.
    pub fn schedule(&mut self, scope: ScopeId, now: Instant) {
        self.pending.insert(scope, now + self.debounce);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Dispatch every scope whose debounce window has elapsed, reading the
    /// current order from the store at flush time (last write wins per
    /// scope). Returns the number of calls issued.
    pub fn flush_due(
        &mut self,
        now: Instant,
        store: &OrderingStore,
        sink: &mut dyn Persistence,
    ) -> usize {
        let mut due: Vec<ScopeId> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(scope, _)| scope.clone())
            .collect();
        due.sort();

        for scope in &due {
            self.pending.remove(scope);
            dispatch_reorder(scope, store, sink);
        }
        due.len()
    }
}

fn dispatch_reorder(scope: &ScopeId, store: &OrderingStore, sink: &mut dyn Persistence) {
    let Some(order) = store.order(scope) else {
        log::warn!("scope {scope} vanished before its persistence flush");
        return;
    };
    let ids: Vec<EntityId> = order.to_vec();
    let result = match scope.kind {
        ScopeKind::Phases => sink.reorder_phases(&scope.owner, &ids),
        ScopeKind::Steps => sink.reorder_steps(&scope.owner, &ids),
        ScopeKind::Cards => sink.reorder_cards(&scope.owner, &ids),
    };
    if let Err(err) = result {
        log::warn!("persisting order for {scope} failed, keeping local order: {err}");
    }
}

/// Fire-and-forget reparenting call issued when a drag commits into a
/// different scope. Phases have no cross-journey move endpoint; the canvas
/// shows one journey's phases, so a phase never commits cross-scope.
pub fn fire_move(sink: &mut dyn Persistence, kind: ScopeKind, entity: &str, target_owner: &str) {
    let result = match kind {
        ScopeKind::Steps => sink.move_step_to_phase(entity, target_owner),
        ScopeKind::Cards => sink.move_card_to_step(entity, target_owner),
        ScopeKind::Phases => {
            log::warn!("no reparent endpoint for phases; skipping move of {entity}");
            return;
        }
    };
    if let Err(err) = result {
        log::warn!("moving {entity} into {target_owner} failed, keeping local state: {err}");
    }
}

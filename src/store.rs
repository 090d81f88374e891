//! In-memory authoritative client-side ordering of phases, steps and
//! cards. Every mutation goes through the operations here; readers treat
//! the store as read-only. Collections are replaced wholesale when a
//! fresh backend payload arrives.

use crate::error::CanvasError;
use crate::events::{Emitter, Subscription};
use crate::model::{EntityId, JourneyPayload, ScopeId};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The working order of one scope changed.
    ScopeChanged(ScopeId),
    /// All collections were replaced from an authoritative payload.
    Reloaded,
}

/// Pre-move capture of the two scopes touched by a cross-scope move.
/// Handing it back to [`OrderingStore::revert`] restores exactly those two
/// orders; scopes mutated in the interim elsewhere are unaffected.
#[derive(Debug, Clone)]
pub struct Snapshot {
    source_scope: ScopeId,
    source_order: Vec<EntityId>,
    target_scope: ScopeId,
    target_order: Vec<EntityId>,
}

impl Snapshot {
    pub fn source_scope(&self) -> &ScopeId {
        &self.source_scope
    }

    pub fn target_scope(&self) -> &ScopeId {
        &self.target_scope
    }

    pub fn source_order(&self) -> &[EntityId] {
        &self.source_order
    }

    pub fn target_order(&self) -> &[EntityId] {
        &self.target_order
    }
}

pub struct OrderingStore {
    scopes: BTreeMap<ScopeId, Vec<EntityId>>,
    scope_of: HashMap<EntityId, ScopeId>,
    emitter: Emitter<StoreEvent>,
}

impl OrderingStore {
    pub fn new() -> Self {
        Self {
            scopes: BTreeMap::new(),
            scope_of: HashMap::new(),
            emitter: Emitter::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> Subscription {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.emitter.unsubscribe(subscription);
    }

    /// Replace every collection with the orders in an authoritative journey
    /// payload. Members are ordered by `sequence_order`, payload order
    /// breaking ties.
    pub fn load_journey(&mut self, payload: &JourneyPayload) {
        self.scopes.clear();
        self.scope_of.clear();

        for journey in payload.journeys() {
            let mut phases = journey.phases.clone();
            phases.sort_by_key(|p| p.sequence_order);
            let phase_scope = ScopeId::phases(&journey.id);
            let phase_ids: Vec<EntityId> = phases.iter().map(|p| p.id.clone()).collect();
            self.install_scope(phase_scope, phase_ids);

            for phase in &phases {
                let mut steps = phase.steps.clone();
                steps.sort_by_key(|s| s.sequence_order);
                let step_scope = ScopeId::steps(&phase.id);
                let step_ids: Vec<EntityId> = steps.iter().map(|s| s.id.clone()).collect();
                self.install_scope(step_scope, step_ids);

                for step in &steps {
                    let mut cards = step.cards.clone();
                    cards.sort_by_key(|c| c.sequence_order);
                    let card_scope = ScopeId::cards(&step.id);
                    let card_ids: Vec<EntityId> = cards.iter().map(|c| c.id.clone()).collect();
                    self.install_scope(card_scope, card_ids);
                }
            }
        }

        self.emitter.emit(&StoreEvent::Reloaded);
    }

    fn install_scope(&mut self, scope: ScopeId, members: Vec<EntityId>) {
        for member in &members {
            self.scope_of.insert(member.clone(), scope.clone());
        }
        self.scopes.insert(scope, members);
    }

    pub fn has_scope(&self, scope: &ScopeId) -> bool {
        self.scopes.contains_key(scope)
    }

    pub fn order(&self, scope: &ScopeId) -> Option<&[EntityId]> {
        self.scopes.get(scope).map(|members| members.as_slice())
    }

    pub fn scope_of(&self, entity: &str) -> Option<&ScopeId> {
        self.scope_of.get(entity)
    }

    /// The `[0..n-1]` sequence assignment for a scope, as it would be
    /// persisted.
    pub fn sequence_orders(&self, scope: &ScopeId) -> Vec<(EntityId, u32)> {
        self.order(scope)
            .map(|members| {
                members
                    .iter()
                    .enumerate()
                    .map(|(idx, id)| (id.clone(), idx as u32))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn scopes(&self) -> impl Iterator<Item = (&ScopeId, &[EntityId])> {
        self.scopes
            .iter()
            .map(|(scope, members)| (scope, members.as_slice()))
    }

    /// Replace the working order of one scope. If `new_order` is not a
    /// permutation of the current membership the entity set is reconciled:
    /// known members keep their requested positions and anything missing is
    /// appended in its existing relative order.
    pub fn reorder_within_scope(&mut self, scope: &ScopeId, new_order: Vec<EntityId>) {
        let Some(current) = self.scopes.get(scope) else {
            log::warn!("reorder requested for unknown scope {scope}");
            return;
        };

        let members: HashSet<&EntityId> = current.iter().collect();
        let mut seen: HashSet<&EntityId> = HashSet::new();
        let valid = new_order.len() == current.len()
            && new_order
                .iter()
                .all(|id| members.contains(id) && seen.insert(id));

        let next = if valid {
            new_order
        } else {
            log::warn!("reorder for {scope} is not a permutation; reconciling membership");
            let mut next: Vec<EntityId> = Vec::with_capacity(current.len());
            let mut taken: HashSet<&EntityId> = HashSet::new();
            for id in &new_order {
                if members.contains(id) && taken.insert(id) {
                    next.push(id.clone());
                }
            }
            for id in current {
                if !taken.contains(id) {
                    next.push(id.clone());
                }
            }
            next
        };

        self.scopes.insert(scope.clone(), next);
        self.emitter.emit(&StoreEvent::ScopeChanged(scope.clone()));
    }

    /// Remove `entity` from its current scope and insert it into
    /// `target_scope` immediately before `before` (append when `None`).
    /// Returns a snapshot of both scopes' orders prior to the move.
    pub fn move_to_scope(
        &mut self,
        entity: &str,
        target_scope: &ScopeId,
        before: Option<&str>,
    ) -> Result<Snapshot, CanvasError> {
        let source_scope = self
            .scope_of
            .get(entity)
            .cloned()
            .ok_or_else(|| CanvasError::UnknownEntity(entity.to_string()))?;
        if !self.scopes.contains_key(target_scope) {
            return Err(CanvasError::UnknownScope(target_scope.clone()));
        }

        let snapshot = Snapshot {
            source_scope: source_scope.clone(),
            source_order: self.scopes[&source_scope].clone(),
            target_scope: target_scope.clone(),
            target_order: self.scopes[target_scope].clone(),
        };

        if let Some(source) = self.scopes.get_mut(&source_scope) {
            source.retain(|id| id != entity);
        }
        let target = self
            .scopes
            .get_mut(target_scope)
            .expect("target scope checked above");
        let insert_at = before
            .and_then(|before_id| target.iter().position(|id| id == before_id))
            .unwrap_or(target.len());
        target.insert(insert_at, entity.to_string());
        self.scope_of
            .insert(entity.to_string(), target_scope.clone());

        self.emitter
            .emit(&StoreEvent::ScopeChanged(source_scope.clone()));
        self.emitter
            .emit(&StoreEvent::ScopeChanged(target_scope.clone()));
        Ok(snapshot)
    }

    /// Restore the two orders captured in `snapshot` atomically. Members of
    /// the restored orders are reclaimed from whatever scope they currently
    /// sit in, so a later move chained through a third scope cannot leave a
    /// duplicate behind.
    pub fn revert(&mut self, snapshot: &Snapshot) {
        let pairs = [
            (&snapshot.source_scope, &snapshot.source_order),
            (&snapshot.target_scope, &snapshot.target_order),
        ];

        let mut touched: Vec<ScopeId> = Vec::new();
        for (scope, order) in pairs {
            for member in order.iter() {
                if let Some(current) = self.scope_of.get(member) {
                    if current != scope
                        && current != &snapshot.source_scope
                        && current != &snapshot.target_scope
                    {
                        let stale = current.clone();
                        if let Some(members) = self.scopes.get_mut(&stale) {
                            members.retain(|id| id != member);
                        }
                        touched.push(stale);
                    }
                }
            }
            self.scopes.insert(scope.clone(), order.clone());
            for member in order.iter() {
                self.scope_of.insert(member.clone(), scope.clone());
            }
            touched.push(scope.clone());
        }

        touched.dedup();
        for scope in touched {
            self.emitter.emit(&StoreEvent::ScopeChanged(scope));
        }
    }
}

impl Default for OrderingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderingStore")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store_with(scopes: &[(&ScopeId, &[&str])]) -> OrderingStore {
        let mut store = OrderingStore::new();
        for (scope, members) in scopes {
            store.install_scope(
                (*scope).clone(),
                members.iter().map(|id| id.to_string()).collect(),
            );
        }
        store
    }

    fn ids(values: &[&str]) -> Vec<EntityId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn reorder_applies_valid_permutation() {
        let scope = ScopeId::steps("p1");
        let mut store = store_with(&[(&scope, &["s1", "s2", "s3"])]);
        store.reorder_within_scope(&scope, ids(&["s3", "s1", "s2"]));
        assert_eq!(store.order(&scope).unwrap(), ids(&["s3", "s1", "s2"]));
    }

    #[test]
    fn reorder_reconciles_bad_permutation() {
        let scope = ScopeId::steps("p1");
        let mut store = store_with(&[(&scope, &["s1", "s2", "s3"])]);
        // stale id and a missing member
        store.reorder_within_scope(&scope, ids(&["s3", "ghost", "s1"]));
        assert_eq!(store.order(&scope).unwrap(), ids(&["s3", "s1", "s2"]));
    }

    #[test]
    fn move_inserts_before_and_appends() {
        let a = ScopeId::steps("p1");
        let b = ScopeId::steps("p2");
        let mut store = store_with(&[(&a, &["s1", "s2"]), (&b, &["s4"])]);

        store.move_to_scope("s1", &b, Some("s4")).unwrap();
        assert_eq!(store.order(&b).unwrap(), ids(&["s1", "s4"]));

        store.move_to_scope("s2", &b, None).unwrap();
        assert_eq!(store.order(&a).unwrap(), Vec::<EntityId>::new());
        assert_eq!(store.order(&b).unwrap(), ids(&["s1", "s4", "s2"]));
        assert_eq!(store.scope_of("s2"), Some(&b));
    }

    #[test]
    fn revert_restores_both_orders_exactly() {
        let a = ScopeId::steps("p1");
        let b = ScopeId::steps("p2");
        let mut store = store_with(&[(&a, &["s1", "s2", "s3"]), (&b, &["s4"])]);

        let snapshot = store.move_to_scope("s2", &b, None).unwrap();
        store.revert(&snapshot);
        assert_eq!(store.order(&a).unwrap(), ids(&["s1", "s2", "s3"]));
        assert_eq!(store.order(&b).unwrap(), ids(&["s4"]));
        assert_eq!(store.scope_of("s2"), Some(&a));
    }

    #[test]
    fn revert_reclaims_entity_from_a_third_scope() {
        let a = ScopeId::steps("p1");
        let b = ScopeId::steps("p2");
        let c = ScopeId::steps("p3");
        let mut store =
            store_with(&[(&a, &["s1", "s2"]), (&b, &["s4"]), (&c, &["s5"])]);

        let baseline = store.move_to_scope("s2", &b, None).unwrap();
        store.move_to_scope("s2", &c, None).unwrap();
        store.revert(&baseline);

        assert_eq!(store.order(&a).unwrap(), ids(&["s1", "s2"]));
        assert_eq!(store.order(&b).unwrap(), ids(&["s4"]));
        assert_eq!(store.order(&c).unwrap(), ids(&["s5"]));
        assert_eq!(store.scope_of("s2"), Some(&a));
    }

    #[test]
    fn sequence_orders_are_contiguous_from_zero() {
        let scope = ScopeId::cards("s1");
        let mut store = store_with(&[(&scope, &["c1", "c2", "c3"])]);
        store.reorder_within_scope(&scope, ids(&["c2", "c3", "c1"]));
        let orders = store.sequence_orders(&scope);
        assert_eq!(
            orders,
            vec![
                ("c2".to_string(), 0),
                ("c3".to_string(), 1),
                ("c1".to_string(), 2)
            ]
        );
    }

    #[test]
    fn mutations_notify_affected_scopes() {
        let scope = ScopeId::steps("p1");
        let mut store = store_with(&[(&scope, &["s1", "s2"])]);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        store.reorder_within_scope(&scope, ids(&["s2", "s1"]));
        assert_eq!(
            *events.borrow(),
            vec![StoreEvent::ScopeChanged(scope.clone())]
        );
    }

    #[test]
    fn load_journey_orders_by_sequence_order() {
        let payload: JourneyPayload = serde_json::from_str(
            r#"{
                "id": "j1",
                "phases": [
                    {"id": "p2", "sequence_order": 1, "steps": []},
                    {"id": "p1", "sequence_order": 0, "steps": [
                        {"id": "s2", "sequence_order": 1},
                        {"id": "s1", "sequence_order": 0}
                    ]}
                ]
            }"#,
        )
        .unwrap();
        let mut store = OrderingStore::new();
        store.load_journey(&payload);
        assert_eq!(
            store.order(&ScopeId::phases("j1")).unwrap(),
            ids(&["p1", "p2"])
        );
        assert_eq!(
            store.order(&ScopeId::steps("p1")).unwrap(),
            ids(&["s1", "s2"])
        );
    }
}

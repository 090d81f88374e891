//! Session-scoped drag state machine: Idle -> Dragging -> Idle. Hover
//! events become store mutations immediately (optimistic feedback); the
//! persistence calls only go out at drag end, so cancellation is a pure
//! data revert and never has to chase an in-flight request.
//!
//! Transitions are synchronous `&mut self` methods. There is no await
//! point between reading the working scope and writing the new order, so
//! rapid hover events cannot interleave.

use crate::error::CanvasError;
use crate::model::{EntityId, ScopeId};
use crate::persist::{self, PersistScheduler, Persistence};
use crate::store::{OrderingStore, Snapshot};
use std::time::Instant;

/// What the pointer is currently over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverTarget {
    /// A sibling entity inside some scope.
    Entity(EntityId),
    /// An empty scope container with no sibling to hover.
    Container(ScopeId),
}

#[derive(Debug)]
struct DragSession {
    dragged: EntityId,
    initial_scope: ScopeId,
    working_scope: ScopeId,
    last_hover_target: Option<EntityId>,
    /// Captured on the first cross-scope transition only; later
    /// transitions never overwrite it.
    baseline: Option<Snapshot>,
    /// Defensive copy of the origin order, used when the gesture never
    /// leaves its scope and the snapshot machinery is skipped entirely.
    origin_order: Vec<EntityId>,
}

#[derive(Debug, Default)]
pub struct DragCoordinator {
    session: Option<DragSession>,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn dragged_entity(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.dragged.as_str())
    }

    pub fn drag_start(&mut self, store: &OrderingStore, entity: &str) -> Result<(), CanvasError> {
        if let Some(session) = &self.session {
            return Err(CanvasError::DragInProgress(session.dragged.clone()));
        }
        let scope = store
            .scope_of(entity)
            .cloned()
            .ok_or_else(|| CanvasError::UnknownEntity(entity.to_string()))?;
        let origin_order = store
            .order(&scope)
            .map(|order| order.to_vec())
            .unwrap_or_default();

        log::debug!("drag start: {entity} in {scope}");
        self.session = Some(DragSession {
            dragged: entity.to_string(),
            initial_scope: scope.clone(),
            working_scope: scope,
            last_hover_target: None,
            baseline: None,
            origin_order,
        });
        Ok(())
    }

    /// Translate one pointer hover into a store mutation. Hovering a
    /// sibling in the working scope reorders; hovering anything in another
    /// same-kind scope moves the dragged entity there, inserted
    /// immediately after the hovered entity.
    pub fn drag_over(
        &mut self,
        store: &mut OrderingStore,
        target: &HoverTarget,
    ) -> Result<(), CanvasError> {
        let session = self.session.as_mut().ok_or(CanvasError::NoActiveDrag)?;

        match target {
            HoverTarget::Entity(hovered) => {
                if *hovered == session.dragged {
                    return Ok(());
                }
                // the same target repeating across pointer frames is noise
                if session.last_hover_target.as_ref() == Some(hovered) {
                    return Ok(());
                }
                let Some(target_scope) = store.scope_of(hovered).cloned() else {
                    return Ok(());
                };

                if target_scope == session.working_scope {
                    let current = store
                        .order(&target_scope)
                        .map(|order| order.to_vec())
                        .unwrap_or_default();
                    let Some(hovered_idx) = current.iter().position(|id| id == hovered) else {
                        return Ok(());
                    };
                    let mut next: Vec<EntityId> = current
                        .iter()
                        .filter(|id| **id != session.dragged)
                        .cloned()
                        .collect();
                    let insert_at = hovered_idx.min(next.len());
                    next.insert(insert_at, session.dragged.clone());
                    store.reorder_within_scope(&target_scope, next);
                } else {
                    if target_scope.kind != session.working_scope.kind {
                        log::debug!(
                            "ignoring hover across scope kinds: {} -> {target_scope}",
                            session.working_scope
                        );
                        return Ok(());
                    }
                    // insert-after convention: hovering an element previews
                    // insertion below it
                    let before = store.order(&target_scope).and_then(|order| {
                        let idx = order.iter().position(|id| id == hovered)?;
                        order.get(idx + 1).cloned()
                    });
                    let snapshot =
                        store.move_to_scope(&session.dragged, &target_scope, before.as_deref())?;
                    if session.baseline.is_none() {
                        session.baseline = Some(snapshot);
                    }
                    session.working_scope = target_scope;
                }
                session.last_hover_target = Some(hovered.clone());
            }
            HoverTarget::Container(scope) => {
                if *scope == session.working_scope {
                    return Ok(());
                }
                if scope.kind != session.working_scope.kind || !store.has_scope(scope) {
                    return Ok(());
                }
                let snapshot = store.move_to_scope(&session.dragged, scope, None)?;
                if session.baseline.is_none() {
                    session.baseline = Some(snapshot);
                }
                session.working_scope = scope.clone();
                session.last_hover_target = None;
            }
        }
        Ok(())
    }

    /// Undo the whole gesture. With a baseline snapshot the two recorded
    /// orders are restored; a gesture that never left its scope restores
    /// the captured origin order.
    pub fn drag_cancel(&mut self, store: &mut OrderingStore) -> Result<(), CanvasError> {
        let session = self.session.take().ok_or(CanvasError::NoActiveDrag)?;
        match session.baseline {
            Some(snapshot) => store.revert(&snapshot),
            None => {
                let unchanged = store
                    .order(&session.initial_scope)
                    .map(|order| order == session.origin_order.as_slice())
                    .unwrap_or(true);
                if !unchanged {
                    store.reorder_within_scope(&session.initial_scope, session.origin_order);
                }
            }
        }
        log::debug!("drag canceled: {}", session.dragged);
        Ok(())
    }

    /// Commit the final placement. Cross-scope commits issue the
    /// fire-and-forget reparent call plus a debounced reorder for both
    /// touched scopes; same-scope commits issue one debounced reorder, or
    /// nothing at all when the order never changed.
    pub fn drag_end(
        &mut self,
        store: &OrderingStore,
        scheduler: &mut PersistScheduler,
        sink: &mut dyn Persistence,
        now: Instant,
    ) -> Result<(), CanvasError> {
        let session = self.session.take().ok_or(CanvasError::NoActiveDrag)?;

        if session.working_scope != session.initial_scope {
            persist::fire_move(
                sink,
                session.working_scope.kind,
                &session.dragged,
                &session.working_scope.owner,
            );
            scheduler.schedule(session.initial_scope.clone(), now);
            scheduler.schedule(session.working_scope.clone(), now);
        } else {
            // read the order fresh at drop time, never a drag-start capture
            let unchanged = store
                .order(&session.initial_scope)
                .map(|order| order == session.origin_order.as_slice())
                .unwrap_or(true);
            if !unchanged {
                scheduler.schedule(session.initial_scope.clone(), now);
            }
        }
        log::debug!("drag committed: {} -> {}", session.dragged, session.working_scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JourneyPayload;
    use crate::persist::PersistError;

    #[derive(Default)]
    struct NullSink {
        moves: Vec<(String, String)>,
        reorder_calls: usize,
    }

    impl Persistence for NullSink {
        fn reorder_phases(&mut self, _: &str, _: &[EntityId]) -> Result<(), PersistError> {
            self.reorder_calls += 1;
            Ok(())
        }
        fn reorder_steps(&mut self, _: &str, _: &[EntityId]) -> Result<(), PersistError> {
            self.reorder_calls += 1;
            Ok(())
        }
        fn reorder_cards(&mut self, _: &str, _: &[EntityId]) -> Result<(), PersistError> {
            self.reorder_calls += 1;
            Ok(())
        }
        fn move_step_to_phase(&mut self, step: &str, phase: &str) -> Result<(), PersistError> {
            self.moves.push((step.to_string(), phase.to_string()));
            Ok(())
        }
        fn move_card_to_step(&mut self, card: &str, step: &str) -> Result<(), PersistError> {
            self.moves.push((card.to_string(), step.to_string()));
            Ok(())
        }
    }

    fn two_phase_store() -> OrderingStore {
        let payload: JourneyPayload = serde_json::from_str(
            r#"{"id": "j1", "phases": [
                {"id": "p1", "sequence_order": 0, "steps": [
                    {"id": "s1", "sequence_order": 0},
                    {"id": "s2", "sequence_order": 1},
                    {"id": "s3", "sequence_order": 2}
                ]},
                {"id": "p2", "sequence_order": 1, "steps": [
                    {"id": "s4", "sequence_order": 0}
                ]}
            ]}"#,
        )
        .unwrap();
        let mut store = OrderingStore::new();
        store.load_journey(&payload);
        store
    }

    fn ids(values: &[&str]) -> Vec<EntityId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn same_scope_hover_reorders_at_hovered_index() {
        let mut store = two_phase_store();
        let mut drag = DragCoordinator::new();
        drag.drag_start(&store, "s1").unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s2".into()))
            .unwrap();
        assert_eq!(
            store.order(&ScopeId::steps("p1")).unwrap(),
            ids(&["s2", "s1", "s3"])
        );
    }

    #[test]
    fn repeated_hover_over_same_target_is_ignored() {
        let mut store = two_phase_store();
        let mut drag = DragCoordinator::new();
        drag.drag_start(&store, "s1").unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s2".into()))
            .unwrap();
        let after_first = store.order(&ScopeId::steps("p1")).unwrap().to_vec();
        drag.drag_over(&mut store, &HoverTarget::Entity("s2".into()))
            .unwrap();
        assert_eq!(store.order(&ScopeId::steps("p1")).unwrap(), after_first);
    }

    #[test]
    fn cross_scope_hover_inserts_after_hovered() {
        let mut store = two_phase_store();
        let mut drag = DragCoordinator::new();
        drag.drag_start(&store, "s2").unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s4".into()))
            .unwrap();
        assert_eq!(
            store.order(&ScopeId::steps("p1")).unwrap(),
            ids(&["s1", "s3"])
        );
        assert_eq!(
            store.order(&ScopeId::steps("p2")).unwrap(),
            ids(&["s4", "s2"])
        );
    }

    #[test]
    fn hover_across_scope_kinds_is_ignored() {
        let payload: JourneyPayload = serde_json::from_str(
            r#"{"id": "j1", "phases": [{"id": "p1", "steps": [
                {"id": "s1", "cards": [{"id": "c1"}]},
                {"id": "s2"}
            ]}]}"#,
        )
        .unwrap();
        let mut store = OrderingStore::new();
        store.load_journey(&payload);

        let mut drag = DragCoordinator::new();
        drag.drag_start(&store, "s2").unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("c1".into()))
            .unwrap();
        assert_eq!(store.scope_of("s2"), Some(&ScopeId::steps("p1")));
    }

    #[test]
    fn empty_container_hover_appends() {
        let payload: JourneyPayload = serde_json::from_str(
            r#"{"id": "j1", "phases": [
                {"id": "p1", "sequence_order": 0, "steps": [{"id": "s1"}]},
                {"id": "p2", "sequence_order": 1, "steps": []}
            ]}"#,
        )
        .unwrap();
        let mut store = OrderingStore::new();
        store.load_journey(&payload);

        let mut drag = DragCoordinator::new();
        drag.drag_start(&store, "s1").unwrap();
        drag.drag_over(&mut store, &HoverTarget::Container(ScopeId::steps("p2")))
            .unwrap();
        assert_eq!(store.order(&ScopeId::steps("p2")).unwrap(), ids(&["s1"]));
    }

    #[test]
    fn cancel_after_multi_scope_chain_restores_baseline() {
        let mut store = two_phase_store();
        let mut drag = DragCoordinator::new();
        drag.drag_start(&store, "s2").unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s4".into()))
            .unwrap();
        // back into p1, then out again
        drag.drag_over(&mut store, &HoverTarget::Entity("s3".into()))
            .unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s4".into()))
            .unwrap();
        drag.drag_cancel(&mut store).unwrap();

        assert_eq!(
            store.order(&ScopeId::steps("p1")).unwrap(),
            ids(&["s1", "s2", "s3"])
        );
        assert_eq!(store.order(&ScopeId::steps("p2")).unwrap(), ids(&["s4"]));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn cancel_after_returning_to_origin_scope_restores_baseline() {
        let mut store = two_phase_store();
        let mut drag = DragCoordinator::new();
        drag.drag_start(&store, "s2").unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s4".into()))
            .unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s1".into()))
            .unwrap();
        drag.drag_cancel(&mut store).unwrap();

        assert_eq!(
            store.order(&ScopeId::steps("p1")).unwrap(),
            ids(&["s1", "s2", "s3"])
        );
        assert_eq!(store.order(&ScopeId::steps("p2")).unwrap(), ids(&["s4"]));
    }

    #[test]
    fn commit_without_movement_issues_nothing() {
        let mut store = two_phase_store();
        let mut drag = DragCoordinator::new();
        let mut scheduler = PersistScheduler::new(0);
        let mut sink = NullSink::default();

        drag.drag_start(&store, "s1").unwrap();
        drag.drag_end(&store, &mut scheduler, &mut sink, Instant::now())
            .unwrap();
        assert_eq!(scheduler.pending_count(), 0);
        assert!(sink.moves.is_empty());

        // reorder and drag back to the original position: still a no-op
        drag.drag_start(&store, "s1").unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s2".into()))
            .unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s2".into()))
            .unwrap();
        drag.drag_cancel(&mut store).unwrap();
        drag.drag_start(&store, "s1").unwrap();
        drag.drag_end(&store, &mut scheduler, &mut sink, Instant::now())
            .unwrap();
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn cross_scope_commit_moves_and_schedules_both_scopes() {
        let mut store = two_phase_store();
        let mut drag = DragCoordinator::new();
        let mut scheduler = PersistScheduler::new(0);
        let mut sink = NullSink::default();

        drag.drag_start(&store, "s2").unwrap();
        drag.drag_over(&mut store, &HoverTarget::Entity("s4".into()))
            .unwrap();
        drag.drag_end(&store, &mut scheduler, &mut sink, Instant::now())
            .unwrap();

        assert_eq!(sink.moves, vec![("s2".to_string(), "p2".to_string())]);
        assert_eq!(scheduler.pending_count(), 2);
    }

    #[test]
    fn second_drag_start_is_rejected_while_dragging() {
        let store = two_phase_store();
        let mut drag = DragCoordinator::new();
        drag.drag_start(&store, "s1").unwrap();
        assert!(matches!(
            drag.drag_start(&store, "s2"),
            Err(CanvasError::DragInProgress(_))
        ));
    }
}

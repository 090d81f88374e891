//! Derives the layout graph for a focus journey from the domain payload
//! and the store's current (possibly optimistic) orders. Re-run whenever
//! the store changes; child overview order follows the working step order,
//! so a drag in flight is reflected immediately.

use crate::layout::{
    Anchor, Direction, EdgeKind, LayoutEdge, LayoutInput, LayoutNode, NodeRole,
};
use crate::model::{EntityId, JourneyPayload, ScopeId};
use crate::store::OrderingStore;

/// The focus journey's steps in working order: phases in store order, then
/// each phase's steps in store order.
pub fn journey_step_order(store: &OrderingStore, journey_id: &str) -> Vec<EntityId> {
    let mut out = Vec::new();
    let Some(phases) = store.order(&ScopeId::phases(journey_id)) else {
        return out;
    };
    for phase_id in phases {
        if let Some(steps) = store.order(&ScopeId::steps(phase_id)) {
            out.extend(steps.iter().cloned());
        }
    }
    out
}

/// Build the node/edge graph for `focus_id`. The main node is pushed
/// before the next overview; dagre's same-rank tie-break keeps them in
/// that left-to-right order.
pub fn compose_graph(
    root: &JourneyPayload,
    focus_id: &str,
    store: &OrderingStore,
) -> LayoutInput {
    let focus = match root.find(focus_id) {
        Some(journey) => journey,
        None => {
            log::warn!("focus journey {focus_id} not in payload; falling back to root");
            root
        }
    };

    let mut input = LayoutInput {
        direction: Direction::TopDown,
        ..LayoutInput::default()
    };

    let parent = focus
        .parent_step_id
        .as_deref()
        .and_then(|anchor| root.journey_owning_step(anchor));
    if let Some(parent) = parent {
        input
            .nodes
            .push(LayoutNode::new(&parent.id, NodeRole::ParentOverview));
    }

    input.nodes.push(LayoutNode::new(&focus.id, NodeRole::Main));
    if let Some(parent) = parent {
        input.edges.push(LayoutEdge {
            id: format!("{}->{}", parent.id, focus.id),
            source: parent.id.clone(),
            source_anchor: Anchor::Bottom,
            target: focus.id.clone(),
            target_anchor: Anchor::Top,
            kind: EdgeKind::Structural,
        });
    }

    if let Some(parent) = parent {
        if let Some(next) = next_sibling(parent, focus) {
            input
                .nodes
                .push(LayoutNode::new(&next.id, NodeRole::NextOverview));
            input.edges.push(LayoutEdge {
                id: format!("{}->{}", parent.id, next.id),
                source: parent.id.clone(),
                source_anchor: Anchor::Bottom,
                target: next.id.clone(),
                target_anchor: Anchor::Top,
                kind: EdgeKind::Structural,
            });
            // navigation hint only; excluded from the layout pass
            input.edges.push(LayoutEdge {
                id: format!("{}~>{}", focus.id, next.id),
                source: focus.id.clone(),
                source_anchor: Anchor::Right,
                target: next.id.clone(),
                target_anchor: Anchor::Left,
                kind: EdgeKind::Visual,
            });
        }
    }

    for child in children_in_step_order(store, focus) {
        input
            .nodes
            .push(LayoutNode::new(&child.id, NodeRole::ChildOverview));
        input.edges.push(LayoutEdge {
            id: format!("{}->{}", focus.id, child.id),
            source: focus.id.clone(),
            source_anchor: Anchor::Bottom,
            target: child.id.clone(),
            target_anchor: Anchor::Top,
            kind: EdgeKind::Structural,
        });
    }

    input
}

/// The focus journey's sub-journeys ordered by their anchor step's
/// position in the current working order. Sub-journeys whose anchor is
/// unknown keep their payload order at the end.
fn children_in_step_order<'a>(
    store: &OrderingStore,
    focus: &'a JourneyPayload,
) -> Vec<&'a JourneyPayload> {
    let steps = journey_step_order(store, &focus.id);
    let anchor_rank = |journey: &JourneyPayload| {
        journey
            .parent_step_id
            .as_deref()
            .and_then(|anchor| steps.iter().position(|id| id == anchor))
            .unwrap_or(usize::MAX)
    };
    let mut children: Vec<(usize, usize, &JourneyPayload)> = focus
        .subjourneys
        .iter()
        .enumerate()
        .map(|(idx, child)| (anchor_rank(child), idx, child))
        .collect();
    children.sort_by_key(|(rank, idx, _)| (*rank, *idx));
    children.into_iter().map(|(_, _, child)| child).collect()
}

/// The sub-journey the user would reach by advancing one step in the
/// parent: the first sibling anchored after the focus journey's own
/// anchor step.
fn next_sibling<'a>(
    parent: &'a JourneyPayload,
    focus: &JourneyPayload,
) -> Option<&'a JourneyPayload> {
    let anchor = focus.parent_step_id.as_deref()?;
    // payload step order is fine here: the parent journey is not the one
    // being dragged while it is only an overview
    let mut steps: Vec<&str> = Vec::new();
    for phase in &parent.phases {
        for step in &phase.steps {
            steps.push(&step.id);
        }
    }
    let own_idx = steps.iter().position(|id| *id == anchor)?;
    for step_id in &steps[own_idx + 1..] {
        if let Some(sibling) = parent
            .subjourneys
            .iter()
            .find(|s| s.parent_step_id.as_deref() == Some(*step_id))
        {
            return Some(sibling);
        }
    }
    None
}

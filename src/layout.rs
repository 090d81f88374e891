//! Layered auto-layout for the sub-journey graph. Rank assignment,
//! same-rank ordering and coordinate assignment are delegated to dagre;
//! this module owns the input filtering, the two-pass sizing driven by the
//! measurement port, the overview recentering correction and the
//! fit-to-content step.

use crate::config::{FitConfig, LayoutConfig};
use crate::measure::{Measure, Size};
use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TopDown,
    LeftRight,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::TopDown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRole {
    /// The journey being edited.
    Main,
    /// Compact summary of the parent journey.
    ParentOverview,
    /// Compact summary of the journey reached by advancing one step in the
    /// parent.
    NextOverview,
    /// Compact summary of a sub-journey anchored to one of the main
    /// journey's steps.
    ChildOverview,
}

impl NodeRole {
    pub fn is_overview(self) -> bool {
        !matches!(self, NodeRole::Main)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Participates in rank assignment and positioning.
    Structural,
    /// Drawn only; must never influence the layout pass.
    Visual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub id: String,
    pub role: NodeRole,
    pub width: f32,
    pub height: f32,
    pub x: f32,
    pub y: f32,
    /// Whether width/height came from the measurement port rather than
    /// configured fallbacks.
    pub measured: bool,
}

impl LayoutNode {
    pub fn new(id: &str, role: NodeRole) -> Self {
        Self {
            id: id.to_string(),
            role,
            width: 0.0,
            height: 0.0,
            x: 0.0,
            y: 0.0,
            measured: false,
        }
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

#[derive(Debug, Clone)]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub source_anchor: Anchor,
    pub target: String,
    pub target_anchor: Anchor,
    pub kind: EdgeKind,
}

/// Graph handed to the layout pass. Node insertion order is significant:
/// dagre breaks same-rank ties left to right in the order nodes were
/// added, so the main node must be pushed before any next-overview node.
#[derive(Debug, Clone, Default)]
pub struct LayoutInput {
    pub direction: Direction,
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct CanvasLayout {
    pub nodes: BTreeMap<String, LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub width: f32,
    pub height: f32,
}

impl CanvasLayout {
    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.get(id)
    }

    fn main_node(&self) -> Option<&LayoutNode> {
        self.nodes.values().find(|n| n.role == NodeRole::Main)
    }

    pub fn has_overviews(&self) -> bool {
        self.nodes.values().any(|n| n.role.is_overview())
    }
}

/// First sizing pass: best-known sizes (measured when available, role
/// fallbacks otherwise), then the full dagre run.
pub fn solve_layout(
    input: &LayoutInput,
    measure: &dyn Measure,
    config: &LayoutConfig,
) -> CanvasLayout {
    let mut nodes: BTreeMap<String, LayoutNode> = BTreeMap::new();
    let mut node_ids: Vec<String> = Vec::with_capacity(input.nodes.len());
    for node in &input.nodes {
        let mut node = node.clone();
        match measure.measure(&node.id) {
            Some(size) => {
                node.width = size.width;
                node.height = size.height;
                node.measured = true;
            }
            None => {
                let (width, height) = fallback_size(node.role, config);
                node.width = width;
                node.height = height;
                node.measured = false;
            }
        }
        node_ids.push(node.id.clone());
        nodes.insert(node.id.clone(), node);
    }

    assign_positions_dagre(&node_ids, &input.edges, &mut nodes, input.direction, config);

    let mut layout = CanvasLayout {
        nodes,
        edges: input.edges.clone(),
        width: 0.0,
        height: 0.0,
    };
    update_bounds(&mut layout);
    layout
}

fn fallback_size(role: NodeRole, config: &LayoutConfig) -> (f32, f32) {
    if role.is_overview() {
        (config.overview_width, config.overview_height)
    } else {
        (config.fallback_node_width, config.fallback_node_height)
    }
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopDown => "tb",
        Direction::LeftRight => "lr",
    }
}

fn assign_positions_dagre(
    node_ids: &[String],
    edges: &[LayoutEdge],
    nodes: &mut BTreeMap<String, LayoutNode>,
    direction: Direction,
    config: &LayoutConfig,
) -> bool {
    if node_ids.is_empty() {
        return false;
    }

    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(false),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some(dagre_rankdir(direction).to_string());
    graph_config.nodesep = Some(config.node_spacing);
    graph_config.ranksep = Some(config.rank_spacing);
    graph_config.marginx = Some(config.margin_x);
    graph_config.marginy = Some(config.margin_y);
    dagre_graph.set_graph(graph_config);

    for (idx, node_id) in node_ids.iter().enumerate() {
        let Some(layout) = nodes.get(node_id) else {
            continue;
        };
        let mut node = DagreNode::default();
        node.width = layout.width;
        node.height = layout.height;
        // insertion index doubles as the same-rank tie-break hint so the
        // outcome never depends on map iteration order
        node.order = Some(idx);
        dagre_graph.set_node(node_id.clone(), Some(node));
    }

    let node_set: HashSet<&String> = node_ids.iter().collect();
    let mut edge_set: HashSet<(&String, &String)> = HashSet::new();
    for edge in edges {
        // purely visual connectors must not influence rank or position
        if edge.kind != EdgeKind::Structural {
            continue;
        }
        if !node_set.contains(&edge.source) || !node_set.contains(&edge.target) {
            continue;
        }
        if !edge_set.insert((&edge.source, &edge.target)) {
            continue;
        }
        let edge_label = DagreEdge::default();
        let _ = dagre_graph.set_edge(&edge.source, &edge.target, Some(edge_label), None);
    }

    dagre_layout::run_layout(&mut dagre_graph);

    let mut applied = false;
    for node_id in node_ids {
        let Some(dagre_node) = dagre_graph.node(node_id) else {
            continue;
        };
        if let Some(node) = nodes.get_mut(node_id) {
            node.x = dagre_node.x - node.width / 2.0;
            node.y = dagre_node.y - node.height / 2.0;
            applied = true;
        }
    }
    applied
}

/// Second sizing pass: re-read sizes from the measurement port and, when a
/// node changed by more than the configured epsilon, grow it around its
/// center and recenter the overview roles on the main node. Returns true
/// when anything changed materially; a false return means measurements
/// have stabilized.
pub fn apply_measurements(
    layout: &mut CanvasLayout,
    measure: &dyn Measure,
    config: &LayoutConfig,
) -> bool {
    let ids: Vec<String> = layout.nodes.keys().cloned().collect();
    let mut changed = false;
    for id in ids {
        let Some(size) = measure.measure(&id) else {
            continue;
        };
        let Some(node) = layout.nodes.get_mut(&id) else {
            continue;
        };
        let current = Size::new(node.width, node.height);
        if !size.differs_materially(current, config.remeasure_epsilon) {
            node.measured = true;
            continue;
        }
        // keep the center fixed while the box grows or shrinks
        node.x -= (size.width - node.width) / 2.0;
        node.y -= (size.height - node.height) / 2.0;
        node.width = size.width;
        node.height = size.height;
        node.measured = true;
        changed = true;
        log::debug!("remeasured {id}: {}x{}", size.width, size.height);
    }

    if changed {
        recenter_overviews(layout);
        update_bounds(layout);
    }
    changed
}

/// Coordinate-only correction after a size change: parent, next and child
/// overviews line up on the main node's vertical center instead of paying
/// for a full re-layout.
pub fn recenter_overviews(layout: &mut CanvasLayout) {
    let Some(main_center) = layout.main_node().map(LayoutNode::center_y) else {
        return;
    };
    for node in layout.nodes.values_mut() {
        if node.role.is_overview() {
            node.y = main_center - node.height / 2.0;
        }
    }
}

fn update_bounds(layout: &mut CanvasLayout) {
    let mut max_x: f32 = 0.0;
    let mut max_y: f32 = 0.0;
    for node in layout.nodes.values() {
        max_x = max_x.max(node.x + node.width);
        max_y = max_y.max(node.y + node.height);
    }
    layout.width = max_x;
    layout.height = max_y;
}

/// Pan/zoom transform the host applies to show the whole canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

/// Center the content in a viewport of the given pixel size. Padding is
/// wider when overview nodes are present.
pub fn fit_viewport(
    layout: &CanvasLayout,
    view_width: f32,
    view_height: f32,
    config: &FitConfig,
) -> Viewport {
    if layout.nodes.is_empty() {
        return Viewport {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        };
    }

    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for node in layout.nodes.values() {
        min_x = min_x.min(node.x);
        min_y = min_y.min(node.y);
        max_x = max_x.max(node.x + node.width);
        max_y = max_y.max(node.y + node.height);
    }

    let padding = if layout.has_overviews() {
        config.overview_padding
    } else {
        config.padding
    };
    let content_width = (max_x - min_x) + padding * 2.0;
    let content_height = (max_y - min_y) + padding * 2.0;
    let zoom = (view_width / content_width.max(1.0))
        .min(view_height / content_height.max(1.0))
        .clamp(config.min_zoom, config.max_zoom);

    let x = (view_width - (max_x - min_x) * zoom) / 2.0 - min_x * zoom;
    let y = (view_height - (max_y - min_y) * zoom) / 2.0 - min_y * zoom;
    Viewport { x, y, zoom }
}

//! Measurement port. Node dimensions are content-driven and only known
//! after the host has rendered them; layout asks this interface instead
//! of the renderer so the convergence logic stays testable.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether the difference to `other` exceeds `epsilon` on either axis.
    pub fn differs_materially(self, other: Size, epsilon: f32) -> bool {
        (self.width - other.width).abs() > epsilon || (self.height - other.height).abs() > epsilon
    }
}

/// Reports a rendered node's actual pixel size. Must be cheap; it is polled
/// across animation frames while measurements settle.
pub trait Measure {
    fn measure(&self, node_id: &str) -> Option<Size>;
}

/// Table-backed measurer for tests and headless layout runs.
#[derive(Debug, Clone, Default)]
pub struct StaticMeasure {
    sizes: HashMap<String, Size>,
}

impl StaticMeasure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, node_id: &str, size: Size) {
        self.sizes.insert(node_id.to_string(), size);
    }

    pub fn clear(&mut self, node_id: &str) {
        self.sizes.remove(node_id);
    }
}

impl Measure for StaticMeasure {
    fn measure(&self, node_id: &str) -> Option<Size> {
        self.sizes.get(node_id).copied()
    }
}

/// Measurement source for hosts that have not rendered anything yet.
/// Layout falls back to configured dimensions for every node.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmeasured;

impl Measure for Unmeasured {
    fn measure(&self, _node_id: &str) -> Option<Size> {
        None
    }
}

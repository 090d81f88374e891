use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Gap between nodes in the same rank.
    pub node_spacing: f32,
    /// Gap between ranks.
    pub rank_spacing: f32,
    pub margin_x: f32,
    pub margin_y: f32,
    /// Dimensions used until the host has rendered and measured a node.
    pub fallback_node_width: f32,
    pub fallback_node_height: f32,
    /// Fallback dimensions for compact overview nodes.
    pub overview_width: f32,
    pub overview_height: f32,
    /// How many post-render measurement passes to attempt before settling
    /// for the best values available.
    pub remeasure_attempts: u32,
    /// Size deltas at or below this many pixels are not worth a correction.
    pub remeasure_epsilon: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 48.0,
            rank_spacing: 96.0,
            margin_x: 8.0,
            margin_y: 8.0,
            fallback_node_width: 280.0,
            fallback_node_height: 160.0,
            overview_width: 180.0,
            overview_height: 96.0,
            remeasure_attempts: 5,
            remeasure_epsilon: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DragConfig {
    /// Window within which repeated persistence requests for one scope
    /// coalesce into a single call.
    pub persist_debounce_ms: u64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            persist_debounce_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FitConfig {
    pub padding: f32,
    /// Wider padding when overview nodes are on the canvas, so the summary
    /// ring has breathing room.
    pub overview_padding: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            padding: 40.0,
            overview_padding: 96.0,
            min_zoom: 0.1,
            max_zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    pub layout: LayoutConfig,
    pub drag: DragConfig,
    pub fit: FitConfig,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<CanvasConfig> {
    let Some(path) = path else {
        return Ok(CanvasConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let parsed: CanvasConfig = serde_json::from_str(&contents)?;
    Ok(parsed)
}

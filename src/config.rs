//! Diagram configuration. Values are built once and passed by reference.
//!
//! Every struct deserializes with `#[serde(default)]`, so a JSON file only
//! needs the keys it overrides.

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::color::{ColorScale, Scheme, gapped_color};
use crate::model::NodeKind;

/// Padding around the drawing area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddings {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Paddings {
    pub const fn uniform_vertical(vertical: f32, horizontal: f32) -> Self {
        Self {
            top: vertical,
            bottom: vertical,
            left: horizontal,
            right: horizontal,
        }
    }
}

/// Edge styling shared by both diagrams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeStyle {
    pub opacity: f32,
    pub init_color: [u8; 3],
    pub hover_color: [u8; 3],
    pub stroke_width: f32,
}

impl EdgeStyle {
    fn with_stroke(stroke_width: f32) -> Self {
        Self {
            opacity: 0.8,
            init_color: [230, 230, 230],
            hover_color: [130, 130, 130],
            stroke_width,
        }
    }

    pub fn init_color32(&self) -> Color32 {
        rgb_with_opacity(self.init_color, self.opacity)
    }

    pub fn hover_color32(&self) -> Color32 {
        rgb_with_opacity(self.hover_color, self.opacity)
    }

    /// Resting color of an edge. Falls back to the init color when `range`
    /// carries no spread to color by.
    pub fn weight_color32<S>(&self, scale: &S, range: f32, weight: f32, gap: f32) -> Color32
    where
        S: ColorScale + ?Sized,
    {
        if range > 0.0 && range.is_finite() {
            gapped_color(scale, range, weight, gap).gamma_multiply(self.opacity)
        } else {
            self.init_color32()
        }
    }
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self::with_stroke(0.7)
    }
}

fn rgb_with_opacity([r, g, b]: [u8; 3], opacity: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(r, g, b, (opacity.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Which color scheme paints which layer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerColorScales {
    pub input: Scheme,
    pub conv: Scheme,
    pub relu: Scheme,
    pub pool: Scheme,
    pub fc: Scheme,
    pub embedding: Scheme,
    pub lstm: Scheme,
    pub dense: Scheme,
    pub weight: Scheme,
    pub logit: Scheme,
}

impl LayerColorScales {
    pub fn for_kind(&self, kind: &NodeKind) -> Scheme {
        match kind {
            NodeKind::Input => self.input,
            NodeKind::Conv => self.conv,
            NodeKind::Relu => self.relu,
            NodeKind::Pool => self.pool,
            NodeKind::Fc => self.fc,
            NodeKind::Embedding => self.embedding,
            NodeKind::Lstm => self.lstm,
            NodeKind::Dense => self.dense,
            NodeKind::Other => self.logit,
        }
    }
}

impl Default for LayerColorScales {
    fn default() -> Self {
        Self {
            input: Scheme::Greys,
            conv: Scheme::RdBu,
            relu: Scheme::RdBu,
            pool: Scheme::RdBu,
            fc: Scheme::Greys,
            embedding: Scheme::RdBu,
            lstm: Scheme::RdBu,
            dense: Scheme::Greys,
            weight: Scheme::BrBG,
            logit: Scheme::Oranges,
        }
    }
}

/// Convolutional diagram: every node is a `node_length` square.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CnnConfig {
    pub node_length: f32,
    pub plus_symbol_radius: f32,
    pub num_layers: usize,
    pub edge: EdgeStyle,
    pub layer_color_scales: LayerColorScales,
    pub svg_paddings: Paddings,
    pub kernel_rect_length: f32,
    pub gap_ratio: f32,
    pub overlay_rect_offset: f32,
    pub class_lists: Vec<String>,
}

impl Default for CnnConfig {
    fn default() -> Self {
        let node_length = 40.0;
        Self {
            node_length,
            plus_symbol_radius: node_length / 5.0,
            num_layers: 12,
            edge: EdgeStyle::with_stroke(0.7),
            layer_color_scales: LayerColorScales::default(),
            svg_paddings: Paddings::uniform_vertical(25.0, 50.0),
            kernel_rect_length: 8.0 / 3.0,
            gap_ratio: 4.0,
            overlay_rect_offset: 12.0,
            class_lists: [
                "lifeboat",
                "ladybug",
                "pizza",
                "bell pepper",
                "school bus",
                "koala",
                "espresso",
                "red panda",
                "orange",
                "sport car",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Recurrent diagram: nodes are wide bars, embeddings wider still, and the
/// first two columns are thinner than the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RnnConfig {
    pub node_length: f32,
    pub node_height: f32,
    pub embedding_length: f32,
    pub input_node_height: f32,
    pub plus_symbol_radius: f32,
    pub num_layers: usize,
    pub edge: EdgeStyle,
    pub layer_color_scales: LayerColorScales,
    pub svg_paddings: Paddings,
    pub kernel_rect_length: f32,
    pub gap_ratio: f32,
    pub overlay_rect_offset: f32,
    pub class_lists: Vec<String>,
}

impl Default for RnnConfig {
    fn default() -> Self {
        let node_length = 96.0;
        Self {
            node_length,
            node_height: node_length / 10.0,
            embedding_length: node_length / 20.0 * 64.0,
            input_node_height: node_length / 20.0,
            plus_symbol_radius: node_length / 10.0,
            num_layers: 4,
            edge: EdgeStyle::with_stroke(0.4),
            layer_color_scales: LayerColorScales::default(),
            svg_paddings: Paddings::uniform_vertical(25.0, 25.0),
            kernel_rect_length: 8.0 / 3.0,
            gap_ratio: 4.0,
            overlay_rect_offset: 12.0,
            class_lists: vec!["Hate".to_string(), "Love".to_string()],
        }
    }
}

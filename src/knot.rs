//! Knots: the points on a node's boundary where edges attach.
//!
//! Edges leave a node on its right side and enter on its left. The two
//! diagrams differ only in node geometry, captured by [`DiagramVariant`].

use crate::config::{CnnConfig, RnnConfig};
use crate::model::{Node, Point};

/// What the link builder does when a link names a node the previous layer
/// does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSource {
    /// Abort the pass with `LinkError::IndexOutOfRange`.
    Fail,
    /// Drop the link and keep going.
    Skip,
}

/// Offsets from a node's top-left corner to its output knot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnotDelta {
    pub dx: f32,
    pub dy: f32,
}

pub trait DiagramVariant {
    const MISSING_SOURCE: MissingSource;

    fn node_width(&self, node: &Node) -> f32;

    /// Height of the nodes in `layer_index` when they act as edge sources.
    fn node_height(&self, layer_index: usize) -> f32;

    /// Vertical offset of the input knot for nodes of `layer_index` in a
    /// diagram with `layer_count` columns.
    fn input_delta_y(&self, layer_index: usize, layer_count: usize) -> f32;

    /// Offsets of the output knot of `source`, which sits in the layer right
    /// before `target_layer`.
    fn output_delta(&self, source: &Node, target_layer: usize) -> KnotDelta {
        KnotDelta {
            dx: self.node_width(source),
            dy: self.node_height(target_layer - 1) / 2.0,
        }
    }

    fn output_knot(&self, point: Point, delta: KnotDelta) -> Point {
        point.offset(delta.dx, delta.dy)
    }

    fn input_knot(&self, point: Point, delta_y: f32) -> Point {
        point.offset(0.0, delta_y)
    }
}

/// Convolutional diagram: square nodes of one size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CnnDiagram {
    pub node_length: f32,
}

impl CnnDiagram {
    pub fn new(config: &CnnConfig) -> Self {
        Self {
            node_length: config.node_length,
        }
    }
}

impl DiagramVariant for CnnDiagram {
    const MISSING_SOURCE: MissingSource = MissingSource::Fail;

    fn node_width(&self, _node: &Node) -> f32 {
        self.node_length
    }

    fn node_height(&self, _layer_index: usize) -> f32 {
        self.node_length
    }

    fn input_delta_y(&self, _layer_index: usize, _layer_count: usize) -> f32 {
        self.node_length / 2.0
    }
}

/// Recurrent diagram: bars whose width depends on the node kind and whose
/// height depends on the column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RnnDiagram {
    pub node_length: f32,
    pub node_height: f32,
    pub input_node_height: f32,
    pub embedding_length: f32,
}

impl RnnDiagram {
    pub fn new(config: &RnnConfig) -> Self {
        Self {
            node_length: config.node_length,
            node_height: config.node_height,
            input_node_height: config.input_node_height,
            embedding_length: config.embedding_length,
        }
    }

    /// The output block is taller than the hidden bars, so its knot sits
    /// lower.
    pub fn output_layer_delta_y(&self) -> f32 {
        self.node_length * 5.0 / 8.0
    }
}

impl DiagramVariant for RnnDiagram {
    const MISSING_SOURCE: MissingSource = MissingSource::Skip;

    fn node_width(&self, node: &Node) -> f32 {
        if node.is_embedding() {
            self.embedding_length
        } else {
            self.node_length
        }
    }

    fn node_height(&self, layer_index: usize) -> f32 {
        if layer_index == 0 {
            self.input_node_height
        } else {
            self.node_height
        }
    }

    fn input_delta_y(&self, layer_index: usize, layer_count: usize) -> f32 {
        if layer_index + 1 == layer_count {
            self.output_layer_delta_y()
        } else if layer_index == 1 {
            self.input_node_height / 2.0
        } else {
            self.node_height / 2.0
        }
    }
}

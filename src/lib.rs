//! Layout and link geometry for layered diagrams of convolutional and
//! recurrent networks.
//!
//! The caller positions nodes; this crate works out where edges attach,
//! which input links become edges, and how values map to colors.

pub mod color;
pub mod config;
pub mod error;
pub mod extent;
pub mod knot;
pub mod links;
pub mod model;

pub use color::{ColorScale, GAP_NONE, Scheme, gapped_color, gapped_color_default, gapped_position};
pub use config::{CnnConfig, EdgeStyle, LayerColorScales, Paddings, RnnConfig};
pub use error::{ExtentError, ExtentResult, LinkError, LinkResult};
pub use extent::{Extent, extent, extent_of_links};
pub use knot::{CnnDiagram, DiagramVariant, KnotDelta, MissingSource, RnnDiagram};
pub use links::{build_cnn_links, build_links, build_rnn_links};
pub use model::{
    Edge, InputLink, Layer, LinkSource, Network, Node, NodeCoordinates, NodeKind, Point, Tensor,
};

//! Network description consumed by the link builder, and the edges it emits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExtentError, ExtentResult};

/// A pixel position. Node coordinates are top-left corners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Activation or weight values of a node.
///
/// Deserializes from a bare number, an array of numbers or an array of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tensor {
    Scalar(f32),
    Vector(Vec<f32>),
    Matrix(Vec<Vec<f32>>),
}

impl Tensor {
    /// Classify an arbitrary JSON value, rejecting anything deeper than two
    /// dimensions or containing non-numeric cells.
    pub fn from_json(value: &Value) -> ExtentResult<Self> {
        match value {
            Value::Number(_) => Ok(Tensor::Scalar(json_number(value)?)),
            Value::Array(items) => {
                if items.iter().all(Value::is_number) {
                    let cells = items.iter().map(json_number).collect::<ExtentResult<_>>()?;
                    return Ok(Tensor::Vector(cells));
                }
                let rows = items
                    .iter()
                    .map(|row| match row {
                        Value::Array(cells) => {
                            cells.iter().map(json_number).collect::<ExtentResult<Vec<f32>>>()
                        }
                        other => Err(ExtentError::ShapeMismatch {
                            reason: format!("expected a row of numbers, found {other}"),
                        }),
                    })
                    .collect::<ExtentResult<Vec<_>>>()?;
                Ok(Tensor::Matrix(rows))
            }
            other => Err(ExtentError::ShapeMismatch {
                reason: format!("expected a number or an array, found {other}"),
            }),
        }
    }

    /// Leading length of the tensor: the feature-map side length for a
    /// convolutional node. A scalar counts as a 1x1 map.
    pub fn side_length(&self) -> usize {
        match self {
            Tensor::Scalar(_) => 1,
            Tensor::Vector(cells) => cells.len(),
            Tensor::Matrix(rows) => rows.len(),
        }
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor::Vector(Vec::new())
    }
}

fn json_number(value: &Value) -> ExtentResult<f32> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| ExtentError::ShapeMismatch {
            reason: format!("expected a number, found {value}"),
        })
}

/// Node kinds the diagrams distinguish. Only `Embedding` changes geometry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Input,
    Conv,
    Relu,
    Pool,
    Fc,
    Embedding,
    Lstm,
    Dense,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSource {
    pub index: usize,
}

/// A weighted connection into a node. `source.index` is a flattened index
/// into the previous layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputLink {
    pub source: LinkSource,
    pub weight: f32,
}

impl InputLink {
    pub fn new(source_index: usize, weight: f32) -> Self {
        Self {
            source: LinkSource {
                index: source_index,
            },
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub layer_name: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub output: Tensor,
    #[serde(default)]
    pub input_links: Vec<InputLink>,
}

impl Node {
    pub const OUTPUT_LAYER: &'static str = "output";

    pub fn is_output(&self) -> bool {
        self.layer_name == Self::OUTPUT_LAYER
    }

    pub fn is_embedding(&self) -> bool {
        self.kind == NodeKind::Embedding
    }
}

pub type Layer = Vec<Node>;

/// Diagram columns, input layer first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn node(&self, layer: usize, node: usize) -> Option<&Node> {
        self.layers.get(layer).and_then(|l| l.get(node))
    }
}

/// Top-left pixel position of every node, indexed like [`Network`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeCoordinates {
    pub layers: Vec<Vec<Point>>,
}

impl NodeCoordinates {
    pub fn new(layers: Vec<Vec<Point>>) -> Self {
        Self { layers }
    }

    pub fn get(&self, layer: usize, node: usize) -> Option<Point> {
        self.layers.get(layer).and_then(|l| l.get(node)).copied()
    }
}

/// A rendered connection between two knots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: Point,
    pub target: Point,
    pub weight: f32,
    pub target_layer_index: usize,
    pub target_node_index: usize,
    pub source_node_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tensor_deserializes_by_shape() {
        let scalar: Tensor = serde_json::from_value(json!(1.5)).unwrap();
        let vector: Tensor = serde_json::from_value(json!([1.0, 2.0])).unwrap();
        let matrix: Tensor = serde_json::from_value(json!([[1.0], [2.0]])).unwrap();
        assert_eq!(scalar, Tensor::Scalar(1.5));
        assert_eq!(vector, Tensor::Vector(vec![1.0, 2.0]));
        assert_eq!(matrix, Tensor::Matrix(vec![vec![1.0], vec![2.0]]));
    }

    #[test]
    fn from_json_rejects_deep_nesting() {
        let err = Tensor::from_json(&json!([[[1.0]]])).unwrap_err();
        assert!(matches!(err, ExtentError::ShapeMismatch { .. }));
        assert!(Tensor::from_json(&json!("x")).is_err());
        assert_eq!(
            Tensor::from_json(&json!([[1, 2], [3, 4]])).unwrap(),
            Tensor::Matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]])
        );
    }

    #[test]
    fn node_reads_type_and_links() {
        let node: Node = serde_json::from_value(json!({
            "layerName": "output",
            "type": "fc",
            "output": 0.3,
            "inputLinks": [{ "source": { "index": 4 }, "weight": -0.5 }]
        }))
        .unwrap();
        assert!(node.is_output());
        assert_eq!(node.kind, NodeKind::Fc);
        assert_eq!(node.input_links, vec![InputLink::new(4, -0.5)]);

        let unknown: Node = serde_json::from_value(json!({ "type": "gru" })).unwrap();
        assert_eq!(unknown.kind, NodeKind::Other);
        assert!(!unknown.is_output());
    }

    #[test]
    fn side_length_uses_leading_dimension() {
        assert_eq!(Tensor::Matrix(vec![vec![0.0; 3]; 3]).side_length(), 3);
        assert_eq!(Tensor::Vector(vec![0.0; 5]).side_length(), 5);
        assert_eq!(Tensor::Scalar(2.0).side_length(), 1);
    }
}

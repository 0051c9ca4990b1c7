//! Rebuilds the drawn edges from each node's input links.
//!
//! Links into the output layer index the flattened output of the previous
//! layer. The diagram draws one edge per source node, so only the first
//! scalar of each feature map is kept and its index is mapped back to the
//! node it came from.

use log::{debug, trace};

use crate::config::{CnnConfig, RnnConfig};
use crate::error::{LinkError, LinkResult};
use crate::knot::{CnnDiagram, DiagramVariant, MissingSource, RnnDiagram};
use crate::model::{Edge, InputLink, Network, Node, NodeCoordinates, Point};

/// Build every edge of the diagram, layer by layer, then node by node, then
/// link by link. Later edges are drawn on top of earlier ones.
pub fn build_links<V: DiagramVariant>(
    variant: &V,
    coordinates: &NodeCoordinates,
    network: &Network,
) -> LinkResult<Vec<Edge>> {
    let layer_count = network.len();
    let mut edges = Vec::new();
    let mut skipped = 0usize;

    for l in 1..layer_count {
        let previous = &network.layers[l - 1];
        for (n, node) in network.layers[l].iter().enumerate() {
            let target_point = coordinate(coordinates, l, n)?;
            let target = variant.input_knot(target_point, variant.input_delta_y(l, layer_count));

            for link in &node.input_links {
                let Some(source_index) = resolve_source::<V>(node, link, previous, l)? else {
                    skipped += 1;
                    continue;
                };
                let Some(source_node) = previous.get(source_index) else {
                    match V::MISSING_SOURCE {
                        MissingSource::Fail => {
                            return Err(LinkError::IndexOutOfRange {
                                layer: l - 1,
                                index: source_index,
                                len: previous.len(),
                            });
                        }
                        MissingSource::Skip => {
                            trace!(
                                "layer {l} node {n}: no source node {source_index}, link dropped"
                            );
                            skipped += 1;
                            continue;
                        }
                    }
                };
                let source_point = coordinate(coordinates, l - 1, source_index)?;
                let delta = variant.output_delta(source_node, l);
                let source = variant.output_knot(source_point, delta);

                edges.push(Edge {
                    source,
                    target,
                    weight: link.weight,
                    target_layer_index: l,
                    target_node_index: n,
                    source_node_index: source_index,
                });
            }
        }
    }

    debug!(
        "built {} edges across {} layers ({skipped} links not drawn)",
        edges.len(),
        layer_count
    );
    Ok(edges)
}

pub fn build_cnn_links(
    config: &CnnConfig,
    coordinates: &NodeCoordinates,
    network: &Network,
) -> LinkResult<Vec<Edge>> {
    build_links(&CnnDiagram::new(config), coordinates, network)
}

pub fn build_rnn_links(
    config: &RnnConfig,
    coordinates: &NodeCoordinates,
    network: &Network,
) -> LinkResult<Vec<Edge>> {
    build_links(&RnnDiagram::new(config), coordinates, network)
}

/// Index of the source node for `link`, or `None` when the link is not drawn.
fn resolve_source<V: DiagramVariant>(
    node: &Node,
    link: &InputLink,
    previous: &[Node],
    layer: usize,
) -> LinkResult<Option<usize>> {
    let index = link.source.index;
    if !node.is_output() {
        return Ok(Some(index));
    }

    // Every node of the previous layer is assumed to share node 0's square map.
    let Some(first) = previous.first() else {
        return match V::MISSING_SOURCE {
            MissingSource::Fail => Err(LinkError::IndexOutOfRange {
                layer: layer - 1,
                index: 0,
                len: 0,
            }),
            MissingSource::Skip => Ok(None),
        };
    };
    let side = first.output.side_length();
    let flatten_dimension = side * side;
    // An empty map has no first scalar to keep.
    if flatten_dimension == 0 || index % flatten_dimension != 0 {
        return Ok(None);
    }
    Ok(Some(index / flatten_dimension))
}

fn coordinate(coordinates: &NodeCoordinates, layer: usize, node: usize) -> LinkResult<Point> {
    coordinates
        .get(layer, node)
        .ok_or(LinkError::MissingCoordinate { layer, node })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, Tensor};

    fn node(layer_name: &str, kind: NodeKind, side: usize, links: &[(usize, f32)]) -> Node {
        Node {
            layer_name: layer_name.to_string(),
            kind,
            output: Tensor::Matrix(vec![vec![0.0; side]; side]),
            input_links: links.iter().map(|&(i, w)| InputLink::new(i, w)).collect(),
        }
    }

    /// Lay nodes out in columns 100px apart, 50px between rows.
    fn grid(network: &Network) -> NodeCoordinates {
        NodeCoordinates::new(
            network
                .layers
                .iter()
                .enumerate()
                .map(|(l, layer)| {
                    (0..layer.len())
                        .map(|n| Point::new(l as f32 * 100.0, n as f32 * 50.0))
                        .collect()
                })
                .collect(),
        )
    }

    /// input -> two 2x2 conv nodes -> one output node fed by 8 flattened links
    fn small_cnn() -> Network {
        let input = vec![node("input", NodeKind::Input, 4, &[])];
        let conv = vec![
            node("conv_1_1", NodeKind::Conv, 2, &[(0, 0.5)]),
            node("conv_1_1", NodeKind::Conv, 2, &[(0, -0.5)]),
        ];
        let links: Vec<(usize, f32)> = (0..8).map(|i| (i, i as f32 / 10.0)).collect();
        let output = vec![node("output", NodeKind::Fc, 1, &links)];
        Network::new(vec![input, conv, output])
    }

    #[test]
    fn cnn_output_layer_collapses_flattened_links() {
        let network = small_cnn();
        let edges = build_cnn_links(&CnnConfig::default(), &grid(&network), &network).unwrap();

        let output_edges: Vec<_> = edges.iter().filter(|e| e.target_layer_index == 2).collect();
        assert_eq!(output_edges.len(), 2);
        assert_eq!(output_edges[0].source_node_index, 0);
        assert_eq!(output_edges[1].source_node_index, 1);
        assert_eq!(output_edges[1].weight, 0.4);
        assert!(output_edges.iter().all(|e| e.target_node_index == 0));
    }

    #[test]
    fn cnn_edges_carry_knots_in_generation_order() {
        let network = small_cnn();
        let edges = build_cnn_links(&CnnConfig::default(), &grid(&network), &network).unwrap();
        assert_eq!(edges.len(), 4);

        let first = edges[0];
        assert_eq!(first.source, Point::new(40.0, 20.0));
        assert_eq!(first.target, Point::new(100.0, 20.0));
        assert_eq!((first.target_layer_index, first.target_node_index), (1, 0));

        let second = edges[1];
        assert_eq!(second.target, Point::new(100.0, 70.0));
        assert_eq!(second.weight, -0.5);

        // second conv node's output knot
        assert_eq!(edges[3].source, Point::new(140.0, 70.0));
        assert_eq!(edges[3].target, Point::new(200.0, 20.0));
    }

    #[test]
    fn cnn_non_output_layers_keep_every_link() {
        let input: Vec<_> = (0..3).map(|_| node("input", NodeKind::Input, 4, &[])).collect();
        let conv: Vec<_> = (0..2)
            .map(|_| node("conv_1_1", NodeKind::Conv, 2, &[(0, 0.1), (1, 0.2), (2, 0.3)]))
            .collect();
        let network = Network::new(vec![input, conv]);
        let edges = build_cnn_links(&CnnConfig::default(), &grid(&network), &network).unwrap();
        assert_eq!(edges.len(), 6);
    }

    #[test]
    fn cnn_missing_source_is_fatal() {
        let input = vec![node("input", NodeKind::Input, 4, &[])];
        let conv = vec![node("conv_1_1", NodeKind::Conv, 2, &[(0, 0.1), (3, 0.2)])];
        let network = Network::new(vec![input, conv]);
        let err = build_cnn_links(&CnnConfig::default(), &grid(&network), &network).unwrap_err();
        assert_eq!(
            err,
            LinkError::IndexOutOfRange {
                layer: 0,
                index: 3,
                len: 1
            }
        );
    }

    #[test]
    fn rnn_missing_source_is_dropped() {
        let input = vec![node("input", NodeKind::Input, 1, &[])];
        let hidden = vec![node("lstm", NodeKind::Lstm, 1, &[(0, 0.1), (3, 0.2), (0, 0.3)])];
        let network = Network::new(vec![input, hidden]);
        let edges = build_rnn_links(&RnnConfig::default(), &grid(&network), &network).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].weight, 0.3);
    }

    #[test]
    fn rnn_embedding_source_is_wide() {
        let config = RnnConfig::default();
        let input = vec![node("input", NodeKind::Input, 1, &[])];
        let embedding = vec![node("embedding", NodeKind::Embedding, 1, &[(0, 0.1)])];
        let lstm = vec![node("lstm", NodeKind::Lstm, 1, &[(0, 0.2)])];
        let output = vec![node("output", NodeKind::Dense, 1, &[(0, 0.3)])];
        let network = Network::new(vec![input, embedding, lstm, output]);
        let edges = build_rnn_links(&config, &grid(&network), &network).unwrap();
        assert_eq!(edges.len(), 3);

        // input -> embedding: thin input bars on both ends
        assert_eq!(edges[0].source, Point::new(96.0, 2.4));
        assert_eq!(edges[0].target, Point::new(100.0, 2.4));
        // embedding -> lstm: wide source
        assert!((edges[1].source.x - (100.0 + config.embedding_length)).abs() < 1e-3);
        assert_eq!(edges[1].source.y, 4.8);
        assert_eq!(edges[1].target, Point::new(200.0, 4.8));
        // lstm -> output: taller output block
        assert_eq!(edges[2].source, Point::new(296.0, 4.8));
        assert_eq!(edges[2].target, Point::new(300.0, 60.0));
    }

    #[test]
    fn rnn_output_layer_with_empty_previous_layer_draws_nothing() {
        let input: Vec<Node> = Vec::new();
        let output = vec![node("output", NodeKind::Dense, 1, &[(0, 0.3)])];
        let network = Network::new(vec![input, output]);
        let edges = build_rnn_links(&RnnConfig::default(), &grid(&network), &network).unwrap();
        assert!(edges.is_empty());
    }

    #[test]
    fn rnn_empty_feature_map_drops_only_output_links() {
        let input = vec![node("input", NodeKind::Input, 1, &[])];
        // no recorded activations: the default empty output
        let lstm = vec![Node {
            layer_name: "lstm".to_string(),
            kind: NodeKind::Lstm,
            input_links: vec![InputLink::new(0, 0.2)],
            ..Node::default()
        }];
        let output = vec![node("output", NodeKind::Dense, 1, &[(0, 0.3)])];
        let network = Network::new(vec![input, lstm, output]);
        let edges = build_rnn_links(&RnnConfig::default(), &grid(&network), &network).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target_layer_index, 1);
        assert_eq!(edges[0].weight, 0.2);
    }

    #[test]
    fn cnn_empty_feature_map_draws_no_output_edges() {
        let input = vec![node("input", NodeKind::Input, 0, &[])];
        let output = vec![node("output", NodeKind::Fc, 1, &[(0, 0.3), (1, 0.4)])];
        let network = Network::new(vec![input, output]);
        let edges = build_cnn_links(&CnnConfig::default(), &grid(&network), &network).unwrap();
        assert!(edges.is_empty());
    }

    #[test]
    fn rnn_output_layer_collapses_flattened_links() {
        let input = vec![node("input", NodeKind::Input, 1, &[])];
        let hidden = vec![
            node("lstm", NodeKind::Lstm, 2, &[(0, 0.1)]),
            node("lstm", NodeKind::Lstm, 2, &[(0, 0.2)]),
        ];
        let links: Vec<(usize, f32)> = (0..8).map(|i| (i, i as f32 / 10.0)).collect();
        let output = vec![node("output", NodeKind::Dense, 1, &links)];
        let network = Network::new(vec![input, hidden, output]);
        let edges = build_rnn_links(&RnnConfig::default(), &grid(&network), &network).unwrap();

        let output_edges: Vec<_> = edges.iter().filter(|e| e.target_layer_index == 2).collect();
        assert_eq!(output_edges.len(), 2);
        assert_eq!(output_edges[0].source_node_index, 0);
        assert_eq!(output_edges[0].weight, 0.0);
        assert_eq!(output_edges[1].source_node_index, 1);
        assert_eq!(output_edges[1].weight, 0.4);
        // second lstm bar's output knot
        assert_eq!(output_edges[1].source.x, 196.0);
        assert!((output_edges[1].source.y - 54.8).abs() < 1e-4);
    }

    #[test]
    fn empty_layers_and_missing_coordinates() {
        let network = Network::new(vec![vec![node("input", NodeKind::Input, 1, &[])], vec![]]);
        let edges = build_cnn_links(&CnnConfig::default(), &grid(&network), &network).unwrap();
        assert!(edges.is_empty());

        let network = small_cnn();
        let mut coordinates = grid(&network);
        coordinates.layers[1].pop();
        let err = build_cnn_links(&CnnConfig::default(), &coordinates, &network).unwrap_err();
        assert_eq!(err, LinkError::MissingCoordinate { layer: 1, node: 1 });
    }

    #[test]
    fn repeated_builds_are_identical() {
        let network = small_cnn();
        let coordinates = grid(&network);
        let config = CnnConfig::default();
        assert_eq!(
            build_cnn_links(&config, &coordinates, &network).unwrap(),
            build_cnn_links(&config, &coordinates, &network).unwrap()
        );
    }
}

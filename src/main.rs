use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use eframe::egui;
use log::{error, info};
use netlinks::{
    CnnConfig, DiagramVariant, Edge, EdgeStyle, Extent, InputLink, LayerColorScales,
    LinkResult, Network, Node, NodeCoordinates, NodeKind, Paddings, Point, RnnConfig, RnnDiagram,
    Tensor, build_cnn_links, build_rnn_links, extent, gapped_color,
};
use serde::de::DeserializeOwned;

/// Scale inset for edges and nodes so small values stay visible.
const COLOR_GAP: f32 = 0.1;

#[derive(Parser, Debug)]
#[command(author, version, about = "Layered network diagram viewer", long_about = None)]
struct Args {
    /// Network description (JSON). A random demo network is used when omitted.
    #[arg(long)]
    network: Option<PathBuf>,

    /// Diagram configuration (JSON); missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Variant::Cnn)]
    variant: Variant,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Print the edge list as JSON and exit
    #[arg(long)]
    dump_edges: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Variant {
    Cnn,
    Rnn,
}

enum Diagram {
    Cnn(CnnConfig),
    Rnn(RnnConfig),
}

impl Diagram {
    fn load(variant: Variant, path: Option<&Path>) -> Result<Self> {
        Ok(match variant {
            Variant::Cnn => Diagram::Cnn(read_json_or_default(path)?),
            Variant::Rnn => Diagram::Rnn(read_json_or_default(path)?),
        })
    }

    fn node_length(&self) -> f32 {
        match self {
            Diagram::Cnn(c) => c.node_length,
            Diagram::Rnn(c) => c.node_length,
        }
    }

    fn gap_ratio(&self) -> f32 {
        match self {
            Diagram::Cnn(c) => c.gap_ratio,
            Diagram::Rnn(c) => c.gap_ratio,
        }
    }

    fn paddings(&self) -> Paddings {
        match self {
            Diagram::Cnn(c) => c.svg_paddings,
            Diagram::Rnn(c) => c.svg_paddings,
        }
    }

    fn edge_style(&self) -> &EdgeStyle {
        match self {
            Diagram::Cnn(c) => &c.edge,
            Diagram::Rnn(c) => &c.edge,
        }
    }

    fn color_scales(&self) -> &LayerColorScales {
        match self {
            Diagram::Cnn(c) => &c.layer_color_scales,
            Diagram::Rnn(c) => &c.layer_color_scales,
        }
    }

    fn class_lists(&self) -> &[String] {
        match self {
            Diagram::Cnn(c) => &c.class_lists,
            Diagram::Rnn(c) => &c.class_lists,
        }
    }

    /// Drawn size of `node` in column `layer` of a `layer_count` column diagram.
    fn node_size(&self, node: &Node, layer: usize, layer_count: usize) -> egui::Vec2 {
        match self {
            Diagram::Cnn(c) => egui::vec2(c.node_length, c.node_length),
            Diagram::Rnn(c) => {
                let rnn = RnnDiagram::new(c);
                let height = if layer + 1 == layer_count {
                    rnn.output_layer_delta_y() * 2.0
                } else if layer <= 1 {
                    c.input_node_height
                } else {
                    c.node_height
                };
                egui::vec2(rnn.node_width(node), height)
            }
        }
    }

    fn build(&self, coordinates: &NodeCoordinates, network: &Network) -> LinkResult<Vec<Edge>> {
        match self {
            Diagram::Cnn(c) => build_cnn_links(c, coordinates, network),
            Diagram::Rnn(c) => build_rnn_links(c, coordinates, network),
        }
    }
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) => read_json(path),
        None => Ok(T::default()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

/// Columns left to right, nodes stacked top to bottom and centered on the
/// tallest column.
fn layout(diagram: &Diagram, network: &Network) -> NodeCoordinates {
    let paddings = diagram.paddings();
    let layer_count = network.len();
    let gap = diagram.node_length() * diagram.gap_ratio() / 2.0;

    let column_heights: Vec<f32> = network
        .layers
        .iter()
        .enumerate()
        .map(|(l, layer)| {
            layer
                .iter()
                .map(|node| diagram.node_size(node, l, layer_count).y * 1.5)
                .sum()
        })
        .collect();
    let tallest = column_heights.iter().copied().fold(0.0_f32, f32::max);

    let mut x = paddings.left;
    let mut layers = Vec::with_capacity(layer_count);
    for (l, layer) in network.layers.iter().enumerate() {
        let mut y = paddings.top + (tallest - column_heights[l]) / 2.0;
        let mut column = Vec::with_capacity(layer.len());
        let mut widest = 0.0_f32;
        for node in layer {
            let size = diagram.node_size(node, l, layer_count);
            column.push(Point::new(x, y));
            y += size.y * 1.5;
            widest = widest.max(size.x);
        }
        layers.push(column);
        x += widest + gap;
    }
    NodeCoordinates::new(layers)
}

/// Random network shaped like the diagrams the viewer is meant for.
fn demo_network(variant: Variant) -> Network {
    let weight = || rand::random::<f32>() * 2.0 - 1.0;
    let map = |side: usize| {
        Tensor::Matrix((0..side).map(|_| (0..side).map(|_| weight()).collect()).collect())
    };
    let node = |name: &str, kind: NodeKind, output: Tensor, input_links: Vec<InputLink>| Node {
        layer_name: name.to_string(),
        kind,
        output,
        input_links,
    };

    match variant {
        Variant::Cnn => {
            let input = (0..3).map(|_| node("input", NodeKind::Input, map(8), vec![])).collect();
            let conv = (0..4)
                .map(|_| {
                    let links = (0..3).map(|s| InputLink::new(s, weight())).collect();
                    node("conv_1_1", NodeKind::Conv, map(6), links)
                })
                .collect();
            let relu = (0..4)
                .map(|n| node("relu_1_1", NodeKind::Relu, map(6), vec![InputLink::new(n, 1.0)]))
                .collect();
            let pool = (0..4)
                .map(|n| node("max_pool_1", NodeKind::Pool, map(3), vec![InputLink::new(n, 1.0)]))
                .collect();
            let output = (0..10)
                .map(|_| {
                    let links = (0..4 * 9).map(|s| InputLink::new(s, weight())).collect();
                    node("output", NodeKind::Fc, Tensor::Scalar(weight()), links)
                })
                .collect();
            Network::new(vec![input, conv, relu, pool, output])
        }
        Variant::Rnn => {
            let tokens = 5;
            let input = (0..tokens)
                .map(|_| node("input", NodeKind::Input, Tensor::Scalar(weight()), vec![]))
                .collect();
            let embedding = (0..tokens)
                .map(|n| {
                    let cells = (0..16).map(|_| weight()).collect();
                    let links = vec![InputLink::new(n, 1.0)];
                    node("embedding", NodeKind::Embedding, Tensor::Vector(cells), links)
                })
                .collect();
            let lstm = (0..4)
                .map(|_| {
                    let links = (0..tokens).map(|s| InputLink::new(s, weight())).collect();
                    node("lstm", NodeKind::Lstm, Tensor::Scalar(weight()), links)
                })
                .collect();
            let output = (0..2)
                .map(|_| {
                    let links = (0..4).map(|s| InputLink::new(s, weight())).collect();
                    node("output", NodeKind::Dense, Tensor::Scalar(weight()), links)
                })
                .collect();
            Network::new(vec![input, embedding, lstm, output])
        }
    }
}

fn tensor_mean(tensor: &Tensor) -> f32 {
    let (sum, count) = match tensor {
        Tensor::Scalar(v) => (*v, 1),
        Tensor::Vector(cells) => (cells.iter().sum(), cells.len()),
        Tensor::Matrix(rows) => (rows.iter().flatten().sum(), rows.iter().map(Vec::len).sum()),
    };
    if count == 0 { 0.0 } else { sum / count as f32 }
}

struct MyApp {
    status: String,
    variant: Variant,
    diagram: Diagram,
    network: Network,
    coordinates: NodeCoordinates,
    edges: Vec<Edge>,
    weight_range: f32,
    layer_ranges: Vec<f32>,
    selected_node: Option<(usize, usize)>,
    selected_edge: Option<usize>,

    // Zoom and pan state
    zoom: f32,
    pan: egui::Vec2,
    is_panning: bool,
    last_pan_pos: Option<egui::Pos2>,
}

impl MyApp {
    fn new(variant: Variant, diagram: Diagram, network: Network) -> Self {
        let mut app = Self {
            status: String::new(),
            variant,
            diagram,
            network,
            coordinates: NodeCoordinates::default(),
            edges: Vec::new(),
            weight_range: 0.0,
            layer_ranges: Vec::new(),
            selected_node: None,
            selected_edge: None,
            zoom: 1.0,
            pan: egui::Vec2::ZERO,
            is_panning: false,
            last_pan_pos: None,
        };
        app.rebuild();
        app
    }

    /// Lay the network out again and recompute edges and color domains.
    fn rebuild(&mut self) {
        self.coordinates = layout(&self.diagram, &self.network);
        self.selected_node = None;
        self.selected_edge = None;

        match self.diagram.build(&self.coordinates, &self.network) {
            Ok(edges) => {
                self.weight_range = edges
                    .iter()
                    .map(|e| Extent::point(e.weight))
                    .reduce(Extent::union)
                    .map_or(0.0, |e| e.symmetric_range());
                self.status = format!("{} layers, {} edges", self.network.len(), edges.len());
                self.edges = edges;
            }
            Err(e) => {
                error!("cannot build links: {e}");
                self.status = format!("Cannot build links: {e}");
                self.edges.clear();
            }
        }

        self.layer_ranges = self
            .network
            .layers
            .iter()
            .map(|layer| {
                layer
                    .iter()
                    .filter_map(|node| extent(&node.output).ok())
                    .reduce(Extent::union)
                    .map_or(0.0, |e| e.symmetric_range())
            })
            .collect();
    }

    fn to_screen(&self, origin: egui::Pos2, p: Point) -> egui::Pos2 {
        origin + self.pan + egui::vec2(p.x, p.y) * self.zoom
    }

    fn node_info(&self, layer_idx: usize, node_idx: usize) -> String {
        let Some(node) = self.network.node(layer_idx, node_idx) else {
            return String::new();
        };
        let mut s = format!("Layer: {} ({layer_idx})\n", node.layer_name);
        s.push_str(&format!("Type: {:?}\n", node.kind));
        s.push_str(&format!("Input links: {}\n", node.input_links.len()));
        if let Ok(e) = extent(&node.output) {
            s.push_str(&format!("Output range: [{:.4}, {:.4}]\n", e.min, e.max));
        }
        if node.is_output() {
            if let Some(label) = self.diagram.class_lists().get(node_idx) {
                s.push_str(&format!("Class: {label}\n"));
            }
        }
        s
    }

    fn edge_info(&self, edge: &Edge) -> String {
        format!(
            "Edge\nLayer: {}\nFrom: {}\nTo: {}\nWeight: {:.4}",
            edge.target_layer_index, edge.source_node_index, edge.target_node_index, edge.weight
        )
    }

    fn draw_network(&mut self, ui: &mut egui::Ui) {
        let rect = ui.available_rect_before_wrap();
        // Mouse wheel zoom
        if let Some(pos) = ui.input(|i| i.pointer.hover_pos()) {
            if rect.contains(pos) {
                let scroll = ui.input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    let zoom_factor = 1.15_f32;
                    let old_zoom = self.zoom;
                    let new_zoom = (self.zoom * zoom_factor.powf(scroll.signum())).clamp(0.1, 5.0);
                    let before = (pos - rect.min - self.pan) / old_zoom;
                    self.zoom = new_zoom;
                    self.pan = pos - rect.min - before * self.zoom;
                }
            }
        }
        // Mouse drag pan
        let resp = ui.interact(rect, egui::Id::new("pan"), egui::Sense::click_and_drag());
        if resp.drag_started() {
            self.is_panning = true;
            self.last_pan_pos = resp.interact_pointer_pos();
        }
        if self.is_panning && resp.dragged() {
            if let (Some(last), Some(cur)) = (self.last_pan_pos, resp.interact_pointer_pos()) {
                self.pan += cur - last;
                self.last_pan_pos = Some(cur);
            }
        }
        if resp.drag_stopped() {
            self.is_panning = false;
            self.last_pan_pos = None;
        }

        let origin = rect.min;
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, egui::Color32::from_gray(250));

        let style = self.diagram.edge_style().clone();
        let scales = self.diagram.color_scales().clone();

        // Edges first so nodes sit on top; order within edges is preserved.
        for (i, edge) in self.edges.iter().enumerate() {
            let from = self.to_screen(origin, edge.source);
            let to = self.to_screen(origin, edge.target);
            let color = if self.selected_edge == Some(i) {
                style.hover_color32()
            } else {
                style.weight_color32(&scales.weight, self.weight_range, edge.weight, COLOR_GAP)
            };
            let width = (style.stroke_width * self.zoom).max(0.5);
            painter.line_segment([from, to], egui::Stroke::new(width, color));
        }

        let layer_count = self.network.len();
        let mut clicked_node = None;
        for (l, layer) in self.network.layers.iter().enumerate() {
            let range = self.layer_ranges.get(l).copied().unwrap_or(0.0);
            for (n, node) in layer.iter().enumerate() {
                let Some(p) = self.coordinates.get(l, n) else { continue };
                let size = self.diagram.node_size(node, l, layer_count) * self.zoom;
                let node_rect = egui::Rect::from_min_size(self.to_screen(origin, p), size);
                let fill = if self.selected_node == Some((l, n)) {
                    egui::Color32::YELLOW
                } else {
                    let scale = scales.for_kind(&node.kind);
                    gapped_color(&scale, range, tensor_mean(&node.output), COLOR_GAP)
                };
                painter.rect_filled(node_rect, 1.0, fill);
                if resp.clicked() {
                    if let Some(pos) = resp.interact_pointer_pos() {
                        if node_rect.contains(pos) {
                            clicked_node = Some((l, n));
                        }
                    }
                }
            }
        }

        if resp.clicked() {
            let pointer = resp.interact_pointer_pos();
            if let Some(hit) = clicked_node {
                self.selected_node = if self.selected_node == Some(hit) { None } else { Some(hit) };
                self.selected_edge = None;
            } else if let Some(pos) = pointer {
                self.selected_edge = self.edges.iter().position(|e| {
                    let from = self.to_screen(origin, e.source);
                    let to = self.to_screen(origin, e.target);
                    distance_to_segment(pos, from, to) < 4.0
                });
                self.selected_node = None;
            }
        }

        if let Some((l, n)) = self.selected_node {
            if let Some(p) = self.coordinates.get(l, n) {
                let info = self.node_info(l, n);
                draw_info_box(ui, &painter, rect, self.to_screen(origin, p), &info);
            }
        }
        if let Some(edge) = self.selected_edge.and_then(|i| self.edges.get(i)) {
            let from = self.to_screen(origin, edge.source);
            let to = self.to_screen(origin, edge.target);
            let mid = egui::pos2((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
            draw_info_box(ui, &painter, rect, mid, &self.edge_info(edge));
        }
    }
}

/// Tooltip-style box next to `anchor`, kept inside `bounds`.
fn draw_info_box(
    ui: &egui::Ui,
    painter: &egui::Painter,
    bounds: egui::Rect,
    anchor: egui::Pos2,
    info: &str,
) {
    let lines: Vec<&str> = info.lines().collect();
    let line_height = 16.0;
    let padding = 16.0;
    let font = egui::FontId::proportional(13.0);
    let max_line_width = lines
        .iter()
        .map(|line| {
            ui.painter()
                .layout_no_wrap(line.to_string(), font.clone(), egui::Color32::BLACK)
                .size()
                .x
        })
        .fold(0.0_f32, f32::max);
    let box_size = egui::vec2(
        max_line_width + 2.0 * padding,
        lines.len() as f32 * line_height + 2.0 * padding,
    );
    let margin = 10.0;
    let mut box_pos = anchor + egui::vec2(30.0, -40.0);
    let max = bounds.right_bottom() - box_size;
    if box_pos.x > max.x {
        box_pos.x = anchor.x - box_size.x - 30.0;
    }
    box_pos.x = box_pos.x.max(bounds.left() + margin);
    box_pos.y = box_pos.y.min(max.y - margin).max(bounds.top() + margin);

    let rect_box = egui::Rect::from_min_size(box_pos, box_size);
    painter.rect_filled(rect_box, 8.0, egui::Color32::from_rgba_unmultiplied(255, 255, 220, 230));
    let start_y = rect_box.top() + padding + line_height / 2.0;
    for (i, line) in lines.iter().enumerate() {
        let text_pos = egui::pos2(rect_box.center().x, start_y + i as f32 * line_height);
        painter.text(
            text_pos,
            egui::Align2::CENTER_CENTER,
            *line,
            font.clone(),
            egui::Color32::BLACK,
        );
    }
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.label(&self.status);
            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("-").clicked() {
                    self.zoom = (self.zoom * 0.9).max(0.1);
                }
                if ui.button("+").clicked() {
                    self.zoom = (self.zoom * 1.1).min(5.0);
                }
                ui.label(format!("Zoom: {:.2}x", self.zoom));
                if ui.button("Reset View").clicked() {
                    self.zoom = 1.0;
                    self.pan = egui::Vec2::ZERO;
                }
                if ui.button("New Random Weights").clicked() {
                    self.network = demo_network(self.variant);
                    self.rebuild();
                    info!("regenerated demo network");
                }
            });
            self.draw_network(ui);
        });
    }
}

// Helper function to compute distance from a point to a line segment
fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let ab_len = ab.length_sq();
    if ab_len == 0.0 {
        return ap.length();
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / ab_len).clamp(0.0, 1.0);
    let proj = a + ab * t;
    (p - proj).length()
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .init();

    let diagram = Diagram::load(args.variant, args.config.as_deref())?;
    let network = match &args.network {
        Some(path) => read_json::<Network>(path)?,
        None => {
            info!("no --network given, using a random {:?} demo network", args.variant);
            demo_network(args.variant)
        }
    };

    if args.dump_edges {
        let coordinates = layout(&diagram, &network);
        let edges = diagram.build(&coordinates, &network)?;
        println!("{}", serde_json::to_string_pretty(&edges)?);
        return Ok(());
    }

    let app = MyApp::new(args.variant, diagram, network);
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Network Diagram",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("viewer exited with an error: {e}"))
}

//! Color scales and the gapped lookup used for weights and activations.

use egui::Color32;
use serde::{Deserialize, Serialize};

/// No inset: the full scale is used.
pub const GAP_NONE: f32 = 0.0;

/// A mapping from the unit interval to a color.
pub trait ColorScale {
    fn sample(&self, t: f32) -> Color32;
}

impl<F> ColorScale for F
where
    F: Fn(f32) -> Color32,
{
    fn sample(&self, t: f32) -> Color32 {
        self(t)
    }
}

/// Sequential and diverging schemes assigned to layer kinds by the default
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    Greys,
    RdBu,
    BrBG,
    Oranges,
}

const GREYS: [u32; 9] = [
    0xffffff, 0xf0f0f0, 0xd9d9d9, 0xbdbdbd, 0x969696, 0x737373, 0x525252, 0x252525, 0x000000,
];
const ORANGES: [u32; 9] = [
    0xfff5eb, 0xfee6ce, 0xfdd0a2, 0xfdae6b, 0xfd8d3c, 0xf16913, 0xd94801, 0xa63603, 0x7f2704,
];
const RD_BU: [u32; 11] = [
    0x67001f, 0xb2182b, 0xd6604d, 0xf4a582, 0xfddbc7, 0xf7f7f7, 0xd1e5f0, 0x92c5de, 0x4393c3,
    0x2166ac, 0x053061,
];
const BR_BG: [u32; 11] = [
    0x543005, 0x8c510a, 0xbf812d, 0xdfc27d, 0xf6e8c3, 0xf5f5f5, 0xc7eae5, 0x80cdc1, 0x35978f,
    0x01665e, 0x003c30,
];

impl Scheme {
    fn stops(self) -> &'static [u32] {
        match self {
            Scheme::Greys => &GREYS,
            Scheme::Oranges => &ORANGES,
            Scheme::RdBu => &RD_BU,
            Scheme::BrBG => &BR_BG,
        }
    }
}

impl ColorScale for Scheme {
    /// Piecewise-linear interpolation between the scheme's stops; `t` is
    /// clamped to `[0, 1]`.
    fn sample(&self, t: f32) -> Color32 {
        let stops = self.stops();
        let segments = (stops.len() - 1) as f32;
        let pos = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) } * segments;
        let i = (pos.floor() as usize).min(stops.len() - 2);
        let frac = pos - i as f32;
        lerp_rgb(stops[i], stops[i + 1], frac)
    }
}

fn lerp_rgb(a: u32, b: u32, t: f32) -> Color32 {
    let channel = |shift: u32| {
        let ca = ((a >> shift) & 0xff) as f32;
        let cb = ((b >> shift) & 0xff) as f32;
        (ca + (cb - ca) * t).round() as u8
    };
    Color32::from_rgb(channel(16), channel(8), channel(0))
}

/// Position on the scale for `value`, assumed to lie in `[-range/2, range/2]`,
/// with `gap` trimmed from both ends of the scale.
///
/// A zero or non-finite `range` maps to the midpoint.
pub fn gapped_position(range: f32, value: f32, gap: f32) -> f32 {
    let normalized = if range == 0.0 || !range.is_finite() {
        0.5
    } else {
        (value + range / 2.0) / range
    };
    normalized * (1.0 - 2.0 * gap) + gap
}

/// Look `value` up in `scale` after normalizing it against `range` and
/// insetting by `gap`. A nonzero gap keeps small weights away from the
/// washed-out ends of the scale.
pub fn gapped_color<S>(scale: &S, range: f32, value: f32, gap: f32) -> Color32
where
    S: ColorScale + ?Sized,
{
    scale.sample(gapped_position(range, value, gap))
}

pub fn gapped_color_default<S: ColorScale + ?Sized>(scale: &S, range: f32, value: f32) -> Color32 {
    gapped_color(scale, range, value, GAP_NONE)
}

//! False-color palettes
//!
//! A [Palette] maps a normalized intensity in `[0, 1]` to a display color.
//! The jet map is evaluated from its piecewise linear segments, the others
//! are [colorous] gradients.
//! Frames are colored through a 256 entries [Lut] indexed by the quantized
//! intensity.

use colorous::Color;
use image::Rgb;

/// Piecewise linear `(x, value)` control points of one color channel
type Segments = &'static [(f64, f64)];

const JET_RED: Segments = &[(0., 0.), (0.35, 0.), (0.66, 1.), (0.89, 1.), (1., 0.5)];
const JET_GREEN: Segments = &[
    (0., 0.),
    (0.125, 0.),
    (0.375, 1.),
    (0.64, 1.),
    (0.91, 0.),
    (1., 0.),
];
const JET_BLUE: Segments = &[(0., 0.5), (0.11, 1.), (0.34, 1.), (0.65, 0.), (1., 0.)];

fn interpolate(segments: Segments, x: f64) -> f64 {
    segments
        .windows(2)
        .find(|w| x <= w[1].0)
        .map(|w| {
            let ((x0, y0), (x1, y1)) = (w[0], w[1]);
            y0 + (x - x0) / (x1 - x0) * (y1 - y0)
        })
        .unwrap_or_else(|| segments[segments.len() - 1].1)
}

fn channel(value: f64) -> u8 {
    (value * 255.).round().clamp(0., 255.) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Palette {
    #[default]
    Jet,
    Turbo,
    Viridis,
    Inferno,
    Cubehelix,
}
impl Palette {
    /// Returns the color at `t`, `t` is clamped to `[0, 1]`
    pub fn eval_continuous(&self, t: f64) -> Color {
        let t = if t.is_nan() { 0. } else { t.clamp(0., 1.) };
        match self {
            Palette::Jet => Color {
                r: channel(interpolate(JET_RED, t)),
                g: channel(interpolate(JET_GREEN, t)),
                b: channel(interpolate(JET_BLUE, t)),
            },
            Palette::Turbo => colorous::TURBO.eval_continuous(t),
            Palette::Viridis => colorous::VIRIDIS.eval_continuous(t),
            Palette::Inferno => colorous::INFERNO.eval_continuous(t),
            Palette::Cubehelix => colorous::CUBEHELIX.eval_continuous(t),
        }
    }
    /// Returns the color at `t` as an RGB pixel
    pub fn rgb(&self, t: f64) -> Rgb<u8> {
        let Color { r, g, b } = self.eval_continuous(t);
        Rgb([r, g, b])
    }
    /// Samples the palette into a lookup table, reversed if `inverted`
    pub fn lut(&self, inverted: bool) -> Lut {
        let mut colors = [Rgb([0u8; 3]); 256];
        colors.iter_mut().enumerate().for_each(|(i, c)| {
            let k = if inverted { 255 - i } else { i };
            *c = self.rgb(k as f64 / 255.);
        });
        Lut(colors)
    }
}

/// 8-bit intensity to color lookup table
#[derive(Debug, Clone)]
pub struct Lut([Rgb<u8>; 256]);
impl Lut {
    pub fn get(&self, intensity: u8) -> Rgb<u8> {
        self.0[intensity as usize]
    }
}

//! Color gradient ramps
//!
//! A [`ColorGradient`] stores sparse color stops quantized onto a 256-entry
//! ramp. The canvas uploads each distinct gradient as one row of a 1-D
//! gradient texture; paints reference rows by index.

use std::collections::BTreeMap;

use lumen_core::Color;
use smallvec::SmallVec;

/// Width of one gradient texture row
pub const RAMP_WIDTH: usize = 256;

/// Sparse color stops keyed by ramp position (0..=255)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorGradient {
    stops: BTreeMap<u8, Color>,
}

impl ColorGradient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gradient running from `start` at offset 0 to `end` at offset 1
    pub fn two_color(start: Color, end: Color) -> Self {
        let mut gradient = Self::new();
        gradient.add_stop(0.0, start).add_stop(1.0, end);
        gradient
    }

    /// Build from `(offset, color)` pairs with offsets in 0..=1
    pub fn from_stops<I>(stops: I) -> Self
    where
        I: IntoIterator<Item = (f32, Color)>,
    {
        let mut gradient = Self::new();
        for (offset, color) in stops {
            gradient.add_stop(offset, color);
        }
        gradient
    }

    /// Quantize `offset` to the ramp and store `color` there, replacing any
    /// stop already at that position
    pub fn add_stop(&mut self, offset: f32, color: Color) -> &mut Self {
        self.stops.insert(quantize(offset), color);
        self
    }

    pub fn with_stop(mut self, offset: f32, color: Color) -> Self {
        self.add_stop(offset, color);
        self
    }

    pub fn stops(&self) -> impl Iterator<Item = (u8, Color)> + '_ {
        self.stops.iter().map(|(k, c)| (*k, *c))
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// True when every stop carries the same color, so the ramp is flat
    pub fn is_single_color(&self) -> bool {
        let mut colors = self.stops.values();
        match colors.next() {
            Some(first) => colors.all(|c| c == first),
            None => false,
        }
    }

    /// Color of the lowest stop, transparent when there are no stops
    pub fn first_color(&self) -> Color {
        self.stops
            .values()
            .next()
            .copied()
            .unwrap_or(Color::TRANSPARENT)
    }

    /// Dense ramp, linearly interpolated between stops and clamped to the
    /// end stops outside them
    pub fn colors(&self) -> [Color; RAMP_WIDTH] {
        let stops: SmallVec<[(u8, Color); 8]> = self.stops().collect();

        let Some(&(first_key, first_color)) = stops.first() else {
            return [Color::TRANSPARENT; RAMP_WIDTH];
        };

        let mut ramp = [first_color; RAMP_WIDTH];

        for pair in stops.windows(2) {
            let (k0, c0) = pair[0];
            let (k1, c1) = pair[1];
            let span = (k1 - k0) as f32;
            for i in k0..=k1 {
                let t = (i - k0) as f32 / span;
                ramp[i as usize] = c0.lerp(c1, t);
            }
        }

        let (last_key, last_color) = stops[stops.len() - 1];
        for entry in ramp.iter_mut().skip(last_key as usize + 1) {
            *entry = last_color;
        }
        for entry in ramp.iter_mut().take(first_key as usize) {
            *entry = first_color;
        }

        ramp
    }

    /// Dense ramp with alpha multiplied into the color channels
    pub fn colors_premultiplied(&self) -> [Color; RAMP_WIDTH] {
        let mut ramp = self.colors();
        for color in ramp.iter_mut() {
            *color = color.premultiplied();
        }
        ramp
    }

    /// Ramp packed as RGBA8 texels, ready for a texture row upload
    pub fn to_rgba8(&self, premultiply: bool) -> Vec<u8> {
        let ramp = if premultiply {
            self.colors_premultiplied()
        } else {
            self.colors()
        };
        ramp.iter().flat_map(|c| c.to_rgba8()).collect()
    }

    /// Interpolate stop colors of two gradients with identical stop keys
    ///
    /// Gradients with different stop keys are a caller bug; debug builds
    /// panic, release builds keep this gradient's color for unmatched stops.
    pub fn lerp(&self, other: &ColorGradient, t: f32) -> ColorGradient {
        debug_assert!(
            self.stops.keys().eq(other.stops.keys()),
            "ColorGradient::lerp requires matching stop positions"
        );

        let stops = self
            .stops
            .iter()
            .map(|(key, color)| {
                let blended = match other.stops.get(key) {
                    Some(target) => color.lerp(*target, t),
                    None => *color,
                };
                (*key, blended)
            })
            .collect();

        ColorGradient { stops }
    }
}

fn quantize(offset: f32) -> u8 {
    (offset.clamp(0.0, 1.0) * (RAMP_WIDTH - 1) as f32).round() as u8
}

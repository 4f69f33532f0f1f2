//! Text shaping collaborator contract
//!
//! The canvas does not rasterize glyphs. A [`TextShaper`] turns a string into
//! positioned glyph quads that sample a glyph atlas image; the canvas then
//! transforms the quads and submits them as triangles with an image paint.

use lumen_core::Point;

use crate::paint::ImageId;

/// Shaper-defined font handle
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FontId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    Middle,
    #[default]
    Alphabetic,
    Bottom,
}

/// Glyph rectangle in user space with its atlas texture coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphQuad {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub s0: f32,
    pub t0: f32,
    pub s1: f32,
    pub t1: f32,
}

/// What the canvas asks the shaper to lay out
#[derive(Clone, Debug, PartialEq)]
pub struct TextRequest<'a> {
    pub text: &'a str,
    /// Pen origin in user space
    pub origin: Point,
    pub font: FontId,
    /// Font size in device pixels
    pub size: f32,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    /// Outline width for stroked text, zero when filling
    pub stroke_width: f32,
    /// Device pixels per user unit; quads come back in user space
    pub scale: f32,
}

/// Shaped run ready for drawing
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapedText {
    pub atlas: Option<ImageId>,
    pub quads: Vec<GlyphQuad>,
    /// Horizontal advance in user space
    pub advance: f32,
}

/// Glyph layout provider
///
/// Returning `None` means the font (or its atlas) is not ready; the canvas
/// then draws nothing.
pub trait TextShaper {
    fn shape(&mut self, request: &TextRequest<'_>) -> Option<ShapedText>;
}

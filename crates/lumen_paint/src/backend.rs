//! Render backend contract
//!
//! The canvas never rasterizes anything itself. It tessellates paths and
//! hands the result to a [`RenderBackend`] together with the resolved paint,
//! blend state and scissor. Backends decide how to turn that into pixels:
//! a GPU implementation typically renders convex fills directly and uses a
//! stencil pass for everything else, feeding `Vertex::u`/`Vertex::v` into
//! its anti-alias coverage term.

use lumen_core::Size;

use crate::gradient::ColorGradient;
use crate::paint::{CompositeOperationState, ImageId, Paint, Scissor};
use crate::path_cache::SubPath;

/// Tessellated vertex: canvas-space position plus stroke coverage coords
///
/// `u` runs across a stroke (0 on one side, 1 on the other) and `v` along
/// caps (0 at the anti-aliased tip). Fill interiors carry `(0.5, 1.0)`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { x, y, u, v }
    }
}

/// Where a frame is rendered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderTarget {
    #[default]
    Screen,
    Image(ImageId),
}

/// Borrowed view of tessellated subpaths and their shared vertex buffer
#[derive(Clone, Copy, Debug)]
pub struct PathList<'a> {
    paths: &'a [SubPath],
    verts: &'a [Vertex],
}

/// One subpath of a [`PathList`] with its vertex slices resolved
#[derive(Clone, Copy, Debug)]
pub struct PathView<'a> {
    pub path: &'a SubPath,
    /// Triangle-fan interior (empty for strokes)
    pub fill: &'a [Vertex],
    /// Triangle strip: the stroke body, or the fringe for fills
    pub stroke: &'a [Vertex],
}

impl<'a> PathList<'a> {
    pub fn new(paths: &'a [SubPath], verts: &'a [Vertex]) -> Self {
        Self { paths, verts }
    }

    pub fn empty() -> Self {
        Self { paths: &[], verts: &[] }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The shared vertex buffer every view slices into
    pub fn vertices(&self) -> &'a [Vertex] {
        self.verts
    }

    pub fn iter(&self) -> impl Iterator<Item = PathView<'a>> + 'a {
        let verts = self.verts;
        let paths = self.paths;
        paths.iter().map(move |path| PathView {
            path,
            fill: &verts[path.fill.clone()],
            stroke: &verts[path.stroke.clone()],
        })
    }

    /// True when the list is a single convex subpath, which can be drawn
    /// without a stencil pass
    pub fn is_single_convex(&self) -> bool {
        self.paths.len() == 1 && self.paths[0].convex
    }
}

/// Consumer of tessellated geometry
///
/// Calls arrive in painter's order between `begin` and `flush`/`cancel`.
/// `fringe` is the anti-alias width in canvas units (`1 / pixel_ratio`, or
/// zero when anti-aliasing is off). `bounds` is `[min_x, min_y, max_x,
/// max_y]` of the fill in canvas space, usable as a cover quad.
pub trait RenderBackend {
    /// A new frame starts
    fn begin(&mut self, _target: RenderTarget, _viewport: Size, _pixel_ratio: f32) {}

    fn render_fill(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        bounds: [f32; 4],
        paths: PathList<'_>,
    );

    fn render_stroke(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        stroke_width: f32,
        paths: PathList<'_>,
    );

    /// Pre-built triangle list, used for glyph and image quads
    fn render_triangles(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        verts: &[Vertex],
    );

    /// Intersect the clip mask with the fill area of `paths`; an empty list
    /// clears the mask
    fn render_clip(&mut self, scissor: &Scissor, fringe: f32, paths: PathList<'_>);

    /// Upload `gradient` as gradient texture row `index`
    fn add_gradient(&mut self, index: u32, gradient: &ColorGradient);

    /// Pixel size of a backend image, `None` if the handle is unknown
    fn image_size(&self, _image: ImageId) -> Option<(u32, u32)> {
        None
    }

    /// Submit everything recorded since `begin`
    fn flush(&mut self, viewport: Size);

    /// Discard everything recorded since `begin`
    fn cancel(&mut self);
}

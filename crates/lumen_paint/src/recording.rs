//! A backend that records draw calls instead of rendering them
//!
//! Useful for tests, snapshotting and debugging tools: every call the canvas
//! makes is copied into a [`FrameRecord`] (vertex data included), which is
//! published on `flush` and dropped on `cancel`.

use std::ops::Range;

use lumen_core::Size;
use rustc_hash::FxHashMap;

use crate::backend::{PathList, RenderBackend, RenderTarget, Vertex};
use crate::gradient::{ColorGradient, RAMP_WIDTH};
use crate::paint::{CompositeOperationState, ImageId, Paint, Scissor, Winding};

/// Bytes in one gradient texture row
const ROW_BYTES: usize = RAMP_WIDTH * 4;

/// A subpath as received by the backend, with ranges into
/// [`FrameRecord::verts`]
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedPath {
    pub fill: Range<usize>,
    pub stroke: Range<usize>,
    pub point_count: usize,
    pub closed: bool,
    pub convex: bool,
    pub winding: Winding,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Fill {
        paint: Paint,
        composite: CompositeOperationState,
        scissor: Scissor,
        fringe: f32,
        bounds: [f32; 4],
        paths: Vec<RecordedPath>,
    },
    Stroke {
        paint: Paint,
        composite: CompositeOperationState,
        scissor: Scissor,
        fringe: f32,
        stroke_width: f32,
        paths: Vec<RecordedPath>,
    },
    Triangles {
        paint: Paint,
        composite: CompositeOperationState,
        scissor: Scissor,
        verts: Range<usize>,
    },
    Clip {
        scissor: Scissor,
        paths: Vec<RecordedPath>,
    },
}

impl DrawCall {
    /// Recorded subpaths, empty for triangle calls
    pub fn paths(&self) -> &[RecordedPath] {
        match self {
            DrawCall::Fill { paths, .. } | DrawCall::Stroke { paths, .. } | DrawCall::Clip { paths, .. } => paths,
            DrawCall::Triangles { .. } => &[],
        }
    }

    pub fn paint(&self) -> Option<&Paint> {
        match self {
            DrawCall::Fill { paint, .. }
            | DrawCall::Stroke { paint, .. }
            | DrawCall::Triangles { paint, .. } => Some(paint),
            DrawCall::Clip { .. } => None,
        }
    }
}

/// Everything submitted during one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameRecord {
    pub target: RenderTarget,
    pub viewport: Size,
    pub pixel_ratio: f32,
    pub calls: Vec<DrawCall>,
    pub verts: Vec<Vertex>,
}

impl FrameRecord {
    pub fn vertices(&self, range: &Range<usize>) -> &[Vertex] {
        &self.verts[range.clone()]
    }

    pub fn fill_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, DrawCall::Fill { .. })).count()
    }

    pub fn stroke_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, DrawCall::Stroke { .. })).count()
    }

    fn record_paths(&mut self, paths: PathList<'_>) -> Vec<RecordedPath> {
        paths
            .iter()
            .map(|view| {
                let fill_start = self.verts.len();
                self.verts.extend_from_slice(view.fill);
                let stroke_start = self.verts.len();
                self.verts.extend_from_slice(view.stroke);

                RecordedPath {
                    fill: fill_start..stroke_start,
                    stroke: stroke_start..self.verts.len(),
                    point_count: view.path.count,
                    closed: view.path.closed,
                    convex: view.path.convex,
                    winding: view.path.winding,
                }
            })
            .collect()
    }
}

/// In-memory [`RenderBackend`]
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pending: FrameRecord,
    last_frame: Option<FrameRecord>,
    frames_flushed: u64,
    gradient_texture: Vec<u8>,
    gradient_rows: u32,
    images: FxHashMap<ImageId, (u32, u32)>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `image` known with the given pixel size
    pub fn register_image(&mut self, image: ImageId, width: u32, height: u32) {
        self.images.insert(image, (width, height));
    }

    /// Calls recorded since the last `begin`, not yet flushed
    pub fn pending(&self) -> &FrameRecord {
        &self.pending
    }

    /// The most recently flushed frame
    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.last_frame.as_ref()
    }

    pub fn take_last_frame(&mut self) -> Option<FrameRecord> {
        self.last_frame.take()
    }

    pub fn frames_flushed(&self) -> u64 {
        self.frames_flushed
    }

    /// Number of gradient rows uploaded so far
    pub fn gradient_rows(&self) -> u32 {
        self.gradient_rows
    }

    /// RGBA8 texels of one gradient row
    pub fn gradient_row(&self, index: u32) -> Option<&[u8]> {
        if index >= self.gradient_rows {
            return None;
        }
        let start = index as usize * ROW_BYTES;
        self.gradient_texture.get(start..start + ROW_BYTES)
    }
}

impl RenderBackend for RecordingBackend {
    fn begin(&mut self, target: RenderTarget, viewport: Size, pixel_ratio: f32) {
        self.pending = FrameRecord {
            target,
            viewport,
            pixel_ratio,
            ..FrameRecord::default()
        };
    }

    fn render_fill(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        bounds: [f32; 4],
        paths: PathList<'_>,
    ) {
        let paths = self.pending.record_paths(paths);
        self.pending.calls.push(DrawCall::Fill {
            paint: *paint,
            composite,
            scissor: *scissor,
            fringe,
            bounds,
            paths,
        });
    }

    fn render_stroke(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        fringe: f32,
        stroke_width: f32,
        paths: PathList<'_>,
    ) {
        let paths = self.pending.record_paths(paths);
        self.pending.calls.push(DrawCall::Stroke {
            paint: *paint,
            composite,
            scissor: *scissor,
            fringe,
            stroke_width,
            paths,
        });
    }

    fn render_triangles(
        &mut self,
        paint: &Paint,
        composite: CompositeOperationState,
        scissor: &Scissor,
        _fringe: f32,
        verts: &[Vertex],
    ) {
        let start = self.pending.verts.len();
        self.pending.verts.extend_from_slice(verts);
        self.pending.calls.push(DrawCall::Triangles {
            paint: *paint,
            composite,
            scissor: *scissor,
            verts: start..self.pending.verts.len(),
        });
    }

    fn render_clip(&mut self, scissor: &Scissor, _fringe: f32, paths: PathList<'_>) {
        let paths = self.pending.record_paths(paths);
        self.pending.calls.push(DrawCall::Clip {
            scissor: *scissor,
            paths,
        });
    }

    fn add_gradient(&mut self, index: u32, gradient: &ColorGradient) {
        let rows = index + 1;
        let capacity_rows = self.gradient_texture.len() / ROW_BYTES;
        if rows as usize > capacity_rows {
            let grown = (rows as usize).next_power_of_two();
            self.gradient_texture.resize(grown * ROW_BYTES, 0);
            tracing::trace!("gradient texture grown to {} rows", grown);
        }

        let start = index as usize * ROW_BYTES;
        self.gradient_texture[start..start + ROW_BYTES].copy_from_slice(&gradient.to_rgba8(true));
        self.gradient_rows = self.gradient_rows.max(rows);
    }

    fn image_size(&self, image: ImageId) -> Option<(u32, u32)> {
        self.images.get(&image).copied()
    }

    fn flush(&mut self, viewport: Size) {
        let mut frame = std::mem::take(&mut self.pending);
        frame.viewport = viewport;
        tracing::debug!(
            "flushing frame with {} draw calls, {} vertices",
            frame.calls.len(),
            frame.verts.len()
        );
        self.last_frame = Some(frame);
        self.frames_flushed += 1;
    }

    fn cancel(&mut self) {
        self.pending = FrameRecord::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::Color;

    #[test]
    fn test_flush_publishes_pending_frame() {
        let mut backend = RecordingBackend::new();
        backend.begin(RenderTarget::Screen, Size::new(100.0, 100.0), 2.0);
        backend.render_triangles(
            &Paint::color(Color::RED),
            CompositeOperationState::default(),
            &Scissor::default(),
            1.0,
            &[Vertex::default(); 3],
        );
        assert_eq!(backend.pending().calls.len(), 1);
        assert!(backend.last_frame().is_none());

        backend.flush(Size::new(100.0, 100.0));
        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.calls.len(), 1);
        assert_eq!(frame.pixel_ratio, 2.0);
        assert_eq!(frame.verts.len(), 3);
        assert!(backend.pending().calls.is_empty());
        assert_eq!(backend.frames_flushed(), 1);
    }

    #[test]
    fn test_cancel_discards_pending() {
        let mut backend = RecordingBackend::new();
        backend.begin(RenderTarget::Screen, Size::new(10.0, 10.0), 1.0);
        backend.render_clip(&Scissor::default(), 1.0, PathList::empty());
        backend.cancel();
        assert!(backend.pending().calls.is_empty());
        assert!(backend.last_frame().is_none());
    }

    #[test]
    fn test_gradient_rows_grow() {
        let mut backend = RecordingBackend::new();
        let gradient = ColorGradient::two_color(Color::WHITE, Color::BLACK);
        backend.add_gradient(0, &gradient);
        backend.add_gradient(2, &gradient);

        assert_eq!(backend.gradient_rows(), 3);
        let row = backend.gradient_row(2).unwrap();
        assert_eq!(&row[..4], &[255, 255, 255, 255]);
        assert_eq!(&row[ROW_BYTES - 4..], &[0, 0, 0, 255]);
        assert!(backend.gradient_row(3).is_none());
    }

    #[test]
    fn test_image_registry() {
        let mut backend = RecordingBackend::new();
        assert_eq!(backend.image_size(ImageId(1)), None);
        backend.register_image(ImageId(1), 64, 32);
        assert_eq!(backend.image_size(ImageId(1)), Some((64, 32)));
    }
}

//! Immediate-mode canvas
//!
//! [`Canvas`] owns the drawing state stack, the path being built, the
//! per-frame gradient registry and a [`RenderBackend`]. Path commands are
//! transformed by the current matrix when they are appended; `fill()`,
//! `stroke()` and `clip()` tessellate the path and submit it.
//!
//! ```
//! use lumen_core::{Color, Size};
//! use lumen_paint::{Canvas, RecordingBackend, RenderTarget};
//!
//! let mut canvas = Canvas::new(RecordingBackend::new());
//! canvas.begin_frame(Size::new(640.0, 480.0), 1.0, RenderTarget::Screen);
//! canvas.begin_path();
//! canvas.rect(10.0, 10.0, 100.0, 50.0);
//! canvas.set_fill_color(Color::RED);
//! canvas.fill();
//! canvas.end_frame();
//!
//! let frame = canvas.backend().last_frame().unwrap();
//! assert_eq!(frame.fill_count(), 1);
//! ```

use std::f32::consts::PI;

use lumen_core::{Affine2D, Color, Point, Rect, Size, Vec2};
use smallvec::SmallVec;

use crate::backend::{PathList, RenderBackend, RenderTarget, Vertex};
use crate::config::CanvasConfig;
use crate::flatten::quad_to_cubic;
use crate::gradient::ColorGradient;
use crate::paint::{
    BlendFactor, CompositeOperation, CompositeOperationState, FillRule, ImageId, LineCap, LineJoin,
    Paint, RampRef, Scissor, Winding,
};
use crate::path2d::{handle_length, Path2D};
use crate::path_cache::{Command, PathCache};
use crate::state::State;
use crate::text::{FontId, TextAlign, TextBaseline, TextRequest, TextShaper};

/// Bezier handle length for a quarter circle of radius 1
pub const KAPPA90: f32 = 0.552_284_8;

/// Nine-patch border widths in image pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Insets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Insets {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }
}

pub struct Canvas<B: RenderBackend> {
    backend: B,
    config: CanvasConfig,
    state: State,
    stack: Vec<State>,
    cache: PathCache,
    gradients: Vec<ColorGradient>,
    shaper: Option<Box<dyn TextShaper>>,
    quad_verts: Vec<Vertex>,
    viewport: Size,
    pixel_ratio: f32,
    fringe_width: f32,
    in_frame: bool,
}

impl<B: RenderBackend> Canvas<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, CanvasConfig::default())
    }

    pub fn with_config(backend: B, config: CanvasConfig) -> Self {
        let mut canvas = Self {
            backend,
            config,
            state: State::default(),
            stack: Vec::new(),
            cache: PathCache::new(),
            gradients: Vec::new(),
            shaper: None,
            quad_verts: Vec::new(),
            viewport: Size::ZERO,
            pixel_ratio: 1.0,
            fringe_width: 1.0,
            in_frame: false,
        };
        canvas.set_device_pixel_ratio(1.0);
        canvas
    }

    /// Install the glyph layout provider used by the text calls
    pub fn set_text_shaper(&mut self, shaper: Box<dyn TextShaper>) {
        self.shaper = Some(shaper);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Tessellation state of the last fill, stroke or clip
    pub fn path_cache(&self) -> &PathCache {
        &self.cache
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn fringe_width(&self) -> f32 {
        self.fringe_width
    }

    pub fn is_in_frame(&self) -> bool {
        self.in_frame
    }

    fn set_device_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
        self.fringe_width = 1.0 / ratio;
        self.cache.set_tolerances(
            self.config.tessellation_tolerance / ratio,
            self.config.distance_tolerance / ratio,
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Frame lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a frame rendering into `target`.
    ///
    /// Resets the state stack, the current path and the gradient registry,
    /// and derives fringe width and tolerances from `pixel_ratio`.
    pub fn begin_frame(&mut self, viewport: Size, pixel_ratio: f32, target: RenderTarget) {
        debug_assert!(pixel_ratio > 0.0, "pixel ratio must be positive");

        if self.in_frame {
            tracing::warn!("begin_frame called while a frame is open, discarding it");
            self.backend.cancel();
        }

        self.stack.clear();
        self.state = State::default();
        self.viewport = viewport;
        self.set_device_pixel_ratio(pixel_ratio);
        self.gradients.clear();
        self.cache.clear();
        self.in_frame = true;

        self.backend.begin(target, viewport, pixel_ratio);

        tracing::debug!(
            "begin frame {}x{} @{} (fringe {}, tess tol {}, dist tol {})",
            viewport.width,
            viewport.height,
            pixel_ratio,
            self.fringe_width,
            self.cache.tessellation_tolerance(),
            self.cache.distance_tolerance()
        );
    }

    /// Submit the frame's geometry
    pub fn end_frame(&mut self) {
        self.backend.flush(self.viewport);
        self.in_frame = false;
        tracing::debug!("end frame");
    }

    /// Drop the frame's geometry without drawing it
    pub fn cancel_frame(&mut self) {
        self.backend.cancel();
        self.in_frame = false;
        tracing::debug!("frame cancelled");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State stack
    // ─────────────────────────────────────────────────────────────────────────

    /// Push a copy of the current state
    pub fn save(&mut self) {
        if self.stack.len() >= self.config.max_state_depth {
            tracing::warn!(
                "save() ignored: state stack is at its limit of {}",
                self.config.max_state_depth
            );
            return;
        }
        self.stack.push(self.state.clone());
    }

    /// Pop back to the last saved state
    pub fn restore(&mut self) {
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => tracing::warn!("restore() without matching save()"),
        }
    }

    /// Reset the current state to defaults; the stack is untouched
    pub fn reset(&mut self) {
        self.state = State::default();
    }

    pub fn save_count(&self) -> usize {
        self.stack.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Render styles
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_shape_anti_alias(&mut self, enabled: bool) {
        self.state.shape_anti_alias = enabled;
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        self.state.stroke_width = width;
    }

    pub fn set_miter_limit(&mut self, limit: f32) {
        self.state.miter_limit = limit;
    }

    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.state.line_cap = cap;
    }

    pub fn set_line_join(&mut self, join: LineJoin) {
        self.state.line_join = join;
    }

    /// Transparency applied to everything drawn afterwards
    pub fn set_global_alpha(&mut self, alpha: f32) {
        self.state.alpha = alpha;
    }

    pub fn set_global_composite_operation(&mut self, op: CompositeOperation) {
        self.state.composite = CompositeOperationState::new(op);
    }

    pub fn set_global_composite_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.composite = CompositeOperationState::with_blend_factors(src, dst);
    }

    pub fn set_global_composite_blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.state.composite = CompositeOperationState {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        };
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.state.fill = Paint::color(color);
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.state.stroke = Paint::color(color);
    }

    /// Use `paint` for fills; its transform is taken relative to the
    /// current transform
    pub fn set_fill_paint(&mut self, paint: Paint) {
        let mut paint = paint;
        paint.transform = self.state.transform.then(&paint.transform);
        self.state.fill = paint;
    }

    pub fn set_stroke_paint(&mut self, paint: Paint) {
        let mut paint = paint;
        paint.transform = self.state.transform.then(&paint.transform);
        self.state.stroke = paint;
    }

    /// Dash pattern in user units; an empty slice draws solid lines
    pub fn set_line_dash(&mut self, pattern: &[f32]) {
        self.state.dash.clear();
        self.state.dash.extend_from_slice(pattern);
    }

    pub fn set_line_dash_offset(&mut self, offset: f32) {
        self.state.dash_offset = offset;
    }

    pub fn set_font(&mut self, font: FontId) {
        self.state.font = Some(font);
    }

    pub fn set_font_size(&mut self, size: f32) {
        self.state.font_size = size;
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        self.state.text_align = align;
    }

    pub fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.state.text_baseline = baseline;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transforms
    // ─────────────────────────────────────────────────────────────────────────

    fn pre_multiply(&mut self, transform: Affine2D) {
        self.state.transform = self.state.transform.then(&transform);
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.pre_multiply(Affine2D::translation(x, y));
    }

    pub fn rotate(&mut self, angle: f32) {
        self.pre_multiply(Affine2D::rotation(angle));
    }

    /// Rotate by `angle` radians around `(cx, cy)`
    pub fn rotate_at(&mut self, angle: f32, cx: f32, cy: f32) {
        self.translate(cx, cy);
        self.rotate(angle);
        self.translate(-cx, -cy);
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.pre_multiply(Affine2D::scale(sx, sy));
    }

    pub fn scale_at(&mut self, sx: f32, sy: f32, cx: f32, cy: f32) {
        self.translate(cx, cy);
        self.scale(sx, sy);
        self.translate(-cx, -cy);
    }

    /// Skew along x by `ax` and along y by `ay` radians
    pub fn skew(&mut self, ax: f32, ay: f32) {
        self.pre_multiply(Affine2D::skew_x(ax));
        self.pre_multiply(Affine2D::skew_y(ay));
    }

    pub fn skew_at(&mut self, ax: f32, ay: f32, cx: f32, cy: f32) {
        self.translate(cx, cy);
        self.skew(ax, ay);
        self.translate(-cx, -cy);
    }

    /// Replace the current transform
    pub fn set_transform(&mut self, transform: Affine2D) {
        self.state.transform = transform;
    }

    pub fn reset_transform(&mut self) {
        self.state.transform = Affine2D::IDENTITY;
    }

    pub fn current_transform(&self) -> Affine2D {
        self.state.transform
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scissoring
    // ─────────────────────────────────────────────────────────────────────────

    /// Clip to a rectangle in the current transform space
    pub fn set_scissor(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let w = w.max(0.0);
        let h = h.max(0.0);
        let center = Affine2D::translation(x + w * 0.5, y + h * 0.5);

        self.state.scissor = Scissor {
            transform: self.state.transform.then(&center),
            extent: Size::new(w * 0.5, h * 0.5),
        };
    }

    /// Clip to a rectangle in canvas space, ignoring the current transform
    pub fn set_scissor_absolute(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let w = w.max(0.0);
        let h = h.max(0.0);

        self.state.scissor = Scissor {
            transform: Affine2D::translation(x + w * 0.5, y + h * 0.5),
            extent: Size::new(w * 0.5, h * 0.5),
        };
    }

    /// Intersect the current scissor with a rectangle in the current
    /// transform space. Rotated scissors are approximated by their
    /// axis-aligned bounds in that space.
    pub fn intersect_scissor(&mut self, x: f32, y: f32, w: f32, h: f32) {
        if self.state.scissor.is_unclipped() {
            self.set_scissor(x, y, w, h);
            return;
        }

        let Some(inverse) = self.state.transform.inverse() else {
            self.set_scissor(x, y, w, h);
            return;
        };

        let scissor = self.state.scissor;
        let local = inverse.then(&scissor.transform);
        let [a, b, c, d, tx, ty] = local.elements;
        let (ex, ey) = (scissor.extent.width, scissor.extent.height);
        let tex = ex * a.abs() + ey * c.abs();
        let tey = ex * b.abs() + ey * d.abs();

        let current = Rect::new(tx - tex, ty - tey, tex * 2.0, tey * 2.0);
        let clipped = current.intersect(&Rect::new(x, y, w, h));
        self.set_scissor(clipped.x(), clipped.y(), clipped.width(), clipped.height());
    }

    pub fn reset_scissor(&mut self) {
        self.state.scissor = Scissor::default();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Paints
    // ─────────────────────────────────────────────────────────────────────────

    /// Linear gradient from `start` to `end` sampling `gradient`
    pub fn create_linear_gradient(&mut self, start: Point, end: Point, gradient: &ColorGradient) -> Paint {
        let paint = Paint::linear_gradient(start, end, Color::WHITE, Color::WHITE);
        self.resolve_ramp(paint, gradient)
    }

    pub fn create_box_gradient(&mut self, rect: Rect, radius: f32, feather: f32, gradient: &ColorGradient) -> Paint {
        let paint = Paint::box_gradient(rect, radius, feather, Color::WHITE, Color::WHITE);
        self.resolve_ramp(paint, gradient)
    }

    pub fn create_radial_gradient(
        &mut self,
        center: Point,
        inner_radius: f32,
        outer_radius: f32,
        gradient: &ColorGradient,
    ) -> Paint {
        let paint = Paint::radial_gradient(center, inner_radius, outer_radius, Color::WHITE, Color::WHITE);
        self.resolve_ramp(paint, gradient)
    }

    pub fn create_image_pattern(&self, origin: Point, size: Size, angle: f32, image: ImageId, alpha: f32) -> Paint {
        Paint::image_pattern(origin, size, angle, image, alpha)
    }

    /// Blend a ramp paint towards `other` by `weight` (0..=1)
    ///
    /// Paints without a ramp are returned unchanged.
    pub fn mix_gradient(&mut self, paint: Paint, other: &ColorGradient, weight: f32) -> Paint {
        let Some(mut ramp) = paint.ramp else {
            return paint;
        };
        if other.is_empty() {
            return paint;
        }

        ramp.mix_row = self.register_gradient(other);
        ramp.mix = weight.clamp(0.0, 1.0);
        Paint {
            ramp: Some(ramp),
            ..paint
        }
    }

    /// A gradient registered this frame, by row
    pub fn gradient(&self, row: u32) -> Option<&ColorGradient> {
        self.gradients.get(row as usize)
    }

    pub fn gradient_count(&self) -> usize {
        self.gradients.len()
    }

    fn resolve_ramp(&mut self, paint: Paint, gradient: &ColorGradient) -> Paint {
        if gradient.is_empty() || gradient.is_single_color() {
            return Paint::color(gradient.first_color());
        }

        let row = self.register_gradient(gradient);
        paint.with_ramp(RampRef::single(row))
    }

    fn register_gradient(&mut self, gradient: &ColorGradient) -> u32 {
        if let Some(row) = self.gradients.iter().position(|g| g == gradient) {
            return row as u32;
        }

        let row = self.gradients.len() as u32;
        self.gradients.push(gradient.clone());
        self.backend.add_gradient(row, gradient);
        tracing::debug!("registered gradient row {} ({} stops)", row, gradient.len());
        row
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Path building
    // ─────────────────────────────────────────────────────────────────────────

    fn append(&mut self, commands: &[Command]) {
        self.cache.append_commands(commands, &self.state.transform);
    }

    /// Pen position mapped back into the current transform's space
    fn current_point(&self) -> Point {
        let pen = self.cache.last_point();
        match self.state.transform.inverse() {
            Some(inverse) => inverse.transform_point(pen),
            None => pen,
        }
    }

    /// Clear the current path
    pub fn begin_path(&mut self) {
        self.cache.clear();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.append(&[Command::MoveTo(Point::new(x, y))]);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.append(&[Command::LineTo(Point::new(x, y))]);
    }

    pub fn cubic_bezier_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        self.append(&[Command::BezierTo(
            Point::new(c1x, c1y),
            Point::new(c2x, c2y),
            Point::new(x, y),
        )]);
    }

    pub fn quad_bezier_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let from = self.current_point();
        let to = Point::new(x, y);
        let (c1, c2) = quad_to_cubic(from, Point::new(cx, cy), to);
        self.append(&[Command::BezierTo(c1, c2, to)]);
    }

    /// Arc tangent to the lines current point → `(x1, y1)` → `(x2, y2)`
    ///
    /// Degenerate input (coincident points, a straight bend, a radius below
    /// the distance tolerance) draws a line to `(x1, y1)` instead.
    pub fn arc_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, radius: f32) {
        if !self.cache.has_commands() {
            return;
        }

        let p0 = self.current_point();
        let p1 = Point::new(x1, y1);
        let p2 = Point::new(x2, y2);
        let dist_tol = self.cache.distance_tolerance();

        if p0.approx_eq(p1, dist_tol)
            || p1.approx_eq(p2, dist_tol)
            || dist_point_segment_sq(p1, p0, p2) < dist_tol * dist_tol
            || radius < dist_tol
        {
            self.line_to(x1, y1);
            return;
        }

        let d0 = (p0 - p1).normalize();
        let d1 = (p2 - p1).normalize();
        let a = d0.dot(d1).clamp(-1.0, 1.0).acos();
        let d = radius / (a / 2.0).tan();

        if d > 10000.0 {
            self.line_to(x1, y1);
            return;
        }

        let cross = d1.x * d0.y - d0.x * d1.y;
        let (cx, cy, a0, a1, dir) = if cross > 0.0 {
            (
                x1 + d0.x * d + d0.y * radius,
                y1 + d0.y * d - d0.x * radius,
                d0.x.atan2(-d0.y),
                (-d1.x).atan2(d1.y),
                Winding::Cw,
            )
        } else {
            (
                x1 + d0.x * d - d0.y * radius,
                y1 + d0.y * d + d0.x * radius,
                (-d0.x).atan2(d0.y),
                d1.x.atan2(-d1.y),
                Winding::Ccw,
            )
        };

        self.arc(cx, cy, radius, a0, a1, dir);
    }

    /// Circular arc around `(cx, cy)` from angle `a0` to `a1` (radians).
    ///
    /// `Winding::Cw` sweeps towards increasing angles. The arc is joined to
    /// the current path with a line, or starts a new subpath if there is none.
    pub fn arc(&mut self, cx: f32, cy: f32, r: f32, a0: f32, a1: f32, dir: Winding) {
        let mut da = a1 - a0;
        if dir == Winding::Cw {
            if da.abs() >= PI * 2.0 {
                da = PI * 2.0;
            } else {
                while da < 0.0 {
                    da += PI * 2.0;
                }
            }
        } else if da.abs() >= PI * 2.0 {
            da = -PI * 2.0;
        } else {
            while da > 0.0 {
                da -= PI * 2.0;
            }
        }

        let ndivs = ((da.abs() / (PI * 0.5) + 0.5) as usize).clamp(1, 5);
        let step = da / ndivs as f32;
        let mut kappa = handle_length(step).abs();
        if dir == Winding::Ccw {
            kappa = -kappa;
        }

        let mut commands: SmallVec<[Command; 8]> = SmallVec::new();
        let (mut px, mut py, mut ptanx, mut ptany) = (0.0, 0.0, 0.0, 0.0);

        for i in 0..=ndivs {
            let a = a0 + da * (i as f32 / ndivs as f32);
            let (dy, dx) = a.sin_cos();
            let x = cx + dx * r;
            let y = cy + dy * r;
            let tanx = -dy * r * kappa;
            let tany = dx * r * kappa;

            if i == 0 {
                let start = Point::new(x, y);
                commands.push(if self.cache.has_commands() {
                    Command::LineTo(start)
                } else {
                    Command::MoveTo(start)
                });
            } else {
                commands.push(Command::BezierTo(
                    Point::new(px + ptanx, py + ptany),
                    Point::new(x - tanx, y - tany),
                    Point::new(x, y),
                ));
            }

            px = x;
            py = y;
            ptanx = tanx;
            ptany = tany;
        }

        self.append(&commands);
    }

    pub fn close_path(&mut self) {
        self.append(&[Command::Close]);
    }

    /// Request a winding for the current subpath (`Winding::HOLE` cuts holes)
    pub fn path_winding(&mut self, winding: Winding) {
        self.append(&[Command::Winding(winding)]);
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.append(&[
            Command::MoveTo(Point::new(x, y)),
            Command::LineTo(Point::new(x, y + h)),
            Command::LineTo(Point::new(x + w, y + h)),
            Command::LineTo(Point::new(x + w, y)),
            Command::Close,
        ]);
    }

    pub fn rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, r: f32) {
        self.rounded_rect_varying(x, y, w, h, r, r, r, r);
    }

    /// Rounded rectangle with one radius per corner, clockwise from the
    /// top-left
    #[allow(clippy::too_many_arguments)]
    pub fn rounded_rect_varying(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        top_left: f32,
        top_right: f32,
        bottom_right: f32,
        bottom_left: f32,
    ) {
        if top_left < 0.1 && top_right < 0.1 && bottom_right < 0.1 && bottom_left < 0.1 {
            self.rect(x, y, w, h);
            return;
        }

        let halfw = w.abs() * 0.5;
        let halfh = h.abs() * 0.5;
        let (sx, sy) = (w.signum(), h.signum());
        let corner = |r: f32| (r.min(halfw) * sx, r.min(halfh) * sy);
        let (rx_bl, ry_bl) = corner(bottom_left);
        let (rx_br, ry_br) = corner(bottom_right);
        let (rx_tr, ry_tr) = corner(top_right);
        let (rx_tl, ry_tl) = corner(top_left);
        let k = 1.0 - KAPPA90;

        self.append(&[
            Command::MoveTo(Point::new(x, y + ry_tl)),
            Command::LineTo(Point::new(x, y + h - ry_bl)),
            Command::BezierTo(
                Point::new(x, y + h - ry_bl * k),
                Point::new(x + rx_bl * k, y + h),
                Point::new(x + rx_bl, y + h),
            ),
            Command::LineTo(Point::new(x + w - rx_br, y + h)),
            Command::BezierTo(
                Point::new(x + w - rx_br * k, y + h),
                Point::new(x + w, y + h - ry_br * k),
                Point::new(x + w, y + h - ry_br),
            ),
            Command::LineTo(Point::new(x + w, y + ry_tr)),
            Command::BezierTo(
                Point::new(x + w, y + ry_tr * k),
                Point::new(x + w - rx_tr * k, y),
                Point::new(x + w - rx_tr, y),
            ),
            Command::LineTo(Point::new(x + rx_tl, y)),
            Command::BezierTo(
                Point::new(x + rx_tl * k, y),
                Point::new(x, y + ry_tl * k),
                Point::new(x, y + ry_tl),
            ),
            Command::Close,
        ]);
    }

    pub fn ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32) {
        let k = KAPPA90;
        self.append(&[
            Command::MoveTo(Point::new(cx - rx, cy)),
            Command::BezierTo(
                Point::new(cx - rx, cy + ry * k),
                Point::new(cx - rx * k, cy + ry),
                Point::new(cx, cy + ry),
            ),
            Command::BezierTo(
                Point::new(cx + rx * k, cy + ry),
                Point::new(cx + rx, cy + ry * k),
                Point::new(cx + rx, cy),
            ),
            Command::BezierTo(
                Point::new(cx + rx, cy - ry * k),
                Point::new(cx + rx * k, cy - ry),
                Point::new(cx, cy - ry),
            ),
            Command::BezierTo(
                Point::new(cx - rx * k, cy - ry),
                Point::new(cx - rx, cy - ry * k),
                Point::new(cx - rx, cy),
            ),
            Command::Close,
        ]);
    }

    pub fn circle(&mut self, cx: f32, cy: f32, r: f32) {
        self.ellipse(cx, cy, r, r);
    }

    /// Closed polygon with `sides` vertices on the ellipse `radius` around
    /// `center`, starting at the top. Fewer than three sides adds nothing.
    pub fn regular_polygon(&mut self, center: Point, radius: Vec2, sides: usize) {
        if sides < 3 {
            return;
        }

        let mut commands: SmallVec<[Command; 16]> = SmallVec::with_capacity(sides + 1);
        for i in 0..sides {
            let a = -PI * 0.5 + i as f32 * 2.0 * PI / sides as f32;
            let p = Point::new(center.x + radius.x * a.cos(), center.y + radius.y * a.sin());
            commands.push(if i == 0 {
                Command::MoveTo(p)
            } else {
                Command::LineTo(p)
            });
        }
        commands.push(Command::Close);
        self.append(&commands);
    }

    /// Star with `points` tips alternating between the outer and inner radius
    pub fn star(&mut self, center: Point, outer_radius: f32, inner_radius: f32, points: usize) {
        if points < 2 {
            return;
        }

        let count = points * 2;
        let mut commands: SmallVec<[Command; 16]> = SmallVec::with_capacity(count + 1);
        for i in 0..count {
            let r = if i % 2 == 0 { outer_radius } else { inner_radius };
            let a = -PI * 0.5 + i as f32 * PI / points as f32;
            let p = Point::new(center.x + r * a.cos(), center.y + r * a.sin());
            commands.push(if i == 0 {
                Command::MoveTo(p)
            } else {
                Command::LineTo(p)
            });
        }
        commands.push(Command::Close);
        self.append(&commands);
    }

    pub fn triangle(&mut self, a: Point, b: Point, c: Point) {
        self.append(&[
            Command::MoveTo(a),
            Command::LineTo(b),
            Command::LineTo(c),
            Command::Close,
        ]);
    }

    /// Line to `(x, y)` perturbed by a sine wave of `amplitude` along its
    /// normal. The wave count is rounded so the line ends on its target.
    pub fn wavy_line_to(&mut self, x: f32, y: f32, amplitude: f32, wavelength: f32) {
        let from = self.current_point();
        let to = Point::new(x, y);
        let delta = to - from;
        let length = delta.length();

        if length <= self.cache.distance_tolerance() || wavelength <= 0.0 {
            self.line_to(x, y);
            return;
        }

        let waves = (length / wavelength).round().max(1.0);
        let steps = (waves * 16.0) as usize;
        let normal = delta.normalize().perp();

        let mut commands: SmallVec<[Command; 32]> = SmallVec::with_capacity(steps);
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            let offset = if i == steps {
                0.0
            } else {
                amplitude * (2.0 * PI * waves * t).sin()
            };
            commands.push(Command::LineTo(from.lerp(to, t) + normal * offset));
        }
        self.append(&commands);
    }

    /// Append a reusable path under the current transform
    pub fn path_2d(&mut self, path: &Path2D) {
        self.append(path.commands());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Drawing
    // ─────────────────────────────────────────────────────────────────────────

    fn aa_fringe(&self) -> f32 {
        if self.config.edge_anti_alias && self.state.shape_anti_alias {
            self.fringe_width
        } else {
            0.0
        }
    }

    /// Fill the current path with the fill paint
    pub fn fill(&mut self) {
        let mut paint = self.state.fill;

        self.cache.flatten_paths(true, &[], 0.0);
        let fringe = self.aa_fringe();
        self.cache
            .expand_fill(fringe, LineJoin::Miter, self.config.fill_miter_limit);

        if self.cache.paths().is_empty() {
            return;
        }

        paint.mul_alpha(self.state.alpha);

        self.backend.render_fill(
            &paint,
            self.state.composite,
            &self.state.scissor,
            self.fringe_width,
            self.cache.bounds(),
            self.cache.path_list(),
        );

        tracing::trace!(
            "fill: {} subpaths, {} vertices",
            self.cache.paths().len(),
            self.cache.vertices().len()
        );
    }

    /// Stroke the current path with the stroke paint
    pub fn stroke(&mut self) {
        let scale = self.state.transform.average_scale();
        let mut stroke_width = (self.state.stroke_width * scale).clamp(0.0, self.config.max_stroke_width);
        let mut paint = self.state.stroke;

        if stroke_width < self.fringe_width {
            // Thinner than a pixel: fade by coverage instead of shrinking
            let alpha = (stroke_width / self.fringe_width).clamp(0.0, 1.0);
            paint.mul_alpha(alpha * alpha);
            stroke_width = self.fringe_width;
        }

        paint.mul_alpha(self.state.alpha);

        let dash: SmallVec<[f32; 8]> = self.state.dash.iter().map(|d| d * scale).collect();
        self.cache
            .flatten_paths(false, &dash, self.state.dash_offset * scale);

        let fringe = self.aa_fringe();
        self.cache.expand_stroke(
            stroke_width * 0.5,
            fringe,
            self.state.line_cap,
            self.state.line_join,
            self.state.miter_limit,
        );

        if self.cache.paths().is_empty() {
            return;
        }

        self.backend.render_stroke(
            &paint,
            self.state.composite,
            &self.state.scissor,
            self.fringe_width,
            stroke_width,
            self.cache.path_list(),
        );

        tracing::trace!(
            "stroke: {} subpaths, {} vertices, width {}",
            self.cache.paths().len(),
            self.cache.vertices().len(),
            stroke_width
        );
    }

    /// Stroke a single segment, replacing the current path
    pub fn stroke_line(&mut self, from: Point, to: Point) {
        self.begin_path();
        self.move_to(from.x, from.y);
        self.line_to(to.x, to.y);
        self.stroke();
    }

    /// Intersect the clip mask with the current path's fill area.
    ///
    /// An empty path clips everything away: the scissor collapses to zero
    /// size, since an empty list would clear the backend mask instead.
    pub fn clip(&mut self) {
        self.cache.flatten_paths(true, &[], 0.0);
        if self.cache.paths().is_empty() {
            tracing::debug!("clip() with an empty path, collapsing the scissor");
            self.state.scissor = Scissor {
                transform: self.state.scissor.transform,
                extent: Size::ZERO,
            };
            return;
        }

        let fringe = self.aa_fringe();
        self.cache
            .expand_fill(fringe, LineJoin::Miter, self.config.fill_miter_limit);

        self.backend
            .render_clip(&self.state.scissor, self.fringe_width, self.cache.path_list());
    }

    /// Clear the clip mask
    pub fn reset_clip(&mut self) {
        self.backend
            .render_clip(&self.state.scissor, self.fringe_width, PathList::empty());
    }

    /// Hit-test a canvas-space point against the current path
    pub fn is_point_in_path(&mut self, x: f32, y: f32, fill_rule: FillRule) -> bool {
        self.cache.flatten_paths(true, &[], 0.0);
        self.cache.contains_point(x, y, fill_rule)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Text
    // ─────────────────────────────────────────────────────────────────────────

    /// Fill `text` at `(x, y)`; returns the advance, 0.0 when the font is
    /// not ready
    pub fn fill_text(&mut self, x: f32, y: f32, text: &str) -> f32 {
        let paint = self.state.fill;
        self.draw_text(x, y, text, paint, 0.0)
    }

    /// Outline `text` using the stroke paint and width
    pub fn stroke_text(&mut self, x: f32, y: f32, text: &str) -> f32 {
        let paint = self.state.stroke;
        let width = self.state.stroke_width;
        self.draw_text(x, y, text, paint, width)
    }

    /// Shape `text` with the installed shaper and draw its glyph quads with
    /// `paint` tinting the glyph atlas
    pub fn draw_text(&mut self, x: f32, y: f32, text: &str, paint: Paint, stroke_width: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }

        let Some(font) = self.state.font else {
            tracing::debug!("draw_text: no font selected");
            return 0.0;
        };

        let scale = self.state.transform.average_scale() * self.pixel_ratio;
        let request = TextRequest {
            text,
            origin: Point::new(x, y),
            font,
            size: self.state.font_size * scale,
            align: self.state.text_align,
            baseline: self.state.text_baseline,
            stroke_width: stroke_width * scale,
            scale,
        };

        let Some(shaped) = self.shaper.as_mut().and_then(|shaper| shaper.shape(&request)) else {
            tracing::debug!("draw_text: font {:?} not ready", font);
            return 0.0;
        };

        let Some(atlas) = shaped.atlas else {
            return shaped.advance;
        };
        if self.backend.image_size(atlas).is_none() {
            tracing::debug!("draw_text: glyph atlas {:?} not ready", atlas);
            return 0.0;
        }

        let transform = self.state.transform;
        let snap = transform.is_translation_only();
        let ratio = self.pixel_ratio;
        let map = |x: f32, y: f32| {
            let p = transform.transform_point(Point::new(x, y));
            if snap {
                Point::new((p.x * ratio).round() / ratio, (p.y * ratio).round() / ratio)
            } else {
                p
            }
        };

        self.quad_verts.clear();
        for q in &shaped.quads {
            let c0 = map(q.x0, q.y0);
            let c1 = map(q.x1, q.y0);
            let c2 = map(q.x1, q.y1);
            let c3 = map(q.x0, q.y1);
            push_quad(&mut self.quad_verts, [c0, c1, c2, c3], (q.s0, q.t0, q.s1, q.t1));
        }

        if !self.quad_verts.is_empty() {
            let mut paint = paint;
            paint.image = Some(atlas);
            paint.mul_alpha(self.state.alpha);

            self.backend.render_triangles(
                &paint,
                self.state.composite,
                &self.state.scissor,
                self.fringe_width,
                &self.quad_verts,
            );
        }

        shaped.advance
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Images
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw `image` stretched over `dest`; no-op while the image is not ready
    pub fn draw_image(&mut self, image: ImageId, dest: Rect) {
        if self.backend.image_size(image).is_none() {
            tracing::debug!("draw_image: image {:?} not ready", image);
            return;
        }

        let transform = self.state.transform;
        let corners = [
            Point::new(dest.x(), dest.y()),
            Point::new(dest.max_x(), dest.y()),
            Point::new(dest.max_x(), dest.max_y()),
            Point::new(dest.x(), dest.max_y()),
        ]
        .map(|p| transform.transform_point(p));

        self.quad_verts.clear();
        push_quad(&mut self.quad_verts, corners, (0.0, 0.0, 1.0, 1.0));
        self.submit_image_quads(image, dest);
    }

    /// Draw `image` into `dest` keeping the `insets` border unscaled and
    /// stretching the center. Borders shrink proportionally when `dest` is
    /// too small to hold them.
    pub fn nine_patch(&mut self, image: ImageId, dest: Rect, insets: Insets) {
        let Some((iw, ih)) = self.backend.image_size(image) else {
            tracing::debug!("nine_patch: image {:?} not ready", image);
            return;
        };
        let (iw, ih) = (iw as f32, ih as f32);
        if iw <= 0.0 || ih <= 0.0 {
            return;
        }

        let fit = |a: f32, b: f32, available: f32| {
            let total = a + b;
            if total > available && total > 0.0 {
                let s = available / total;
                (a * s, b * s)
            } else {
                (a, b)
            }
        };
        let (dl, dr) = fit(insets.left, insets.right, dest.width());
        let (dt, db) = fit(insets.top, insets.bottom, dest.height());

        let xs = [dest.x(), dest.x() + dl, dest.max_x() - dr, dest.max_x()];
        let ys = [dest.y(), dest.y() + dt, dest.max_y() - db, dest.max_y()];
        let us = [0.0, insets.left / iw, 1.0 - insets.right / iw, 1.0];
        let vs = [0.0, insets.top / ih, 1.0 - insets.bottom / ih, 1.0];

        let transform = self.state.transform;
        self.quad_verts.clear();
        for row in 0..3 {
            for col in 0..3 {
                if xs[col + 1] - xs[col] <= 0.0 || ys[row + 1] - ys[row] <= 0.0 {
                    continue;
                }
                let corners = [
                    Point::new(xs[col], ys[row]),
                    Point::new(xs[col + 1], ys[row]),
                    Point::new(xs[col + 1], ys[row + 1]),
                    Point::new(xs[col], ys[row + 1]),
                ]
                .map(|p| transform.transform_point(p));
                push_quad(
                    &mut self.quad_verts,
                    corners,
                    (us[col], vs[row], us[col + 1], vs[row + 1]),
                );
            }
        }

        self.submit_image_quads(image, dest);
    }

    fn submit_image_quads(&mut self, image: ImageId, dest: Rect) {
        if self.quad_verts.is_empty() {
            return;
        }

        let mut paint = Paint::image_pattern(dest.origin, dest.size, 0.0, image, 1.0);
        paint.transform = self.state.transform.then(&paint.transform);
        paint.mul_alpha(self.state.alpha);

        self.backend.render_triangles(
            &paint,
            self.state.composite,
            &self.state.scissor,
            self.fringe_width,
            &self.quad_verts,
        );
    }
}

/// Two triangles covering `corners` (clockwise from the top-left) with
/// texture coordinates `(s0, t0, s1, t1)`
fn push_quad(verts: &mut Vec<Vertex>, corners: [Point; 4], (s0, t0, s1, t1): (f32, f32, f32, f32)) {
    let [c0, c1, c2, c3] = corners;
    verts.extend_from_slice(&[
        Vertex::new(c0.x, c0.y, s0, t0),
        Vertex::new(c2.x, c2.y, s1, t1),
        Vertex::new(c1.x, c1.y, s1, t0),
        Vertex::new(c0.x, c0.y, s0, t0),
        Vertex::new(c3.x, c3.y, s0, t1),
        Vertex::new(c2.x, c2.y, s1, t1),
    ]);
}

/// Squared distance from `p` to the segment `a`-`b`
fn dist_point_segment_sq(p: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let d = ab.dot(ab);
    let mut t = ab.dot(ap);
    if d > 0.0 {
        t /= d;
    }
    let t = t.clamp(0.0, 1.0);
    let closest = a + ab * t;
    closest.distance_squared(p)
}

//! Paints, line styles and blend state

use lumen_core::{Affine2D, Color, Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Backend image handle
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ImageId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Rotational direction of a subpath
///
/// `Ccw` subpaths have positive signed area and render solid; `Cw` subpaths
/// render as holes under the non-zero rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Winding {
    #[default]
    Ccw,
    Cw,
}

impl Winding {
    pub const SOLID: Winding = Winding::Ccw;
    pub const HOLE: Winding = Winding::Cw;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
}

/// Porter-Duff composite operations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompositeOperation {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    Atop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    Lighter,
    Copy,
    Xor,
}

/// Resolved blend factors handed to the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeOperationState {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl CompositeOperationState {
    pub fn new(op: CompositeOperation) -> Self {
        use BlendFactor::*;

        let (sfactor, dfactor) = match op {
            CompositeOperation::SourceOver => (One, OneMinusSrcAlpha),
            CompositeOperation::SourceIn => (DstAlpha, Zero),
            CompositeOperation::SourceOut => (OneMinusDstAlpha, Zero),
            CompositeOperation::Atop => (DstAlpha, OneMinusSrcAlpha),
            CompositeOperation::DestinationOver => (OneMinusDstAlpha, One),
            CompositeOperation::DestinationIn => (Zero, SrcAlpha),
            CompositeOperation::DestinationOut => (Zero, OneMinusSrcAlpha),
            CompositeOperation::DestinationAtop => (OneMinusDstAlpha, SrcAlpha),
            CompositeOperation::Lighter => (One, One),
            CompositeOperation::Copy => (One, Zero),
            CompositeOperation::Xor => (OneMinusDstAlpha, OneMinusSrcAlpha),
        };

        Self::with_blend_factors(sfactor, dfactor)
    }

    pub fn with_blend_factors(src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            src_rgb: src,
            dst_rgb: dst,
            src_alpha: src,
            dst_alpha: dst,
        }
    }
}

impl Default for CompositeOperationState {
    fn default() -> Self {
        Self::new(CompositeOperation::SourceOver)
    }
}

/// Reference to rows of the canvas gradient texture
///
/// The backend samples `row`, and when `mix` is non-zero blends towards
/// `mix_row` by that weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RampRef {
    pub row: u32,
    pub mix_row: u32,
    pub mix: f32,
}

impl RampRef {
    pub fn single(row: u32) -> Self {
        Self {
            row,
            mix_row: row,
            mix: 0.0,
        }
    }
}

/// A resolved fill/stroke source
///
/// Gradients are evaluated in paint space: `transform` maps paint space into
/// canvas space, `extent` is the box half-size, and `radius`/`feather`
/// shape the falloff. With a `ramp` the colors come from the gradient texture
/// and `inner_color` acts as a tint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub transform: Affine2D,
    pub extent: Size,
    pub radius: f32,
    pub feather: f32,
    pub inner_color: Color,
    pub outer_color: Color,
    pub ramp: Option<RampRef>,
    pub image: Option<ImageId>,
}

impl Default for Paint {
    fn default() -> Self {
        Self::color(Color::BLACK)
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::color(color)
    }
}

impl Paint {
    /// Solid color paint
    pub fn color(color: Color) -> Self {
        Self {
            transform: Affine2D::IDENTITY,
            extent: Size::ZERO,
            radius: 0.0,
            feather: 1.0,
            inner_color: color,
            outer_color: color,
            ramp: None,
            image: None,
        }
    }

    /// Two-color linear gradient from `start` to `end`
    pub fn linear_gradient(start: Point, end: Point, inner: Color, outer: Color) -> Self {
        const LARGE: f32 = 1e5;

        let mut dx = end.x - start.x;
        let mut dy = end.y - start.y;
        let d = (dx * dx + dy * dy).sqrt();

        if d > 0.0001 {
            dx /= d;
            dy /= d;
        } else {
            dx = 0.0;
            dy = 1.0;
        }

        Self {
            transform: Affine2D::new(
                dy,
                -dx,
                dx,
                dy,
                start.x - dx * LARGE,
                start.y - dy * LARGE,
            ),
            extent: Size::new(LARGE, LARGE + d * 0.5),
            radius: 0.0,
            feather: d.max(1.0),
            inner_color: inner,
            outer_color: outer,
            ramp: None,
            image: None,
        }
    }

    /// Rounded-box gradient; `feather` blurs the box border
    pub fn box_gradient(rect: Rect, radius: f32, feather: f32, inner: Color, outer: Color) -> Self {
        let center = rect.center();
        Self {
            transform: Affine2D::translation(center.x, center.y),
            extent: Size::new(rect.width() * 0.5, rect.height() * 0.5),
            radius,
            feather: feather.max(1.0),
            inner_color: inner,
            outer_color: outer,
            ramp: None,
            image: None,
        }
    }

    /// Radial gradient between two radii around `center`
    pub fn radial_gradient(
        center: Point,
        inner_radius: f32,
        outer_radius: f32,
        inner: Color,
        outer: Color,
    ) -> Self {
        let r = (inner_radius + outer_radius) * 0.5;
        let f = outer_radius - inner_radius;

        Self {
            transform: Affine2D::translation(center.x, center.y),
            extent: Size::new(r, r),
            radius: r,
            feather: f.max(1.0),
            inner_color: inner,
            outer_color: outer,
            ramp: None,
            image: None,
        }
    }

    /// Image pattern with its top-left corner at `origin`, scaled to `size`
    /// and rotated by `angle` radians
    pub fn image_pattern(origin: Point, size: Size, angle: f32, image: ImageId, alpha: f32) -> Self {
        let mut transform = Affine2D::rotation(angle);
        transform.elements[4] = origin.x;
        transform.elements[5] = origin.y;

        let tint = Color::rgba(1.0, 1.0, 1.0, alpha);

        Self {
            transform,
            extent: size,
            radius: 0.0,
            feather: 0.0,
            inner_color: tint,
            outer_color: tint,
            ramp: None,
            image: Some(image),
        }
    }

    pub fn with_ramp(mut self, ramp: RampRef) -> Self {
        self.ramp = Some(ramp);
        self.inner_color = Color::WHITE;
        self.outer_color = Color::WHITE;
        self
    }

    /// Scale the opacity of both gradient endpoints
    pub fn mul_alpha(&mut self, alpha: f32) {
        self.inner_color.a *= alpha;
        self.outer_color.a *= alpha;
    }

    pub fn is_solid(&self) -> bool {
        self.ramp.is_none() && self.image.is_none() && self.inner_color == self.outer_color
    }
}

/// Oriented clip rectangle
///
/// A negative extent disables clipping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scissor {
    pub transform: Affine2D,
    pub extent: Size,
}

impl Default for Scissor {
    fn default() -> Self {
        Self {
            transform: Affine2D::IDENTITY,
            extent: Size::new(-1.0, -1.0),
        }
    }
}

impl Scissor {
    pub fn is_unclipped(&self) -> bool {
        self.extent.width < 0.0 || self.extent.height < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_gradient_geometry() {
        let paint = Paint::linear_gradient(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Color::WHITE,
            Color::BLACK,
        );
        assert_eq!(paint.feather, 100.0);
        assert_eq!(paint.extent.height, 1e5 + 50.0);
        // x axis of the paint space runs along the gradient normal
        assert_eq!(paint.transform.elements[..4], [0.0, -1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_degenerate_linear_gradient_points_down() {
        let paint = Paint::linear_gradient(Point::ZERO, Point::ZERO, Color::WHITE, Color::BLACK);
        assert_eq!(paint.feather, 1.0);
        assert_eq!(paint.transform.elements[..4], [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_radial_and_box() {
        let radial = Paint::radial_gradient(Point::new(5.0, 5.0), 10.0, 30.0, Color::RED, Color::BLUE);
        assert_eq!(radial.radius, 20.0);
        assert_eq!(radial.feather, 20.0);
        assert_eq!(radial.extent, Size::new(20.0, 20.0));

        let boxed = Paint::box_gradient(Rect::new(0.0, 0.0, 40.0, 20.0), 4.0, 0.0, Color::RED, Color::BLUE);
        assert_eq!(boxed.extent, Size::new(20.0, 10.0));
        assert_eq!(boxed.feather, 1.0);
        assert_eq!(boxed.transform, Affine2D::translation(20.0, 10.0));
    }

    #[test]
    fn test_mul_alpha() {
        let mut paint = Paint::color(Color::WHITE);
        paint.mul_alpha(0.25);
        assert_eq!(paint.inner_color.a, 0.25);
        assert_eq!(paint.outer_color.a, 0.25);
        assert!(paint.is_solid());
    }

    #[test]
    fn test_composite_factors() {
        let state = CompositeOperationState::new(CompositeOperation::DestinationOut);
        assert_eq!(state.src_rgb, BlendFactor::Zero);
        assert_eq!(state.dst_alpha, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(CompositeOperationState::default().src_rgb, BlendFactor::One);
    }
}

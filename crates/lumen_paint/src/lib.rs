//! Lumen Paint
//!
//! An immediate-mode 2D vector canvas in the style of HTML Canvas. Shapes are
//! described as paths, flattened to polylines and tessellated into
//! anti-aliased vertex strips that a [`RenderBackend`] turns into pixels.
//!
//! # Features
//!
//! - Path building (lines, Beziers, arcs, shape primitives)
//! - Non-zero fills with solid-vs-hole winding and AA fringes
//! - Strokes with caps, joins, miter limits and dash patterns
//! - Linear, box and radial gradients backed by 256-texel color ramps
//! - A reusable [`Path2D`] with a compact path-data parser
//! - Scissoring, clipping, text and image quads
//!
//! # Example
//!
//! ```rust
//! use lumen_core::{Color, Size};
//! use lumen_paint::{Canvas, RecordingBackend, RenderTarget};
//!
//! let mut canvas = Canvas::new(RecordingBackend::new());
//! canvas.begin_frame(Size::new(100.0, 100.0), 1.0, RenderTarget::Screen);
//! canvas.begin_path();
//! canvas.circle(50.0, 50.0, 20.0);
//! canvas.set_stroke_color(Color::BLUE);
//! canvas.stroke();
//! canvas.end_frame();
//! ```

pub mod backend;
pub mod canvas;
pub mod config;
mod dash;
pub mod error;
pub mod flatten;
pub mod gradient;
pub mod paint;
pub mod path2d;
pub mod path_cache;
pub mod recording;
pub mod state;
pub mod text;

pub use backend::{PathList, PathView, RenderBackend, RenderTarget, Vertex};
pub use canvas::{Canvas, Insets, KAPPA90};
pub use config::CanvasConfig;
pub use error::{ConfigError, PathParseError, Result};
pub use gradient::{ColorGradient, RAMP_WIDTH};
pub use paint::{
    BlendFactor, CompositeOperation, CompositeOperationState, FillRule, ImageId, LineCap, LineJoin,
    Paint, RampRef, Scissor, Winding,
};
pub use path2d::{Path2D, Polygons};
pub use path_cache::{Command, FlatPoint, PathCache, PointFlags, SubPath};
pub use recording::{DrawCall, FrameRecord, RecordedPath, RecordingBackend};
pub use state::State;
pub use text::{FontId, GlyphQuad, ShapedText, TextAlign, TextBaseline, TextRequest, TextShaper};

pub use lumen_core::{Affine2D, Color, Point, Rect, Size, Vec2};

//! Lumen Core Primitives
//!
//! Leaf types shared by every layer of the Lumen vector canvas:
//!
//! - **Geometry**: [`Point`], [`Vec2`], [`Size`], [`Rect`]
//! - **Transforms**: [`Affine2D`], the 2x3 matrix applied to path commands
//!   at append time
//! - **Colors**: [`Color`], straight-alpha RGBA with interpolation helpers
//!
//! # Example
//!
//! ```rust
//! use lumen_core::{Affine2D, Point};
//!
//! let t = Affine2D::translation(10.0, 0.0).then(&Affine2D::scale(2.0, 2.0));
//! assert_eq!(t.transform_point(Point::new(1.0, 1.0)), Point::new(12.0, 2.0));
//! ```

pub mod color;
pub mod geometry;
pub mod transform;

pub use color::Color;
pub use geometry::{Point, Rect, Size, Vec2};
pub use transform::Affine2D;

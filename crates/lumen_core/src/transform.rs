//! 2D affine transforms

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Vec2};

/// 2D affine transformation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Affine2D {
    /// Matrix elements [a, b, c, d, tx, ty]
    /// | a  c  tx |
    /// | b  d  ty |
    /// | 0  0   1 |
    pub elements: [f32; 6],
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2D {
    pub const IDENTITY: Affine2D = Affine2D {
        elements: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self {
            elements: [a, b, c, d, tx, ty],
        }
    }

    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            elements: [1.0, 0.0, 0.0, 1.0, x, y],
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            elements: [sx, 0.0, 0.0, sy, 0.0, 0.0],
        }
    }

    pub fn rotation(angle: f32) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        Self {
            elements: [c, s, -s, c, 0.0, 0.0],
        }
    }

    /// Shear along the x axis by `angle` radians
    pub fn skew_x(angle: f32) -> Self {
        Self {
            elements: [1.0, 0.0, angle.tan(), 1.0, 0.0, 0.0],
        }
    }

    /// Shear along the y axis by `angle` radians
    pub fn skew_y(angle: f32) -> Self {
        Self {
            elements: [1.0, angle.tan(), 0.0, 1.0, 0.0, 0.0],
        }
    }

    pub fn transform_point(&self, point: Point) -> Point {
        let [a, b, c, d, tx, ty] = self.elements;
        Point::new(a * point.x + c * point.y + tx, b * point.x + d * point.y + ty)
    }

    /// Transform a direction, ignoring translation
    pub fn transform_vector(&self, v: Vec2) -> Vec2 {
        let [a, b, c, d, _, _] = self.elements;
        Vec2::new(a * v.x + c * v.y, b * v.x + d * v.y)
    }

    /// Concatenate this transform with another (self * other)
    /// The resulting transform first applies `other`, then `self`.
    pub fn then(&self, other: &Affine2D) -> Affine2D {
        let [a1, b1, c1, d1, tx1, ty1] = self.elements;
        let [a2, b2, c2, d2, tx2, ty2] = other.elements;

        Affine2D {
            elements: [
                a1 * a2 + c1 * b2,
                b1 * a2 + d1 * b2,
                a1 * c2 + c1 * d2,
                b1 * c2 + d1 * d2,
                a1 * tx2 + c1 * ty2 + tx1,
                b1 * tx2 + d1 * ty2 + ty1,
            ],
        }
    }

    /// Inverse transform, or `None` when the matrix is singular
    pub fn inverse(&self) -> Option<Affine2D> {
        let [a, b, c, d, tx, ty] = self.elements;
        let det = a as f64 * d as f64 - c as f64 * b as f64;
        if det > -1e-6 && det < 1e-6 {
            return None;
        }
        let invdet = 1.0 / det;
        let (a, b, c, d, tx, ty) = (
            a as f64, b as f64, c as f64, d as f64, tx as f64, ty as f64,
        );
        Some(Affine2D {
            elements: [
                (d * invdet) as f32,
                (-b * invdet) as f32,
                (-c * invdet) as f32,
                (a * invdet) as f32,
                ((c * ty - d * tx) * invdet) as f32,
                ((b * tx - a * ty) * invdet) as f32,
            ],
        })
    }

    /// Mean of the x and y axis scale factors
    pub fn average_scale(&self) -> f32 {
        let [a, b, c, d, _, _] = self.elements;
        let sx = (a * a + c * c).sqrt();
        let sy = (b * b + d * d).sqrt();
        (sx + sy) * 0.5
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// True when the transform only moves points
    pub fn is_translation_only(&self) -> bool {
        let [a, b, c, d, _, _] = self.elements;
        a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0
    }

    pub fn translation_part(&self) -> Vec2 {
        Vec2::new(self.elements[4], self.elements[5])
    }
}

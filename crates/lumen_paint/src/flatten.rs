//! Cubic Bezier flattening shared by the path cache and `Path2D`

use lumen_core::Point;

/// Subdivision stops below this recursion depth
pub const MAX_BEZIER_DEPTH: u32 = 10;

/// Recursively subdivide the cubic `p1 p2 p3 p4` into line segments.
///
/// The curve is split while `(d2 + d3)^2 >= tolerance * |p4 - p1|^2`, where
/// `d2`/`d3` measure how far the control points stray from the chord. Only
/// segment end points are emitted (`p1` is assumed to be emitted already);
/// the final point is tagged `is_end = true`.
pub fn tessellate_bezier<F>(p1: Point, p2: Point, p3: Point, p4: Point, tolerance: f32, sink: &mut F)
where
    F: FnMut(Point, bool),
{
    subdivide(p1, p2, p3, p4, tolerance, 0, true, sink);
}

#[allow(clippy::too_many_arguments)]
fn subdivide<F>(
    p1: Point,
    p2: Point,
    p3: Point,
    p4: Point,
    tolerance: f32,
    level: u32,
    is_end: bool,
    sink: &mut F,
) where
    F: FnMut(Point, bool),
{
    if level > MAX_BEZIER_DEPTH {
        return;
    }

    let p12 = p1.midpoint(p2);
    let p23 = p2.midpoint(p3);
    let p34 = p3.midpoint(p4);
    let p123 = p12.midpoint(p23);

    let dx = p4.x - p1.x;
    let dy = p4.y - p1.y;
    let d2 = ((p2.x - p4.x) * dy - (p2.y - p4.y) * dx).abs();
    let d3 = ((p3.x - p4.x) * dy - (p3.y - p4.y) * dx).abs();

    if (d2 + d3) * (d2 + d3) < tolerance * (dx * dx + dy * dy) {
        sink(p4, is_end);
        return;
    }

    let p234 = p23.midpoint(p34);
    let p1234 = p123.midpoint(p234);

    subdivide(p1, p12, p123, p1234, tolerance, level + 1, false, sink);
    subdivide(p1234, p234, p34, p4, tolerance, level + 1, is_end, sink);
}

/// Control points of the cubic equivalent to the quadratic `from ctrl to`
pub fn quad_to_cubic(from: Point, ctrl: Point, to: Point) -> (Point, Point) {
    let c1 = Point::new(
        from.x + 2.0 / 3.0 * (ctrl.x - from.x),
        from.y + 2.0 / 3.0 * (ctrl.y - from.y),
    );
    let c2 = Point::new(
        to.x + 2.0 / 3.0 * (ctrl.x - to.x),
        to.y + 2.0 / 3.0 * (ctrl.y - to.y),
    );
    (c1, c2)
}

/// Point on the cubic at parameter `t`
pub fn cubic_point(p1: Point, p2: Point, p3: Point, p4: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p1.x + b * p2.x + c * p3.x + d * p4.x,
        a * p1.y + b * p2.y + c * p3.y + d * p4.y,
    )
}

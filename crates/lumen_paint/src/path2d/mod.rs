//! Reusable path object
//!
//! A [`Path2D`] records commands in the same encoding the canvas uses, so it
//! can be replayed into any number of canvases (`Canvas::path_2d`) under
//! different transforms. It can be built programmatically, parsed from SVG
//! path data, or flattened into polygons for non-canvas consumers.
//!
//! ```
//! use lumen_paint::Path2D;
//!
//! let path: Path2D = "M0 0 L10 0 L10 10 Z".parse().unwrap();
//! let polygons = path.polygonize(0.25);
//! assert_eq!(polygons.outlines.len(), 1);
//! assert_eq!(polygons.outlines[0].len(), 3);
//! ```

mod arc;
mod parser;

use std::str::FromStr;

use lumen_core::{Affine2D, Point, Rect, Vec2};

use crate::error::PathParseError;
use crate::flatten::{quad_to_cubic, tessellate_bezier};
use crate::path_cache::Command;

pub(crate) use arc::handle_length;

/// Points closer than this are merged when polygonizing
const POLYGON_MERGE_DISTANCE: f32 = 1e-4;

/// Closed rings produced by [`Path2D::polygonize`]
///
/// Rings nested inside an odd number of other rings are holes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygons {
    pub outlines: Vec<Vec<Point>>,
    pub holes: Vec<Vec<Point>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path2D {
    commands: Vec<Command>,
    start: Point,
    last: Point,
    last_quad_ctrl: Option<Point>,
    last_cubic_ctrl: Option<Point>,
}

impl Path2D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse SVG path data; fails without returning a partial path
    pub fn parse(source: &str) -> Result<Self, PathParseError> {
        parser::parse_path(source)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn current_point(&self) -> Point {
        self.last
    }

    pub fn move_to(&mut self, p: Point) -> &mut Self {
        self.commands.push(Command::MoveTo(p));
        self.start = p;
        self.set_cursor(p, None, None);
        self
    }

    pub fn line_to(&mut self, p: Point) -> &mut Self {
        self.commands.push(Command::LineTo(p));
        self.set_cursor(p, None, None);
        self
    }

    pub fn horizontal_to(&mut self, x: f32) -> &mut Self {
        let p = Point::new(x, self.last.y);
        self.line_to(p)
    }

    pub fn vertical_to(&mut self, y: f32) -> &mut Self {
        let p = Point::new(self.last.x, y);
        self.line_to(p)
    }

    pub fn quad_to(&mut self, ctrl: Point, p: Point) -> &mut Self {
        let (c1, c2) = quad_to_cubic(self.last, ctrl, p);
        self.commands.push(Command::BezierTo(c1, c2, p));
        self.set_cursor(p, Some(ctrl), None);
        self
    }

    /// Quadratic whose control point mirrors the previous quadratic's
    pub fn smooth_quad_to(&mut self, p: Point) -> &mut Self {
        let ctrl = self.reflect(self.last_quad_ctrl);
        self.quad_to(ctrl, p)
    }

    pub fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) -> &mut Self {
        self.commands.push(Command::BezierTo(c1, c2, p));
        self.set_cursor(p, None, Some(c2));
        self
    }

    /// Cubic whose first control point mirrors the previous cubic's second
    pub fn smooth_cubic_to(&mut self, c2: Point, p: Point) -> &mut Self {
        let c1 = self.reflect(self.last_cubic_ctrl);
        self.cubic_to(c1, c2, p)
    }

    /// SVG elliptical arc to `p`; `x_rotation` is in degrees
    pub fn arc_to(&mut self, radii: Vec2, x_rotation: f32, large_arc: bool, sweep: bool, p: Point) -> &mut Self {
        arc::append_arc(
            &mut self.commands,
            self.last,
            radii,
            x_rotation.to_radians(),
            large_arc,
            sweep,
            p,
        );
        self.set_cursor(p, None, None);
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.commands.push(Command::Close);
        let start = self.start;
        self.set_cursor(start, None, None);
        self
    }

    fn set_cursor(&mut self, p: Point, quad: Option<Point>, cubic: Option<Point>) {
        self.last = p;
        self.last_quad_ctrl = quad;
        self.last_cubic_ctrl = cubic;
    }

    fn reflect(&self, ctrl: Option<Point>) -> Point {
        match ctrl {
            Some(c) => Point::new(2.0 * self.last.x - c.x, 2.0 * self.last.y - c.y),
            None => self.last,
        }
    }

    /// Box around every command point, control points included
    pub fn bounds(&self) -> Option<Rect> {
        let mut points = self.commands.iter().flat_map(|command| {
            let pts: [Option<Point>; 3] = match *command {
                Command::MoveTo(p) | Command::LineTo(p) => [Some(p), None, None],
                Command::BezierTo(c1, c2, p) => [Some(c1), Some(c2), Some(p)],
                _ => [None, None, None],
            };
            pts.into_iter().flatten()
        });

        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        Some(Rect::from_points(min, max))
    }

    /// Map every coordinate through `transform`
    pub fn transform(&mut self, transform: &Affine2D) {
        for command in self.commands.iter_mut() {
            *command = command.transformed(transform);
        }
        self.start = transform.transform_point(self.start);
        self.last = transform.transform_point(self.last);
        self.last_quad_ctrl = self.last_quad_ctrl.map(|p| transform.transform_point(p));
        self.last_cubic_ctrl = self.last_cubic_ctrl.map(|p| transform.transform_point(p));
    }

    /// Flatten into closed rings and split them into outlines and holes.
    ///
    /// Every subpath is treated as closed. Rings with fewer than three
    /// distinct points are dropped.
    pub fn polygonize(&self, tolerance: f32) -> Polygons {
        let mut rings: Vec<Vec<Point>> = Vec::new();
        let mut current: Vec<Point> = Vec::new();
        let mut subpath_start: Option<Point> = None;

        for command in &self.commands {
            match *command {
                Command::MoveTo(p) => {
                    finish_ring(&mut rings, &mut current);
                    current.push(p);
                    subpath_start = Some(p);
                }
                Command::LineTo(p) => push_distinct(&mut current, p),
                Command::BezierTo(c1, c2, p) => {
                    let Some(&from) = current.last() else {
                        current.push(p);
                        continue;
                    };
                    tessellate_bezier(from, c1, c2, p, tolerance, &mut |pt, _| {
                        push_distinct(&mut current, pt)
                    });
                }
                Command::Close => {
                    finish_ring(&mut rings, &mut current);
                    // Drawing after Z continues from the subpath start
                    current.extend(subpath_start);
                }
                Command::Winding(_) => {}
            }
        }
        finish_ring(&mut rings, &mut current);

        let mut polygons = Polygons::default();
        for (i, ring) in rings.iter().enumerate() {
            let depth = rings
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && ring_contains(other, ring[0]))
                .count();
            if depth % 2 == 0 {
                polygons.outlines.push(ring.clone());
            } else {
                polygons.holes.push(ring.clone());
            }
        }

        tracing::trace!(
            "polygonized path into {} outlines and {} holes",
            polygons.outlines.len(),
            polygons.holes.len()
        );

        polygons
    }
}

impl FromStr for Path2D {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path2D::parse(s)
    }
}

fn push_distinct(ring: &mut Vec<Point>, p: Point) {
    if ring
        .last()
        .map_or(true, |last| !last.approx_eq(p, POLYGON_MERGE_DISTANCE))
    {
        ring.push(p);
    }
}

fn finish_ring(rings: &mut Vec<Vec<Point>>, current: &mut Vec<Point>) {
    let mut ring = std::mem::take(current);
    if ring.len() > 1 && ring[ring.len() - 1].approx_eq(ring[0], POLYGON_MERGE_DISTANCE) {
        ring.pop();
    }
    if ring.len() >= 3 {
        rings.push(ring);
    }
}

fn ring_contains(ring: &[Point], p: Point) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_cursor() {
        let mut path = Path2D::new();
        path.move_to(Point::new(1.0, 1.0))
            .horizontal_to(5.0)
            .vertical_to(7.0)
            .close();
        assert_eq!(path.current_point(), Point::new(1.0, 1.0));
        assert_eq!(path.commands()[2], Command::LineTo(Point::new(5.0, 7.0)));
    }

    #[test]
    fn test_smooth_cubic_reflects_previous_control() {
        let mut path = Path2D::new();
        path.move_to(Point::ZERO)
            .cubic_to(Point::new(0.0, 10.0), Point::new(10.0, 10.0), Point::new(10.0, 0.0))
            .smooth_cubic_to(Point::new(20.0, -10.0), Point::new(20.0, 0.0));

        match path.commands()[2] {
            Command::BezierTo(c1, _, _) => assert_eq!(c1, Point::new(10.0, -10.0)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_smooth_quad_without_previous_uses_current_point() {
        let mut path = Path2D::new();
        path.move_to(Point::ZERO).smooth_quad_to(Point::new(9.0, 0.0));
        // control point collapses onto the start, giving a straight cubic
        assert_eq!(
            path.commands()[1],
            Command::BezierTo(Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(9.0, 0.0))
        );
    }

    #[test]
    fn test_smooth_quad_reflects_quad_control() {
        let mut path = Path2D::new();
        path.move_to(Point::ZERO)
            .quad_to(Point::new(3.0, 3.0), Point::new(6.0, 0.0))
            .smooth_quad_to(Point::new(12.0, 0.0));

        let expected = quad_to_cubic(Point::new(6.0, 0.0), Point::new(9.0, -3.0), Point::new(12.0, 0.0));
        assert_eq!(
            path.commands()[2],
            Command::BezierTo(expected.0, expected.1, Point::new(12.0, 0.0))
        );
    }

    #[test]
    fn test_bounds_and_transform() {
        let mut path: Path2D = "M0 0 L10 0 L10 20 Z".parse().unwrap();
        assert_eq!(path.bounds(), Some(Rect::new(0.0, 0.0, 10.0, 20.0)));

        path.transform(&Affine2D::translation(5.0, 5.0));
        assert_eq!(path.bounds(), Some(Rect::new(5.0, 5.0, 10.0, 20.0)));
        assert_eq!(Path2D::new().bounds(), None);
    }

    #[test]
    fn test_polygonize_outline_and_hole() {
        let path: Path2D = "M0 0 H100 V100 H0 Z M25 25 H75 V75 H25 Z".parse().unwrap();
        let polygons = path.polygonize(0.25);
        assert_eq!(polygons.outlines.len(), 1);
        assert_eq!(polygons.holes.len(), 1);
        assert_eq!(polygons.outlines[0].len(), 4);
        assert_eq!(polygons.holes[0][0], Point::new(25.0, 25.0));
    }

    #[test]
    fn test_polygonize_flattens_curves() {
        let path: Path2D = "M0 0 C0 50 50 50 50 0 Z".parse().unwrap();
        let polygons = path.polygonize(0.25);
        assert_eq!(polygons.outlines.len(), 1);
        assert!(polygons.outlines[0].len() > 4);
    }

    #[test]
    fn test_polygonize_line_after_close_starts_at_subpath_start() {
        let path: Path2D = "M0 0 L10 0 L10 10 Z L-10 0 L-10 -10".parse().unwrap();
        let polygons = path.polygonize(0.25);
        let rings: Vec<&Vec<Point>> = polygons.outlines.iter().chain(polygons.holes.iter()).collect();
        assert_eq!(rings.len(), 2);
        let second = rings
            .iter()
            .find(|ring| ring.contains(&Point::new(-10.0, 0.0)))
            .unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second[0], Point::new(0.0, 0.0));
    }

    #[test]
    fn test_parse_failure_returns_no_path() {
        assert!("M0 0 L5 5 Q".parse::<Path2D>().is_err());
    }
}

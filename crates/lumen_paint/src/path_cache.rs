//! Path tessellation
//!
//! The [`PathCache`] owns the canvas command stream. On fill or stroke it
//! flattens the stream into polylines, computes join geometry and expands
//! every subpath into anti-aliased triangle strips held in one shared vertex
//! buffer.
//!
//! ```text
//!  commands ──flatten_paths──▶ points + subpaths ──calculate_joins──▶ extrusions
//!                                                          │
//!                                    expand_fill / expand_stroke
//!                                                          ▼
//!                                      vertex buffer (ranges per subpath)
//! ```
//!
//! Commands are stored already transformed into canvas space, so the
//! tessellated output can be handed to a backend as is.

use std::f32::consts::PI;
use std::ops::Range;

use bitflags::bitflags;
use lumen_core::{Affine2D, Point};

use crate::backend::{PathList, Vertex};
use crate::dash;
use crate::flatten::tessellate_bezier;
use crate::paint::{FillRule, LineCap, LineJoin, Winding};

const INIT_BOUNDS: [f32; 4] = [1e6, 1e6, -1e6, -1e6];

/// A single entry of the canvas command stream
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    MoveTo(Point),
    LineTo(Point),
    /// Cubic Bezier: two control points then the end point
    BezierTo(Point, Point, Point),
    Close,
    /// Desired winding of the current subpath
    Winding(Winding),
}

impl Command {
    /// Copy of this command with every coordinate mapped through `transform`
    pub fn transformed(self, transform: &Affine2D) -> Command {
        match self {
            Command::MoveTo(p) => Command::MoveTo(transform.transform_point(p)),
            Command::LineTo(p) => Command::LineTo(transform.transform_point(p)),
            Command::BezierTo(c1, c2, p) => Command::BezierTo(
                transform.transform_point(c1),
                transform.transform_point(c2),
                transform.transform_point(p),
            ),
            other => other,
        }
    }

    /// Pen position after this command, if it moves the pen
    pub fn end_point(&self) -> Option<Point> {
        match *self {
            Command::MoveTo(p) | Command::LineTo(p) | Command::BezierTo(_, _, p) => Some(p),
            _ => None,
        }
    }
}

bitflags! {
    /// Per-point classification used by join and cap generation
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PointFlags: u8 {
        /// The point is a vertex of the source path, not a curve sample
        const CORNER = 0x01;
        /// The path turns left here
        const LEFT = 0x02;
        /// The outer side of the join is beveled
        const BEVEL = 0x04;
        /// The inner side of the join is too tight for a miter
        const INNER_BEVEL = 0x08;
    }
}

/// A flattened polyline point
///
/// `dx`/`dy` is the unit direction to the next point and `len` the distance
/// to it; `dmx`/`dmy` is the scaled miter extrusion.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatPoint {
    pub pos: Point,
    pub dx: f32,
    pub dy: f32,
    pub len: f32,
    pub dmx: f32,
    pub dmy: f32,
    pub flags: PointFlags,
}

impl FlatPoint {
    pub fn new(pos: Point, flags: PointFlags) -> Self {
        Self {
            pos,
            flags,
            ..Default::default()
        }
    }
}

/// One flattened subpath
///
/// `first`/`count` index into the cache's point buffer; `fill` and `stroke`
/// are vertex ranges filled in by expansion. For fills, `stroke` holds the
/// anti-alias fringe strip.
#[derive(Clone, Debug, PartialEq)]
pub struct SubPath {
    pub first: usize,
    pub count: usize,
    pub closed: bool,
    pub bevel_count: usize,
    pub convex: bool,
    pub winding: Winding,
    pub fill: Range<usize>,
    pub stroke: Range<usize>,
}

impl SubPath {
    pub(crate) fn new(first: usize) -> Self {
        Self {
            first,
            count: 0,
            closed: false,
            bevel_count: 0,
            convex: false,
            winding: Winding::Ccw,
            fill: 0..0,
            stroke: 0..0,
        }
    }
}

/// Command stream plus tessellation scratch space
///
/// All buffers are reused across frames; they only grow.
pub struct PathCache {
    commands: Vec<Command>,
    last_point: Point,
    points: Vec<FlatPoint>,
    paths: Vec<SubPath>,
    verts: Vec<Vertex>,
    dash_points: Vec<FlatPoint>,
    dash_paths: Vec<SubPath>,
    bounds: [f32; 4],
    tess_tol: f32,
    dist_tol: f32,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCache {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            last_point: Point::ZERO,
            points: Vec::new(),
            paths: Vec::new(),
            verts: Vec::new(),
            dash_points: Vec::new(),
            dash_paths: Vec::new(),
            bounds: INIT_BOUNDS,
            tess_tol: 0.25,
            dist_tol: 0.01,
        }
    }

    pub fn set_tolerances(&mut self, tessellation: f32, distance: f32) {
        self.tess_tol = tessellation;
        self.dist_tol = distance;
    }

    pub fn tessellation_tolerance(&self) -> f32 {
        self.tess_tol
    }

    pub fn distance_tolerance(&self) -> f32 {
        self.dist_tol
    }

    /// Drop the command stream and all derived geometry
    pub fn clear(&mut self) {
        self.commands.clear();
        self.points.clear();
        self.paths.clear();
        self.verts.clear();
        self.last_point = Point::ZERO;
        self.bounds = INIT_BOUNDS;
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn has_commands(&self) -> bool {
        !self.commands.is_empty()
    }

    /// Current pen position in canvas space
    pub fn last_point(&self) -> Point {
        self.last_point
    }

    /// Append `commands`, mapping coordinates through `transform`
    pub fn append_commands(&mut self, commands: &[Command], transform: &Affine2D) {
        self.commands.reserve(commands.len());
        for command in commands {
            let command = command.transformed(transform);
            if let Some(p) = command.end_point() {
                self.last_point = p;
            }
            self.commands.push(command);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Flattening
    // ─────────────────────────────────────────────────────────────────────────

    /// Turn the command stream into polylines.
    ///
    /// With `enforce_winding` every subpath with more than two points is
    /// reversed if its signed area disagrees with its requested winding. A
    /// usable `dash` pattern replaces each subpath by its dashes.
    pub fn flatten_paths(&mut self, enforce_winding: bool, dash: &[f32], dash_offset: f32) {
        self.points.clear();
        self.paths.clear();
        self.verts.clear();

        let commands = std::mem::take(&mut self.commands);
        for command in &commands {
            match *command {
                Command::MoveTo(p) => {
                    self.add_path();
                    self.add_point(p, PointFlags::CORNER);
                }
                Command::LineTo(p) => self.add_point(p, PointFlags::CORNER),
                Command::BezierTo(c1, c2, p) => self.add_bezier(c1, c2, p),
                Command::Close => self.close_path(),
                Command::Winding(winding) => {
                    if let Some(path) = self.paths.last_mut() {
                        path.winding = winding;
                    }
                }
            }
        }
        self.commands = commands;

        self.finish_paths(enforce_winding);

        if let Some(pattern) = dash::normalize_pattern(dash) {
            self.apply_dash(&pattern, dash_offset);
        }

        self.compute_segments();

        tracing::trace!(
            "flattened {} commands into {} subpaths ({} points)",
            self.commands.len(),
            self.paths.len(),
            self.points.len()
        );
    }

    fn add_path(&mut self) {
        self.paths.push(SubPath::new(self.points.len()));
    }

    fn add_point(&mut self, pos: Point, flags: PointFlags) {
        if self.paths.is_empty() {
            self.add_path();
        }

        let dist_tol = self.dist_tol;
        let Some(path) = self.paths.last_mut() else {
            return;
        };

        if path.count > 0 {
            if let Some(last) = self.points.last_mut() {
                if last.pos.approx_eq(pos, dist_tol) {
                    last.flags |= flags;
                    return;
                }
            }
        }

        self.points.push(FlatPoint::new(pos, flags));
        path.count += 1;
    }

    fn current_point(&self) -> Option<Point> {
        let path = self.paths.last()?;
        if path.count == 0 {
            return None;
        }
        self.points.last().map(|p| p.pos)
    }

    fn add_bezier(&mut self, c1: Point, c2: Point, p: Point) {
        let Some(last) = self.current_point() else {
            self.add_point(p, PointFlags::CORNER);
            return;
        };

        let tol = self.dist_tol;
        let c1_degenerate = c1.approx_eq(last, tol) || c1.approx_eq(p, tol);
        let c2_degenerate = c2.approx_eq(last, tol) || c2.approx_eq(p, tol);
        if c1_degenerate && c2_degenerate {
            self.add_point(p, PointFlags::CORNER);
            return;
        }

        let tess_tol = self.tess_tol;
        tessellate_bezier(last, c1, c2, p, tess_tol, &mut |pt, is_end| {
            let flags = if is_end {
                PointFlags::CORNER
            } else {
                PointFlags::empty()
            };
            self.add_point(pt, flags);
        });
    }

    fn close_path(&mut self) {
        let Some(path) = self.paths.last() else {
            return;
        };
        if path.count == 0 {
            return;
        }

        let first = self.points[path.first].pos;
        self.add_point(first, PointFlags::CORNER);

        if let Some(path) = self.paths.last_mut() {
            path.closed = true;
        }
    }

    fn finish_paths(&mut self, enforce_winding: bool) {
        let dist_tol = self.dist_tol;

        for path in self.paths.iter_mut() {
            if path.count >= 2 {
                let first = self.points[path.first].pos;
                let last = self.points[path.first + path.count - 1].pos;
                if last.approx_eq(first, dist_tol) {
                    path.count -= 1;
                    path.closed = true;
                }
            }

            let pts = &mut self.points[path.first..path.first + path.count];
            if enforce_winding && pts.len() > 2 {
                let area = poly_area(pts);
                let reverse = match path.winding {
                    Winding::Ccw => area < 0.0,
                    Winding::Cw => area > 0.0,
                };
                if reverse {
                    pts.reverse();
                }
            }
        }

        self.paths.retain(|path| path.count >= 2);
    }

    fn apply_dash(&mut self, pattern: &[f32], offset: f32) {
        self.dash_points.clear();
        self.dash_paths.clear();

        for path in &self.paths {
            let src = &self.points[path.first..path.first + path.count];
            let dashed = dash::dash_polyline(
                src,
                path.closed,
                path.winding,
                pattern,
                offset,
                self.dist_tol,
                &mut self.dash_points,
                &mut self.dash_paths,
            );

            if !dashed {
                let first = self.dash_points.len();
                self.dash_points.extend_from_slice(src);
                self.dash_paths.push(SubPath {
                    first,
                    ..path.clone()
                });
            }
        }

        std::mem::swap(&mut self.points, &mut self.dash_points);
        std::mem::swap(&mut self.paths, &mut self.dash_paths);
    }

    fn compute_segments(&mut self) {
        let mut bounds = INIT_BOUNDS;

        for path in &self.paths {
            let pts = &mut self.points[path.first..path.first + path.count];
            let n = pts.len();

            for i in 0..n {
                let next = pts[(i + 1) % n].pos;
                let p = &mut pts[i];
                let (dx, dy, len) = normalize(next.x - p.pos.x, next.y - p.pos.y);
                p.dx = dx;
                p.dy = dy;
                p.len = len;

                bounds[0] = bounds[0].min(p.pos.x);
                bounds[1] = bounds[1].min(p.pos.y);
                bounds[2] = bounds[2].max(p.pos.x);
                bounds[3] = bounds[3].max(p.pos.y);
            }
        }

        self.bounds = bounds;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Joins and expansion
    // ─────────────────────────────────────────────────────────────────────────

    /// Compute miter extrusions and classify every point for a stroke of
    /// half-width `w`
    pub fn calculate_joins(&mut self, w: f32, line_join: LineJoin, miter_limit: f32) {
        let iw = if w > 0.0 { 1.0 / w } else { 0.0 };

        for path in self.paths.iter_mut() {
            let pts = &mut self.points[path.first..path.first + path.count];
            let n = pts.len();
            let mut nleft = 0;
            path.bevel_count = 0;

            for i in 0..n {
                let p0 = pts[(i + n - 1) % n];
                let p1 = &mut pts[i];

                let dlx0 = p0.dy;
                let dly0 = -p0.dx;
                let dlx1 = p1.dy;
                let dly1 = -p1.dx;

                p1.dmx = (dlx0 + dlx1) * 0.5;
                p1.dmy = (dly0 + dly1) * 0.5;
                let dmr2 = p1.dmx * p1.dmx + p1.dmy * p1.dmy;
                if dmr2 > 0.000001 {
                    let scale = (1.0 / dmr2).min(600.0);
                    p1.dmx *= scale;
                    p1.dmy *= scale;
                }

                p1.flags &= PointFlags::CORNER;

                let cross = p1.dx * p0.dy - p0.dx * p1.dy;
                if cross > 0.0 {
                    nleft += 1;
                    p1.flags |= PointFlags::LEFT;
                }

                let limit = (p0.len.min(p1.len) * iw).max(1.01);
                if dmr2 * limit * limit < 1.0 {
                    p1.flags |= PointFlags::INNER_BEVEL;
                }

                if p1.flags.contains(PointFlags::CORNER)
                    && (dmr2 * miter_limit * miter_limit < 1.0
                        || line_join == LineJoin::Bevel
                        || line_join == LineJoin::Round)
                {
                    p1.flags |= PointFlags::BEVEL;
                }

                if p1.flags.intersects(PointFlags::BEVEL | PointFlags::INNER_BEVEL) {
                    path.bevel_count += 1;
                }
            }

            path.convex = nleft == n;
        }
    }

    /// Expand flattened subpaths into fill geometry plus an anti-alias
    /// fringe of width `w`. `w == 0` disables the fringe.
    pub fn expand_fill(&mut self, w: f32, line_join: LineJoin, miter_limit: f32) {
        let woff = 0.5 * w;
        let fringe = w > 0.0;

        self.calculate_joins(w, line_join, miter_limit);

        let mut estimate = 0;
        for path in &self.paths {
            estimate += path.count + path.bevel_count + 1;
            if fringe {
                estimate += (path.count + path.bevel_count * 5 + 1) * 2;
            }
        }
        self.verts.clear();
        self.verts.reserve(estimate);

        let convex = self.paths.len() == 1 && self.paths[0].convex;
        let verts = &mut self.verts;

        for path in self.paths.iter_mut() {
            let pts = &self.points[path.first..path.first + path.count];
            let n = pts.len();

            let start = verts.len();
            if fringe {
                for i in 0..n {
                    let p0 = &pts[(i + n - 1) % n];
                    let p1 = &pts[i];
                    if p1.flags.contains(PointFlags::BEVEL) {
                        if p1.flags.contains(PointFlags::LEFT) {
                            verts.push(Vertex::new(
                                p1.pos.x + p1.dmx * woff,
                                p1.pos.y + p1.dmy * woff,
                                0.5,
                                1.0,
                            ));
                        } else {
                            let (dlx0, dly0) = (p0.dy, -p0.dx);
                            let (dlx1, dly1) = (p1.dy, -p1.dx);
                            verts.push(Vertex::new(p1.pos.x + dlx0 * woff, p1.pos.y + dly0 * woff, 0.5, 1.0));
                            verts.push(Vertex::new(p1.pos.x + dlx1 * woff, p1.pos.y + dly1 * woff, 0.5, 1.0));
                        }
                    } else {
                        verts.push(Vertex::new(
                            p1.pos.x + p1.dmx * woff,
                            p1.pos.y + p1.dmy * woff,
                            0.5,
                            1.0,
                        ));
                    }
                }
            } else {
                for p in pts {
                    verts.push(Vertex::new(p.pos.x, p.pos.y, 0.5, 1.0));
                }
            }
            path.fill = start..verts.len();

            if fringe {
                let (mut lw, rw) = (w + woff, w - woff);
                let (mut lu, ru) = (0.0, 1.0);

                // A lone convex path needs no inner fringe
                if convex {
                    lw = woff;
                    lu = 0.5;
                }

                let start = verts.len();
                for i in 0..n {
                    let p0 = &pts[(i + n - 1) % n];
                    let p1 = &pts[i];
                    if p1.flags.intersects(PointFlags::BEVEL | PointFlags::INNER_BEVEL) {
                        bevel_join(verts, p0, p1, lw, rw, lu, ru);
                    } else {
                        verts.push(Vertex::new(p1.pos.x + p1.dmx * lw, p1.pos.y + p1.dmy * lw, lu, 1.0));
                        verts.push(Vertex::new(p1.pos.x - p1.dmx * rw, p1.pos.y - p1.dmy * rw, ru, 1.0));
                    }
                }

                let (v0, v1) = (verts[start], verts[start + 1]);
                verts.push(Vertex::new(v0.x, v0.y, lu, 1.0));
                verts.push(Vertex::new(v1.x, v1.y, ru, 1.0));

                path.stroke = start..verts.len();
            } else {
                path.stroke = verts.len()..verts.len();
            }
        }
    }

    /// Expand flattened subpaths into triangle strips for a stroke of
    /// half-width `w`, with an anti-alias fringe of width `fringe`
    pub fn expand_stroke(
        &mut self,
        w: f32,
        fringe: f32,
        line_cap: LineCap,
        line_join: LineJoin,
        miter_limit: f32,
    ) {
        let aa = fringe;
        let (mut u0, mut u1) = (0.0, 1.0);
        let ncap = curve_divisions(w, PI, self.tess_tol);

        let w = w + aa * 0.5;

        // Without anti-aliasing the whole stroke samples the center
        if aa == 0.0 {
            u0 = 0.5;
            u1 = 0.5;
        }

        self.calculate_joins(w, line_join, miter_limit);

        let mut estimate = 0;
        for path in &self.paths {
            estimate += if line_join == LineJoin::Round {
                (path.count + path.bevel_count * (ncap + 2) + 1) * 2
            } else {
                (path.count + path.bevel_count * 5 + 1) * 2
            };
            if !path.closed {
                estimate += if line_cap == LineCap::Round {
                    (ncap * 2 + 2) * 2
                } else {
                    (3 + 3) * 2
                };
            }
        }
        self.verts.clear();
        self.verts.reserve(estimate);

        let verts = &mut self.verts;

        for path in self.paths.iter_mut() {
            let pts = &self.points[path.first..path.first + path.count];
            let n = pts.len();
            let closed = path.closed;

            path.fill = 0..0;
            let start = verts.len();

            let (s, e, mut i0, mut i1) = if closed { (0, n, n - 1, 0) } else { (1, n - 1, 0, 1) };

            if !closed {
                let p0 = &pts[i0];
                let p1 = &pts[i1];
                let (dx, dy, _) = normalize(p1.pos.x - p0.pos.x, p1.pos.y - p0.pos.y);
                match line_cap {
                    LineCap::Butt => butt_cap_start(verts, p0, dx, dy, w, -aa * 0.5, aa, u0, u1),
                    LineCap::Square => butt_cap_start(verts, p0, dx, dy, w, w - aa, aa, u0, u1),
                    LineCap::Round => round_cap_start(verts, p0, dx, dy, w, ncap, u0, u1),
                }
            }

            for _ in s..e {
                let p0 = &pts[i0];
                let p1 = &pts[i1];
                if p1.flags.intersects(PointFlags::BEVEL | PointFlags::INNER_BEVEL) {
                    if line_join == LineJoin::Round {
                        round_join(verts, p0, p1, w, w, u0, u1, ncap);
                    } else {
                        bevel_join(verts, p0, p1, w, w, u0, u1);
                    }
                } else {
                    verts.push(Vertex::new(p1.pos.x + p1.dmx * w, p1.pos.y + p1.dmy * w, u0, 1.0));
                    verts.push(Vertex::new(p1.pos.x - p1.dmx * w, p1.pos.y - p1.dmy * w, u1, 1.0));
                }
                i0 = i1;
                i1 += 1;
            }

            if closed {
                let (v0, v1) = (verts[start], verts[start + 1]);
                verts.push(Vertex::new(v0.x, v0.y, u0, 1.0));
                verts.push(Vertex::new(v1.x, v1.y, u1, 1.0));
            } else {
                let p0 = &pts[i0];
                let p1 = &pts[i1];
                let (dx, dy, _) = normalize(p1.pos.x - p0.pos.x, p1.pos.y - p0.pos.y);
                match line_cap {
                    LineCap::Butt => butt_cap_end(verts, p1, dx, dy, w, -aa * 0.5, aa, u0, u1),
                    LineCap::Square => butt_cap_end(verts, p1, dx, dy, w, w - aa, aa, u0, u1),
                    LineCap::Round => round_cap_end(verts, p1, dx, dy, w, ncap, u0, u1),
                }
            }

            path.stroke = start..verts.len();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn paths(&self) -> &[SubPath] {
        &self.paths
    }

    pub fn points(&self) -> &[FlatPoint] {
        &self.points
    }

    pub fn path_points(&self, path: &SubPath) -> &[FlatPoint] {
        &self.points[path.first..path.first + path.count]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.verts
    }

    pub fn fill_vertices(&self, path: &SubPath) -> &[Vertex] {
        &self.verts[path.fill.clone()]
    }

    pub fn stroke_vertices(&self, path: &SubPath) -> &[Vertex] {
        &self.verts[path.stroke.clone()]
    }

    /// `[min_x, min_y, max_x, max_y]` of the last flattening
    pub fn bounds(&self) -> [f32; 4] {
        self.bounds
    }

    /// Borrowed view of the tessellated subpaths for a backend call
    pub fn path_list(&self) -> PathList<'_> {
        PathList::new(&self.paths, &self.verts)
    }

    /// Hit-test a canvas-space point against the last flattening
    pub fn contains_point(&self, x: f32, y: f32, fill_rule: FillRule) -> bool {
        if self.paths.is_empty()
            || x < self.bounds[0]
            || y < self.bounds[1]
            || x > self.bounds[2]
            || y > self.bounds[3]
        {
            return false;
        }

        let mut winding = 0i32;
        for path in &self.paths {
            winding += winding_number(self.path_points(path), x, y);
        }

        match fill_rule {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Geometry helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize `(x, y)`, returning the unit vector and the original length
fn normalize(x: f32, y: f32) -> (f32, f32, f32) {
    let d = (x * x + y * y).sqrt();
    if d > 1e-6 {
        let id = 1.0 / d;
        (x * id, y * id, d)
    } else {
        (x, y, d)
    }
}

fn triarea2(a: Point, b: Point, c: Point) -> f32 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let acx = c.x - a.x;
    let acy = c.y - a.y;
    acx * aby - abx * acy
}

/// Signed area of a polyline; positive for solid (counter-clockwise) paths
pub(crate) fn poly_area(pts: &[FlatPoint]) -> f32 {
    if pts.len() < 3 {
        return 0.0;
    }

    let a = pts[0].pos;
    let area: f32 = pts[1..]
        .windows(2)
        .map(|w| triarea2(a, w[0].pos, w[1].pos))
        .sum();
    area * 0.5
}

fn winding_number(pts: &[FlatPoint], x: f32, y: f32) -> i32 {
    let n = pts.len();
    let mut winding = 0;

    for i in 0..n {
        let a = pts[i].pos;
        let b = pts[(i + 1) % n].pos;
        let side = (b.x - a.x) * (y - a.y) - (x - a.x) * (b.y - a.y);
        if a.y <= y {
            if b.y > y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= y && side < 0.0 {
            winding -= 1;
        }
    }

    winding
}

/// Segments needed to approximate an arc of radius `r` within `tol`
pub(crate) fn curve_divisions(r: f32, arc: f32, tol: f32) -> usize {
    let da = (r / (r + tol)).acos() * 2.0;
    ((arc / da).ceil() as usize).max(2)
}

fn choose_bevel(bevel: bool, p0: &FlatPoint, p1: &FlatPoint, w: f32) -> (f32, f32, f32, f32) {
    if bevel {
        (
            p1.pos.x + p0.dy * w,
            p1.pos.y - p0.dx * w,
            p1.pos.x + p1.dy * w,
            p1.pos.y - p1.dx * w,
        )
    } else {
        let x = p1.pos.x + p1.dmx * w;
        let y = p1.pos.y + p1.dmy * w;
        (x, y, x, y)
    }
}

fn bevel_join(verts: &mut Vec<Vertex>, p0: &FlatPoint, p1: &FlatPoint, lw: f32, rw: f32, lu: f32, ru: f32) {
    let (dlx0, dly0) = (p0.dy, -p0.dx);
    let (dlx1, dly1) = (p1.dy, -p1.dx);
    let inner_bevel = p1.flags.contains(PointFlags::INNER_BEVEL);
    let (px, py) = (p1.pos.x, p1.pos.y);

    if p1.flags.contains(PointFlags::LEFT) {
        let (lx0, ly0, lx1, ly1) = choose_bevel(inner_bevel, p0, p1, lw);

        verts.push(Vertex::new(lx0, ly0, lu, 1.0));
        verts.push(Vertex::new(px - dlx0 * rw, py - dly0 * rw, ru, 1.0));

        if p1.flags.contains(PointFlags::BEVEL) {
            verts.push(Vertex::new(lx0, ly0, lu, 1.0));
            verts.push(Vertex::new(px - dlx0 * rw, py - dly0 * rw, ru, 1.0));

            verts.push(Vertex::new(lx1, ly1, lu, 1.0));
            verts.push(Vertex::new(px - dlx1 * rw, py - dly1 * rw, ru, 1.0));
        } else {
            let rx0 = px - p1.dmx * rw;
            let ry0 = py - p1.dmy * rw;

            verts.push(Vertex::new(px, py, 0.5, 1.0));
            verts.push(Vertex::new(px - dlx0 * rw, py - dly0 * rw, ru, 1.0));

            verts.push(Vertex::new(rx0, ry0, ru, 1.0));
            verts.push(Vertex::new(rx0, ry0, ru, 1.0));

            verts.push(Vertex::new(px, py, 0.5, 1.0));
            verts.push(Vertex::new(px - dlx1 * rw, py - dly1 * rw, ru, 1.0));
        }

        verts.push(Vertex::new(lx1, ly1, lu, 1.0));
        verts.push(Vertex::new(px - dlx1 * rw, py - dly1 * rw, ru, 1.0));
    } else {
        let (rx0, ry0, rx1, ry1) = choose_bevel(inner_bevel, p0, p1, -rw);

        verts.push(Vertex::new(px + dlx0 * lw, py + dly0 * lw, lu, 1.0));
        verts.push(Vertex::new(rx0, ry0, ru, 1.0));

        if p1.flags.contains(PointFlags::BEVEL) {
            verts.push(Vertex::new(px + dlx0 * lw, py + dly0 * lw, lu, 1.0));
            verts.push(Vertex::new(rx0, ry0, ru, 1.0));

            verts.push(Vertex::new(px + dlx1 * lw, py + dly1 * lw, lu, 1.0));
            verts.push(Vertex::new(rx1, ry1, ru, 1.0));
        } else {
            let lx0 = px + p1.dmx * lw;
            let ly0 = py + p1.dmy * lw;

            verts.push(Vertex::new(px + dlx0 * lw, py + dly0 * lw, lu, 1.0));
            verts.push(Vertex::new(px, py, 0.5, 1.0));

            verts.push(Vertex::new(lx0, ly0, lu, 1.0));
            verts.push(Vertex::new(lx0, ly0, lu, 1.0));

            verts.push(Vertex::new(px + dlx1 * lw, py + dly1 * lw, lu, 1.0));
            verts.push(Vertex::new(px, py, 0.5, 1.0));
        }

        verts.push(Vertex::new(px + dlx1 * lw, py + dly1 * lw, lu, 1.0));
        verts.push(Vertex::new(rx1, ry1, ru, 1.0));
    }
}

#[allow(clippy::too_many_arguments)]
fn round_join(
    verts: &mut Vec<Vertex>,
    p0: &FlatPoint,
    p1: &FlatPoint,
    lw: f32,
    rw: f32,
    lu: f32,
    ru: f32,
    ncap: usize,
) {
    let (dlx0, dly0) = (p0.dy, -p0.dx);
    let (dlx1, dly1) = (p1.dy, -p1.dx);
    let (px, py) = (p1.pos.x, p1.pos.y);

    if p1.flags.contains(PointFlags::LEFT) {
        let (lx0, ly0, lx1, ly1) = choose_bevel(p1.flags.contains(PointFlags::INNER_BEVEL), p0, p1, lw);
        let a0 = (-dly0).atan2(-dlx0);
        let mut a1 = (-dly1).atan2(-dlx1);
        if a1 > a0 {
            a1 -= PI * 2.0;
        }

        verts.push(Vertex::new(lx0, ly0, lu, 1.0));
        verts.push(Vertex::new(px - dlx0 * rw, py - dly0 * rw, ru, 1.0));

        let n = ((((a0 - a1) / PI) * ncap as f32).ceil() as usize).clamp(2, ncap);
        for i in 0..n {
            let u = i as f32 / (n - 1) as f32;
            let a = a0 + u * (a1 - a0);
            let rx = px + a.cos() * rw;
            let ry = py + a.sin() * rw;
            verts.push(Vertex::new(px, py, 0.5, 1.0));
            verts.push(Vertex::new(rx, ry, ru, 1.0));
        }

        verts.push(Vertex::new(lx1, ly1, lu, 1.0));
        verts.push(Vertex::new(px - dlx1 * rw, py - dly1 * rw, ru, 1.0));
    } else {
        let (rx0, ry0, rx1, ry1) = choose_bevel(p1.flags.contains(PointFlags::INNER_BEVEL), p0, p1, -rw);
        let a0 = dly0.atan2(dlx0);
        let mut a1 = dly1.atan2(dlx1);
        if a1 < a0 {
            a1 += PI * 2.0;
        }

        verts.push(Vertex::new(px + dlx0 * rw, py + dly0 * rw, lu, 1.0));
        verts.push(Vertex::new(rx0, ry0, ru, 1.0));

        let n = ((((a1 - a0) / PI) * ncap as f32).ceil() as usize).clamp(2, ncap);
        for i in 0..n {
            let u = i as f32 / (n - 1) as f32;
            let a = a0 + u * (a1 - a0);
            let lx = px + a.cos() * lw;
            let ly = py + a.sin() * lw;
            verts.push(Vertex::new(lx, ly, lu, 1.0));
            verts.push(Vertex::new(px, py, 0.5, 1.0));
        }

        verts.push(Vertex::new(px + dlx1 * rw, py + dly1 * rw, lu, 1.0));
        verts.push(Vertex::new(rx1, ry1, ru, 1.0));
    }
}

#[allow(clippy::too_many_arguments)]
fn butt_cap_start(
    verts: &mut Vec<Vertex>,
    p: &FlatPoint,
    dx: f32,
    dy: f32,
    w: f32,
    d: f32,
    aa: f32,
    u0: f32,
    u1: f32,
) {
    let px = p.pos.x - dx * d;
    let py = p.pos.y - dy * d;
    let (dlx, dly) = (dy, -dx);

    verts.push(Vertex::new(px + dlx * w - dx * aa, py + dly * w - dy * aa, u0, 0.0));
    verts.push(Vertex::new(px - dlx * w - dx * aa, py - dly * w - dy * aa, u1, 0.0));
    verts.push(Vertex::new(px + dlx * w, py + dly * w, u0, 1.0));
    verts.push(Vertex::new(px - dlx * w, py - dly * w, u1, 1.0));
}

#[allow(clippy::too_many_arguments)]
fn butt_cap_end(
    verts: &mut Vec<Vertex>,
    p: &FlatPoint,
    dx: f32,
    dy: f32,
    w: f32,
    d: f32,
    aa: f32,
    u0: f32,
    u1: f32,
) {
    let px = p.pos.x + dx * d;
    let py = p.pos.y + dy * d;
    let (dlx, dly) = (dy, -dx);

    verts.push(Vertex::new(px + dlx * w, py + dly * w, u0, 1.0));
    verts.push(Vertex::new(px - dlx * w, py - dly * w, u1, 1.0));
    verts.push(Vertex::new(px + dlx * w + dx * aa, py + dly * w + dy * aa, u0, 0.0));
    verts.push(Vertex::new(px - dlx * w + dx * aa, py - dly * w + dy * aa, u1, 0.0));
}

#[allow(clippy::too_many_arguments)]
fn round_cap_start(
    verts: &mut Vec<Vertex>,
    p: &FlatPoint,
    dx: f32,
    dy: f32,
    w: f32,
    ncap: usize,
    u0: f32,
    u1: f32,
) {
    let (px, py) = (p.pos.x, p.pos.y);
    let (dlx, dly) = (dy, -dx);

    for i in 0..ncap {
        let a = i as f32 / (ncap - 1) as f32 * PI;
        let (ax, ay) = (a.cos() * w, a.sin() * w);
        verts.push(Vertex::new(px - dlx * ax - dx * ay, py - dly * ax - dy * ay, u0, 1.0));
        verts.push(Vertex::new(px, py, 0.5, 1.0));
    }

    verts.push(Vertex::new(px + dlx * w, py + dly * w, u0, 1.0));
    verts.push(Vertex::new(px - dlx * w, py - dly * w, u1, 1.0));
}

#[allow(clippy::too_many_arguments)]
fn round_cap_end(
    verts: &mut Vec<Vertex>,
    p: &FlatPoint,
    dx: f32,
    dy: f32,
    w: f32,
    ncap: usize,
    u0: f32,
    u1: f32,
) {
    let (px, py) = (p.pos.x, p.pos.y);
    let (dlx, dly) = (dy, -dx);

    verts.push(Vertex::new(px + dlx * w, py + dly * w, u0, 1.0));
    verts.push(Vertex::new(px - dlx * w, py - dly * w, u1, 1.0));

    for i in 0..ncap {
        let a = i as f32 / (ncap - 1) as f32 * PI;
        let (ax, ay) = (a.cos() * w, a.sin() * w);
        verts.push(Vertex::new(px, py, 0.5, 1.0));
        verts.push(Vertex::new(px - dlx * ax + dx * ay, py - dly * ax + dy * ay, u0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_commands(x: f32, y: f32, w: f32, h: f32) -> Vec<Command> {
        vec![
            Command::MoveTo(Point::new(x, y)),
            Command::LineTo(Point::new(x, y + h)),
            Command::LineTo(Point::new(x + w, y + h)),
            Command::LineTo(Point::new(x + w, y)),
            Command::Close,
        ]
    }

    fn cache_with(commands: &[Command]) -> PathCache {
        let mut cache = PathCache::new();
        cache.append_commands(commands, &Affine2D::IDENTITY);
        cache
    }

    #[test]
    fn test_rect_flattens_to_closed_convex_quad() {
        let mut cache = cache_with(&rect_commands(10.0, 10.0, 100.0, 50.0));
        cache.flatten_paths(true, &[], 0.0);
        cache.expand_fill(1.0, LineJoin::Miter, 2.4);

        assert_eq!(cache.paths().len(), 1);
        let path = &cache.paths()[0];
        assert_eq!(path.count, 4);
        assert!(path.closed);
        assert!(path.convex);
        assert!(cache.path_points(path).iter().all(|p| p.flags.contains(PointFlags::CORNER)));
        assert_eq!(cache.bounds(), [10.0, 10.0, 110.0, 60.0]);
        assert!(!path.fill.is_empty());
        assert!(!path.stroke.is_empty());
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let mut cache = cache_with(&rect_commands(0.0, 0.0, 20.0, 20.0));
        cache.flatten_paths(true, &[], 0.0);
        let first: Vec<FlatPoint> = cache.points().to_vec();
        let first_paths = cache.paths().to_vec();

        cache.flatten_paths(true, &[], 0.0);
        assert_eq!(cache.points(), first.as_slice());
        assert_eq!(cache.paths(), first_paths.as_slice());
    }

    #[test]
    fn test_fill_enforces_requested_winding() {
        // clockwise input
        let commands = vec![
            Command::MoveTo(Point::new(0.0, 0.0)),
            Command::LineTo(Point::new(10.0, 0.0)),
            Command::LineTo(Point::new(10.0, 10.0)),
            Command::LineTo(Point::new(0.0, 10.0)),
            Command::Close,
        ];
        let mut cache = cache_with(&commands);
        cache.flatten_paths(true, &[], 0.0);
        let path = cache.paths()[0].clone();
        assert!(poly_area(cache.path_points(&path)) > 0.0);

        let mut holes = commands.clone();
        holes.push(Command::Winding(Winding::HOLE));
        let mut cache = cache_with(&holes);
        cache.flatten_paths(true, &[], 0.0);
        let path = cache.paths()[0].clone();
        assert!(poly_area(cache.path_points(&path)) < 0.0);

        // strokes keep the authored direction
        let mut cache = cache_with(&commands);
        cache.flatten_paths(false, &[], 0.0);
        let path = cache.paths()[0].clone();
        assert!(poly_area(cache.path_points(&path)) < 0.0);
    }

    #[test]
    fn test_degenerate_subpaths_are_dropped() {
        let commands = vec![
            Command::MoveTo(Point::new(5.0, 5.0)),
            Command::MoveTo(Point::new(0.0, 0.0)),
            Command::LineTo(Point::new(0.001, 0.0)),
            Command::MoveTo(Point::new(0.0, 0.0)),
            Command::LineTo(Point::new(50.0, 0.0)),
        ];
        let mut cache = cache_with(&commands);
        cache.flatten_paths(false, &[], 0.0);
        assert_eq!(cache.paths().len(), 1);
        assert_eq!(cache.paths()[0].count, 2);
    }

    #[test]
    fn test_degenerate_bezier_becomes_line() {
        let commands = vec![
            Command::MoveTo(Point::new(0.0, 0.0)),
            Command::BezierTo(Point::new(0.0, 0.0), Point::new(40.0, 0.0), Point::new(40.0, 0.0)),
        ];
        let mut cache = cache_with(&commands);
        cache.flatten_paths(false, &[], 0.0);
        assert_eq!(cache.paths()[0].count, 2);
    }

    #[test]
    fn test_commands_are_transformed_on_append() {
        let mut cache = PathCache::new();
        cache.append_commands(
            &[Command::MoveTo(Point::new(1.0, 2.0))],
            &Affine2D::translation(10.0, 20.0),
        );
        assert_eq!(cache.commands()[0], Command::MoveTo(Point::new(11.0, 22.0)));
        assert_eq!(cache.last_point(), Point::new(11.0, 22.0));
    }

    #[test]
    fn test_stroke_expansion_of_open_line() {
        let commands = vec![
            Command::MoveTo(Point::new(0.0, 0.0)),
            Command::LineTo(Point::new(100.0, 0.0)),
        ];
        let mut cache = cache_with(&commands);
        cache.flatten_paths(false, &[], 0.0);
        cache.expand_stroke(2.0, 1.0, LineCap::Butt, LineJoin::Miter, 10.0);

        let path = cache.paths()[0].clone();
        // two caps of four vertices each
        assert_eq!(path.stroke.len(), 8);
        assert!(path.fill.is_empty());
        for v in cache.stroke_vertices(&path) {
            assert!(v.y.abs() <= 2.5 + 1e-4);
        }
    }

    #[test]
    fn test_closed_stroke_loops_back() {
        let mut cache = cache_with(&rect_commands(0.0, 0.0, 10.0, 10.0));
        cache.flatten_paths(false, &[], 0.0);
        cache.expand_stroke(1.0, 1.0, LineCap::Butt, LineJoin::Miter, 10.0);

        let path = cache.paths()[0].clone();
        let verts = cache.stroke_vertices(&path);
        let n = verts.len();
        assert_eq!((verts[0].x, verts[0].y), (verts[n - 2].x, verts[n - 2].y));
        assert_eq!((verts[1].x, verts[1].y), (verts[n - 1].x, verts[n - 1].y));
    }

    #[test]
    fn test_round_join_marks_bevels() {
        let commands = vec![
            Command::MoveTo(Point::new(0.0, 0.0)),
            Command::LineTo(Point::new(50.0, 0.0)),
            Command::LineTo(Point::new(50.0, 50.0)),
        ];
        let mut cache = cache_with(&commands);
        cache.flatten_paths(false, &[], 0.0);
        cache.expand_stroke(4.0, 1.0, LineCap::Round, LineJoin::Round, 10.0);
        assert!(cache.paths()[0].bevel_count > 0);
    }

    #[test]
    fn test_returning_to_start_closes_without_close_command() {
        let commands = vec![
            Command::MoveTo(Point::new(0.0, 0.0)),
            Command::LineTo(Point::new(10.0, 0.0)),
            Command::LineTo(Point::new(10.0, 10.0)),
            Command::LineTo(Point::new(0.0, 0.0)),
        ];
        let mut cache = cache_with(&commands);
        cache.flatten_paths(false, &[], 0.0);

        let path = &cache.paths()[0];
        assert!(path.closed);
        assert_eq!(path.count, 3);
        assert_eq!(cache.path_points(path)[2].pos, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_square_cap_extends_past_endpoints() {
        let commands = vec![
            Command::MoveTo(Point::new(0.0, 0.0)),
            Command::LineTo(Point::new(100.0, 0.0)),
        ];
        let extent = |cap: LineCap| {
            let mut cache = cache_with(&commands);
            cache.flatten_paths(false, &[], 0.0);
            cache.expand_stroke(2.0, 1.0, cap, LineJoin::Miter, 10.0);
            let path = cache.paths()[0].clone();
            let verts = cache.stroke_vertices(&path);
            let min = verts.iter().map(|v| v.x).fold(f32::INFINITY, f32::min);
            let max = verts.iter().map(|v| v.x).fold(f32::NEG_INFINITY, f32::max);
            (verts.len(), min, max)
        };

        let (butt_len, butt_min, butt_max) = extent(LineCap::Butt);
        let (square_len, square_min, square_max) = extent(LineCap::Square);
        assert_eq!(square_len, butt_len);
        assert!((butt_min + 0.5).abs() < 1e-4);
        assert!((butt_max - 100.5).abs() < 1e-4);
        // half the stroke width beyond each end, plus the fringe
        assert!((square_min + 2.5).abs() < 1e-4);
        assert!((square_max - 102.5).abs() < 1e-4);
    }

    #[test]
    fn test_bevel_join_cuts_the_corner() {
        let commands = vec![
            Command::MoveTo(Point::new(0.0, 0.0)),
            Command::LineTo(Point::new(50.0, 0.0)),
            Command::LineTo(Point::new(50.0, 50.0)),
        ];
        let has_vertex = |cache: &PathCache, x: f32, y: f32| {
            let path = cache.paths()[0].clone();
            cache
                .stroke_vertices(&path)
                .iter()
                .any(|v| (v.x - x).abs() < 1e-3 && (v.y - y).abs() < 1e-3)
        };

        let mut miter = cache_with(&commands);
        miter.flatten_paths(false, &[], 0.0);
        miter.expand_stroke(2.0, 1.0, LineCap::Butt, LineJoin::Miter, 10.0);
        assert!(!miter.points()[1].flags.contains(PointFlags::BEVEL));
        assert!(has_vertex(&miter, 52.5, -2.5));

        let mut bevel = cache_with(&commands);
        bevel.flatten_paths(false, &[], 0.0);
        bevel.expand_stroke(2.0, 1.0, LineCap::Butt, LineJoin::Bevel, 10.0);
        assert!(bevel.points()[1].flags.contains(PointFlags::BEVEL));
        assert!(bevel.paths()[0].bevel_count > 0);
        assert!(has_vertex(&bevel, 50.0, -2.5));
        assert!(has_vertex(&bevel, 52.5, 0.0));
        assert!(!has_vertex(&bevel, 52.5, -2.5));
    }

    #[test]
    fn test_contains_point() {
        let mut commands = rect_commands(0.0, 0.0, 100.0, 100.0);
        commands.extend(rect_commands(25.0, 25.0, 50.0, 50.0));
        commands.push(Command::Winding(Winding::HOLE));

        let mut cache = cache_with(&commands);
        cache.flatten_paths(true, &[], 0.0);

        assert!(cache.contains_point(10.0, 10.0, FillRule::NonZero));
        assert!(!cache.contains_point(50.0, 50.0, FillRule::NonZero));
        assert!(!cache.contains_point(50.0, 50.0, FillRule::EvenOdd));
        assert!(!cache.contains_point(150.0, 50.0, FillRule::NonZero));
    }

    #[test]
    fn test_curve_divisions() {
        assert_eq!(curve_divisions(0.0, PI, 0.25), 2);
        assert!(curve_divisions(50.0, PI, 0.25) > 8);
    }
}

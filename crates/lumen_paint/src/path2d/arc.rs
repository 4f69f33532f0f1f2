//! Elliptical arc to cubic Bezier conversion (endpoint parameterization)

use std::f32::consts::{FRAC_PI_2, PI};

use lumen_core::{Point, Vec2};

use crate::path_cache::Command;

/// Append an SVG-style elliptical arc from `from` to `to` as cubic segments.
///
/// The radii are scaled up when they cannot span the endpoints. Zero radii
/// degrade to a straight line and coincident endpoints append nothing. Each
/// Bezier covers at most a quarter turn; the last one ends exactly on `to`.
pub(crate) fn append_arc(
    commands: &mut Vec<Command>,
    from: Point,
    radii: Vec2,
    x_rotation: f32,
    large_arc: bool,
    sweep: bool,
    to: Point,
) {
    if from == to {
        return;
    }

    let mut rx = radii.x.abs();
    let mut ry = radii.y.abs();
    if rx < 1e-6 || ry < 1e-6 {
        commands.push(Command::LineTo(to));
        return;
    }

    let (sin_phi, cos_phi) = x_rotation.sin_cos();

    // Midpoint in the rotated frame
    let dx2 = (from.x - to.x) * 0.5;
    let dy2 = (from.y - to.y) * 0.5;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let num = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
    let den = rx2 * y1p * y1p + ry2 * x1p * x1p;
    let mut coef = if den > 0.0 { (num / den).max(0.0).sqrt() } else { 0.0 };
    if large_arc == sweep {
        coef = -coef;
    }

    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * -(ry * x1p / rx);
    let cx = cos_phi * cxp - sin_phi * cyp + (from.x + to.x) * 0.5;
    let cy = sin_phi * cxp + cos_phi * cyp + (from.y + to.y) * 0.5;

    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;

    let theta1 = uy.atan2(ux);
    let mut delta = (ux * vy - uy * vx).atan2(ux * vx + uy * vy);
    if !sweep && delta > 0.0 {
        delta -= 2.0 * PI;
    } else if sweep && delta < 0.0 {
        delta += 2.0 * PI;
    }

    let segments = (delta.abs() / FRAC_PI_2 - 1e-4).ceil().max(1.0) as usize;
    let step = delta / segments as f32;
    let kappa = handle_length(step);

    let ellipse = |angle: f32| {
        let (sin_a, cos_a) = angle.sin_cos();
        let pos = Point::new(
            cx + rx * cos_a * cos_phi - ry * sin_a * sin_phi,
            cy + rx * cos_a * sin_phi + ry * sin_a * cos_phi,
        );
        let tangent = Vec2::new(
            -rx * sin_a * cos_phi - ry * cos_a * sin_phi,
            -rx * sin_a * sin_phi + ry * cos_a * cos_phi,
        );
        (pos, tangent)
    };

    let (mut p0, mut t0) = ellipse(theta1);
    for i in 0..segments {
        let (mut p1, t1) = ellipse(theta1 + step * (i + 1) as f32);
        if i + 1 == segments {
            p1 = to;
        }

        let c1 = p0 + t0 * kappa;
        let c2 = p1 - t1 * kappa;
        commands.push(Command::BezierTo(c1, c2, p1));

        p0 = p1;
        t0 = t1;
    }
}

/// Bezier handle length (as a fraction of the tangent) for an arc of
/// `sweep` radians: `4/3 * (1 - cos(h)) / sin(h)` with `h = sweep / 2`
pub(crate) fn handle_length(sweep: f32) -> f32 {
    let half = sweep * 0.5;
    let sin_half = half.sin();
    if sin_half.abs() < 1e-6 {
        sweep / 3.0
    } else {
        4.0 / 3.0 * (1.0 - half.cos()) / sin_half
    }
}

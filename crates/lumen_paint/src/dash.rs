//! Dash resampling of flattened polylines

use smallvec::SmallVec;

use crate::paint::Winding;
use crate::path_cache::{FlatPoint, PointFlags, SubPath};

/// Upper bound on pattern entries walked per subpath; finer patterns are
/// stroked solid
const MAX_DASH_SEGMENTS: f64 = 65_536.0;

/// Even-length copy of `pattern`, or `None` when it cannot dash
///
/// Odd patterns are repeated once (`[5]` dashes like `[5, 5]`). Negative,
/// non-finite or all-zero patterns disable dashing.
pub(crate) fn normalize_pattern(pattern: &[f32]) -> Option<SmallVec<[f32; 8]>> {
    if pattern.is_empty() {
        return None;
    }

    if pattern.iter().any(|v| !v.is_finite() || *v < 0.0) {
        tracing::debug!("ignoring dash pattern with negative or non-finite entries: {:?}", pattern);
        return None;
    }

    let mut normalized: SmallVec<[f32; 8]> = pattern.iter().copied().collect();
    if normalized.len() % 2 == 1 {
        normalized.extend_from_slice(pattern);
    }

    let period: f32 = normalized.iter().sum();
    if period <= 1e-6 {
        tracing::debug!("ignoring zero-length dash pattern");
        return None;
    }

    Some(normalized)
}

/// Split one flattened subpath into dashes.
///
/// The pattern is stretched so the subpath length holds a whole number of
/// periods. Even pattern entries are drawn, odd entries are gaps. Dashes are
/// appended to `points`/`paths` as open subpaths with corner flags at both
/// cuts. Returns `false` when the subpath is too short to dash or the pattern
/// would need more than `MAX_DASH_SEGMENTS` entries, in which case nothing
/// is appended.
#[allow(clippy::too_many_arguments)]
pub(crate) fn dash_polyline(
    src: &[FlatPoint],
    closed: bool,
    winding: Winding,
    pattern: &[f32],
    offset: f32,
    dist_tol: f32,
    points: &mut Vec<FlatPoint>,
    paths: &mut Vec<SubPath>,
) -> bool {
    let n = src.len();
    if n < 2 {
        return false;
    }

    let segments = if closed { n } else { n - 1 };
    let total: f64 = (0..segments)
        .map(|i| f64::from(src[i].pos.distance(src[(i + 1) % n].pos)))
        .sum();
    let period: f64 = pattern.iter().map(|&v| f64::from(v)).sum();

    if total <= f64::from(dist_tol) || period <= 1e-6 {
        return false;
    }

    let repetitions = (total / period).round().max(1.0);
    if repetitions * pattern.len() as f64 > MAX_DASH_SEGMENTS {
        tracing::debug!(
            "dash pattern too fine for a path of length {}, stroking solid",
            total
        );
        return false;
    }

    // Walk in f64 so every step advances even far along long paths
    let scale = total / (repetitions * period);
    let scaled_period = period * scale;
    let eps = scaled_period * 1e-9;
    let dash_len = |index: usize| f64::from(pattern[index]) * scale;

    // Locate the pattern element under the offset
    let mut index = 0;
    let mut phase = (f64::from(offset) * scale).rem_euclid(scaled_period);
    for _ in 0..pattern.len() {
        if phase < dash_len(index) {
            break;
        }
        phase -= dash_len(index);
        index = (index + 1) % pattern.len();
    }
    let mut remaining = (dash_len(index) - phase).max(0.0);
    let mut current: Option<SubPath> = None;

    for i in 0..segments {
        let a = src[i];
        let b = src[(i + 1) % n];
        let seg_len = f64::from(a.pos.distance(b.pos));
        if seg_len <= 0.0 {
            continue;
        }
        let at = |t: f64| a.pos.lerp(b.pos, (t / seg_len) as f32);

        let mut t = 0.0;
        while t < seg_len {
            let left = seg_len - t;
            let step = remaining.min(left);
            let reaches_end = step >= left;

            if index % 2 == 0 {
                if current.is_none() {
                    let mut dash = SubPath::new(points.len());
                    dash.winding = winding;
                    push_point(points, &mut dash, at(t), PointFlags::CORNER, dist_tol);
                    current = Some(dash);
                }

                if let Some(dash) = current.as_mut() {
                    let (pos, flags) = if reaches_end {
                        (b.pos, b.flags & PointFlags::CORNER)
                    } else {
                        (at(t + step), PointFlags::empty())
                    };
                    push_point(points, dash, pos, flags, dist_tol);
                }
            }

            remaining -= step;
            t = if reaches_end { seg_len } else { t + step };

            if remaining <= eps {
                if let Some(dash) = current.take() {
                    finish_dash(points, paths, dash);
                }
                index = (index + 1) % pattern.len();
                remaining = dash_len(index);
            }
        }
    }

    if let Some(dash) = current.take() {
        finish_dash(points, paths, dash);
    }

    true
}

fn push_point(
    points: &mut Vec<FlatPoint>,
    path: &mut SubPath,
    pos: lumen_core::Point,
    flags: PointFlags,
    dist_tol: f32,
) {
    if path.count > 0 {
        if let Some(last) = points.last_mut() {
            if last.pos.approx_eq(pos, dist_tol) {
                last.flags |= flags;
                return;
            }
        }
    }

    points.push(FlatPoint::new(pos, flags));
    path.count += 1;
}

fn finish_dash(points: &mut Vec<FlatPoint>, paths: &mut Vec<SubPath>, dash: SubPath) {
    if dash.count < 2 {
        points.truncate(dash.first);
        return;
    }

    points[dash.first + dash.count - 1].flags |= PointFlags::CORNER;
    paths.push(dash);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::Point;

    fn polyline(coords: &[(f32, f32)]) -> Vec<FlatPoint> {
        coords
            .iter()
            .map(|&(x, y)| FlatPoint::new(Point::new(x, y), PointFlags::CORNER))
            .collect()
    }

    fn dash_lengths(points: &[FlatPoint], paths: &[SubPath]) -> Vec<f32> {
        paths
            .iter()
            .map(|path| {
                let pts = &points[path.first..path.first + path.count];
                pts.windows(2).map(|w| w[0].pos.distance(w[1].pos)).sum()
            })
            .collect()
    }

    #[test]
    fn test_normalize_pattern() {
        assert_eq!(normalize_pattern(&[5.0]).unwrap().as_slice(), &[5.0, 5.0]);
        assert_eq!(normalize_pattern(&[1.0, 2.0]).unwrap().as_slice(), &[1.0, 2.0]);
        assert!(normalize_pattern(&[]).is_none());
        assert!(normalize_pattern(&[0.0, 0.0]).is_none());
        assert!(normalize_pattern(&[3.0, -1.0]).is_none());
    }

    #[test]
    fn test_even_dashes_on_line() {
        let src = polyline(&[(0.0, 0.0), (100.0, 0.0)]);
        let mut points = Vec::new();
        let mut paths = Vec::new();
        assert!(dash_polyline(&src, false, Winding::Ccw, &[5.0, 5.0], 0.0, 0.01, &mut points, &mut paths));

        assert_eq!(paths.len(), 10);
        for (i, len) in dash_lengths(&points, &paths).iter().enumerate() {
            assert!((len - 5.0).abs() < 1e-3, "dash {i} has length {len}");
        }
        assert_eq!(points[paths[0].first].pos, Point::new(0.0, 0.0));
        let last = &paths[9];
        assert_eq!(points[last.first + last.count - 1].pos, Point::new(100.0, 0.0));
        assert!(paths.iter().all(|p| !p.closed));
    }

    #[test]
    fn test_on_length_is_conserved_on_closed_path() {
        let src = polyline(&[(0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0)]);
        let pattern = [7.0, 5.0];
        let mut points = Vec::new();
        let mut paths = Vec::new();
        assert!(dash_polyline(&src, true, Winding::Ccw, &pattern, 3.0, 0.01, &mut points, &mut paths));

        let on: f32 = dash_lengths(&points, &paths).iter().sum();
        let expected = 400.0 * (7.0 / 12.0);
        assert!((on - expected).abs() < 0.05, "on length {on}, expected {expected}");
    }

    #[test]
    fn test_cut_points_are_corners() {
        let src = polyline(&[(0.0, 0.0), (30.0, 0.0)]);
        let mut points = Vec::new();
        let mut paths = Vec::new();
        dash_polyline(&src, false, Winding::Ccw, &[4.0, 6.0], 0.0, 0.01, &mut points, &mut paths);

        for path in &paths {
            assert!(points[path.first].flags.contains(PointFlags::CORNER));
            assert!(points[path.first + path.count - 1].flags.contains(PointFlags::CORNER));
        }
    }

    #[test]
    fn test_offset_shifts_phase() {
        let src = polyline(&[(0.0, 0.0), (100.0, 0.0)]);
        let mut points = Vec::new();
        let mut paths = Vec::new();
        dash_polyline(&src, false, Winding::Ccw, &[5.0, 5.0], 2.0, 0.01, &mut points, &mut paths);

        // the first dash is cut short by the offset, the last one wraps in
        let lengths = dash_lengths(&points, &paths);
        assert!((lengths[0] - 3.0).abs() < 1e-3);
        assert_eq!(paths.len(), 11);
        assert!((lengths[10] - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_long_line_with_coarse_pattern_ends_on_endpoint() {
        let src = polyline(&[(0.0, 0.0), (100_000.0, 0.0)]);
        let mut points = Vec::new();
        let mut paths = Vec::new();
        assert!(dash_polyline(&src, false, Winding::Ccw, &[2.0, 2.0], 0.0, 0.01, &mut points, &mut paths));

        assert_eq!(paths.len(), 25_000);
        let last = &paths[paths.len() - 1];
        assert_eq!(points[last.first + last.count - 1].pos, Point::new(100_000.0, 0.0));
    }

    #[test]
    fn test_too_fine_pattern_is_rejected() {
        let src = polyline(&[(0.0, 0.0), (100_000.0, 0.0)]);
        let mut points = Vec::new();
        let mut paths = Vec::new();
        assert!(!dash_polyline(&src, false, Winding::Ccw, &[0.001, 0.001], 0.0, 0.01, &mut points, &mut paths));
        assert!(points.is_empty());
        assert!(paths.is_empty());
    }
}

use lumen_paint::{
    Canvas, CanvasConfig, Color, ColorGradient, DrawCall, FlatPoint, Path2D, PathParseError, Point, RecordingBackend,
    RenderTarget, Size, Vec2, Winding,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn frame() -> Canvas<RecordingBackend> {
    init_tracing();
    let mut canvas = Canvas::new(RecordingBackend::new());
    canvas.begin_frame(Size::new(400.0, 300.0), 1.0, RenderTarget::Screen);
    canvas
}

/// Shoelace area; negative for solid paths in y-down space
fn shoelace(points: &[FlatPoint]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i].pos;
            let b = points[(i + 1) % n].pos;
            a.x * b.y - b.x * a.y
        })
        .sum::<f32>()
        * 0.5
}

fn centroid(points: &[FlatPoint]) -> Point {
    let n = points.len();
    let area = shoelace(points);
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let a = points[i].pos;
        let b = points[(i + 1) % n].pos;
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    Point::new(cx / (6.0 * area), cy / (6.0 * area))
}

#[test]
fn rect_fill_is_one_closed_convex_subpath() {
    let mut canvas = frame();
    canvas.begin_path();
    canvas.rect(0.0, 0.0, 100.0, 50.0);
    canvas.set_fill_color(Color::WHITE);
    canvas.fill();

    let cache = canvas.path_cache();
    assert_eq!(cache.paths().len(), 1);
    let path = &cache.paths()[0];
    assert_eq!(path.count, 4);
    assert!(path.closed);
    assert!(path.convex);
    assert_eq!(cache.bounds(), [0.0, 0.0, 100.0, 50.0]);

    canvas.end_frame();
    let frame = canvas.backend().last_frame().unwrap();
    assert_eq!(frame.fill_count(), 1);
    assert_eq!(frame.calls[0].paths()[0].point_count, 4);
}

#[test]
fn hexagon_centroid_matches_center() {
    let mut canvas = frame();
    let center = Point::new(120.0, 80.0);
    canvas.begin_path();
    canvas.regular_polygon(center, Vec2::new(50.0, 50.0), 6);
    canvas.fill();

    let cache = canvas.path_cache();
    assert_eq!(cache.paths().len(), 1);
    let path = &cache.paths()[0];
    assert!(path.closed);
    assert_eq!(path.count, 6);

    let c = centroid(cache.path_points(path));
    assert!(c.approx_eq(center, 1e-2), "centroid {:?}", c);
}

#[test]
fn linear_gradient_uses_ramp() {
    let mut canvas = frame();
    let ramp = ColorGradient::two_color(Color::WHITE, Color::BLACK);
    let paint = canvas.create_linear_gradient(Point::new(0.0, 0.0), Point::new(100.0, 0.0), &ramp);

    assert!((paint.feather - 100.0).abs() < 1e-3);
    let row = paint.ramp.unwrap().row;
    let colors = canvas.gradient(row).unwrap().colors();
    assert_eq!(colors.len(), 256);
    assert_eq!(colors[0], Color::WHITE);
    assert_eq!(colors[255], Color::BLACK);

    let texels = canvas.backend().gradient_row(row).unwrap();
    assert_eq!(&texels[..4], &[255, 255, 255, 255]);
    assert_eq!(&texels[255 * 4..], &[0, 0, 0, 255]);
}

#[test]
fn path_data_parses_or_fails_whole() {
    let path = Path2D::parse("M0 0 L10 0 L10 10 Z").unwrap();
    assert_eq!(path.commands().len(), 4);

    assert!(matches!(
        "M0 0 X".parse::<Path2D>(),
        Err(PathParseError::UnknownCommand { command: 'X', .. })
    ));

    let mut canvas = frame();
    canvas.translate(5.0, 5.0);
    canvas.path_2d(&path);
    canvas.fill();

    let cache = canvas.path_cache();
    assert_eq!(cache.paths().len(), 1);
    assert!(cache.paths()[0].closed);
    assert_eq!(cache.bounds(), [5.0, 5.0, 15.0, 15.0]);
}

#[test]
fn dashed_line_splits_into_ten_dashes() {
    let mut canvas = frame();
    canvas.set_line_dash(&[5.0, 5.0]);
    canvas.stroke_line(Point::new(0.0, 0.0), Point::new(100.0, 0.0));

    let cache = canvas.path_cache();
    assert_eq!(cache.paths().len(), 10);
    for (i, path) in cache.paths().iter().enumerate() {
        let pts = cache.path_points(path);
        let start = pts[0].pos;
        let end = pts[pts.len() - 1].pos;
        assert!((start.x - i as f32 * 10.0).abs() < 0.5, "dash {} starts at {:?}", i, start);
        assert!((end.distance(start) - 5.0).abs() < 0.5);
    }

    let calls = &canvas.backend().pending().calls;
    assert!(matches!(&calls[0], DrawCall::Stroke { paths, .. } if paths.len() == 10));
}

#[test]
fn hairline_dash_on_long_line_strokes_solid() {
    let mut canvas = frame();
    canvas.set_line_dash(&[0.001, 0.001]);
    canvas.stroke_line(Point::new(0.0, 0.0), Point::new(100_000.0, 0.0));

    let cache = canvas.path_cache();
    assert_eq!(cache.paths().len(), 1);
    let pts = cache.path_points(&cache.paths()[0]);
    assert_eq!(pts[0].pos, Point::new(0.0, 0.0));
    assert_eq!(pts[pts.len() - 1].pos, Point::new(100_000.0, 0.0));

    let calls = &canvas.backend().pending().calls;
    assert!(matches!(&calls[0], DrawCall::Stroke { paths, .. } if paths.len() == 1));
}

#[test]
fn fill_enforces_requested_winding() {
    let mut canvas = frame();

    // clockwise in y-down space
    canvas.begin_path();
    canvas.move_to(0.0, 0.0);
    canvas.line_to(10.0, 0.0);
    canvas.line_to(10.0, 10.0);
    canvas.line_to(0.0, 10.0);
    canvas.close_path();
    canvas.rect(20.0, 0.0, 10.0, 10.0);
    canvas.path_winding(Winding::HOLE);
    canvas.fill();

    let cache = canvas.path_cache();
    assert_eq!(cache.paths().len(), 2);
    assert!(shoelace(cache.path_points(&cache.paths()[0])) < 0.0);
    assert!(shoelace(cache.path_points(&cache.paths()[1])) > 0.0);
}

#[test]
fn flatten_is_idempotent() {
    let mut canvas = frame();
    canvas.begin_path();
    canvas.rounded_rect(10.0, 10.0, 80.0, 40.0, 8.0);
    canvas.circle(150.0, 50.0, 30.0);

    canvas.fill();
    let first: Vec<Point> = canvas.path_cache().points().iter().map(|p| p.pos).collect();
    canvas.fill();
    let second: Vec<Point> = canvas.path_cache().points().iter().map(|p| p.pos).collect();

    assert_eq!(first, second);
}

#[test]
fn arcs_stay_within_tolerance() {
    let mut canvas = frame();
    let center = Point::new(200.0, 150.0);
    canvas.begin_path();
    canvas.arc(center.x, center.y, 100.0, 0.0, 5.0, Winding::Cw);
    canvas.close_path();
    canvas.fill();

    let tolerance = canvas.config().tessellation_tolerance;
    for p in canvas.path_cache().points() {
        assert!((p.pos.distance(center) - 100.0).abs() < tolerance);
    }
}

#[test]
fn save_restore_isolates_state() {
    let mut canvas = frame();
    canvas.set_line_dash(&[3.0, 1.0]);
    canvas.set_global_alpha(0.75);
    canvas.save();
    canvas.set_line_dash(&[]);
    canvas.set_global_alpha(0.1);
    canvas.scale(2.0, 2.0);
    canvas.restore();

    assert_eq!(canvas.state().dash.as_slice(), &[3.0, 1.0]);
    assert_eq!(canvas.state().alpha, 0.75);
    assert!(canvas.current_transform().is_identity());
}

#[test]
fn config_disables_fringe() {
    init_tracing();
    let config = CanvasConfig::from_toml_str("edge_anti_alias = false\ntessellation_tolerance = 0.5").unwrap();
    let mut canvas = Canvas::with_config(RecordingBackend::new(), config);
    canvas.begin_frame(Size::new(100.0, 100.0), 2.0, RenderTarget::Screen);
    assert_eq!(canvas.path_cache().tessellation_tolerance(), 0.25);

    canvas.rect(0.0, 0.0, 10.0, 10.0);
    canvas.fill();
    canvas.end_frame();

    let frame = canvas.backend().last_frame().unwrap();
    let path = &frame.calls[0].paths()[0];
    assert_eq!(path.fill.len(), 4);
    assert!(path.stroke.is_empty());
    assert_eq!(canvas.backend().frames_flushed(), 1);
}

#[test]
fn cancel_frame_drops_calls() {
    let mut canvas = frame();
    canvas.rect(0.0, 0.0, 10.0, 10.0);
    canvas.fill();
    canvas.cancel_frame();

    assert!(canvas.backend().last_frame().is_none());
    assert!(!canvas.is_in_frame());
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lumen_paint::{Canvas, LineJoin, Point, RecordingBackend, RenderTarget, Size, Vec2};

fn frame() -> Canvas<RecordingBackend> {
    let mut canvas = Canvas::new(RecordingBackend::new());
    canvas.begin_frame(Size::new(1920.0, 1080.0), 2.0, RenderTarget::Screen);
    canvas
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("fill rounded rects", |b| {
        let mut canvas = frame();
        b.iter(|| {
            canvas.begin_path();
            for i in 0..100 {
                let x = (i % 10) as f32 * 50.0;
                let y = (i / 10) as f32 * 50.0;
                canvas.rounded_rect(black_box(x), y, 40.0, 40.0, 8.0);
            }
            canvas.fill();
        })
    });

    c.bench_function("stroke round-join star", |b| {
        let mut canvas = frame();
        canvas.set_stroke_width(6.0);
        canvas.set_line_join(LineJoin::Round);
        b.iter(|| {
            canvas.begin_path();
            canvas.star(Point::new(300.0, 300.0), black_box(200.0), 80.0, 12);
            canvas.stroke();
        })
    });

    c.bench_function("dashed polygon", |b| {
        let mut canvas = frame();
        canvas.set_line_dash(&[6.0, 3.0, 1.0, 3.0]);
        b.iter(|| {
            canvas.begin_path();
            canvas.regular_polygon(Point::new(400.0, 400.0), black_box(Vec2::splat(300.0)), 64);
            canvas.stroke();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

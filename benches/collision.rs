use bevy::math::Vec2;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use shadow_splat::physics::collision::{CollisionField, Probe, resolve_collision};
use shadow_splat::vision::{FrameProcessor, ProcessSettings, Quad};

fn half_blocked_mask() -> GrayImage {
    GrayImage::from_fn(320, 180, |x, _| if x < 160 { Luma([0]) } else { Luma([255]) })
}

fn bench_collision_scan(c: &mut Criterion) {
    let mask = half_blocked_mask();
    let field = CollisionField::new(&mask);
    c.bench_function("collision_scan_edge", |b| {
        let mut x: f32 = 0.0;
        b.iter(|| {
            x = (x + 0.37) % 8.0;
            let probe = Probe {
                center: Vec2::new(168.0 + x, 90.0),
                radius: 12.0,
                core_radius: 4.0,
                position: Vec2::new(167.0 + x, 90.0),
                velocity: Vec2::new(-1.0, 0.5),
                bounciness: 0.3,
            };
            black_box(resolve_collision(&field, &probe));
        });
    });
}

fn bench_frame_pipeline(c: &mut Criterion) {
    let raw = RgbaImage::from_fn(320, 180, |x, y| {
        if (x as i32 - 160).pow(2) + (y as i32 - 120).pow(2) < 900 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([230, 230, 230, 255])
        }
    });
    let mut quad = Quad::rect(320.0, 180.0);
    quad.points[0] = Vec2::new(12.0, 8.0);
    let settings = ProcessSettings {
        blur_kernel: 5,
        quantize: true,
        threshold: 5,
    };
    let mut processor = FrameProcessor::new(320, 180);
    c.bench_function("frame_pipeline_320x180", |b| {
        b.iter(|| {
            black_box(processor.process(&raw, &quad, settings));
        });
    });
}

criterion_group!(benches, bench_collision_scan, bench_frame_pipeline);
criterion_main!(benches);

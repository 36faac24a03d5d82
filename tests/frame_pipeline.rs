use bevy::math::Vec2;
use image::{Rgba, RgbaImage};
use shadow_splat::params::Params;
use shadow_splat::vision::{
    CaptureKind, Corner, FrameProcessor, FrameSource, ProcessSettings, Quad, StillImageSource,
};

const W: u32 = 320;
const H: u32 = 180;

/// Left half black, right half bright.
fn split_frame() -> RgbaImage {
    RgbaImage::from_fn(W, H, |x, _| {
        if x < W / 2 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([220, 220, 220, 255])
        }
    })
}

fn settings() -> ProcessSettings {
    ProcessSettings::from(&Params::default())
}

#[test]
fn identity_calibration_keeps_the_shadow_where_it_is() {
    let raw = split_frame();
    let mut fp = FrameProcessor::new(W, H);
    let mask = fp.process(&raw, &Quad::rect(W as f32, H as f32), settings());
    assert_eq!(mask.get_pixel(10, 90).0[0], 0);
    assert_eq!(mask.get_pixel(300, 90).0[0], 255);
}

#[test]
fn calibration_quad_crops_to_the_selected_region() {
    let raw = split_frame();
    // Select only the bright right-hand part of the camera image.
    let mut quad = Quad::rect(W as f32, H as f32);
    quad.set_corner(Corner::TopLeft, Vec2::new(200.0, 0.0));
    quad.set_corner(Corner::BottomLeft, Vec2::new(200.0, H as f32));
    let mut fp = FrameProcessor::new(W, H);
    let mask = fp.process(&raw, &quad, settings());
    assert!(mask.pixels().all(|p| p.0[0] == 255));
}

#[test]
fn degenerate_calibration_falls_back_to_identity() {
    let raw = split_frame();
    let mut collinear = Quad::rect(W as f32, H as f32);
    for (i, c) in Corner::ALL.into_iter().enumerate() {
        collinear.set_corner(c, Vec2::new(i as f32 * 10.0, 0.0));
    }
    let mut fp = FrameProcessor::new(W, H);
    let bad = fp.process(&raw, &collinear, settings()).clone();
    let mut reference = FrameProcessor::new(W, H);
    let good = reference.process(&raw, &Quad::rect(W as f32, H as f32), settings());
    assert_eq!(&bad, good);
}

#[test]
fn blur_softens_but_quantize_keeps_the_mask_binary() {
    let raw = split_frame();
    let mut fp = FrameProcessor::new(W, H);
    let s = ProcessSettings {
        blur_kernel: 9,
        ..settings()
    };
    let mask = fp.process(&raw, &Quad::rect(W as f32, H as f32), s);
    assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
}

#[test]
fn still_image_source_reads_a_png_at_capture_size() {
    let dir = std::env::temp_dir().join(format!("shadow-splat-still-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("frame.png");
    let small = RgbaImage::from_fn(64, 36, |x, _| {
        if x < 32 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    small.save(&path).unwrap();

    let mut src = StillImageSource::open(&path, W, H).unwrap();
    assert_eq!(src.size(), (W, H));
    let frame = src.current_frame(0.0).clone();
    let mut fp = FrameProcessor::new(W, H);
    let mask = fp.process(&frame, &Quad::rect(W as f32, H as f32), settings());
    assert_eq!(mask.get_pixel(5, 90).0[0], 0);
    assert_eq!(mask.get_pixel(315, 90).0[0], 255);

    let via_kind = CaptureKind::StillImage(path.clone()).open(W, H).unwrap();
    assert_eq!(via_kind.size(), (W, H));
    std::fs::remove_dir_all(&dir).ok();
}

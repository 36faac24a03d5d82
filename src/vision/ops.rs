//! The narrow image-processing interface the frame pipeline is written against,
//! plus a plain CPU implementation over `image` buffers.

use bevy::math::DVec2;
use image::{GrayImage, Luma, Rgba, RgbaImage};

use super::homography::Homography;

/// What the frame processor needs from an image-processing backend.
///
/// Implementations write into caller-owned buffers so working memory can be reused
/// from tick to tick.
pub trait ImageBackend: Send + Sync {
    /// Fill `dst` by sampling `src` at `dst_to_src(x, y)` for every destination pixel.
    /// Samples outside `src` read as transparent black.
    fn warp_perspective(&self, src: &RgbaImage, dst_to_src: &Homography, dst: &mut RgbaImage);

    fn to_grayscale(&self, src: &RgbaImage, dst: &mut GrayImage);

    /// Normalized box filter with a `kernel x kernel` window. `kernel <= 1` is a no-op.
    fn box_blur(&self, img: &mut GrayImage, kernel: u32);

    /// `v > level ? max_value : 0`
    fn threshold(&self, img: &mut GrayImage, level: u8, max_value: u8);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl ImageBackend for CpuBackend {
    fn warp_perspective(&self, src: &RgbaImage, dst_to_src: &Homography, dst: &mut RgbaImage) {
        let identity = dst_to_src.is_identity() && src.dimensions() == dst.dimensions();
        if identity {
            dst.copy_from_slice(src);
            return;
        }
        for (x, y, px) in dst.enumerate_pixels_mut() {
            let s = dst_to_src.apply(DVec2::new(x as f64, y as f64));
            *px = sample_bilinear(src, s);
        }
    }

    fn to_grayscale(&self, src: &RgbaImage, dst: &mut GrayImage) {
        for (s, d) in src.pixels().zip(dst.pixels_mut()) {
            let [r, g, b, _] = s.0;
            let v = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
            *d = Luma([v.round().clamp(0.0, 255.0) as u8]);
        }
    }

    fn box_blur(&self, img: &mut GrayImage, kernel: u32) {
        if kernel <= 1 {
            return;
        }
        let (w, h) = img.dimensions();
        let mut tmp = GrayImage::new(w, h);
        // Separable: horizontal into tmp, vertical back into img.
        blur_pass(img, &mut tmp, kernel, true);
        blur_pass(&tmp, img, kernel, false);
    }

    fn threshold(&self, img: &mut GrayImage, level: u8, max_value: u8) {
        for p in img.pixels_mut() {
            p.0[0] = if p.0[0] > level { max_value } else { 0 };
        }
    }
}

/// Reflect-101 border (`gfedcb|abcdefgh|gfedcba`).
#[inline]
fn reflect101(i: i64, len: i64) -> u32 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut i = i.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as u32
}

fn blur_pass(src: &GrayImage, dst: &mut GrayImage, kernel: u32, horizontal: bool) {
    let (w, h) = src.dimensions();
    let k = kernel as i64;
    // Anchor at the kernel centre; even kernels lean left/up.
    let before = k / 2;
    let after = k - before - 1;
    let (outer, inner) = if horizontal { (h, w) } else { (w, h) };
    let at = |o: u32, i: u32| if horizontal { (i, o) } else { (o, i) };
    for o in 0..outer {
        let mut sum: u32 = 0;
        for t in -before..=after {
            let (x, y) = at(o, reflect101(t, inner as i64));
            sum += src.get_pixel(x, y).0[0] as u32;
        }
        for i in 0..inner {
            let (x, y) = at(o, i);
            dst.put_pixel(x, y, Luma([((sum as f32) / k as f32).round() as u8]));
            let (ax, ay) = at(o, reflect101(i as i64 + after + 1, inner as i64));
            let (rx, ry) = at(o, reflect101(i as i64 - before, inner as i64));
            sum += src.get_pixel(ax, ay).0[0] as u32;
            sum -= src.get_pixel(rx, ry).0[0] as u32;
        }
    }
}

fn sample_bilinear(src: &RgbaImage, p: DVec2) -> Rgba<u8> {
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 0]);
    if !p.x.is_finite() || !p.y.is_finite() {
        return BLACK;
    }
    let (w, h) = (src.width() as i64, src.height() as i64);
    let x0 = p.x.floor();
    let y0 = p.y.floor();
    let fx = (p.x - x0) as f32;
    let fy = (p.y - y0) as f32;
    let (x0, y0) = (x0 as i64, y0 as i64);
    if x0 < -1 || y0 < -1 || x0 >= w || y0 >= h {
        return BLACK;
    }
    let texel = |x: i64, y: i64| -> [f32; 4] {
        if x < 0 || y < 0 || x >= w || y >= h {
            [0.0; 4]
        } else {
            src.get_pixel(x as u32, y as u32).0.map(|c| c as f32)
        }
    };
    let (a, b, c, d) = (
        texel(x0, y0),
        texel(x0 + 1, y0),
        texel(x0, y0 + 1),
        texel(x0 + 1, y0 + 1),
    );
    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = a[i] + (b[i] - a[i]) * fx;
        let bottom = c[i] + (d[i] - c[i]) * fx;
        out[i] = (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

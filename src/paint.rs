//! Background paint layer: a capture-sized raster that decals are stamped into and
//! which slowly washes back to white.

use bevy::math::Vec2;
use bevy::prelude::Resource;
use image::{Rgba, RgbaImage};

use crate::palette::PaintColor;
use crate::physics::decal::Decal;

#[derive(Resource)]
pub struct PaintLayer {
    image: RgbaImage,
}

impl PaintLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(PaintColor::WHITE.to_rgba())),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            *p = Rgba(PaintColor::WHITE.to_rgba());
        }
    }

    /// Fill the decal's ellipse. Only pixels whose centre lies inside are painted.
    pub fn stamp(&mut self, decal: &Decal) {
        let Decal {
            center,
            radii,
            rotation,
            color,
        } = *decal;
        if radii.x <= 0.0 || radii.y <= 0.0 || !center.is_finite() {
            return;
        }
        let reach = radii.max_element();
        let (w, h) = self.image.dimensions();
        let x0 = (center.x - reach).floor().max(0.0) as u32;
        let y0 = (center.y - reach).floor().max(0.0) as u32;
        let x1 = ((center.x + reach).ceil().max(0.0) as u32).min(w);
        let y1 = ((center.y + reach).ceil().max(0.0) as u32).min(h);
        let unrotate = Vec2::from_angle(-rotation);
        let inv = radii.recip();
        let fill = Rgba(color.to_rgba());
        for y in y0..y1 {
            for x in x0..x1 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
                let local = unrotate.rotate(d) * inv;
                if local.length_squared() <= 1.0 {
                    self.image.put_pixel(x, y, fill);
                }
            }
        }
    }

    /// Blend toward white by `alpha / 255`, as a translucent white wash would.
    pub fn fade(&mut self, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let t = (alpha / 255.0).clamp(0.0, 1.0);
        for p in self.image.pixels_mut() {
            for c in &mut p.0[..3] {
                let gap = (255 - *c) as f32 * t;
                *c = c.saturating_add(gap.round() as u8);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: PaintColor = PaintColor { r: 255, g: 0, b: 0 };

    #[test]
    fn starts_white() {
        let layer = PaintLayer::new(4, 4);
        assert!(layer.image().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn stamp_fills_the_dot_and_nothing_else() {
        let mut layer = PaintLayer::new(20, 20);
        layer.stamp(&Decal::dot(Vec2::new(10.0, 10.0), 4.0, RED));
        assert_eq!(layer.image().get_pixel(10, 10).0, [255, 0, 0, 255]);
        assert_eq!(layer.image().get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(layer.image().get_pixel(14, 10).0, [255, 255, 255, 255]);
    }

    #[test]
    fn rotated_ellipse_follows_its_long_axis() {
        let mut layer = PaintLayer::new(40, 40);
        layer.stamp(&Decal {
            center: Vec2::new(20.0, 20.0),
            radii: Vec2::new(10.0, 2.0),
            rotation: std::f32::consts::FRAC_PI_2,
            color: RED,
        });
        // Long axis is vertical after a quarter turn.
        assert_eq!(layer.image().get_pixel(19, 27).0[1], 0);
        assert_eq!(layer.image().get_pixel(27, 19).0[1], 255);
    }

    #[test]
    fn stamps_partly_off_canvas_are_clipped() {
        let mut layer = PaintLayer::new(8, 8);
        layer.stamp(&Decal::dot(Vec2::new(-1.0, -1.0), 6.0, RED));
        assert_eq!(layer.image().get_pixel(0, 0).0[1], 0);
        layer.stamp(&Decal::dot(Vec2::new(-100.0, 50.0), 6.0, RED));
    }

    #[test]
    fn fade_moves_paint_toward_white() {
        let mut layer = PaintLayer::new(4, 4);
        layer.stamp(&Decal::dot(Vec2::new(2.0, 2.0), 8.0, RED));
        layer.fade(127.5);
        let g = layer.image().get_pixel(2, 2).0[1];
        assert!((126..=128).contains(&g), "{g}");
        layer.fade(0.0);
        assert_eq!(layer.image().get_pixel(2, 2).0[1], g);
    }
}

//! Paint marks and body ellipses: the per-tick visual requests handed to whatever
//! draws the installation.

use bevy::math::Vec2;
use rand::prelude::*;

use super::collision::CollisionField;
use crate::palette::PaintColor;

/// A filled (possibly rotated) ellipse stamped onto the background paint layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decal {
    pub center: Vec2,
    /// Half-axes along the rotated x / y.
    pub radii: Vec2,
    /// Radians, y-down simulation space.
    pub rotation: f32,
    pub color: PaintColor,
}

impl Decal {
    /// A round dot of the given diameter.
    pub fn dot(center: Vec2, diameter: f32, color: PaintColor) -> Self {
        Self {
            center,
            radii: Vec2::splat(diameter * 0.5),
            rotation: 0.0,
            color,
        }
    }
}

/// The body's own foreground ellipse for this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyEllipse {
    pub center: Vec2,
    pub radii: Vec2,
    pub rotation: f32,
}

/// Shape of a radial splatter burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatterProfile {
    pub radius: f32,
    /// Dots per square pixel of `radius²`.
    pub density: f32,
    /// Sample radius is `u^skew * radius`; larger skews crowd the centre.
    pub skew: i32,
    pub dot_diameter: (f32, f32),
}

impl SplatterProfile {
    pub fn sample_count(&self) -> usize {
        let n = self.density * self.radius * self.radius;
        if n.is_finite() && n > 0.0 { n as usize } else { 0 }
    }
}

/// Scatter dots around `origin`, keeping only those that land on clear mask pixels.
pub fn splatter(
    origin: Vec2,
    profile: &SplatterProfile,
    color: PaintColor,
    field: &CollisionField<'_>,
    rng: &mut StdRng,
    out: &mut Vec<Decal>,
) {
    let (d_min, d_max) = profile.dot_diameter;
    for _ in 0..profile.sample_count() {
        let diameter = if d_max > d_min { rng.random_range(d_min..d_max) } else { d_min };
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let r = rng.random::<f32>().powi(profile.skew) * profile.radius;
        let p = origin + Vec2::from_angle(angle) * r;
        if field.is_clear_at(p) {
            out.push(Decal::dot(p, diameter, color));
        }
    }
}

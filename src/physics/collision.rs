use bevy::math::Vec2;
use image::GrayImage;

use crate::config::BLOCKED_EPSILON;

/// Read-only view of this tick's silhouette mask.
///
/// Out-of-bounds reads are never blocked, but they are not "clear" either: paint
/// can only land on pixels inside the frame.
#[derive(Clone, Copy)]
pub struct CollisionField<'a> {
    mask: &'a GrayImage,
}

impl<'a> CollisionField<'a> {
    pub fn new(mask: &'a GrayImage) -> Self {
        Self { mask }
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.mask.width() && (y as u32) < self.mask.height()
    }

    #[inline]
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.mask.get_pixel(x as u32, y as u32).0[0] <= BLOCKED_EPSILON
    }

    #[inline]
    pub fn is_clear(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.mask.get_pixel(x as u32, y as u32).0[0] > BLOCKED_EPSILON
    }

    /// Point query in simulation space; samples the pixel containing `p`.
    pub fn is_clear_at(&self, p: Vec2) -> bool {
        p.is_finite() && self.is_clear(p.x.floor() as i32, p.y.floor() as i32)
    }
}

/// Result of scanning a body's footprint against the mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionOutcome {
    pub collided: bool,
    pub core_touched: bool,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl CollisionOutcome {
    fn unchanged(position: Vec2, velocity: Vec2) -> Self {
        Self {
            collided: false,
            core_touched: false,
            position,
            velocity,
        }
    }
}

/// Body state the resolver reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    /// Where the footprint is sampled (the candidate position).
    pub center: Vec2,
    pub radius: f32,
    pub core_radius: f32,
    /// Current (pre-move) position the correction is applied to.
    pub position: Vec2,
    pub velocity: Vec2,
    pub bounciness: f32,
}

/// Reflect `v` about the line with unit normal `n`. A zero normal leaves `v` alone.
#[inline]
pub fn reflect(v: Vec2, n: Vec2) -> Vec2 {
    v - 2.0 * v.dot(n) * n
}

/// Scan every integer pixel inside the circle `center ± radius`.
///
/// Columns are walked left to right, rows top to bottom within a column, so the
/// nearest blocked pixel keeps the first one found on ties. Any blocked pixel within
/// `core_radius` ends the scan with `core_touched` and discards everything else.
///
/// Otherwise the signed side tally of blocked pixels gives the direction towards the
/// obstacle: velocity is reflected off it and the body is pushed back out along it by
/// twice the penetration depth. When the tally cancels to zero on both axes there is
/// no direction: velocity is only damped by `bounciness` and position is kept.
pub fn resolve_collision(field: &CollisionField<'_>, probe: &Probe) -> CollisionOutcome {
    let Probe {
        center,
        radius,
        core_radius,
        position,
        velocity,
        bounciness,
    } = *probe;

    if !center.is_finite() || radius <= 0.0 {
        return CollisionOutcome::unchanged(position, velocity);
    }

    let r2 = radius * radius;
    let core2 = core_radius * core_radius;

    let x_min = (center.x - radius).floor().max(0.0) as i32;
    let y_min = (center.y - radius).floor().max(0.0) as i32;
    let x_max = ((center.x + radius).ceil() as i32).min(field.width() as i32 - 1);
    let y_max = ((center.y + radius).ceil() as i32).min(field.height() as i32 - 1);

    let mut tally = Vec2::ZERO;
    let mut closest_d2 = f32::INFINITY;
    let mut hit = false;

    for x in x_min..=x_max {
        let dx = x as f32 - center.x;
        for y in y_min..=y_max {
            let dy = y as f32 - center.y;
            let d2 = dx * dx + dy * dy;
            if d2 > r2 || !field.is_blocked(x, y) {
                continue;
            }
            if d2 <= core2 {
                return CollisionOutcome {
                    collided: true,
                    core_touched: true,
                    position,
                    velocity,
                };
            }
            hit = true;
            tally.x += if (x as f32) < center.x { -1.0 } else { 1.0 };
            tally.y += if (y as f32) < center.y { -1.0 } else { 1.0 };
            if d2 < closest_d2 {
                closest_d2 = d2;
            }
        }
    }

    if !hit {
        return CollisionOutcome::unchanged(position, velocity);
    }

    let depth = radius - closest_d2.sqrt();
    let normal = tally.normalize_or_zero();
    CollisionOutcome {
        collided: true,
        core_touched: false,
        position: position + normal * depth * -2.0,
        velocity: reflect(velocity, normal) * bounciness + normal * depth * -0.5,
    }
}

use bevy::math::Vec2;
use rand::prelude::*;

use super::collision::{CollisionField, Probe, resolve_collision};
use super::decal::{BodyEllipse, Decal, SplatterProfile, splatter};
use crate::config::*;
use crate::palette::PaintColor;
use crate::params::Params;

/// Which edge and which vertical band a body enters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPlacement {
    pub left: bool,
    pub top: bool,
}

impl SpawnPlacement {
    pub fn random(rng: &mut StdRng) -> Self {
        Self {
            left: rng.random_bool(0.5),
            top: rng.random_bool(0.5),
        }
    }
}

/// A paint ball: a circle that falls, bounces off shadows and the floor, and pops
/// when a shadow reaches its core.
///
/// Velocities are in capture pixels per tick; times are absolute milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub position: Vec2,
    pub velocity: Vec2,

    /// Drawn size.
    pub visual_radius: f32,
    /// Footprint scanned against the mask.
    pub collision_radius: f32,
    /// Any shadow inside this radius pops the body.
    pub core_radius: f32,

    pub spawn_time_ms: f64,
    pub timeout_ms: f64,

    /// Shadow and floor bounces so far. Only enforced with `Params::pop_on_max_bounces`.
    pub bounce_count: u32,

    pub color: PaintColor,

    // Per-tick state, read by decal emission.
    pub previous_velocity: Vec2,
    pub just_bounced: bool,
    /// Speed going into the last bounce.
    pub bounce_strength: f32,
    core_touched: bool,
}

impl RigidBody {
    pub fn new(position: Vec2, velocity: Vec2, spawn_time_ms: f64, timeout_ms: f64, color: PaintColor) -> Self {
        Self {
            position,
            velocity,
            visual_radius: VISUAL_RADIUS,
            collision_radius: COLLISION_RADIUS,
            core_radius: CORE_RADIUS,
            spawn_time_ms,
            timeout_ms,
            bounce_count: 0,
            color,
            previous_velocity: velocity,
            just_bounced: false,
            bounce_strength: 0.0,
            core_touched: false,
        }
    }

    /// Enter from just outside the left or right edge, in the top or middle third,
    /// heading inward. Bodies in the middle band start with a small upward kick.
    pub fn spawn(
        placement: SpawnPlacement,
        capture: Vec2,
        now_ms: f64,
        params: &Params,
        color: PaintColor,
        rng: &mut StdRng,
    ) -> Self {
        let third = capture.y / 3.0;
        let x = if placement.left { -VISUAL_RADIUS } else { capture.x + VISUAL_RADIUS };
        let y = if placement.top {
            rng.random_range(0.0..third.max(f32::EPSILON))
        } else {
            rng.random_range(third..(2.0 * third).max(third + f32::EPSILON))
        };

        let speed_x = rng.random_range(SPAWN_VEL_X_MIN..SPAWN_VEL_X_MAX);
        let vx = if placement.left { speed_x } else { -speed_x };
        let vy = if placement.top { 0.0 } else { -rng.random_range(SPAWN_VEL_Y_MIN..SPAWN_VEL_Y_MAX) };

        let lifespan_ms = params.lifespan as f64 * rng.random_range(LIFESPAN_JITTER_MS);
        Self::new(Vec2::new(x, y), Vec2::new(vx, vy), now_ms, now_ms + lifespan_ms, color)
    }

    pub fn core_touched(&self) -> bool {
        self.core_touched
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    // --------------------- Simulation ---------------------

    /// One tick: gravity, then either the floor or the mask, then move.
    ///
    /// The floor takes priority over the mask. A core hit stops the body where it is.
    pub fn update(&mut self, field: &CollisionField<'_>, params: &Params) {
        if self.core_touched {
            return;
        }
        self.previous_velocity = self.velocity;
        self.just_bounced = false;

        self.velocity.y += params.gravity;
        let candidate = self.position + self.velocity;
        let floor = field.height() as f32;

        if candidate.y + self.collision_radius > floor {
            self.record_bounce();
            self.velocity = ground_bounce(self.velocity, params.bounciness_ground);
        } else {
            let outcome = resolve_collision(
                field,
                &Probe {
                    center: candidate,
                    radius: self.collision_radius,
                    core_radius: self.core_radius,
                    position: self.position,
                    velocity: self.velocity,
                    bounciness: params.bounciness,
                },
            );
            if outcome.core_touched {
                self.core_touched = true;
                tracing::debug!(position = ?self.position, "body popped");
                return;
            }
            if outcome.collided {
                self.record_bounce();
                self.position = outcome.position;
                self.velocity = outcome.velocity;
            }
        }

        self.position += self.velocity;
    }

    fn record_bounce(&mut self) {
        self.bounce_count += 1;
        self.just_bounced = true;
        self.bounce_strength = self.velocity.length();
    }

    /// Dead once fully shrunk, popped, or gone off either side while still moving away.
    pub fn is_dead(&self, now_ms: f64, capture_width: f32, params: &Params) -> bool {
        now_ms >= self.timeout_ms + params.shrink_time as f64
            || self.core_touched
            || (params.pop_on_max_bounces && self.bounce_count > params.max_bounces)
            || (self.position.x > capture_width + self.visual_radius && self.velocity.x > 0.0)
            || (self.position.x < -self.visual_radius && self.velocity.x < 0.0)
    }

    // --------------------- Visuals (read-only) ---------------------

    /// Squash/stretch/wobble ellipse, shrinking to nothing over `shrink_time` after timeout.
    pub fn ellipse(&self, now_ms: f64, frame: u64, params: &Params) -> BodyEllipse {
        let speed = self.speed();
        let stretch = speed * params.squishiness;
        let wobble = (frame as f32 * params.wobble_freq).sin() * params.wobble_amp * speed;
        let radius = self.visual_radius * self.shrink_factor(now_ms, params);
        BodyEllipse {
            center: self.position,
            radii: Vec2::new(
                radius * (2.0 + stretch + wobble) * 0.5,
                (radius * (2.0 - stretch - wobble) * 0.5).max(0.0),
            ),
            rotation: heading(self.velocity),
        }
    }

    /// 1 before timeout, falling linearly to 0 over `shrink_time`.
    pub fn shrink_factor(&self, now_ms: f64, params: &Params) -> f32 {
        if now_ms < self.timeout_ms {
            return 1.0;
        }
        let shrink = params.shrink_time as f64;
        if shrink <= 0.0 {
            return 0.0;
        }
        (1.0 - (now_ms - self.timeout_ms) / shrink).clamp(0.0, 1.0) as f32
    }

    /// Paint for this tick: travel streaks, a splatter on bounce, a burst on pop.
    pub fn emit_decals(
        &self,
        field: &CollisionField<'_>,
        params: &Params,
        rng: &mut StdRng,
        out: &mut Vec<Decal>,
    ) {
        let speed = self.speed();
        if speed > params.paint_streak_vel_threshold && rng.random::<f32>() < params.paint_streak_chance {
            self.streak(speed, rng, out);
        }

        if self.just_bounced {
            let profile = SplatterProfile {
                radius: self.bounce_strength * params.bounce_paint_splatter_radius,
                density: params.bounce_paint_splatter_density,
                skew: 2,
                dot_diameter: (0.5, 1.0),
            };
            splatter(self.position, &profile, self.color, field, rng, out);
        }

        if self.core_touched {
            let profile = SplatterProfile {
                radius: params.popped_paint_splatter_radius,
                density: params.popped_paint_splatter_density,
                skew: 5,
                dot_diameter: (1.0, 2.5),
            };
            splatter(self.position, &profile, self.color, field, rng, out);
        }
    }

    /// Two marks near the core, in the body's heading frame: one stretched along travel.
    fn streak(&self, speed: f32, rng: &mut StdRng, out: &mut Vec<Decal>) {
        let rotation = heading(self.velocity);
        let rot = Vec2::from_angle(rotation);
        let diameter = rng.random_range(1.0..3.0f32);
        let jitter = |rng: &mut StdRng| {
            let c = self.core_radius;
            let local = Vec2::new(rng.random_range(-c..=c), rng.random_range(-c..=c));
            self.position + rot.rotate(local)
        };

        let stretched = jitter(&mut *rng);
        out.push(Decal {
            center: stretched,
            radii: Vec2::new(diameter * (1.0 + speed * 0.5), diameter) * 0.5,
            rotation,
            color: self.color,
        });
        let round = jitter(&mut *rng);
        out.push(Decal::dot(round, diameter, self.color));
    }
}

/// Reflect vertically and damp the whole velocity.
#[inline]
pub fn ground_bounce(velocity: Vec2, bounciness: f32) -> Vec2 {
    Vec2::new(velocity.x, -velocity.y) * bounciness
}

#[inline]
fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn clear_mask() -> GrayImage {
        GrayImage::from_pixel(320, 180, Luma([255]))
    }

    fn body_at(p: Vec2, v: Vec2) -> RigidBody {
        RigidBody::new(p, v, 0.0, 20_000.0, PaintColor::WHITE)
    }

    #[test]
    fn ground_bounce_scales_both_axes() {
        let v = ground_bounce(Vec2::new(3.0, 4.0), 0.7);
        assert!((v.x - 2.1).abs() < 1e-6);
        assert!((v.y + 2.8).abs() < 1e-6);
    }

    #[test]
    fn gravity_applies_once_per_tick() {
        let mask = clear_mask();
        let field = CollisionField::new(&mask);
        let params = Params::default();
        let mut b = body_at(Vec2::new(100.0, 50.0), Vec2::ZERO);
        b.update(&field, &params);
        assert!((b.velocity.y - params.gravity).abs() < 1e-6);
        assert!((b.position.y - (50.0 + params.gravity)).abs() < 1e-5);
        b.update(&field, &params);
        assert!((b.velocity.y - 2.0 * params.gravity).abs() < 1e-6);
    }

    #[test]
    fn floor_bounce_keeps_position_and_flips_velocity() {
        let mask = clear_mask();
        let field = CollisionField::new(&mask);
        let params = Params {
            gravity: 0.0,
            ..Params::default()
        };
        // candidate y + 12 = 170 + 4 + 12 > 180
        let mut b = body_at(Vec2::new(100.0, 170.0), Vec2::new(3.0, 4.0));
        b.update(&field, &params);
        assert!(b.just_bounced);
        assert_eq!(b.bounce_count, 1);
        assert!((b.bounce_strength - 5.0).abs() < 1e-6);
        assert!((b.velocity - Vec2::new(2.1, -2.8)).length() < 1e-5);
        assert!((b.position - Vec2::new(102.1, 167.2)).length() < 1e-4);
        assert_eq!(b.previous_velocity, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn core_touch_freezes_and_kills() {
        let mut mask = clear_mask();
        mask.put_pixel(101, 50, Luma([0]));
        let field = CollisionField::new(&mask);
        let params = Params {
            gravity: 0.0,
            ..Params::default()
        };
        let mut b = body_at(Vec2::new(100.0, 50.0), Vec2::new(1.0, 0.0));
        b.update(&field, &params);
        assert!(b.core_touched());
        assert_eq!(b.position, Vec2::new(100.0, 50.0));
        assert!(b.is_dead(0.0, 320.0, &params));

        let snapshot = b.clone();
        b.update(&field, &params);
        assert_eq!(b, snapshot);
    }

    #[test]
    fn lifespan_boundary_uses_shrink_time() {
        let params = Params {
            shrink_time: 160.0,
            ..Params::default()
        };
        let b = RigidBody::new(Vec2::new(50.0, 50.0), Vec2::ZERO, 0.0, 1000.0, PaintColor::WHITE);
        assert!(!b.is_dead(1000.0 + 159.0, 320.0, &params));
        assert!(b.is_dead(1000.0 + 160.0, 320.0, &params));
    }

    #[test]
    fn leaving_sideways_is_death_only_when_moving_out() {
        let params = Params::default();
        let entering = body_at(Vec2::new(-VISUAL_RADIUS - 1.0, 50.0), Vec2::new(2.0, 0.0));
        assert!(!entering.is_dead(0.0, 320.0, &params));
        let leaving = body_at(Vec2::new(-VISUAL_RADIUS - 1.0, 50.0), Vec2::new(-2.0, 0.0));
        assert!(leaving.is_dead(0.0, 320.0, &params));
        let right = body_at(Vec2::new(320.0 + VISUAL_RADIUS + 1.0, 50.0), Vec2::new(2.0, 0.0));
        assert!(right.is_dead(0.0, 320.0, &params));
    }

    #[test]
    fn max_bounces_only_enforced_when_enabled() {
        let mut params = Params::default();
        let mut b = body_at(Vec2::new(50.0, 50.0), Vec2::ZERO);
        b.bounce_count = params.max_bounces + 1;
        assert!(!b.is_dead(0.0, 320.0, &params));
        params.pop_on_max_bounces = true;
        assert!(b.is_dead(0.0, 320.0, &params));
    }

    #[test]
    fn spawn_left_enters_from_left_edge() {
        let params = Params::default();
        let mut rng = StdRng::seed_from_u64(11);
        let capture = Vec2::new(320.0, 180.0);
        for top in [true, false] {
            let b = RigidBody::spawn(
                SpawnPlacement { left: true, top },
                capture,
                0.0,
                &params,
                PaintColor::WHITE,
                &mut rng,
            );
            assert_eq!(b.position.x, -b.visual_radius);
            assert!(b.velocity.x > 0.0);
            if top {
                assert_eq!(b.velocity.y, 0.0);
                assert!(b.position.y < 60.0);
            } else {
                assert!(b.velocity.y < 0.0);
                assert!((60.0..120.0).contains(&b.position.y));
            }
            assert!(!b.is_dead(0.0, capture.x, &params));
        }
    }

    #[test]
    fn spawn_right_heads_left_with_jittered_lifespan() {
        let params = Params::default();
        let mut rng = StdRng::seed_from_u64(5);
        let b = RigidBody::spawn(
            SpawnPlacement { left: false, top: true },
            Vec2::new(320.0, 180.0),
            1000.0,
            &params,
            PaintColor::WHITE,
            &mut rng,
        );
        assert_eq!(b.position.x, 320.0 + b.visual_radius);
        assert!(b.velocity.x < 0.0);
        let life = b.timeout_ms - b.spawn_time_ms;
        assert!((16_000.0..24_000.0).contains(&life), "{life}");
    }

    #[test]
    fn shrink_reaches_zero_at_end_of_window() {
        let params = Params::default();
        let b = RigidBody::new(Vec2::ZERO, Vec2::ZERO, 0.0, 1000.0, PaintColor::WHITE);
        assert_eq!(b.shrink_factor(999.0, &params), 1.0);
        assert!((b.shrink_factor(1080.0, &params) - 0.5).abs() < 1e-6);
        assert_eq!(b.shrink_factor(1160.0, &params), 0.0);
        assert_eq!(b.ellipse(1160.0, 0, &params).radii, Vec2::ZERO);
        let instant = Params {
            shrink_time: 0.0,
            ..Params::default()
        };
        assert_eq!(b.shrink_factor(1000.0, &instant), 0.0);
    }

    #[test]
    fn ellipse_stretches_along_travel() {
        let params = Params {
            wobble_amp: 0.0,
            ..Params::default()
        };
        let b = body_at(Vec2::new(10.0, 10.0), Vec2::new(0.0, 4.0));
        let e = b.ellipse(0.0, 0, &params);
        assert!(e.radii.x > e.radii.y);
        assert!((e.rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn emitting_decals_leaves_physics_untouched() {
        let mask = clear_mask();
        let field = CollisionField::new(&mask);
        let params = Params {
            paint_streak_chance: 1.0,
            ..Params::default()
        };
        let mut b = body_at(Vec2::new(100.0, 90.0), Vec2::new(3.0, 0.0));
        b.just_bounced = true;
        b.bounce_strength = 3.0;
        let before = b.clone();
        let mut rng = StdRng::seed_from_u64(9);
        let mut out = Vec::new();
        b.emit_decals(&field, &params, &mut rng, &mut out);
        assert_eq!(b, before);
        // Two streak marks plus some splatter.
        assert!(out.len() > 2);
        assert!(out.iter().all(|d| d.color == b.color));
    }

    #[test]
    fn popped_body_bursts() {
        let mut mask = clear_mask();
        mask.put_pixel(100, 90, Luma([0]));
        let field = CollisionField::new(&mask);
        let params = Params {
            gravity: 0.0,
            paint_streak_chance: 0.0,
            ..Params::default()
        };
        let mut b = body_at(Vec2::new(100.0, 90.0), Vec2::ZERO);
        b.update(&field, &params);
        assert!(b.core_touched());
        let mut rng = StdRng::seed_from_u64(2);
        let mut out = Vec::new();
        b.emit_decals(&field, &params, &mut rng, &mut out);
        assert!(out.len() > 1000);
        assert!(out.iter().all(|d| field.is_clear_at(d.center)));
    }
}

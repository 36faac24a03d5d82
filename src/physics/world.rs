use bevy::math::Vec2;
use bevy::prelude::Resource;
use image::GrayImage;
use rand::prelude::*;

use super::body::{RigidBody, SpawnPlacement};
use super::collision::CollisionField;
use super::decal::{BodyEllipse, Decal};
use crate::config::SPAWN_OSCILLATION_RATE;
use crate::palette::{PaintColor, PaletteSchedule};
use crate::params::Params;
use crate::vision::{Corner, Quad, Readiness};

/// Simulation clock, passed into every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    pub elapsed_ms: f64,
    pub frame: u64,
}

impl FrameTime {
    pub fn new(elapsed_ms: f64, frame: u64) -> Self {
        Self { elapsed_ms, frame }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationMode {
    /// Debug panels and the input quad are shown; corners can be set.
    #[default]
    CalibratingIo,
    /// Only paint and balls are shown, for projection.
    Presenting,
}

impl CalibrationMode {
    pub fn toggled(self) -> Self {
        match self {
            CalibrationMode::CalibratingIo => CalibrationMode::Presenting,
            CalibrationMode::Presenting => CalibrationMode::CalibratingIo,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub mode: CalibrationMode,
    /// Where the projected rectangle's corners appear in the camera image.
    pub quad: Quad,
}

impl Calibration {
    pub fn new(capture: Vec2) -> Self {
        Self {
            mode: CalibrationMode::default(),
            quad: Quad::rect(capture.x, capture.y),
        }
    }

    pub fn set_corner(&mut self, corner: Corner, p: Vec2) {
        tracing::info!(?corner, x = p.x, y = p.y, "calibration corner set");
        self.quad.set_corner(corner, p);
    }

    pub fn toggle(&mut self) -> CalibrationMode {
        self.mode = self.mode.toggled();
        tracing::info!(mode = ?self.mode, "calibration mode");
        self.mode
    }
}

/// Everything the simulation reads that isn't a body.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    /// Capture resolution; simulation space is pixels of this frame, y down.
    pub capture: Vec2,
    pub params: Params,
    pub calibration: Calibration,
}

impl SimulationContext {
    pub fn new(params: Params) -> Self {
        let capture = Vec2::new(params.capture_width as f32, params.capture_height as f32);
        Self {
            capture,
            calibration: Calibration::new(capture),
            params,
        }
    }
}

/// What one tick did, for logging and benchmarks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub spawned: usize,
    pub removed: usize,
    pub decals: usize,
}

/// Owns the live bodies; the only place bodies are created or removed.
#[derive(Resource)]
pub struct SimulationWorld {
    context: SimulationContext,
    bodies: Vec<RigidBody>,
    palettes: PaletteSchedule,
    readiness: Readiness,
    rng: StdRng,
    decals: Vec<Decal>,
}

impl SimulationWorld {
    pub fn new(params: Params) -> Self {
        Self::with_rng(params, StdRng::seed_from_u64(rand::random()))
    }

    /// Reproducible world, for tests and benchmarks.
    pub fn seeded(params: Params, seed: u64) -> Self {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: Params, rng: StdRng) -> Self {
        Self {
            context: SimulationContext::new(params),
            bodies: Vec::new(),
            palettes: PaletteSchedule::default(),
            readiness: Readiness::default(),
            rng,
            decals: Vec::new(),
        }
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub fn params(&self) -> &Params {
        &self.context.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.context.params
    }

    pub fn calibration(&self) -> &Calibration {
        &self.context.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut Calibration {
        &mut self.context.calibration
    }

    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Decals emitted by the most recent tick.
    pub fn decals(&self) -> &[Decal] {
        &self.decals
    }

    /// Target population at `time`: a slow sine between 0 and 2.
    pub fn desired_count(time: FrameTime) -> f64 {
        (time.elapsed_secs() * SPAWN_OSCILLATION_RATE).sin() + 1.0
    }

    fn pick_color(&mut self, time: FrameTime) -> PaintColor {
        let palette = self
            .palettes
            .active(time.elapsed_secs(), self.context.params.color_palette_time);
        if palette.is_empty() {
            return PaintColor::grey(0);
        }
        palette[self.rng.random_range(0..palette.len())]
    }

    /// Spawn one body at a random edge and band.
    pub fn spawn(&mut self, time: FrameTime) -> &RigidBody {
        let placement = SpawnPlacement::random(&mut self.rng);
        self.spawn_at(placement, time)
    }

    pub fn spawn_at(&mut self, placement: SpawnPlacement, time: FrameTime) -> &RigidBody {
        let color = self.pick_color(time);
        let body = RigidBody::spawn(
            placement,
            self.context.capture,
            time.elapsed_ms,
            &self.context.params,
            color,
            &mut self.rng,
        );
        tracing::debug!(
            left = placement.left,
            top = placement.top,
            live = self.bodies.len() + 1,
            "spawned body"
        );
        self.bodies.push(body);
        &self.bodies[self.bodies.len() - 1]
    }

    /// One simulation tick against this tick's mask.
    ///
    /// Inert until the capture backend is ready. Every body sees the same mask.
    /// Decals are gathered before pruning, so a body that pops this tick still
    /// gets its burst.
    pub fn step(&mut self, mask: &GrayImage, backend_ready: bool, time: FrameTime) -> TickSummary {
        self.decals.clear();
        if !self.readiness.poll(backend_ready) {
            return TickSummary::default();
        }

        let mut summary = TickSummary::default();
        if (self.bodies.len() as f64) < Self::desired_count(time) {
            self.spawn(time);
            summary.spawned = 1;
        }

        let field = CollisionField::new(mask);
        let Self {
            context,
            bodies,
            rng,
            decals,
            ..
        } = self;
        let params = &context.params;

        for body in bodies.iter_mut() {
            body.update(&field, params);
        }
        for body in bodies.iter() {
            body.emit_decals(&field, params, rng, decals);
        }

        let before = bodies.len();
        let width = context.capture.x;
        bodies.retain(|b| !b.is_dead(time.elapsed_ms, width, params));
        summary.removed = before - bodies.len();
        summary.decals = decals.len();
        summary
    }

    /// Foreground ellipses for every live body.
    pub fn ellipses(&self, time: FrameTime) -> impl Iterator<Item = BodyEllipse> + '_ {
        self.bodies
            .iter()
            .map(move |b| b.ellipse(time.elapsed_ms, time.frame, &self.context.params))
    }

    /// Drop every body and reset calibration, for a capture-size change.
    pub fn reinitialize(&mut self, params: Params) {
        tracing::info!(
            width = params.capture_width,
            height = params.capture_height,
            "reinitializing simulation"
        );
        self.context = SimulationContext::new(params);
        self.bodies.clear();
        self.decals.clear();
    }
}

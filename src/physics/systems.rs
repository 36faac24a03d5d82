use std::path::PathBuf;
use std::time::SystemTime;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use super::world::{CalibrationMode, FrameTime, SimulationWorld};
use crate::config::PARAMS_POLL_SECS;
use crate::paint::PaintLayer;
use crate::params::Params;
use crate::vision::{CaptureError, CaptureKind, Corner, FrameProcessor, FrameSource, ProcessSettings};

/// The live capture source and how to reopen it.
#[derive(Resource)]
pub struct Capture {
    pub kind: CaptureKind,
    pub source: Box<dyn FrameSource>,
}

impl Capture {
    pub fn open(kind: CaptureKind, width: u32, height: u32) -> Result<Self, CaptureError> {
        let source = kind.open(width, height)?;
        Ok(Self { kind, source })
    }
}

/// Clock of the last completed tick, read by the display.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct SimClock(pub FrameTime);

/// One simulation tick: process the frame, step the world, paint the decals.
pub fn simulation_tick(
    time: Res<Time>,
    mut clock: ResMut<SimClock>,
    mut capture: ResMut<Capture>,
    mut processor: ResMut<FrameProcessor>,
    mut world: ResMut<SimulationWorld>,
    mut paint: ResMut<PaintLayer>,
) {
    let now = FrameTime::new(time.elapsed().as_secs_f64() * 1000.0, clock.0.frame + 1);
    clock.0 = now;

    let settings = ProcessSettings::from(world.params());
    let quad = world.calibration().quad;
    let ready = capture.source.is_ready();
    let raw = capture.source.current_frame(now.elapsed_ms);
    let mask = processor.process(raw, &quad, settings);
    let summary = world.step(mask, ready, now);
    if summary.removed > 0 {
        tracing::debug!(removed = summary.removed, live = world.bodies().len(), "pruned bodies");
    }

    paint.fade(world.params().paint_disappear_speed);
    for decal in world.decals() {
        paint.stamp(decal);
    }
}

/// Calibration keys. Corners take the cursor position, which in the calibration
/// view is 1:1 with the raw frame.
pub fn calibration_input(
    keys: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    clock: Res<SimClock>,
    mut world: ResMut<SimulationWorld>,
) {
    if keys.just_pressed(KeyCode::KeyC) {
        world.calibration_mut().toggle();
    }
    if keys.just_pressed(KeyCode::Space) {
        world.spawn(clock.0);
    }

    if world.calibration().mode != CalibrationMode::CalibratingIo {
        return;
    }
    let Some(cursor) = windows.single().ok().and_then(|w| w.cursor_position()) else {
        return;
    };
    for (key, corner) in [
        (KeyCode::Digit1, Corner::TopLeft),
        (KeyCode::Digit2, Corner::TopRight),
        (KeyCode::KeyQ, Corner::BottomLeft),
        (KeyCode::KeyW, Corner::BottomRight),
    ] {
        if keys.just_pressed(key) {
            world.calibration_mut().set_corner(corner, cursor);
        }
    }
}

/// Native-only quit: press Esc to exit the app.
/// (No-op on wasm32.)
pub fn exit_on_esc_if_native(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if cfg!(not(target_arch = "wasm32")) && keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}

/// Params file being watched for changes.
#[derive(Resource, Debug)]
pub struct ParamsReload {
    pub path: PathBuf,
    last_modified: Option<SystemTime>,
    timer: Timer,
}

impl ParamsReload {
    pub fn new(path: PathBuf) -> Self {
        let last_modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
        Self {
            path,
            last_modified,
            timer: Timer::from_seconds(PARAMS_POLL_SECS, TimerMode::Repeating),
        }
    }

    /// True when the file's mtime moved past the last one seen.
    fn changed(&mut self) -> bool {
        let Ok(modified) = std::fs::metadata(&self.path).and_then(|m| m.modified()) else {
            return false;
        };
        let newer = self.last_modified.is_none_or(|prev| modified > prev);
        if newer {
            self.last_modified = Some(modified);
        }
        newer
    }
}

/// Poll the params file and swap in changes. A failed load keeps the current params.
pub fn poll_params_reload(
    time: Res<Time>,
    reload: Option<ResMut<ParamsReload>>,
    mut capture: ResMut<Capture>,
    mut processor: ResMut<FrameProcessor>,
    mut world: ResMut<SimulationWorld>,
    mut paint: ResMut<PaintLayer>,
) {
    let Some(mut reload) = reload else {
        return;
    };
    if !reload.timer.tick(time.delta()).just_finished() || !reload.changed() {
        return;
    }

    let params = match Params::load_from_file(&reload.path) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("params hot-reload failed: {e}");
            return;
        }
    };
    if params == *world.params() {
        return;
    }
    tracing::info!(path = %reload.path.display(), "params hot-reload applied");

    if params.requires_reinit(world.params()) {
        if let Err(e) = reinitialize(params, &mut capture, &mut processor, &mut world, &mut paint) {
            tracing::warn!("capture reinit failed, keeping previous size: {e}");
        }
    } else {
        *world.params_mut() = params;
    }
}

/// Rebuild everything sized by the capture resolution.
pub fn reinitialize(
    params: Params,
    capture: &mut Capture,
    processor: &mut FrameProcessor,
    world: &mut SimulationWorld,
    paint: &mut PaintLayer,
) -> Result<(), CaptureError> {
    let (w, h) = (params.capture_width, params.capture_height);
    *capture = Capture::open(capture.kind.clone(), w, h)?;
    *processor = FrameProcessor::new(w, h);
    *paint = PaintLayer::new(w, h);
    world.reinitialize(params);
    Ok(())
}

use bevy::prelude::*;

pub mod body;
pub mod collision;
pub mod decal;
pub mod display;
pub mod systems;
pub mod world;

pub use body::{RigidBody, SpawnPlacement};
pub use collision::{CollisionField, CollisionOutcome, resolve_collision};
pub use decal::{BodyEllipse, Decal};
pub use world::{Calibration, CalibrationMode, FrameTime, SimulationWorld, TickSummary};

use systems::SimClock;

/// Plug this into your App with `.add_plugins(PhysicsPlugin)`.
///
/// Expects [`SimulationWorld`], [`systems::Capture`], [`crate::vision::FrameProcessor`]
/// and [`crate::paint::PaintLayer`] to be inserted already; `main` builds them from
/// the loaded params.
pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimClock>()
            .add_systems(Startup, display::setup_display)
            // One simulation tick per fixed step (rate set in main via Time::<Fixed>)
            .add_systems(FixedUpdate, systems::simulation_tick)
            .add_systems(
                Update,
                (
                    systems::calibration_input,
                    systems::exit_on_esc_if_native,
                    display::upload_textures,
                    display::layout_panels,
                    display::sync_balls,
                    display::draw_calibration_overlay,
                ),
            );

        // Only meaningful on native (std::fs) targets.
        #[cfg(not(target_arch = "wasm32"))]
        app.add_systems(Update, systems::poll_params_reload);
    }
}

use std::path::PathBuf;

use anyhow::Context;
use bevy::prelude::*;
use clap::Parser;

use shadow_splat::config::PHYSICS_HZ;
use shadow_splat::paint::PaintLayer;
use shadow_splat::params::Params;
use shadow_splat::physics::systems::{Capture, ParamsReload};
use shadow_splat::physics::{PhysicsPlugin, SimulationWorld};
use shadow_splat::vision::{CaptureKind, FrameProcessor};

#[derive(Parser, Debug)]
#[command(name = "shadow-splat", about = "Paint balls that bounce off your shadow")]
struct Args {
    /// JSON params file; watched for changes while running.
    #[arg(long)]
    params: Option<PathBuf>,
    /// Use a still image as the camera instead of the synthetic shadow.
    #[arg(long)]
    image: Option<PathBuf>,
    /// Seed for spawn and splatter randomness.
    #[arg(long)]
    seed: Option<u64>,
    /// Start in presentation mode instead of calibration.
    #[arg(long)]
    present: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let params = match &args.params {
        Some(path) => Params::load_from_file(path)
            .with_context(|| format!("loading params from {}", path.display()))?,
        None => Params::default(),
    };
    let (w, h) = (params.capture_width, params.capture_height);

    let kind = args.image.map(CaptureKind::StillImage).unwrap_or_default();
    let capture = Capture::open(kind, w, h).context("opening capture source")?;

    let mut world = match args.seed {
        Some(seed) => SimulationWorld::seeded(params, seed),
        None => SimulationWorld::new(params),
    };
    if args.present {
        world.calibration_mut().toggle();
    }

    let mut app = App::new();
    app
        // White background, like the paint layer
        .insert_resource(ClearColor(Color::WHITE))
        // Configure the fixed timestep clock (used in FixedUpdate)
        .insert_resource(Time::<Fixed>::from_hz(PHYSICS_HZ))
        .insert_resource(capture)
        .insert_resource(FrameProcessor::new(w, h))
        .insert_resource(PaintLayer::new(w, h))
        .insert_resource(world)
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "shadow-splat".into(),
                resizable: true,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(PhysicsPlugin);
    if let Some(path) = args.params {
        app.insert_resource(ParamsReload::new(path));
    }
    app.run();
    Ok(())
}

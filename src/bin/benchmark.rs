//! Headless run of the full tick (capture → mask → world → paint) on the synthetic
//! shadow source, printing where the time goes.

use std::time::{Duration, Instant};

use clap::Parser;

use shadow_splat::config::PHYSICS_HZ;
use shadow_splat::paint::PaintLayer;
use shadow_splat::params::Params;
use shadow_splat::physics::{FrameTime, SimulationWorld};
use shadow_splat::vision::{FrameProcessor, FrameSource, ProcessSettings, SyntheticShadowSource};

#[derive(Parser, Debug)]
#[command(name = "benchmark", about = "Headless simulation timing")]
struct Args {
    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 3600)]
    ticks: u64,
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Optional JSON params file.
    #[arg(long)]
    params: Option<std::path::PathBuf>,
}

#[derive(Default)]
struct Stage {
    total: Duration,
    worst: Duration,
}

impl Stage {
    fn record(&mut self, d: Duration) {
        self.total += d;
        self.worst = self.worst.max(d);
    }

    fn report(&self, name: &str, ticks: u64) {
        let mean_us = self.total.as_secs_f64() * 1e6 / ticks.max(1) as f64;
        println!(
            "{name:>8}: mean {mean_us:>9.1} us   worst {:>9.1} us",
            self.worst.as_secs_f64() * 1e6
        );
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let params = match &args.params {
        Some(p) => Params::load_from_file(p)?,
        None => Params::default(),
    };
    let (w, h) = (params.capture_width, params.capture_height);

    let mut source = SyntheticShadowSource::new(w, h);
    let mut processor = FrameProcessor::new(w, h);
    let mut paint = PaintLayer::new(w, h);
    let mut world = SimulationWorld::seeded(params, args.seed);

    let (mut process, mut step, mut stamp) = (Stage::default(), Stage::default(), Stage::default());
    let (mut spawned, mut removed, mut decals, mut peak) = (0usize, 0usize, 0usize, 0usize);
    let tick_ms = 1000.0 / PHYSICS_HZ;

    for frame in 0..args.ticks {
        let now = FrameTime::new(frame as f64 * tick_ms, frame);

        let t = Instant::now();
        let settings = ProcessSettings::from(world.params());
        let quad = world.calibration().quad;
        let ready = source.is_ready();
        let mask = processor.process(source.current_frame(now.elapsed_ms), &quad, settings);
        process.record(t.elapsed());

        let t = Instant::now();
        let summary = world.step(mask, ready, now);
        step.record(t.elapsed());

        let t = Instant::now();
        paint.fade(world.params().paint_disappear_speed);
        for d in world.decals() {
            paint.stamp(d);
        }
        stamp.record(t.elapsed());

        spawned += summary.spawned;
        removed += summary.removed;
        decals += summary.decals;
        peak = peak.max(world.bodies().len());
    }

    println!("{} ticks at {w}x{h}, seed {}", args.ticks, args.seed);
    process.report("process", args.ticks);
    step.report("step", args.ticks);
    stamp.report("paint", args.ticks);
    println!("spawned {spawned}, removed {removed}, peak live {peak}, decals {decals}");
    Ok(())
}

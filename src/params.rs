//! Runtime tunables.
//!
//! Every field is read by the simulation each tick, so edits take effect on the next
//! tick. The capture size is the exception: changing it requires rebuilding the
//! capture source, frame processor and world (see [`ParamSpec::requires_reinit`]).

use std::{fs, path::Path};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("unknown parameter `{0}`")]
    Unknown(String),
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Registry entry for one named tunable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Changing this value needs a full rebuild instead of taking effect next tick.
    pub requires_reinit: bool,
}

const fn spec(name: &'static str, min: f64, max: f64, step: f64) -> ParamSpec {
    ParamSpec {
        name,
        min,
        max,
        step,
        requires_reinit: false,
    }
}

const fn reinit(name: &'static str, min: f64, max: f64) -> ParamSpec {
    ParamSpec {
        name,
        min,
        max,
        step: 1.0,
        requires_reinit: true,
    }
}

/// Valid ranges for every tunable. Booleans are exposed as 0/1.
pub const PARAM_SPECS: &[ParamSpec] = &[
    spec("show_input_in_presentation", 0.0, 1.0, 1.0),
    spec("quantize", 0.0, 1.0, 1.0),
    spec("quantize_threshold", 0.0, 255.0, 1.0),
    spec("ball_colour", 0.0, 255.0, 1.0),
    spec("color_palette_time", 0.0, 180.0, 1.0),
    spec("ksize", 1.0, 40.0, 1.0),
    spec("gravity", 0.0, 2.0, 0.01),
    spec("max_bounces", 0.0, 10.0, 1.0),
    spec("pop_on_max_bounces", 0.0, 1.0, 1.0),
    spec("lifespan", 1.0, 60.0, 1.0),
    spec("shrink_time", 0.0, 1000.0, 1.0),
    spec("bounciness", 0.0, 1.0, 0.01),
    spec("bounciness_ground", 0.0, 1.0, 0.01),
    spec("squishiness", 0.0, 0.3, 0.005),
    spec("wobble_amp", 0.0, 0.4, 0.001),
    spec("wobble_freq", 0.0, 1.0, 0.001),
    spec("paint_disappear_speed", 0.0, 10.0, 1.0),
    spec("paint_streak_chance", 0.0, 1.0, 0.01),
    spec("paint_streak_vel_threshold", 0.0, 3.0, 0.1),
    spec("bounce_paint_splatter_radius", 0.0, 100.0, 1.0),
    spec("bounce_paint_splatter_density", 0.0, 2.0, 0.1),
    spec("popped_paint_splatter_radius", 0.0, 200.0, 1.0),
    spec("popped_paint_splatter_density", 0.0, 2.0, 0.1),
    reinit("capture_width", 32.0, 1920.0),
    reinit("capture_height", 32.0, 1080.0),
];

pub fn param_spec(name: &str) -> Option<&'static ParamSpec> {
    PARAM_SPECS.iter().find(|s| s.name == name)
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Draw the processed mask underneath the paint in presentation mode.
    pub show_input_in_presentation: bool,

    /// Binarize the processed frame; when off the grey image is used as-is.
    pub quantize: bool,
    pub quantize_threshold: f32,

    /// Grey level the balls are projected in, kept distinct from real shadows.
    pub ball_colour: f32,

    /// Seconds per colour palette window.
    pub color_palette_time: f32,

    /// Box blur kernel size; 1 disables blurring.
    pub ksize: u32,

    /// Added to the vertical velocity every tick.
    pub gravity: f32,

    pub max_bounces: u32,
    /// Treat `bounce_count > max_bounces` as a death condition.
    pub pop_on_max_bounces: bool,

    /// Seconds, before jitter.
    pub lifespan: f32,
    /// Milliseconds a timed-out ball takes to shrink away.
    pub shrink_time: f32,

    /// Restitution against shadows.
    pub bounciness: f32,
    /// Restitution against the floor.
    pub bounciness_ground: f32,

    pub squishiness: f32,
    pub wobble_amp: f32,
    pub wobble_freq: f32,

    /// Alpha (0..255) of the white wash applied to the paint layer every tick.
    pub paint_disappear_speed: f32,

    pub paint_streak_chance: f32,
    pub paint_streak_vel_threshold: f32,

    pub bounce_paint_splatter_radius: f32,
    /// Dots per square pixel of splatter area.
    pub bounce_paint_splatter_density: f32,
    pub popped_paint_splatter_radius: f32,
    pub popped_paint_splatter_density: f32,

    pub capture_width: u32,
    pub capture_height: u32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            show_input_in_presentation: false,
            quantize: true,
            quantize_threshold: 5.0,
            ball_colour: 60.0,
            color_palette_time: 60.0,
            ksize: 1,
            gravity: 0.1,
            max_bounces: 5,
            pop_on_max_bounces: false,
            lifespan: 20.0,
            shrink_time: 160.0,
            bounciness: 0.3,
            bounciness_ground: 0.7,
            squishiness: 0.085,
            wobble_amp: 0.05,
            wobble_freq: 0.615,
            paint_disappear_speed: 0.0,
            paint_streak_chance: 0.4,
            paint_streak_vel_threshold: 1.0,
            bounce_paint_splatter_radius: 5.0,
            bounce_paint_splatter_density: 0.5,
            popped_paint_splatter_radius: 144.0,
            popped_paint_splatter_density: 0.7,
            capture_width: 320,
            capture_height: 180,
        }
    }
}

fn flag(v: bool) -> f64 {
    if v { 1.0 } else { 0.0 }
}

impl Params {
    pub fn get(&self, name: &str) -> Result<f64, ParamsError> {
        let v = match name {
            "show_input_in_presentation" => flag(self.show_input_in_presentation),
            "quantize" => flag(self.quantize),
            "quantize_threshold" => self.quantize_threshold as f64,
            "ball_colour" => self.ball_colour as f64,
            "color_palette_time" => self.color_palette_time as f64,
            "ksize" => self.ksize as f64,
            "gravity" => self.gravity as f64,
            "max_bounces" => self.max_bounces as f64,
            "pop_on_max_bounces" => flag(self.pop_on_max_bounces),
            "lifespan" => self.lifespan as f64,
            "shrink_time" => self.shrink_time as f64,
            "bounciness" => self.bounciness as f64,
            "bounciness_ground" => self.bounciness_ground as f64,
            "squishiness" => self.squishiness as f64,
            "wobble_amp" => self.wobble_amp as f64,
            "wobble_freq" => self.wobble_freq as f64,
            "paint_disappear_speed" => self.paint_disappear_speed as f64,
            "paint_streak_chance" => self.paint_streak_chance as f64,
            "paint_streak_vel_threshold" => self.paint_streak_vel_threshold as f64,
            "bounce_paint_splatter_radius" => self.bounce_paint_splatter_radius as f64,
            "bounce_paint_splatter_density" => self.bounce_paint_splatter_density as f64,
            "popped_paint_splatter_radius" => self.popped_paint_splatter_radius as f64,
            "popped_paint_splatter_density" => self.popped_paint_splatter_density as f64,
            "capture_width" => self.capture_width as f64,
            "capture_height" => self.capture_height as f64,
            other => return Err(ParamsError::Unknown(other.to_string())),
        };
        Ok(v)
    }

    /// Set one tunable by name, clamped to its registered range.
    /// Returns the value actually stored.
    pub fn set(&mut self, name: &str, value: f64) -> Result<f64, ParamsError> {
        let spec = param_spec(name).ok_or_else(|| ParamsError::Unknown(name.to_string()))?;
        let v = if value.is_nan() { spec.min } else { value.clamp(spec.min, spec.max) };
        let on = v >= 0.5;
        match name {
            "show_input_in_presentation" => self.show_input_in_presentation = on,
            "quantize" => self.quantize = on,
            "quantize_threshold" => self.quantize_threshold = v as f32,
            "ball_colour" => self.ball_colour = v as f32,
            "color_palette_time" => self.color_palette_time = v as f32,
            "ksize" => self.ksize = v.round() as u32,
            "gravity" => self.gravity = v as f32,
            "max_bounces" => self.max_bounces = v.round() as u32,
            "pop_on_max_bounces" => self.pop_on_max_bounces = on,
            "lifespan" => self.lifespan = v as f32,
            "shrink_time" => self.shrink_time = v as f32,
            "bounciness" => self.bounciness = v as f32,
            "bounciness_ground" => self.bounciness_ground = v as f32,
            "squishiness" => self.squishiness = v as f32,
            "wobble_amp" => self.wobble_amp = v as f32,
            "wobble_freq" => self.wobble_freq = v as f32,
            "paint_disappear_speed" => self.paint_disappear_speed = v as f32,
            "paint_streak_chance" => self.paint_streak_chance = v as f32,
            "paint_streak_vel_threshold" => self.paint_streak_vel_threshold = v as f32,
            "bounce_paint_splatter_radius" => self.bounce_paint_splatter_radius = v as f32,
            "bounce_paint_splatter_density" => self.bounce_paint_splatter_density = v as f32,
            "popped_paint_splatter_radius" => self.popped_paint_splatter_radius = v as f32,
            "popped_paint_splatter_density" => self.popped_paint_splatter_density = v as f32,
            "capture_width" => self.capture_width = v.round() as u32,
            "capture_height" => self.capture_height = v.round() as u32,
            _ => return Err(ParamsError::Unknown(name.to_string())),
        }
        self.get(name)
    }

    /// Human readable warnings for values outside their registered range.
    pub fn validate(&self) -> Vec<String> {
        let mut w = Vec::new();
        for spec in PARAM_SPECS {
            let Ok(v) = self.get(spec.name) else {
                continue;
            };
            if !(spec.min..=spec.max).contains(&v) {
                w.push(format!(
                    "{} = {v} outside {}..={}; will be clamped",
                    spec.name, spec.min, spec.max
                ));
            }
        }
        if self.quantize && self.ball_colour <= self.quantize_threshold {
            w.push(format!(
                "ball_colour {} is at or below quantize_threshold {}; projected balls will read as shadows",
                self.ball_colour, self.quantize_threshold
            ));
        }
        w
    }

    /// Clamp every tunable into its registered range.
    pub fn clamp_all(&mut self) {
        for spec in PARAM_SPECS {
            if let Ok(v) = self.get(spec.name) {
                // Names come from the registry, so `set` cannot fail here.
                let _ = self.set(spec.name, v);
            }
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let data = fs::read_to_string(path).map_err(|source| ParamsError::Read {
            path: path_str.clone(),
            source,
        })?;
        let mut params: Params = serde_json::from_str(&data).map_err(|source| {
            ParamsError::Parse {
                path: path_str.clone(),
                source,
            }
        })?;
        for warning in params.validate() {
            tracing::warn!("params {}: {}", path_str, warning);
        }
        params.clamp_all();
        Ok(params)
    }

    /// True when switching from `self` to `other` needs a full rebuild.
    pub fn requires_reinit(&self, other: &Params) -> bool {
        PARAM_SPECS
            .iter()
            .filter(|s| s.requires_reinit)
            .any(|s| self.get(s.name).ok() != other.get(s.name).ok())
    }
}

//! Capture collaborators: where raw frames come from.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage, imageops::FilterType};
use thiserror::Error;

use crate::config::READY_WAIT_TICKS;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Delivers frames at a fixed resolution matching the simulation's coordinate space.
pub trait FrameSource: Send + Sync {
    fn size(&self) -> (u32, u32);

    /// Whether the backend has started producing real frames.
    fn is_ready(&self) -> bool {
        true
    }

    /// The frame for this tick. `elapsed_ms` lets synthetic sources animate.
    fn current_frame(&mut self, elapsed_ms: f64) -> &RgbaImage;

    /// The most recently delivered frame, for display.
    fn last_frame(&self) -> &RgbaImage;
}

/// Which source the app captures from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CaptureKind {
    #[default]
    Synthetic,
    StillImage(PathBuf),
}

impl CaptureKind {
    pub fn open(&self, width: u32, height: u32) -> Result<Box<dyn FrameSource>, CaptureError> {
        Ok(match self {
            CaptureKind::Synthetic => Box::new(SyntheticShadowSource::new(width, height)),
            CaptureKind::StillImage(path) => Box::new(StillImageSource::open(path, width, height)?),
        })
    }
}

/// A bright field with a dark disc sweeping across it. Stands in for a camera.
pub struct SyntheticShadowSource {
    frame: RgbaImage,
    radius: f32,
    /// Full left-right sweep period, in milliseconds.
    period_ms: f64,
}

impl SyntheticShadowSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: RgbaImage::new(width, height),
            radius: height as f32 / 6.0,
            period_ms: 12_000.0,
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Centre of the shadow disc at `elapsed_ms`.
    pub fn shadow_center(&self, elapsed_ms: f64) -> (f32, f32) {
        let (w, h) = self.frame.dimensions();
        let phase = (elapsed_ms / self.period_ms * std::f64::consts::TAU) as f32;
        let x = w as f32 * (0.5 + 0.35 * phase.sin());
        let y = h as f32 * 0.7;
        (x, y)
    }
}

impl FrameSource for SyntheticShadowSource {
    fn size(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn current_frame(&mut self, elapsed_ms: f64) -> &RgbaImage {
        let (cx, cy) = self.shadow_center(elapsed_ms);
        let r2 = self.radius * self.radius;
        for (x, y, px) in self.frame.enumerate_pixels_mut() {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            *px = if dx * dx + dy * dy <= r2 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([235, 235, 235, 255])
            };
        }
        &self.frame
    }

    fn last_frame(&self) -> &RgbaImage {
        &self.frame
    }
}

/// Serves the same still image every tick, resized to the capture size.
pub struct StillImageSource {
    frame: RgbaImage,
}

impl StillImageSource {
    pub fn open(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| CaptureError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let frame = image::imageops::resize(&img.to_rgba8(), width, height, FilterType::Triangle);
        tracing::info!(path = %path.display(), width, height, "still image capture loaded");
        Ok(Self { frame })
    }

    pub fn from_image(frame: RgbaImage) -> Self {
        Self { frame }
    }
}

impl FrameSource for StillImageSource {
    fn size(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn current_frame(&mut self, _elapsed_ms: f64) -> &RgbaImage {
        &self.frame
    }

    fn last_frame(&self) -> &RgbaImage {
        &self.frame
    }
}

/// Keeps the simulation inert until the capture backend is ready, or until
/// [`READY_WAIT_TICKS`] ticks have passed, after which readiness is assumed.
#[derive(Debug, Default, Clone)]
pub struct Readiness {
    waited: u32,
    ready: bool,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Call once per tick with the backend's own readiness signal.
    pub fn poll(&mut self, backend_ready: bool) -> bool {
        if self.ready {
            return true;
        }
        if backend_ready {
            tracing::info!(waited = self.waited, "capture backend ready");
            self.ready = true;
        } else {
            self.waited += 1;
            if self.waited > READY_WAIT_TICKS {
                tracing::warn!(
                    waited = self.waited,
                    "capture backend never signalled ready; assuming it is"
                );
                self.ready = true;
            }
        }
        self.ready
    }
}

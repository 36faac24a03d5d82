use bevy::prelude::Resource;
use image::{GrayImage, RgbaImage};

use super::homography::{Homography, Quad};
use super::ops::{CpuBackend, ImageBackend};
use crate::params::Params;

/// Per-frame pipeline knobs, lifted out of [`Params`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSettings {
    pub blur_kernel: u32,
    pub quantize: bool,
    pub threshold: u8,
}

impl From<&Params> for ProcessSettings {
    fn from(p: &Params) -> Self {
        Self {
            blur_kernel: p.ksize,
            quantize: p.quantize,
            threshold: p.quantize_threshold.round().clamp(0.0, 255.0) as u8,
        }
    }
}

/// Warp → grayscale → blur → threshold, producing the silhouette mask.
///
/// Owns its working buffers. The mask from the call before the latest one is kept
/// as [`FrameProcessor::previous_mask`]; anything older is the caller's business.
#[derive(Resource)]
pub struct FrameProcessor {
    width: u32,
    height: u32,
    backend: Box<dyn ImageBackend>,
    /// Cached transform and the quad it was solved for.
    transform: Option<(Quad, Homography)>,
    warped: RgbaImage,
    mask: GrayImage,
    previous: GrayImage,
}

impl FrameProcessor {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_backend(width, height, Box::new(CpuBackend))
    }

    pub fn with_backend(width: u32, height: u32, backend: Box<dyn ImageBackend>) -> Self {
        Self {
            width,
            height,
            backend,
            transform: None,
            warped: RgbaImage::new(width, height),
            mask: GrayImage::new(width, height),
            previous: GrayImage::new(width, height),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The mask produced by the last `process` call (blank before the first).
    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// The mask produced by the call before the last one.
    pub fn previous_mask(&self) -> &GrayImage {
        &self.previous
    }

    /// Homography sampling the raw frame for each capture-rectangle pixel.
    /// A degenerate quad yields identity.
    pub fn transform_for(&mut self, input: &Quad) -> Homography {
        if let Some((quad, h)) = &self.transform {
            if quad == input {
                return *h;
            }
        }
        let rect = Quad::rect(self.width as f32, self.height as f32);
        // Solve rect → input so every destination pixel maps straight to its source.
        let h = Homography::between_or_identity(&rect, input);
        self.transform = Some((*input, h));
        h
    }

    pub fn process(
        &mut self,
        raw: &RgbaImage,
        input: &Quad,
        settings: ProcessSettings,
    ) -> &GrayImage {
        let h = self.transform_for(input);
        std::mem::swap(&mut self.previous, &mut self.mask);
        self.backend.warp_perspective(raw, &h, &mut self.warped);
        self.backend.to_grayscale(&self.warped, &mut self.mask);
        if settings.blur_kernel > 1 {
            self.backend.box_blur(&mut self.mask, settings.blur_kernel);
        }
        if settings.quantize {
            self.backend.threshold(&mut self.mask, settings.threshold, 255);
        }
        &self.mask
    }
}

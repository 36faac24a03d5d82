//! Camera side of the installation: capture sources and the frame pipeline that turns
//! a raw frame into the silhouette mask.

pub mod capture;
pub mod homography;
pub mod ops;
pub mod processor;

pub use capture::{CaptureError, CaptureKind, FrameSource, Readiness, StillImageSource, SyntheticShadowSource};
pub use homography::{Corner, Homography, Quad};
pub use ops::{CpuBackend, ImageBackend};
pub use processor::{FrameProcessor, ProcessSettings};

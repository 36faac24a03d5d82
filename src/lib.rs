//! Shadow-mask paint installation: balls fall through a webcam silhouette, bounce
//! off shadows, and splatter paint when a shadow reaches their core.

pub mod config;
pub mod paint;
pub mod palette;
pub mod params;
pub mod physics;
pub mod vision;

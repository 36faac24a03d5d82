//! Paint colours and the time-windowed palette schedule.

use crate::config::PALETTES;

/// Opaque sRGB paint colour. Fixed for a body's lifetime once picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaintColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PaintColor {
    pub const WHITE: PaintColor = PaintColor::grey(255);

    pub const fn grey(v: u8) -> Self {
        Self { r: v, g: v, b: v }
    }

    /// Parse `RRGGBB` (an optional leading `#` is accepted).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

/// Picks the active palette by splitting elapsed time into fixed-length windows.
#[derive(Debug, Clone)]
pub struct PaletteSchedule {
    palettes: Vec<Vec<PaintColor>>,
    last_index: Option<usize>,
}

impl Default for PaletteSchedule {
    fn default() -> Self {
        Self::new(
            PALETTES
                .iter()
                .map(|p| p.iter().filter_map(|h| PaintColor::from_hex(h)).collect())
                .collect(),
        )
    }
}

impl PaletteSchedule {
    pub fn new(palettes: Vec<Vec<PaintColor>>) -> Self {
        let palettes = palettes.into_iter().filter(|p| !p.is_empty()).collect();
        Self {
            palettes,
            last_index: None,
        }
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    /// `floor(elapsed / window) mod len`; a zero-length window pins palette 0.
    pub fn index_at(&self, elapsed_secs: f64, window_secs: f32) -> usize {
        if self.palettes.is_empty() || window_secs <= 0.0 || !elapsed_secs.is_finite() {
            return 0;
        }
        let window = (elapsed_secs.max(0.0) / window_secs as f64).floor() as u64;
        (window % self.palettes.len() as u64) as usize
    }

    /// Active palette, logging when the window rolls over.
    pub fn active(&mut self, elapsed_secs: f64, window_secs: f32) -> &[PaintColor] {
        let index = self.index_at(elapsed_secs, window_secs);
        if self.last_index != Some(index) {
            tracing::info!(palette = index, "palette window changed");
            self.last_index = Some(index);
        }
        self.palettes.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

use serde::{Deserialize, Serialize};

use crate::canvas::PaintColor;
use crate::ops::brush::{BrushEngine, BrushKind};

/// Brush sizes the size button steps through.
pub const DEFAULT_BRUSH_SIZES: [u32; 3] = [8, 16, 24];

// ============================================================================
// DRAW MODE
// ============================================================================

/// Which operation a press or drag performs. Exactly one is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    #[default]
    Pencil,
    Marker,
    PaintBucket,
    Sticker,
}

impl DrawMode {
    pub fn label(&self) -> &'static str {
        match self {
            DrawMode::Pencil => "Pencil",
            DrawMode::Marker => "Marker",
            DrawMode::PaintBucket => "Paint Bucket",
            DrawMode::Sticker => "Sticker",
        }
    }

    pub fn all() -> &'static [DrawMode] {
        &[
            DrawMode::Pencil,
            DrawMode::Marker,
            DrawMode::PaintBucket,
            DrawMode::Sticker,
        ]
    }

    /// Brush compositing for the modes that paint with a disc.
    pub fn brush_kind(&self) -> Option<BrushKind> {
        match self {
            DrawMode::Pencil => Some(BrushKind::Opaque),
            DrawMode::Marker => Some(BrushKind::Additive),
            DrawMode::PaintBucket | DrawMode::Sticker => None,
        }
    }
}

// ============================================================================
// BRUSH SIZE
// ============================================================================

/// A brush size chosen from a fixed, wrapping sequence of steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrushSize {
    steps: Vec<u32>,
    index: usize,
}

impl Default for BrushSize {
    fn default() -> Self {
        Self::new(DEFAULT_BRUSH_SIZES.to_vec())
    }
}

impl BrushSize {
    /// Zero sizes are dropped; an empty sequence falls back to the defaults.
    pub fn new(steps: Vec<u32>) -> Self {
        let steps: Vec<u32> = steps.into_iter().filter(|&s| s > 0).collect();
        let steps = if steps.is_empty() {
            DEFAULT_BRUSH_SIZES.to_vec()
        } else {
            steps
        };
        Self { steps, index: 0 }
    }

    pub fn value(&self) -> u32 {
        self.steps[self.index]
    }

    /// Advance to the next size, wrapping to the first. Returns the new size.
    pub fn cycle(&mut self) -> u32 {
        self.index = (self.index + 1) % self.steps.len();
        self.value()
    }

    pub fn steps(&self) -> &[u32] {
        &self.steps
    }
}

// ============================================================================
// TOOL STATE
// ============================================================================

/// The active painting configuration of a session.
#[derive(Clone, Debug)]
pub struct ToolState {
    pub draw_mode: DrawMode,
    pub brush_size: BrushSize,
    pub paint_color: PaintColor,
    pub selected_sticker: usize,
    /// Gate writes by the region under the press point.
    pub use_lock_area: bool,
}

impl ToolState {
    pub fn new(brush_size: BrushSize, paint_color: PaintColor, use_lock_area: bool) -> Self {
        Self {
            draw_mode: DrawMode::default(),
            brush_size,
            paint_color,
            selected_sticker: 0,
            use_lock_area,
        }
    }

    /// Brush for the current mode, if the mode paints with one.
    pub fn brush(&self) -> Option<BrushEngine> {
        self.draw_mode
            .brush_kind()
            .map(|kind| BrushEngine::new(kind, self.brush_size.value(), self.paint_color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn brush_size_wraps() {
        let mut size = BrushSize::default();
        assert_eq!(size.value(), 8);
        assert_eq!(size.cycle(), 16);
        assert_eq!(size.cycle(), 24);
        assert_eq!(size.cycle(), 8);
    }

    #[test]
    fn brush_size_ignores_zero_steps() {
        assert_eq!(BrushSize::new(vec![0, 0]).steps(), &DEFAULT_BRUSH_SIZES);
        assert_eq!(BrushSize::new(vec![0, 5]).steps(), &[5]);
    }

    #[test]
    fn brush_follows_mode() {
        let mut tools = ToolState::new(BrushSize::default(), Rgba([1, 2, 3, 255]), false);
        assert_eq!(tools.brush().map(|b| b.kind), Some(BrushKind::Opaque));
        tools.draw_mode = DrawMode::Marker;
        assert_eq!(tools.brush().map(|b| b.kind), Some(BrushKind::Additive));
        tools.draw_mode = DrawMode::PaintBucket;
        assert!(tools.brush().is_none());
    }
}

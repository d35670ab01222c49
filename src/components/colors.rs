use image::Rgba;

use crate::canvas::PaintColor;

/// Crayon box shown next to the page. Red first, which is also the starting color.
pub const DEFAULT_PALETTE: [[u8; 4]; 12] = [
    [255, 0, 0, 255],
    [255, 128, 0, 255],
    [255, 221, 0, 255],
    [128, 200, 0, 255],
    [0, 160, 60, 255],
    [0, 200, 200, 255],
    [0, 110, 255, 255],
    [90, 40, 200, 255],
    [220, 60, 180, 255],
    [140, 80, 40, 255],
    [0, 0, 0, 255],
    [255, 255, 255, 255],
];

/// Selectable paint colors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<PaintColor>,
    selected: usize,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(&DEFAULT_PALETTE)
    }
}

impl Palette {
    /// An empty list falls back to the default palette.
    pub fn new(colors: &[[u8; 4]]) -> Self {
        let source: &[[u8; 4]] = if colors.is_empty() {
            &DEFAULT_PALETTE
        } else {
            colors
        };
        Self {
            colors: source.iter().map(|&c| Rgba(c)).collect(),
            selected: 0,
        }
    }

    pub fn selected(&self) -> PaintColor {
        self.colors[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Select by index. Out-of-range indices leave the selection unchanged.
    pub fn select(&mut self, index: usize) -> Option<PaintColor> {
        let color = *self.colors.get(index)?;
        self.selected = index;
        Some(color)
    }

    pub fn colors(&self) -> &[PaintColor] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

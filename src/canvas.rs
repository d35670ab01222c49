use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::{PaintError, PaintResult};

/// Default canvas size when no template image dictates one.
pub const DEFAULT_WIDTH: u32 = 576;
pub const DEFAULT_HEIGHT: u32 = 1024;

/// Bytes per RGBA8 pixel.
pub const CHANNELS: usize = 4;

/// Opaque white, the color of a cleared page.
pub const BLANK: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A color as picked from the palette. Read-only to painting code during a stroke.
pub type PaintColor = Rgba<u8>;

// ============================================================================
// PIXEL BUFFER
// ============================================================================

/// Owned RGBA8 raster, row-major, four bytes per pixel in R,G,B,A order.
///
/// The byte length is fixed at `width * height * 4` for the lifetime of the
/// buffer. Per-pixel accessors do not bounds-check beyond the slice indexing
/// Rust performs; callers clamp at the stroke or fill boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
    /// Set by every mutation, consumed by the renderer.
    dirty: bool,
}

impl PixelBuffer {
    /// Create a cleared (opaque white) canvas.
    pub fn new(width: u32, height: u32) -> PaintResult<Self> {
        if width == 0 || height == 0 {
            return Err(PaintError::Dimensions { width, height });
        }
        let mut buffer = Self {
            width,
            height,
            bytes: vec![0; width as usize * height as usize * CHANNELS],
            dirty: true,
        };
        buffer.clear();
        Ok(buffer)
    }

    /// Wrap existing RGBA8 bytes. The length must describe exactly one
    /// `width` x `height` image.
    pub fn from_raw(width: u32, height: u32, bytes: Vec<u8>) -> PaintResult<Self> {
        if width == 0 || height == 0 {
            return Err(PaintError::Dimensions { width, height });
        }
        let expected = width as usize * height as usize * CHANNELS;
        if bytes.len() != expected {
            return Err(PaintError::BufferSize {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bytes,
            dirty: true,
        })
    }

    pub fn from_rgba_image(image: &RgbaImage) -> PaintResult<Self> {
        Self::from_raw(image.width(), image.height(), image.as_raw().clone())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Byte offset of channel 0 of pixel `(x, y)`.
    #[inline(always)]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Flat pixel index of `(x, y)`, as used by [`RegionMask`].
    #[inline(always)]
    pub fn pixel_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// True when signed canvas coordinates land on a pixel.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> PaintColor {
        self.get_at(self.index(x, y))
    }

    /// Read the pixel starting at byte offset `offset`.
    #[inline(always)]
    pub fn get_at(&self, offset: usize) -> PaintColor {
        let p = &self.bytes[offset..offset + CHANNELS];
        Rgba([p[0], p[1], p[2], p[3]])
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: PaintColor) {
        let offset = self.index(x, y);
        self.set_at(offset, color);
    }

    /// Write the pixel starting at byte offset `offset`. Does not touch the
    /// dirty flag; batch writers call [`PixelBuffer::mark_dirty`] once.
    #[inline(always)]
    pub fn set_at(&mut self, offset: usize, color: PaintColor) {
        self.bytes[offset..offset + CHANNELS].copy_from_slice(&color.0);
    }

    /// Set every pixel to `color`.
    pub fn fill(&mut self, color: PaintColor) {
        self.bytes
            .par_chunks_mut(CHANNELS)
            .for_each(|px| px.copy_from_slice(&color.0));
        self.dirty = true;
    }

    /// Reset to opaque white.
    pub fn clear(&mut self) {
        self.fill(BLANK);
    }

    /// Replace the contents with a raw snapshot of the same layout.
    /// On a length mismatch the buffer is left untouched.
    pub fn load_raw(&mut self, bytes: &[u8]) -> PaintResult<()> {
        if bytes.len() != self.bytes.len() {
            return Err(PaintError::BufferSize {
                expected: self.bytes.len(),
                actual: bytes.len(),
            });
        }
        self.bytes.copy_from_slice(bytes);
        self.dirty = true;
        Ok(())
    }

    pub fn copy_from(&mut self, other: &PixelBuffer) -> PaintResult<()> {
        if other.width != self.width || other.height != self.height {
            return Err(PaintError::BufferSize {
                expected: self.bytes.len(),
                actual: other.bytes.len(),
            });
        }
        self.load_raw(&other.bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    // -- renderer synchronisation ------------------------------------------

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return whether the buffer changed since the last call, and reset the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

// ============================================================================
// REGION MASK
// ============================================================================

/// One byte per pixel, each either 0 or 1.
///
/// Serves both as the visited set of a flood fill and as the area lock that
/// gates brush writes during a stroke.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionMask {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl RegionMask {
    /// An empty mask (no pixel marked).
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
        }
    }

    pub fn for_buffer(buffer: &PixelBuffer) -> Self {
        Self::new(buffer.width(), buffer.height())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the mask is laid out for a `width` x `height` canvas.
    #[inline]
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Unmark every pixel, keeping the allocation.
    pub fn reset(&mut self) {
        self.cells.fill(0);
    }

    #[inline(always)]
    pub fn is_marked(&self, pixel: usize) -> bool {
        self.cells[pixel] == 1
    }

    #[inline(always)]
    pub fn mark(&mut self, pixel: usize) {
        self.cells[pixel] = 1;
    }

    #[inline(always)]
    pub fn unmark(&mut self, pixel: usize) {
        self.cells[pixel] = 0;
    }

    /// Whether `(x, y)` belongs to the region.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.height
            && self.is_marked(y as usize * self.width as usize + x as usize)
    }

    /// Number of marked pixels.
    pub fn count(&self) -> usize {
        self.cells.par_iter().filter(|&&c| c == 1).count()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_opaque_white() {
        let buf = PixelBuffer::new(3, 2).unwrap();
        assert_eq!(buf.as_bytes().len(), 3 * 2 * 4);
        assert!(buf.as_bytes().iter().all(|&b| b == 255));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            PixelBuffer::new(0, 10),
            Err(PaintError::Dimensions { width: 0, height: 10 })
        ));
    }

    #[test]
    fn index_is_row_major() {
        let buf = PixelBuffer::new(5, 4).unwrap();
        assert_eq!(buf.index(0, 0), 0);
        assert_eq!(buf.index(1, 0), 4);
        assert_eq!(buf.index(0, 1), 20);
        assert_eq!(buf.index(4, 3), (3 * 5 + 4) * 4);
    }

    #[test]
    fn set_then_get() {
        let mut buf = PixelBuffer::new(4, 4).unwrap();
        let red = Rgba([255, 0, 0, 255]);
        buf.set(2, 3, red);
        assert_eq!(buf.get(2, 3), red);
        assert_eq!(buf.get(3, 2), BLANK);
    }

    #[test]
    fn load_raw_rejects_wrong_length_and_keeps_contents() {
        let mut buf = PixelBuffer::new(2, 2).unwrap();
        buf.set(0, 0, Rgba([1, 2, 3, 4]));
        let before = buf.as_bytes().to_vec();

        let err = buf.load_raw(&[0; 15]).unwrap_err();
        assert!(matches!(err, PaintError::BufferSize { expected: 16, actual: 15 }));
        assert_eq!(buf.as_bytes(), &before[..]);

        buf.load_raw(&[7; 16]).unwrap();
        assert_eq!(buf.get(1, 1), Rgba([7, 7, 7, 7]));
    }

    #[test]
    fn copy_from_requires_matching_dimensions() {
        let mut a = PixelBuffer::new(2, 2).unwrap();
        let mut b = PixelBuffer::new(2, 2).unwrap();
        b.fill(Rgba([9, 9, 9, 9]));
        a.copy_from(&b).unwrap();
        assert_eq!(a, b);

        let c = PixelBuffer::new(3, 2).unwrap();
        assert!(a.copy_from(&c).is_err());
    }

    #[test]
    fn take_dirty_resets_flag() {
        let mut buf = PixelBuffer::new(2, 2).unwrap();
        assert!(buf.take_dirty());
        assert!(!buf.take_dirty());
        buf.fill(Rgba([0, 0, 0, 255]));
        assert!(buf.is_dirty());
        assert!(buf.take_dirty());
    }

    #[test]
    fn region_mask_marks_and_counts() {
        let mut mask = RegionMask::new(4, 4);
        mask.mark(5);
        mask.mark(6);
        assert!(mask.contains(1, 1));
        assert!(mask.contains(2, 1));
        assert!(!mask.contains(3, 1));
        assert!(!mask.contains(9, 9));
        assert_eq!(mask.count(), 2);
        mask.reset();
        assert_eq!(mask.count(), 0);
    }
}

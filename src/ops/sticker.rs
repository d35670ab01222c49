// ============================================================================
// STICKERS: fixed-size bitmap stamps with binary alpha
// ============================================================================

use image::RgbaImage;

use crate::canvas::{CHANNELS, PixelBuffer, RegionMask};
use crate::error::{PaintError, PaintResult};

/// Smallest top-left row a sticker may be placed at.
pub const STICKER_MIN_Y: i64 = 1;

/// An immutable sticker bitmap.
///
/// Alpha is binarized on construction: any non-zero alpha becomes 255, so a
/// pixel is either fully stamped or skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StickerBitmap {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
    half_width: u32,
    half_height: u32,
}

impl StickerBitmap {
    pub fn from_raw(width: u32, height: u32, mut bytes: Vec<u8>) -> PaintResult<Self> {
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
        for px in bytes.chunks_exact_mut(CHANNELS) {
            px[3] = if px[3] > 0 { 255 } else { 0 };
        }
        Ok(Self {
            width,
            height,
            bytes,
            half_width: width / 2,
            half_height: height / 2,
        })
    }

    pub fn from_rgba_image(image: &RgbaImage) -> PaintResult<Self> {
        Self::from_raw(image.width(), image.height(), image.as_raw().clone())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn half_width(&self) -> u32 {
        self.half_width
    }

    pub fn half_height(&self) -> u32 {
        self.half_height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Top-left corner for a sticker centred on `(px, py)`, clamped so the
    /// footprint stays on a `width` x `height` canvas.
    ///
    /// `x` lands in `[0, width - sticker_width]` and `y` in
    /// `[1, height - sticker_height]`: the top row of the canvas is never a
    /// sticker's first row.
    pub fn origin(&self, px: i32, py: i32, width: u32, height: u32) -> (i64, i64) {
        let max_x = width as i64 - self.width as i64;
        let max_y = height as i64 - self.height as i64;
        let x = (px as i64 - self.half_width as i64).min(max_x).max(0);
        let y = (py as i64 - self.half_height as i64).min(max_y).max(STICKER_MIN_Y);
        (x, y)
    }

    /// Stamp onto `buffer` centred on `(px, py)`.
    ///
    /// Pixels with zero alpha leave the destination untouched. A sticker
    /// larger than the canvas is cropped at the canvas edge, and a lock sized
    /// for another canvas admits nothing. Returns the number of pixels written.
    pub fn place(
        &self,
        buffer: &mut PixelBuffer,
        px: i32,
        py: i32,
        lock: Option<&RegionMask>,
    ) -> usize {
        let (bw, bh) = (buffer.width() as i64, buffer.height() as i64);
        let (start_x, start_y) = self.origin(px, py, buffer.width(), buffer.height());
        let cols = (self.width as i64).min(bw - start_x);
        let rows = (self.height as i64).min(bh - start_y);
        let lock_mismatch = lock.is_some_and(|l| !l.fits(buffer.width(), buffer.height()));
        if cols <= 0 || rows <= 0 || lock_mismatch {
            return 0;
        }

        let mut written = 0;
        for sy in 0..rows as u32 {
            let dy = (start_y + sy as i64) as u32;
            for sx in 0..cols as u32 {
                let src = (sy as usize * self.width as usize + sx as usize) * CHANNELS;
                if self.bytes[src + 3] == 0 {
                    continue;
                }
                let pixel = buffer.pixel_index((start_x + sx as i64) as u32, dy);
                if lock.is_some_and(|l| !l.is_marked(pixel)) {
                    continue;
                }
                let dst = pixel * CHANNELS;
                let color = image::Rgba([
                    self.bytes[src],
                    self.bytes[src + 1],
                    self.bytes[src + 2],
                    self.bytes[src + 3],
                ]);
                buffer.set_at(dst, color);
                written += 1;
            }
        }
        if written > 0 {
            buffer.mark_dirty();
        }
        written
    }
}

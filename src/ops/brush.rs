// ============================================================================
// BRUSH ENGINE: circular stamps and Bresenham-spaced line strokes
// ============================================================================

use crate::canvas::{CHANNELS, PaintColor, PixelBuffer, RegionMask};

/// Fraction of the distance to the brush color an additive touch covers at
/// full brush alpha.
pub const ADDITIVE_STRENGTH: f32 = 0.1;

/// How a brush stamp combines with the pixels underneath.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushKind {
    /// Replace the pixel with the brush color (pencil).
    Opaque,
    /// Move the pixel part of the way toward the brush color (marker).
    Additive,
}

/// Clip the `[-radius, radius)` offset range around `center` to `[0, limit)`.
#[inline]
fn clipped_span(center: i32, radius: i32, limit: u32) -> std::ops::Range<i32> {
    let lo = (center as i64 - radius as i64).max(0);
    let hi = (center as i64 + radius as i64).min(limit as i64);
    if lo >= hi {
        return 0..0;
    }
    (lo - center as i64) as i32..(hi - center as i64) as i32
}

/// Visit every in-bounds, unlocked pixel offset `(tx, ty)` with
/// `tx² + ty² < radius²` in a `2r × 2r` box around `(x, y)` on a
/// `width` x `height` canvas. The callback receives the pixel's byte offset.
/// A lock laid out for another canvas size admits nothing.
#[inline]
fn for_each_disc_pixel<F>(
    (width, height): (u32, u32),
    x: i32,
    y: i32,
    radius: u32,
    lock: Option<&RegionMask>,
    mut visit: F,
) where
    F: FnMut(usize),
{
    if radius == 0 || lock.is_some_and(|l| !l.fits(width, height)) {
        return;
    }
    let r = radius.min(i32::MAX as u32 / 2) as i32;
    let r2 = r as i64 * r as i64;
    let xs = clipped_span(x, r, width);
    for ty in clipped_span(y, r, height) {
        let row = (y + ty) as usize * width as usize;
        for tx in xs.clone() {
            if (tx as i64 * tx as i64) + (ty as i64 * ty as i64) >= r2 {
                continue;
            }
            let pixel = row + (x + tx) as usize;
            if lock.is_none_or(|l| l.is_marked(pixel)) {
                visit(pixel * CHANNELS);
            }
        }
    }
}

/// Stamp a solid disc of `color`.
pub fn draw_circle(
    buffer: &mut PixelBuffer,
    x: i32,
    y: i32,
    radius: u32,
    color: PaintColor,
    lock: Option<&RegionMask>,
) {
    let size = (buffer.width(), buffer.height());
    let mut touched = false;
    for_each_disc_pixel(size, x, y, radius, lock, |offset| {
        buffer.set_at(offset, color);
        touched = true;
    });
    if touched {
        buffer.mark_dirty();
    }
}

/// Stamp a disc that blends each pixel toward `color` by
/// `color.alpha / 255 * ADDITIVE_STRENGTH`, reading the pre-write value.
pub fn draw_additive_circle(
    buffer: &mut PixelBuffer,
    x: i32,
    y: i32,
    radius: u32,
    color: PaintColor,
    lock: Option<&RegionMask>,
) {
    let t = color.0[3] as f32 / 255.0 * ADDITIVE_STRENGTH;
    let size = (buffer.width(), buffer.height());
    let mut touched = false;
    for_each_disc_pixel(size, x, y, radius, lock, |offset| {
        let old = buffer.get_at(offset);
        let mut blended = old;
        for c in 0..CHANNELS {
            let from = old.0[c] as f32;
            let to = color.0[c] as f32;
            blended.0[c] = (from + (to - from) * t) as u8;
        }
        buffer.set_at(offset, blended);
        touched = true;
    });
    if touched {
        buffer.mark_dirty();
    }
}

/// Walk the integer Bresenham path from `start` to `end` (inclusive), calling
/// `stamp` each time more than `min_distance` steps have passed since the
/// previous stamp.
pub fn bresenham_stamps<F>(start: (i32, i32), end: (i32, i32), min_distance: u32, mut stamp: F)
where
    F: FnMut(i32, i32),
{
    // i64 so that any pair of i32 endpoints is safe.
    let (mut x0, mut y0) = (start.0 as i64, start.1 as i64);
    let (x1, y1) = (end.0 as i64, end.1 as i64);
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;
    let mut count = 0u32;

    loop {
        count += 1;
        if count > min_distance {
            count = 0;
            // Every lattice point lies between the two i32 endpoints.
            stamp(x0 as i32, y0 as i32);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// A configured brush: size doubles as stamp radius, half the size is the
/// minimum spacing between stamps along a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrushEngine {
    pub kind: BrushKind,
    pub size: u32,
    pub color: PaintColor,
}

impl BrushEngine {
    pub fn new(kind: BrushKind, size: u32, color: PaintColor) -> Self {
        Self { kind, size, color }
    }

    /// Steps between stamps along a line.
    #[inline]
    pub fn spacing(&self) -> u32 {
        self.size >> 1
    }

    /// One stamp centred on `(x, y)`.
    pub fn stamp(&self, buffer: &mut PixelBuffer, x: i32, y: i32, lock: Option<&RegionMask>) {
        match self.kind {
            BrushKind::Opaque => draw_circle(buffer, x, y, self.size, self.color, lock),
            BrushKind::Additive => draw_additive_circle(buffer, x, y, self.size, self.color, lock),
        }
    }

    /// Connect two points with evenly spaced stamps.
    pub fn draw_line(
        &self,
        buffer: &mut PixelBuffer,
        start: (i32, i32),
        end: (i32, i32),
        lock: Option<&RegionMask>,
    ) {
        bresenham_stamps(start, end, self.spacing(), |x, y| self.stamp(buffer, x, y, lock));
    }
}

// ============================================================================
// FLOOD FILL: threshold matching, color fill, and area-lock masks
// ============================================================================

use std::collections::VecDeque;

use crate::canvas::{PaintColor, PixelBuffer, RegionMask};

/// Largest per-channel difference still treated as "the same color".
///
/// Half the byte range. This is deliberately loose: most neighbouring colors
/// pass, and only a channel on the far side of the range stops the fill.
pub const CHANNEL_THRESHOLD: u8 = 128;

// ============================================================================
// THRESHOLD MATCHER
// ============================================================================

/// Channel-wise approximate color comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThresholdMatcher {
    pub threshold: u8,
}

impl Default for ThresholdMatcher {
    fn default() -> Self {
        Self {
            threshold: CHANNEL_THRESHOLD,
        }
    }
}

impl ThresholdMatcher {
    /// Order-independent `|a - b| <= threshold`.
    #[inline(always)]
    pub fn matches(&self, a: u8, b: u8) -> bool {
        a.abs_diff(b) <= self.threshold
    }

    /// All four channels match.
    #[inline(always)]
    pub fn matches_color(&self, a: PaintColor, b: PaintColor) -> bool {
        self.matches(a.0[0], b.0[0])
            && self.matches(a.0[1], b.0[1])
            && self.matches(a.0[2], b.0[2])
            && self.matches(a.0[3], b.0[3])
    }

    /// Every channel matches at least one of `a` or `b`, independently.
    #[inline(always)]
    pub fn matches_either(&self, p: PaintColor, a: PaintColor, b: PaintColor) -> bool {
        (0..4).all(|c| self.matches(p.0[c], a.0[c]) || self.matches(p.0[c], b.0[c]))
    }
}

// ============================================================================
// REGION TRAVERSAL
// ============================================================================

/// Breadth-first 4-connected traversal from `seed`.
///
/// `region` doubles as the visited set and the result: it must arrive empty,
/// and on return holds exactly the reached pixels. `qualifies` receives flat
/// pixel indices of unvisited neighbours; `visit` sees each reached pixel once,
/// as it is dequeued. Returns the region size.
fn flood_region<F, V>(
    width: u32,
    height: u32,
    seed: (u32, u32),
    region: &mut RegionMask,
    queue: &mut VecDeque<usize>,
    mut qualifies: F,
    mut visit: V,
) -> usize
where
    F: FnMut(usize) -> bool,
    V: FnMut(usize),
{
    let wu = width as usize;
    let hu = height as usize;
    let seed_idx = seed.1 as usize * wu + seed.0 as usize;

    queue.clear();
    region.mark(seed_idx);
    queue.push_back(seed_idx);
    let mut count = 1;

    while let Some(idx) = queue.pop_front() {
        visit(idx);
        let x = idx % wu;
        let y = idx / wu;

        // Down, right, left, up.
        let neighbours = [
            (y > 0).then(|| idx - wu),
            (x + 1 < wu).then(|| idx + 1),
            (x > 0).then(|| idx - 1),
            (y + 1 < hu).then(|| idx + wu),
        ];
        for ni in neighbours.into_iter().flatten() {
            if !region.is_marked(ni) && qualifies(ni) {
                region.mark(ni);
                queue.push_back(ni);
                count += 1;
            }
        }
    }

    count
}

// ============================================================================
// FLOOD FILL ENGINE
// ============================================================================

/// Region fills over a paint buffer, optionally bounded by a reference mask.
///
/// Holds the work queue, the reached-pixel list and a scratch visited mask so
/// repeated fills during one drag do not reallocate. The visited mask is
/// empty between calls; each fill unmarks only the pixels it reached.
#[derive(Debug, Default)]
pub struct FloodFillEngine {
    pub matcher: ThresholdMatcher,
    queue: VecDeque<usize>,
    reached: Vec<usize>,
    visited: Option<RegionMask>,
}

impl FloodFillEngine {
    pub fn new(matcher: ThresholdMatcher) -> Self {
        Self {
            matcher,
            queue: VecDeque::new(),
            reached: Vec::new(),
            visited: None,
        }
    }

    /// Fill the region around `(x, y)` with `color`.
    ///
    /// Region boundaries come from `reference` when given (coloring-page
    /// fill), otherwise from `canvas` itself. When `lock` is given, only its
    /// marked pixels are written; a lock of another size writes nothing. If the hit color already equals `color` the
    /// call is a no-op. Returns the number of pixels written.
    pub fn fill(
        &mut self,
        canvas: &mut PixelBuffer,
        reference: Option<&PixelBuffer>,
        x: u32,
        y: u32,
        color: PaintColor,
        lock: Option<&RegionMask>,
    ) -> usize {
        let (width, height) = (canvas.width(), canvas.height());
        if x >= width || y >= height || lock.is_some_and(|l| !l.fits(width, height)) {
            return 0;
        }
        if let Some(r) = reference
            && (r.width() != width || r.height() != height)
        {
            return 0;
        }

        let source: &PixelBuffer = reference.unwrap_or(canvas);
        let hit = source.get(x, y);
        if hit == color {
            return 0;
        }

        let mut visited = match self.visited.take() {
            Some(m) if m.fits(width, height) => m,
            _ => RegionMask::new(width, height),
        };

        let matcher = self.matcher;
        let reached = &mut self.reached;
        reached.clear();
        flood_region(
            width,
            height,
            (x, y),
            &mut visited,
            &mut self.queue,
            |ni| matcher.matches_color(source.get_at(ni * 4), hit),
            |idx| reached.push(idx),
        );

        let mut written = 0;
        for &pixel in self.reached.iter() {
            visited.unmark(pixel);
            if lock.is_none_or(|l| l.is_marked(pixel)) {
                canvas.set_at(pixel * 4, color);
                written += 1;
            }
        }
        if written > 0 {
            canvas.mark_dirty();
        }

        self.visited = Some(visited);
        written
    }

    /// Compute the area lock for a stroke starting at `(x, y)` into `lock`.
    ///
    /// With a `reference` mask, neighbours qualify when they match the
    /// reference's hit color. Without one the paint buffer is used and a
    /// channel also qualifies when it matches `paint_color`, so regions the
    /// user already colored stay reachable. Returns the region size, or 0 when
    /// the seed is outside the canvas (the lock is left empty).
    pub fn lock_region(
        &mut self,
        canvas: &PixelBuffer,
        reference: Option<&PixelBuffer>,
        x: u32,
        y: u32,
        paint_color: PaintColor,
        lock: &mut RegionMask,
    ) -> usize {
        lock.reset();
        let (width, height) = (canvas.width(), canvas.height());
        if x >= width || y >= height || !lock.fits(width, height) {
            return 0;
        }

        let matcher = self.matcher;
        match reference {
            Some(mask) if mask.width() == width && mask.height() == height => {
                let hit = mask.get(x, y);
                flood_region(
                    width,
                    height,
                    (x, y),
                    lock,
                    &mut self.queue,
                    |ni| matcher.matches_color(mask.get_at(ni * 4), hit),
                    |_| {},
                )
            }
            Some(_) => 0,
            None => {
                let hit = canvas.get(x, y);
                flood_region(
                    width,
                    height,
                    (x, y),
                    lock,
                    &mut self.queue,
                    |ni| matcher.matches_either(canvas.get_at(ni * 4), hit, paint_color),
                    |_| {},
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: PaintColor = Rgba([255, 0, 0, 255]);
    const BLACK: PaintColor = Rgba([0, 0, 0, 255]);

    /// White canvas split by a black vertical wall at column `wall`.
    fn walled(width: u32, height: u32, wall: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height).unwrap();
        for y in 0..height {
            buf.set(wall, y, BLACK);
        }
        buf
    }

    #[test]
    fn matcher_is_order_independent_and_inclusive() {
        let m = ThresholdMatcher::default();
        assert!(m.matches(0, 128));
        assert!(m.matches(128, 0));
        assert!(!m.matches(0, 129));
        assert!(!m.matches(255, 126));
        assert!(m.matches(200, 200));
    }

    #[test]
    fn matcher_checks_every_channel() {
        let m = ThresholdMatcher::default();
        assert!(m.matches_color(Rgba([255, 255, 255, 255]), Rgba([200, 130, 255, 255])));
        assert!(!m.matches_color(Rgba([255, 255, 255, 255]), Rgba([255, 255, 0, 255])));
    }

    #[test]
    fn fill_covers_whole_blank_canvas() {
        let mut buf = PixelBuffer::new(100, 100).unwrap();
        let mut engine = FloodFillEngine::default();
        let written = engine.fill(&mut buf, None, 50, 50, RED, None);
        assert_eq!(written, 100 * 100);
        assert!(buf.as_bytes().chunks(4).all(|p| p == RED.0));
    }

    #[test]
    fn fill_on_target_color_is_noop() {
        let mut buf = PixelBuffer::new(10, 10).unwrap();
        let mut engine = FloodFillEngine::default();
        engine.fill(&mut buf, None, 5, 5, RED, None);
        buf.take_dirty();
        let before = buf.clone();
        assert_eq!(engine.fill(&mut buf, None, 0, 0, RED, None), 0);
        assert_eq!(buf.as_bytes(), before.as_bytes());
        assert!(!buf.is_dirty());
    }

    #[test]
    fn fill_stops_at_contrasting_wall() {
        let mut buf = walled(10, 6, 4);
        let mut engine = FloodFillEngine::default();
        let written = engine.fill(&mut buf, None, 1, 1, Rgba([0, 0, 255, 255]), None);
        assert_eq!(written, 4 * 6);
        assert_eq!(buf.get(3, 5), Rgba([0, 0, 255, 255]));
        assert_eq!(buf.get(4, 0), BLACK);
        assert_eq!(buf.get(9, 5), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn fill_out_of_bounds_seed_is_noop() {
        let mut buf = PixelBuffer::new(4, 4).unwrap();
        let mut engine = FloodFillEngine::default();
        assert_eq!(engine.fill(&mut buf, None, 4, 0, RED, None), 0);
    }

    #[test]
    fn reference_fill_reads_boundaries_from_template() {
        let template = walled(8, 4, 3);
        let mut canvas = PixelBuffer::new(8, 4).unwrap();
        let mut engine = FloodFillEngine::default();
        let written = engine.fill(&mut canvas, Some(&template), 6, 2, RED, None);
        assert_eq!(written, 4 * 4);
        assert_eq!(canvas.get(7, 0), RED);
        // The wall only exists in the template, so the canvas stays white there.
        assert_eq!(canvas.get(3, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get(0, 0), Rgba([255, 255, 255, 255]));
        // The template itself is never touched.
        assert_eq!(template.get(6, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn lock_region_from_reference() {
        let template = walled(8, 4, 3);
        let canvas = PixelBuffer::new(8, 4).unwrap();
        let mut lock = RegionMask::for_buffer(&canvas);
        let mut engine = FloodFillEngine::default();
        let size = engine.lock_region(&canvas, Some(&template), 0, 0, RED, &mut lock);
        assert_eq!(size, 3 * 4);
        assert_eq!(lock.count(), size);
        assert!(lock.contains(2, 3));
        assert!(!lock.contains(3, 3));
        assert!(!lock.contains(4, 0));
        assert!(lock.as_slice().iter().all(|&c| c <= 1));
    }

    #[test]
    fn lock_region_without_reference_accepts_paint_color() {
        // Black wall, but painting with black: the wall is reachable.
        let canvas = walled(6, 3, 2);
        let mut lock = RegionMask::for_buffer(&canvas);
        let mut engine = FloodFillEngine::default();
        let size = engine.lock_region(&canvas, None, 0, 0, BLACK, &mut lock);
        assert_eq!(size, 6 * 3);

        let size = engine.lock_region(&canvas, None, 0, 0, RED, &mut lock);
        assert_eq!(size, 2 * 3);
    }

    #[test]
    fn repeated_fills_reuse_scratch_state() {
        let mut buf = walled(10, 6, 4);
        let mut engine = FloodFillEngine::default();
        let blue = Rgba([0, 0, 255, 255]);
        let green = Rgba([0, 255, 0, 255]);
        assert_eq!(engine.fill(&mut buf, None, 1, 1, blue, None), 4 * 6);
        assert_eq!(engine.fill(&mut buf, None, 2, 2, green, None), 4 * 6);
        assert_eq!(engine.fill(&mut buf, None, 7, 1, RED, None), 5 * 6);
        assert_eq!(buf.get(0, 5), green);
        assert_eq!(buf.get(9, 0), RED);
        assert_eq!(buf.get(4, 3), BLACK);
    }

    #[test]
    fn fill_with_lock_of_another_size_is_noop() {
        let mut canvas = PixelBuffer::new(4, 4).unwrap();
        let mut lock = RegionMask::new(2, 2);
        lock.mark(0);
        let mut engine = FloodFillEngine::default();
        assert_eq!(engine.fill(&mut canvas, None, 0, 0, RED, Some(&lock)), 0);
        assert!(canvas.as_bytes().iter().all(|&b| b == 255));
    }

    #[test]
    fn fill_respects_lock() {
        let mut canvas = PixelBuffer::new(4, 1).unwrap();
        let mut lock = RegionMask::new(4, 1);
        lock.mark(0);
        lock.mark(1);
        let mut engine = FloodFillEngine::default();
        assert_eq!(engine.fill(&mut canvas, None, 0, 0, RED, Some(&lock)), 2);
        assert_eq!(canvas.get(1, 0), RED);
        assert_eq!(canvas.get(2, 0), Rgba([255, 255, 255, 255]));
    }
}

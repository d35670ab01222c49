use std::path::Path;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::canvas::{PaintColor, PixelBuffer, RegionMask};
use crate::components::colors::Palette;
use crate::components::history::HistoryManager;
use crate::components::tools::{BrushSize, DrawMode, ToolState};
use crate::config::SessionConfig;
use crate::error::{PaintError, PaintResult};
use crate::io::{self, BlobStore};
use crate::ops::brush::bresenham_stamps;
use crate::ops::fill::FloodFillEngine;
use crate::ops::sticker::StickerBitmap;

// ============================================================================
// POINTER INPUT
// ============================================================================

/// Gesture phase of a pointer event, as delivered by the input router.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Press,
    Drag,
    Release,
    /// The pointer left the canvas mid-gesture.
    Leave,
}

/// A pointer event in canvas pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub x: i32,
    pub y: i32,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: i32, y: i32) -> Self {
        Self { phase, x, y }
    }

    pub fn press(x: i32, y: i32) -> Self {
        Self::new(PointerPhase::Press, x, y)
    }

    pub fn drag(x: i32, y: i32) -> Self {
        Self::new(PointerPhase::Drag, x, y)
    }

    pub fn release(x: i32, y: i32) -> Self {
        Self::new(PointerPhase::Release, x, y)
    }

    pub fn leave() -> Self {
        Self::new(PointerPhase::Leave, 0, 0)
    }
}

/// Where the current stroke is.
#[derive(Clone, Copy, Debug, Default)]
struct StrokeTracker {
    /// Previous logical canvas point of the stroke.
    last: Option<(i32, i32)>,
    /// Set by `Leave`; the next point re-anchors instead of drawing a line.
    went_outside: bool,
    active: bool,
}

// ============================================================================
// PAINT SESSION
// ============================================================================

/// One open coloring page: the canvas, its history, and the active tools.
///
/// Drive it with [`PaintSession::handle`]; a renderer polls
/// [`PaintSession::take_dirty`] and reads [`PaintSession::current_bytes`].
pub struct PaintSession {
    id: Uuid,
    canvas: PixelBuffer,
    /// Template whose regions bound fills and locks. Never painted on.
    reference: Option<PixelBuffer>,
    lock_mask: RegionMask,
    history: HistoryManager,
    tools: ToolState,
    palette: Palette,
    stickers: Vec<StickerBitmap>,
    fill: FloodFillEngine,
    stroke: StrokeTracker,
    save_key: String,
}

impl PaintSession {
    /// A blank `width` x `height` page with default tools and no template.
    pub fn new(width: u32, height: u32) -> PaintResult<Self> {
        let config = SessionConfig {
            width,
            height,
            ..SessionConfig::default()
        };
        Self::with_assets(&config, None, Vec::new())
    }

    /// Build from a config, decoding its template and sticker images.
    pub fn from_config(config: &SessionConfig) -> PaintResult<Self> {
        let reference = config
            .template
            .as_deref()
            .map(io::load_reference_mask)
            .transpose()?;
        let stickers = config
            .stickers
            .iter()
            .map(|p| io::load_sticker(p))
            .collect::<PaintResult<Vec<_>>>()?;
        Self::with_assets(config, reference, stickers)
    }

    /// [`PaintSession::from_config`], then pick up the canvas saved under the
    /// configured key. A bad saved value leaves the page blank.
    pub fn open(config: &SessionConfig, store: &dyn BlobStore) -> PaintResult<Self> {
        let mut session = Self::from_config(config)?;
        session.restore_or_blank(store);
        Ok(session)
    }

    /// Build from a config with already-decoded assets. A reference mask
    /// dictates the canvas size.
    pub fn with_assets(
        config: &SessionConfig,
        reference: Option<PixelBuffer>,
        stickers: Vec<StickerBitmap>,
    ) -> PaintResult<Self> {
        let (width, height) = match &reference {
            Some(r) => (r.width(), r.height()),
            None => (config.width, config.height),
        };
        let canvas = PixelBuffer::new(width, height)?;
        let palette = Palette::new(&config.palette);
        let use_lock_area = config.lock_area_enabled(reference.is_some());
        let tools = ToolState::new(
            BrushSize::new(config.brush_sizes.clone()),
            palette.selected(),
            use_lock_area,
        );

        let id = Uuid::new_v4();
        info!(
            session = %id,
            width,
            height,
            template = reference.is_some(),
            lock = use_lock_area,
            stickers = stickers.len(),
            "paint session created"
        );

        Ok(Self {
            id,
            history: HistoryManager::new(&canvas),
            lock_mask: RegionMask::for_buffer(&canvas),
            canvas,
            reference,
            tools,
            palette,
            stickers,
            fill: FloodFillEngine::default(),
            stroke: StrokeTracker::default(),
            save_key: config.save_key.clone(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    // -- persistence --------------------------------------------------------

    /// Replace the blank page with the canvas saved under this session's key.
    ///
    /// `Ok(false)` when nothing is stored. A stored value of the wrong size
    /// is an error and the canvas stays as it was; callers continue blank.
    /// On success the restored canvas becomes the first history entry.
    pub fn restore(&mut self, store: &dyn BlobStore) -> PaintResult<bool> {
        let Some(bytes) = store.load(&self.save_key)? else {
            debug!(key = %self.save_key, "no saved canvas");
            return Ok(false);
        };
        self.canvas.load_raw(&bytes)?;
        self.history.reset(&self.canvas);
        info!(key = %self.save_key, "saved canvas restored");
        Ok(true)
    }

    /// [`PaintSession::restore`], logging and ignoring any failure.
    pub fn restore_or_blank(&mut self, store: &dyn BlobStore) -> bool {
        match self.restore(store) {
            Ok(restored) => restored,
            Err(e) => {
                warn!(key = %self.save_key, "load failed, starting blank: {e}");
                false
            }
        }
    }

    pub fn save(&self, store: &mut dyn BlobStore) -> PaintResult<()> {
        store.save(&self.save_key, self.canvas.as_bytes())?;
        info!(key = %self.save_key, "canvas saved");
        Ok(())
    }

    pub fn save_key(&self) -> &str {
        &self.save_key
    }

    pub fn export_png(&self, path: &Path) -> PaintResult<()> {
        io::export_png(&self.canvas, path)
    }

    // -- pointer events -----------------------------------------------------

    /// Apply one pointer event to completion.
    pub fn handle(&mut self, event: PointerEvent) {
        match event.phase {
            PointerPhase::Press => self.press(event.x, event.y),
            PointerPhase::Drag => self.drag(event.x, event.y),
            PointerPhase::Release => self.release(),
            PointerPhase::Leave => {
                if self.stroke.active {
                    self.stroke.went_outside = true;
                }
            }
        }
    }

    /// Clamp router coordinates onto the canvas.
    fn clamp_point(&self, x: i32, y: i32) -> (i32, i32) {
        let max_x = self.canvas.width().min(i32::MAX as u32) as i32 - 1;
        let max_y = self.canvas.height().min(i32::MAX as u32) as i32 - 1;
        (x.clamp(0, max_x), y.clamp(0, max_y))
    }

    fn press(&mut self, x: i32, y: i32) {
        let (x, y) = self.clamp_point(x, y);
        self.stroke = StrokeTracker {
            last: Some((x, y)),
            went_outside: false,
            active: true,
        };

        if self.tools.use_lock_area {
            let size = self.fill.lock_region(
                &self.canvas,
                self.reference.as_ref(),
                x as u32,
                y as u32,
                self.tools.paint_color,
                &mut self.lock_mask,
            );
            debug!(x, y, region = size, "area lock");
        }
        debug!(x, y, mode = self.tools.draw_mode.label(), "stroke start");

        if self.tools.draw_mode == DrawMode::Sticker {
            self.stamp_sticker(x, y);
        }
        self.paint_at(x, y);
    }

    fn drag(&mut self, x: i32, y: i32) {
        if !self.stroke.active {
            return;
        }
        let (x, y) = self.clamp_point(x, y);
        let prev = match self.stroke.last {
            Some(p) if !self.stroke.went_outside => p,
            _ => (x, y),
        };
        self.stroke.went_outside = false;

        self.paint_at(x, y);

        let size = self.tools.brush_size.value() as i64;
        let (dx, dy) = ((x - prev.0) as i64, (y - prev.1) as i64);
        if dx * dx + dy * dy > size * size {
            self.connect(prev, (x, y));
        }
        self.stroke.last = Some((x, y));
    }

    fn release(&mut self) {
        if !self.stroke.active {
            return;
        }
        self.stroke = StrokeTracker::default();
        self.history.snapshot(&self.canvas);
        debug!(entries = self.history.len(), "stroke end");
    }

    /// The per-event operation of the current mode at one point.
    fn paint_at(&mut self, x: i32, y: i32) {
        let lock = self.tools.use_lock_area.then_some(&self.lock_mask);
        match self.tools.draw_mode {
            DrawMode::Pencil | DrawMode::Marker => {
                if let Some(brush) = self.tools.brush() {
                    brush.stamp(&mut self.canvas, x, y, lock);
                }
            }
            DrawMode::PaintBucket => {
                let written = self.fill.fill(
                    &mut self.canvas,
                    self.reference.as_ref(),
                    x as u32,
                    y as u32,
                    self.tools.paint_color,
                    lock,
                );
                if written > 0 {
                    debug!(x, y, written, "fill");
                }
            }
            DrawMode::Sticker => {}
        }
    }

    /// Bridge a fast pointer jump with spaced stamps.
    fn connect(&mut self, from: (i32, i32), to: (i32, i32)) {
        let lock = self.tools.use_lock_area.then_some(&self.lock_mask);
        match self.tools.draw_mode {
            DrawMode::Pencil | DrawMode::Marker => {
                if let Some(brush) = self.tools.brush() {
                    brush.draw_line(&mut self.canvas, from, to, lock);
                }
            }
            DrawMode::Sticker => {
                let Some(sticker) = self.stickers.get(self.tools.selected_sticker) else {
                    return;
                };
                let canvas = &mut self.canvas;
                bresenham_stamps(from, to, self.tools.brush_size.value() >> 1, |sx, sy| {
                    sticker.place(canvas, sx, sy, lock);
                });
            }
            DrawMode::PaintBucket => {}
        }
    }

    fn stamp_sticker(&mut self, x: i32, y: i32) {
        let lock = self.tools.use_lock_area.then_some(&self.lock_mask);
        if let Some(sticker) = self.stickers.get(self.tools.selected_sticker) {
            sticker.place(&mut self.canvas, x, y, lock);
        }
    }

    // -- canvas-level commands ----------------------------------------------

    /// Reset the page to white and record it in history.
    pub fn clear_canvas(&mut self) {
        self.canvas.clear();
        self.history.snapshot(&self.canvas);
        info!("canvas cleared");
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.canvas)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.canvas)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    // -- tools --------------------------------------------------------------

    pub fn draw_mode(&self) -> DrawMode {
        self.tools.draw_mode
    }

    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        self.tools.draw_mode = mode;
    }

    pub fn brush_size(&self) -> u32 {
        self.tools.brush_size.value()
    }

    /// Step to the next brush size (8 → 16 → 24 → 8 by default).
    pub fn cycle_brush_size(&mut self) -> u32 {
        self.tools.brush_size.cycle()
    }

    pub fn paint_color(&self) -> PaintColor {
        self.tools.paint_color
    }

    pub fn set_paint_color(&mut self, color: PaintColor) {
        self.tools.paint_color = color;
    }

    /// Pick a palette color by index. `None` leaves the color unchanged.
    pub fn select_color(&mut self, index: usize) -> Option<PaintColor> {
        let color = self.palette.select(index)?;
        self.tools.paint_color = color;
        Some(color)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn select_sticker(&mut self, index: usize) -> PaintResult<()> {
        if index >= self.stickers.len() {
            return Err(PaintError::UnknownSticker(index));
        }
        self.tools.selected_sticker = index;
        Ok(())
    }

    pub fn selected_sticker(&self) -> usize {
        self.tools.selected_sticker
    }

    pub fn uses_lock_area(&self) -> bool {
        self.tools.use_lock_area
    }

    // -- renderer -----------------------------------------------------------

    pub fn canvas(&self) -> &PixelBuffer {
        &self.canvas
    }

    pub fn reference(&self) -> Option<&PixelBuffer> {
        self.reference.as_ref()
    }

    /// The area lock of the current stroke, when locking is on.
    pub fn lock_mask(&self) -> Option<&RegionMask> {
        self.tools.use_lock_area.then_some(&self.lock_mask)
    }

    pub fn current_bytes(&self) -> &[u8] {
        self.canvas.as_bytes()
    }

    /// Whether the canvas changed since the renderer last asked.
    pub fn take_dirty(&mut self) -> bool {
        self.canvas.take_dirty()
    }
}

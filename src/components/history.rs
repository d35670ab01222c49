use tracing::{debug, warn};

use crate::canvas::PixelBuffer;

// ============================================================================
// HISTORY MANAGER - full-canvas snapshots with a redo cursor
// ============================================================================

/// Linear undo/redo over full canvas snapshots.
///
/// `entries` is never empty; entry 0 is the canvas the session started with.
/// `redo_cursor` counts the entries past the current one that are still
/// available for redo, so the live canvas always equals
/// `entries[current()]` after an undo or redo, where
/// `current() == entries.len() - 1 - redo_cursor`.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: Vec<Vec<u8>>,
    redo_cursor: usize,
    /// Running byte total across all entries.
    total_memory: usize,
}

#[allow(clippy::len_without_is_empty)]
impl HistoryManager {
    /// Start a history whose only entry is `initial`.
    pub fn new(initial: &PixelBuffer) -> Self {
        let first = initial.as_bytes().to_vec();
        Self {
            total_memory: first.len(),
            entries: vec![first],
            redo_cursor: 0,
        }
    }

    /// Drop all entries and start over from `initial`.
    pub fn reset(&mut self, initial: &PixelBuffer) {
        *self = Self::new(initial);
    }

    /// Index of the entry the live canvas corresponds to.
    #[inline]
    pub fn current(&self) -> usize {
        self.entries.len() - 1 - self.redo_cursor
    }

    /// Record the canvas as the newest state, discarding any redo tail.
    pub fn snapshot(&mut self, canvas: &PixelBuffer) {
        if self.redo_cursor > 0 {
            let keep = self.entries.len() - self.redo_cursor;
            for dropped in self.entries.drain(keep..) {
                self.total_memory = self.total_memory.saturating_sub(dropped.len());
            }
            debug!(discarded = self.redo_cursor, "redo tail discarded");
            self.redo_cursor = 0;
        }

        let entry = canvas.as_bytes().to_vec();
        self.total_memory += entry.len();
        self.entries.push(entry);
    }

    /// Step back one entry. Returns `false` (and changes nothing) when the
    /// canvas is already at the oldest entry.
    pub fn undo(&mut self, canvas: &mut PixelBuffer) -> bool {
        if !self.can_undo() {
            return false;
        }
        let target = self.current() - 1;
        if !self.restore(target, canvas) {
            return false;
        }
        self.redo_cursor += 1;
        debug!(entry = target, redo = self.redo_cursor, "undo");
        true
    }

    /// Step forward one entry. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, canvas: &mut PixelBuffer) -> bool {
        if !self.can_redo() {
            return false;
        }
        let target = self.current() + 1;
        if !self.restore(target, canvas) {
            return false;
        }
        self.redo_cursor -= 1;
        debug!(entry = target, redo = self.redo_cursor, "redo");
        true
    }

    fn restore(&self, index: usize, canvas: &mut PixelBuffer) -> bool {
        match canvas.load_raw(&self.entries[index]) {
            Ok(()) => true,
            Err(e) => {
                warn!("history entry {index} does not fit the canvas: {e}");
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.current() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.redo_cursor > 0
    }

    pub fn undo_count(&self) -> usize {
        self.current()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_cursor
    }

    /// Number of stored snapshots, including the initial one. Never zero.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Bytes held by all snapshots (O(1) via cached total).
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }
}

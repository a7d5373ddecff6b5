use eframe::egui;
use std::collections::VecDeque;

use crate::canvas::{PixelSurface, Snapshot};

/// Default number of undo steps kept before the oldest is evicted.
pub const DEFAULT_MAX_HISTORY: usize = 50;

// ============================================================================
// HISTORY ENTRY
// ============================================================================

/// One stored surface state plus the label of the action it precedes.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub description: String,
    pub snapshot: Snapshot,
}

impl HistoryEntry {
    fn capture(description: &str, live: &PixelSurface) -> Self {
        Self {
            description: description.to_string(),
            snapshot: live.snapshot(),
        }
    }

    fn memory_size(&self) -> usize {
        self.snapshot.memory_bytes() + self.description.len()
    }
}

// ============================================================================
// HISTORY MANAGER - full-surface snapshots, bounded undo, redo invalidation
// ============================================================================

/// Undo/redo history of full-surface snapshots.
///
/// `undo_stack` runs oldest → newest (back = newest), `redo_stack` runs
/// oldest-undone → most-recently-undone (back = next to redo).
pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_history_size: usize,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
            total_memory: 0,
        }
    }

    /// Record the current state of `live` before a new user action.
    /// Clears every redo state and evicts the oldest entry past the cap.
    pub fn snapshot(&mut self, live: &PixelSurface, description: &str) {
        for entry in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(entry.memory_size());
        }

        let entry = HistoryEntry::capture(description, live);
        self.total_memory += entry.memory_size();
        self.undo_stack.push_back(entry);

        self.prune();
    }

    /// Pop the newest undo state, stashing a copy of `live` for redo.
    /// Returns `None` (and touches nothing) when there is nothing to undo.
    pub fn undo(&mut self, live: &PixelSurface) -> Option<Snapshot> {
        let entry = self.undo_stack.pop_back()?;
        self.total_memory = self.total_memory.saturating_sub(entry.memory_size());

        let current = HistoryEntry::capture(&entry.description, live);
        self.total_memory += current.memory_size();
        self.redo_stack.push_back(current);

        Some(entry.snapshot)
    }

    /// Mirror of [`undo`](Self::undo) using the redo stack. Does not clear
    /// the remaining redo states.
    pub fn redo(&mut self, live: &PixelSurface) -> Option<Snapshot> {
        let entry = self.redo_stack.pop_back()?;
        self.total_memory = self.total_memory.saturating_sub(entry.memory_size());

        let current = HistoryEntry::capture(&entry.description, live);
        self.total_memory += current.memory_size();
        self.undo_stack.push_back(current);
        self.prune();

        Some(entry.snapshot)
    }

    /// The newest undo state without popping it (the pre-gesture state while
    /// a shape is being dragged).
    pub fn latest(&self) -> Option<&Snapshot> {
        self.undo_stack.back().map(|e| &e.snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }

    /// All undo descriptions (most recent first).
    pub fn undo_history(&self) -> Vec<&str> {
        self.undo_stack.iter().rev().map(|e| e.description.as_str()).collect()
    }

    /// Current memory usage of both stacks in bytes.
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    /// Drop the oldest entries until the cap holds.
    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
                log_info!("History: evicted oldest step '{}'", removed.description);
            }
        }
    }
}

// ============================================================================
// HISTORY PANEL - undo/redo buttons and stack readout
// ============================================================================

/// What the user asked for from the history panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

#[derive(Default)]
pub struct HistoryPanel {
    show_memory_info: bool,
}

impl HistoryPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, history: &HistoryManager) -> Option<HistoryAction> {
        let mut action = None;
        ui.horizontal(|ui| {
            let undo_hint = history.undo_description().unwrap_or("Nothing to undo");
            if ui
                .add_enabled(history.can_undo(), egui::Button::new("UNDO"))
                .on_hover_text(undo_hint)
                .clicked()
            {
                action = Some(HistoryAction::Undo);
            }
            let redo_hint = history.redo_description().unwrap_or("Nothing to redo");
            if ui
                .add_enabled(history.can_redo(), egui::Button::new("REDO"))
                .on_hover_text(redo_hint)
                .clicked()
            {
                action = Some(HistoryAction::Redo);
            }

            ui.label(format!("Undo: {} | Redo: {}", history.undo_count(), history.redo_count()));

            if ui.small_button("ℹ").on_hover_text("Show memory info").clicked() {
                self.show_memory_info = !self.show_memory_info;
            }
        });

        if self.show_memory_info {
            let mem_mb = history.memory_usage() as f64 / (1024.0 * 1024.0);
            ui.label(format!("History memory: {:.2} MB", mem_mb));
        }

        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{BLACK, RED, WHITE};

    fn surface() -> PixelSurface {
        PixelSurface::new(4, 4, 1, WHITE)
    }

    /// Snapshot, then mark pixel `(i % 4, 1 + i / 4 % 3)` with a unique shade.
    fn edit(history: &mut HistoryManager, live: &mut PixelSurface, i: usize) {
        history.snapshot(live, "edit");
        let shade = (i % 250) as u8;
        live.put_pixel((i % 4) as i32, (1 + i / 4 % 3) as i32, image::Rgba([shade, 0, 0, 255]))
            .unwrap();
    }

    #[test]
    fn undo_on_empty_history_is_a_no_op() {
        let live = surface();
        let mut history = HistoryManager::default();
        assert!(history.undo(&live).is_none());
        assert!(history.redo(&live).is_none());
        assert_eq!(history.redo_count(), 0);
    }

    #[test]
    fn undo_then_redo_round_trips_bit_for_bit() {
        let mut live = surface();
        let mut history = HistoryManager::default();
        for i in 0..5 {
            edit(&mut history, &mut live, i);
        }
        let after_last = live.snapshot();

        let restored = history.undo(&live).unwrap();
        live.restore(&restored).unwrap();
        // State right before the 5th mutation: pixel of edit 4 untouched.
        assert_eq!(live.get_pixel(0, 2).unwrap(), WHITE);

        let redone = history.redo(&live).unwrap();
        live.restore(&redone).unwrap();
        assert!(live.matches(&after_last));
    }

    #[test]
    fn cap_evicts_only_the_oldest() {
        let mut live = surface();
        let mut history = HistoryManager::new(3);
        let mut states = Vec::new();
        for i in 0..5 {
            states.push(live.snapshot());
            edit(&mut history, &mut live, i);
        }
        assert_eq!(history.undo_count(), 3);

        // The newest three pre-edit states come back in reverse order.
        for expected in states.iter().rev().take(3) {
            let snap = history.undo(&live).unwrap();
            live.restore(&snap).unwrap();
            assert!(live.matches(expected));
        }
        assert!(history.undo(&live).is_none());
    }

    #[test]
    fn new_snapshot_clears_redo() {
        let mut live = surface();
        let mut history = HistoryManager::default();
        edit(&mut history, &mut live, 0);
        let snap = history.undo(&live).unwrap();
        live.restore(&snap).unwrap();
        assert!(history.can_redo());

        history.snapshot(&live, "new work");
        assert!(!history.can_redo());
        assert!(history.redo(&live).is_none());
    }

    #[test]
    fn latest_peeks_without_popping() {
        let mut live = surface();
        let mut history = HistoryManager::default();
        history.snapshot(&live, "rect");
        live.put_pixel(1, 1, BLACK).unwrap();
        assert_eq!(history.latest().unwrap().get_pixel(1, 1), Some(WHITE));
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn memory_usage_tracks_both_stacks() {
        let mut live = surface();
        let mut history = HistoryManager::default();
        assert_eq!(history.memory_usage(), 0);
        history.snapshot(&live, "a");
        let one = history.memory_usage();
        assert_eq!(one, 4 * 4 * 4 + 1);
        live.put_pixel(0, 1, RED).unwrap();
        history.undo(&live);
        assert_eq!(history.memory_usage(), one);
        history.clear();
        assert_eq!(history.memory_usage(), 0);
    }

    #[test]
    fn descriptions_follow_entries() {
        let live = surface();
        let mut history = HistoryManager::default();
        history.snapshot(&live, "Brush");
        history.snapshot(&live, "Fill");
        assert_eq!(history.undo_history(), vec!["Fill", "Brush"]);
        history.undo(&live);
        assert_eq!(history.redo_description(), Some("Fill"));
        assert_eq!(history.undo_description(), Some("Brush"));
    }
}

use eframe::egui;
use std::collections::VecDeque;

use crate::canvas::PixelStore;

/// Default number of snapshots kept.
pub const DEFAULT_MAX_HISTORY: usize = 50;

// ============================================================================
// HISTORY ENTRY
// ============================================================================

/// Immutable full copy of the pixel store plus a label for the history panel.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    description: String,
    snapshot: PixelStore,
}

impl HistoryEntry {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn snapshot(&self) -> &PixelStore {
        &self.snapshot
    }
}

// ============================================================================
// HISTORY MANAGER: linear snapshot stack with a cursor
// ============================================================================

/// `entries[cursor]` always mirrors the live store after a record/undo/redo.
/// Entries past the cursor form the redo branch.
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
    cursor: usize,
    max_history_size: usize,
    /// Running byte total across all snapshots.
    total_memory: usize,
}

impl HistoryManager {
    /// Start a history whose first entry is `initial`, so the first undo
    /// always lands on a defined state.
    pub fn new(max_history_size: usize, initial: &PixelStore) -> Self {
        let mut history = Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_history_size: max_history_size.max(1),
            total_memory: 0,
        };
        history.push_entry("New canvas".to_string(), initial);
        history
    }

    fn push_entry(&mut self, description: String, store: &PixelStore) {
        let snapshot = store.snapshot();
        self.total_memory += snapshot.memory_bytes();
        self.entries.push_back(HistoryEntry { description, snapshot });
    }

    /// Snapshot `store` after a completed action. Discards any redo branch
    /// and evicts the oldest snapshot once over capacity.
    pub fn record(&mut self, description: impl Into<String>, store: &PixelStore) {
        for dropped in self.entries.drain(self.cursor + 1..) {
            self.total_memory = self.total_memory.saturating_sub(dropped.snapshot.memory_bytes());
        }

        self.push_entry(description.into(), store);
        self.cursor = self.entries.len() - 1;

        while self.entries.len() > self.max_history_size {
            if let Some(oldest) = self.entries.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(oldest.snapshot.memory_bytes());
                self.cursor -= 1;
            }
        }
    }

    /// Step back one entry. Returns the description of the undone action,
    /// or `None` at the start of history.
    pub fn undo(&mut self, store: &mut PixelStore) -> Option<String> {
        if self.cursor == 0 {
            return None;
        }
        let undone = self.entries[self.cursor].description.clone();
        self.cursor -= 1;
        store.restore(&self.entries[self.cursor].snapshot);
        Some(undone)
    }

    /// Step forward one entry. Returns the description of the redone action,
    /// or `None` at the top of the stack.
    pub fn redo(&mut self, store: &mut PixelStore) -> Option<String> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        let entry = &self.entries[self.cursor];
        store.restore(&entry.snapshot);
        Some(entry.description.clone())
    }

    /// Move the cursor straight to `index` (0 = oldest entry).
    pub fn jump_to(&mut self, index: usize, store: &mut PixelStore) {
        if index < self.entries.len() && index != self.cursor {
            self.cursor = index;
            store.restore(&self.entries[index].snapshot);
        }
    }

    /// Forget everything and start over from `store`.
    pub fn reset(&mut self, store: &PixelStore) {
        self.entries.clear();
        self.cursor = 0;
        self.total_memory = 0;
        self.push_entry("New canvas".to_string(), store);
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    pub fn redo_count(&self) -> usize {
        self.entries.len() - 1 - self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.entries.iter()
    }

    /// Descriptions up to the cursor, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.entries
            .iter()
            .take(self.cursor + 1)
            .rev()
            .map(|e| e.description.clone())
            .collect()
    }

    /// Bytes held by all snapshots (cached, O(1)).
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }
}

// ============================================================================
// HISTORY PANEL - UI for displaying history
// ============================================================================

#[derive(Default)]
pub struct HistoryPanel {
    show_memory_info: bool,
}

impl HistoryPanel {
    /// List every entry. Returns the index of a clicked entry other than the
    /// current one; the caller performs the jump.
    pub fn show(&mut self, ui: &mut egui::Ui, history: &HistoryManager) -> Option<usize> {
        ui.horizontal(|ui| {
            ui.label(format!("Undo: {} | Redo: {}", history.undo_count(), history.redo_count()));
            if ui.small_button("ℹ").on_hover_text("Show memory info").clicked() {
                self.show_memory_info = !self.show_memory_info;
            }
        });

        if self.show_memory_info {
            let mem_kb = history.memory_usage() as f64 / 1024.0;
            ui.label(format!("Memory: {:.1} KB", mem_kb));
        }

        let mut jump_to: Option<usize> = None;
        egui::ScrollArea::vertical().max_height(180.0).show(ui, |ui| {
            let cursor = history.cursor();
            for (i, entry) in history.entries().enumerate().collect::<Vec<_>>().into_iter().rev() {
                let text = if i == cursor {
                    egui::RichText::new(format!("▶ {}", entry.description())).strong()
                } else if i > cursor {
                    egui::RichText::new(format!("  {}", entry.description())).weak().italics()
                } else {
                    egui::RichText::new(format!("  {}", entry.description())).weak()
                };
                let response = ui.add(egui::Label::new(text).sense(egui::Sense::click()));
                if response.clicked() && i != cursor {
                    jump_to = Some(i);
                }
            }
        });
        jump_to
    }
}

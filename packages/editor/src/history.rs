//! # Undo/Redo History
//!
//! Snapshot-based history for the document store.
//!
//! ## Design
//!
//! - The store records the current document right before a command commits
//! - Undo swaps the current document for the newest undo snapshot and keeps
//!   the current one on the redo stack
//! - Redo is the mirror image
//! - Recording a new mutation clears the redo stack; undo/redo never do
//! - Batches group several mutations into a single undo step
//!
//! Undo followed by redo hands back exactly the document that was current
//! before the undo, `version` included.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//!
//! history.record_before_mutation(&doc, Some("Add component"));
//! doc = command.apply(&doc, &mut ctx)?.document;
//!
//! if let Some(previous) = history.undo(&doc) {
//!     doc = previous;
//! }
//! ```

use crate::document::Document;

/// One recorded snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub snapshot: Document,

    /// Description of the change this entry undoes/redoes
    pub label: Option<String>,
}

/// Undo/redo stacks of document snapshots
#[derive(Debug, Default)]
pub struct History {
    /// Snapshots to return to on undo (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Snapshots to return to on redo (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (`None` = unlimited)
    max_levels: Option<usize>,

    /// Nesting depth of open batches
    batch_depth: usize,

    /// Whether the open batch already recorded its snapshot
    batch_recorded: bool,

    /// Label used for the whole open batch
    batch_label: Option<String>,
}

impl History {
    /// Unlimited history
    pub fn new() -> Self {
        Self::default()
    }

    /// History that evicts the oldest entries beyond `max_levels`
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            max_levels: Some(max_levels),
            ..Self::default()
        }
    }

    pub fn max_levels(&self) -> Option<usize> {
        self.max_levels
    }

    /// Push the pre-mutation snapshot and invalidate redo
    pub fn record_before_mutation(&mut self, current: &Document, label: Option<&str>) {
        if self.batch_depth > 0 {
            if self.batch_recorded {
                return;
            }
            self.batch_recorded = true;
        }

        let label = match &self.batch_label {
            Some(batch_label) if self.batch_depth > 0 => Some(batch_label.clone()),
            _ => label.map(str::to_string),
        };
        self.undo_stack.push(HistoryEntry {
            snapshot: current.clone(),
            label,
        });

        if let Some(max) = self.max_levels {
            if self.undo_stack.len() > max {
                let excess = self.undo_stack.len() - max;
                self.undo_stack.drain(..excess);
            }
        }

        self.redo_stack.clear();
    }

    /// Step back; `current` moves onto the redo stack
    pub fn undo(&mut self, current: &Document) -> Option<Document> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(HistoryEntry {
            snapshot: current.clone(),
            label: entry.label.clone(),
        });
        Some(entry.snapshot)
    }

    /// Step forward; `current` moves back onto the undo stack
    pub fn redo(&mut self, current: &Document) -> Option<Document> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(HistoryEntry {
            snapshot: current.clone(),
            label: entry.label.clone(),
        });
        Some(entry.snapshot)
    }

    /// Start grouping mutations into one undo step (nestable)
    ///
    /// The outermost batch's label, if any, replaces the labels of the
    /// mutations inside it.
    pub fn begin_batch(&mut self, label: Option<&str>) {
        if self.batch_depth == 0 {
            self.batch_recorded = false;
            self.batch_label = label.map(str::to_string);
        }
        self.batch_depth += 1;
    }

    /// Close the innermost batch
    pub fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            tracing::warn!("end_batch called without an open batch");
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.batch_label = None;
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Label of the change the next undo reverts
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().and_then(|e| e.label.as_deref())
    }

    /// Label of the change the next redo reapplies
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().and_then(|e| e.label.as_deref())
    }

    /// Drop all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_recorded = false;
        self.batch_label = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Step;
    use crate::ids::StepId;

    fn doc_with(names: &[&str]) -> Document {
        Document {
            steps: names
                .iter()
                .enumerate()
                .map(|(i, n)| Step::new(StepId::new(format!("s{}", i)), *n))
                .collect(),
            active_step_id: Some(StepId::new("s0")),
            ..Document::default()
        }
    }

    #[test]
    fn test_history_creation() {
        let history = History::new();
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.max_levels(), None);
    }

    #[test]
    fn test_undo_then_redo_restores_exact_value() {
        let mut history = History::new();
        let v0 = doc_with(&["a"]);
        let mut v1 = doc_with(&["a", "b"]);
        v1.version = 1;

        history.record_before_mutation(&v0, Some("Add step"));
        let undone = history.undo(&v1).unwrap();
        assert_eq!(undone, v0);
        assert_eq!(history.redo_label(), Some("Add step"));

        let redone = history.redo(&undone).unwrap();
        assert_eq!(redone, v1);
        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.redo_levels(), 0);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = History::new();
        let doc = doc_with(&["a"]);
        assert!(history.undo(&doc).is_none());
        assert!(history.redo(&doc).is_none());
    }

    #[test]
    fn test_new_mutation_clears_redo() {
        let mut history = History::new();
        let v0 = doc_with(&["a"]);
        let v1 = doc_with(&["a", "b"]);

        history.record_before_mutation(&v0, None);
        let back = history.undo(&v1).unwrap();
        assert_eq!(history.redo_levels(), 1);

        history.record_before_mutation(&back, None);
        assert_eq!(history.redo_levels(), 0);
        assert!(history.redo(&back).is_none());
    }

    #[test]
    fn test_batch_records_once() {
        let mut history = History::new();
        let v0 = doc_with(&["a"]);
        let v1 = doc_with(&["a", "b"]);

        history.begin_batch(Some("Drop block"));
        history.record_before_mutation(&v0, Some("Add component"));
        history.begin_batch(None);
        history.record_before_mutation(&v1, Some("Edit component"));
        history.end_batch();
        history.end_batch();

        assert!(!history.in_batch());
        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.undo_label(), Some("Drop block"));

        history.begin_batch(None);
        history.record_before_mutation(&v1, Some("Add step"));
        history.end_batch();
        assert_eq!(history.undo_label(), Some("Add step"));
    }

    #[test]
    fn test_max_levels_evicts_oldest() {
        let mut history = History::with_max_levels(2);
        for i in 0..3 {
            let mut doc = doc_with(&["a"]);
            doc.version = i;
            history.record_before_mutation(&doc, None);
        }
        assert_eq!(history.undo_levels(), 2);

        let current = doc_with(&["a"]);
        assert_eq!(history.undo(&current).map(|d| d.version), Some(2));
        assert_eq!(history.undo(&current).map(|d| d.version), Some(1));
        assert!(history.undo(&current).is_none());
    }
}

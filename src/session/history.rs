//! Snapshot-based linear undo history
//!
//! A snapshot is a value copy of everything an edit can change, taken just
//! before the edit. Undo pops the latest snapshot and reinstates it.
//! There is no redo.

use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;

use crate::domain::{Annotation, AspectRatio, Document, Rect, Template};

/// State captured before a mutating action
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// What the action was, for logs
    pub label: &'static str,
    pub annotations: Vec<Annotation>,
    pub crop: Rect,
    pub template: Template,
    pub aspect_ratio: Option<AspectRatio>,
    /// Document content version at capture
    pub version: u64,
    /// Preview rendered for this state, if one was current
    pub preview: Option<Arc<RgbaImage>>,
}

impl Snapshot {
    /// Capture the document's committed state. While cropping, the caller
    /// supplies the annotations as they were before crop mode.
    pub fn capture(
        label: &'static str,
        doc: &Document,
        annotations: Vec<Annotation>,
        preview: Option<Arc<RgbaImage>>,
    ) -> Self {
        Self {
            label,
            annotations,
            crop: doc.crop().committed,
            template: doc.template().clone(),
            aspect_ratio: doc.aspect_ratio(),
            version: doc.version(),
            preview,
        }
    }
}

/// Configuration for the history stack
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept; the oldest are dropped first
    pub max_history: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_history: 100 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    stack: VecDeque<Snapshot>,
    config: HistoryConfig,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        log::debug!("Undo: pushed '{}'", snapshot.label);
        self.stack.push_back(snapshot);
        while self.stack.len() > self.config.max_history.max(1) {
            self.stack.pop_front();
        }
    }

    /// Latest snapshot, or `None` on an empty stack
    pub fn pop(&mut self) -> Option<Snapshot> {
        let snapshot = self.stack.pop_back()?;
        log::debug!("Undo: '{}'", snapshot.label);
        Some(snapshot)
    }

    /// Drop the latest snapshot without restoring it, used when a gesture
    /// that already pushed one is cancelled
    pub fn discard_last(&mut self) -> Option<Snapshot> {
        let snapshot = self.stack.pop_back()?;
        log::debug!("Undo: discarded '{}'", snapshot.label);
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<&'static str> {
        self.stack.back().map(|s| s.label)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        log::debug!("Undo history cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(label: &'static str) -> Snapshot {
        let doc = Document::new(RgbaImage::new(4, 4), 1.0);
        Snapshot::capture(label, &doc, Vec::new(), None)
    }

    #[test]
    fn test_pop_is_lifo_and_empty_is_none() {
        let mut history = HistoryManager::new();
        assert!(history.pop().is_none());
        history.push(snapshot("a"));
        history.push(snapshot("b"));
        assert_eq!(history.undo_label(), Some("b"));
        assert_eq!(history.pop().unwrap().label, "b");
        assert_eq!(history.pop().unwrap().label, "a");
        assert!(history.is_empty());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = HistoryManager::with_config(HistoryConfig { max_history: 2 });
        history.push(snapshot("a"));
        history.push(snapshot("b"));
        history.push(snapshot("c"));
        assert_eq!(history.len(), 2);
        history.discard_last();
        assert_eq!(history.pop().unwrap().label, "b");
    }
}

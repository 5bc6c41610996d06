//! Editing session management
//!
//! This module contains:
//! - `InteractionController`, the editing state machine
//! - Snapshot-based undo history
//! - Crop rectangle gestures
//! - Message types and keyboard shortcuts

pub mod controller;
pub mod crop;
pub mod history;
pub mod messages;
pub mod shortcuts;

pub use controller::{InteractionController, InteractionState};
pub use history::{HistoryConfig, HistoryManager, Snapshot};
pub use messages::{
    CropMsg, EditorMsg, Modifiers, PointerMsg, StyleCommand, TemplateCommand, TextMsg,
    ToolSelection,
};

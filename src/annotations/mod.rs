//! Annotation behaviors
//!
//! This module provides:
//! - Hit testing, bounds and grab handles for every tool
//! - Pending-shape construction while drawing

pub mod draft;

pub use draft::Draft;
pub use hit_test::{DragMode, TextMetrics, annotation_at, annotation_at_with};

//! Pure domain types with minimal dependencies
//!
//! This module contains the document model used throughout the crate.
//! Types here have no rendering dependencies.

pub mod annotation;
pub mod document;
pub mod geometry;
pub mod selection;
pub mod template;

pub use annotation::*;
pub use document::*;
pub use geometry::*;
pub use selection::*;
pub use template::*;

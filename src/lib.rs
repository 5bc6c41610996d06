//! Screenshot annotation and compositing engine
//!
//! A captured raster is edited non-destructively: a crop, vector annotations
//! and an optional padded background template are kept beside the raw
//! pixels and composed on demand for preview and export.

pub mod annotations;
pub mod config;
pub mod coords;
pub mod domain;
pub mod error;
pub mod export;
pub mod render;
pub mod session;

pub use config::EditorConfig;
pub use domain::{Annotation, AnnotationId, AnnotationStyle, Document, Point, Rect, Template, Tool};
pub use error::{ExportError, ExportResult, RenderError, RenderResult};
pub use export::ExportFormat;
pub use session::{EditorMsg, InteractionController};

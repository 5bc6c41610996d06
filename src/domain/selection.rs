//! Selection types for crop handles and save targets

use serde::{Deserialize, Serialize};

/// Drag state for crop rectangle handles
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    #[default]
    None,
    /// North-West corner
    NW,
    /// North edge
    N,
    /// North-East corner
    NE,
    /// East edge
    E,
    /// South-East corner
    SE,
    /// South edge
    S,
    /// South-West corner
    SW,
    /// West edge
    W,
}

/// Where a finalized image is written by default
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSaveLocation {
    /// Copy to clipboard only
    Clipboard,
    /// Save to Pictures folder
    #[default]
    Pictures,
    /// Save to Documents folder
    Documents,
}

//! Message types for an editing session
//!
//! This module contains:
//! - Tool selection and modifier state
//! - Style and template commands applied to the document
//! - The `EditorMsg` enum dispatched by `InteractionController::update`

use crate::config::ShapeColor;
use crate::domain::{AnnotationStyle, ArrowHead, AspectRatio, Background, Point, Tool};

/// The active tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolSelection {
    /// Select, move and resize existing annotations
    #[default]
    Select,
    /// Create new annotations of this kind
    Draw(Tool),
    /// Edit the crop rectangle
    Crop,
}

/// Keyboard modifiers held during a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        control: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        control: false,
    };

    /// Whether shapes snap to squares and lines to 45 degrees
    pub fn constrain(self) -> bool {
        self.shift
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Change to the current style, also applied to the selected annotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleCommand {
    Color(ShapeColor),
    StrokeWidth(f32),
    FontSize(f32),
    PixelationScale(f32),
    ArrowHead(ArrowHead),
}

impl StyleCommand {
    /// Write this change into `style`
    pub fn apply(self, style: &mut AnnotationStyle) {
        match self {
            StyleCommand::Color(color) => style.color = color,
            StyleCommand::StrokeWidth(width) => style.stroke_width = width.max(0.5),
            StyleCommand::FontSize(size) => style.font_size = size.max(1.0),
            StyleCommand::PixelationScale(scale) => style.pixelation_scale = scale.max(1.0),
            StyleCommand::ArrowHead(head) => style.arrow_head = head,
        }
    }
}

/// Change to the background template
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateCommand {
    SetEnabled(bool),
    SetPadding(f32),
    SetCornerRadius(f32),
    SetBackground(Background),
    SetAspectRatio(Option<AspectRatio>),
}

/// Pointer input, in view points
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerMsg {
    Down(Point),
    Move(Point),
    Up(Point),
    DoubleClick(Point),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMsg {
    Enter,
    Apply,
    Cancel,
}

/// Text editing input for the annotation being edited
#[derive(Debug, Clone, PartialEq)]
pub enum TextMsg {
    Insert(String),
    Backspace,
    Commit,
}

// ============================================================================
// Main Message Enum
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EditorMsg {
    Pointer(PointerMsg, Modifiers),
    SelectTool(ToolSelection),
    Style(StyleCommand),
    Template(TemplateCommand),
    Crop(CropMsg),
    Text(TextMsg),
    DeleteSelected,
    ClearAnnotations,
    Undo,
    /// Abort whatever gesture is in progress
    Cancel,
}

impl EditorMsg {
    pub fn undo() -> Self {
        EditorMsg::Undo
    }

    pub fn cancel() -> Self {
        EditorMsg::Cancel
    }

    pub fn tool(tool: Tool) -> Self {
        EditorMsg::SelectTool(ToolSelection::Draw(tool))
    }

    pub fn apply_crop() -> Self {
        EditorMsg::Crop(CropMsg::Apply)
    }

    pub fn pointer_down(x: f32, y: f32, modifiers: Modifiers) -> Self {
        EditorMsg::Pointer(PointerMsg::Down(Point::new(x, y)), modifiers)
    }

    pub fn pointer_move(x: f32, y: f32, modifiers: Modifiers) -> Self {
        EditorMsg::Pointer(PointerMsg::Move(Point::new(x, y)), modifiers)
    }

    pub fn pointer_up(x: f32, y: f32, modifiers: Modifiers) -> Self {
        EditorMsg::Pointer(PointerMsg::Up(Point::new(x, y)), modifiers)
    }
}

//! Annotation types for drawing on screenshots
//!
//! All annotation geometry is stored in the pixel space of the current
//! composited canvas: the cropped working image shifted by the template
//! offset. Style sizes are stored in the same pixel units.

use serde::{Deserialize, Serialize};

use super::geometry::Point;
use crate::config::ShapeColor;

/// Stable identity of an annotation within a document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationId(pub u64);

/// Annotation tool kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Arrow,
    Freehand,
    Measurement,
    Rectangle,
    Circle,
    Line,
    Text,
    Pixelate,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Arrow,
        Tool::Freehand,
        Tool::Measurement,
        Tool::Rectangle,
        Tool::Circle,
        Tool::Line,
        Tool::Text,
        Tool::Pixelate,
    ];

    /// Tools whose geometry is a segment from start to end
    pub fn is_line_like(self) -> bool {
        matches!(self, Tool::Arrow | Tool::Line | Tool::Measurement)
    }

    /// Tools whose geometry is the box spanned by start and end
    pub fn is_box_like(self) -> bool {
        matches!(self, Tool::Rectangle | Tool::Circle | Tool::Pixelate)
    }

    /// Whether the modifier key constrains this tool while drawing
    pub fn is_constrainable(self) -> bool {
        self.is_line_like() || matches!(self, Tool::Rectangle | Tool::Circle)
    }
}

/// Arrow head variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrowHead {
    /// Open V
    Chevron,
    /// Filled triangle
    #[default]
    Triangle,
    /// Quadratic shaft with a tangent-aligned triangle
    Curved,
    /// Cubic S-curve shaft with a wide chevron
    Sketch,
}

/// Visual style of an annotation, in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStyle {
    pub color: ShapeColor,
    pub stroke_width: f32,
    pub font_size: f32,
    /// Source pixels per pixelation block
    pub pixelation_scale: f32,
    pub arrow_head: ArrowHead,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: ShapeColor::default(),
            stroke_width: 4.0,
            font_size: 24.0,
            pixelation_scale: 16.0,
            arrow_head: ArrowHead::default(),
        }
    }
}

/// A single annotation on the canvas
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub tool: Tool,
    pub start: Point,
    pub end: Point,
    /// Recorded polyline, freehand only
    #[serde(default)]
    pub points: Vec<Point>,
    pub style: AnnotationStyle,
    /// Content, text only. Lines are separated by `\n`.
    #[serde(default)]
    pub text: String,
}

impl Annotation {
    pub fn new(id: AnnotationId, tool: Tool, start: Point, end: Point, style: AnnotationStyle) -> Self {
        Self {
            id,
            tool,
            start,
            end,
            points: Vec::new(),
            style,
            text: String::new(),
        }
    }

    /// Move every stored point by the given delta
    pub fn translate(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.start = self.start.translate(dx, dy);
        self.end = self.end.translate(dx, dy);
        for p in &mut self.points {
            *p = p.translate(dx, dy);
        }
    }

    /// Segment length from start to end
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn is_text(&self) -> bool {
        self.tool == Tool::Text
    }
}

//! Pending annotation built while the pointer is down

use std::f32::consts::FRAC_PI_4;

use crate::domain::{Annotation, AnnotationId, AnnotationStyle, Bounds, Point, Tool};

/// Freehand only records a point after moving this far, in image pixels
pub const FREEHAND_MIN_STEP: f32 = 2.0;
/// Shapes smaller than this on their relevant axes are discarded
pub const MIN_EXTENT: f32 = 2.0;

/// Snap `to` so that `start`-`to` points in the nearest multiple of 45 degrees
pub fn constrain_45(start: Point, to: Point) -> Point {
    let dx = to.x - start.x;
    let dy = to.y - start.y;
    let length = (dx * dx + dy * dy).sqrt();
    if length < f32::EPSILON {
        return to;
    }
    let angle = (dy.atan2(dx) / FRAC_PI_4).round() * FRAC_PI_4;
    Point::new(start.x + length * angle.cos(), start.y + length * angle.sin())
}

/// Force the box spanned by `start` and `to` to be square, keeping the drag direction
pub fn constrain_square(start: Point, to: Point) -> Point {
    let dx = to.x - start.x;
    let dy = to.y - start.y;
    let side = dx.abs().max(dy.abs());
    Point::new(
        start.x + side.copysign(if dx == 0.0 { 1.0 } else { dx }),
        start.y + side.copysign(if dy == 0.0 { 1.0 } else { dy }),
    )
}

/// An annotation being drawn
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    annotation: Annotation,
}

impl Draft {
    /// Seed a new shape at the pointer-down location
    pub fn begin(id: AnnotationId, tool: Tool, at: Point, style: AnnotationStyle) -> Self {
        let mut annotation = Annotation::new(id, tool, at, at, style);
        if tool == Tool::Freehand {
            annotation.points = vec![at, at];
        }
        Self { annotation }
    }

    pub fn tool(&self) -> Tool {
        self.annotation.tool
    }

    /// The shape as it should be previewed right now
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    /// Extend the shape to the pointer; `constrain` is the modifier key state
    pub fn update(&mut self, to: Point, constrain: bool) {
        let ann = &mut self.annotation;
        match ann.tool {
            Tool::Freehand => {
                let last = ann.points.last().copied().unwrap_or(ann.start);
                if last.distance(to) >= FREEHAND_MIN_STEP {
                    ann.points.push(to);
                    ann.end = to;
                }
            }
            tool if constrain && tool.is_line_like() => ann.end = constrain_45(ann.start, to),
            Tool::Rectangle | Tool::Circle if constrain => {
                ann.end = constrain_square(ann.start, to)
            }
            _ => ann.end = to,
        }
    }

    /// Finished annotation, or `None` when it is too small to keep
    pub fn finish(self) -> Option<Annotation> {
        let mut ann = self.annotation;
        let keep = match ann.tool {
            Tool::Freehand => {
                ann.points.dedup();
                ann.points.len() >= 2
                    && Bounds::enclosing(&ann.points)
                        .is_some_and(|b| b.width().max(b.height()) >= MIN_EXTENT)
            }
            Tool::Text => true,
            tool if tool.is_line_like() => ann.length() >= MIN_EXTENT,
            _ => {
                let b = Bounds::from_points(ann.start, ann.end);
                if b.width() >= MIN_EXTENT && b.height() >= MIN_EXTENT {
                    ann.start = Point::new(b.min_x, b.min_y);
                    ann.end = Point::new(b.max_x, b.max_y);
                    true
                } else {
                    false
                }
            }
        };
        keep.then_some(ann)
    }
}

//! Annotation compositing using tiny-skia
//!
//! Draws annotations in canvas pixel space. Pixelation runs first and samples
//! the canvas as it was before any annotation touched it; every other tool
//! is then drawn in list order so later annotations end up on top.

use tiny_skia::{FillRule, Path, PathBuilder, Pixmap, Transform};

use super::geometry::{self, Shaft, shape};
use super::pixelate;
use super::pixmap::{round_stroke, solid_paint};
use super::text::TextRenderer;
use crate::config::ShapeColor;
use crate::domain::{Annotation, Bounds, Point, Tool};

/// Build an ellipse path using cubic bezier curves
fn build_ellipse_path(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Path> {
    let kx = rx * shape::BEZIER_K;
    let ky = ry * shape::BEZIER_K;

    let mut pb = PathBuilder::new();
    pb.move_to(cx, cy - ry);
    pb.cubic_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy);
    pb.cubic_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry);
    pb.cubic_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy);
    pb.cubic_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry);
    pb.close();
    pb.finish()
}

fn build_shaft_path(shaft: Shaft) -> Option<Path> {
    let mut pb = PathBuilder::new();
    match shaft {
        Shaft::Straight(a, b) => {
            pb.move_to(a.x, a.y);
            pb.line_to(b.x, b.y);
        }
        Shaft::Quad(a, c, b) => {
            pb.move_to(a.x, a.y);
            pb.quad_to(c.x, c.y, b.x, b.y);
        }
        Shaft::Cubic(a, c1, c2, b) => {
            pb.move_to(a.x, a.y);
            pb.cubic_to(c1.x, c1.y, c2.x, c2.y, b.x, b.y);
        }
    }
    pb.finish()
}

/// Left barb, tip, right barb as a closed triangle or an open V
fn build_head_path(head: [Point; 3], closed: bool) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(head[0].x, head[0].y);
    pb.line_to(head[1].x, head[1].y);
    pb.line_to(head[2].x, head[2].y);
    if closed {
        pb.close();
    }
    pb.finish()
}

/// Smoothed freehand stroke joined with quadratic curves through midpoints
fn build_freehand_path(points: &[Point]) -> Option<Path> {
    let smoothed = geometry::smooth_polyline(points);
    let (first, rest) = smoothed.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    match rest {
        [] => pb.line_to(first.x, first.y),
        [only] => pb.line_to(only.x, only.y),
        _ => {
            for pair in rest.windows(2) {
                let mid = pair[0].midpoint(pair[1]);
                pb.quad_to(pair[0].x, pair[0].y, mid.x, mid.y);
            }
            if let Some(last) = rest.last() {
                pb.line_to(last.x, last.y);
            }
        }
    }
    pb.finish()
}

fn build_rect_path(b: Bounds) -> Option<Path> {
    let rect = tiny_skia::Rect::from_ltrb(b.min_x, b.min_y, b.max_x, b.max_y)?;
    Some(PathBuilder::from_rect(rect))
}

/// Draws annotations onto a canvas pixmap
pub struct AnnotationCompositor<'a> {
    text: &'a TextRenderer,
    backing_scale: f32,
}

impl<'a> AnnotationCompositor<'a> {
    pub fn new(text: &'a TextRenderer, backing_scale: f32) -> Self {
        Self {
            text,
            backing_scale,
        }
    }

    /// Draw all annotations. Pixelations are resolved first against the
    /// untouched canvas, then every other annotation is drawn in order.
    pub fn composite(&self, canvas: &mut Pixmap, annotations: &[Annotation]) {
        let mut pixelations = annotations
            .iter()
            .filter(|a| a.tool == Tool::Pixelate)
            .peekable();
        if pixelations.peek().is_some() {
            let pristine = canvas.clone();
            for ann in pixelations {
                pixelate::pixelate(
                    canvas,
                    &pristine,
                    Bounds::from_points(ann.start, ann.end),
                    ann.style.pixelation_scale,
                );
            }
        }

        for ann in annotations.iter().filter(|a| a.tool != Tool::Pixelate) {
            self.draw(canvas, ann);
        }
    }

    /// Draw a single annotation on top of whatever is already there.
    /// Pixelation samples the pixmap itself.
    pub fn draw(&self, pixmap: &mut Pixmap, ann: &Annotation) {
        let style = &ann.style;
        let paint = solid_paint(style.color.to_skia());
        let stroke = round_stroke(style.stroke_width);

        match ann.tool {
            Tool::Arrow => {
                let Some(geo) =
                    geometry::arrow_geometry(ann.start, ann.end, style.stroke_width, style.arrow_head)
                else {
                    return;
                };
                if let Some(path) = build_shaft_path(geo.shaft) {
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
                if let Some(path) = build_head_path(geo.head, geo.filled) {
                    if geo.filled {
                        pixmap.fill_path(
                            &path,
                            &paint,
                            FillRule::Winding,
                            Transform::identity(),
                            None,
                        );
                    } else {
                        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                    }
                }
            }
            Tool::Measurement => self.draw_measurement(pixmap, ann),
            Tool::Line => {
                let mut pb = PathBuilder::new();
                pb.move_to(ann.start.x, ann.start.y);
                pb.line_to(ann.end.x, ann.end.y);
                if let Some(path) = pb.finish() {
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
            Tool::Freehand => {
                if let Some(path) = build_freehand_path(&ann.points) {
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
            Tool::Rectangle => {
                if let Some(path) = build_rect_path(Bounds::from_points(ann.start, ann.end)) {
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
            Tool::Circle => {
                let (min_x, min_y, max_x, max_y) =
                    geometry::normalize_rect(ann.start.x, ann.start.y, ann.end.x, ann.end.y);
                let (cx, cy, rx, ry) = geometry::ellipse_from_bounds(min_x, min_y, max_x, max_y);
                if let Some(path) = build_ellipse_path(cx, cy, rx, ry) {
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
            Tool::Text => {
                if ann.text.is_empty() {
                    return;
                }
                let background = if style.color.is_near_white() {
                    ShapeColor::BLACK
                } else {
                    style.color
                };
                self.text.draw_bubble(
                    pixmap,
                    &ann.text,
                    ann.start,
                    style.font_size,
                    background,
                    ShapeColor::WHITE,
                );
            }
            Tool::Pixelate => {
                let source = pixmap.clone();
                pixelate::pixelate(
                    pixmap,
                    &source,
                    Bounds::from_points(ann.start, ann.end),
                    style.pixelation_scale,
                );
            }
        }
    }

    fn draw_measurement(&self, pixmap: &mut Pixmap, ann: &Annotation) {
        let style = &ann.style;
        let Some((shaft, start_head, end_head)) =
            geometry::measurement_geometry(ann.start, ann.end, style.stroke_width)
        else {
            return;
        };
        let paint = solid_paint(style.color.to_skia());
        let stroke = round_stroke(style.stroke_width);

        if let Some(path) = build_shaft_path(Shaft::Straight(shaft.0, shaft.1)) {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
        for head in [start_head, end_head] {
            if let Some(path) = build_head_path(head, true) {
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }

        let label = geometry::measurement_label(ann.start, ann.end, self.backing_scale);
        let foreground = if style.color.is_near_white() {
            ShapeColor::BLACK
        } else {
            ShapeColor::WHITE
        };
        self.text.draw_bubble(
            pixmap,
            &label,
            ann.start.midpoint(ann.end),
            style.font_size * geometry::measurement::LABEL_FONT_SCALE,
            style.color,
            foreground,
        );
    }
}

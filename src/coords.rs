//! Coordinate mapping between view space, image-pixel space and the templated canvas
//!
//! Annotations live in canvas pixel space. Whenever the canvas offset of the
//! screenshot changes (crop size, padding, aspect ratio, template toggle) every
//! annotation is shifted by the offset delta so it stays pinned to the content
//! underneath it.

use crate::domain::{Annotation, AspectRatio, Point, Template};

/// Convert a view-space point to canvas pixels for a given view zoom
pub fn view_to_image(point: Point, scale: f32) -> Point {
    if scale <= 0.0 {
        return point;
    }
    Point::new(point.x / scale, point.y / scale)
}

/// Convert a canvas pixel back to view space
pub fn image_to_view(point: Point, scale: f32) -> Point {
    Point::new(point.x * scale, point.y * scale)
}

/// Size of the composited canvas and where the screenshot sits inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl TemplateLayout {
    /// Layout without a template: the canvas is the screenshot
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            canvas_width: width,
            canvas_height: height,
            offset_x: 0,
            offset_y: 0,
        }
    }

    pub fn offset(&self) -> Point {
        Point::new(self.offset_x as f32, self.offset_y as f32)
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }
}

/// Canvas size for a screenshot with `padding_px` on each side, grown along a
/// single axis to meet the target aspect ratio. The canvas never shrinks.
pub fn canvas_size(
    screenshot: (u32, u32),
    padding_px: u32,
    aspect: Option<AspectRatio>,
) -> (u32, u32) {
    let border = padding_px.saturating_mul(2);
    let mut width = screenshot.0.saturating_add(border);
    let mut height = screenshot.1.saturating_add(border);

    let Some(target) = aspect.and_then(AspectRatio::ratio) else {
        return (width, height);
    };
    if width == 0 || height == 0 {
        return (width, height);
    }

    let current = width as f64 / height as f64;
    if (current - target).abs() < 1e-6 {
        return (width, height);
    }
    if current < target {
        // too narrow
        width = width.max((height as f64 * target).round() as u32);
    } else {
        height = height.max((width as f64 / target).round() as u32);
    }
    (width, height)
}

/// Screenshot offset inside the canvas for a padding given in logical units
pub fn template_offset(
    screenshot: (u32, u32),
    padding: f32,
    backing_scale: f32,
    aspect: Option<AspectRatio>,
) -> Point {
    let padding_px = (padding.max(0.0) * backing_scale).round() as u32;
    layout_for_padding(screenshot, padding_px, aspect).offset()
}

fn layout_for_padding(
    screenshot: (u32, u32),
    padding_px: u32,
    aspect: Option<AspectRatio>,
) -> TemplateLayout {
    let (canvas_width, canvas_height) = canvas_size(screenshot, padding_px, aspect);
    TemplateLayout {
        canvas_width,
        canvas_height,
        offset_x: (canvas_width - screenshot.0) / 2,
        offset_y: (canvas_height - screenshot.1) / 2,
    }
}

/// Full layout for a screenshot under a template. A disabled template leaves
/// the canvas equal to the screenshot and ignores the aspect ratio.
pub fn template_layout(
    screenshot: (u32, u32),
    template: &Template,
    backing_scale: f32,
    aspect: Option<AspectRatio>,
) -> TemplateLayout {
    if !template.enabled {
        return TemplateLayout::identity(screenshot.0, screenshot.1);
    }
    layout_for_padding(screenshot, template.padding_px(backing_scale), aspect)
}

/// Translation that carries canvas coordinates from `old` to `new`
pub fn offset_delta(old: &TemplateLayout, new: &TemplateLayout) -> (f32, f32) {
    (
        new.offset_x as f32 - old.offset_x as f32,
        new.offset_y as f32 - old.offset_y as f32,
    )
}

/// Shift every annotation so it stays on the same screenshot content
pub fn reconcile_offsets(annotations: &mut [Annotation], old: &TemplateLayout, new: &TemplateLayout) {
    let (dx, dy) = offset_delta(old, new);
    if dx == 0.0 && dy == 0.0 {
        return;
    }
    log::debug!(
        "Reconciling {} annotations by ({}, {})",
        annotations.len(),
        dx,
        dy
    );
    for annotation in annotations {
        annotation.translate(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnnotationId, AnnotationStyle, Tool};

    #[test]
    fn test_view_to_image_divides_by_scale() {
        assert_eq!(
            view_to_image(Point::new(50.0, 30.0), 0.5),
            Point::new(100.0, 60.0)
        );
        assert_eq!(
            image_to_view(Point::new(100.0, 60.0), 0.5),
            Point::new(50.0, 30.0)
        );
    }

    #[test]
    fn test_template_offset_scenario() {
        let offset = template_offset((800, 600), 80.0, 2.0, None);
        assert_eq!(offset, Point::new(160.0, 160.0));
        assert_eq!(canvas_size((800, 600), 160, None), (1120, 920));
    }

    #[test]
    fn test_aspect_grows_single_axis() {
        // 1120x920 is too narrow for 16:9, so only the width grows
        let (w, h) = canvas_size((800, 600), 160, Some(AspectRatio::WIDESCREEN));
        assert_eq!(h, 920);
        assert_eq!(w, (920.0_f64 * 16.0 / 9.0).round() as u32);

        // 1120x920 is too wide for 9:16, so only the height grows
        let (w, h) = canvas_size((800, 600), 160, Some(AspectRatio::PORTRAIT));
        assert_eq!(w, 1120);
        assert!(h > 920);
    }

    #[test]
    fn test_huge_padding_saturates() {
        let padding_px = (3.0e9f32 * 2.0).round() as u32;
        assert_eq!(
            canvas_size((400, 300), padding_px, Some(AspectRatio::WIDESCREEN)),
            (u32::MAX, u32::MAX)
        );
        let offset = template_offset((400, 300), 3.0e9, 2.0, None);
        assert!(offset.x > 0.0 && offset.y > 0.0);
    }

    #[test]
    fn test_disabled_template_is_identity() {
        let template = Template {
            enabled: false,
            ..Default::default()
        };
        let layout = template_layout((640, 480), &template, 2.0, Some(AspectRatio::SQUARE));
        assert_eq!(layout, TemplateLayout::identity(640, 480));
    }

    #[test]
    fn test_reconcile_offsets_shifts_annotations() {
        let mut anns = vec![Annotation::new(
            AnnotationId(1),
            Tool::Arrow,
            Point::new(10.0, 10.0),
            Point::new(200.0, 150.0),
            AnnotationStyle::default(),
        )];
        let old = TemplateLayout::identity(800, 600);
        let template = Template {
            enabled: true,
            padding: 80.0,
            ..Default::default()
        };
        let new = template_layout((800, 600), &template, 2.0, None);
        reconcile_offsets(&mut anns, &old, &new);
        assert_eq!(anns[0].start, Point::new(170.0, 170.0));
        reconcile_offsets(&mut anns, &new, &old);
        assert_eq!(anns[0].start, Point::new(10.0, 10.0));
    }
}

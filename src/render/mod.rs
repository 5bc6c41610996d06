//! Rendering
//!
//! This module contains:
//! - Geometry calculations shared by drawing and hit testing
//! - The annotation and template compositors built on tiny-skia
//! - The `Renderer`, which produces previews and caches them per document revision

pub mod annotation;
pub mod geometry;
pub mod pixelate;
pub mod pixmap;
pub mod template;
pub mod text;

use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;
use tiny_skia::{Color, FillRule, PathBuilder, Pixmap, Transform};

pub use annotation::AnnotationCompositor;
pub use template::TemplateCompositor;
pub use text::TextRenderer;

use crate::domain::{Annotation, AspectRatio, Document, Rect, Template, Tool};
use crate::error::{RenderError, RenderResult};
use pixmap::{pixmap_from_rgba, rgba_from_pixmap, round_stroke, solid_paint};

/// Opacity of the shade drawn outside the pending crop
const CROP_SHADE: u8 = 128;

/// Crop the raw raster, place it on the template and draw the annotations.
///
/// Annotation coordinates must already be in the resulting canvas space.
pub fn render_canvas(
    raw: &RgbaImage,
    crop: Rect,
    annotations: &[Annotation],
    template: &Template,
    aspect_ratio: Option<AspectRatio>,
    backing_scale: f32,
    text: &TextRenderer,
) -> RenderResult<Pixmap> {
    let bounds = Rect::from_size(raw.width(), raw.height());
    let crop = crop
        .normalized()
        .intersect(bounds)
        .ok_or(RenderError::EmptyCrop)?;
    let dims = crop.dimensions().ok_or(RenderError::EmptyCrop)?;

    let cropped = image::imageops::crop_imm(
        raw,
        crop.left as u32,
        crop.top as u32,
        dims.width(),
        dims.height(),
    )
    .to_image();
    let screenshot = pixmap_from_rgba(&cropped)?;

    let mut canvas =
        TemplateCompositor::new(template, backing_scale, aspect_ratio).compose(&screenshot)?;
    AnnotationCompositor::new(text, backing_scale).composite(&mut canvas, annotations);
    Ok(canvas)
}

/// Shade everything outside `rect` and outline it
fn draw_crop_overlay(canvas: &mut Pixmap, rect: Rect) {
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);
    let (Some(full), Some(inner)) = (
        tiny_skia::Rect::from_xywh(0.0, 0.0, w, h),
        tiny_skia::Rect::from_ltrb(
            rect.left as f32,
            rect.top as f32,
            rect.right as f32,
            rect.bottom as f32,
        ),
    ) else {
        return;
    };

    let mut pb = PathBuilder::new();
    pb.push_rect(full);
    pb.push_rect(inner);
    if let Some(path) = pb.finish() {
        canvas.fill_path(
            &path,
            &solid_paint(Color::from_rgba8(0, 0, 0, CROP_SHADE)),
            FillRule::EvenOdd,
            Transform::identity(),
            None,
        );
    }

    let outline = PathBuilder::from_rect(inner);
    canvas.stroke_path(
        &outline,
        &solid_paint(Color::WHITE),
        &round_stroke(1.5),
        Transform::identity(),
        None,
    );
}

#[derive(Debug, Clone)]
struct CachedPreview {
    revision: u64,
    image: Arc<RgbaImage>,
}

/// Produces preview rasters and remembers the last one per document revision
#[derive(Debug)]
pub struct Renderer {
    text: TextRenderer,
    cache: Option<CachedPreview>,
}

impl Renderer {
    pub fn new(text: TextRenderer) -> Self {
        Self { text, cache: None }
    }

    pub fn text(&self) -> &TextRenderer {
        &self.text
    }

    /// Render what the document currently shows. While cropping this is the
    /// full raster with the area outside the pending crop shaded.
    pub fn render(&self, doc: &Document) -> RenderResult<Pixmap> {
        self.render_annotations(doc, doc.annotations())
    }

    fn render_annotations(&self, doc: &Document, annotations: &[Annotation]) -> RenderResult<Pixmap> {
        let start = Instant::now();
        let mut canvas = render_canvas(
            doc.raw(),
            doc.working_rect(),
            annotations,
            doc.template(),
            doc.aspect_ratio(),
            doc.backing_scale(),
            &self.text,
        )?;
        if let Some(pending) = doc.crop().pending {
            let layout = doc.layout();
            draw_crop_overlay(
                &mut canvas,
                pending.translate(layout.offset_x as i32, layout.offset_y as i32),
            );
        }
        log::debug!(
            "Rendered {}x{} canvas in {:?}",
            canvas.width(),
            canvas.height(),
            start.elapsed()
        );
        Ok(canvas)
    }

    /// Preview for the document's current revision, reusing the cache when
    /// nothing changed since the last render
    pub fn preview(&mut self, doc: &Document) -> RenderResult<Arc<RgbaImage>> {
        if let Some(image) = self.cached(doc.revision()) {
            return Ok(image);
        }
        let image = Arc::new(rgba_from_pixmap(&self.render(doc)?));
        self.install(doc.revision(), image.clone());
        Ok(image)
    }

    /// Preview with an in-progress annotation drawn over the cached document
    pub fn preview_with(
        &mut self,
        doc: &Document,
        pending: Option<&Annotation>,
    ) -> RenderResult<Arc<RgbaImage>> {
        let base = self.preview(doc)?;
        let Some(pending) = pending else {
            return Ok(base);
        };
        // pixelation samples the unannotated canvas, which the cached
        // preview no longer is
        if pending.tool == Tool::Pixelate {
            let mut annotations = doc.annotations().to_vec();
            annotations.push(pending.clone());
            let canvas = self.render_annotations(doc, &annotations)?;
            return Ok(Arc::new(rgba_from_pixmap(&canvas)));
        }
        let mut canvas = pixmap_from_rgba(&base)?;
        AnnotationCompositor::new(&self.text, doc.backing_scale()).draw(&mut canvas, pending);
        Ok(Arc::new(rgba_from_pixmap(&canvas)))
    }

    /// Cached preview, if it belongs to `revision`
    pub fn cached(&self, revision: u64) -> Option<Arc<RgbaImage>> {
        self.cache
            .as_ref()
            .filter(|c| c.revision == revision)
            .map(|c| c.image.clone())
    }

    /// Adopt an already rendered preview for `revision`
    pub fn install(&mut self, revision: u64, image: Arc<RgbaImage>) {
        self.cache = Some(CachedPreview { revision, image });
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

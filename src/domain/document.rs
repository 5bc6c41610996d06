//! The editable document: raw raster, non-destructive crop, annotations and template

use std::sync::Arc;

use image::RgbaImage;

use super::annotation::{Annotation, AnnotationId};
use super::geometry::Rect;
use super::template::{AspectRatio, Background, Template};
use crate::coords::{self, TemplateLayout};

/// Visible region of the raw raster.
///
/// `committed` is the crop in effect. `pending` exists only while the crop
/// tool is active and holds the rectangle being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropState {
    pub committed: Rect,
    pub pending: Option<Rect>,
}

impl CropState {
    pub fn is_cropping(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    raw: Arc<RgbaImage>,
    backing_scale: f32,
    crop: CropState,
    annotations: Vec<Annotation>,
    template: Template,
    aspect_ratio: Option<AspectRatio>,
    next_id: u64,
    revision: u64,
    /// Identifies the committed content; equal versions mean equal content
    version: u64,
    last_version: u64,
    saved_version: u64,
}

impl Document {
    /// Open a document over a raw raster captured at `backing_scale`
    pub fn new(raw: RgbaImage, backing_scale: f32) -> Self {
        Self::from_shared(Arc::new(raw), backing_scale)
    }

    pub fn from_shared(raw: Arc<RgbaImage>, backing_scale: f32) -> Self {
        let full = Rect::from_size(raw.width(), raw.height());
        log::debug!(
            "Document opened: {}x{} pixels at backing scale {}",
            raw.width(),
            raw.height(),
            backing_scale
        );
        Self {
            raw,
            backing_scale: if backing_scale > 0.0 { backing_scale } else { 1.0 },
            crop: CropState {
                committed: full,
                pending: None,
            },
            annotations: Vec::new(),
            template: Template::default(),
            aspect_ratio: None,
            next_id: 1,
            revision: 0,
            version: 0,
            last_version: 0,
            saved_version: 0,
        }
    }

    /// Open with template and aspect defaults from the settings collaborator
    pub fn with_template(mut self, template: Template, aspect_ratio: Option<AspectRatio>) -> Self {
        self.template = template;
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn raw(&self) -> &Arc<RgbaImage> {
        &self.raw
    }

    pub fn raw_rect(&self) -> Rect {
        Rect::from_size(self.raw.width(), self.raw.height())
    }

    pub fn backing_scale(&self) -> f32 {
        self.backing_scale
    }

    pub fn crop(&self) -> CropState {
        self.crop
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        self.aspect_ratio
    }

    /// Monotonic counter bumped on every state change that affects rendering
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Content version. Only committed edits change it, and restoring a
    /// snapshot brings back the version it was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.version != self.saved_version
    }

    pub fn mark_saved(&mut self) {
        self.saved_version = self.version;
    }

    /// Return to the version of an abandoned edit's starting point
    pub(crate) fn rewind_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Render-only change: crop mode entry, pending rectangle
    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Content change
    fn edit(&mut self) {
        self.touch();
        self.last_version += 1;
        self.version = self.last_version;
    }

    /// Region of the raw raster currently shown: the full raster while
    /// cropping, the committed crop otherwise
    pub fn working_rect(&self) -> Rect {
        if self.crop.is_cropping() {
            self.raw_rect()
        } else {
            self.crop.committed
        }
    }

    pub fn working_size(&self) -> (u32, u32) {
        let rect = self.working_rect();
        (rect.width().max(0) as u32, rect.height().max(0) as u32)
    }

    /// Canvas layout for the currently shown region
    pub fn layout(&self) -> TemplateLayout {
        self.layout_for(self.working_rect())
    }

    /// Canvas layout a given region of the raw raster would get
    pub fn layout_for(&self, rect: Rect) -> TemplateLayout {
        coords::template_layout(
            (rect.width().max(0) as u32, rect.height().max(0) as u32),
            &self.template,
            self.backing_scale,
            self.aspect_ratio,
        )
    }

    /// Clamp a rectangle to raw bounds; `None` if nothing is left
    pub fn clamp_to_raw(&self, rect: Rect) -> Option<Rect> {
        rect.normalized().intersect(self.raw_rect())
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    pub fn next_annotation_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn annotation_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        self.edit();
        self.annotations.get_mut(index)
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.next_id = self.next_id.max(annotation.id.0 + 1);
        self.annotations.push(annotation);
        self.edit();
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        self.edit();
        Some(self.annotations.remove(index))
    }

    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
        self.edit();
    }

    // ------------------------------------------------------------------
    // Template edits. Each keeps annotations pinned to the screenshot.
    // ------------------------------------------------------------------

    fn change_layout(&mut self, f: impl FnOnce(&mut Self)) {
        let old = self.layout();
        f(self);
        let new = self.layout();
        coords::reconcile_offsets(&mut self.annotations, &old, &new);
        self.edit();
    }

    pub fn set_template_enabled(&mut self, enabled: bool) {
        self.change_layout(|doc| doc.template.enabled = enabled);
    }

    pub fn set_padding(&mut self, padding: f32) {
        self.change_layout(|doc| doc.template.padding = padding.max(0.0));
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: Option<AspectRatio>) {
        self.change_layout(|doc| doc.aspect_ratio = aspect_ratio);
    }

    pub fn set_template(&mut self, template: Template) {
        self.change_layout(|doc| doc.template = template);
    }

    pub fn set_corner_radius(&mut self, radius: f32) {
        self.template.corner_radius = radius.max(0.0);
        self.edit();
    }

    pub fn set_background(&mut self, background: Background) {
        self.template.background = background;
        self.edit();
    }

    // ------------------------------------------------------------------
    // Crop
    // ------------------------------------------------------------------

    /// Show the full raw raster and move annotations into its canvas space
    pub(crate) fn enter_crop_mode(&mut self) {
        if self.crop.is_cropping() {
            return;
        }
        let committed = self.crop.committed;
        let old = self.layout();
        self.crop.pending = Some(committed);
        let new = self.layout();
        let (dx, dy) = coords::offset_delta(&old, &new);
        let (dx, dy) = (dx + committed.left as f32, dy + committed.top as f32);
        for annotation in &mut self.annotations {
            annotation.translate(dx, dy);
        }
        self.touch();
    }

    pub(crate) fn set_pending_crop(&mut self, rect: Rect) {
        if self.crop.is_cropping() {
            self.crop.pending = Some(rect);
            self.touch();
        }
    }

    /// Commit `rect` (raw space) as the crop and leave crop mode, moving
    /// annotations from the full-raster canvas into the cropped canvas
    pub(crate) fn finish_crop(&mut self, rect: Rect) {
        if !self.crop.is_cropping() {
            return;
        }
        let old = self.layout();
        self.crop = CropState {
            committed: rect,
            pending: None,
        };
        let new = self.layout();
        let (dx, dy) = coords::offset_delta(&old, &new);
        let (dx, dy) = (dx - rect.left as f32, dy - rect.top as f32);
        for annotation in &mut self.annotations {
            annotation.translate(dx, dy);
        }
        self.edit();
    }

    /// Leave crop mode without changing the committed crop, reinstating the
    /// annotations as they were before crop mode was entered
    pub(crate) fn abandon_crop(&mut self, annotations: Vec<Annotation>) {
        self.crop.pending = None;
        self.annotations = annotations;
        self.touch();
    }

    /// Reinstate a previously captured state. Leaves crop mode.
    pub(crate) fn restore(
        &mut self,
        annotations: Vec<Annotation>,
        crop: Rect,
        template: Template,
        aspect_ratio: Option<AspectRatio>,
        version: u64,
    ) {
        self.annotations = annotations;
        self.crop = CropState {
            committed: crop,
            pending: None,
        };
        self.template = template;
        self.aspect_ratio = aspect_ratio;
        self.version = version;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnnotationStyle, Point, Tool};

    fn doc() -> Document {
        Document::new(RgbaImage::new(2000, 1000), 2.0)
    }

    fn arrow(doc: &mut Document, from: (f32, f32), to: (f32, f32)) -> AnnotationId {
        let id = doc.next_annotation_id();
        doc.add_annotation(Annotation::new(
            id,
            Tool::Arrow,
            Point::new(from.0, from.1),
            Point::new(to.0, to.1),
            AnnotationStyle::default(),
        ));
        id
    }

    #[test]
    fn test_crop_then_template_scenario() {
        let mut doc = doc();
        doc.enter_crop_mode();
        doc.finish_crop(Rect::from_xywh(100, 100, 800, 600));
        assert_eq!(doc.working_size(), (800, 600));

        let id = arrow(&mut doc, (10.0, 10.0), (200.0, 150.0));
        doc.set_padding(80.0);
        doc.set_template_enabled(true);

        assert_eq!(doc.layout().canvas_size(), (1120, 920));
        assert_eq!(doc.layout().offset(), Point::new(160.0, 160.0));
        assert_eq!(doc.annotation(id).unwrap().start, Point::new(170.0, 170.0));
    }

    #[test]
    fn test_template_toggle_round_trips_annotations() {
        let mut doc = doc();
        let id = arrow(&mut doc, (30.0, 40.0), (60.0, 90.0));
        doc.set_template_enabled(true);
        doc.set_aspect_ratio(Some(AspectRatio::SQUARE));
        doc.set_template_enabled(false);
        let ann = doc.annotation(id).unwrap();
        assert_eq!(ann.start, Point::new(30.0, 40.0));
        assert_eq!(ann.end, Point::new(60.0, 90.0));
    }

    #[test]
    fn test_crop_mode_maps_annotations_to_raw_space() {
        let mut doc = doc();
        doc.enter_crop_mode();
        doc.finish_crop(Rect::from_xywh(100, 50, 400, 300));
        let id = arrow(&mut doc, (10.0, 10.0), (20.0, 20.0));

        doc.enter_crop_mode();
        assert_eq!(doc.working_size(), (2000, 1000));
        assert_eq!(doc.annotation(id).unwrap().start, Point::new(110.0, 60.0));

        doc.finish_crop(Rect::from_xywh(0, 0, 400, 300));
        assert_eq!(doc.annotation(id).unwrap().start, Point::new(110.0, 60.0));
    }

    #[test]
    fn test_unsaved_changes_tracking() {
        let mut doc = doc();
        assert!(!doc.has_unsaved_changes());
        arrow(&mut doc, (0.0, 0.0), (10.0, 10.0));
        assert!(doc.has_unsaved_changes());
        doc.mark_saved();
        assert!(!doc.has_unsaved_changes());
    }

    #[test]
    fn test_crop_mode_round_trip_is_not_an_edit() {
        let mut doc = doc();
        arrow(&mut doc, (0.0, 0.0), (10.0, 10.0));
        doc.mark_saved();
        let stash = doc.annotations().to_vec();
        let revision = doc.revision();

        doc.enter_crop_mode();
        doc.set_pending_crop(Rect::new(10, 10, 500, 500));
        doc.abandon_crop(stash);
        assert!(doc.revision() > revision);
        assert!(!doc.has_unsaved_changes());

        doc.enter_crop_mode();
        doc.finish_crop(Rect::new(10, 10, 500, 500));
        assert!(doc.has_unsaved_changes());
    }

    #[test]
    fn test_restore_brings_back_saved_version() {
        let mut doc = doc();
        let version = doc.version();
        let crop = doc.crop().committed;
        arrow(&mut doc, (0.0, 0.0), (10.0, 10.0));
        assert!(doc.has_unsaved_changes());

        doc.restore(Vec::new(), crop, Template::default(), None, version);
        assert!(!doc.has_unsaved_changes());

        // a fresh edit never reuses an old version
        arrow(&mut doc, (0.0, 0.0), (10.0, 10.0));
        assert_ne!(doc.version(), version);
        assert!(doc.has_unsaved_changes());
    }

    #[test]
    fn test_clamp_to_raw() {
        let doc = doc();
        assert_eq!(
            doc.clamp_to_raw(Rect::new(1900, -20, 2100, 100)),
            Some(Rect::new(1900, 0, 2000, 100))
        );
        assert_eq!(doc.clamp_to_raw(Rect::new(2100, 0, 2200, 10)), None);
    }
}

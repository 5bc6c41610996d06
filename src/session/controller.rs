//! Pointer-driven editing state machine
//!
//! `InteractionController` owns the document, the undo history and the
//! renderer. Every mutation goes through it, so it is the only place that
//! decides when a snapshot is pushed:
//! - drawing pushes once when the shape is committed
//! - dragging pushes once, on the first movement
//! - text editing pushes once, when the edit is committed and changed
//! - crop pushes once, when a different rectangle is applied

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;

use super::crop::CropGesture;
use super::history::{HistoryConfig, HistoryManager, Snapshot};
use super::messages::{
    CropMsg, EditorMsg, Modifiers, PointerMsg, StyleCommand, TemplateCommand, TextMsg,
    ToolSelection,
};
use crate::annotations::draft::{constrain_45, constrain_square};
use crate::annotations::hit_test::HANDLE_RADIUS;
use crate::annotations::{Draft, DragMode, annotation_at_with};
use crate::config::EditorConfig;
use crate::coords;
use crate::domain::{
    Annotation, AnnotationId, AnnotationStyle, Bounds, Document, ImageSaveLocation, Point, Tool,
};
use crate::error::{ExportResult, RenderResult};
use crate::export::{self, ExportFormat};
use crate::render::{Renderer, TextRenderer};

/// A drag on an existing annotation
#[derive(Debug, Clone)]
pub struct DragSession {
    pub id: AnnotationId,
    pub mode: DragMode,
    origin: Point,
    original: Annotation,
    /// Taken at pointer-down, pushed on the first movement
    snapshot: Option<Snapshot>,
    moved: bool,
}

/// A text annotation receiving keystrokes
#[derive(Debug, Clone)]
pub struct TextEdit {
    pub id: AnnotationId,
    /// Content before the edit; `None` when the annotation was just created
    original: Option<Annotation>,
    snapshot: Snapshot,
}

/// Crop mode bookkeeping
#[derive(Debug, Clone)]
pub struct CropSession {
    /// Annotations as they were in the cropped canvas before crop mode
    stash: Vec<Annotation>,
    /// Preview of the pre-crop state
    preview: Option<Arc<RgbaImage>>,
    previous_tool: ToolSelection,
    gesture: Option<CropGesture>,
}

#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Drawing(Draft),
    Dragging(DragSession),
    EditingText(TextEdit),
    Cropping(CropSession),
}

pub struct InteractionController {
    document: Document,
    history: HistoryManager,
    renderer: Renderer,
    state: InteractionState,
    tool: ToolSelection,
    style: AnnotationStyle,
    selection: Option<AnnotationId>,
    /// View points per canvas pixel
    view_scale: f32,
}

impl InteractionController {
    /// Open an editing session, loading the label font from `config`
    pub fn new(document: Document, config: &EditorConfig) -> Self {
        let text = TextRenderer::load(config.font_path.as_deref());
        Self::with_text_renderer(document, config, text)
    }

    pub fn with_text_renderer(document: Document, config: &EditorConfig, text: TextRenderer) -> Self {
        Self {
            document,
            history: HistoryManager::with_config(HistoryConfig {
                max_history: config.history_limit,
            }),
            renderer: Renderer::new(text),
            state: InteractionState::Idle,
            tool: ToolSelection::Select,
            style: config.default_style(),
            selection: None,
            view_scale: 1.0,
        }
    }

    /// Open a session over a fresh capture using the configured template
    pub fn open(raw: RgbaImage, backing_scale: f32, config: &EditorConfig) -> Self {
        let document = Document::new(raw, backing_scale)
            .with_template(config.template.clone(), config.aspect_ratio);
        Self::new(document, config)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn tool(&self) -> ToolSelection {
        self.tool
    }

    pub fn style(&self) -> AnnotationStyle {
        self.style
    }

    pub fn selection(&self) -> Option<AnnotationId> {
        self.selection
    }

    pub fn selected(&self) -> Option<&Annotation> {
        self.selection.and_then(|id| self.document.annotation(id))
    }

    pub fn is_cropping(&self) -> bool {
        matches!(self.state, InteractionState::Cropping(_))
    }

    pub fn is_editing_text(&self) -> bool {
        matches!(self.state, InteractionState::EditingText(_))
    }

    /// Shape being drawn, for previews
    pub fn pending_annotation(&self) -> Option<&Annotation> {
        match &self.state {
            InteractionState::Drawing(draft) => Some(draft.annotation()),
            _ => None,
        }
    }

    pub fn view_scale(&self) -> f32 {
        self.view_scale
    }

    /// Set the zoom: view points per canvas pixel
    pub fn set_view_scale(&mut self, scale: f32) {
        if scale > 0.0 && scale.is_finite() {
            self.view_scale = scale;
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.document.has_unsaved_changes()
    }

    pub fn update(&mut self, msg: EditorMsg) {
        match msg {
            EditorMsg::Pointer(PointerMsg::Down(p), modifiers) => self.pointer_down(p, modifiers),
            EditorMsg::Pointer(PointerMsg::Move(p), modifiers) => self.pointer_move(p, modifiers),
            EditorMsg::Pointer(PointerMsg::Up(p), modifiers) => self.pointer_up(p, modifiers),
            EditorMsg::Pointer(PointerMsg::DoubleClick(p), _) => self.double_click(p),
            EditorMsg::SelectTool(tool) => self.select_tool(tool),
            EditorMsg::Style(command) => self.apply_style(command),
            EditorMsg::Template(command) => self.apply_template(command),
            EditorMsg::Crop(CropMsg::Enter) => self.enter_crop(),
            EditorMsg::Crop(CropMsg::Apply) => self.apply_crop(),
            EditorMsg::Crop(CropMsg::Cancel) => self.cancel_crop(),
            EditorMsg::Text(TextMsg::Insert(text)) => self.insert_text(&text),
            EditorMsg::Text(TextMsg::Backspace) => self.backspace(),
            EditorMsg::Text(TextMsg::Commit) => self.commit_text(),
            EditorMsg::DeleteSelected => self.delete_selected(),
            EditorMsg::ClearAnnotations => self.clear_annotations(),
            EditorMsg::Undo => self.undo(),
            EditorMsg::Cancel => self.cancel(),
        }
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Capture the committed state. In crop mode that is the stash and the
    /// preview from before crop mode, not the full-raster working state.
    fn snapshot(&self, label: &'static str) -> Snapshot {
        match &self.state {
            InteractionState::Cropping(session) => Snapshot::capture(
                label,
                &self.document,
                session.stash.clone(),
                session.preview.clone(),
            ),
            _ => Snapshot::capture(
                label,
                &self.document,
                self.document.annotations().to_vec(),
                self.renderer.cached(self.document.revision()),
            ),
        }
    }

    fn push_snapshot(&mut self, label: &'static str) {
        let snapshot = self.snapshot(label);
        self.history.push(snapshot);
    }

    // ------------------------------------------------------------------
    // Tools
    // ------------------------------------------------------------------

    pub fn select_tool(&mut self, tool: ToolSelection) {
        if tool == ToolSelection::Crop {
            self.enter_crop();
            return;
        }
        if self.is_cropping() {
            self.cancel_crop();
        }
        self.finish_gesture();
        self.tool = tool;
        log::debug!("Tool: {tool:?}");
    }

    /// Settle whatever gesture is in progress before starting another.
    /// Crop mode is left alone.
    fn finish_gesture(&mut self) {
        match std::mem::take(&mut self.state) {
            InteractionState::EditingText(edit) => self.finish_text_edit(edit),
            // an unfinished shape is dropped; a drag keeps its result
            InteractionState::Drawing(_) | InteractionState::Dragging(_) => {}
            other => self.state = other,
        }
    }

    // ------------------------------------------------------------------
    // Pointer
    // ------------------------------------------------------------------

    fn to_canvas(&self, view: Point) -> Point {
        coords::view_to_image(view, self.view_scale)
    }

    pub fn pointer_down(&mut self, view: Point, _modifiers: Modifiers) {
        let p = self.to_canvas(view);
        if self.is_cropping() {
            self.crop_pointer_down(p);
            return;
        }
        self.finish_gesture();

        let radius = HANDLE_RADIUS / self.view_scale;
        if let Some(id) = self.selection
            && let Some(mode) = self.document.annotation(id).and_then(|a| a.handle_at(p, radius))
        {
            self.begin_drag(id, mode, p);
            return;
        }
        let hit = annotation_at_with(self.document.annotations(), p, self.renderer.text());
        if let Some(id) = hit.map(|a| a.id) {
            self.selection = Some(id);
            self.begin_drag(id, DragMode::Body, p);
            return;
        }

        match self.tool {
            ToolSelection::Draw(Tool::Text) => self.begin_new_text(p),
            ToolSelection::Draw(tool) => {
                let id = self.document.next_annotation_id();
                self.selection = None;
                self.state = InteractionState::Drawing(Draft::begin(id, tool, p, self.style));
            }
            ToolSelection::Select | ToolSelection::Crop => self.selection = None,
        }
    }

    pub fn pointer_move(&mut self, view: Point, modifiers: Modifiers) {
        let p = self.to_canvas(view);
        match &mut self.state {
            InteractionState::Drawing(draft) => draft.update(p, modifiers.constrain()),
            InteractionState::Dragging(drag) => {
                if !drag.moved {
                    if p == drag.origin {
                        return;
                    }
                    drag.moved = true;
                    if let Some(snapshot) = drag.snapshot.take() {
                        self.history.push(snapshot);
                    }
                }
                let updated = dragged(&drag.original, drag.mode, drag.origin, p, modifiers.constrain());
                if let Some(annotation) = self.document.annotation_mut(drag.id) {
                    *annotation = updated;
                }
            }
            InteractionState::Cropping(session) => {
                let Some(gesture) = session.gesture.as_mut() else {
                    return;
                };
                let offset = self.document.layout().offset();
                let crop = self.document.crop();
                let current = crop.pending.unwrap_or(crop.committed);
                let rect = gesture.update(
                    current,
                    p.x - offset.x,
                    p.y - offset.y,
                    self.document.raw_rect(),
                );
                self.document.set_pending_crop(rect);
            }
            InteractionState::Idle | InteractionState::EditingText(_) => {}
        }
    }

    pub fn pointer_up(&mut self, view: Point, modifiers: Modifiers) {
        let p = self.to_canvas(view);
        match std::mem::take(&mut self.state) {
            InteractionState::Drawing(mut draft) => {
                draft.update(p, modifiers.constrain());
                let tool = draft.tool();
                match draft.finish() {
                    Some(annotation) => {
                        self.push_snapshot("Add annotation");
                        let id = annotation.id;
                        self.document.add_annotation(annotation);
                        self.selection = Some(id);
                        log::debug!("Added {tool:?} annotation {}", id.0);
                    }
                    None => log::trace!("Discarded {tool:?} below minimum size"),
                }
            }
            InteractionState::Dragging(drag) => {
                if drag.moved {
                    if matches!(drag.mode, DragMode::Corner { .. })
                        && let Some(annotation) = self.document.annotation_mut(drag.id)
                    {
                        let b = Bounds::from_points(annotation.start, annotation.end);
                        annotation.start = Point::new(b.min_x, b.min_y);
                        annotation.end = Point::new(b.max_x, b.max_y);
                    }
                } else if drag.original.is_text() {
                    // tap on text
                    self.begin_text_edit(drag.id);
                }
            }
            InteractionState::Cropping(mut session) => {
                if session.gesture.take().is_some()
                    && let Some(pending) = self.document.crop().pending
                {
                    self.document.set_pending_crop(pending.normalized());
                }
                self.state = InteractionState::Cropping(session);
            }
            other => self.state = other,
        }
    }

    pub fn double_click(&mut self, view: Point) {
        let p = self.to_canvas(view);
        if self.is_cropping() {
            return;
        }
        self.finish_gesture();
        let id = annotation_at_with(self.document.annotations(), p, self.renderer.text())
            .filter(|a| a.is_text())
            .map(|a| a.id);
        if let Some(id) = id {
            self.begin_text_edit(id);
        }
    }

    fn begin_drag(&mut self, id: AnnotationId, mode: DragMode, origin: Point) {
        let Some(original) = self.document.annotation(id).cloned() else {
            return;
        };
        let snapshot = self.snapshot("Edit annotation");
        self.state = InteractionState::Dragging(DragSession {
            id,
            mode,
            origin,
            original,
            snapshot: Some(snapshot),
            moved: false,
        });
    }

    fn cancel_drag(&mut self, drag: DragSession) {
        if !drag.moved {
            return;
        }
        if let Some(annotation) = self.document.annotation_mut(drag.id) {
            *annotation = drag.original;
        }
        if let Some(snapshot) = self.history.discard_last() {
            self.document.rewind_version(snapshot.version);
        }
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    fn begin_new_text(&mut self, at: Point) {
        let snapshot = self.snapshot("Add text");
        let id = self.document.next_annotation_id();
        self.document
            .add_annotation(Annotation::new(id, Tool::Text, at, at, self.style));
        self.selection = Some(id);
        self.state = InteractionState::EditingText(TextEdit {
            id,
            original: None,
            snapshot,
        });
    }

    fn begin_text_edit(&mut self, id: AnnotationId) {
        let Some(original) = self.document.annotation(id).cloned() else {
            return;
        };
        let snapshot = self.snapshot("Edit text");
        self.selection = Some(id);
        self.state = InteractionState::EditingText(TextEdit {
            id,
            original: Some(original),
            snapshot,
        });
    }

    pub fn insert_text(&mut self, text: &str) {
        if let InteractionState::EditingText(edit) = &self.state
            && let Some(annotation) = self.document.annotation_mut(edit.id)
        {
            annotation.text.push_str(text);
        }
    }

    pub fn backspace(&mut self) {
        if let InteractionState::EditingText(edit) = &self.state
            && let Some(annotation) = self.document.annotation_mut(edit.id)
        {
            annotation.text.pop();
        }
    }

    pub fn commit_text(&mut self) {
        match std::mem::take(&mut self.state) {
            InteractionState::EditingText(edit) => self.finish_text_edit(edit),
            other => self.state = other,
        }
    }

    fn finish_text_edit(&mut self, edit: TextEdit) {
        let Some(current) = self.document.annotation(edit.id).cloned() else {
            return;
        };
        let empty = current.text.trim().is_empty();
        match (edit.original, empty) {
            // never committed, so nothing to undo
            (None, true) => {
                self.document.remove_annotation(edit.id);
                self.document.rewind_version(edit.snapshot.version);
                self.selection = None;
            }
            (None, false) => self.history.push(edit.snapshot),
            (Some(_), true) => {
                self.history.push(edit.snapshot);
                self.document.remove_annotation(edit.id);
                self.selection = None;
            }
            (Some(original), false) => {
                if original != current {
                    self.history.push(edit.snapshot);
                } else {
                    self.document.rewind_version(edit.snapshot.version);
                }
            }
        }
    }

    fn cancel_text_edit(&mut self, edit: TextEdit) {
        let version = edit.snapshot.version;
        match edit.original {
            None => {
                self.document.remove_annotation(edit.id);
                self.selection = None;
            }
            Some(original) => {
                if let Some(annotation) = self.document.annotation_mut(edit.id) {
                    *annotation = original;
                }
            }
        }
        self.document.rewind_version(version);
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Change the current style and restyle the selected annotation
    pub fn apply_style(&mut self, command: StyleCommand) {
        command.apply(&mut self.style);
        let Some(current) = self.selected() else {
            return;
        };
        let mut updated = current.clone();
        command.apply(&mut updated.style);
        if updated == *current {
            return;
        }
        // a text edit pushes its own snapshot on commit
        if !self.is_editing_text() {
            self.push_snapshot("Change style");
        }
        if let Some(annotation) = self.document.annotation_mut(updated.id) {
            *annotation = updated;
        }
    }

    pub fn apply_template(&mut self, command: TemplateCommand) {
        self.finish_gesture();
        let template = self.document.template();
        let changed = match &command {
            TemplateCommand::SetEnabled(enabled) => template.enabled != *enabled,
            TemplateCommand::SetPadding(padding) => template.padding != padding.max(0.0),
            TemplateCommand::SetCornerRadius(radius) => template.corner_radius != radius.max(0.0),
            TemplateCommand::SetBackground(background) => template.background != *background,
            TemplateCommand::SetAspectRatio(ratio) => self.document.aspect_ratio() != *ratio,
        };
        if !changed {
            return;
        }
        self.push_snapshot("Change template");

        let committed = self.document.crop().committed;
        let old = self.document.layout_for(committed);
        match command {
            TemplateCommand::SetEnabled(enabled) => self.document.set_template_enabled(enabled),
            TemplateCommand::SetPadding(padding) => self.document.set_padding(padding),
            TemplateCommand::SetCornerRadius(radius) => self.document.set_corner_radius(radius),
            TemplateCommand::SetBackground(background) => self.document.set_background(background),
            TemplateCommand::SetAspectRatio(ratio) => self.document.set_aspect_ratio(ratio),
        }
        // the stash lives in the cropped canvas and must follow too
        if let InteractionState::Cropping(session) = &mut self.state {
            let new = self.document.layout_for(committed);
            coords::reconcile_offsets(&mut session.stash, &old, &new);
            session.preview = None;
        }
    }

    pub fn delete_selected(&mut self) {
        self.finish_gesture();
        let Some(id) = self.selection.take() else {
            return;
        };
        if self.document.annotation(id).is_none() {
            return;
        }
        self.push_snapshot("Delete annotation");
        self.document.remove_annotation(id);
        log::debug!("Deleted annotation {}", id.0);
    }

    pub fn clear_annotations(&mut self) {
        self.finish_gesture();
        let empty = match &self.state {
            InteractionState::Cropping(session) => session.stash.is_empty(),
            _ => self.document.annotations().is_empty(),
        };
        if empty {
            return;
        }
        self.push_snapshot("Clear annotations");
        self.document.clear_annotations();
        if let InteractionState::Cropping(session) = &mut self.state {
            session.stash.clear();
            session.preview = None;
        }
        self.selection = None;
    }

    /// Abort the gesture in progress, or leave crop mode, or deselect
    pub fn cancel(&mut self) {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => self.selection = None,
            InteractionState::Drawing(_) => {}
            InteractionState::Dragging(drag) => self.cancel_drag(drag),
            InteractionState::EditingText(edit) => self.cancel_text_edit(edit),
            cropping @ InteractionState::Cropping(_) => {
                self.state = cropping;
                self.cancel_crop();
            }
        }
    }

    /// Revert the latest committed action.
    ///
    /// An uncommitted gesture or crop mode is cancelled instead, since
    /// nothing of it has been recorded yet.
    pub fn undo(&mut self) {
        if !matches!(self.state, InteractionState::Idle) {
            self.cancel();
            return;
        }
        let Some(snapshot) = self.history.pop() else {
            log::debug!("Nothing to undo");
            return;
        };
        self.document.restore(
            snapshot.annotations,
            snapshot.crop,
            snapshot.template,
            snapshot.aspect_ratio,
            snapshot.version,
        );
        self.selection = None;
        match snapshot.preview {
            Some(preview) => self.renderer.install(self.document.revision(), preview),
            None => self.renderer.invalidate(),
        }
    }

    // ------------------------------------------------------------------
    // Crop
    // ------------------------------------------------------------------

    /// Show the whole raster with the committed crop as the editable rectangle
    pub fn enter_crop(&mut self) {
        if self.is_cropping() {
            return;
        }
        self.finish_gesture();
        let session = CropSession {
            stash: self.document.annotations().to_vec(),
            preview: self.renderer.cached(self.document.revision()),
            previous_tool: self.tool,
            gesture: None,
        };
        self.document.enter_crop_mode();
        self.selection = None;
        self.tool = ToolSelection::Crop;
        self.state = InteractionState::Cropping(session);
        log::debug!("Entered crop mode");
    }

    fn crop_pointer_down(&mut self, p: Point) {
        let offset = self.document.layout().offset();
        let crop = self.document.crop();
        let current = crop.pending.unwrap_or(crop.committed);
        if let InteractionState::Cropping(session) = &mut self.state {
            session.gesture = Some(CropGesture::begin(
                current,
                p.x - offset.x,
                p.y - offset.y,
                self.view_scale,
            ));
        }
    }

    /// Commit the pending rectangle. An unchanged or empty rectangle leaves
    /// crop mode like cancel and records nothing.
    pub fn apply_crop(&mut self) {
        let session = match std::mem::take(&mut self.state) {
            InteractionState::Cropping(session) => session,
            other => {
                self.state = other;
                return;
            }
        };
        let crop = self.document.crop();
        let target = crop
            .pending
            .and_then(|pending| self.document.clamp_to_raw(pending))
            .filter(|rect| !rect.is_empty() && *rect != crop.committed);
        let Some(rect) = target else {
            self.state = InteractionState::Cropping(session);
            self.cancel_crop();
            return;
        };

        self.history.push(Snapshot::capture(
            "Crop",
            &self.document,
            session.stash,
            session.preview,
        ));
        self.document.finish_crop(rect);
        self.tool = session.previous_tool;
        log::info!(
            "Cropped to {}x{} at ({}, {})",
            rect.width(),
            rect.height(),
            rect.left,
            rect.top
        );
    }

    /// Leave crop mode, restoring annotations and preview exactly
    pub fn cancel_crop(&mut self) {
        let session = match std::mem::take(&mut self.state) {
            InteractionState::Cropping(session) => session,
            other => {
                self.state = other;
                return;
            }
        };
        self.document.abandon_crop(session.stash);
        if let Some(preview) = session.preview {
            self.renderer.install(self.document.revision(), preview);
        }
        self.tool = session.previous_tool;
        log::debug!("Crop cancelled");
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Preview of the current state including any shape being drawn
    pub fn render_preview(&mut self) -> RenderResult<Arc<RgbaImage>> {
        let pending = match &self.state {
            InteractionState::Drawing(draft) => Some(draft.annotation()),
            _ => None,
        };
        self.renderer.preview_with(&self.document, pending)
    }

    /// Final raster of the committed state. In crop mode that is the
    /// committed crop with the stashed annotations.
    pub fn compose_export(&self) -> RenderResult<RgbaImage> {
        let annotations = match &self.state {
            InteractionState::Cropping(session) => &session.stash[..],
            _ => self.document.annotations(),
        };
        export::compose(
            self.document.raw(),
            self.document.crop().committed,
            annotations,
            self.document.template(),
            self.document.aspect_ratio(),
            self.document.backing_scale(),
            self.renderer.text(),
        )
    }

    /// Encoded bytes, for the clipboard
    pub fn export_bytes(&self, format: ExportFormat) -> ExportResult<Vec<u8>> {
        let image = self.compose_export()?;
        export::encode(&image, format)
    }

    pub fn save(&mut self, path: &Path, format: ExportFormat) -> ExportResult<()> {
        let image = self.compose_export()?;
        export::save_to_path(&image, path, format)?;
        self.document.mark_saved();
        Ok(())
    }

    /// Save under a timestamped name in `location`. `Ok(None)` when the
    /// location has no folder.
    pub fn save_to_location(
        &mut self,
        location: ImageSaveLocation,
        format: ExportFormat,
    ) -> ExportResult<Option<PathBuf>> {
        let Some(path) = export::default_save_path(location, format) else {
            return Ok(None);
        };
        self.save(&path, format)?;
        Ok(Some(path))
    }
}

/// `original` moved by a drag from `origin` to `to`
fn dragged(original: &Annotation, mode: DragMode, origin: Point, to: Point, constrain: bool) -> Annotation {
    let (dx, dy) = (to.x - origin.x, to.y - origin.y);
    let mut annotation = original.clone();
    match mode {
        DragMode::Body => annotation.translate(dx, dy),
        DragMode::StartHandle => {
            let start = original.start.translate(dx, dy);
            annotation.start = if constrain {
                constrain_45(original.end, start)
            } else {
                start
            };
        }
        DragMode::EndHandle => {
            let end = original.end.translate(dx, dy);
            annotation.end = if constrain {
                constrain_45(original.start, end)
            } else {
                end
            };
        }
        DragMode::Corner { fixed_x, fixed_y } => {
            let fixed = Point::new(fixed_x, fixed_y);
            let b = Bounds::from_points(original.start, original.end);
            let grabbed_x = if (fixed_x - b.min_x).abs() < 0.5 { b.max_x } else { b.min_x };
            let grabbed_y = if (fixed_y - b.min_y).abs() < 0.5 { b.max_y } else { b.min_y };
            let corner = Point::new(grabbed_x + dx, grabbed_y + dy);
            let square = constrain && matches!(original.tool, Tool::Rectangle | Tool::Circle);
            annotation.start = fixed;
            annotation.end = if square {
                constrain_square(fixed, corner)
            } else {
                corner
            };
        }
    }
    annotation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AspectRatio, Rect};
    use crate::error::RenderError;

    fn controller(width: u32, height: u32, backing_scale: f32) -> InteractionController {
        let _ = env_logger::builder().is_test(true).try_init();
        let raw = RgbaImage::from_pixel(width, height, image::Rgba([40, 80, 120, 255]));
        InteractionController::with_text_renderer(
            Document::new(raw, backing_scale),
            &EditorConfig::default(),
            TextRenderer::default(),
        )
    }

    fn drag(ctl: &mut InteractionController, from: (f32, f32), to: (f32, f32)) {
        let mid = ((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
        ctl.update(EditorMsg::pointer_down(from.0, from.1, Modifiers::NONE));
        ctl.update(EditorMsg::pointer_move(mid.0, mid.1, Modifiers::NONE));
        ctl.update(EditorMsg::pointer_move(to.0, to.1, Modifiers::NONE));
        ctl.update(EditorMsg::pointer_up(to.0, to.1, Modifiers::NONE));
    }

    fn tap(ctl: &mut InteractionController, at: (f32, f32)) {
        ctl.update(EditorMsg::pointer_down(at.0, at.1, Modifiers::NONE));
        ctl.update(EditorMsg::pointer_up(at.0, at.1, Modifiers::NONE));
    }

    fn add_rect(ctl: &mut InteractionController, s: (f32, f32), e: (f32, f32)) -> AnnotationId {
        let id = ctl.document.next_annotation_id();
        ctl.document.add_annotation(Annotation::new(
            id,
            Tool::Rectangle,
            Point::new(s.0, s.1),
            Point::new(e.0, e.1),
            AnnotationStyle::default(),
        ));
        id
    }

    /// Raw-raster position under an annotation's start point
    fn content_position(ctl: &InteractionController, annotation: &Annotation) -> (f32, f32) {
        let offset = ctl.document().layout().offset();
        let origin = ctl.document().working_rect();
        (
            annotation.start.x - offset.x + origin.left as f32,
            annotation.start.y - offset.y + origin.top as f32,
        )
    }

    #[test]
    fn test_draw_commits_with_one_snapshot() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::tool(Tool::Rectangle));
        drag(&mut ctl, (10.0, 10.0), (60.0, 80.0));

        assert_eq!(ctl.document().annotations().len(), 1);
        assert_eq!(ctl.history().len(), 1);
        let ann = &ctl.document().annotations()[0];
        assert_eq!((ann.start, ann.end), (Point::new(10.0, 10.0), Point::new(60.0, 80.0)));
        assert_eq!(ctl.selection(), Some(ann.id));
        assert!(matches!(ctl.state(), InteractionState::Idle));
    }

    #[test]
    fn test_tiny_shape_is_discarded() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::tool(Tool::Arrow));
        tap(&mut ctl, (50.0, 50.0));
        assert!(ctl.document().annotations().is_empty());
        assert!(ctl.history().is_empty());
    }

    #[test]
    fn test_freehand_keeps_decimated_points() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::tool(Tool::Freehand));
        ctl.update(EditorMsg::pointer_down(10.0, 10.0, Modifiers::NONE));
        for i in 1..=40 {
            ctl.update(EditorMsg::pointer_move(10.0 + i as f32 * 0.5, 10.0, Modifiers::NONE));
        }
        ctl.update(EditorMsg::pointer_up(30.0, 10.0, Modifiers::NONE));
        let ann = &ctl.document().annotations()[0];
        assert!(ann.points.len() < 20);
        assert_eq!(ann.points.first(), Some(&Point::new(10.0, 10.0)));
        assert_eq!(ann.points.last(), Some(&Point::new(30.0, 10.0)));
    }

    #[test]
    fn test_create_then_undo_restores_empty_document() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::tool(Tool::Line));
        drag(&mut ctl, (10.0, 10.0), (200.0, 120.0));
        assert_eq!(ctl.document().annotations().len(), 1);

        ctl.update(EditorMsg::undo());
        assert!(ctl.document().annotations().is_empty());
        assert_eq!(ctl.selection(), None);
        assert!(!ctl.history().can_undo());
    }

    #[test]
    fn test_delete_then_undo_restores_exact_annotation() {
        let mut ctl = controller(400, 300, 1.0);
        let id = add_rect(&mut ctl, (10.0, 10.0), (60.0, 60.0));
        let before = ctl.document().annotations().to_vec();

        tap(&mut ctl, (35.0, 35.0));
        assert_eq!(ctl.selection(), Some(id));
        ctl.update(EditorMsg::DeleteSelected);
        assert!(ctl.document().annotations().is_empty());

        ctl.update(EditorMsg::undo());
        assert_eq!(ctl.document().annotations(), &before[..]);
    }

    #[test]
    fn test_undo_on_empty_history_is_noop() {
        let mut ctl = controller(100, 100, 1.0);
        let revision = ctl.document().revision();
        ctl.update(EditorMsg::undo());
        assert_eq!(ctl.document().revision(), revision);
        assert!(ctl.document().annotations().is_empty());
    }

    #[test]
    fn test_overlap_selects_later_annotation() {
        let mut ctl = controller(400, 300, 1.0);
        add_rect(&mut ctl, (0.0, 0.0), (100.0, 100.0));
        let later = add_rect(&mut ctl, (50.0, 50.0), (150.0, 150.0));
        tap(&mut ctl, (75.0, 75.0));
        assert_eq!(ctl.selection(), Some(later));
    }

    #[test]
    fn test_body_drag_pushes_single_snapshot() {
        let mut ctl = controller(400, 300, 1.0);
        let id = add_rect(&mut ctl, (10.0, 10.0), (60.0, 60.0));
        ctl.update(EditorMsg::pointer_down(35.0, 35.0, Modifiers::NONE));
        for step in 1..=10 {
            let d = step as f32;
            ctl.update(EditorMsg::pointer_move(35.0 + d, 35.0 + d, Modifiers::NONE));
        }
        ctl.update(EditorMsg::pointer_up(45.0, 45.0, Modifiers::NONE));

        assert_eq!(ctl.history().len(), 1);
        let ann = ctl.document().annotation(id).unwrap();
        assert_eq!((ann.start, ann.end), (Point::new(20.0, 20.0), Point::new(70.0, 70.0)));

        ctl.update(EditorMsg::undo());
        let ann = ctl.document().annotation(id).unwrap();
        assert_eq!(ann.start, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_tap_pushes_nothing() {
        let mut ctl = controller(400, 300, 1.0);
        add_rect(&mut ctl, (10.0, 10.0), (60.0, 60.0));
        tap(&mut ctl, (35.0, 35.0));
        assert!(ctl.history().is_empty());
    }

    #[test]
    fn test_cancel_drag_restores_original() {
        let mut ctl = controller(400, 300, 1.0);
        let id = add_rect(&mut ctl, (10.0, 10.0), (60.0, 60.0));
        ctl.update(EditorMsg::pointer_down(35.0, 35.0, Modifiers::NONE));
        ctl.update(EditorMsg::pointer_move(90.0, 90.0, Modifiers::NONE));
        ctl.update(EditorMsg::cancel());

        let ann = ctl.document().annotation(id).unwrap();
        assert_eq!(ann.start, Point::new(10.0, 10.0));
        assert!(ctl.history().is_empty());
    }

    #[test]
    fn test_corner_drag_resizes_and_normalizes() {
        let mut ctl = controller(400, 300, 1.0);
        let id = add_rect(&mut ctl, (10.0, 10.0), (60.0, 60.0));
        tap(&mut ctl, (35.0, 35.0));

        drag(&mut ctl, (60.0, 60.0), (80.0, 90.0));
        let ann = ctl.document().annotation(id).unwrap();
        assert_eq!((ann.start, ann.end), (Point::new(10.0, 10.0), Point::new(80.0, 90.0)));

        // dragging past the fixed corner flips the box
        drag(&mut ctl, (80.0, 90.0), (0.0, 0.0));
        let ann = ctl.document().annotation(id).unwrap();
        assert_eq!((ann.start, ann.end), (Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
        assert_eq!(ctl.history().len(), 2);
    }

    #[test]
    fn test_handle_hit_radius_scales_with_zoom() {
        let mut ctl = controller(400, 300, 1.0);
        let id = add_rect(&mut ctl, (10.0, 10.0), (60.0, 60.0));
        ctl.set_view_scale(2.0);
        tap(&mut ctl, (70.0, 70.0));
        assert_eq!(ctl.selection(), Some(id));

        // 8 canvas px from the corner is 16 view points: outside the handle
        ctl.update(EditorMsg::pointer_down(136.0, 120.0, Modifiers::NONE));
        assert!(matches!(ctl.state(), InteractionState::Idle));
        assert_eq!(ctl.selection(), None);
    }

    #[test]
    fn test_text_create_edit_and_commit() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::tool(Tool::Text));
        tap(&mut ctl, (100.0, 100.0));
        assert!(ctl.is_editing_text());

        ctl.update(EditorMsg::Text(TextMsg::Insert("hix".into())));
        ctl.update(EditorMsg::Text(TextMsg::Backspace));
        ctl.update(EditorMsg::Text(TextMsg::Commit));
        assert_eq!(ctl.document().annotations()[0].text, "hi");
        assert_eq!(ctl.history().len(), 1);

        // tapping the bubble reopens it
        ctl.update(EditorMsg::SelectTool(ToolSelection::Select));
        tap(&mut ctl, (100.0, 100.0));
        assert!(ctl.is_editing_text());
        ctl.update(EditorMsg::Text(TextMsg::Insert("!".into())));
        ctl.update(EditorMsg::Text(TextMsg::Commit));
        assert_eq!(ctl.document().annotations()[0].text, "hi!");
        assert_eq!(ctl.history().len(), 2);

        ctl.update(EditorMsg::undo());
        assert_eq!(ctl.document().annotations()[0].text, "hi");
        ctl.update(EditorMsg::undo());
        assert!(ctl.document().annotations().is_empty());
    }

    #[test]
    fn test_empty_new_text_leaves_no_trace() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::tool(Tool::Text));
        tap(&mut ctl, (100.0, 100.0));
        ctl.update(EditorMsg::Text(TextMsg::Insert("  ".into())));
        ctl.update(EditorMsg::Text(TextMsg::Commit));
        assert!(ctl.document().annotations().is_empty());
        assert!(ctl.history().is_empty());
    }

    #[test]
    fn test_clearing_existing_text_deletes_it() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::tool(Tool::Text));
        tap(&mut ctl, (100.0, 100.0));
        ctl.update(EditorMsg::Text(TextMsg::Insert("ok".into())));
        ctl.update(EditorMsg::Text(TextMsg::Commit));

        ctl.update(EditorMsg::Pointer(PointerMsg::DoubleClick(Point::new(100.0, 100.0)), Modifiers::NONE));
        assert!(ctl.is_editing_text());
        ctl.update(EditorMsg::Text(TextMsg::Backspace));
        ctl.update(EditorMsg::Text(TextMsg::Backspace));
        ctl.update(EditorMsg::Text(TextMsg::Commit));
        assert!(ctl.document().annotations().is_empty());
        assert_eq!(ctl.history().len(), 2);

        ctl.update(EditorMsg::undo());
        assert_eq!(ctl.document().annotations()[0].text, "ok");
    }

    #[test]
    fn test_style_change_restyles_selection_once() {
        let mut ctl = controller(400, 300, 1.0);
        let id = add_rect(&mut ctl, (10.0, 10.0), (60.0, 60.0));
        tap(&mut ctl, (35.0, 35.0));

        ctl.update(EditorMsg::Style(StyleCommand::StrokeWidth(9.0)));
        ctl.update(EditorMsg::Style(StyleCommand::StrokeWidth(9.0)));
        assert_eq!(ctl.document().annotation(id).unwrap().style.stroke_width, 9.0);
        assert_eq!(ctl.style().stroke_width, 9.0);
        assert_eq!(ctl.history().len(), 1);
    }

    #[test]
    fn test_template_toggle_keeps_annotations_on_content() {
        let mut ctl = controller(400, 300, 2.0);
        add_rect(&mut ctl, (30.0, 40.0), (90.0, 100.0));
        let before = content_position(&ctl, &ctl.document().annotations()[0]);

        ctl.update(EditorMsg::Template(TemplateCommand::SetEnabled(true)));
        let enabled = content_position(&ctl, &ctl.document().annotations()[0]);
        ctl.update(EditorMsg::Template(TemplateCommand::SetAspectRatio(Some(
            AspectRatio::WIDESCREEN,
        ))));
        let widened = content_position(&ctl, &ctl.document().annotations()[0]);
        ctl.update(EditorMsg::Template(TemplateCommand::SetEnabled(false)));
        let after = content_position(&ctl, &ctl.document().annotations()[0]);

        assert_eq!(before, enabled);
        assert_eq!(before, widened);
        assert_eq!(before, after);
        assert_eq!(ctl.document().annotations()[0].start, Point::new(30.0, 40.0));
        assert_eq!(ctl.history().len(), 3);

        // unchanged values record nothing
        ctl.update(EditorMsg::Template(TemplateCommand::SetEnabled(false)));
        assert_eq!(ctl.history().len(), 3);
    }

    #[test]
    fn test_scenario_crop_then_template() {
        let mut ctl = controller(2000, 1000, 2.0);
        ctl.update(EditorMsg::SelectTool(ToolSelection::Crop));
        assert!(ctl.is_cropping());
        drag(&mut ctl, (0.0, 0.0), (100.0, 100.0));
        drag(&mut ctl, (2000.0, 1000.0), (900.0, 700.0));
        assert_eq!(ctl.document().crop().pending, Some(Rect::new(100, 100, 900, 700)));
        ctl.update(EditorMsg::apply_crop());

        assert!(!ctl.is_cropping());
        assert_eq!(ctl.document().crop().committed, Rect::new(100, 100, 900, 700));
        assert_eq!(ctl.document().working_size(), (800, 600));
        assert_eq!(ctl.tool(), ToolSelection::Select);
        assert_eq!(ctl.history().len(), 1);

        ctl.update(EditorMsg::tool(Tool::Arrow));
        drag(&mut ctl, (10.0, 10.0), (200.0, 150.0));
        ctl.update(EditorMsg::Template(TemplateCommand::SetPadding(80.0)));
        ctl.update(EditorMsg::Template(TemplateCommand::SetEnabled(true)));

        assert_eq!(ctl.document().layout().canvas_size(), (1120, 920));
        let arrow = &ctl.document().annotations()[0];
        assert_eq!(arrow.start, Point::new(170.0, 170.0));
        assert_eq!(arrow.end, Point::new(360.0, 310.0));
        assert_eq!(ctl.compose_export().unwrap().dimensions(), (1120, 920));
    }

    #[test]
    fn test_apply_unchanged_crop_records_nothing() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::Template(TemplateCommand::SetEnabled(true)));
        add_rect(&mut ctl, (100.0, 100.0), (150.0, 150.0));
        let annotations = ctl.document().annotations().to_vec();
        let crop = ctl.document().crop().committed;
        let history = ctl.history().len();

        ctl.update(EditorMsg::Crop(CropMsg::Enter));
        ctl.update(EditorMsg::apply_crop());

        assert!(!ctl.is_cropping());
        assert_eq!(ctl.document().annotations(), &annotations[..]);
        assert_eq!(ctl.document().crop().committed, crop);
        assert_eq!(ctl.history().len(), history);
    }

    #[test]
    fn test_cancel_crop_restores_annotations_exactly() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::SelectTool(ToolSelection::Crop));
        drag(&mut ctl, (0.0, 0.0), (50.0, 40.0));
        ctl.update(EditorMsg::apply_crop());
        ctl.update(EditorMsg::Template(TemplateCommand::SetEnabled(true)));
        add_rect(&mut ctl, (100.0, 100.0), (150.0, 150.0));
        let annotations = ctl.document().annotations().to_vec();
        let history = ctl.history().len();

        ctl.update(EditorMsg::Crop(CropMsg::Enter));
        assert_ne!(ctl.document().annotations(), &annotations[..]);
        drag(&mut ctl, (200.0, 200.0), (220.0, 230.0));
        ctl.update(EditorMsg::Crop(CropMsg::Cancel));

        assert!(!ctl.is_cropping());
        assert_eq!(ctl.document().annotations(), &annotations[..]);
        assert_eq!(ctl.document().crop().committed, Rect::new(50, 40, 400, 300));
        assert_eq!(ctl.history().len(), history);
    }

    #[test]
    fn test_undo_crop_restores_previous_crop() {
        let mut ctl = controller(400, 300, 1.0);
        add_rect(&mut ctl, (100.0, 100.0), (150.0, 150.0));
        ctl.update(EditorMsg::SelectTool(ToolSelection::Crop));
        drag(&mut ctl, (0.0, 0.0), (50.0, 40.0));
        ctl.update(EditorMsg::apply_crop());
        assert_eq!(ctl.document().annotations()[0].start, Point::new(50.0, 60.0));

        ctl.update(EditorMsg::undo());
        assert_eq!(ctl.document().crop().committed, Rect::from_size(400, 300));
        assert_eq!(ctl.document().annotations()[0].start, Point::new(100.0, 100.0));
    }

    #[test]
    fn test_export_in_crop_mode_uses_committed_state() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::SelectTool(ToolSelection::Crop));
        drag(&mut ctl, (0.0, 0.0), (100.0, 100.0));
        ctl.update(EditorMsg::apply_crop());

        ctl.update(EditorMsg::Crop(CropMsg::Enter));
        assert_eq!(ctl.document().working_size(), (400, 300));
        assert_eq!(ctl.compose_export().unwrap().dimensions(), (300, 200));
    }

    #[test]
    fn test_undo_reinstalls_cached_preview() {
        let mut ctl = controller(120, 80, 1.0);
        let first = ctl.render_preview().unwrap();
        ctl.update(EditorMsg::tool(Tool::Rectangle));
        drag(&mut ctl, (10.0, 10.0), (60.0, 60.0));
        ctl.update(EditorMsg::undo());
        assert!(Arc::ptr_eq(&first, &ctl.render_preview().unwrap()));
    }

    #[test]
    fn test_crop_without_change_keeps_document_clean() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::Crop(CropMsg::Enter));
        ctl.update(EditorMsg::apply_crop());
        assert!(ctl.history().is_empty());
        assert!(!ctl.has_unsaved_changes());

        ctl.update(EditorMsg::Crop(CropMsg::Enter));
        drag(&mut ctl, (0.0, 0.0), (50.0, 40.0));
        ctl.update(EditorMsg::Crop(CropMsg::Cancel));
        assert!(!ctl.has_unsaved_changes());
    }

    #[test]
    fn test_undo_to_saved_state_is_clean() {
        let mut ctl = controller(400, 300, 1.0);
        ctl.update(EditorMsg::tool(Tool::Rectangle));
        drag(&mut ctl, (10.0, 10.0), (60.0, 80.0));
        assert!(ctl.has_unsaved_changes());
        ctl.update(EditorMsg::undo());
        assert!(ctl.document().annotations().is_empty());
        assert!(!ctl.has_unsaved_changes());
    }

    #[test]
    fn test_cancelled_edits_keep_document_clean() {
        let mut ctl = controller(400, 300, 1.0);
        add_rect(&mut ctl, (10.0, 10.0), (60.0, 60.0));
        ctl.document.mark_saved();

        ctl.update(EditorMsg::pointer_down(35.0, 35.0, Modifiers::NONE));
        ctl.update(EditorMsg::pointer_move(50.0, 50.0, Modifiers::NONE));
        ctl.update(EditorMsg::cancel());
        assert!(!ctl.has_unsaved_changes());

        ctl.update(EditorMsg::tool(Tool::Text));
        tap(&mut ctl, (200.0, 200.0));
        ctl.update(EditorMsg::Text(TextMsg::Insert("draft".into())));
        ctl.update(EditorMsg::cancel());
        assert_eq!(ctl.document().annotations().len(), 1);
        assert!(!ctl.has_unsaved_changes());
    }

    #[test]
    fn test_pixelate_preview_while_drawing_matches_commit() {
        let mut ctl = controller(200, 200, 1.0);
        ctl.update(EditorMsg::Style(StyleCommand::Color(crate::config::ShapeColor::new(
            1.0, 0.0, 0.0,
        ))));
        ctl.update(EditorMsg::Style(StyleCommand::StrokeWidth(12.0)));
        ctl.update(EditorMsg::tool(Tool::Line));
        drag(&mut ctl, (20.0, 100.0), (180.0, 100.0));

        ctl.update(EditorMsg::Style(StyleCommand::PixelationScale(20.0)));
        ctl.update(EditorMsg::tool(Tool::Pixelate));
        ctl.update(EditorMsg::pointer_down(60.0, 60.0, Modifiers::NONE));
        ctl.update(EditorMsg::pointer_move(140.0, 140.0, Modifiers::NONE));
        let live = ctl.render_preview().unwrap();
        ctl.update(EditorMsg::pointer_up(140.0, 140.0, Modifiers::NONE));

        let exported = ctl.compose_export().unwrap();
        assert_eq!(live.get_pixel(62, 85), exported.get_pixel(62, 85));
        assert_eq!(exported.get_pixel(62, 85).0, [40, 80, 120, 255]);
        assert!(*live == exported);
    }

    #[test]
    fn test_huge_padding_fails_render_without_panic() {
        let mut ctl = controller(40, 30, 1.0);
        ctl.update(EditorMsg::Template(TemplateCommand::SetPadding(3.0e9)));
        ctl.update(EditorMsg::Template(TemplateCommand::SetEnabled(true)));
        assert!(matches!(
            ctl.compose_export(),
            Err(RenderError::Allocation { .. })
        ));
    }

    #[test]
    fn test_save_clears_unsaved_flag() {
        let mut ctl = controller(40, 30, 1.0);
        add_rect(&mut ctl, (5.0, 5.0), (20.0, 20.0));
        assert!(ctl.has_unsaved_changes());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        ctl.save(&path, ExportFormat::Png).unwrap();
        assert!(!ctl.has_unsaved_changes());
        assert!(path.exists());
    }
}

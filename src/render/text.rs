//! Text bubbles and measurement labels rasterized with ab_glyph

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use tiny_skia::{FillRule, Path as SkPath, PathBuilder, Pixmap, Transform};

use super::geometry::{bubble, shape};
use super::pixmap::{blend_pixel, solid_paint};
use crate::annotations::hit_test::TextMetrics;
use crate::config::ShapeColor;
use crate::domain::{Bounds, Point};

/// Fonts tried when no font path is configured
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Lays out and rasterizes text. Without a font, bubbles are sized from an
/// average glyph advance and drawn without glyphs.
#[derive(Clone, Default)]
pub struct TextRenderer {
    font: Option<FontArc>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl TextRenderer {
    /// Load the configured font, falling back to common system locations
    pub fn load(font_path: Option<&Path>) -> Self {
        let candidates = font_path
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

        for path in candidates {
            let Ok(data) = std::fs::read(&path) else {
                continue;
            };
            match FontArc::try_from_vec(data) {
                Ok(font) => {
                    log::debug!("Loaded annotation font from {}", path.display());
                    return Self { font: Some(font) };
                }
                Err(e) => log::warn!("Ignoring invalid font {}: {}", path.display(), e),
            }
        }

        log::warn!("No usable font found; text annotations will render without glyphs");
        Self::default()
    }

    pub fn from_font(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Advance width of a single line
    pub fn line_width(&self, line: &str, size: f32) -> f32 {
        let Some(font) = &self.font else {
            return line.chars().count() as f32 * size * bubble::AVG_ADVANCE;
        };
        let scaled = font.as_scaled(size);
        let mut width = 0.0;
        let mut prev: Option<GlyphId> = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    /// Pill size for multi-line text, padding included
    pub fn bubble_size(&self, text: &str, size: f32) -> (f32, f32) {
        let lines: Vec<&str> = text.split('\n').collect();
        let longest = lines
            .iter()
            .map(|line| self.line_width(line, size))
            .fold(0.0f32, f32::max)
            .max(size * bubble::AVG_ADVANCE);
        (
            longest + 2.0 * bubble::PAD_X * size,
            lines.len() as f32 * size * bubble::LINE_HEIGHT + 2.0 * bubble::PAD_Y * size,
        )
    }

    /// Draw a pill centered on `center` with each line centered inside it
    pub fn draw_bubble(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        center: Point,
        size: f32,
        background: ShapeColor,
        foreground: ShapeColor,
    ) {
        let (w, h) = self.bubble_size(text, size);
        let bounds = Bounds::new(
            center.x - w * 0.5,
            center.y - h * 0.5,
            center.x + w * 0.5,
            center.y + h * 0.5,
        );
        if let Some(path) = rounded_rect_path(bounds, bubble::CORNER * size) {
            pixmap.fill_path(
                &path,
                &solid_paint(background.to_skia()),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }

        let Some(font) = &self.font else {
            return;
        };
        let scaled = font.as_scaled(size);
        let line_height = size * bubble::LINE_HEIGHT;
        let glyph_height = scaled.ascent() - scaled.descent();
        let color = foreground.to_rgba_u8();

        let mut top = bounds.min_y + bubble::PAD_Y * size;
        for line in text.split('\n') {
            let left = center.x - self.line_width(line, size) * 0.5;
            let baseline = top + (line_height - glyph_height) * 0.5 + scaled.ascent();
            self.draw_line(pixmap, font, line, left, baseline, size, color);
            top += line_height;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_line(
        &self,
        pixmap: &mut Pixmap,
        font: &FontArc,
        line: &str,
        left: f32,
        baseline: f32,
        size: f32,
        color: [u8; 4],
    ) {
        let scaled = font.as_scaled(size);
        let mut cx = left;
        let mut prev: Option<GlyphId> = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = prev {
                cx += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(size, point(cx, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let b = outlined.px_bounds();
                outlined.draw(|px, py, coverage| {
                    blend_pixel(
                        pixmap,
                        b.min.x as i32 + px as i32,
                        b.min.y as i32 + py as i32,
                        color,
                        coverage,
                    );
                });
            }
            cx += scaled.h_advance(id);
            prev = Some(id);
        }
    }
}

impl TextMetrics for TextRenderer {
    fn text_size(&self, text: &str, font_size: f32) -> (f32, f32) {
        self.bubble_size(text, font_size)
    }
}

/// Rounded rectangle with circular corners
pub fn rounded_rect_path(b: Bounds, radius: f32) -> Option<SkPath> {
    let r = radius.max(0.0).min(b.width() * 0.5).min(b.height() * 0.5);
    let k = r * (1.0 - shape::BEZIER_K);
    let mut pb = PathBuilder::new();
    pb.move_to(b.min_x + r, b.min_y);
    pb.line_to(b.max_x - r, b.min_y);
    pb.cubic_to(b.max_x - k, b.min_y, b.max_x, b.min_y + k, b.max_x, b.min_y + r);
    pb.line_to(b.max_x, b.max_y - r);
    pb.cubic_to(b.max_x, b.max_y - k, b.max_x - k, b.max_y, b.max_x - r, b.max_y);
    pb.line_to(b.min_x + r, b.max_y);
    pb.cubic_to(b.min_x + k, b.max_y, b.min_x, b.max_y - k, b.min_x, b.max_y - r);
    pb.line_to(b.min_x, b.min_y + r);
    pb.cubic_to(b.min_x, b.min_y + k, b.min_x + k, b.min_y, b.min_x + r, b.min_y);
    pb.close();
    pb.finish()
}

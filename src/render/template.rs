//! Template compositing: background, padding, rounded corners and drop shadow

use image::imageops::{self, FilterType};
use tiny_skia::{
    FillRule, FilterQuality, GradientStop as SkStop, LinearGradient, Paint, Path, PathBuilder,
    Pattern, Pixmap, PixmapPaint, PremultipliedColorU8, SpreadMode, Transform,
};

use super::geometry::{self, squircle};
use super::pixmap::{new_pixmap, pixmap_from_rgba, solid_paint};
use crate::coords::{self, TemplateLayout};
use crate::domain::{AspectRatio, Background, GradientStop, Template};
use crate::error::{RenderError, RenderResult};

/// Drop shadow constants, in logical units
pub mod shadow {
    pub const BLUR: f32 = 12.0;
    pub const OFFSET_Y: f32 = 6.0;
    pub const OPACITY: f32 = 0.35;
}

/// Width of the flattened border band, in logical units
const EDGE_BAND: f32 = 2.0;

/// Continuous-corner rectangle. Each corner is one cubic leaving the straight
/// edge at `EXTENT * r` with both controls at `CONTROL * r` from the corner.
pub fn squircle_path(x: f32, y: f32, w: f32, h: f32, radius: f32) -> Option<Path> {
    let r = geometry::squircle_radius(w, h, radius);
    if r <= 0.0 {
        let rect = tiny_skia::Rect::from_xywh(x, y, w, h)?;
        return Some(PathBuilder::from_rect(rect));
    }
    let e = r * squircle::EXTENT;
    let c = r * squircle::CONTROL;
    let (right, bottom) = (x + w, y + h);

    let mut pb = PathBuilder::new();
    pb.move_to(x + e, y);
    pb.line_to(right - e, y);
    pb.cubic_to(right - c, y, right, y + c, right, y + e);
    pb.line_to(right, bottom - e);
    pb.cubic_to(right, bottom - c, right - c, bottom, right - e, bottom);
    pb.line_to(x + e, bottom);
    pb.cubic_to(x + c, bottom, x, bottom - c, x, bottom - e);
    pb.line_to(x, y + e);
    pb.cubic_to(x, y + c, x + c, y, x + e, y);
    pb.close();
    pb.finish()
}

/// Gradient axis through the center of a `w` x `h` rect at `angle` degrees,
/// long enough that both ends touch the rect's extremes
pub fn gradient_endpoints(w: f32, h: f32, angle: f32) -> (tiny_skia::Point, tiny_skia::Point) {
    let (sin, cos) = angle.to_radians().sin_cos();
    let half = (cos.abs() * w + sin.abs() * h) * 0.5;
    let (cx, cy) = (w * 0.5, h * 0.5);
    (
        tiny_skia::Point::from_xy(cx - cos * half, cy - sin * half),
        tiny_skia::Point::from_xy(cx + cos * half, cy + sin * half),
    )
}

/// Replace semi-transparent pixels within `band` of the edge with the color
/// of the nearest interior pixel, made opaque
pub fn flatten_edges(pixmap: &mut Pixmap, band: u32) {
    let (w, h) = (pixmap.width(), pixmap.height());
    if band == 0 || w == 0 || h == 0 {
        return;
    }
    let inner = |v: u32, len: u32| {
        if len > 2 * band {
            v.clamp(band, len - 1 - band)
        } else {
            len / 2
        }
    };
    let source = pixmap.clone();
    let src = source.pixels();
    let dst = pixmap.pixels_mut();
    for y in 0..h {
        for x in 0..w {
            let on_band = x < band || y < band || x >= w - band || y >= h - band;
            let idx = (y * w + x) as usize;
            if !on_band || dst[idx].alpha() == 255 {
                continue;
            }
            let sample = src[(inner(y, h) * w + inner(x, w)) as usize].demultiply();
            if let Some(px) =
                PremultipliedColorU8::from_rgba(sample.red(), sample.green(), sample.blue(), 255)
            {
                dst[idx] = px;
            }
        }
    }
}

/// Three-pass box blur of the alpha channel. The result is black with the
/// blurred alpha, which is all a shadow needs.
fn blur_alpha(pixmap: &mut Pixmap, radius: u32) {
    let (w, h) = (pixmap.width() as usize, pixmap.height() as usize);
    let mut alpha: Vec<f32> = pixmap.pixels().iter().map(|p| p.alpha() as f32).collect();
    if radius > 0 {
        let mut scratch = vec![0.0f32; alpha.len()];
        for _ in 0..3 {
            box_pass(&alpha, &mut scratch, w, h, radius as usize, true);
            box_pass(&scratch, &mut alpha, w, h, radius as usize, false);
        }
    }
    for (px, a) in pixmap.pixels_mut().iter_mut().zip(alpha) {
        let a = a.round().clamp(0.0, 255.0) as u8;
        *px = PremultipliedColorU8::from_rgba(0, 0, 0, a).unwrap_or(PremultipliedColorU8::TRANSPARENT);
    }
}

fn box_pass(src: &[f32], dst: &mut [f32], w: usize, h: usize, r: usize, horizontal: bool) {
    let (lines, len) = if horizontal { (h, w) } else { (w, h) };
    let at = |line: usize, i: usize| if horizontal { line * w + i } else { i * w + line };
    let window = (2 * r + 1) as f32;
    for line in 0..lines {
        let mut sum = 0.0;
        for i in 0..=r.min(len.saturating_sub(1)) {
            sum += src[at(line, i)];
        }
        for i in 0..len {
            dst[at(line, i)] = sum / window;
            if i + r + 1 < len {
                sum += src[at(line, i + r + 1)];
            }
            if i >= r {
                sum -= src[at(line, i - r)];
            }
        }
    }
}

/// Composites a screenshot onto its template canvas
pub struct TemplateCompositor<'a> {
    template: &'a Template,
    backing_scale: f32,
    aspect_ratio: Option<AspectRatio>,
}

impl<'a> TemplateCompositor<'a> {
    pub fn new(template: &'a Template, backing_scale: f32, aspect_ratio: Option<AspectRatio>) -> Self {
        Self {
            template,
            backing_scale,
            aspect_ratio,
        }
    }

    pub fn layout(&self, screenshot: (u32, u32)) -> TemplateLayout {
        coords::template_layout(screenshot, self.template, self.backing_scale, self.aspect_ratio)
    }

    /// Place `screenshot` on the template canvas. A disabled template returns
    /// the screenshot unchanged.
    pub fn compose(&self, screenshot: &Pixmap) -> RenderResult<Pixmap> {
        if !self.template.enabled {
            return Ok(screenshot.clone());
        }
        let (w, h) = (screenshot.width(), screenshot.height());
        let layout = self.layout((w, h));
        let mut canvas = new_pixmap(layout.canvas_width, layout.canvas_height)?;
        self.paint_background(&mut canvas)?;

        let (ox, oy) = (layout.offset_x as f32, layout.offset_y as f32);
        let radius = self.template.corner_radius_px(self.backing_scale);
        if radius > 0.0 {
            let mut flattened = screenshot.clone();
            flatten_edges(&mut flattened, (EDGE_BAND * self.backing_scale).ceil() as u32);

            let Some(shape) = squircle_path(ox, oy, w as f32, h as f32, radius) else {
                return Ok(canvas);
            };
            let mut silhouette = new_pixmap(canvas.width(), canvas.height())?;
            silhouette.fill_path(
                &shape,
                &solid_paint(tiny_skia::Color::BLACK),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
            self.draw_shadow(&mut canvas, silhouette);

            let mut paint = Paint::default();
            paint.anti_alias = true;
            paint.shader = Pattern::new(
                flattened.as_ref(),
                SpreadMode::Pad,
                FilterQuality::Nearest,
                1.0,
                Transform::from_translate(ox, oy),
            );
            canvas.fill_path(&shape, &paint, FillRule::Winding, Transform::identity(), None);
        } else {
            let mut silhouette = new_pixmap(canvas.width(), canvas.height())?;
            silhouette.draw_pixmap(
                layout.offset_x as i32,
                layout.offset_y as i32,
                screenshot.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
            self.draw_shadow(&mut canvas, silhouette);
            canvas.draw_pixmap(
                layout.offset_x as i32,
                layout.offset_y as i32,
                screenshot.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
        Ok(canvas)
    }

    /// Blur a silhouette into a shadow and draw it offset below the content
    fn draw_shadow(&self, canvas: &mut Pixmap, mut silhouette: Pixmap) {
        blur_alpha(&mut silhouette, (shadow::BLUR * self.backing_scale * 0.5).round() as u32);
        let paint = PixmapPaint {
            opacity: shadow::OPACITY,
            ..PixmapPaint::default()
        };
        canvas.draw_pixmap(
            0,
            (shadow::OFFSET_Y * self.backing_scale).round() as i32,
            silhouette.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
    }

    fn paint_background(&self, canvas: &mut Pixmap) -> RenderResult<()> {
        match &self.template.background {
            Background::Gradient { stops, angle } => {
                paint_gradient(canvas, stops, *angle);
                Ok(())
            }
            Background::Image(path) => {
                let img = image::open(path)
                    .map_err(|source| RenderError::BackgroundImage {
                        path: path.clone(),
                        source,
                    })?
                    .to_rgba8();
                let (cw, ch) = (canvas.width(), canvas.height());
                let (iw, ih) = (img.width().max(1), img.height().max(1));
                let scale = (cw as f32 / iw as f32).max(ch as f32 / ih as f32);
                let sw = ((iw as f32 * scale).ceil() as u32).max(cw);
                let sh = ((ih as f32 * scale).ceil() as u32).max(ch);
                let resized = imageops::resize(&img, sw, sh, FilterType::Lanczos3);
                let cropped =
                    imageops::crop_imm(&resized, (sw - cw) / 2, (sh - ch) / 2, cw, ch).to_image();
                let fitted = pixmap_from_rgba(&cropped)?;
                canvas.draw_pixmap(
                    0,
                    0,
                    fitted.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    None,
                );
                Ok(())
            }
        }
    }
}

fn paint_gradient(canvas: &mut Pixmap, stops: &[GradientStop], angle: f32) {
    let (start, end) = gradient_endpoints(canvas.width() as f32, canvas.height() as f32, angle);
    let sk_stops = stops
        .iter()
        .map(|s| SkStop::new(s.position.clamp(0.0, 1.0), s.color.to_skia()))
        .collect();
    match LinearGradient::new(start, end, sk_stops, SpreadMode::Pad, Transform::identity()) {
        Some(shader) => {
            let paint = Paint {
                shader,
                ..Paint::default()
            };
            if let Some(rect) =
                tiny_skia::Rect::from_xywh(0.0, 0.0, canvas.width() as f32, canvas.height() as f32)
            {
                canvas.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }
        None => match stops.first() {
            Some(stop) => canvas.fill(stop.color.to_skia()),
            None => canvas.fill(tiny_skia::Color::WHITE),
        },
    }
}

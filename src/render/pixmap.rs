//! Conversion between `RgbaImage` (straight alpha) and tiny-skia `Pixmap`
//! (premultiplied alpha), plus small drawing helpers

use image::RgbaImage;
use tiny_skia::{
    Color, ColorU8, LineCap, LineJoin, Paint, Pixmap, PremultipliedColorU8, Stroke,
};

use crate::error::{RenderError, RenderResult};

/// Allocate a transparent pixmap
pub fn new_pixmap(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height).ok_or(RenderError::Allocation { width, height })
}

/// Copy an image into a new pixmap, premultiplying alpha
pub fn pixmap_from_rgba(img: &RgbaImage) -> RenderResult<Pixmap> {
    let mut pixmap = new_pixmap(img.width(), img.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Copy a pixmap into a new image, undoing premultiplication
pub fn rgba_from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}

/// Source-over blend a straight-alpha color into one pixel with partial coverage
pub fn blend_pixel(pixmap: &mut Pixmap, x: i32, y: i32, color: [u8; 4], coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= pixmap.width() || y as u32 >= pixmap.height() {
        return;
    }
    let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0).clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let idx = y as usize * pixmap.width() as usize + x as usize;
    let dst = pixmap.pixels()[idx];
    let inv = 1.0 - alpha;
    let channel = |src: u8, dst: u8| (src as f32 * alpha + dst as f32 * inv).round();
    let a = (alpha * 255.0 + dst.alpha() as f32 * inv).round().min(255.0);
    let r = channel(color[0], dst.red()).min(a);
    let g = channel(color[1], dst.green()).min(a);
    let b = channel(color[2], dst.blue()).min(a);
    if let Some(px) = PremultipliedColorU8::from_rgba(r as u8, g as u8, b as u8, a as u8) {
        pixmap.pixels_mut()[idx] = px;
    }
}

/// Anti-aliased solid paint
pub fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

/// Round-capped, round-joined stroke
pub fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width: width.max(0.5),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

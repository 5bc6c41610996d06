//! Export pipeline: crop, template, annotations, then encode
//!
//! Save and copy share `compose` with the preview renderer, so exported
//! pixels match what was shown.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::domain::{Annotation, AspectRatio, ImageSaveLocation, Rect, Template};
use crate::error::{ExportError, ExportResult, RenderResult};
use crate::render::{self, TextRenderer, pixmap::rgba_from_pixmap};

/// Output density written into every file
pub const EXPORT_DPI: u16 = 72;
/// 72 DPI in pixels per meter, for the PNG pHYs chunk
const PNG_PIXELS_PER_METER: u32 = 2835;
/// JPEG quality on the 1-100 scale
pub const JPEG_QUALITY: u8 = 90;

/// Encoded output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    /// Lossless WebP
    WebP,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::WebP => "image/webp",
        }
    }

    pub fn is_lossless(self) -> bool {
        !matches!(self, ExportFormat::Jpeg)
    }

    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "webp" => Some(ExportFormat::WebP),
            _ => None,
        }
    }
}

/// Compose the final raster.
///
/// `annotations` must already be expressed in the canvas space of
/// `crop_rect` under `template`.
pub fn compose(
    raw: &RgbaImage,
    crop_rect: Rect,
    annotations: &[Annotation],
    template: &Template,
    aspect_ratio: Option<AspectRatio>,
    backing_scale: f32,
    text: &TextRenderer,
) -> RenderResult<RgbaImage> {
    let canvas = render::render_canvas(
        raw,
        crop_rect,
        annotations,
        template,
        aspect_ratio,
        backing_scale,
        text,
    )?;
    Ok(rgba_from_pixmap(&canvas))
}

/// Encode an image in the requested format, tagged at 72 DPI
pub fn encode(image: &RgbaImage, format: ExportFormat) -> ExportResult<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        ExportFormat::Png => write_png(&mut bytes, image)?,
        ExportFormat::Jpeg => {
            let flattened = flatten_onto_white(image);
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
            encoder.set_pixel_density(PixelDensity::dpi(EXPORT_DPI));
            encoder
                .encode_image(&flattened)
                .map_err(|source| ExportError::Encode {
                    format: "jpeg",
                    source,
                })?;
        }
        ExportFormat::WebP => {
            WebPEncoder::new_lossless(&mut bytes)
                .write_image(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(|source| ExportError::Encode {
                    format: "webp",
                    source,
                })?;
        }
    }
    Ok(bytes)
}

fn write_png<W: std::io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: PNG_PIXELS_PER_METER,
        yppu: PNG_PIXELS_PER_METER,
        unit: png::Unit::Meter,
    }));
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}

/// JPEG has no alpha; composite onto white
fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Decode previously encoded bytes
pub fn decode(bytes: &[u8]) -> ExportResult<RgbaImage> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|source| ExportError::Io {
            path: PathBuf::new(),
            source,
        })?;
    Ok(reader.decode().map_err(ExportError::Decode)?.to_rgba8())
}

/// Encode and write to `path`, creating missing parent directories
pub fn save_to_path(image: &RgbaImage, path: &Path, format: ExportFormat) -> ExportResult<()> {
    let bytes = encode(image, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, &bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Saved {}x{} {} to {}",
        image.width(),
        image.height(),
        format.extension(),
        path.display()
    );
    Ok(())
}

/// Timestamped file path in the user's Pictures or Documents folder.
/// `None` for clipboard-only saves or when no such folder exists.
pub fn default_save_path(location: ImageSaveLocation, format: ExportFormat) -> Option<PathBuf> {
    let mut path = match location {
        ImageSaveLocation::Pictures => {
            dirs::picture_dir().or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
        }
        ImageSaveLocation::Documents => {
            dirs::document_dir().or_else(|| dirs::home_dir().map(|h| h.join("Documents")))
        }
        ImageSaveLocation::Clipboard => None,
    }?;
    let name = chrono::Local::now()
        .format("Screenshot_%Y-%m-%d_%H-%M-%S")
        .to_string();
    path.push(format!("{name}.{}", format.extension()));

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnnotationId, AnnotationStyle, Point, Tool};

    fn raw(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| image::Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255]))
    }

    #[test]
    fn test_round_trip_matches_crop_size() {
        let raw = raw(300, 200);
        let crop = Rect::new(20, 30, 220, 130);
        let out = compose(
            &raw,
            crop,
            &[],
            &Template::default(),
            None,
            1.0,
            &TextRenderer::default(),
        )
        .unwrap();
        for format in [ExportFormat::Png, ExportFormat::Jpeg, ExportFormat::WebP] {
            let decoded = decode(&encode(&out, format).unwrap()).unwrap();
            assert_eq!(decoded.dimensions(), (200, 100), "{format:?}");
        }
        assert_eq!(out.get_pixel(0, 0), raw.get_pixel(20, 30));
    }

    #[test]
    fn test_round_trip_includes_template_growth() {
        let raw = raw(120, 80);
        let template = Template {
            enabled: true,
            padding: 10.0,
            corner_radius: 0.0,
            ..Template::default()
        };
        let out = compose(
            &raw,
            Rect::from_size(120, 80),
            &[],
            &template,
            Some(AspectRatio::SQUARE),
            2.0,
            &TextRenderer::default(),
        )
        .unwrap();
        let decoded = decode(&encode(&out, ExportFormat::Png).unwrap()).unwrap();
        // 160x120 with padding, widened to square
        assert_eq!(decoded.dimensions(), (160, 160));
    }

    #[test]
    fn test_pixelate_export_blocks() {
        let raw = raw(200, 200);
        let mut style = AnnotationStyle::default();
        style.pixelation_scale = 20.0;
        let blur = Annotation::new(
            AnnotationId(1),
            Tool::Pixelate,
            Point::new(50.0, 50.0),
            Point::new(150.0, 150.0),
            style,
        );
        let out = compose(
            &raw,
            Rect::from_size(200, 200),
            &[blur],
            &Template::default(),
            None,
            1.0,
            &TextRenderer::default(),
        )
        .unwrap();
        assert_eq!(out.get_pixel(50, 50), out.get_pixel(69, 69));
        assert_ne!(out.get_pixel(69, 69), out.get_pixel(70, 69));
        assert_eq!(out.get_pixel(49, 49), raw.get_pixel(49, 49));
    }

    #[test]
    fn test_png_carries_72_dpi() {
        let bytes = encode(&raw(4, 4), ExportFormat::Png).unwrap();
        let decoder = png::Decoder::new(Cursor::new(bytes));
        let reader = decoder.read_info().unwrap();
        let dims = reader.info().pixel_dims.unwrap();
        assert_eq!((dims.xppu, dims.unit), (2835, png::Unit::Meter));
    }

    #[test]
    fn test_jpeg_flattens_alpha_onto_white() {
        let flat = flatten_onto_white(&RgbaImage::new(2, 2));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_save_to_path_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shot.png");
        save_to_path(&raw(8, 6), &path, ExportFormat::Png).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (8, 6));
    }

    #[test]
    fn test_default_save_path_naming() {
        assert!(default_save_path(ImageSaveLocation::Clipboard, ExportFormat::Png).is_none());
        if let Some(path) = default_save_path(ImageSaveLocation::Pictures, ExportFormat::Jpeg) {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("Screenshot_") && name.ends_with(".jpg"));
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(Path::new("a/b.JPEG")),
            Some(ExportFormat::Jpeg)
        );
        assert_eq!(ExportFormat::from_path(Path::new("a/b.tiff")), None);
    }
}

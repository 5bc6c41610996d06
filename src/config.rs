//! Editor defaults supplied by the settings collaborator

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{AnnotationStyle, ArrowHead, AspectRatio, Background, ImageSaveLocation, Template};
use crate::export::ExportFormat;

/// Serializable color representation for config storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for ShapeColor {
    fn default() -> Self {
        Self {
            r: 0.9,
            g: 0.1,
            b: 0.1,
        }
    }
}

impl ShapeColor {
    pub const WHITE: ShapeColor = ShapeColor::new(1.0, 1.0, 1.0);
    pub const BLACK: ShapeColor = ShapeColor::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Convert to image crate RGBA format (0-255)
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            255,
        ]
    }

    /// Whether white text on this color would be unreadable
    pub fn is_near_white(self) -> bool {
        self.r >= 0.9 && self.g >= 0.9 && self.b >= 0.9
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        let [r, g, b, a] = self.to_rgba_u8();
        tiny_skia::Color::from_rgba8(r, g, b, a)
    }
}

/// Editor configuration consumed at document open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Color for new annotations
    #[serde(default)]
    pub shape_color: ShapeColor,
    /// Stroke width for new annotations, in image pixels
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,
    /// Font size for text and measurement labels, in image pixels
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Pixelation block size (larger = more pixelated)
    #[serde(default = "default_pixelation_scale")]
    pub pixelation_scale: f32,
    #[serde(default)]
    pub arrow_head: ArrowHead,
    /// Template applied to newly opened screenshots
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default)]
    pub save_location: ImageSaveLocation,
    #[serde(default)]
    pub export_format: ExportFormat,
    /// Font file used for text annotations (None = search system fonts)
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    /// Maximum number of undo steps kept
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_stroke_width() -> f32 {
    4.0
}

fn default_font_size() -> f32 {
    24.0
}

fn default_pixelation_scale() -> f32 {
    16.0
}

fn default_history_limit() -> usize {
    100
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            shape_color: ShapeColor::default(),
            stroke_width: default_stroke_width(),
            font_size: default_font_size(),
            pixelation_scale: default_pixelation_scale(),
            arrow_head: ArrowHead::default(),
            template: Template {
                background: Background::default(),
                ..Template::default()
            },
            aspect_ratio: None,
            save_location: ImageSaveLocation::Pictures,
            export_format: ExportFormat::Png,
            font_path: None,
            history_limit: default_history_limit(),
        }
    }
}

impl EditorConfig {
    /// Parse a JSON settings blob; missing fields take their defaults
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid editor config")
    }

    /// Read a JSON settings file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Like [`EditorConfig::load_from`], falling back to defaults on error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:?}", err);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize editor config")
    }

    /// Style used for new annotations
    pub fn default_style(&self) -> AnnotationStyle {
        AnnotationStyle {
            color: self.shape_color,
            stroke_width: self.stroke_width.max(1.0),
            font_size: self.font_size.max(4.0),
            pixelation_scale: self.pixelation_scale.max(1.0),
            arrow_head: self.arrow_head,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json(r#"{ "stroke_width": 6.0 }"#).unwrap();
        assert_eq!(config.stroke_width, 6.0);
        assert_eq!(config.font_size, 24.0);
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.export_format, ExportFormat::Png);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EditorConfig {
            aspect_ratio: Some(AspectRatio::WIDESCREEN),
            arrow_head: ArrowHead::Sketch,
            ..Default::default()
        };
        let parsed = EditorConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load_or_default(&dir.path().join("missing.json"));
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_near_white() {
        assert!(ShapeColor::WHITE.is_near_white());
        assert!(!ShapeColor::default().is_near_white());
        assert_eq!(ShapeColor::BLACK.to_rgba_u8(), [0, 0, 0, 255]);
    }
}

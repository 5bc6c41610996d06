//! Background template types: gradient or image backdrop, padding and corner rounding

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ShapeColor;

/// A single color stop of a linear gradient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the gradient axis, 0.0 to 1.0
    pub position: f32,
    pub color: ShapeColor,
}

impl GradientStop {
    pub const fn new(position: f32, color: ShapeColor) -> Self {
        Self { position, color }
    }
}

/// What is painted behind the screenshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Background {
    Gradient {
        stops: Vec<GradientStop>,
        /// Direction in degrees, 0 = left to right, 90 = top to bottom
        angle: f32,
    },
    /// User-supplied image, cover-fit to the canvas
    Image(PathBuf),
}

impl Default for Background {
    fn default() -> Self {
        Background::presets()
            .into_iter()
            .next()
            .map(|(_, bg)| bg)
            .unwrap_or(Background::Gradient {
                stops: Vec::new(),
                angle: 0.0,
            })
    }
}

impl Background {
    /// Built-in gradient backgrounds
    pub fn presets() -> Vec<(&'static str, Background)> {
        let gradient = |a: [f32; 3], b: [f32; 3], angle: f32| Background::Gradient {
            stops: vec![
                GradientStop::new(0.0, ShapeColor::new(a[0], a[1], a[2])),
                GradientStop::new(1.0, ShapeColor::new(b[0], b[1], b[2])),
            ],
            angle,
        };
        vec![
            ("Dusk", gradient([0.40, 0.30, 0.90], [0.95, 0.45, 0.60], 45.0)),
            ("Ocean", gradient([0.10, 0.55, 0.85], [0.20, 0.85, 0.75], 90.0)),
            ("Sunrise", gradient([1.00, 0.62, 0.25], [0.98, 0.30, 0.40], 135.0)),
            ("Forest", gradient([0.15, 0.45, 0.30], [0.55, 0.80, 0.40], 60.0)),
            ("Graphite", gradient([0.18, 0.19, 0.22], [0.38, 0.40, 0.45], 90.0)),
        ]
    }
}

/// Padded background the screenshot is composited onto
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub enabled: bool,
    pub background: Background,
    /// Padding around the screenshot in logical units
    pub padding: f32,
    /// Screenshot corner radius in logical units
    pub corner_radius: f32,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            enabled: false,
            background: Background::default(),
            padding: 64.0,
            corner_radius: 12.0,
        }
    }
}

impl Template {
    /// Padding in device pixels, zero when disabled
    pub fn padding_px(&self, backing_scale: f32) -> u32 {
        if !self.enabled {
            return 0;
        }
        (self.padding.max(0.0) * backing_scale).round() as u32
    }

    /// Corner radius in device pixels
    pub fn corner_radius_px(&self, backing_scale: f32) -> f32 {
        (self.corner_radius.max(0.0) * backing_scale).round()
    }
}

/// Target width:height ratio for the templated canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio::new(1, 1);
    pub const STANDARD: AspectRatio = AspectRatio::new(4, 3);
    pub const WIDESCREEN: AspectRatio = AspectRatio::new(16, 9);
    pub const PHOTO: AspectRatio = AspectRatio::new(3, 2);
    pub const PORTRAIT: AspectRatio = AspectRatio::new(9, 16);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn presets() -> [AspectRatio; 5] {
        [
            Self::SQUARE,
            Self::STANDARD,
            Self::WIDESCREEN,
            Self::PHOTO,
            Self::PORTRAIT,
        ]
    }

    /// Width divided by height; `None` for a degenerate ratio
    pub fn ratio(self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(self.width as f64 / self.height as f64)
    }
}

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use crate::error::WatermarkError;

/// Text used when a text watermark is configured with an empty string
pub const DEFAULT_TEXT: &str = "WATERMARK";

/// Largest font size a spec is clamped to
pub const MAX_FONT_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

/// One of the nine anchor points a watermark can be placed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Position {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    #[default]
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Position {
    pub const ALL: [Position; 9] = [
        Position::TopLeft,
        Position::TopCenter,
        Position::TopRight,
        Position::CenterLeft,
        Position::Center,
        Position::CenterRight,
        Position::BottomLeft,
        Position::BottomCenter,
        Position::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopCenter => "top-center",
            Position::TopRight => "top-right",
            Position::CenterLeft => "center-left",
            Position::Center => "center",
            Position::CenterRight => "center-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomCenter => "bottom-center",
            Position::BottomRight => "bottom-right",
        }
    }

    /// Parse an anchor name, falling back to bottom-left for anything unrecognised
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!(
                "Unknown watermark position '{}', using {}",
                name,
                Position::default()
            );
            Position::default()
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| WatermarkError::InvalidValue(format!("position '{}'", s)))
    }
}

impl From<String> for Position {
    fn from(value: String) -> Self {
        Position::parse_lenient(&value)
    }
}

impl From<Position> for String {
    fn from(value: Position) -> Self {
        value.as_str().to_string()
    }
}

/// Straight (non-premultiplied) RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RgbaColor {
    pub const WHITE: RgbaColor = RgbaColor::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Scale the alpha channel by an opacity percentage (0-100)
    pub fn with_opacity(self, opacity: u8) -> Self {
        let factor = f64::from(opacity.min(100)) / 100.0;
        Self {
            a: (f64::from(self.a) * factor) as u8,
            ..self
        }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for RgbaColor {
    fn default() -> Self {
        RgbaColor::WHITE
    }
}

impl FromStr for RgbaColor {
    type Err = WatermarkError;

    /// Accepts `#RRGGBB` or `#RRGGBBAA`, with or without the leading `#`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || WatermarkError::InvalidValue(format!("color '{}'", s));

        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(RgbaColor::new(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

/// Everything the compositor needs to draw one watermark.
///
/// A spec is built once per compositing call and never mutated while drawing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatermarkSpec {
    pub kind: WatermarkKind,
    pub text: String,
    pub image_path: Option<PathBuf>,
    pub font_size: u32,
    pub color: RgbaColor,
    /// Percentage 0-100
    pub opacity: u8,
    pub position: Position,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Degrees, clockwise
    pub rotation: f32,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            kind: WatermarkKind::Text,
            text: DEFAULT_TEXT.to_string(),
            image_path: None,
            font_size: 52,
            color: RgbaColor::WHITE,
            opacity: 80,
            position: Position::BottomRight,
            offset_x: 0,
            offset_y: 0,
            rotation: 0.0,
        }
    }
}

impl WatermarkSpec {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: WatermarkKind::Image,
            image_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Text to render, substituting the default when empty
    pub fn resolved_text(&self) -> &str {
        if self.text.is_empty() {
            DEFAULT_TEXT
        } else {
            &self.text
        }
    }

    /// Watermark color with its alpha scaled by the configured opacity
    pub fn effective_color(&self) -> RgbaColor {
        self.color.with_opacity(self.opacity)
    }

    /// Clamp numeric fields into their documented ranges
    pub fn clamped(mut self) -> Self {
        self.font_size = self.font_size.clamp(1, MAX_FONT_SIZE);
        self.opacity = self.opacity.min(100);
        self.rotation = self.rotation.rem_euclid(360.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_round_trips_names() {
        for position in Position::ALL {
            assert_eq!(position.as_str().parse::<Position>().unwrap(), position);
        }
    }

    #[test]
    fn test_position_unknown_falls_back_to_bottom_left() {
        assert!("diagonal".parse::<Position>().is_err());
        assert_eq!(Position::parse_lenient("diagonal"), Position::BottomLeft);
        assert_eq!(Position::parse_lenient(" Top-Right "), Position::TopRight);
    }

    #[test]
    fn test_color_hex_parsing() {
        assert_eq!(
            "#ff8000".parse::<RgbaColor>().unwrap(),
            RgbaColor::new(255, 128, 0, 255)
        );
        assert_eq!(
            "10203040".parse::<RgbaColor>().unwrap(),
            RgbaColor::new(0x10, 0x20, 0x30, 0x40)
        );
        assert!("#fff".parse::<RgbaColor>().is_err());
        assert!("#gggggg".parse::<RgbaColor>().is_err());
    }

    #[test]
    fn test_opacity_scales_alpha() {
        assert_eq!(RgbaColor::WHITE.with_opacity(80).a, 204);
        assert_eq!(RgbaColor::WHITE.with_opacity(0).a, 0);
        assert_eq!(RgbaColor::WHITE.with_opacity(100).a, 255);
        assert_eq!(RgbaColor::new(0, 0, 0, 100).with_opacity(50).a, 50);
    }

    #[test]
    fn test_empty_text_uses_default() {
        let spec = WatermarkSpec::text("");
        assert_eq!(spec.resolved_text(), DEFAULT_TEXT);
        let spec = WatermarkSpec::text("hello");
        assert_eq!(spec.resolved_text(), "hello");
    }

    #[test]
    fn test_spec_defaults() {
        let spec = WatermarkSpec::default();
        assert_eq!(spec.kind, WatermarkKind::Text);
        assert_eq!(spec.font_size, 52);
        assert_eq!(spec.opacity, 80);
        assert_eq!(spec.position, Position::BottomRight);
        assert_eq!(spec.offset_x, 0);
    }

    #[test]
    fn test_clamped() {
        let spec = WatermarkSpec {
            font_size: 0,
            opacity: 150,
            rotation: -90.0,
            ..WatermarkSpec::default()
        }
        .clamped();
        assert_eq!(spec.font_size, 1);
        assert_eq!(spec.opacity, 100);
        assert_eq!(spec.rotation, 270.0);
    }

    #[test]
    fn test_clamped_caps_font_size() {
        let spec = WatermarkSpec {
            font_size: u32::MAX,
            ..WatermarkSpec::default()
        }
        .clamped();
        assert_eq!(spec.font_size, MAX_FONT_SIZE);
    }
}

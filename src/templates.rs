use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::WatermarkError;
use crate::watermark::{Position, RgbaColor, WatermarkKind, WatermarkSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplateColor {
    #[serde(rename = "R")]
    pub r: u8,
    #[serde(rename = "G")]
    pub g: u8,
    #[serde(rename = "B")]
    pub b: u8,
    #[serde(rename = "A")]
    pub a: u8,
}

/// One saved watermark configuration, in the field layout of the template file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WatermarkTemplate {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub font_size: i64,
    pub color: TemplateColor,
    #[serde(default)]
    pub opacity: i64,
    #[serde(default)]
    pub position: String,
    /// Saved with every template but never part of placement; kept so files round-trip
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub is_image: bool,
}

/// Converts a saved template into a spec.
///
/// The template's `X`/`Y` fields do not become offsets. Placement comes from
/// `Position` and the fixed margin alone, and templates saved with the stock
/// `X: 10, Y: 10` must anchor exactly where an untemplated watermark would.
impl From<WatermarkTemplate> for WatermarkSpec {
    fn from(t: WatermarkTemplate) -> Self {
        let image_path = if t.image_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(t.image_path))
        };

        WatermarkSpec {
            kind: if t.is_image {
                WatermarkKind::Image
            } else {
                WatermarkKind::Text
            },
            text: t.text,
            image_path,
            font_size: t.font_size.clamp(1, i64::from(u32::MAX)) as u32,
            color: RgbaColor::new(t.color.r, t.color.g, t.color.b, t.color.a),
            opacity: t.opacity.clamp(0, 100) as u8,
            position: Position::parse_lenient(&t.position),
            offset_x: 0,
            offset_y: 0,
            rotation: t.rotation as f32,
        }
        .clamped()
    }
}

/// Parse a template file: a JSON object mapping template names to configurations
pub fn parse_templates(json: &str) -> Result<BTreeMap<String, WatermarkTemplate>, WatermarkError> {
    Ok(serde_json::from_str(json)?)
}

/// Read the template called `name` from `path`
pub fn load_template(path: &Path, name: &str) -> Result<WatermarkSpec, WatermarkError> {
    let content = std::fs::read_to_string(path)?;
    let mut templates = parse_templates(&content)?;
    debug!("Loaded {} templates from {:?}", templates.len(), path);

    templates
        .remove(name)
        .map(WatermarkSpec::from)
        .ok_or_else(|| WatermarkError::TemplateNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::composite;
    use image::{DynamicImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    const TEMPLATES: &str = r#"{
        "corner": {
            "Text": "© Studio",
            "FontSize": 26,
            "Color": {"R": 255, "G": 0, "B": 0, "A": 255},
            "Opacity": 60,
            "Position": "top-right",
            "X": 10,
            "Y": 10,
            "Rotation": 0,
            "ImagePath": "",
            "IsImage": false
        },
        "logo": {
            "Text": "",
            "FontSize": 52,
            "Color": {"R": 255, "G": 255, "B": 255, "A": 255},
            "Opacity": 150,
            "Position": "somewhere",
            "X": 0,
            "Y": 0,
            "Rotation": 400,
            "ImagePath": "logo.png",
            "IsImage": true
        }
    }"#;

    #[test]
    fn test_text_template_to_spec() {
        let templates = parse_templates(TEMPLATES).unwrap();
        let spec = WatermarkSpec::from(templates["corner"].clone());

        assert_eq!(spec.kind, WatermarkKind::Text);
        assert_eq!(spec.text, "© Studio");
        assert_eq!(spec.font_size, 26);
        assert_eq!(spec.color, RgbaColor::new(255, 0, 0, 255));
        assert_eq!(spec.opacity, 60);
        assert_eq!(spec.position, Position::TopRight);
        assert_eq!((spec.offset_x, spec.offset_y), (0, 0));
        assert!(spec.image_path.is_none());
    }

    #[test]
    fn test_template_xy_does_not_shift_anchor() {
        let json = r#"{
            "stock": {
                "Text": "WATERMARK",
                "FontSize": 13,
                "Color": {"R": 255, "G": 255, "B": 255, "A": 255},
                "Opacity": 100,
                "Position": "bottom-left",
                "X": 10,
                "Y": 10
            }
        }"#;
        let templates = parse_templates(json).unwrap();
        let spec = WatermarkSpec::from(templates["stock"].clone());

        let background = Rgba([0, 0, 0, 255]);
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 100, background));
        let result = composite(&source, &spec, None).to_rgba8();

        let changed: Vec<(u32, u32)> = result
            .enumerate_pixels()
            .filter(|(_, _, p)| **p != background)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!changed.is_empty());
        // Anchored at (10, 90): margin from the left edge, baseline 10px above the bottom
        assert!(
            changed.iter().all(|&(x, y)| x >= 10 && y < 90),
            "{:?}",
            changed.iter().find(|&&(x, y)| x < 10 || y >= 90)
        );
        assert!(changed.iter().any(|&(x, _)| x < 14));
    }

    #[test]
    fn test_image_template_is_clamped() {
        let templates = parse_templates(TEMPLATES).unwrap();
        let spec = WatermarkSpec::from(templates["logo"].clone());

        assert_eq!(spec.kind, WatermarkKind::Image);
        assert_eq!(spec.image_path, Some(PathBuf::from("logo.png")));
        assert_eq!(spec.opacity, 100);
        assert_eq!(spec.position, Position::BottomLeft);
        assert_eq!(spec.rotation, 40.0);
    }

    #[test]
    fn test_load_template_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("templates.json");
        std::fs::write(&path, TEMPLATES).unwrap();

        let spec = load_template(&path, "corner").unwrap();
        assert_eq!(spec.text, "© Studio");

        let missing = load_template(&path, "nope");
        assert!(matches!(missing, Err(WatermarkError::TemplateNotFound(name)) if name == "nope"));
    }

    #[test]
    fn test_malformed_template_file() {
        assert!(matches!(
            parse_templates("{not json"),
            Err(WatermarkError::SerdeError(_))
        ));
    }
}

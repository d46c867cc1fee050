use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::error::WatermarkError;
use crate::export::{ExportSettings, process_image};
use crate::watermark::{GlyphFace, Position, RgbaColor, WatermarkKind, WatermarkSpec};

/// How the capture date is rendered onto a photo
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DateStampSettings {
    /// strftime pattern for the stamped text
    pub format: String,
    pub font_size: u32,
    pub color: RgbaColor,
    pub opacity: u8,
    pub position: Position,
}

impl Default for DateStampSettings {
    fn default() -> Self {
        Self {
            format: "%Y-%m-%d".to_string(),
            font_size: 39,
            color: RgbaColor::new(255, 165, 0, 255),
            opacity: 100,
            position: Position::BottomRight,
        }
    }
}

#[derive(Debug, Default)]
pub struct StampSummary {
    pub written: Vec<PathBuf>,
    /// Images without a usable EXIF date
    pub skipped: Vec<PathBuf>,
}

/// Capture date from EXIF, preferring the original exposure time
pub fn capture_date(image_path: &Path) -> Option<NaiveDateTime> {
    let exif = match rexif::parse_file(image_path) {
        Ok(exif) => exif,
        Err(e) => {
            trace!("No EXIF data for {}: {}", image_path.display(), e);
            return None;
        }
    };

    let date_fields = [
        rexif::ExifTag::DateTimeOriginal,
        rexif::ExifTag::DateTimeDigitized,
        rexif::ExifTag::DateTime,
    ];

    for field in &date_fields {
        if let Some(entry) = exif.entries.iter().find(|e| e.tag == *field)
            && let Some(date) = parse_exif_datetime(&entry.value_more_readable)
        {
            debug!("Found capture date in {:?}: {}", field, date);
            return Some(date);
        }
    }

    None
}

/// Parse an EXIF timestamp ("2005:07:30 07:22:46") or one of its common variants
pub fn parse_exif_datetime(datetime_str: &str) -> Option<NaiveDateTime> {
    // EXIF ASCII values carry a NUL terminator
    let datetime_str = datetime_str.trim_matches(|c: char| c == '\0' || c.is_whitespace());

    let datetime_formats = ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    for format in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(datetime_str, format) {
            return Some(dt);
        }
    }

    let date_formats = ["%Y:%m:%d", "%Y-%m-%d", "%Y/%m/%d"];
    for format in &date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(datetime_str, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Text watermark spec that stamps `date` according to `settings`
pub fn date_stamp_spec(date: NaiveDateTime, settings: &DateStampSettings) -> WatermarkSpec {
    WatermarkSpec {
        kind: WatermarkKind::Text,
        text: date.format(&settings.format).to_string(),
        image_path: None,
        font_size: settings.font_size,
        color: settings.color,
        opacity: settings.opacity,
        position: settings.position,
        offset_x: 0,
        offset_y: 0,
        rotation: 0.0,
    }
    .clamped()
}

/// Stamp every image with its own capture date.
///
/// Images without an EXIF date are skipped; any decode or write failure aborts
/// the remaining batch.
pub fn stamp_batch(
    images: &[PathBuf],
    settings: &DateStampSettings,
    face: &dyn GlyphFace,
    export: &ExportSettings,
) -> Result<StampSummary, WatermarkError> {
    std::fs::create_dir_all(&export.output_folder)?;
    let mut summary = StampSummary::default();

    for input in images {
        let Some(date) = capture_date(input) else {
            info!("Skipping {}: no EXIF capture date", input.display());
            summary.skipped.push(input.clone());
            continue;
        };

        let spec = date_stamp_spec(date, settings);
        summary
            .written
            .push(process_image(input, &spec, None, face, export)?);
    }

    info!(
        "Stamped {} images, skipped {}",
        summary.written.len(),
        summary.skipped.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::BitmapFace;
    use image::{DynamicImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse_exif_datetime_formats() {
        let expected = datetime(2005, 7, 30, 7, 22, 46);
        assert_eq!(parse_exif_datetime("2005:07:30 07:22:46"), Some(expected));
        assert_eq!(parse_exif_datetime("2005-07-30 07:22:46"), Some(expected));
        assert_eq!(parse_exif_datetime("2005/07/30 07:22:46"), Some(expected));
        assert_eq!(
            parse_exif_datetime("2005:07:30"),
            Some(datetime(2005, 7, 30, 0, 0, 0))
        );
        assert_eq!(parse_exif_datetime("2005:07:30 07:22:46\0"), Some(expected));
        assert_eq!(parse_exif_datetime("not a date"), None);
        assert_eq!(parse_exif_datetime("0000:00:00 00:00:00"), None);
    }

    #[test]
    fn test_date_stamp_spec() {
        let settings = DateStampSettings::default();
        let spec = date_stamp_spec(datetime(2024, 1, 2, 3, 4, 5), &settings);

        assert_eq!(spec.kind, WatermarkKind::Text);
        assert_eq!(spec.text, "2024-01-02");
        assert_eq!(spec.color, RgbaColor::new(255, 165, 0, 255));
        assert_eq!(spec.position, Position::BottomRight);

        let settings = DateStampSettings {
            format: "'%y %m %d".to_string(),
            ..DateStampSettings::default()
        };
        let spec = date_stamp_spec(datetime(2024, 1, 2, 3, 4, 5), &settings);
        assert_eq!(spec.text, "'24 01 02");
    }

    #[test]
    fn test_capture_date_without_exif() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.png");
        RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();
        assert_eq!(capture_date(&path), None);
        assert_eq!(capture_date(Path::new("missing.jpg")), None);
    }

    #[test]
    fn test_stamp_batch_skips_undated_images() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.png");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([9, 9, 9, 255])))
            .save(&path)
            .unwrap();

        let export = ExportSettings {
            output_folder: temp_dir.path().join("out"),
            ..ExportSettings::default()
        };
        let summary = stamp_batch(
            &[path.clone()],
            &DateStampSettings::default(),
            &BitmapFace,
            &export,
        )
        .unwrap();

        assert!(summary.written.is_empty());
        assert_eq!(summary.skipped, vec![path]);
        assert!(export.output_folder.is_dir());
    }
}

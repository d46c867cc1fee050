use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder};
use serde::{Deserialize, Serialize};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::WatermarkError;
use crate::watermark::{GlyphFace, WatermarkKind, WatermarkSpec, composite_with_face};

/// Extensions accepted when importing images for watermarking
pub const IMPORT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Extensions accepted by the date stamp command, which also reads GIF
pub const DATESTAMP_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            _ => Err(WatermarkError::InvalidValue(format!("output format '{}'", s))),
        }
    }
}

/// Where and how watermarked copies are written
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportSettings {
    pub output_folder: PathBuf,
    pub format: OutputFormat,
    /// JPEG quality 1-100, ignored for PNG
    pub quality: u8,
    pub prefix: String,
    pub suffix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from("watermarked"),
            format: OutputFormat::Jpeg,
            quality: 90,
            prefix: "wm_".to_string(),
            suffix: String::new(),
        }
    }
}

impl ExportSettings {
    /// Output file for `input`: prefix + file stem + suffix + format extension
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        let name = format!(
            "{}{}{}.{}",
            self.prefix,
            stem,
            self.suffix,
            self.format.extension()
        );
        self.output_folder.join(name)
    }
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, IMPORT_EXTENSIONS)
}

/// Supported images directly inside `dir`, sorted by path
pub fn collect_images(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, WatermarkError> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .map(WatermarkError::IoError)
                .unwrap_or_else(|| WatermarkError::InvalidValue(dir.display().to_string()))
        })?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    debug!("Found {} images in {:?}", images.len(), dir);
    Ok(images)
}

/// Expand a mix of files and folders into the list of images to process.
///
/// Folders contribute their supported images; an explicitly named file with an
/// unsupported extension is rejected.
pub fn resolve_inputs(
    inputs: &[PathBuf],
    extensions: &[&str],
) -> Result<Vec<PathBuf>, WatermarkError> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            images.extend(collect_images(input, extensions)?);
        } else if has_extension(input, extensions) {
            images.push(input.clone());
        } else {
            return Err(WatermarkError::InvalidValue(format!(
                "unsupported image format: {}",
                input.display()
            )));
        }
    }

    if images.is_empty() {
        return Err(WatermarkError::NoInputs);
    }
    Ok(images)
}

/// Decode the watermark image named by `spec`, if any.
///
/// A missing or undecodable asset is not an error: the caller simply gets `None`
/// and the compositor leaves images untouched.
pub fn load_watermark_asset(spec: &WatermarkSpec) -> Option<DynamicImage> {
    if spec.kind != WatermarkKind::Image {
        return None;
    }

    let path = spec.image_path.as_ref()?;
    match image::open(path) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!("Failed to load watermark image {:?}: {}", path, e);
            None
        }
    }
}

/// Encode `image` to `path` in the given format
pub fn save_image(
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: u8,
) -> Result<(), WatermarkError> {
    let output = BufWriter::new(std::fs::File::create(path)?);

    match format {
        OutputFormat::Jpeg => {
            // JPEG doesn't support alpha channel, so convert to RGB
            let rgb_image = image.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(output, quality.clamp(1, 100));
            encoder.write_image(
                &rgb_image,
                rgb_image.width(),
                rgb_image.height(),
                image::ExtendedColorType::Rgb8,
            )?;
        }
        OutputFormat::Png => {
            let rgba_image = image.to_rgba8();
            let encoder = PngEncoder::new(output);
            encoder.write_image(
                &rgba_image,
                rgba_image.width(),
                rgba_image.height(),
                image::ExtendedColorType::Rgba8,
            )?;
        }
    }

    Ok(())
}

/// Watermark a single image and write it to the output folder
pub fn process_image(
    input: &Path,
    spec: &WatermarkSpec,
    asset: Option<&DynamicImage>,
    face: &dyn GlyphFace,
    settings: &ExportSettings,
) -> Result<PathBuf, WatermarkError> {
    let source = image::open(input)?;
    let watermarked = composite_with_face(&source, spec, asset, face);

    let output_path = settings.output_path(input);
    save_image(
        &watermarked,
        &output_path,
        settings.format,
        settings.quality,
    )?;

    debug!("Wrote {:?}", output_path);
    Ok(output_path)
}

/// Watermark every image in order, stopping at the first failure
pub fn export_batch(
    images: &[PathBuf],
    spec: &WatermarkSpec,
    face: &dyn GlyphFace,
    settings: &ExportSettings,
) -> Result<Vec<PathBuf>, WatermarkError> {
    std::fs::create_dir_all(&settings.output_folder)?;
    let asset = load_watermark_asset(spec);

    let mut written = Vec::with_capacity(images.len());
    for (index, input) in images.iter().enumerate() {
        info!("[{}/{}] {}", index + 1, images.len(), input.display());
        written.push(process_image(input, spec, asset.as_ref(), face, settings)?);
    }

    info!(
        "Exported {} images to {:?}",
        written.len(),
        settings.output_folder
    );
    Ok(written)
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod datestamp;
pub mod error;
pub mod export;
pub mod templates;
pub mod watermark;

pub use error::WatermarkError;

use datestamp::DateStampSettings;
use export::ExportSettings;
use watermark::{BitmapFace, GlyphFace, TrueTypeFace, WatermarkSpec};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub watermark: WatermarkSpec,
    pub export: ExportSettings,
    pub datestamp: DateStampSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// TrueType font used instead of the built-in bitmap face
    pub font_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when it is absent
    pub fn load(config_path: &Path) -> Result<Self, WatermarkError> {
        if config_path.exists() {
            let config_content = std::fs::read_to_string(config_path)?;
            let config = toml_edit::de::from_str::<Config>(&config_content)?;
            info!("Configuration loaded from: {:?}", config_path);
            Ok(config)
        } else {
            info!("Config file not found at {:?}, using defaults", config_path);
            Ok(Config::default())
        }
    }

    /// Glyph face for text watermarks
    pub fn glyph_face(&self) -> Result<Box<dyn GlyphFace>, WatermarkError> {
        match &self.app.font_path {
            Some(path) => Ok(Box::new(TrueTypeFace::from_file(path)?)),
            None => Ok(Box::new(BitmapFace)),
        }
    }
}

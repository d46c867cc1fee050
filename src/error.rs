use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml_edit::de::Error),

    #[error("Failed to parse font: {0}")]
    FontError(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("No input images")]
    NoInputs,
}

use serde::Serialize;
use strum::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Invalid pixel frame: {width}x{height} (both dimensions must be positive)")]
    InvalidFrame { width: f64, height: f64 },

    #[error("Malformed detection batch for prompt #{prompt_index}: {reason}")]
    MalformedBatch { prompt_index: usize, reason: String },

    #[error("Malformed mask: {reason}")]
    MalformedMask { reason: String },

    #[error("Geometric computation error: {0}")]
    Geometry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,

    #[error("Failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Geometry stage that degraded to a lower-fidelity result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeometryStage {
    ContourTracing,
    Simplification,
}

/// A non-fatal condition absorbed while converting one detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// The mask had no foreground pixels; the detection produced no features.
    DegenerateMask,
    /// A geometry step failed and a lower-fidelity result was substituted.
    GeometryFallback { stage: GeometryStage, reason: String },
}

impl Degradation {
    pub fn fallback(stage: GeometryStage, error: &ConversionError) -> Self {
        Self::GeometryFallback {
            stage,
            reason: error.to_string(),
        }
    }
}

/// A value together with the degradations recorded while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Degraded<T> {
    pub value: T,
    pub degradations: Vec<Degradation>,
}

impl<T> Degraded<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            degradations: Vec::new(),
        }
    }

    pub fn with(value: T, degradation: Degradation) -> Self {
        Self {
            value,
            degradations: vec![degradation],
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

use std::path::{Path, PathBuf};

use geomask::{
    Capabilities, ConversionError, ConversionReport, ConversionRequest, ConverterConfig, DetectionResult,
    GeoConverter, GeoFeatureCollection, Strategies,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Confidence threshold must be within [0, 1], got {0}")]
    InvalidConfidence(f64),
}

/// Inputs of one `convert` invocation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConvertJob {
    /// Model output as JSON (`prompts`, `masks`, `boxes`, `scores`)
    pub detections: PathBuf,
    /// Frame, bounds and colors as JSON or TOML
    pub request: PathBuf,
    /// Converter configuration as JSON or TOML
    pub config: Option<PathBuf>,
    /// Drop detections scoring below this threshold before conversion
    pub confidence: Option<f64>,
    /// Force parallel conversion regardless of the configuration
    pub parallel: bool,
}

/// Resolved converter setup, as printed by `capabilities`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CapabilitiesSummary {
    pub ready: bool,
    pub tolerance: f64,
    pub parallel: bool,
    pub capabilities: Capabilities,
    pub strategies: Strategies,
}

impl CapabilitiesSummary {
    pub fn from_converter(converter: &GeoConverter) -> Self {
        Self {
            ready: converter.is_ready(),
            tolerance: converter.config().tolerance,
            parallel: converter.config().parallel,
            capabilities: converter.capabilities(),
            strategies: converter.strategies(),
        }
    }

    /// Convert the summary to a TOML string
    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load the converter configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<ConverterConfig, CliError> {
    match path {
        Some(path) => Ok(ConverterConfig::from_file(path)?),
        None => Ok(ConverterConfig::default()),
    }
}

impl ConvertJob {
    pub fn converter(&self) -> Result<GeoConverter, CliError> {
        let mut config = load_config(self.config.as_deref())?;
        config.parallel |= self.parallel;
        Ok(GeoConverter::new(config)?)
    }

    pub fn run(&self) -> Result<(GeoFeatureCollection, ConversionReport), CliError> {
        if let Some(threshold) = self.confidence {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(CliError::InvalidConfidence(threshold));
            }
        }

        let converter = self.converter()?;
        let request = ConversionRequest::from_file(&self.request)?;
        let mut batches = DetectionResult::from_json_file(&self.detections)?.into_batches()?;

        if let Some(threshold) = self.confidence {
            for batch in &mut batches {
                let before = batch.len();
                batch.retain_confident(threshold);
                info!(
                    "Prompt '{}': kept {} of {} detections at confidence >= {}",
                    batch.prompt,
                    batch.len(),
                    before,
                    threshold
                );
            }
        }

        Ok(converter.convert_batches(&batches, &request)?)
    }
}

/// JSON schemas of the files the CLI reads.
pub fn schema_document() -> Result<serde_json::Value, CliError> {
    Ok(serde_json::json!({
        "config": serde_json::to_value(ConverterConfig::schema())?,
        "request": serde_json::to_value(schemars::schema_for!(ConversionRequest))?,
        "convert_job": serde_json::to_value(schemars::schema_for!(ConvertJob))?,
    }))
}

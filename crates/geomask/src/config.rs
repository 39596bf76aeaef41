//! Converter configuration.
//!
//! Configuration files are read as TOML or JSON depending on their extension.

use std::{fs, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    algorithms::{ContourStrategy, SimplifyStrategy, DEFAULT_TOLERANCE},
    error::{ConversionError, Result},
};

pub const DEFAULT_COLOR: &str = "#FF0000";

/// Load a TOML or JSON document, picking the parser from the file extension.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(toml::from_str(&fs::read_to_string(path)?)?),
        Some("json") => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        _ => Err(ConversionError::UnsupportedFileFormat),
    }
}

/// Settings for the detection-to-GeoJSON conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConverterConfig {
    #[schemars(description = "Contour strategy requested for every mask")]
    pub contour: ContourStrategy,
    #[schemars(description = "Simplification strategy requested for every ring")]
    pub simplify: SimplifyStrategy,
    #[schemars(description = "Simplification tolerance in coordinate units (degrees)")]
    pub tolerance: f64,
    #[schemars(description = "Color used for prompts without an explicit color")]
    pub default_color: String,
    #[schemars(description = "Contours with fewer points are discarded", range(min = 3))]
    pub min_contour_points: usize,
    #[schemars(description = "Convert detections on the rayon thread pool")]
    pub parallel: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            contour: ContourStrategy::default(),
            simplify: SimplifyStrategy::default(),
            tolerance: DEFAULT_TOLERANCE,
            default_color: DEFAULT_COLOR.to_string(),
            min_contour_points: 3,
            parallel: false,
        }
    }
}

impl ConverterConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConversionError::Config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.min_contour_points < 3 {
            return Err(ConversionError::Config(format!(
                "min_contour_points must be at least 3, got {}",
                self.min_contour_points
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ConverterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: ConverterConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: ConverterConfig = load_document(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Get the JSON schema for the configuration
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ConverterConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = ConverterConfig::from_toml("").unwrap();
        assert_eq!(config, ConverterConfig::default());
        assert_eq!(config.tolerance, 0.0001);
        assert_eq!(config.default_color, "#FF0000");
    }

    #[test]
    fn toml_selects_strategies() {
        let config = ConverterConfig::from_toml(
            r#"
            contour = "bounding_box"
            simplify = "identity"
            parallel = true
            "#,
        )
        .unwrap();
        assert_eq!(config.contour, ContourStrategy::BoundingBox);
        assert_eq!(config.simplify, SimplifyStrategy::Identity);
        assert!(config.parallel);
    }

    #[test]
    fn json_rejects_negative_tolerance() {
        let result = ConverterConfig::from_json(r#"{ "tolerance": -1.0 }"#);
        assert!(matches!(result, Err(ConversionError::Config(_))));
    }

    #[test]
    fn rejects_tiny_contours() {
        let result = ConverterConfig::from_json(r#"{ "min_contour_points": 2 }"#);
        assert!(matches!(result, Err(ConversionError::Config(_))));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let result = ConverterConfig::from_file("converter.yaml");
        assert!(matches!(result, Err(ConversionError::UnsupportedFileFormat)));
    }

    #[test]
    fn schema_lists_strategy_names() {
        let schema = serde_json::to_string(&ConverterConfig::schema()).unwrap();
        assert!(schema.contains("marching_squares"));
        assert!(schema.contains("topology_preserving"));
    }
}

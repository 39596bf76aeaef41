use geojson::{Feature, FeatureCollection, Geometry, Value};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    error::{ConversionError, Result},
    types::GeoPolygon,
};

/// Properties attached to every detection feature
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS, JsonSchema)]
#[ts(export)]
#[schemars(description = "Properties attached to every detection feature")]
pub struct DetectionProperties {
    #[schemars(description = "Prompt text that produced the detection")]
    pub prompt: String,
    #[schemars(description = "Model confidence score in [0, 1]")]
    pub confidence: f64,
    #[schemars(description = "Display color as #RRGGBB")]
    pub color: String,
}

/// One detection outline with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    pub geometry: GeoPolygon,
    pub properties: DetectionProperties,
}

impl GeoFeature {
    pub fn new(geometry: GeoPolygon, properties: DetectionProperties) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    pub fn to_geojson(&self) -> Feature {
        let geometry = Geometry::new(Value::Polygon(vec![self.geometry.to_positions()]));
        Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: serde_json::to_value(&self.properties)
                .ok()
                .and_then(|v| v.as_object().cloned()),
            foreign_members: None,
        }
    }

    pub fn from_geojson(feature: &Feature) -> Result<Self> {
        let geometry = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Polygon(rings)) => match rings.as_slice() {
                [exterior] => GeoPolygon::from_positions(exterior)?,
                _ => {
                    return Err(ConversionError::Geometry(format!(
                        "expected a single-ring polygon, got {} rings",
                        rings.len()
                    )));
                }
            },
            _ => {
                return Err(ConversionError::Geometry(
                    "feature geometry is not a polygon".to_string(),
                ));
            }
        };

        let properties = feature
            .properties
            .clone()
            .ok_or_else(|| ConversionError::Geometry("feature has no properties".to_string()))?;
        let properties = serde_json::from_value(serde_json::Value::Object(properties))?;

        Ok(Self::new(geometry, properties))
    }
}

/// Ordered detection features: prompt order, then mask order within a prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoFeatureCollection {
    pub features: Vec<GeoFeature>,
}

impl GeoFeatureCollection {
    pub fn new(features: Vec<GeoFeature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[GeoFeature] {
        &self.features
    }

    /// Features produced for one prompt, in order.
    pub fn features_for_prompt<'a>(&'a self, prompt: &'a str) -> impl Iterator<Item = &'a GeoFeature> + 'a {
        self.features
            .iter()
            .filter(move |feature| feature.properties.prompt == prompt)
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.iter().map(GeoFeature::to_geojson).collect(),
            foreign_members: None,
        }
    }

    pub fn from_geojson(collection: &FeatureCollection) -> Result<Self> {
        let features = collection
            .features
            .iter()
            .map(GeoFeature::from_geojson)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(features))
    }
}

impl From<&GeoFeatureCollection> for FeatureCollection {
    fn from(collection: &GeoFeatureCollection) -> Self {
        collection.to_geojson()
    }
}

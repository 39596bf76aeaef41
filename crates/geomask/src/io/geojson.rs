use std::path::Path;

use geojson::FeatureCollection;

use crate::{error::Result, typed_geojson::GeoFeatureCollection};

impl GeoFeatureCollection {
    /// Export to GeoJSON and serialize to a compact JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_geojson())?)
    }

    /// Export to GeoJSON and serialize to an indented JSON string
    pub fn to_geojson_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    /// Save GeoJSON to file
    pub fn save_geojson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let geojson_string = self.to_geojson_string_pretty()?;
        std::fs::write(path, geojson_string)?;
        Ok(())
    }

    /// Load a collection from a GeoJSON string
    pub fn from_geojson_str(geojson_str: &str) -> Result<Self> {
        let collection: FeatureCollection = geojson_str.parse()?;
        Self::from_geojson(&collection)
    }

    /// Load a collection from a GeoJSON file
    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let geojson_str = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&geojson_str)
    }
}

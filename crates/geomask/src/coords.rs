//! Pixel to geographic coordinate mapping.
//!
//! The mapping is a plain equirectangular interpolation across the map
//! bounds: no projection correction and no clamping, so pixels outside the
//! frame map to coordinates outside the bounds.

use geo_types::Coord;

use crate::{
    error::{ConversionError, Result},
    types::{MapBounds, PixelFrame},
};

/// Map a pixel position to `(longitude, latitude)`.
pub fn pixel_to_geo(x: f64, y: f64, width: f64, height: f64, bounds: &MapBounds) -> Result<(f64, f64)> {
    let mapper = CoordinateMapper::from_dimensions(width, height, *bounds)?;
    let coord = mapper.map(x, y);
    Ok((coord.x, coord.y))
}

/// Validated pixel to geographic mapping for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    width: f64,
    height: f64,
    bounds: MapBounds,
}

impl CoordinateMapper {
    pub fn new(frame: PixelFrame, bounds: MapBounds) -> Result<Self> {
        Self::from_dimensions(frame.width as f64, frame.height as f64, bounds)
    }

    pub fn from_dimensions(width: f64, height: f64, bounds: MapBounds) -> Result<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(ConversionError::InvalidFrame { width, height });
        }
        Ok(Self {
            width,
            height,
            bounds,
        })
    }

    pub fn bounds(&self) -> &MapBounds {
        &self.bounds
    }

    /// `x` is longitude, `y` is latitude in the returned coordinate.
    pub fn map(&self, x: f64, y: f64) -> Coord<f64> {
        let b = &self.bounds;
        Coord {
            x: b.west + (b.east - b.west) * (x / self.width),
            y: b.north - (b.north - b.south) * (y / self.height),
        }
    }

    pub fn map_point(&self, [x, y]: [f64; 2]) -> Coord<f64> {
        self.map(x, y)
    }
}

use geo_types::{Coord, LineString, Polygon};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, Result};

/// Geographic rectangle covered by the source image, in degrees.
///
/// The mapping is linear between the edges; `north > south` is assumed and
/// antimeridian wraparound is not handled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MapBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl MapBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }
}

/// Pixel dimensions of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PixelFrame {
    pub width: u32,
    pub height: u32,
}

impl PixelFrame {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let frame = Self { width, height };
        frame.validate()?;
        Ok(frame)
    }

    /// Build a frame from signed dimensions as they arrive from a request.
    pub fn from_signed(width: i64, height: i64) -> Result<Self> {
        let invalid = || ConversionError::InvalidFrame {
            width: width as f64,
            height: height as f64,
        };
        let width = u32::try_from(width).map_err(|_| invalid())?;
        let height = u32::try_from(height).map_err(|_| invalid())?;
        Self::new(width, height)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConversionError::InvalidFrame {
                width: self.width as f64,
                height: self.height as f64,
            });
        }
        Ok(())
    }
}

/// A closed ring of `(longitude, latitude)` coordinates.
///
/// The first coordinate always equals the last and the ring holds at least
/// four coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPolygon(LineString<f64>);

impl GeoPolygon {
    pub const MIN_RING_LEN: usize = 4;

    /// Build a ring from coordinates, closing it if the ends differ.
    pub fn from_coords(mut coords: Vec<Coord<f64>>) -> Result<Self> {
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last {
                coords.push(first);
            }
        }
        if coords.len() < Self::MIN_RING_LEN {
            return Err(ConversionError::Geometry(format!(
                "ring needs at least {} coordinates, got {}",
                Self::MIN_RING_LEN,
                coords.len()
            )));
        }
        Ok(Self(LineString::new(coords)))
    }

    pub fn from_line_string(line: LineString<f64>) -> Result<Self> {
        Self::from_coords(line.0)
    }

    /// Build a ring from GeoJSON positions (`[lon, lat, ..]`).
    pub fn from_positions(positions: &[Vec<f64>]) -> Result<Self> {
        let coords = positions
            .iter()
            .map(|position| match position.as_slice() {
                [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                _ => Err(ConversionError::Geometry(format!(
                    "position needs two ordinates, got {}",
                    position.len()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_coords(coords)
    }

    pub fn exterior(&self) -> &LineString<f64> {
        &self.0
    }

    pub fn coords(&self) -> impl Iterator<Item = &Coord<f64>> {
        self.0.coords()
    }

    pub fn len(&self) -> usize {
        self.0.0.len()
    }

    /// Rings are never empty; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.0.is_empty()
    }

    pub fn first(&self) -> Coord<f64> {
        self.0.0[0]
    }

    pub fn last(&self) -> Coord<f64> {
        self.0.0[self.0.0.len() - 1]
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(self.0.clone(), Vec::new())
    }

    /// Shoelace area; positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        use geo::Area;
        self.to_polygon().signed_area()
    }

    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn to_positions(&self) -> Vec<Vec<f64>> {
        self.0.coords().map(|c| vec![c.x, c.y]).collect()
    }

    pub fn into_line_string(self) -> LineString<f64> {
        self.0
    }
}

use geo_types::Coord;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, warn};

use crate::{
    algorithms::marching_squares::MarchingSquares,
    coords::CoordinateMapper,
    detection::BinaryMask,
    error::{Degradation, Degraded, GeometryStage, Result},
    traits::{ContourTracer, PixelPoint},
    types::{GeoPolygon, MapBounds, PixelFrame},
};

/// How mask boundaries are turned into rings.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContourStrategy {
    /// Sub-pixel marching squares at the 0.5 iso-level
    #[default]
    MarchingSquares,
    /// Suzuki-Abe border following on pixel centers (imageproc)
    BorderFollowing,
    /// One axis-aligned rectangle around the foreground
    BoundingBox,
}

impl ContourStrategy {
    /// The precise tracer behind this strategy, `None` for the rectangle fallback.
    pub fn tracer(&self) -> Option<&'static dyn ContourTracer> {
        match self {
            Self::MarchingSquares => Some(&MarchingSquares),
            Self::BorderFollowing => Some(&ImageprocContourTracer),
            Self::BoundingBox => None,
        }
    }

    pub fn is_precise(&self) -> bool {
        self.tracer().is_some()
    }
}

/// Imageproc-based border following tracer
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocContourTracer;

impl ContourTracer for ImageprocContourTracer {
    fn trace(&self, mask: &BinaryMask) -> Result<Vec<Vec<PixelPoint>>> {
        let contours = imageproc::contours::find_contours::<i32>(mask.image());

        let result = contours
            .into_iter()
            .map(|contour| {
                contour
                    .points
                    .iter()
                    .map(|p| [p.x as f64, p.y as f64])
                    .collect()
            })
            .collect();

        Ok(result)
    }
}

/// Closed 5-point rectangle around the foreground, in geographic coordinates.
///
/// Corners sit on pixel edges (`max + 1`), so a single pixel still yields a
/// rectangle with non-zero area.
pub fn bounding_box_ring(mask: &BinaryMask, mapper: &CoordinateMapper) -> Option<GeoPolygon> {
    let (min_x, min_y, max_x, max_y) = mask.foreground_extent()?;
    let (x0, y0) = (min_x as f64, min_y as f64);
    let (x1, y1) = (max_x as f64 + 1.0, max_y as f64 + 1.0);

    let corners: Vec<Coord<f64>> = [[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]
        .into_iter()
        .map(|p| mapper.map_point(p))
        .collect();

    GeoPolygon::from_coords(corners).ok()
}

/// Turns one mask into geographic rings, falling back to the bounding
/// rectangle when precise tracing fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourExtractor {
    pub strategy: ContourStrategy,
    pub min_points: usize,
}

impl Default for ContourExtractor {
    fn default() -> Self {
        Self {
            strategy: ContourStrategy::default(),
            min_points: 3,
        }
    }
}

impl ContourExtractor {
    pub fn new(strategy: ContourStrategy, min_points: usize) -> Self {
        Self {
            strategy,
            min_points,
        }
    }

    pub fn extract(&self, mask: &BinaryMask, mapper: &CoordinateMapper) -> Degraded<Vec<GeoPolygon>> {
        match self.strategy.tracer() {
            Some(tracer) => self.extract_with(tracer, mask, mapper),
            None => match bounding_box_ring(mask, mapper) {
                Some(ring) => Degraded::clean(vec![ring]),
                None => Self::degenerate(),
            },
        }
    }

    /// Trace with an explicit tracer, falling back to the bounding rectangle
    /// when it fails.
    pub fn extract_with(
        &self,
        tracer: &dyn ContourTracer,
        mask: &BinaryMask,
        mapper: &CoordinateMapper,
    ) -> Degraded<Vec<GeoPolygon>> {
        if mask.foreground_extent().is_none() {
            return Self::degenerate();
        }

        match tracer
            .trace(mask)
            .and_then(|contours| self.to_rings(contours, mapper))
        {
            Ok(rings) => Degraded::clean(rings),
            Err(err) => {
                warn!("Contour tracing failed, using bounding box: {}", err);
                Degraded::with(
                    bounding_box_ring(mask, mapper).into_iter().collect(),
                    Degradation::fallback(GeometryStage::ContourTracing, &err),
                )
            }
        }
    }

    fn degenerate() -> Degraded<Vec<GeoPolygon>> {
        debug!("mask has no foreground pixels");
        Degraded::with(Vec::new(), Degradation::DegenerateMask)
    }

    fn to_rings(&self, contours: Vec<Vec<PixelPoint>>, mapper: &CoordinateMapper) -> Result<Vec<GeoPolygon>> {
        contours
            .into_iter()
            .filter(|contour| contour.len() >= self.min_points)
            .map(|contour| {
                let coords = contour.into_iter().map(|p| mapper.map_point(p)).collect();
                GeoPolygon::from_coords(coords)
            })
            .collect()
    }
}

/// Extract the rings of one mask with the given strategy.
pub fn extract_polygons(
    mask: &BinaryMask,
    frame: PixelFrame,
    bounds: &MapBounds,
    strategy: ContourStrategy,
) -> Result<Vec<GeoPolygon>> {
    let mapper = CoordinateMapper::new(frame, *bounds)?;
    Ok(ContourExtractor::new(strategy, 3).extract(mask, &mapper).value)
}

impl From<ContourStrategy> for ContourExtractor {
    fn from(strategy: ContourStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }
}

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::BoundingRect;
use geo_types::{Line, LineString, Rect};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::debug;

use crate::{
    capabilities::Capabilities,
    error::{ConversionError, Degradation, Degraded, GeometryStage, Result},
    traits::RingSimplifier,
    types::GeoPolygon,
};

/// Default tolerance in coordinate units, sized for degree-scale data.
pub const DEFAULT_TOLERANCE: f64 = 0.0001;

/// How rings are simplified after extraction.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SimplifyStrategy {
    /// Douglas-Peucker, rejected whenever it breaks ring validity
    #[default]
    TopologyPreserving,
    /// Visvalingam-Whyatt with geo's topology-preserving variant
    VisvalingamPreserve,
    /// Rings pass through unchanged
    Identity,
}

impl SimplifyStrategy {
    pub fn simplifier(&self) -> &'static dyn RingSimplifier {
        match self {
            Self::TopologyPreserving => &DouglasPeuckerSimplifier,
            Self::VisvalingamPreserve => &VisvalingamPreserveSimplifier,
            Self::Identity => &IdentitySimplifier,
        }
    }

    pub fn simplify(&self, ring: &GeoPolygon, tolerance: f64) -> Result<GeoPolygon> {
        self.simplifier().simplify(ring, tolerance)
    }
}

fn invalid(reason: impl Into<String>) -> ConversionError {
    ConversionError::Geometry(reason.into())
}

/// Check that a ring is closed, finite, has area and does not cross itself.
pub fn validate_ring(ring: &LineString<f64>) -> Result<()> {
    use geo::Area;

    if ring.0.len() < GeoPolygon::MIN_RING_LEN {
        return Err(invalid(format!("ring has only {} coordinates", ring.0.len())));
    }
    if !ring.is_closed() {
        return Err(invalid("ring is not closed"));
    }
    if ring.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(invalid("ring has non-finite coordinates"));
    }
    if geo_types::Polygon::new(ring.clone(), Vec::new()).unsigned_area() <= 0.0 {
        return Err(invalid("ring has zero area"));
    }

    let segments: Vec<Line<f64>> = ring.lines().filter(|l| l.start != l.end).collect();
    let n = segments.len();
    let adjacent = |i: usize, j: usize| {
        let (a, b) = (i.min(j), i.max(j));
        b == a + 1 || (a == 0 && b == n - 1)
    };

    // Sweep along x: only segments with overlapping envelopes are intersected.
    let envelopes: Vec<Rect<f64>> = segments.iter().map(|l| l.bounding_rect()).collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| envelopes[a].min().x.total_cmp(&envelopes[b].min().x));

    for (k, &i) in order.iter().enumerate() {
        let current = envelopes[i];
        for &j in &order[k + 1..] {
            let other = envelopes[j];
            if other.min().x > current.max().x {
                break;
            }
            if other.min().y > current.max().y || other.max().y < current.min().y {
                continue;
            }
            match line_intersection(segments[i], segments[j]) {
                None => {}
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    if !adjacent(i, j) {
                        return Err(invalid(format!(
                            "ring crosses itself at ({}, {})",
                            intersection.x, intersection.y
                        )));
                    }
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    if !adjacent(i, j) || intersection.start != intersection.end {
                        return Err(invalid("ring folds back over itself"));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Validate the input, simplify, then validate the output and its winding.
fn guarded(ring: &GeoPolygon, simplify: impl FnOnce(&geo_types::Polygon<f64>) -> geo_types::Polygon<f64>) -> Result<GeoPolygon> {
    validate_ring(ring.exterior())?;

    let simplified = simplify(&ring.to_polygon());
    let candidate = GeoPolygon::from_line_string(simplified.exterior().clone())?;
    validate_ring(candidate.exterior())?;

    if candidate.is_counter_clockwise() != ring.is_counter_clockwise() {
        return Err(invalid("simplification reversed the ring"));
    }
    Ok(candidate)
}

/// Douglas-Peucker simplifier using geo crate's implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct DouglasPeuckerSimplifier;

impl RingSimplifier for DouglasPeuckerSimplifier {
    fn simplify(&self, ring: &GeoPolygon, tolerance: f64) -> Result<GeoPolygon> {
        use geo::Simplify;
        guarded(ring, |polygon| polygon.simplify(&tolerance))
    }
}

/// Visvalingam-Whyatt simplifier using geo crate's topology-preserving variant.
///
/// The tolerance is a distance; the triangle-area threshold is its square.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisvalingamPreserveSimplifier;

impl RingSimplifier for VisvalingamPreserveSimplifier {
    fn simplify(&self, ring: &GeoPolygon, tolerance: f64) -> Result<GeoPolygon> {
        use geo::SimplifyVwPreserve;
        let epsilon = tolerance * tolerance;
        guarded(ring, |polygon| polygon.simplify_vw_preserve(&epsilon))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySimplifier;

impl RingSimplifier for IdentitySimplifier {
    fn simplify(&self, ring: &GeoPolygon, _tolerance: f64) -> Result<GeoPolygon> {
        Ok(ring.clone())
    }
}

/// Applies a simplification strategy, keeping the original ring whenever
/// simplification is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonSimplifier {
    pub strategy: SimplifyStrategy,
    pub tolerance: f64,
}

impl Default for PolygonSimplifier {
    fn default() -> Self {
        Self {
            strategy: SimplifyStrategy::default(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl PolygonSimplifier {
    pub fn new(strategy: SimplifyStrategy, tolerance: f64) -> Self {
        Self {
            strategy,
            tolerance,
        }
    }

    pub fn simplify(&self, ring: GeoPolygon) -> Degraded<GeoPolygon> {
        match self.strategy.simplify(&ring, self.tolerance) {
            Ok(simplified) => Degraded::clean(simplified),
            Err(err) => {
                debug!("Keeping unsimplified ring of {} points: {}", ring.len(), err);
                Degraded::with(ring, Degradation::fallback(GeometryStage::Simplification, &err))
            }
        }
    }
}

/// Simplify one ring with the default strategy available in this build.
///
/// Returns `ring` unchanged when simplification is rejected or compiled out.
pub fn simplify(ring: GeoPolygon, tolerance: f64) -> GeoPolygon {
    let strategy = Capabilities::detect().resolve_simplify(SimplifyStrategy::default());
    PolygonSimplifier::new(strategy, tolerance).simplify(ring).value
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Coord;

    fn ring(points: &[(f64, f64)]) -> GeoPolygon {
        GeoPolygon::from_coords(points.iter().map(|&(x, y)| Coord { x, y }).collect()).unwrap()
    }

    /// Counter-clockwise square with extra points along every edge.
    fn dense_square() -> GeoPolygon {
        let mut points = Vec::new();
        for i in 0..10 {
            points.push((i as f64 * 0.001, 0.0));
        }
        for i in 0..10 {
            points.push((0.01, i as f64 * 0.001));
        }
        for i in 0..10 {
            points.push((0.01 - i as f64 * 0.001, 0.01));
        }
        for i in 0..10 {
            points.push((0.0, 0.01 - i as f64 * 0.001));
        }
        ring(&points)
    }

    fn bow_tie() -> GeoPolygon {
        ring(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)])
    }

    #[test]
    fn douglas_peucker_drops_collinear_points() {
        let square = dense_square();
        let simplified = PolygonSimplifier::default().simplify(square.clone());

        assert!(!simplified.is_degraded());
        assert!(simplified.value.len() < square.len());
        assert!(simplified.value.len() >= GeoPolygon::MIN_RING_LEN);
        assert_eq!(simplified.value.first(), simplified.value.last());
        assert!(simplified.value.is_counter_clockwise());
    }

    #[test]
    fn visvalingam_keeps_closure_and_winding() {
        let square = dense_square();
        let simplifier = PolygonSimplifier::new(SimplifyStrategy::VisvalingamPreserve, 0.0005);
        let simplified = simplifier.simplify(square.clone()).value;

        assert_eq!(simplified.first(), simplified.last());
        assert_eq!(simplified.is_counter_clockwise(), square.is_counter_clockwise());
    }

    #[test]
    fn identity_returns_input() {
        for input in [dense_square(), bow_tie()] {
            let simplified = PolygonSimplifier::new(SimplifyStrategy::Identity, 10.0).simplify(input.clone());
            assert_eq!(simplified.value, input);
            assert!(!simplified.is_degraded());
        }
    }

    #[test]
    fn self_intersecting_ring_is_returned_unchanged() {
        let input = bow_tie();
        let simplified = PolygonSimplifier::default().simplify(input.clone());

        assert_eq!(simplified.value, input);
        assert!(matches!(
            simplified.degradations.as_slice(),
            [Degradation::GeometryFallback { stage: GeometryStage::Simplification, .. }]
        ));
    }

    #[test]
    fn collapsing_tolerance_keeps_original() {
        let input = dense_square();
        let simplified = PolygonSimplifier::new(SimplifyStrategy::TopologyPreserving, 1.0).simplify(input.clone());

        assert_eq!(simplified.value, input);
        assert!(simplified.is_degraded());
    }

    #[test]
    fn validation_accepts_simple_ring() {
        assert!(validate_ring(dense_square().exterior()).is_ok());
    }

    #[test]
    fn validation_rejects_zero_area() {
        let flat = ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)]);
        assert!(validate_ring(flat.exterior()).is_err());
    }

    #[test]
    fn free_function_never_fails() {
        assert_eq!(simplify(bow_tie(), DEFAULT_TOLERANCE), bow_tie());
        let simplified = simplify(dense_square(), DEFAULT_TOLERANCE);
        assert_eq!(simplified.first(), simplified.last());
        assert!(simplified.len() <= dense_square().len());
    }

    fn circle(points: usize) -> Vec<Coord<f64>> {
        (0..points)
            .map(|k| {
                let angle = k as f64 * std::f64::consts::TAU / points as f64;
                Coord { x: angle.cos(), y: angle.sin() }
            })
            .collect()
    }

    #[test]
    fn validation_handles_dense_rings() {
        let ring = GeoPolygon::from_coords(circle(20_000)).unwrap();
        assert!(validate_ring(ring.exterior()).is_ok());
    }

    #[test]
    fn validation_finds_crossings_between_distant_segments() {
        let mut coords = circle(20_000);
        coords.swap(100, 10_100);
        let ring = GeoPolygon::from_coords(coords).unwrap();
        assert!(validate_ring(ring.exterior()).is_err());
    }
}

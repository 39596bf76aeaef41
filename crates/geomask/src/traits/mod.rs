use crate::{detection::BinaryMask, error::Result, types::GeoPolygon};

/// Contour point in pixel space, `[x, y]`.
pub type PixelPoint = [f64; 2];

/// Trait for contour tracing algorithms
pub trait ContourTracer: Send + Sync {
    /// Trace the boundaries of the mask foreground in pixel space.
    ///
    /// Each contour is an ordered point sequence; the closing point may be omitted.
    fn trace(&self, mask: &BinaryMask) -> Result<Vec<Vec<PixelPoint>>>;
}

/// Trait for ring simplification algorithms
pub trait RingSimplifier: Send + Sync {
    /// Reduce the point count of a ring within `tolerance` coordinate units.
    fn simplify(&self, ring: &GeoPolygon, tolerance: f64) -> Result<GeoPolygon>;
}

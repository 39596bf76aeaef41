use serde::Serialize;
use tracing::warn;

use crate::algorithms::{ContourStrategy, SimplifyStrategy};

/// Geometry capabilities compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub contour_tracing: bool,
    pub simplification: bool,
}

impl Capabilities {
    /// Capabilities enabled through cargo features.
    pub fn detect() -> Self {
        Self {
            contour_tracing: cfg!(feature = "contour-tracing"),
            simplification: cfg!(feature = "simplification"),
        }
    }

    pub fn full() -> Self {
        Self {
            contour_tracing: true,
            simplification: true,
        }
    }

    pub fn none() -> Self {
        Self {
            contour_tracing: false,
            simplification: false,
        }
    }

    pub fn resolve_contour(&self, requested: ContourStrategy) -> ContourStrategy {
        if requested.is_precise() && !self.contour_tracing {
            warn!("Contour tracing unavailable, {} falls back to bounding boxes", requested);
            return ContourStrategy::BoundingBox;
        }
        requested
    }

    pub fn resolve_simplify(&self, requested: SimplifyStrategy) -> SimplifyStrategy {
        if requested != SimplifyStrategy::Identity && !self.simplification {
            warn!("Simplification unavailable, {} is skipped", requested);
            return SimplifyStrategy::Identity;
        }
        requested
    }
}

/// Strategies chosen once when a converter is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Strategies {
    pub contour: ContourStrategy,
    pub simplify: SimplifyStrategy,
}

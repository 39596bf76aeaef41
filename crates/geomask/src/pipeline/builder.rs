use crate::{
    algorithms::{ContourExtractor, ContourStrategy, PolygonSimplifier, SimplifyStrategy},
    config::{ConverterConfig, DEFAULT_COLOR},
    pipeline::FeatureAssembler,
};

/// Builder for feature assemblers with a fluent API
#[derive(Debug, Clone)]
pub struct FeatureAssemblerBuilder {
    extractor: ContourExtractor,
    simplifier: PolygonSimplifier,
    default_color: String,
    parallel: bool,
}

impl FeatureAssemblerBuilder {
    /// Create a new builder with default strategies
    pub fn new() -> Self {
        Self {
            extractor: ContourExtractor::default(),
            simplifier: PolygonSimplifier::default(),
            default_color: DEFAULT_COLOR.to_string(),
            parallel: false,
        }
    }

    /// Start from a loaded configuration
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            extractor: ContourExtractor::new(config.contour, config.min_contour_points),
            simplifier: PolygonSimplifier::new(config.simplify, config.tolerance),
            default_color: config.default_color.clone(),
            parallel: config.parallel,
        }
    }

    pub fn with_contour_strategy(mut self, strategy: ContourStrategy) -> Self {
        self.extractor.strategy = strategy;
        self
    }

    /// Discard traced contours with fewer points
    pub fn with_min_contour_points(mut self, min_points: usize) -> Self {
        self.extractor.min_points = min_points;
        self
    }

    pub fn with_simplify_strategy(mut self, strategy: SimplifyStrategy) -> Self {
        self.simplifier.strategy = strategy;
        self
    }

    /// Topology-preserving simplification at the given tolerance
    pub fn with_simplification(mut self, tolerance: f64) -> Self {
        self.simplifier = PolygonSimplifier::new(SimplifyStrategy::TopologyPreserving, tolerance);
        self
    }

    /// Visvalingam-Whyatt simplification at the given tolerance
    pub fn with_vw_simplification(mut self, tolerance: f64) -> Self {
        self.simplifier = PolygonSimplifier::new(SimplifyStrategy::VisvalingamPreserve, tolerance);
        self
    }

    pub fn without_simplification(mut self) -> Self {
        self.simplifier.strategy = SimplifyStrategy::Identity;
        self
    }

    pub fn with_default_color(mut self, color: impl Into<String>) -> Self {
        self.default_color = color.into();
        self
    }

    /// Convert detections on the rayon thread pool
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn build(self) -> FeatureAssembler {
        FeatureAssembler::new(
            self.extractor,
            self.simplifier,
            self.default_color,
            self.parallel,
        )
    }
}

impl Default for FeatureAssemblerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

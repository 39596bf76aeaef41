use tracing::{debug, info};

use crate::{
    capabilities::{Capabilities, Strategies},
    config::ConverterConfig,
    detection::{ConversionRequest, DetectionBatch, DetectionResult},
    error::Result,
    pipeline::{ConversionReport, FeatureAssembler, builder::FeatureAssemblerBuilder},
    typed_geojson::GeoFeatureCollection,
};

/// Detection-to-GeoJSON conversion service.
///
/// Strategies are resolved once against the build's capabilities when the
/// converter is constructed; conversions themselves are stateless, so one
/// converter can be shared across threads.
#[derive(Debug, Clone)]
pub struct GeoConverter {
    config: ConverterConfig,
    capabilities: Capabilities,
    strategies: Strategies,
    assembler: FeatureAssembler,
}

impl GeoConverter {
    pub fn new(config: ConverterConfig) -> Result<Self> {
        Self::with_capabilities(config, Capabilities::detect())
    }

    /// Build against explicit capabilities instead of the compiled-in ones.
    pub fn with_capabilities(config: ConverterConfig, capabilities: Capabilities) -> Result<Self> {
        config.validate()?;

        let strategies = Strategies {
            contour: capabilities.resolve_contour(config.contour),
            simplify: capabilities.resolve_simplify(config.simplify),
        };
        let assembler = FeatureAssemblerBuilder::from_config(&config)
            .with_contour_strategy(strategies.contour)
            .with_simplify_strategy(strategies.simplify)
            .build();

        debug!(
            "Converter ready: contour={}, simplify={}, tolerance={}",
            strategies.contour, strategies.simplify, config.tolerance
        );

        Ok(Self {
            config,
            capabilities,
            strategies,
            assembler,
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn strategies(&self) -> Strategies {
        self.strategies
    }

    /// True when every configured strategy is available without downgrade.
    pub fn is_ready(&self) -> bool {
        self.strategies.contour == self.config.contour && self.strategies.simplify == self.config.simplify
    }

    pub fn convert(&self, result: DetectionResult, request: &ConversionRequest) -> Result<GeoFeatureCollection> {
        self.convert_with_report(result, request)
            .map(|(collection, _)| collection)
    }

    pub fn convert_with_report(
        &self,
        result: DetectionResult,
        request: &ConversionRequest,
    ) -> Result<(GeoFeatureCollection, ConversionReport)> {
        let batches = result.into_batches()?;
        self.convert_batches(&batches, request)
    }

    /// Convert already-typed (and already-filtered) batches.
    pub fn convert_batches(
        &self,
        batches: &[DetectionBatch],
        request: &ConversionRequest,
    ) -> Result<(GeoFeatureCollection, ConversionReport)> {
        let frame = request.frame()?;
        let (collection, report) = self
            .assembler
            .assemble_with_report(batches, frame, &request.bounds, &request.colors)?;

        for batch in batches {
            debug!(
                "Prompt '{}': {} detections, {} features",
                batch.prompt,
                batch.len(),
                collection.features_for_prompt(&batch.prompt).count()
            );
        }
        info!(
            "Converted {} detections across {} prompts into {} features ({} degraded)",
            report.detection_count,
            batches.len(),
            report.feature_count,
            report.events.len()
        );

        Ok((collection, report))
    }
}

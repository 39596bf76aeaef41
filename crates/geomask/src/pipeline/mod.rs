pub mod builder;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    algorithms::{ContourExtractor, PolygonSimplifier},
    coords::CoordinateMapper,
    detection::{BinaryMask, Detection, DetectionBatch},
    error::{Degradation, Degraded, GeometryStage, Result},
    typed_geojson::{DetectionProperties, GeoFeature, GeoFeatureCollection},
    types::{GeoPolygon, MapBounds, PixelFrame},
};

/// A degradation tied to the detection it happened on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradationEvent {
    pub prompt_index: usize,
    pub detection_index: usize,
    #[serde(flatten)]
    pub degradation: Degradation,
}

/// What happened during one assembly, beyond the features themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionReport {
    pub detection_count: usize,
    pub feature_count: usize,
    pub events: Vec<DegradationEvent>,
}

impl ConversionReport {
    pub fn is_degraded(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn degenerate_masks(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.degradation == Degradation::DegenerateMask)
            .count()
    }

    pub fn fallbacks(&self, stage: GeometryStage) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(&e.degradation, Degradation::GeometryFallback { stage: s, .. } if *s == stage))
            .count()
    }
}

/// Turns per-prompt detections into an ordered feature collection.
///
/// Each mask goes through contour extraction and then simplification of
/// every ring; each surviving ring becomes one feature. Detections are
/// assumed to be already filtered by confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureAssembler {
    extractor: ContourExtractor,
    simplifier: PolygonSimplifier,
    default_color: String,
    parallel: bool,
}

impl FeatureAssembler {
    /// Create a new assembler builder
    pub fn builder() -> builder::FeatureAssemblerBuilder {
        builder::FeatureAssemblerBuilder::new()
    }

    pub fn new(
        extractor: ContourExtractor,
        simplifier: PolygonSimplifier,
        default_color: String,
        parallel: bool,
    ) -> Self {
        Self {
            extractor,
            simplifier,
            default_color,
            parallel,
        }
    }

    pub fn extractor(&self) -> &ContourExtractor {
        &self.extractor
    }

    pub fn simplifier(&self) -> &PolygonSimplifier {
        &self.simplifier
    }

    /// Color for prompt `index`, falling back to the default color.
    pub fn color_for<'a>(&'a self, colors: &'a [String], index: usize) -> &'a str {
        colors.get(index).map_or(self.default_color.as_str(), String::as_str)
    }

    pub fn assemble(
        &self,
        batches: &[DetectionBatch],
        frame: PixelFrame,
        bounds: &MapBounds,
        colors: &[String],
    ) -> Result<GeoFeatureCollection> {
        self.assemble_with_report(batches, frame, bounds, colors)
            .map(|(collection, _)| collection)
    }

    pub fn assemble_with_report(
        &self,
        batches: &[DetectionBatch],
        frame: PixelFrame,
        bounds: &MapBounds,
        colors: &[String],
    ) -> Result<(GeoFeatureCollection, ConversionReport)> {
        let mapper = CoordinateMapper::new(frame, *bounds)?;

        let jobs: Vec<(usize, usize, &Detection)> = batches
            .iter()
            .enumerate()
            .flat_map(|(i, batch)| {
                batch
                    .detections
                    .iter()
                    .enumerate()
                    .map(move |(j, detection)| (i, j, detection))
            })
            .collect();

        let convert = |&(_, _, detection): &(usize, usize, &Detection)| {
            self.convert_mask(&detection.mask, &mapper)
        };
        // Indexed collect keeps job order in both modes.
        let converted: Vec<Degraded<Vec<GeoPolygon>>> = if self.parallel {
            jobs.par_iter().map(convert).collect()
        } else {
            jobs.iter().map(convert).collect()
        };

        let mut features = Vec::new();
        let mut report = ConversionReport {
            detection_count: jobs.len(),
            ..ConversionReport::default()
        };

        for (&(i, j, detection), outcome) in jobs.iter().zip(converted) {
            let prompt = &batches[i].prompt;
            let color = self.color_for(colors, i);

            for degradation in outcome.degradations {
                debug!("Detection {} of '{}' degraded: {:?}", j, prompt, degradation);
                report.events.push(DegradationEvent {
                    prompt_index: i,
                    detection_index: j,
                    degradation,
                });
            }

            for ring in outcome.value {
                features.push(GeoFeature::new(
                    ring,
                    DetectionProperties {
                        prompt: prompt.clone(),
                        confidence: detection.score,
                        color: color.to_string(),
                    },
                ));
            }
        }

        report.feature_count = features.len();
        if report.is_degraded() {
            warn!(
                "{} of {} detections converted with degraded geometry",
                report.events.len(),
                report.detection_count
            );
        }

        Ok((GeoFeatureCollection::new(features), report))
    }

    /// Extract and simplify the rings of one mask.
    pub fn convert_mask(&self, mask: &BinaryMask, mapper: &CoordinateMapper) -> Degraded<Vec<GeoPolygon>> {
        let extracted = self.extractor.extract(mask, mapper);
        let mut degradations = extracted.degradations;

        let rings = extracted
            .value
            .into_iter()
            .map(|ring| {
                let simplified = self.simplifier.simplify(ring);
                degradations.extend(simplified.degradations);
                simplified.value
            })
            .collect();

        Degraded {
            value: rings,
            degradations,
        }
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        builder::FeatureAssemblerBuilder::new().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{ContourStrategy, SimplifyStrategy};

    fn frame() -> PixelFrame {
        PixelFrame { width: 100, height: 100 }
    }

    fn bounds() -> MapBounds {
        MapBounds::new(1.0, 0.0, 1.0, 0.0)
    }

    fn square(x: u32, y: u32, size: u32) -> BinaryMask {
        let mut mask = BinaryMask::new(100, 100);
        mask.fill_rect(x, y, x + size, y + size);
        mask
    }

    fn cat_and_dog() -> Vec<DetectionBatch> {
        vec![
            DetectionBatch::new("cat")
                .with_detection(square(5, 5, 10), 0.91)
                .with_detection(square(40, 5, 10), 0.82),
            DetectionBatch::new("dog")
                .with_detection(square(5, 60, 10), 0.73)
                .with_detection(square(40, 60, 10), 0.64),
        ]
    }

    fn labels(collection: &GeoFeatureCollection) -> Vec<(String, f64)> {
        collection
            .features
            .iter()
            .map(|f| (f.properties.prompt.clone(), f.properties.confidence))
            .collect()
    }

    fn expected_order() -> Vec<(String, f64)> {
        vec![
            ("cat".to_string(), 0.91),
            ("cat".to_string(), 0.82),
            ("dog".to_string(), 0.73),
            ("dog".to_string(), 0.64),
        ]
    }

    #[test]
    fn features_follow_prompt_then_mask_order() {
        let colors = vec!["#00FF00".to_string(), "#0000FF".to_string()];
        let collection = FeatureAssembler::default()
            .assemble(&cat_and_dog(), frame(), &bounds(), &colors)
            .unwrap();

        assert_eq!(labels(&collection), expected_order());
        assert_eq!(collection.features[1].properties.color, "#00FF00");
        assert_eq!(collection.features[2].properties.color, "#0000FF");
    }

    #[test]
    fn parallel_assembly_keeps_canonical_order() {
        let assembler = FeatureAssembler::builder().parallel(true).build();
        let collection = assembler
            .assemble(&cat_and_dog(), frame(), &bounds(), &[])
            .unwrap();
        assert_eq!(labels(&collection), expected_order());
    }

    #[test]
    fn missing_colors_default_to_red() {
        let batches = vec![
            DetectionBatch::new("tree").with_detection(square(10, 10, 20), 0.9),
            DetectionBatch::new("car").with_detection(square(60, 60, 20), 0.8),
        ];
        let collection = FeatureAssembler::default()
            .assemble(&batches, frame(), &bounds(), &["#00FF00".to_string()])
            .unwrap();

        let car = collection.features_for_prompt("car").next().unwrap();
        assert_eq!(car.properties.color, "#FF0000");
        let tree = collection.features_for_prompt("tree").next().unwrap();
        assert_eq!(tree.properties.color, "#00FF00");
    }

    #[test]
    fn empty_masks_are_dropped_silently() {
        let batches = vec![
            DetectionBatch::new("cat")
                .with_detection(BinaryMask::new(100, 100), 0.9)
                .with_detection(square(20, 20, 10), 0.8),
        ];
        let (collection, report) = FeatureAssembler::default()
            .assemble_with_report(&batches, frame(), &bounds(), &[])
            .unwrap();

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.features[0].properties.confidence, 0.8);
        assert_eq!(report.detection_count, 2);
        assert_eq!(report.feature_count, 1);
        assert_eq!(report.degenerate_masks(), 1);
        assert_eq!(report.events[0].detection_index, 0);
    }

    #[test]
    fn every_feature_has_a_closed_ring() {
        for contour in [
            ContourStrategy::MarchingSquares,
            ContourStrategy::BorderFollowing,
            ContourStrategy::BoundingBox,
        ] {
            let assembler = FeatureAssembler::builder()
                .with_contour_strategy(contour)
                .build();
            let collection = assembler
                .assemble(&cat_and_dog(), frame(), &bounds(), &[])
                .unwrap();
            assert!(!collection.is_empty());
            for feature in &collection.features {
                assert!(feature.geometry.len() >= 4);
                assert_eq!(feature.geometry.first(), feature.geometry.last());
            }
        }
    }

    #[test]
    fn simplification_reduces_marching_squares_rings() {
        let batches = vec![DetectionBatch::new("roof").with_detection(square(10, 10, 40), 0.9)];
        let raw = FeatureAssembler::builder()
            .with_simplify_strategy(SimplifyStrategy::Identity)
            .build()
            .assemble(&batches, frame(), &bounds(), &[])
            .unwrap();
        let simplified = FeatureAssembler::builder()
            .with_simplification(0.001)
            .build()
            .assemble(&batches, frame(), &bounds(), &[])
            .unwrap();

        assert!(simplified.features[0].geometry.len() < raw.features[0].geometry.len());
        assert!(simplified.features[0].geometry.is_counter_clockwise());
    }

    #[test]
    fn invalid_frame_aborts_assembly() {
        let result = FeatureAssembler::default().assemble(
            &cat_and_dog(),
            PixelFrame { width: 0, height: 100 },
            &bounds(),
            &[],
        );
        assert!(result.is_err());
    }
}

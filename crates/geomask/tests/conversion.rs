use geomask::{
    Capabilities, ContourStrategy, ConversionRequest, ConverterConfig, DetectionResult, GeoConverter,
    GeoFeatureCollection, SimplifyStrategy,
};
use serde_json::json;

const SIZE: usize = 100;

fn grid(x0: usize, y0: usize, x1: usize, y1: usize) -> Vec<Vec<f64>> {
    (0..SIZE)
        .map(|y| {
            (0..SIZE)
                .map(|x| if (x0..x1).contains(&x) && (y0..y1).contains(&y) { 0.9 } else { 0.1 })
                .collect()
        })
        .collect()
}

fn detections() -> DetectionResult {
    let payload = json!({
        "prompts": ["tree", "car"],
        "masks": [
            [grid(10, 10, 30, 30), grid(50, 10, 70, 30)],
            [grid(10, 60, 40, 90)]
        ],
        "boxes": [
            [[10.0, 10.0, 30.0, 30.0], [50.0, 10.0, 70.0, 30.0]],
            [[10.0, 60.0, 40.0, 90.0]]
        ],
        "scores": [[0.92, 0.41], [0.88]]
    });
    DetectionResult::from_json(&payload.to_string()).unwrap()
}

fn request() -> ConversionRequest {
    let payload = json!({
        "image_width": 100,
        "image_height": 100,
        "bounds": { "north": 1.0, "south": 0.0, "east": 1.0, "west": 0.0 },
        "colors": ["#00FF00"]
    });
    serde_json::from_value(payload).unwrap()
}

fn bounding_box_converter() -> GeoConverter {
    let config = ConverterConfig {
        contour: ContourStrategy::BoundingBox,
        simplify: SimplifyStrategy::Identity,
        ..ConverterConfig::default()
    };
    GeoConverter::new(config).unwrap()
}

#[test]
fn converts_json_detections_to_ordered_features() {
    let converter = GeoConverter::new(ConverterConfig::default()).unwrap();
    let collection = converter.convert(detections(), &request()).unwrap();

    let summary: Vec<(&str, f64, &str)> = collection
        .features
        .iter()
        .map(|f| {
            (
                f.properties.prompt.as_str(),
                f.properties.confidence,
                f.properties.color.as_str(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("tree", 0.92, "#00FF00"),
            ("tree", 0.41, "#00FF00"),
            ("car", 0.88, "#FF0000"),
        ]
    );

    for feature in &collection.features {
        assert_eq!(feature.geometry.first(), feature.geometry.last());
        assert!(feature.geometry.is_counter_clockwise());
        for coord in feature.geometry.coords() {
            assert!((0.0..=1.0).contains(&coord.x));
            assert!((0.0..=1.0).contains(&coord.y));
        }
    }
}

#[test]
fn bounding_box_corners_follow_pixel_edges() {
    let collection = bounding_box_converter().convert(detections(), &request()).unwrap();
    let positions = collection.features[0].geometry.to_positions();

    let expected = [[0.10, 0.90], [0.30, 0.90], [0.30, 0.70], [0.10, 0.70], [0.10, 0.90]];
    assert_eq!(positions.len(), expected.len());
    for (actual, expected) in positions.iter().zip(expected) {
        assert!((actual[0] - expected[0]).abs() < 1e-12, "{:?} vs {:?}", actual, expected);
        assert!((actual[1] - expected[1]).abs() < 1e-12, "{:?} vs {:?}", actual, expected);
    }
}

#[test]
fn confidence_filter_runs_before_assembly() {
    let converter = GeoConverter::new(ConverterConfig::default()).unwrap();
    let mut batches = detections().into_batches().unwrap();
    for batch in &mut batches {
        batch.retain_confident(0.5);
    }

    let (collection, report) = converter.convert_batches(&batches, &request()).unwrap();
    assert_eq!(collection.len(), 2);
    assert_eq!(report.detection_count, 2);
    assert!(collection.features.iter().all(|f| f.properties.confidence >= 0.5));
}

#[test]
fn parallel_conversion_matches_sequential() {
    let sequential = GeoConverter::new(ConverterConfig::default()).unwrap();
    let parallel = GeoConverter::new(ConverterConfig {
        parallel: true,
        ..ConverterConfig::default()
    })
    .unwrap();

    assert_eq!(
        sequential.convert(detections(), &request()).unwrap(),
        parallel.convert(detections(), &request()).unwrap()
    );
}

#[test]
fn output_reads_back_from_geojson_text() {
    let converter = GeoConverter::new(ConverterConfig::default()).unwrap();
    let collection = converter.convert(detections(), &request()).unwrap();

    let text = collection.to_geojson_string().unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["type"], "FeatureCollection");
    assert_eq!(value["features"][2]["properties"]["prompt"], "car");

    let parsed = GeoFeatureCollection::from_geojson_str(&text).unwrap();
    assert_eq!(parsed.len(), collection.len());
    for (read, written) in parsed.features.iter().zip(&collection.features) {
        assert_eq!(read.properties, written.properties);
        assert_eq!(read.geometry.len(), written.geometry.len());
        for (a, b) in read.geometry.coords().zip(written.geometry.coords()) {
            assert!((a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12);
        }
    }
}

#[test]
fn builds_without_capabilities_still_convert() {
    let converter = GeoConverter::with_capabilities(ConverterConfig::default(), Capabilities::none()).unwrap();
    let (collection, report) = converter.convert_with_report(detections(), &request()).unwrap();

    assert!(!converter.is_ready());
    assert_eq!(collection.len(), 3);
    assert!(collection.features.iter().all(|f| f.geometry.len() == 5));
    assert!(!report.is_degraded());
}

#[test]
fn empty_mask_contributes_nothing() {
    let mut result = detections();
    result.masks[1][0] = geomask::MaskGrid::Numeric(grid(0, 0, 0, 0));

    let converter = GeoConverter::new(ConverterConfig::default()).unwrap();
    let (collection, report) = converter.convert_with_report(result, &request()).unwrap();

    assert_eq!(collection.len(), 2);
    assert_eq!(collection.features_for_prompt("car").count(), 0);
    assert_eq!(report.degenerate_masks(), 1);
    assert!(
        report
            .events
            .iter()
            .any(|e| e.prompt_index == 1 && e.degradation == geomask::Degradation::DegenerateMask)
    );
}

#[test]
fn malformed_input_yields_no_collection() {
    let converter = GeoConverter::new(ConverterConfig::default()).unwrap();

    let mut missing_scores = detections();
    missing_scores.scores.pop();
    assert!(converter.convert(missing_scores, &request()).is_err());

    let mut short_boxes = detections();
    short_boxes.boxes[0].pop();
    assert!(converter.convert(short_boxes, &request()).is_err());

    let mut ragged = detections();
    if let geomask::MaskGrid::Numeric(rows) = &mut ragged.masks[0][0] {
        rows[3].pop();
    }
    assert!(converter.convert(ragged, &request()).is_err());

    let mut negative = request();
    negative.image_width = -1;
    assert!(converter.convert(detections(), &negative).is_err());
}

#[test]
fn single_plane_masks_convert_like_flat_masks() {
    let mut stacked = detections();
    for masks in &mut stacked.masks {
        for mask in masks.iter_mut() {
            if let geomask::MaskGrid::Numeric(rows) = mask.clone() {
                *mask = geomask::MaskGrid::StackedNumeric(vec![rows]);
            }
        }
    }

    let converter = GeoConverter::new(ConverterConfig::default()).unwrap();
    assert_eq!(
        converter.convert(stacked, &request()).unwrap(),
        converter.convert(detections(), &request()).unwrap()
    );
}

//! # Detection Mask to GeoJSON Library
//!
//! Converts instance-segmentation output (per-prompt masks and confidence
//! scores over a georeferenced image) into a GeoJSON `FeatureCollection`
//! of polygon outlines.
//!
//! ## Core Features
//!
//! - **Coordinate Mapping**: Linear pixel to `(lon, lat)` interpolation over map bounds
//! - **Contour Extraction**: Sub-pixel marching squares, border following, or bounding boxes
//! - **Guarded Simplification**: Rings are only replaced by valid, same-winding simplifications
//! - **Ordered Assembly**: Prompt-then-mask feature order, optionally converted in parallel
//! - **Degradation Reports**: Every fallback is reported next to the collection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geomask::{ConversionRequest, ConverterConfig, DetectionResult, GeoConverter};
//!
//! let converter = GeoConverter::new(ConverterConfig::default())?;
//! let result = DetectionResult::from_json_file("detections.json")?;
//! let request = ConversionRequest::from_file("request.toml")?;
//!
//! let collection = converter.convert(result, &request)?;
//! collection.save_geojson("detections.geojson")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Assembly
//!
//! ```rust,no_run
//! use geomask::{ContourStrategy, DetectionBatch, FeatureAssembler, MapBounds, PixelFrame};
//!
//! let assembler = FeatureAssembler::builder()
//!     .with_contour_strategy(ContourStrategy::BorderFollowing)
//!     .with_vw_simplification(0.0002)
//!     .parallel(true)
//!     .build();
//!
//! let batches: Vec<DetectionBatch> = Vec::new();
//! let frame = PixelFrame::new(1024, 768)?;
//! let bounds = MapBounds::new(51.51, 51.50, -0.12, -0.14);
//! let collection = assembler.assemble(&batches, frame, &bounds, &[])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod coords;
pub mod detection;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod typed_geojson;
pub mod io;
pub mod config;
pub mod capabilities;
pub mod converter;

// Re-exports for convenience
pub use error::{ConversionError, Degradation, Degraded, GeometryStage, Result};
pub use types::{GeoPolygon, MapBounds, PixelFrame};
pub use coords::{CoordinateMapper, pixel_to_geo};
pub use detection::{BinaryMask, ConversionRequest, Detection, DetectionBatch, DetectionResult, MaskGrid};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{ConversionReport, DegradationEvent, FeatureAssembler, builder::FeatureAssemblerBuilder};
pub use typed_geojson::{DetectionProperties, GeoFeature, GeoFeatureCollection};
pub use config::{ConverterConfig, DEFAULT_COLOR};
pub use capabilities::{Capabilities, Strategies};
pub use converter::GeoConverter;

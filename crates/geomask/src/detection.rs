//! Detection records handed over by the segmentation model.
//!
//! The model reports its output as parallel per-prompt arrays
//! ([`DetectionResult`]). Before conversion these are folded into typed
//! [`DetectionBatch`] records so that a mask can never be paired with the
//! wrong score.

use std::path::Path;

use image::{GrayImage, Luma};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    config::load_document,
    error::{ConversionError, Result},
    types::{MapBounds, PixelFrame},
};

const FOREGROUND: Luma<u8> = Luma([255u8]);

/// Per-pixel mask grid as produced by the model.
///
/// Boolean grids are used as-is; numeric grids are binarized at `> 0.5`.
/// Segmentation models often emit masks shaped `(1, H, W)`; the stacked
/// variants accept those and drop the singleton channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaskGrid {
    Bool(Vec<Vec<bool>>),
    Numeric(Vec<Vec<f64>>),
    StackedBool(Vec<Vec<Vec<bool>>>),
    StackedNumeric(Vec<Vec<Vec<f64>>>),
}

impl MaskGrid {
    pub fn to_binary(&self) -> Result<BinaryMask> {
        match self {
            MaskGrid::Bool(rows) => BinaryMask::from_rows(rows, |&v| v),
            MaskGrid::Numeric(rows) => BinaryMask::from_rows(rows, |&v| v > 0.5),
            MaskGrid::StackedBool(planes) => BinaryMask::from_rows(squeeze(planes)?, |&v| v),
            MaskGrid::StackedNumeric(planes) => BinaryMask::from_rows(squeeze(planes)?, |&v| v > 0.5),
        }
    }
}

/// The single plane of a `(1, H, W)` stack.
fn squeeze<T>(planes: &[Vec<Vec<T>>]) -> Result<&[Vec<T>]> {
    match planes {
        [plane] => Ok(plane.as_slice()),
        _ => Err(ConversionError::MalformedMask {
            reason: format!("expected a single mask plane, got {}", planes.len()),
        }),
    }
}

/// Binarized instance mask backed by a grayscale image (0 or 255).
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    image: GrayImage,
}

impl BinaryMask {
    /// An all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    fn from_rows<T>(rows: &[Vec<T>], is_set: impl Fn(&T) -> bool) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(ConversionError::MalformedMask {
                reason: format!(
                    "row {} has {} columns, expected {}",
                    index,
                    row.len(),
                    width
                ),
            });
        }
        let too_large = || ConversionError::MalformedMask {
            reason: format!("{}x{} grid exceeds the supported size", width, height),
        };
        let mut mask = Self::new(
            u32::try_from(width).map_err(|_| too_large())?,
            u32::try_from(height).map_err(|_| too_large())?,
        );
        for (y, row) in rows.iter().enumerate() {
            for (x, value) in row.iter().enumerate() {
                if is_set(value) {
                    mask.image.put_pixel(x as u32, y as u32, FOREGROUND);
                }
            }
        }
        Ok(mask)
    }

    /// Binarize a grayscale image; values above the mid-level are foreground.
    pub fn from_luma(image: &GrayImage) -> Self {
        Self {
            image: imageproc::contrast::threshold(image, 127),
        }
    }

    /// Load a mask from an image file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(path)?.to_luma8();
        Ok(Self::from_luma(&image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn set(&mut self, x: u32, y: u32) {
        self.image.put_pixel(x, y, FOREGROUND);
    }

    /// Fill the half-open pixel rectangle `[x0, x1) x [y0, y1)`, clipped to the mask.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1.min(self.height()) {
            for x in x0..x1.min(self.width()) {
                self.set(x, y);
            }
        }
    }

    /// Foreground test that treats everything outside the grid as background.
    pub fn is_set(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return false;
        }
        self.image.get_pixel(x as u32, y as u32)[0] > 0
    }

    pub fn foreground_count(&self) -> usize {
        self.image.pixels().filter(|p| p[0] > 0).count()
    }

    /// Inclusive pixel extrema `(min_x, min_y, max_x, max_y)` of the foreground.
    pub fn foreground_extent(&self) -> Option<(u32, u32, u32, u32)> {
        self.image
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .fold(None, |extent, (x, y, _)| match extent {
                None => Some((x, y, x, y)),
                Some((min_x, min_y, max_x, max_y)) => {
                    Some((min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)))
                }
            })
    }
}

/// One detected instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub mask: BinaryMask,
    /// `[x0, y0, x1, y1]` in pixel space, passed through untouched.
    pub bbox: Option<[f64; 4]>,
    pub score: f64,
}

/// All detections for one prompt, in the order the model reported them.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBatch {
    pub prompt: String,
    pub detections: Vec<Detection>,
}

impl DetectionBatch {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            detections: Vec::new(),
        }
    }

    pub fn with_detection(mut self, mask: BinaryMask, score: f64) -> Self {
        self.detections.push(Detection {
            mask,
            bbox: None,
            score,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Keep detections scoring at least `threshold`, preserving order.
    pub fn retain_confident(&mut self, threshold: f64) {
        self.detections.retain(|d| d.score >= threshold);
    }
}

/// Raw model output: parallel per-prompt arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub prompts: Vec<String>,
    #[serde(default)]
    pub masks: Vec<Vec<MaskGrid>>,
    #[serde(default)]
    pub boxes: Vec<Vec<[f64; 4]>>,
    #[serde(default)]
    pub scores: Vec<Vec<f64>>,
}

impl DetectionResult {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn detection_count(&self) -> usize {
        self.scores.iter().map(Vec::len).sum()
    }

    /// Fold the parallel arrays into typed batches, checking index alignment.
    ///
    /// `boxes` may be omitted entirely; when present it must align with the
    /// masks like `scores` does.
    pub fn into_batches(self) -> Result<Vec<DetectionBatch>> {
        let prompt_count = self.prompts.len();
        let has_boxes = !self.boxes.is_empty();

        for (name, len) in [
            ("masks", self.masks.len()),
            ("scores", self.scores.len()),
            ("boxes", if has_boxes { self.boxes.len() } else { prompt_count }),
        ] {
            if len != prompt_count {
                return Err(ConversionError::MalformedBatch {
                    prompt_index: len.min(prompt_count),
                    reason: format!("{} prompts but {} {} entries", prompt_count, len, name),
                });
            }
        }

        let mut boxes = self.boxes.into_iter();
        self.prompts
            .into_iter()
            .zip(self.masks)
            .zip(self.scores)
            .enumerate()
            .map(|(prompt_index, ((prompt, masks), scores))| {
                let prompt_boxes = boxes.next();
                let malformed = |reason: String| ConversionError::MalformedBatch {
                    prompt_index,
                    reason,
                };
                if masks.len() != scores.len() {
                    return Err(malformed(format!(
                        "{} masks but {} scores",
                        masks.len(),
                        scores.len()
                    )));
                }
                if let Some(prompt_boxes) = &prompt_boxes {
                    if prompt_boxes.len() != masks.len() {
                        return Err(malformed(format!(
                            "{} masks but {} boxes",
                            masks.len(),
                            prompt_boxes.len()
                        )));
                    }
                }

                let detections = masks
                    .iter()
                    .zip(scores)
                    .enumerate()
                    .map(|(j, (grid, score))| {
                        Ok(Detection {
                            mask: grid.to_binary()?,
                            bbox: prompt_boxes.as_ref().map(|b| b[j]),
                            score,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(DetectionBatch { prompt, detections })
            })
            .collect()
    }
}

/// Everything the transport layer supplies alongside the model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversionRequest {
    pub image_width: i64,
    pub image_height: i64,
    pub bounds: MapBounds,
    /// Hex colors, one per prompt; missing entries use the configured default.
    #[serde(default)]
    pub colors: Vec<String>,
}

impl ConversionRequest {
    pub fn new(frame: PixelFrame, bounds: MapBounds, colors: Vec<String>) -> Self {
        Self {
            image_width: frame.width as i64,
            image_height: frame.height as i64,
            bounds,
            colors,
        }
    }

    pub fn frame(&self) -> Result<PixelFrame> {
        PixelFrame::from_signed(self.image_width, self.image_height)
    }

    /// Auto-detect file format (`.toml` / `.json`) and load the request.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_document(path.as_ref())
    }
}

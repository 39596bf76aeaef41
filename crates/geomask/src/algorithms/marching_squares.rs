//! Marching squares contour tracing at the 0.5 iso-level of a binary mask.
//!
//! Cells span four neighbouring pixel centers. Pixels outside the mask read as
//! background, so every boundary closes, including those along the image
//! border. All segments are directed with the foreground on the same side,
//! which gives outer boundaries one winding and holes the opposite one.

use std::collections::HashMap;

use crate::{
    detection::BinaryMask,
    error::{ConversionError, Result},
    traits::{ContourTracer, PixelPoint},
};

/// Cell edge midpoint in doubled pixel coordinates, so every key is integral.
type EdgeKey = (i64, i64);

type Corner = ((i64, i64), bool);

#[derive(Debug, Clone, Copy)]
enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    fn key(self, x: i64, y: i64) -> EdgeKey {
        match self {
            Edge::Top => (2 * x + 1, 2 * y),
            Edge::Right => (2 * x + 2, 2 * y + 1),
            Edge::Bottom => (2 * x + 1, 2 * y + 2),
            Edge::Left => (2 * x, 2 * y + 1),
        }
    }
}

/// Edges crossed by the iso-line for each corner configuration.
///
/// Bits: top-left 1, top-right 2, bottom-right 4, bottom-left 8. The saddle
/// cases 5 and 10 cut off each foreground corner on its own, so pixels that
/// only touch diagonally stay separate components.
fn crossings(case: u8) -> &'static [(Edge, Edge)] {
    match case {
        1 | 14 => &[(Edge::Top, Edge::Left)],
        2 | 13 => &[(Edge::Top, Edge::Right)],
        4 | 11 => &[(Edge::Right, Edge::Bottom)],
        7 | 8 => &[(Edge::Bottom, Edge::Left)],
        3 | 12 => &[(Edge::Left, Edge::Right)],
        6 | 9 => &[(Edge::Top, Edge::Bottom)],
        5 => &[(Edge::Top, Edge::Left), (Edge::Right, Edge::Bottom)],
        10 => &[(Edge::Top, Edge::Right), (Edge::Bottom, Edge::Left)],
        _ => &[],
    }
}

/// Direct a segment so the foreground lies on its negative cross-product side.
///
/// In pixel space (y down) that is a clockwise outer boundary, which becomes
/// counter-clockwise once y is flipped into latitude. The corner nearest to
/// the segment midpoint decides: it is the corner a diagonal segment cuts off,
/// and for straight segments every corner lies off the line.
fn orient(a: EdgeKey, b: EdgeKey, corners: &[Corner; 4]) -> (EdgeKey, EdgeKey) {
    // Midpoint and corners both scaled by four.
    let mid = (a.0 + b.0, a.1 + b.1);
    let distance = |&((cx, cy), _): &Corner| {
        let (dx, dy) = (mid.0 - 4 * cx, mid.1 - 4 * cy);
        dx * dx + dy * dy
    };

    let mut nearest = corners[0];
    for corner in &corners[1..] {
        if distance(corner) < distance(&nearest) {
            nearest = *corner;
        }
    }

    let ((cx, cy), set) = nearest;
    let cross = (b.0 - a.0) * (2 * cy - a.1) - (b.1 - a.1) * (2 * cx - a.0);
    let side = if set { cross } else { -cross };
    if side > 0 { (b, a) } else { (a, b) }
}

fn to_point((x, y): EdgeKey) -> PixelPoint {
    [x as f64 / 2.0, y as f64 / 2.0]
}

/// Marching squares tracer producing sub-pixel boundary points.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarchingSquares;

impl MarchingSquares {
    /// Directed boundary segments in raster order of their cells.
    fn segments(mask: &BinaryMask) -> Vec<(EdgeKey, EdgeKey)> {
        let (width, height) = (mask.width() as i64, mask.height() as i64);
        let mut segments = Vec::new();

        for y in -1..height {
            for x in -1..width {
                let corners: [Corner; 4] = [
                    ((x, y), mask.is_set(x, y)),
                    ((x + 1, y), mask.is_set(x + 1, y)),
                    ((x + 1, y + 1), mask.is_set(x + 1, y + 1)),
                    ((x, y + 1), mask.is_set(x, y + 1)),
                ];
                let case = corners
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, set))| *set)
                    .fold(0u8, |case, (bit, _)| case | (1 << bit));

                for &(from, to) in crossings(case) {
                    segments.push(orient(from.key(x, y), to.key(x, y), &corners));
                }
            }
        }

        segments
    }

    /// Chain directed segments into closed contours.
    fn link(segments: &[(EdgeKey, EdgeKey)]) -> Result<Vec<Vec<PixelPoint>>> {
        let mut by_start = HashMap::with_capacity(segments.len());
        for (index, &(start, _)) in segments.iter().enumerate() {
            if by_start.insert(start, index).is_some() {
                return Err(ConversionError::Geometry(format!(
                    "two contour segments start at {:?}",
                    to_point(start)
                )));
            }
        }

        let mut visited = vec![false; segments.len()];
        let mut contours = Vec::new();

        for first in 0..segments.len() {
            if visited[first] {
                continue;
            }
            let origin = segments[first].0;
            let mut contour = Vec::new();
            let mut current = first;

            loop {
                visited[current] = true;
                let (start, end) = segments[current];
                contour.push(to_point(start));
                if end == origin {
                    break;
                }
                current = *by_start.get(&end).ok_or_else(|| {
                    ConversionError::Geometry(format!("open contour at {:?}", to_point(end)))
                })?;
                if visited[current] {
                    return Err(ConversionError::Geometry(format!(
                        "contour re-enters itself at {:?}",
                        to_point(end)
                    )));
                }
            }

            contours.push(contour);
        }

        Ok(contours)
    }
}

impl ContourTracer for MarchingSquares {
    fn trace(&self, mask: &BinaryMask) -> Result<Vec<Vec<PixelPoint>>> {
        let segments = Self::segments(mask);
        Self::link(&segments)
    }
}

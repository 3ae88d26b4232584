use serde::{Deserialize, Serialize};

/// A 2D vertex in source-image pixel coordinates (y grows downwards).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An ordered vertex loop. Finalized shapes are convex quadrilaterals.
pub type Shape = Vec<Point>;

/// Collection of shapes; detection order carries no meaning.
pub type ShapeList = Vec<Shape>;

/// Per-page detection output, kept in three buckets so an external reviewer
/// can display what was dropped and why.
#[derive(Clone, Debug, Default)]
pub struct Detection {
    /// Contours that looked like quads but failed the area/angle window.
    pub rejects: ShapeList,
    /// Accepted quad candidates before deduplication.
    pub ungrouped: ShapeList,
    /// One canonical quadrilateral per physical photo.
    pub pictures: ShapeList,
}

/// Rotation needed to bring an extracted photo upright.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Unknown,
    Correct,
    /// Rotate 90 degrees clockwise to correct.
    Clockwise,
    /// Rotate 180 degrees to correct.
    Flipped,
    /// Rotate 90 degrees counterclockwise to correct.
    Counterclockwise,
}

/// Tuning for contour extraction and quadrilateral filtering.
///
/// The area window and the corner-cosine tolerance are empirical constants
/// from scanning photo pages at flatbed resolutions; they are fields rather
/// than hardcoded values so several pipelines can run with different tuning.
#[derive(Clone, Debug)]
pub struct DetectConfig {
    /// Upper Canny threshold for the edge-detection pass (level 0).
    pub canny_threshold: f32,
    /// Number of threshold levels per color channel, Canny pass included.
    pub threshold_levels: u32,
    /// Simplified contours below this area are noise, dropped silently (px^2).
    pub min_noise_area: f64,
    /// Smallest plausible photo area (px^2).
    pub min_area: f64,
    /// Largest plausible photo area (px^2).
    pub max_area: f64,
    /// Maximum |cos| allowed at any corner; 0.10 keeps corners near 90 deg.
    pub max_corner_cosine: f64,
    /// Two candidates are the same photo when their intersection covers at
    /// least this fraction of the larger one.
    pub overlap_threshold: f64,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            canny_threshold: 50.0,
            threshold_levels: 11,
            min_noise_area: 1000.0,
            min_area: 500_000.0,
            max_area: 20_000_000.0,
            max_corner_cosine: 0.10,
            overlap_threshold: 0.90,
        }
    }
}

/// Tuning for orientation voting and the sky fallback.
#[derive(Clone, Debug)]
pub struct OrientConfig {
    /// Downscale divisors tried per classifier, coarsest first.
    pub scales: Vec<u32>,
    /// Divisor applied before sampling border brightness.
    pub sky_downscale: u32,
}

impl Default for OrientConfig {
    fn default() -> Self {
        Self {
            scales: vec![8, 4, 2, 1],
            sky_downscale: 8,
        }
    }
}

/// Integer vertex as stored in the reviewed-results record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPoint {
    pub x: i32,
    pub y: i32,
}

/// The on-disk record of reviewed picture boundaries for one page, written
/// next to the source image. The format is owned by the review tooling; this
/// crate only round-trips it, and accepts vertices in any saved order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PageRecord {
    pub pictures: Vec<Vec<RecordPoint>>,
}

impl PageRecord {
    pub fn from_shapes(shapes: &[Shape]) -> Self {
        Self {
            pictures: shapes
                .iter()
                .map(|s| {
                    s.iter()
                        .map(|p| RecordPoint {
                            x: p.x.round() as i32,
                            y: p.y.round() as i32,
                        })
                        .collect()
                })
                .collect(),
        }
    }

    pub fn to_shapes(&self) -> ShapeList {
        self.pictures
            .iter()
            .map(|pts| {
                pts.iter()
                    .map(|p| Point::new(p.x as f64, p.y as f64))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_json() {
        let shapes = vec![vec![
            Point::new(10.0, 20.0),
            Point::new(110.0, 21.0),
            Point::new(109.0, 120.0),
            Point::new(11.0, 119.0),
        ]];
        let record = PageRecord::from_shapes(&shapes);
        let json = serde_json::to_string(&record).unwrap();
        let back: PageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pictures, record.pictures);
        assert_eq!(back.to_shapes(), shapes);
    }
}

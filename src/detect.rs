//! Quadrilateral filtering: reduce raw contours to photo-candidate quads.

use imageproc::geometry::approximate_polygon_dp;
use rayon::prelude::*;
use tracing::debug;

use crate::contours::RawContour;
use crate::geometry::{area, is_convex, squareness};
use crate::types::{DetectConfig, Point, Shape, ShapeList};

enum Verdict {
    /// Too small to be anything; not even worth showing a reviewer.
    Noise,
    Reject(Shape),
    Accept(Shape),
}

/// Filter contours down to accepted photo-candidate quadrilaterals.
///
/// Returns `(accepts, rejects)`. Rejects are kept so review tooling can show
/// why a boundary was dropped; callers that don't care simply discard them.
pub fn filter_shapes(contours: &[RawContour], cfg: &DetectConfig) -> (ShapeList, ShapeList) {
    let verdicts: Vec<Verdict> = contours
        .par_iter()
        .map(|contour| judge(contour, cfg))
        .collect();

    let mut accepts = ShapeList::new();
    let mut rejects = ShapeList::new();
    for verdict in verdicts {
        match verdict {
            Verdict::Noise => {}
            Verdict::Reject(shape) => rejects.push(shape),
            Verdict::Accept(shape) => accepts.push(shape),
        }
    }

    debug!(
        accepted = accepts.len(),
        rejected = rejects.len(),
        raw = contours.len(),
        "filtered contours"
    );
    (accepts, rejects)
}

fn judge(contour: &RawContour, cfg: &DetectConfig) -> Verdict {
    if contour.points.len() < 3 {
        return Verdict::Noise;
    }

    // Approximate with accuracy proportional to the contour perimeter.
    let curve: Vec<imageproc::point::Point<f64>> = contour
        .points
        .iter()
        .map(|p| imageproc::point::Point::new(p.x as f64, p.y as f64))
        .collect();
    let mut perim = 0.0;
    for i in 0..curve.len() {
        let p = curve[i];
        let q = curve[(i + 1) % curve.len()];
        perim += (p.x - q.x).hypot(p.y - q.y);
    }
    let approx = approximate_polygon_dp(&curve, perim * 0.02, true);
    let shape: Shape = approx.iter().map(|p| Point::new(p.x, p.y)).collect();

    let shape_area = area(&shape);
    if shape_area < cfg.min_noise_area {
        return Verdict::Noise;
    }

    // Photo candidates must have 4 vertices after approximation and be convex.
    if shape.len() != 4 || !is_convex(&shape) {
        return Verdict::Reject(shape);
    }

    if shape_area < cfg.min_area || shape_area > cfg.max_area {
        return Verdict::Reject(shape);
    }

    // All corner angles should be close to 90 degrees.
    if squareness(&shape) > cfg.max_corner_cosine {
        return Verdict::Reject(shape);
    }

    Verdict::Accept(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::contours::BorderType;
    use imageproc::point::Point as IPoint;

    fn rect_contour(x: i32, y: i32, w: i32, h: i32) -> RawContour {
        // dense boundary walk of an axis-aligned rectangle
        let mut points = Vec::new();
        for i in 0..w {
            points.push(IPoint::new(x + i, y));
        }
        for i in 0..h {
            points.push(IPoint::new(x + w, y + i));
        }
        for i in 0..w {
            points.push(IPoint::new(x + w - i, y + h));
        }
        for i in 0..h {
            points.push(IPoint::new(x, y + h - i));
        }
        RawContour {
            points,
            border_type: BorderType::Outer,
            parent: None,
        }
    }

    fn small_window_cfg() -> DetectConfig {
        DetectConfig {
            min_area: 5_000.0,
            max_area: 1_000_000.0,
            ..DetectConfig::default()
        }
    }

    #[test]
    fn accepts_a_square_inside_the_area_window() {
        let cfg = small_window_cfg();
        let (accepts, rejects) = filter_shapes(&[rect_contour(10, 10, 300, 300)], &cfg);
        assert_eq!(accepts.len(), 1);
        assert!(rejects.is_empty());
        assert_eq!(accepts[0].len(), 4);
    }

    #[test]
    fn rejects_squares_outside_the_area_window() {
        let cfg = small_window_cfg();
        // big enough to not be noise, too small for the window
        let (accepts, rejects) = filter_shapes(&[rect_contour(0, 0, 60, 60)], &cfg);
        assert!(accepts.is_empty());
        assert_eq!(rejects.len(), 1);
    }

    #[test]
    fn drops_tiny_contours_silently() {
        let cfg = small_window_cfg();
        let (accepts, rejects) = filter_shapes(&[rect_contour(0, 0, 10, 10)], &cfg);
        assert!(accepts.is_empty());
        assert!(rejects.is_empty());
    }
}

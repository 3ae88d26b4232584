//! Shared polygon math: corner angles, areas, convexity and the vertex-order
//! normalization applied before perspective extraction.

use crate::error::ScanError;
use crate::types::{Point, Shape};

/// Cosine of the angle between the vectors corner->a and corner->b.
pub fn corner_cosine(a: Point, b: Point, corner: Point) -> f64 {
    let dx1 = a.x - corner.x;
    let dy1 = a.y - corner.y;
    let dx2 = b.x - corner.x;
    let dy2 = b.y - corner.y;
    (dx1 * dx2 + dy1 * dy2)
        / ((dx1 * dx1 + dy1 * dy1) * (dx2 * dx2 + dy2 * dy2) + 1e-10).sqrt()
}

/// Squareness score of a quadrilateral: the maximum |cos| over its four
/// corner angles. Lower is closer to a right-angled rectangle.
pub fn squareness(quad: &[Point]) -> f64 {
    debug_assert_eq!(quad.len(), 4);
    let mut max_cosine: f64 = 0.0;
    for i in 0..4 {
        let prev = quad[(i + 3) % 4];
        let next = quad[(i + 1) % 4];
        max_cosine = max_cosine.max(corner_cosine(prev, next, quad[i]).abs());
    }
    max_cosine
}

/// Shoelace sum; positive for clockwise loops in screen coordinates
/// (y grows downwards).
pub fn signed_area(poly: &[Point]) -> f64 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let p = poly[i];
        let q = poly[(i + 1) % n];
        sum += p.x * q.y - q.x * p.y;
    }
    sum * 0.5
}

pub fn area(poly: &[Point]) -> f64 {
    signed_area(poly).abs()
}

pub fn perimeter(poly: &[Point]) -> f64 {
    let n = poly.len();
    let mut sum = 0.0;
    for i in 0..n {
        let p = poly[i];
        let q = poly[(i + 1) % n];
        sum += (p.x - q.x).hypot(p.y - q.y);
    }
    sum
}

/// True when every turn of the loop has the same (non-zero) sign.
pub fn is_convex(poly: &[Point]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f64;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let c = poly[(i + 2) % n];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() < 1e-9 {
            return false;
        }
        if sign == 0.0 {
            sign = cross;
        } else if sign * cross < 0.0 {
            return false;
        }
    }
    true
}

/// Axis-aligned bounding box as (top-left, bottom-right).
pub fn bounding_box(poly: &[Point]) -> (Point, Point) {
    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in poly {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

/// Canonicalize a finalized quadrilateral: clockwise winding (screen
/// coordinates), then rotated so the vertex nearest the bounding-box
/// top-left corner (Manhattan distance) sits at index 0.
///
/// Reviewed records may come back with vertices in any order; this is the
/// normalization that makes downstream corner indexing consistent.
pub fn normalize_quad(shape: &Shape) -> Result<[Point; 4], ScanError> {
    if shape.len() != 4 {
        return Err(ScanError::BadQuad {
            vertices: shape.len(),
        });
    }

    let mut quad = [shape[0], shape[1], shape[2], shape[3]];
    let signed = signed_area(&quad);
    if signed.abs() < 1e-9 {
        return Err(ScanError::DegenerateQuad("zero area".into()));
    }
    if signed < 0.0 {
        quad.reverse();
    }

    let (tl, _) = bounding_box(&quad);
    let start = quad
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (a.x - tl.x).abs() + (a.y - tl.y).abs();
            let db = (b.x - tl.x).abs() + (b.y - tl.y).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    quad.rotate_left(start);

    Ok(quad)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Shape {
        vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ]
    }

    #[test]
    fn square_scores_near_zero() {
        assert!(squareness(&square()) < 1e-6);
    }

    #[test]
    fn skewed_quad_scores_worse_than_square() {
        // ~45 degree corner at the first vertex
        let skewed = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(100.0, 200.0),
            Point::new(0.0, 100.0),
        ];
        assert!(squareness(&skewed) > 0.10);
        assert!(squareness(&square()) < squareness(&skewed));
    }

    #[test]
    fn convexity_check() {
        assert!(is_convex(&square()));
        let dented = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(20.0, 20.0),
            Point::new(0.0, 100.0),
        ];
        assert!(!is_convex(&dented));
    }

    #[test]
    fn normalize_fixes_winding_and_start() {
        // counterclockwise on screen, starting away from the top-left
        let quad = vec![
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
        ];
        let normalized = normalize_quad(&quad).unwrap();
        assert_eq!(normalized[0], Point::new(0.0, 0.0));
        assert!(signed_area(&normalized) > 0.0);
        assert_eq!(normalized[1], Point::new(100.0, 0.0));
    }

    #[test]
    fn normalize_rejects_non_quads() {
        let tri = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 10.0),
        ];
        assert!(matches!(
            normalize_quad(&tri),
            Err(ScanError::BadQuad { vertices: 3 })
        ));
    }

    #[test]
    fn area_of_unit_square() {
        assert!((area(&square()) - 10_000.0).abs() < 1e-9);
        assert!((perimeter(&square()) - 400.0).abs() < 1e-9);
    }
}

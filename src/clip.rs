//! Sutherland-Hodgman polygon clipping.
//!
//! Used by deduplication to measure the overlap of two candidate
//! quadrilaterals. The clip polygon must be convex with at least three
//! vertices and no duplicate or colinear consecutive vertices; the result is
//! undefined otherwise (a correctness precondition, not a checked error).

use crate::types::{Point, Shape};

const EPS: f64 = 1e-9;

fn cross(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

/// Which side of the directed edge a->b the point c lies on:
/// 1 if left, -1 if right, 0 if colinear.
fn left_of(a: Point, b: Point, c: Point) -> i32 {
    let x = cross(b.x - a.x, b.y - a.y, c.x - b.x, c.y - b.y);
    if x < -EPS {
        -1
    } else if x > EPS {
        1
    } else {
        0
    }
}

/// Intersection of segments x0-x1 and y0-y1, exclusive of shared endpoints.
/// A parallel or zero-length pair has no intersection.
fn line_sect(x0: Point, x1: Point, y0: Point, y1: Point) -> Option<Point> {
    let dx = Point::new(x1.x - x0.x, x1.y - x0.y);
    let dy = Point::new(y1.x - y0.x, y1.y - y0.y);
    let d = Point::new(x0.x - y0.x, x0.y - y0.y);

    // x0 + a dx = y0 + b dy  =>  b = (x0 - y0) X dx / (dy X dx)
    let dyx = cross(dy.x, dy.y, dx.x, dx.y);
    if dyx.abs() < EPS {
        return None;
    }
    let t = cross(d.x, d.y, dx.x, dx.y) / dyx;
    if t <= 0.0 || t >= 1.0 {
        return None;
    }

    Some(Point::new(y0.x + t * dy.x, y0.y + t * dy.y))
}

/// Clip `sub` against the half-plane on the winding side of edge x0->x1,
/// inserting intersection points where the subject crosses the edge.
fn poly_edge_clip(sub: &[Point], x0: Point, x1: Point, left: i32) -> Shape {
    let mut res = Shape::new();

    let mut v0 = sub[sub.len() - 1];
    let mut side0 = left_of(x0, x1, v0);
    if side0 != -left {
        res.push(v0);
    }

    for (i, &v1) in sub.iter().enumerate() {
        let side1 = left_of(x0, x1, v1);
        if side0 + side1 == 0 && side0 != 0 {
            // previous and current vertex straddle the edge
            if let Some(p) = line_sect(x0, x1, v0, v1) {
                res.push(p);
            }
        }
        if i == sub.len() - 1 {
            break;
        }
        if side1 != -left {
            res.push(v1);
        }
        v0 = v1;
        side0 = side1;
    }

    res
}

/// Winding direction of a convex polygon, read off the cross product of
/// vertices 0, 1 and 3. Valid only under the convexity precondition.
fn poly_winding(p: &[Point]) -> i32 {
    let probe = if p.len() >= 4 { p[3] } else { p[2] };
    left_of(p[0], p[1], probe)
}

/// Intersection of `subject` with the convex polygon `clip`, or an empty
/// shape when they are disjoint. Pure function of its inputs.
pub fn clip(subject: &[Point], clip: &[Point]) -> Shape {
    if subject.len() < 3 || clip.len() < 3 {
        return Shape::new();
    }

    let dir = poly_winding(clip);
    let mut p2 = poly_edge_clip(subject, clip[clip.len() - 1], clip[0], dir);
    for i in 0..clip.len() - 1 {
        let p1 = std::mem::take(&mut p2);
        if p1.is_empty() {
            break;
        }
        p2 = poly_edge_clip(&p1, clip[i], clip[i + 1], dir);
    }

    p2
}

//! Candidate deduplication: the same physical photo is usually detected in
//! several channel/threshold combinations, so candidates are partitioned by
//! mutual overlap and one representative survives per group.

use tracing::debug;

use crate::clip;
use crate::geometry::{area, squareness};
use crate::types::{DetectConfig, Shape, ShapeList};

/// Union-find with path compression over candidate indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// True when the intersection of the two shapes covers at least `threshold`
/// of the larger shape's area.
fn same_picture(a: &Shape, b: &Shape, threshold: f64) -> bool {
    let overlap = clip::clip(a, b);
    if overlap.is_empty() {
        return false;
    }
    let larger = area(a).max(area(b));
    if larger <= 0.0 {
        return false;
    }
    area(&overlap) / larger > threshold
}

/// Collapse near-duplicate candidates to one shape per physical photo.
///
/// The overlap predicate is not transitive, so connected components are an
/// approximation: candidates A-B and B-C overlapping merge all three even
/// when A and C do not overlap directly. Within each group the quadrilateral
/// with the lowest squareness score (straightest corners) wins. Groups come
/// out in first-appearance order; a candidate overlapping nothing is always
/// kept as its own group.
pub fn minimize_shapes(shapes: &ShapeList, cfg: &DetectConfig) -> ShapeList {
    let n = shapes.len();
    let mut set = DisjointSet::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if same_picture(&shapes[i], &shapes[j], cfg.overlap_threshold) {
                set.union(i, j);
            }
        }
    }

    // group label = order in which each root is first seen
    let mut labels = Vec::with_capacity(n);
    let mut roots: Vec<usize> = Vec::new();
    for i in 0..n {
        let root = set.find(i);
        let label = match roots.iter().position(|&r| r == root) {
            Some(l) => l,
            None => {
                roots.push(root);
                roots.len() - 1
            }
        };
        labels.push(label);
    }

    let mut grouped: Vec<Option<usize>> = vec![None; roots.len()];
    let mut best_scores = vec![f64::MAX; roots.len()];
    for (i, shape) in shapes.iter().enumerate() {
        let group = labels[i];
        let score = squareness(shape);
        if score < best_scores[group] {
            grouped[group] = Some(i);
            best_scores[group] = score;
        }
    }

    let pictures: ShapeList = grouped
        .into_iter()
        .flatten()
        .map(|i| shapes[i].clone())
        .collect();
    debug!(candidates = n, pictures = pictures.len(), "deduplicated");
    pictures
}

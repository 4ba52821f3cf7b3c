//! Spatial index for per-frame radius queries.
//!
//! A 2D k-d tree built once per frame. It stores slot indices next to the
//! positions, so callers keep ownership of the peaks and invalidate them by
//! slot rather than through the tree.

#[cfg(test)]
mod tests;

use glam::DVec2;

/// Immutable 2D k-d tree over `(slot, position)` pairs.
///
/// Safe to share between threads for concurrent queries once built.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<DVec2>,
    slots: Vec<usize>,
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Index into the points array
    point_idx: usize,
    left: Option<usize>,
    right: Option<usize>,
    /// Split dimension (0 = x, 1 = y)
    split_dim: usize,
}

impl KdTree {
    /// Build a tree using median splits. Returns `None` for an empty input.
    ///
    /// Points must be finite.
    pub fn build(items: impl IntoIterator<Item = (usize, DVec2)>) -> Option<Self> {
        let (slots, points): (Vec<usize>, Vec<DVec2>) = items.into_iter().unzip();
        if points.is_empty() {
            return None;
        }
        debug_assert!(points.iter().all(|p| p.is_finite()));

        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        Self::build_recursive(&points, &mut indices, 0, &mut nodes);

        Some(Self {
            nodes,
            points,
            slots,
        })
    }

    fn build_recursive(
        points: &[DVec2],
        indices: &mut [usize],
        depth: usize,
        nodes: &mut Vec<KdNode>,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let split_dim = depth % 2;
        let median = indices.len() / 2;
        indices.select_nth_unstable_by(median, |&a, &b| {
            points[a][split_dim].total_cmp(&points[b][split_dim])
        });
        let point_idx = indices[median];

        let node_idx = nodes.len();
        nodes.push(KdNode {
            point_idx,
            left: None,
            right: None,
            split_dim,
        });

        let (left_indices, right_part) = indices.split_at_mut(median);
        let right_indices = &mut right_part[1..];

        let left = Self::build_recursive(points, left_indices, depth + 1, nodes);
        let right = Self::build_recursive(points, right_indices, depth + 1, nodes);
        nodes[node_idx].left = left;
        nodes[node_idx].right = right;

        Some(node_idx)
    }

    /// All items within `radius` (inclusive) of `query`.
    ///
    /// Returns `(slot, distance_squared)` pairs sorted by distance, ties by slot.
    pub fn radius_search(&self, query: DVec2, radius: f64) -> Vec<(usize, f64)> {
        let mut results = Vec::new();
        if !query.is_finite() || radius.is_nan() || radius < 0.0 {
            return results;
        }
        self.visit_radius(0, query, radius * radius, &mut |point_idx, dist_sq| {
            results.push((point_idx, dist_sq));
            false
        });
        let mut results: Vec<(usize, f64)> = results
            .into_iter()
            .map(|(point_idx, dist_sq)| (self.slots[point_idx], dist_sq))
            .collect();
        results.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        results
    }

    /// Whether any item within `radius` of `query` satisfies `pred`.
    ///
    /// Stops at the first match.
    pub fn any_within(
        &self,
        query: DVec2,
        radius: f64,
        mut pred: impl FnMut(usize) -> bool,
    ) -> bool {
        if !query.is_finite() || radius.is_nan() || radius < 0.0 {
            return false;
        }
        let slots = &self.slots;
        self.visit_radius(0, query, radius * radius, &mut |point_idx, _| {
            pred(slots[point_idx])
        })
    }

    /// Depth-first radius walk. `visit` returns `true` to stop early; the
    /// return value reports whether the walk was stopped.
    fn visit_radius(
        &self,
        node_idx: usize,
        query: DVec2,
        radius_sq: f64,
        visit: &mut impl FnMut(usize, f64) -> bool,
    ) -> bool {
        let node = &self.nodes[node_idx];
        let point = self.points[node.point_idx];

        let dist_sq = query.distance_squared(point);
        if dist_sq <= radius_sq && visit(node.point_idx, dist_sq) {
            return true;
        }

        let diff = query[node.split_dim] - point[node.split_dim];
        let diff_sq = diff * diff;

        if let Some(left_idx) = node.left
            && (diff <= 0.0 || diff_sq <= radius_sq)
            && self.visit_radius(left_idx, query, radius_sq, visit)
        {
            return true;
        }

        if let Some(right_idx) = node.right
            && (diff >= 0.0 || diff_sq <= radius_sq)
            && self.visit_radius(right_idx, query, radius_sq, visit)
        {
            return true;
        }

        false
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

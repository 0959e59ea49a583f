//! Nearest-neighbor search over tree nodes
//!
//! Ids are assigned in insertion order and double as tree node indices.
//! Ties in distance resolve to the lowest id, so every implementation
//! returns identical answers for identical input.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::common::Configuration;
use crate::motion_planning::ConfigurationSpace;

/// Common contract of the neighbor indices
pub trait NearestNeighbors {
    /// Store `q` and return its id
    fn insert(&mut self, q: Configuration) -> usize;

    /// Closest stored configuration, lowest id on ties
    fn nearest(&self, space: &ConfigurationSpace, q: &Configuration) -> Option<usize>;

    /// All ids within `radius` of `q`, ascending
    fn near(&self, space: &ConfigurationSpace, q: &Configuration, radius: f64) -> Vec<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which index a tree should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NeighborIndexKind {
    #[default]
    Linear,
    KdTree,
}

/// Brute-force O(n) scan, the reference implementation
#[derive(Debug, Clone, Default)]
pub struct LinearIndex {
    points: Vec<Configuration>,
}

impl LinearIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NearestNeighbors for LinearIndex {
    fn insert(&mut self, q: Configuration) -> usize {
        self.points.push(q);
        self.points.len() - 1
    }

    fn nearest(&self, space: &ConfigurationSpace, q: &Configuration) -> Option<usize> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, space.distance(p, q)))
            .min_by_key(|&(i, d)| (OrderedFloat(d), i))
            .map(|(i, _)| i)
    }

    fn near(&self, space: &ConfigurationSpace, q: &Configuration, radius: f64) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| space.distance(p, q) <= radius)
            .map(|(i, _)| i)
            .collect()
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

#[derive(Debug, Clone)]
struct KdNode {
    point: Configuration,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Incrementally built k-d tree; search is iterative so deep trees do not overflow the stack
#[derive(Debug, Clone, Default)]
pub struct KdTreeIndex {
    nodes: Vec<KdNode>,
}

impl KdTreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower bound of the metric distance from `q` to anything across the split of `node`
    fn split_gap(space: &ConfigurationSpace, node: &KdNode, q: &Configuration) -> (f64, bool) {
        let diff = q[node.axis] - node.point[node.axis];
        let gap = diff.abs() * space.weights()[node.axis].sqrt();
        (gap, diff < 0.0)
    }
}

impl NearestNeighbors for KdTreeIndex {
    fn insert(&mut self, q: Configuration) -> usize {
        let id = self.nodes.len();
        let dim = q.dof().max(1);
        let mut axis = 0;
        if !self.nodes.is_empty() {
            let mut cur = 0;
            loop {
                let node = &self.nodes[cur];
                let go_left = q[node.axis] < node.point[node.axis];
                let child = if go_left { node.left } else { node.right };
                match child {
                    Some(next) => cur = next,
                    None => {
                        axis = (node.axis + 1) % dim;
                        if go_left {
                            self.nodes[cur].left = Some(id);
                        } else {
                            self.nodes[cur].right = Some(id);
                        }
                        break;
                    }
                }
            }
        }
        self.nodes.push(KdNode { point: q, axis, left: None, right: None });
        id
    }

    fn nearest(&self, space: &ConfigurationSpace, q: &Configuration) -> Option<usize> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best: Option<(f64, usize)> = None;
        let mut stack = vec![(0usize, 0.0f64)];
        while let Some((i, bound)) = stack.pop() {
            if let Some((best_d, _)) = best {
                if bound > best_d {
                    continue;
                }
            }
            let node = &self.nodes[i];
            let d = space.distance(&node.point, q);
            let better = match best {
                None => true,
                Some((best_d, best_i)) => d < best_d || (d == best_d && i < best_i),
            };
            if better {
                best = Some((d, i));
            }
            let (gap, query_left) = Self::split_gap(space, node, q);
            let (near, far) = if query_left {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };
            if let Some(far) = far {
                stack.push((far, bound.max(gap)));
            }
            if let Some(near) = near {
                stack.push((near, bound));
            }
        }
        best.map(|(_, i)| i)
    }

    fn near(&self, space: &ConfigurationSpace, q: &Configuration, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        if self.nodes.is_empty() {
            return found;
        }
        let mut stack = vec![0usize];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            if space.distance(&node.point, q) <= radius {
                found.push(i);
            }
            let (gap, query_left) = Self::split_gap(space, node, q);
            let (near, far) = if query_left {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };
            if let Some(near) = near {
                stack.push(near);
            }
            if gap <= radius {
                if let Some(far) = far {
                    stack.push(far);
                }
            }
        }
        found.sort_unstable();
        found
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Closed set of index implementations selected at runtime
#[derive(Debug, Clone)]
pub enum NeighborIndex {
    Linear(LinearIndex),
    KdTree(KdTreeIndex),
}

impl NeighborIndex {
    pub fn new(kind: NeighborIndexKind) -> Self {
        match kind {
            NeighborIndexKind::Linear => NeighborIndex::Linear(LinearIndex::new()),
            NeighborIndexKind::KdTree => NeighborIndex::KdTree(KdTreeIndex::new()),
        }
    }
}

impl NearestNeighbors for NeighborIndex {
    fn insert(&mut self, q: Configuration) -> usize {
        match self {
            NeighborIndex::Linear(index) => index.insert(q),
            NeighborIndex::KdTree(index) => index.insert(q),
        }
    }

    fn nearest(&self, space: &ConfigurationSpace, q: &Configuration) -> Option<usize> {
        match self {
            NeighborIndex::Linear(index) => index.nearest(space, q),
            NeighborIndex::KdTree(index) => index.nearest(space, q),
        }
    }

    fn near(&self, space: &ConfigurationSpace, q: &Configuration, radius: f64) -> Vec<usize> {
        match self {
            NeighborIndex::Linear(index) => index.near(space, q, radius),
            NeighborIndex::KdTree(index) => index.near(space, q, radius),
        }
    }

    fn len(&self) -> usize {
        match self {
            NeighborIndex::Linear(index) => index.len(),
            NeighborIndex::KdTree(index) => index.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::JointBounds;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn q(values: &[f64]) -> Configuration {
        Configuration::from_slice(values)
    }

    #[test]
    fn test_empty_index() {
        let space = ConfigurationSpace::new(vec![JointBounds::symmetric(1.0); 2]).unwrap();
        for index in [NeighborIndex::new(NeighborIndexKind::Linear), NeighborIndex::new(NeighborIndexKind::KdTree)] {
            assert!(index.is_empty());
            assert_eq!(index.nearest(&space, &q(&[0.0, 0.0])), None);
            assert!(index.near(&space, &q(&[0.0, 0.0]), 1.0).is_empty());
        }
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let space = ConfigurationSpace::new(vec![JointBounds::symmetric(5.0); 2]).unwrap();
        for kind in [NeighborIndexKind::Linear, NeighborIndexKind::KdTree] {
            let mut index = NeighborIndex::new(kind);
            index.insert(q(&[3.0, 3.0]));
            index.insert(q(&[1.0, 0.0]));
            index.insert(q(&[-1.0, 0.0]));
            index.insert(q(&[0.0, 1.0]));
            assert_eq!(index.nearest(&space, &q(&[0.0, 0.0])), Some(1), "{:?}", kind);
        }
    }

    #[test]
    fn test_kd_tree_matches_linear_scan() {
        let space = ConfigurationSpace::new(vec![JointBounds::symmetric(3.0); 3])
            .unwrap()
            .with_weights(vec![1.0, 2.0, 0.5])
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut linear = LinearIndex::new();
        let mut kd = KdTreeIndex::new();
        for _ in 0..500 {
            let p = space.sample(&mut rng);
            assert_eq!(linear.insert(p.clone()), kd.insert(p));
        }
        for _ in 0..200 {
            let query = space.sample(&mut rng);
            assert_eq!(linear.nearest(&space, &query), kd.nearest(&space, &query));
            assert_eq!(linear.near(&space, &query, 0.8), kd.near(&space, &query, 0.8));
        }
    }

    #[test]
    fn test_near_is_inclusive_and_sorted() {
        let space = ConfigurationSpace::new(vec![JointBounds::symmetric(5.0)]).unwrap();
        let mut index = KdTreeIndex::new();
        for v in [2.0, -1.0, 1.0, 0.5, 4.0] {
            index.insert(q(&[v]));
        }
        assert_eq!(index.near(&space, &q(&[0.0]), 1.0), vec![1, 2, 3]);
    }
}

//! Arena-allocated search tree
//!
//! Nodes are addressed by stable index and never removed; the parent link is
//! an index, so walking back to the root is a simple loop.

use crate::common::Configuration;
use crate::motion_planning::nearest_neighbor::{NearestNeighbors, NeighborIndex, NeighborIndexKind};
use crate::motion_planning::ConfigurationSpace;

/// Internal node of a search tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub config: Configuration,
    pub parent: Option<usize>,
    /// Cost-to-come from the root along parent links
    pub cost: f64,
}

/// Search tree with its nearest-neighbor index
#[derive(Debug, Clone)]
pub struct Tree {
    name: &'static str,
    nodes: Vec<TreeNode>,
    index: NeighborIndex,
}

impl Tree {
    pub fn new(name: &'static str, kind: NeighborIndexKind) -> Self {
        Self {
            name,
            nodes: Vec::new(),
            index: NeighborIndex::new(kind),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: usize) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Add a parentless node; a tree may have several roots (one per goal candidate)
    pub fn add_root(&mut self, config: Configuration) -> usize {
        self.push(TreeNode { config, parent: None, cost: 0.0 })
    }

    /// Add `config` as a child of `parent`
    pub fn add_node(&mut self, space: &ConfigurationSpace, config: Configuration, parent: usize) -> usize {
        let cost = self.cost_through(space, parent, &config);
        self.push(TreeNode { config, parent: Some(parent), cost })
    }

    /// Re-attach a node to a cheaper parent
    pub fn set_parent(&mut self, id: usize, parent: usize, cost: f64) {
        self.nodes[id].parent = Some(parent);
        self.nodes[id].cost = cost;
    }

    /// Cost of reaching `config` through node `via`
    pub fn cost_through(&self, space: &ConfigurationSpace, via: usize, config: &Configuration) -> f64 {
        let node = &self.nodes[via];
        node.cost + space.distance(&node.config, config)
    }

    pub fn nearest(&self, space: &ConfigurationSpace, q: &Configuration) -> Option<usize> {
        self.index.nearest(space, q)
    }

    pub fn near(&self, space: &ConfigurationSpace, q: &Configuration, radius: f64) -> Vec<usize> {
        self.index.near(space, q, radius)
    }

    /// Configurations from node `id` back to its root, `id` first
    pub fn path_to_root(&self, id: usize) -> Vec<Configuration> {
        let mut configs = Vec::new();
        let mut cur = Some(id);
        while let Some(i) = cur {
            let node = &self.nodes[i];
            configs.push(node.config.clone());
            cur = node.parent;
        }
        configs
    }

    fn push(&mut self, node: TreeNode) -> usize {
        let index_id = self.index.insert(node.config.clone());
        self.nodes.push(node);
        debug_assert_eq!(index_id, self.nodes.len() - 1);
        index_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::JointBounds;
    use approx::assert_relative_eq;

    fn q(x: f64, y: f64) -> Configuration {
        Configuration::from_slice(&[x, y])
    }

    #[test]
    fn test_path_to_root_and_costs() {
        let space = ConfigurationSpace::new(vec![JointBounds::symmetric(5.0); 2]).unwrap();
        let mut tree = Tree::new("start", NeighborIndexKind::Linear);
        let root = tree.add_root(q(0.0, 0.0));
        let a = tree.add_node(&space, q(1.0, 0.0), root);
        let b = tree.add_node(&space, q(1.0, 1.0), a);
        assert_relative_eq!(tree.node(b).cost, 2.0);
        assert_eq!(tree.path_to_root(b), vec![q(1.0, 1.0), q(1.0, 0.0), q(0.0, 0.0)]);
        assert_eq!(tree.nearest(&space, &q(0.9, 0.2)), Some(a));
    }

    #[test]
    fn test_multiple_roots() {
        let space = ConfigurationSpace::new(vec![JointBounds::symmetric(5.0); 2]).unwrap();
        let mut tree = Tree::new("goal", NeighborIndexKind::KdTree);
        tree.add_root(q(1.0, 1.0));
        let second = tree.add_root(q(-1.0, 1.0));
        let child = tree.add_node(&space, q(-1.0, 0.5), second);
        assert_eq!(tree.path_to_root(child).last(), Some(&q(-1.0, 1.0)));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.name(), "goal");
    }

    #[test]
    fn test_reparent() {
        let space = ConfigurationSpace::new(vec![JointBounds::symmetric(5.0); 2]).unwrap();
        let mut tree = Tree::new("start", NeighborIndexKind::Linear);
        let root = tree.add_root(q(0.0, 0.0));
        let detour = tree.add_node(&space, q(0.0, 2.0), root);
        let leaf = tree.add_node(&space, q(1.0, 2.0), detour);
        let cost = tree.cost_through(&space, root, &q(1.0, 2.0));
        tree.set_parent(leaf, root, cost);
        assert_eq!(tree.path_to_root(leaf).len(), 2);
        assert_relative_eq!(tree.node(leaf).cost, 5.0_f64.sqrt());
    }
}

//! Node arena and incumbent for one branch-and-bound run.

use super::node::{BbNode, BoundChange, NodeStatus};

/// Best integer-feasible point found so far.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Incumbent {
    pub x: Vec<f64>,
    pub objective: f64,
    /// Node that produced it.
    pub node: usize,
}

/// Every node created during the search, in creation order, plus the incumbent.
///
/// Parents are referenced by arena index only, so the tree can be walked from
/// any node back to the root and serialized without reference cycles.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTree {
    nodes: Vec<BbNode>,
    incumbent: Option<Incumbent>,
    maximize: bool,
}

impl SearchTree {
    /// Create a tree holding only the root node.
    pub fn new(maximize: bool) -> Self {
        Self {
            nodes: vec![BbNode::root()],
            incumbent: None,
            maximize,
        }
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn nodes(&self) -> &[BbNode] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> &BbNode {
        &self.nodes[id]
    }

    pub fn incumbent(&self) -> Option<&Incumbent> {
        self.incumbent.as_ref()
    }

    pub fn incumbent_objective(&self) -> Option<f64> {
        self.incumbent.as_ref().map(|i| i.objective)
    }

    /// Append a child of `parent` and return its index.
    pub fn add_child(&mut self, parent: usize, change: BoundChange) -> usize {
        let id = self.nodes.len();
        let child = self.nodes[parent].child(id, change);
        self.nodes.push(child);
        id
    }

    pub fn set_status(&mut self, id: usize, status: NodeStatus) {
        self.nodes[id].status = status;
    }

    pub fn set_bound(&mut self, id: usize, bound: f64) {
        self.nodes[id].bound = Some(bound);
    }

    /// Replace the incumbent if `objective` is strictly better.
    ///
    /// Returns true if the incumbent changed; the incumbent never worsens.
    pub fn update_incumbent(&mut self, node: usize, x: Vec<f64>, objective: f64) -> bool {
        let improves = match self.incumbent_objective() {
            None => true,
            Some(best) if self.maximize => objective > best,
            Some(best) => objective < best,
        };
        if improves {
            self.incumbent = Some(Incumbent { x, objective, node });
        }
        improves
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_links() {
        let mut tree = SearchTree::new(true);
        tree.set_bound(0, 10.0);
        let a = tree.add_child(0, BoundChange::down(0, 1.5));
        let b = tree.add_child(0, BoundChange::up(0, 1.5));
        let c = tree.add_child(b, BoundChange::down(1, 0.5));

        assert_eq!(tree.nodes().len(), 4);
        assert_eq!(tree.node(a).parent, Some(0));
        assert_eq!(tree.node(c).depth, 2);
        assert_eq!(tree.node(c).parent_bound, None);
        assert_eq!(tree.node(a).parent_bound, Some(10.0));
        assert_eq!(tree.count(NodeStatus::Active), 4);
    }

    #[test]
    fn test_incumbent_monotone_for_maximize() {
        let mut tree = SearchTree::new(true);
        assert!(tree.update_incumbent(0, vec![1.0], 5.0));
        assert!(!tree.update_incumbent(1, vec![0.0], 3.0));
        assert!(!tree.update_incumbent(2, vec![2.0], 5.0));
        assert!(tree.update_incumbent(3, vec![3.0], 7.0));
        assert_eq!(tree.incumbent_objective(), Some(7.0));
        assert_eq!(tree.incumbent().map(|i| i.node), Some(3));
    }

    #[test]
    fn test_incumbent_monotone_for_minimize() {
        let mut tree = SearchTree::new(false);
        assert!(tree.update_incumbent(0, vec![1.0], 5.0));
        assert!(!tree.update_incumbent(1, vec![2.0], 6.0));
        assert_eq!(tree.incumbent_objective(), Some(5.0));
    }
}

//! Search node representation.

use std::fmt;

use crate::problem::VarBounds;

/// Status of a search node.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Node is waiting to be processed.
    Active,

    /// Node bound was no better than the incumbent.
    PrunedBound,

    /// Node LP relaxation is infeasible.
    PrunedInfeasible,

    /// Node produced an integer-feasible solution.
    IntegerFeasible,

    /// Node was branched (children created).
    Branched,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Active => "active",
            NodeStatus::PrunedBound => "pruned-bound",
            NodeStatus::PrunedInfeasible => "pruned-infeasible",
            NodeStatus::IntegerFeasible => "integer-feasible",
            NodeStatus::Branched => "branched",
        }
    }
}

/// Direction of a branching bound.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSense {
    /// `x <= threshold`
    #[cfg_attr(feature = "serde", serde(rename = "<="))]
    Le,
    /// `x >= threshold`
    #[cfg_attr(feature = "serde", serde(rename = ">="))]
    Ge,
}

/// A bound added by branching.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundChange {
    /// Variable index.
    pub var: usize,

    pub sense: BoundSense,

    pub threshold: f64,
}

impl BoundChange {
    /// Create a "down" branch: x <= floor(value).
    pub fn down(var: usize, value: f64) -> Self {
        Self {
            var,
            sense: BoundSense::Le,
            threshold: value.floor(),
        }
    }

    /// Create an "up" branch: x >= ceil(value).
    pub fn up(var: usize, value: f64) -> Self {
        Self {
            var,
            sense: BoundSense::Ge,
            threshold: value.ceil(),
        }
    }

    /// Tighten `bounds` with this change.
    pub fn apply(&self, bounds: &mut VarBounds) {
        match self.sense {
            BoundSense::Le => {
                bounds.upper = Some(bounds.upper.map_or(self.threshold, |u| u.min(self.threshold)));
            }
            BoundSense::Ge => bounds.lower = bounds.lower.max(self.threshold),
        }
    }
}

impl fmt::Display for BoundChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.sense {
            BoundSense::Le => "<=",
            BoundSense::Ge => ">=",
        };
        write!(f, "x{} {} {}", self.var, op, self.threshold)
    }
}

/// A node in the B&B search tree.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BbNode {
    /// Index of this node in the tree arena.
    pub id: usize,

    /// Arena index of the parent (None for root).
    pub parent: Option<usize>,

    /// Depth in the tree (0 for root).
    pub depth: usize,

    /// Bounds added on the path from the root, oldest first.
    pub bound_changes: Vec<BoundChange>,

    /// Relaxation bound of the parent, known before this node is solved.
    pub parent_bound: Option<f64>,

    /// Relaxation objective of this node, once solved.
    pub bound: Option<f64>,

    /// Node processing status.
    pub status: NodeStatus,
}

impl BbNode {
    /// Create the root node.
    pub fn root() -> Self {
        Self {
            id: 0,
            parent: None,
            depth: 0,
            bound_changes: Vec::new(),
            parent_bound: None,
            bound: None,
            status: NodeStatus::Active,
        }
    }

    /// Create a child node that adds one bound change.
    pub fn child(&self, id: usize, change: BoundChange) -> Self {
        let mut bound_changes = self.bound_changes.clone();
        bound_changes.push(change);
        Self {
            id,
            parent: Some(self.id),
            depth: self.depth + 1,
            bound_changes,
            parent_bound: self.bound,
            bound: None,
            status: NodeStatus::Active,
        }
    }

    /// The branching decision that created this node, e.g. `x1 <= 3`.
    pub fn decision(&self) -> String {
        self.bound_changes
            .last()
            .map_or_else(|| "Root".to_string(), |c| c.to_string())
    }
}

//! Wire response types.

use orkit_solver::{BbNode, BranchStatus, CuttingStockStatus, LagrangianStatus, NodeStatus, SolutionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpResponse {
    pub success: bool,
    pub status: SolutionStatus,
    pub message: String,
    pub fun: Option<f64>,
    pub x: Option<Vec<f64>>,
    pub duals: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
}

/// A search tree node as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub depth: usize,
    /// Branching decision, e.g. `x0 <= 2`, or `Root`.
    pub decision: String,
    pub bound: Option<f64>,
    pub status: NodeStatus,
}

impl From<&BbNode> for TreeNode {
    fn from(node: &BbNode) -> Self {
        Self {
            id: node.id,
            parent: node.parent,
            depth: node.depth,
            decision: node.decision(),
            bound: node.bound,
            status: node.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpResponse {
    pub success: bool,
    pub status: BranchStatus,
    pub fun: Option<f64>,
    pub x: Option<Vec<f64>>,
    pub root_bound: Option<f64>,
    pub nodes_explored: usize,
    pub tree: Vec<TreeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_plot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGenerationResponse {
    pub status: CuttingStockStatus,
    pub objective: f64,
    pub patterns: Vec<Vec<u32>>,
    pub solution: Vec<f64>,
    pub logs: Vec<String>,
    pub objective_history: Vec<f64>,
    pub rounded_solution: Vec<u64>,
    pub rounded_objective: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagrangianResponse {
    pub status: LagrangianStatus,
    pub lb_history: Vec<f64>,
    pub ub: Option<f64>,
    pub best_solution: Option<Vec<Vec<u8>>>,
    pub multipliers: Vec<f64>,
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticResponse {
    pub success: bool,
    pub expected_profit: Option<f64>,
    pub x: Option<Vec<f64>>,
    pub scenario_profits: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self { status: "ok".to_string() }
    }
}

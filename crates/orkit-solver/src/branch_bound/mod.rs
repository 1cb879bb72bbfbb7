//! Branch-and-bound over LP relaxations.
//!
//! Nodes are explored depth-first from an explicit stack. Branching uses the
//! first fractional integer variable (lowest index). Of the two children, the
//! one on the side nearer the fractional value is explored first: the down
//! child (`x <= floor`) when the fractional part is below 0.5, otherwise the
//! up child (`x >= ceil`). Both choices shape the reported tree, so they are
//! fixed rather than tunable.

mod node;
mod tree;

pub use node::{BbNode, BoundChange, BoundSense, NodeStatus};
pub use tree::{Incumbent, SearchTree};

use std::fmt;

use log::{debug, info, warn};

use crate::error::ProblemError;
use crate::problem::LinearProgram;
use crate::settings::{BranchSettings, Deadline, LpSettings};
use crate::simplex::Solver;
use crate::solution::SolutionStatus;

/// Outcome of a branch-and-bound run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    /// The incumbent is proven optimal.
    Optimal,

    /// No integer-feasible point exists.
    Infeasible,

    /// The root relaxation is unbounded.
    Unbounded,

    /// Node budget exhausted, or a relaxation could not be solved.
    IterationLimit,

    /// Wall-clock limit reached.
    Timeout,
}

impl BranchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchStatus::Optimal => "optimal",
            BranchStatus::Infeasible => "infeasible",
            BranchStatus::Unbounded => "unbounded",
            BranchStatus::IterationLimit => "iteration-limit",
            BranchStatus::Timeout => "timeout",
        }
    }
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a branch-and-bound run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BranchResult {
    pub status: BranchStatus,

    /// Objective of the incumbent, in the problem's own sense.
    pub objective: Option<f64>,

    /// Incumbent point; integer-flagged entries are exact integers.
    pub x: Option<Vec<f64>>,

    /// Objective of the root relaxation, when it was solved to optimality.
    pub root_bound: Option<f64>,

    /// Nodes taken off the stack.
    pub nodes_explored: usize,

    /// Relaxations that hit the simplex pivot cap or failed numerically.
    pub lp_failures: usize,

    pub tree: SearchTree,
}

/// Branch-and-bound controller.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBound {
    settings: BranchSettings,
    lp: Solver,
}

impl BranchAndBound {
    pub fn new(settings: BranchSettings, lp_settings: LpSettings) -> Self {
        Self {
            settings,
            lp: Solver::with_settings(lp_settings),
        }
    }

    pub fn with_max_nodes(mut self, nodes: usize) -> Self {
        self.settings.max_nodes = nodes;
        self
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.settings.time_limit_ms = Some(ms);
        self
    }

    /// Solve `problem` respecting its integrality flags.
    pub fn solve(&self, problem: &LinearProgram) -> Result<BranchResult, ProblemError> {
        problem.validate()?;

        let tol = self.settings.prune_tolerance;
        let deadline = Deadline::after_ms(self.settings.time_limit_ms);
        let mut tree = SearchTree::new(problem.maximize);
        let mut stack = vec![tree.root()];
        let mut nodes_explored = 0;
        let mut lp_failures = 0;
        let mut root_bound = None;
        let mut stopped = None;

        while let Some(id) = stack.pop() {
            if nodes_explored >= self.settings.max_nodes {
                stopped = Some(BranchStatus::IterationLimit);
                break;
            }
            if deadline.expired() {
                stopped = Some(BranchStatus::Timeout);
                break;
            }
            nodes_explored += 1;

            // The parent's bound already caps this subtree
            if let (Some(parent_bound), Some(best)) = (tree.node(id).parent_bound, tree.incumbent_objective()) {
                if !problem.is_better(parent_bound, best, tol) {
                    tree.set_status(id, NodeStatus::PrunedBound);
                    continue;
                }
            }

            let Some(relaxation) = self.relaxation(problem, tree.node(id)) else {
                tree.set_status(id, NodeStatus::PrunedInfeasible);
                continue;
            };
            let solution = self.lp.solve(&relaxation)?;

            match solution.status {
                SolutionStatus::Optimal => {}
                SolutionStatus::Infeasible => {
                    tree.set_status(id, NodeStatus::PrunedInfeasible);
                    continue;
                }
                SolutionStatus::Unbounded if id == tree.root() => {
                    info!("branch-and-bound: root relaxation is unbounded");
                    return Ok(BranchResult {
                        status: BranchStatus::Unbounded,
                        objective: None,
                        x: None,
                        root_bound: None,
                        nodes_explored,
                        lp_failures,
                        tree,
                    });
                }
                status => {
                    warn!("branch-and-bound: node {id} relaxation ended with {status}");
                    lp_failures += 1;
                    tree.set_status(id, NodeStatus::PrunedInfeasible);
                    continue;
                }
            }

            let bound = solution.objective_value;
            tree.set_bound(id, bound);
            if id == tree.root() {
                root_bound = Some(bound);
            }

            if let Some(best) = tree.incumbent_objective() {
                if !problem.is_better(bound, best, tol) {
                    tree.set_status(id, NodeStatus::PrunedBound);
                    continue;
                }
            }

            match self.first_fractional(problem, &solution.values) {
                None => {
                    let x = self.round_integers(problem, solution.values);
                    let objective = problem.evaluate(&x);
                    tree.set_status(id, NodeStatus::IntegerFeasible);
                    if tree.update_incumbent(id, x, objective) {
                        info!("branch-and-bound: new incumbent {objective:.6} at node {id}");
                    }
                }
                Some(var) => {
                    let value = solution.values[var];
                    let down = tree.add_child(id, BoundChange::down(var, value));
                    let up = tree.add_child(id, BoundChange::up(var, value));
                    tree.set_status(id, NodeStatus::Branched);
                    debug!("branch-and-bound: node {id} bound {bound:.6} branches on x{var} = {value:.6}");

                    // Stack is LIFO: push the side to explore first last
                    if value - value.floor() < 0.5 {
                        stack.push(up);
                        stack.push(down);
                    } else {
                        stack.push(down);
                        stack.push(up);
                    }
                }
            }
        }

        let status = match stopped {
            Some(status) => status,
            None if lp_failures > 0 => BranchStatus::IterationLimit,
            None if tree.incumbent().is_some() => BranchStatus::Optimal,
            None => BranchStatus::Infeasible,
        };
        info!(
            "branch-and-bound: {status} after {nodes_explored} nodes ({} created, {} pruned by bound)",
            tree.nodes().len(),
            tree.count(NodeStatus::PrunedBound)
        );

        Ok(BranchResult {
            status,
            objective: tree.incumbent_objective(),
            x: tree.incumbent().map(|i| i.x.clone()),
            root_bound,
            nodes_explored,
            lp_failures,
            tree,
        })
    }

    /// The base problem with the node's bound changes applied, or None if
    /// they leave some variable with an empty domain.
    fn relaxation(&self, problem: &LinearProgram, node: &BbNode) -> Option<LinearProgram> {
        let mut relaxed = problem.clone();
        for change in &node.bound_changes {
            let bounds = &mut relaxed.bounds[change.var];
            change.apply(bounds);
            if bounds.is_empty(self.settings.integrality_tolerance) {
                return None;
            }
        }
        Some(relaxed)
    }

    /// Index of the first integer-flagged variable with a fractional value.
    fn first_fractional(&self, problem: &LinearProgram, x: &[f64]) -> Option<usize> {
        problem
            .integer
            .iter()
            .zip(x)
            .position(|(&is_int, &v)| is_int && (v - v.round()).abs() > self.settings.integrality_tolerance)
    }

    fn round_integers(&self, problem: &LinearProgram, mut x: Vec<f64>) -> Vec<f64> {
        for (v, &is_int) in x.iter_mut().zip(&problem.integer) {
            if is_int {
                *v = v.round() + 0.0;
            }
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knapsack_like() -> LinearProgram {
        // max 5x + 8y s.t. x + y <= 6, 5x + 9y <= 45
        LinearProgram::from_dense(
            vec![5.0, 8.0],
            vec![vec![1.0, 1.0], vec![5.0, 9.0]],
            vec![6.0, 45.0],
            true,
        )
        .unwrap()
        .all_integer()
    }

    #[test]
    fn test_small_integer_program() {
        let result = BranchAndBound::default().solve(&knapsack_like()).unwrap();

        assert_eq!(result.status, BranchStatus::Optimal);
        assert_eq!(result.x, Some(vec![0.0, 5.0]));
        assert_eq!(result.objective, Some(40.0));
        let root = result.root_bound.unwrap();
        assert!((root - 41.25).abs() < 1e-6, "root bound {root}");
    }

    #[test]
    fn test_tree_shape_is_deterministic() {
        let a = BranchAndBound::default().solve(&knapsack_like()).unwrap();
        let b = BranchAndBound::default().solve(&knapsack_like()).unwrap();
        assert_eq!(a.tree, b.tree);

        let tree = &a.tree;
        assert_eq!(tree.node(0).status, NodeStatus::Branched);
        // Root branches on x0 = 2.25; the down child is explored first
        assert_eq!(tree.node(1).decision(), "x0 <= 2");
        assert_eq!(tree.node(2).decision(), "x0 >= 3");
        for node in tree.nodes().iter().skip(1) {
            let parent = node.parent.unwrap();
            assert!(parent < node.id);
            assert_eq!(tree.node(parent).status, NodeStatus::Branched);
        }
        assert!(tree.count(NodeStatus::IntegerFeasible) >= 1);
        assert_eq!(tree.count(NodeStatus::Active), 0);
    }

    #[test]
    fn test_objective_bounded_by_root_relaxation() {
        let problems = vec![
            knapsack_like(),
            LinearProgram::from_dense(
                vec![4.0, 3.0, 5.0],
                vec![vec![2.0, 3.0, 1.0], vec![4.0, 1.0, 2.0], vec![3.0, 4.0, 2.0]],
                vec![5.5, 11.2, 8.3],
                true,
            )
            .unwrap()
            .all_integer(),
            LinearProgram::from_dense(
                vec![3.0, 5.0],
                vec![vec![-2.0, -3.0], vec![-4.0, -1.0]],
                vec![-7.5, -6.2],
                false,
            )
            .unwrap()
            .all_integer(),
        ];

        for problem in problems {
            let result = BranchAndBound::default().solve(&problem).unwrap();
            assert_eq!(result.status, BranchStatus::Optimal);
            let objective = result.objective.unwrap();
            let root = result.root_bound.unwrap();
            assert!(problem.is_no_worse(root, objective, 1e-6), "root {root} vs objective {objective}");

            let x = result.x.unwrap();
            assert!(problem.is_feasible(&x, 1e-6));
            for v in &x {
                assert!((v - v.round()).abs() < 1e-9, "{v} is not integral");
            }
        }
    }

    #[test]
    fn test_mixed_integrality() {
        // max x + y, x + y <= 2.5, only x integer: y picks up the fraction
        let problem = LinearProgram::from_dense(vec![1.0, 1.0], vec![vec![1.0, 1.0], vec![1.0, 0.0]], vec![2.5, 1.5], true)
            .unwrap()
            .with_integrality(vec![true, false]);

        let result = BranchAndBound::default().solve(&problem).unwrap();
        assert_eq!(result.status, BranchStatus::Optimal);
        assert!((result.objective.unwrap() - 2.5).abs() < 1e-6);
        let x = result.x.unwrap();
        assert_eq!(x[0], x[0].round());
    }

    #[test]
    fn test_infeasible_integer_program() {
        // 0.2 <= x <= 0.8 has no integer point
        let problem = LinearProgram::from_dense(vec![1.0], vec![vec![1.0], vec![-1.0]], vec![0.8, -0.2], true)
            .unwrap()
            .all_integer();

        let result = BranchAndBound::default().solve(&problem).unwrap();
        assert_eq!(result.status, BranchStatus::Infeasible);
        assert!(result.x.is_none());
        assert_eq!(result.tree.node(0).status, NodeStatus::Branched);
    }

    #[test]
    fn test_unbounded_root() {
        let problem = LinearProgram::new(vec![1.0], true).all_integer();
        let result = BranchAndBound::default().solve(&problem).unwrap();
        assert_eq!(result.status, BranchStatus::Unbounded);
    }

    #[test]
    fn test_node_limit_keeps_incumbent() {
        // A knapsack that needs many nodes
        let weights: Vec<f64> = (0..15).map(|i| 10.0 + i as f64).collect();
        let values: Vec<f64> = weights.iter().map(|w| w + 5.0).collect();
        let capacity = (weights.iter().sum::<f64>() * 0.5).floor();
        let mut problem = LinearProgram::from_dense(values, vec![weights], vec![capacity], true).unwrap().all_integer();
        for j in 0..15 {
            problem.set_bounds(j, crate::problem::VarBounds::new(0.0, Some(1.0)));
        }

        let result = BranchAndBound::default().with_max_nodes(10).solve(&problem).unwrap();
        assert_eq!(result.status, BranchStatus::IterationLimit);
        assert_eq!(result.nodes_explored, 10);
        if let Some(x) = &result.x {
            assert!(problem.is_feasible(x, 1e-6));
        }
    }

    #[test]
    fn test_timeout() {
        let result = BranchAndBound::default().with_time_limit_ms(0).solve(&knapsack_like()).unwrap();
        assert_eq!(result.status, BranchStatus::Timeout);
        assert_eq!(result.nodes_explored, 0);
    }

    #[test]
    fn test_continuous_problem_is_single_node() {
        let problem = LinearProgram::from_dense(vec![1.0, 1.0], vec![vec![2.0, 1.0]], vec![3.0], true).unwrap();
        let result = BranchAndBound::default().solve(&problem).unwrap();
        assert_eq!(result.status, BranchStatus::Optimal);
        assert_eq!(result.tree.nodes().len(), 1);
        assert_eq!(result.tree.node(0).status, NodeStatus::IntegerFeasible);
    }
}

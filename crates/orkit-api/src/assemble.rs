//! Packaging engine results into wire responses, with optional plots.
//!
//! Plots are described as numeric series ([`PlotSpec`]) and handed to a
//! [`PlotRenderer`]; this crate never draws anything itself.

use orkit_solver::{
    BranchResult, CuttingStockResult, LagrangianResult, LinearProgram, Solution, StochasticInstance,
    StochasticResult,
};
use serde::Serialize;

use crate::response::{
    ColumnGenerationResponse, IpResponse, LagrangianResponse, LpResponse, StochasticResponse, TreeNode,
};

/// Trees larger than this are not plotted.
pub const MAX_PLOT_NODES: usize = 50;

/// Data for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlotSpec {
    /// Two-variable LP: constraint lines `a1·x1 + a2·x2 <= b`, objective
    /// direction and the optimum, drawn on `[0, limit]²`.
    FeasibleRegion {
        constraints: Vec<[f64; 3]>,
        objective: [f64; 2],
        optimum: [f64; 2],
        maximize: bool,
        limit: f64,
    },
    SearchTree {
        nodes: Vec<TreeNode>,
    },
    Convergence {
        lower_bounds: Vec<f64>,
        upper_bound: Option<f64>,
    },
    ScenarioProfits {
        acres: Vec<f64>,
        scenarios: Vec<String>,
        profits: Vec<f64>,
        expected_profit: f64,
    },
}

/// Turns a plot description into an encoded image (e.g. base64 PNG or SVG).
///
/// Returning `None` declines the plot, and the response omits the field.
pub trait PlotRenderer {
    fn render(&self, spec: &PlotSpec) -> Option<String>;
}

/// Builds responses from engine results.
#[derive(Clone, Copy, Default)]
pub struct ResultAssembler<'a> {
    renderer: Option<&'a dyn PlotRenderer>,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(renderer: Option<&'a dyn PlotRenderer>) -> Self {
        Self { renderer }
    }

    fn render(&self, spec: impl FnOnce() -> PlotSpec) -> Option<String> {
        self.renderer.and_then(|r| r.render(&spec()))
    }

    pub fn lp(&self, program: &LinearProgram, solution: Solution) -> LpResponse {
        let success = solution.status.is_optimal();
        let plot = if success && program.num_variables() == 2 {
            self.render(|| feasible_region(program, &solution.values))
        } else {
            None
        };
        LpResponse {
            success,
            status: solution.status,
            message: solution.status.message().to_string(),
            fun: solution.objective(),
            x: success.then(|| solution.values.clone()),
            duals: success.then_some(solution.duals),
            plot,
        }
    }

    pub fn ip(&self, result: BranchResult) -> IpResponse {
        let tree: Vec<TreeNode> = result.tree.nodes().iter().map(TreeNode::from).collect();
        let tree_plot = if tree.len() <= MAX_PLOT_NODES {
            self.render(|| PlotSpec::SearchTree { nodes: tree.clone() })
        } else {
            None
        };
        IpResponse {
            success: result.x.is_some(),
            status: result.status,
            fun: result.objective,
            x: result.x,
            root_bound: result.root_bound,
            nodes_explored: result.nodes_explored,
            tree,
            tree_plot,
        }
    }

    pub fn column_generation(&self, result: CuttingStockResult) -> ColumnGenerationResponse {
        ColumnGenerationResponse {
            status: result.status,
            objective: result.objective,
            patterns: result.patterns,
            solution: result.solution,
            logs: result.logs,
            objective_history: result.objective_history,
            rounded_solution: result.rounded_solution,
            rounded_objective: result.rounded_objective,
        }
    }

    pub fn lagrangian(&self, result: LagrangianResult) -> LagrangianResponse {
        let plot = self.render(|| PlotSpec::Convergence {
            lower_bounds: result.lb_history.clone(),
            upper_bound: result.ub,
        });
        LagrangianResponse {
            status: result.status,
            lb_history: result.lb_history,
            ub: result.ub,
            best_solution: result.best_solution,
            multipliers: result.multipliers,
            logs: result.logs,
            plot,
        }
    }

    pub fn stochastic(&self, instance: &StochasticInstance, result: StochasticResult) -> StochasticResponse {
        let success = result.success();
        let plot = match result.expected_profit {
            Some(expected_profit) => self.render(|| PlotSpec::ScenarioProfits {
                acres: result.x.clone(),
                scenarios: instance.scenarios.iter().map(|s| s.name.clone()).collect(),
                profits: result.scenario_profits.clone(),
                expected_profit,
            }),
            None => None,
        };
        StochasticResponse {
            success,
            expected_profit: result.expected_profit,
            x: success.then_some(result.x),
            scenario_profits: result.scenario_profits,
            plot,
        }
    }
}

/// Axis limit covers every positive intercept and the optimum, with a margin.
fn feasible_region(program: &LinearProgram, optimum: &[f64]) -> PlotSpec {
    let mut extent = optimum.iter().copied().fold(0.0, f64::max);
    let constraints: Vec<[f64; 3]> = program
        .constraints
        .iter()
        .map(|row| [row.coefficients[0], row.coefficients[1], row.rhs])
        .collect();
    for &[a1, a2, b] in &constraints {
        if a1 > 0.0 {
            extent = extent.max(b / a1);
        }
        if a2 > 0.0 {
            extent = extent.max(b / a2);
        }
    }
    PlotSpec::FeasibleRegion {
        constraints,
        objective: [program.objective[0], program.objective[1]],
        optimum: [optimum[0], optimum[1]],
        maximize: program.maximize,
        limit: (extent * 1.2).max(10.0),
    }
}

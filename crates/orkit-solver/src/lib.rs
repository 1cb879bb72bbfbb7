//! Optimization engines built on one dense two-phase simplex.
//!
//! - [`Solver`]: linear programs with `<=` rows and simple variable bounds
//! - [`BranchAndBound`]: integer and mixed-integer programs
//! - [`ColumnGeneration`]: cutting stock by pattern pricing
//! - [`LagrangianRelaxation`]: generalized assignment by subgradient ascent
//! - [`StochasticSolver`]: two-stage farm planning as a deterministic equivalent

mod branch_bound;
mod cutting_stock;
mod error;
mod lagrangian;
mod problem;
mod settings;
mod simplex;
mod solution;
mod stochastic;

pub use branch_bound::{
    BbNode, BoundChange, BoundSense, BranchAndBound, BranchResult, BranchStatus, Incumbent, NodeStatus, SearchTree,
};
pub use cutting_stock::{ColumnGeneration, CutItem, CuttingStockInstance, CuttingStockResult, CuttingStockStatus};
pub use error::ProblemError;
pub use lagrangian::{AssignmentInstance, LagrangianRelaxation, LagrangianResult, LagrangianStatus};
pub use problem::{Constraint, LinearProgram, VarBounds};
pub use settings::{BranchSettings, ColumnGenerationSettings, LagrangianSettings, LpSettings, Settings};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};
pub use stochastic::{FarmEconomics, Recourse, Scenario, StochasticInstance, StochasticResult, StochasticSolver, CROPS};

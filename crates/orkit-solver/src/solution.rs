use std::fmt;

/// The result of solving an LP problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable (empty unless optimal)
    pub values: Vec<f64>,
    /// Objective value in the problem's own sense
    pub objective_value: f64,
    /// Marginal change of the objective per unit increase of each `b_ub` entry
    pub duals: Vec<f64>,
    /// Simplex pivots performed across both phases
    pub iterations: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// No point satisfies all constraints
    Infeasible,
    /// The objective can be improved without limit
    Unbounded,
    /// The pivot budget ran out, usually from cycling or slow progress
    IterationLimit,
    /// A non-finite value appeared in the tableau
    NumericalFailure,
}

impl SolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolutionStatus::Optimal => "optimal",
            SolutionStatus::Infeasible => "infeasible",
            SolutionStatus::Unbounded => "unbounded",
            SolutionStatus::IterationLimit => "iteration-limit",
            SolutionStatus::NumericalFailure => "numerical-failure",
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }

    /// Human-readable explanation, used as the LP response message.
    pub fn message(&self) -> &'static str {
        match self {
            SolutionStatus::Optimal => "Optimization terminated successfully.",
            SolutionStatus::Infeasible => "The problem is infeasible.",
            SolutionStatus::Unbounded => "The problem is unbounded.",
            SolutionStatus::IterationLimit => "Iteration limit reached before optimality was proven.",
            SolutionStatus::NumericalFailure => "Numerical difficulties encountered.",
        }
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Solution {
    pub fn infeasible(iterations: usize) -> Self {
        Self::without_point(SolutionStatus::Infeasible, f64::INFINITY, iterations)
    }

    pub fn unbounded(maximize: bool, iterations: usize) -> Self {
        let objective = if maximize {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        Self::without_point(SolutionStatus::Unbounded, objective, iterations)
    }

    pub fn failed(status: SolutionStatus, iterations: usize) -> Self {
        Self::without_point(status, f64::NAN, iterations)
    }

    fn without_point(status: SolutionStatus, objective_value: f64, iterations: usize) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value,
            duals: Vec::new(),
            iterations,
        }
    }

    /// Objective value when optimal, `None` otherwise.
    pub fn objective(&self) -> Option<f64> {
        self.status.is_optimal().then_some(self.objective_value)
    }
}

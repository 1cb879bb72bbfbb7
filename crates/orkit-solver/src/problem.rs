use crate::error::{ensure_finite, ProblemError};

/// A linear program: optimize `cᵗx` subject to `A_ub x <= b_ub` and `x >= 0`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    /// Objective function coefficients
    pub objective: Vec<f64>,
    /// Inequality rows
    pub constraints: Vec<Constraint>,
    /// Whether to maximize instead of minimize
    pub maximize: bool,
    /// Per-variable integrality flags (only read by branch-and-bound)
    pub integer: Vec<bool>,
    /// Per-variable bounds
    pub bounds: Vec<VarBounds>,
}

/// A single `coefficients · x <= rhs` row
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub coefficients: Vec<f64>,
    pub rhs: f64,
}

/// Bounds on one variable. `upper == None` means unbounded above.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarBounds {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl Default for VarBounds {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: None,
        }
    }
}

impl VarBounds {
    pub fn new(lower: f64, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    /// True when the interval is empty.
    pub fn is_empty(&self, tolerance: f64) -> bool {
        matches!(self.upper, Some(u) if self.lower > u + tolerance)
    }
}

impl LinearProgram {
    pub fn new(objective: Vec<f64>, maximize: bool) -> Self {
        let n = objective.len();
        Self {
            objective,
            constraints: Vec::new(),
            maximize,
            integer: vec![false; n],
            bounds: vec![VarBounds::default(); n],
        }
    }

    /// Build from the dense `c`, `A_ub`, `b_ub` form and validate the shape.
    pub fn from_dense(
        c: Vec<f64>,
        a_ub: Vec<Vec<f64>>,
        b_ub: Vec<f64>,
        maximize: bool,
    ) -> Result<Self, ProblemError> {
        if a_ub.len() != b_ub.len() {
            return Err(ProblemError::LengthMismatch {
                field: "b_ub",
                expected: a_ub.len(),
                found: b_ub.len(),
            });
        }
        let mut problem = Self::new(c, maximize);
        for (coefficients, rhs) in a_ub.into_iter().zip(b_ub) {
            problem.add_constraint(coefficients, rhs);
        }
        problem.validate()?;
        Ok(problem)
    }

    pub fn add_constraint(&mut self, coefficients: Vec<f64>, rhs: f64) {
        self.constraints.push(Constraint { coefficients, rhs });
    }

    pub fn set_bounds(&mut self, var: usize, bounds: VarBounds) {
        self.bounds[var] = bounds;
    }

    /// Mark every variable as integer-constrained.
    pub fn all_integer(mut self) -> Self {
        self.integer = vec![true; self.num_variables()];
        self
    }

    pub fn with_integrality(mut self, integer: Vec<bool>) -> Self {
        self.integer = integer;
        self
    }

    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_integer_variables(&self) -> bool {
        self.integer.iter().any(|&flag| flag)
    }

    /// Check dimensions, finiteness and bound sanity.
    pub fn validate(&self) -> Result<(), ProblemError> {
        let n = self.num_variables();
        if n == 0 {
            return Err(ProblemError::Empty { field: "c" });
        }
        ensure_finite("c", &self.objective)?;

        for (row, c) in self.constraints.iter().enumerate() {
            if c.coefficients.len() != n {
                return Err(ProblemError::RowLength {
                    field: "A_ub",
                    row,
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if let Some(col) = c.coefficients.iter().position(|v| !v.is_finite()) {
                return Err(ProblemError::NonFinite {
                    field: "A_ub",
                    index: row * n + col,
                });
            }
            if !c.rhs.is_finite() {
                return Err(ProblemError::NonFinite {
                    field: "b_ub",
                    index: row,
                });
            }
        }

        if self.integer.len() != n {
            return Err(ProblemError::LengthMismatch {
                field: "integer",
                expected: n,
                found: self.integer.len(),
            });
        }
        if self.bounds.len() != n {
            return Err(ProblemError::LengthMismatch {
                field: "bounds",
                expected: n,
                found: self.bounds.len(),
            });
        }
        for (var, b) in self.bounds.iter().enumerate() {
            let upper_ok = b.upper.is_none_or(|u| u.is_finite() && u >= b.lower);
            if !b.lower.is_finite() || b.lower < 0.0 || !upper_ok {
                return Err(ProblemError::InvalidBounds {
                    var,
                    lower: b.lower,
                    upper: b.upper,
                });
            }
        }
        Ok(())
    }

    /// Objective value `cᵗx`.
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.objective.iter().zip(x).map(|(c, v)| c * v).sum()
    }

    /// True when `x` satisfies every row and bound within `tolerance`.
    pub fn is_feasible(&self, x: &[f64], tolerance: f64) -> bool {
        if x.len() != self.num_variables() {
            return false;
        }
        let rows_ok = self.constraints.iter().all(|c| {
            let lhs: f64 = c.coefficients.iter().zip(x).map(|(a, v)| a * v).sum();
            lhs <= c.rhs + tolerance
        });
        let bounds_ok = self.bounds.iter().zip(x).all(|(b, &v)| {
            v >= b.lower - tolerance && b.upper.is_none_or(|u| v <= u + tolerance)
        });
        rows_ok && bounds_ok
    }

    /// True if `candidate` is at least as good as `reference` in this
    /// program's sense, up to `tolerance`.
    pub fn is_no_worse(&self, candidate: f64, reference: f64, tolerance: f64) -> bool {
        if self.maximize {
            candidate >= reference - tolerance
        } else {
            candidate <= reference + tolerance
        }
    }

    /// True if `candidate` strictly improves on `reference` by more than `tolerance`.
    pub fn is_better(&self, candidate: f64, reference: f64, tolerance: f64) -> bool {
        if self.maximize {
            candidate > reference + tolerance
        } else {
            candidate < reference - tolerance
        }
    }

    /// The worst possible objective in this program's sense.
    pub fn worst_objective(&self) -> f64 {
        if self.maximize {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dense_rejects_ragged_rows() {
        let err = LinearProgram::from_dense(
            vec![1.0, 2.0],
            vec![vec![1.0, 1.0], vec![1.0]],
            vec![4.0, 2.0],
            true,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ProblemError::RowLength {
                field: "A_ub",
                row: 1,
                expected: 2,
                found: 1
            }
        );
        assert_eq!(err.field(), "A_ub");
    }

    #[test]
    fn test_from_dense_rejects_rhs_length() {
        let err = LinearProgram::from_dense(vec![1.0], vec![vec![1.0]], vec![], false).unwrap_err();
        assert_eq!(err.field(), "b_ub");
    }

    #[test]
    fn test_validate_rejects_free_variable() {
        let mut lp = LinearProgram::new(vec![1.0], false);
        lp.set_bounds(0, VarBounds::new(-1.0, None));
        assert!(matches!(lp.validate(), Err(ProblemError::InvalidBounds { var: 0, .. })));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let lp = LinearProgram::new(vec![1.0, f64::NAN], false);
        assert_eq!(
            lp.validate(),
            Err(ProblemError::NonFinite {
                field: "c",
                index: 1
            })
        );
    }

    #[test]
    fn test_feasibility_check() {
        let lp = LinearProgram::from_dense(vec![1.0, 1.0], vec![vec![1.0, 1.0]], vec![4.0], true).unwrap();
        assert!(lp.is_feasible(&[2.0, 2.0], 1e-9));
        assert!(!lp.is_feasible(&[3.0, 2.0], 1e-9));
        assert!(!lp.is_feasible(&[-1.0, 0.0], 1e-9));
        assert_eq!(lp.evaluate(&[1.0, 3.0]), 4.0);
    }

    #[test]
    fn test_sense_comparisons() {
        let max = LinearProgram::new(vec![1.0], true);
        assert!(max.is_better(5.0, 4.0, 1e-9));
        assert!(max.is_no_worse(4.0, 4.0, 1e-9));
        let min = LinearProgram::new(vec![1.0], false);
        assert!(min.is_better(3.0, 4.0, 1e-9));
        assert_eq!(min.worst_objective(), f64::INFINITY);
    }
}

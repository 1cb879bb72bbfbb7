use log::{debug, trace};

use crate::error::ProblemError;
use crate::problem::LinearProgram;
use crate::settings::LpSettings;
use crate::solution::{Solution, SolutionStatus};

/// Roundoff allowed on the RHS column and in the phase 1 infeasibility test.
const ROUNDOFF: f64 = 1e-7;

/// Simplex solver for linear programming problems
#[derive(Debug, Clone, Default)]
pub struct Solver {
    settings: LpSettings,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: LpSettings) -> Self {
        Self { settings }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.settings.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.settings.tolerance = tol;
        self
    }

    pub fn with_degenerate_pivot_limit(mut self, limit: usize) -> Self {
        self.settings.degenerate_pivot_limit = limit;
        self
    }

    /// Solve the LP problem using the two-phase simplex method.
    ///
    /// Shape errors are returned as `Err`; every solver outcome, including
    /// infeasibility and the pivot cap, is reported through the solution status.
    pub fn solve(&self, problem: &LinearProgram) -> Result<Solution, ProblemError> {
        problem.validate()?;
        let solution = self.solve_validated(problem);
        debug!(
            "simplex: {} after {} pivots ({} vars, {} rows)",
            solution.status,
            solution.iterations,
            problem.num_variables(),
            problem.num_constraints()
        );
        Ok(solution)
    }

    fn solve_validated(&self, problem: &LinearProgram) -> Solution {
        let tol = self.settings.tolerance;
        let mut tableau = Tableau::build(problem);
        let mut pivots = 0;

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            tableau.load_phase1_objective();
            let all_columns = tableau.rhs_col();
            match self.iterate(&mut tableau, all_columns, &mut pivots) {
                SimplexResult::Optimal => {}
                // The phase 1 objective is bounded below by zero
                SimplexResult::Unbounded => {
                    return Solution::failed(SolutionStatus::NumericalFailure, pivots);
                }
                SimplexResult::Stopped(status) => return Solution::failed(status, pivots),
            }
            let infeasibility = tableau.objective_value();
            if infeasibility > ROUNDOFF * (1.0 + tableau.rhs_scale()) {
                trace!("phase 1 ended with artificial sum {infeasibility:e}");
                return Solution::infeasible(pivots);
            }
            tableau.drive_out_artificials(tol);
        }

        // Phase 2: Optimize, artificial columns may not re-enter
        let costs: Vec<f64> = problem
            .objective
            .iter()
            .map(|&c| if problem.maximize { -c } else { c })
            .collect();
        tableau.load_phase2_objective(&costs);
        let structural = tableau.artificial_start();
        match self.iterate(&mut tableau, structural, &mut pivots) {
            SimplexResult::Optimal => tableau.extract(problem, pivots),
            SimplexResult::Unbounded => Solution::unbounded(problem.maximize, pivots),
            SimplexResult::Stopped(status) => Solution::failed(status, pivots),
        }
    }

    /// Pivot until no column below `allow` has a negative reduced cost.
    fn iterate(&self, tableau: &mut Tableau, allow: usize, pivots: &mut usize) -> SimplexResult {
        let tol = self.settings.tolerance;
        let mut degenerate_run = 0;

        loop {
            let bland = degenerate_run >= self.settings.degenerate_pivot_limit;
            let Some(col) = tableau.entering_column(allow, tol, bland) else {
                return SimplexResult::Optimal;
            };
            let Some(row) = tableau.leaving_row(col, tol, bland) else {
                return SimplexResult::Unbounded;
            };
            if *pivots >= self.settings.max_iterations {
                return SimplexResult::Stopped(SolutionStatus::IterationLimit);
            }

            let step = tableau.rhs(row) / tableau.rows[row][col];
            if step <= tol {
                degenerate_run += 1;
                if degenerate_run == self.settings.degenerate_pivot_limit {
                    trace!("{degenerate_run} degenerate pivots in a row, switching to Bland's rule");
                }
            } else {
                degenerate_run = 0;
            }

            tableau.pivot(row, col);
            *pivots += 1;
            if !tableau.is_finite() {
                return SimplexResult::Stopped(SolutionStatus::NumericalFailure);
            }
        }
    }
}

/// Dense simplex tableau in minimization form.
///
/// Columns are laid out as structural variables, one slack per row, one
/// artificial per row whose RHS had to be negated, then the RHS.
struct Tableau {
    rows: Vec<Vec<f64>>,
    /// Reduced costs; the RHS entry holds the negated objective value.
    reduced: Vec<f64>,
    basis: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn build(problem: &LinearProgram) -> Self {
        let n_vars = problem.num_variables();

        // Original rows first so slack i lines up with b_ub[i]; bounds follow
        let mut source: Vec<(Vec<f64>, f64)> = problem
            .constraints
            .iter()
            .map(|c| (c.coefficients.clone(), c.rhs))
            .collect();
        for (j, b) in problem.bounds.iter().enumerate() {
            if let Some(upper) = b.upper {
                let mut row = vec![0.0; n_vars];
                row[j] = 1.0;
                source.push((row, upper));
            }
            if b.lower > 0.0 {
                let mut row = vec![0.0; n_vars];
                row[j] = -1.0;
                source.push((row, -b.lower));
            }
        }

        let n_slack = source.len();
        let n_artificial = source.iter().filter(|(_, rhs)| *rhs < 0.0).count();
        let width = n_vars + n_slack + n_artificial + 1;

        let mut rows = Vec::with_capacity(n_slack);
        let mut basis = Vec::with_capacity(n_slack);
        let mut artificial_idx = n_vars + n_slack;

        for (i, (coefficients, rhs)) in source.into_iter().enumerate() {
            let mut row = vec![0.0; width];
            row[..n_vars].copy_from_slice(&coefficients);
            row[n_vars + i] = 1.0;
            row[width - 1] = rhs;

            // RHS must be non-negative: negate the row and seed it with an artificial
            if rhs < 0.0 {
                for v in row.iter_mut() {
                    *v = -*v;
                }
                row[artificial_idx] = 1.0;
                basis.push(artificial_idx);
                artificial_idx += 1;
            } else {
                basis.push(n_vars + i);
            }
            rows.push(row);
        }

        Self {
            rows,
            reduced: vec![0.0; width],
            basis,
            n_vars,
            n_slack,
            n_artificial,
        }
    }

    fn rhs_col(&self) -> usize {
        self.reduced.len() - 1
    }

    fn artificial_start(&self) -> usize {
        self.n_vars + self.n_slack
    }

    fn rhs(&self, row: usize) -> f64 {
        self.rows[row][self.rhs_col()]
    }

    fn rhs_scale(&self) -> f64 {
        self.rows.iter().map(|r| r[r.len() - 1].abs()).fold(0.0, f64::max)
    }

    fn objective_value(&self) -> f64 {
        -self.reduced[self.rhs_col()]
    }

    fn is_finite(&self) -> bool {
        let rhs = self.rhs_col();
        self.reduced.iter().all(|v| v.is_finite()) && self.rows.iter().all(|r| r[rhs].is_finite())
    }

    /// Minimize the sum of artificial variables.
    fn load_phase1_objective(&mut self) {
        let art_start = self.artificial_start();
        self.reduced.iter_mut().for_each(|v| *v = 0.0);
        for j in art_start..art_start + self.n_artificial {
            self.reduced[j] = 1.0;
        }
        // Price out the artificials that start in the basis
        for (row, &basic) in self.rows.iter().zip(&self.basis) {
            if basic >= art_start {
                for (r, v) in self.reduced.iter_mut().zip(row) {
                    *r -= v;
                }
            }
        }
    }

    /// Load minimization costs for the structural variables and price out the basis.
    fn load_phase2_objective(&mut self, costs: &[f64]) {
        self.reduced.iter_mut().for_each(|v| *v = 0.0);
        self.reduced[..self.n_vars].copy_from_slice(costs);
        for (row, &basic) in self.rows.iter().zip(&self.basis) {
            if basic < self.n_vars && costs[basic] != 0.0 {
                let cost = costs[basic];
                for (r, v) in self.reduced.iter_mut().zip(row) {
                    *r -= cost * v;
                }
            }
        }
        for &basic in &self.basis {
            self.reduced[basic] = 0.0;
        }
    }

    /// Dantzig's rule (most negative reduced cost, lowest index on ties), or
    /// Bland's rule (lowest eligible index).
    fn entering_column(&self, allow: usize, tol: f64, bland: bool) -> Option<usize> {
        if bland {
            return (0..allow).find(|&j| self.reduced[j] < -tol);
        }
        let mut best_val = -tol;
        let mut best_col = None;
        for j in 0..allow {
            if self.reduced[j] < best_val {
                best_val = self.reduced[j];
                best_col = Some(j);
            }
        }
        best_col
    }

    /// Minimum ratio test. Ties go to the lowest row, or to the lowest basic
    /// variable index under Bland's rule.
    fn leaving_row(&self, col: usize, tol: f64, bland: bool) -> Option<usize> {
        let rhs = self.rhs_col();
        let mut best: Option<(usize, f64)> = None;

        for (i, row) in self.rows.iter().enumerate() {
            let a = row[col];
            if a <= tol {
                continue;
            }
            let ratio = row[rhs] / a;
            best = match best {
                None => Some((i, ratio)),
                Some((_, best_ratio)) if ratio < best_ratio - tol => Some((i, ratio)),
                Some((b, best_ratio))
                    if bland && ratio <= best_ratio + tol && self.basis[i] < self.basis[b] =>
                {
                    Some((i, ratio))
                }
                keep => keep,
            };
        }

        best.map(|(i, _)| i)
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let rhs = self.rhs_col();

        // Scale pivot row
        let pivot_val = self.rows[row][col];
        for v in self.rows[row].iter_mut() {
            *v /= pivot_val;
        }
        self.rows[row][col] = 1.0;
        let pivot_row = self.rows[row].clone();

        // Eliminate column in other rows
        for (i, r) in self.rows.iter_mut().enumerate() {
            if i == row || r[col] == 0.0 {
                continue;
            }
            let factor = r[col];
            for (v, p) in r.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
            r[col] = 0.0;
            if r[rhs] < 0.0 && r[rhs] > -ROUNDOFF {
                r[rhs] = 0.0;
            }
        }

        let factor = self.reduced[col];
        if factor != 0.0 {
            for (v, p) in self.reduced.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
            self.reduced[col] = 0.0;
        }

        self.basis[row] = col;
    }

    /// Pivot zero-valued artificials out of the basis where a structural or
    /// slack column allows it. Rows where none does are redundant and keep
    /// their artificial at zero.
    fn drive_out_artificials(&mut self, tol: f64) {
        let art_start = self.artificial_start();
        for i in 0..self.rows.len() {
            if self.basis[i] < art_start {
                continue;
            }
            if let Some(col) = (0..art_start).find(|&j| self.rows[i][j].abs() > tol) {
                self.pivot(i, col);
                let rhs = self.rhs_col();
                if self.rows[i][rhs] < 0.0 {
                    self.rows[i][rhs] = 0.0;
                }
            }
        }
    }

    fn extract(&self, problem: &LinearProgram, iterations: usize) -> Solution {
        let rhs = self.rhs_col();

        // Extract variable values
        let mut values = vec![0.0; self.n_vars];
        for (row, &basic) in self.rows.iter().zip(&self.basis) {
            if basic < self.n_vars {
                values[basic] = row[rhs].max(0.0);
            }
        }

        // Slack reduced costs are the negated min-form duals of the original rows
        let duals = (0..problem.num_constraints())
            .map(|i| {
                let r = self.reduced[self.n_vars + i];
                (if problem.maximize { r } else { -r }) + 0.0
            })
            .collect();

        Solution {
            status: SolutionStatus::Optimal,
            objective_value: problem.evaluate(&values),
            values,
            duals,
            iterations,
        }
    }
}

enum SimplexResult {
    Optimal,
    Unbounded,
    Stopped(SolutionStatus),
}

//! Cutting-stock column generation.
//!
//! The master LP picks how many rolls to cut with each known pattern; the
//! pricing step solves an unbounded integer knapsack over the master's dual
//! prices and proposes a new pattern when one would lower the roll count.

use std::fmt;

use log::{debug, info, warn};

use crate::error::ProblemError;
use crate::problem::LinearProgram;
use crate::settings::{ColumnGenerationSettings, Deadline, LpSettings};
use crate::simplex::Solver;
use crate::solution::SolutionStatus;

/// One item type to cut: its width and how many pieces are needed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutItem {
    pub width: f64,
    pub demand: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CuttingStockInstance {
    pub roll_length: f64,
    pub items: Vec<CutItem>,
}

impl CuttingStockInstance {
    pub fn new(roll_length: f64, items: Vec<CutItem>) -> Self {
        Self { roll_length, items }
    }

    /// Build from `(width, demand)` pairs.
    pub fn from_pairs(roll_length: f64, demands: &[(f64, f64)]) -> Self {
        let items = demands
            .iter()
            .map(|&(width, demand)| CutItem { width, demand })
            .collect();
        Self::new(roll_length, items)
    }

    pub fn validate(&self) -> Result<(), ProblemError> {
        if !self.roll_length.is_finite() || self.roll_length <= 0.0 {
            return Err(ProblemError::invalid("roll_length", "must be a positive number"));
        }
        if self.items.is_empty() {
            return Err(ProblemError::Empty { field: "demands" });
        }
        for (index, item) in self.items.iter().enumerate() {
            if !item.width.is_finite() || !item.demand.is_finite() {
                return Err(ProblemError::NonFinite {
                    field: "demands",
                    index,
                });
            }
            if item.width <= 0.0 {
                return Err(ProblemError::invalid("demands", format!("item {index} has non-positive width")));
            }
            if item.width > self.roll_length {
                return Err(ProblemError::invalid(
                    "demands",
                    format!("item {index} width {} exceeds roll length {}", item.width, self.roll_length),
                ));
            }
            if item.demand < 0.0 {
                return Err(ProblemError::invalid("demands", format!("item {index} has negative demand")));
            }
        }
        Ok(())
    }

    /// Total width of `counts` in roll units.
    pub fn used_length(&self, counts: &[u32]) -> f64 {
        self.items.iter().zip(counts).map(|(item, &n)| item.width * n as f64).sum()
    }
}

/// How column generation ended.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuttingStockStatus {
    /// No pattern prices out; the master LP is optimal over all patterns.
    Optimal,
    /// The pricing round cap, or the master's pivot cap, was reached.
    IterationLimit,
    Timeout,
    /// The master LP could not be solved.
    NumericalFailure,
}

impl CuttingStockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CuttingStockStatus::Optimal => "optimal",
            CuttingStockStatus::IterationLimit => "iteration-limit",
            CuttingStockStatus::Timeout => "timeout",
            CuttingStockStatus::NumericalFailure => "numerical-failure",
        }
    }
}

impl fmt::Display for CuttingStockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CuttingStockResult {
    pub status: CuttingStockStatus,

    /// Rolls used by the LP relaxation of the final master.
    pub objective: f64,

    /// Piece counts per item, one entry per master column.
    pub patterns: Vec<Vec<u32>>,

    /// Rolls cut with each pattern (fractional).
    pub solution: Vec<f64>,

    pub logs: Vec<String>,

    /// Master objective after each solve.
    pub objective_history: Vec<f64>,

    /// `solution` rounded up; always meets every demand.
    pub rounded_solution: Vec<u64>,

    pub rounded_objective: u64,
}

/// Widths and capacity expressed in integer knapsack units.
#[derive(Debug, Clone, PartialEq)]
struct Discretized {
    capacity: usize,
    widths: Vec<usize>,
}

impl Discretized {
    /// Scale by the smallest power of ten that makes every width and the
    /// roll length integral while the capacity stays within
    /// `max_capacity_units`. Instances with no such scale are rejected.
    fn new(instance: &CuttingStockInstance, settings: &ColumnGenerationSettings) -> Result<Self, ProblemError> {
        let limit = settings.max_capacity_units as f64;
        if instance.roll_length > limit {
            return Err(ProblemError::invalid(
                "roll_length",
                format!(
                    "roll length needs {} knapsack units, more than the limit of {}",
                    instance.roll_length, settings.max_capacity_units
                ),
            ));
        }

        let integral = |v: f64| (v - v.round()).abs() <= 1e-6;
        let scale = (0..=settings.max_scale_digits)
            .map(|digits| 10f64.powi(digits as i32))
            .take_while(|&s| instance.roll_length * s <= limit + 1e-6)
            .find(|&s| integral(instance.roll_length * s) && instance.items.iter().all(|i| integral(i.width * s)));
        let Some(scale) = scale else {
            return Err(ProblemError::invalid(
                "demands",
                format!(
                    "widths need more decimal places than a capacity of {} knapsack units allows",
                    settings.max_capacity_units
                ),
            ));
        };

        let widths = instance
            .items
            .iter()
            .map(|i| ((i.width * scale).round() as usize).max(1))
            .collect();
        Ok(Self {
            capacity: (instance.roll_length * scale).round() as usize,
            widths,
        })
    }

    /// Unbounded integer knapsack by dynamic programming over capacity.
    ///
    /// Returns the best value and the piece counts. Ties keep the smaller
    /// capacity and then the lowest item index, so results are reproducible.
    fn knapsack(&self, values: &[f64]) -> (f64, Vec<u32>) {
        let mut best = vec![0.0; self.capacity + 1];
        let mut choice: Vec<Option<usize>> = vec![None; self.capacity + 1];

        for cap in 1..=self.capacity {
            best[cap] = best[cap - 1];
            for (item, (&w, &v)) in self.widths.iter().zip(values).enumerate() {
                if v <= 0.0 || w > cap {
                    continue;
                }
                let candidate = best[cap - w] + v;
                if candidate > best[cap] + 1e-12 {
                    best[cap] = candidate;
                    choice[cap] = Some(item);
                }
            }
        }

        let mut counts = vec![0u32; self.widths.len()];
        let mut cap = self.capacity;
        while cap > 0 {
            match choice[cap] {
                Some(item) => {
                    counts[item] += 1;
                    cap -= self.widths[item];
                }
                None => cap -= 1,
            }
        }
        (best[self.capacity], counts)
    }
}

/// Column generation driver for the cutting-stock master LP.
#[derive(Debug, Clone, Default)]
pub struct ColumnGeneration {
    settings: ColumnGenerationSettings,
    lp: Solver,
}

impl ColumnGeneration {
    pub fn new(settings: ColumnGenerationSettings, lp_settings: LpSettings) -> Self {
        Self {
            settings,
            lp: Solver::with_settings(lp_settings),
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.settings.max_iterations = max;
        self
    }

    pub fn solve(&self, instance: &CuttingStockInstance) -> Result<CuttingStockResult, ProblemError> {
        instance.validate()?;
        let grid = Discretized::new(instance, &self.settings)?;
        let deadline = Deadline::after_ms(self.settings.time_limit_ms);
        let n_items = instance.items.len();

        // Start from homogeneous patterns: as many copies of one item as fit
        let mut patterns: Vec<Vec<u32>> = instance
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mut pattern = vec![0; n_items];
                pattern[i] = (instance.roll_length / item.width + 1e-9).floor() as u32;
                pattern
            })
            .collect();

        let mut logs = Vec::new();
        let mut objective_history = Vec::new();
        let mut objective = 0.0;
        let mut solution = Vec::new();
        let mut rounds = 0;

        let status = loop {
            let master = self.master(instance, &patterns)?;
            let lp = self.lp.solve(&master)?;
            if !lp.status.is_optimal() {
                warn!("column generation: master LP ended with {}", lp.status);
                logs.push(format!("Iter {rounds}: master LP ended with {}", lp.status));
                break match lp.status {
                    SolutionStatus::IterationLimit => CuttingStockStatus::IterationLimit,
                    _ => CuttingStockStatus::NumericalFailure,
                };
            }
            objective = lp.objective_value;
            solution = lp.values.iter().map(|v| v.max(0.0)).collect();
            objective_history.push(objective);

            // Cover rows are written as -P x <= -d, so their duals are <= 0
            let prices: Vec<f64> = lp.duals.iter().map(|d| (-d).max(0.0)).collect();
            let (value, pattern) = grid.knapsack(&prices);
            let duals = format_values(&prices);

            if value <= 1.0 + self.settings.reduced_cost_tolerance {
                logs.push(format!(
                    "Iter {rounds}: duals {duals}, no improving column (value {value:.4} <= 1), objective {objective:.4}"
                ));
                break CuttingStockStatus::Optimal;
            }
            if patterns.contains(&pattern) {
                logs.push(format!(
                    "Iter {rounds}: duals {duals}, pricing returned existing pattern {pattern:?}, objective {objective:.4}"
                ));
                break CuttingStockStatus::Optimal;
            }
            if rounds >= self.settings.max_iterations {
                logs.push(format!("Iter {rounds}: iteration limit reached, objective {objective:.4}"));
                break CuttingStockStatus::IterationLimit;
            }
            if deadline.expired() {
                logs.push(format!("Iter {rounds}: time limit reached, objective {objective:.4}"));
                break CuttingStockStatus::Timeout;
            }

            let line = format!(
                "Iter {rounds}: duals {duals}, added pattern {pattern:?} (value {value:.4}), objective {objective:.4}"
            );
            debug!("column generation: {line}");
            logs.push(line);
            patterns.push(pattern);
            rounds += 1;
        };

        // Keep patterns and solution aligned if the last master solve failed
        solution.resize(patterns.len(), 0.0);
        let rounded_solution: Vec<u64> = solution.iter().map(|v| (v - 1e-9).ceil().max(0.0) as u64).collect();
        let rounded_objective = rounded_solution.iter().sum();
        info!(
            "column generation: {status} after {rounds} rounds, {} patterns, LP rolls {objective:.4}, rounded {rounded_objective}",
            patterns.len()
        );

        Ok(CuttingStockResult {
            status,
            objective,
            patterns,
            solution,
            logs,
            objective_history,
            rounded_solution,
            rounded_objective,
        })
    }

    /// min Σ x_p  s.t.  -Σ_p count[i][p] x_p <= -demand_i
    fn master(&self, instance: &CuttingStockInstance, patterns: &[Vec<u32>]) -> Result<LinearProgram, ProblemError> {
        let a_ub = instance
            .items
            .iter()
            .enumerate()
            .map(|(i, _)| patterns.iter().map(|p| -(p[i] as f64)).collect())
            .collect();
        let b_ub = instance.items.iter().map(|item| -item.demand).collect();
        LinearProgram::from_dense(vec![1.0; patterns.len()], a_ub, b_ub, false)
    }
}

fn format_values(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(instance: &CuttingStockInstance) -> CuttingStockResult {
        ColumnGeneration::default().solve(instance).unwrap()
    }

    fn assert_consistent(instance: &CuttingStockInstance, result: &CuttingStockResult) {
        assert_eq!(result.patterns.len(), result.solution.len());
        for pattern in &result.patterns {
            assert!(instance.used_length(pattern) <= instance.roll_length + 1e-9, "{pattern:?} does not fit");
        }
        for pair in result.objective_history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-7, "history increased: {pair:?}");
        }
        for (i, item) in instance.items.iter().enumerate() {
            let cut: f64 = result
                .patterns
                .iter()
                .zip(&result.rounded_solution)
                .map(|(p, &n)| p[i] as f64 * n as f64)
                .sum();
            assert!(cut >= item.demand - 1e-9, "rounded plan misses item {i}");
        }
        assert!(result.rounded_objective as f64 >= result.objective - 1e-9);
    }

    #[test]
    fn test_two_items() {
        let instance = CuttingStockInstance::from_pairs(10.0, &[(3.0, 5.0), (5.0, 2.0)]);
        let result = solve(&instance);

        assert_eq!(result.status, CuttingStockStatus::Optimal);
        assert_eq!(result.patterns[0], vec![3, 0]);
        assert_eq!(result.patterns[1], vec![0, 2]);
        assert!((result.objective - 8.0 / 3.0).abs() < 1e-6, "objective {}", result.objective);
        assert_eq!(result.rounded_objective, 3);
        assert!(result.logs.last().unwrap().contains("no improving column"));
        assert_consistent(&instance, &result);
    }

    #[test]
    fn test_generates_mixed_patterns() {
        let instance = CuttingStockInstance::from_pairs(100.0, &[(45.0, 97.0), (36.0, 610.0), (31.0, 395.0), (14.0, 211.0)]);
        let result = solve(&instance);

        assert_eq!(result.status, CuttingStockStatus::Optimal);
        assert!(result.patterns.len() > 4);
        assert!(result.objective_history.len() > 1);
        // No plan can use less material than the total demanded width
        let material: f64 = instance.items.iter().map(|i| i.width * i.demand).sum();
        assert!(result.objective >= material / instance.roll_length - 1e-6);
        assert_consistent(&instance, &result);
    }

    #[test]
    fn test_fractional_widths_are_scaled() {
        let instance = CuttingStockInstance::from_pairs(2.5, &[(0.7, 4.0), (1.1, 3.0)]);
        let grid = Discretized::new(&instance, &ColumnGenerationSettings::default()).unwrap();
        assert_eq!(grid.capacity, 25);
        assert_eq!(grid.widths, vec![7, 11]);

        let result = solve(&instance);
        assert_eq!(result.patterns[0], vec![3, 0]);
        assert_consistent(&instance, &result);
    }

    #[test]
    fn test_four_decimal_width_uses_finer_grid() {
        let instance = CuttingStockInstance::from_pairs(10.0, &[(3.3333, 3.0)]);
        let grid = Discretized::new(&instance, &ColumnGenerationSettings::default()).unwrap();
        assert_eq!(grid.capacity, 100_000);
        assert_eq!(grid.widths, vec![33_333]);

        let result = solve(&instance);
        assert_eq!(result.status, CuttingStockStatus::Optimal);
        assert_eq!(result.patterns[0], vec![3]);
        assert!((result.objective - 1.0).abs() < 1e-6, "objective {}", result.objective);
        assert_eq!(result.rounded_objective, 1);
        assert_consistent(&instance, &result);
    }

    #[test]
    fn test_rejects_width_without_exact_grid() {
        let instance = CuttingStockInstance::from_pairs(10.0, &[(1.0 / 3.0, 3.0)]);
        let err = ColumnGeneration::default().solve(&instance).unwrap_err();
        assert_eq!(err.field(), "demands");
    }

    #[test]
    fn test_time_limit() {
        let instance = CuttingStockInstance::from_pairs(100.0, &[(45.0, 97.0), (36.0, 610.0), (31.0, 395.0), (14.0, 211.0)]);
        let settings = ColumnGenerationSettings {
            time_limit_ms: Some(0),
            ..ColumnGenerationSettings::default()
        };
        let result = ColumnGeneration::new(settings, LpSettings::default()).solve(&instance).unwrap();
        assert_eq!(result.status, CuttingStockStatus::Timeout);
        assert_eq!(result.objective_history.len(), 1);
        assert!(result.logs.last().unwrap().contains("time limit"));
        assert_consistent(&instance, &result);
    }

    #[test]
    fn test_knapsack_prefers_lowest_index_on_ties() {
        let grid = Discretized {
            capacity: 10,
            widths: vec![5, 5],
        };
        let (value, counts) = grid.knapsack(&[0.5, 0.5]);
        assert!((value - 1.0).abs() < 1e-12);
        assert_eq!(counts, vec![2, 0]);

        let (value, counts) = grid.knapsack(&[0.0, 0.0]);
        assert_eq!(value, 0.0);
        assert_eq!(counts, vec![0, 0]);
    }

    #[test]
    fn test_iteration_cap() {
        let instance = CuttingStockInstance::from_pairs(100.0, &[(45.0, 97.0), (36.0, 610.0), (31.0, 395.0), (14.0, 211.0)]);
        let result = ColumnGeneration::default().with_max_iterations(0).solve(&instance).unwrap();
        assert_eq!(result.status, CuttingStockStatus::IterationLimit);
        assert_eq!(result.patterns.len(), 4);
        assert_eq!(result.objective_history.len(), 1);
        assert_consistent(&instance, &result);
    }

    #[test]
    fn test_rejects_wide_item() {
        let instance = CuttingStockInstance::from_pairs(10.0, &[(12.0, 1.0)]);
        let err = ColumnGeneration::default().solve(&instance).unwrap_err();
        assert_eq!(err.field(), "demands");
    }

    #[test]
    fn test_rejects_huge_capacity() {
        let instance = CuttingStockInstance::from_pairs(1_000_000.0, &[(3.0, 1.0)]);
        let err = ColumnGeneration::default().solve(&instance).unwrap_err();
        assert_eq!(err.field(), "roll_length");
    }

    #[test]
    fn test_zero_demand_needs_no_rolls() {
        let instance = CuttingStockInstance::from_pairs(10.0, &[(3.0, 0.0), (4.0, 2.0)]);
        let result = solve(&instance);
        assert_eq!(result.status, CuttingStockStatus::Optimal);
        assert!((result.objective - 1.0).abs() < 1e-6);
        assert_consistent(&instance, &result);
    }
}

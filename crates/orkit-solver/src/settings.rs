//! Solver configuration.
//!
//! Every engine reads its own settings block. All blocks have defaults, so a
//! partial JSON document (with the `serde` feature) only needs to name the
//! values it overrides.

use std::time::{Duration, Instant};

/// Simplex settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct LpSettings {
    /// Pivot budget across both phases.
    pub max_iterations: usize,

    /// Tolerance for pivot eligibility and feasibility checks.
    pub tolerance: f64,

    /// Consecutive degenerate pivots tolerated before switching to Bland's rule.
    pub degenerate_pivot_limit: usize,
}

impl Default for LpSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-9,
            degenerate_pivot_limit: 50,
        }
    }
}

/// Branch-and-bound settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct BranchSettings {
    /// Maximum number of nodes to process.
    pub max_nodes: usize,

    /// Wall-clock limit in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// A value is integral if |x - round(x)| <= integrality_tolerance.
    pub integrality_tolerance: f64,

    /// Slack used when comparing a node bound against the incumbent.
    pub prune_tolerance: f64,
}

impl Default for BranchSettings {
    fn default() -> Self {
        Self {
            max_nodes: 1000,
            time_limit_ms: None,
            integrality_tolerance: 1e-6,
            prune_tolerance: 1e-6,
        }
    }
}

/// Cutting-stock column generation settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGenerationSettings {
    /// Maximum number of pricing rounds.
    pub max_iterations: usize,

    /// Wall-clock limit in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// A pattern enters only if its pricing value exceeds 1 + this.
    pub reduced_cost_tolerance: f64,

    /// Largest integer knapsack capacity the pricing DP accepts.
    pub max_capacity_units: u64,

    /// Most decimal digits tried when scaling fractional widths to integers.
    pub max_scale_digits: u32,
}

impl Default for ColumnGenerationSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            time_limit_ms: None,
            reduced_cost_tolerance: 1e-6,
            max_capacity_units: 100_000,
            max_scale_digits: 9,
        }
    }
}

/// Lagrangian relaxation settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct LagrangianSettings {
    /// Maximum number of subgradient iterations.
    pub max_iterations: usize,

    /// Wall-clock limit in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// Gap and lower-bound stall tolerance.
    pub tolerance: f64,

    /// Initial Polyak step scale (theta).
    pub initial_step_scale: f64,

    /// Halve theta after this many iterations without lower-bound improvement.
    pub step_halving_patience: usize,

    /// Converge after this many consecutive stalled lower bounds.
    pub stall_limit: usize,

    /// Run the greedy repair heuristic every N iterations.
    pub repair_interval: usize,
}

impl Default for LagrangianSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            time_limit_ms: None,
            tolerance: 1e-6,
            initial_step_scale: 2.0,
            step_halving_patience: 5,
            stall_limit: 3,
            repair_interval: 5,
        }
    }
}

/// Settings for every engine.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub lp: LpSettings,
    pub branch: BranchSettings,
    pub column_generation: ColumnGenerationSettings,
    pub lagrangian: LagrangianSettings,
}

impl Settings {
    /// Apply one wall-clock limit to every iterative engine.
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.branch.time_limit_ms = Some(ms);
        self.column_generation.time_limit_ms = Some(ms);
        self.lagrangian.time_limit_ms = Some(ms);
        self
    }

    /// Apply one iteration cap to the column generation and Lagrangian loops.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.column_generation.max_iterations = max;
        self.lagrangian.max_iterations = max;
        self
    }

    pub fn with_max_nodes(mut self, nodes: usize) -> Self {
        self.branch.max_nodes = nodes;
        self
    }
}

/// Wall-clock cutoff for one engine invocation.
///
/// The clock is only read when a limit is configured, so engines stay usable
/// on targets without a monotonic clock as long as no limit is set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline(Option<Instant>);

impl Deadline {
    pub(crate) fn after_ms(limit_ms: Option<u64>) -> Self {
        Self(limit_ms.map(|ms| Instant::now() + Duration::from_millis(ms)))
    }

    pub(crate) fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

//! Lagrangian relaxation for the generalized assignment problem.
//!
//! Every task goes to exactly one agent and each agent's assigned weight must
//! stay within its capacity. Capacity rows are dualized with multipliers
//! `λ_a >= 0`; for fixed multipliers the relaxation decomposes per task, which
//! yields a lower bound. Multipliers follow a projected subgradient with a
//! Polyak step, and feasible assignments (relaxed or repaired) give the
//! upper bound.

use std::fmt;

use log::{debug, info};

use crate::error::{ensure_finite, ensure_matrix, ProblemError};
use crate::settings::{Deadline, LagrangianSettings};

/// Capacity slack below which a load counts as within capacity.
const LOAD_TOLERANCE: f64 = 1e-9;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentInstance {
    /// `costs[task][agent]`
    pub costs: Vec<Vec<f64>>,
    /// `weights[task][agent]`
    pub weights: Vec<Vec<f64>>,
    /// `capacities[agent]`
    pub capacities: Vec<f64>,
}

impl AssignmentInstance {
    pub fn new(costs: Vec<Vec<f64>>, weights: Vec<Vec<f64>>, capacities: Vec<f64>) -> Self {
        Self {
            costs,
            weights,
            capacities,
        }
    }

    pub fn num_tasks(&self) -> usize {
        self.costs.len()
    }

    pub fn num_agents(&self) -> usize {
        self.capacities.len()
    }

    pub fn validate(&self) -> Result<(), ProblemError> {
        if self.costs.is_empty() {
            return Err(ProblemError::Empty { field: "costs" });
        }
        if self.capacities.is_empty() {
            return Err(ProblemError::Empty { field: "capacities" });
        }
        let agents = self.num_agents();
        ensure_matrix("costs", &self.costs, agents)?;
        if self.weights.len() != self.num_tasks() {
            return Err(ProblemError::LengthMismatch {
                field: "weights",
                expected: self.num_tasks(),
                found: self.weights.len(),
            });
        }
        ensure_matrix("weights", &self.weights, agents)?;
        ensure_finite("capacities", &self.capacities)?;
        if self.weights.iter().flatten().any(|&w| w < 0.0) {
            return Err(ProblemError::invalid("weights", "weights must be non-negative"));
        }
        if self.capacities.iter().any(|&c| c < 0.0) {
            return Err(ProblemError::invalid("capacities", "capacities must be non-negative"));
        }
        Ok(())
    }

    /// Total cost of `agent_of[task]`.
    pub fn cost(&self, agent_of: &[usize]) -> f64 {
        agent_of.iter().enumerate().map(|(t, &a)| self.costs[t][a]).sum()
    }

    /// Weight assigned to each agent.
    pub fn loads(&self, agent_of: &[usize]) -> Vec<f64> {
        let mut loads = vec![0.0; self.num_agents()];
        for (t, &a) in agent_of.iter().enumerate() {
            loads[a] += self.weights[t][a];
        }
        loads
    }

    pub fn is_feasible(&self, agent_of: &[usize]) -> bool {
        agent_of.len() == self.num_tasks()
            && self
                .loads(agent_of)
                .iter()
                .zip(&self.capacities)
                .all(|(load, cap)| *load <= cap + LOAD_TOLERANCE)
    }

    /// Task×agent 0/1 matrix for an assignment.
    fn to_matrix(&self, agent_of: &[usize]) -> Vec<Vec<u8>> {
        agent_of
            .iter()
            .map(|&a| {
                let mut row = vec![0; self.num_agents()];
                row[a] = 1;
                row
            })
            .collect()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagrangianStatus {
    /// The gap closed, the lower bound stalled, or the subgradient vanished.
    Converged,
    IterationLimit,
    Timeout,
}

impl LagrangianStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LagrangianStatus::Converged => "converged",
            LagrangianStatus::IterationLimit => "iteration-limit",
            LagrangianStatus::Timeout => "timeout",
        }
    }
}

impl fmt::Display for LagrangianStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LagrangianResult {
    pub status: LagrangianStatus,

    /// Lower bound of every iteration, in order.
    pub lb_history: Vec<f64>,

    /// Cost of the best feasible assignment found.
    pub ub: Option<f64>,

    /// Best feasible assignment as a task×agent 0/1 matrix.
    pub best_solution: Option<Vec<Vec<u8>>>,

    /// Multipliers after the last update, one per agent.
    pub multipliers: Vec<f64>,

    pub logs: Vec<String>,
}

impl LagrangianResult {
    /// Best lower bound seen.
    pub fn lower_bound(&self) -> Option<f64> {
        self.lb_history.iter().copied().reduce(f64::max)
    }
}

/// Polyak step scale with halving after a run of non-improving iterations.
#[derive(Debug, Clone)]
struct StepSchedule {
    theta: f64,
    patience: usize,
    since_improvement: usize,
    best_lb: f64,
}

impl StepSchedule {
    fn new(settings: &LagrangianSettings) -> Self {
        Self {
            theta: settings.initial_step_scale,
            patience: settings.step_halving_patience,
            since_improvement: 0,
            best_lb: f64::NEG_INFINITY,
        }
    }

    fn observe(&mut self, lb: f64, tolerance: f64) {
        if lb > self.best_lb + tolerance {
            self.best_lb = lb;
            self.since_improvement = 0;
            return;
        }
        self.best_lb = self.best_lb.max(lb);
        self.since_improvement += 1;
        if self.patience > 0 && self.since_improvement >= self.patience {
            self.theta /= 2.0;
            self.since_improvement = 0;
            debug!("lagrangian: step scale halved to {}", self.theta);
        }
    }

    fn step(&self, gap: f64, norm_sq: f64) -> f64 {
        self.theta * gap.max(0.0) / norm_sq
    }
}

/// Projected subgradient driver.
#[derive(Debug, Clone, Default)]
pub struct LagrangianRelaxation {
    settings: LagrangianSettings,
}

impl LagrangianRelaxation {
    pub fn new(settings: LagrangianSettings) -> Self {
        Self { settings }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.settings.max_iterations = max;
        self
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.settings.time_limit_ms = Some(ms);
        self
    }

    pub fn solve(&self, instance: &AssignmentInstance) -> Result<LagrangianResult, ProblemError> {
        instance.validate()?;
        let tol = self.settings.tolerance;
        let deadline = Deadline::after_ms(self.settings.time_limit_ms);

        let mut multipliers = vec![0.0; instance.num_agents()];
        let mut schedule = StepSchedule::new(&self.settings);
        let mut lb_history: Vec<f64> = Vec::new();
        let mut logs = Vec::new();
        let mut best: Option<(f64, Vec<usize>)> = None;
        let mut stalled = 0;

        let mut status = LagrangianStatus::IterationLimit;
        for k in 0..self.settings.max_iterations {
            if deadline.expired() {
                status = LagrangianStatus::Timeout;
                break;
            }

            let (agent_of, lb) = self.relaxed_assignment(instance, &multipliers);
            if let Some(&previous) = lb_history.last() {
                stalled = if (lb - previous).abs() < tol { stalled + 1 } else { 0 };
            }
            lb_history.push(lb);
            schedule.observe(lb, tol);

            let subgradient: Vec<f64> = instance
                .loads(&agent_of)
                .iter()
                .zip(&instance.capacities)
                .map(|(load, cap)| load - cap)
                .collect();

            if instance.is_feasible(&agent_of) {
                offer(&mut best, instance, agent_of);
            }
            if self.settings.repair_interval > 0 && k % self.settings.repair_interval == 0 {
                if let Some(repaired) = greedy_repair(instance, &multipliers) {
                    offer(&mut best, instance, repaired);
                }
            }

            let ub = best.as_ref().map(|(cost, _)| *cost);
            let best_lb = schedule.best_lb;
            let ub_text = ub.map_or_else(|| "-".to_string(), |u| format!("{u:.2}"));

            let gap_closed = ub.is_some_and(|u| u - best_lb <= tol * u.abs().max(1.0));
            let norm_sq: f64 = subgradient.iter().map(|g| g * g).sum();
            if gap_closed || stalled >= self.settings.stall_limit || norm_sq <= f64::EPSILON {
                logs.push(format!("Iter {k}: LB={lb:.2}, UB={ub_text}, converged"));
                status = LagrangianStatus::Converged;
                break;
            }

            let gap = match ub {
                Some(u) => u - lb,
                None => 0.1 * lb.abs().max(1.0),
            };
            let step = schedule.step(gap, norm_sq);
            for (lambda, g) in multipliers.iter_mut().zip(&subgradient) {
                *lambda = (*lambda + step * g).max(0.0);
            }

            let line = format!("Iter {k}: LB={lb:.2}, UB={ub_text}, step={step:.4}");
            debug!("lagrangian: {line}");
            logs.push(line);
        }

        let ub = best.as_ref().map(|(cost, _)| *cost);
        info!(
            "lagrangian: {status} after {} iterations, best LB {:?}, UB {ub:?}",
            lb_history.len(),
            lb_history.iter().copied().reduce(f64::max)
        );

        Ok(LagrangianResult {
            status,
            lb_history,
            ub,
            best_solution: best.map(|(_, agent_of)| instance.to_matrix(&agent_of)),
            multipliers,
            logs,
        })
    }

    /// Cheapest agent per task under the Lagrangian cost `c + λ·w`, and the
    /// resulting lower bound.
    fn relaxed_assignment(&self, instance: &AssignmentInstance, multipliers: &[f64]) -> (Vec<usize>, f64) {
        let mut agent_of = Vec::with_capacity(instance.num_tasks());
        let mut bound = 0.0;
        for t in 0..instance.num_tasks() {
            let mut best_agent = 0;
            let mut best_cost = f64::INFINITY;
            for (a, lambda) in multipliers.iter().enumerate() {
                let cost = instance.costs[t][a] + lambda * instance.weights[t][a];
                if cost < best_cost {
                    best_cost = cost;
                    best_agent = a;
                }
            }
            agent_of.push(best_agent);
            bound += best_cost;
        }
        let penalty: f64 = multipliers.iter().zip(&instance.capacities).map(|(l, c)| l * c).sum();
        (agent_of, bound - penalty)
    }
}

/// Keep `candidate` if it is cheaper than the current best.
fn offer(best: &mut Option<(f64, Vec<usize>)>, instance: &AssignmentInstance, candidate: Vec<usize>) {
    let cost = instance.cost(&candidate);
    if best.as_ref().is_none_or(|(current, _)| cost < *current) {
        *best = Some((cost, candidate));
    }
}

/// Assign (task, agent) pairs in order of Lagrangian cost while capacity lasts.
///
/// Returns None when some task could not be placed.
fn greedy_repair(instance: &AssignmentInstance, multipliers: &[f64]) -> Option<Vec<usize>> {
    let mut pairs: Vec<(f64, usize, usize)> = (0..instance.num_tasks())
        .flat_map(|t| {
            multipliers
                .iter()
                .enumerate()
                .map(move |(a, lambda)| (instance.costs[t][a] + lambda * instance.weights[t][a], t, a))
        })
        .collect();
    pairs.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)).then(x.2.cmp(&y.2)));

    let mut remaining = instance.capacities.clone();
    let mut agent_of: Vec<Option<usize>> = vec![None; instance.num_tasks()];
    for (_, t, a) in pairs {
        let w = instance.weights[t][a];
        if agent_of[t].is_none() && w <= remaining[a] + LOAD_TOLERANCE {
            agent_of[t] = Some(a);
            remaining[a] -= w;
        }
    }
    agent_of.into_iter().collect()
}

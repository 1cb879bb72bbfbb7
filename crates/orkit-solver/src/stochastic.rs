//! Two-stage stochastic farm planning, solved as one deterministic
//! equivalent LP.
//!
//! Acres per crop are decided before the harvest; each scenario then chooses
//! how much to sell and buy given its yields.

use log::info;

use crate::error::{ensure_finite, ProblemError};
use crate::problem::LinearProgram;
use crate::settings::LpSettings;
use crate::simplex::Solver;
use crate::solution::SolutionStatus;

/// Number of crops: wheat, corn, sugar beets.
pub const CROPS: usize = 3;

/// Recourse variables per scenario.
const RECOURSE_VARS: usize = 6;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub probability: f64,
    /// Yield per acre of wheat, corn and beets.
    pub yields: [f64; CROPS],
}

impl Scenario {
    pub fn new(name: impl Into<String>, probability: f64, yields: [f64; CROPS]) -> Self {
        Self {
            name: name.into(),
            probability,
            yields,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticInstance {
    pub total_land: f64,
    pub scenarios: Vec<Scenario>,
}

impl StochasticInstance {
    pub fn new(total_land: f64, scenarios: Vec<Scenario>) -> Self {
        Self { total_land, scenarios }
    }

    /// Probabilities need not sum to one; the objective weights scenarios as given.
    pub fn validate(&self) -> Result<(), ProblemError> {
        if !self.total_land.is_finite() || self.total_land < 0.0 {
            return Err(ProblemError::invalid("total_land", "must be a non-negative number"));
        }
        if self.scenarios.is_empty() {
            return Err(ProblemError::Empty { field: "scenarios" });
        }
        for (index, scenario) in self.scenarios.iter().enumerate() {
            if !scenario.probability.is_finite() || scenario.probability <= 0.0 {
                return Err(ProblemError::invalid(
                    "probability",
                    format!("scenario {index} must have a positive probability"),
                ));
            }
            ensure_finite("yields", &scenario.yields)?;
            if scenario.yields.iter().any(|&y| y < 0.0) {
                return Err(ProblemError::invalid("yields", format!("scenario {index} has a negative yield")));
            }
        }
        Ok(())
    }
}

/// Prices, costs and requirements of the farm.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct FarmEconomics {
    /// Planting cost per acre of wheat, corn and beets.
    pub planting_cost: [f64; CROPS],
    /// Selling price of wheat and corn.
    pub sell_price: [f64; 2],
    /// Purchase price of wheat and corn.
    pub purchase_price: [f64; 2],
    /// Feed requirement of wheat and corn.
    pub demand: [f64; 2],
    /// Beet price up to the quota.
    pub beet_price: f64,
    /// Beet price above the quota.
    pub beet_excess_price: f64,
    pub beet_quota: f64,
}

impl Default for FarmEconomics {
    fn default() -> Self {
        Self {
            planting_cost: [150.0, 230.0, 260.0],
            sell_price: [170.0, 150.0],
            purchase_price: [238.0, 210.0],
            demand: [200.0, 240.0],
            beet_price: 36.0,
            beet_excess_price: 10.0,
            beet_quota: 6000.0,
        }
    }
}

impl FarmEconomics {
    fn planting_cost(&self, acres: &[f64]) -> f64 {
        self.planting_cost.iter().zip(acres).map(|(c, a)| c * a).sum()
    }

    /// Sales minus purchases for one scenario's recourse.
    fn recourse_value(&self, r: &Recourse) -> f64 {
        self.sell_price[0] * r.wheat_sold + self.sell_price[1] * r.corn_sold + self.beet_price * r.beets_sold
            + self.beet_excess_price * r.beets_sold_excess
            - self.purchase_price[0] * r.wheat_bought
            - self.purchase_price[1] * r.corn_bought
    }
}

/// Second-stage decisions of one scenario.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Recourse {
    pub wheat_sold: f64,
    pub corn_sold: f64,
    pub wheat_bought: f64,
    pub corn_bought: f64,
    /// Beets sold within the quota.
    pub beets_sold: f64,
    pub beets_sold_excess: f64,
}

impl Recourse {
    fn from_slice(v: &[f64]) -> Self {
        Self {
            wheat_sold: v[0],
            corn_sold: v[1],
            wheat_bought: v[2],
            corn_bought: v[3],
            beets_sold: v[4],
            beets_sold_excess: v[5],
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticResult {
    pub status: SolutionStatus,

    /// Probability-weighted profit; None unless optimal.
    pub expected_profit: Option<f64>,

    /// Acres of wheat, corn and beets; empty unless optimal.
    pub x: Vec<f64>,

    /// Profit realized in each scenario with the chosen acres.
    pub scenario_profits: Vec<f64>,

    pub recourse: Vec<Recourse>,
}

impl StochasticResult {
    pub fn success(&self) -> bool {
        self.status.is_optimal()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StochasticSolver {
    economics: FarmEconomics,
    lp: Solver,
}

impl StochasticSolver {
    pub fn new(lp_settings: LpSettings) -> Self {
        Self {
            economics: FarmEconomics::default(),
            lp: Solver::with_settings(lp_settings),
        }
    }

    pub fn with_economics(mut self, economics: FarmEconomics) -> Self {
        self.economics = economics;
        self
    }

    pub fn solve(&self, instance: &StochasticInstance) -> Result<StochasticResult, ProblemError> {
        instance.validate()?;
        let program = self.deterministic_equivalent(instance)?;
        let solution = self.lp.solve(&program)?;

        if solution.status != SolutionStatus::Optimal {
            info!("stochastic: deterministic equivalent ended with {}", solution.status);
            return Ok(StochasticResult {
                status: solution.status,
                expected_profit: None,
                x: Vec::new(),
                scenario_profits: Vec::new(),
                recourse: Vec::new(),
            });
        }

        let acres = solution.values[..CROPS].to_vec();
        let planting = self.economics.planting_cost(&acres);
        let recourse: Vec<Recourse> = solution.values[CROPS..]
            .chunks(RECOURSE_VARS)
            .map(Recourse::from_slice)
            .collect();
        let scenario_profits = recourse
            .iter()
            .map(|r| self.economics.recourse_value(r) - planting)
            .collect();

        info!(
            "stochastic: expected profit {:.2} with acres {:?} over {} scenarios",
            solution.objective_value,
            acres,
            instance.scenarios.len()
        );

        Ok(StochasticResult {
            status: solution.status,
            expected_profit: Some(solution.objective_value),
            x: acres,
            scenario_profits,
            recourse,
        })
    }

    /// Variables: acres (3), then per scenario wheat sold, corn sold, wheat
    /// bought, corn bought, beets sold within quota, beets sold above quota.
    fn deterministic_equivalent(&self, instance: &StochasticInstance) -> Result<LinearProgram, ProblemError> {
        let e = &self.economics;
        let n = CROPS + RECOURSE_VARS * instance.scenarios.len();

        let mut objective = vec![0.0; n];
        for (crop, cost) in e.planting_cost.iter().enumerate() {
            objective[crop] = -cost;
        }
        for (s, scenario) in instance.scenarios.iter().enumerate() {
            let p = scenario.probability;
            let base = CROPS + s * RECOURSE_VARS;
            objective[base] = p * e.sell_price[0];
            objective[base + 1] = p * e.sell_price[1];
            objective[base + 2] = -p * e.purchase_price[0];
            objective[base + 3] = -p * e.purchase_price[1];
            objective[base + 4] = p * e.beet_price;
            objective[base + 5] = p * e.beet_excess_price;
        }

        let mut program = LinearProgram::new(objective, true);
        let mut land = vec![0.0; n];
        land[..CROPS].fill(1.0);
        program.add_constraint(land, instance.total_land);

        for (s, scenario) in instance.scenarios.iter().enumerate() {
            let base = CROPS + s * RECOURSE_VARS;
            let y = scenario.yields;

            // Grain: yield·x + bought - sold >= demand
            for grain in 0..2 {
                let mut row = vec![0.0; n];
                row[grain] = -y[grain];
                row[base + grain] = 1.0;
                row[base + 2 + grain] = -1.0;
                program.add_constraint(row, -e.demand[grain]);
            }

            let mut beets = vec![0.0; n];
            beets[2] = -y[2];
            beets[base + 4] = 1.0;
            beets[base + 5] = 1.0;
            program.add_constraint(beets, 0.0);

            let mut quota = vec![0.0; n];
            quota[base + 4] = 1.0;
            program.add_constraint(quota, e.beet_quota);
        }

        program.validate()?;
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> StochasticInstance {
        let p = 1.0 / 3.0;
        StochasticInstance::new(
            500.0,
            vec![
                Scenario::new("Above", p, [3.0, 3.6, 24.0]),
                Scenario::new("Average", p, [2.5, 3.0, 20.0]),
                Scenario::new("Below", p, [2.0, 2.4, 16.0]),
            ],
        )
    }

    #[test]
    fn test_classic_farmer() {
        let result = StochasticSolver::default().solve(&classic()).unwrap();

        assert!(result.success());
        let profit = result.expected_profit.unwrap();
        assert!((profit - 108_390.0).abs() < 1e-3, "expected profit {profit}");
        for (got, want) in result.x.iter().zip([170.0, 80.0, 250.0]) {
            assert!((got - want).abs() < 1e-6, "acres {:?}", result.x);
        }
        assert_eq!(result.recourse.len(), 3);
    }

    #[test]
    fn test_expected_profit_is_weighted_scenario_profit() {
        let instance = StochasticInstance::new(
            100.0,
            vec![
                Scenario::new("S1", 0.5, [3.0, 3.6, 24.0]),
                Scenario::new("S2", 0.5, [2.5, 3.0, 20.0]),
            ],
        );
        let result = StochasticSolver::default().solve(&instance).unwrap();

        assert!(result.success());
        assert_eq!(result.x.len(), 3);
        assert!(result.x.iter().sum::<f64>() <= 100.0 + 1e-6);
        let weighted: f64 = instance
            .scenarios
            .iter()
            .zip(&result.scenario_profits)
            .map(|(s, profit)| s.probability * profit)
            .sum();
        let expected = result.expected_profit.unwrap();
        assert!((weighted - expected).abs() < 1e-6 * expected.abs().max(1.0));
    }

    #[test]
    fn test_probabilities_are_used_as_given() {
        // Weights summing to 1.2 are not normalized; planting is paid once
        let instance = StochasticInstance::new(
            100.0,
            vec![
                Scenario::new("S1", 0.6, [3.0, 3.6, 24.0]),
                Scenario::new("S2", 0.6, [2.5, 3.0, 20.0]),
            ],
        );
        let solver = StochasticSolver::default();
        let result = solver.solve(&instance).unwrap();
        assert!(result.success());

        let economics = FarmEconomics::default();
        let planting = economics.planting_cost(&result.x);
        let weighted_recourse: f64 = instance
            .scenarios
            .iter()
            .zip(&result.recourse)
            .map(|(s, r)| s.probability * economics.recourse_value(r))
            .sum();
        let expected = result.expected_profit.unwrap();
        assert!((expected - (weighted_recourse - planting)).abs() < 1e-6 * expected.abs().max(1.0));

        let weighted_profit: f64 = instance
            .scenarios
            .iter()
            .zip(&result.scenario_profits)
            .map(|(s, profit)| s.probability * profit)
            .sum();
        assert!((weighted_profit - (expected - 0.2 * planting)).abs() < 1e-6 * expected.abs().max(1.0));
    }

    #[test]
    fn test_recourse_meets_feed_demand() {
        let instance = classic();
        let result = StochasticSolver::default().solve(&instance).unwrap();
        let economics = FarmEconomics::default();

        for (scenario, r) in instance.scenarios.iter().zip(&result.recourse) {
            let wheat = scenario.yields[0] * result.x[0] + r.wheat_bought - r.wheat_sold;
            let corn = scenario.yields[1] * result.x[1] + r.corn_bought - r.corn_sold;
            assert!(wheat >= economics.demand[0] - 1e-6);
            assert!(corn >= economics.demand[1] - 1e-6);
            assert!(r.beets_sold <= economics.beet_quota + 1e-6);
            assert!(r.beets_sold + r.beets_sold_excess <= scenario.yields[2] * result.x[2] + 1e-6);
        }
    }

    #[test]
    fn test_custom_economics() {
        // Beets worthless: no acres should go to them
        let economics = FarmEconomics {
            beet_price: 0.0,
            beet_excess_price: 0.0,
            ..FarmEconomics::default()
        };
        let result = StochasticSolver::default()
            .with_economics(economics)
            .solve(&classic())
            .unwrap();
        assert!(result.x[2].abs() < 1e-6);
    }

    #[test]
    fn test_rejects_zero_probability() {
        let instance = StochasticInstance::new(100.0, vec![Scenario::new("S", 0.0, [1.0, 1.0, 1.0])]);
        let err = StochasticSolver::default().solve(&instance).unwrap_err();
        assert_eq!(err.field(), "probability");
    }
}

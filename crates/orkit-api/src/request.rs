//! Wire request types and their conversion into engine instances.
//!
//! Conversion enforces [`Limits`] and the shape rules of each engine, so a
//! request that converts cleanly can be solved without further checks.

use orkit_solver::{
    AssignmentInstance, CuttingStockInstance, LinearProgram, Scenario, StochasticInstance, VarBounds, CROPS,
};
use serde::{Deserialize, Serialize};

use crate::config::Limits;
use crate::error::ApiError;

/// One variable's `[lower, upper]`; `null` upper means unbounded above.
pub type BoundPair = [Option<f64>; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpRequest {
    pub c: Vec<f64>,
    #[serde(rename = "A_ub")]
    pub a_ub: Vec<Vec<f64>>,
    pub b_ub: Vec<f64>,
    /// Per-variable bounds; a `null` entry keeps the default `[0, null]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Vec<Option<BoundPair>>>,
    #[serde(default)]
    pub maximize: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpRequest {
    pub c: Vec<f64>,
    #[serde(rename = "A_ub")]
    pub a_ub: Vec<Vec<f64>>,
    pub b_ub: Vec<f64>,
    #[serde(default = "default_true")]
    pub maximize: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGenerationRequest {
    pub roll_length: f64,
    /// `[width, quantity]` pairs.
    pub demands: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagrangianRequest {
    pub costs: Vec<Vec<f64>>,
    pub weights: Vec<Vec<f64>>,
    pub capacities: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub name: String,
    pub probability: f64,
    pub yields: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticRequest {
    pub total_land: f64,
    pub scenarios: Vec<ScenarioRequest>,
}

fn dense_program(
    c: Vec<f64>,
    a_ub: Vec<Vec<f64>>,
    b_ub: Vec<f64>,
    maximize: bool,
    limits: &Limits,
) -> Result<LinearProgram, ApiError> {
    Limits::check("c", c.len(), limits.max_variables)?;
    Limits::check("A_ub", a_ub.len(), limits.max_constraints)?;
    Ok(LinearProgram::from_dense(c, a_ub, b_ub, maximize)?)
}

impl LpRequest {
    pub fn into_program(self, limits: &Limits) -> Result<LinearProgram, ApiError> {
        let mut program = dense_program(self.c, self.a_ub, self.b_ub, self.maximize, limits)?;
        if let Some(bounds) = self.bounds {
            let n = program.num_variables();
            if bounds.len() != n {
                return Err(ApiError::invalid(
                    "bounds",
                    format!("bounds has length {}, expected {n}", bounds.len()),
                ));
            }
            for (var, pair) in bounds.into_iter().enumerate() {
                let Some([lower, upper]) = pair else {
                    continue;
                };
                let lower = lower.ok_or_else(|| {
                    ApiError::invalid("bounds", format!("variable {var} needs a finite lower bound"))
                })?;
                program.set_bounds(var, VarBounds::new(lower, upper));
            }
            program.validate()?;
        }
        Ok(program)
    }
}

impl IpRequest {
    /// Every variable is integer-constrained.
    pub fn into_program(self, limits: &Limits) -> Result<LinearProgram, ApiError> {
        Ok(dense_program(self.c, self.a_ub, self.b_ub, self.maximize, limits)?.all_integer())
    }
}

impl ColumnGenerationRequest {
    pub fn into_instance(self, limits: &Limits) -> Result<CuttingStockInstance, ApiError> {
        Limits::check("demands", self.demands.len(), limits.max_items)?;
        let pairs: Vec<(f64, f64)> = self.demands.iter().map(|&[w, q]| (w, q)).collect();
        let instance = CuttingStockInstance::from_pairs(self.roll_length, &pairs);
        instance.validate()?;
        Ok(instance)
    }
}

impl LagrangianRequest {
    pub fn into_instance(self, limits: &Limits) -> Result<AssignmentInstance, ApiError> {
        Limits::check("costs", self.costs.len(), limits.max_tasks)?;
        Limits::check("capacities", self.capacities.len(), limits.max_agents)?;
        let instance = AssignmentInstance::new(self.costs, self.weights, self.capacities);
        instance.validate()?;
        Ok(instance)
    }
}

impl StochasticRequest {
    pub fn into_instance(self, limits: &Limits) -> Result<StochasticInstance, ApiError> {
        Limits::check("scenarios", self.scenarios.len(), limits.max_scenarios)?;
        let mut scenarios = Vec::with_capacity(self.scenarios.len());
        for (index, s) in self.scenarios.into_iter().enumerate() {
            limits.check_scenario_name(&s.name)?;
            let yields: [f64; CROPS] = s.yields.as_slice().try_into().map_err(|_| {
                ApiError::invalid(
                    "yields",
                    format!("scenario {index} has {} yields, expected {CROPS}", s.yields.len()),
                )
            })?;
            scenarios.push(Scenario::new(s.name, s.probability, yields));
        }
        let instance = StochasticInstance::new(self.total_land, scenarios);
        instance.validate()?;
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lp_request(json: &str) -> LpRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_lp_defaults() {
        let req = lp_request(r#"{"c": [1, 2], "A_ub": [[1, 1]], "b_ub": [4]}"#);
        assert!(!req.maximize);
        assert!(req.bounds.is_none());

        let ip: IpRequest = serde_json::from_str(r#"{"c": [1], "A_ub": [], "b_ub": []}"#).unwrap();
        assert!(ip.maximize);
    }

    #[test]
    fn test_lp_bounds() {
        let req = lp_request(r#"{"c": [1, 2], "A_ub": [], "b_ub": [], "bounds": [null, [1, 3]]}"#);
        let program = req.into_program(&Limits::default()).unwrap();
        assert_eq!(program.bounds[0], VarBounds::default());
        assert_eq!(program.bounds[1], VarBounds::new(1.0, Some(3.0)));

        let free = lp_request(r#"{"c": [1], "A_ub": [], "b_ub": [], "bounds": [[null, 3]]}"#);
        let err = free.into_program(&Limits::default()).unwrap_err();
        assert_eq!(err.field(), Some("bounds"));

        let crossed = lp_request(r#"{"c": [1], "A_ub": [], "b_ub": [], "bounds": [[4, 3]]}"#);
        assert_eq!(crossed.into_program(&Limits::default()).unwrap_err().field(), Some("bounds"));
    }

    #[test]
    fn test_size_limits() {
        let limits = Limits {
            max_variables: 2,
            ..Limits::default()
        };
        let req = lp_request(r#"{"c": [1, 2, 3], "A_ub": [], "b_ub": []}"#);
        let err = req.into_program(&limits).unwrap_err();
        assert_eq!(err.field(), Some("c"));
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_yields_must_have_three_entries() {
        let req: StochasticRequest = serde_json::from_str(
            r#"{"total_land": 10, "scenarios": [{"name": "S1", "probability": 1, "yields": [1, 2]}]}"#,
        )
        .unwrap();
        assert_eq!(req.into_instance(&Limits::default()).unwrap_err().field(), Some("yields"));
    }

    #[test]
    fn test_round_trip() {
        let req = lp_request(r#"{"c": [3, 2], "A_ub": [[2, 1]], "b_ub": [100], "bounds": [[0, 40], null], "maximize": true}"#);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"A_ub\""));
        assert_eq!(serde_json::from_str::<LpRequest>(&json).unwrap(), req);

        let stochastic = StochasticRequest {
            total_land: 500.0,
            scenarios: vec![ScenarioRequest {
                name: "Average".into(),
                probability: 1.0,
                yields: vec![2.5, 3.0, 20.0],
            }],
        };
        let json = serde_json::to_value(&stochastic).unwrap();
        assert_eq!(serde_json::from_value::<StochasticRequest>(json).unwrap(), stochastic);
    }
}

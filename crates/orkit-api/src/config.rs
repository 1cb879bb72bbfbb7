//! Request size limits and the combined configuration document.

use orkit_solver::Settings;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Upper bounds on request sizes. Requests beyond them are rejected before
/// any engine runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_variables: usize,
    pub max_constraints: usize,
    pub max_items: usize,
    pub max_tasks: usize,
    pub max_agents: usize,
    pub max_scenarios: usize,
    pub max_scenario_name: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_variables: 200,
            max_constraints: 200,
            max_items: 50,
            max_tasks: 100,
            max_agents: 50,
            max_scenarios: 50,
            max_scenario_name: 50,
        }
    }
}

impl Limits {
    pub(crate) fn check(field: &str, found: usize, limit: usize) -> Result<(), ApiError> {
        if found > limit {
            return Err(ApiError::invalid(
                field,
                format!("{field} has {found} entries, the limit is {limit}"),
            ));
        }
        Ok(())
    }

    /// Names are 1 to `max_scenario_name` characters from `[A-Za-z0-9 _-]`.
    pub(crate) fn check_scenario_name(&self, name: &str) -> Result<(), ApiError> {
        let len = name.chars().count();
        if len == 0 || len > self.max_scenario_name {
            return Err(ApiError::invalid(
                "name",
                format!("scenario name must be 1 to {} characters", self.max_scenario_name),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '_' || c == '-')
        {
            return Err(ApiError::invalid(
                "name",
                "scenario name may only contain letters, digits, spaces, underscores and hyphens",
            ));
        }
        Ok(())
    }
}

/// Everything a host can configure: engine settings plus request limits.
///
/// Both sections are optional in JSON; missing values take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: Settings,
    pub limits: Limits,
}

//! Endpoint routing.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use orkit_solver::{
    BranchAndBound, ColumnGeneration, LagrangianRelaxation, Settings, Solver, StochasticSolver,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::assemble::{PlotRenderer, ResultAssembler};
use crate::config::{Config, Limits};
use crate::error::ApiError;
use crate::request::{ColumnGenerationRequest, IpRequest, LagrangianRequest, LpRequest, StochasticRequest};
use crate::response::HealthResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    Lp,
    Ip,
    ColumnGeneration,
    Lagrangian,
    Stochastic,
}

impl Endpoint {
    pub const ALL: [Endpoint; 6] = [
        Endpoint::Health,
        Endpoint::Lp,
        Endpoint::Ip,
        Endpoint::ColumnGeneration,
        Endpoint::Lagrangian,
        Endpoint::Stochastic,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Health => "/api/health",
            Endpoint::Lp => "/api/lp",
            Endpoint::Ip => "/api/ip",
            Endpoint::ColumnGeneration => "/api/colgen",
            Endpoint::Lagrangian => "/api/lagrangian",
            Endpoint::Stochastic => "/api/stochastic",
        }
    }

    /// Short name, the last path segment.
    pub fn name(&self) -> &'static str {
        self.path().trim_start_matches("/api/")
    }

    /// Whether requests carry a JSON body.
    pub fn takes_body(&self) -> bool {
        !matches!(self, Endpoint::Health)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Accepts a full path (`/api/lp`) or a short name (`lp`); a trailing
/// slash is ignored.
impl FromStr for Endpoint {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('/');
        let name = trimmed.strip_prefix("/api/").unwrap_or(trimmed);
        Endpoint::ALL
            .into_iter()
            .find(|e| e.name() == name)
            .ok_or_else(|| ApiError::UnknownEndpoint(s.to_string()))
    }
}

/// A status code and JSON body, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    fn error(err: &ApiError) -> Self {
        Self {
            status: err.status_code(),
            body: serde_json::to_value(err.body()).unwrap_or(Value::Null),
        }
    }
}

/// Request handler. Holds configuration only, so one instance can serve any
/// number of requests; every engine run builds its own state.
#[derive(Default)]
pub struct Api {
    settings: Settings,
    limits: Limits,
    renderer: Option<Box<dyn PlotRenderer>>,
}

impl Api {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            settings: config.solver,
            limits: config.limits,
            renderer: None,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn PlotRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Route `body` to the endpoint at `path` and wrap the outcome.
    pub fn handle(&self, path: &str, body: &str) -> Response {
        match self.handle_str(path, body) {
            Ok(body) => Response { status: 200, body },
            Err(err) => {
                warn!("{path}: {err}");
                Response::error(&err)
            }
        }
    }

    fn handle_str(&self, path: &str, body: &str) -> Result<Value, ApiError> {
        let endpoint: Endpoint = path.parse()?;
        let request = if endpoint.takes_body() {
            serde_json::from_str(body)?
        } else {
            Value::Null
        };
        self.dispatch(endpoint, request)
    }

    /// Solve an already-decoded request.
    pub fn dispatch(&self, endpoint: Endpoint, request: Value) -> Result<Value, ApiError> {
        debug!("{endpoint}: dispatching request");
        let assembler = ResultAssembler::new(self.renderer.as_deref());
        let s = &self.settings;
        match endpoint {
            Endpoint::Health => to_json(HealthResponse::default()),
            Endpoint::Lp => {
                let program = decode::<LpRequest>(request)?.into_program(&self.limits)?;
                let solution = Solver::with_settings(s.lp.clone()).solve(&program)?;
                to_json(assembler.lp(&program, solution))
            }
            Endpoint::Ip => {
                let program = decode::<IpRequest>(request)?.into_program(&self.limits)?;
                let result = BranchAndBound::new(s.branch.clone(), s.lp.clone()).solve(&program)?;
                to_json(assembler.ip(result))
            }
            Endpoint::ColumnGeneration => {
                let instance = decode::<ColumnGenerationRequest>(request)?.into_instance(&self.limits)?;
                let result =
                    ColumnGeneration::new(s.column_generation.clone(), s.lp.clone()).solve(&instance)?;
                to_json(assembler.column_generation(result))
            }
            Endpoint::Lagrangian => {
                let instance = decode::<LagrangianRequest>(request)?.into_instance(&self.limits)?;
                let result = LagrangianRelaxation::new(s.lagrangian.clone()).solve(&instance)?;
                to_json(assembler.lagrangian(result))
            }
            Endpoint::Stochastic => {
                let instance = decode::<StochasticRequest>(request)?.into_instance(&self.limits)?;
                let result = StochasticSolver::new(s.lp.clone()).solve(&instance)?;
                to_json(assembler.stochastic(&instance, result))
            }
        }
    }

    /// Decode and validate a request without solving it.
    pub fn check(&self, path: &str, body: &str) -> Result<Endpoint, ApiError> {
        let endpoint: Endpoint = path.parse()?;
        if !endpoint.takes_body() {
            return Ok(endpoint);
        }
        let request: Value = serde_json::from_str(body)?;
        match endpoint {
            Endpoint::Health => {}
            Endpoint::Lp => {
                decode::<LpRequest>(request)?.into_program(&self.limits)?;
            }
            Endpoint::Ip => {
                decode::<IpRequest>(request)?.into_program(&self.limits)?;
            }
            Endpoint::ColumnGeneration => {
                decode::<ColumnGenerationRequest>(request)?.into_instance(&self.limits)?;
            }
            Endpoint::Lagrangian => {
                decode::<LagrangianRequest>(request)?.into_instance(&self.limits)?;
            }
            Endpoint::Stochastic => {
                decode::<StochasticRequest>(request)?.into_instance(&self.limits)?;
            }
        }
        Ok(endpoint)
    }
}

fn decode<T: DeserializeOwned>(request: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(request)?)
}

fn to_json<T: Serialize>(response: T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(response)?)
}

/// Handle one request with default limits and no plot renderer.
pub fn handle(path: &str, body: &str, settings: &Settings) -> Response {
    Api::new(settings.clone()).handle(path, body)
}

//! JSON front end for the orkit engines.
//!
//! [`Api::handle`] takes an endpoint path and a request body and returns a
//! status code with a JSON body. Hosts (an HTTP server, the CLI, a browser
//! through the `wasm` feature) only move bytes in and out.

mod assemble;
mod config;
mod error;
mod request;
mod response;
mod router;

#[cfg(feature = "wasm")]
mod wasm;

pub use assemble::{PlotRenderer, PlotSpec, ResultAssembler, MAX_PLOT_NODES};
pub use config::{Config, Limits};
pub use error::{ApiError, ErrorBody};
pub use request::{
    BoundPair, ColumnGenerationRequest, IpRequest, LagrangianRequest, LpRequest, ScenarioRequest, StochasticRequest,
};
pub use response::{
    ColumnGenerationResponse, HealthResponse, IpResponse, LagrangianResponse, LpResponse, StochasticResponse, TreeNode,
};
pub use router::{handle, Api, Endpoint, Response};

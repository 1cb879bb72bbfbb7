//! WASM bindings
//!
//! Requests and responses cross the boundary as plain JS objects.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::Config;
use crate::router::{Api, Endpoint};

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn api(config: JsValue) -> Result<Api, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(Api::default());
    }
    let config: Config = serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(Api::from_config(config))
}

/// Solve a request object at `endpoint` (e.g. `"lp"` or `"/api/lp"`).
///
/// `config` may be omitted; errors reject with the `{detail, field}` body.
#[wasm_bindgen]
pub fn solve(endpoint: &str, request: JsValue, config: JsValue) -> Result<JsValue, JsValue> {
    let api = api(config)?;
    let request: serde_json::Value =
        serde_wasm_bindgen::from_value(request).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let outcome = endpoint.parse::<Endpoint>().and_then(|e| api.dispatch(e, request));
    match outcome {
        Ok(response) => to_js(&response),
        Err(err) => Err(to_js(&err.body())?),
    }
}

/// Validate a request object without solving it, under the same `config`
/// that `solve` would use.
#[wasm_bindgen]
pub fn check(endpoint: &str, request: JsValue, config: JsValue) -> Result<JsValue, JsValue> {
    let api = api(config)?;
    let body = stringify(request)?;
    match api.check(endpoint, &body) {
        Ok(endpoint) => Ok(JsValue::from_str(endpoint.path())),
        Err(err) => Err(to_js(&err.body())?),
    }
}

/// Paths of every endpoint.
#[wasm_bindgen]
pub fn endpoints() -> Result<JsValue, JsValue> {
    let paths: Vec<&str> = Endpoint::ALL.iter().map(|e| e.path()).collect();
    to_js(&paths)
}

fn stringify(value: JsValue) -> Result<String, JsValue> {
    let value: serde_json::Value =
        serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&value).map_err(|e| JsValue::from_str(&e.to_string()))
}

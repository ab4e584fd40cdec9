use lambda_runtime::tracing;
use serde_json::Value;

use crate::AppState;
use crate::domain::{greeting, multiply};
use crate::metrics::HELLO_WORLD_INVOCATIONS;
use crate::models::{HealthResponse, HelloResponse};

pub fn health(state: &AppState) -> anyhow::Result<Value> {
    let config = state.config();
    let checks = config
        .checks()
        .into_iter()
        .map(|(name, set)| (name, if set { "configured" } else { "not_configured" }))
        .collect();

    Ok(serde_json::to_value(HealthResponse {
        status: "healthy",
        service: config.service_name().to_string(),
        environment: config.environment().to_string(),
        checks,
    })?)
}

pub fn hello(state: &AppState) -> anyhow::Result<Value> {
    state.metrics().count(HELLO_WORLD_INVOCATIONS);

    let greeting = greeting("Lambda");
    tracing::info!(helper_test = ?greeting, "Hello world API - HTTP 200");

    Ok(serde_json::to_value(HelloResponse {
        message: "hello world",
        helper_module_test: greeting,
        multiplication_result: multiply(6, 7),
    })?)
}

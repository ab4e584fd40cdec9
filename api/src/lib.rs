use std::sync::atomic::{AtomicBool, Ordering};

use aws_config::{BehaviorVersion, SdkConfig, retry::RetryConfig};
use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use aws_lambda_events::eventbridge::EventBridgeEvent;
use lambda_runtime::tracing::{self, Instrument};
use lambda_runtime::LambdaEvent;
use serde_json::Value;
use services::Connections;

use crate::config::Config;
use crate::domain::Users;
use crate::metrics::Metrics;
use crate::request::Request;
use crate::response::Rendered;
use crate::router::{RouteError, RouteTable};

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
mod handlers;
pub mod metrics;
pub mod models;
pub mod request;
pub mod response;
pub mod router;
pub mod validation;

const SCHEDULER_SOURCE: &str = "aws.events";

pub async fn get_aws_config() -> SdkConfig {
    let version = BehaviorVersion::v2025_01_17();
    let retry_config = RetryConfig::standard().with_max_attempts(3);

    aws_config::defaults(version)
        .retry_config(retry_config)
        .load()
        .await
}

/// Process-wide state shared by every invocation of a warm container.
#[derive(Debug)]
pub struct AppState {
    config: Config,
    connections: Connections,
    users: Users,
    metrics: Metrics,
    routes: RouteTable,
    cold_start: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, aws_config: &SdkConfig) -> Result<AppState, RouteError> {
        let connections = Connections::new(aws_config, config.environment());
        AppState::with_connections(config, connections)
    }

    pub fn with_connections(
        config: Config,
        connections: Connections,
    ) -> Result<AppState, RouteError> {
        Ok(AppState {
            metrics: Metrics::new(config.metrics_namespace(), config.service_name()),
            routes: RouteTable::standard()?,
            users: Users::default(),
            cold_start: AtomicBool::new(true),
            connections,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    pub fn users(&self) -> &Users {
        &self.users
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    fn take_cold_start(&self) -> bool {
        self.cold_start.swap(false, Ordering::Relaxed)
    }
}

enum Trigger {
    Schedule(EventBridgeEvent),
    Api(Box<ApiGatewayProxyRequest>),
}

impl Trigger {
    fn classify(payload: Value) -> serde_json::Result<Trigger> {
        if payload.get("source").and_then(Value::as_str) == Some(SCHEDULER_SOURCE) {
            Ok(Trigger::Schedule(serde_json::from_value(payload)?))
        } else {
            Ok(Trigger::Api(Box::new(serde_json::from_value(payload)?)))
        }
    }
}

fn correlation_id(payload: &Value, fallback: &str) -> String {
    payload
        .pointer("/requestContext/requestId")
        .or_else(|| payload.get("id"))
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

async fn route(state: &AppState, payload: Value) -> anyhow::Result<Rendered> {
    match Trigger::classify(payload)? {
        Trigger::Schedule(event) => {
            tracing::info!("Scheduled event received from {}", event.source);
            dispatch::settle(handlers::tasks::nightly_email(state).await)
        }
        Trigger::Api(event) => {
            let request = match Request::try_from(*event) {
                Ok(request) => request,
                Err(err) => return Ok(response::render_error(&err)?),
            };
            tracing::info!(
                user_agent = request.header("user-agent"),
                "{} {}",
                request.method(),
                request.path()
            );
            dispatch::render(dispatch::dispatch(state, request).await)
        }
    }
}

/// Lambda entrypoint. Scheduler events run the nightly email task; anything
/// else is treated as an API Gateway proxy request. Errors that are not
/// domain errors are returned to the runtime unchanged.
pub async fn handle(
    state: &AppState,
    event: LambdaEvent<Value>,
) -> anyhow::Result<ApiGatewayProxyResponse> {
    let (payload, context) = event.into_parts();

    if state.take_cold_start() {
        state.metrics.cold_start(&context.env_config.function_name);
    }

    let correlation_id = correlation_id(&payload, &context.request_id);
    let span = tracing::info_span!("invocation", correlation_id = %correlation_id);

    let rendered = route(state, payload).instrument(span.clone()).await?;

    span.in_scope(|| tracing::info!("Responding with status {}", rendered.status));
    Ok(ApiGatewayProxyResponse::from(rendered))
}

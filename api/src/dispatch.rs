//! Per-invocation pipeline: route match, body validation, handler call and
//! rendering of the outcome.

use lambda_runtime::tracing;
use serde_json::Value;

use crate::AppState;
use crate::error::AppError;
use crate::handlers::{files, system, tasks, users};
use crate::models::{CreateUserRequest, UploadFileRequest};
use crate::request::Request;
use crate::response::{
    Rendered, render_error, render_route_not_found, render_schema_error, render_success,
};
use crate::router::Operation;
use crate::validation::{SchemaError, validate};

/// How far a request got through the pipeline.
#[derive(Debug)]
pub enum Outcome {
    /// The handler ran; holds its result or error.
    Handled(anyhow::Result<Value>),
    /// The body failed schema validation; the handler never ran.
    Invalid(SchemaError),
    NoRoute,
}

pub async fn dispatch(state: &AppState, mut request: Request) -> Outcome {
    let Some(route) = state.routes().resolve(request.method(), request.path()) else {
        tracing::info!("No route for {} {}", request.method(), request.path());
        return Outcome::NoRoute;
    };
    request.set_path_params(route.params);

    let result = match route.operation {
        Operation::Health => system::health(state),
        Operation::Hello => system::hello(state),
        Operation::CreateUser => match validate::<CreateUserRequest>(request.body()) {
            Ok(payload) => users::create(state, payload),
            Err(err) => return Outcome::Invalid(err),
        },
        Operation::GetUser => users::get(state, &request),
        Operation::UploadFile => match validate::<UploadFileRequest>(request.body()) {
            Ok(payload) => files::upload(state, payload).await,
            Err(err) => return Outcome::Invalid(err),
        },
        Operation::DownloadFile => files::download(state, &request).await,
        Operation::ListFiles => files::list(state, &request).await,
        Operation::DeleteFile => files::delete(state, &request).await,
        Operation::NightlyEmail => tasks::nightly_email(state).await,
    };
    Outcome::Handled(result)
}

/// Turn a handler result into a response. Domain errors are normalized into
/// the envelope; any other error is returned as is.
pub fn settle(result: anyhow::Result<Value>) -> anyhow::Result<Rendered> {
    match result {
        Ok(data) => Ok(render_success(data)?),
        Err(err) => match err.downcast::<AppError>() {
            Ok(err) => {
                tracing::warn!("{} ({}): {}", err.kind().name(), err.status(), err);
                Ok(render_error(&err)?)
            }
            Err(err) => {
                tracing::error!("Unhandled error: {:#}", err);
                Err(err)
            }
        },
    }
}

pub fn render(outcome: Outcome) -> anyhow::Result<Rendered> {
    match outcome {
        Outcome::Handled(result) => settle(result),
        Outcome::Invalid(err) => {
            tracing::warn!("Request validation failed: {}", err);
            Ok(render_schema_error(&err)?)
        }
        Outcome::NoRoute => Ok(render_route_not_found()?),
    }
}

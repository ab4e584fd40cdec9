use api::AppState;
use api::config::Config;
use lambda_runtime::{LambdaEvent, service_fn, tracing};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    lambda_runtime::tracing::init_default_subscriber();

    let config = Config::from_env();
    let aws_config = api::get_aws_config().await;
    let state = AppState::new(config, &aws_config)?;
    tracing::info!(
        "Starting {} in {} environment",
        state.config().service_name(),
        state.config().environment()
    );

    let state = &state;
    let service_fn = service_fn(move |event: LambdaEvent<Value>| async move {
        api::handle(state, event).await
    });
    lambda_runtime::run(service_fn).await
}

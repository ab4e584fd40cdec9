use lambda_runtime::tracing;
use serde_json::Value;

use crate::AppState;
use crate::error::AppError;
use crate::metrics::USER_CREATIONS;
use crate::models::{CreateUserRequest, CreateUserResponse};
use crate::request::Request;

pub fn create(state: &AppState, payload: CreateUserRequest) -> anyhow::Result<Value> {
    tracing::info!(user_data = ?payload, "Creating user");
    state.metrics().count(USER_CREATIONS);

    let user = state.users().create(
        &payload.name,
        &payload.email,
        payload.age,
        payload.is_active,
    );

    Ok(serde_json::to_value(CreateUserResponse {
        status: "success",
        message: format!("User {} created successfully", user.name),
        user,
    })?)
}

pub fn get(state: &AppState, request: &Request) -> anyhow::Result<Value> {
    let raw_id = request.path_param("id").unwrap_or_default();
    let user_id: u64 = raw_id
        .parse()
        .map_err(|_| AppError::validation("Invalid user ID").detail("user_id", raw_id))?;

    let user = state.users().find(user_id).ok_or_else(|| {
        AppError::not_found(
            format!("User {user_id} not found"),
            Some("User"),
            Some(raw_id),
        )
    })?;

    Ok(serde_json::to_value(user)?)
}

use base64::Engine;
use base64::engine::general_purpose;
use lambda_runtime::tracing;
use serde_json::Value;
use services::ServiceError;

use crate::AppState;
use crate::error::AppError;
use crate::metrics::FILE_UPLOADS;
use crate::models::{
    DeleteFileResponse, DownloadFileResponse, ListFilesResponse, UploadFileRequest,
    UploadFileResponse,
};
use crate::request::Request;

const FILE_NAME_METADATA: &str = "file-name";

fn file_not_found(file_id: &str) -> AppError {
    AppError::not_found(format!("File {file_id} not found"), Some("File"), Some(file_id))
}

pub async fn upload(state: &AppState, payload: UploadFileRequest) -> anyhow::Result<Value> {
    let content = general_purpose::STANDARD
        .decode(payload.content.as_bytes())
        .map_err(|err| AppError::validation(format!("Invalid base64 content: {err}")))?;

    let storage = state.connections().storage(state.config().bucket())?;
    let file_id = uuid::Uuid::new_v4().to_string();

    let mut metadata = payload.metadata.unwrap_or_default();
    metadata.insert(FILE_NAME_METADATA.to_string(), payload.file_name.clone());

    let size = content.len();
    storage
        .put(&file_id, content, payload.content_type.as_deref(), Some(metadata))
        .await
        .map_err(|err| match err {
            ServiceError::Config(_) => anyhow::Error::from(err),
            err => AppError::validation(format!("Failed to upload file: {err}")).into(),
        })?;

    state.metrics().count(FILE_UPLOADS);
    tracing::info!("Stored {} ({} bytes) as {}", payload.file_name, size, file_id);

    Ok(serde_json::to_value(UploadFileResponse {
        file_id,
        file_name: payload.file_name,
        size,
        message: "File uploaded successfully",
    })?)
}

pub async fn download(state: &AppState, request: &Request) -> anyhow::Result<Value> {
    let file_id = request.path_param("id").unwrap_or_default();
    let storage = state.connections().storage(state.config().bucket())?;

    let content = storage.get(file_id).await.map_err(|err| match err {
        ServiceError::NotFound { .. } => file_not_found(file_id).into(),
        err => anyhow::Error::from(err),
    })?;

    Ok(serde_json::to_value(DownloadFileResponse {
        file_id: file_id.to_string(),
        size: content.len(),
        content: general_purpose::STANDARD.encode(&content),
        message: "File retrieved successfully",
    })?)
}

pub async fn list(state: &AppState, request: &Request) -> anyhow::Result<Value> {
    let prefix = request.query("prefix").unwrap_or_default();
    let storage = state.connections().storage(state.config().bucket())?;

    let files = storage.list(prefix).await?;

    Ok(serde_json::to_value(ListFilesResponse {
        count: files.len(),
        files,
    })?)
}

/// Checks existence first so a missing file is reported as 404. The check and
/// the delete are separate calls; a concurrent delete in between is tolerated.
pub async fn delete(state: &AppState, request: &Request) -> anyhow::Result<Value> {
    let file_id = request.path_param("id").unwrap_or_default();
    let storage = state.connections().storage(state.config().bucket())?;

    if !storage.exists(file_id).await? {
        return Err(file_not_found(file_id).into());
    }
    storage.delete(file_id).await?;

    Ok(serde_json::to_value(DeleteFileResponse {
        file_id: file_id.to_string(),
        message: "File deleted successfully",
    })?)
}

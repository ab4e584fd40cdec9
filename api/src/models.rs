//! Request and response contracts for the HTTP surface.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use services::ObjectSummary;

use crate::domain::{Greeting, User};
use crate::validation::{Field, Payload, Rule, Schema};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub age: u8,
    pub is_active: bool,
}

impl Payload for CreateUserRequest {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::required("name", Rule::string_len(Some(1), Some(100))),
            Field::required("email", Rule::string()),
            Field::required("age", Rule::int_range(Some(0), Some(150))),
            Field::with_default("is_active", Rule::Bool, true),
        ])
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadFileRequest {
    pub file_name: String,
    /// Base64-encoded file content.
    pub content: String,
    pub content_type: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

impl Payload for UploadFileRequest {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::required("file_name", Rule::string_len(Some(1), Some(255))),
            Field::required("content", Rule::string()),
            Field::optional("content_type", Rule::string()),
            Field::optional("metadata", Rule::Map(Box::new(Rule::string()))),
        ])
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub environment: String,
    pub checks: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct HelloResponse {
    pub message: &'static str,
    pub helper_module_test: Greeting,
    pub multiplication_result: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub status: &'static str,
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UploadFileResponse {
    pub file_id: String,
    pub file_name: String,
    pub size: usize,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DownloadFileResponse {
    pub file_id: String,
    pub content: String,
    pub size: usize,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<ObjectSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub file_id: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct NightlyEmailResponse {
    pub message: &'static str,
    pub message_id: String,
    pub recipient: String,
}

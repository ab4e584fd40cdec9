use serde::Serialize;
use serde_json::{Map, Value};

/// Kind of a domain error. The kind fixes the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    App,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::App => "AppError",
        }
    }

    fn status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::App => 500,
        }
    }
}

/// A business-rule failure raised by a handler and normalized into the
/// response envelope.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    status: u16,
    details: Map<String, Value>,
}

/// The `error` member of a failed envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub details: Map<String, Value>,
}

impl AppError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> AppError {
        AppError {
            kind,
            message: message.into(),
            status: kind.status(),
            details: Map::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> AppError {
        AppError::new(ErrorKind::Validation, message)
    }

    pub fn not_found(
        message: impl Into<String>,
        resource_type: Option<&str>,
        resource_id: Option<&str>,
    ) -> AppError {
        let mut err = AppError::new(ErrorKind::NotFound, message);
        if let Some(resource_type) = resource_type.filter(|s| !s.is_empty()) {
            err = err.detail("resource_type", resource_type);
        }
        if let Some(resource_id) = resource_id.filter(|s| !s.is_empty()) {
            err = err.detail("resource_id", resource_id);
        }
        err
    }

    pub fn conflict(message: impl Into<String>) -> AppError {
        AppError::new(ErrorKind::Conflict, message)
    }

    /// Generic application error, 500 unless overridden with [`AppError::with_status`].
    pub fn app(message: impl Into<String>) -> AppError {
        AppError::new(ErrorKind::App, message)
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> AppError {
        AppError {
            status,
            ..AppError::new(ErrorKind::App, message)
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> AppError {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    pub fn format(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind.name().to_string(),
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

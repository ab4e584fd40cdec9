use aws_sdk_s3::error::{BuildError, ProvideErrorMetadata};

/// Failures surfaced by the resource adapters.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{resource} not found: {key}")]
    NotFound { resource: &'static str, key: String },

    #[error("batch {operation} supports maximum {max} items, got {requested}")]
    BatchTooLarge {
        operation: &'static str,
        max: usize,
        requested: usize,
    },

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("{code}: {message}")]
    Remote { code: String, message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub(crate) fn remote<E>(err: &E) -> Self
    where
        E: ProvideErrorMetadata + std::fmt::Display,
    {
        ServiceError::Remote {
            code: err.code().unwrap_or("Unknown").to_string(),
            message: err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string()),
        }
    }

    pub(crate) fn check_batch(operation: &'static str, max: usize, requested: usize) -> ServiceResult<()> {
        if requested > max {
            return Err(ServiceError::BatchTooLarge {
                operation,
                max,
                requested,
            });
        }
        Ok(())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}

impl From<BuildError> for ServiceError {
    fn from(err: BuildError) -> Self {
        ServiceError::Invalid(err.to_string())
    }
}

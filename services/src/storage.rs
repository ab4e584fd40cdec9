use std::collections::HashMap;
use std::time::Duration;

use aws_sdk_s3 as s3;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use lambda_runtime::tracing;
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const DEFAULT_PRESIGN_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: String,
    pub last_modified: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignMethod {
    Get,
    Put,
}

/// Object store adapter bound to a single bucket.
#[derive(Debug)]
pub struct StorageService {
    bucket: String,
    client: s3::Client,
}

impl StorageService {
    pub fn new(client: s3::Client, bucket: impl Into<String>) -> StorageService {
        StorageService {
            bucket: bucket.into(),
            client,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn put(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: Option<&str>,
        metadata: Option<HashMap<String, String>>,
    ) -> ServiceResult<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content))
            .content_type(content_type.unwrap_or(DEFAULT_CONTENT_TYPE))
            .set_metadata(metadata.filter(|m| !m.is_empty()))
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to upload s3://{}/{}: {}", self.bucket, key, err);
                ServiceError::remote(&err)
            })?;

        tracing::info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(key.to_string())
    }

    pub async fn get(&self, key: &str) -> ServiceResult<Vec<u8>> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| match err {
                GetObjectError::NoSuchKey(_) => {
                    tracing::warn!("Object not found: s3://{}/{}", self.bucket, key);
                    ServiceError::NotFound {
                        resource: "object",
                        key: key.to_string(),
                    }
                }
                err => {
                    tracing::error!("Failed to download s3://{}/{}: {}", self.bucket, key, err);
                    ServiceError::remote(&err)
                }
            })?;

        let content = out
            .body
            .collect()
            .await
            .map_err(|err| ServiceError::Remote {
                code: "StreamError".to_string(),
                message: err.to_string(),
            })?
            .into_bytes()
            .to_vec();

        tracing::info!("Downloaded s3://{}/{}", self.bucket, key);
        Ok(content)
    }

    /// Deleting a missing key succeeds; S3 does not distinguish the two.
    pub async fn delete(&self, key: &str) -> ServiceResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to delete s3://{}/{}: {}", self.bucket, key, err);
                ServiceError::remote(&err)
            })?;

        tracing::info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }

    pub async fn list(&self, prefix: &str) -> ServiceResult<Vec<ObjectSummary>> {
        let out = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to list s3://{}/{}: {}", self.bucket, prefix, err);
                ServiceError::remote(&err)
            })?;

        let files: Vec<ObjectSummary> = out
            .contents()
            .iter()
            .map(|object| ObjectSummary {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or_default().to_string(),
                last_modified: object
                    .last_modified()
                    .and_then(|t| t.fmt(DateTimeFormat::DateTime).ok())
                    .unwrap_or_default(),
            })
            .collect();

        tracing::info!("Listed {} objects in s3://{}/{}", files.len(), self.bucket, prefix);
        Ok(files)
    }

    pub async fn exists(&self, key: &str) -> ServiceResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| e.into_service_error());

        match result {
            Ok(_) => Ok(true),
            Err(HeadObjectError::NotFound(_)) => Ok(false),
            Err(err) => {
                tracing::error!("Failed to check s3://{}/{}: {}", self.bucket, key, err);
                Err(ServiceError::remote(&err))
            }
        }
    }

    pub async fn presign(
        &self,
        key: &str,
        expires_in: Duration,
        method: PresignMethod,
    ) -> ServiceResult<String> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|err| ServiceError::Invalid(err.to_string()))?;

        let url = match method {
            PresignMethod::Get => self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .presigned(config)
                .await
                .map_err(|e| ServiceError::remote(&e.into_service_error()))?
                .uri()
                .to_string(),
            PresignMethod::Put => self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .presigned(config)
                .await
                .map_err(|e| ServiceError::remote(&e.into_service_error()))?
                .uri()
                .to_string(),
        };

        tracing::info!("Presigned {:?} URL for s3://{}/{}", method, self.bucket, key);
        Ok(url)
    }
}

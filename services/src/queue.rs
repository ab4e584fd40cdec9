use std::collections::HashMap;

use aws_sdk_sqs as sqs;
use aws_sdk_sqs::types::{
    BatchResultErrorEntry, DeleteMessageBatchRequestEntry, MessageAttributeValue,
    QueueAttributeName, SendMessageBatchRequestEntry,
};
use lambda_runtime::tracing;
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};

pub const SQS_BATCH_LIMIT: usize = 10;
const SQS_RECEIVE_LIMIT: i32 = 10;
const APPROXIMATE_COUNT: &str = "ApproximateNumberOfMessages";

/// A message to enqueue. Batch entries are identified by `id`.
#[derive(Debug, Clone)]
pub struct Message {
    id: String,
    body: String,
    attributes: HashMap<String, String>,
    delay_seconds: Option<i32>,
    group_id: Option<String>,
    deduplication_id: Option<String>,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Message {
        Message {
            id: Self::new_id(),
            body: body.into(),
            attributes: HashMap::new(),
            delay_seconds: None,
            group_id: None,
            deduplication_id: None,
        }
    }

    fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Message {
        self.id = id.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Message {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn delay_seconds(mut self, delay: i32) -> Message {
        self.delay_seconds = Some(delay);
        self
    }

    /// Required for FIFO queues.
    pub fn group_id(mut self, group_id: impl Into<String>) -> Message {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn deduplication_id(mut self, deduplication_id: impl Into<String>) -> Message {
        self.deduplication_id = Some(deduplication_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn message_attributes(&self) -> ServiceResult<Option<HashMap<String, MessageAttributeValue>>> {
        if self.attributes.is_empty() {
            return Ok(None);
        }

        self.attributes
            .iter()
            .map(|(name, value)| -> ServiceResult<(String, MessageAttributeValue)> {
                let value = MessageAttributeValue::builder()
                    .data_type("String")
                    .string_value(value)
                    .build()?;
                Ok((name.clone(), value))
            })
            .collect::<ServiceResult<HashMap<_, _>>>()
            .map(Some)
    }

    fn entry(self) -> ServiceResult<SendMessageBatchRequestEntry> {
        let attributes = self.message_attributes()?;
        SendMessageBatchRequestEntry::builder()
            .id(self.id)
            .message_body(self.body)
            .set_message_attributes(attributes)
            .set_delay_seconds(self.delay_seconds)
            .set_message_group_id(self.group_id)
            .set_message_deduplication_id(self.deduplication_id)
            .build()
            .map_err(ServiceError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    pub sender_fault: bool,
}

impl From<&BatchResultErrorEntry> for BatchFailure {
    fn from(entry: &BatchResultErrorEntry) -> Self {
        BatchFailure {
            id: entry.id().to_string(),
            code: entry.code().to_string(),
            message: entry.message().map(str::to_string),
            sender_fault: entry.sender_fault(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub successful: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub attributes: HashMap<String, String>,
}

impl From<&sqs::types::Message> for ReceivedMessage {
    fn from(message: &sqs::types::Message) -> Self {
        ReceivedMessage {
            message_id: message.message_id().unwrap_or_default().to_string(),
            receipt_handle: message.receipt_handle().unwrap_or_default().to_string(),
            body: message.body().unwrap_or_default().to_string(),
            attributes: message
                .message_attributes()
                .map(|attrs| {
                    attrs
                        .iter()
                        .filter_map(|(name, value)| {
                            value.string_value().map(|v| (name.clone(), v.to_string()))
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Queue adapter bound to a single queue URL.
#[derive(Debug)]
pub struct QueueService {
    queue_url: String,
    client: sqs::Client,
}

impl QueueService {
    pub fn new(client: sqs::Client, queue_url: impl Into<String>) -> QueueService {
        QueueService {
            queue_url: queue_url.into(),
            client,
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub async fn send(&self, message: Message) -> ServiceResult<String> {
        let attributes = message.message_attributes()?;
        let out = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message.body)
            .set_message_attributes(attributes)
            .set_delay_seconds(message.delay_seconds)
            .set_message_group_id(message.group_id)
            .set_message_deduplication_id(message.deduplication_id)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to send message to {}: {}", self.queue_url, err);
                ServiceError::remote(&err)
            })?;

        let message_id = out.message_id().unwrap_or_default().to_string();
        tracing::info!("Sent message {} to {}", message_id, self.queue_url);
        Ok(message_id)
    }

    pub async fn send_batch(&self, messages: Vec<Message>) -> ServiceResult<BatchOutcome> {
        ServiceError::check_batch("send", SQS_BATCH_LIMIT, messages.len())?;

        let entries = messages
            .into_iter()
            .map(Message::entry)
            .collect::<ServiceResult<Vec<_>>>()?;

        let out = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed sending SQS batch to {}: {}", self.queue_url, err);
                ServiceError::remote(&err)
            })?;

        let outcome = BatchOutcome {
            successful: out.successful().iter().map(|e| e.id().to_string()).collect(),
            failed: out.failed().iter().map(BatchFailure::from).collect(),
        };
        tracing::info!(
            "Batch sent {} messages successfully, {} failed to {}",
            outcome.successful.len(),
            outcome.failed.len(),
            self.queue_url
        );
        Ok(outcome)
    }

    /// Long-polls for up to `max_messages` (clamped to 10).
    pub async fn receive(
        &self,
        max_messages: i32,
        wait_seconds: i32,
        visibility_timeout: Option<i32>,
        attribute_names: &[&str],
    ) -> ServiceResult<Vec<ReceivedMessage>> {
        let names = (!attribute_names.is_empty())
            .then(|| attribute_names.iter().map(|n| n.to_string()).collect());

        let out = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.clamp(1, SQS_RECEIVE_LIMIT))
            .wait_time_seconds(wait_seconds)
            .set_visibility_timeout(visibility_timeout)
            .set_message_attribute_names(names)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to receive messages from {}: {}", self.queue_url, err);
                ServiceError::remote(&err)
            })?;

        let messages: Vec<ReceivedMessage> =
            out.messages().iter().map(ReceivedMessage::from).collect();
        tracing::info!("Received {} messages from {}", messages.len(), self.queue_url);
        Ok(messages)
    }

    pub async fn delete(&self, receipt_handle: &str) -> ServiceResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to delete message from {}: {}", self.queue_url, err);
                ServiceError::remote(&err)
            })?;

        tracing::info!("Deleted message from {}", self.queue_url);
        Ok(())
    }

    /// Entry ids are the positions of the receipt handles in `receipt_handles`.
    pub async fn delete_batch(&self, receipt_handles: &[String]) -> ServiceResult<BatchOutcome> {
        ServiceError::check_batch("delete", SQS_BATCH_LIMIT, receipt_handles.len())?;

        let entries = receipt_handles
            .iter()
            .enumerate()
            .map(|(i, handle)| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(i.to_string())
                    .receipt_handle(handle)
                    .build()
                    .map_err(ServiceError::from)
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        let out = self
            .client
            .delete_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to batch delete from {}: {}", self.queue_url, err);
                ServiceError::remote(&err)
            })?;

        let outcome = BatchOutcome {
            successful: out.successful().iter().map(|e| e.id().to_string()).collect(),
            failed: out.failed().iter().map(BatchFailure::from).collect(),
        };
        tracing::info!(
            "Batch deleted {} messages successfully, {} failed from {}",
            outcome.successful.len(),
            outcome.failed.len(),
            self.queue_url
        );
        Ok(outcome)
    }

    pub async fn change_visibility(&self, receipt_handle: &str, timeout: i32) -> ServiceResult<()> {
        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(timeout)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to change visibility in {}: {}", self.queue_url, err);
                ServiceError::remote(&err)
            })?;

        tracing::info!("Changed message visibility to {}s in {}", timeout, self.queue_url);
        Ok(())
    }

    pub async fn purge(&self) -> ServiceResult<()> {
        self.client
            .purge_queue()
            .queue_url(&self.queue_url)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to purge {}: {}", self.queue_url, err);
                ServiceError::remote(&err)
            })?;

        tracing::warn!("Purged all messages from {}", self.queue_url);
        Ok(())
    }

    /// Fetches the named attributes, or all of them when `names` is empty.
    pub async fn attributes(&self, names: &[&str]) -> ServiceResult<HashMap<String, String>> {
        let names: Vec<QueueAttributeName> = if names.is_empty() {
            vec![QueueAttributeName::All]
        } else {
            names.iter().map(|n| QueueAttributeName::from(*n)).collect()
        };

        let out = self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .set_attribute_names(Some(names))
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to get attributes of {}: {}", self.queue_url, err);
                ServiceError::remote(&err)
            })?;

        let attributes: HashMap<String, String> = out
            .attributes()
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(name, value)| (name.as_str().to_string(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        tracing::info!("Retrieved {} attributes from {}", attributes.len(), self.queue_url);
        Ok(attributes)
    }

    pub async fn approximate_count(&self) -> ServiceResult<u64> {
        let attributes = self.attributes(&[APPROXIMATE_COUNT]).await?;
        let count = attributes
            .get(APPROXIMATE_COUNT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        tracing::info!("Queue {} has approximately {} messages", self.queue_url, count);
        Ok(count)
    }
}

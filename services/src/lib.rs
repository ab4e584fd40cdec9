//! Thin adapters over S3, SQS, DynamoDB and SES, cached per resource key.

pub mod cache;
pub mod connections;
pub mod error;
pub mod mail;
pub mod queue;
pub mod storage;
pub mod table;

pub use cache::ConnectionCache;
pub use connections::{Connections, Resource};
pub use error::{ServiceError, ServiceResult};
pub use mail::{Email, MailService};
pub use queue::{BatchFailure, BatchOutcome, Message, QueueService, ReceivedMessage};
pub use storage::{ObjectSummary, PresignMethod, StorageService};
pub use table::{Item, Query, Scan, TableService};

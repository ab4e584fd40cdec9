use std::sync::Arc;

use aws_config::SdkConfig;
use aws_sdk_dynamodb as dynamodb;
use aws_sdk_s3 as s3;
use aws_sdk_ses as ses;
use aws_sdk_sqs as sqs;

use crate::cache::ConnectionCache;
use crate::error::ServiceResult;
use crate::mail::MailService;
use crate::queue::QueueService;
use crate::storage::StorageService;
use crate::table::TableService;

/// Kind of adapter a cache entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Storage,
    Queue,
    Table,
    Mail,
}

/// One SDK client per service and one adapter cache per resource kind.
#[derive(Debug)]
pub struct Connections {
    environment: String,
    s3: s3::Client,
    sqs: sqs::Client,
    dynamodb: dynamodb::Client,
    ses: ses::Client,
    storage: ConnectionCache<StorageService>,
    queues: ConnectionCache<QueueService>,
    tables: ConnectionCache<TableService>,
    mailers: ConnectionCache<MailService>,
}

impl Connections {
    pub fn new(config: &SdkConfig, environment: impl Into<String>) -> Connections {
        Connections {
            environment: environment.into(),
            s3: s3::Client::new(config),
            sqs: sqs::Client::new(config),
            dynamodb: dynamodb::Client::new(config),
            ses: ses::Client::new(config),
            storage: ConnectionCache::new("bucket name"),
            queues: ConnectionCache::new("queue URL"),
            tables: ConnectionCache::new("table name"),
            mailers: ConnectionCache::new("sender address"),
        }
    }

    pub fn with_s3(mut self, client: s3::Client) -> Connections {
        self.s3 = client;
        self
    }

    pub fn with_sqs(mut self, client: sqs::Client) -> Connections {
        self.sqs = client;
        self
    }

    pub fn with_dynamodb(mut self, client: dynamodb::Client) -> Connections {
        self.dynamodb = client;
        self
    }

    pub fn with_ses(mut self, client: ses::Client) -> Connections {
        self.ses = client;
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn storage(&self, bucket: &str) -> ServiceResult<Arc<StorageService>> {
        self.storage
            .get_or_create(bucket, |bucket| StorageService::new(self.s3.clone(), bucket))
    }

    pub fn queue(&self, queue_url: &str) -> ServiceResult<Arc<QueueService>> {
        self.queues
            .get_or_create(queue_url, |url| QueueService::new(self.sqs.clone(), url))
    }

    pub fn table(&self, table_name: &str) -> ServiceResult<Arc<TableService>> {
        self.tables
            .get_or_create(table_name, |name| TableService::new(self.dynamodb.clone(), name))
    }

    pub fn mail(&self, from: &str) -> ServiceResult<Arc<MailService>> {
        self.mailers.get_or_create(from, |from| {
            MailService::new(self.ses.clone(), from, self.environment.as_str())
        })
    }

    /// Forget the adapter cached under `key`. Returns whether one was present.
    pub fn clear(&self, resource: Resource, key: &str) -> bool {
        match resource {
            Resource::Storage => self.storage.clear(key),
            Resource::Queue => self.queues.clear(key),
            Resource::Table => self.tables.clear(key),
            Resource::Mail => self.mailers.clear(key),
        }
    }

    pub fn clear_all(&self) {
        self.storage.clear_all();
        self.queues.clear_all();
        self.tables.clear_all();
        self.mailers.clear_all();
    }
}

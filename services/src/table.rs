use std::collections::HashMap;

use aws_sdk_dynamodb as dynamodb;
use aws_sdk_dynamodb::types::{
    AttributeValue, KeysAndAttributes, PutRequest, ReturnValue, WriteRequest,
};
use lambda_runtime::tracing;

use crate::error::{ServiceError, ServiceResult};

pub const BATCH_WRITE_LIMIT: usize = 25;
pub const BATCH_GET_LIMIT: usize = 100;

pub type Item = HashMap<String, AttributeValue>;

/// Key condition query. Ascending by sort key unless [`Query::descending`] is set.
#[derive(Debug, Clone)]
pub struct Query {
    key_condition: String,
    values: Item,
    names: Option<HashMap<String, String>>,
    index: Option<String>,
    limit: Option<i32>,
    ascending: bool,
}

impl Query {
    pub fn new(key_condition: impl Into<String>, values: Item) -> Query {
        Query {
            key_condition: key_condition.into(),
            values,
            names: None,
            index: None,
            limit: None,
            ascending: true,
        }
    }

    pub fn names(mut self, names: HashMap<String, String>) -> Query {
        self.names = Some(names);
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Query {
        self.index = Some(index.into());
        self
    }

    pub fn limit(mut self, limit: i32) -> Query {
        self.limit = Some(limit);
        self
    }

    pub fn descending(mut self) -> Query {
        self.ascending = false;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scan {
    filter: Option<String>,
    values: Option<Item>,
    names: Option<HashMap<String, String>>,
    limit: Option<i32>,
}

impl Scan {
    pub fn filter(mut self, expression: impl Into<String>, values: Item) -> Scan {
        self.filter = Some(expression.into());
        self.values = Some(values);
        self
    }

    pub fn names(mut self, names: HashMap<String, String>) -> Scan {
        self.names = Some(names);
        self
    }

    pub fn limit(mut self, limit: i32) -> Scan {
        self.limit = Some(limit);
        self
    }
}

fn to_wr(item: Item) -> ServiceResult<WriteRequest> {
    Ok(WriteRequest::builder()
        .put_request(PutRequest::builder().set_item(Some(item)).build()?)
        .build())
}

fn non_empty<T>(map: Option<HashMap<String, T>>) -> Option<HashMap<String, T>> {
    map.filter(|m| !m.is_empty())
}

/// Table adapter bound to a single table name.
#[derive(Debug)]
pub struct TableService {
    table_name: String,
    client: dynamodb::Client,
}

impl TableService {
    pub fn new(client: dynamodb::Client, table_name: impl Into<String>) -> TableService {
        TableService {
            table_name: table_name.into(),
            client,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub async fn put(&self, item: Item) -> ServiceResult<Item> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item.clone()))
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to put item into {}: {}", self.table_name, err);
                ServiceError::remote(&err)
            })?;

        tracing::info!("Put item into {}", self.table_name);
        Ok(item)
    }

    pub async fn get(&self, key: Item) -> ServiceResult<Option<Item>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to get item from {}: {}", self.table_name, err);
                ServiceError::remote(&err)
            })?;

        match out.item {
            Some(item) => {
                tracing::info!("Retrieved item from {}", self.table_name);
                Ok(Some(item))
            }
            None => {
                tracing::info!("Item not found in {}", self.table_name);
                Ok(None)
            }
        }
    }

    pub async fn delete(&self, key: Item) -> ServiceResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to delete item from {}: {}", self.table_name, err);
                ServiceError::remote(&err)
            })?;

        tracing::info!("Deleted item from {}", self.table_name);
        Ok(())
    }

    /// Applies `expression` and returns every attribute of the updated item.
    pub async fn update(
        &self,
        key: Item,
        expression: &str,
        values: Item,
        names: Option<HashMap<String, String>>,
    ) -> ServiceResult<Item> {
        let out = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(key))
            .update_expression(expression)
            .set_expression_attribute_values(Some(values))
            .set_expression_attribute_names(non_empty(names))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to update item in {}: {}", self.table_name, err);
                ServiceError::remote(&err)
            })?;

        tracing::info!("Updated item in {}", self.table_name);
        Ok(out.attributes.unwrap_or_default())
    }

    pub async fn query(&self, query: Query) -> ServiceResult<Vec<Item>> {
        let out = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression(query.key_condition)
            .set_expression_attribute_values(Some(query.values))
            .set_expression_attribute_names(non_empty(query.names))
            .set_index_name(query.index)
            .set_limit(query.limit)
            .scan_index_forward(query.ascending)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to query {}: {}", self.table_name, err);
                ServiceError::remote(&err)
            })?;

        let items = out.items.unwrap_or_default();
        tracing::info!("Queried {} items from {}", items.len(), self.table_name);
        Ok(items)
    }

    pub async fn scan(&self, scan: Scan) -> ServiceResult<Vec<Item>> {
        let out = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_filter_expression(scan.filter)
            .set_expression_attribute_values(non_empty(scan.values))
            .set_expression_attribute_names(non_empty(scan.names))
            .set_limit(scan.limit)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to scan {}: {}", self.table_name, err);
                ServiceError::remote(&err)
            })?;

        let items = out.items.unwrap_or_default();
        tracing::info!("Scanned {} items from {}", items.len(), self.table_name);
        Ok(items)
    }

    /// Writes up to 25 items and returns those the service left unprocessed.
    pub async fn batch_write(&self, items: Vec<Item>) -> ServiceResult<Vec<Item>> {
        ServiceError::check_batch("write", BATCH_WRITE_LIMIT, items.len())?;
        let count = items.len();

        let wrs = items
            .into_iter()
            .map(to_wr)
            .collect::<ServiceResult<Vec<_>>>()?;

        let out = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, wrs)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to batch write to {}: {}", self.table_name, err);
                ServiceError::remote(&err)
            })?;

        let unprocessed: Vec<Item> = out
            .unprocessed_items
            .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|wr| wr.put_request.map(|put| put.item))
            .collect();

        if unprocessed.is_empty() {
            tracing::info!("Batch wrote {} items to {}", count, self.table_name);
        } else {
            tracing::warn!(
                "Batch write to {} left {} of {} items unprocessed",
                self.table_name,
                unprocessed.len(),
                count
            );
        }
        Ok(unprocessed)
    }

    /// Fetches up to 100 keys. Keys with no item are omitted from the result.
    pub async fn batch_get(&self, keys: Vec<Item>) -> ServiceResult<Vec<Item>> {
        ServiceError::check_batch("get", BATCH_GET_LIMIT, keys.len())?;

        let request = KeysAndAttributes::builder().set_keys(Some(keys)).build()?;
        let out = self
            .client
            .batch_get_item()
            .request_items(&self.table_name, request)
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to batch get from {}: {}", self.table_name, err);
                ServiceError::remote(&err)
            })?;

        let items = out
            .responses
            .and_then(|mut responses| responses.remove(&self.table_name))
            .unwrap_or_default();
        tracing::info!("Batch retrieved {} items from {}", items.len(), self.table_name);
        Ok(items)
    }

    pub async fn exists(&self, key: Item) -> ServiceResult<bool> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to check item in {}: {}", self.table_name, err);
                ServiceError::remote(&err)
            })?;

        Ok(out.item.is_some())
    }
}

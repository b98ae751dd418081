use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::{
    AttributeValue, Delete, Put, ReturnValue, TransactWriteItem, Update,
};
use aws_sdk_dynamodb::Client;
use serde::{Deserialize, Serialize};
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_item};
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::matching::{assign_color, select_opponent};
use crate::models::queue::{MatchCriteria, MatchedPair, QueueEntry, QueueOutcome};
use crate::repositories::errors::queue_repository_errors::QueueRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Sort key of the per-queue guard item. Sorts before every entry key.
pub const GUARD_KEY: &str = "#version";
const ENTRY_PREFIX: &str = "user#";

#[async_trait]
#[cfg_attr(test, automock)]
pub trait MatchQueue: Send + Sync {
    /// Pairs `entry` with the best waiting entry in its queue, removing that entry,
    /// or enqueues `entry` when nobody qualifies. Indivisible with respect to every
    /// other submission on the same queue.
    async fn submit_or_match(
        &self,
        entry: &QueueEntry,
        criteria: &MatchCriteria,
    ) -> Result<QueueOutcome, QueueRepositoryError>;

    /// Removes the user's entry from the queue. Returns whether one was there.
    async fn remove_entry(&self, queue_key: &str, user_id: &str)
        -> Result<bool, QueueRepositoryError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueueItem {
    queue_key: String,
    entry_key: String,
    entry: QueueEntry,
}

fn entry_key(user_id: &str) -> String {
    format!("{}{}", ENTRY_PREFIX, user_id)
}

/// A consistent snapshot of one queue partition.
struct QueueSnapshot {
    version: u64,
    entries: Vec<QueueEntry>,
}

pub struct DynamoDbMatchQueue {
    pub client: Client,
    pub table_name: String,
    pub backoff: BackoffPolicy,
}

impl DynamoDbMatchQueue {
    pub fn new(client: Client, table_name: &str, backoff: BackoffPolicy) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
            backoff,
        }
    }

    async fn read_queue(&self, queue_key: &str) -> Result<QueueSnapshot, QueueRepositoryError> {
        let mut version = 0;
        let mut entries = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("queue_key = :queue_key")
                .expression_attribute_values(":queue_key", AttributeValue::S(queue_key.to_string()))
                .consistent_read(true)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| QueueRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let is_guard = matches!(
                    item.get("entry_key"),
                    Some(AttributeValue::S(key)) if key == GUARD_KEY
                );
                if is_guard {
                    version = match item.get("queue_version") {
                        Some(AttributeValue::N(n)) => n.parse().map_err(|_| {
                            QueueRepositoryError::Serialization(format!(
                                "Invalid version {} on queue {}",
                                n, queue_key
                            ))
                        })?,
                        _ => 0,
                    };
                    continue;
                }
                let queued: QueueItem = from_item(item)
                    .map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?;
                entries.push(queued.entry);
            }

            match output.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }
        Ok(QueueSnapshot { version, entries })
    }

    fn guard_update(&self, queue_key: &str, version: u64) -> Result<TransactWriteItem, QueueRepositoryError> {
        let update = Update::builder()
            .table_name(&self.table_name)
            .key("queue_key", AttributeValue::S(queue_key.to_string()))
            .key("entry_key", AttributeValue::S(GUARD_KEY.to_string()))
            .update_expression("SET queue_version = :next")
            .condition_expression("attribute_not_exists(queue_version) OR queue_version = :current")
            .expression_attribute_values(":current", AttributeValue::N(version.to_string()))
            .expression_attribute_values(":next", AttributeValue::N((version + 1).to_string()))
            .build()
            .map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?;
        Ok(TransactWriteItem::builder().update(update).build())
    }

    fn entry_delete(
        &self,
        queue_key: &str,
        user_id: &str,
        must_exist: bool,
    ) -> Result<TransactWriteItem, QueueRepositoryError> {
        let mut delete = Delete::builder()
            .table_name(&self.table_name)
            .key("queue_key", AttributeValue::S(queue_key.to_string()))
            .key("entry_key", AttributeValue::S(entry_key(user_id)));
        if must_exist {
            delete = delete.condition_expression("attribute_exists(entry_key)");
        }
        let delete = delete
            .build()
            .map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?;
        Ok(TransactWriteItem::builder().delete(delete).build())
    }

    fn entry_put(&self, entry: &QueueEntry) -> Result<TransactWriteItem, QueueRepositoryError> {
        let item = to_item(QueueItem {
            queue_key: entry.queue_key(),
            entry_key: entry_key(entry.user_id()),
            entry: entry.clone(),
        })
        .map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?;
        let put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .build()
            .map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    /// One read-decide-write round. `Conflict` when the queue moved underneath us.
    async fn attempt(
        &self,
        entry: &QueueEntry,
        criteria: &MatchCriteria,
    ) -> Result<QueueOutcome, QueueRepositoryError> {
        let queue_key = entry.queue_key();
        let snapshot = self.read_queue(&queue_key).await?;
        let has_stale_entry = snapshot
            .entries
            .iter()
            .any(|queued| queued.user_id() == entry.user_id());

        let opponent = select_opponent(entry, &snapshot.entries, criteria).cloned();

        let mut items = vec![self.guard_update(&queue_key, snapshot.version)?];
        match &opponent {
            Some(waiting) => {
                items.push(self.entry_delete(&queue_key, waiting.user_id(), true)?);
                if has_stale_entry {
                    items.push(self.entry_delete(&queue_key, entry.user_id(), false)?);
                }
            }
            None => items.push(self.entry_put(entry)?),
        }

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await;
        match result {
            Ok(_) => {}
            Err(SdkError::ServiceError(e)) if e.err().is_transaction_canceled_exception() => {
                debug!("Queue {} changed at version {}", queue_key, snapshot.version);
                return Err(QueueRepositoryError::Conflict);
            }
            Err(e) => return Err(QueueRepositoryError::DynamoDb(e.to_string())),
        }

        Ok(match opponent {
            Some(waiting) => {
                let arriving_color = assign_color(&entry.candidate, &waiting.candidate);
                QueueOutcome::Matched(Box::new(MatchedPair {
                    waiting,
                    arriving: entry.clone(),
                    arriving_color,
                }))
            }
            None => QueueOutcome::Enqueued,
        })
    }
}

#[async_trait]
impl MatchQueue for DynamoDbMatchQueue {
    async fn submit_or_match(
        &self,
        entry: &QueueEntry,
        criteria: &MatchCriteria,
    ) -> Result<QueueOutcome, QueueRepositoryError> {
        let result = self
            .backoff
            .retry(
                move || self.attempt(entry, criteria),
                |e| matches!(e, QueueRepositoryError::Conflict),
            )
            .await;
        match result {
            Ok(outcome) => {
                if let QueueOutcome::Matched(pair) = &outcome {
                    info!(
                        "Matched {} with {} on queue {}",
                        entry.user_id(),
                        pair.waiting.user_id(),
                        entry.queue_key()
                    );
                }
                Ok(outcome)
            }
            Err(QueueRepositoryError::Conflict) => {
                warn!("Gave up submitting {} to {}", entry.user_id(), entry.queue_key());
                Err(QueueRepositoryError::Contention(entry.queue_key()))
            }
            Err(e) => Err(e),
        }
    }

    async fn remove_entry(
        &self,
        queue_key: &str,
        user_id: &str,
    ) -> Result<bool, QueueRepositoryError> {
        // Deletes need no guard: a matcher that read this entry conditions its own delete on it.
        let output = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("queue_key", AttributeValue::S(queue_key.to_string()))
            .key("entry_key", AttributeValue::S(entry_key(user_id)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| QueueRepositoryError::DynamoDb(e.to_string()))?;
        Ok(output.attributes.is_some_and(|old| !old.is_empty()))
    }
}

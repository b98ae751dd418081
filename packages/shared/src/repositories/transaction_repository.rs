use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_attribute_value, to_item};

use crate::models::transaction::{TransactionRecord, TransactionStatus, TransactionType};
use crate::repositories::errors::transaction_repository_errors::TransactionRepositoryError;

#[cfg(test)]
use mockall::automock;

pub const TRANSACTIONS_BY_USER_INDEX: &str = "GSI_TransactionsByUser";

#[async_trait]
#[cfg_attr(test, automock)]
pub trait TransactionRepository: Send + Sync {
    async fn create_transaction(
        &self,
        transaction: &TransactionRecord,
    ) -> Result<(), TransactionRepositoryError>;

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, TransactionRepositoryError>;

    async fn update_status(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
        game_id: Option<String>,
    ) -> Result<(), TransactionRepositoryError>;

    /// The user's in-progress GAME_STAKE transaction, if any.
    async fn find_open_stake_hold(
        &self,
        user_id: &str,
    ) -> Result<Option<TransactionRecord>, TransactionRepositoryError>;
}

pub struct DynamoDbTransactionRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbTransactionRepository {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }
}

#[async_trait]
impl TransactionRepository for DynamoDbTransactionRepository {
    async fn create_transaction(
        &self,
        transaction: &TransactionRecord,
    ) -> Result<(), TransactionRepositoryError> {
        let item = to_item(transaction)
            .map_err(|e| TransactionRepositoryError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(transaction_id)")
            .send()
            .await
            .map_err(|e| TransactionRepositoryError::DynamoDb(e.to_string()))?;
        Ok(())
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, TransactionRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("transaction_id", AttributeValue::S(transaction_id.to_string()))
            .send()
            .await
            .map_err(|e| TransactionRepositoryError::DynamoDb(e.to_string()))?;
        match output.item {
            Some(item) => Ok(Some(
                from_item(item)
                    .map_err(|e| TransactionRepositoryError::Serialization(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    async fn update_status(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
        game_id: Option<String>,
    ) -> Result<(), TransactionRepositoryError> {
        let status_value = to_attribute_value(status)
            .map_err(|e| TransactionRepositoryError::Serialization(e.to_string()))?;
        let is_active = status == TransactionStatus::InProgress;

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("transaction_id", AttributeValue::S(transaction_id.to_string()))
            .condition_expression("attribute_exists(transaction_id)")
            .expression_attribute_values(":status", status_value)
            .expression_attribute_values(":active", AttributeValue::Bool(is_active));
        request = match game_id {
            Some(game_id) => request
                .update_expression(
                    "SET transaction_status = :status, is_active = :active, game_id = :game_id",
                )
                .expression_attribute_values(":game_id", AttributeValue::S(game_id)),
            None => request.update_expression("SET transaction_status = :status, is_active = :active"),
        };

        match request.send().await {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().is_conditional_check_failed_exception() => {
                Err(TransactionRepositoryError::NotFound(transaction_id.to_string()))
            }
            Err(e) => Err(TransactionRepositoryError::DynamoDb(e.to_string())),
        }
    }

    async fn find_open_stake_hold(
        &self,
        user_id: &str,
    ) -> Result<Option<TransactionRecord>, TransactionRepositoryError> {
        let stake_type = to_attribute_value(TransactionType::GameStake)
            .map_err(|e| TransactionRepositoryError::Serialization(e.to_string()))?;
        let in_progress = to_attribute_value(TransactionStatus::InProgress)
            .map_err(|e| TransactionRepositoryError::Serialization(e.to_string()))?;

        let mut start_key = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(TRANSACTIONS_BY_USER_INDEX)
                .key_condition_expression("user_id = :user_id")
                .filter_expression(
                    "transaction_type = :type AND transaction_status = :status AND is_active = :active \
                     AND (attribute_not_exists(game_id) OR attribute_type(game_id, :null_type))",
                )
                .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
                .expression_attribute_values(":type", stake_type.clone())
                .expression_attribute_values(":status", in_progress.clone())
                .expression_attribute_values(":active", AttributeValue::Bool(true))
                .expression_attribute_values(":null_type", AttributeValue::S("NULL".to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| TransactionRepositoryError::DynamoDb(e.to_string()))?;

            if let Some(item) = output.items.and_then(|items| items.into_iter().next()) {
                let transaction = from_item(item)
                    .map_err(|e| TransactionRepositoryError::Serialization(e.to_string()))?;
                return Ok(Some(transaction));
            }
            match output.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => return Ok(None),
            }
        }
    }
}

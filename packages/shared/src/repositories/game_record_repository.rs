use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::Utc;
use serde::Serialize;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_attribute_value, to_item};
use std::collections::HashMap;

use crate::models::game_record::{GameRecord, GameRecordUpdate};
use crate::repositories::errors::game_record_repository_errors::GameRecordRepositoryError;

#[cfg(test)]
use mockall::automock;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait GameRecordRepository: Send + Sync {
    /// Writes the record unless one with the same id exists. Returns whichever record is stored.
    async fn create_if_absent(
        &self,
        record: &GameRecord,
    ) -> Result<GameRecord, GameRecordRepositoryError>;

    async fn get_game(&self, game_id: &str)
        -> Result<Option<GameRecord>, GameRecordRepositoryError>;

    async fn put_game(&self, record: &GameRecord) -> Result<(), GameRecordRepositoryError>;

    /// Applies a partial update to an existing record.
    async fn update_by_game_id(
        &self,
        game_id: &str,
        update: GameRecordUpdate,
    ) -> Result<(), GameRecordRepositoryError>;
}

pub struct DynamoDbGameRecordRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbGameRecordRepository {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }
}

fn value<T: Serialize>(value: T) -> Result<AttributeValue, GameRecordRepositoryError> {
    to_attribute_value(value).map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))
}

pub(crate) struct UpdateParts {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

/// Builds `SET #a = :a, ...` for the fields present in the update.
/// Every field goes through a name placeholder since `status` and `result` are reserved words.
pub(crate) fn update_expression(
    update: GameRecordUpdate,
) -> Result<UpdateParts, GameRecordRepositoryError> {
    let mut assignments = Vec::new();
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let mut set = |field: &str, attribute: AttributeValue| {
        assignments.push(format!("#{} = :{}", field, field));
        names.insert(format!("#{}", field), field.to_string());
        values.insert(format!(":{}", field), attribute);
    };

    if let Some(status) = update.status {
        set("status", value(status)?);
    }
    if let Some(player) = update.player_white {
        set("player_white", value(player)?);
    }
    if let Some(player) = update.player_black {
        set("player_black", value(player)?);
    }
    if let Some(result) = update.result {
        set("result", value(result)?);
    }
    if let Some(winner) = update.winner_id {
        set("winner_id", value(winner)?);
    }
    if let Some(loser) = update.loser_id {
        set("loser_id", value(loser)?);
    }
    if let Some(delta) = update.winner_rating_delta {
        set("winner_rating_delta", value(delta)?);
    }
    if let Some(delta) = update.loser_rating_delta {
        set("loser_rating_delta", value(delta)?);
    }
    if let Some(moves) = update.moves_white {
        set("moves_white", value(moves)?);
    }
    if let Some(moves) = update.moves_black {
        set("moves_black", value(moves)?);
    }
    set("updated_at", value(Utc::now())?);

    Ok(UpdateParts {
        expression: format!("SET {}", assignments.join(", ")),
        names,
        values,
    })
}

#[async_trait]
impl GameRecordRepository for DynamoDbGameRecordRepository {
    async fn create_if_absent(
        &self,
        record: &GameRecord,
    ) -> Result<GameRecord, GameRecordRepositoryError> {
        let item =
            to_item(record).map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))?;
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(game_id)")
            .send()
            .await;
        match result {
            Ok(_) => Ok(record.clone()),
            Err(SdkError::ServiceError(e)) if e.err().is_conditional_check_failed_exception() => {
                self.get_game(&record.game_id)
                    .await?
                    .ok_or_else(|| GameRecordRepositoryError::NotFound(record.game_id.clone()))
            }
            Err(e) => Err(GameRecordRepositoryError::DynamoDb(e.to_string())),
        }
    }

    async fn get_game(
        &self,
        game_id: &str,
    ) -> Result<Option<GameRecord>, GameRecordRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("game_id", AttributeValue::S(game_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| GameRecordRepositoryError::DynamoDb(e.to_string()))?;
        match output.item {
            Some(item) => Ok(Some(
                from_item(item)
                    .map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    async fn put_game(&self, record: &GameRecord) -> Result<(), GameRecordRepositoryError> {
        let item =
            to_item(record).map_err(|e| GameRecordRepositoryError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| GameRecordRepositoryError::DynamoDb(e.to_string()))?;
        Ok(())
    }

    async fn update_by_game_id(
        &self,
        game_id: &str,
        update: GameRecordUpdate,
    ) -> Result<(), GameRecordRepositoryError> {
        let parts = update_expression(update)?;
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("game_id", AttributeValue::S(game_id.to_string()))
            .update_expression(parts.expression)
            .condition_expression("attribute_exists(game_id)")
            .set_expression_attribute_names(Some(parts.names))
            .set_expression_attribute_values(Some(parts.values))
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().is_conditional_check_failed_exception() => {
                Err(GameRecordRepositoryError::NotFound(game_id.to_string()))
            }
            Err(e) => Err(GameRecordRepositoryError::DynamoDb(e.to_string())),
        }
    }
}

use std::collections::BTreeSet;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client;
use serde::{Deserialize, Serialize};
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_attribute_value, to_item};
use tracing::{debug, warn};

use crate::models::room::{Room, RoomStatus};
use crate::repositories::errors::room_repository_errors::RoomRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Reverse index entry: which room a connection currently belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConnection {
    pub connection_id: String,
    pub room_id: String,
    pub user_id: String,
}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait RoomRepository: Send + Sync {
    /// Writes the room and a reverse index entry per player in one atomic unit.
    async fn save_room(&self, room: &Room) -> Result<(), RoomRepositoryError>;

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, RoomRepositoryError>;

    /// Overwrites a live room. A room that is gone or already ended yields `NotFound`,
    /// so exactly one caller wins the transition into a terminal status.
    async fn update_room(&self, room: &Room) -> Result<(), RoomRepositoryError>;

    /// Removes the room and the reverse index entries of both the stored players and the
    /// players of `room`. `NotFound` when the room is already gone.
    async fn delete_room(&self, room: &Room) -> Result<(), RoomRepositoryError>;

    async fn find_room_id_by_connection(
        &self,
        connection_id: &str,
    ) -> Result<Option<String>, RoomRepositoryError>;

    /// Persists `room` (already pointing at the new connection) and moves the reverse index
    /// entry from the old connection to the new one, atomically. Refused like `update_room`
    /// once the room has ended.
    async fn reattach_connection(
        &self,
        room: &Room,
        old_connection_id: &str,
        new_connection_id: &str,
    ) -> Result<(), RoomRepositoryError>;
}

const LIVE_ROOM: &str = "attribute_exists(room_id) AND NOT (#status IN (:completed, :abandoned))";
const DELETE_ATTEMPTS: u32 = 3;

pub struct DynamoDbRoomRepository {
    pub client: Client,
    pub table_name: String,
    pub connections_table: String,
}

impl DynamoDbRoomRepository {
    pub fn new(client: Client, table_name: &str, connections_table: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
            connections_table: connections_table.to_string(),
        }
    }

    fn room_put(&self, room: &Room, must_exist: bool) -> Result<TransactWriteItem, RoomRepositoryError> {
        let item = to_item(room).map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?;
        let mut put = Put::builder().table_name(&self.table_name).set_item(Some(item));
        if must_exist {
            put = put
                .condition_expression(LIVE_ROOM)
                .expression_attribute_names("#status", "status")
                .expression_attribute_values(":completed", status_value(RoomStatus::Completed)?)
                .expression_attribute_values(":abandoned", status_value(RoomStatus::Abandoned)?);
        }
        let put = put
            .build()
            .map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn index_put(&self, entry: &RoomConnection) -> Result<TransactWriteItem, RoomRepositoryError> {
        let item = to_item(entry).map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?;
        let put = Put::builder()
            .table_name(&self.connections_table)
            .set_item(Some(item))
            .build()
            .map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn index_delete(&self, connection_id: &str) -> Result<TransactWriteItem, RoomRepositoryError> {
        let delete = Delete::builder()
            .table_name(&self.connections_table)
            .key("connection_id", AttributeValue::S(connection_id.to_string()))
            .build()
            .map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?;
        Ok(TransactWriteItem::builder().delete(delete).build())
    }

    async fn transact(
        &self,
        room_id: &str,
        items: Vec<TransactWriteItem>,
    ) -> Result<(), RoomRepositoryError> {
        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().is_transaction_canceled_exception() => {
                Err(RoomRepositoryError::NotFound(room_id.to_string()))
            }
            Err(e) => Err(RoomRepositoryError::DynamoDb(e.to_string())),
        }
    }
}

fn status_value(status: RoomStatus) -> Result<AttributeValue, RoomRepositoryError> {
    to_attribute_value(status).map_err(|e| RoomRepositoryError::Serialization(e.to_string()))
}

pub fn index_entries(room: &Room) -> Vec<RoomConnection> {
    room.players
        .iter()
        .map(|player| RoomConnection {
            connection_id: player.connection_id.clone(),
            room_id: room.id.clone(),
            user_id: player.user_id.clone(),
        })
        .collect()
}

#[async_trait]
impl RoomRepository for DynamoDbRoomRepository {
    async fn save_room(&self, room: &Room) -> Result<(), RoomRepositoryError> {
        let mut items = vec![self.room_put(room, false)?];
        for entry in index_entries(room) {
            items.push(self.index_put(&entry)?);
        }
        self.transact(&room.id, items).await?;
        debug!("Saved room {} with status {:?}", room.id, room.status);
        Ok(())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, RoomRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("room_id", AttributeValue::S(room_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| RoomRepositoryError::DynamoDb(e.to_string()))?;
        match output.item {
            Some(item) => Ok(Some(
                from_item(item).map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    async fn update_room(&self, room: &Room) -> Result<(), RoomRepositoryError> {
        let item = to_item(room).map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?;
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression(LIVE_ROOM)
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":completed", status_value(RoomStatus::Completed)?)
            .expression_attribute_values(":abandoned", status_value(RoomStatus::Abandoned)?)
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().is_conditional_check_failed_exception() => {
                Err(RoomRepositoryError::NotFound(room.id.clone()))
            }
            Err(e) => Err(RoomRepositoryError::DynamoDb(e.to_string())),
        }
    }

    async fn delete_room(&self, room: &Room) -> Result<(), RoomRepositoryError> {
        // The delete only goes through against the version it read, so a concurrent
        // reattach cannot leave its new index entry behind.
        for attempt in 1..=DELETE_ATTEMPTS {
            let Some(stored) = self.get_room(&room.id).await? else {
                return Err(RoomRepositoryError::NotFound(room.id.clone()));
            };
            let observed = to_attribute_value(stored.updated_at)
                .map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?;
            let room_delete = Delete::builder()
                .table_name(&self.table_name)
                .key("room_id", AttributeValue::S(room.id.clone()))
                .condition_expression("updated_at = :observed")
                .expression_attribute_values(":observed", observed)
                .build()
                .map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?;
            let connection_ids: BTreeSet<&str> = stored
                .players
                .iter()
                .chain(room.players.iter())
                .map(|p| p.connection_id.as_str())
                .collect();
            let mut items = vec![TransactWriteItem::builder().delete(room_delete).build()];
            for connection_id in connection_ids {
                items.push(self.index_delete(connection_id)?);
            }
            match self.transact(&room.id, items).await {
                Ok(()) => {
                    debug!("Deleted room {}", room.id);
                    return Ok(());
                }
                Err(RoomRepositoryError::NotFound(_)) => {
                    warn!(
                        "Room {} changed during delete (attempt {}), reading it again",
                        room.id, attempt
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(RoomRepositoryError::Contended(room.id.clone()))
    }

    async fn find_room_id_by_connection(
        &self,
        connection_id: &str,
    ) -> Result<Option<String>, RoomRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.connections_table)
            .key("connection_id", AttributeValue::S(connection_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| RoomRepositoryError::DynamoDb(e.to_string()))?;
        match output.item {
            Some(item) => {
                let entry: RoomConnection = from_item(item)
                    .map_err(|e| RoomRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(entry.room_id))
            }
            None => Ok(None),
        }
    }

    async fn reattach_connection(
        &self,
        room: &Room,
        old_connection_id: &str,
        new_connection_id: &str,
    ) -> Result<(), RoomRepositoryError> {
        let player = room
            .player_by_connection(new_connection_id)
            .ok_or_else(|| {
                RoomRepositoryError::Serialization(format!(
                    "Room {} has no player on connection {}",
                    room.id, new_connection_id
                ))
            })?;
        let entry = RoomConnection {
            connection_id: new_connection_id.to_string(),
            room_id: room.id.clone(),
            user_id: player.user_id.clone(),
        };

        let mut items = vec![self.room_put(room, true)?];
        if old_connection_id != new_connection_id {
            items.push(self.index_delete(old_connection_id)?);
        }
        items.push(self.index_put(&entry)?);
        self.transact(&room.id, items).await
    }
}

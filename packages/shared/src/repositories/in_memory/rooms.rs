use async_trait::async_trait;

use super::InMemoryStore;
use crate::models::room::Room;
use crate::repositories::errors::room_repository_errors::RoomRepositoryError;
use crate::repositories::room_repository::{index_entries, RoomConnection, RoomRepository};

#[async_trait]
impl RoomRepository for InMemoryStore {
    async fn save_room(&self, room: &Room) -> Result<(), RoomRepositoryError> {
        let mut state = self.lock().await;
        for entry in index_entries(room) {
            state
                .room_connections
                .insert(entry.connection_id.clone(), entry);
        }
        state.rooms.insert(room.id.clone(), room.clone());
        Ok(())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, RoomRepositoryError> {
        Ok(self.lock().await.rooms.get(room_id).cloned())
    }

    async fn update_room(&self, room: &Room) -> Result<(), RoomRepositoryError> {
        let mut state = self.lock().await;
        match state.rooms.get_mut(&room.id) {
            Some(stored) if !stored.status.is_terminal() => {
                *stored = room.clone();
                Ok(())
            }
            _ => Err(RoomRepositoryError::NotFound(room.id.clone())),
        }
    }

    async fn delete_room(&self, room: &Room) -> Result<(), RoomRepositoryError> {
        let mut state = self.lock().await;
        let Some(stored) = state.rooms.remove(&room.id) else {
            return Err(RoomRepositoryError::NotFound(room.id.clone()));
        };
        for player in stored.players.iter().chain(room.players.iter()) {
            state.room_connections.remove(&player.connection_id);
        }
        Ok(())
    }

    async fn find_room_id_by_connection(
        &self,
        connection_id: &str,
    ) -> Result<Option<String>, RoomRepositoryError> {
        Ok(self
            .lock()
            .await
            .room_connections
            .get(connection_id)
            .map(|entry| entry.room_id.clone()))
    }

    async fn reattach_connection(
        &self,
        room: &Room,
        old_connection_id: &str,
        new_connection_id: &str,
    ) -> Result<(), RoomRepositoryError> {
        let player = room.player_by_connection(new_connection_id).ok_or_else(|| {
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

        let mut state = self.lock().await;
        match state.rooms.get_mut(&room.id) {
            Some(stored) if !stored.status.is_terminal() => *stored = room.clone(),
            _ => return Err(RoomRepositoryError::NotFound(room.id.clone())),
        }
        state.room_connections.remove(old_connection_id);
        state
            .room_connections
            .insert(new_connection_id.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::PlayerCandidate;
    use crate::models::events::GameEndReason;
    use crate::models::queue::QueueEntry;
    use crate::models::room::{Conclusion, RoomStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn lobby(user_id: &str, connection_id: &str) -> Room {
        let entry = QueueEntry {
            candidate: PlayerCandidate {
                user_id: user_id.to_string(),
                rating: 1500,
                games_played: 10,
                win_percentage: 0.5,
                last_ten_results: vec![],
                games_as_white: 5,
                games_as_black: 5,
                game_type: "rapid".to_string(),
            },
            connection_id: connection_id.to_string(),
            username: user_id.to_string(),
            stake_amount: dec!(10),
            lobby_room_id: format!("room-{}", user_id),
            stake_transaction_id: None,
            enqueued_at: Utc::now(),
        };
        Room::lobby(&entry, "INR")
    }

    #[tokio::test]
    async fn test_reverse_index_follows_room() {
        let store = InMemoryStore::new();
        let room = lobby("alice", "conn-a");
        store.save_room(&room).await.unwrap();

        assert_eq!(
            store.find_room_id_by_connection("conn-a").await.unwrap(),
            Some("room-alice".to_string())
        );

        store.delete_room(&room).await.unwrap();
        assert!(store.get_room("room-alice").await.unwrap().is_none());
        assert!(store.find_room_id_by_connection("conn-a").await.unwrap().is_none());

        let again = store.delete_room(&room).await;
        assert_eq!(
            again,
            Err(RoomRepositoryError::NotFound("room-alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_update_of_deleted_room() {
        let store = InMemoryStore::new();
        let room = lobby("alice", "conn-a");
        let result = store.update_room(&room).await;
        assert_eq!(
            result,
            Err(RoomRepositoryError::NotFound("room-alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_reattach_moves_index_entry() {
        let store = InMemoryStore::new();
        let mut room = lobby("alice", "conn-a");
        store.save_room(&room).await.unwrap();

        room.players[0].connection_id = "conn-a2".to_string();
        store
            .reattach_connection(&room, "conn-a", "conn-a2")
            .await
            .unwrap();

        assert!(store.find_room_id_by_connection("conn-a").await.unwrap().is_none());
        let entry = store.room_connection("conn-a2").await.unwrap();
        assert_eq!(entry.user_id, "alice");
        assert_eq!(
            store.get_room("room-alice").await.unwrap().unwrap().players[0].connection_id,
            "conn-a2"
        );
    }

    #[tokio::test]
    async fn test_ended_room_accepts_no_further_writes() {
        let store = InMemoryStore::new();
        let mut room = lobby("alice", "conn-a");
        store.save_room(&room).await.unwrap();

        room.status = RoomStatus::Abandoned;
        room.conclusion = Some(Conclusion::Void {
            reason: GameEndReason::Void,
        });
        store.update_room(&room).await.unwrap();

        let mut late = room.clone();
        late.status = RoomStatus::Active;
        assert_eq!(
            store.update_room(&late).await,
            Err(RoomRepositoryError::NotFound("room-alice".to_string()))
        );
        late.players[0].connection_id = "conn-a2".to_string();
        assert_eq!(
            store.reattach_connection(&late, "conn-a", "conn-a2").await,
            Err(RoomRepositoryError::NotFound("room-alice".to_string()))
        );
        let stored = store.get_room("room-alice").await.unwrap().unwrap();
        assert_eq!(stored.status, RoomStatus::Abandoned);
        assert!(stored.conclusion.is_some());
    }

    #[tokio::test]
    async fn test_delete_drops_stored_and_passed_connections() {
        let store = InMemoryStore::new();
        let mut room = lobby("alice", "conn-a");
        store.save_room(&room).await.unwrap();
        let stale = room.clone();

        room.players[0].connection_id = "conn-a2".to_string();
        store
            .reattach_connection(&room, "conn-a", "conn-a2")
            .await
            .unwrap();

        store.delete_room(&stale).await.unwrap();
        assert!(store.find_room_id_by_connection("conn-a2").await.unwrap().is_none());
        assert!(store.find_room_id_by_connection("conn-a").await.unwrap().is_none());
    }
}

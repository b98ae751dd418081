use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::candidate::PlayerCandidate;
use crate::models::game_record::{GameRecord, GameRecordStatus, GameRecordUpdate};
use crate::models::queue::{queue_key, MatchCriteria, QueueEntry, QueueOutcome};
use crate::models::room::Room;
use crate::models::transaction::{TransactionRecord, TransactionStatus};
use crate::repositories::errors::game_record_repository_errors::GameRecordRepositoryError;
use crate::repositories::errors::room_repository_errors::RoomRepositoryError;
use crate::repositories::game_record_repository::GameRecordRepository;
use crate::repositories::queue_repository::MatchQueue;
use crate::repositories::room_repository::RoomRepository;
use crate::services::errors::matchmaking_service_errors::MatchmakingServiceError;
use crate::services::escrow_service::EscrowLedger;
use crate::services::game_session_service::{
    DisconnectOutcome, FormationOutcome, GameSessionService,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    pub connection_id: String,
    pub username: String,
    pub candidate: PlayerCandidate,
    pub stake_amount: Decimal,
    pub allow_extended_search: bool,
}

impl MatchRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.connection_id.is_empty() {
            return Err("Connection id cannot be empty".to_string());
        }
        if self.username.trim().is_empty() {
            return Err("Username cannot be empty".to_string());
        }
        if self.stake_amount < Decimal::ZERO {
            return Err("Stake amount cannot be negative".to_string());
        }
        self.candidate.validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Matched(Room),
    Queued(GameRecord),
    /// Paired, but the other side's connection was gone. Both stakes were returned.
    OpponentUnavailable(Room),
}

/// What happened to a connection's room when the connection went away or moved on.
#[derive(Debug, Clone, PartialEq)]
pub enum DepartureOutcome {
    NotInRoom,
    WaitCancelled,
    Disconnected(DisconnectOutcome),
    Forfeited,
}

/// Turns `findMatch` requests into held stakes, queue entries and rooms.
#[derive(Clone)]
pub struct MatchmakingCoordinator {
    queue: Arc<dyn MatchQueue + Send + Sync>,
    rooms: Arc<dyn RoomRepository + Send + Sync>,
    game_records: Arc<dyn GameRecordRepository + Send + Sync>,
    escrow: EscrowLedger,
    sessions: GameSessionService,
    criteria: MatchCriteria,
    currency: String,
}

impl MatchmakingCoordinator {
    pub fn new(
        queue: Arc<dyn MatchQueue + Send + Sync>,
        rooms: Arc<dyn RoomRepository + Send + Sync>,
        game_records: Arc<dyn GameRecordRepository + Send + Sync>,
        escrow: EscrowLedger,
        sessions: GameSessionService,
        criteria: MatchCriteria,
        currency: &str,
    ) -> Self {
        MatchmakingCoordinator {
            queue,
            rooms,
            game_records,
            escrow,
            sessions,
            criteria,
            currency: currency.to_string(),
        }
    }

    pub fn sessions(&self) -> &GameSessionService {
        &self.sessions
    }

    pub async fn request_match(
        &self,
        request: MatchRequest,
    ) -> Result<MatchResult, MatchmakingServiceError> {
        request
            .validate()
            .map_err(MatchmakingServiceError::ValidationError)?;
        let user_id = request.candidate.user_id.clone();
        info!(
            "User {} requested a {} match for {}",
            user_id, request.candidate.game_type, request.stake_amount
        );

        let hold = self
            .escrow
            .hold_stake(&user_id, request.stake_amount, &self.currency)
            .await?;

        let entry = QueueEntry {
            candidate: request.candidate,
            connection_id: request.connection_id,
            username: request.username,
            stake_amount: request.stake_amount,
            lobby_room_id: Uuid::new_v4().to_string(),
            stake_transaction_id: Some(hold.transaction_id.clone()),
            enqueued_at: Utc::now(),
        };
        let lobby = Room::lobby(&entry, &self.currency);
        if let Err(e) = self.rooms.save_room(&lobby).await {
            self.undo_hold(&hold, None).await;
            return Err(e.into());
        }

        let criteria = MatchCriteria {
            allow_extended_search: request.allow_extended_search,
            ..self.criteria.clone()
        };
        let outcome = match self.queue.submit_or_match(&entry, &criteria).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Queue submission for user {} failed: {}", user_id, e);
                self.undo_hold(&hold, Some(&lobby)).await;
                return Err(e.into());
            }
        };

        match outcome {
            QueueOutcome::Matched(pair) => {
                info!(
                    "Paired {} with {} in room {}",
                    user_id,
                    pair.waiting.user_id(),
                    pair.waiting.lobby_room_id
                );
                // The pair is already out of the queue, so formation goes ahead regardless.
                if let Err(e) = self.delete_lobby(&lobby).await {
                    warn!("Could not delete lobby room {}: {}", lobby.id, e);
                }
                match self.sessions.form_room(&pair, &self.currency).await? {
                    FormationOutcome::Active(room) => Ok(MatchResult::Matched(room)),
                    FormationOutcome::OpponentUnavailable(room) => {
                        Ok(MatchResult::OpponentUnavailable(room))
                    }
                }
            }
            QueueOutcome::Enqueued => {
                let record = self
                    .game_records
                    .create_if_absent(&GameRecord::finding_match(&lobby, &user_id))
                    .await?;
                info!(
                    "User {} is waiting in queue {} (room {})",
                    user_id,
                    entry.queue_key(),
                    lobby.id
                );
                Ok(MatchResult::Queued(record))
            }
        }
    }

    /// Withdraws a waiting player. Returns false when the entry was already taken
    /// by a pairing, in which case the lobby is now a match and nothing is undone.
    pub async fn cancel_waiting(&self, lobby: &Room) -> Result<bool, MatchmakingServiceError> {
        let Some(player) = lobby.players.first() else {
            return Ok(false);
        };
        let key = queue_key(&lobby.game_type, lobby.stake_terms.amount);
        if !self.queue.remove_entry(&key, &player.user_id).await? {
            debug!(
                "User {} was no longer queued in {}",
                player.user_id, key
            );
            return Ok(false);
        }

        self.delete_lobby(lobby).await?;
        self.escrow
            .refund_stake(
                &player.user_id,
                lobby.stake_terms.amount,
                player.stake_transaction_id.as_deref(),
                TransactionStatus::Refunded,
            )
            .await?;
        let cancelled = GameRecordUpdate {
            status: Some(GameRecordStatus::Cancelled),
            ..Default::default()
        };
        match self.game_records.update_by_game_id(&lobby.id, cancelled).await {
            Ok(()) | Err(GameRecordRepositoryError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        info!("Cancelled the wait of user {} in {}", player.user_id, key);
        Ok(true)
    }

    /// The connection closed: a waiting player leaves the queue, a playing one
    /// gets a grace period.
    pub async fn handle_disconnect(
        &self,
        connection_id: &str,
    ) -> Result<DepartureOutcome, MatchmakingServiceError> {
        let Some(room) = self.room_for(connection_id).await? else {
            return Ok(DepartureOutcome::NotInRoom);
        };
        let room = if room.is_lobby() {
            if self.cancel_waiting(&room).await? {
                return Ok(DepartureOutcome::WaitCancelled);
            }
            match self.rooms.get_room(&room.id).await? {
                Some(room) => room,
                None => return Ok(DepartureOutcome::NotInRoom),
            }
        } else {
            room
        };
        let outcome = self.sessions.handle_disconnect(connection_id, room).await?;
        Ok(DepartureOutcome::Disconnected(outcome))
    }

    /// Takes the connection out of whatever room it is in before a new search.
    pub async fn leave_current_room(
        &self,
        connection_id: &str,
    ) -> Result<DepartureOutcome, MatchmakingServiceError> {
        let Some(room) = self.room_for(connection_id).await? else {
            return Ok(DepartureOutcome::NotInRoom);
        };
        let room = if room.is_lobby() {
            if self.cancel_waiting(&room).await? {
                return Ok(DepartureOutcome::WaitCancelled);
            }
            match self.rooms.get_room(&room.id).await? {
                Some(room) => room,
                None => return Ok(DepartureOutcome::NotInRoom),
            }
        } else {
            room
        };
        match self.sessions.leave(connection_id, &room).await? {
            Some(_) => Ok(DepartureOutcome::Forfeited),
            None => Ok(DepartureOutcome::NotInRoom),
        }
    }

    /// The room a connection is in. A room that ended but was never settled is
    /// settled now and reported as no room.
    async fn room_for(&self, connection_id: &str) -> Result<Option<Room>, MatchmakingServiceError> {
        let Some(room_id) = self.rooms.find_room_id_by_connection(connection_id).await? else {
            return Ok(None);
        };
        match self.rooms.get_room(&room_id).await? {
            Some(room) if room.status.is_terminal() => {
                if let Err(e) = self.sessions.resume_settlement(&room.id).await {
                    error!("Settlement of room {} is still pending: {}", room.id, e);
                }
                Ok(None)
            }
            room => Ok(room),
        }
    }

    async fn delete_lobby(&self, lobby: &Room) -> Result<(), MatchmakingServiceError> {
        match self.rooms.delete_room(lobby).await {
            Ok(()) | Err(RoomRepositoryError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Rolls back a fresh hold after a failed submission. Failures here are logged
    /// so the original error reaches the caller.
    async fn undo_hold(&self, hold: &TransactionRecord, lobby: Option<&Room>) {
        if let Err(e) = self
            .escrow
            .refund_stake(
                &hold.user_id,
                hold.transaction_amount,
                Some(&hold.transaction_id),
                TransactionStatus::Failed,
            )
            .await
        {
            error!(
                "Could not release hold {} for user {}: {}",
                hold.transaction_id, hold.user_id, e
            );
        }
        if let Some(lobby) = lobby {
            if let Err(e) = self.delete_lobby(lobby).await {
                warn!("Could not delete lobby room {}: {}", lobby.id, e);
            }
        }
    }
}

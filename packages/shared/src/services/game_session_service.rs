use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::backoff::BackoffPolicy;
use crate::models::events::{GameEndReason, OpponentInfo, ServerEvent};
use crate::models::game_record::{GameRecord, GameRecordStatus, GameRecordUpdate};
use crate::models::queue::MatchedPair;
use crate::models::room::{Color, Conclusion, PlayerMove, Room, RoomPlayer, RoomStatus, StakeTerms};
use crate::models::transaction::TransactionStatus;
use crate::repositories::errors::game_record_repository_errors::GameRecordRepositoryError;
use crate::repositories::errors::notify_errors::NotifyError;
use crate::repositories::errors::room_repository_errors::RoomRepositoryError;
use crate::repositories::game_record_repository::GameRecordRepository;
use crate::repositories::room_repository::RoomRepository;
use crate::services::errors::escrow_service_errors::EscrowServiceError;
use crate::services::errors::game_session_service_errors::GameSessionServiceError;
use crate::services::escrow_service::EscrowLedger;
use crate::services::rating_service::{MatchSettlement, RatingSettlement};
use crate::services::reconnection_supervisor::{ForfeitHandler, ReconnectionSupervisor};
use crate::services::websocket_service::WebSocketService;

#[derive(Debug, Clone, PartialEq)]
pub enum FormationOutcome {
    Active(Room),
    /// A participant's connection was gone; the room was abandoned without a winner.
    OpponentUnavailable(Room),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectOutcome {
    GraceStarted { user_id: String, epoch: u64 },
    /// Both players are away; the match was called off and both stakes returned.
    MatchVoided,
    Ignored,
}

/// Drives a room through formation, play, disconnects and its terminal state.
/// All room state lives in the room store, so any process can serve either player.
#[derive(Clone)]
pub struct GameSessionService {
    rooms: Arc<dyn RoomRepository + Send + Sync>,
    game_records: Arc<dyn GameRecordRepository + Send + Sync>,
    escrow: EscrowLedger,
    rating: RatingSettlement,
    websocket: WebSocketService,
    supervisor: Arc<ReconnectionSupervisor>,
    backoff: BackoffPolicy,
}

impl GameSessionService {
    pub fn new(
        rooms: Arc<dyn RoomRepository + Send + Sync>,
        game_records: Arc<dyn GameRecordRepository + Send + Sync>,
        escrow: EscrowLedger,
        rating: RatingSettlement,
        websocket: WebSocketService,
        supervisor: Arc<ReconnectionSupervisor>,
    ) -> Self {
        GameSessionService {
            rooms,
            game_records,
            escrow,
            rating,
            websocket,
            supervisor,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Retry schedule for settling a finished match.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn supervisor(&self) -> &ReconnectionSupervisor {
        &self.supervisor
    }

    async fn live_room(&self, room_id: &str) -> Result<Room, GameSessionServiceError> {
        match self.rooms.get_room(room_id).await? {
            Some(room) if !room.status.is_terminal() => Ok(room),
            _ => Err(GameSessionServiceError::RoomNotFound(room_id.to_string())),
        }
    }

    /// Builds the room for a freshly paired couple under the waiting player's lobby id,
    /// tells both players and activates it. When formation fails part way, both stakes
    /// are returned before the error is reported.
    pub async fn form_room(
        &self,
        pair: &MatchedPair,
        currency: &str,
    ) -> Result<FormationOutcome, GameSessionServiceError> {
        let now = Utc::now();
        let mut room = Room {
            id: pair.waiting.lobby_room_id.clone(),
            game_type: pair.waiting.candidate.game_type.clone(),
            players: vec![
                RoomPlayer::from_entry(&pair.waiting, Some(pair.arriving_color.opposite())),
                RoomPlayer::from_entry(&pair.arriving, Some(pair.arriving_color)),
            ],
            current_turn: None,
            moves_white: vec![],
            moves_black: vec![],
            stake_terms: StakeTerms {
                amount: pair.waiting.stake_amount,
                currency: currency.to_string(),
            },
            status: RoomStatus::Forming,
            conclusion: None,
            created_at: now,
            updated_at: now,
        };
        room.current_turn = room
            .player_with_color(Color::White)
            .map(|p| p.connection_id.clone());

        if let Err(e) = self.rooms.save_room(&room).await {
            error!("Could not store room {}: {}", room.id, e);
            self.cancel_formation(&room).await;
            return Err(e.into());
        }
        match self.start_room(room.clone(), pair).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Formation of room {} failed, voiding it: {}", room.id, e);
                let void = Conclusion::Void {
                    reason: GameEndReason::Void,
                };
                if let Err(finish_error) = self.finish(&room, void, RoomStatus::Abandoned).await {
                    error!(
                        "Could not void room {} after a failed formation: {}",
                        room.id, finish_error
                    );
                }
                Err(e)
            }
        }
    }

    /// Storing the room failed: return both stakes and cancel the record.
    async fn cancel_formation(&self, room: &Room) {
        for player in &room.players {
            if let Err(e) = self
                .escrow
                .refund_stake(
                    &player.user_id,
                    room.stake_terms.amount,
                    player.stake_transaction_id.as_deref(),
                    TransactionStatus::Refunded,
                )
                .await
            {
                error!(
                    "Could not refund {} after room {} failed to form: {}",
                    player.user_id, room.id, e
                );
            }
        }
        match self.rooms.delete_room(room).await {
            Ok(()) | Err(RoomRepositoryError::NotFound(_)) => {}
            Err(e) => warn!("Could not remove room {}: {}", room.id, e),
        }
        let update = GameRecordUpdate {
            status: Some(GameRecordStatus::Cancelled),
            ..Default::default()
        };
        match self.game_records.update_by_game_id(&room.id, update).await {
            Ok(()) | Err(GameRecordRepositoryError::NotFound(_)) => {}
            Err(e) => warn!("Could not cancel game record {}: {}", room.id, e),
        }
        let notice = ServerEvent::MatchmakingUpdate {
            status: "match_failed".to_string(),
            message: "Could not start the match. Your stake was returned, please search again."
                .to_string(),
        };
        for player in &room.players {
            self.websocket
                .send_best_effort(&player.connection_id, &notice)
                .await;
        }
    }

    async fn start_room(
        &self,
        mut room: Room,
        pair: &MatchedPair,
    ) -> Result<FormationOutcome, GameSessionServiceError> {
        self.game_records
            .create_if_absent(&GameRecord::finding_match(&room, pair.waiting.user_id()))
            .await?;
        self.game_records
            .update_by_game_id(
                &room.id,
                GameRecordUpdate {
                    status: Some(GameRecordStatus::InProgress),
                    player_white: room.player_with_color(Color::White).map(|p| p.user_id.clone()),
                    player_black: room.player_with_color(Color::Black).map(|p| p.user_id.clone()),
                    ..Default::default()
                },
            )
            .await?;
        for player in &room.players {
            self.escrow
                .mark_stake_hold(
                    player.stake_transaction_id.as_deref(),
                    TransactionStatus::InProgress,
                    Some(&room.id),
                )
                .await?;
        }

        let mut unavailable = Vec::new();
        for player in &room.players {
            let Some(opponent) = room.opponent_of(&player.user_id) else {
                continue;
            };
            let event = ServerEvent::GameStart {
                room_id: room.id.clone(),
                color: player.color.unwrap_or(Color::White),
                opponent: OpponentInfo {
                    user_id: opponent.user_id.clone(),
                    username: opponent.username.clone(),
                    rating: opponent.rating,
                },
                turn: Color::White,
                stake_amount: room.stake_terms.amount,
            };
            match self.websocket.send(&player.connection_id, &event).await {
                Ok(()) => {}
                Err(NotifyError::Gone(_)) => unavailable.push(player.user_id.clone()),
                Err(e) => warn!(
                    "Could not deliver gameStart for room {} to {}: {}",
                    room.id, player.user_id, e
                ),
            }
        }

        if !unavailable.is_empty() {
            warn!(
                "Room {} lost {:?} during formation, abandoning",
                room.id, unavailable
            );
            for user_id in &unavailable {
                if let Some(player) = room.player_by_user_mut(user_id) {
                    player.is_connected = false;
                }
            }
            let void = Conclusion::Void {
                reason: GameEndReason::Void,
            };
            self.finish(&room, void, RoomStatus::Abandoned).await?;
            let update = ServerEvent::MatchmakingUpdate {
                status: "opponent_unavailable".to_string(),
                message: "Your opponent is no longer available. Please search again.".to_string(),
            };
            for player in room.players.iter().filter(|p| p.is_connected) {
                self.websocket
                    .send_best_effort(&player.connection_id, &update)
                    .await;
            }
            room.status = RoomStatus::Abandoned;
            return Ok(FormationOutcome::OpponentUnavailable(room));
        }

        room.status = RoomStatus::Active;
        room.touch();
        self.rooms.update_room(&room).await?;
        info!(
            "Room {} active: {} vs {}",
            room.id,
            pair.waiting.user_id(),
            pair.arriving.user_id()
        );
        Ok(FormationOutcome::Active(room))
    }

    /// Reattaches a returning player on a new connection and resumes the match.
    pub async fn join_room(
        &self,
        connection_id: &str,
        room_id: &str,
        user_id: &str,
    ) -> Result<Room, GameSessionServiceError> {
        let mut room = self.live_room(room_id).await?;
        if room.is_lobby() {
            return Err(GameSessionServiceError::RoomNotFound(room_id.to_string()));
        }
        let player = room.player_by_user_mut(user_id).ok_or_else(|| {
            GameSessionServiceError::NotAParticipant(format!(
                "{} is not a player in room {}",
                user_id, room_id
            ))
        })?;
        if player.is_connected {
            return Err(GameSessionServiceError::AlreadyConnected(user_id.to_string()));
        }
        let old_connection_id =
            std::mem::replace(&mut player.connection_id, connection_id.to_string());
        player.is_connected = true;

        if room.current_turn.as_deref() == Some(old_connection_id.as_str()) {
            room.current_turn = Some(connection_id.to_string());
        }
        room.status = if room.disconnected_count() == 0 {
            RoomStatus::Active
        } else {
            RoomStatus::PlayerDisconnected
        };
        room.touch();
        self.rooms
            .reattach_connection(&room, &old_connection_id, connection_id)
            .await?;
        self.supervisor.cancel(room_id, user_id);
        info!(
            "User {} rejoined room {} on connection {}",
            user_id, room_id, connection_id
        );

        let turn = room.turn_color().unwrap_or(Color::White);
        for player in room.players.iter().filter(|p| p.is_connected) {
            let event = ServerEvent::GameResume {
                room_id: room.id.clone(),
                color: player.color.unwrap_or(Color::White),
                turn,
                moves_white: room.moves_white.clone(),
                moves_black: room.moves_black.clone(),
            };
            self.websocket
                .send_best_effort(&player.connection_id, &event)
                .await;
        }
        Ok(room)
    }

    pub async fn make_move(
        &self,
        connection_id: &str,
        room_id: &str,
        player_move: PlayerMove,
        declared_color: Option<Color>,
    ) -> Result<Room, GameSessionServiceError> {
        let mut room = self.live_room(room_id).await?;
        let mover = room
            .player_by_connection(connection_id)
            .cloned()
            .ok_or_else(|| {
                GameSessionServiceError::NotAParticipant(format!(
                    "Connection {} is not in room {}",
                    connection_id, room_id
                ))
            })?;
        match room.status {
            RoomStatus::Active => {}
            RoomStatus::PlayerDisconnected => {
                return Err(GameSessionServiceError::InvalidMove(
                    "Waiting for your opponent to reconnect".to_string(),
                ))
            }
            _ => {
                return Err(GameSessionServiceError::InvalidMove(
                    "Game is not in progress".to_string(),
                ))
            }
        }
        if room.current_turn.as_deref() != Some(connection_id) {
            return Err(GameSessionServiceError::InvalidMove("Not your turn".to_string()));
        }
        let color = mover
            .color
            .ok_or_else(|| GameSessionServiceError::InvalidMove("No color assigned".to_string()))?;
        if declared_color.is_some_and(|declared| declared != color) {
            return Err(GameSessionServiceError::InvalidMove(format!(
                "You are playing {:?}",
                color
            )));
        }
        let opponent = room
            .opponent_of(&mover.user_id)
            .cloned()
            .ok_or_else(|| GameSessionServiceError::InvalidMove("No opponent".to_string()))?;

        match color {
            Color::White => room.moves_white.push(player_move.clone()),
            Color::Black => room.moves_black.push(player_move.clone()),
        }
        room.current_turn = Some(opponent.connection_id.clone());
        room.touch();
        self.rooms.update_room(&room).await?;
        debug!(
            "Room {}: {} played {}-{}",
            room.id, mover.user_id, player_move.from, player_move.to
        );

        let relay = ServerEvent::OpponentMove {
            room_id: room.id.clone(),
            player_move,
            color,
            turn: color.opposite(),
        };
        self.websocket
            .send_best_effort(&opponent.connection_id, &relay)
            .await;
        Ok(room)
    }

    /// Marks the player on `connection_id` as away and starts their grace period.
    pub async fn handle_disconnect(
        &self,
        connection_id: &str,
        mut room: Room,
    ) -> Result<DisconnectOutcome, GameSessionServiceError> {
        if room.status.is_terminal() || room.is_lobby() {
            return Ok(DisconnectOutcome::Ignored);
        }
        let Some(player) = room
            .players
            .iter_mut()
            .find(|p| p.connection_id == connection_id)
        else {
            return Ok(DisconnectOutcome::Ignored);
        };
        if !player.is_connected {
            return Ok(DisconnectOutcome::Ignored);
        }
        player.is_connected = false;
        player.disconnect_epoch += 1;
        let user_id = player.user_id.clone();
        let epoch = player.disconnect_epoch;

        if room.disconnected_count() == room.players.len() {
            info!("Both players left room {}, calling the match off", room.id);
            let void = Conclusion::Void {
                reason: GameEndReason::Void,
            };
            self.finish(&room, void, RoomStatus::Abandoned).await?;
            return Ok(DisconnectOutcome::MatchVoided);
        }

        room.status = RoomStatus::PlayerDisconnected;
        room.touch();
        self.rooms.update_room(&room).await?;
        self.supervisor
            .arm(&room.id, &user_id, epoch, Arc::new(self.clone()));
        info!(
            "User {} disconnected from room {} (epoch {})",
            user_id, room.id, epoch
        );

        if let Some(opponent) = room.opponent_of(&user_id) {
            let event = ServerEvent::OpponentDisconnected {
                room_id: room.id.clone(),
                user_id: user_id.clone(),
                grace_period_secs: self.supervisor.grace().as_secs(),
            };
            self.websocket
                .send_best_effort(&opponent.connection_id, &event)
                .await;
        }
        Ok(DisconnectOutcome::GraceStarted { user_id, epoch })
    }

    /// Awards the match to the opponent if the player is still away on the same
    /// disconnect. Returns whether the match was forfeited.
    pub async fn forfeit_if_still_away(
        &self,
        room_id: &str,
        user_id: &str,
        epoch: u64,
    ) -> Result<bool, GameSessionServiceError> {
        let Some(room) = self.rooms.get_room(room_id).await? else {
            return Ok(false);
        };
        if room.status.is_terminal() {
            return Ok(false);
        }
        let (Some(player), Some(opponent)) = (room.player_by_user(user_id), room.opponent_of(user_id))
        else {
            return Ok(false);
        };
        if player.is_connected || player.disconnect_epoch != epoch || !opponent.is_connected {
            debug!(
                "Grace expiry for {} in room {} is stale, ignoring",
                user_id, room_id
            );
            return Ok(false);
        }
        let conclusion = Conclusion::Decisive {
            winner_id: opponent.user_id.clone(),
            loser_id: user_id.to_string(),
            reason: GameEndReason::Abandonment,
        };
        Ok(self
            .finish(&room, conclusion, RoomStatus::Abandoned)
            .await?
            .is_some())
    }

    /// A participant reports the end of the game.
    pub async fn end_game(
        &self,
        connection_id: &str,
        room_id: &str,
        reason: GameEndReason,
        winner_id: Option<String>,
        loser_id: Option<String>,
    ) -> Result<Option<MatchSettlement>, GameSessionServiceError> {
        let room = self.live_room(room_id).await?;
        if room.player_by_connection(connection_id).is_none() {
            return Err(GameSessionServiceError::NotAParticipant(format!(
                "Connection {} is not in room {}",
                connection_id, room_id
            )));
        }
        if room.is_lobby() {
            return Err(GameSessionServiceError::InvalidGameOver(
                "Game has not started".to_string(),
            ));
        }
        if room.status != RoomStatus::Active {
            return Err(GameSessionServiceError::InvalidGameOver(
                "Game is paused while a player is disconnected".to_string(),
            ));
        }
        if !reason.is_client_declarable() {
            return Err(GameSessionServiceError::InvalidGameOver(format!(
                "{} cannot be reported by a player",
                reason.as_str()
            )));
        }

        let conclusion = if reason.is_draw() {
            Conclusion::Draw { reason }
        } else {
            let (Some(winner_id), Some(loser_id)) = (winner_id, loser_id) else {
                return Err(GameSessionServiceError::InvalidGameOver(
                    "A decisive result needs a winner and a loser".to_string(),
                ));
            };
            let both_present =
                room.player_by_user(&winner_id).is_some() && room.player_by_user(&loser_id).is_some();
            if winner_id == loser_id || !both_present {
                return Err(GameSessionServiceError::InvalidGameOver(
                    "Winner and loser must be the two players of the room".to_string(),
                ));
            }
            Conclusion::Decisive {
                winner_id,
                loser_id,
                reason,
            }
        };
        self.finish(&room, conclusion, RoomStatus::Completed).await
    }

    /// The player on `connection_id` walks away from a live match and forfeits it.
    pub async fn leave(
        &self,
        connection_id: &str,
        room: &Room,
    ) -> Result<Option<MatchSettlement>, GameSessionServiceError> {
        if room.status.is_terminal() || room.is_lobby() {
            return Ok(None);
        }
        let Some(leaver) = room.player_by_connection(connection_id) else {
            return Ok(None);
        };
        let Some(opponent) = room.opponent_of(&leaver.user_id) else {
            return Ok(None);
        };
        info!("User {} left room {}", leaver.user_id, room.id);
        let conclusion = Conclusion::Decisive {
            winner_id: opponent.user_id.clone(),
            loser_id: leaver.user_id.clone(),
            reason: GameEndReason::OpponentLeft,
        };
        self.finish(room, conclusion, RoomStatus::Abandoned).await
    }

    /// Moves the room to its terminal state and settles it. Writing the terminal status
    /// together with the conclusion is the claim: the store refuses it for a room that has
    /// already ended, so concurrent endings cannot double-settle. Returns `None` when
    /// another caller already finished the room.
    pub async fn finish(
        &self,
        room: &Room,
        conclusion: Conclusion,
        status: RoomStatus,
    ) -> Result<Option<MatchSettlement>, GameSessionServiceError> {
        let mut claimed = room.clone();
        claimed.status = status;
        claimed.conclusion = Some(conclusion);
        claimed.touch();
        match self.rooms.update_room(&claimed).await {
            Ok(()) => {}
            Err(RoomRepositoryError::NotFound(_)) => {
                debug!("Room {} already finished", room.id);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
        self.supervisor.cancel_room(&room.id);
        self.settle_claimed(&claimed).await.map(Some)
    }

    /// Settles an ended room whose settlement did not complete, e.g. after a store outage.
    /// Returns `None` when the room is gone or still live.
    pub async fn resume_settlement(
        &self,
        room_id: &str,
    ) -> Result<Option<MatchSettlement>, GameSessionServiceError> {
        match self.rooms.get_room(room_id).await? {
            Some(room) if room.status.is_terminal() && room.conclusion.is_some() => {
                info!("Resuming settlement of room {}", room_id);
                self.settle_claimed(&room).await.map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Pays out a claimed room, records the result, removes the room and tells the players.
    /// The stake transactions close in the same unit as the money moves, so running this
    /// again after a partial failure settles nothing twice.
    async fn settle_claimed(&self, room: &Room) -> Result<MatchSettlement, GameSessionServiceError> {
        let Some(conclusion) = room.conclusion.clone() else {
            return Err(GameSessionServiceError::InvalidGameOver(format!(
                "Room {} has no conclusion to settle",
                room.id
            )));
        };
        let stake = room.stake_terms.amount;
        let reason = conclusion.reason();
        let (settlement, winner_id, loser_id) = match conclusion {
            Conclusion::Decisive {
                winner_id,
                loser_id,
                ..
            } => {
                let (Some(winner), Some(loser)) =
                    (room.player_by_user(&winner_id), room.player_by_user(&loser_id))
                else {
                    return Err(GameSessionServiceError::NotAParticipant(format!(
                        "{} or {} is not in room {}",
                        winner_id, loser_id, room.id
                    )));
                };
                (
                    self.rating.decisive(winner, loser, stake),
                    Some(winner_id),
                    Some(loser_id),
                )
            }
            Conclusion::Draw { .. } => (self.rating.draw(&room.players, stake), None, None),
            Conclusion::Void { .. } => (RatingSettlement::void(&room.players, stake), None, None),
        };

        let applied = self
            .backoff
            .retry(
                || {
                    self.escrow
                        .settle_match(&settlement.instructions, settlement.transaction_status)
                },
                EscrowServiceError::is_retryable,
            )
            .await;
        match applied {
            Ok(true) => {}
            Ok(false) => debug!("Stakes of room {} were already settled", room.id),
            Err(e) => {
                error!(
                    "Settlement of room {} failed, left pending on the stored room: {}",
                    room.id, e
                );
                return Err(e.into());
            }
        }

        self.record_result(
            room,
            &settlement,
            reason,
            room.status,
            winner_id.as_deref(),
            loser_id.as_deref(),
        )
        .await?;
        match self.rooms.delete_room(room).await {
            Ok(()) | Err(RoomRepositoryError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        for player in room.players.iter().filter(|p| p.is_connected) {
            let event = ServerEvent::GameEnded {
                room_id: room.id.clone(),
                reason,
                winner_id: winner_id.clone(),
                loser_id: loser_id.clone(),
                rating_change: settlement.rating_change_for(&player.user_id),
            };
            self.websocket
                .send_best_effort(&player.connection_id, &event)
                .await;
        }
        info!(
            "Room {} ended ({}), winner {:?}",
            room.id,
            reason.as_str(),
            winner_id
        );
        Ok(settlement)
    }

    async fn record_result(
        &self,
        room: &Room,
        settlement: &MatchSettlement,
        reason: GameEndReason,
        status: RoomStatus,
        winner_id: Option<&str>,
        loser_id: Option<&str>,
    ) -> Result<(), GameSessionServiceError> {
        // Draws carry white's change in the winner slot and black's in the loser slot.
        let (first, second) = match (winner_id, loser_id) {
            (Some(winner), Some(loser)) => (Some(winner.to_string()), Some(loser.to_string())),
            _ => (
                room.player_with_color(Color::White).map(|p| p.user_id.clone()),
                room.player_with_color(Color::Black).map(|p| p.user_id.clone()),
            ),
        };
        let update = GameRecordUpdate {
            status: Some(match status {
                RoomStatus::Completed => GameRecordStatus::Completed,
                _ => GameRecordStatus::Abandoned,
            }),
            result: Some(reason.as_str().to_string()),
            winner_id: winner_id.map(str::to_string),
            loser_id: loser_id.map(str::to_string),
            winner_rating_delta: first.and_then(|id| settlement.rating_change_for(&id)),
            loser_rating_delta: second.and_then(|id| settlement.rating_change_for(&id)),
            moves_white: Some(room.moves_white.clone()),
            moves_black: Some(room.moves_black.clone()),
            ..Default::default()
        };
        match self.game_records.update_by_game_id(&room.id, update).await {
            Ok(()) => Ok(()),
            Err(GameRecordRepositoryError::NotFound(game_id)) => {
                warn!("Game record {} missing at the end of the match", game_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ForfeitHandler for GameSessionService {
    async fn on_grace_expired(&self, room_id: &str, user_id: &str, epoch: u64) {
        match self.forfeit_if_still_away(room_id, user_id, epoch).await {
            Ok(true) => info!("User {} forfeited room {} by abandonment", user_id, room_id),
            Ok(false) => {}
            Err(e) => error!(
                "Failed to forfeit user {} in room {}: {}",
                user_id, room_id, e
            ),
        }
    }
}

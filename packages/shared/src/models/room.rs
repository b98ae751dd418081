use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::events::GameEndReason;
use crate::models::queue::QueueEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Forming,
    Active,
    PlayerDisconnected,
    Completed,
    Abandoned,
}

impl RoomStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RoomStatus::Completed | RoomStatus::Abandoned)
    }
}

/// How a match ends. Stored on the room when it is claimed so an interrupted
/// settlement can be resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conclusion {
    Decisive {
        winner_id: String,
        loser_id: String,
        reason: GameEndReason,
    },
    Draw {
        reason: GameEndReason,
    },
    Void {
        reason: GameEndReason,
    },
}

impl Conclusion {
    pub fn reason(&self) -> GameEndReason {
        match self {
            Conclusion::Decisive { reason, .. }
            | Conclusion::Draw { reason }
            | Conclusion::Void { reason } => *reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeTerms {
    pub amount: Decimal,
    pub currency: String,
}

/// An opaque move token. Moves are relayed, never validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMove {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPlayer {
    pub connection_id: String,
    pub user_id: String,
    pub username: String,
    pub color: Option<Color>,
    pub rating: i32,
    pub is_connected: bool,
    /// Bumped on every disconnect; a grace timer only acts on the epoch it was armed with.
    #[serde(default)]
    pub disconnect_epoch: u64,
    pub stake_transaction_id: Option<String>,
}

impl RoomPlayer {
    pub fn from_entry(entry: &QueueEntry, color: Option<Color>) -> Self {
        RoomPlayer {
            connection_id: entry.connection_id.clone(),
            user_id: entry.candidate.user_id.clone(),
            username: entry.username.clone(),
            color,
            rating: entry.candidate.rating,
            is_connected: true,
            disconnect_epoch: 0,
            stake_transaction_id: entry.stake_transaction_id.clone(),
        }
    }
}

/// Live state of one match, persisted in the shared room store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "room_id")]
    pub id: String,
    pub game_type: String,
    pub players: Vec<RoomPlayer>,
    /// Connection id of the player to move.
    pub current_turn: Option<String>,
    #[serde(default)]
    pub moves_white: Vec<PlayerMove>,
    #[serde(default)]
    pub moves_black: Vec<PlayerMove>,
    pub stake_terms: StakeTerms,
    pub status: RoomStatus,
    /// Set together with the terminal status; present until the room is removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// A single-player room held for a queued player until a partner arrives.
    pub fn lobby(entry: &QueueEntry, currency: &str) -> Self {
        let now = Utc::now();
        Room {
            id: entry.lobby_room_id.clone(),
            game_type: entry.candidate.game_type.clone(),
            players: vec![RoomPlayer::from_entry(entry, None)],
            current_turn: None,
            moves_white: vec![],
            moves_black: vec![],
            stake_terms: StakeTerms {
                amount: entry.stake_amount,
                currency: currency.to_string(),
            },
            status: RoomStatus::Forming,
            conclusion: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_lobby(&self) -> bool {
        self.players.len() < 2
    }

    pub fn player_by_connection(&self, connection_id: &str) -> Option<&RoomPlayer> {
        self.players
            .iter()
            .find(|p| p.connection_id == connection_id)
    }

    pub fn player_by_user(&self, user_id: &str) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn player_by_user_mut(&mut self, user_id: &str) -> Option<&mut RoomPlayer> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn opponent_of(&self, user_id: &str) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.user_id != user_id)
    }

    pub fn player_with_color(&self, color: Color) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.color == Some(color))
    }

    /// Color of the player whose turn it is.
    pub fn turn_color(&self) -> Option<Color> {
        let turn = self.current_turn.as_deref()?;
        self.player_by_connection(turn).and_then(|p| p.color)
    }

    pub fn connection_ids(&self) -> Vec<String> {
        self.players.iter().map(|p| p.connection_id.clone()).collect()
    }

    pub fn disconnected_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_connected).count()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

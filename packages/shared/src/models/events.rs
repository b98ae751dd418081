use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::candidate::PlayerCandidate;
use crate::models::game_record::GameRecord;
use crate::models::room::{Color, PlayerMove};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPreferences {
    pub game_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEndReason {
    Checkmate,
    Resignation,
    Timeout,
    Stalemate,
    Draw,
    /// A disconnected player did not return within the grace period.
    Abandonment,
    /// A player left a live match to look for another.
    OpponentLeft,
    /// The match was called off without a winner and both stakes returned.
    Void,
}

impl GameEndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            GameEndReason::Checkmate => "checkmate",
            GameEndReason::Resignation => "resignation",
            GameEndReason::Timeout => "timeout",
            GameEndReason::Stalemate => "stalemate",
            GameEndReason::Draw => "draw",
            GameEndReason::Abandonment => "abandonment",
            GameEndReason::OpponentLeft => "opponent_left",
            GameEndReason::Void => "void",
        }
    }

    pub fn is_draw(self) -> bool {
        matches!(self, GameEndReason::Stalemate | GameEndReason::Draw)
    }

    /// Reasons a client may report through `gameOver`. The rest are decided by the server.
    pub fn is_client_declarable(self) -> bool {
        !matches!(
            self,
            GameEndReason::Abandonment | GameEndReason::OpponentLeft | GameEndReason::Void
        )
    }
}

/// Messages sent by a client over its websocket connection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientEvent {
    FindMatch {
        username: String,
        preferences: MatchPreferences,
        stake_amount: Decimal,
        candidate: PlayerCandidate,
        #[serde(default)]
        allow_extended_search: bool,
    },
    MakeMove {
        room_id: String,
        #[serde(rename = "move")]
        player_move: PlayerMove,
        #[serde(default)]
        color: Option<Color>,
    },
    GameOver {
        room_id: String,
        reason: GameEndReason,
        #[serde(default)]
        winner_id: Option<String>,
        #[serde(default)]
        loser_id: Option<String>,
    },
    JoinRoom {
        room_id: String,
        user_id: String,
        #[serde(default)]
        username: Option<String>,
    },
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindMatchStatus {
    Matched,
    Queued,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentInfo {
    pub user_id: String,
    pub username: String,
    pub rating: i32,
}

/// Messages pushed to a client connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    FindMatchResult {
        status: FindMatchStatus,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        game_record: Option<GameRecord>,
    },
    GameStart {
        room_id: String,
        color: Color,
        opponent: OpponentInfo,
        turn: Color,
        stake_amount: Decimal,
    },
    GameResume {
        room_id: String,
        color: Color,
        turn: Color,
        moves_white: Vec<PlayerMove>,
        moves_black: Vec<PlayerMove>,
    },
    JoinRoomResult {
        success: bool,
        room_id: String,
        message: String,
    },
    OpponentDisconnected {
        room_id: String,
        user_id: String,
        grace_period_secs: u64,
    },
    OpponentMove {
        room_id: String,
        #[serde(rename = "move")]
        player_move: PlayerMove,
        color: Color,
        turn: Color,
    },
    MoveError {
        room_id: String,
        message: String,
    },
    GameEnded {
        room_id: String,
        reason: GameEndReason,
        winner_id: Option<String>,
        loser_id: Option<String>,
        rating_change: Option<i32>,
    },
    MatchmakingUpdate {
        status: String,
        message: String,
    },
    Error {
        message: String,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

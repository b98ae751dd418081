use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::room::{PlayerMove, Room};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameRecordStatus {
    FindingMatch,
    InProgress,
    Completed,
    Abandoned,
    Cancelled,
}

/// Durable history of one match, from the first queued request to the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub game_type: String,
    pub game_room_id: String,
    pub status: GameRecordStatus,
    pub player_white: Option<String>,
    pub player_black: Option<String>,
    pub requested_by: String,
    pub stake_amount: Decimal,
    pub result: Option<String>,
    pub winner_id: Option<String>,
    pub loser_id: Option<String>,
    pub winner_rating_delta: Option<i32>,
    pub loser_rating_delta: Option<i32>,
    #[serde(default)]
    pub moves_white: Vec<PlayerMove>,
    #[serde(default)]
    pub moves_black: Vec<PlayerMove>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameRecord {
    /// The record of a player waiting in the queue. The game id is the lobby room id.
    pub fn finding_match(room: &Room, requested_by: &str) -> Self {
        let now = Utc::now();
        GameRecord {
            game_id: room.id.clone(),
            game_type: room.game_type.clone(),
            game_room_id: room.id.clone(),
            status: GameRecordStatus::FindingMatch,
            player_white: None,
            player_black: None,
            requested_by: requested_by.to_string(),
            stake_amount: room.stake_terms.amount,
            result: None,
            winner_id: None,
            loser_id: None,
            winner_rating_delta: None,
            loser_rating_delta: None,
            moves_white: vec![],
            moves_black: vec![],
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied on top of an existing record, or used to seed a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRecordUpdate {
    pub status: Option<GameRecordStatus>,
    pub player_white: Option<String>,
    pub player_black: Option<String>,
    pub result: Option<String>,
    pub winner_id: Option<String>,
    pub loser_id: Option<String>,
    pub winner_rating_delta: Option<i32>,
    pub loser_rating_delta: Option<i32>,
    pub moves_white: Option<Vec<PlayerMove>>,
    pub moves_black: Option<Vec<PlayerMove>>,
}

impl GameRecordUpdate {
    pub fn apply(self, record: &mut GameRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if self.player_white.is_some() {
            record.player_white = self.player_white;
        }
        if self.player_black.is_some() {
            record.player_black = self.player_black;
        }
        if self.result.is_some() {
            record.result = self.result;
        }
        if self.winner_id.is_some() {
            record.winner_id = self.winner_id;
        }
        if self.loser_id.is_some() {
            record.loser_id = self.loser_id;
        }
        if self.winner_rating_delta.is_some() {
            record.winner_rating_delta = self.winner_rating_delta;
        }
        if self.loser_rating_delta.is_some() {
            record.loser_rating_delta = self.loser_rating_delta;
        }
        if let Some(moves) = self.moves_white {
            record.moves_white = moves;
        }
        if let Some(moves) = self.moves_black {
            record.moves_black = moves;
        }
        record.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::room::{RoomStatus, StakeTerms};
    use rust_decimal_macros::dec;

    fn room() -> Room {
        Room {
            id: "room-9".to_string(),
            game_type: "rapid".to_string(),
            players: vec![],
            current_turn: None,
            moves_white: vec![],
            moves_black: vec![],
            stake_terms: StakeTerms {
                amount: dec!(20),
                currency: "INR".to_string(),
            },
            status: RoomStatus::Forming,
            conclusion: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_finding_match_record() {
        let record = GameRecord::finding_match(&room(), "alice");
        assert_eq!(record.game_id, "room-9");
        assert_eq!(record.game_room_id, "room-9");
        assert_eq!(record.status, GameRecordStatus::FindingMatch);
        assert_eq!(record.requested_by, "alice");
        assert_eq!(record.stake_amount, dec!(20));
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut record = GameRecord::finding_match(&room(), "alice");
        record.player_white = Some("alice".to_string());

        GameRecordUpdate {
            status: Some(GameRecordStatus::Completed),
            winner_id: Some("bob".to_string()),
            winner_rating_delta: Some(16),
            ..Default::default()
        }
        .apply(&mut record);

        assert_eq!(record.status, GameRecordStatus::Completed);
        assert_eq!(record.player_white.as_deref(), Some("alice"));
        assert_eq!(record.winner_id.as_deref(), Some("bob"));
        assert_eq!(record.winner_rating_delta, Some(16));
        assert!(record.loser_id.is_none());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&GameRecordStatus::FindingMatch).unwrap(),
            "\"FINDING_MATCH\""
        );
    }
}

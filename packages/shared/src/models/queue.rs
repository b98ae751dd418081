use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::candidate::PlayerCandidate;
use crate::models::room::Color;

/// A candidate waiting in the matchmaking queue.
/// Queue partitions are keyed by game type and stake tier, e.g. "rapid#100".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub candidate: PlayerCandidate,
    pub connection_id: String,
    pub username: String,
    pub stake_amount: Decimal,
    /// Becomes the room id once this entry is paired.
    pub lobby_room_id: String,
    pub stake_transaction_id: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn user_id(&self) -> &str {
        &self.candidate.user_id
    }

    pub fn queue_key(&self) -> String {
        queue_key(&self.candidate.game_type, self.stake_amount)
    }
}

pub fn queue_key(game_type: &str, stake_amount: Decimal) -> String {
    format!("{}#{}", game_type, stake_amount.normalize())
}

/// Tolerance widening parameters for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCriteria {
    pub tolerance_start: i32,
    pub tolerance_step: i32,
    pub max_iterations: u32,
    pub allow_extended_search: bool,
}

impl Default for MatchCriteria {
    fn default() -> Self {
        MatchCriteria {
            tolerance_start: 25,
            tolerance_step: 25,
            max_iterations: 10,
            allow_extended_search: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPair {
    /// The entry that was already queued (now removed).
    pub waiting: QueueEntry,
    /// The entry whose submission produced the match.
    pub arriving: QueueEntry,
    pub arriving_color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueOutcome {
    Matched(Box<MatchedPair>),
    Enqueued,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_queue_key_normalizes_stake() {
        assert_eq!(queue_key("rapid", dec!(100.00)), "rapid#100");
        assert_eq!(queue_key("blitz", dec!(12.50)), "blitz#12.5");
        assert_eq!(queue_key("bullet", dec!(0)), "bullet#0");
    }

    #[test]
    fn test_default_criteria() {
        let criteria = MatchCriteria::default();
        assert_eq!(criteria.tolerance_start, 25);
        assert_eq!(criteria.tolerance_step, 25);
        assert_eq!(criteria.max_iterations, 10);
        assert!(!criteria.allow_extended_search);
    }
}

use serde::{Deserialize, Serialize};

/// Only the most recent results take part in streak comparison.
pub const MAX_RECENT_RESULTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
    #[serde(rename = "D")]
    Draw,
}

/// A player's matchmaking profile, produced by the caller and submitted for pairing.
/// Immutable once it has been handed to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCandidate {
    pub user_id: String,
    pub rating: i32,
    pub games_played: u32,
    /// Fraction of games won, 0.0 to 1.0
    pub win_percentage: f64,
    #[serde(default)]
    pub last_ten_results: Vec<GameOutcome>,
    pub games_as_white: u32,
    pub games_as_black: u32,
    pub game_type: String,
}

impl PlayerCandidate {
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.is_empty() {
            return Err("Candidate user_id cannot be empty".to_string());
        }
        if self.game_type.is_empty() {
            return Err("Candidate game_type cannot be empty".to_string());
        }
        if self.last_ten_results.len() > MAX_RECENT_RESULTS {
            return Err(format!(
                "Candidate may carry at most {} recent results, got {}",
                MAX_RECENT_RESULTS,
                self.last_ten_results.len()
            ));
        }
        if !(0.0..=1.0).contains(&self.win_percentage) {
            return Err("Candidate win_percentage must be between 0 and 1".to_string());
        }
        Ok(())
    }
}

use rust_decimal::Decimal;

use crate::models::account::{round_money, SettlementInstruction};
use crate::models::room::RoomPlayer;
use crate::models::transaction::TransactionStatus;

/// The result of a match in rating points and money.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettlement {
    /// Rating change per user id.
    pub rating_changes: Vec<(String, i32)>,
    pub instructions: Vec<SettlementInstruction>,
    /// What the players' stake transactions become.
    pub transaction_status: TransactionStatus,
}

impl MatchSettlement {
    pub fn rating_change_for(&self, user_id: &str) -> Option<i32> {
        self.rating_changes
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(_, delta)| *delta)
    }
}

/// Elo rating adjustment plus the stake transfer that goes with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSettlement {
    k_factor: f64,
    commission_rate: Decimal,
}

impl Default for RatingSettlement {
    fn default() -> Self {
        RatingSettlement::new(32.0, Decimal::ZERO)
    }
}

impl RatingSettlement {
    pub fn new(k_factor: f64, commission_rate: Decimal) -> Self {
        RatingSettlement {
            k_factor,
            commission_rate,
        }
    }

    /// Probability that a player rated `rating` beats one rated `opponent`.
    pub fn expected_score(rating: i32, opponent: i32) -> f64 {
        1.0 / (1.0 + 10f64.powf((opponent - rating) as f64 / 400.0))
    }

    /// Rating change for a score of 1.0 (win), 0.5 (draw) or 0.0 (loss).
    pub fn rating_delta(&self, rating: i32, opponent: i32, score: f64) -> i32 {
        (self.k_factor * (score - Self::expected_score(rating, opponent))).round() as i32
    }

    /// Winner gains what the loser drops. The loser pays the stake, the winner
    /// receives it less commission, and both holds are released.
    pub fn decisive(&self, winner: &RoomPlayer, loser: &RoomPlayer, stake: Decimal) -> MatchSettlement {
        let gain = self.rating_delta(winner.rating, loser.rating, 1.0);
        let payout = round_money(stake * (Decimal::ONE - self.commission_rate));
        MatchSettlement {
            rating_changes: vec![
                (winner.user_id.clone(), gain),
                (loser.user_id.clone(), -gain),
            ],
            instructions: vec![
                SettlementInstruction {
                    user_id: winner.user_id.clone(),
                    hold: stake,
                    delta: payout,
                    is_credit: true,
                    stake_transaction_id: winner.stake_transaction_id.clone(),
                },
                SettlementInstruction {
                    user_id: loser.user_id.clone(),
                    hold: stake,
                    delta: stake,
                    is_credit: false,
                    stake_transaction_id: loser.stake_transaction_id.clone(),
                },
            ],
            transaction_status: TransactionStatus::Successful,
        }
    }

    pub fn draw(&self, players: &[RoomPlayer], stake: Decimal) -> MatchSettlement {
        let rating_changes = players
            .iter()
            .filter_map(|player| {
                let opponent = players.iter().find(|p| p.user_id != player.user_id)?;
                Some((
                    player.user_id.clone(),
                    self.rating_delta(player.rating, opponent.rating, 0.5),
                ))
            })
            .collect();
        MatchSettlement {
            rating_changes,
            ..Self::void(players, stake)
        }
    }

    /// No result: ratings stay, holds are released.
    pub fn void(players: &[RoomPlayer], stake: Decimal) -> MatchSettlement {
        MatchSettlement {
            rating_changes: vec![],
            instructions: players
                .iter()
                .map(|p| {
                    SettlementInstruction::release_only(
                        &p.user_id,
                        stake,
                        p.stake_transaction_id.as_deref(),
                    )
                })
                .collect(),
            transaction_status: TransactionStatus::Refunded,
        }
    }
}

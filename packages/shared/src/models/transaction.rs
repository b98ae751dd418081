use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    AddMoney,
    Withdrawal,
    GameStake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    InProgress,
    Successful,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub user_id: String,
    pub account_id: String,
    pub transaction_type: TransactionType,
    pub topup_amount: Decimal,
    pub transaction_amount: Decimal,
    pub currency: String,
    pub transaction_status: TransactionStatus,
    pub game_id: Option<String>,
    pub transaction_reward: Decimal,
    pub reward_id: Option<String>,
    pub is_active: bool,
    pub transaction_date: DateTime<Utc>,
}

pub fn new_transaction_id() -> String {
    format!("TXN-{}", Uuid::new_v4().simple())
}

impl TransactionRecord {
    /// Opens the record of a stake held for a pending match.
    pub fn game_stake(user_id: &str, account_id: &str, amount: Decimal, currency: &str) -> Self {
        TransactionRecord {
            transaction_id: new_transaction_id(),
            user_id: user_id.to_string(),
            account_id: account_id.to_string(),
            transaction_type: TransactionType::GameStake,
            topup_amount: Decimal::ZERO,
            transaction_amount: amount,
            currency: currency.to_string(),
            transaction_status: TransactionStatus::InProgress,
            game_id: None,
            transaction_reward: Decimal::ZERO,
            reward_id: None,
            is_active: true,
            transaction_date: Utc::now(),
        }
    }

    /// A hold waiting for a match. Once bound to a game it belongs to that game.
    pub fn is_open_stake_hold(&self) -> bool {
        self.transaction_type == TransactionType::GameStake
            && self.transaction_status == TransactionStatus::InProgress
            && self.is_active
            && self.game_id.is_none()
    }
}

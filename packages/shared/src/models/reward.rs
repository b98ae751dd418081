use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardType {
    AddMoneyReward,
    SigninReward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub reward_id: String,
    pub user_id: String,
    pub reward_type: RewardType,
    pub reward_amount: Decimal,
    pub reward_currency: String,
    pub reward_status: String,
    pub is_settled: bool,
    pub reward_date: DateTime<Utc>,
    pub reward_description: String,
}

impl RewardRecord {
    pub fn deposit_reward(user_id: &str, amount: Decimal, currency: &str) -> Self {
        RewardRecord {
            reward_id: format!("RWD-{}", Uuid::new_v4().simple()),
            user_id: user_id.to_string(),
            reward_type: RewardType::AddMoneyReward,
            reward_amount: amount,
            reward_currency: currency.to_string(),
            reward_status: "CREDITED".to_string(),
            is_settled: true,
            reward_date: Utc::now(),
            reward_description: format!("Reward of {} {} on deposit", amount, currency),
        }
    }
}

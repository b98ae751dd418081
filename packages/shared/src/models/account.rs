use chrono::{DateTime, Utc};
use rust_decimal::prelude::RoundingStrategy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's wallet. Funds committed to live matches sit in `blocked_amount`;
/// `available_amount` is kept equal to `account_balance - blocked_amount` so the
/// store can guard blocks with a single comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub account_id: String,
    pub account_balance: Decimal,
    pub blocked_amount: Decimal,
    pub available_amount: Decimal,
    pub reward_amount_balance: Decimal,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: &str, opening_balance: Decimal, currency: &str) -> Self {
        let now = Utc::now();
        Account {
            user_id: user_id.to_string(),
            account_id: Uuid::new_v4().to_string(),
            account_balance: opening_balance,
            blocked_amount: Decimal::ZERO,
            available_amount: opening_balance,
            reward_amount_balance: Decimal::ZERO,
            currency: currency.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn available(&self) -> Decimal {
        self.account_balance - self.blocked_amount
    }
}

/// One side of a match settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementInstruction {
    pub user_id: String,
    /// Amount previously blocked for this match, released here.
    pub hold: Decimal,
    /// Non-negative balance adjustment; direction given by `is_credit`.
    pub delta: Decimal,
    pub is_credit: bool,
    /// Stake transaction closed in the same atomic unit. A closed one means this
    /// side was already settled.
    pub stake_transaction_id: Option<String>,
}

impl SettlementInstruction {
    pub fn release_only(user_id: &str, hold: Decimal, stake_transaction_id: Option<&str>) -> Self {
        SettlementInstruction {
            user_id: user_id.to_string(),
            hold,
            delta: Decimal::ZERO,
            is_credit: true,
            stake_transaction_id: stake_transaction_id.map(str::to_string),
        }
    }

    pub fn signed_delta(&self) -> Decimal {
        if self.is_credit {
            self.delta
        } else {
            -self.delta
        }
    }
}

/// How a deposit is divided between spendable balance and reward balance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositSplit {
    pub actual: Decimal,
    pub reward: Decimal,
}

impl DepositSplit {
    pub fn compute(amount: Decimal, tax_rate: Decimal) -> Self {
        let actual = round_money(amount / (Decimal::ONE + tax_rate));
        let reward = round_money(amount - actual);
        DepositSplit { actual, reward }
    }
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::models::account::{Account, DepositSplit, SettlementInstruction};
use crate::models::reward::RewardRecord;
use crate::models::transaction::{
    new_transaction_id, TransactionRecord, TransactionStatus, TransactionType,
};
use crate::repositories::account_repository::AccountRepository;
use crate::repositories::errors::account_repository_errors::AccountRepositoryError;
use crate::repositories::errors::transaction_repository_errors::TransactionRepositoryError;
use crate::repositories::transaction_repository::TransactionRepository;
use crate::services::errors::escrow_service_errors::EscrowServiceError;

/// Blocks, releases and settles stake funds. Every balance change is a single
/// conditional write (or one transaction) in the account store.
#[derive(Clone)]
pub struct EscrowLedger {
    accounts: Arc<dyn AccountRepository + Send + Sync>,
    transactions: Arc<dyn TransactionRepository + Send + Sync>,
    deposit_tax_rate: Decimal,
}

impl EscrowLedger {
    pub fn new(
        accounts: Arc<dyn AccountRepository + Send + Sync>,
        transactions: Arc<dyn TransactionRepository + Send + Sync>,
        deposit_tax_rate: Decimal,
    ) -> Self {
        EscrowLedger {
            accounts,
            transactions,
            deposit_tax_rate,
        }
    }

    fn account_error(user_id: &str, err: AccountRepositoryError) -> EscrowServiceError {
        match err {
            AccountRepositoryError::NotFound => {
                EscrowServiceError::AccountNotFound(user_id.to_string())
            }
            AccountRepositoryError::InsufficientFunds => {
                EscrowServiceError::InsufficientFunds(user_id.to_string())
            }
            other => EscrowServiceError::AccountError(other),
        }
    }

    pub async fn account(&self, user_id: &str) -> Result<Account, EscrowServiceError> {
        self.accounts
            .get_account(user_id)
            .await
            .map_err(|e| Self::account_error(user_id, e))
    }

    pub async fn block(&self, user_id: &str, amount: Decimal) -> Result<(), EscrowServiceError> {
        if amount < Decimal::ZERO {
            return Err(EscrowServiceError::ValidationError(format!(
                "Cannot block a negative amount: {}",
                amount
            )));
        }
        self.accounts
            .block_funds(user_id, amount)
            .await
            .map_err(|e| Self::account_error(user_id, e))?;
        info!("Blocked {} for user {}", amount, user_id);
        Ok(())
    }

    /// Returns the amount actually released, which is less than `amount` when the
    /// blocked balance was already lower.
    pub async fn release(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<Decimal, EscrowServiceError> {
        let released = self
            .accounts
            .release_funds(user_id, amount)
            .await
            .map_err(|e| Self::account_error(user_id, e))?;
        if released < amount {
            warn!(
                "Released {} of {} requested for user {}",
                released, amount, user_id
            );
        } else {
            info!("Released {} for user {}", released, user_id);
        }
        Ok(released)
    }

    pub async fn settle(
        &self,
        user_id: &str,
        hold: Decimal,
        delta: Decimal,
        is_credit: bool,
    ) -> Result<(), EscrowServiceError> {
        self.settle_match(
            &[SettlementInstruction {
                user_id: user_id.to_string(),
                hold,
                delta,
                is_credit,
                stake_transaction_id: None,
            }],
            TransactionStatus::Successful,
        )
        .await
        .map(|_| ())
    }

    /// Applies every instruction in one atomic unit and closes their stake transactions
    /// with `stake_status`. Returns false when the stakes had already been settled, in
    /// which case nothing changed.
    pub async fn settle_match(
        &self,
        instructions: &[SettlementInstruction],
        stake_status: TransactionStatus,
    ) -> Result<bool, EscrowServiceError> {
        if let Some(bad) = instructions
            .iter()
            .find(|i| i.hold < Decimal::ZERO || i.delta < Decimal::ZERO)
        {
            return Err(EscrowServiceError::ValidationError(format!(
                "Settlement amounts for {} must be non-negative",
                bad.user_id
            )));
        }
        match self.accounts.settle(instructions, stake_status).await {
            Ok(()) => {}
            Err(AccountRepositoryError::AlreadySettled(transaction_id)) => {
                info!("Stake {} was already settled, skipping", transaction_id);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }
        for instruction in instructions {
            info!(
                "Settled user {}: released {}, balance change {}",
                instruction.user_id,
                instruction.hold,
                instruction.signed_delta()
            );
        }
        Ok(true)
    }

    /// Returns a stake hold to the user and closes its transaction with `status`.
    /// A hold that was already closed is left alone.
    pub async fn refund_stake(
        &self,
        user_id: &str,
        amount: Decimal,
        transaction_id: Option<&str>,
        status: TransactionStatus,
    ) -> Result<bool, EscrowServiceError> {
        self.settle_match(
            &[SettlementInstruction::release_only(user_id, amount, transaction_id)],
            status,
        )
        .await
    }

    /// Credits a deposit, splitting off the reward share. Balance, reward balance,
    /// transaction record and reward record are committed together.
    pub async fn deposit(
        &self,
        user_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<TransactionRecord, EscrowServiceError> {
        if amount <= Decimal::ZERO {
            return Err(EscrowServiceError::ValidationError(format!(
                "Deposit amount must be positive, got {}",
                amount
            )));
        }
        let account = self.account(user_id).await?;
        let split = DepositSplit::compute(amount, self.deposit_tax_rate);
        let reward = RewardRecord::deposit_reward(user_id, split.reward, currency);
        let transaction = TransactionRecord {
            transaction_id: new_transaction_id(),
            user_id: user_id.to_string(),
            account_id: account.account_id,
            transaction_type: TransactionType::AddMoney,
            topup_amount: amount,
            transaction_amount: split.actual,
            currency: currency.to_string(),
            transaction_status: TransactionStatus::Successful,
            game_id: None,
            transaction_reward: split.reward,
            reward_id: Some(reward.reward_id.clone()),
            is_active: false,
            transaction_date: Utc::now(),
        };

        self.accounts
            .apply_deposit(user_id, &split, &transaction, &reward)
            .await
            .map_err(|e| Self::account_error(user_id, e))?;
        info!(
            "Deposited {} for user {}: {} to balance, {} to rewards",
            amount, user_id, split.actual, split.reward
        );
        Ok(transaction)
    }

    /// Makes sure `amount` is held for the user's next match and returns the open
    /// GAME_STAKE transaction backing it. An existing hold of the same amount is
    /// reused; one of a different amount is refunded first.
    pub async fn hold_stake(
        &self,
        user_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<TransactionRecord, EscrowServiceError> {
        if let Some(open) = self.transactions.find_open_stake_hold(user_id).await? {
            if open.transaction_amount == amount {
                info!(
                    "Reusing stake hold {} for user {}",
                    open.transaction_id, user_id
                );
                return Ok(open);
            }
            self.refund_stake(
                user_id,
                open.transaction_amount,
                Some(&open.transaction_id),
                TransactionStatus::Refunded,
            )
            .await?;
        }

        let account = self.account(user_id).await?;
        self.block(user_id, amount).await?;

        let transaction =
            TransactionRecord::game_stake(user_id, &account.account_id, amount, currency);
        if let Err(e) = self.transactions.create_transaction(&transaction).await {
            // Without a transaction record nothing would ever release this block.
            self.release(user_id, amount).await?;
            return Err(e.into());
        }
        Ok(transaction)
    }

    /// Moves a stake transaction to `status`. A missing record is logged and skipped.
    pub async fn mark_stake_hold(
        &self,
        transaction_id: Option<&str>,
        status: TransactionStatus,
        game_id: Option<&str>,
    ) -> Result<(), EscrowServiceError> {
        let Some(transaction_id) = transaction_id else {
            return Ok(());
        };
        match self
            .transactions
            .update_status(transaction_id, status, game_id.map(str::to_string))
            .await
        {
            Ok(()) => Ok(()),
            Err(TransactionRepositoryError::NotFound(_)) => {
                warn!("Stake transaction {} not found", transaction_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

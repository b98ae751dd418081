use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use super::InMemoryStore;
use crate::models::account::{Account, DepositSplit, SettlementInstruction};
use crate::models::reward::RewardRecord;
use crate::models::transaction::{TransactionRecord, TransactionStatus};
use crate::repositories::account_repository::AccountRepository;
use crate::repositories::errors::account_repository_errors::AccountRepositoryError;

fn refresh_available(account: &mut Account) {
    account.available_amount = account.account_balance - account.blocked_amount;
    account.updated_at = Utc::now();
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn create_account(&self, account: &Account) -> Result<(), AccountRepositoryError> {
        let mut state = self.lock().await;
        if state.accounts.contains_key(&account.user_id) {
            return Err(AccountRepositoryError::AlreadyExists);
        }
        state
            .accounts
            .insert(account.user_id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, user_id: &str) -> Result<Account, AccountRepositoryError> {
        self.lock()
            .await
            .accounts
            .get(user_id)
            .cloned()
            .ok_or(AccountRepositoryError::NotFound)
    }

    async fn block_funds(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<(), AccountRepositoryError> {
        let mut state = self.lock().await;
        let account = state
            .accounts
            .get_mut(user_id)
            .ok_or(AccountRepositoryError::NotFound)?;
        if !account.is_active || account.available() < amount {
            return Err(AccountRepositoryError::InsufficientFunds);
        }
        account.blocked_amount += amount;
        refresh_available(account);
        Ok(())
    }

    async fn release_funds(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<Decimal, AccountRepositoryError> {
        let mut state = self.lock().await;
        let account = state
            .accounts
            .get_mut(user_id)
            .ok_or(AccountRepositoryError::NotFound)?;
        let released = amount.min(account.blocked_amount).max(Decimal::ZERO);
        account.blocked_amount -= released;
        refresh_available(account);
        Ok(released)
    }

    async fn settle(
        &self,
        instructions: &[SettlementInstruction],
        stake_status: TransactionStatus,
    ) -> Result<(), AccountRepositoryError> {
        if self.settlement_is_unavailable() {
            return Err(AccountRepositoryError::DynamoDb(
                "settlement store unavailable".to_string(),
            ));
        }
        let mut state = self.lock().await;

        // Check every instruction before touching any account.
        for instruction in instructions {
            if let Some(transaction_id) = &instruction.stake_transaction_id {
                let open = state
                    .transactions
                    .get(transaction_id)
                    .is_some_and(|t| t.transaction_status == TransactionStatus::InProgress);
                if !open {
                    return Err(AccountRepositoryError::AlreadySettled(transaction_id.clone()));
                }
            }
            let account = state
                .accounts
                .get(&instruction.user_id)
                .ok_or(AccountRepositoryError::NotFound)?;
            if account.blocked_amount < instruction.hold {
                return Err(AccountRepositoryError::Conflict(format!(
                    "{} has {} blocked, settlement releases {}",
                    instruction.user_id, account.blocked_amount, instruction.hold
                )));
            }
            if !instruction.is_credit && account.account_balance < instruction.delta {
                return Err(AccountRepositoryError::Conflict(format!(
                    "{} cannot cover a debit of {}",
                    instruction.user_id, instruction.delta
                )));
            }
        }

        for instruction in instructions {
            if let Some(account) = state.accounts.get_mut(&instruction.user_id) {
                account.account_balance += instruction.signed_delta();
                account.blocked_amount -= instruction.hold;
                refresh_available(account);
            }
            if let Some(transaction) = instruction
                .stake_transaction_id
                .as_ref()
                .and_then(|id| state.transactions.get_mut(id))
            {
                transaction.transaction_status = stake_status;
                transaction.is_active = false;
            }
        }
        Ok(())
    }

    async fn apply_deposit(
        &self,
        user_id: &str,
        split: &DepositSplit,
        transaction: &TransactionRecord,
        reward: &RewardRecord,
    ) -> Result<(), AccountRepositoryError> {
        let mut state = self.lock().await;
        let account = state
            .accounts
            .get_mut(user_id)
            .filter(|account| account.is_active)
            .ok_or(AccountRepositoryError::NotFound)?;
        account.account_balance += split.actual;
        account.reward_amount_balance += split.reward;
        refresh_available(account);

        state
            .transactions
            .insert(transaction.transaction_id.clone(), transaction.clone());
        state
            .rewards
            .insert(reward.reward_id.clone(), reward.clone());
        Ok(())
    }
}

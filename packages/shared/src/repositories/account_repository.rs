use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{
    AttributeValue, Put, ReturnValuesOnConditionCheckFailure, TransactWriteItem, Update,
};
use aws_sdk_dynamodb::Client;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_attribute_value, to_item};
use tracing::{debug, warn};

use crate::backoff::BackoffPolicy;
use crate::models::account::{Account, DepositSplit, SettlementInstruction};
use crate::models::reward::RewardRecord;
use crate::models::transaction::{TransactionRecord, TransactionStatus};
use crate::repositories::errors::account_repository_errors::AccountRepositoryError;

#[cfg(test)]
use mockall::automock;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait AccountRepository: Send + Sync {
    async fn create_account(&self, account: &Account) -> Result<(), AccountRepositoryError>;

    async fn get_account(&self, user_id: &str) -> Result<Account, AccountRepositoryError>;

    /// Moves `amount` from available to blocked in one conditional write.
    /// Fails with `InsufficientFunds` and changes nothing when available is short.
    async fn block_funds(&self, user_id: &str, amount: Decimal)
        -> Result<(), AccountRepositoryError>;

    /// Returns up to `amount` of blocked funds to available, never taking blocked below zero.
    /// Yields the amount actually released.
    async fn release_funds(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<Decimal, AccountRepositoryError>;

    /// Applies every instruction or none of them. Each instruction's stake transaction moves
    /// from IN_PROGRESS to `stake_status` in the same unit; `AlreadySettled` when one of them
    /// has already left IN_PROGRESS.
    async fn settle(
        &self,
        instructions: &[SettlementInstruction],
        stake_status: TransactionStatus,
    ) -> Result<(), AccountRepositoryError>;

    /// Credits a deposit and writes its transaction and reward records in one atomic unit.
    async fn apply_deposit(
        &self,
        user_id: &str,
        split: &DepositSplit,
        transaction: &TransactionRecord,
        reward: &RewardRecord,
    ) -> Result<(), AccountRepositoryError>;
}

pub struct DynamoDbAccountRepository {
    pub client: Client,
    pub table_name: String,
    pub transactions_table: String,
    pub rewards_table: String,
    pub backoff: BackoffPolicy,
}

impl DynamoDbAccountRepository {
    pub fn new(
        client: Client,
        table_name: &str,
        transactions_table: &str,
        rewards_table: &str,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
            transactions_table: transactions_table.to_string(),
            rewards_table: rewards_table.to_string(),
            backoff,
        }
    }

    async fn try_release(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<Decimal, AccountRepositoryError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .update_expression(
                "SET blocked_amount = blocked_amount - :amount, \
                 available_amount = available_amount + :amount, updated_at = :now",
            )
            .condition_expression("attribute_exists(user_id) AND blocked_amount >= :amount")
            .expression_attribute_values(":amount", number(amount))
            .expression_attribute_values(":now", now_value()?)
            .return_values_on_condition_check_failure(ReturnValuesOnConditionCheckFailure::AllOld)
            .send()
            .await;

        let observed = match result {
            Ok(_) => return Ok(amount),
            Err(e) => account_on_condition_failure(e)?,
        };

        if observed.blocked_amount <= Decimal::ZERO {
            warn!(
                "Release of {} for {} found nothing blocked",
                amount, user_id
            );
            return Ok(Decimal::ZERO);
        }

        // Less is blocked than requested: clear what is there, guarded on the value just read.
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .update_expression(
                "SET blocked_amount = :zero, available_amount = account_balance, updated_at = :now",
            )
            .condition_expression("blocked_amount = :observed")
            .expression_attribute_values(":zero", number(Decimal::ZERO))
            .expression_attribute_values(":observed", number(observed.blocked_amount))
            .expression_attribute_values(":now", now_value()?)
            .send()
            .await;

        match result {
            Ok(_) => {
                warn!(
                    "Release of {} for {} clamped to {}",
                    amount, user_id, observed.blocked_amount
                );
                Ok(observed.blocked_amount)
            }
            Err(SdkError::ServiceError(e)) if e.err().is_conditional_check_failed_exception() => {
                Err(AccountRepositoryError::Conflict(format!(
                    "blocked amount for {} changed during release",
                    user_id
                )))
            }
            Err(e) => Err(AccountRepositoryError::DynamoDb(e.to_string())),
        }
    }

    fn settle_item(
        &self,
        instruction: &SettlementInstruction,
    ) -> Result<TransactWriteItem, AccountRepositoryError> {
        let update = settle_update(&self.table_name, instruction)?;
        Ok(TransactWriteItem::builder().update(update).build())
    }

    fn close_stake_item(
        &self,
        transaction_id: &str,
        stake_status: TransactionStatus,
    ) -> Result<TransactWriteItem, AccountRepositoryError> {
        let update = Update::builder()
            .table_name(&self.transactions_table)
            .key("transaction_id", AttributeValue::S(transaction_id.to_string()))
            .update_expression("SET transaction_status = :final, is_active = :inactive")
            .condition_expression("transaction_status = :in_progress")
            .expression_attribute_values(":final", status_value(stake_status)?)
            .expression_attribute_values(":in_progress", status_value(TransactionStatus::InProgress)?)
            .expression_attribute_values(":inactive", AttributeValue::Bool(false))
            .build()
            .map_err(|e| AccountRepositoryError::Serialization(e.to_string()))?;
        Ok(TransactWriteItem::builder().update(update).build())
    }
}

fn status_value(status: TransactionStatus) -> Result<AttributeValue, AccountRepositoryError> {
    to_attribute_value(status).map_err(|e| AccountRepositoryError::Serialization(e.to_string()))
}

/// Decimal as an exact DynamoDB number.
fn number(value: Decimal) -> AttributeValue {
    AttributeValue::N(value.normalize().to_string())
}

fn now_value() -> Result<AttributeValue, AccountRepositoryError> {
    to_attribute_value(Utc::now()).map_err(|e| AccountRepositoryError::Serialization(e.to_string()))
}

fn account_on_condition_failure(
    error: SdkError<UpdateItemError>,
) -> Result<Account, AccountRepositoryError> {
    match error {
        SdkError::ServiceError(service_err) => match service_err.into_err() {
            UpdateItemError::ConditionalCheckFailedException(ex) => match ex.item().cloned() {
                Some(item) => from_item(item)
                    .map_err(|e| AccountRepositoryError::Serialization(e.to_string())),
                None => Err(AccountRepositoryError::NotFound),
            },
            other => Err(AccountRepositoryError::DynamoDb(other.to_string())),
        },
        other => Err(AccountRepositoryError::DynamoDb(other.to_string())),
    }
}

pub(crate) fn settle_update(
    table_name: &str,
    instruction: &SettlementInstruction,
) -> Result<Update, AccountRepositoryError> {
    let delta = instruction.signed_delta();
    let mut condition = "attribute_exists(user_id) AND blocked_amount >= :hold".to_string();
    let mut builder = Update::builder()
        .table_name(table_name)
        .key("user_id", AttributeValue::S(instruction.user_id.clone()))
        .update_expression(
            "SET account_balance = account_balance + :delta, \
             blocked_amount = blocked_amount - :hold, \
             available_amount = available_amount + :freed, updated_at = :now",
        )
        .expression_attribute_values(":delta", number(delta))
        .expression_attribute_values(":hold", number(instruction.hold))
        .expression_attribute_values(":freed", number(delta + instruction.hold))
        .expression_attribute_values(":now", now_value()?);
    if !instruction.is_credit && instruction.delta > Decimal::ZERO {
        condition.push_str(" AND account_balance >= :debit");
        builder = builder.expression_attribute_values(":debit", number(instruction.delta));
    }
    builder
        .condition_expression(condition)
        .build()
        .map_err(|e| AccountRepositoryError::Serialization(e.to_string()))
}

#[async_trait]
impl AccountRepository for DynamoDbAccountRepository {
    async fn create_account(&self, account: &Account) -> Result<(), AccountRepositoryError> {
        let item =
            to_item(account).map_err(|e| AccountRepositoryError::Serialization(e.to_string()))?;
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(user_id)")
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().is_conditional_check_failed_exception() => {
                Err(AccountRepositoryError::AlreadyExists)
            }
            Err(e) => Err(AccountRepositoryError::DynamoDb(e.to_string())),
        }
    }

    async fn get_account(&self, user_id: &str) -> Result<Account, AccountRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| AccountRepositoryError::DynamoDb(e.to_string()))?;
        match output.item {
            Some(item) => {
                from_item(item).map_err(|e| AccountRepositoryError::Serialization(e.to_string()))
            }
            None => Err(AccountRepositoryError::NotFound),
        }
    }

    async fn block_funds(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<(), AccountRepositoryError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .update_expression(
                "SET blocked_amount = blocked_amount + :amount, \
                 available_amount = available_amount - :amount, updated_at = :now",
            )
            .condition_expression(
                "attribute_exists(user_id) AND is_active = :active AND available_amount >= :amount",
            )
            .expression_attribute_values(":amount", number(amount))
            .expression_attribute_values(":active", AttributeValue::Bool(true))
            .expression_attribute_values(":now", now_value()?)
            .return_values_on_condition_check_failure(ReturnValuesOnConditionCheckFailure::AllOld)
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!("Blocked {} for {}", amount, user_id);
                Ok(())
            }
            Err(e) => {
                let account = account_on_condition_failure(e)?;
                debug!(
                    "Block of {} for {} refused, available {}",
                    amount, user_id, account.available_amount
                );
                Err(AccountRepositoryError::InsufficientFunds)
            }
        }
    }

    async fn release_funds(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<Decimal, AccountRepositoryError> {
        if amount <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        self.backoff
            .retry(
                move || self.try_release(user_id, amount),
                |e| matches!(e, AccountRepositoryError::Conflict(_)),
            )
            .await
    }

    async fn settle(
        &self,
        instructions: &[SettlementInstruction],
        stake_status: TransactionStatus,
    ) -> Result<(), AccountRepositoryError> {
        if instructions.is_empty() {
            return Ok(());
        }
        let mut items = instructions
            .iter()
            .map(|instruction| self.settle_item(instruction))
            .collect::<Result<Vec<_>, _>>()?;
        let account_items = items.len();
        let stake_ids: Vec<&str> = instructions
            .iter()
            .filter_map(|instruction| instruction.stake_transaction_id.as_deref())
            .collect();
        for transaction_id in &stake_ids {
            items.push(self.close_stake_item(transaction_id, stake_status)?);
        }

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) => match e.into_err() {
                TransactWriteItemsError::TransactionCanceledException(ex) => {
                    // Reasons are positional: account updates first, then stake transactions.
                    let closed = ex
                        .cancellation_reasons()
                        .iter()
                        .enumerate()
                        .skip(account_items)
                        .find(|(_, reason)| reason.code() == Some("ConditionalCheckFailed"))
                        .and_then(|(index, _)| stake_ids.get(index - account_items));
                    match closed {
                        Some(transaction_id) => Err(AccountRepositoryError::AlreadySettled(
                            transaction_id.to_string(),
                        )),
                        None => Err(AccountRepositoryError::Conflict(ex.to_string())),
                    }
                }
                other => Err(AccountRepositoryError::DynamoDb(other.to_string())),
            },
            Err(e) => Err(AccountRepositoryError::DynamoDb(e.to_string())),
        }
    }

    async fn apply_deposit(
        &self,
        user_id: &str,
        split: &DepositSplit,
        transaction: &TransactionRecord,
        reward: &RewardRecord,
    ) -> Result<(), AccountRepositoryError> {
        let account_update = Update::builder()
            .table_name(&self.table_name)
            .key("user_id", AttributeValue::S(user_id.to_string()))
            .update_expression(
                "SET account_balance = account_balance + :actual, \
                 available_amount = available_amount + :actual, \
                 reward_amount_balance = reward_amount_balance + :reward, updated_at = :now",
            )
            .condition_expression("attribute_exists(user_id) AND is_active = :active")
            .expression_attribute_values(":actual", number(split.actual))
            .expression_attribute_values(":reward", number(split.reward))
            .expression_attribute_values(":active", AttributeValue::Bool(true))
            .expression_attribute_values(":now", now_value()?)
            .build()
            .map_err(|e| AccountRepositoryError::Serialization(e.to_string()))?;

        let transaction_put = Put::builder()
            .table_name(&self.transactions_table)
            .set_item(Some(
                to_item(transaction)
                    .map_err(|e| AccountRepositoryError::Serialization(e.to_string()))?,
            ))
            .condition_expression("attribute_not_exists(transaction_id)")
            .build()
            .map_err(|e| AccountRepositoryError::Serialization(e.to_string()))?;

        let reward_put = Put::builder()
            .table_name(&self.rewards_table)
            .set_item(Some(
                to_item(reward).map_err(|e| AccountRepositoryError::Serialization(e.to_string()))?,
            ))
            .condition_expression("attribute_not_exists(reward_id)")
            .build()
            .map_err(|e| AccountRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().update(account_update).build())
            .transact_items(TransactWriteItem::builder().put(transaction_put).build())
            .transact_items(TransactWriteItem::builder().put(reward_put).build())
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().is_transaction_canceled_exception() => {
                // The only guarded item that can plausibly fail is the account itself.
                Err(AccountRepositoryError::NotFound)
            }
            Err(e) => Err(AccountRepositoryError::DynamoDb(e.to_string())),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_settle_update_for_loser() {
        let instruction = SettlementInstruction {
            user_id: "bob".to_string(),
            hold: dec!(100),
            delta: dec!(100),
            is_credit: false,
            stake_transaction_id: None,
        };

        let update = settle_update("accounts", &instruction).unwrap();
        let values = update.expression_attribute_values().unwrap();

        assert_eq!(values.get(":delta"), Some(&AttributeValue::N("-100".to_string())));
        assert_eq!(values.get(":hold"), Some(&AttributeValue::N("100".to_string())));
        assert_eq!(values.get(":freed"), Some(&AttributeValue::N("0".to_string())));
        assert!(update
            .condition_expression()
            .unwrap()
            .contains("account_balance >= :debit"));
    }

    #[test]
    fn test_settle_update_for_winner() {
        let instruction = SettlementInstruction {
            user_id: "alice".to_string(),
            hold: dec!(100),
            delta: dec!(95.50),
            is_credit: true,
            stake_transaction_id: None,
        };

        let update = settle_update("accounts", &instruction).unwrap();
        let values = update.expression_attribute_values().unwrap();

        assert_eq!(values.get(":delta"), Some(&AttributeValue::N("95.5".to_string())));
        assert_eq!(values.get(":freed"), Some(&AttributeValue::N("195.5".to_string())));
        assert!(!values.contains_key(":debit"));
    }

    #[tokio::test]
    async fn test_mock_account_repository() {
        let mut mock = MockAccountRepository::new();
        mock.expect_block_funds()
            .returning(|_, _| Box::pin(async { Err(AccountRepositoryError::InsufficientFunds) }));

        let repository: &dyn AccountRepository = &mock;
        assert_eq!(
            repository.block_funds("alice", dec!(10)).await,
            Err(AccountRepositoryError::InsufficientFunds)
        );
    }
}

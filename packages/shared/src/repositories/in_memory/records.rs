use async_trait::async_trait;

use super::InMemoryStore;
use crate::models::game_record::{GameRecord, GameRecordUpdate};
use crate::models::transaction::{TransactionRecord, TransactionStatus};
use crate::repositories::errors::game_record_repository_errors::GameRecordRepositoryError;
use crate::repositories::errors::transaction_repository_errors::TransactionRepositoryError;
use crate::repositories::game_record_repository::GameRecordRepository;
use crate::repositories::transaction_repository::TransactionRepository;

#[async_trait]
impl GameRecordRepository for InMemoryStore {
    async fn create_if_absent(
        &self,
        record: &GameRecord,
    ) -> Result<GameRecord, GameRecordRepositoryError> {
        let mut state = self.lock().await;
        Ok(state
            .game_records
            .entry(record.game_id.clone())
            .or_insert_with(|| record.clone())
            .clone())
    }

    async fn get_game(
        &self,
        game_id: &str,
    ) -> Result<Option<GameRecord>, GameRecordRepositoryError> {
        Ok(self.lock().await.game_records.get(game_id).cloned())
    }

    async fn put_game(&self, record: &GameRecord) -> Result<(), GameRecordRepositoryError> {
        self.lock()
            .await
            .game_records
            .insert(record.game_id.clone(), record.clone());
        Ok(())
    }

    async fn update_by_game_id(
        &self,
        game_id: &str,
        update: GameRecordUpdate,
    ) -> Result<(), GameRecordRepositoryError> {
        let mut state = self.lock().await;
        let record = state
            .game_records
            .get_mut(game_id)
            .ok_or_else(|| GameRecordRepositoryError::NotFound(game_id.to_string()))?;
        update.apply(record);
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn create_transaction(
        &self,
        transaction: &TransactionRecord,
    ) -> Result<(), TransactionRepositoryError> {
        self.lock()
            .await
            .transactions
            .insert(transaction.transaction_id.clone(), transaction.clone());
        Ok(())
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, TransactionRepositoryError> {
        Ok(self.lock().await.transactions.get(transaction_id).cloned())
    }

    async fn update_status(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
        game_id: Option<String>,
    ) -> Result<(), TransactionRepositoryError> {
        let mut state = self.lock().await;
        let transaction = state
            .transactions
            .get_mut(transaction_id)
            .ok_or_else(|| TransactionRepositoryError::NotFound(transaction_id.to_string()))?;
        transaction.transaction_status = status;
        transaction.is_active = status == TransactionStatus::InProgress;
        if game_id.is_some() {
            transaction.game_id = game_id;
        }
        Ok(())
    }

    async fn find_open_stake_hold(
        &self,
        user_id: &str,
    ) -> Result<Option<TransactionRecord>, TransactionRepositoryError> {
        Ok(self
            .lock()
            .await
            .transactions
            .values()
            .find(|t| t.user_id == user_id && t.is_open_stake_hold())
            .cloned())
    }
}

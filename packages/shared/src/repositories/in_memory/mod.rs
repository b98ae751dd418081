//! Single-process implementations of every store trait, sharing one lock so that
//! multi-entity writes are as atomic as their DynamoDB counterparts. Used by tests
//! and by `STORE_BACKEND=memory`.

mod accounts;
mod notifier;
mod queue;
mod records;
mod rooms;

pub use notifier::InMemoryNotifier;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, MutexGuard};

use crate::models::account::Account;
use crate::models::game_record::GameRecord;
use crate::models::queue::QueueEntry;
use crate::models::reward::RewardRecord;
use crate::models::room::Room;
use crate::models::transaction::TransactionRecord;
use crate::repositories::room_repository::RoomConnection;

#[derive(Default)]
pub(crate) struct State {
    pub accounts: HashMap<String, Account>,
    pub transactions: HashMap<String, TransactionRecord>,
    pub rewards: HashMap<String, RewardRecord>,
    pub game_records: HashMap<String, GameRecord>,
    pub rooms: HashMap<String, Room>,
    pub room_connections: HashMap<String, RoomConnection>,
    pub queues: HashMap<String, Vec<QueueEntry>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    queue_unavailable: AtomicBool,
    settlement_unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().await
    }

    /// Makes queue operations fail as if the shared store were unreachable.
    pub fn set_queue_unavailable(&self, unavailable: bool) {
        self.queue_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn queue_is_unavailable(&self) -> bool {
        self.queue_unavailable.load(Ordering::SeqCst)
    }

    /// Makes match settlement fail as if the account store were unreachable.
    pub fn set_settlement_unavailable(&self, unavailable: bool) {
        self.settlement_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn settlement_is_unavailable(&self) -> bool {
        self.settlement_unavailable.load(Ordering::SeqCst)
    }

    pub async fn queued_entries(&self, queue_key: &str) -> Vec<QueueEntry> {
        self.lock()
            .await
            .queues
            .get(queue_key)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn room_count(&self) -> usize {
        self.lock().await.rooms.len()
    }

    pub async fn room_connection(&self, connection_id: &str) -> Option<RoomConnection> {
        self.lock().await.room_connections.get(connection_id).cloned()
    }

    pub async fn transactions_for(&self, user_id: &str) -> Vec<TransactionRecord> {
        let mut transactions: Vec<TransactionRecord> = self
            .lock()
            .await
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        transactions.sort_by_key(|t| t.transaction_date);
        transactions
    }

    pub async fn rewards_for(&self, user_id: &str) -> Vec<RewardRecord> {
        self.lock()
            .await
            .rewards
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use shared::models::account::Account;
use shared::models::candidate::PlayerCandidate;
use shared::models::queue::MatchCriteria;
use shared::models::room::Room;
use shared::repositories::account_repository::AccountRepository;
use shared::repositories::in_memory::{InMemoryNotifier, InMemoryStore};
use shared::services::escrow_service::EscrowLedger;
use shared::services::game_session_service::GameSessionService;
use shared::services::matchmaking_service::{MatchRequest, MatchResult, MatchmakingCoordinator};
use shared::services::rating_service::RatingSettlement;
use shared::services::reconnection_supervisor::ReconnectionSupervisor;
use shared::services::websocket_service::WebSocketService;

pub const GRACE: Duration = Duration::from_secs(30);

/// Every service wired onto one set of in-memory stores.
pub struct Platform {
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<InMemoryNotifier>,
    pub escrow: EscrowLedger,
    pub coordinator: MatchmakingCoordinator,
}

impl Platform {
    pub fn new(deposit_tax_rate: Decimal) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(InMemoryNotifier::new());
        let escrow = EscrowLedger::new(store.clone(), store.clone(), deposit_tax_rate);
        let sessions = GameSessionService::new(
            store.clone(),
            store.clone(),
            escrow.clone(),
            RatingSettlement::default(),
            WebSocketService::new(notifier.clone()),
            Arc::new(ReconnectionSupervisor::new(GRACE)),
        );
        let coordinator = MatchmakingCoordinator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            escrow.clone(),
            sessions,
            MatchCriteria::default(),
            "INR",
        );
        Platform {
            store,
            notifier,
            escrow,
            coordinator,
        }
    }

    pub fn sessions(&self) -> &GameSessionService {
        self.coordinator.sessions()
    }

    pub async fn open_account(&self, user_id: &str, balance: Decimal) {
        self.store
            .create_account(&Account::new(user_id, balance, "INR"))
            .await
            .unwrap();
    }

    pub async fn account(&self, user_id: &str) -> Account {
        self.store.get_account(user_id).await.unwrap()
    }

    /// Queues `first` then pairs `second` with them and returns the live room.
    pub async fn start_match(&self, first: MatchRequest, second: MatchRequest) -> Room {
        match self.coordinator.request_match(first).await.unwrap() {
            MatchResult::Queued(_) => {}
            other => panic!("first player should wait, got {:?}", other),
        }
        match self.coordinator.request_match(second).await.unwrap() {
            MatchResult::Matched(room) => room,
            other => panic!("second player should be paired, got {:?}", other),
        }
    }
}

pub fn candidate(user_id: &str, rating: i32) -> PlayerCandidate {
    PlayerCandidate {
        user_id: user_id.to_string(),
        rating,
        games_played: 50,
        win_percentage: 0.5,
        last_ten_results: vec![],
        games_as_white: 25,
        games_as_black: 25,
        game_type: "rapid".to_string(),
    }
}

pub fn connection(user_id: &str) -> String {
    format!("conn-{}", user_id)
}

pub fn find_match(user_id: &str, rating: i32, stake: Decimal) -> MatchRequest {
    MatchRequest {
        connection_id: connection(user_id),
        username: user_id.to_string(),
        candidate: candidate(user_id, rating),
        stake_amount: stake,
        allow_extended_search: false,
    }
}

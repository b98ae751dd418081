use std::sync::Arc;

use tracing::{info, warn};

use shared::config::{AppConfig, ConfigError, StoreBackend};
use shared::repositories::account_repository::{AccountRepository, DynamoDbAccountRepository};
use shared::repositories::game_record_repository::{
    DynamoDbGameRecordRepository, GameRecordRepository,
};
use shared::repositories::in_memory::{InMemoryNotifier, InMemoryStore};
use shared::repositories::queue_repository::{DynamoDbMatchQueue, MatchQueue};
use shared::repositories::room_repository::{DynamoDbRoomRepository, RoomRepository};
use shared::repositories::transaction_repository::{
    DynamoDbTransactionRepository, TransactionRepository,
};
use shared::repositories::websocket_repository::{ApiGatewayNotifier, ConnectionNotifier};
use shared::services::escrow_service::EscrowLedger;
use shared::services::game_session_service::GameSessionService;
use shared::services::matchmaking_service::MatchmakingCoordinator;
use shared::services::rating_service::RatingSettlement;
use shared::services::reconnection_supervisor::ReconnectionSupervisor;
use shared::services::websocket_service::WebSocketService;

/// The storage and delivery backends the services run on.
pub struct Backends {
    pub queue: Arc<dyn MatchQueue + Send + Sync>,
    pub rooms: Arc<dyn RoomRepository + Send + Sync>,
    pub game_records: Arc<dyn GameRecordRepository + Send + Sync>,
    pub accounts: Arc<dyn AccountRepository + Send + Sync>,
    pub transactions: Arc<dyn TransactionRepository + Send + Sync>,
    pub notifier: Arc<dyn ConnectionNotifier + Send + Sync>,
}

impl Backends {
    /// Every store on one in-memory instance.
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        notifier: Arc<dyn ConnectionNotifier + Send + Sync>,
    ) -> Self {
        Backends {
            queue: store.clone(),
            rooms: store.clone(),
            game_records: store.clone(),
            accounts: store.clone(),
            transactions: store,
            notifier,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<MatchmakingCoordinator>,
    pub websocket_service: Arc<WebSocketService>,
}

impl AppState {
    pub fn new(config: &AppConfig, backends: Backends) -> Self {
        let websocket_service = WebSocketService::new(backends.notifier);
        let escrow = EscrowLedger::new(
            backends.accounts,
            backends.transactions,
            config.deposit_tax_rate,
        );
        let sessions = GameSessionService::new(
            backends.rooms.clone(),
            backends.game_records.clone(),
            escrow.clone(),
            RatingSettlement::new(config.elo_k_factor, config.platform_commission_rate),
            websocket_service.clone(),
            Arc::new(ReconnectionSupervisor::new(config.reconnect_grace)),
        )
        .with_backoff(config.backoff.clone());
        let coordinator = MatchmakingCoordinator::new(
            backends.queue,
            backends.rooms,
            backends.game_records,
            escrow,
            sessions,
            config.match_criteria.clone(),
            &config.default_currency,
        );
        AppState {
            coordinator: Arc::new(coordinator),
            websocket_service: Arc::new(websocket_service),
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let backends = match &config.store_backend {
            StoreBackend::DynamoDb(tables) => {
                let endpoint = config
                    .websocket_api_endpoint
                    .as_deref()
                    .ok_or_else(|| ConfigError::Missing("WEBSOCKET_API_ENDPOINT".to_string()))?;
                let sdk_config = aws_config::load_from_env().await;
                let client = aws_sdk_dynamodb::Client::new(&sdk_config);
                info!("Using DynamoDB stores, posting to {}", endpoint);
                Backends {
                    queue: Arc::new(DynamoDbMatchQueue::new(
                        client.clone(),
                        &tables.match_queue,
                        config.backoff.clone(),
                    )),
                    rooms: Arc::new(DynamoDbRoomRepository::new(
                        client.clone(),
                        &tables.rooms,
                        &tables.room_connections,
                    )),
                    game_records: Arc::new(DynamoDbGameRecordRepository::new(
                        client.clone(),
                        &tables.game_records,
                    )),
                    accounts: Arc::new(DynamoDbAccountRepository::new(
                        client.clone(),
                        &tables.accounts,
                        &tables.transactions,
                        &tables.rewards,
                        config.backoff.clone(),
                    )),
                    transactions: Arc::new(DynamoDbTransactionRepository::new(
                        client,
                        &tables.transactions,
                    )),
                    notifier: Arc::new(ApiGatewayNotifier::from_endpoint(
                        &sdk_config,
                        endpoint,
                        config.backoff.clone(),
                    )),
                }
            }
            StoreBackend::Memory => {
                let notifier: Arc<dyn ConnectionNotifier + Send + Sync> =
                    match config.websocket_api_endpoint.as_deref() {
                        Some(endpoint) => {
                            let sdk_config = aws_config::load_from_env().await;
                            Arc::new(ApiGatewayNotifier::from_endpoint(
                                &sdk_config,
                                endpoint,
                                config.backoff.clone(),
                            ))
                        }
                        None => {
                            warn!("No WEBSOCKET_API_ENDPOINT set, outbound messages are only recorded");
                            Arc::new(InMemoryNotifier::new())
                        }
                    };
                info!("Using in-memory stores");
                Backends::in_memory(Arc::new(InMemoryStore::new()), notifier)
            }
        };
        Ok(AppState::new(config, backends))
    }
}

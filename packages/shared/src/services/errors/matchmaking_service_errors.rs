use crate::repositories::errors::game_record_repository_errors::GameRecordRepositoryError;
use crate::repositories::errors::queue_repository_errors::QueueRepositoryError;
use crate::repositories::errors::room_repository_errors::RoomRepositoryError;
use crate::services::errors::escrow_service_errors::EscrowServiceError;
use crate::services::errors::game_session_service_errors::GameSessionServiceError;

#[derive(Debug, PartialEq)]
pub enum MatchmakingServiceError {
    ValidationError(String),
    InsufficientFunds(String),
    QueueError(QueueRepositoryError),
    RoomError(RoomRepositoryError),
    GameRecordError(GameRecordRepositoryError),
    EscrowError(EscrowServiceError),
    SessionError(GameSessionServiceError),
}

impl std::fmt::Display for MatchmakingServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchmakingServiceError::ValidationError(msg) => {
                write!(f, "Validation error: {}", msg)
            }
            MatchmakingServiceError::InsufficientFunds(user_id) => {
                write!(f, "Insufficient available balance for user {}", user_id)
            }
            MatchmakingServiceError::QueueError(err) => write!(f, "Match queue error: {}", err),
            MatchmakingServiceError::RoomError(err) => write!(f, "Room store error: {}", err),
            MatchmakingServiceError::GameRecordError(err) => {
                write!(f, "Game record error: {}", err)
            }
            MatchmakingServiceError::EscrowError(err) => write!(f, "Escrow error: {}", err),
            MatchmakingServiceError::SessionError(err) => write!(f, "Session error: {}", err),
        }
    }
}

impl std::error::Error for MatchmakingServiceError {}

impl From<EscrowServiceError> for MatchmakingServiceError {
    fn from(err: EscrowServiceError) -> Self {
        match err {
            EscrowServiceError::InsufficientFunds(user_id) => {
                MatchmakingServiceError::InsufficientFunds(user_id)
            }
            EscrowServiceError::ValidationError(msg) => MatchmakingServiceError::ValidationError(msg),
            other => MatchmakingServiceError::EscrowError(other),
        }
    }
}

impl From<QueueRepositoryError> for MatchmakingServiceError {
    fn from(err: QueueRepositoryError) -> Self {
        MatchmakingServiceError::QueueError(err)
    }
}

impl From<RoomRepositoryError> for MatchmakingServiceError {
    fn from(err: RoomRepositoryError) -> Self {
        MatchmakingServiceError::RoomError(err)
    }
}

impl From<GameRecordRepositoryError> for MatchmakingServiceError {
    fn from(err: GameRecordRepositoryError) -> Self {
        MatchmakingServiceError::GameRecordError(err)
    }
}

impl From<GameSessionServiceError> for MatchmakingServiceError {
    fn from(err: GameSessionServiceError) -> Self {
        MatchmakingServiceError::SessionError(err)
    }
}

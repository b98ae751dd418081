use crate::repositories::errors::game_record_repository_errors::GameRecordRepositoryError;
use crate::repositories::errors::notify_errors::NotifyError;
use crate::repositories::errors::room_repository_errors::RoomRepositoryError;
use crate::services::errors::escrow_service_errors::EscrowServiceError;

#[derive(Debug, PartialEq)]
pub enum GameSessionServiceError {
    /// The room is gone, usually because the match already ended.
    RoomNotFound(String),
    NotAParticipant(String),
    InvalidMove(String),
    InvalidGameOver(String),
    AlreadyConnected(String),
    RoomError(RoomRepositoryError),
    GameRecordError(GameRecordRepositoryError),
    EscrowError(EscrowServiceError),
    NotifyError(NotifyError),
}

impl GameSessionServiceError {
    /// Rejections caused by the request itself rather than by infrastructure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GameSessionServiceError::RoomNotFound(_)
                | GameSessionServiceError::NotAParticipant(_)
                | GameSessionServiceError::InvalidMove(_)
                | GameSessionServiceError::InvalidGameOver(_)
                | GameSessionServiceError::AlreadyConnected(_)
        )
    }
}

impl std::fmt::Display for GameSessionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSessionServiceError::RoomNotFound(room_id) => {
                write!(f, "Room {} not found", room_id)
            }
            GameSessionServiceError::NotAParticipant(msg) => write!(f, "Not a participant: {}", msg),
            GameSessionServiceError::InvalidMove(msg) => write!(f, "Invalid move: {}", msg),
            GameSessionServiceError::InvalidGameOver(msg) => {
                write!(f, "Invalid game over: {}", msg)
            }
            GameSessionServiceError::AlreadyConnected(user_id) => {
                write!(f, "Player {} is already connected", user_id)
            }
            GameSessionServiceError::RoomError(err) => write!(f, "Room store error: {}", err),
            GameSessionServiceError::GameRecordError(err) => {
                write!(f, "Game record error: {}", err)
            }
            GameSessionServiceError::EscrowError(err) => write!(f, "Escrow error: {}", err),
            GameSessionServiceError::NotifyError(err) => write!(f, "Notify error: {}", err),
        }
    }
}

impl std::error::Error for GameSessionServiceError {}

impl From<RoomRepositoryError> for GameSessionServiceError {
    fn from(err: RoomRepositoryError) -> Self {
        match err {
            RoomRepositoryError::NotFound(room_id) => GameSessionServiceError::RoomNotFound(room_id),
            other => GameSessionServiceError::RoomError(other),
        }
    }
}

impl From<GameRecordRepositoryError> for GameSessionServiceError {
    fn from(err: GameRecordRepositoryError) -> Self {
        GameSessionServiceError::GameRecordError(err)
    }
}

impl From<EscrowServiceError> for GameSessionServiceError {
    fn from(err: EscrowServiceError) -> Self {
        GameSessionServiceError::EscrowError(err)
    }
}

impl From<NotifyError> for GameSessionServiceError {
    fn from(err: NotifyError) -> Self {
        GameSessionServiceError::NotifyError(err)
    }
}

use shared::services::errors::game_session_service_errors::GameSessionServiceError;
use shared::services::errors::matchmaking_service_errors::MatchmakingServiceError;

pub const GENERIC_FAILURE: &str = "Something went wrong, please try again";

#[derive(Debug)]
pub enum ActionError {
    Matchmaking(MatchmakingServiceError),
    Session(GameSessionServiceError),
}

impl ActionError {
    /// Failures caused by the request itself. Everything else is infrastructure.
    pub fn is_rejection(&self) -> bool {
        match self {
            ActionError::Matchmaking(
                MatchmakingServiceError::ValidationError(_)
                | MatchmakingServiceError::InsufficientFunds(_),
            ) => true,
            ActionError::Matchmaking(MatchmakingServiceError::SessionError(e)) => e.is_rejection(),
            ActionError::Matchmaking(_) => false,
            ActionError::Session(e) => e.is_rejection(),
        }
    }

    /// What the client is told. Infrastructure detail stays in the logs.
    pub fn client_message(&self) -> String {
        match self {
            ActionError::Matchmaking(MatchmakingServiceError::InsufficientFunds(_)) => {
                "Insufficient balance to cover the stake".to_string()
            }
            ActionError::Matchmaking(MatchmakingServiceError::ValidationError(msg)) => msg.clone(),
            ActionError::Matchmaking(MatchmakingServiceError::SessionError(e))
            | ActionError::Session(e)
                if e.is_rejection() =>
            {
                e.to_string()
            }
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::Matchmaking(err) => write!(f, "{}", err),
            ActionError::Session(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<MatchmakingServiceError> for ActionError {
    fn from(err: MatchmakingServiceError) -> Self {
        ActionError::Matchmaking(err)
    }
}

impl From<GameSessionServiceError> for ActionError {
    fn from(err: GameSessionServiceError) -> Self {
        ActionError::Session(err)
    }
}

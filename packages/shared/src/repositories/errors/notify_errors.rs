#[derive(Debug, PartialEq)]
pub enum NotifyError {
    /// The client connection no longer exists.
    Gone(String),
    Serialization(String),
    Transport(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Gone(connection_id) => {
                write!(f, "Connection {} is gone", connection_id)
            }
            NotifyError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            NotifyError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

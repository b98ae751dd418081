#[derive(Debug, PartialEq)]
pub enum QueueRepositoryError {
    /// Another submission changed the queue between read and write.
    Conflict,
    /// Conflicts persisted past the configured retry attempts.
    Contention(String),
    Serialization(String),
    DynamoDb(String),
}

impl QueueRepositoryError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, QueueRepositoryError::Serialization(_))
    }
}

impl std::fmt::Display for QueueRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueRepositoryError::Conflict => write!(f, "Queue changed during submission"),
            QueueRepositoryError::Contention(queue_key) => {
                write!(f, "Queue {} is too contended, try again", queue_key)
            }
            QueueRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            QueueRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for QueueRepositoryError {}

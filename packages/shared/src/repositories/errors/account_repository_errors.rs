#[derive(Debug, PartialEq)]
pub enum AccountRepositoryError {
    NotFound,
    AlreadyExists,
    InsufficientFunds,
    /// A conditional write lost against a concurrent change to the same account.
    Conflict(String),
    /// A stake transaction in the settlement was already closed; nothing was applied.
    AlreadySettled(String),
    Serialization(String),
    DynamoDb(String),
}

impl AccountRepositoryError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AccountRepositoryError::Conflict(_) | AccountRepositoryError::DynamoDb(_)
        )
    }
}

impl std::fmt::Display for AccountRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountRepositoryError::NotFound => write!(f, "Account not found"),
            AccountRepositoryError::AlreadyExists => write!(f, "Account already exists"),
            AccountRepositoryError::InsufficientFunds => {
                write!(f, "Insufficient available balance")
            }
            AccountRepositoryError::Conflict(msg) => write!(f, "Account write conflict: {}", msg),
            AccountRepositoryError::AlreadySettled(transaction_id) => {
                write!(f, "Stake transaction {} is already closed", transaction_id)
            }
            AccountRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            AccountRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for AccountRepositoryError {}

#[derive(Debug, PartialEq)]
pub enum TransactionRepositoryError {
    NotFound(String),
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for TransactionRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionRepositoryError::NotFound(transaction_id) => {
                write!(f, "Transaction {} not found", transaction_id)
            }
            TransactionRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            TransactionRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for TransactionRepositoryError {}

use crate::repositories::errors::account_repository_errors::AccountRepositoryError;
use crate::repositories::errors::transaction_repository_errors::TransactionRepositoryError;

#[derive(Debug, PartialEq)]
pub enum EscrowServiceError {
    AccountNotFound(String),
    InsufficientFunds(String),
    ValidationError(String),
    AccountError(AccountRepositoryError),
    TransactionError(TransactionRepositoryError),
}

impl EscrowServiceError {
    /// Store failures worth another attempt. Rejections and missing accounts are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            EscrowServiceError::AccountError(e) => e.is_retryable(),
            EscrowServiceError::TransactionError(TransactionRepositoryError::DynamoDb(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for EscrowServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscrowServiceError::AccountNotFound(user_id) => {
                write!(f, "No active account for user {}", user_id)
            }
            EscrowServiceError::InsufficientFunds(user_id) => {
                write!(f, "Insufficient available balance for user {}", user_id)
            }
            EscrowServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            EscrowServiceError::AccountError(err) => write!(f, "Account error: {}", err),
            EscrowServiceError::TransactionError(err) => write!(f, "Transaction error: {}", err),
        }
    }
}

impl std::error::Error for EscrowServiceError {}

impl From<AccountRepositoryError> for EscrowServiceError {
    fn from(err: AccountRepositoryError) -> Self {
        EscrowServiceError::AccountError(err)
    }
}

impl From<TransactionRepositoryError> for EscrowServiceError {
    fn from(err: TransactionRepositoryError) -> Self {
        EscrowServiceError::TransactionError(err)
    }
}

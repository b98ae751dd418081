pub mod account_repository_errors;
pub mod game_record_repository_errors;
pub mod notify_errors;
pub mod queue_repository_errors;
pub mod room_repository_errors;
pub mod transaction_repository_errors;

pub mod account_repository;
pub mod errors;
pub mod game_record_repository;
pub mod in_memory;
pub mod queue_repository;
pub mod room_repository;
pub mod transaction_repository;
pub mod websocket_repository;

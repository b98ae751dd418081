pub mod escrow_service_errors;
pub mod game_session_service_errors;
pub mod matchmaking_service_errors;

pub mod errors;
pub mod escrow_service;
pub mod game_session_service;
pub mod matchmaking_service;
pub mod rating_service;
pub mod reconnection_supervisor;
pub mod websocket_service;

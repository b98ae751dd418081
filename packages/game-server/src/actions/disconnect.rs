use tracing::{debug, error, info};

use shared::services::matchmaking_service::DepartureOutcome;

use crate::event::WebSocketResponse;
use crate::state::AppState;

pub async fn handle_disconnect(connection_id: &str, state: &AppState) -> WebSocketResponse {
    info!("WebSocket connection disconnected: {}", connection_id);
    match state.coordinator.handle_disconnect(connection_id).await {
        Ok(DepartureOutcome::NotInRoom) => {
            debug!("Connection {} was not in a room", connection_id)
        }
        Ok(outcome) => debug!("Connection {} departed: {:?}", connection_id, outcome),
        Err(e) => error!(
            "Failed to handle disconnect of {}: {}",
            connection_id, e
        ),
    }
    WebSocketResponse::ok()
}

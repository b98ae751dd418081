use tracing::{debug, error, warn};

use shared::models::events::{GameEndReason, ServerEvent};

use crate::error::ActionError;
use crate::state::AppState;

pub async fn handle_game_over(
    connection_id: &str,
    room_id: &str,
    reason: GameEndReason,
    winner_id: Option<String>,
    loser_id: Option<String>,
    state: &AppState,
) {
    let result = state
        .coordinator
        .sessions()
        .end_game(connection_id, room_id, reason, winner_id, loser_id)
        .await;
    let e = match result {
        Ok(Some(_)) => return,
        Ok(None) => {
            debug!("Room {} had already ended", room_id);
            return;
        }
        Err(e) => ActionError::from(e),
    };

    if e.is_rejection() {
        warn!("Game over from {} in room {} rejected: {}", connection_id, room_id, e);
    } else {
        error!("Game over from {} in room {} failed: {}", connection_id, room_id, e);
    }
    state
        .websocket_service
        .send_best_effort(connection_id, &ServerEvent::error(e.client_message()))
        .await;
}

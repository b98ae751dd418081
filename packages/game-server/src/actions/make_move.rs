use tracing::{error, warn};

use shared::models::events::ServerEvent;
use shared::models::room::{Color, PlayerMove};

use crate::error::ActionError;
use crate::state::AppState;

pub async fn handle_make_move(
    connection_id: &str,
    room_id: &str,
    player_move: PlayerMove,
    color: Option<Color>,
    state: &AppState,
) {
    let result = state
        .coordinator
        .sessions()
        .make_move(connection_id, room_id, player_move, color)
        .await;
    let Err(e) = result else {
        return;
    };

    let e = ActionError::from(e);
    let reply = if e.is_rejection() {
        warn!("Move from {} in room {} rejected: {}", connection_id, room_id, e);
        ServerEvent::MoveError {
            room_id: room_id.to_string(),
            message: e.client_message(),
        }
    } else {
        error!("Move from {} in room {} failed: {}", connection_id, room_id, e);
        ServerEvent::error(e.client_message())
    };
    state
        .websocket_service
        .send_best_effort(connection_id, &reply)
        .await;
}

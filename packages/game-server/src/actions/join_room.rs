use tracing::{error, info, warn};

use shared::models::events::ServerEvent;

use crate::error::ActionError;
use crate::state::AppState;

/// Reattaches a returning player. The room state itself arrives as `gameResume`.
pub async fn handle_join_room(connection_id: &str, room_id: &str, user_id: &str, state: &AppState) {
    let reply = match state
        .coordinator
        .sessions()
        .join_room(connection_id, room_id, user_id)
        .await
    {
        Ok(_) => {
            info!("User {} rejoined room {}", user_id, room_id);
            ServerEvent::JoinRoomResult {
                success: true,
                room_id: room_id.to_string(),
                message: "Rejoined the game".to_string(),
            }
        }
        Err(e) => {
            let e = ActionError::from(e);
            if e.is_rejection() {
                warn!("User {} could not rejoin room {}: {}", user_id, room_id, e);
            } else {
                error!("Rejoin of user {} to room {} failed: {}", user_id, room_id, e);
            }
            ServerEvent::JoinRoomResult {
                success: false,
                room_id: room_id.to_string(),
                message: e.client_message(),
            }
        }
    };
    state
        .websocket_service
        .send_best_effort(connection_id, &reply)
        .await;
}

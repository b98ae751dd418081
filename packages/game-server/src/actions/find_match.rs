use tracing::{debug, error, info, warn};

use shared::models::events::{FindMatchStatus, ServerEvent};
use shared::services::matchmaking_service::{MatchRequest, MatchResult};

use crate::error::ActionError;
use crate::state::AppState;

pub async fn handle_find_match(request: MatchRequest, state: &AppState) {
    let connection_id = request.connection_id.clone();
    let user_id = request.candidate.user_id.clone();

    // A new search replaces whatever the connection was doing before.
    match state.coordinator.leave_current_room(&connection_id).await {
        Ok(outcome) => debug!("Connection {} left its room: {:?}", connection_id, outcome),
        Err(e) => {
            error!("Connection {} could not leave its room: {}", connection_id, e);
            reply_failed(&connection_id, &ActionError::from(e), state).await;
            return;
        }
    }

    let reply = match state.coordinator.request_match(request).await {
        Ok(MatchResult::Matched(room)) => {
            info!("User {} matched into room {}", user_id, room.id);
            Some(ServerEvent::FindMatchResult {
                status: FindMatchStatus::Matched,
                message: "Opponent found".to_string(),
                game_record: None,
            })
        }
        Ok(MatchResult::Queued(record)) => Some(ServerEvent::FindMatchResult {
            status: FindMatchStatus::Queued,
            message: "Waiting for an opponent".to_string(),
            game_record: Some(record),
        }),
        // The player was already told through matchmakingUpdate.
        Ok(MatchResult::OpponentUnavailable(room)) => {
            info!("Opponent unavailable for user {} in room {}", user_id, room.id);
            None
        }
        Err(e) => {
            let e = ActionError::from(e);
            if e.is_rejection() {
                warn!("Match request from user {} rejected: {}", user_id, e);
            } else {
                error!("Match request from user {} failed: {}", user_id, e);
            }
            reply_failed(&connection_id, &e, state).await;
            None
        }
    };
    if let Some(reply) = reply {
        state
            .websocket_service
            .send_best_effort(&connection_id, &reply)
            .await;
    }
}

async fn reply_failed(connection_id: &str, error: &ActionError, state: &AppState) {
    let event = ServerEvent::FindMatchResult {
        status: FindMatchStatus::Failed,
        message: error.client_message(),
        game_record: None,
    };
    state
        .websocket_service
        .send_best_effort(connection_id, &event)
        .await;
}

use chrono::Utc;
use tracing::{debug, info};

use shared::models::events::{ClientEvent, ServerEvent};
use shared::services::matchmaking_service::MatchRequest;

use crate::actions::{find_match, game_over, join_room, make_move};
use crate::event::{WebSocketEvent, WebSocketResponse};
use crate::state::AppState;

pub async fn handle_default_message(event: &WebSocketEvent, state: &AppState) -> WebSocketResponse {
    let connection_id = event.request_context.connection_id.as_str();

    let Some(body) = event.body.as_deref() else {
        debug!("No body found in message from {}", connection_id);
        reply(connection_id, ServerEvent::error("No message body"), state).await;
        return WebSocketResponse::bad_request("No message body");
    };
    let message: ClientEvent = match serde_json::from_str(body) {
        Ok(message) => message,
        Err(e) => {
            info!("Unreadable message from {}: {}", connection_id, e);
            let text = format!("Invalid message: {}", e);
            reply(connection_id, ServerEvent::error(text.as_str()), state).await;
            return WebSocketResponse::bad_request(&text);
        }
    };
    debug!("Message from {}: {:?}", connection_id, message);

    match message {
        ClientEvent::FindMatch {
            username,
            preferences,
            stake_amount,
            mut candidate,
            allow_extended_search,
        } => {
            // The requested game type picks the queue.
            candidate.game_type = preferences.game_type;
            let request = MatchRequest {
                connection_id: connection_id.to_string(),
                username,
                candidate,
                stake_amount,
                allow_extended_search,
            };
            find_match::handle_find_match(request, state).await;
        }
        ClientEvent::MakeMove {
            room_id,
            player_move,
            color,
        } => {
            make_move::handle_make_move(connection_id, &room_id, player_move, color, state).await;
        }
        ClientEvent::GameOver {
            room_id,
            reason,
            winner_id,
            loser_id,
        } => {
            game_over::handle_game_over(connection_id, &room_id, reason, winner_id, loser_id, state)
                .await;
        }
        ClientEvent::JoinRoom {
            room_id, user_id, ..
        } => {
            join_room::handle_join_room(connection_id, &room_id, &user_id, state).await;
        }
        ClientEvent::Ping => {
            reply(connection_id, ServerEvent::Pong { timestamp: Utc::now() }, state).await;
        }
    }
    WebSocketResponse::ok()
}

async fn reply(connection_id: &str, event: ServerEvent, state: &AppState) {
    state
        .websocket_service
        .send_best_effort(connection_id, &event)
        .await;
}

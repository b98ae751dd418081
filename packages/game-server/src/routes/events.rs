use axum::{extract::State, routing::post, Json, Router};
use tracing::{debug, error};

use crate::actions::{connect, default, disconnect};
use crate::event::{WebSocketEvent, WebSocketResponse};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/events", post(handle_event))
}

/// Entry point for every route API Gateway forwards from the WebSocket API.
pub async fn handle_event(
    State(state): State<AppState>,
    Json(event): Json<WebSocketEvent>,
) -> Json<WebSocketResponse> {
    let route_key = event.request_context.route_key.as_str();
    let connection_id = event.request_context.connection_id.as_str();
    debug!(
        "Processing route_key: {}, connection_id: {}",
        route_key, connection_id
    );

    let response = match route_key {
        "$connect" => connect::handle_connect(&event).await,
        "$disconnect" => disconnect::handle_disconnect(connection_id, &state).await,
        "$default" => default::handle_default_message(&event, &state).await,
        other => {
            error!("Unknown route key: {}", other);
            WebSocketResponse::bad_request("Unknown route")
        }
    };
    Json(response)
}

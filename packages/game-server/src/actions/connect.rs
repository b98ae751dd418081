use tracing::info;

use crate::event::{WebSocketEvent, WebSocketResponse};

/// Connections carry no state until they send `findMatch` or `joinRoom`.
pub async fn handle_connect(event: &WebSocketEvent) -> WebSocketResponse {
    info!(
        "WebSocket connection established: {}",
        event.request_context.connection_id
    );
    WebSocketResponse::ok()
}

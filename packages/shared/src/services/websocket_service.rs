use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::events::ServerEvent;
use crate::repositories::errors::notify_errors::NotifyError;
use crate::repositories::websocket_repository::ConnectionNotifier;

#[derive(Clone)]
pub struct WebSocketService {
    notifier: Arc<dyn ConnectionNotifier + Send + Sync>,
}

impl WebSocketService {
    pub fn new(notifier: Arc<dyn ConnectionNotifier + Send + Sync>) -> Self {
        Self { notifier }
    }

    pub async fn send(&self, connection_id: &str, event: &ServerEvent) -> Result<(), NotifyError> {
        debug!("Sending message to connection: {}", connection_id);
        self.notifier.send(connection_id, event).await
    }

    /// Sends and only logs failures. For messages whose loss changes nothing
    /// on the server side.
    pub async fn send_best_effort(&self, connection_id: &str, event: &ServerEvent) {
        if let Err(e) = self.notifier.send(connection_id, event).await {
            warn!("Dropped message for connection {}: {}", connection_id, e);
        }
    }
}

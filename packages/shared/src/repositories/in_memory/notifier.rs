use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::events::ServerEvent;
use crate::repositories::errors::notify_errors::NotifyError;
use crate::repositories::websocket_repository::ConnectionNotifier;

/// Records every delivered event. Connections marked gone refuse delivery.
#[derive(Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<(String, ServerEvent)>>,
    gone: Mutex<HashSet<String>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mark_gone(&self, connection_id: &str) {
        self.gone.lock().await.insert(connection_id.to_string());
    }

    pub async fn sent_to(&self, connection_id: &str) -> Vec<ServerEvent> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == connection_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub async fn all_sent(&self) -> Vec<(String, ServerEvent)> {
        self.sent.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl ConnectionNotifier for InMemoryNotifier {
    async fn send(&self, connection_id: &str, event: &ServerEvent) -> Result<(), NotifyError> {
        if self.gone.lock().await.contains(connection_id) {
            return Err(NotifyError::Gone(connection_id.to_string()));
        }
        debug!("Delivering {:?} to {}", event, connection_id);
        self.sent
            .lock()
            .await
            .push((connection_id.to_string(), event.clone()));
        Ok(())
    }
}

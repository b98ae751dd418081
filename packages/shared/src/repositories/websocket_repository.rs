use async_trait::async_trait;
use aws_sdk_apigatewaymanagement::error::SdkError;
use aws_sdk_apigatewaymanagement::{primitives::Blob, Client as ApiGatewayClient};
use tracing::{debug, warn};

use crate::backoff::BackoffPolicy;
use crate::models::events::ServerEvent;
use crate::repositories::errors::notify_errors::NotifyError;

#[cfg(test)]
use mockall::automock;

/// Pushes server events to client connections.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait ConnectionNotifier: Send + Sync {
    /// Delivers one event. `NotifyError::Gone` when the connection no longer exists.
    async fn send(&self, connection_id: &str, event: &ServerEvent) -> Result<(), NotifyError>;
}

/// Posts to connections through the API Gateway management API.
pub struct ApiGatewayNotifier {
    client: ApiGatewayClient,
    backoff: BackoffPolicy,
}

impl ApiGatewayNotifier {
    pub fn new(client: ApiGatewayClient, backoff: BackoffPolicy) -> Self {
        Self { client, backoff }
    }

    /// Builds a management client pointed at the websocket stage endpoint,
    /// e.g. `https://{api-id}.execute-api.{region}.amazonaws.com/{stage}`.
    pub fn from_endpoint(
        config: &aws_config::SdkConfig,
        endpoint: &str,
        backoff: BackoffPolicy,
    ) -> Self {
        let api_gateway_config = aws_sdk_apigatewaymanagement::config::Builder::from(config)
            .endpoint_url(endpoint)
            .build();
        Self::new(ApiGatewayClient::from_conf(api_gateway_config), backoff)
    }

    async fn post(&self, connection_id: &str, payload: &str) -> Result<(), NotifyError> {
        let result = self
            .client
            .post_to_connection()
            .connection_id(connection_id)
            .data(Blob::new(payload.as_bytes()))
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().is_gone_exception() => {
                Err(NotifyError::Gone(connection_id.to_string()))
            }
            Err(e) => Err(NotifyError::Transport(e.to_string())),
        }
    }
}

#[async_trait]
impl ConnectionNotifier for ApiGatewayNotifier {
    async fn send(&self, connection_id: &str, event: &ServerEvent) -> Result<(), NotifyError> {
        let payload =
            serde_json::to_string(event).map_err(|e| NotifyError::Serialization(e.to_string()))?;

        let result = self
            .backoff
            .retry(
                || self.post(connection_id, &payload),
                |e| matches!(e, NotifyError::Transport(_)),
            )
            .await;
        match &result {
            Ok(()) => debug!("Sent message to connection: {}", connection_id),
            Err(NotifyError::Gone(_)) => debug!("Connection {} is gone", connection_id),
            Err(e) => warn!("Failed to send to connection {}: {}", connection_id, e),
        }
        result
    }
}

use serde::{Deserialize, Serialize};

/// The request envelope API Gateway forwards for every WebSocket route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebSocketEvent {
    #[serde(rename = "requestContext")]
    pub request_context: RequestContext,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestContext {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(rename = "routeKey")]
    pub route_key: String,
    #[serde(rename = "eventType", default)]
    pub event_type: Option<String>,
    #[serde(rename = "domainName", default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSocketResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl WebSocketResponse {
    pub fn ok() -> Self {
        WebSocketResponse {
            status_code: 200,
            body: None,
        }
    }

    pub fn bad_request(message: &str) -> Self {
        WebSocketResponse {
            status_code: 400,
            body: Some(serde_json::json!({ "error": message }).to_string()),
        }
    }
}

//! Backend client: message exchange, transcript fetch and session reset.
//!
//! `IntakeBackend` is the seam the conversation driver talks through;
//! `HttpBackend` implements it against the agent server's REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::BackendError;
use crate::intake::transcript::{TranscriptSnapshot, lenient};

/// Metadata the agent attaches to a reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMetadata {
    /// Free-form label of the stage the agent considers itself in.
    #[serde(default, deserialize_with = "lenient")]
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub response_status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub asked_question: Option<String>,
    /// Anything else the backend sends along.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One agent reply from a message exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(default, deserialize_with = "lenient")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<ReplyMetadata>,
}

impl AgentReply {
    pub fn stage_label(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.stage.as_deref())
    }
}

/// The remote side of the conversation.
#[async_trait]
pub trait IntakeBackend: Send + Sync {
    /// Send the user's text; returns the agent's replies in order.
    async fn send_message(&self, text: &str, user_id: &str) -> Result<Vec<AgentReply>, BackendError>;

    /// Fetch the accumulated transcript record for the conversation.
    async fn fetch_transcript(
        &self,
        room_id: &str,
        user_id: &str,
        agent_id: &str,
    ) -> Result<TranscriptSnapshot, BackendError>;

    /// Ask the backend to discard the conversation and start over.
    async fn reset_session(&self, user_id: &str) -> Result<(), BackendError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest<'a> {
    text: &'a str,
    user_id: &'a str,
    user_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetRequest<'a> {
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscriptEnvelope {
    #[serde(default, deserialize_with = "lenient")]
    success: bool,
    #[serde(default, deserialize_with = "lenient")]
    data: Option<TranscriptSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ResetEnvelope {
    #[serde(default, deserialize_with = "lenient")]
    success: bool,
    #[serde(default, deserialize_with = "lenient")]
    message: Option<String>,
}

/// `IntakeBackend` over HTTP.
pub struct HttpBackend {
    base_url: String,
    auth_base_url: String,
    agent_id: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            auth_base_url: config.auth_base_url.clone(),
            agent_id: config.agent_id.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn message_url(&self) -> String {
        format!("{}/{}/message", self.base_url, self.agent_id)
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/{endpoint}", self.auth_base_url)
    }

    /// Check the status and decode the body as JSON.
    async fn read_json(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<serde_json::Value, BackendError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(endpoint, status = %status, body = %body, "Backend returned an error status");
            return Err(BackendError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        resp.json()
            .await
            .map_err(|e| BackendError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl IntakeBackend for HttpBackend {
    async fn send_message(&self, text: &str, user_id: &str) -> Result<Vec<AgentReply>, BackendError> {
        let endpoint = "message";
        let body = MessageRequest {
            text,
            user_id,
            user_name: user_id,
        };
        let resp = self
            .client
            .post(self.message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        let value = Self::read_json(endpoint, resp).await?;
        parse_replies(value).ok_or_else(|| BackendError::InvalidResponse {
            endpoint: endpoint.into(),
            reason: "expected a reply object or an array of replies".into(),
        })
    }

    async fn fetch_transcript(
        &self,
        room_id: &str,
        user_id: &str,
        agent_id: &str,
    ) -> Result<TranscriptSnapshot, BackendError> {
        let endpoint = "comprehensive-record";
        let resp = self
            .client
            .get(self.auth_url(endpoint))
            .query(&[("roomId", room_id), ("userId", user_id), ("agentId", agent_id)])
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        let value = Self::read_json(endpoint, resp).await?;
        let envelope: TranscriptEnvelope =
            serde_json::from_value(value).map_err(|e| BackendError::InvalidResponse {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        match envelope.data {
            Some(snapshot) if envelope.success => Ok(snapshot),
            _ => {
                tracing::debug!("Transcript fetch returned no record yet");
                Ok(TranscriptSnapshot::default())
            }
        }
    }

    async fn reset_session(&self, user_id: &str) -> Result<(), BackendError> {
        let endpoint = "reset-session";
        let resp = self
            .client
            .post(self.auth_url(endpoint))
            .json(&ResetRequest { user_id })
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        let value = Self::read_json(endpoint, resp).await?;
        let envelope: ResetEnvelope =
            serde_json::from_value(value).map_err(|e| BackendError::InvalidResponse {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        if envelope.success {
            Ok(())
        } else {
            Err(BackendError::Rejected {
                reason: envelope
                    .message
                    .unwrap_or_else(|| "Failed to reset session".to_string()),
            })
        }
    }
}

/// Decode a message response: an array of replies, or a single reply
/// object. Array elements that aren't objects are skipped.
fn parse_replies(value: serde_json::Value) -> Option<Vec<AgentReply>> {
    match value {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .filter(|item| item.is_object())
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        obj @ serde_json::Value::Object(_) => serde_json::from_value(obj).ok().map(|r| vec![r]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_reply_array() {
        let replies = parse_replies(json!([
            {"text": "Hi there", "metadata": {"stage": "Trust Building"}},
            {"text": "Tell me more", "metadata": {
                "stage": "Situation Discovery",
                "responseStatus": "Normal situation",
                "askedQuestion": "What made you decide to reach out about senior living today?",
                "actionName": "grace_response"
            }}
        ]))
        .unwrap();

        assert_eq!(replies.len(), 2);
        let last = replies.last().unwrap();
        assert_eq!(last.stage_label(), Some("Situation Discovery"));
        let metadata = last.metadata.as_ref().unwrap();
        assert_eq!(metadata.response_status.as_deref(), Some("Normal situation"));
        assert_eq!(metadata.extra["actionName"], "grace_response");
    }

    #[test]
    fn single_object_is_one_reply() {
        let replies = parse_replies(json!({"text": "Hello"})).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, "Hello");
        assert!(replies[0].stage_label().is_none());
    }

    #[test]
    fn malformed_metadata_is_absent() {
        let replies = parse_replies(json!([
            {"text": "a", "metadata": "oops"},
            {"text": "b", "metadata": {"stage": 7}},
            "not a reply"
        ]))
        .unwrap();

        assert_eq!(replies.len(), 2);
        assert!(replies[0].metadata.is_none());
        assert!(replies[1].stage_label().is_none());
    }

    #[test]
    fn scalar_response_is_rejected() {
        assert!(parse_replies(json!("nope")).is_none());
        assert!(parse_replies(json!(null)).is_none());
    }

    #[test]
    fn urls_are_built_from_config() {
        let config = ClientConfig {
            base_url: "https://agent.test".into(),
            auth_base_url: "https://auth.test".into(),
            agent_id: "agent-1".into(),
            ..Default::default()
        };
        let backend = HttpBackend::new(&config);
        assert_eq!(backend.message_url(), "https://agent.test/agent-1/message");
        assert_eq!(
            backend.auth_url("comprehensive-record"),
            "https://auth.test/auth/comprehensive-record"
        );
    }
}

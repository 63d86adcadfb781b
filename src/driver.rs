//! Conversation driver: feeds message exchanges and transcript refetches
//! into the intake session and keeps the visible message log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::client::{AgentReply, IntakeBackend, ReplyMetadata};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::intake::{IntakeSession, SnapshotOutcome, StageDecision};

/// Greeting the agent opens every conversation with.
pub const GREETING: &str = "Welcome! We are so glad you dropped by. What can I help you with today?";

/// Shown in place of a reply when the message could not be delivered.
pub const CONNECTION_ERROR_REPLY: &str = "Sorry, I encountered a connection error. Please try again.";

/// Shown when the agent answered with nothing usable.
pub const EMPTY_REPLY: &str = "Sorry, I encountered an error processing your message.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Agent,
}

/// One line of the visible conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ReplyMetadata>,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self::new(Sender::User, text, None)
    }

    pub fn agent(text: &str, metadata: Option<ReplyMetadata>) -> Self {
        Self::new(Sender::Agent, text, metadata)
    }

    fn new(sender: Sender, text: &str, metadata: Option<ReplyMetadata>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.to_string(),
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Result of one message exchange.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    /// The agent message appended to the log (possibly a fallback).
    pub reply: ChatMessage,
    /// Stage decision taken from the last reply; `None` when the exchange
    /// produced no replies at all.
    pub stage: Option<StageDecision>,
    /// Whether the backend could be reached.
    pub delivered: bool,
}

/// Drives one conversation session against an [`IntakeBackend`].
pub struct ConversationDriver {
    backend: Arc<dyn IntakeBackend>,
    config: ClientConfig,
    session: IntakeSession,
    messages: Vec<ChatMessage>,
}

impl ConversationDriver {
    pub fn new(backend: Arc<dyn IntakeBackend>, config: ClientConfig) -> Self {
        let session = IntakeSession::new(config.notification_display);
        Self {
            backend,
            config,
            session,
            messages: vec![ChatMessage::agent(GREETING, None)],
        }
    }

    pub fn session(&self) -> &IntakeSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut IntakeSession {
        &mut self.session
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one user message and apply the last reply's stage label.
    ///
    /// Blank input is ignored. Delivery failures never surface as errors:
    /// the log gets a fallback reply and the stage progress is left
    /// untouched. The "stage not recognized" flag only ever describes the
    /// latest exchange.
    pub async fn send(&mut self, text: &str) -> Option<ExchangeOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.session.clear_stage_flag();
        self.messages.push(ChatMessage::user(text));

        let replies = match self.backend.send_message(text, &self.config.user_id).await {
            Ok(replies) => replies,
            Err(e) => {
                tracing::warn!("Message exchange failed: {}", e);
                let reply = ChatMessage::agent(CONNECTION_ERROR_REPLY, None);
                self.messages.push(reply.clone());
                return Some(ExchangeOutcome {
                    reply,
                    stage: None,
                    delivered: false,
                });
            }
        };

        let Some(last) = replies.into_iter().last() else {
            let reply = ChatMessage::agent(EMPTY_REPLY, None);
            self.messages.push(reply.clone());
            return Some(ExchangeOutcome {
                reply,
                stage: None,
                delivered: true,
            });
        };

        let stage = self.session.apply_stage_label(last.stage_label(), Utc::now());
        let reply = Self::reply_message(last);
        self.messages.push(reply.clone());

        Some(ExchangeOutcome {
            reply,
            stage: Some(stage),
            delivered: true,
        })
    }

    /// Refetch the transcript and re-run extraction and visit detection.
    ///
    /// A failed fetch is logged and changes nothing.
    pub async fn refresh(&mut self) -> SnapshotOutcome {
        let fetched = self
            .backend
            .fetch_transcript(&self.config.room_id, &self.config.user_id, &self.config.agent_id)
            .await;

        match fetched {
            Ok(snapshot) => self.session.apply_snapshot(&snapshot),
            Err(e) => {
                tracing::warn!("Transcript fetch failed: {}", e);
                SnapshotOutcome::default()
            }
        }
    }

    /// Reset the conversation on the backend, then locally.
    ///
    /// Local state is only cleared once the backend has confirmed.
    pub async fn reset(&mut self) -> Result<()> {
        self.backend.reset_session(&self.config.user_id).await?;
        self.session.reset();
        self.messages = vec![ChatMessage::agent(GREETING, None)];
        tracing::info!("Session reset");
        Ok(())
    }

    fn reply_message(reply: AgentReply) -> ChatMessage {
        let text = if reply.text.trim().is_empty() {
            EMPTY_REPLY
        } else {
            reply.text.as_str()
        };
        ChatMessage::agent(text, reply.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{BackendError, Error};
    use crate::intake::catalog::VISIT_TIME_QUESTION;
    use crate::intake::{DiscoveryEntry, IntakeField, Stage, TranscriptRecord, TranscriptSnapshot};

    /// Scripted backend: pops one reply batch per message, serves a fixed
    /// snapshot.
    #[derive(Default)]
    struct StubBackend {
        replies: Mutex<Vec<std::result::Result<Vec<AgentReply>, BackendError>>>,
        snapshot: Mutex<Option<TranscriptSnapshot>>,
        reset_ok: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl StubBackend {
        fn with_replies(
            replies: Vec<std::result::Result<Vec<AgentReply>, BackendError>>,
        ) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                reset_ok: true,
                ..Default::default()
            }
        }

        fn serve(&self, snapshot: TranscriptSnapshot) {
            *self.snapshot.lock().unwrap() = Some(snapshot);
        }
    }

    #[async_trait]
    impl IntakeBackend for StubBackend {
        async fn send_message(
            &self,
            text: &str,
            user_id: &str,
        ) -> std::result::Result<Vec<AgentReply>, BackendError> {
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), user_id.to_string()));
            self.replies.lock().unwrap().pop().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn fetch_transcript(
            &self,
            _room_id: &str,
            _user_id: &str,
            _agent_id: &str,
        ) -> std::result::Result<TranscriptSnapshot, BackendError> {
            self.snapshot
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| BackendError::RequestFailed {
                    endpoint: "comprehensive-record".into(),
                    reason: "offline".into(),
                })
        }

        async fn reset_session(&self, _user_id: &str) -> std::result::Result<(), BackendError> {
            if self.reset_ok {
                Ok(())
            } else {
                Err(BackendError::Rejected {
                    reason: "nope".into(),
                })
            }
        }
    }

    fn reply(text: &str, stage: Option<&str>) -> AgentReply {
        AgentReply {
            text: text.to_string(),
            metadata: stage.map(|s| ReplyMetadata {
                stage: Some(s.to_string()),
                ..Default::default()
            }),
        }
    }

    fn driver(backend: Arc<StubBackend>) -> ConversationDriver {
        let config = ClientConfig {
            user_id: "chris".into(),
            ..Default::default()
        };
        ConversationDriver::new(backend, config)
    }

    #[tokio::test]
    async fn starts_with_greeting() {
        let driver = driver(Arc::new(StubBackend::default()));
        assert_eq!(driver.messages().len(), 1);
        assert_eq!(driver.messages()[0].text, GREETING);
        assert_eq!(driver.messages()[0].sender, Sender::Agent);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let backend = Arc::new(StubBackend::default());
        let mut driver = driver(Arc::clone(&backend));
        assert!(driver.send("   ").await.is_none());
        assert!(backend.sent.lock().unwrap().is_empty());
        assert_eq!(driver.messages().len(), 1);
    }

    #[tokio::test]
    async fn only_last_reply_stage_counts() {
        let backend = Arc::new(StubBackend::with_replies(vec![Ok(vec![
            reply("first", Some("needs matching")),
            reply("second", Some("Situation Discovery")),
        ])]));
        let mut driver = driver(Arc::clone(&backend));

        let outcome = driver.send(" Hi, I need help ").await.unwrap();
        assert!(outcome.delivered);
        assert_eq!(outcome.reply.text, "second");
        assert_eq!(
            outcome.stage,
            Some(StageDecision::Advanced {
                from: Stage::TrustBuilding,
                to: Stage::SituationDiscovery,
            })
        );
        assert_eq!(driver.session().current_stage(), Stage::SituationDiscovery);
        assert!(!driver.session().stages().is_completed(Stage::NeedsMatching));

        let sent = backend.sent.lock().unwrap();
        assert_eq!(sent[0], ("Hi, I need help".to_string(), "chris".to_string()));
        // greeting, user, one agent reply
        assert_eq!(driver.messages().len(), 3);
    }

    #[tokio::test]
    async fn missing_stage_flags_not_recognized() {
        let backend = Arc::new(StubBackend::with_replies(vec![Ok(vec![reply("ok", None)])]));
        let mut driver = driver(backend);

        let outcome = driver.send("hello").await.unwrap();
        assert_eq!(outcome.stage, Some(StageDecision::Unrecognized));
        assert!(driver.session().stage_not_recognized());
        assert_eq!(driver.session().current_stage(), Stage::TrustBuilding);
    }

    #[tokio::test]
    async fn network_failure_becomes_fallback_reply() {
        let backend = Arc::new(StubBackend::with_replies(vec![Err(
            BackendError::RequestFailed {
                endpoint: "message".into(),
                reason: "connection refused".into(),
            },
        )]));
        let mut driver = driver(backend);
        let before = driver.session().stages().clone();

        let outcome = driver.send("hello").await.unwrap();
        assert!(!outcome.delivered);
        assert_eq!(outcome.reply.text, CONNECTION_ERROR_REPLY);
        assert!(outcome.stage.is_none());
        assert_eq!(driver.session().stages(), &before);
        assert!(!driver.session().stage_not_recognized());
    }

    #[tokio::test]
    async fn failed_exchange_clears_previous_unrecognized_flag() {
        let backend = Arc::new(StubBackend::with_replies(vec![
            Ok(vec![reply("ok", Some("not a stage"))]),
            Err(BackendError::RequestFailed {
                endpoint: "message".into(),
                reason: "connection refused".into(),
            }),
            Ok(vec![reply("ok", None)]),
            Ok(Vec::new()),
        ]));
        let mut driver = driver(backend);

        driver.send("hello").await.unwrap();
        assert!(driver.session().stage_not_recognized());

        let outcome = driver.send("still there?").await.unwrap();
        assert!(!outcome.delivered);
        assert!(!driver.session().stage_not_recognized());

        driver.send("hello").await.unwrap();
        assert!(driver.session().stage_not_recognized());

        let outcome = driver.send("hello?").await.unwrap();
        assert_eq!(outcome.reply.text, EMPTY_REPLY);
        assert!(!driver.session().stage_not_recognized());
    }

    #[tokio::test]
    async fn empty_exchange_uses_processing_fallback() {
        let backend = Arc::new(StubBackend::with_replies(vec![
            Ok(Vec::new()),
            Ok(vec![reply("  ", Some("trust_building"))]),
        ]));
        let mut driver = driver(backend);

        let outcome = driver.send("hello").await.unwrap();
        assert_eq!(outcome.reply.text, EMPTY_REPLY);
        assert!(outcome.stage.is_none());

        let outcome = driver.send("hello again").await.unwrap();
        assert_eq!(outcome.reply.text, EMPTY_REPLY);
        assert_eq!(outcome.stage, Some(StageDecision::Unchanged(Stage::TrustBuilding)));
    }

    #[tokio::test]
    async fn refresh_fills_form_and_detects_visit_once() {
        let backend = Arc::new(StubBackend::default());
        let mut driver = driver(Arc::clone(&backend));

        // Offline fetch changes nothing.
        assert_eq!(driver.refresh().await, SnapshotOutcome::default());

        backend.serve(TranscriptSnapshot {
            record: Some(TranscriptRecord {
                situation: vec![DiscoveryEntry::new(
                    "What made you decide to reach out about senior living today?",
                    "just exploring",
                )],
                visit_scheduling: vec![DiscoveryEntry::new(VISIT_TIME_QUESTION, "Tuesday 2PM")],
                ..Default::default()
            }),
            visit_info: None,
        });

        let outcome = driver.refresh().await;
        assert_eq!(outcome.changed_fields, vec![IntakeField::ReasonForCall]);
        assert_eq!(outcome.visit_confirmed.as_deref(), Some("Tuesday 2PM"));
        assert_eq!(driver.session().form().reason_for_call, "just exploring");

        let outcome = driver.refresh().await;
        assert!(outcome.changed_fields.is_empty());
        assert!(outcome.visit_confirmed.is_none());
    }

    #[tokio::test]
    async fn reset_clears_state_after_backend_confirms() {
        let backend = Arc::new(StubBackend::with_replies(vec![Ok(vec![reply(
            "Let's talk priorities",
            Some("priorities discovery"),
        )])]));
        let mut driver = driver(backend);
        driver.send("hi").await;
        assert_eq!(driver.session().current_stage(), Stage::PrioritiesDiscovery);

        driver.reset().await.unwrap();
        assert_eq!(driver.session().current_stage(), Stage::TrustBuilding);
        assert!(driver.session().stages().completed_stages.is_empty());
        assert_eq!(driver.messages().len(), 1);
    }

    #[tokio::test]
    async fn rejected_reset_keeps_state() {
        let backend = Arc::new(StubBackend {
            replies: Mutex::new(vec![Ok(vec![reply("ok", Some("lifestyle_discovery"))])]),
            reset_ok: false,
            ..Default::default()
        });
        let mut driver = driver(backend);
        driver.send("hi").await;

        let err = driver.reset().await.unwrap_err();
        assert!(matches!(err, Error::Backend(BackendError::Rejected { .. })));
        assert_eq!(driver.session().current_stage(), Stage::LifestyleDiscovery);
        assert_eq!(driver.messages().len(), 3);
    }
}

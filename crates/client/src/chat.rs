//! Shopping assistant conversation.
//!
//! A [`ChatSession`] owns one conversation id and the transcript shown to
//! the user. Failures are recorded in the transcript as assistant entries
//! and also returned to the caller.

use chrono::{DateTime, Utc};
use shopfront_core::ChatMessage;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::api::{ApiClient, ApiError};
use crate::error::ErrorKind;

/// First assistant entry of every conversation.
pub const GREETING: &str = "Hello! I'm your shopping assistant. How can I help you today?";

/// Shown when the assistant answers with an empty message.
pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't process your request. Please try again.";

/// Errors raised by the assistant.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
}

impl ChatError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(e) => e.kind(),
        }
    }
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub text: String,
    pub from_ai: bool,
    pub at: DateTime<Utc>,
}

impl ChatEntry {
    fn user(text: &str) -> Self {
        Self {
            text: text.to_string(),
            from_ai: false,
            at: Utc::now(),
        }
    }

    fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_ai: true,
            at: Utc::now(),
        }
    }
}

impl From<ChatMessage> for ChatEntry {
    fn from(message: ChatMessage) -> Self {
        Self {
            text: message.message,
            from_ai: message.is_from_ai,
            at: message.created_at,
        }
    }
}

/// A conversation with the shopping assistant.
#[derive(Debug)]
pub struct ChatSession {
    api: ApiClient,
    session_id: String,
    transcript: Vec<ChatEntry>,
}

impl ChatSession {
    /// Start a new conversation.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            session_id: new_session_id(),
            transcript: vec![ChatEntry::assistant(GREETING)],
        }
    }

    /// Continue an existing conversation. Call [`load_history`](Self::load_history)
    /// to fetch its messages.
    #[must_use]
    pub fn resume(api: ApiClient, session_id: impl Into<String>) -> Self {
        Self {
            api,
            session_id: session_id.into(),
            transcript: Vec::new(),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatEntry] {
        &self.transcript
    }

    /// Send a message. Blank input is ignored and returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Api` if the assistant could not answer. An error
    /// entry has been appended to the transcript.
    #[instrument(skip(self, text), fields(session_id = %self.session_id))]
    pub async fn send(&mut self, text: &str) -> Result<Option<ChatEntry>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        self.transcript.push(ChatEntry::user(text));

        match self
            .api
            .send_chat_message(text, Some(&self.session_id))
            .await
        {
            Ok(reply) => {
                let entry = if reply.message.trim().is_empty() {
                    ChatEntry::assistant(EMPTY_REPLY)
                } else {
                    ChatEntry::from(reply)
                };
                self.transcript.push(entry.clone());
                Ok(Some(entry))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Assistant request failed");
                self.transcript.push(ChatEntry::assistant(error_entry_text(&e)));
                Err(e.into())
            }
        }
    }

    /// Replace the transcript with the server's copy of this conversation.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Api` if the history cannot be fetched.
    pub async fn load_history(&mut self) -> Result<&[ChatEntry], ChatError> {
        let messages = self.api.chat_history(&self.session_id, None, None).await?;
        self.transcript = messages.into_iter().map(ChatEntry::from).collect();
        Ok(&self.transcript)
    }

    /// Ids of every conversation of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Api` if the list cannot be fetched.
    pub async fn sessions(&self) -> Result<Vec<String>, ChatError> {
        Ok(self.api.chat_sessions().await?)
    }

    /// Delete this conversation on the server and start a fresh one.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Api` if the server refuses; the session is kept.
    pub async fn delete(&mut self) -> Result<(), ChatError> {
        self.api.delete_chat_session(&self.session_id).await?;
        self.reset();
        Ok(())
    }

    /// Start a fresh conversation without touching the server.
    pub fn reset(&mut self) {
        self.session_id = new_session_id();
        self.transcript = vec![ChatEntry::assistant(GREETING)];
    }
}

fn new_session_id() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

fn error_entry_text(err: &ApiError) -> String {
    match (err, err.detail()) {
        (_, Some(detail)) => format!("Error: {detail}"),
        (ApiError::Http(e), None) => format!("Connection error: {e}"),
        _ => "Error: Failed to get response".to_string(),
    }
}

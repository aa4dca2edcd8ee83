//! Shopping assistant endpoints.

use reqwest::Method;
use serde_json::json;
use shopfront_core::ChatMessage;
use tracing::instrument;

use super::{ApiClient, ApiError, Auth};

impl ApiClient {
    /// Send a message and receive the assistant's reply.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with a 5xx status if the assistant is
    /// unavailable.
    #[instrument(skip(self, message), fields(session_id = ?session_id))]
    pub async fn send_chat_message(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatMessage, ApiError> {
        let body = json!({ "message": message, "session_id": session_id });
        let req = self.request(Method::POST, "chat/")?.json(&body);
        self.send_json(req, Auth::Stored).await
    }

    /// Messages of one conversation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn chat_history(
        &self,
        session_id: &str,
        skip: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let path = format!("chat/history/{}", urlencoding::encode(session_id));
        let mut params = Vec::new();
        if let Some(skip) = skip {
            params.push(("skip", skip));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit));
        }
        let req = self.request(Method::GET, &path)?.query(&params);
        self.send_json(req, Auth::Stored).await
    }

    /// Ids of every conversation the signed-in user has had.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn chat_sessions(&self) -> Result<Vec<String>, ApiError> {
        let req = self.request(Method::GET, "chat/sessions")?;
        self.send_json(req, Auth::Stored).await
    }

    /// Delete a conversation and its messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn delete_chat_session(&self, session_id: &str) -> Result<(), ApiError> {
        let path = format!("chat/session/{}", urlencoding::encode(session_id));
        let req = self.request(Method::DELETE, &path)?;
        self.send_unit(req, Auth::Stored).await
    }
}

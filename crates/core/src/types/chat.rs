//! Chat assistant messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChatMessageId, UserId};

/// A stored chat message, either the user's or the assistant's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub user_id: UserId,
    pub message: String,
    pub is_from_ai: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

//! Shopping assistant commands.

use shopfront_client::Storefront;
use shopfront_client::chat::ChatSession;

use super::CliError;
use crate::output;

/// Send one message and print the reply. Prints the session id of a new
/// conversation so it can be continued with `--session`.
pub async fn send(
    storefront: &Storefront,
    message: &str,
    session: Option<String>,
) -> Result<(), CliError> {
    let mut chat = match session {
        Some(id) => ChatSession::resume(storefront.api().clone(), id),
        None => {
            let chat = storefront.chat();
            output::line(&format!("session: {}", chat.session_id()));
            chat
        }
    };
    let result = chat.send(message).await;
    if let Some(entry) = chat.transcript().last() {
        output::chat(std::slice::from_ref(entry));
    }
    result?;
    Ok(())
}

pub async fn sessions(storefront: &Storefront) -> Result<(), CliError> {
    let sessions = storefront.chat().sessions().await?;
    if sessions.is_empty() {
        output::line("No conversations yet");
    }
    for id in sessions {
        output::line(&id);
    }
    Ok(())
}

pub async fn history(storefront: &Storefront, session: String) -> Result<(), CliError> {
    let mut chat = ChatSession::resume(storefront.api().clone(), session);
    output::chat(chat.load_history().await?);
    Ok(())
}

pub async fn delete(storefront: &Storefront, session: String) -> Result<(), CliError> {
    ChatSession::resume(storefront.api().clone(), session)
        .delete()
        .await?;
    output::line("Conversation deleted");
    Ok(())
}

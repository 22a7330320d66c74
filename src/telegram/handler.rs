use crate::error::NotesError;
use crate::models::IncomingUpdate;
use crate::notes::NotesClient;
use crate::telegram::command::Command;
use crate::telegram::formatter;
use crate::telegram::notifier::Notifier;

/// Body returned to Telegram's webhook delivery. Downstream failures never
/// change it; they are reported in the chat instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAck {
    Ok,
    NoMessage,
}

impl WebhookAck {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NoMessage => "No message",
        }
    }
}

pub async fn handle_update(
    notes: &NotesClient,
    notifier: &Notifier,
    update: IncomingUpdate,
) -> WebhookAck {
    let update_id = update.update_id;
    let Some((chat_id, text)) = update.into_chat_text() else {
        tracing::debug!(?update_id, "Ignoring update without text message");
        return WebhookAck::NoMessage;
    };
    let Some(command) = Command::parse(&text) else {
        tracing::debug!(?update_id, chat_id, "Ignoring blank message");
        return WebhookAck::NoMessage;
    };

    let reply = match command {
        Command::Start => formatter::WELCOME.to_string(),
        Command::List => list_reply(notes).await,
        Command::Save(content) => save_reply(notes, chat_id, content).await,
    };

    if let Err(e) = notifier.send_text(chat_id, &reply).await {
        tracing::warn!(chat_id, "Failed to send reply: {e}");
    }

    WebhookAck::Ok
}

async fn list_reply(notes: &NotesClient) -> String {
    match notes.list().await {
        Ok(list) => {
            tracing::info!(count = list.len(), "Listed notes");
            formatter::format_recent_notes(&list)
        }
        Err(e) => {
            tracing::warn!("Failed to list notes: {e}");
            formatter::format_list_failed(&e.to_string())
        }
    }
}

async fn save_reply(notes: &NotesClient, chat_id: i64, content: &str) -> String {
    match notes.create(content).await {
        Ok(()) => {
            tracing::info!(chat_id, len = content.len(), "Saved note");
            formatter::SAVED.to_string()
        }
        Err(NotesError::Status { status, body }) => {
            tracing::warn!(chat_id, status = status.as_u16(), "Memos rejected new note");
            formatter::format_save_failed(&body)
        }
        Err(e) => {
            tracing::warn!(chat_id, "Failed to save note: {e}");
            formatter::format_save_failed(&e.to_string())
        }
    }
}

use serde::{Deserialize, Serialize};

/// Telegram's webhook payload. Only the fields the relay reads are modeled;
/// everything is optional so that stickers, photos and edits parse cleanly.
#[derive(Debug, Default, Deserialize)]
pub struct IncomingUpdate {
    pub update_id: Option<i64>,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub chat: Option<IncomingChat>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingChat {
    pub id: i64,
}

impl IncomingUpdate {
    /// Returns the chat id and raw text, or `None` when there is nothing to act on.
    pub fn into_chat_text(self) -> Option<(i64, String)> {
        let message = self.message?;
        let chat_id = message.chat?.id;
        let text = message.text?;
        Some((chat_id, text))
    }
}

/// A single memo as returned by the notes service. Only `content` is read.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct NoteRecord {
    #[serde(default)]
    pub content: String,
}

/// Body of `POST <memos_api>`.
#[derive(Debug, Serialize)]
pub struct CreateNote<'a> {
    pub content: &'a str,
}

/// Body of Bot API `setWebhook`.
#[derive(Debug, Serialize)]
pub struct SetWebhook<'a> {
    pub url: &'a str,
}

/// Extracts the note list from a notes-service response body.
///
/// The body must be JSON. The list is read from `data`, falling back to the
/// Memos v1 `memos` key; a missing or non-array value yields an empty list.
pub fn parse_note_list(body: &str) -> Result<Vec<NoteRecord>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    let Some(items) = value
        .get("data")
        .or_else(|| value.get("memos"))
        .and_then(|v| v.as_array())
    else {
        return Ok(Vec::new());
    };

    Ok(items
        .iter()
        .map(|item| serde_json::from_value(item.clone()).unwrap_or_default())
        .collect())
}

use crate::config::Config;
use teloxide::prelude::*;
use teloxide::types::ChatId;

/// Sends plain-text replies through the Bot API.
#[derive(Clone)]
pub struct Notifier {
    bot: Bot,
}

impl Notifier {
    pub fn new(config: &Config) -> Self {
        let bot = Bot::new(&config.telegram_bot_token).set_api_url(config.telegram_api_url.clone());
        Self { bot }
    }

    /// One `sendMessage` call, no retry. The caller decides what a failure means.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), teloxide::RequestError> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}

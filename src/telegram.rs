//! Telegram Bot API client and update types.
//!
//! Outbound messages go through [`NotificationSink`] so the engine never
//! depends on the transport. Inbound updates arrive on the webhook served by
//! [`crate::api`].
//!
//! # API Reference
//!
//! See: <https://core.telegram.org/bots/api>

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::ChatId;

/// Base URL for the Bot API.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Where notifications are delivered.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()>;
}

/// Client for the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(TELEGRAM_API_BASE, token)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let reply = response.json::<ApiReply>().await?;
        if !reply.ok {
            anyhow::bail!(
                "{} failed ({}): {}",
                method,
                status.as_u16(),
                reply.description.unwrap_or_default()
            );
        }

        Ok(())
    }

    /// Send a plain-text message.
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        self.call("sendMessage", &SendMessage { chat_id, text }).await
    }

    /// Point the bot's updates at `url`.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> anyhow::Result<()> {
        self.call(
            "setWebhook",
            &SetWebhook {
                url,
                secret_token,
                allowed_updates: &["message"],
            },
        )
        .await?;
        info!(url, "Telegram webhook registered");
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for TelegramClient {
    async fn send(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        self.send_message(chat_id, text).await
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SetWebhook<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_token: Option<&'a str>,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    description: Option<String>,
}

// ============================================================================
// Inbound update types
// ============================================================================

/// An incoming update. Only messages are of interest.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

/// Bot commands understood by the webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
}

impl Message {
    /// Parse the leading `/command` (optionally `/command@botname`).
    pub fn command(&self) -> Option<Command> {
        let text = self.text.as_deref()?.trim_start();
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?.split('@').next()?;
        match name {
            "start" => Some(Command::Start),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: Option<&str>) -> Message {
        Message {
            chat: Chat { id: 42 },
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(message(Some("/start")).command(), Some(Command::Start));
        assert_eq!(message(Some("/start@pulse_bot")).command(), Some(Command::Start));
        assert_eq!(message(Some("  /start now")).command(), Some(Command::Start));
        assert_eq!(message(Some("/stop")).command(), None);
        assert_eq!(message(Some("start")).command(), None);
        assert_eq!(message(None).command(), None);
    }

    #[test]
    fn test_update_deserialization() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 10,
                "message": {
                    "message_id": 1,
                    "date": 1700000000,
                    "chat": {"id": -100500, "type": "group"},
                    "text": "/start"
                }
            }"#,
        )
        .unwrap();

        let message = update.message.unwrap();
        assert_eq!(message.chat.id, -100500);
        assert_eq!(message.command(), Some(Command::Start));
    }

    #[test]
    fn test_method_url() {
        let client = TelegramClient::with_base_url("http://localhost:8081/", "123:abc");
        assert_eq!(
            client.method_url("sendMessage"),
            "http://localhost:8081/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_set_webhook_body_skips_missing_secret() {
        let body = serde_json::to_value(SetWebhook {
            url: "https://example.org/telegram/webhook",
            secret_token: None,
            allowed_updates: &["message"],
        })
        .unwrap();

        assert!(body.get("secret_token").is_none());
        assert_eq!(body["allowed_updates"][0], "message");
    }
}

//! # Telegram Adapter
//!
//! Implements the `ChatProvider` trait for the Telegram Bot API over `reqwest`, and the
//! long-polling loop that turns updates into `InboundEvent`s for the inbox.
//!
//! Views are drawn as HTML (`<b>title</b>` then the body) with one inline keyboard row
//! per option. Button presses come back as callback queries carrying the option target.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::application::context::{InboundEvent, InboundKind};
use crate::application::inbox::Inbox;
use crate::application::render;
use crate::domain::config::TelegramConfig;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{Image, MessageId, OptionKind, View};

const START_COMMAND: &str = "/start";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    message: Option<Message>,
    data: Option<String>,
}

/// Thin client for the Bot API methods the bot uses.
pub struct TelegramApi {
    client: Client,
    base: String,
    poll_timeout: u64,
}

impl TelegramApi {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .context("Telegram bot token is not configured")?;
        let client = Client::builder()
            // long polls must outlive the server-side timeout
            .timeout(Duration::from_secs(config.poll_timeout + 15))
            .build()
            .context("Failed to create Telegram HTTP client")?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", config.api_url.trim_end_matches('/'), token),
            poll_timeout: config.poll_timeout,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, String> {
        let response = self
            .client
            .post(format!("{}/{}", self.base, method))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("{method} request failed: {e}"))?;
        Self::unwrap_response(method, response).await
    }

    async fn call_multipart<T: DeserializeOwned>(&self, method: &str, form: Form) -> Result<T, String> {
        let response = self
            .client
            .post(format!("{}/{}", self.base, method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("{method} request failed: {e}"))?;
        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T, String> {
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| format!("{method} returned an unreadable response: {e}"))?;
        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(parsed
                .description
                .unwrap_or_else(|| format!("{method} failed without description"))),
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, String> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": self.poll_timeout,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    async fn answer_callback(&self, id: &str) -> Result<bool, String> {
        self.call("answerCallbackQuery", json!({ "callback_query_id": id })).await
    }
}

/// HTML message text for `view`.
fn message_text(view: &View) -> String {
    let body = escape_html(&render::body(view));
    if view.title.is_empty() {
        body
    } else {
        format!("<b>{}</b>\n{}", escape_html(&view.title), body)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Inline keyboard with one button per row, or `None` when the view has no options.
fn reply_markup(view: &View) -> Option<Value> {
    let rows: Vec<Value> = render::buttons(view)
        .into_iter()
        .map(|option| {
            let button = match option.kind {
                OptionKind::Callback => json!({ "text": option.label, "callback_data": option.target }),
                OptionKind::OpenUrl => json!({ "text": option.label, "url": option.target }),
                OptionKind::WebApp => json!({ "text": option.label, "web_app": { "url": option.target } }),
            };
            json!([button])
        })
        .collect();
    (!rows.is_empty()).then(|| json!({ "inline_keyboard": rows }))
}

/// A `ChatProvider` bound to one Telegram chat.
#[derive(Clone)]
pub struct TelegramChat {
    api: Arc<TelegramApi>,
    chat_id: i64,
}

impl TelegramChat {
    pub fn new(api: Arc<TelegramApi>, chat_id: i64) -> Self {
        Self { api, chat_id }
    }

    fn parse_id(message_id: &str) -> Result<i64, String> {
        message_id
            .parse()
            .map_err(|_| format!("'{message_id}' is not a Telegram message id"))
    }

    async fn send_photo(&self, image: &Image, view: &View) -> Result<MessageId, String> {
        let caption = message_text(view);
        let markup = reply_markup(view);
        let message: Message = match image {
            Image::Url(url) => {
                let mut body = json!({
                    "chat_id": self.chat_id,
                    "photo": url,
                    "caption": caption,
                    "parse_mode": "HTML",
                });
                if let Some(markup) = markup {
                    body["reply_markup"] = markup;
                }
                self.api.call("sendPhoto", body).await?
            }
            Image::Bytes(bytes) => {
                let mut form = Form::new()
                    .text("chat_id", self.chat_id.to_string())
                    .text("caption", caption)
                    .text("parse_mode", "HTML")
                    .part("photo", Part::bytes(bytes.clone()).file_name("chart.png"));
                if let Some(markup) = markup {
                    form = form.text("reply_markup", markup.to_string());
                }
                self.api.call_multipart("sendPhoto", form).await?
            }
        };
        Ok(message.message_id.to_string())
    }
}

#[async_trait]
impl ChatProvider for TelegramChat {
    async fn send_view(&self, view: &View) -> Result<MessageId, String> {
        if let Some(image) = &view.image {
            return self.send_photo(image, view).await;
        }
        let mut body = json!({
            "chat_id": self.chat_id,
            "text": message_text(view),
            "parse_mode": "HTML",
        });
        if let Some(markup) = reply_markup(view) {
            body["reply_markup"] = markup;
        }
        let message: Message = self.api.call("sendMessage", body).await?;
        Ok(message.message_id.to_string())
    }

    async fn edit_view(&self, message_id: &str, view: &View) -> Result<MessageId, String> {
        if view.image.is_some() {
            // a text message cannot become a photo; replace it
            if let Err(e) = self.delete_message(message_id).await {
                tracing::warn!("Failed to delete message {} before photo: {}", message_id, e);
            }
            return self.send_view(view).await;
        }
        let mut body = json!({
            "chat_id": self.chat_id,
            "message_id": Self::parse_id(message_id)?,
            "text": message_text(view),
            "parse_mode": "HTML",
        });
        if let Some(markup) = reply_markup(view) {
            body["reply_markup"] = markup;
        }
        // editMessageText returns the message, or `true` for inline messages
        let _: Value = self.api.call("editMessageText", body).await?;
        Ok(message_id.to_string())
    }

    async fn delete_message(&self, message_id: &str) -> Result<(), String> {
        let body = json!({
            "chat_id": self.chat_id,
            "message_id": Self::parse_id(message_id)?,
        });
        let _: bool = self.api.call("deleteMessage", body).await?;
        Ok(())
    }
}

/// Converts a raw update into the chat it belongs to and the event for the router.
fn to_event(update: &Update) -> Option<(i64, InboundEvent)> {
    if let Some(query) = &update.callback_query {
        let message = query.message.as_ref()?;
        let data = query.data.clone()?;
        let event = InboundEvent::new(
            message.chat.id.to_string(),
            query.from.id.to_string(),
            InboundKind::Callback,
            data,
        )
        .with_message_id(message.message_id.to_string());
        return Some((message.chat.id, event));
    }

    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?.trim();
    let user = message.from.as_ref().map(|u| u.id).unwrap_or(message.chat.id);
    let (kind, text) = if text == START_COMMAND || text.starts_with("/start ") {
        (InboundKind::Command, "/")
    } else if text.starts_with('/') {
        (InboundKind::Command, text)
    } else {
        (InboundKind::Text, text)
    };
    let event = InboundEvent::new(message.chat.id.to_string(), user.to_string(), kind, text)
        .with_message_id(message.message_id.to_string());
    Some((message.chat.id, event))
}

pub struct TelegramBot {
    api: Arc<TelegramApi>,
}

impl TelegramBot {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        Ok(Self {
            api: Arc::new(TelegramApi::new(config)?),
        })
    }

    /// Long-polls for updates until the process is stopped.
    pub async fn run(&self, inbox: Arc<Inbox>) -> Result<()> {
        tracing::info!("Polling Telegram for updates...");
        let mut offset = 0;
        loop {
            let updates = match self.api.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!("getUpdates failed: {}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                if let Some(query) = &update.callback_query
                    && let Err(e) = self.api.answer_callback(&query.id).await
                {
                    tracing::warn!("Failed to answer callback query {}: {}", query.id, e);
                }

                let Some((chat_id, event)) = to_event(&update) else {
                    tracing::debug!("Skipping update {}", update.update_id);
                    continue;
                };
                tracing::info!("Received from {}: {}", event.user_id, event.text);

                let chat: Arc<dyn ChatProvider> = Arc::new(TelegramChat::new(self.api.clone(), chat_id));
                if let Err(e) = inbox.submit(chat, event).await {
                    tracing::error!("Failed to queue update {}: {:#}", update.update_id, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ViewOption;

    fn update(json: &str) -> Update {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_start_maps_to_root() {
        let u = update(
            r#"{"update_id":1,"message":{"message_id":5,"chat":{"id":42},"from":{"id":7},"text":"/start"}}"#,
        );
        let (chat, event) = to_event(&u).unwrap();
        assert_eq!(chat, 42);
        assert_eq!(event.text, "/");
        assert_eq!(event.kind, InboundKind::Command);
        assert_eq!(event.user_id, "7");
    }

    #[test]
    fn test_plain_text_is_text_event() {
        let u = update(
            r#"{"update_id":2,"message":{"message_id":6,"chat":{"id":42},"from":{"id":7},"text":" AAPL "}}"#,
        );
        let (_, event) = to_event(&u).unwrap();
        assert_eq!(event.kind, InboundKind::Text);
        assert_eq!(event.text, "AAPL");
    }

    #[test]
    fn test_callback_carries_message_id() {
        let u = update(
            r#"{"update_id":3,"callback_query":{"id":"q1","from":{"id":7},"data":"form_back:1",
                "message":{"message_id":9,"chat":{"id":42}}}}"#,
        );
        let (_, event) = to_event(&u).unwrap();
        assert_eq!(event.kind, InboundKind::Callback);
        assert_eq!(event.text, "form_back:1");
        assert_eq!(event.message_id.as_deref(), Some("9"));
    }

    #[test]
    fn test_updates_without_text_are_skipped() {
        let u = update(r#"{"update_id":4,"message":{"message_id":6,"chat":{"id":42}}}"#);
        assert!(to_event(&u).is_none());
    }

    #[test]
    fn test_message_markup() {
        let view = View::new("A <b>", "x & y")
            .option(ViewOption::link("Menu", "/"))
            .option(ViewOption::url("Site", "https://example.com"));

        assert_eq!(message_text(&view), "<b>A &lt;b&gt;</b>\nx &amp; y");
        let markup = reply_markup(&view).unwrap();
        assert_eq!(markup["inline_keyboard"][0][0]["callback_data"], "/");
        assert_eq!(markup["inline_keyboard"][1][0]["url"], "https://example.com");
        assert!(reply_markup(&View::new("t", "x")).is_none());
    }
}

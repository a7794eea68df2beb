//! Minimal Telegram Bot API client: long polling, messages with keyboards,
//! callback acknowledgements.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use pies_types::ports::notifier::{NotifyError, Notifier};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod types;

use types::{AnswerCallbackQuery, ApiResponse, GetUpdates, Message, SendMessage, Update};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org/";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("telegram {method} failed ({code:?}): {description}")]
pub struct ApiError {
    pub method: &'static str,
    pub code: Option<i64>,
    pub description: String,
}

#[derive(Clone)]
pub struct BotClientBuilder {
    base: Url,
    token: String,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct BotClient {
    base: Url,
    token: String,
    client: reqwest::Client,
}

impl BotClient {
    pub fn builder(token: &str) -> anyhow::Result<BotClientBuilder> {
        if token.trim().is_empty() {
            anyhow::bail!("bot token is empty");
        }
        let base = Url::parse(DEFAULT_API_URL).context("invalid base url")?;
        Ok(BotClientBuilder {
            base,
            token: token.trim().to_string(),
            timeout: None,
            client: None,
        })
    }

    // The token is part of the path, so the url itself must never be logged.
    // The leading "./" keeps "bot123:abc" from parsing as a url scheme.
    fn url(&self, method: &str) -> anyhow::Result<Url> {
        self.base
            .join(&format!("./bot{}/{}", self.token, method))
            .context("failed to join url")
    }

    async fn call<P, T>(&self, method: &'static str, params: &P) -> anyhow::Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::trace!(method, "telegram call");
        let res: ApiResponse<T> = self
            .client
            .post(self.url(method)?)
            .json(params)
            .send()
            .await
            .with_context(|| format!("telegram {method} request failed"))?
            .json()
            .await
            .with_context(|| format!("telegram {method} returned malformed body"))?;
        match (res.ok, res.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(ApiError {
                method,
                code: res.error_code,
                description: res.description.unwrap_or_else(|| "no description".into()),
            }
            .into()),
        }
    }

    /// Long-polls for updates after `offset`. `timeout_secs` is the server-side wait.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u32,
    ) -> anyhow::Result<Vec<Update>> {
        let params = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message".into(), "callback_query".into()],
        };
        self.call("getUpdates", &params).await
    }

    pub async fn send_message(&self, msg: &SendMessage) -> anyhow::Result<Message> {
        self.call("sendMessage", msg).await
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> anyhow::Result<bool> {
        let params = AnswerCallbackQuery {
            callback_query_id: callback_query_id.to_string(),
        };
        self.call("answerCallbackQuery", &params).await
    }
}

#[async_trait]
impl Notifier for BotClient {
    async fn notify(&self, recipient: i64, text: &str) -> Result<(), NotifyError> {
        self.send_message(&SendMessage::text(recipient, text))
            .await
            .map(|_| ())
            .map_err(|e| NotifyError {
                recipient,
                reason: format!("{e:#}"),
            })
    }
}

impl BotClientBuilder {
    /// Overrides the Bot API root, e.g. for a local Bot API server. A path
    /// component must end with `/`.
    pub fn with_api_url(mut self, api_url: &str) -> anyhow::Result<Self> {
        self.base = Url::parse(api_url).context("invalid api url")?;
        Ok(self)
    }

    /// Must exceed the long-poll timeout passed to `get_updates`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<BotClient> {
        if let Some(client) = self.client {
            return Ok(BotClient {
                base: self.base,
                token: self.token,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(BotClient {
            base: self.base,
            token: self.token,
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use types::{InlineKeyboardButton, InlineKeyboardMarkup, ReplyMarkup};

    const TOKEN: &str = "123:abc";

    fn client(server: &MockServer) -> BotClient {
        BotClient::builder(TOKEN)
            .unwrap()
            .with_api_url(&server.base_url())
            .unwrap()
            .build()
            .unwrap()
    }

    fn message_json(chat: i64, text: &str) -> serde_json::Value {
        json!({
            "message_id": 7,
            "chat": { "id": chat, "type": "private" },
            "from": { "id": chat, "is_bot": false, "first_name": "Op" },
            "date": 1_700_000_000,
            "text": text
        })
    }

    #[tokio::test]
    async fn get_updates_parses_messages_and_callbacks() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/bot{TOKEN}/getUpdates"))
                .json_body_partial(r#"{"offset": 41, "timeout": 30}"#);
            then.status(200).json_body(json!({
                "ok": true,
                "result": [
                    { "update_id": 41, "message": message_json(10, "/new_order") },
                    { "update_id": 42, "callback_query": {
                        "id": "cb-1",
                        "from": { "id": 10, "is_bot": false, "first_name": "Op" },
                        "message": message_json(10, "Выберите пирог"),
                        "chat_instance": "x",
                        "data": "item:3"
                    }}
                ]
            }));
        });

        let updates = client(&server).get_updates(Some(41), 30).await.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates[0].message.as_ref().unwrap().text.as_deref(),
            Some("/new_order")
        );
        assert_eq!(updates[0].chat_id(), Some(10));
        let cb = updates[1].callback_query.as_ref().unwrap();
        assert_eq!(cb.data.as_deref(), Some("item:3"));
        assert_eq!(cb.from.id, 10);
        assert_eq!(updates[1].chat_id(), Some(10));
        mock.assert();
    }

    #[tokio::test]
    async fn send_message_serializes_inline_keyboard() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/bot{TOKEN}/sendMessage"))
                .json_body(json!({
                    "chat_id": 10,
                    "text": "Выберите",
                    "reply_markup": {
                        "inline_keyboard": [[{ "text": "Яблочный", "callback_data": "item:8" }]]
                    }
                }));
            then.status(200)
                .json_body(json!({ "ok": true, "result": message_json(10, "Выберите") }));
        });

        let msg = SendMessage {
            chat_id: 10,
            text: "Выберите".into(),
            reply_markup: Some(ReplyMarkup::Inline(InlineKeyboardMarkup {
                inline_keyboard: vec![vec![InlineKeyboardButton {
                    text: "Яблочный".into(),
                    callback_data: "item:8".into(),
                }]],
            })),
        };
        let sent = client(&server).send_message(&msg).await.unwrap();
        assert_eq!(sent.chat.id, 10);
        mock.assert();
    }

    #[tokio::test]
    async fn api_errors_carry_description() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(format!("/bot{TOKEN}/sendMessage"));
            then.status(403).json_body(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            }));
        });

        let err = client(&server)
            .send_message(&SendMessage::text(10, "hi"))
            .await
            .unwrap_err();
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.code, Some(403));
        assert!(api.description.contains("blocked"));
    }

    #[tokio::test]
    async fn notifier_maps_failures_per_recipient() {
        let server = MockServer::start();
        let ok = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/bot{TOKEN}/sendMessage"))
                .json_body_partial(r#"{"chat_id": 1}"#);
            then.status(200)
                .json_body(json!({ "ok": true, "result": message_json(1, "r") }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path(format!("/bot{TOKEN}/sendMessage"))
                .json_body_partial(r#"{"chat_id": 2}"#);
            then.status(400).json_body(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            }));
        });

        let bot = client(&server);
        bot.notify(1, "r").await.unwrap();
        let err = bot.notify(2, "r").await.unwrap_err();
        assert_eq!(err.recipient, 2);
        assert!(err.reason.contains("chat not found"));
        ok.assert();
    }

    #[tokio::test]
    async fn answer_callback_query_returns_flag() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/bot{TOKEN}/answerCallbackQuery"))
                .json_body(json!({ "callback_query_id": "cb-1" }));
            then.status(200).json_body(json!({ "ok": true, "result": true }));
        });
        assert!(client(&server).answer_callback_query("cb-1").await.unwrap());
        mock.assert();
    }

    #[test]
    fn builder_rejects_empty_token() {
        assert!(BotClient::builder("  ").is_err());
    }
}

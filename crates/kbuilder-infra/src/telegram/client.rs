//! TelegramClient -- HTTP Bot API client.
//!
//! Long-polls `getUpdates` and sends replies. The bot token is part of every
//! method URL, so request errors are stripped of their URL before they are
//! turned into [`TransportError`]s.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use kbuilder_core::presentation::render::RenderedMessage;
use kbuilder_types::error::TransportError;

use super::types::{
    AnswerCallbackQueryRequest, ApiResponse, GetUpdatesRequest, SendMessageRequest, Update, User,
};

/// Update kinds the bot subscribes to.
const ALLOWED_UPDATES: [&str; 2] = ["message", "callback_query"];

/// Slack on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Result of one `getUpdates` call.
#[derive(Debug, Default)]
pub struct UpdateBatch {
    /// Updates that deserialized cleanly.
    pub updates: Vec<Update>,
    /// Offset for the next poll: one past the highest `update_id` seen,
    /// including updates that failed to deserialize.
    pub next_offset: Option<i64>,
}

/// Telegram Bot API client.
pub struct TelegramClient {
    client: reqwest::Client,
    api_url: String,
    token: SecretString,
    poll_timeout: Duration,
}

impl TelegramClient {
    /// Create a client. `poll_timeout` is the server-side long-poll wait.
    pub fn new(
        api_url: impl Into<String>,
        token: SecretString,
        poll_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(poll_timeout + POLL_GRACE)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            token,
            poll_timeout,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_url.trim_end_matches('/'),
            self.token.expose_secret()
        )
    }

    /// Call one Bot API method and unwrap its `{ok, result}` envelope.
    async fn call<Req, Resp>(&self, method: &str, body: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.without_url().to_string()))?;

        // Errors come back as JSON envelopes too, with a non-2xx status.
        let status = response.status();
        let envelope: ApiResponse<Resp> = response.json().await.map_err(|e| {
            TransportError::Deserialization(format!(
                "{method} returned HTTP {status} with an unreadable body: {}",
                e.without_url()
            ))
        })?;

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                error_code,
                description,
                ..
            } => Err(TransportError::Api {
                code: error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: description.unwrap_or_else(|| format!("{method} failed")),
            }),
        }
    }

    /// Identity of the bot behind the token. Used as a startup credential check.
    pub async fn get_me(&self) -> Result<User, TransportError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates after `offset`.
    ///
    /// Entries that do not deserialize as [`Update`] are logged and skipped,
    /// but still move the offset forward so they are not redelivered.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<UpdateBatch, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES.to_vec(),
        };
        let raw: Vec<serde_json::Value> = self.call("getUpdates", &request).await?;

        let mut batch = UpdateBatch::default();
        for value in raw {
            let update_id = value.get("update_id").and_then(serde_json::Value::as_i64);
            if let Some(id) = update_id {
                batch.next_offset = Some(batch.next_offset.map_or(id + 1, |o| o.max(id + 1)));
            }

            match serde_json::from_value::<Update>(value) {
                Ok(update) => batch.updates.push(update),
                Err(e) => {
                    tracing::warn!(?update_id, error = %e, "malformed update skipped");
                }
            }
        }

        Ok(batch)
    }

    /// Send an HTML-formatted message with its optional inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: i64,
        message: &RenderedMessage,
    ) -> Result<(), TransportError> {
        let request = SendMessageRequest::html(chat_id, message);
        let _: serde_json::Value = self.call("sendMessage", &request).await?;
        Ok(())
    }

    /// Stop the client-side spinner on a pressed button.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TransportError> {
        let request = AnswerCallbackQueryRequest {
            callback_query_id: callback_query_id.to_string(),
        };
        let _: bool = self.call("answerCallbackQuery", &request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbuilder_core::presentation::render::Button;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:abc";

    fn client(server: &MockServer) -> TelegramClient {
        TelegramClient::new(
            server.uri(),
            SecretString::from(TOKEN.to_string()),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_updates_parses_and_advances_offset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/getUpdates")))
            .and(body_partial_json(serde_json::json!({
                "offset": 10,
                "timeout": 1,
                "allowed_updates": ["message", "callback_query"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": [
                    {
                        "update_id": 10,
                        "message": {
                            "message_id": 1,
                            "from": { "id": 42, "is_bot": false },
                            "chat": { "id": 42 },
                            "text": "/build"
                        }
                    },
                    { "update_id": 11, "message": "not an object" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let batch = client(&server).get_updates(Some(10)).await.unwrap();

        assert_eq!(batch.updates.len(), 1);
        assert_eq!(batch.updates[0].update_id, 10);
        assert_eq!(batch.next_offset, Some(12));
    }

    #[tokio::test]
    async fn test_empty_poll_keeps_offset_unset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/getUpdates")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "ok": true, "result": [] })),
            )
            .mount(&server)
            .await;

        let batch = client(&server).get_updates(None).await.unwrap();
        assert!(batch.updates.is_empty());
        assert_eq!(batch.next_offset, None);
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/getMe")))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let err = client(&server).get_me().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Api { code: 401, ref description } if description == "Unauthorized"
        ));
    }

    #[tokio::test]
    async fn test_unreadable_body_is_deserialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/getMe")))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = client(&server).get_me().await.unwrap_err();
        assert!(matches!(err, TransportError::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_send_message_posts_html_and_keyboard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .and(body_partial_json(serde_json::json!({
                "chat_id": -100,
                "text": "<b>Summary</b>",
                "parse_mode": "HTML",
                "reply_markup": {
                    "inline_keyboard": [[{ "text": "Go", "callback_data": "kb:awaiting_confirmation:confirm" }]]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "message_id": 77, "chat": { "id": -100 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let message = RenderedMessage {
            text: "<b>Summary</b>".to_string(),
            keyboard: vec![vec![Button {
                label: "Go".to_string(),
                data: "kb:awaiting_confirmation:confirm".to_string(),
            }]],
        };
        client(&server).send_message(-100, &message).await.unwrap();
    }

    #[tokio::test]
    async fn test_answer_callback_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/answerCallbackQuery")))
            .and(body_partial_json(serde_json::json!({ "callback_query_id": "cb1" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "ok": true, "result": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        client(&server).answer_callback_query("cb1").await.unwrap();
    }

    #[tokio::test]
    async fn test_network_error_does_not_leak_token() {
        let client = TelegramClient::new(
            "http://127.0.0.1:9",
            SecretString::from(TOKEN.to_string()),
            Duration::from_secs(1),
        )
        .unwrap();

        let err = client.get_me().await.unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
        assert!(!err.to_string().contains(TOKEN));
    }
}

//! `reqwest`-based implementation of [`MaxApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{ClientBuilder, Response};
use serde_json::{Value, json};
use tracing::{debug, trace};

use maxling_core::model::{BotInfo, Message, UpdateKind};

use crate::api::{ChatAction, MAX_TEXT_LEN, MaxApi, SendOptions, SendTarget, UpdatePage};
use crate::error::{ApiError, ApiResult};

/// Production endpoint of the Max Bot API.
pub const DEFAULT_API_URL: &str = "https://platform-api.max.ru";

/// Slack added on top of the long-poll timeout before the HTTP layer gives
/// up on an `/updates` request.
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);

/// HTTP client for the Max Bot API.
///
/// Cheap to clone; all methods take `&self`.
#[derive(Clone)]
pub struct MaxClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MaxClient {
    /// Creates a client for the production endpoint.
    ///
    /// Fails synchronously when the token is empty — a missing credential
    /// must not survive until the first poll cycle.
    pub fn new(token: impl Into<String>) -> ApiResult<Self> {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// Creates a client against a custom endpoint (self-hosted gateways,
    /// test servers).
    pub fn with_api_url(token: impl Into<String>, api_url: impl Into<String>) -> ApiResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ApiError::MissingToken);
        }
        let http = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Checks the status and decodes the body as `T`.
    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> ApiResult<T> {
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn check_status(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl MaxApi for MaxClient {
    async fn get_me(&self) -> ApiResult<BotInfo> {
        let response = self
            .http
            .get(self.url("/me"))
            .header("Authorization", &self.token)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_updates(
        &self,
        marker: Option<i64>,
        limit: u32,
        timeout_secs: u32,
        types: Option<&[UpdateKind]>,
    ) -> ApiResult<UpdatePage> {
        if !(1..=1000).contains(&limit) {
            return Err(ApiError::InvalidArgument(format!(
                "limit must be in 1..=1000, got {limit}"
            )));
        }
        if timeout_secs > 90 {
            return Err(ApiError::InvalidArgument(format!(
                "timeout must be in 0..=90 seconds, got {timeout_secs}"
            )));
        }

        let mut request = self
            .http
            .get(self.url("/updates"))
            .header("Authorization", &self.token)
            // The request legitimately blocks for the whole long-poll window.
            .timeout(Duration::from_secs(timeout_secs as u64) + LONG_POLL_GRACE)
            .query(&[("limit", limit), ("timeout", timeout_secs)]);
        if let Some(marker) = marker {
            request = request.query(&[("marker", marker)]);
        }
        if let Some(types) = types {
            let csv = types
                .iter()
                .map(UpdateKind::as_str)
                .collect::<Vec<_>>()
                .join(",");
            request = request.query(&[("types", csv)]);
        }

        trace!(?marker, limit, timeout_secs, "fetching updates");
        let page: UpdatePage = Self::decode(request.send().await?).await?;
        debug!(
            count = page.updates.len(),
            marker = ?page.marker,
            "fetched update page"
        );
        Ok(page)
    }

    async fn send_message(
        &self,
        target: SendTarget,
        text: &str,
        options: SendOptions,
    ) -> ApiResult<Message> {
        if text.chars().count() > MAX_TEXT_LEN {
            return Err(ApiError::InvalidArgument(format!(
                "message text exceeds {MAX_TEXT_LEN} characters"
            )));
        }

        let mut request = self
            .http
            .post(self.url("/messages"))
            .header("Authorization", &self.token)
            .query(&[(
                "disable_link_preview",
                options.disable_link_preview.to_string(),
            )]);
        request = match target {
            SendTarget::Chat(chat_id) => request.query(&[("chat_id", chat_id)]),
            SendTarget::User(user_id) => request.query(&[("user_id", user_id)]),
        };

        let body = json!({
            "text": text,
            "attachments": options.attachments,
            "link": null,
            "notify": options.notify,
        });

        let result: Value = Self::decode(request.json(&body).send().await?).await?;
        let message = result
            .get("message")
            .cloned()
            .ok_or_else(|| ApiError::Decode("response has no 'message' field".into()))?;
        serde_json::from_value(message).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn edit_message(&self, message_id: &str, text: &str) -> ApiResult<()> {
        let response = self
            .http
            .put(self.url("/messages"))
            .header("Authorization", &self.token)
            .query(&[("message_id", message_id)])
            .json(&json!({ "text": text, "attachments": null, "link": null }))
            .send()
            .await?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn delete_message(&self, message_id: &str) -> ApiResult<()> {
        let response = self
            .http
            .delete(self.url("/messages"))
            .header("Authorization", &self.token)
            .query(&[("message_id", message_id)])
            .send()
            .await?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn send_action(&self, chat_id: i64, action: ChatAction) -> ApiResult<()> {
        let response = self
            .http
            .post(self.url(&format!("/chats/{chat_id}/actions")))
            .header("Authorization", &self.token)
            .json(&json!({ "action": action.as_str() }))
            .send()
            .await?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        notification: Option<&str>,
    ) -> ApiResult<()> {
        let mut body = json!({});
        if let Some(text) = text {
            body["message"] = json!({ "text": text, "attachments": [], "link": null });
        }
        if let Some(notification) = notification {
            body["notification"] = json!(notification);
        }

        let response = self
            .http
            .post(self.url("/answers"))
            .header("Authorization", &self.token)
            .query(&[("callback_id", callback_id)])
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_rejected_at_construction() {
        assert!(matches!(MaxClient::new(""), Err(ApiError::MissingToken)));
        assert!(matches!(MaxClient::new("   "), Err(ApiError::MissingToken)));
        assert!(MaxClient::new("token").is_ok());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = MaxClient::with_api_url("t", "https://example.test/").unwrap();
        assert_eq!(client.url("/me"), "https://example.test/me");
    }

    #[tokio::test]
    async fn get_updates_validates_ranges() {
        let client = MaxClient::new("t").unwrap();
        assert!(matches!(
            client.get_updates(None, 0, 30, None).await,
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.get_updates(None, 1001, 30, None).await,
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.get_updates(None, 100, 91, None).await,
            Err(ApiError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn oversized_text_is_rejected_before_sending() {
        let client = MaxClient::new("t").unwrap();
        let text = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(matches!(
            client
                .send_message(SendTarget::Chat(1), &text, SendOptions::default())
                .await,
            Err(ApiError::InvalidArgument(_))
        ));
    }
}

//! Gmail REST client — list/fetch message metadata, modify labels.
//!
//! Thin I/O glue over `users.messages` and `users.labels`. Label mutations
//! go through `users.messages.modify`, which Gmail treats idempotently:
//! removing an absent label or adding a present one is a no-op success.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::auth::TokenProvider;
use crate::client::MailClient;
use crate::error::ClientError;

const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// The unread marker label on Gmail.
pub const UNREAD_LABEL: &str = "UNREAD";

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// Message metadata as returned by `users.messages.get?format=metadata`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageMetadata {
    pub id: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, rename = "labelIds")]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl MessageMetadata {
    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ListLabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct Label {
    id: String,
    name: String,
}

// ── Client ──────────────────────────────────────────────────────────

/// Gmail API client for a single authenticated session.
pub struct GmailClient {
    http: reqwest::Client,
    auth: TokenProvider,
    base_url: String,
}

impl GmailClient {
    pub fn new(http: reqwest::Client, auth: TokenProvider) -> Self {
        Self {
            http,
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// List message ids under the given labels, newest first.
    pub async fn list_messages(
        &self,
        label_ids: &[String],
        max_results: u32,
    ) -> Result<Vec<String>, ClientError> {
        let token = self.auth.access_token().await?;
        let mut request = self
            .http
            .get(format!("{}/messages", self.base_url))
            .bearer_auth(token.expose_secret())
            .query(&[("maxResults", max_results.to_string())]);
        for label in label_ids {
            request = request.query(&[("labelIds", label)]);
        }

        let response = check_status(request.send().await?).await?;
        let parsed: ListMessagesResponse = response.json().await?;
        debug!(count = parsed.messages.len(), "Listed messages");
        Ok(parsed.messages.into_iter().map(|m| m.id).collect())
    }

    /// Fetch one message's metadata (headers + snippet, no body parts).
    pub async fn get_metadata(&self, message_id: &str) -> Result<MessageMetadata, ClientError> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(format!("{}/messages/{message_id}", self.base_url))
            .bearer_auth(token.expose_secret())
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "To"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "Date"),
            ])
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Add/remove labels on a message via `users.messages.modify`.
    async fn modify(
        &self,
        message_id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<(), ClientError> {
        let token = self.auth.access_token().await?;
        let body = json!({
            "addLabelIds": add,
            "removeLabelIds": remove,
        });

        let response = self
            .http
            .post(format!("{}/messages/{message_id}/modify", self.base_url))
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl MailClient for GmailClient {
    async fn mark_as_read(&self, message_id: &str) -> Result<(), ClientError> {
        self.modify(message_id, &[], &[UNREAD_LABEL]).await
    }

    async fn add_label(&self, message_id: &str, label_id: &str) -> Result<(), ClientError> {
        self.modify(message_id, &[label_id], &[]).await
    }

    async fn resolve_label(&self, name: &str) -> Result<String, ClientError> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(format!("{}/labels", self.base_url))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let response = check_status(response).await?;
        let parsed: ListLabelsResponse = response.json().await?;
        parsed
            .labels
            .into_iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .map(|l| l.id)
            .ok_or_else(|| ClientError::LabelNotFound(name.to_string()))
    }
}

/// Turn a non-2xx response into a `ClientError::Api` with the body retained.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

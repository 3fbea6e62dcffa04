//! Destination sinks
//!
//! A sink delivers notifications to chat destinations and edits them in
//! place later. Delivery is best effort.

use async_trait::async_trait;
use filo_core::{DestinationId, MessageHandle};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{TrackerError, TrackerResult};

/// One titled field of a rich payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadField {
    pub name: String,
    pub value: String,
}

/// Structured part of a notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<PayloadField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl RichPayload {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(PayloadField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// A message as delivered to a destination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub content: String,
    pub rich: Option<RichPayload>,
}

impl Notification {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rich: None,
        }
    }

    pub fn with_rich(mut self, rich: RichPayload) -> Self {
        self.rich = Some(rich);
        self
    }
}

/// Sink delivery failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Destination no longer exists
    #[error("destination unreachable")]
    Unreachable,

    /// Destination temporarily rejects us
    #[error("destination forbidden")]
    Forbidden,

    /// Edited message no longer exists
    #[error("message not found")]
    NotFound,

    #[error("delivery failed: {0}")]
    Other(String),
}

/// Delivers and edits notifications
#[async_trait]
pub trait DestinationSink: Send + Sync {
    async fn send(
        &self,
        destination: DestinationId,
        notification: &Notification,
    ) -> Result<MessageHandle, SinkError>;

    async fn edit(
        &self,
        destination: DestinationId,
        handle: &MessageHandle,
        notification: &Notification,
    ) -> Result<(), SinkError>;
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    content: &'a str,
    embeds: Vec<&'a RichPayload>,
}

#[derive(Deserialize)]
struct WebhookMessage {
    id: String,
}

/// Posts to per-destination chat webhooks
///
/// `send` posts with `?wait=true` to learn the message id, `edit` patches
/// `{webhook}/messages/{id}`.
pub struct WebhookSink {
    client: Client,
    urls: RwLock<HashMap<DestinationId, String>>,
}

impl WebhookSink {
    pub fn new(timeout_secs: u64) -> TrackerResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TrackerError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            urls: RwLock::new(HashMap::new()),
        })
    }

    /// Load a `{"<destination>": "<webhook url>"}` table
    pub async fn load(path: impl AsRef<Path>, timeout_secs: u64) -> TrackerResult<Self> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        let table: HashMap<DestinationId, String> = serde_json::from_str(&json)?;
        let sink = Self::new(timeout_secs)?;
        *sink.urls.write().await = table;
        Ok(sink)
    }

    pub async fn register(&self, destination: DestinationId, url: impl Into<String>) {
        self.urls.write().await.insert(destination, url.into());
    }

    async fn url(&self, destination: DestinationId) -> Result<String, SinkError> {
        self.urls
            .read()
            .await
            .get(&destination)
            .map(|u| u.trim_end_matches('/').to_string())
            .ok_or(SinkError::Unreachable)
    }
}

fn classify(status: StatusCode, missing: SinkError) -> Result<(), SinkError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(missing),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SinkError::Forbidden),
        s => Err(SinkError::Other(format!("HTTP {}", s))),
    }
}

#[async_trait]
impl DestinationSink for WebhookSink {
    async fn send(
        &self,
        destination: DestinationId,
        notification: &Notification,
    ) -> Result<MessageHandle, SinkError> {
        let url = self.url(destination).await?;
        let body = WebhookBody {
            content: &notification.content,
            embeds: notification.rich.iter().collect(),
        };

        let response = self
            .client
            .post(format!("{}?wait=true", url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::Other(e.to_string()))?;

        classify(response.status(), SinkError::Unreachable)?;
        let message: WebhookMessage = response
            .json()
            .await
            .map_err(|e| SinkError::Other(e.to_string()))?;
        Ok(MessageHandle::new(message.id))
    }

    async fn edit(
        &self,
        destination: DestinationId,
        handle: &MessageHandle,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        let url = self.url(destination).await?;
        let body = WebhookBody {
            content: &notification.content,
            embeds: notification.rich.iter().collect(),
        };

        let response = self
            .client
            .patch(format!("{}/messages/{}", url, handle))
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::Other(e.to_string()))?;

        classify(response.status(), SinkError::NotFound)
    }
}

/// Logs deliveries instead of sending them
#[derive(Debug, Default)]
pub struct LogSink {
    next_id: AtomicU64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DestinationSink for LogSink {
    async fn send(
        &self,
        destination: DestinationId,
        notification: &Notification,
    ) -> Result<MessageHandle, SinkError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        info!(destination = %destination, message = id, "{}", notification.content);
        Ok(MessageHandle::new(id.to_string()))
    }

    async fn edit(
        &self,
        destination: DestinationId,
        handle: &MessageHandle,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        info!(destination = %destination, message = %handle, "(edit) {}", notification.content);
        Ok(())
    }
}

/// A delivery recorded by [`MockSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub destination: DestinationId,
    pub handle: MessageHandle,
    pub notification: Notification,
}

/// Recording sink for tests
#[derive(Default)]
pub struct MockSink {
    next_id: AtomicU64,
    sent: Mutex<Vec<Delivery>>,
    edits: Mutex<Vec<Delivery>>,
    failures: Mutex<HashMap<DestinationId, SinkError>>,
    deleted: Mutex<Vec<MessageHandle>>,
    delay: Mutex<Option<std::time::Duration>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every delivery to `destination` with `error`
    pub async fn fail_with(&self, destination: DestinationId, error: SinkError) {
        self.failures.lock().await.insert(destination, error);
    }

    /// Hold every send for `delay` before recording it
    pub async fn set_delay(&self, delay: Option<std::time::Duration>) {
        *self.delay.lock().await = delay;
    }

    /// Simulate a message deleted on the platform
    pub async fn delete_message(&self, handle: &MessageHandle) {
        self.deleted.lock().await.push(handle.clone());
    }

    pub async fn sent(&self) -> Vec<Delivery> {
        self.sent.lock().await.clone()
    }

    pub async fn edits(&self) -> Vec<Delivery> {
        self.edits.lock().await.clone()
    }

    pub async fn sent_to(&self, destination: DestinationId) -> Vec<Delivery> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|d| d.destination == destination)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DestinationSink for MockSink {
    async fn send(
        &self,
        destination: DestinationId,
        notification: &Notification,
    ) -> Result<MessageHandle, SinkError> {
        if let Some(error) = self.failures.lock().await.get(&destination) {
            return Err(error.clone());
        }
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let handle = MessageHandle::new(format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1));
        debug!(destination = %destination, message = %handle, "Mock delivery");
        self.sent.lock().await.push(Delivery {
            destination,
            handle: handle.clone(),
            notification: notification.clone(),
        });
        Ok(handle)
    }

    async fn edit(
        &self,
        destination: DestinationId,
        handle: &MessageHandle,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        if let Some(error) = self.failures.lock().await.get(&destination) {
            return Err(error.clone());
        }
        if self.deleted.lock().await.contains(handle) {
            return Err(SinkError::NotFound);
        }
        self.edits.lock().await.push(Delivery {
            destination,
            handle: handle.clone(),
            notification: notification.clone(),
        });
        Ok(())
    }
}

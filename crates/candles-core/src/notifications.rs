//! File-arrival notifications: polling, key extraction and acknowledgement.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::repository::BoxFuture;

/// One delivered queue message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueMessage {
    pub body: Option<String>,
    pub receipt_handle: Option<String>,
}

/// Queue carrying object-storage event notifications.
pub trait NotificationQueue: Send + Sync {
    /// Receive whatever is available right now. No internal long-poll loop.
    fn receive<'a>(&'a self) -> BoxFuture<'a, Result<Vec<QueueMessage>, ServiceError>>;

    /// Delete the given messages, stopping at the first failure.
    fn delete<'a>(&'a self, receipt_handles: &'a [String])
        -> BoxFuture<'a, Result<(), ServiceError>>;
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Records", default)]
    records: Vec<Value>,
}

/// Object keys referenced by an S3 event notification body, in record
/// order. Records without an `s3.object.key` are skipped; non-string keys
/// are rendered as their JSON text and `null` as an empty key. A body that is
/// not an envelope yields nothing.
pub fn extract_object_keys(body: &str) -> Vec<String> {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(error = %error, "ignoring malformed notification body");
            return Vec::new();
        }
    };

    envelope
        .records
        .iter()
        .filter_map(|record| record.pointer("/s3/object/key"))
        .map(key_text)
        .collect()
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct NotificationConsumer {
    queue: Arc<dyn NotificationQueue>,
}

impl NotificationConsumer {
    pub fn new(queue: Arc<dyn NotificationQueue>) -> Self {
        Self { queue }
    }

    /// Run one poll: collect keys from every message, then acknowledge every
    /// delivered message whether or not it carried a key.
    ///
    /// Keys are not deduplicated. An acknowledgement failure is returned as
    /// is; redelivery is left to the queue.
    pub async fn poll_object_keys(&self) -> Result<Vec<String>, ServiceError> {
        let messages = self.queue.receive().await?;

        let mut keys = Vec::new();
        let mut receipt_handles = Vec::with_capacity(messages.len());
        for message in messages {
            if let Some(body) = message.body.as_deref() {
                keys.extend(extract_object_keys(body));
            }
            if let Some(handle) = message.receipt_handle {
                receipt_handles.push(handle);
            }
        }

        if !receipt_handles.is_empty() {
            self.queue.delete(&receipt_handles).await?;
        }

        info!(count = keys.len(), keys = ?keys, "object keys received");
        Ok(keys)
    }
}

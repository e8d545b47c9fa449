use aws_sdk_sqs::config::{BehaviorVersion, Region};
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;

use crate::config::SqsConfig;
use crate::error::ServiceError;
use crate::notifications::{NotificationQueue, QueueMessage};
use crate::repository::BoxFuture;

/// [`NotificationQueue`] backed by an SQS queue resolved by name.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Build a client for the configured region and resolve the queue URL.
    pub async fn connect(config: &SqsConfig) -> Result<Self, ServiceError> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        let client = Client::new(&sdk_config);

        let output = client
            .get_queue_url()
            .queue_name(config.queue.as_str())
            .send()
            .await
            .map_err(|error| {
                ServiceError::transport(format!(
                    "resolving queue '{}' failed: {}",
                    config.queue,
                    DisplayErrorContext(&error)
                ))
            })?;
        let queue_url = output.queue_url.ok_or_else(|| {
            ServiceError::transport(format!("queue '{}' has no url", config.queue))
        })?;

        Ok(Self::with_client(client, queue_url))
    }

    pub fn with_client(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

impl NotificationQueue for SqsQueue {
    fn receive<'a>(&'a self) -> BoxFuture<'a, Result<Vec<QueueMessage>, ServiceError>> {
        Box::pin(async move {
            let output = self
                .client
                .receive_message()
                .queue_url(self.queue_url.as_str())
                .send()
                .await
                .map_err(|error| {
                    ServiceError::transport(format!(
                        "receiving messages failed: {}",
                        DisplayErrorContext(&error)
                    ))
                })?;

            Ok(output
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|message| QueueMessage {
                    body: message.body,
                    receipt_handle: message.receipt_handle,
                })
                .collect())
        })
    }

    fn delete<'a>(
        &'a self,
        receipt_handles: &'a [String],
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            for handle in receipt_handles {
                self.client
                    .delete_message()
                    .queue_url(self.queue_url.as_str())
                    .receipt_handle(handle.as_str())
                    .send()
                    .await
                    .map_err(|error| {
                        ServiceError::transport(format!(
                            "deleting message failed: {}",
                            DisplayErrorContext(&error)
                        ))
                    })?;
            }
            Ok(())
        })
    }
}

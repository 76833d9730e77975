//! SNS topic + SQS queue adapter.
//!
//! Each subscription is an SQS queue subscribed to the topic with raw message delivery
//! and a filter policy on the `event` message attribute. Dead-lettering is left to the
//! queue's redrive policy.

use crate::error::{BusError, BusResult};
use crate::traits::{Delivery, DeliverySource, EventBus};
use async_trait::async_trait;
use aws_sdk_sns::types::MessageAttributeValue as SnsAttributeValue;
use aws_sdk_sns::Client as SnsClient;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use aws_sdk_sqs::Client as SqsClient;
use std::collections::BTreeMap;
use std::time::Duration;
use vitrine_core::EventMessage;

/// SQS caps a single receive at 10 messages.
const MAX_RECEIVE_BATCH: usize = 10;

#[derive(Clone)]
pub struct AwsBus {
    sns: SnsClient,
    sqs: SqsClient,
    topic_arn: String,
    queue_urls: BTreeMap<String, String>,
    wait_time_seconds: i32,
}

impl AwsBus {
    pub fn new(
        sns: SnsClient,
        sqs: SqsClient,
        topic_arn: impl Into<String>,
        queue_urls: BTreeMap<String, String>,
    ) -> Self {
        Self {
            sns,
            sqs,
            topic_arn: topic_arn.into(),
            queue_urls,
            wait_time_seconds: 1,
        }
    }

    /// Build clients from the default AWS credential chain.
    pub async fn from_env(
        region: Option<&str>,
        topic_arn: impl Into<String>,
        queue_urls: BTreeMap<String, String>,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let shared = loader.load().await;
        tracing::info!(region = ?shared.region(), "AWS SNS/SQS clients initialized");
        Self::new(
            SnsClient::new(&shared),
            SqsClient::new(&shared),
            topic_arn,
            queue_urls,
        )
    }

    fn queue_url(&self, subscription: &str) -> BusResult<&str> {
        self.queue_urls
            .get(subscription)
            .map(String::as_str)
            .ok_or_else(|| BusError::UnknownSubscription(subscription.to_string()))
    }
}

#[async_trait]
impl EventBus for AwsBus {
    async fn publish_message(&self, message: EventMessage) -> BusResult<String> {
        let mut request = self
            .sns
            .publish()
            .topic_arn(&self.topic_arn)
            .message(message.body.clone());

        for (name, value) in &message.attributes {
            let attribute = SnsAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| BusError::Publish(e.to_string()))?;
            request = request.message_attributes(name, attribute);
        }

        let output = request.send().await.map_err(|e| {
            tracing::error!(
                error = %e,
                topic_arn = %self.topic_arn,
                event = message.event_attribute().unwrap_or("<none>"),
                "SNS publish failed"
            );
            BusError::Publish(e.to_string())
        })?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl DeliverySource for AwsBus {
    async fn receive(&self, subscription: &str, max: usize) -> BusResult<Vec<Delivery>> {
        let queue_url = self.queue_url(subscription)?;
        let max = max.clamp(1, MAX_RECEIVE_BATCH) as i32;

        let output = self
            .sqs
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max)
            .wait_time_seconds(self.wait_time_seconds)
            .message_attribute_names("All")
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| BusError::Receive(e.to_string()))?;

        let mut deliveries = Vec::new();
        for message in output.messages() {
            let Some(receipt) = message.receipt_handle() else {
                tracing::warn!(subscription = %subscription, "SQS message without receipt handle");
                continue;
            };

            let attributes: BTreeMap<String, String> = message
                .message_attributes()
                .map(|attrs| {
                    attrs
                        .iter()
                        .filter_map(|(name, value)| {
                            value.string_value().map(|v| (name.clone(), v.to_string()))
                        })
                        .collect()
                })
                .unwrap_or_default();

            let attempt = message
                .attributes()
                .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
                .and_then(|count| count.parse::<u32>().ok())
                .unwrap_or(1);

            deliveries.push(Delivery {
                message_id: message.message_id().unwrap_or_default().to_string(),
                receipt: receipt.to_string(),
                attempt,
                message: EventMessage {
                    attributes,
                    body: message.body().unwrap_or_default().to_string(),
                },
            });
        }

        Ok(deliveries)
    }

    async fn ack(&self, subscription: &str, receipt: &str) -> BusResult<()> {
        let queue_url = self.queue_url(subscription)?;
        self.sqs
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| BusError::Settle(e.to_string()))?;
        Ok(())
    }

    async fn nack(&self, subscription: &str, receipt: &str, delay: Duration) -> BusResult<()> {
        let queue_url = self.queue_url(subscription)?;
        // SQS visibility timeout is capped at 12 hours.
        let timeout = delay.as_secs().min(43_200) as i32;
        self.sqs
            .change_message_visibility()
            .queue_url(queue_url)
            .receipt_handle(receipt)
            .visibility_timeout(timeout)
            .send()
            .await
            .map_err(|e| BusError::Settle(e.to_string()))?;
        Ok(())
    }
}

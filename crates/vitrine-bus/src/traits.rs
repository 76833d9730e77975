use crate::error::BusResult;
use async_trait::async_trait;
use std::time::Duration;
use vitrine_core::{Event, EventKind, EventMessage};

/// A named subscription and the event kinds it receives.
///
/// An empty filter receives every message, including ones without a valid `event`
/// attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    pub name: String,
    pub filter: Vec<EventKind>,
}

impl SubscriptionSpec {
    pub fn new(name: impl Into<String>, filter: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            name: name.into(),
            filter: filter.into_iter().collect(),
        }
    }

    pub fn accepts(&self, message: &EventMessage) -> bool {
        if self.filter.is_empty() {
            return true;
        }
        match message.kind() {
            Ok(kind) => self.filter.contains(&kind),
            Err(_) => false,
        }
    }
}

/// One delivery of a message to a subscription.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: String,
    /// Handle used to settle this particular delivery.
    pub receipt: String,
    /// 1 on first delivery, incremented on every redelivery.
    pub attempt: u32,
    pub message: EventMessage,
}

/// Publisher side of the bus.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an already encoded message, returning the bus message id.
    async fn publish_message(&self, message: EventMessage) -> BusResult<String>;

    /// Validate, encode and publish an event.
    async fn publish(&self, event: &Event) -> BusResult<String> {
        event.validate()?;
        let message = event.to_message()?;
        self.publish_message(message).await
    }
}

/// Consumer side of the bus.
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Receive up to `max` visible deliveries for `subscription`.
    async fn receive(&self, subscription: &str, max: usize) -> BusResult<Vec<Delivery>>;

    /// The delivery was handled (or is permanently unprocessable); drop it.
    async fn ack(&self, subscription: &str, receipt: &str) -> BusResult<()>;

    /// Hand the delivery back for redelivery after `delay`.
    async fn nack(&self, subscription: &str, receipt: &str, delay: Duration) -> BusResult<()>;
}

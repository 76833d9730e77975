use async_trait::async_trait;
use std::fmt::{Display, Formatter, Result as FmtResult};
use vitrine_bus::Delivery;
use vitrine_core::{Event, EventKind, EventMessage};

/// What the bus should do with a delivery once a consumer is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handled; acknowledge.
    Completed,
    /// Transient failure; hand back for redelivery.
    Retry(String),
    /// Can never succeed; acknowledge without retry.
    Discard(String),
}

impl DeliveryOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DeliveryOutcome::Completed)
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, DeliveryOutcome::Retry(_))
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, DeliveryOutcome::Discard(_))
    }
}

impl Display for DeliveryOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DeliveryOutcome::Completed => f.write_str("completed"),
            DeliveryOutcome::Retry(reason) => write!(f, "retry: {}", reason),
            DeliveryOutcome::Discard(reason) => write!(f, "discard: {}", reason),
        }
    }
}

/// An asynchronous unit bound to one subscription.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Subscription name, also used in logs.
    fn name(&self) -> &'static str;

    /// Event kinds the subscription filters on.
    fn subscribes_to(&self) -> &'static [EventKind];

    async fn handle(&self, event: Event) -> DeliveryOutcome;
}

#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub message_id: String,
    pub receipt: String,
    pub attempt: u32,
    pub outcome: DeliveryOutcome,
}

/// Per-delivery outcomes of one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<DeliveryResult>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.count(DeliveryOutcome::is_completed)
    }

    pub fn retried(&self) -> usize {
        self.count(DeliveryOutcome::is_retry)
    }

    pub fn discarded(&self) -> usize {
        self.count(DeliveryOutcome::is_discard)
    }

    fn count(&self, predicate: impl Fn(&DeliveryOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Decode one message and hand it to `consumer`.
///
/// Messages that fail to decode or carry a kind the consumer does not handle are
/// poison and are discarded.
pub async fn process_message(consumer: &dyn EventConsumer, message: &EventMessage) -> DeliveryOutcome {
    let event = match Event::from_message(message) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(
                consumer = consumer.name(),
                error = %e,
                event = message.event_attribute().unwrap_or("<none>"),
                "Discarding undecodable message"
            );
            return DeliveryOutcome::Discard(e.to_string());
        }
    };

    if !consumer.subscribes_to().contains(&event.kind()) {
        tracing::warn!(
            consumer = consumer.name(),
            event = %event.kind(),
            "Discarding message outside subscription filter"
        );
        return DeliveryOutcome::Discard(format!("unexpected event kind {}", event.kind()));
    }

    consumer.handle(event).await
}

/// Process a batch sequentially. A failing delivery never stops the rest.
pub async fn process_batch(consumer: &dyn EventConsumer, deliveries: &[Delivery]) -> BatchReport {
    let mut report = BatchReport::default();

    for delivery in deliveries {
        let outcome = process_message(consumer, &delivery.message).await;
        tracing::debug!(
            consumer = consumer.name(),
            message_id = %delivery.message_id,
            attempt = delivery.attempt,
            outcome = %outcome,
            "Delivery processed"
        );
        report.results.push(DeliveryResult {
            message_id: delivery.message_id.clone(),
            receipt: delivery.receipt.clone(),
            attempt: delivery.attempt,
            outcome,
        });
    }

    if !report.is_empty() {
        tracing::info!(
            consumer = consumer.name(),
            batch_size = report.len(),
            completed = report.completed(),
            retried = report.retried(),
            discarded = report.discarded(),
            "Batch processed"
        );
    }

    report
}

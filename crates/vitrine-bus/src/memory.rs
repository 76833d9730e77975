//! In-process bus with per-subscription queues.
//!
//! Each published message is copied into every subscription whose filter accepts it.
//! Received deliveries stay in flight until acknowledged. A negatively acknowledged
//! delivery becomes visible again after its delay, until it has been delivered
//! `max_deliveries` times; after that it is moved to the subscription's dead-letter list,
//! which keeps only the most recent [`DEAD_LETTER_CAPACITY`] messages.
//!
//! The publish log behind [`MemoryBus::published`] is only kept by a bus built with
//! [`MemoryBus::recording`]; a plain bus holds nothing once its deliveries are acked.

use crate::error::{BusError, BusResult};
use crate::traits::{Delivery, DeliverySource, EventBus, SubscriptionSpec};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;
use vitrine_core::EventMessage;

pub const DEFAULT_MAX_DELIVERIES: u32 = 5;
pub const DEAD_LETTER_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
struct Queued {
    message_id: String,
    message: EventMessage,
    attempt: u32,
    visible_at: Instant,
}

#[derive(Debug)]
struct SubscriptionQueue {
    spec: SubscriptionSpec,
    ready: VecDeque<Queued>,
    in_flight: HashMap<String, Queued>,
    dead_letters: VecDeque<EventMessage>,
}

impl SubscriptionQueue {
    fn new(spec: SubscriptionSpec) -> Self {
        Self {
            spec,
            ready: VecDeque::new(),
            in_flight: HashMap::new(),
            dead_letters: VecDeque::new(),
        }
    }
}

#[derive(Debug, Default)]
struct BusState {
    subscriptions: BTreeMap<String, SubscriptionQueue>,
}

#[derive(Clone)]
pub struct MemoryBus {
    state: Arc<Mutex<BusState>>,
    published: Option<Arc<Mutex<Vec<EventMessage>>>>,
    max_deliveries: u32,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELIVERIES)
    }
}

impl MemoryBus {
    pub fn new(max_deliveries: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState::default())),
            published: None,
            max_deliveries: max_deliveries.max(1),
        }
    }

    /// Keep every published message for inspection through [`MemoryBus::published`].
    pub fn recording(mut self) -> Self {
        self.published.get_or_insert_with(Default::default);
        self
    }

    /// Register subscriptions. Like a topic subscription, only messages published
    /// afterwards are delivered.
    pub async fn with_subscriptions(self, specs: impl IntoIterator<Item = SubscriptionSpec>) -> Self {
        for spec in specs {
            self.subscribe(spec).await;
        }
        self
    }

    pub async fn subscribe(&self, spec: SubscriptionSpec) {
        let mut state = self.state.lock().await;
        tracing::debug!(subscription = %spec.name, filter = ?spec.filter, "Subscription registered");
        state
            .subscriptions
            .entry(spec.name.clone())
            .or_insert_with(|| SubscriptionQueue::new(spec));
    }

    pub fn max_deliveries(&self) -> u32 {
        self.max_deliveries
    }

    /// Every message published so far, in publish order. Always empty unless the bus
    /// was built with [`MemoryBus::recording`].
    pub async fn published(&self) -> Vec<EventMessage> {
        match &self.published {
            Some(log) => log.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Queued plus in-flight deliveries of a subscription.
    pub async fn pending_count(&self, subscription: &str) -> usize {
        let state = self.state.lock().await;
        state
            .subscriptions
            .get(subscription)
            .map(|q| q.ready.len() + q.in_flight.len())
            .unwrap_or(0)
    }

    pub async fn dead_letters(&self, subscription: &str) -> Vec<EventMessage> {
        let state = self.state.lock().await;
        state
            .subscriptions
            .get(subscription)
            .map(|q| q.dead_letters.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// No subscription has queued or in-flight deliveries.
    pub async fn is_idle(&self) -> bool {
        let state = self.state.lock().await;
        state
            .subscriptions
            .values()
            .all(|q| q.ready.is_empty() && q.in_flight.is_empty())
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish_message(&self, message: EventMessage) -> BusResult<String> {
        let message_id = Uuid::new_v4().to_string();
        let now = Instant::now();
        let mut state = self.state.lock().await;

        let mut fanned_out = 0usize;
        for queue in state.subscriptions.values_mut() {
            if queue.spec.accepts(&message) {
                queue.ready.push_back(Queued {
                    message_id: message_id.clone(),
                    message: message.clone(),
                    attempt: 0,
                    visible_at: now,
                });
                fanned_out += 1;
            }
        }

        tracing::debug!(
            message_id = %message_id,
            event = message.event_attribute().unwrap_or("<none>"),
            subscriptions = fanned_out,
            "Message published"
        );
        // Logged under the state lock so the log order matches queue order.
        if let Some(log) = &self.published {
            log.lock().await.push(message);
        }
        Ok(message_id)
    }
}

#[async_trait]
impl DeliverySource for MemoryBus {
    async fn receive(&self, subscription: &str, max: usize) -> BusResult<Vec<Delivery>> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let queue = state
            .subscriptions
            .get_mut(subscription)
            .ok_or_else(|| BusError::UnknownSubscription(subscription.to_string()))?;

        let mut deliveries = Vec::new();
        let mut deferred = VecDeque::new();
        while deliveries.len() < max {
            let Some(mut queued) = queue.ready.pop_front() else {
                break;
            };
            if queued.visible_at > now {
                deferred.push_back(queued);
                continue;
            }
            queued.attempt += 1;
            let receipt = Uuid::new_v4().to_string();
            deliveries.push(Delivery {
                message_id: queued.message_id.clone(),
                receipt: receipt.clone(),
                attempt: queued.attempt,
                message: queued.message.clone(),
            });
            queue.in_flight.insert(receipt, queued);
        }
        // Keep delayed deliveries ahead of the untouched tail.
        while let Some(queued) = deferred.pop_back() {
            queue.ready.push_front(queued);
        }

        Ok(deliveries)
    }

    async fn ack(&self, subscription: &str, receipt: &str) -> BusResult<()> {
        let mut state = self.state.lock().await;
        let queue = state
            .subscriptions
            .get_mut(subscription)
            .ok_or_else(|| BusError::UnknownSubscription(subscription.to_string()))?;
        queue
            .in_flight
            .remove(receipt)
            .map(|_| ())
            .ok_or_else(|| BusError::UnknownReceipt(receipt.to_string()))
    }

    async fn nack(&self, subscription: &str, receipt: &str, delay: Duration) -> BusResult<()> {
        let max_deliveries = self.max_deliveries;
        let mut state = self.state.lock().await;
        let queue = state
            .subscriptions
            .get_mut(subscription)
            .ok_or_else(|| BusError::UnknownSubscription(subscription.to_string()))?;
        let mut queued = queue
            .in_flight
            .remove(receipt)
            .ok_or_else(|| BusError::UnknownReceipt(receipt.to_string()))?;

        if queued.attempt >= max_deliveries {
            tracing::warn!(
                subscription = %subscription,
                message_id = %queued.message_id,
                attempts = queued.attempt,
                "Delivery exhausted, moved to dead letters"
            );
            if queue.dead_letters.len() == DEAD_LETTER_CAPACITY {
                queue.dead_letters.pop_front();
            }
            queue.dead_letters.push_back(queued.message);
            return Ok(());
        }

        queued.visible_at = Instant::now() + delay;
        queue.ready.push_back(queued);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::{Event, EventKind};

    async fn bus() -> MemoryBus {
        MemoryBus::new(3)
            .recording()
            .with_subscriptions([
                SubscriptionSpec::new("object-reaper", [EventKind::RemoveObject]),
                SubscriptionSpec::new("audit", [EventKind::RemoveObject, EventKind::MediaUploaded]),
            ])
            .await
    }

    #[tokio::test]
    async fn fans_out_to_matching_subscriptions() {
        let bus = bus().await;
        bus.publish(&Event::RemoveObject("media/P1/a.jpg".to_string()))
            .await
            .unwrap();

        assert_eq!(bus.pending_count("object-reaper").await, 1);
        assert_eq!(bus.pending_count("audit").await, 1);
        assert_eq!(bus.published().await.len(), 1);
    }

    #[tokio::test]
    async fn publish_rejects_invalid_event() {
        let bus = bus().await;
        let result = bus.publish(&Event::RemoveObject(String::new())).await;
        assert!(matches!(result, Err(BusError::Encode(_))));
        assert!(bus.published().await.is_empty());
    }

    #[tokio::test]
    async fn ack_removes_delivery() {
        let bus = bus().await;
        bus.publish(&Event::RemoveObject("k1".to_string())).await.unwrap();

        let deliveries = bus.receive("object-reaper", 10).await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].attempt, 1);
        assert_eq!(deliveries[0].message.body, "k1");

        bus.ack("object-reaper", &deliveries[0].receipt).await.unwrap();
        assert_eq!(bus.pending_count("object-reaper").await, 0);
        assert!(bus
            .ack("object-reaper", &deliveries[0].receipt)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn nack_redelivers_then_dead_letters() {
        let bus = bus().await;
        bus.publish(&Event::RemoveObject("k1".to_string())).await.unwrap();

        for attempt in 1..=3 {
            let deliveries = bus.receive("object-reaper", 10).await.unwrap();
            assert_eq!(deliveries.len(), 1);
            assert_eq!(deliveries[0].attempt, attempt);
            bus.nack("object-reaper", &deliveries[0].receipt, Duration::ZERO)
                .await
                .unwrap();
        }

        assert!(bus.receive("object-reaper", 10).await.unwrap().is_empty());
        assert_eq!(bus.dead_letters("object-reaper").await.len(), 1);
        assert_eq!(bus.pending_count("audit").await, 1);
    }

    #[tokio::test]
    async fn delayed_delivery_is_hidden() {
        let bus = bus().await;
        bus.publish(&Event::RemoveObject("k1".to_string())).await.unwrap();
        let deliveries = bus.receive("object-reaper", 1).await.unwrap();
        bus.nack("object-reaper", &deliveries[0].receipt, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(bus.receive("object-reaper", 10).await.unwrap().is_empty());
        assert_eq!(bus.pending_count("object-reaper").await, 1);
        assert!(!bus.is_idle().await);
    }

    #[tokio::test]
    async fn receive_respects_batch_size() {
        let bus = bus().await;
        for i in 0..5 {
            bus.publish(&Event::RemoveObject(format!("k{}", i)))
                .await
                .unwrap();
        }
        let first = bus.receive("object-reaper", 2).await.unwrap();
        let bodies: Vec<&str> = first.iter().map(|d| d.message.body.as_str()).collect();
        assert_eq!(bodies, vec!["k0", "k1"]);
    }

    #[tokio::test]
    async fn unknown_subscription_is_error() {
        let bus = bus().await;
        assert!(matches!(
            bus.receive("nope", 1).await,
            Err(BusError::UnknownSubscription(_))
        ));
    }

    #[tokio::test]
    async fn plain_bus_keeps_nothing_after_ack() {
        let bus = MemoryBus::new(3)
            .with_subscriptions([SubscriptionSpec::new("object-reaper", [EventKind::RemoveObject])])
            .await;

        for i in 0..100 {
            bus.publish(&Event::RemoveObject(format!("k{}", i)))
                .await
                .unwrap();
        }
        for delivery in bus.receive("object-reaper", 100).await.unwrap() {
            bus.ack("object-reaper", &delivery.receipt).await.unwrap();
        }

        assert!(bus.is_idle().await);
        assert!(bus.published.is_none());
        assert!(bus.published().await.is_empty());
    }

    #[tokio::test]
    async fn dead_letters_keep_only_the_newest() {
        let bus = MemoryBus::new(1)
            .with_subscriptions([SubscriptionSpec::new("object-reaper", [EventKind::RemoveObject])])
            .await;

        for i in 0..DEAD_LETTER_CAPACITY + 2 {
            bus.publish(&Event::RemoveObject(format!("k{}", i)))
                .await
                .unwrap();
        }
        let deliveries = bus
            .receive("object-reaper", DEAD_LETTER_CAPACITY + 2)
            .await
            .unwrap();
        for delivery in &deliveries {
            bus.nack("object-reaper", &delivery.receipt, Duration::ZERO)
                .await
                .unwrap();
        }

        let dead = bus.dead_letters("object-reaper").await;
        assert_eq!(dead.len(), DEAD_LETTER_CAPACITY);
        assert_eq!(dead[0].body, "k2");
        assert!(bus.is_idle().await);
    }
}

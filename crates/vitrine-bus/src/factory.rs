use crate::traits::{DeliverySource, EventBus, SubscriptionSpec};
use crate::MemoryBus;
use anyhow::Result;
use std::sync::Arc;
use vitrine_core::{BusBackend, Config};

/// Both sides of the configured bus.
#[derive(Clone)]
pub struct BusHandles {
    pub publisher: Arc<dyn EventBus>,
    pub source: Arc<dyn DeliverySource>,
    /// Set for the in-memory backend so single-process runs can drain it.
    pub memory: Option<MemoryBus>,
}

impl BusHandles {
    pub fn from_memory(bus: MemoryBus) -> Self {
        Self {
            publisher: Arc::new(bus.clone()),
            source: Arc::new(bus.clone()),
            memory: Some(bus),
        }
    }
}

/// Create the bus selected by `BUS_BACKEND`, registering `subscriptions` where the
/// backend manages them itself.
pub async fn create_event_bus(
    config: &Config,
    subscriptions: Vec<SubscriptionSpec>,
) -> Result<BusHandles> {
    let backend = config.bus_backend();
    tracing::info!(backend = %backend, subscriptions = subscriptions.len(), "Initializing event bus");

    match backend {
        BusBackend::Memory => {
            let bus = MemoryBus::new(config.bus_max_deliveries())
                .with_subscriptions(subscriptions)
                .await;
            Ok(BusHandles::from_memory(bus))
        }

        #[cfg(feature = "bus-aws")]
        BusBackend::Aws => {
            let topic_arn = config
                .sns_topic_arn()
                .ok_or_else(|| anyhow::anyhow!("SNS_TOPIC_ARN not configured"))?;

            let mut queue_urls = std::collections::BTreeMap::new();
            for spec in &subscriptions {
                let url = config.queue_url(&spec.name).ok_or_else(|| {
                    anyhow::anyhow!("No SQS queue URL configured for subscription '{}'", spec.name)
                })?;
                queue_urls.insert(spec.name.clone(), url.to_string());
            }

            let bus = crate::AwsBus::from_env(config.aws_region(), topic_arn, queue_urls).await;
            Ok(BusHandles {
                publisher: Arc::new(bus.clone()),
                source: Arc::new(bus),
                memory: None,
            })
        }

        #[cfg(not(feature = "bus-aws"))]
        BusBackend::Aws => Err(anyhow::anyhow!(
            "AWS bus backend not available (bus-aws feature not enabled)"
        )),
    }
}

//! Vitrine event bus
//!
//! A topic with filtered subscriptions. Every message carries its kind in the `event`
//! attribute and each subscription only receives the kinds it filters on. Delivery is
//! at-least-once and unordered; consumers acknowledge or negatively acknowledge each
//! delivery.

#[cfg(feature = "bus-aws")]
pub mod aws;
pub mod error;
pub mod factory;
pub mod memory;
pub mod traits;

#[cfg(feature = "bus-aws")]
pub use aws::AwsBus;
pub use error::{BusError, BusResult};
pub use factory::{create_event_bus, BusHandles};
pub use memory::MemoryBus;
pub use traits::{Delivery, DeliverySource, EventBus, SubscriptionSpec};

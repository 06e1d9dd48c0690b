//! Catalog notification mechanics.
//!
//! Events here are facts about committed catalog changes. They are published
//! only after the owning transaction commits and are consumed outside the
//! commit path (webhooks, search indexing, caches).

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription, SubscriptionError};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{DEFAULT_CAPACITY, InMemoryEventBus};

//! In-process bus over a tokio broadcast channel, for tests and single-node
//! deployments.

use std::convert::Infallible;

use tokio::sync::broadcast;

use crate::bus::{EventBus, Subscription};

/// Events buffered per subscription before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    sender: broadcast::Sender<M>,
}

impl<M: Clone> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<M: Clone> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = Infallible;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        // `send` only fails when nobody is listening.
        Ok(self.sender.send(message).unwrap_or(0))
    }

    fn subscribe(&self) -> Subscription<M> {
        Subscription::new(self.sender.subscribe())
    }
}

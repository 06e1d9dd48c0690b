//! Catalog event fan-out.
//!
//! ```text
//! commit (store) → EventBus::publish ─┬→ Subscription (webhook delivery)
//!                                     └→ Subscription (caches / search)
//! ```
//!
//! Publication happens strictly after the transaction commits; a failed
//! publish never undoes the commit. Delivery is lossy for slow consumers: a
//! subscription that falls too far behind is told how many events it missed
//! and should resynchronise from the store.

use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("event bus closed")]
    Closed,

    #[error("subscriber lagged behind and missed {0} events")]
    Lagged(u64),
}

/// A consumer's view of the bus.
///
/// Sees every event published after it was created, in publish order.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: broadcast::Receiver<M>,
}

impl<M: Clone> Subscription<M> {
    pub(crate) fn new(receiver: broadcast::Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Result<M, SubscriptionError> {
        self.receiver.recv().await.map_err(|err| match err {
            broadcast::error::RecvError::Closed => SubscriptionError::Closed,
            broadcast::error::RecvError::Lagged(missed) => SubscriptionError::Lagged(missed),
        })
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Result<Option<M>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(SubscriptionError::Closed),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                Err(SubscriptionError::Lagged(missed))
            }
        }
    }
}

/// Publisher side of the catalog notifications.
///
/// `publish` is synchronous and may block on transport I/O, so callers on an
/// async runtime dispatch it off the executor threads.
pub trait EventBus<M>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Hand `message` to every current subscriber. Returns how many got it;
    /// zero subscribers is not an error.
    fn publish(&self, message: M) -> Result<usize, Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

//! Outbound notification port.
//!
//! The stock core publishes after commit and never waits on delivery:
//!
//! ```text
//! Workflow → Unit of work (commit) → ChangeNotifier::publish → realtime clients
//! ```
//!
//! A publish error is logged by the caller and otherwise ignored. The committed
//! stock and ledger state is the source of truth; notifications are hints.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crate::ChangeEvent;

/// A subscription to a notifier's event stream.
///
/// Each subscription gets a copy of every event published after it was
/// created (broadcast semantics). Designed for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Fire-and-forget sink for committed changes.
///
/// Implementations must be `Send + Sync`; workflows share one notifier across
/// all concurrent calls.
pub trait ChangeNotifier: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, event: ChangeEvent) -> Result<(), Self::Error>;
}

impl<N> ChangeNotifier for Arc<N>
where
    N: ChangeNotifier + ?Sized,
{
    type Error = N::Error;

    fn publish(&self, event: ChangeEvent) -> Result<(), Self::Error> {
        (**self).publish(event)
    }
}

/// Notifier that discards everything (batch jobs, tools).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    type Error = core::convert::Infallible;

    fn publish(&self, _event: ChangeEvent) -> Result<(), Self::Error> {
        Ok(())
    }
}

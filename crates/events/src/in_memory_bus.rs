//! In-memory notifier for tests/dev.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{ChangeNotifier, Subscription};
use crate::ChangeEvent;

#[derive(Debug, Error)]
pub enum InMemoryNotifierError {
    /// Publish failed due to internal lock poisoning.
    #[error("notifier lock poisoned")]
    Poisoned,
}

/// In-memory pub/sub notifier.
///
/// - No IO / no async
/// - Best-effort fan-out
/// - Dead subscribers are dropped on the next publish
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    subscribers: Mutex<Vec<mpsc::Sender<ChangeEvent>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<ChangeEvent> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages until the process restarts.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}

impl ChangeNotifier for InMemoryNotifier {
    type Error = InMemoryNotifierError;

    fn publish(&self, event: ChangeEvent) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryNotifierError::Poisoned)?;

        subs.retain(|tx| tx.send(event.clone()).is_ok());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChangeTopic;
    use stockroom_core::TenantId;

    #[test]
    fn every_subscriber_gets_a_copy() {
        let notifier = InMemoryNotifier::new();
        let a = notifier.subscribe();
        let b = notifier.subscribe();

        let tenant_id = TenantId::new();
        notifier
            .publish(ChangeEvent::new(
                tenant_id,
                ChangeTopic::OrderCreated,
                "Order ORD-1 created",
                serde_json::json!({ "orderNumber": "ORD-1" }),
            ))
            .unwrap();

        let got_a = a.drain();
        let got_b = b.drain();
        assert_eq!(got_a.len(), 1);
        assert_eq!(got_b.len(), 1);
        assert_eq!(got_a[0].topic(), ChangeTopic::OrderCreated);
        assert_eq!(got_a[0].tenant_id(), tenant_id);
    }

    #[test]
    fn dropped_subscribers_do_not_fail_publish() {
        let notifier = InMemoryNotifier::new();
        drop(notifier.subscribe());

        let result = notifier.publish(ChangeEvent::new(
            TenantId::new(),
            ChangeTopic::PoDeleted,
            "gone",
            serde_json::Value::Null,
        ));
        assert!(result.is_ok());
    }
}

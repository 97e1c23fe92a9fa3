//! Workflow entry points.
//!
//! Each service composes the store, the stock mutation engine and the change
//! notifier. Every public mutation runs inside [`crate::unit_of_work::transact`]
//! and notifies only after its commit succeeded.

pub mod catalog;
pub mod orders;
pub mod purchasing;
pub mod stock;

pub use catalog::CatalogService;
pub use orders::OrderWorkflow;
pub use purchasing::{NewPurchaseOrder, PurchaseOrderFilter, PurchaseOrderWorkflow};
pub use stock::{StockAlert, StockService};

use stockroom_events::{ChangeEvent, ChangeNotifier};

/// Publish without letting a delivery failure reach the caller.
pub(crate) fn notify<N>(notifier: &N, event: ChangeEvent)
where
    N: ChangeNotifier + ?Sized,
{
    let tenant_id = event.tenant_id();
    let topic = event.topic();
    if let Err(err) = notifier.publish(event) {
        tracing::warn!(
            tenant_id = %tenant_id,
            topic = %topic,
            error = ?err,
            "change notification failed"
        );
    }
}

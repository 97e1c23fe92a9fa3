use serde::{Deserialize, Serialize};

/// Stable name of a change notification.
///
/// These are the topic names realtime clients subscribe to, so the string
/// forms must not change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeTopic {
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    OrderCreated,
    OrderUpdated,
    OrderDeleted,
    PoCreated,
    PoUpdated,
    PoReceived,
    PoDeleted,
}

impl ChangeTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTopic::ProductCreated => "product-created",
            ChangeTopic::ProductUpdated => "product-updated",
            ChangeTopic::ProductDeleted => "product-deleted",
            ChangeTopic::OrderCreated => "order-created",
            ChangeTopic::OrderUpdated => "order-updated",
            ChangeTopic::OrderDeleted => "order-deleted",
            ChangeTopic::PoCreated => "po-created",
            ChangeTopic::PoUpdated => "po-updated",
            ChangeTopic::PoReceived => "po-received",
            ChangeTopic::PoDeleted => "po-deleted",
        }
    }
}

impl core::fmt::Display for ChangeTopic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

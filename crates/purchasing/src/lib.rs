//! Purchasing domain module (suppliers and purchase orders).
//!
//! This crate contains business rules for purchase orders, implemented purely as
//! deterministic domain logic (no IO, no locks, no storage).

pub mod order;
pub mod supplier;

pub use order::{
    NewPurchaseOrderItem, PlannedReceipt, PurchaseOrder, PurchaseOrderId, PurchaseOrderItem,
    PurchaseOrderStatus, Receipt,
};
pub use supplier::{Supplier, SupplierId};

//! Sales orders domain module.
//!
//! This crate contains business rules for customer orders, implemented purely as
//! deterministic domain logic (no IO, no locks, no storage). Stock effects of
//! an order are carried out by the infra workflows.

pub mod order;

pub use order::{Customer, NewOrderItem, Order, OrderId, OrderItem, OrderStatus, StatusChange};

//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;

pub use aggregate::AggregateRoot;
pub use entity::{Entity, EntityTable};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, EntityId, TenantId, UserId};

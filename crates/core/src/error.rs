//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
///
/// Variants carry enough context (ids, quantities, current stock) for the
/// caller to render an actionable message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, empty item list).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found, or is not owned by the tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unrecognized movement type / quantity / direction combination.
    #[error("invalid movement: {0}")]
    InvalidMovement(String),

    /// The change would drive stock below zero.
    #[error("insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A purchase-order receipt exceeds the quantity still outstanding.
    #[error(
        "received quantity exceeds ordered quantity for {sku}: ordered {ordered}, already received {received}, requested {requested}"
    )]
    ExceedsOrdered {
        sku: String,
        ordered: i64,
        received: i64,
        requested: i64,
    },

    /// Operation not allowed in the current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A conflict occurred (e.g. stale version, duplicate SKU).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_movement(msg: impl Into<String>) -> Self {
        Self::InvalidMovement(msg.into())
    }

    pub fn insufficient_stock(sku: impl Into<String>, available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            sku: sku.into(),
            available,
            requested,
        }
    }

    pub fn exceeds_ordered(
        sku: impl Into<String>,
        ordered: i64,
        received: i64,
        requested: i64,
    ) -> Self {
        Self::ExceedsOrdered {
            sku: sku.into(),
            ordered,
            received,
            requested,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

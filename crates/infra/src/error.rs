//! Error taxonomy surfaced by the stock core.

use thiserror::Error;

use stockroom_core::DomainError;

/// Storage-level failure.
///
/// These are **infrastructure errors** (concurrency, isolation, uniqueness) as
/// opposed to domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A version read inside the unit of work changed before commit.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// A change set tried to touch another tenant's records.
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    /// A unique key (SKU, order number, PO number) is already taken.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Error returned by every workflow operation.
///
/// Business-rule variants are deterministic and never retried; only
/// `Conflict` is worth retrying at a higher level.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid movement: {0}")]
    InvalidMovement(String),

    #[error("insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    #[error(
        "received quantity exceeds ordered quantity for {sku}: ordered {ordered}, already received {received}, requested {requested}"
    )]
    ExceedsOrdered {
        sku: String,
        ordered: i64,
        received: i64,
        requested: i64,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::Conflict(_))
    }

    pub(crate) fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        WorkflowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for WorkflowError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => WorkflowError::Validation(msg),
            DomainError::InvalidId(msg) => WorkflowError::Validation(msg),
            DomainError::NotFound { entity, id } => WorkflowError::NotFound { entity, id },
            DomainError::InvalidMovement(msg) => WorkflowError::InvalidMovement(msg),
            DomainError::InsufficientStock {
                sku,
                available,
                requested,
            } => WorkflowError::InsufficientStock {
                sku,
                available,
                requested,
            },
            DomainError::ExceedsOrdered {
                sku,
                ordered,
                received,
                requested,
            } => WorkflowError::ExceedsOrdered {
                sku,
                ordered,
                received,
                requested,
            },
            DomainError::InvalidState(msg) => WorkflowError::InvalidState(msg),
            DomainError::Conflict(msg) => WorkflowError::Conflict(msg),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => WorkflowError::Conflict(msg),
            StoreError::Duplicate(msg) => WorkflowError::Conflict(msg),
            StoreError::TenantIsolation(msg) => WorkflowError::TenantIsolation(msg),
            StoreError::Poisoned => WorkflowError::Internal("store lock poisoned".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(WorkflowError::from(StoreError::Concurrency("v1 != v2".into())).is_retryable());
        assert!(!WorkflowError::from(DomainError::insufficient_stock("A", 1, 2)).is_retryable());
        assert!(!WorkflowError::from(StoreError::Poisoned).is_retryable());
    }

    #[test]
    fn domain_errors_keep_their_context() {
        let err = WorkflowError::from(DomainError::exceeds_ordered("IPH14P-128-BLK", 10, 4, 7));
        assert_eq!(
            err,
            WorkflowError::ExceedsOrdered {
                sku: "IPH14P-128-BLK".to_string(),
                ordered: 10,
                received: 4,
                requested: 7,
            }
        );
    }
}

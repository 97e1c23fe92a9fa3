//! Aggregate root trait.

use crate::id::TenantId;

/// Aggregate root marker + minimal interface.
///
/// Every aggregate in this system is tenant-owned and carries a version that
/// the storage layer compares on commit.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Owning tenant.
    fn tenant_id(&self) -> TenantId;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Bumped by the storage layer on every committed write.
    fn version(&self) -> u64;
}

//! Tenant-scoped inventory storage boundary.
//!
//! Reads hand out owned snapshots. Writes arrive as one [`ChangeSet`] per
//! workflow call and are applied all-or-nothing by [`InventoryStore::commit`],
//! after every version expectation in the set has been checked.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use r#trait::{ChangeSet, DocumentWrite, InventoryStore, ProductMetadataWrite, VariantWrite};

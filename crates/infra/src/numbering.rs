//! Human-readable document numbers (`ORD-20240301-000042`).

use chrono::{DateTime, Utc};

use stockroom_core::TenantId;

use crate::error::WorkflowError;
use crate::store::InventoryStore;

/// Allocate the next number for `prefix` in `tenant_id`.
///
/// Sequences are per tenant and per prefix. A number allocated for a call that
/// later fails is not reused, so gaps are expected.
pub fn next_document_number<S>(
    store: &S,
    tenant_id: TenantId,
    prefix: &str,
    now: DateTime<Utc>,
) -> Result<String, WorkflowError>
where
    S: InventoryStore + ?Sized,
{
    let seq = store.next_sequence(tenant_id, prefix)?;
    Ok(format_document_number(prefix, now, seq))
}

pub fn format_document_number(prefix: &str, now: DateTime<Utc>, seq: u64) -> String {
    format!("{}-{}-{:06}", prefix, now.format("%Y%m%d"), seq)
}

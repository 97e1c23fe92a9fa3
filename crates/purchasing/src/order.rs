use core::str::FromStr;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ProductId, VariantId};
use stockroom_core::{AggregateId, AggregateRoot, DomainError, DomainResult, TenantId, UserId};

use crate::supplier::{Supplier, SupplierId};

/// Purchase order identifier (tenant-scoped via the PO's `tenant_id`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Confirmed,
    #[serde(rename = "Partially Received")]
    PartiallyReceived,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "Draft",
            PurchaseOrderStatus::Sent => "Sent",
            PurchaseOrderStatus::Confirmed => "Confirmed",
            PurchaseOrderStatus::PartiallyReceived => "Partially Received",
            PurchaseOrderStatus::Received => "Received",
            PurchaseOrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    /// Accepts any casing and `partially received`, `partially_received`,
    /// `Partially-Received` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "draft" => Ok(PurchaseOrderStatus::Draft),
            "sent" => Ok(PurchaseOrderStatus::Sent),
            "confirmed" => Ok(PurchaseOrderStatus::Confirmed),
            "partiallyreceived" => Ok(PurchaseOrderStatus::PartiallyReceived),
            "received" => Ok(PurchaseOrderStatus::Received),
            "cancelled" | "canceled" => Ok(PurchaseOrderStatus::Cancelled),
            _ => Err(DomainError::validation(format!(
                "invalid purchase order status '{s}'"
            ))),
        }
    }
}

/// Requested PO line, before product lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseOrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
    /// Falls back to the variant's list price.
    pub unit_price: Option<u64>,
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub received_quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub total_price: u64,
}

impl PurchaseOrderItem {
    pub fn new(
        product_id: ProductId,
        variant_id: VariantId,
        sku: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: u64,
    ) -> Self {
        Self {
            product_id,
            variant_id,
            sku: sku.into(),
            product_name: product_name.into(),
            quantity,
            received_quantity: 0,
            unit_price,
            total_price: unit_price.saturating_mul(quantity.unsigned_abs()),
        }
    }

    pub fn outstanding(&self) -> i64 {
        self.quantity - self.received_quantity
    }

    pub fn is_fully_received(&self) -> bool {
        self.received_quantity >= self.quantity
    }
}

/// Goods arriving for one PO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub variant_id: VariantId,
    pub received_quantity: i64,
}

/// A validated receipt, resolved to its PO line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReceipt {
    pub line: usize,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub sku: String,
    pub quantity: i64,
    pub unit_price: u64,
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    tenant_id: TenantId,
    po_number: String,
    supplier_id: SupplierId,
    supplier_name: String,
    items: Vec<PurchaseOrderItem>,
    subtotal: u64,
    tax: u64,
    shipping_cost: u64,
    total_amount: u64,
    status: PurchaseOrderStatus,
    notes: Option<String>,
    created_by: UserId,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    received_at: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    /// Build a new PO in `Draft` with nothing received yet.
    #[allow(clippy::too_many_arguments)]
    pub fn draft(
        tenant_id: TenantId,
        id: PurchaseOrderId,
        po_number: String,
        supplier: &Supplier,
        items: Vec<PurchaseOrderItem>,
        tax: u64,
        shipping_cost: u64,
        notes: Option<String>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<PurchaseOrder> {
        if supplier.tenant_id() != tenant_id {
            return Err(DomainError::not_found("supplier", supplier.id_typed()));
        }
        if !supplier.is_active() {
            return Err(DomainError::validation(format!(
                "supplier {} is inactive",
                supplier.name()
            )));
        }
        if items.is_empty() {
            return Err(DomainError::validation(
                "purchase order must have at least one item",
            ));
        }

        let mut seen = HashSet::new();
        for item in &items {
            if item.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "quantity for {} must be positive",
                    item.sku
                )));
            }
            if !seen.insert(item.variant_id) {
                return Err(DomainError::validation(format!(
                    "variant {} appears more than once",
                    item.sku
                )));
            }
        }

        let items: Vec<PurchaseOrderItem> = items
            .into_iter()
            .map(|i| PurchaseOrderItem {
                received_quantity: 0,
                total_price: i.unit_price.saturating_mul(i.quantity.unsigned_abs()),
                ..i
            })
            .collect();
        let subtotal = items
            .iter()
            .map(|i| i.total_price)
            .try_fold(0u64, u64::checked_add)
            .ok_or_else(|| DomainError::validation("purchase order total overflows"))?;

        Ok(PurchaseOrder {
            id,
            tenant_id,
            po_number,
            supplier_id: supplier.id_typed(),
            supplier_name: supplier.name().to_string(),
            items,
            subtotal,
            tax,
            shipping_cost,
            total_amount: subtotal.saturating_add(tax).saturating_add(shipping_cost),
            status: PurchaseOrderStatus::Draft,
            notes,
            created_by,
            version: 0,
            created_at: now,
            updated_at: now,
            received_at: None,
        })
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn po_number(&self) -> &str {
        &self.po_number
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn supplier_name(&self) -> &str {
        &self.supplier_name
    }

    pub fn items(&self) -> &[PurchaseOrderItem] {
        &self.items
    }

    pub fn subtotal(&self) -> u64 {
        self.subtotal
    }

    pub fn tax(&self) -> u64 {
        self.tax
    }

    pub fn shipping_cost(&self) -> u64 {
        self.shipping_cost
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn is_fully_received(&self) -> bool {
        self.items.iter().all(PurchaseOrderItem::is_fully_received)
    }

    pub fn is_partially_received(&self) -> bool {
        self.items.iter().any(|i| i.received_quantity > 0) && !self.is_fully_received()
    }

    /// Validate a batch of receipts against the open quantities.
    ///
    /// Receipts for the same line within one batch accumulate, so two receipts
    /// of 6 against an open quantity of 10 fail just like one receipt of 12.
    pub fn plan_receipts(&self, receipts: &[Receipt]) -> DomainResult<Vec<PlannedReceipt>> {
        if self.status == PurchaseOrderStatus::Cancelled {
            return Err(DomainError::invalid_state(format!(
                "cannot receive items for cancelled purchase order {}",
                self.po_number
            )));
        }
        if receipts.is_empty() {
            return Err(DomainError::validation("no items to receive"));
        }

        let mut pending: HashMap<usize, i64> = HashMap::new();
        let mut planned = Vec::with_capacity(receipts.len());

        for receipt in receipts {
            if receipt.received_quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "received quantity for variant {} must be positive",
                    receipt.variant_id
                )));
            }

            let (line, item) = self
                .items
                .iter()
                .enumerate()
                .find(|(_, i)| i.variant_id == receipt.variant_id)
                .ok_or_else(|| DomainError::not_found("purchase order item", receipt.variant_id))?;

            let already = item.received_quantity + pending.get(&line).copied().unwrap_or(0);
            if receipt.received_quantity > item.quantity - already {
                return Err(DomainError::exceeds_ordered(
                    item.sku.clone(),
                    item.quantity,
                    already,
                    receipt.received_quantity,
                ));
            }
            *pending.entry(line).or_insert(0) += receipt.received_quantity;

            planned.push(PlannedReceipt {
                line,
                product_id: item.product_id,
                variant_id: item.variant_id,
                sku: item.sku.clone(),
                quantity: receipt.received_quantity,
                unit_price: item.unit_price,
            });
        }

        Ok(planned)
    }

    /// Book planned receipts and promote the status.
    pub fn apply_receipts(&mut self, planned: &[PlannedReceipt], now: DateTime<Utc>) {
        for receipt in planned {
            if let Some(item) = self.items.get_mut(receipt.line) {
                item.received_quantity += receipt.quantity;
            }
        }

        if self.is_fully_received() {
            self.status = PurchaseOrderStatus::Received;
            self.received_at = Some(now);
        } else if self.is_partially_received() {
            self.status = PurchaseOrderStatus::PartiallyReceived;
        }
        self.updated_at = now;
    }

    /// Metadata-only status write. Returns `false` if nothing changed.
    pub fn set_status(&mut self, status: PurchaseOrderStatus, now: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = now;
        true
    }

    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "purchase order {} is {} and can only be deleted as a draft",
                self.po_number, self.status
            )));
        }
        Ok(())
    }

    /// Storage layer only: record a committed write.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

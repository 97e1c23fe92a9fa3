use std::sync::Arc;

use stockroom_catalog::{Product, ProductId, Variant, VariantId};
use stockroom_core::TenantId;
use stockroom_ledger::{MovementQuery, StockMovement};
use stockroom_purchasing::{PurchaseOrder, PurchaseOrderId, Supplier, SupplierId};
use stockroom_sales::{Order, OrderId};

use crate::error::StoreError;

/// Conditional write of one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantWrite {
    pub product_id: ProductId,
    pub variant: Variant,
    /// Variant version observed when it was first read.
    pub expected_version: u64,
}

/// Conditional write of product-level fields (name, active flag, ...).
///
/// Variants inside `product` are ignored; they only change via [`VariantWrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMetadataWrite {
    pub product: Product,
    pub expected_version: u64,
}

/// Write of a whole document (order, purchase order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentWrite<T, Id> {
    Insert(T),
    Update { document: T, expected_version: u64 },
    Delete { id: Id, expected_version: u64 },
}

/// Everything one workflow call wants to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub product_inserts: Vec<Product>,
    pub product_updates: Vec<ProductMetadataWrite>,
    pub variant_writes: Vec<VariantWrite>,
    /// Appended in order.
    pub movements: Vec<StockMovement>,
    pub orders: Vec<DocumentWrite<Order, OrderId>>,
    pub purchase_orders: Vec<DocumentWrite<PurchaseOrder, PurchaseOrderId>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.product_inserts.is_empty()
            && self.product_updates.is_empty()
            && self.variant_writes.is_empty()
            && self.movements.is_empty()
            && self.orders.is_empty()
            && self.purchase_orders.is_empty()
    }
}

/// Storage port for products, the ledger, orders and purchase orders.
///
/// Every method is scoped to one tenant; implementations must never return or
/// modify another tenant's records.
pub trait InventoryStore: Send + Sync {
    fn load_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Option<Product>, StoreError>;

    fn list_products(&self, tenant_id: TenantId) -> Result<Vec<Product>, StoreError>;

    /// Resolve a (normalized) SKU to its product and variant.
    fn find_sku(
        &self,
        tenant_id: TenantId,
        sku: &str,
    ) -> Result<Option<(ProductId, VariantId)>, StoreError>;

    /// Includes soft-deleted orders; callers decide visibility.
    fn load_order(&self, tenant_id: TenantId, order_id: OrderId)
    -> Result<Option<Order>, StoreError>;

    fn list_orders(&self, tenant_id: TenantId) -> Result<Vec<Order>, StoreError>;

    fn load_purchase_order(
        &self,
        tenant_id: TenantId,
        po_id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, StoreError>;

    fn list_purchase_orders(&self, tenant_id: TenantId) -> Result<Vec<PurchaseOrder>, StoreError>;

    fn load_supplier(
        &self,
        tenant_id: TenantId,
        supplier_id: SupplierId,
    ) -> Result<Option<Supplier>, StoreError>;

    fn insert_supplier(&self, supplier: Supplier) -> Result<(), StoreError>;

    /// Next value (starting at 1) of a named per-tenant counter.
    fn next_sequence(&self, tenant_id: TenantId, name: &str) -> Result<u64, StoreError>;

    /// Matching movements, newest first, at most `limit`.
    fn movements(
        &self,
        tenant_id: TenantId,
        query: &MovementQuery,
        limit: usize,
    ) -> Result<Vec<StockMovement>, StoreError>;

    /// Validate and apply `changes` atomically.
    ///
    /// Fails with `Concurrency` if any expected version is stale and with
    /// `Duplicate` if a unique key is taken; in both cases nothing is written.
    fn commit(&self, tenant_id: TenantId, changes: ChangeSet) -> Result<(), StoreError>;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn load_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Option<Product>, StoreError> {
        (**self).load_product(tenant_id, product_id)
    }

    fn list_products(&self, tenant_id: TenantId) -> Result<Vec<Product>, StoreError> {
        (**self).list_products(tenant_id)
    }

    fn find_sku(
        &self,
        tenant_id: TenantId,
        sku: &str,
    ) -> Result<Option<(ProductId, VariantId)>, StoreError> {
        (**self).find_sku(tenant_id, sku)
    }

    fn load_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<Option<Order>, StoreError> {
        (**self).load_order(tenant_id, order_id)
    }

    fn list_orders(&self, tenant_id: TenantId) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders(tenant_id)
    }

    fn load_purchase_order(
        &self,
        tenant_id: TenantId,
        po_id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, StoreError> {
        (**self).load_purchase_order(tenant_id, po_id)
    }

    fn list_purchase_orders(&self, tenant_id: TenantId) -> Result<Vec<PurchaseOrder>, StoreError> {
        (**self).list_purchase_orders(tenant_id)
    }

    fn load_supplier(
        &self,
        tenant_id: TenantId,
        supplier_id: SupplierId,
    ) -> Result<Option<Supplier>, StoreError> {
        (**self).load_supplier(tenant_id, supplier_id)
    }

    fn insert_supplier(&self, supplier: Supplier) -> Result<(), StoreError> {
        (**self).insert_supplier(supplier)
    }

    fn next_sequence(&self, tenant_id: TenantId, name: &str) -> Result<u64, StoreError> {
        (**self).next_sequence(tenant_id, name)
    }

    fn movements(
        &self,
        tenant_id: TenantId,
        query: &MovementQuery,
        limit: usize,
    ) -> Result<Vec<StockMovement>, StoreError> {
        (**self).movements(tenant_id, query, limit)
    }

    fn commit(&self, tenant_id: TenantId, changes: ChangeSet) -> Result<(), StoreError> {
        (**self).commit(tenant_id, changes)
    }
}

//! Optimistic unit of work.
//!
//! A workflow call reads through a [`UnitOfWork`], mutates working copies, and
//! hands the resulting [`ChangeSet`] to the store in one commit. Every record
//! carries the version it had when first read; the store rejects the commit if
//! any of them moved. [`transact`] reruns the whole call on such a conflict.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use stockroom_catalog::{Product, ProductId, Variant, VariantId};
use stockroom_core::{AggregateRoot, TenantId};
use stockroom_ledger::StockMovement;
use stockroom_purchasing::{PurchaseOrder, PurchaseOrderId, Supplier, SupplierId};
use stockroom_sales::{Order, OrderId};

use crate::error::{StoreError, WorkflowError};
use crate::store::{ChangeSet, DocumentWrite, InventoryStore, ProductMetadataWrite, VariantWrite};

#[derive(Debug)]
enum Origin {
    /// Read from the store; holds the versions observed at read time.
    Loaded {
        product_version: u64,
        variant_versions: HashMap<VariantId, u64>,
    },
    /// Created in this unit of work.
    New,
}

#[derive(Debug)]
struct WorkingProduct {
    product: Product,
    origin: Origin,
    dirty_variants: Vec<VariantId>,
    metadata_dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocState {
    Clean,
    Inserted,
    Updated,
    Deleted,
}

#[derive(Debug)]
struct WorkingDoc<T> {
    doc: T,
    loaded_version: u64,
    state: DocState,
}

impl<T: AggregateRoot> WorkingDoc<T> {
    fn loaded(doc: T) -> Self {
        Self {
            loaded_version: doc.version(),
            doc,
            state: DocState::Clean,
        }
    }

    fn into_write(self) -> Option<DocumentWrite<T, T::Id>> {
        match self.state {
            DocState::Clean => None,
            DocState::Inserted => Some(DocumentWrite::Insert(self.doc)),
            DocState::Updated => Some(DocumentWrite::Update {
                document: self.doc,
                expected_version: self.loaded_version,
            }),
            DocState::Deleted => Some(DocumentWrite::Delete {
                id: self.doc.id().clone(),
                expected_version: self.loaded_version,
            }),
        }
    }
}

/// Read cache plus staged writes for one workflow attempt.
pub struct UnitOfWork<'s, S: ?Sized> {
    store: &'s S,
    tenant_id: TenantId,
    now: DateTime<Utc>,
    products: HashMap<ProductId, WorkingProduct>,
    /// Insertion order of `products`, so change sets are deterministic.
    product_order: Vec<ProductId>,
    orders: HashMap<OrderId, WorkingDoc<Order>>,
    order_order: Vec<OrderId>,
    purchase_orders: HashMap<PurchaseOrderId, WorkingDoc<PurchaseOrder>>,
    purchase_order_order: Vec<PurchaseOrderId>,
    movements: Vec<StockMovement>,
}

impl<'s, S> UnitOfWork<'s, S>
where
    S: InventoryStore + ?Sized,
{
    pub fn begin(store: &'s S, tenant_id: TenantId) -> Self {
        Self {
            store,
            tenant_id,
            now: Utc::now(),
            products: HashMap::new(),
            product_order: Vec::new(),
            orders: HashMap::new(),
            order_order: Vec::new(),
            purchase_orders: HashMap::new(),
            purchase_order_order: Vec::new(),
            movements: Vec::new(),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Timestamp shared by everything written in this attempt.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    fn working_product(&mut self, product_id: ProductId) -> Result<&mut WorkingProduct, WorkflowError> {
        if !self.products.contains_key(&product_id) {
            let product = self
                .store
                .load_product(self.tenant_id, product_id)?
                .ok_or_else(|| WorkflowError::not_found("product", product_id))?;
            let origin = Origin::Loaded {
                product_version: product.version(),
                variant_versions: product
                    .variants()
                    .map(|v| (v.id_typed(), v.version()))
                    .collect(),
            };
            self.product_order.push(product_id);
            self.products.insert(
                product_id,
                WorkingProduct {
                    product,
                    origin,
                    dirty_variants: Vec::new(),
                    metadata_dirty: false,
                },
            );
        }
        self.products
            .get_mut(&product_id)
            .ok_or_else(|| WorkflowError::not_found("product", product_id))
    }

    /// Working copy of a product, loaded on first access.
    pub fn product(&mut self, product_id: ProductId) -> Result<&Product, WorkflowError> {
        Ok(&self.working_product(product_id)?.product)
    }

    pub fn insert_product(&mut self, product: Product) -> Result<(), WorkflowError> {
        let product_id = product.id_typed();
        if self.products.contains_key(&product_id) {
            return Err(WorkflowError::Conflict(format!("product {product_id} already staged")));
        }
        self.product_order.push(product_id);
        self.products.insert(
            product_id,
            WorkingProduct {
                product,
                origin: Origin::New,
                dirty_variants: Vec::new(),
                metadata_dirty: false,
            },
        );
        Ok(())
    }

    /// Replace one variant in the working copy and queue its conditional write.
    pub fn stage_variant(&mut self, product_id: ProductId, variant: Variant) -> Result<(), WorkflowError> {
        let working = self.working_product(product_id)?;
        let variant_id = variant.id_typed();
        working.product.apply_variant(variant)?;
        if !working.dirty_variants.contains(&variant_id) {
            working.dirty_variants.push(variant_id);
        }
        Ok(())
    }

    /// Queue a write of product-level fields taken from `product`.
    pub fn stage_product_metadata(&mut self, product: &Product) -> Result<(), WorkflowError> {
        let working = self.working_product(product.id_typed())?;
        working.product.adopt_metadata(product);
        if !working.metadata_dirty {
            working.metadata_dirty = true;
            if matches!(working.origin, Origin::Loaded { .. }) {
                working.product.bump_version();
            }
        }
        Ok(())
    }

    pub fn record_movement(&mut self, movement: StockMovement) {
        self.movements.push(movement);
    }

    /// Movements staged so far, in order.
    pub fn staged_movements(&self) -> &[StockMovement] {
        &self.movements
    }

    /// A live (not soft-deleted) order.
    pub fn order(&mut self, order_id: OrderId) -> Result<&Order, WorkflowError> {
        if !self.orders.contains_key(&order_id) {
            let order = self
                .store
                .load_order(self.tenant_id, order_id)?
                .filter(|o| !o.is_deleted())
                .ok_or_else(|| WorkflowError::not_found("order", order_id))?;
            self.order_order.push(order_id);
            self.orders.insert(order_id, WorkingDoc::loaded(order));
        }
        self.orders
            .get(&order_id)
            .map(|w| &w.doc)
            .ok_or_else(|| WorkflowError::not_found("order", order_id))
    }

    pub fn insert_order(&mut self, order: Order) -> Order {
        let order_id = order.id_typed();
        self.order_order.push(order_id);
        self.orders.insert(
            order_id,
            WorkingDoc {
                loaded_version: order.version(),
                doc: order.clone(),
                state: DocState::Inserted,
            },
        );
        order
    }

    /// Stage an updated order; returns it with its post-commit version.
    pub fn update_order(&mut self, mut order: Order) -> Result<Order, WorkflowError> {
        let order_id = order.id_typed();
        let working = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| WorkflowError::not_found("order", order_id))?;
        if working.state == DocState::Clean {
            order.bump_version();
            working.state = DocState::Updated;
        }
        working.doc = order.clone();
        Ok(order)
    }

    pub fn purchase_order(&mut self, po_id: PurchaseOrderId) -> Result<&PurchaseOrder, WorkflowError> {
        if !self.purchase_orders.contains_key(&po_id) {
            let po = self
                .store
                .load_purchase_order(self.tenant_id, po_id)?
                .ok_or_else(|| WorkflowError::not_found("purchase order", po_id))?;
            self.purchase_order_order.push(po_id);
            self.purchase_orders.insert(po_id, WorkingDoc::loaded(po));
        }
        self.purchase_orders
            .get(&po_id)
            .map(|w| &w.doc)
            .ok_or_else(|| WorkflowError::not_found("purchase order", po_id))
    }

    pub fn insert_purchase_order(&mut self, po: PurchaseOrder) -> PurchaseOrder {
        let po_id = po.id_typed();
        self.purchase_order_order.push(po_id);
        self.purchase_orders.insert(
            po_id,
            WorkingDoc {
                loaded_version: po.version(),
                doc: po.clone(),
                state: DocState::Inserted,
            },
        );
        po
    }

    pub fn update_purchase_order(&mut self, mut po: PurchaseOrder) -> Result<PurchaseOrder, WorkflowError> {
        let po_id = po.id_typed();
        let working = self
            .purchase_orders
            .get_mut(&po_id)
            .ok_or_else(|| WorkflowError::not_found("purchase order", po_id))?;
        if working.state == DocState::Clean {
            po.bump_version();
            working.state = DocState::Updated;
        }
        working.doc = po.clone();
        Ok(po)
    }

    pub fn delete_purchase_order(&mut self, po_id: PurchaseOrderId) -> Result<(), WorkflowError> {
        let working = self
            .purchase_orders
            .get_mut(&po_id)
            .ok_or_else(|| WorkflowError::not_found("purchase order", po_id))?;
        working.state = DocState::Deleted;
        Ok(())
    }

    /// Suppliers are reference data and are not tracked for conflicts.
    pub fn supplier(&self, supplier_id: SupplierId) -> Result<Supplier, WorkflowError> {
        self.store
            .load_supplier(self.tenant_id, supplier_id)?
            .ok_or_else(|| WorkflowError::not_found("supplier", supplier_id))
    }

    pub fn into_change_set(self) -> ChangeSet {
        let mut changes = ChangeSet {
            movements: self.movements,
            ..ChangeSet::default()
        };

        let mut products = self.products;
        for product_id in self.product_order {
            let Some(working) = products.remove(&product_id) else {
                continue;
            };
            match working.origin {
                Origin::New => changes.product_inserts.push(working.product),
                Origin::Loaded {
                    product_version,
                    variant_versions,
                } => {
                    let mut written = HashSet::new();
                    for variant_id in &working.dirty_variants {
                        let (Some(variant), Some(&expected_version)) = (
                            working.product.variant(variant_id),
                            variant_versions.get(variant_id),
                        ) else {
                            continue;
                        };
                        if written.insert(*variant_id) {
                            changes.variant_writes.push(VariantWrite {
                                product_id,
                                variant: variant.clone(),
                                expected_version,
                            });
                        }
                    }
                    if working.metadata_dirty {
                        changes.product_updates.push(ProductMetadataWrite {
                            product: working.product,
                            expected_version: product_version,
                        });
                    }
                }
            }
        }

        let mut orders = self.orders;
        for order_id in self.order_order {
            if let Some(write) = orders.remove(&order_id).and_then(WorkingDoc::into_write) {
                changes.orders.push(write);
            }
        }

        let mut purchase_orders = self.purchase_orders;
        for po_id in self.purchase_order_order {
            if let Some(write) = purchase_orders.remove(&po_id).and_then(WorkingDoc::into_write) {
                changes.purchase_orders.push(write);
            }
        }

        changes
    }
}

/// Run `work` in a fresh unit of work and commit it, retrying the whole call
/// when the commit hits a version conflict.
///
/// Business-rule errors from `work` are returned immediately. After
/// `max_retries` extra attempts a conflict surfaces as `WorkflowError::Conflict`.
pub fn transact<S, T, F>(
    store: &S,
    tenant_id: TenantId,
    max_retries: u32,
    mut work: F,
) -> Result<T, WorkflowError>
where
    S: InventoryStore + ?Sized,
    F: FnMut(&mut UnitOfWork<'_, S>) -> Result<T, WorkflowError>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let mut uow = UnitOfWork::begin(store, tenant_id);
        let value = work(&mut uow)?;

        match store.commit(tenant_id, uow.into_change_set()) {
            Ok(()) => return Ok(value),
            Err(StoreError::Concurrency(reason)) if attempt <= max_retries => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    attempt,
                    reason = %reason,
                    "commit conflict, retrying"
                );
            }
            Err(StoreError::Concurrency(reason)) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    attempt,
                    reason = %reason,
                    "commit conflict, giving up"
                );
                return Err(WorkflowError::Conflict(format!(
                    "gave up after {attempt} attempts: {reason}"
                )));
            }
            Err(other) => return Err(other.into()),
        }
    }
}

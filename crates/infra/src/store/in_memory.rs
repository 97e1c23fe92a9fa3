use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use stockroom_catalog::{Product, ProductId, VariantId, normalize_sku};
use stockroom_core::{AggregateRoot, Entity, TenantId};
use stockroom_ledger::{MovementQuery, StockMovement};
use stockroom_purchasing::{PurchaseOrder, PurchaseOrderId, Supplier, SupplierId};
use stockroom_sales::{Order, OrderId};

use super::r#trait::{ChangeSet, DocumentWrite, InventoryStore};
use crate::error::StoreError;

/// Everything one tenant owns.
#[derive(Debug, Default)]
struct TenantState {
    products: HashMap<ProductId, Product>,
    skus: HashMap<String, (ProductId, VariantId)>,
    orders: HashMap<OrderId, Order>,
    order_numbers: HashSet<String>,
    purchase_orders: HashMap<PurchaseOrderId, PurchaseOrder>,
    po_numbers: HashSet<String>,
    suppliers: HashMap<SupplierId, Supplier>,
    /// Append-only ledger; the index maps hold positions into it.
    movements: Vec<StockMovement>,
    movements_by_product: HashMap<ProductId, Vec<usize>>,
    movements_by_sku: HashMap<String, Vec<usize>>,
    sequences: HashMap<String, u64>,
}

/// In-memory inventory store.
///
/// Each tenant lives behind its own lock, so tenants never contend with each
/// other. A commit holds its tenant's write lock for validation and apply,
/// which makes it atomic with respect to every other reader and writer of
/// that tenant.
///
/// Intended for tests/dev and as the reference for persistent backends.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tenants: RwLock<HashMap<TenantId, Arc<RwLock<TenantState>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, tenant_id: TenantId) -> Result<Arc<RwLock<TenantState>>, StoreError> {
        {
            let tenants = self.tenants.read().map_err(|_| StoreError::Poisoned)?;
            if let Some(shard) = tenants.get(&tenant_id) {
                return Ok(shard.clone());
            }
        }
        let mut tenants = self.tenants.write().map_err(|_| StoreError::Poisoned)?;
        Ok(tenants.entry(tenant_id).or_default().clone())
    }

    fn read<T>(
        &self,
        tenant_id: TenantId,
        f: impl FnOnce(&TenantState) -> T,
    ) -> Result<T, StoreError> {
        let shard = self.shard(tenant_id)?;
        let state = shard.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&state))
    }

    fn write<T>(
        &self,
        tenant_id: TenantId,
        f: impl FnOnce(&mut TenantState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let shard = self.shard(tenant_id)?;
        let mut state = shard.write().map_err(|_| StoreError::Poisoned)?;
        f(&mut state)
    }
}

fn ensure_tenant(tenant_id: TenantId, changes: &ChangeSet) -> Result<(), StoreError> {
    let mismatch = |what: &str, owner: TenantId| {
        StoreError::TenantIsolation(format!(
            "{what} belongs to tenant {owner}, commit is for {tenant_id}"
        ))
    };

    for p in &changes.product_inserts {
        if p.tenant_id() != tenant_id {
            return Err(mismatch("product", p.tenant_id()));
        }
    }
    for w in &changes.product_updates {
        if w.product.tenant_id() != tenant_id {
            return Err(mismatch("product", w.product.tenant_id()));
        }
    }
    for m in &changes.movements {
        if m.tenant_id != tenant_id {
            return Err(mismatch("movement", m.tenant_id));
        }
    }
    for w in &changes.orders {
        if let DocumentWrite::Insert(o) | DocumentWrite::Update { document: o, .. } = w {
            if o.tenant_id() != tenant_id {
                return Err(mismatch("order", o.tenant_id()));
            }
        }
    }
    for w in &changes.purchase_orders {
        if let DocumentWrite::Insert(po) | DocumentWrite::Update { document: po, .. } = w {
            if po.tenant_id() != tenant_id {
                return Err(mismatch("purchase order", po.tenant_id()));
            }
        }
    }
    Ok(())
}

fn stale(what: &str, id: impl core::fmt::Display, expected: u64, actual: u64) -> StoreError {
    StoreError::Concurrency(format!(
        "{what} {id}: expected version {expected}, found {actual}"
    ))
}

fn check_document<T, Id>(
    what: &str,
    writes: &[DocumentWrite<T, Id>],
    stored: &HashMap<Id, T>,
    numbers: &HashSet<String>,
    number_of: impl Fn(&T) -> &str,
) -> Result<(), StoreError>
where
    T: AggregateRoot<Id = Id>,
    Id: Copy + Eq + core::hash::Hash + core::fmt::Display,
{
    let mut new_numbers = HashSet::new();
    for write in writes {
        match write {
            DocumentWrite::Insert(doc) => {
                let number = number_of(doc);
                if stored.contains_key(doc.id()) {
                    return Err(StoreError::Duplicate(format!("{what} {}", doc.id())));
                }
                if numbers.contains(number) || !new_numbers.insert(number.to_string()) {
                    return Err(StoreError::Duplicate(format!("{what} number {number}")));
                }
            }
            DocumentWrite::Update {
                document,
                expected_version,
            } => {
                let current = stored
                    .get(document.id())
                    .ok_or_else(|| StoreError::Concurrency(format!("{what} {} vanished", document.id())))?;
                if current.version() != *expected_version {
                    return Err(stale(what, document.id(), *expected_version, current.version()));
                }
            }
            DocumentWrite::Delete {
                id,
                expected_version,
            } => {
                let current = stored
                    .get(id)
                    .ok_or_else(|| StoreError::Concurrency(format!("{what} {id} vanished")))?;
                if current.version() != *expected_version {
                    return Err(stale(what, id, *expected_version, current.version()));
                }
            }
        }
    }
    Ok(())
}

impl TenantState {
    fn validate(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        let mut new_skus = HashSet::new();
        for product in &changes.product_inserts {
            if self.products.contains_key(&product.id_typed()) {
                return Err(StoreError::Duplicate(format!("product {}", product.id_typed())));
            }
            for variant in product.variants() {
                if self.skus.contains_key(variant.sku()) || !new_skus.insert(variant.sku()) {
                    return Err(StoreError::Duplicate(format!("sku {}", variant.sku())));
                }
            }
        }

        for write in &changes.product_updates {
            let id = write.product.id_typed();
            let current = self
                .products
                .get(&id)
                .ok_or_else(|| StoreError::Concurrency(format!("product {id} vanished")))?;
            if current.version() != write.expected_version {
                return Err(stale("product", id, write.expected_version, current.version()));
            }
        }

        for write in &changes.variant_writes {
            let variant_id = *write.variant.id();
            let current = self
                .products
                .get(&write.product_id)
                .and_then(|p| p.variant(&variant_id))
                .ok_or_else(|| StoreError::Concurrency(format!("variant {variant_id} vanished")))?;
            if current.version() != write.expected_version {
                return Err(stale(
                    "variant",
                    write.variant.sku(),
                    write.expected_version,
                    current.version(),
                ));
            }
        }

        // The stale-version check only covers the written variants; siblings
        // may have moved since the read, so the summed cache is rechecked here.
        let mut projected: HashMap<ProductId, HashMap<VariantId, i64>> = HashMap::new();
        for write in &changes.variant_writes {
            projected
                .entry(write.product_id)
                .or_default()
                .insert(write.variant.id_typed(), write.variant.stock());
        }
        for (product_id, replaced) in &projected {
            if let Some(product) = self.products.get(product_id) {
                product
                    .projected_total_stock(replaced)
                    .map_err(|e| StoreError::Concurrency(format!("product {product_id}: {e}")))?;
            }
        }

        check_document("order", &changes.orders, &self.orders, &self.order_numbers, |o| {
            o.order_number()
        })?;
        check_document(
            "purchase order",
            &changes.purchase_orders,
            &self.purchase_orders,
            &self.po_numbers,
            |po| po.po_number(),
        )?;

        Ok(())
    }

    /// Only called after `validate` succeeded on the same lock guard.
    fn apply(&mut self, changes: ChangeSet) -> Result<(), StoreError> {
        for product in changes.product_inserts {
            let product_id = product.id_typed();
            for variant in product.variants() {
                self.skus
                    .insert(variant.sku().to_string(), (product_id, variant.id_typed()));
            }
            self.products.insert(product_id, product);
        }

        for write in changes.product_updates {
            if let Some(stored) = self.products.get_mut(&write.product.id_typed()) {
                stored.adopt_metadata(&write.product);
                stored.bump_version();
            }
        }

        for write in changes.variant_writes {
            let stored = self
                .products
                .get_mut(&write.product_id)
                .ok_or_else(|| StoreError::Concurrency(format!("product {} vanished", write.product_id)))?;
            stored
                .apply_variant(write.variant)
                .map_err(|e| StoreError::Concurrency(e.to_string()))?;
        }

        for movement in changes.movements {
            let pos = self.movements.len();
            self.movements_by_product
                .entry(movement.product_id)
                .or_default()
                .push(pos);
            self.movements_by_sku
                .entry(movement.sku.clone())
                .or_default()
                .push(pos);
            self.movements.push(movement);
        }

        for write in changes.orders {
            match write {
                DocumentWrite::Insert(order) => {
                    self.order_numbers.insert(order.order_number().to_string());
                    self.orders.insert(order.id_typed(), order);
                }
                DocumentWrite::Update { document, .. } => {
                    self.orders.insert(document.id_typed(), document);
                }
                DocumentWrite::Delete { id, .. } => {
                    if let Some(order) = self.orders.remove(&id) {
                        self.order_numbers.remove(order.order_number());
                    }
                }
            }
        }

        for write in changes.purchase_orders {
            match write {
                DocumentWrite::Insert(po) => {
                    self.po_numbers.insert(po.po_number().to_string());
                    self.purchase_orders.insert(po.id_typed(), po);
                }
                DocumentWrite::Update { document, .. } => {
                    self.purchase_orders.insert(document.id_typed(), document);
                }
                DocumentWrite::Delete { id, .. } => {
                    if let Some(po) = self.purchase_orders.remove(&id) {
                        self.po_numbers.remove(po.po_number());
                    }
                }
            }
        }

        Ok(())
    }
}

impl InventoryStore for InMemoryStore {
    fn load_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Option<Product>, StoreError> {
        self.read(tenant_id, |s| s.products.get(&product_id).cloned())
    }

    fn list_products(&self, tenant_id: TenantId) -> Result<Vec<Product>, StoreError> {
        self.read(tenant_id, |s| {
            let mut products: Vec<Product> = s.products.values().cloned().collect();
            products.sort_by(|a, b| a.name().cmp(b.name()));
            products
        })
    }

    fn find_sku(
        &self,
        tenant_id: TenantId,
        sku: &str,
    ) -> Result<Option<(ProductId, VariantId)>, StoreError> {
        let sku = normalize_sku(sku);
        self.read(tenant_id, |s| s.skus.get(&sku).copied())
    }

    fn load_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<Option<Order>, StoreError> {
        self.read(tenant_id, |s| s.orders.get(&order_id).cloned())
    }

    fn list_orders(&self, tenant_id: TenantId) -> Result<Vec<Order>, StoreError> {
        self.read(tenant_id, |s| {
            let mut orders: Vec<Order> = s.orders.values().cloned().collect();
            orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
            orders
        })
    }

    fn load_purchase_order(
        &self,
        tenant_id: TenantId,
        po_id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, StoreError> {
        self.read(tenant_id, |s| s.purchase_orders.get(&po_id).cloned())
    }

    fn list_purchase_orders(&self, tenant_id: TenantId) -> Result<Vec<PurchaseOrder>, StoreError> {
        self.read(tenant_id, |s| {
            let mut pos: Vec<PurchaseOrder> = s.purchase_orders.values().cloned().collect();
            pos.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
            pos
        })
    }

    fn load_supplier(
        &self,
        tenant_id: TenantId,
        supplier_id: SupplierId,
    ) -> Result<Option<Supplier>, StoreError> {
        self.read(tenant_id, |s| s.suppliers.get(&supplier_id).cloned())
    }

    fn insert_supplier(&self, supplier: Supplier) -> Result<(), StoreError> {
        self.write(supplier.tenant_id(), |s| {
            let id = supplier.id_typed();
            if s.suppliers.contains_key(&id) {
                return Err(StoreError::Duplicate(format!("supplier {id}")));
            }
            s.suppliers.insert(id, supplier);
            Ok(())
        })
    }

    fn next_sequence(&self, tenant_id: TenantId, name: &str) -> Result<u64, StoreError> {
        self.write(tenant_id, |s| {
            let seq = s.sequences.entry(name.to_string()).or_insert(0);
            *seq += 1;
            Ok(*seq)
        })
    }

    fn movements(
        &self,
        tenant_id: TenantId,
        query: &MovementQuery,
        limit: usize,
    ) -> Result<Vec<StockMovement>, StoreError> {
        self.read(tenant_id, |s| {
            let indexed: Option<&[usize]> = match query {
                MovementQuery::ByProduct(id) => Some(
                    s.movements_by_product
                        .get(id)
                        .map(Vec::as_slice)
                        .unwrap_or(&[]),
                ),
                MovementQuery::BySku(sku) => Some(
                    s.movements_by_sku
                        .get(&normalize_sku(sku))
                        .map(Vec::as_slice)
                        .unwrap_or(&[]),
                ),
                _ => None,
            };

            match indexed {
                Some(positions) => positions
                    .iter()
                    .rev()
                    .filter_map(|&pos| s.movements.get(pos))
                    .filter(|m| query.matches(m))
                    .take(limit)
                    .cloned()
                    .collect(),
                None => s
                    .movements
                    .iter()
                    .rev()
                    .filter(|m| query.matches(m))
                    .take(limit)
                    .cloned()
                    .collect(),
            }
        })
    }

    fn commit(&self, tenant_id: TenantId, changes: ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }
        ensure_tenant(tenant_id, &changes)?;

        self.write(tenant_id, |state| {
            state.validate(&changes)?;
            state.apply(changes)
        })
    }
}

use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateId, TenantId, UserId};
use stockroom_events::{ChangeEvent, ChangeNotifier, ChangeTopic};
use stockroom_ledger::{MovementRequest, MovementType, ReferenceType};
use stockroom_purchasing::{
    NewPurchaseOrderItem, PurchaseOrder, PurchaseOrderId, PurchaseOrderItem, PurchaseOrderStatus,
    Receipt, Supplier, SupplierId,
};

use crate::config::StockroomConfig;
use crate::engine;
use crate::error::WorkflowError;
use crate::numbering::next_document_number;
use crate::services::notify;
use crate::store::InventoryStore;
use crate::unit_of_work::transact;

/// Input for a new purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    pub supplier_id: SupplierId,
    pub items: Vec<NewPurchaseOrderItem>,
    #[serde(default)]
    pub tax: u64,
    #[serde(default)]
    pub shipping_cost: u64,
    pub notes: Option<String>,
}

/// Optional narrowing for [`PurchaseOrderWorkflow::list_purchase_orders`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<SupplierId>,
}

/// Supplier-side lifecycle: draft, receive, status bookkeeping.
#[derive(Debug)]
pub struct PurchaseOrderWorkflow<S, N> {
    store: S,
    notifier: N,
    config: StockroomConfig,
}

impl<S, N> PurchaseOrderWorkflow<S, N>
where
    S: InventoryStore,
    N: ChangeNotifier,
{
    pub fn new(store: S, notifier: N, config: StockroomConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn register_supplier(
        &self,
        tenant_id: TenantId,
        name: &str,
        email: Option<String>,
    ) -> Result<Supplier, WorkflowError> {
        let supplier = Supplier::new(tenant_id, SupplierId::new(AggregateId::new()), name, email)?;
        self.store.insert_supplier(supplier.clone())?;
        tracing::info!(supplier_id = %supplier.id_typed(), name = supplier.name(), "supplier registered");
        Ok(supplier)
    }

    pub fn get_supplier(
        &self,
        tenant_id: TenantId,
        supplier_id: SupplierId,
    ) -> Result<Supplier, WorkflowError> {
        self.store
            .load_supplier(tenant_id, supplier_id)?
            .ok_or_else(|| WorkflowError::not_found("supplier", supplier_id))
    }

    /// Draft a PO. No stock moves until goods are received.
    #[tracing::instrument(
        skip(self, input),
        fields(supplier_id = %input.supplier_id, items = input.items.len()),
        err
    )]
    pub fn create_purchase_order(
        &self,
        tenant_id: TenantId,
        input: NewPurchaseOrder,
        performed_by: UserId,
    ) -> Result<PurchaseOrder, WorkflowError> {
        if input.items.is_empty() {
            return Err(WorkflowError::Validation(
                "purchase order must have at least one item".to_string(),
            ));
        }

        let po_id = PurchaseOrderId::new(AggregateId::new());
        let po_number = next_document_number(
            &self.store,
            tenant_id,
            &self.config.po_number_prefix,
            chrono::Utc::now(),
        )?;

        let po = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                let supplier = uow.supplier(input.supplier_id)?;

                let mut lines = Vec::with_capacity(input.items.len());
                for item in &input.items {
                    let product = uow.product(item.product_id)?;
                    let variant = product.require_variant(&item.variant_id)?;
                    lines.push(PurchaseOrderItem::new(
                        item.product_id,
                        item.variant_id,
                        variant.sku(),
                        product.name(),
                        item.quantity,
                        item.unit_price.unwrap_or(variant.price()),
                    ));
                }

                let po = PurchaseOrder::draft(
                    tenant_id,
                    po_id,
                    po_number.clone(),
                    &supplier,
                    lines,
                    input.tax,
                    input.shipping_cost,
                    input.notes.clone(),
                    performed_by,
                    uow.now(),
                )?;
                Ok(uow.insert_purchase_order(po))
            },
        )?;

        tracing::info!(
            po_id = %po.id_typed(),
            po_number = po.po_number(),
            total_amount = po.total_amount(),
            "purchase order created"
        );

        notify(
            &self.notifier,
            ChangeEvent::for_entity(
                tenant_id,
                ChangeTopic::PoCreated,
                format!("Purchase order {} created", po.po_number()),
                &po,
            ),
        );

        Ok(po)
    }

    /// Book arriving goods: each receipt becomes a `purchase` movement, and the
    /// PO moves to `Partially Received` or `Received`.
    #[tracing::instrument(skip(self, receipts), fields(receipts = receipts.len()), err)]
    pub fn receive_items(
        &self,
        tenant_id: TenantId,
        po_id: PurchaseOrderId,
        receipts: Vec<Receipt>,
        performed_by: UserId,
    ) -> Result<PurchaseOrder, WorkflowError> {
        let po = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                let mut po = uow.purchase_order(po_id)?.clone();
                let planned = po.plan_receipts(&receipts)?;

                for receipt in &planned {
                    let request = MovementRequest::new(
                        receipt.product_id,
                        receipt.variant_id,
                        MovementType::Purchase,
                        receipt.quantity,
                        performed_by,
                    )
                    .with_unit_price(receipt.unit_price)
                    .with_reason(format!("Purchase order {} received", po.po_number()))
                    .with_reference(ReferenceType::PurchaseOrder, po_id.0);
                    engine::apply_movement(uow, &request)?;
                }

                po.apply_receipts(&planned, uow.now());
                uow.update_purchase_order(po)
            },
        )?;

        tracing::info!(
            po_number = po.po_number(),
            status = %po.status(),
            "purchase order items received"
        );

        notify(
            &self.notifier,
            ChangeEvent::for_entity(
                tenant_id,
                ChangeTopic::PoReceived,
                format!("Purchase order {} is {}", po.po_number(), po.status()),
                &po,
            ),
        );

        Ok(po)
    }

    /// Metadata-only status change; `status` is normalized before matching.
    #[tracing::instrument(skip(self), err)]
    pub fn update_status(
        &self,
        tenant_id: TenantId,
        po_id: PurchaseOrderId,
        status: &str,
    ) -> Result<PurchaseOrder, WorkflowError> {
        let next: PurchaseOrderStatus = status.parse()?;

        let (po, changed) = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                let mut po = uow.purchase_order(po_id)?.clone();
                if !po.set_status(next, uow.now()) {
                    return Ok((po, false));
                }
                Ok((uow.update_purchase_order(po)?, true))
            },
        )?;

        if changed {
            tracing::info!(po_number = po.po_number(), status = %po.status(), "purchase order status updated");
            notify(
                &self.notifier,
                ChangeEvent::for_entity(
                    tenant_id,
                    ChangeTopic::PoUpdated,
                    format!("Purchase order {} is now {}", po.po_number(), po.status()),
                    &po,
                ),
            );
        }

        Ok(po)
    }

    /// Remove a PO that is still a draft.
    #[tracing::instrument(skip(self), err)]
    pub fn delete_purchase_order(
        &self,
        tenant_id: TenantId,
        po_id: PurchaseOrderId,
    ) -> Result<(), WorkflowError> {
        let po = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                let po = uow.purchase_order(po_id)?.clone();
                po.ensure_deletable()?;
                uow.delete_purchase_order(po_id)?;
                Ok(po)
            },
        )?;

        tracing::info!(po_number = po.po_number(), "purchase order deleted");

        notify(
            &self.notifier,
            ChangeEvent::for_entity(
                tenant_id,
                ChangeTopic::PoDeleted,
                format!("Purchase order {} deleted", po.po_number()),
                &po,
            ),
        );

        Ok(())
    }

    pub fn get_purchase_order(
        &self,
        tenant_id: TenantId,
        po_id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, WorkflowError> {
        self.store
            .load_purchase_order(tenant_id, po_id)?
            .ok_or_else(|| WorkflowError::not_found("purchase order", po_id))
    }

    /// Newest first.
    pub fn list_purchase_orders(
        &self,
        tenant_id: TenantId,
        filter: PurchaseOrderFilter,
    ) -> Result<Vec<PurchaseOrder>, WorkflowError> {
        Ok(self
            .store
            .list_purchase_orders(tenant_id)?
            .into_iter()
            .filter(|po| filter.status.is_none_or(|s| po.status() == s))
            .filter(|po| filter.supplier_id.is_none_or(|id| po.supplier_id() == id))
            .collect())
    }
}

use std::collections::HashMap;

use stockroom_catalog::VariantId;
use stockroom_core::{AggregateId, TenantId, UserId};
use stockroom_events::{ChangeEvent, ChangeNotifier, ChangeTopic};
use stockroom_ledger::{MovementRequest, MovementType, ReferenceType};
use stockroom_sales::{Customer, NewOrderItem, Order, OrderId, OrderItem, OrderStatus, StatusChange};

use crate::config::StockroomConfig;
use crate::engine;
use crate::error::WorkflowError;
use crate::numbering::next_document_number;
use crate::services::notify;
use crate::store::InventoryStore;
use crate::unit_of_work::{UnitOfWork, transact};

/// Customer order lifecycle with its stock effects.
#[derive(Debug)]
pub struct OrderWorkflow<S, N> {
    store: S,
    notifier: N,
    config: StockroomConfig,
}

impl<S, N> OrderWorkflow<S, N>
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

    /// Place an order: every line becomes a `sale` movement, and either all of
    /// them commit together with the order or none do.
    #[tracing::instrument(skip(self, customer, items, notes), fields(items = items.len()), err)]
    pub fn create_order(
        &self,
        tenant_id: TenantId,
        customer: Customer,
        items: Vec<NewOrderItem>,
        notes: Option<String>,
        performed_by: UserId,
    ) -> Result<Order, WorkflowError> {
        if items.is_empty() {
            return Err(WorkflowError::Validation(
                "order must have at least one item".to_string(),
            ));
        }

        let order_id = OrderId::new(AggregateId::new());
        let order_number = next_document_number(
            &self.store,
            tenant_id,
            &self.config.order_number_prefix,
            chrono::Utc::now(),
        )?;

        let order = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                let mut lines = Vec::with_capacity(items.len());
                for item in &items {
                    let product = uow.product(item.product_id)?;
                    let variant = product.require_variant(&item.variant_id)?;
                    lines.push(OrderItem {
                        product_id: item.product_id,
                        variant_id: item.variant_id,
                        sku: variant.sku().to_string(),
                        product_name: product.name().to_string(),
                        quantity: item.quantity,
                        unit_price: item.unit_price.unwrap_or(variant.price()),
                    });
                }

                let order = Order::place(
                    tenant_id,
                    order_id,
                    order_number.clone(),
                    customer.clone(),
                    lines,
                    notes.clone(),
                    performed_by,
                    uow.now(),
                )?;

                precheck_stock(uow, &order)?;

                for line in order.items() {
                    let request = MovementRequest::new(
                        line.product_id,
                        line.variant_id,
                        MovementType::Sale,
                        line.quantity,
                        performed_by,
                    )
                    .with_unit_price(line.unit_price)
                    .with_reason(format!("Order {}", order.order_number()))
                    .with_reference(ReferenceType::Order, order_id.0);
                    engine::apply_movement(uow, &request)?;
                }

                Ok(uow.insert_order(order))
            },
        )?;

        tracing::info!(
            order_id = %order.id_typed(),
            order_number = order.order_number(),
            total_amount = order.total_amount(),
            "order created"
        );

        notify(
            &self.notifier,
            ChangeEvent::for_entity(
                tenant_id,
                ChangeTopic::OrderCreated,
                format!("Order {} created", order.order_number()),
                &order,
            ),
        );

        Ok(order)
    }

    /// Move an order to `status` (parsed case-insensitively).
    ///
    /// Cancelling puts every line back into stock with `return` movements.
    /// Asking for the current status changes nothing and notifies nobody.
    #[tracing::instrument(skip(self), err)]
    pub fn update_order_status(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        status: &str,
        performed_by: UserId,
    ) -> Result<Order, WorkflowError> {
        let next: OrderStatus = status.parse()?;

        let (order, changed) = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                let mut order = uow.order(order_id)?.clone();
                match order.plan_transition(next)? {
                    StatusChange::NoOp => Ok((order, false)),
                    StatusChange::Cancel => {
                        restore_stock(uow, &order, performed_by, "cancelled")?;
                        order.set_status(OrderStatus::Cancelled, uow.now());
                        Ok((uow.update_order(order)?, true))
                    }
                    StatusChange::Update(status) => {
                        order.set_status(status, uow.now());
                        Ok((uow.update_order(order)?, true))
                    }
                }
            },
        )?;

        if changed {
            tracing::info!(
                order_number = order.order_number(),
                status = %order.status(),
                "order status updated"
            );
            notify(
                &self.notifier,
                ChangeEvent::for_entity(
                    tenant_id,
                    ChangeTopic::OrderUpdated,
                    format!("Order {} is now {}", order.order_number(), order.status()),
                    &order,
                ),
            );
        }

        Ok(order)
    }

    /// Soft-delete a pending order and put its stock back.
    #[tracing::instrument(skip(self), err)]
    pub fn delete_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        performed_by: UserId,
    ) -> Result<(), WorkflowError> {
        let order = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                let mut order = uow.order(order_id)?.clone();
                order.ensure_deletable()?;
                restore_stock(uow, &order, performed_by, "deleted")?;
                order.mark_deleted(uow.now());
                uow.update_order(order)
            },
        )?;

        tracing::info!(order_number = order.order_number(), "order deleted");

        notify(
            &self.notifier,
            ChangeEvent::for_entity(
                tenant_id,
                ChangeTopic::OrderDeleted,
                format!("Order {} deleted", order.order_number()),
                &order,
            ),
        );

        Ok(())
    }

    pub fn get_order(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Order, WorkflowError> {
        self.store
            .load_order(tenant_id, order_id)?
            .filter(|o| !o.is_deleted())
            .ok_or_else(|| WorkflowError::not_found("order", order_id))
    }

    /// Live orders, newest first, optionally narrowed to one status.
    pub fn list_orders(
        &self,
        tenant_id: TenantId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, WorkflowError> {
        Ok(self
            .store
            .list_orders(tenant_id)?
            .into_iter()
            .filter(|o| !o.is_deleted())
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .collect())
    }
}

/// Reject the whole order up front if any variant cannot cover the sum of
/// its lines.
fn precheck_stock<S>(uow: &mut UnitOfWork<'_, S>, order: &Order) -> Result<(), WorkflowError>
where
    S: InventoryStore + ?Sized,
{
    let mut requested: HashMap<VariantId, i64> = HashMap::new();
    for line in order.items() {
        *requested.entry(line.variant_id).or_insert(0) += line.quantity;
    }

    for line in order.items() {
        let Some(wanted) = requested.remove(&line.variant_id) else {
            continue;
        };
        let variant = uow
            .product(line.product_id)?
            .require_variant(&line.variant_id)?;
        if variant.stock() < wanted {
            tracing::debug!(sku = variant.sku(), available = variant.stock(), wanted, "order rejected");
            return Err(WorkflowError::InsufficientStock {
                sku: variant.sku().to_string(),
                available: variant.stock(),
                requested: wanted,
            });
        }
    }
    Ok(())
}

fn restore_stock<S>(
    uow: &mut UnitOfWork<'_, S>,
    order: &Order,
    performed_by: UserId,
    why: &str,
) -> Result<(), WorkflowError>
where
    S: InventoryStore + ?Sized,
{
    for line in order.items() {
        let request = MovementRequest::new(
            line.product_id,
            line.variant_id,
            MovementType::Return,
            line.quantity,
            performed_by,
        )
        .with_unit_price(line.unit_price)
        .with_reason(format!("Order {} {}", order.order_number(), why))
        .with_reference(ReferenceType::Order, order.id_typed().0);
        engine::apply_movement(uow, &request)?;
    }
    Ok(())
}

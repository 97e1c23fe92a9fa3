use serde::Serialize;

use stockroom_catalog::{ProductId, Variant};
use stockroom_core::TenantId;
use stockroom_events::{ChangeEvent, ChangeNotifier, ChangeTopic};
use stockroom_ledger::{MovementQuery, MovementRequest, StockMovement};

use crate::config::StockroomConfig;
use crate::engine::{self, AppliedMovement};
use crate::error::WorkflowError;
use crate::services::notify;
use crate::store::InventoryStore;
use crate::unit_of_work::transact;

/// A variant that needs attention, with enough product context to act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAlert {
    pub product_id: ProductId,
    pub product_name: String,
    pub variant: Variant,
}

/// Manual stock movements and ledger reads.
#[derive(Debug)]
pub struct StockService<S, N> {
    store: S,
    notifier: N,
    config: StockroomConfig,
}

impl<S, N> StockService<S, N>
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

    /// Apply a single movement and commit it.
    #[tracing::instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            variant_id = %request.variant_id,
            movement_type = %request.movement_type
        ),
        err
    )]
    pub fn apply_movement(
        &self,
        tenant_id: TenantId,
        request: MovementRequest,
    ) -> Result<AppliedMovement, WorkflowError> {
        let (applied, product) = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                let applied = engine::apply_movement(uow, &request)?;
                let product = uow.product(request.product_id)?.clone();
                Ok((applied, product))
            },
        )?;

        tracing::info!(
            sku = %applied.movement.sku,
            previous_stock = applied.movement.previous_stock,
            new_stock = applied.movement.new_stock,
            "stock movement committed"
        );

        notify(
            &self.notifier,
            ChangeEvent::for_entity(
                tenant_id,
                ChangeTopic::ProductUpdated,
                format!(
                    "Stock for {} is now {}",
                    applied.movement.sku, applied.movement.new_stock
                ),
                &product,
            ),
        );

        Ok(applied)
    }

    /// Newest-first movements, capped at the configured history limit.
    pub fn movement_history(
        &self,
        tenant_id: TenantId,
        query: &MovementQuery,
        limit: Option<usize>,
    ) -> Result<Vec<StockMovement>, WorkflowError> {
        let cap = self.config.movement_history_limit;
        let limit = limit.map_or(cap, |l| l.min(cap));
        Ok(self.store.movements(tenant_id, query, limit)?)
    }

    /// Active products' variants with `0 < stock <= threshold`.
    pub fn low_stock(&self, tenant_id: TenantId) -> Result<Vec<StockAlert>, WorkflowError> {
        self.alerts(tenant_id, Variant::is_low_stock)
    }

    pub fn out_of_stock(&self, tenant_id: TenantId) -> Result<Vec<StockAlert>, WorkflowError> {
        self.alerts(tenant_id, Variant::is_out_of_stock)
    }

    fn alerts(
        &self,
        tenant_id: TenantId,
        wanted: fn(&Variant) -> bool,
    ) -> Result<Vec<StockAlert>, WorkflowError> {
        let products = self.store.list_products(tenant_id)?;
        Ok(products
            .iter()
            .filter(|p| p.is_active())
            .flat_map(|p| {
                p.variants()
                    .filter(|v| v.is_active() && wanted(v))
                    .map(move |v| StockAlert {
                        product_id: p.id_typed(),
                        product_name: p.name().to_string(),
                        variant: v.clone(),
                    })
            })
            .collect())
    }
}

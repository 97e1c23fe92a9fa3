use stockroom_catalog::{NewProduct, Product, ProductId, Variant, normalize_sku};
use stockroom_core::{AggregateId, TenantId, UserId};
use stockroom_events::{ChangeEvent, ChangeNotifier, ChangeTopic};
use stockroom_ledger::{MovementRequest, MovementType, ReferenceType, StockDirection};

use crate::config::StockroomConfig;
use crate::engine;
use crate::error::WorkflowError;
use crate::services::notify;
use crate::store::InventoryStore;
use crate::unit_of_work::transact;

/// Product registration and product reads.
///
/// Only what the stock core needs to populate and inspect the variant store;
/// richer catalog editing lives outside this crate.
#[derive(Debug)]
pub struct CatalogService<S, N> {
    store: S,
    notifier: N,
    config: StockroomConfig,
}

impl<S, N> CatalogService<S, N>
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

    /// Register a product. Opening stock is booked as `adjustment` movements so
    /// the ledger reconciles from zero.
    #[tracing::instrument(skip(self, input), fields(name = %input.name, variants = input.variants.len()), err)]
    pub fn create_product(
        &self,
        tenant_id: TenantId,
        input: NewProduct,
        performed_by: UserId,
    ) -> Result<Product, WorkflowError> {
        for v in &input.variants {
            let sku = normalize_sku(&v.sku);
            if self.store.find_sku(tenant_id, &sku)?.is_some() {
                return Err(WorkflowError::Conflict(format!("sku {sku} already exists")));
            }
        }

        let (product, opening) = Product::create(
            tenant_id,
            ProductId::new(AggregateId::new()),
            input,
            self.config.default_low_stock_threshold,
            chrono::Utc::now(),
        )?;
        let product_id = product.id_typed();

        let created = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                uow.insert_product(product.clone())?;
                for stock in &opening {
                    let request = MovementRequest::new(
                        product_id,
                        stock.variant_id,
                        MovementType::Adjustment,
                        stock.quantity,
                        performed_by,
                    )
                    .with_direction(StockDirection::Increase)
                    .with_reference(ReferenceType::System, product_id.0);
                    engine::apply_movement(uow, &request)?;
                }
                Ok(uow.product(product_id)?.clone())
            },
        )?;

        tracing::info!(
            product_id = %product_id,
            total_stock = created.total_stock(),
            "product created"
        );

        notify(
            &self.notifier,
            ChangeEvent::for_entity(
                tenant_id,
                ChangeTopic::ProductCreated,
                format!("Product {} created", created.name()),
                &created,
            ),
        );

        Ok(created)
    }

    /// Soft delete: the product stays readable and keeps its ledger.
    #[tracing::instrument(skip(self), err)]
    pub fn deactivate_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Product, WorkflowError> {
        let product = transact(
            &self.store,
            tenant_id,
            self.config.max_conflict_retries,
            |uow| {
                let mut product = uow.product(product_id)?.clone();
                product.deactivate(uow.now());
                uow.stage_product_metadata(&product)?;
                Ok(uow.product(product_id)?.clone())
            },
        )?;

        tracing::info!(product_id = %product_id, "product deactivated");

        notify(
            &self.notifier,
            ChangeEvent::for_entity(
                tenant_id,
                ChangeTopic::ProductDeleted,
                format!("Product {} deleted", product.name()),
                &product,
            ),
        );

        Ok(product)
    }

    pub fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Product, WorkflowError> {
        self.store
            .load_product(tenant_id, product_id)?
            .ok_or_else(|| WorkflowError::not_found("product", product_id))
    }

    pub fn list_products(&self, tenant_id: TenantId) -> Result<Vec<Product>, WorkflowError> {
        Ok(self.store.list_products(tenant_id)?)
    }

    pub fn find_variant_by_sku(
        &self,
        tenant_id: TenantId,
        sku: &str,
    ) -> Result<(Product, Variant), WorkflowError> {
        let (product_id, variant_id) = self
            .store
            .find_sku(tenant_id, sku)?
            .ok_or_else(|| WorkflowError::not_found("sku", normalize_sku(sku)))?;
        let product = self.get_product(tenant_id, product_id)?;
        let variant = product.require_variant(&variant_id)?.clone();
        Ok((product, variant))
    }
}

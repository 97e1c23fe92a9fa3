//! Seeds an in-memory stockroom with demo tenants and walks the main
//! workflows once, printing a JSON summary.

mod data;

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use stockroom_catalog::Product;
use stockroom_core::{TenantId, UserId};
use stockroom_events::{ChangeEvent, ChangeNotifier};
use stockroom_infra::{
    CatalogService, InMemoryStore, NewPurchaseOrder, OrderWorkflow, PurchaseOrderWorkflow,
    StockService, StockroomConfig,
};
use stockroom_ledger::MovementQuery;
use stockroom_purchasing::{NewPurchaseOrderItem, Receipt};
use stockroom_sales::{Customer, NewOrderItem};

/// Writes every change event to the log instead of a socket.
#[derive(Debug, Clone, Copy)]
struct LoggingNotifier;

impl ChangeNotifier for LoggingNotifier {
    type Error = std::convert::Infallible;

    fn publish(&self, event: ChangeEvent) -> Result<(), Self::Error> {
        tracing::info!(
            tenant_id = %event.tenant_id(),
            topic = %event.topic(),
            "{}",
            event.message()
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct TenantSummary {
    tenant_id: TenantId,
    products: usize,
    total_units: i64,
    low_stock: Vec<String>,
    out_of_stock: Vec<String>,
    orders: Vec<String>,
    purchase_orders: Vec<String>,
    recent_movements: usize,
}

struct Services {
    catalog: CatalogService<Arc<InMemoryStore>, LoggingNotifier>,
    stock: StockService<Arc<InMemoryStore>, LoggingNotifier>,
    orders: OrderWorkflow<Arc<InMemoryStore>, LoggingNotifier>,
    purchasing: PurchaseOrderWorkflow<Arc<InMemoryStore>, LoggingNotifier>,
}

impl Services {
    fn new(store: Arc<InMemoryStore>, config: StockroomConfig) -> Self {
        Self {
            catalog: CatalogService::new(store.clone(), LoggingNotifier, config.clone()),
            stock: StockService::new(store.clone(), LoggingNotifier, config.clone()),
            orders: OrderWorkflow::new(store.clone(), LoggingNotifier, config.clone()),
            purchasing: PurchaseOrderWorkflow::new(store, LoggingNotifier, config),
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    stockroom_observability::init();

    let config = StockroomConfig::from_env();
    tracing::info!(?config, "seeding in-memory stockroom");

    let services = Services::new(Arc::new(InMemoryStore::new()), config);
    let operator = UserId::new();

    let tech = seed_tenant(
        &services,
        operator,
        data::electronics(),
        &[("Apple Inc.", "supplier@apple.com"), ("Samsung Electronics", "supplier@samsung.com")],
    )
    .context("seeding TechStore")?;
    let fashion = seed_tenant(
        &services,
        operator,
        data::apparel(),
        &[("Cotton Mills Co.", "sales@cottonmills.com")],
    )
    .context("seeding FashionHub")?;

    println!("{}", serde_json::to_string_pretty(&[tech, fashion])?);
    Ok(())
}

fn seed_tenant(
    services: &Services,
    operator: UserId,
    catalog: Vec<stockroom_catalog::NewProduct>,
    suppliers: &[(&str, &str)],
) -> anyhow::Result<TenantSummary> {
    let tenant_id = TenantId::new();

    let products = catalog
        .into_iter()
        .map(|p| services.catalog.create_product(tenant_id, p, operator))
        .collect::<Result<Vec<Product>, _>>()?;

    let mut supplier_ids = Vec::new();
    for (name, email) in suppliers {
        let supplier = services
            .purchasing
            .register_supplier(tenant_id, name, Some(email.to_string()))?;
        supplier_ids.push(supplier.id_typed());
    }

    let first = products.first().context("catalog is empty")?;
    let restock = lowest_variant(first).context("product without variants")?;

    // Restock the scarcest variant of the first product, in two deliveries.
    let supplier_id = *supplier_ids.first().context("no supplier")?;
    let po = services.purchasing.create_purchase_order(
        tenant_id,
        NewPurchaseOrder {
            supplier_id,
            items: vec![NewPurchaseOrderItem {
                product_id: first.id_typed(),
                variant_id: restock,
                quantity: 50,
                unit_price: None,
            }],
            tax: 0,
            shipping_cost: 2_500,
            notes: Some("Quarterly restock".to_string()),
        },
        operator,
    )?;
    services.purchasing.update_status(tenant_id, po.id_typed(), "sent")?;
    for quantity in [20, 30] {
        services.purchasing.receive_items(
            tenant_id,
            po.id_typed(),
            vec![Receipt {
                variant_id: restock,
                received_quantity: quantity,
            }],
            operator,
        )?;
    }

    // One order per product, then walk the first one through fulfilment.
    let mut order_numbers = Vec::new();
    for (i, product) in products.iter().enumerate() {
        let Some(variant) = product.variants().max_by_key(|v| v.stock()) else {
            continue;
        };
        let order = services.orders.create_order(
            tenant_id,
            Customer::named(format!("Walk-in customer {}", i + 1)),
            vec![NewOrderItem {
                product_id: product.id_typed(),
                variant_id: variant.id_typed(),
                quantity: 2,
                unit_price: None,
            }],
            None,
            operator,
        )?;
        order_numbers.push(order.order_number().to_string());
        if i == 0 {
            for status in ["processing", "shipped", "delivered"] {
                services
                    .orders
                    .update_order_status(tenant_id, order.id_typed(), status, operator)?;
            }
        }
    }

    let products = services.catalog.list_products(tenant_id)?;
    let purchase_orders = services
        .purchasing
        .list_purchase_orders(tenant_id, Default::default())?
        .iter()
        .map(|po| format!("{} ({})", po.po_number(), po.status()))
        .collect();

    Ok(TenantSummary {
        tenant_id,
        products: products.len(),
        total_units: products.iter().map(Product::total_stock).sum(),
        low_stock: services
            .stock
            .low_stock(tenant_id)?
            .into_iter()
            .map(|alert| alert.variant.sku().to_string())
            .collect(),
        out_of_stock: services
            .stock
            .out_of_stock(tenant_id)?
            .into_iter()
            .map(|alert| alert.variant.sku().to_string())
            .collect(),
        orders: order_numbers,
        purchase_orders,
        recent_movements: services
            .stock
            .movement_history(tenant_id, &MovementQuery::ByProduct(first.id_typed()), None)?
            .len(),
    })
}

fn lowest_variant(product: &Product) -> Option<stockroom_catalog::VariantId> {
    product
        .variants()
        .min_by_key(|v| v.stock())
        .map(|v| v.id_typed())
}

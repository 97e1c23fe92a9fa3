//! Stock mutation engine: the only code path that changes variant stock.

use serde::Serialize;

use stockroom_catalog::Variant;
use stockroom_ledger::{MovementRequest, StockMovement, classify};

use crate::error::WorkflowError;
use crate::store::InventoryStore;
use crate::unit_of_work::UnitOfWork;

/// Outcome of one applied movement (uncommitted until the unit of work commits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMovement {
    pub variant: Variant,
    pub movement: StockMovement,
}

/// Apply one movement to the working copy of its variant and stage the ledger row.
///
/// The stock read, the negativity check and the staged write all come from
/// the same working copy; the commit then verifies that copy is still current.
pub fn apply_movement<S>(
    uow: &mut UnitOfWork<'_, S>,
    request: &MovementRequest,
) -> Result<AppliedMovement, WorkflowError>
where
    S: InventoryStore + ?Sized,
{
    let tenant_id = uow.tenant_id();
    let now = uow.now();

    let current = uow
        .product(request.product_id)?
        .require_variant(&request.variant_id)?
        .clone();

    let direction = classify(request.movement_type, request.quantity, request.direction)?;
    let next = current
        .with_stock_delta(direction.apply_sign(request.quantity))
        .inspect_err(|e| {
            tracing::debug!(
                tenant_id = %tenant_id,
                sku = current.sku(),
                movement_type = %request.movement_type,
                error = %e,
                "movement rejected"
            );
        })?;

    // Unpriced movements are valued at the variant's list price.
    let priced = MovementRequest {
        unit_price: request.unit_price.or(Some(current.price())),
        ..request.clone()
    };
    let movement = StockMovement::record(
        tenant_id,
        &priced,
        current.sku(),
        direction,
        current.stock(),
        now,
    );

    uow.stage_variant(request.product_id, next.clone())?;
    uow.record_movement(movement.clone());

    Ok(AppliedMovement {
        variant: next,
        movement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    use stockroom_catalog::{NewProduct, NewVariant, Product, ProductId};
    use stockroom_core::{AggregateId, TenantId, UserId};
    use stockroom_ledger::{MovementType, StockDirection};

    use crate::store::{ChangeSet, InMemoryStore};

    fn seeded(store: &InMemoryStore, tenant_id: TenantId, stock: i64) -> Product {
        let (mut product, _) = Product::create(
            tenant_id,
            ProductId::new(AggregateId::new()),
            NewProduct {
                name: "USB-C Charger".to_string(),
                category: "Accessories".to_string(),
                description: None,
                base_price: 2_500,
                variants: vec![NewVariant {
                    sku: "CHG-20W".to_string(),
                    attributes: BTreeMap::new(),
                    price: 2_500,
                    initial_stock: 0,
                    low_stock_threshold: None,
                }],
            },
            10,
            Utc::now(),
        )
        .unwrap();
        let v = product.variants().next().unwrap().with_stock_delta(stock).unwrap();
        product.apply_variant(v).unwrap();
        store
            .commit(
                tenant_id,
                ChangeSet {
                    product_inserts: vec![product.clone()],
                    ..ChangeSet::default()
                },
            )
            .unwrap();
        product
    }

    fn sale(product: &Product, qty: i64) -> MovementRequest {
        MovementRequest::new(
            product.id_typed(),
            product.variants().next().unwrap().id_typed(),
            MovementType::Sale,
            qty,
            UserId::new(),
        )
    }

    #[test]
    fn sale_reduces_stock_and_records_movement() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let product = seeded(&store, tenant_id, 10);

        let mut uow = UnitOfWork::begin(&store, tenant_id);
        let applied = apply_movement(&mut uow, &sale(&product, 3)).unwrap();

        assert_eq!(applied.variant.stock(), 7);
        assert_eq!(applied.movement.previous_stock, 10);
        assert_eq!(applied.movement.new_stock, 7);
        assert_eq!(applied.movement.quantity, 3);
        assert_eq!(applied.movement.direction, StockDirection::Decrease);
        assert_eq!(uow.staged_movements().len(), 1);
    }

    #[test]
    fn unpriced_movement_is_valued_at_variant_price() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let product = seeded(&store, tenant_id, 10);

        let mut uow = UnitOfWork::begin(&store, tenant_id);
        let listed = apply_movement(&mut uow, &sale(&product, 2)).unwrap();
        assert_eq!(listed.movement.unit_price, Some(2_500));
        assert_eq!(listed.movement.total_value, Some(5_000));

        let discounted = apply_movement(&mut uow, &sale(&product, 1).with_unit_price(2_000)).unwrap();
        assert_eq!(discounted.movement.unit_price, Some(2_000));
        assert_eq!(discounted.movement.total_value, Some(2_000));
    }

    #[test]
    fn oversell_leaves_working_copy_untouched() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let product = seeded(&store, tenant_id, 5);

        let mut uow = UnitOfWork::begin(&store, tenant_id);
        let err = apply_movement(&mut uow, &sale(&product, 10)).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InsufficientStock {
                sku: "CHG-20W".to_string(),
                available: 5,
                requested: 10,
            }
        );
        assert!(uow.staged_movements().is_empty());
        assert_eq!(uow.product(product.id_typed()).unwrap().total_stock(), 5);
    }

    #[test]
    fn consecutive_movements_chain_inside_one_unit_of_work() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let product = seeded(&store, tenant_id, 10);

        let mut uow = UnitOfWork::begin(&store, tenant_id);
        apply_movement(&mut uow, &sale(&product, 4)).unwrap();
        let second = apply_movement(&mut uow, &sale(&product, 4)).unwrap();
        assert_eq!(second.movement.previous_stock, 6);
        assert_eq!(second.movement.new_stock, 2);

        let err = apply_movement(&mut uow, &sale(&product, 4)).unwrap_err();
        assert!(matches!(err, WorkflowError::InsufficientStock { available: 2, .. }));
    }

    #[test]
    fn transfer_and_negative_adjustment_are_invalid() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let product = seeded(&store, tenant_id, 10);
        let mut uow = UnitOfWork::begin(&store, tenant_id);

        let mut transfer = sale(&product, 1);
        transfer.movement_type = MovementType::Transfer;
        assert!(matches!(
            apply_movement(&mut uow, &transfer),
            Err(WorkflowError::InvalidMovement(_))
        ));

        let mut negative = sale(&product, -2);
        negative.movement_type = MovementType::Adjustment;
        assert!(matches!(
            apply_movement(&mut uow, &negative),
            Err(WorkflowError::InvalidMovement(_))
        ));
    }

    #[test]
    fn unknown_variant_is_not_found() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let product = seeded(&store, tenant_id, 10);
        let mut uow = UnitOfWork::begin(&store, tenant_id);

        let mut req = sale(&product, 1);
        req.variant_id = stockroom_catalog::VariantId::new(stockroom_core::EntityId::new());
        assert!(matches!(
            apply_movement(&mut uow, &req),
            Err(WorkflowError::NotFound { entity: "variant", .. })
        ));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use stockroom_ledger::{MovementQuery, verify_chain};

        use crate::unit_of_work::transact;

        fn movement_type() -> impl Strategy<Value = MovementType> {
            prop_oneof![
                Just(MovementType::Purchase),
                Just(MovementType::Sale),
                Just(MovementType::Return),
                Just(MovementType::Damage),
                Just(MovementType::Adjustment),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: over random committed movements, stock never goes
            /// negative and the stored ledger replays to the stored stock.
            #[test]
            fn committed_ledger_replays_to_stock(
                ops in proptest::collection::vec((movement_type(), 1i64..25), 1..40)
            ) {
                let store = InMemoryStore::new();
                let tenant_id = TenantId::new();
                let product = seeded(&store, tenant_id, 0);

                for (t, qty) in ops {
                    let mut req = sale(&product, qty);
                    req.movement_type = t;
                    let _ = transact(&store, tenant_id, 0, |uow| apply_movement(uow, &req));
                    let stored = store.load_product(tenant_id, product.id_typed()).unwrap().unwrap();
                    prop_assert!(stored.total_stock() >= 0);
                }

                let stored = store.load_product(tenant_id, product.id_typed()).unwrap().unwrap();
                let mut ledger = store
                    .movements(tenant_id, &MovementQuery::ByProduct(product.id_typed()), usize::MAX)
                    .unwrap();
                ledger.reverse();
                prop_assert_eq!(verify_chain(0, ledger.iter()).unwrap(), stored.total_stock());
            }
        }
    }
}

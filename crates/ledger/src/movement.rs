use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ProductId, VariantId};
use stockroom_core::{AggregateId, DomainError, DomainResult, EntityId, TenantId, UserId};

/// Movement identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(pub EntityId);

impl MovementId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for MovementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Business reason for a stock change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Purchase,
    Sale,
    Adjustment,
    Return,
    Damage,
    Transfer,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Purchase => "purchase",
            MovementType::Sale => "sale",
            MovementType::Adjustment => "adjustment",
            MovementType::Return => "return",
            MovementType::Damage => "damage",
            MovementType::Transfer => "transfer",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "purchase" => Ok(MovementType::Purchase),
            "sale" => Ok(MovementType::Sale),
            "adjustment" => Ok(MovementType::Adjustment),
            "return" => Ok(MovementType::Return),
            "damage" => Ok(MovementType::Damage),
            "transfer" => Ok(MovementType::Transfer),
            other => Err(DomainError::invalid_movement(format!(
                "unknown movement type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    Increase,
    Decrease,
}

impl StockDirection {
    /// Signed stock delta for a positive `quantity`.
    pub fn apply_sign(&self, quantity: i64) -> i64 {
        match self {
            StockDirection::Increase => quantity,
            StockDirection::Decrease => -quantity,
        }
    }
}

/// Decide which way a movement moves stock.
///
/// `quantity` must be strictly positive; the direction comes from the movement
/// type. Only `adjustment` may go either way, and defaults to an increase when
/// no direction is given.
pub fn classify(
    movement_type: MovementType,
    quantity: i64,
    direction: Option<StockDirection>,
) -> DomainResult<StockDirection> {
    if quantity <= 0 {
        return Err(DomainError::invalid_movement(format!(
            "{movement_type} quantity must be positive, got {quantity}"
        )));
    }

    let fixed = match movement_type {
        MovementType::Purchase | MovementType::Return => StockDirection::Increase,
        MovementType::Sale | MovementType::Damage => StockDirection::Decrease,
        MovementType::Adjustment => return Ok(direction.unwrap_or(StockDirection::Increase)),
        MovementType::Transfer => {
            return Err(DomainError::invalid_movement(
                "transfer has no destination variant",
            ));
        }
    };

    match direction {
        Some(d) if d != fixed => Err(DomainError::invalid_movement(format!(
            "{movement_type} cannot be recorded as {d:?}"
        ))),
        _ => Ok(fixed),
    }
}

/// What a ledger row points back to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    Order,
    PurchaseOrder,
    Manual,
    System,
}

/// Input to the stock mutation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub movement_type: MovementType,
    pub quantity: i64,
    /// Only meaningful for adjustments.
    pub direction: Option<StockDirection>,
    pub unit_price: Option<u64>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub performed_by: UserId,
    pub reference_type: ReferenceType,
    pub reference_id: Option<AggregateId>,
}

impl MovementRequest {
    /// A manual movement with no price, notes or reference.
    pub fn new(
        product_id: ProductId,
        variant_id: VariantId,
        movement_type: MovementType,
        quantity: i64,
        performed_by: UserId,
    ) -> Self {
        Self {
            product_id,
            variant_id,
            movement_type,
            quantity,
            direction: None,
            unit_price: None,
            reason: None,
            notes: None,
            performed_by,
            reference_type: ReferenceType::Manual,
            reference_id: None,
        }
    }

    pub fn with_direction(mut self, direction: StockDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_unit_price(mut self, unit_price: u64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_reference(mut self, reference_type: ReferenceType, reference_id: AggregateId) -> Self {
        self.reference_type = reference_type;
        self.reference_id = Some(reference_id);
        self
    }
}

/// Immutable ledger row: one committed change to one variant's stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub sku: String,
    pub movement_type: MovementType,
    pub direction: StockDirection,
    /// Always positive; the sign lives in `direction`.
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub unit_price: Option<u64>,
    pub total_value: Option<u64>,
    pub reason: String,
    pub notes: Option<String>,
    pub reference_type: ReferenceType,
    pub reference_id: Option<AggregateId>,
    pub performed_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Build the ledger row for an already-classified request.
    pub fn record(
        tenant_id: TenantId,
        request: &MovementRequest,
        sku: &str,
        direction: StockDirection,
        previous_stock: i64,
        created_at: DateTime<Utc>,
    ) -> StockMovement {
        let total_value = request
            .unit_price
            .and_then(|price| price.checked_mul(request.quantity.unsigned_abs()));
        let reason = request
            .reason
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| default_reason(request.movement_type, request.reference_type));

        StockMovement {
            id: MovementId::new(EntityId::new()),
            tenant_id,
            product_id: request.product_id,
            variant_id: request.variant_id,
            sku: sku.to_string(),
            movement_type: request.movement_type,
            direction,
            quantity: request.quantity,
            previous_stock,
            new_stock: previous_stock + direction.apply_sign(request.quantity),
            unit_price: request.unit_price,
            total_value,
            reason,
            notes: request.notes.clone(),
            reference_type: request.reference_type,
            reference_id: request.reference_id,
            performed_by: request.performed_by,
            created_at,
        }
    }

    /// Signed stock change.
    pub fn delta(&self) -> i64 {
        self.direction.apply_sign(self.quantity)
    }

    pub fn is_consistent(&self) -> bool {
        self.quantity > 0 && self.new_stock >= 0 && self.new_stock - self.previous_stock == self.delta()
    }
}

fn default_reason(movement_type: MovementType, reference_type: ReferenceType) -> String {
    match (movement_type, reference_type) {
        (MovementType::Sale, ReferenceType::Order) => "Order placed".to_string(),
        (MovementType::Return, ReferenceType::Order) => "Order cancelled".to_string(),
        (MovementType::Purchase, ReferenceType::PurchaseOrder) => "Purchase order received".to_string(),
        (MovementType::Adjustment, ReferenceType::System) => "Opening stock".to_string(),
        (t, _) => format!("Manual {t}"),
    }
}

/// Walk one variant's movements (oldest first) from `opening_stock` and check
/// that every row picks up where the previous one left off.
///
/// Returns the resulting stock level.
pub fn verify_chain<'a>(
    opening_stock: i64,
    movements: impl IntoIterator<Item = &'a StockMovement>,
) -> DomainResult<i64> {
    let mut stock = opening_stock;
    for movement in movements {
        if movement.previous_stock != stock {
            return Err(DomainError::invalid_state(format!(
                "movement {} starts at {} but stock was {}",
                movement.id, movement.previous_stock, stock
            )));
        }
        if !movement.is_consistent() {
            return Err(DomainError::invalid_state(format!(
                "movement {} does not add up: {} -> {} for {} {}",
                movement.id,
                movement.previous_stock,
                movement.new_stock,
                movement.movement_type,
                movement.quantity
            )));
        }
        stock = movement.new_stock;
    }
    Ok(stock)
}

/// Ledger read filters. Results are always tenant-scoped and newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementQuery {
    ByProduct(ProductId),
    BySku(String),
    ByVariant(VariantId),
    ByReference {
        reference_type: ReferenceType,
        reference_id: AggregateId,
    },
}

impl MovementQuery {
    pub fn matches(&self, movement: &StockMovement) -> bool {
        match self {
            MovementQuery::ByProduct(id) => movement.product_id == *id,
            MovementQuery::BySku(sku) => movement.sku == stockroom_catalog::normalize_sku(sku),
            MovementQuery::ByVariant(id) => movement.variant_id == *id,
            MovementQuery::ByReference {
                reference_type,
                reference_id,
            } => {
                movement.reference_type == *reference_type
                    && movement.reference_id == Some(*reference_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(movement_type: MovementType, quantity: i64) -> MovementRequest {
        MovementRequest::new(
            ProductId::new(AggregateId::new()),
            VariantId::new(EntityId::new()),
            movement_type,
            quantity,
            UserId::new(),
        )
    }

    #[test]
    fn purchase_and_return_increase_stock() {
        for t in [MovementType::Purchase, MovementType::Return] {
            assert_eq!(classify(t, 4, None).unwrap(), StockDirection::Increase);
        }
    }

    #[test]
    fn sale_and_damage_decrease_stock() {
        for t in [MovementType::Sale, MovementType::Damage] {
            assert_eq!(classify(t, 4, None).unwrap(), StockDirection::Decrease);
        }
    }

    #[test]
    fn adjustment_direction_is_explicit_and_defaults_to_increase() {
        assert_eq!(
            classify(MovementType::Adjustment, 2, None).unwrap(),
            StockDirection::Increase
        );
        assert_eq!(
            classify(MovementType::Adjustment, 2, Some(StockDirection::Decrease)).unwrap(),
            StockDirection::Decrease
        );
    }

    #[test]
    fn non_positive_quantities_are_invalid() {
        for qty in [0, -3] {
            let err = classify(MovementType::Adjustment, qty, None).unwrap_err();
            assert!(matches!(err, DomainError::InvalidMovement(_)));
        }
    }

    #[test]
    fn contradicting_direction_and_transfer_are_invalid() {
        let err = classify(MovementType::Sale, 1, Some(StockDirection::Increase)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidMovement(_)));

        let err = classify(MovementType::Transfer, 1, None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidMovement(_)));
    }

    #[test]
    fn movement_type_parses_loosely() {
        assert_eq!(" Sale ".parse::<MovementType>().unwrap(), MovementType::Sale);
        assert!("restock".parse::<MovementType>().is_err());
    }

    #[test]
    fn record_computes_new_stock_and_total_value() {
        let req = request(MovementType::Sale, 3).with_unit_price(1_500);
        let movement = StockMovement::record(
            TenantId::new(),
            &req,
            "TSH-M-BLK",
            StockDirection::Decrease,
            10,
            Utc::now(),
        );

        assert_eq!(movement.previous_stock, 10);
        assert_eq!(movement.new_stock, 7);
        assert_eq!(movement.quantity, 3);
        assert_eq!(movement.delta(), -3);
        assert_eq!(movement.total_value, Some(4_500));
        assert_eq!(movement.reason, "Manual sale");
        assert!(movement.is_consistent());
    }

    #[test]
    fn verify_chain_detects_gaps() {
        let tenant = TenantId::new();
        let req = request(MovementType::Purchase, 5);
        let first = StockMovement::record(tenant, &req, "A", StockDirection::Increase, 0, Utc::now());
        let second = StockMovement::record(tenant, &req, "A", StockDirection::Increase, 5, Utc::now());
        assert_eq!(verify_chain(0, [&first, &second]).unwrap(), 10);

        let stale = StockMovement::record(tenant, &req, "A", StockDirection::Increase, 0, Utc::now());
        assert!(matches!(
            verify_chain(0, [&first, &stale]),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn query_by_sku_normalizes() {
        let req = request(MovementType::Purchase, 1);
        let movement = StockMovement::record(
            TenantId::new(),
            &req,
            "APP-2GEN-WHT",
            StockDirection::Increase,
            0,
            Utc::now(),
        );
        assert!(MovementQuery::BySku(" app-2gen-wht".to_string()).matches(&movement));
        assert!(MovementQuery::ByProduct(req.product_id).matches(&movement));
        assert!(!MovementQuery::ByReference {
            reference_type: ReferenceType::Order,
            reference_id: AggregateId::new(),
        }
        .matches(&movement));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn movement_type() -> impl Strategy<Value = MovementType> {
            prop_oneof![
                Just(MovementType::Purchase),
                Just(MovementType::Sale),
                Just(MovementType::Adjustment),
                Just(MovementType::Return),
                Just(MovementType::Damage),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: applying a random stream of movements, rejecting any that
            /// would go negative, yields a chain that never dips below zero and
            /// reconciles to the final stock level.
            #[test]
            fn accepted_movements_form_a_consistent_chain(
                ops in proptest::collection::vec((movement_type(), 1i64..40, any::<bool>()), 0..80)
            ) {
                let tenant = TenantId::new();
                let mut stock = 0i64;
                let mut ledger = Vec::new();

                for (t, qty, down) in ops {
                    let dir = if t == MovementType::Adjustment && down {
                        Some(StockDirection::Decrease)
                    } else {
                        None
                    };
                    let direction = classify(t, qty, dir).unwrap();
                    if stock + direction.apply_sign(qty) < 0 {
                        continue;
                    }
                    let req = request(t, qty);
                    let m = StockMovement::record(tenant, &req, "P-1", direction, stock, Utc::now());
                    stock = m.new_stock;
                    ledger.push(m);
                }

                prop_assert!(ledger.iter().all(|m| m.new_stock >= 0));
                prop_assert_eq!(verify_chain(0, ledger.iter()).unwrap(), stock);
            }
        }
    }
}

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ProductId, VariantId};
use stockroom_core::{AggregateId, AggregateRoot, DomainError, DomainResult, TenantId, UserId};

/// Order identifier (tenant-scoped via the order's `tenant_id`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(DomainError::validation(format!("invalid order status '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Customer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
            address: None,
        }
    }
}

/// Requested order line, before product lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
    /// Falls back to the variant's list price.
    pub unit_price: Option<u64>,
}

/// Order line with the product details captured at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl OrderItem {
    pub fn line_total(&self) -> u64 {
        self.unit_price.saturating_mul(self.quantity.unsigned_abs())
    }
}

/// Effect of a requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Already in the requested status.
    NoOp,
    /// Moving into `cancelled`: stock has to go back on the shelf.
    Cancel,
    /// Plain status write.
    Update(OrderStatus),
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    tenant_id: TenantId,
    order_number: String,
    customer: Customer,
    items: Vec<OrderItem>,
    total_amount: u64,
    status: OrderStatus,
    notes: Option<String>,
    created_by: UserId,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Build a new `pending` order from resolved lines.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        tenant_id: TenantId,
        id: OrderId,
        order_number: String,
        customer: Customer,
        items: Vec<OrderItem>,
        notes: Option<String>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Order> {
        if customer.name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        if items.is_empty() {
            return Err(DomainError::validation("order must have at least one item"));
        }
        if let Some(bad) = items.iter().find(|i| i.quantity <= 0) {
            return Err(DomainError::validation(format!(
                "quantity for {} must be positive",
                bad.sku
            )));
        }

        let total_amount = items
            .iter()
            .map(OrderItem::line_total)
            .try_fold(0u64, u64::checked_add)
            .ok_or_else(|| DomainError::validation("order total overflows"))?;

        Ok(Order {
            id,
            tenant_id,
            order_number,
            customer,
            items,
            total_amount,
            status: OrderStatus::Pending,
            notes,
            created_by,
            version: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Work out what moving to `next` involves, without changing anything.
    pub fn plan_transition(&self, next: OrderStatus) -> DomainResult<StatusChange> {
        if self.is_deleted() {
            return Err(DomainError::not_found("order", self.id));
        }
        if next == self.status {
            return Ok(StatusChange::NoOp);
        }
        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::invalid_state(format!(
                "order {} is cancelled and cannot move to {next}",
                self.order_number
            )));
        }
        if next == OrderStatus::Cancelled {
            return Ok(StatusChange::Cancel);
        }
        Ok(StatusChange::Update(next))
    }

    pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.is_deleted() {
            return Err(DomainError::not_found("order", self.id));
        }
        if self.status != OrderStatus::Pending {
            return Err(DomainError::invalid_state(format!(
                "order {} is {} and can only be deleted while pending",
                self.order_number, self.status
            )));
        }
        Ok(())
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// Storage layer only: record a committed write.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::EntityId;

    fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn item(sku: &str, quantity: i64, unit_price: u64) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(AggregateId::new()),
            variant_id: VariantId::new(EntityId::new()),
            sku: sku.to_string(),
            product_name: "Basic Cotton T-Shirt".to_string(),
            quantity,
            unit_price,
        }
    }

    fn placed(items: Vec<OrderItem>) -> Order {
        Order::place(
            TenantId::new(),
            OrderId::new(AggregateId::new()),
            "ORD-20240301-000001".to_string(),
            Customer::named("Jane Doe"),
            items,
            None,
            UserId::new(),
            test_time(),
        )
        .unwrap()
    }

    #[test]
    fn place_rejects_a_total_that_overflows() {
        let err = Order::place(
            TenantId::new(),
            OrderId::new(AggregateId::new()),
            "ORD-20240301-000002".to_string(),
            Customer::named("Jane Doe"),
            vec![item("GOLD-1", 1, u64::MAX), item("GOLD-2", 1, u64::MAX)],
            None,
            UserId::new(),
            test_time(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::validation("order total overflows"));
    }

    #[test]
    fn place_starts_pending_and_sums_lines() {
        let order = placed(vec![item("TSH-S-BLK", 2, 1_999), item("JEAN-30-BLU", 1, 4_999)]);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_amount(), 2 * 1_999 + 4_999);
        assert_eq!(order.version(), 0);
    }

    #[test]
    fn place_rejects_empty_and_non_positive_lines() {
        let err = Order::place(
            TenantId::new(),
            OrderId::new(AggregateId::new()),
            "ORD-1".to_string(),
            Customer::named("Jane"),
            vec![],
            None,
            UserId::new(),
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = Order::place(
            TenantId::new(),
            OrderId::new(AggregateId::new()),
            "ORD-1".to_string(),
            Customer::named("Jane"),
            vec![item("A", 0, 100)],
            None,
            UserId::new(),
            test_time(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(" Processing ".parse::<OrderStatus>().unwrap(), OrderStatus::Processing);
        assert_eq!("CANCELLED".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!(matches!(
            "lost".parse::<OrderStatus>(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn transition_plan_covers_noop_cancel_and_update() {
        let mut order = placed(vec![item("A", 1, 100)]);
        assert_eq!(order.plan_transition(OrderStatus::Pending).unwrap(), StatusChange::NoOp);
        assert_eq!(
            order.plan_transition(OrderStatus::Shipped).unwrap(),
            StatusChange::Update(OrderStatus::Shipped)
        );
        assert_eq!(order.plan_transition(OrderStatus::Cancelled).unwrap(), StatusChange::Cancel);

        order.set_status(OrderStatus::Cancelled, test_time());
        assert_eq!(order.plan_transition(OrderStatus::Cancelled).unwrap(), StatusChange::NoOp);
        assert!(matches!(
            order.plan_transition(OrderStatus::Processing),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn only_pending_orders_can_be_deleted() {
        let mut order = placed(vec![item("A", 1, 100)]);
        assert!(order.ensure_deletable().is_ok());

        order.set_status(OrderStatus::Processing, test_time());
        assert!(matches!(order.ensure_deletable(), Err(DomainError::InvalidState(_))));
    }

    #[test]
    fn deleted_orders_behave_as_missing() {
        let mut order = placed(vec![item("A", 1, 100)]);
        order.mark_deleted(test_time());
        assert!(order.is_deleted());
        assert!(matches!(
            order.plan_transition(OrderStatus::Shipped),
            Err(DomainError::NotFound { entity: "order", .. })
        ));
        assert!(matches!(order.ensure_deletable(), Err(DomainError::NotFound { .. })));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: total_amount equals the sum of quantity * unit_price.
            #[test]
            fn total_amount_is_sum_of_lines(
                lines in proptest::collection::vec((1i64..100, 0u64..100_000), 1..12)
            ) {
                let items: Vec<OrderItem> = lines
                    .iter()
                    .enumerate()
                    .map(|(i, (q, p))| item(&format!("SKU-{i}"), *q, *p))
                    .collect();
                let expected: u64 = lines.iter().map(|(q, p)| *q as u64 * p).sum();
                prop_assert_eq!(placed(items).total_amount(), expected);
            }
        }
    }
}

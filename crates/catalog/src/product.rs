use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    AggregateId, AggregateRoot, DomainError, DomainResult, Entity, EntityId, EntityTable, TenantId,
};

/// Product identifier (tenant-scoped via the owning product's `tenant_id`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Variant identifier, unique within the tenant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub EntityId);

impl VariantId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VariantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// SKUs are stored trimmed and uppercase.
pub fn normalize_sku(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// A purchasable SKU of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    id: VariantId,
    sku: String,
    attributes: BTreeMap<String, String>,
    /// Price in smallest currency unit (e.g., cents).
    price: u64,
    stock: i64,
    low_stock_threshold: i64,
    /// Bumped on every stock mutation.
    version: u64,
    is_active: bool,
}

impl Entity for Variant {
    type Id = VariantId;

    fn id(&self) -> &VariantId {
        &self.id
    }
}

impl Variant {
    pub fn id_typed(&self) -> VariantId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// In stock, but at or below the replenishment threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock <= self.low_stock_threshold
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock == 0
    }

    /// Copy of this variant with `delta` applied to stock and the version bumped.
    ///
    /// Fails with `InsufficientStock` if the result would be negative; `self`
    /// is never modified.
    pub fn with_stock_delta(&self, delta: i64) -> DomainResult<Variant> {
        let new_stock = self
            .stock
            .checked_add(delta)
            .ok_or_else(|| DomainError::invalid_movement("stock quantity overflow"))?;

        if new_stock < 0 {
            return Err(DomainError::insufficient_stock(
                self.sku.clone(),
                self.stock,
                delta.saturating_neg(),
            ));
        }

        let mut next = self.clone();
        next.stock = new_stock;
        next.version += 1;
        Ok(next)
    }
}

/// Input for one variant of a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariant {
    pub sku: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub price: u64,
    /// Stock on hand when the product is registered; recorded as an opening
    /// movement rather than written directly.
    #[serde(default)]
    pub initial_stock: i64,
    pub low_stock_threshold: Option<i64>,
}

/// Input for a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub base_price: u64,
    pub variants: Vec<NewVariant>,
}

/// Opening stock for a freshly created variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpeningStock {
    pub variant_id: VariantId,
    pub quantity: i64,
}

/// Aggregate root: Product (owns its variants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    tenant_id: TenantId,
    name: String,
    category: String,
    description: Option<String>,
    base_price: u64,
    is_active: bool,
    /// Cached sum of variant stocks.
    total_stock: i64,
    variants: EntityTable<Variant>,
    /// Product-level (metadata) version. Variant stock carries its own version.
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Validate input and build a product with all variants at zero stock.
    ///
    /// Returns the opening stock per variant so the caller can record it in
    /// the ledger.
    pub fn create(
        tenant_id: TenantId,
        id: ProductId,
        input: NewProduct,
        default_low_stock_threshold: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<(Product, Vec<OpeningStock>)> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if input.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if input.variants.is_empty() {
            return Err(DomainError::validation("product must have at least one variant"));
        }

        let mut seen = HashSet::new();
        let mut variants = EntityTable::new();
        let mut opening = Vec::new();

        for v in input.variants {
            let sku = normalize_sku(&v.sku);
            if sku.is_empty() {
                return Err(DomainError::validation("sku cannot be empty"));
            }
            if !seen.insert(sku.clone()) {
                return Err(DomainError::conflict(format!("duplicate sku {sku} in product")));
            }
            if v.initial_stock < 0 {
                return Err(DomainError::validation(format!(
                    "initial stock for {sku} cannot be negative"
                )));
            }
            let threshold = v.low_stock_threshold.unwrap_or(default_low_stock_threshold);
            if threshold < 0 {
                return Err(DomainError::validation(format!(
                    "low stock threshold for {sku} cannot be negative"
                )));
            }

            let variant_id = VariantId::new(EntityId::new());
            if v.initial_stock > 0 {
                opening.push(OpeningStock {
                    variant_id,
                    quantity: v.initial_stock,
                });
            }

            let variant = Variant {
                id: variant_id,
                sku,
                attributes: v.attributes,
                price: v.price,
                stock: 0,
                low_stock_threshold: threshold,
                version: 0,
                is_active: true,
            };
            if variants.insert(variant).is_err() {
                return Err(DomainError::conflict("variant id collision"));
            }
        }

        let product = Product {
            id,
            tenant_id,
            name: input.name.trim().to_string(),
            category: input.category.trim().to_string(),
            description: input.description,
            base_price: input.base_price,
            is_active: true,
            total_stock: 0,
            variants,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        Ok((product, opening))
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn base_price(&self) -> u64 {
        self.base_price
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn total_stock(&self) -> i64 {
        self.total_stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter()
    }

    pub fn variant(&self, variant_id: &VariantId) -> Option<&Variant> {
        self.variants.get(variant_id)
    }

    /// Like [`Product::variant`], but a missing variant is a `NotFound` error.
    pub fn require_variant(&self, variant_id: &VariantId) -> DomainResult<&Variant> {
        self.variant(variant_id)
            .ok_or_else(|| DomainError::not_found("variant", variant_id))
    }

    pub fn find_variant_by_sku(&self, sku: &str) -> Option<&Variant> {
        let sku = normalize_sku(sku);
        self.variants.iter().find(|v| v.sku == sku)
    }

    pub fn low_stock_variants(&self) -> Vec<&Variant> {
        self.variants.iter().filter(|v| v.is_low_stock()).collect()
    }

    pub fn out_of_stock_variants(&self) -> Vec<&Variant> {
        self.variants.iter().filter(|v| v.is_out_of_stock()).collect()
    }

    /// Swap in an updated copy of one variant and refresh the stock cache.
    ///
    /// Nothing changes if the variant is unknown or the new total would not
    /// fit in an `i64`.
    pub fn apply_variant(&mut self, variant: Variant) -> DomainResult<()> {
        let variant_id = variant.id;
        if !self.variants.contains(&variant_id) {
            return Err(DomainError::not_found("variant", variant_id));
        }
        let total = self.projected_total_stock(&HashMap::from([(variant_id, variant.stock)]))?;
        self.variants.replace(variant);
        self.total_stock = total;
        Ok(())
    }

    /// Sum of variant stocks with `replaced` overriding the current levels.
    pub fn projected_total_stock(&self, replaced: &HashMap<VariantId, i64>) -> DomainResult<i64> {
        self.variants
            .iter()
            .map(|v| replaced.get(&v.id).copied().unwrap_or(v.stock))
            .try_fold(0i64, i64::checked_add)
            .ok_or_else(|| DomainError::invalid_movement("total stock overflow"))
    }

    /// Soft delete. Idempotent.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        if self.is_active {
            self.is_active = false;
            self.updated_at = now;
        }
    }

    /// Copy product-level fields from `other`, leaving variants untouched.
    pub fn adopt_metadata(&mut self, other: &Product) {
        self.name = other.name.clone();
        self.category = other.category.clone();
        self.description = other.description.clone();
        self.base_price = other.base_price;
        self.is_active = other.is_active;
        self.updated_at = other.updated_at;
    }

    /// Storage layer only: record a committed product-level write.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

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

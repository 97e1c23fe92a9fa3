//! Catalog domain module: products and their variants (the variant store).
//!
//! This crate contains business rules for products/catalog, implemented purely as
//! deterministic domain logic (no IO, no locks, no storage).

pub mod product;

pub use product::{
    NewProduct, NewVariant, OpeningStock, Product, ProductId, Variant, VariantId, normalize_sku,
};

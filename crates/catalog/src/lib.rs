//! Catalog domain module.
//!
//! This crate contains the business rules for products, their options and
//! purchasable variants, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod combination;
pub mod option;
pub mod pricing;
pub mod product;
pub mod rules;
pub mod variant;

pub use combination::Combination;
pub use option::{
    NewOption, NewOptionValue, OptionPatch, OptionValue, OptionValuePatch, OptionWithValues,
    ProductOption, resolve_position,
};
pub use pricing::effective_price;
pub use product::{
    NewProduct, Product, ProductFilter, ProductPatch, ProductStatus, Visibility, slugify,
};
pub use variant::{NewVariant, Variant, VariantDetails, VariantPatch, VariantView};

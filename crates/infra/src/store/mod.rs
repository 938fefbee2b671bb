//! Catalog persistence: the capability contract and its backends.
//!
//! Every by-id lookup of a product or of something nested under it resolves
//! through the owning product, scoped by tenant and excluding soft-deleted
//! products. List operations keyed by a parent id assume the caller already
//! resolved that parent under its tenant.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use vitrine_catalog::{
    Combination, OptionValue, OptionWithValues, Product, ProductFilter, ProductOption, Variant,
    VariantDetails,
};
use vitrine_core::{OptionId, OptionValueId, ProductId, TenantId, VariantId};

/// Storage failure, classified by kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness rule was violated (slug, SKU, combination).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store operation timed out: {operation}")]
    Timeout { operation: &'static str },

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    // Products.

    async fn insert_product(&self, product: &Product) -> StoreResult<()>;

    /// Non-deleted product owned by `tenant_id`.
    async fn get_product(&self, tenant_id: TenantId, id: ProductId)
    -> StoreResult<Option<Product>>;

    /// Non-deleted products, newest first.
    async fn list_products(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>>;

    /// Filtered page of products, newest first.
    async fn search_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
    ) -> StoreResult<Vec<Product>>;

    /// Overwrite a stored product. `false` when no live row matched.
    async fn update_product(&self, product: &Product) -> StoreResult<bool>;

    async fn soft_delete_product(
        &self,
        tenant_id: TenantId,
        id: ProductId,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    // Options.

    async fn count_options(&self, product_id: ProductId) -> StoreResult<usize>;

    async fn insert_option(&self, option: &ProductOption) -> StoreResult<()>;

    async fn get_option(
        &self,
        tenant_id: TenantId,
        id: OptionId,
    ) -> StoreResult<Option<ProductOption>>;

    /// Options ordered by position, each with its values ordered by position.
    async fn list_options(&self, product_id: ProductId) -> StoreResult<Vec<OptionWithValues>>;

    async fn update_option(&self, option: &ProductOption) -> StoreResult<bool>;

    /// Deletes the option together with its values.
    async fn delete_option(&self, tenant_id: TenantId, id: OptionId) -> StoreResult<bool>;

    // Option values.

    async fn count_option_values(&self, option_id: OptionId) -> StoreResult<usize>;

    async fn insert_option_value(&self, value: &OptionValue) -> StoreResult<()>;

    async fn get_option_value(
        &self,
        tenant_id: TenantId,
        id: OptionValueId,
    ) -> StoreResult<Option<OptionValue>>;

    async fn list_option_values(&self, option_id: OptionId) -> StoreResult<Vec<OptionValue>>;

    /// Every value id belonging to an option of the product.
    async fn product_option_value_ids(&self, product_id: ProductId)
    -> StoreResult<Vec<OptionValueId>>;

    async fn update_option_value(&self, value: &OptionValue) -> StoreResult<bool>;

    async fn delete_option_value(&self, tenant_id: TenantId, id: OptionValueId)
    -> StoreResult<bool>;

    // Variants.

    /// Combination of every variant of the product.
    async fn variant_combinations(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Vec<(VariantId, Combination)>>;

    /// Persist a variant and its option-value associations.
    ///
    /// Fails with [`StoreError::Conflict`] when the SKU is taken or the
    /// product already has a variant with the same combination.
    async fn insert_variant(&self, variant: &Variant) -> StoreResult<()>;

    async fn get_variant(
        &self,
        tenant_id: TenantId,
        id: VariantId,
    ) -> StoreResult<Option<VariantDetails>>;

    async fn list_variants(&self, product_id: ProductId) -> StoreResult<Vec<VariantDetails>>;

    /// Same uniqueness rules as [`CatalogStore::insert_variant`].
    async fn update_variant(&self, variant: &Variant) -> StoreResult<bool>;

    async fn delete_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool>;
}

#[async_trait::async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        (**self).insert_product(product).await
    }

    async fn get_product(
        &self,
        tenant_id: TenantId,
        id: ProductId,
    ) -> StoreResult<Option<Product>> {
        (**self).get_product(tenant_id, id).await
    }

    async fn list_products(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>> {
        (**self).list_products(tenant_id).await
    }

    async fn search_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
    ) -> StoreResult<Vec<Product>> {
        (**self).search_products(tenant_id, filter).await
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        (**self).update_product(product).await
    }

    async fn soft_delete_product(
        &self,
        tenant_id: TenantId,
        id: ProductId,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        (**self).soft_delete_product(tenant_id, id, at).await
    }

    async fn count_options(&self, product_id: ProductId) -> StoreResult<usize> {
        (**self).count_options(product_id).await
    }

    async fn insert_option(&self, option: &ProductOption) -> StoreResult<()> {
        (**self).insert_option(option).await
    }

    async fn get_option(
        &self,
        tenant_id: TenantId,
        id: OptionId,
    ) -> StoreResult<Option<ProductOption>> {
        (**self).get_option(tenant_id, id).await
    }

    async fn list_options(&self, product_id: ProductId) -> StoreResult<Vec<OptionWithValues>> {
        (**self).list_options(product_id).await
    }

    async fn update_option(&self, option: &ProductOption) -> StoreResult<bool> {
        (**self).update_option(option).await
    }

    async fn delete_option(&self, tenant_id: TenantId, id: OptionId) -> StoreResult<bool> {
        (**self).delete_option(tenant_id, id).await
    }

    async fn count_option_values(&self, option_id: OptionId) -> StoreResult<usize> {
        (**self).count_option_values(option_id).await
    }

    async fn insert_option_value(&self, value: &OptionValue) -> StoreResult<()> {
        (**self).insert_option_value(value).await
    }

    async fn get_option_value(
        &self,
        tenant_id: TenantId,
        id: OptionValueId,
    ) -> StoreResult<Option<OptionValue>> {
        (**self).get_option_value(tenant_id, id).await
    }

    async fn list_option_values(&self, option_id: OptionId) -> StoreResult<Vec<OptionValue>> {
        (**self).list_option_values(option_id).await
    }

    async fn product_option_value_ids(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Vec<OptionValueId>> {
        (**self).product_option_value_ids(product_id).await
    }

    async fn update_option_value(&self, value: &OptionValue) -> StoreResult<bool> {
        (**self).update_option_value(value).await
    }

    async fn delete_option_value(
        &self,
        tenant_id: TenantId,
        id: OptionValueId,
    ) -> StoreResult<bool> {
        (**self).delete_option_value(tenant_id, id).await
    }

    async fn variant_combinations(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Vec<(VariantId, Combination)>> {
        (**self).variant_combinations(product_id).await
    }

    async fn insert_variant(&self, variant: &Variant) -> StoreResult<()> {
        (**self).insert_variant(variant).await
    }

    async fn get_variant(
        &self,
        tenant_id: TenantId,
        id: VariantId,
    ) -> StoreResult<Option<VariantDetails>> {
        (**self).get_variant(tenant_id, id).await
    }

    async fn list_variants(&self, product_id: ProductId) -> StoreResult<Vec<VariantDetails>> {
        (**self).list_variants(product_id).await
    }

    async fn update_variant(&self, variant: &Variant) -> StoreResult<bool> {
        (**self).update_variant(variant).await
    }

    async fn delete_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool> {
        (**self).delete_variant(tenant_id, id).await
    }
}

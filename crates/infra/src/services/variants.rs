use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use vitrine_catalog::{NewVariant, Product, VariantPatch, VariantView};
use vitrine_core::{ProductId, TenantId, VariantId};

use super::{CombinationValidator, ServiceError, ServiceResult};
use crate::store::CatalogStore;

/// Product/Variant orchestrator.
///
/// Writes pass through the [`CombinationValidator`] before persistence; every
/// returned variant carries its effective price resolved against the owning
/// product's default price.
pub struct VariantService<S: CatalogStore + ?Sized> {
    store: Arc<S>,
    validator: CombinationValidator<S>,
}

impl<S: CatalogStore + ?Sized> Clone for VariantService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<S: CatalogStore + ?Sized> VariantService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            validator: CombinationValidator::new(store.clone()),
            store,
        }
    }

    async fn load_product(&self, tenant_id: TenantId, id: ProductId) -> ServiceResult<Product> {
        self.store
            .get_product(tenant_id, id)
            .await?
            .ok_or(ServiceError::not_found("product"))
    }

    async fn view(&self, tenant_id: TenantId, product: &Product, id: VariantId) -> ServiceResult<VariantView> {
        let details = self
            .store
            .get_variant(tenant_id, id)
            .await?
            .ok_or(ServiceError::not_found("variant"))?;
        Ok(VariantView::resolve(details, product.default_price))
    }

    pub async fn create_variant(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        input: NewVariant,
    ) -> ServiceResult<VariantView> {
        input.validate()?;
        let product = self.load_product(tenant_id, product_id).await?;

        let combination = input.combination();
        self.validator
            .ensure_known_values(product_id, &combination)
            .await?;
        self.validator
            .ensure_unique(product_id, &combination, None)
            .await?;

        let variant = input.into_variant(VariantId::new(), product_id, Utc::now())?;
        self.store.insert_variant(&variant).await?;

        info!(tenant_id = %tenant_id, product_id = %product_id, variant_id = %variant.id, sku = %variant.sku, "variant created");
        self.view(tenant_id, &product, variant.id).await
    }

    /// Apply a partial update. A new combination is re-validated against the
    /// product's other variants.
    pub async fn update_variant(
        &self,
        tenant_id: TenantId,
        id: VariantId,
        patch: VariantPatch,
    ) -> ServiceResult<VariantView> {
        patch.validate()?;
        let details = self
            .store
            .get_variant(tenant_id, id)
            .await?
            .ok_or(ServiceError::not_found("variant"))?;
        let product = self
            .load_product(tenant_id, details.variant.product_id)
            .await?;

        if patch == VariantPatch::default() {
            return Ok(VariantView::resolve(details, product.default_price));
        }

        if let Some(combination) = patch.combination() {
            self.validator
                .ensure_known_values(product.id, &combination)
                .await?;
            self.validator
                .ensure_unique(product.id, &combination, Some(id))
                .await?;
        }

        let mut variant = details.variant;
        patch.apply_to(&mut variant, Utc::now());
        if !self.store.update_variant(&variant).await? {
            return Err(ServiceError::not_found("variant"));
        }

        info!(tenant_id = %tenant_id, variant_id = %id, "variant updated");
        self.view(tenant_id, &product, id).await
    }

    pub async fn get_variant(&self, tenant_id: TenantId, id: VariantId) -> ServiceResult<VariantView> {
        let details = self
            .store
            .get_variant(tenant_id, id)
            .await?
            .ok_or(ServiceError::not_found("variant"))?;
        let product = self
            .load_product(tenant_id, details.variant.product_id)
            .await?;
        Ok(VariantView::resolve(details, product.default_price))
    }

    pub async fn list_variants(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> ServiceResult<Vec<VariantView>> {
        let product = self.load_product(tenant_id, product_id).await?;
        let variants = self.store.list_variants(product_id).await?;
        Ok(variants
            .into_iter()
            .map(|details| VariantView::resolve(details, product.default_price))
            .collect())
    }

    pub async fn delete_variant(&self, tenant_id: TenantId, id: VariantId) -> ServiceResult<()> {
        if !self.store.delete_variant(tenant_id, id).await? {
            return Err(ServiceError::not_found("variant"));
        }
        info!(tenant_id = %tenant_id, variant_id = %id, "variant deleted");
        Ok(())
    }
}

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use vitrine_catalog::{NewProduct, Product, ProductFilter, ProductPatch};
use vitrine_core::{ProductId, TenantId};

use super::{ServiceError, ServiceResult};
use crate::store::CatalogStore;

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub limit: u32,
}

/// Tenant-scoped product CRUD and search.
pub struct ProductService<S: CatalogStore + ?Sized> {
    store: Arc<S>,
}

impl<S: CatalogStore + ?Sized> Clone for ProductService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: CatalogStore + ?Sized> ProductService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create(&self, tenant_id: TenantId, input: NewProduct) -> ServiceResult<Product> {
        let product = input.into_product(ProductId::new(), tenant_id, Utc::now())?;
        self.store.insert_product(&product).await?;

        info!(tenant_id = %tenant_id, product_id = %product.id, slug = %product.slug, "product created");
        Ok(product)
    }

    pub async fn list(&self, tenant_id: TenantId) -> ServiceResult<Vec<Product>> {
        Ok(self.store.list_products(tenant_id).await?)
    }

    pub async fn search(
        &self,
        tenant_id: TenantId,
        filter: ProductFilter,
    ) -> ServiceResult<ProductPage> {
        let products = self.store.search_products(tenant_id, &filter).await?;
        Ok(ProductPage {
            products,
            page: filter.page(),
            limit: filter.limit(),
        })
    }

    pub async fn get(&self, tenant_id: TenantId, id: ProductId) -> ServiceResult<Product> {
        self.store
            .get_product(tenant_id, id)
            .await?
            .ok_or(ServiceError::not_found("product"))
    }

    /// Apply a partial update. An empty patch returns the current state.
    pub async fn update(
        &self,
        tenant_id: TenantId,
        id: ProductId,
        patch: ProductPatch,
    ) -> ServiceResult<Product> {
        patch.validate()?;
        let mut product = self.get(tenant_id, id).await?;
        if patch.is_empty() {
            return Ok(product);
        }

        patch.apply_to(&mut product, Utc::now());
        if !self.store.update_product(&product).await? {
            return Err(ServiceError::not_found("product"));
        }

        info!(tenant_id = %tenant_id, product_id = %id, "product updated");
        Ok(product)
    }

    /// Soft delete.
    pub async fn delete(&self, tenant_id: TenantId, id: ProductId) -> ServiceResult<()> {
        if !self
            .store
            .soft_delete_product(tenant_id, id, Utc::now())
            .await?
        {
            return Err(ServiceError::not_found("product"));
        }

        info!(tenant_id = %tenant_id, product_id = %id, "product deleted");
        Ok(())
    }
}

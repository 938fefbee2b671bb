use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use vitrine_catalog::{
    NewOption, NewOptionValue, OptionPatch, OptionValue, OptionValuePatch, OptionWithValues,
    ProductOption,
};
use vitrine_core::{OptionId, OptionValueId, ProductId, TenantId};

use super::{ServiceError, ServiceResult};
use crate::store::CatalogStore;

/// Option Manager: options of a product and their ordered values.
pub struct OptionService<S: CatalogStore + ?Sized> {
    store: Arc<S>,
}

impl<S: CatalogStore + ?Sized> Clone for OptionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: CatalogStore + ?Sized> OptionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn ensure_product(&self, tenant_id: TenantId, product_id: ProductId) -> ServiceResult<()> {
        match self.store.get_product(tenant_id, product_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("product")),
        }
    }

    async fn load_option(&self, tenant_id: TenantId, id: OptionId) -> ServiceResult<ProductOption> {
        self.store
            .get_option(tenant_id, id)
            .await?
            .ok_or(ServiceError::not_found("option"))
    }

    async fn load_value(&self, tenant_id: TenantId, id: OptionValueId) -> ServiceResult<OptionValue> {
        self.store
            .get_option_value(tenant_id, id)
            .await?
            .ok_or(ServiceError::not_found("option value"))
    }

    /// Create an option; a missing or zero position appends it last.
    pub async fn create_option(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        input: NewOption,
    ) -> ServiceResult<ProductOption> {
        input.validate()?;
        self.ensure_product(tenant_id, product_id).await?;

        let existing = self.store.count_options(product_id).await?;
        let option = input.into_option(OptionId::new(), product_id, existing, Utc::now())?;
        self.store.insert_option(&option).await?;

        info!(tenant_id = %tenant_id, product_id = %product_id, option_id = %option.id, position = option.position, "option created");
        Ok(option)
    }

    pub async fn list_options(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> ServiceResult<Vec<OptionWithValues>> {
        self.ensure_product(tenant_id, product_id).await?;
        Ok(self.store.list_options(product_id).await?)
    }

    pub async fn get_option(
        &self,
        tenant_id: TenantId,
        id: OptionId,
    ) -> ServiceResult<OptionWithValues> {
        let option = self.load_option(tenant_id, id).await?;
        let values = self.store.list_option_values(id).await?;
        Ok(OptionWithValues { option, values })
    }

    pub async fn update_option(
        &self,
        tenant_id: TenantId,
        id: OptionId,
        patch: OptionPatch,
    ) -> ServiceResult<ProductOption> {
        patch.validate()?;
        let mut option = self.load_option(tenant_id, id).await?;
        if patch == OptionPatch::default() {
            return Ok(option);
        }

        patch.apply_to(&mut option, Utc::now());
        if !self.store.update_option(&option).await? {
            return Err(ServiceError::not_found("option"));
        }
        Ok(option)
    }

    /// Delete an option together with its values.
    pub async fn delete_option(&self, tenant_id: TenantId, id: OptionId) -> ServiceResult<()> {
        if !self.store.delete_option(tenant_id, id).await? {
            return Err(ServiceError::not_found("option"));
        }
        info!(tenant_id = %tenant_id, option_id = %id, "option deleted");
        Ok(())
    }

    pub async fn create_value(
        &self,
        tenant_id: TenantId,
        option_id: OptionId,
        input: NewOptionValue,
    ) -> ServiceResult<OptionValue> {
        input.validate()?;
        self.load_option(tenant_id, option_id).await?;

        let existing = self.store.count_option_values(option_id).await?;
        let value = input.into_value(OptionValueId::new(), option_id, existing)?;
        self.store.insert_option_value(&value).await?;

        info!(tenant_id = %tenant_id, option_id = %option_id, value_id = %value.id, position = value.position, "option value created");
        Ok(value)
    }

    /// Values of an option ordered by position; not-found once the option is gone.
    pub async fn list_values(
        &self,
        tenant_id: TenantId,
        option_id: OptionId,
    ) -> ServiceResult<Vec<OptionValue>> {
        self.load_option(tenant_id, option_id).await?;
        Ok(self.store.list_option_values(option_id).await?)
    }

    pub async fn update_value(
        &self,
        tenant_id: TenantId,
        id: OptionValueId,
        patch: OptionValuePatch,
    ) -> ServiceResult<OptionValue> {
        patch.validate()?;
        let mut value = self.load_value(tenant_id, id).await?;
        if patch == OptionValuePatch::default() {
            return Ok(value);
        }

        patch.apply_to(&mut value);
        if !self.store.update_option_value(&value).await? {
            return Err(ServiceError::not_found("option value"));
        }
        Ok(value)
    }

    pub async fn delete_value(&self, tenant_id: TenantId, id: OptionValueId) -> ServiceResult<()> {
        if !self.store.delete_option_value(tenant_id, id).await? {
            return Err(ServiceError::not_found("option value"));
        }
        info!(tenant_id = %tenant_id, value_id = %id, "option value deleted");
        Ok(())
    }
}

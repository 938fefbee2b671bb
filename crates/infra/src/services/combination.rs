use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use vitrine_catalog::Combination;
use vitrine_core::{OptionValueId, ProductId, VariantId};

use super::{ServiceError, ServiceResult};
use crate::store::CatalogStore;

/// Decides whether a proposed combination is usable for a product.
///
/// The store's unique combination key is authoritative; this check runs
/// first so the common case fails before any write.
pub struct CombinationValidator<S: CatalogStore + ?Sized> {
    store: Arc<S>,
}

impl<S: CatalogStore + ?Sized> Clone for CombinationValidator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: CatalogStore + ?Sized> CombinationValidator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Variant of `product_id` (other than `exclude`) with exactly this
    /// combination. Empty combinations are never checked.
    pub async fn find_duplicate(
        &self,
        product_id: ProductId,
        combination: &Combination,
        exclude: Option<VariantId>,
    ) -> ServiceResult<Option<VariantId>> {
        if combination.is_empty() {
            return Ok(None);
        }

        let existing = self.store.variant_combinations(product_id).await?;
        Ok(combination.find_duplicate(existing.iter().map(|(id, c)| (*id, c)), exclude))
    }

    pub async fn is_duplicate(
        &self,
        product_id: ProductId,
        combination: &Combination,
    ) -> ServiceResult<bool> {
        Ok(self
            .find_duplicate(product_id, combination, None)
            .await?
            .is_some())
    }

    /// Fails with `Conflict` when the combination is already taken.
    pub async fn ensure_unique(
        &self,
        product_id: ProductId,
        combination: &Combination,
        exclude: Option<VariantId>,
    ) -> ServiceResult<()> {
        if let Some(existing) = self.find_duplicate(product_id, combination, exclude).await? {
            warn!(product_id = %product_id, existing_variant_id = %existing, "duplicate combination rejected");
            return Err(ServiceError::Conflict(
                "combination already exists for this product".to_string(),
            ));
        }
        Ok(())
    }

    /// Every id must name a value of one of the product's options.
    pub async fn ensure_known_values(
        &self,
        product_id: ProductId,
        combination: &Combination,
    ) -> ServiceResult<()> {
        let known: HashSet<OptionValueId> = self
            .store
            .product_option_value_ids(product_id)
            .await?
            .into_iter()
            .collect();

        if let Some(unknown) = combination.ids().find(|id| !known.contains(*id)) {
            return Err(ServiceError::Validation(format!(
                "option value {unknown} does not belong to this product"
            )));
        }
        Ok(())
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use vitrine_catalog::{
    Combination, OptionValue, OptionWithValues, Product, ProductFilter, ProductOption, Variant,
    VariantDetails,
};
use vitrine_core::{OptionId, OptionValueId, ProductId, TenantId, VariantId};

use super::{CatalogStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    options: HashMap<OptionId, ProductOption>,
    values: HashMap<OptionValueId, OptionValue>,
    variants: HashMap<VariantId, Variant>,
}

impl State {
    fn live_product(&self, tenant_id: TenantId, id: ProductId) -> Option<&Product> {
        self.products
            .get(&id)
            .filter(|p| p.tenant_id == tenant_id && !p.is_deleted())
    }

    fn owns_product(&self, tenant_id: TenantId, id: ProductId) -> bool {
        self.live_product(tenant_id, id).is_some()
    }

    fn option_in_tenant(&self, tenant_id: TenantId, id: OptionId) -> Option<&ProductOption> {
        self.options
            .get(&id)
            .filter(|o| self.owns_product(tenant_id, o.product_id))
    }

    fn value_in_tenant(&self, tenant_id: TenantId, id: OptionValueId) -> Option<&OptionValue> {
        self.values
            .get(&id)
            .filter(|v| self.option_in_tenant(tenant_id, v.option_id).is_some())
    }

    fn variant_in_tenant(&self, tenant_id: TenantId, id: VariantId) -> Option<&Variant> {
        self.variants
            .get(&id)
            .filter(|v| self.owns_product(tenant_id, v.product_id))
    }

    fn slug_taken(&self, product: &Product) -> bool {
        self.products.values().any(|p| {
            p.id != product.id
                && p.tenant_id == product.tenant_id
                && !p.is_deleted()
                && p.slug == product.slug
        })
    }

    /// SKU is always checked; the combination only when `check_combination`.
    fn check_variant_unique(&self, variant: &Variant, check_combination: bool) -> StoreResult<()> {
        for other in self.variants.values().filter(|v| v.id != variant.id) {
            if other.sku == variant.sku {
                return Err(StoreError::Conflict(format!(
                    "sku {} already exists",
                    variant.sku
                )));
            }
            if check_combination
                && other.product_id == variant.product_id
                && other.combination.matches_exactly(&variant.combination)
            {
                return Err(StoreError::Conflict(
                    "combination already exists for this product".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn sorted_values(&self, option_id: OptionId) -> Vec<OptionValue> {
        let mut values: Vec<OptionValue> = self
            .values
            .values()
            .filter(|v| v.option_id == option_id)
            .cloned()
            .collect();
        values.sort_by_key(|v| (v.position, *v.id.as_uuid()));
        values
    }

    /// Resolved values of a variant, ordered by option position then value
    /// position.
    fn details(&self, variant: &Variant) -> VariantDetails {
        let mut option_values: Vec<(u32, OptionValue)> = variant
            .combination
            .ids()
            .filter_map(|id| self.values.get(id))
            .map(|v| {
                let option_position = self.options.get(&v.option_id).map_or(0, |o| o.position);
                (option_position, v.clone())
            })
            .collect();
        option_values.sort_by_key(|(option_position, v)| (*option_position, v.position));

        VariantDetails {
            variant: variant.clone(),
            option_values: option_values.into_iter().map(|(_, v)| v).collect(),
        }
    }
}

fn newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// In-memory catalog store for tests and local development.
///
/// All writes happen under a single write lock, so uniqueness checks and the
/// insert that follows them are atomic.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<State>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("catalog lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("catalog lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.slug_taken(product) {
            return Err(StoreError::Conflict(format!(
                "slug {} already exists",
                product.slug
            )));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(
        &self,
        tenant_id: TenantId,
        id: ProductId,
    ) -> StoreResult<Option<Product>> {
        Ok(self.read()?.live_product(tenant_id, id).cloned())
    }

    async fn list_products(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>> {
        let state = self.read()?;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.tenant_id == tenant_id && !p.is_deleted())
            .cloned()
            .collect();
        newest_first(&mut products);
        Ok(products)
    }

    async fn search_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
    ) -> StoreResult<Vec<Product>> {
        let state = self.read()?;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.tenant_id == tenant_id && filter.matches(p))
            .cloned()
            .collect();
        newest_first(&mut products);

        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        Ok(products
            .into_iter()
            .skip(offset)
            .take(filter.limit() as usize)
            .collect())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let mut state = self.write()?;
        if !state.owns_product(product.tenant_id, product.id) {
            return Ok(false);
        }
        if state.slug_taken(product) {
            return Err(StoreError::Conflict(format!(
                "slug {} already exists",
                product.slug
            )));
        }
        state.products.insert(product.id, product.clone());
        Ok(true)
    }

    async fn soft_delete_product(
        &self,
        tenant_id: TenantId,
        id: ProductId,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.write()?;
        match state
            .products
            .get_mut(&id)
            .filter(|p| p.tenant_id == tenant_id && !p.is_deleted())
        {
            Some(product) => {
                product.deleted_at = Some(at);
                product.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_options(&self, product_id: ProductId) -> StoreResult<usize> {
        let state = self.read()?;
        Ok(state
            .options
            .values()
            .filter(|o| o.product_id == product_id)
            .count())
    }

    async fn insert_option(&self, option: &ProductOption) -> StoreResult<()> {
        self.write()?.options.insert(option.id, option.clone());
        Ok(())
    }

    async fn get_option(
        &self,
        tenant_id: TenantId,
        id: OptionId,
    ) -> StoreResult<Option<ProductOption>> {
        Ok(self.read()?.option_in_tenant(tenant_id, id).cloned())
    }

    async fn list_options(&self, product_id: ProductId) -> StoreResult<Vec<OptionWithValues>> {
        let state = self.read()?;
        let mut options: Vec<&ProductOption> = state
            .options
            .values()
            .filter(|o| o.product_id == product_id)
            .collect();
        options.sort_by_key(|o| (o.position, o.created_at, *o.id.as_uuid()));

        Ok(options
            .into_iter()
            .map(|option| OptionWithValues {
                option: option.clone(),
                values: state.sorted_values(option.id),
            })
            .collect())
    }

    async fn update_option(&self, option: &ProductOption) -> StoreResult<bool> {
        let mut state = self.write()?;
        match state.options.get_mut(&option.id) {
            Some(stored) => {
                *stored = option.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_option(&self, tenant_id: TenantId, id: OptionId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.option_in_tenant(tenant_id, id).is_none() {
            return Ok(false);
        }

        state.options.remove(&id);
        let removed: HashSet<OptionValueId> = state
            .values
            .values()
            .filter(|v| v.option_id == id)
            .map(|v| v.id)
            .collect();
        state.values.retain(|value_id, _| !removed.contains(value_id));
        for variant in state.variants.values_mut() {
            variant.combination = Combination::from_ids(
                variant
                    .combination
                    .ids()
                    .copied()
                    .filter(|value_id| !removed.contains(value_id)),
            );
        }
        Ok(true)
    }

    async fn count_option_values(&self, option_id: OptionId) -> StoreResult<usize> {
        let state = self.read()?;
        Ok(state
            .values
            .values()
            .filter(|v| v.option_id == option_id)
            .count())
    }

    async fn insert_option_value(&self, value: &OptionValue) -> StoreResult<()> {
        self.write()?.values.insert(value.id, value.clone());
        Ok(())
    }

    async fn get_option_value(
        &self,
        tenant_id: TenantId,
        id: OptionValueId,
    ) -> StoreResult<Option<OptionValue>> {
        Ok(self.read()?.value_in_tenant(tenant_id, id).cloned())
    }

    async fn list_option_values(&self, option_id: OptionId) -> StoreResult<Vec<OptionValue>> {
        Ok(self.read()?.sorted_values(option_id))
    }

    async fn product_option_value_ids(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Vec<OptionValueId>> {
        let state = self.read()?;
        Ok(state
            .values
            .values()
            .filter(|v| {
                state
                    .options
                    .get(&v.option_id)
                    .is_some_and(|o| o.product_id == product_id)
            })
            .map(|v| v.id)
            .collect())
    }

    async fn update_option_value(&self, value: &OptionValue) -> StoreResult<bool> {
        let mut state = self.write()?;
        match state.values.get_mut(&value.id) {
            Some(stored) => {
                *stored = value.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_option_value(
        &self,
        tenant_id: TenantId,
        id: OptionValueId,
    ) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.value_in_tenant(tenant_id, id).is_none() {
            return Ok(false);
        }
        state.values.remove(&id);
        for variant in state.variants.values_mut() {
            if variant.combination.contains(&id) {
                variant.combination =
                    Combination::from_ids(variant.combination.ids().copied().filter(|v| *v != id));
            }
        }
        Ok(true)
    }

    async fn variant_combinations(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Vec<(VariantId, Combination)>> {
        let state = self.read()?;
        Ok(state
            .variants
            .values()
            .filter(|v| v.product_id == product_id)
            .map(|v| (v.id, v.combination.clone()))
            .collect())
    }

    async fn insert_variant(&self, variant: &Variant) -> StoreResult<()> {
        let mut state = self.write()?;
        state.check_variant_unique(variant, true)?;
        state.variants.insert(variant.id, variant.clone());
        Ok(())
    }

    async fn get_variant(
        &self,
        tenant_id: TenantId,
        id: VariantId,
    ) -> StoreResult<Option<VariantDetails>> {
        let state = self.read()?;
        Ok(state
            .variant_in_tenant(tenant_id, id)
            .map(|v| state.details(v)))
    }

    async fn list_variants(&self, product_id: ProductId) -> StoreResult<Vec<VariantDetails>> {
        let state = self.read()?;
        let mut variants: Vec<&Variant> = state
            .variants
            .values()
            .filter(|v| v.product_id == product_id)
            .collect();
        variants.sort_by_key(|v| (v.created_at, v.id));
        Ok(variants.into_iter().map(|v| state.details(v)).collect())
    }

    async fn update_variant(&self, variant: &Variant) -> StoreResult<bool> {
        let mut state = self.write()?;
        let combination_changed = match state.variants.get(&variant.id) {
            Some(stored) => stored.combination != variant.combination,
            None => return Ok(false),
        };
        state.check_variant_unique(variant, combination_changed)?;
        state.variants.insert(variant.id, variant.clone());
        Ok(true)
    }

    async fn delete_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.variant_in_tenant(tenant_id, id).is_none() {
            return Ok(false);
        }
        state.variants.remove(&id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use vitrine_catalog::{NewOption, NewOptionValue, NewProduct, NewVariant};

    fn product(tenant_id: TenantId, title: &str) -> Product {
        NewProduct {
            title: title.to_string(),
            default_price: Decimal::from(10),
            currency: "EUR".to_string(),
            ..NewProduct::default()
        }
        .into_product(ProductId::new(), tenant_id, Utc::now())
        .unwrap()
    }

    fn variant(product_id: ProductId, sku: &str, ids: Vec<OptionValueId>) -> Variant {
        NewVariant {
            sku: sku.to_string(),
            option_value_ids: ids,
            ..NewVariant::default()
        }
        .into_variant(VariantId::new(), product_id, Utc::now())
        .unwrap()
    }

    #[tokio::test]
    async fn slug_is_unique_per_tenant_among_live_products() {
        let store = InMemoryCatalogStore::new();
        let tenant = TenantId::new();
        let first = product(tenant, "Chaise");
        store.insert_product(&first).await.unwrap();

        let err = store.insert_product(&product(tenant, "Chaise")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Another tenant may reuse it.
        store
            .insert_product(&product(TenantId::new(), "Chaise"))
            .await
            .unwrap();

        // So may the same tenant once the first is deleted.
        assert!(store.soft_delete_product(tenant, first.id, Utc::now()).await.unwrap());
        store.insert_product(&product(tenant, "Chaise")).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_combination_and_sku_conflict() {
        let store = InMemoryCatalogStore::new();
        let product_id = ProductId::new();
        let (a, b) = (OptionValueId::new(), OptionValueId::new());

        store.insert_variant(&variant(product_id, "V-1", vec![a, b])).await.unwrap();

        let err = store
            .insert_variant(&variant(product_id, "V-2", vec![b, a]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err = store
            .insert_variant(&variant(ProductId::new(), "V-1", vec![a]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.insert_variant(&variant(product_id, "V-3", vec![a])).await.unwrap();
    }

    #[tokio::test]
    async fn collapsed_combinations_still_accept_unrelated_updates() {
        let store = InMemoryCatalogStore::new();
        let tenant = TenantId::new();
        let chaise = product(tenant, "Chaise");
        store.insert_product(&chaise).await.unwrap();

        let couleur = NewOption {
            name: "Couleur".to_string(),
            position: None,
        }
        .into_option(OptionId::new(), chaise.id, 0, Utc::now())
        .unwrap();
        store.insert_option(&couleur).await.unwrap();
        let mut ids = Vec::new();
        for (i, v) in ["Rouge", "Bleu"].into_iter().enumerate() {
            let value = NewOptionValue {
                value: v.to_string(),
                position: None,
            }
            .into_value(OptionValueId::new(), couleur.id, i)
            .unwrap();
            store.insert_option_value(&value).await.unwrap();
            ids.push(value.id);
        }
        let s = OptionValueId::new();

        let first = variant(chaise.id, "CH-RS", vec![ids[0], s]);
        let second = variant(chaise.id, "CH-BS", vec![ids[1], s]);
        store.insert_variant(&first).await.unwrap();
        store.insert_variant(&second).await.unwrap();

        assert!(store.delete_option(tenant, couleur.id).await.unwrap());

        for id in [first.id, second.id] {
            let mut stored = store.get_variant(tenant, id).await.unwrap().unwrap().variant;
            assert_eq!(stored.combination, Combination::from_ids([s]));
            stored.stock_quantity = 5;
            assert!(store.update_variant(&stored).await.unwrap());
        }

        // Re-pointing one of them at the other's combination is still refused.
        let mut moved = store.get_variant(tenant, first.id).await.unwrap().unwrap().variant;
        moved.combination = Combination::from_ids([s, OptionValueId::new()]);
        assert!(store.update_variant(&moved).await.unwrap());
        moved.combination = Combination::from_ids([s]);
        let err = store.update_variant(&moved).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn search_pages_newest_first() {
        let store = InMemoryCatalogStore::new();
        let tenant = TenantId::new();
        let base = Utc::now();
        for i in 0..5 {
            let mut p = product(tenant, &format!("Produit {i}"));
            p.created_at = base + chrono::Duration::seconds(i);
            store.insert_product(&p).await.unwrap();
        }

        let filter = ProductFilter {
            page: Some(2),
            limit: Some(2),
            ..ProductFilter::default()
        };
        let page = store.search_products(tenant, &filter).await.unwrap();
        let titles: Vec<&str> = page.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Produit 2", "Produit 1"]);
    }
}

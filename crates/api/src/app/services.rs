use std::sync::Arc;

use vitrine_infra::config::AppConfig;
use vitrine_infra::services::{OptionService, ProductService, VariantService};
use vitrine_infra::store::{
    CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreResult,
};

/// Services shared by every request handler.
pub struct AppServices {
    pub products: ProductService<dyn CatalogStore>,
    pub options: OptionService<dyn CatalogStore>,
    pub variants: VariantService<dyn CatalogStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            products: ProductService::new(store.clone()),
            options: OptionService::new(store.clone()),
            variants: VariantService::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()))
    }

    /// Postgres when a database is configured, in-memory otherwise.
    pub async fn from_config(config: &AppConfig) -> StoreResult<Self> {
        let store: Arc<dyn CatalogStore> = match &config.database {
            Some(database) => {
                let store = PostgresCatalogStore::connect(database, config.store_timeout).await?;
                tracing::info!("using postgres catalog store");
                Arc::new(store)
            }
            None => {
                tracing::warn!("no database configured; using in-memory catalog store");
                Arc::new(InMemoryCatalogStore::new())
            }
        };
        Ok(Self::new(store))
    }
}

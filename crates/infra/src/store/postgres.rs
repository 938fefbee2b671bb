//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | `StoreError` |
//! |---|---|---|
//! | Database (unique violation) | `23505` | `Conflict` (slug, SKU or combination) |
//! | Database (other) | any | `Backend` |
//! | deadline exceeded | n/a | `Timeout` |
//! | anything else | n/a | `Backend` |
//!
//! ## Tenant Isolation
//!
//! Products are always filtered by `tenant_id`. Options, values and variants
//! looked up by id are joined back to their product and filtered the same way.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{Span, instrument, warn};
use uuid::Uuid;

use vitrine_catalog::{
    Combination, OptionValue, OptionWithValues, Product, ProductFilter, ProductOption, Variant,
    VariantDetails,
};
use vitrine_core::{OptionId, OptionValueId, ProductId, TenantId, VariantId};

use super::{CatalogStore, StoreError, StoreResult};
use crate::config::DatabaseConfig;

const SCHEMA_SQL: &str = include_str!("schema.sql");

macro_rules! product_columns {
    () => {
        "p.id, p.tenant_id, p.title, p.description, p.slug, p.status, p.default_price, \
         p.currency, p.sku, p.track_stock, p.stock_quantity, p.weight, p.dimensions, p.brand, \
         p.tax_class, p.visibility, p.publish_date, p.deleted_at, p.created_at, p.updated_at"
    };
}

macro_rules! option_columns {
    () => {
        "o.id, o.product_id, o.name, o.position, o.created_at, o.updated_at"
    };
}

macro_rules! variant_columns {
    () => {
        "v.id, v.product_id, v.sku, v.price, v.stock_quantity, v.barcode, v.weight, v.images, \
         v.created_at, v.updated_at"
    };
}

#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PostgresCatalogStore {
    /// Wrap an existing pool. `timeout` bounds every store operation.
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            timeout,
        }
    }

    /// Open a pool and apply the schema.
    pub async fn connect(config: &DatabaseConfig, timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(db("connect"))?;

        let store = Self::new(pool, timeout);
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes that do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        self.timed("migrate", async {
            sqlx::raw_sql(SCHEMA_SQL)
                .execute(&*self.pool)
                .await
                .map_err(db("migrate"))?;
            Ok(())
        })
        .await
    }

    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "store deadline exceeded");
                Err(StoreError::Timeout { operation })
            }
        }
    }

    /// Option values of the given variants, ordered by option position then
    /// value position, grouped per variant.
    async fn values_for_variants(
        &self,
        variant_ids: Vec<Uuid>,
    ) -> StoreResult<HashMap<Uuid, Vec<OptionValue>>> {
        let rows = sqlx::query(
            r#"
            SELECT vov.variant_id, ov.id, ov.option_id, ov.value, ov.position
            FROM variant_option_values vov
            JOIN option_values ov ON ov.id = vov.option_value_id
            JOIN product_options po ON po.id = ov.option_id
            WHERE vov.variant_id = ANY($1)
            ORDER BY po.position, ov.position, ov.id
            "#,
        )
        .bind(variant_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(db("load_variant_values"))?;

        let mut grouped: HashMap<Uuid, Vec<OptionValue>> = HashMap::new();
        for row in rows {
            let variant_id: Uuid = row.try_get("variant_id").map_err(db("load_variant_values"))?;
            let value = option_value_from_row(&row).map_err(db("load_variant_values"))?;
            grouped.entry(variant_id).or_default().push(value);
        }
        Ok(grouped)
    }

    async fn with_details(&self, rows: Vec<PgRow>) -> StoreResult<Vec<VariantDetails>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(db("load_variants"))?;
        let mut values = self.values_for_variants(ids).await?;

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id").map_err(db("load_variants"))?;
                let option_values = values.remove(&id).unwrap_or_default();
                let combination = Combination::from_ids(option_values.iter().map(|v| v.id));
                let variant = variant_from_row(row, combination).map_err(db("load_variants"))?;
                Ok(VariantDetails {
                    variant,
                    option_values,
                })
            })
            .collect()
    }
}

fn db(operation: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |err| map_sqlx_error(operation, err)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let what = match db_err.constraint() {
                    Some("products_tenant_slug_live") => "slug already exists",
                    Some("variants_sku") => "sku already exists",
                    Some("variants_product_combination") => {
                        "combination already exists for this product"
                    }
                    _ => "duplicate record",
                };
                StoreError::Conflict(what.to_string())
            } else {
                StoreError::Backend(format!(
                    "database error in {}: {}",
                    operation,
                    db_err.message()
                ))
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Backend(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

fn position(row: &PgRow) -> Result<u32, sqlx::Error> {
    let raw: i64 = row.try_get("position")?;
    u32::try_from(raw).map_err(decode_err)
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let visibility: String = row.try_get("visibility")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        slug: row.try_get("slug")?,
        status: status.parse().map_err(decode_err)?,
        default_price: row.try_get("default_price")?,
        currency: row.try_get("currency")?,
        sku: row.try_get("sku")?,
        track_stock: row.try_get("track_stock")?,
        stock_quantity: row.try_get("stock_quantity")?,
        weight: row.try_get("weight")?,
        dimensions: row.try_get("dimensions")?,
        brand: row.try_get("brand")?,
        tax_class: row.try_get("tax_class")?,
        visibility: visibility.parse().map_err(decode_err)?,
        publish_date: row.try_get("publish_date")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn option_from_row(row: &PgRow) -> Result<ProductOption, sqlx::Error> {
    Ok(ProductOption {
        id: OptionId::from_uuid(row.try_get("id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        name: row.try_get("name")?,
        position: position(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn option_value_from_row(row: &PgRow) -> Result<OptionValue, sqlx::Error> {
    Ok(OptionValue {
        id: OptionValueId::from_uuid(row.try_get("id")?),
        option_id: OptionId::from_uuid(row.try_get("option_id")?),
        value: row.try_get("value")?,
        position: position(row)?,
    })
}

fn variant_from_row(row: &PgRow, combination: Combination) -> Result<Variant, sqlx::Error> {
    Ok(Variant {
        id: VariantId::from_uuid(row.try_get("id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        sku: row.try_get("sku")?,
        price: row.try_get("price")?,
        stock_quantity: row.try_get("stock_quantity")?,
        barcode: row.try_get("barcode")?,
        weight: row.try_get("weight")?,
        images: row.try_get("images")?,
        combination,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn combination_ids(combination: &Combination) -> Vec<Uuid> {
    combination.ids().map(|id| *id.as_uuid()).collect()
}

/// `ILIKE` pattern matching `term` anywhere, with wildcards in `term` escaped.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait::async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, product), fields(tenant_id = %product.tenant_id, product_id = %product.id), err)]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.timed("insert_product", async {
            sqlx::query(
                r#"
                INSERT INTO products (
                    id, tenant_id, title, description, slug, status, default_price, currency,
                    sku, track_stock, stock_quantity, weight, dimensions, brand, tax_class,
                    visibility, publish_date, deleted_at, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                        $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
                "#,
            )
            .bind(product.id.as_uuid())
            .bind(product.tenant_id.as_uuid())
            .bind(&product.title)
            .bind(&product.description)
            .bind(&product.slug)
            .bind(product.status.as_str())
            .bind(product.default_price)
            .bind(&product.currency)
            .bind(&product.sku)
            .bind(product.track_stock)
            .bind(product.stock_quantity)
            .bind(product.weight)
            .bind(&product.dimensions)
            .bind(&product.brand)
            .bind(&product.tax_class)
            .bind(product.visibility.as_str())
            .bind(product.publish_date)
            .bind(product.deleted_at)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&*self.pool)
            .await
            .map_err(db("insert_product"))?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %id), err)]
    async fn get_product(
        &self,
        tenant_id: TenantId,
        id: ProductId,
    ) -> StoreResult<Option<Product>> {
        self.timed("get_product", async {
            let row = sqlx::query(concat!(
                "SELECT ",
                product_columns!(),
                " FROM products p WHERE p.id = $1 AND p.tenant_id = $2 AND p.deleted_at IS NULL"
            ))
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(db("get_product"))?;

            row.as_ref()
                .map(product_from_row)
                .transpose()
                .map_err(db("get_product"))
        })
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_count = tracing::field::Empty), err)]
    async fn list_products(&self, tenant_id: TenantId) -> StoreResult<Vec<Product>> {
        self.timed("list_products", async {
            let rows = sqlx::query(concat!(
                "SELECT ",
                product_columns!(),
                " FROM products p WHERE p.tenant_id = $1 AND p.deleted_at IS NULL",
                " ORDER BY p.created_at DESC, p.id DESC"
            ))
            .bind(tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(db("list_products"))?;

            Span::current().record("product_count", rows.len());
            rows.iter()
                .map(product_from_row)
                .collect::<Result<Vec<_>, _>>()
                .map_err(db("list_products"))
        })
        .await
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id, page = filter.page(), limit = filter.limit()), err)]
    async fn search_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
    ) -> StoreResult<Vec<Product>> {
        let status = filter.status.map(|s| s.as_str());
        let visibility = filter.visibility.map(|v| v.as_str());
        let search = filter.search_term().map(contains_pattern);
        let limit = i64::from(filter.limit());
        let offset = i64::try_from(filter.offset()).unwrap_or(i64::MAX);

        self.timed("search_products", async {
            let rows = sqlx::query(concat!(
                "SELECT ",
                product_columns!(),
                r#"
                FROM products p
                WHERE p.tenant_id = $1
                    AND ($2::text IS NULL OR p.status = $2)
                    AND ($3::text IS NULL OR p.visibility = $3)
                    AND ($4::text IS NULL OR p.brand = $4)
                    AND ($5::text IS NULL OR p.title ILIKE $5 OR p.description ILIKE $5)
                    AND ($6 OR p.deleted_at IS NULL)
                ORDER BY p.created_at DESC, p.id DESC
                LIMIT $7 OFFSET $8
                "#
            ))
            .bind(tenant_id.as_uuid())
            .bind(status)
            .bind(visibility)
            .bind(filter.brand.as_deref())
            .bind(search.as_deref())
            .bind(filter.include_deleted)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(db("search_products"))?;

            rows.iter()
                .map(product_from_row)
                .collect::<Result<Vec<_>, _>>()
                .map_err(db("search_products"))
        })
        .await
    }

    #[instrument(skip(self, product), fields(tenant_id = %product.tenant_id, product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        self.timed("update_product", async {
            let result = sqlx::query(
                r#"
                UPDATE products SET
                    title = $3, description = $4, slug = $5, status = $6, default_price = $7,
                    currency = $8, sku = $9, track_stock = $10, stock_quantity = $11,
                    weight = $12, dimensions = $13, brand = $14, tax_class = $15,
                    visibility = $16, publish_date = $17, updated_at = $18
                WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
                "#,
            )
            .bind(product.id.as_uuid())
            .bind(product.tenant_id.as_uuid())
            .bind(&product.title)
            .bind(&product.description)
            .bind(&product.slug)
            .bind(product.status.as_str())
            .bind(product.default_price)
            .bind(&product.currency)
            .bind(&product.sku)
            .bind(product.track_stock)
            .bind(product.stock_quantity)
            .bind(product.weight)
            .bind(&product.dimensions)
            .bind(&product.brand)
            .bind(&product.tax_class)
            .bind(product.visibility.as_str())
            .bind(product.publish_date)
            .bind(product.updated_at)
            .execute(&*self.pool)
            .await
            .map_err(db("update_product"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %id), err)]
    async fn soft_delete_product(
        &self,
        tenant_id: TenantId,
        id: ProductId,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.timed("soft_delete_product", async {
            let result = sqlx::query(
                r#"
                UPDATE products SET deleted_at = $3, updated_at = $3
                WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
                "#,
            )
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(db("soft_delete_product"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn count_options(&self, product_id: ProductId) -> StoreResult<usize> {
        self.timed("count_options", async {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM product_options WHERE product_id = $1")
                    .bind(product_id.as_uuid())
                    .fetch_one(&*self.pool)
                    .await
                    .map_err(db("count_options"))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }

    #[instrument(skip(self, option), fields(product_id = %option.product_id, option_id = %option.id), err)]
    async fn insert_option(&self, option: &ProductOption) -> StoreResult<()> {
        self.timed("insert_option", async {
            sqlx::query(
                r#"
                INSERT INTO product_options (id, product_id, name, position, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(option.id.as_uuid())
            .bind(option.product_id.as_uuid())
            .bind(&option.name)
            .bind(i64::from(option.position))
            .bind(option.created_at)
            .bind(option.updated_at)
            .execute(&*self.pool)
            .await
            .map_err(db("insert_option"))?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, option_id = %id), err)]
    async fn get_option(
        &self,
        tenant_id: TenantId,
        id: OptionId,
    ) -> StoreResult<Option<ProductOption>> {
        self.timed("get_option", async {
            let row = sqlx::query(concat!(
                "SELECT ",
                option_columns!(),
                r#"
                FROM product_options o
                JOIN products p ON p.id = o.product_id
                WHERE o.id = $1 AND p.tenant_id = $2 AND p.deleted_at IS NULL
                "#
            ))
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(db("get_option"))?;

            row.as_ref()
                .map(option_from_row)
                .transpose()
                .map_err(db("get_option"))
        })
        .await
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn list_options(&self, product_id: ProductId) -> StoreResult<Vec<OptionWithValues>> {
        self.timed("list_options", async {
            let option_rows = sqlx::query(concat!(
                "SELECT ",
                option_columns!(),
                " FROM product_options o WHERE o.product_id = $1",
                " ORDER BY o.position, o.created_at, o.id"
            ))
            .bind(product_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(db("list_options"))?;

            let value_rows = sqlx::query(
                r#"
                SELECT ov.id, ov.option_id, ov.value, ov.position
                FROM option_values ov
                JOIN product_options o ON o.id = ov.option_id
                WHERE o.product_id = $1
                ORDER BY ov.position, ov.id
                "#,
            )
            .bind(product_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(db("list_options"))?;

            let mut values: HashMap<OptionId, Vec<OptionValue>> = HashMap::new();
            for row in &value_rows {
                let value = option_value_from_row(row).map_err(db("list_options"))?;
                values.entry(value.option_id).or_default().push(value);
            }

            option_rows
                .iter()
                .map(|row| {
                    let option = option_from_row(row).map_err(db("list_options"))?;
                    let values = values.remove(&option.id).unwrap_or_default();
                    Ok(OptionWithValues { option, values })
                })
                .collect()
        })
        .await
    }

    #[instrument(skip(self, option), fields(option_id = %option.id), err)]
    async fn update_option(&self, option: &ProductOption) -> StoreResult<bool> {
        self.timed("update_option", async {
            let result = sqlx::query(
                "UPDATE product_options SET name = $2, position = $3, updated_at = $4 WHERE id = $1",
            )
            .bind(option.id.as_uuid())
            .bind(&option.name)
            .bind(i64::from(option.position))
            .bind(option.updated_at)
            .execute(&*self.pool)
            .await
            .map_err(db("update_option"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, option_id = %id), err)]
    async fn delete_option(&self, tenant_id: TenantId, id: OptionId) -> StoreResult<bool> {
        self.timed("delete_option", async {
            let result = sqlx::query(
                r#"
                DELETE FROM product_options o
                USING products p
                WHERE o.id = $1 AND o.product_id = p.id
                    AND p.tenant_id = $2 AND p.deleted_at IS NULL
                "#,
            )
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(db("delete_option"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn count_option_values(&self, option_id: OptionId) -> StoreResult<usize> {
        self.timed("count_option_values", async {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM option_values WHERE option_id = $1")
                    .bind(option_id.as_uuid())
                    .fetch_one(&*self.pool)
                    .await
                    .map_err(db("count_option_values"))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }

    #[instrument(skip(self, value), fields(option_id = %value.option_id, value_id = %value.id), err)]
    async fn insert_option_value(&self, value: &OptionValue) -> StoreResult<()> {
        self.timed("insert_option_value", async {
            sqlx::query(
                "INSERT INTO option_values (id, option_id, value, position) VALUES ($1, $2, $3, $4)",
            )
            .bind(value.id.as_uuid())
            .bind(value.option_id.as_uuid())
            .bind(&value.value)
            .bind(i64::from(value.position))
            .execute(&*self.pool)
            .await
            .map_err(db("insert_option_value"))?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, value_id = %id), err)]
    async fn get_option_value(
        &self,
        tenant_id: TenantId,
        id: OptionValueId,
    ) -> StoreResult<Option<OptionValue>> {
        self.timed("get_option_value", async {
            let row = sqlx::query(
                r#"
                SELECT ov.id, ov.option_id, ov.value, ov.position
                FROM option_values ov
                JOIN product_options o ON o.id = ov.option_id
                JOIN products p ON p.id = o.product_id
                WHERE ov.id = $1 AND p.tenant_id = $2 AND p.deleted_at IS NULL
                "#,
            )
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(db("get_option_value"))?;

            row.as_ref()
                .map(option_value_from_row)
                .transpose()
                .map_err(db("get_option_value"))
        })
        .await
    }

    async fn list_option_values(&self, option_id: OptionId) -> StoreResult<Vec<OptionValue>> {
        self.timed("list_option_values", async {
            let rows = sqlx::query(
                r#"
                SELECT ov.id, ov.option_id, ov.value, ov.position
                FROM option_values ov
                WHERE ov.option_id = $1
                ORDER BY ov.position, ov.id
                "#,
            )
            .bind(option_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(db("list_option_values"))?;

            rows.iter()
                .map(option_value_from_row)
                .collect::<Result<Vec<_>, _>>()
                .map_err(db("list_option_values"))
        })
        .await
    }

    async fn product_option_value_ids(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Vec<OptionValueId>> {
        self.timed("product_option_value_ids", async {
            let ids: Vec<Uuid> = sqlx::query_scalar(
                r#"
                SELECT ov.id
                FROM option_values ov
                JOIN product_options o ON o.id = ov.option_id
                WHERE o.product_id = $1
                "#,
            )
            .bind(product_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(db("product_option_value_ids"))?;
            Ok(ids.into_iter().map(OptionValueId::from_uuid).collect())
        })
        .await
    }

    #[instrument(skip(self, value), fields(value_id = %value.id), err)]
    async fn update_option_value(&self, value: &OptionValue) -> StoreResult<bool> {
        self.timed("update_option_value", async {
            let result =
                sqlx::query("UPDATE option_values SET value = $2, position = $3 WHERE id = $1")
                    .bind(value.id.as_uuid())
                    .bind(&value.value)
                    .bind(i64::from(value.position))
                    .execute(&*self.pool)
                    .await
                    .map_err(db("update_option_value"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, value_id = %id), err)]
    async fn delete_option_value(
        &self,
        tenant_id: TenantId,
        id: OptionValueId,
    ) -> StoreResult<bool> {
        self.timed("delete_option_value", async {
            let result = sqlx::query(
                r#"
                DELETE FROM option_values ov
                USING product_options o, products p
                WHERE ov.id = $1 AND ov.option_id = o.id AND o.product_id = p.id
                    AND p.tenant_id = $2 AND p.deleted_at IS NULL
                "#,
            )
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(db("delete_option_value"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn variant_combinations(
        &self,
        product_id: ProductId,
    ) -> StoreResult<Vec<(VariantId, Combination)>> {
        self.timed("variant_combinations", async {
            let rows = sqlx::query(
                r#"
                SELECT v.id AS variant_id, vov.option_value_id
                FROM variants v
                LEFT JOIN variant_option_values vov ON vov.variant_id = v.id
                WHERE v.product_id = $1
                "#,
            )
            .bind(product_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(db("variant_combinations"))?;

            let mut grouped: HashMap<VariantId, Vec<OptionValueId>> = HashMap::new();
            for row in rows {
                let variant_id: Uuid = row.try_get("variant_id").map_err(db("variant_combinations"))?;
                let value_id: Option<Uuid> = row
                    .try_get("option_value_id")
                    .map_err(db("variant_combinations"))?;
                let ids = grouped.entry(VariantId::from_uuid(variant_id)).or_default();
                if let Some(value_id) = value_id {
                    ids.push(OptionValueId::from_uuid(value_id));
                }
            }
            Ok(grouped
                .into_iter()
                .map(|(id, ids)| (id, Combination::from_ids(ids)))
                .collect())
        })
        .await
    }

    #[instrument(skip(self, variant), fields(product_id = %variant.product_id, variant_id = %variant.id), err)]
    async fn insert_variant(&self, variant: &Variant) -> StoreResult<()> {
        self.timed("insert_variant", async {
            let mut tx = self.pool.begin().await.map_err(db("begin_transaction"))?;

            sqlx::query(
                r#"
                INSERT INTO variants (
                    id, product_id, sku, price, stock_quantity, barcode, weight, images,
                    combination_key, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(variant.id.as_uuid())
            .bind(variant.product_id.as_uuid())
            .bind(&variant.sku)
            .bind(variant.price)
            .bind(variant.stock_quantity)
            .bind(&variant.barcode)
            .bind(variant.weight)
            .bind(&variant.images)
            .bind(variant.combination.canonical_key())
            .bind(variant.created_at)
            .bind(variant.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db("insert_variant"))?;

            sqlx::query(
                r#"
                INSERT INTO variant_option_values (variant_id, option_value_id)
                SELECT $1, UNNEST($2::uuid[])
                "#,
            )
            .bind(variant.id.as_uuid())
            .bind(combination_ids(&variant.combination))
            .execute(&mut *tx)
            .await
            .map_err(db("insert_variant_values"))?;

            tx.commit().await.map_err(db("commit_transaction"))?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, variant_id = %id), err)]
    async fn get_variant(
        &self,
        tenant_id: TenantId,
        id: VariantId,
    ) -> StoreResult<Option<VariantDetails>> {
        self.timed("get_variant", async {
            let row = sqlx::query(concat!(
                "SELECT ",
                variant_columns!(),
                r#"
                FROM variants v
                JOIN products p ON p.id = v.product_id
                WHERE v.id = $1 AND p.tenant_id = $2 AND p.deleted_at IS NULL
                "#
            ))
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(db("get_variant"))?;

            match row {
                Some(row) => Ok(self.with_details(vec![row]).await?.pop()),
                None => Ok(None),
            }
        })
        .await
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn list_variants(&self, product_id: ProductId) -> StoreResult<Vec<VariantDetails>> {
        self.timed("list_variants", async {
            let rows = sqlx::query(concat!(
                "SELECT ",
                variant_columns!(),
                " FROM variants v WHERE v.product_id = $1 ORDER BY v.created_at, v.id"
            ))
            .bind(product_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(db("list_variants"))?;

            self.with_details(rows).await
        })
        .await
    }

    #[instrument(skip(self, variant), fields(variant_id = %variant.id), err)]
    async fn update_variant(&self, variant: &Variant) -> StoreResult<bool> {
        self.timed("update_variant", async {
            let mut tx = self.pool.begin().await.map_err(db("begin_transaction"))?;

            // Deleted options leave variants with a shrunken set and a stale
            // key; both stay untouched unless the combination itself changes.
            let stored: Vec<Uuid> = sqlx::query_scalar(
                "SELECT option_value_id FROM variant_option_values WHERE variant_id = $1",
            )
            .bind(variant.id.as_uuid())
            .fetch_all(&mut *tx)
            .await
            .map_err(db("update_variant"))?;
            let combination_changed = Combination::from_ids(
                stored.into_iter().map(OptionValueId::from_uuid),
            ) != variant.combination;

            let result = sqlx::query(
                r#"
                UPDATE variants SET
                    sku = $2, price = $3, stock_quantity = $4, barcode = $5, weight = $6,
                    images = $7,
                    combination_key = CASE WHEN $10 THEN $8 ELSE combination_key END,
                    updated_at = $9
                WHERE id = $1
                "#,
            )
            .bind(variant.id.as_uuid())
            .bind(&variant.sku)
            .bind(variant.price)
            .bind(variant.stock_quantity)
            .bind(&variant.barcode)
            .bind(variant.weight)
            .bind(&variant.images)
            .bind(variant.combination.canonical_key())
            .bind(variant.updated_at)
            .bind(combination_changed)
            .execute(&mut *tx)
            .await
            .map_err(db("update_variant"))?;

            if result.rows_affected() == 0 {
                tx.rollback().await.map_err(db("rollback"))?;
                return Ok(false);
            }
            if !combination_changed {
                tx.commit().await.map_err(db("commit_transaction"))?;
                return Ok(true);
            }

            sqlx::query("DELETE FROM variant_option_values WHERE variant_id = $1")
                .bind(variant.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db("update_variant_values"))?;

            sqlx::query(
                r#"
                INSERT INTO variant_option_values (variant_id, option_value_id)
                SELECT $1, UNNEST($2::uuid[])
                "#,
            )
            .bind(variant.id.as_uuid())
            .bind(combination_ids(&variant.combination))
            .execute(&mut *tx)
            .await
            .map_err(db("update_variant_values"))?;

            tx.commit().await.map_err(db("commit_transaction"))?;
            Ok(true)
        })
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, variant_id = %id), err)]
    async fn delete_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool> {
        self.timed("delete_variant", async {
            let result = sqlx::query(
                r#"
                DELETE FROM variants v
                USING products p
                WHERE v.id = $1 AND v.product_id = p.id
                    AND p.tenant_id = $2 AND p.deleted_at IS NULL
                "#,
            )
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(db("delete_variant"))?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }
}

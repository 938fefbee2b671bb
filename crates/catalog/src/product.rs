use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitrine_core::{DomainError, DomainResult, Entity, ProductId, TenantId};

use crate::rules;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Product publication lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProductStatus {
    #[default]
    #[serde(rename = "brouillon")]
    Draft,
    #[serde(rename = "publie")]
    Published,
    #[serde(rename = "archive")]
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "brouillon",
            ProductStatus::Published => "publie",
            ProductStatus::Archived => "archive",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brouillon" => Ok(ProductStatus::Draft),
            "publie" => Ok(ProductStatus::Published),
            "archive" => Ok(ProductStatus::Archived),
            _ => Err(DomainError::validation(
                "statut must be one of: brouillon, publie, archive",
            )),
        }
    }
}

/// Storefront visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    #[serde(rename = "publique")]
    Public,
    #[serde(rename = "privee")]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "publique",
            Visibility::Private => "privee",
        }
    }
}

impl FromStr for Visibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publique" => Ok(Visibility::Public),
            "privee" => Ok(Visibility::Private),
            _ => Err(DomainError::validation(
                "visibilite must be one of: publique, privee",
            )),
        }
    }
}

/// Tenant-scoped product record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub status: ProductStatus,
    pub default_price: Decimal,
    pub currency: String,
    pub sku: Option<String>,
    pub track_stock: bool,
    pub stock_quantity: i64,
    pub weight: Option<Decimal>,
    pub dimensions: Option<String>,
    pub brand: Option<String>,
    pub tax_class: Option<String>,
    pub visibility: Visibility,
    pub publish_date: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Derive a slug from a title: lowercased, spaces replaced by `-`.
pub fn slugify(title: &str) -> String {
    title.trim().to_lowercase().replace(' ', "-")
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub status: Option<ProductStatus>,
    pub default_price: Decimal,
    pub currency: String,
    pub sku: Option<String>,
    pub track_stock: bool,
    pub stock_quantity: i64,
    pub weight: Option<Decimal>,
    pub dimensions: Option<String>,
    pub brand: Option<String>,
    pub tax_class: Option<String>,
    pub visibility: Option<Visibility>,
    pub publish_date: Option<DateTime<Utc>>,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        rules::text("titre", &self.title, 255)?;
        rules::optional_text("slug", self.slug.as_deref(), 255)?;
        rules::non_negative_decimal("prix_defaut", self.default_price)?;
        rules::currency("devise", &self.currency)?;
        rules::optional_text("sku", self.sku.as_deref(), 100)?;
        rules::non_negative("quantite_stock", self.stock_quantity)?;
        if let Some(weight) = self.weight {
            rules::non_negative_decimal("poids", weight)?;
        }
        rules::optional_text("dimensions", self.dimensions.as_deref(), 100)?;
        rules::optional_text("marque", self.brand.as_deref(), 255)?;
        rules::optional_text("classe_taxe", self.tax_class.as_deref(), 100)?;
        Ok(())
    }

    /// Validate and build the record to persist.
    pub fn into_product(
        self,
        id: ProductId,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> DomainResult<Product> {
        self.validate()?;

        let slug = match self.slug {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => slugify(&self.title),
        };

        Ok(Product {
            id,
            tenant_id,
            title: self.title,
            description: self.description,
            slug,
            status: self.status.unwrap_or_default(),
            default_price: self.default_price,
            currency: self.currency.to_ascii_uppercase(),
            sku: self.sku,
            track_stock: self.track_stock,
            stock_quantity: self.stock_quantity,
            weight: self.weight,
            dimensions: self.dimensions,
            brand: self.brand,
            tax_class: self.tax_class,
            visibility: self.visibility.unwrap_or_default(),
            publish_date: self.publish_date,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial product update.
///
/// `None` leaves the field unchanged. For nullable fields the inner option
/// distinguishes "set to null" (`Some(None)`) from "not supplied" (`None`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub slug: Option<String>,
    pub status: Option<ProductStatus>,
    pub default_price: Option<Decimal>,
    pub currency: Option<String>,
    pub sku: Option<Option<String>>,
    pub track_stock: Option<bool>,
    pub stock_quantity: Option<i64>,
    pub weight: Option<Option<Decimal>>,
    pub dimensions: Option<Option<String>>,
    pub brand: Option<Option<String>>,
    pub tax_class: Option<Option<String>>,
    pub visibility: Option<Visibility>,
    pub publish_date: Option<Option<DateTime<Utc>>>,
}

impl ProductPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(title) = &self.title {
            rules::text("titre", title, 255)?;
        }
        if let Some(slug) = &self.slug {
            rules::text("slug", slug, 255)?;
        }
        if let Some(price) = self.default_price {
            rules::non_negative_decimal("prix_defaut", price)?;
        }
        if let Some(currency) = &self.currency {
            rules::currency("devise", currency)?;
        }
        if let Some(Some(sku)) = &self.sku {
            rules::optional_text("sku", Some(sku), 100)?;
        }
        if let Some(quantity) = self.stock_quantity {
            rules::non_negative("quantite_stock", quantity)?;
        }
        if let Some(Some(weight)) = self.weight {
            rules::non_negative_decimal("poids", weight)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }

    /// Overwrite only the supplied fields.
    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(v) = &self.title {
            product.title = v.clone();
        }
        if let Some(v) = &self.description {
            product.description = v.clone();
        }
        if let Some(v) = &self.slug {
            product.slug = v.trim().to_string();
        }
        if let Some(v) = self.status {
            product.status = v;
        }
        if let Some(v) = self.default_price {
            product.default_price = v;
        }
        if let Some(v) = &self.currency {
            product.currency = v.to_ascii_uppercase();
        }
        if let Some(v) = &self.sku {
            product.sku = v.clone();
        }
        if let Some(v) = self.track_stock {
            product.track_stock = v;
        }
        if let Some(v) = self.stock_quantity {
            product.stock_quantity = v;
        }
        if let Some(v) = self.weight {
            product.weight = v;
        }
        if let Some(v) = &self.dimensions {
            product.dimensions = v.clone();
        }
        if let Some(v) = &self.brand {
            product.brand = v.clone();
        }
        if let Some(v) = &self.tax_class {
            product.tax_class = v.clone();
        }
        if let Some(v) = self.visibility {
            product.visibility = v;
        }
        if let Some(v) = self.publish_date {
            product.publish_date = v;
        }
        product.updated_at = now;
    }
}

/// Search filter over a tenant's products.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub visibility: Option<Visibility>,
    pub brand: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub include_deleted: bool,
}

impl ProductFilter {
    /// 1-based page, defaulting to 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size: 0 or unset means the default, capped at [`MAX_PAGE_LIMIT`].
    pub fn limit(&self) -> u32 {
        match self.limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT,
            Some(l) => l.min(MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }

    /// Search term, if it carries anything beyond whitespace.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// In-process evaluation of the filter (pagination excluded).
    pub fn matches(&self, product: &Product) -> bool {
        if product.is_deleted() && !self.include_deleted {
            return false;
        }
        if self.status.is_some_and(|s| s != product.status) {
            return false;
        }
        if self.visibility.is_some_and(|v| v != product.visibility) {
            return false;
        }
        if let Some(brand) = &self.brand {
            if product.brand.as_deref() != Some(brand.as_str()) {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let in_title = product.title.to_lowercase().contains(&term);
            let in_description = product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chaise() -> NewProduct {
        NewProduct {
            title: "Chaise".to_string(),
            default_price: Decimal::from(50),
            currency: "EUR".to_string(),
            status: Some(ProductStatus::Draft),
            visibility: Some(Visibility::Public),
            ..NewProduct::default()
        }
    }

    fn product() -> Product {
        chaise()
            .into_product(ProductId::new(), TenantId::new(), Utc::now())
            .unwrap()
    }

    #[test]
    fn slug_is_derived_from_title_when_missing() {
        assert_eq!(product().slug, "chaise");

        let mut input = chaise();
        input.title = "Grande Table Ronde".to_string();
        input.slug = Some("   ".to_string());
        let p = input
            .into_product(ProductId::new(), TenantId::new(), Utc::now())
            .unwrap();
        assert_eq!(p.slug, "grande-table-ronde");
    }

    #[test]
    fn explicit_slug_is_kept() {
        let mut input = chaise();
        input.slug = Some("ma-chaise".to_string());
        let p = input
            .into_product(ProductId::new(), TenantId::new(), Utc::now())
            .unwrap();
        assert_eq!(p.slug, "ma-chaise");
    }

    #[test]
    fn create_rejects_negative_price_and_bad_currency() {
        let mut input = chaise();
        input.default_price = Decimal::new(-100, 2);
        assert!(matches!(input.validate(), Err(DomainError::Validation(_))));

        let mut input = chaise();
        input.currency = "EURO".to_string();
        assert!(matches!(input.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn create_accepts_zero_price() {
        let mut input = chaise();
        input.default_price = Decimal::ZERO;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn create_defaults_status_and_visibility() {
        let mut input = chaise();
        input.status = None;
        input.visibility = None;
        let p = input
            .into_product(ProductId::new(), TenantId::new(), Utc::now())
            .unwrap();
        assert_eq!(p.status, ProductStatus::Draft);
        assert_eq!(p.visibility, Visibility::Public);
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut p = product();
        p.description = Some("en bois".to_string());
        let before = p.clone();

        let patch = ProductPatch {
            default_price: Some(Decimal::ZERO),
            ..ProductPatch::default()
        };
        patch.apply_to(&mut p, Utc::now());

        assert_eq!(p.default_price, Decimal::ZERO);
        assert_eq!(p.title, before.title);
        assert_eq!(p.description, before.description);
    }

    #[test]
    fn patch_can_clear_nullable_fields() {
        let mut p = product();
        p.description = Some("en bois".to_string());

        let patch = ProductPatch {
            description: Some(None),
            ..ProductPatch::default()
        };
        patch.apply_to(&mut p, Utc::now());
        assert_eq!(p.description, None);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(ProductPatch::default().is_empty());
        let patch = ProductPatch {
            track_stock: Some(false),
            ..ProductPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn status_and_visibility_parse_wire_values() {
        assert_eq!("publie".parse::<ProductStatus>().unwrap(), ProductStatus::Published);
        assert_eq!("privee".parse::<Visibility>().unwrap(), Visibility::Private);
        assert!("published".parse::<ProductStatus>().is_err());
        assert_eq!(
            serde_json::to_value(ProductStatus::Archived).unwrap(),
            serde_json::json!("archive")
        );
    }

    #[test]
    fn filter_pagination_defaults_and_caps() {
        let f = ProductFilter::default();
        assert_eq!((f.page(), f.limit(), f.offset()), (1, 20, 0));

        let f = ProductFilter {
            page: Some(3),
            limit: Some(500),
            ..ProductFilter::default()
        };
        assert_eq!((f.page(), f.limit(), f.offset()), (3, 100, 200));
    }

    #[test]
    fn filter_hides_deleted_unless_asked() {
        let mut p = product();
        p.deleted_at = Some(Utc::now());

        assert!(!ProductFilter::default().matches(&p));
        let f = ProductFilter {
            include_deleted: true,
            ..ProductFilter::default()
        };
        assert!(f.matches(&p));
    }

    #[test]
    fn filter_search_is_case_insensitive_on_title_and_description() {
        let mut p = product();
        p.description = Some("Assise en Velours".to_string());

        let by_title = ProductFilter {
            search: Some("CHAI".to_string()),
            ..ProductFilter::default()
        };
        let by_description = ProductFilter {
            search: Some("velours".to_string()),
            ..ProductFilter::default()
        };
        let miss = ProductFilter {
            search: Some("table".to_string()),
            ..ProductFilter::default()
        };
        assert!(by_title.matches(&p));
        assert!(by_description.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn filter_brand_is_exact() {
        let mut p = product();
        p.brand = Some("Ikea".to_string());
        let f = ProductFilter {
            brand: Some("ikea".to_string()),
            ..ProductFilter::default()
        };
        assert!(!f.matches(&p));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: derived slugs carry no spaces or uppercase ASCII.
            #[test]
            fn slug_has_no_spaces_or_uppercase(title in "[A-Za-z][A-Za-z0-9 ]{0,80}") {
                let slug = slugify(&title);
                prop_assert!(!slug.contains(' '));
                prop_assert!(!slug.chars().any(|c| c.is_ascii_uppercase()));
            }

            /// Property: offset always lands on a page boundary within the cap.
            #[test]
            fn offset_is_page_aligned(page in 0u32..10_000, limit in 0u32..1_000) {
                let f = ProductFilter { page: Some(page), limit: Some(limit), ..ProductFilter::default() };
                prop_assert!(f.limit() >= 1 && f.limit() <= MAX_PAGE_LIMIT);
                prop_assert_eq!(f.offset() % u64::from(f.limit()), 0);
            }
        }
    }
}

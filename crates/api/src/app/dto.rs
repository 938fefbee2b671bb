use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use vitrine_catalog::{
    NewOption, NewOptionValue, NewProduct, NewVariant, OptionPatch, OptionValue,
    OptionValuePatch, OptionWithValues, Product, ProductFilter, ProductOption, ProductPatch,
    ProductStatus, VariantPatch, VariantView, Visibility,
};
use vitrine_core::OptionValueId;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub titre: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub statut: Option<ProductStatus>,
    pub prix_defaut: Decimal,
    pub devise: String,
    pub sku: Option<String>,
    #[serde(default)]
    pub suivi_stock: bool,
    #[serde(default)]
    pub quantite_stock: i64,
    pub poids: Option<Decimal>,
    pub dimensions: Option<String>,
    pub marque: Option<String>,
    pub classe_taxe: Option<String>,
    pub visibilite: Option<Visibility>,
    pub date_publication: Option<DateTime<Utc>>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(body: CreateProductRequest) -> Self {
        NewProduct {
            title: body.titre,
            description: body.description,
            slug: body.slug,
            status: body.statut,
            default_price: body.prix_defaut,
            currency: body.devise,
            sku: body.sku,
            track_stock: body.suivi_stock,
            stock_quantity: body.quantite_stock,
            weight: body.poids,
            dimensions: body.dimensions,
            brand: body.marque,
            tax_class: body.classe_taxe,
            visibility: body.visibilite,
            publish_date: body.date_publication,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub titre: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub slug: Option<String>,
    pub statut: Option<ProductStatus>,
    pub prix_defaut: Option<Decimal>,
    pub devise: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub sku: Option<Option<String>>,
    pub suivi_stock: Option<bool>,
    pub quantite_stock: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub poids: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub dimensions: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub marque: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub classe_taxe: Option<Option<String>>,
    pub visibilite: Option<Visibility>,
    #[serde(default, deserialize_with = "nullable")]
    pub date_publication: Option<Option<DateTime<Utc>>>,
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(body: UpdateProductRequest) -> Self {
        ProductPatch {
            title: body.titre,
            description: body.description,
            slug: body.slug,
            status: body.statut,
            default_price: body.prix_defaut,
            currency: body.devise,
            sku: body.sku,
            track_stock: body.suivi_stock,
            stock_quantity: body.quantite_stock,
            weight: body.poids,
            dimensions: body.dimensions,
            brand: body.marque,
            tax_class: body.classe_taxe,
            visibility: body.visibilite,
            publish_date: body.date_publication,
        }
    }
}

/// Query string of `GET /produits/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchProductsQuery {
    pub statut: Option<ProductStatus>,
    pub visibilite: Option<Visibility>,
    pub marque: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub inclure_supprime: bool,
}

impl From<SearchProductsQuery> for ProductFilter {
    fn from(query: SearchProductsQuery) -> Self {
        ProductFilter {
            status: query.statut,
            visibility: query.visibilite,
            brand: query.marque,
            search: query.search,
            page: query.page,
            limit: query.limit,
            include_deleted: query.inclure_supprime,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOptionRequest {
    pub nom: String,
    pub position: Option<u32>,
}

impl From<CreateOptionRequest> for NewOption {
    fn from(body: CreateOptionRequest) -> Self {
        NewOption {
            name: body.nom,
            position: body.position,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOptionRequest {
    pub nom: Option<String>,
    pub position: Option<u32>,
}

impl From<UpdateOptionRequest> for OptionPatch {
    fn from(body: UpdateOptionRequest) -> Self {
        OptionPatch {
            name: body.nom,
            position: body.position,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOptionValueRequest {
    pub valeur: String,
    pub position: Option<u32>,
}

impl From<CreateOptionValueRequest> for NewOptionValue {
    fn from(body: CreateOptionValueRequest) -> Self {
        NewOptionValue {
            value: body.valeur,
            position: body.position,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOptionValueRequest {
    pub valeur: Option<String>,
    pub position: Option<u32>,
}

impl From<UpdateOptionValueRequest> for OptionValuePatch {
    fn from(body: UpdateOptionValueRequest) -> Self {
        OptionValuePatch {
            value: body.valeur,
            position: body.position,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateVariantRequest {
    pub sku: String,
    pub prix: Option<Decimal>,
    #[serde(default)]
    pub quantite_stock: i64,
    pub code_barres: Option<String>,
    pub poids: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub valeur_option_ids: Vec<OptionValueId>,
}

impl From<CreateVariantRequest> for NewVariant {
    fn from(body: CreateVariantRequest) -> Self {
        NewVariant {
            sku: body.sku,
            price: body.prix,
            stock_quantity: body.quantite_stock,
            barcode: body.code_barres,
            weight: body.poids,
            images: body.images,
            option_value_ids: body.valeur_option_ids,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateVariantRequest {
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub prix: Option<Option<Decimal>>,
    pub quantite_stock: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub code_barres: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub poids: Option<Option<Decimal>>,
    pub images: Option<Vec<String>>,
    pub valeur_option_ids: Option<Vec<OptionValueId>>,
}

impl From<UpdateVariantRequest> for VariantPatch {
    fn from(body: UpdateVariantRequest) -> Self {
        VariantPatch {
            sku: body.sku,
            price: body.prix,
            stock_quantity: body.quantite_stock,
            barcode: body.code_barres,
            weight: body.poids,
            images: body.images,
            option_value_ids: body.valeur_option_ids,
        }
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(p: &Product) -> Value {
    json!({
        "id": p.id.to_string(),
        "boutique_id": p.tenant_id.to_string(),
        "titre": p.title,
        "description": p.description,
        "slug": p.slug,
        "statut": p.status.as_str(),
        "prix_defaut": p.default_price,
        "devise": p.currency,
        "sku": p.sku,
        "suivi_stock": p.track_stock,
        "quantite_stock": p.stock_quantity,
        "poids": p.weight,
        "dimensions": p.dimensions,
        "marque": p.brand,
        "classe_taxe": p.tax_class,
        "visibilite": p.visibility.as_str(),
        "date_publication": p.publish_date.map(|d| d.to_rfc3339()),
        "supprime_le": p.deleted_at.map(|d| d.to_rfc3339()),
        "cree_le": p.created_at.to_rfc3339(),
        "mis_a_jour_le": p.updated_at.to_rfc3339(),
    })
}

pub fn option_to_json(o: &ProductOption, values: &[OptionValue]) -> Value {
    json!({
        "id": o.id.to_string(),
        "produit_id": o.product_id.to_string(),
        "nom": o.name,
        "position": o.position,
        "valeurs": values.iter().map(value_to_json).collect::<Vec<_>>(),
        "cree_le": o.created_at.to_rfc3339(),
        "mis_a_jour_le": o.updated_at.to_rfc3339(),
    })
}

pub fn option_with_values_to_json(o: &OptionWithValues) -> Value {
    option_to_json(&o.option, &o.values)
}

pub fn value_to_json(v: &OptionValue) -> Value {
    json!({
        "id": v.id.to_string(),
        "option_id": v.option_id.to_string(),
        "valeur": v.value,
        "position": v.position,
    })
}

pub fn variant_to_json(view: &VariantView) -> Value {
    let v = &view.variant;
    json!({
        "id": v.id.to_string(),
        "produit_id": v.product_id.to_string(),
        "sku": v.sku,
        "prix": v.price,
        "prix_effectif": view.effective_price,
        "quantite_stock": v.stock_quantity,
        "code_barres": v.barcode,
        "poids": v.weight,
        "images": v.images,
        "valeur_option_ids": v.combination.ids().map(|id| id.to_string()).collect::<Vec<_>>(),
        "valeurs_options": view.option_values.iter().map(value_to_json).collect::<Vec<_>>(),
        "cree_le": v.created_at.to_rfc3339(),
        "mis_a_jour_le": v.updated_at.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_null_fields_are_distinguished() {
        let patch: ProductPatch =
            serde_json::from_str::<UpdateProductRequest>(r#"{"marque": null}"#)
                .unwrap()
                .into();
        assert_eq!(patch.brand, Some(None));
        assert_eq!(patch.description, None);
        assert!(patch.title.is_none());
    }

    #[test]
    fn create_product_defaults_optional_fields() {
        let input: NewProduct = serde_json::from_str::<CreateProductRequest>(
            r#"{"titre": "Chaise", "prix_defaut": 50, "devise": "EUR"}"#,
        )
        .unwrap()
        .into();
        assert_eq!(input.title, "Chaise");
        assert_eq!(input.default_price, Decimal::from(50));
        assert!(!input.track_stock);
        assert_eq!(input.stock_quantity, 0);
        assert_eq!(input.status, None);
    }

    #[test]
    fn french_enum_names_are_accepted() {
        let query: SearchProductsQuery =
            serde_json::from_str(r#"{"statut": "publie", "visibilite": "privee"}"#).unwrap();
        let filter = ProductFilter::from(query);
        assert_eq!(filter.status, Some(ProductStatus::Published));
        assert_eq!(filter.visibility, Some(Visibility::Private));
        assert!(!filter.include_deleted);
    }

    #[test]
    fn variant_price_null_clears_override() {
        let patch: VariantPatch =
            serde_json::from_str::<UpdateVariantRequest>(r#"{"prix": null}"#)
                .unwrap()
                .into();
        assert_eq!(patch.price, Some(None));
        assert_eq!(patch.sku, None);
    }
}

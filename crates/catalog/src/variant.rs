use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use vitrine_core::{DomainError, DomainResult, Entity, OptionValueId, ProductId, VariantId};

use crate::combination::Combination;
use crate::option::OptionValue;
use crate::pricing::effective_price;
use crate::rules;

const SKU_MAX: usize = 100;

/// A purchasable combination of option values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    /// Price override; `None` falls back to the product default.
    pub price: Option<Decimal>,
    pub stock_quantity: i64,
    pub barcode: Option<String>,
    pub weight: Option<Decimal>,
    pub images: Vec<String>,
    pub combination: Combination,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Variant {
    type Id = VariantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A variant with its option values resolved, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDetails {
    pub variant: Variant,
    pub option_values: Vec<OptionValue>,
}

/// Read model handed to clients: details plus the resolved price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantView {
    pub variant: Variant,
    pub option_values: Vec<OptionValue>,
    pub effective_price: Decimal,
}

impl VariantView {
    pub fn resolve(details: VariantDetails, default_price: Decimal) -> Self {
        let effective_price = effective_price(details.variant.price, default_price);
        Self {
            variant: details.variant,
            option_values: details.option_values,
            effective_price,
        }
    }
}

fn validate_option_value_ids(ids: &[OptionValueId]) -> DomainResult<()> {
    if ids.is_empty() {
        return Err(DomainError::validation(
            "valeur_option_ids must contain at least one option value",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewVariant {
    pub sku: String,
    pub price: Option<Decimal>,
    pub stock_quantity: i64,
    pub barcode: Option<String>,
    pub weight: Option<Decimal>,
    pub images: Vec<String>,
    pub option_value_ids: Vec<OptionValueId>,
}

impl NewVariant {
    pub fn validate(&self) -> DomainResult<()> {
        rules::text("sku", &self.sku, SKU_MAX)?;
        if let Some(price) = self.price {
            rules::non_negative_decimal("prix", price)?;
        }
        rules::non_negative("quantite_stock", self.stock_quantity)?;
        rules::optional_text("code_barres", self.barcode.as_deref(), 100)?;
        if let Some(weight) = self.weight {
            rules::non_negative_decimal("poids", weight)?;
        }
        validate_option_value_ids(&self.option_value_ids)
    }

    pub fn combination(&self) -> Combination {
        Combination::from_ids(self.option_value_ids.iter().copied())
    }

    pub fn into_variant(
        self,
        id: VariantId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> DomainResult<Variant> {
        self.validate()?;
        let combination = self.combination();
        Ok(Variant {
            id,
            product_id,
            sku: self.sku.trim().to_string(),
            price: self.price,
            stock_quantity: self.stock_quantity,
            barcode: self.barcode,
            weight: self.weight,
            images: self.images,
            combination,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial variant update; nullable fields use `Option<Option<_>>`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariantPatch {
    pub sku: Option<String>,
    pub price: Option<Option<Decimal>>,
    pub stock_quantity: Option<i64>,
    pub barcode: Option<Option<String>>,
    pub weight: Option<Option<Decimal>>,
    pub images: Option<Vec<String>>,
    pub option_value_ids: Option<Vec<OptionValueId>>,
}

impl VariantPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(sku) = &self.sku {
            rules::text("sku", sku, SKU_MAX)?;
        }
        if let Some(Some(price)) = self.price {
            rules::non_negative_decimal("prix", price)?;
        }
        if let Some(quantity) = self.stock_quantity {
            rules::non_negative("quantite_stock", quantity)?;
        }
        if let Some(Some(barcode)) = &self.barcode {
            rules::optional_text("code_barres", Some(barcode), 100)?;
        }
        if let Some(Some(weight)) = self.weight {
            rules::non_negative_decimal("poids", weight)?;
        }
        if let Some(ids) = &self.option_value_ids {
            validate_option_value_ids(ids)?;
        }
        Ok(())
    }

    /// New combination, when the patch replaces it.
    pub fn combination(&self) -> Option<Combination> {
        self.option_value_ids
            .as_ref()
            .map(|ids| Combination::from_ids(ids.iter().copied()))
    }

    pub fn apply_to(&self, variant: &mut Variant, now: DateTime<Utc>) {
        if let Some(v) = &self.sku {
            variant.sku = v.trim().to_string();
        }
        if let Some(v) = self.price {
            variant.price = v;
        }
        if let Some(v) = self.stock_quantity {
            variant.stock_quantity = v;
        }
        if let Some(v) = &self.barcode {
            variant.barcode = v.clone();
        }
        if let Some(v) = self.weight {
            variant.weight = v;
        }
        if let Some(v) = &self.images {
            variant.images = v.clone();
        }
        if let Some(c) = self.combination() {
            variant.combination = c;
        }
        variant.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_variant(ids: Vec<OptionValueId>) -> NewVariant {
        NewVariant {
            sku: "CH-R".to_string(),
            option_value_ids: ids,
            ..NewVariant::default()
        }
    }

    fn variant() -> Variant {
        new_variant(vec![OptionValueId::new()])
            .into_variant(VariantId::new(), ProductId::new(), Utc::now())
            .unwrap()
    }

    #[test]
    fn empty_combination_is_rejected() {
        let err = new_variant(vec![]).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let mut input = new_variant(vec![OptionValueId::new()]);
        input.price = Some(Decimal::new(-1, 0));
        assert!(input.validate().is_err());

        let mut input = new_variant(vec![OptionValueId::new()]);
        input.stock_quantity = -3;
        assert!(input.validate().is_err());
    }

    #[test]
    fn view_uses_default_price_without_override() {
        let details = VariantDetails {
            variant: variant(),
            option_values: vec![],
        };
        let view = VariantView::resolve(details, Decimal::from(50));
        assert_eq!(view.effective_price, Decimal::from(50));
    }

    #[test]
    fn patch_can_clear_price_override() {
        let mut v = variant();
        v.price = Some(Decimal::from(15));

        VariantPatch {
            price: Some(None),
            ..VariantPatch::default()
        }
        .apply_to(&mut v, Utc::now());

        assert_eq!(v.price, None);
        assert_eq!(v.sku, "CH-R");
    }

    #[test]
    fn patch_with_empty_combination_is_invalid() {
        let patch = VariantPatch {
            option_value_ids: Some(vec![]),
            ..VariantPatch::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn patch_replaces_combination() {
        let mut v = variant();
        let replacement = vec![OptionValueId::new(), OptionValueId::new()];
        VariantPatch {
            option_value_ids: Some(replacement.clone()),
            ..VariantPatch::default()
        }
        .apply_to(&mut v, Utc::now());
        assert_eq!(v.combination, Combination::from_ids(replacement));
    }
}

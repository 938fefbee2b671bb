//! Product options ("Couleur", "Taille") and their values ("Rouge", "L").

use chrono::{DateTime, Utc};

use vitrine_core::{DomainResult, Entity, OptionId, OptionValueId, ProductId};

use crate::rules;

const NAME_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductOption {
    pub id: OptionId,
    pub product_id: ProductId,
    pub name: String,
    pub position: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ProductOption {
    type Id = OptionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionValue {
    pub id: OptionValueId,
    pub option_id: OptionId,
    pub value: String,
    pub position: u32,
}

impl Entity for OptionValue {
    type Id = OptionValueId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// An option together with its values, ordered by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionWithValues {
    pub option: ProductOption,
    pub values: Vec<OptionValue>,
}

/// Position to store for a new option or value.
///
/// A missing or zero position appends after the `existing` siblings.
pub fn resolve_position(requested: Option<u32>, existing: usize) -> u32 {
    match requested {
        Some(p) if p > 0 => p,
        _ => u32::try_from(existing).unwrap_or(u32::MAX - 1) + 1,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewOption {
    pub name: String,
    pub position: Option<u32>,
}

impl NewOption {
    pub fn validate(&self) -> DomainResult<()> {
        rules::text("nom", &self.name, NAME_MAX)
    }

    pub fn into_option(
        self,
        id: OptionId,
        product_id: ProductId,
        existing: usize,
        now: DateTime<Utc>,
    ) -> DomainResult<ProductOption> {
        self.validate()?;
        Ok(ProductOption {
            id,
            product_id,
            name: self.name.trim().to_string(),
            position: resolve_position(self.position, existing),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionPatch {
    pub name: Option<String>,
    pub position: Option<u32>,
}

impl OptionPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            rules::text("nom", name, NAME_MAX)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, option: &mut ProductOption, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            option.name = name.trim().to_string();
        }
        if let Some(position) = self.position {
            option.position = position;
        }
        option.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewOptionValue {
    pub value: String,
    pub position: Option<u32>,
}

impl NewOptionValue {
    pub fn validate(&self) -> DomainResult<()> {
        rules::text("valeur", &self.value, NAME_MAX)
    }

    pub fn into_value(
        self,
        id: OptionValueId,
        option_id: OptionId,
        existing: usize,
    ) -> DomainResult<OptionValue> {
        self.validate()?;
        Ok(OptionValue {
            id,
            option_id,
            value: self.value.trim().to_string(),
            position: resolve_position(self.position, existing),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionValuePatch {
    pub value: Option<String>,
    pub position: Option<u32>,
}

impl OptionValuePatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(value) = &self.value {
            rules::text("valeur", value, NAME_MAX)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, value: &mut OptionValue) {
        if let Some(v) = &self.value {
            value.value = v.trim().to_string();
        }
        if let Some(position) = self.position {
            value.position = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::DomainError;

    #[test]
    fn position_appends_when_missing_or_zero() {
        assert_eq!(resolve_position(None, 0), 1);
        assert_eq!(resolve_position(Some(0), 2), 3);
        assert_eq!(resolve_position(Some(7), 2), 7);
    }

    #[test]
    fn option_name_is_required_and_bounded() {
        let blank = NewOption {
            name: " ".to_string(),
            position: None,
        };
        assert!(matches!(blank.validate(), Err(DomainError::Validation(_))));

        let long = NewOption {
            name: "x".repeat(101),
            position: None,
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn new_option_gets_next_position() {
        let option = NewOption {
            name: "Couleur".to_string(),
            position: None,
        }
        .into_option(OptionId::new(), ProductId::new(), 0, Utc::now())
        .unwrap();
        assert_eq!(option.position, 1);
        assert_eq!(option.name, "Couleur");
    }

    #[test]
    fn value_patch_keeps_unsupplied_fields() {
        let mut value = NewOptionValue {
            value: "Rouge".to_string(),
            position: Some(4),
        }
        .into_value(OptionValueId::new(), OptionId::new(), 0)
        .unwrap();

        OptionValuePatch {
            value: Some("Bordeaux".to_string()),
            position: None,
        }
        .apply_to(&mut value);

        assert_eq!(value.value, "Bordeaux");
        assert_eq!(value.position, 4);
    }

    #[test]
    fn patch_allows_explicit_zero_position() {
        let mut option = NewOption {
            name: "Taille".to_string(),
            position: Some(2),
        }
        .into_option(OptionId::new(), ProductId::new(), 0, Utc::now())
        .unwrap();

        OptionPatch {
            name: None,
            position: Some(0),
        }
        .apply_to(&mut option, Utc::now());
        assert_eq!(option.position, 0);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: appending one sibling at a time yields 1, 2, 3, ...
            #[test]
            fn sequential_appends_are_strictly_increasing(n in 1usize..50) {
                let positions: Vec<u32> = (0..n).map(|existing| resolve_position(None, existing)).collect();
                prop_assert_eq!(positions[0], 1);
                for pair in positions.windows(2) {
                    prop_assert_eq!(pair[1], pair[0] + 1);
                }
            }
        }
    }
}

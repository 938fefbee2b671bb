//! Option-value combinations: the identity of a variant within its product.
//!
//! A combination is a *set*: `{Rouge, L}` and `{L, Rouge}` are the same
//! combination, while `{Rouge}` and `{Rouge, L}` are different ones.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use vitrine_core::{OptionValueId, ValueObject, VariantId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Combination(BTreeSet<OptionValueId>);

impl ValueObject for Combination {}

impl Combination {
    /// Build from raw ids; duplicates collapse.
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = OptionValueId>,
    {
        Self(ids.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &OptionValueId) -> bool {
        self.0.contains(id)
    }

    /// Ids in canonical (sorted) order.
    pub fn ids(&self) -> impl Iterator<Item = &OptionValueId> + '_ {
        self.0.iter()
    }

    /// True when `self` covers exactly the same ids as `candidate`:
    /// same cardinality and every one of `self`'s ids present in `candidate`.
    pub fn matches_exactly(&self, candidate: &Combination) -> bool {
        self.len() == candidate.len() && self.ids().all(|id| candidate.contains(id))
    }

    /// Deterministic key for store-level uniqueness: SHA-256 (hex) of the
    /// sorted ids joined by `,`.
    pub fn canonical_key(&self) -> String {
        let joined = self
            .ids()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        hex::encode(Sha256::digest(joined.as_bytes()))
    }

    /// First existing variant (other than `exclude`) whose combination
    /// equals this one.
    pub fn find_duplicate<'a, I>(&self, existing: I, exclude: Option<VariantId>) -> Option<VariantId>
    where
        I: IntoIterator<Item = (VariantId, &'a Combination)>,
    {
        existing
            .into_iter()
            .filter(|(id, _)| Some(*id) != exclude)
            .find(|(_, combination)| combination.matches_exactly(self))
            .map(|(id, _)| id)
    }
}

impl FromIterator<OptionValueId> for Combination {
    fn from_iter<T: IntoIterator<Item = OptionValueId>>(iter: T) -> Self {
        Self::from_ids(iter)
    }
}

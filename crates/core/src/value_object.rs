//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are domain objects that are **immutable** and **compared by value**.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same ID are the same entity)
///
/// Example:
/// - a variant's option-value combination `{Rouge, L}` is a value object: `{L, Rouge}`
///   is the same combination
/// - a `Variant { id: VariantId(...), sku: "..." }` is an entity
///
/// ## Design Constraints
///
/// The trait requires:
/// - **Clone**: Value objects are plain values
/// - **PartialEq**: Value objects are compared by their attribute values
/// - **Debug**: Value objects show up in logs and test failures
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

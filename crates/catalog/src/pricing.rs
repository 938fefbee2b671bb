//! Effective price resolution.

use rust_decimal::Decimal;

/// Price actually charged for a variant.
///
/// The override wins whenever it is present, including an override of zero.
pub fn effective_price(override_price: Option<Decimal>, default_price: Decimal) -> Decimal {
    match override_price {
        Some(price) => price,
        None => default_price,
    }
}

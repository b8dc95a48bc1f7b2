use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::CatalogItem;
use crate::errors::DomainError;

/// Half-up rounding to two decimal places, applied wherever money is
/// derived so independently computed totals never drift apart.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    pub margin_amount: Decimal,
    pub total_price: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

pub fn price_line(base_price: Decimal, margin: u8) -> LinePricing {
    let margin_amount = round2(base_price * Decimal::from(margin) / Decimal::ONE_HUNDRED);
    LinePricing { margin_amount, total_price: base_price + margin_amount }
}

/// Prices one line against a catalog item, enforcing the item's margin
/// bounds as configured at quoting time.
pub fn price_line_for_item(item: &CatalogItem, margin: u8) -> Result<LinePricing, DomainError> {
    if !item.margins.contains(margin) {
        return Err(DomainError::validation(
            "margin",
            format!(
                "margin {margin} for item `{}` is outside allowed range [{}, {}]",
                item.name, item.margins.min, item.margins.max
            ),
        ));
    }
    Ok(price_line(item.base_price, margin))
}

pub fn aggregate(line_totals: &[Decimal], tax_rate: Decimal) -> Result<QuoteTotals, DomainError> {
    if line_totals.is_empty() {
        return Err(DomainError::validation("line_items", "a quote needs at least one line item"));
    }
    let subtotal: Decimal = line_totals.iter().copied().sum();
    let tax = round2(subtotal * tax_rate);
    Ok(QuoteTotals { subtotal, tax, total: subtotal + tax })
}

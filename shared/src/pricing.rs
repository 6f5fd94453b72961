//! Temperature-based dynamic pricing.
//!
//! A room's base price is surcharged by how far the day's temperature sits
//! from the comfort target. The tier table is a compile-time constant; only
//! the target can differ between engines.
//!
//! Tier boundaries are half-open: a difference of exactly 5 degrees falls in
//! the `[5, 10)` tier and is charged 20%, not 10%.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// Temperature (°C) at which no surcharge applies.
pub const DEFAULT_COMFORT_TARGET: Decimal = dec!(21);

/// One band of the surcharge table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurchargeTier {
    /// Inclusive lower bound of the absolute temperature difference.
    pub lower_bound: Decimal,
    /// Surcharge applied to the base price, in whole percent.
    pub percentage: u32,
}

/// Surcharge tiers ordered by `lower_bound`. Each tier runs up to, but not
/// including, the next tier's lower bound; the last tier is unbounded.
pub const SURCHARGE_TIERS: &[SurchargeTier] = &[
    SurchargeTier { lower_bound: dec!(0), percentage: 0 },
    SurchargeTier { lower_bound: dec!(2), percentage: 10 },
    SurchargeTier { lower_bound: dec!(5), percentage: 20 },
    SurchargeTier { lower_bound: dec!(10), percentage: 30 },
    SurchargeTier { lower_bound: dec!(20), percentage: 50 },
];

/// Pricing input errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// A float input was NaN, infinite, or outside the decimal range.
    #[error("Invalid pricing input: {field} must be a finite number (got {value})")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Full price breakdown for one pricing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub base_price: Decimal,
    pub temperature: Decimal,
    /// Absolute distance from the comfort target, rounded to 1 decimal place.
    pub difference: Decimal,
    pub charge_percentage: u32,
    pub additional_charge: Decimal,
    pub total_price: Decimal,
}

/// Round half-up (away from zero) to the given number of decimal places.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use shared::pricing::round_money;
///
/// assert_eq!(round_money(dec!(9.999), 2), dec!(10.00));
/// assert_eq!(round_money(dec!(2.345), 2), dec!(2.35));
/// assert_eq!(round_money(dec!(-2.345), 2), dec!(-2.35));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a float into a `Decimal`, rejecting non-finite or out-of-range values.
pub fn decimal_from_f64(field: &'static str, value: f64) -> Result<Decimal, PricingError> {
    if !value.is_finite() {
        return Err(PricingError::InvalidInput { field, value });
    }
    Decimal::from_f64(value).ok_or(PricingError::InvalidInput { field, value })
}

/// Stateless pricing engine closed over an immutable tier table.
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine {
    target: Decimal,
    tiers: &'static [SurchargeTier],
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingEngine {
    /// Engine targeting the default 21°C comfort temperature.
    pub const fn new() -> Self {
        Self::with_target(DEFAULT_COMFORT_TARGET)
    }

    /// Engine targeting a custom comfort temperature.
    pub const fn with_target(target: Decimal) -> Self {
        Self {
            target,
            tiers: SURCHARGE_TIERS,
        }
    }

    pub fn target(&self) -> Decimal {
        self.target
    }

    /// Surcharge percentage for an absolute temperature difference.
    pub fn surcharge_percentage(&self, difference: Decimal) -> u32 {
        self.tiers
            .iter()
            .rev()
            .find(|tier| difference >= tier.lower_bound)
            .map(|tier| tier.percentage)
            .unwrap_or(0)
    }

    /// Quote a base price at the given temperature.
    ///
    /// Total over all decimal inputs. Negative base prices yield negative
    /// charges, which callers are expected to have rejected already.
    /// Arithmetic saturates at the decimal range instead of overflowing.
    pub fn quote(&self, base_price: Decimal, temperature: Decimal) -> PriceQuote {
        let difference = temperature.saturating_sub(self.target).abs();
        let charge_percentage = self.surcharge_percentage(difference);

        let additional_charge = round_money(
            base_price.saturating_mul(Decimal::from(charge_percentage)) / Decimal::ONE_HUNDRED,
            2,
        );
        let total_price = round_money(base_price.saturating_add(additional_charge), 2);

        PriceQuote {
            base_price,
            temperature,
            difference: round_money(difference, 1),
            charge_percentage,
            additional_charge,
            total_price,
        }
    }

    /// Quote from float inputs, as read from loosely-typed sources.
    pub fn quote_f64(&self, base_price: f64, temperature: f64) -> Result<PriceQuote, PricingError> {
        let base_price = decimal_from_f64("base_price", base_price)?;
        let temperature = decimal_from_f64("temperature", temperature)?;
        Ok(self.quote(base_price, temperature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PricingEngine {
        PricingEngine::new()
    }

    /// Differences 0.0, 0.1, ..., 30.0
    fn difference_grid() -> impl Iterator<Item = Decimal> {
        (0..=300).map(|tenths| Decimal::new(tenths, 1))
    }

    // ==================== tier table ====================

    #[test]
    fn test_tier_table_is_strictly_increasing() {
        for pair in SURCHARGE_TIERS.windows(2) {
            assert!(pair[0].lower_bound < pair[1].lower_bound);
            assert!(pair[0].percentage < pair[1].percentage);
        }
        assert_eq!(SURCHARGE_TIERS[0].lower_bound, Decimal::ZERO);
    }

    #[test]
    fn test_exactly_one_tier_contains_each_difference() {
        for difference in difference_grid() {
            let containing = SURCHARGE_TIERS
                .iter()
                .enumerate()
                .filter(|(i, tier)| {
                    let below_next = SURCHARGE_TIERS
                        .get(i + 1)
                        .map(|next| difference < next.lower_bound)
                        .unwrap_or(true);
                    difference >= tier.lower_bound && below_next
                })
                .count();
            assert_eq!(containing, 1, "difference {} matched {} tiers", difference, containing);
        }
    }

    #[test]
    fn test_percentage_is_monotonic_in_difference() {
        let mut previous = 0;
        for difference in difference_grid() {
            let pct = engine().surcharge_percentage(difference);
            assert!(pct >= previous, "percentage dropped at difference {}", difference);
            previous = pct;
        }
    }

    // ==================== boundaries ====================

    #[test]
    fn test_boundaries_belong_to_the_upper_tier() {
        let e = engine();
        assert_eq!(e.surcharge_percentage(dec!(0)), 0);
        assert_eq!(e.surcharge_percentage(dec!(1.999)), 0);
        assert_eq!(e.surcharge_percentage(dec!(2.0)), 10);
        assert_eq!(e.surcharge_percentage(dec!(4.999)), 10);
        assert_eq!(e.surcharge_percentage(dec!(5.0)), 20);
        assert_eq!(e.surcharge_percentage(dec!(9.999)), 20);
        assert_eq!(e.surcharge_percentage(dec!(10.0)), 30);
        assert_eq!(e.surcharge_percentage(dec!(19.999)), 30);
        assert_eq!(e.surcharge_percentage(dec!(20.0)), 50);
        assert_eq!(e.surcharge_percentage(dec!(1000)), 50);
    }

    #[test]
    fn test_tier_selection_uses_unrounded_difference() {
        // 1.96 displays as 2.0 but is still below the 10% tier
        let quote = engine().quote(dec!(100), dec!(22.96));
        assert_eq!(quote.difference, dec!(2.0));
        assert_eq!(quote.charge_percentage, 0);
        assert_eq!(quote.total_price, dec!(100));
    }

    // ==================== scenarios ====================

    #[test]
    fn test_quote_at_target_has_no_surcharge() {
        let quote = engine().quote(dec!(100), dec!(21));
        assert_eq!(quote.difference, dec!(0));
        assert_eq!(quote.charge_percentage, 0);
        assert_eq!(quote.additional_charge, dec!(0));
        assert_eq!(quote.total_price, dec!(100));
    }

    #[test]
    fn test_quote_five_degrees_below_target() {
        let quote = engine().quote(dec!(100), dec!(16));
        assert_eq!(quote.difference, dec!(5.0));
        assert_eq!(quote.charge_percentage, 20);
        assert_eq!(quote.additional_charge, dec!(20.00));
        assert_eq!(quote.total_price, dec!(120.00));
    }

    #[test]
    fn test_quote_twenty_degrees_above_target() {
        let quote = engine().quote(dec!(250), dec!(41));
        assert_eq!(quote.difference, dec!(20.0));
        assert_eq!(quote.charge_percentage, 50);
        assert_eq!(quote.additional_charge, dec!(125.00));
        assert_eq!(quote.total_price, dec!(375.00));
    }

    #[test]
    fn test_quote_freezing() {
        let quote = engine().quote(dec!(500), dec!(0));
        assert_eq!(quote.difference, dec!(21.0));
        assert_eq!(quote.charge_percentage, 50);
        assert_eq!(quote.additional_charge, dec!(250.00));
        assert_eq!(quote.total_price, dec!(750.00));
    }

    #[test]
    fn test_quote_rounds_half_up_to_cents() {
        // 99.99 * 10% = 9.999
        let quote = engine().quote(dec!(99.99), dec!(24));
        assert_eq!(quote.charge_percentage, 10);
        assert_eq!(quote.additional_charge, dec!(10.00));
        assert_eq!(quote.total_price, dec!(109.99));

        // 0.05 * 10% = 0.005, exactly halfway
        let quote = engine().quote(dec!(0.05), dec!(24));
        assert_eq!(quote.additional_charge, dec!(0.01));
    }

    #[test]
    fn test_quote_difference_rounded_to_one_place() {
        let quote = engine().quote(dec!(100), dec!(24.26));
        assert_eq!(quote.difference, dec!(3.3));
        assert_eq!(quote.temperature, dec!(24.26));
    }

    #[test]
    fn test_zero_difference_never_charges() {
        for base in [dec!(0), dec!(0.01), dec!(99.99), dec!(650), dec!(123456.78)] {
            let quote = engine().quote(base, DEFAULT_COMFORT_TARGET);
            assert_eq!(quote.additional_charge, Decimal::ZERO);
            assert_eq!(quote.total_price, round_money(base, 2));
        }
    }

    #[test]
    fn test_quote_is_symmetric_around_target() {
        let e = engine();
        for d in difference_grid() {
            let above = e.quote(dec!(180), e.target() + d);
            let below = e.quote(dec!(180), e.target() - d);
            assert_eq!(above.difference, below.difference);
            assert_eq!(above.charge_percentage, below.charge_percentage);
            assert_eq!(above.additional_charge, below.additional_charge);
            assert_eq!(above.total_price, below.total_price);
        }
    }

    #[test]
    fn test_zero_base_price() {
        let quote = engine().quote(dec!(0), dec!(-30));
        assert_eq!(quote.charge_percentage, 50);
        assert_eq!(quote.additional_charge, dec!(0));
        assert_eq!(quote.total_price, dec!(0));
    }

    #[test]
    fn test_negative_base_price_is_computed_not_rejected() {
        let quote = engine().quote(dec!(-100), dec!(16));
        assert_eq!(quote.additional_charge, dec!(-20.00));
        assert_eq!(quote.total_price, dec!(-120.00));
    }

    #[test]
    fn test_extreme_temperatures() {
        let quote = engine().quote(dec!(90), dec!(-273.15));
        assert_eq!(quote.charge_percentage, 50);
        assert_eq!(quote.total_price, dec!(135.00));

        let quote = engine().quote(dec!(90), dec!(1000000));
        assert_eq!(quote.charge_percentage, 50);
    }

    #[test]
    fn test_custom_target() {
        let e = PricingEngine::with_target(dec!(18));
        assert_eq!(e.quote(dec!(100), dec!(18)).charge_percentage, 0);
        assert_eq!(e.quote(dec!(100), dec!(21)).charge_percentage, 10);
    }

    // ==================== float boundary ====================

    #[test]
    fn test_quote_f64_matches_decimal_quote() {
        let quote = engine().quote_f64(100.0, 16.0).unwrap();
        assert_eq!(quote, engine().quote(dec!(100), dec!(16)));
    }

    #[test]
    fn test_quote_f64_rejects_non_finite_input() {
        let e = engine();
        assert!(matches!(
            e.quote_f64(f64::NAN, 20.0),
            Err(PricingError::InvalidInput { field: "base_price", .. })
        ));
        assert!(matches!(
            e.quote_f64(100.0, f64::INFINITY),
            Err(PricingError::InvalidInput { field: "temperature", .. })
        ));
        assert!(matches!(
            e.quote_f64(100.0, f64::NEG_INFINITY),
            Err(PricingError::InvalidInput { field: "temperature", .. })
        ));
        assert!(matches!(
            e.quote_f64(1e300, 20.0),
            Err(PricingError::InvalidInput { field: "base_price", .. })
        ));
    }
}

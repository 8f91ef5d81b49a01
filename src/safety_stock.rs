//! Safety-Stock Engine (C6): service factor, safety-stock days/units,
//! derived order-point and order-up-to-level figures, and the
//! empirical post-period adjustment.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{SsType, Sku};
use crate::stats::inverse_normal_cdf;

/// Service-level goals are clamped to this range before being turned
/// into a z-score; below 50% the z-score would go negative, and the
/// domain never asks for literal 100% cover.
const SERVICE_LEVEL_MIN: Decimal = dec!(50);
const SERVICE_LEVEL_MAX: Decimal = dec!(99.99);

/// `z = Φ⁻¹(SLG/100)`, SLG clamped to `[50, 99.99]`.
pub fn service_factor(service_level_goal: Decimal) -> Decimal {
    let clamped = service_level_goal.clamp(SERVICE_LEVEL_MIN, SERVICE_LEVEL_MAX);
    let p = (clamped / dec!(100)).to_f64().unwrap_or(0.95);
    let z = inverse_normal_cdf(p);
    Decimal::from_f64(z).unwrap_or(dec!(1.645))
}

/// Safety stock in days of demand: `z * sqrt(E*sigma_d^2 + sigma_lt)`,
/// over the effective replenishment window `E = lead_time +
/// order_cycle/2`. `sigma_d` is a dimensionless per-day demand sigma
/// derived straight from MADP (forecast-independent); `sigma_lt` is
/// the lead-time sigma in days and enters the sum unsquared.
pub fn safety_stock_days(
    service_level_goal: Decimal,
    madp: Decimal,
    lead_time_days: Decimal,
    lead_time_variance_pct: Decimal,
    order_cycle_days: Decimal,
) -> Decimal {
    let z = service_factor(service_level_goal);
    let exposure = lead_time_days + order_cycle_days / dec!(2);
    let sigma_d = (madp / dec!(100)) * dec!(1.25);
    let sigma_lt = lead_time_days * (lead_time_variance_pct / dec!(100));

    let variance_term = exposure * sigma_d * sigma_d + sigma_lt;
    z * decimal_sqrt(variance_term)
}

/// Optional order-cycle attenuation: `max(0.5, min(1.0, 1 -
/// 0.1*log10(order_cycle)))`, reflecting the smaller marginal
/// protection value of safety stock as the order cycle grows. Not
/// applied unless the caller opts in — spec's own worked example
/// (Scenario 2) matches the unattenuated formula.
pub fn order_cycle_attenuation(order_cycle_days: Decimal) -> Decimal {
    if order_cycle_days <= Decimal::ZERO {
        return Decimal::ONE;
    }
    let cycle = order_cycle_days.to_f64().unwrap_or(1.0).max(f64::MIN_POSITIVE);
    let factor = 1.0 - 0.1 * cycle.log10();
    let clamped = factor.clamp(0.5, 1.0);
    Decimal::from_f64(clamped).unwrap_or(Decimal::ONE)
}

fn decimal_sqrt(value: Decimal) -> Decimal {
    let as_f64 = value.to_f64().unwrap_or(0.0).max(0.0);
    Decimal::from_f64(as_f64.sqrt()).unwrap_or(Decimal::ZERO)
}

/// Resolves the SKU's manual override against the computed
/// safety-stock days, per `ss_type`.
pub fn resolve_safety_stock_days(computed: Decimal, manual_override: Option<Decimal>, ss_type: SsType) -> Decimal {
    match (ss_type, manual_override) {
        (SsType::Never, _) | (_, None) => computed,
        (SsType::Always, Some(manual)) => manual,
        (SsType::LesserOf, Some(manual)) => computed.min(manual),
    }
}

/// Applies a multiplicative seasonal index and clamps to the
/// presentation minimum (in days-equivalent, already converted by the
/// caller), never letting safety stock go negative.
pub fn apply_presentation_floor(safety_stock_days: Decimal, min_presentation_days: Decimal) -> Decimal {
    safety_stock_days.max(min_presentation_days).max(Decimal::ZERO)
}

/// Derived order-point figures: item order point (safety stock + lead
/// time, in days and units), vendor order point (item order point
/// plus one full order cycle), and the order-up-to level (item order
/// point plus the effective order cycle), clamped by `outl_hard_max`
/// if set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderPoints {
    pub item_order_point_days: Decimal,
    pub item_order_point_units: Decimal,
    pub vendor_order_point_days: Decimal,
    pub order_up_to_level_days: Decimal,
    pub order_up_to_level_units: Decimal,
}

pub fn compute_order_points(
    safety_stock_days: Decimal,
    lead_time_days: Decimal,
    order_cycle_days: Decimal,
    effective_order_cycle_days: Decimal,
    daily_demand: Decimal,
    outl_hard_max: Option<Decimal>,
) -> OrderPoints {
    let item_order_point_days = safety_stock_days + lead_time_days;
    let item_order_point_units = item_order_point_days * daily_demand;
    let vendor_order_point_days = item_order_point_days + order_cycle_days;

    let mut order_up_to_level_days = item_order_point_days + effective_order_cycle_days;
    if let Some(max) = outl_hard_max {
        let max_days = if daily_demand > Decimal::ZERO { max / daily_demand } else { order_up_to_level_days };
        order_up_to_level_days = order_up_to_level_days.min(max_days);
    }
    let order_up_to_level_units = order_up_to_level_days * daily_demand;

    OrderPoints {
        item_order_point_days,
        item_order_point_units,
        vendor_order_point_days,
        order_up_to_level_days,
        order_up_to_level_units,
    }
}

/// Post-period empirical adjustment: `Δ = (goal - attained) / 100`,
/// clamped to `± max_adjustment_pct / 100`, applied multiplicatively.
pub fn empirical_adjustment(
    current_safety_stock_days: Decimal,
    service_level_goal: Decimal,
    service_level_attained: Decimal,
    max_adjustment_pct: Decimal,
) -> Decimal {
    let delta = ((service_level_goal - service_level_attained) / dec!(100)).clamp(-max_adjustment_pct, max_adjustment_pct);
    (current_safety_stock_days * (Decimal::ONE + delta)).max(Decimal::ZERO)
}

/// The order cycle effective for a SKU's order-up-to level:
/// `max(vendor.order_cycle, sku.item_cycle)`.
pub fn effective_order_cycle_days(vendor_order_cycle_days: Decimal, item_cycle_days: Option<u32>) -> Decimal {
    vendor_order_cycle_days.max(item_cycle_days.map(Decimal::from).unwrap_or(Decimal::ZERO))
}

/// Full recompute for one SKU, folding in its manual override and
/// presentation floor but not the empirical adjustment (run
/// separately after a period closes).
pub fn recompute_for_sku(sku: &Sku, vendor_order_cycle_days: Decimal) -> (Decimal, OrderPoints) {
    let computed = safety_stock_days(
        sku.service_level_goal,
        sku.madp,
        sku.lead_time_forecast_days,
        sku.lead_time_variance_pct,
        vendor_order_cycle_days,
    );
    let resolved = resolve_safety_stock_days(computed, sku.manual_safety_stock, sku.ss_type);
    let floored = apply_presentation_floor(resolved, sku.min_presentation_stock);
    let effective_cycle = effective_order_cycle_days(vendor_order_cycle_days, sku.item_cycle_days);
    let points = compute_order_points(
        floored,
        sku.lead_time_forecast_days,
        vendor_order_cycle_days,
        effective_cycle,
        sku.daily_demand(),
        sku.outl_hard_max,
    );
    (floored, points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_factor_at_95_percent_matches_known_z() {
        let z = service_factor(dec!(95));
        assert!((z - dec!(1.645)).abs() < dec!(0.01));
    }

    #[test]
    fn service_factor_clamps_out_of_range_goals() {
        let low = service_factor(dec!(10));
        let high = service_factor(dec!(999));
        assert!(low > Decimal::ZERO);
        assert!(high > Decimal::ZERO);
    }

    #[test]
    fn lesser_of_picks_the_smaller_value() {
        let resolved = resolve_safety_stock_days(dec!(10), Some(dec!(4)), SsType::LesserOf);
        assert_eq!(resolved, dec!(4));
    }

    #[test]
    fn always_uses_manual_override_regardless_of_computed() {
        let resolved = resolve_safety_stock_days(dec!(10), Some(dec!(4)), SsType::Always);
        assert_eq!(resolved, dec!(4));
    }

    #[test]
    fn empirical_adjustment_is_clamped() {
        let adjusted = empirical_adjustment(dec!(10), dec!(99), dec!(50), dec!(0.1));
        // raw delta would be 0.49, clamped to 0.1
        assert_eq!(adjusted, dec!(11.0));
    }

    #[test]
    fn order_points_respect_hard_max() {
        let points = compute_order_points(dec!(5), dec!(7), dec!(14), dec!(14), dec!(10), Some(dec!(100)));
        assert_eq!(points.order_up_to_level_units, dec!(100));
    }

    /// Scenario 2 from spec's worked examples: SLG=95, MADP=25,
    /// lead_time=7, lead_time_variance=10%, order_cycle=14 ⇒
    /// SS_days ≈ 2.365, within 1%.
    #[test]
    fn safety_stock_days_matches_worked_scenario_2() {
        let days = safety_stock_days(dec!(95), dec!(25), dec!(7), dec!(10), dec!(14));
        let expected = dec!(2.365);
        let tolerance = expected * dec!(0.01);
        assert!((days - expected).abs() <= tolerance, "got {days}, expected within 1% of {expected}");
    }

    #[test]
    fn safety_stock_days_with_zero_order_cycle_reduces_to_lead_time_only() {
        // Boundary behavior: effective order cycle = 0 should not divide
        // by zero or otherwise misbehave; E collapses to lead_time.
        let days = safety_stock_days(dec!(95), dec!(25), dec!(7), dec!(10), Decimal::ZERO);
        assert!(days > Decimal::ZERO);
    }

    #[test]
    fn order_cycle_attenuation_is_clamped_between_half_and_one() {
        assert_eq!(order_cycle_attenuation(Decimal::ZERO), Decimal::ONE);
        let atten = order_cycle_attenuation(dec!(14));
        assert!(atten > dec!(0.5) && atten < dec!(1.0));
        let long_cycle = order_cycle_attenuation(dec!(100_000));
        assert_eq!(long_cycle, dec!(0.5));
    }

    /// Scenario 3 from spec's worked examples: daily_demand=5,
    /// lead_time=7, SS_days=3, order_cycle=14 ⇒ OUTL_days=24,
    /// OUTL_units=120; available=60 ⇒ SOQ=60, rounds to 64 with
    /// buying_multiple=8 ⇒ SOQ_days=12.8.
    #[test]
    fn order_up_to_level_matches_worked_scenario_3() {
        let points = compute_order_points(dec!(3), dec!(7), dec!(14), dec!(14), dec!(5), None);
        assert_eq!(points.order_up_to_level_days, dec!(24));
        assert_eq!(points.order_up_to_level_units, dec!(120));

        let available = dec!(60);
        let raw_soq = points.order_up_to_level_units - available;
        assert_eq!(raw_soq, dec!(60));

        let buying_multiple = dec!(8);
        let rounded_soq = (raw_soq / buying_multiple).ceil() * buying_multiple;
        assert_eq!(rounded_soq, dec!(64));
        assert_eq!(rounded_soq / dec!(5), dec!(12.8));
    }

    #[test]
    fn effective_order_cycle_prefers_the_longer_of_vendor_and_item_cycle() {
        assert_eq!(effective_order_cycle_days(dec!(14), Some(21)), dec!(21));
        assert_eq!(effective_order_cycle_days(dec!(14), Some(7)), dec!(14));
        assert_eq!(effective_order_cycle_days(dec!(14), None), dec!(14));
    }
}

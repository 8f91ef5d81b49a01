//! Order Policy Analyzer (C8): evaluates candidate order cycles for a
//! vendor, closed-form EOQ, and the cost/discount tradeoffs between
//! cycle lengths.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::AsrConfig;
use crate::models::Vendor;

/// Candidate order-cycle lengths, in days, the analyzer scores.
pub const CANDIDATE_CYCLES: [u32; 11] = [1, 3, 7, 14, 21, 28, 35, 42, 56, 70, 84];

/// EOQ is clipped to this range regardless of what the closed form
/// computes, so a degenerate cost ratio never produces a one-day or
/// year-long cycle.
const EOQ_MIN_DAYS: Decimal = dec!(7);
const EOQ_MAX_DAYS: Decimal = dec!(90);

/// Economic order quantity in days, closed form:
/// `sqrt(2 * header_cost * 365 / (annual_demand_amount * carrying_cost_rate))`,
/// clipped to `[7, 90]`.
pub fn economic_order_cycle_days(annual_demand_amount: Decimal, header_cost: Decimal, carrying_cost_rate: Decimal) -> Decimal {
    if annual_demand_amount <= Decimal::ZERO || carrying_cost_rate <= Decimal::ZERO {
        return EOQ_MIN_DAYS;
    }
    let ratio = (dec!(2) * header_cost * dec!(365)) / (annual_demand_amount * carrying_cost_rate);
    let days = decimal_sqrt(ratio);
    days.clamp(EOQ_MIN_DAYS, EOQ_MAX_DAYS)
}

fn decimal_sqrt(value: Decimal) -> Decimal {
    let as_f64 = value.to_f64().unwrap_or(0.0).max(0.0);
    Decimal::from_f64(as_f64.sqrt()).unwrap_or(Decimal::ZERO)
}

/// Annual ordering + carrying cost for one candidate cycle: header
/// cost amortized over `365/cycle_days` orders a year, plus average
/// inventory (`cycle_demand / 2`) carried at `carrying_cost_rate`.
pub fn annual_cost(cycle_days: u32, annual_demand_amount: Decimal, header_cost: Decimal, carrying_cost_rate: Decimal) -> Decimal {
    let cycle = Decimal::from(cycle_days);
    let orders_per_year = dec!(365) / cycle;
    let ordering_cost = orders_per_year * header_cost;
    let cycle_demand = annual_demand_amount * cycle / dec!(365);
    let carrying_cost = (cycle_demand / dec!(2)) * carrying_cost_rate;
    ordering_cost + carrying_cost
}

/// One candidate cycle's evaluated economics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleEvaluation {
    pub cycle_days: u32,
    pub annual_cost: Decimal,
    pub discount_percentage: Decimal,
    pub net_annual_cost: Decimal,
}

/// Scores every candidate cycle for a vendor against its current
/// order size and bracket schedule, netting the carrying/ordering
/// cost against any bracket discount the larger order size would earn.
pub fn evaluate_cycles(vendor: &Vendor, annual_demand_amount: Decimal, cfg: &AsrConfig) -> Vec<CycleEvaluation> {
    CANDIDATE_CYCLES
        .iter()
        .map(|&cycle_days| {
            let cycle = Decimal::from(cycle_days);
            let order_amount = annual_demand_amount * cycle / dec!(365);
            let discount_percentage = vendor
                .applicable_bracket(crate::models::BracketUnit::Amount, order_amount)
                .map(|b| b.discount_percentage)
                .unwrap_or(Decimal::ZERO);

            let base_cost = annual_cost(cycle_days, annual_demand_amount, vendor.header_cost, cfg.carrying_cost_rate);
            let discount_savings = annual_demand_amount * (discount_percentage / dec!(100));
            let net_annual_cost = base_cost - discount_savings;

            CycleEvaluation { cycle_days, annual_cost: base_cost, discount_percentage, net_annual_cost }
        })
        .collect()
}

/// Picks the cycle with the lowest net annual cost among the
/// evaluated candidates.
pub fn best_cycle(evaluations: &[CycleEvaluation]) -> Option<CycleEvaluation> {
    evaluations.iter().copied().min_by(|a, b| a.net_annual_cost.cmp(&b.net_annual_cost))
}

/// Compares two specific cycle lengths and reports the profit impact
/// of switching from `current` to `candidate` (positive means the
/// candidate saves money).
pub fn compare_cycles(current: &CycleEvaluation, candidate: &CycleEvaluation) -> Decimal {
    current.net_annual_cost - candidate.net_annual_cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bracket, BracketUnit, VendorBuilder};
    use uuid::Uuid;

    #[test]
    fn eoq_is_clipped_to_minimum() {
        let days = economic_order_cycle_days(dec!(1), dec!(1000), dec!(0.25));
        assert_eq!(days, EOQ_MIN_DAYS);
    }

    #[test]
    fn eoq_scales_with_demand() {
        let small = economic_order_cycle_days(dec!(1000), dec!(50), dec!(0.25));
        let large = economic_order_cycle_days(dec!(1_000_000), dec!(50), dec!(0.25));
        assert!(large <= small);
    }

    #[test]
    fn best_cycle_picks_lowest_net_cost() {
        let evaluations = vec![
            CycleEvaluation { cycle_days: 7, annual_cost: dec!(500), discount_percentage: dec!(0), net_annual_cost: dec!(500) },
            CycleEvaluation { cycle_days: 28, annual_cost: dec!(300), discount_percentage: dec!(0), net_annual_cost: dec!(300) },
        ];
        assert_eq!(best_cycle(&evaluations).unwrap().cycle_days, 28);
    }

    #[test]
    fn evaluate_cycles_applies_bracket_discount() {
        let vendor = VendorBuilder::new("V1", Uuid::new_v4())
            .costs(dec!(50), dec!(2))
            .bracket(Bracket { bracket_number: 1, unit: BracketUnit::Amount, minimum: dec!(0), maximum: dec!(0), discount_percentage: dec!(5) })
            .build()
            .unwrap();
        let cfg = AsrConfig::default();
        let evaluations = evaluate_cycles(&vendor, dec!(100000), &cfg);
        assert!(evaluations.iter().all(|e| e.discount_percentage == dec!(5)));
    }
}

//! Vendor (a.k.a. Source) and bracket entities.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use super::common::AuditInfo;

/// Dimension a bracket's minimum/maximum are measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum BracketUnit {
    Amount,
    Eaches,
    Weight,
    Volume,
}

/// A quantity/value tier granting a discount. `maximum == 0` means
/// unbounded above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Bracket {
    pub bracket_number: u32,
    pub unit: BracketUnit,
    pub minimum: Decimal,
    pub maximum: Decimal,
    pub discount_percentage: Decimal,
}

impl Bracket {
    pub fn is_unbounded(&self) -> bool {
        self.maximum == Decimal::ZERO
    }

    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.minimum && (self.is_unbounded() || amount <= self.maximum)
    }
}

/// Selects the bracket that applies to `amount` among brackets sharing
/// `unit`: the highest bracket whose `[minimum, maximum]` the amount
/// falls within. Brackets must form a non-overlapping, strictly
/// increasing-by-minimum sequence.
pub fn select_bracket(brackets: &[Bracket], unit: BracketUnit, amount: Decimal) -> Option<&Bracket> {
    brackets
        .iter()
        .filter(|b| b.unit == unit && b.contains(amount))
        .max_by_key(|b| b.bracket_number)
}

/// Automatic bracket-rebuild eligibility, keyed by vendor policy number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum RebuildPolicy {
    Disabled,
    /// Vendor policy 4: rebuild on demand.
    OnDemand,
    /// Vendor policy 5: rebuild automatically whenever due.
    Automatic,
}

impl RebuildPolicy {
    pub fn rebuilds_automatically(self) -> bool {
        matches!(self, Self::OnDemand | Self::Automatic)
    }
}

/// A vendor/source supplying one or more warehouses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Vendor {
    pub id: Uuid,
    pub vendor_id: String,
    pub warehouse_id: Uuid,

    pub order_cycle_days: u32,
    pub header_cost: Decimal,
    pub line_cost: Decimal,
    pub service_level_goal_default: Decimal,
    pub lead_time_quoted_days: Decimal,
    pub lead_time_forecast_days: Decimal,
    pub lead_time_variance_pct: Decimal,

    pub order_days_in_week: u8,
    pub order_week_parity: Option<bool>,
    pub order_day_in_month: Option<u32>,
    pub next_order_date: Option<NaiveDate>,
    pub last_order_date: Option<NaiveDate>,
    pub order_when_minimum_met: bool,

    pub brackets: Vec<Bracket>,
    pub current_bracket: Option<u32>,
    pub rebuild_policy: RebuildPolicy,
    pub active_items_count: u32,

    pub audit: AuditInfo,
}

impl Vendor {
    /// Whether today's calendar matches a scheduled order day, per the
    /// vendor's weekday bitmap / week-parity / day-in-month settings.
    pub fn matches_schedule(&self, today: NaiveDate) -> bool {
        use chrono::Datelike;
        let weekday_bit = 1u8 << today.weekday().num_days_from_monday();
        if self.order_days_in_week & weekday_bit != 0 {
            if let Some(parity) = self.order_week_parity {
                let iso_week = today.iso_week().week();
                let is_even = iso_week % 2 == 0;
                return is_even == parity;
            }
            return true;
        }
        if let Some(day) = self.order_day_in_month {
            return today.day() == day;
        }
        false
    }

    pub fn applicable_bracket<'a>(&'a self, unit: BracketUnit, amount: Decimal) -> Option<&'a Bracket> {
        select_bracket(&self.brackets, unit, amount)
    }
}

pub struct VendorBuilder {
    vendor_id: String,
    warehouse_id: Uuid,
    order_cycle_days: u32,
    header_cost: Decimal,
    line_cost: Decimal,
    service_level_goal_default: Decimal,
    lead_time_quoted_days: Decimal,
    lead_time_variance_pct: Decimal,
    order_days_in_week: u8,
    order_week_parity: Option<bool>,
    order_day_in_month: Option<u32>,
    order_when_minimum_met: bool,
    brackets: Vec<Bracket>,
    rebuild_policy: RebuildPolicy,
}

impl VendorBuilder {
    pub fn new(vendor_id: impl Into<String>, warehouse_id: Uuid) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            warehouse_id,
            order_cycle_days: 14,
            header_cost: Decimal::ZERO,
            line_cost: Decimal::ZERO,
            service_level_goal_default: Decimal::from(95),
            lead_time_quoted_days: Decimal::from(7),
            lead_time_variance_pct: Decimal::from(10),
            order_days_in_week: 0,
            order_week_parity: None,
            order_day_in_month: None,
            order_when_minimum_met: false,
            brackets: Vec::new(),
            rebuild_policy: RebuildPolicy::Disabled,
        }
    }

    pub fn order_cycle_days(mut self, value: u32) -> Self {
        self.order_cycle_days = value;
        self
    }

    pub fn costs(mut self, header_cost: Decimal, line_cost: Decimal) -> Self {
        self.header_cost = header_cost;
        self.line_cost = line_cost;
        self
    }

    pub fn service_level_goal_default(mut self, value: Decimal) -> Self {
        self.service_level_goal_default = value;
        self
    }

    pub fn bracket(mut self, bracket: Bracket) -> Self {
        self.brackets.push(bracket);
        self
    }

    pub fn rebuild_policy(mut self, value: RebuildPolicy) -> Self {
        self.rebuild_policy = value;
        self
    }

    pub fn order_when_minimum_met(mut self, value: bool) -> Self {
        self.order_when_minimum_met = value;
        self
    }

    pub fn build(self) -> Result<Vendor, &'static str> {
        let mut sorted = self.brackets.clone();
        sorted.sort_by(|a, b| a.unit.cmp_key().cmp(&b.unit.cmp_key()).then(a.minimum.cmp(&b.minimum)));
        for window in sorted.windows(2) {
            if window[0].unit == window[1].unit && window[0].minimum >= window[1].minimum {
                return Err("bracket minimums must be strictly increasing within a unit");
            }
        }
        let now = chrono::Utc::now();
        Ok(Vendor {
            id: Uuid::new_v4(),
            vendor_id: self.vendor_id,
            warehouse_id: self.warehouse_id,
            order_cycle_days: self.order_cycle_days,
            header_cost: self.header_cost,
            line_cost: self.line_cost,
            service_level_goal_default: self.service_level_goal_default,
            lead_time_quoted_days: self.lead_time_quoted_days,
            lead_time_forecast_days: self.lead_time_quoted_days,
            lead_time_variance_pct: self.lead_time_variance_pct,
            order_days_in_week: self.order_days_in_week,
            order_week_parity: self.order_week_parity,
            order_day_in_month: self.order_day_in_month,
            next_order_date: None,
            last_order_date: None,
            order_when_minimum_met: self.order_when_minimum_met,
            brackets: self.brackets,
            current_bracket: None,
            rebuild_policy: self.rebuild_policy,
            active_items_count: 0,
            audit: AuditInfo::new(now),
        })
    }
}

impl BracketUnit {
    fn cmp_key(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn brackets() -> Vec<Bracket> {
        vec![
            Bracket { bracket_number: 1, unit: BracketUnit::Amount, minimum: dec!(0), maximum: dec!(999), discount_percentage: dec!(0) },
            Bracket { bracket_number: 2, unit: BracketUnit::Amount, minimum: dec!(1000), maximum: dec!(4999), discount_percentage: dec!(3) },
            Bracket { bracket_number: 3, unit: BracketUnit::Amount, minimum: dec!(5000), maximum: dec!(0), discount_percentage: dec!(5) },
        ]
    }

    #[test]
    fn selects_matching_bracket_scenario_4() {
        let selected = select_bracket(&brackets(), BracketUnit::Amount, dec!(3500)).unwrap();
        assert_eq!(selected.bracket_number, 2);
        assert_eq!(selected.discount_percentage, dec!(3));
    }

    #[test]
    fn unbounded_top_bracket_matches_large_amounts() {
        let selected = select_bracket(&brackets(), BracketUnit::Amount, dec!(1_000_000)).unwrap();
        assert_eq!(selected.bracket_number, 3);
    }

    #[test]
    fn builder_rejects_non_increasing_minimums() {
        let mut b = brackets();
        b.push(Bracket { bracket_number: 4, unit: BracketUnit::Amount, minimum: dec!(500), maximum: dec!(600), discount_percentage: dec!(1) });
        let result = b.into_iter().fold(VendorBuilder::new("V1", Uuid::new_v4()), |acc, br| acc.bracket(br)).build();
        assert!(result.is_err());
    }
}

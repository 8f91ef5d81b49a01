//! Lead-Time Forecaster (C5): turns a vendor's or SKU's receipt
//! history into a filtered lead-time sample, summary statistics, a
//! forecast, and a seasonality/reliability read on that sample.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::Order;

/// Minimum own observations a SKU needs before it computes its own
/// lead time instead of inheriting the vendor's.
pub const MIN_OWN_OBSERVATIONS: usize = 3;

/// A single order's placed→received span, with enough context to be
/// excluded by the filter.
#[derive(Debug, Clone, Copy)]
pub struct LeadTimeObservation {
    pub order_date: NaiveDate,
    pub receipt_date: Option<NaiveDate>,
    pub is_expedited: bool,
    pub is_delayed: bool,
}

impl LeadTimeObservation {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_date: order.order_date,
            receipt_date: order.receipt_date,
            is_expedited: order.is_expedited,
            is_delayed: order.is_delayed,
        }
    }

    fn observed_days(&self) -> Option<i64> {
        self.receipt_date.map(|receipt| (receipt - self.order_date).num_days())
    }
}

/// Drops observations that are missing a receipt date, non-positive,
/// expedited, delayed, or outside `[0.7, 1.5] * expected_days` of the
/// vendor's quoted expectation.
pub fn filter_observations(observations: &[LeadTimeObservation], expected_days: Decimal) -> Vec<Decimal> {
    let lower = expected_days * dec!(0.7);
    let upper = expected_days * dec!(1.5);

    observations
        .iter()
        .filter(|obs| !obs.is_expedited && !obs.is_delayed)
        .filter_map(|obs| obs.observed_days())
        .filter(|days| *days > 0)
        .filter_map(Decimal::from_i64)
        .filter(|days| *days >= lower && *days <= upper)
        .collect()
}

/// Summary statistics over a filtered lead-time sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadTimeStats {
    pub mean: Decimal,
    pub median: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub variance: Decimal,
    pub std_dev: Decimal,
    pub variance_pct: Decimal,
    pub trend: Decimal,
}

/// Computes mean/median/min/max/variance/std-dev/variance% and a
/// simple trend (second half mean minus first half mean, relative to
/// the overall mean).
pub fn compute_stats(samples: &[Decimal]) -> Option<LeadTimeStats> {
    if samples.is_empty() {
        return None;
    }
    let n = Decimal::from(samples.len() as u64);
    let mean = samples.iter().copied().sum::<Decimal>() / n;

    let mut sorted = samples.to_vec();
    sorted.sort();
    let median = if sorted.len() % 2 == 0 {
        let mid = sorted.len() / 2;
        (sorted[mid - 1] + sorted[mid]) / dec!(2)
    } else {
        sorted[sorted.len() / 2]
    };

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    let variance = if samples.len() > 1 {
        samples.iter().map(|v| (*v - mean) * (*v - mean)).sum::<Decimal>() / Decimal::from((samples.len() - 1) as u64)
    } else {
        Decimal::ZERO
    };
    let std_dev = decimal_sqrt(variance);
    let variance_pct = if mean != Decimal::ZERO { (std_dev / mean) * dec!(100) } else { Decimal::ZERO };

    let trend = if samples.len() >= 4 && mean != Decimal::ZERO {
        let mid = samples.len() / 2;
        let first_half = samples[..mid].iter().copied().sum::<Decimal>() / Decimal::from(mid as u64);
        let second_half =
            samples[mid..].iter().copied().sum::<Decimal>() / Decimal::from((samples.len() - mid) as u64);
        (second_half - first_half) / mean
    } else {
        Decimal::ZERO
    };

    Some(LeadTimeStats { mean, median, min, max, variance, std_dev, variance_pct, trend })
}

fn decimal_sqrt(value: Decimal) -> Decimal {
    let as_f64 = value.to_f64().unwrap_or(0.0).max(0.0);
    Decimal::from_f64(as_f64.sqrt()).unwrap_or(Decimal::ZERO)
}

/// Forecast result: a floored day count and a floored variance
/// percentage, ready to store on the vendor or SKU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadTimeForecast {
    pub forecast_days: Decimal,
    pub variance_pct: Decimal,
}

/// Median-based lead-time forecast, nudged by half the trend when the
/// trend exceeds `trend_threshold`. Floors at 1 day and 5% variance.
pub fn forecast_lead_time(stats: &LeadTimeStats, trend_threshold: Decimal) -> LeadTimeForecast {
    let mut days = stats.median;
    if stats.trend.abs() > trend_threshold {
        days += stats.trend * stats.median / dec!(2);
    }
    let forecast_days = days.max(Decimal::ONE);
    let variance_pct = stats.variance_pct.max(dec!(5));
    LeadTimeForecast { forecast_days, variance_pct }
}

/// Whether a sample shows a monthly seasonal pattern: group
/// observations by the calendar month of their order date and flag a
/// spread of more than `0.2` (20%) between the lowest and highest
/// monthly mean, relative to the overall mean.
pub fn detect_seasonality(observations: &[LeadTimeObservation]) -> bool {
    let mut by_month: Vec<Vec<Decimal>> = vec![Vec::new(); 12];
    for obs in observations {
        if let Some(days) = obs.observed_days().filter(|d| *d > 0).and_then(Decimal::from_i64) {
            by_month[obs.order_date.month0() as usize].push(days);
        }
    }
    let monthly_means: Vec<Decimal> = by_month
        .iter()
        .filter(|m| !m.is_empty())
        .map(|m| m.iter().copied().sum::<Decimal>() / Decimal::from(m.len() as u64))
        .collect();

    if monthly_means.len() < 2 {
        return false;
    }
    let overall_mean = monthly_means.iter().copied().sum::<Decimal>() / Decimal::from(monthly_means.len() as u64);
    if overall_mean == Decimal::ZERO {
        return false;
    }
    let min = *monthly_means.iter().min().unwrap();
    let max = *monthly_means.iter().max().unwrap();
    (max - min) / overall_mean > dec!(0.2)
}

/// Diagnostic reliability read on a sample: share of observations kept
/// by the filter, and whether the sample is large enough to trust.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reliability {
    pub kept_ratio: Decimal,
    pub is_reliable: bool,
}

pub fn evaluate_reliability(total_observations: usize, filtered: &[Decimal]) -> Reliability {
    if total_observations == 0 {
        return Reliability { kept_ratio: Decimal::ZERO, is_reliable: false };
    }
    let kept_ratio = Decimal::from(filtered.len() as u64) / Decimal::from(total_observations as u64);
    let is_reliable = filtered.len() >= MIN_OWN_OBSERVATIONS && kept_ratio >= dec!(0.5);
    Reliability { kept_ratio, is_reliable }
}

/// Flags samples containing an observation more than 3 standard
/// deviations from the mean.
pub fn detect_anomalies(samples: &[Decimal], stats: &LeadTimeStats) -> Vec<Decimal> {
    if stats.std_dev == Decimal::ZERO {
        return Vec::new();
    }
    samples.iter().copied().filter(|v| (*v - stats.mean).abs() > stats.std_dev * dec!(3)).collect()
}

/// Whether a SKU should compute its own lead time rather than
/// inherit the vendor's: at least `MIN_OWN_OBSERVATIONS` kept samples.
pub fn uses_own_lead_time(own_filtered: &[Decimal]) -> bool {
    own_filtered.len() >= MIN_OWN_OBSERVATIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(order_offset: i64, lead_days: i64, expedited: bool, delayed: bool) -> LeadTimeObservation {
        let order_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Duration::days(order_offset);
        LeadTimeObservation {
            order_date,
            receipt_date: Some(order_date + chrono::Duration::days(lead_days)),
            is_expedited: expedited,
            is_delayed: delayed,
        }
    }

    #[test]
    fn filter_drops_expedited_and_out_of_band_observations() {
        let observations = vec![obs(0, 7, false, false), obs(10, 2, true, false), obs(20, 30, false, false)];
        let filtered = filter_observations(&observations, dec!(7));
        assert_eq!(filtered, vec![dec!(7)]);
    }

    #[test]
    fn stats_median_and_mean_match_known_sample() {
        let samples = vec![dec!(5), dec!(7), dec!(9)];
        let stats = compute_stats(&samples).unwrap();
        assert_eq!(stats.mean, dec!(7));
        assert_eq!(stats.median, dec!(7));
    }

    #[test]
    fn forecast_floors_below_one_day() {
        let stats = LeadTimeStats {
            mean: dec!(0.2),
            median: dec!(0.2),
            min: dec!(0.1),
            max: dec!(0.3),
            variance: Decimal::ZERO,
            std_dev: Decimal::ZERO,
            variance_pct: Decimal::ZERO,
            trend: Decimal::ZERO,
        };
        let forecast = forecast_lead_time(&stats, dec!(0.05));
        assert_eq!(forecast.forecast_days, Decimal::ONE);
        assert_eq!(forecast.variance_pct, dec!(5));
    }

    #[test]
    fn own_lead_time_requires_minimum_sample() {
        assert!(!uses_own_lead_time(&[dec!(7), dec!(8)]));
        assert!(uses_own_lead_time(&[dec!(7), dec!(8), dec!(9)]));
    }
}

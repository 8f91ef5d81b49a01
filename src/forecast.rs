//! Demand Forecaster (C3): adaptive smoothing over period history,
//! maintaining `period_forecast`, MADP, and tracking signal.
//!
//! Pure functions throughout — no I/O. The nightly orchestrator reads
//! history and the seasonal profile, calls `reforecast`, and persists
//! the returned `Sku`.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::AsrConfig;
use crate::models::{DemandHistoryRecord, ForecastMethod, SeasonalProfile, Sku, SystemClass};
use crate::stats::normal_cdf;

/// Mean absolute deviation between matched actual/forecast pairs.
pub fn mean_absolute_deviation(actuals: &[Decimal], forecasts: &[Decimal]) -> Decimal {
    if actuals.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = actuals.iter().zip(forecasts).map(|(a, f)| (*a - *f).abs()).sum();
    sum / Decimal::from(actuals.len() as u64)
}

/// MADP: mean absolute deviation as a percentage of the forecast,
/// over entries where the forecast is non-zero.
pub fn mean_absolute_deviation_percent(actuals: &[Decimal], forecasts: &[Decimal]) -> Decimal {
    let pairs: Vec<(Decimal, Decimal)> = actuals
        .iter()
        .zip(forecasts)
        .filter(|(_, f)| **f != Decimal::ZERO)
        .map(|(a, f)| (*a, *f))
        .collect();
    if pairs.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = pairs.iter().map(|(a, f)| (*a - *f).abs() / *f).sum();
    dec!(100) * sum / Decimal::from(pairs.len() as u64)
}

/// Signed tracking signal, bounded to `[-1, 1]` (§9 resolution #3).
pub fn tracking_signal(actuals: &[Decimal], forecasts: &[Decimal], mad: Decimal) -> Decimal {
    if actuals.is_empty() || mad == Decimal::ZERO {
        return Decimal::ZERO;
    }
    let sum: Decimal = actuals.iter().zip(forecasts).map(|(a, f)| *a - *f).sum();
    let raw = sum / (mad * Decimal::from(actuals.len() as u64));
    raw.clamp(dec!(-1), dec!(1))
}

/// σ used by the demand filter and expected-zero-periods formulae: the
/// MADP-derived per-unit-time standard deviation (§9 resolution #4),
/// never a separately tracked raw MAD series.
pub fn sigma_from_madp(madp: Decimal, forecast: Decimal) -> Decimal {
    (madp / dec!(100)) * forecast * dec!(1.25)
}

/// `expected = 12·(1 - Φ(z))`, `z = forecast/σ`; `z > 6` collapses to 0.
pub fn expected_zero_periods(forecast: Decimal, madp: Decimal) -> Decimal {
    let sigma = sigma_from_madp(madp, forecast);
    if sigma <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let z = (forecast / sigma).to_f64().unwrap_or(0.0);
    if z > 6.0 {
        return Decimal::ZERO;
    }
    let expected = 12.0 * (1.0 - normal_cdf(z));
    Decimal::from_f64(expected).unwrap_or(Decimal::ZERO).max(Decimal::ZERO)
}

/// Regular AVS smoothing factor: `α = min(|track|, 0.5) ·
/// alpha_factor/10`, clamped to `[0, 1]`.
pub fn regular_alpha(track: Decimal, alpha_factor: Decimal) -> Decimal {
    let base = track.abs().min(dec!(0.5)) * (alpha_factor / dec!(10));
    base.clamp(Decimal::ZERO, Decimal::ONE)
}

/// Regular AVS reforecast. `most_recent_demand` is deseasonalized by
/// the caller before this runs, if the SKU carries a profile.
pub fn regular_avs(old_forecast: Decimal, most_recent_demand: Decimal, track: Decimal, alpha_factor: Decimal) -> Decimal {
    let alpha = regular_alpha(track, alpha_factor);
    alpha * most_recent_demand + (Decimal::ONE - alpha) * old_forecast
}

/// Result of an Enhanced AVS pass: the (possibly unchanged) forecast
/// level and the (possibly decayed) tracking signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhancedAvsResult {
    pub forecast: Decimal,
    pub track: Decimal,
}

/// Enhanced AVS reforecast for intermittent demand.
///
/// `periods_since_significant_demand` is `s` in spec §4.3, always ≥ 1;
/// `consecutive_zero_periods` is `k`.
pub fn enhanced_avs(
    old_forecast: Decimal,
    most_recent_demand: Decimal,
    track: Decimal,
    alpha_factor: Decimal,
    demand_limit: Decimal,
    update_frequency_impact: Decimal,
    periods_since_significant_demand: u32,
    consecutive_zero_periods: u32,
    expected_zero_periods: Decimal,
) -> EnhancedAvsResult {
    const ALPHA_MIN: Decimal = dec!(0.01);
    let s = periods_since_significant_demand.max(1);

    if most_recent_demand > demand_limit {
        let base_alpha = regular_alpha(track, alpha_factor);
        let damped_alpha = (base_alpha * pow_decimal(update_frequency_impact, s - 1)).max(ALPHA_MIN);
        let forecast = damped_alpha * most_recent_demand + (Decimal::ONE - damped_alpha) * old_forecast;
        EnhancedAvsResult { forecast, track }
    } else {
        // Scenario 5 decays track by U^k (consecutive zero periods),
        // not U^s: when every intervening period was zero the two
        // counts coincide, and the worked example only gives k.
        let u_pow_k = pow_decimal(update_frequency_impact, consecutive_zero_periods.max(1));
        let decayed_track = track * u_pow_k;
        let k = Decimal::from(consecutive_zero_periods);
        let threshold = expected_zero_periods * update_frequency_impact;
        if k >= threshold && threshold > Decimal::ZERO {
            let forecast = old_forecast / (Decimal::ONE + dec!(0.5) * (k / update_frequency_impact));
            EnhancedAvsResult { forecast, track: decayed_track }
        } else {
            EnhancedAvsResult { forecast: old_forecast, track: decayed_track }
        }
    }
}

fn pow_decimal(base: Decimal, exponent: u32) -> Decimal {
    let mut result = Decimal::ONE;
    for _ in 0..exponent {
        result *= base;
    }
    result
}

/// Initial forecast for a brand-new SKU: exponentially weighted mean
/// of history (most recent first, weights `exp(-0.1*i)`) if any exists,
/// else the peer mean, else `1.0`.
pub fn initial_forecast(history_most_recent_first: &[Decimal], peer_mean: Option<Decimal>) -> Decimal {
    if !history_most_recent_first.is_empty() {
        let mut weighted_sum = Decimal::ZERO;
        let mut weight_total = 0.0f64;
        let mut weights = Vec::with_capacity(history_most_recent_first.len());
        for i in 0..history_most_recent_first.len() {
            let w = (-0.1 * i as f64).exp();
            weights.push(w);
            weight_total += w;
        }
        for (value, weight) in history_most_recent_first.iter().zip(weights.iter()) {
            let w_decimal = Decimal::from_f64(*weight).unwrap_or(Decimal::ZERO);
            weighted_sum += *value * w_decimal;
        }
        let total_decimal = Decimal::from_f64(weight_total).unwrap_or(Decimal::ONE);
        if total_decimal > Decimal::ZERO {
            return weighted_sum / total_decimal;
        }
    }
    peer_mean.unwrap_or(Decimal::ONE)
}

/// System-class transition after a reforecast, for SKUs ≥ 180 days old
/// and not Alternate/Manual/Discontinued.
pub fn classify_system_class(madp: Decimal, yearly_forecast: Decimal, cfg: &AsrConfig) -> SystemClass {
    if madp >= cfg.madp_high_threshold {
        SystemClass::Lumpy
    } else if yearly_forecast < cfg.slow_mover_limit {
        SystemClass::Slow
    } else {
        SystemClass::Regular
    }
}

/// Runs one reforecast pass and returns the updated `Sku`. Does not
/// mutate the input; the caller persists the result. Returns the
/// unchanged SKU, with exception detection still possible downstream,
/// when reforecasting is skipped (frozen or method-exempt).
pub fn reforecast(
    sku: &Sku,
    history_oldest_first: &[DemandHistoryRecord],
    profile: Option<&SeasonalProfile>,
    cfg: &AsrConfig,
    now: DateTime<Utc>,
) -> Sku {
    let mut updated = sku.clone();
    let today = now.date_naive();

    if sku.skips_reforecast(today) {
        return updated;
    }

    let actuals: Vec<Decimal> = history_oldest_first.iter().filter(|r| !r.is_ignored).map(|r| r.total_demand).collect();
    if actuals.is_empty() {
        return updated;
    }

    let most_recent = *actuals.last().unwrap();
    let deseasonalized = match (profile, history_oldest_first.last()) {
        (Some(profile), Some(record)) => {
            let index = profile.index_for(record.period_number);
            if index != Decimal::ZERO {
                most_recent / index
            } else {
                most_recent
            }
        }
        _ => most_recent,
    };

    let forecasts = vec![sku.period_forecast; actuals.len()];
    let mad = mean_absolute_deviation(&actuals, &forecasts);
    let madp = mean_absolute_deviation_percent(&actuals, &forecasts);
    let track = tracking_signal(&actuals, &forecasts, mad);

    let (new_forecast, new_track) = match sku.forecast_method {
        ForecastMethod::RegularAvs => {
            (regular_avs(sku.period_forecast, deseasonalized, track, cfg.basic_alpha_factor), track)
        }
        ForecastMethod::EnhancedAvs => {
            let zero_periods = expected_zero_periods(sku.period_forecast, madp);
            let result = enhanced_avs(
                sku.period_forecast,
                deseasonalized,
                track,
                cfg.basic_alpha_factor,
                cfg.forecast_demand_limit,
                cfg.update_frequency_impact,
                consecutive_significant_gap(history_oldest_first),
                sku.periods_with_zero_demand,
                zero_periods,
            );
            (result.forecast, result.track)
        }
        ForecastMethod::DemandImport | ForecastMethod::Alternate => (sku.period_forecast, track),
    };

    updated.period_forecast = new_forecast;
    updated.weekly_forecast = new_forecast / dec!(4);
    updated.quarterly_forecast = new_forecast * dec!(3);
    updated.yearly_forecast = new_forecast * Decimal::from(sku.periodicity.periods_per_year());
    updated.madp = madp;
    updated.track = new_track;
    updated.last_forecast_date = Some(today);
    updated.periods_with_zero_demand =
        if most_recent == Decimal::ZERO { sku.periods_with_zero_demand + 1 } else { 0 };

    if sku.is_mature(now)
        && !matches!(sku.forecast_method, ForecastMethod::Alternate)
        && !matches!(sku.buyer_class, crate::models::BuyerClass::Manual | crate::models::BuyerClass::Discontinued)
    {
        updated.system_class = classify_system_class(madp, updated.yearly_forecast, cfg);
    }

    updated
}

fn consecutive_significant_gap(history_oldest_first: &[DemandHistoryRecord]) -> u32 {
    let mut gap = 0u32;
    for record in history_oldest_first.iter().rev() {
        if record.total_demand == Decimal::ZERO {
            gap += 1;
        } else {
            break;
        }
    }
    gap.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_avs_matches_scenario_1() {
        let forecast = regular_avs(dec!(100), dec!(80), dec!(0.20), dec!(10));
        assert_eq!(forecast, dec!(84.0));
    }

    #[test]
    fn enhanced_avs_matches_scenario_5() {
        let result = enhanced_avs(
            dec!(100),
            dec!(0),
            dec!(0.3),
            dec!(10),
            dec!(1),
            dec!(0.95),
            1,
            4,
            dec!(999),
        );
        assert_eq!(result.forecast, dec!(100));
        let expected_track = dec!(0.3) * dec!(0.95) * dec!(0.95) * dec!(0.95) * dec!(0.95);
        assert!((result.track - expected_track).abs() < dec!(0.0001));
    }

    #[test]
    fn tracking_signal_is_bounded() {
        let actuals = vec![dec!(1000), dec!(1000), dec!(1000)];
        let forecasts = vec![dec!(1), dec!(1), dec!(1)];
        let mad = mean_absolute_deviation(&actuals, &forecasts);
        let track = tracking_signal(&actuals, &forecasts, mad);
        assert!(track <= dec!(1) && track >= dec!(-1));
    }

    #[test]
    fn total_demand_based_madp_ignores_zero_forecast_entries() {
        let actuals = vec![dec!(10), dec!(20)];
        let forecasts = vec![dec!(0), dec!(20)];
        let madp = mean_absolute_deviation_percent(&actuals, &forecasts);
        assert_eq!(madp, Decimal::ZERO);
    }
}

//! Seasonality Engine (C4): builds a composite demand line across
//! years of history, derives normalized per-period indices from it,
//! and applies/reverses multiplicative seasonality on a forecast.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;

/// Weight given to the single most recent year in the composite line.
const MOST_RECENT_WEIGHT: f64 = 0.5;
/// Circular smoothing factor applied to raw indices.
const SMOOTHING_FACTOR: f64 = 0.3;

/// Builds a composite per-period demand line from up to four years of
/// history, most-recent year first. The most recent year gets a fixed
/// weight of `0.5`; the remaining weight is split across older years
/// proportional to `exp(-0.5*(i-1))`, `i` counting from the second
/// most recent year.
pub fn composite_line(years_most_recent_first: &[Vec<Decimal>]) -> Vec<Decimal> {
    if years_most_recent_first.is_empty() {
        return Vec::new();
    }
    let periodicity = years_most_recent_first[0].len();
    let weights = composite_weights(years_most_recent_first.len());

    let mut composite = vec![Decimal::ZERO; periodicity];
    for (year, weight) in years_most_recent_first.iter().zip(weights.iter()) {
        let weight_decimal = Decimal::from_f64(*weight).unwrap_or(Decimal::ZERO);
        for (period, value) in year.iter().enumerate() {
            if period < composite.len() {
                composite[period] += *value * weight_decimal;
            }
        }
    }
    composite
}

fn composite_weights(year_count: usize) -> Vec<f64> {
    if year_count == 1 {
        return vec![1.0];
    }
    let mut weights = vec![0.0; year_count];
    weights[0] = MOST_RECENT_WEIGHT;

    let remainder_weight = 1.0 - MOST_RECENT_WEIGHT;
    let raw: Vec<f64> = (1..year_count).map(|i| (-0.5 * (i as f64 - 1.0)).exp()).collect();
    let raw_total: f64 = raw.iter().sum();
    for (offset, value) in raw.iter().enumerate() {
        weights[offset + 1] = remainder_weight * value / raw_total;
    }
    weights
}

/// Derives normalized seasonal indices from a composite line: divide
/// by the composite mean, apply one pass of 3-point circular
/// smoothing, then renormalize the result to mean `1.0`.
pub fn generate_seasonal_indices(composite: &[Decimal]) -> Vec<Decimal> {
    if composite.is_empty() {
        return Vec::new();
    }
    let mean = composite.iter().copied().sum::<Decimal>() / Decimal::from(composite.len() as u64);
    if mean == Decimal::ZERO {
        return vec![Decimal::ONE; composite.len()];
    }

    let raw: Vec<Decimal> = composite.iter().map(|value| *value / mean).collect();
    let smoothed = smooth_circular(&raw);
    renormalize_to_unit_mean(&smoothed)
}

fn smooth_circular(raw: &[Decimal]) -> Vec<Decimal> {
    let n = raw.len();
    if n < 3 {
        return raw.to_vec();
    }
    let s = Decimal::from_f64(SMOOTHING_FACTOR).unwrap_or(dec!(0.3));
    let center = Decimal::ONE - s;
    let side = s / dec!(2);

    (0..n)
        .map(|i| {
            let prev = raw[(i + n - 1) % n];
            let next = raw[(i + 1) % n];
            center * raw[i] + side * prev + side * next
        })
        .collect()
}

fn renormalize_to_unit_mean(values: &[Decimal]) -> Vec<Decimal> {
    let n = values.len();
    let mean = values.iter().copied().sum::<Decimal>() / Decimal::from(n as u64);
    if mean == Decimal::ZERO {
        return vec![Decimal::ONE; n];
    }
    values.iter().map(|v| *v / mean).collect()
}

/// Applies a multiplicative seasonal index to a deseasonalized value.
pub fn apply_seasonality(value: Decimal, index: Decimal) -> Decimal {
    value * index
}

/// Removes a multiplicative seasonal index from an observed value.
/// Returns the value unchanged if the index is zero.
pub fn reverse_seasonality(value: Decimal, index: Decimal) -> Decimal {
    if index == Decimal::ZERO {
        value
    } else {
        value / index
    }
}

/// Whether a profile's indices are stale enough to need rebuilding:
/// `|mean - 1.0| > epsilon` or any negative index.
pub fn needs_rebuild(indices: &[Decimal], epsilon: Decimal) -> bool {
    if indices.is_empty() {
        return true;
    }
    if indices.iter().any(|i| *i < Decimal::ZERO) {
        return true;
    }
    let mean = indices.iter().copied().sum::<Decimal>() / Decimal::from(indices.len() as u64);
    (mean - Decimal::ONE).abs() > epsilon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_year_composite_is_that_year() {
        let years = vec![vec![dec!(10), dec!(20), dec!(30)]];
        let composite = composite_line(&years);
        assert_eq!(composite, years[0]);
    }

    #[test]
    fn most_recent_year_dominates_composite_weighting() {
        let years = vec![vec![dec!(100)], vec![dec!(0)]];
        let composite = composite_line(&years);
        assert!(composite[0] > dec!(40));
    }

    #[test]
    fn generated_indices_have_unit_mean() {
        let composite = vec![dec!(80), dec!(100), dec!(120), dec!(100)];
        let indices = generate_seasonal_indices(&composite);
        let mean = indices.iter().copied().sum::<Decimal>() / Decimal::from(indices.len() as u64);
        assert!((mean - Decimal::ONE).abs() < dec!(0.0001));
    }

    #[test]
    fn apply_and_reverse_round_trip() {
        let value = dec!(50);
        let index = dec!(1.25);
        let seasonal = apply_seasonality(value, index);
        let recovered = reverse_seasonality(seasonal, index);
        assert_eq!(recovered, value);
    }

    #[test]
    fn flat_profile_does_not_need_rebuild() {
        let indices = vec![dec!(1), dec!(1), dec!(1)];
        assert!(!needs_rebuild(&indices, dec!(0.01)));
    }
}

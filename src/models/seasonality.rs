//! Seasonal profile entity: named, shared sets of per-period indices.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// A set of multiplicative seasonal indices shared across SKUs.
/// `indices.len() == periodicity` and `mean(indices) ≈ 1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SeasonalProfile {
    pub id: Uuid,
    pub name: String,
    pub periodicity: u32,
    pub indices: Vec<Decimal>,
}

impl SeasonalProfile {
    pub fn new(name: impl Into<String>, indices: Vec<Decimal>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), periodicity: indices.len() as u32, indices }
    }

    /// Index for a 1-based period number, wrapping modulo periodicity.
    pub fn index_for(&self, period_number: u32) -> Decimal {
        let zero_based = (period_number.saturating_sub(1)) % self.periodicity.max(1);
        self.indices[zero_based as usize]
    }

    /// `|mean(indices) - 1.0| <= epsilon`.
    pub fn is_normalized(&self, epsilon: f64) -> bool {
        if self.indices.is_empty() {
            return true;
        }
        let sum: f64 = self.indices.iter().filter_map(|d| d.to_f64()).sum();
        let mean = sum / self.indices.len() as f64;
        (mean - 1.0).abs() <= epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn index_wraps_by_periodicity() {
        let profile = SeasonalProfile::new("summer", vec![dec!(0.8), dec!(1.0), dec!(1.2)]);
        assert_eq!(profile.index_for(1), dec!(0.8));
        assert_eq!(profile.index_for(4), dec!(0.8));
    }

    #[test]
    fn detects_normalization() {
        let profile = SeasonalProfile::new("flat", vec![dec!(1.0), dec!(1.0), dec!(1.0)]);
        assert!(profile.is_normalized(1e-9));
    }
}

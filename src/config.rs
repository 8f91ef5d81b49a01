//! Engine-wide configuration.
//!
//! Mirrors the teacher's `config`/`dotenvy` optional-dependency pair and
//! `RepositoryConfig`'s named-constructor convention: a plain struct with
//! a `Default` that seeds sane values, plus a feature-gated loader that
//! layers defaults, a file, and the environment through the `config`
//! crate. File format and path selection stay the caller's concern.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// Every tunable named in the configuration table, plus the constants
/// introduced to resolve the open questions around tracking-signal
/// decay, σ derivation, and the order-due risk threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct AsrConfig {
    pub default_service_level: Decimal,
    pub default_lead_time_days: Decimal,
    pub default_lead_time_variance_pct: Decimal,
    pub forecasting_periodicity_default: u32,

    pub basic_alpha_factor: Decimal,
    pub forecast_demand_limit: Decimal,
    pub update_frequency_impact: Decimal,
    pub tracking_signal_limit: Decimal,
    pub demand_filter_high: Decimal,
    pub demand_filter_low: Decimal,
    pub madp_high_threshold: Decimal,
    pub slow_mover_limit: Decimal,
    /// Service level at/above which a line is flagged `order_point_a`
    /// rather than the plain `order_point` check, on the same 0-100
    /// scale as `service_level_goal`.
    pub op_prime_limit: Decimal,

    pub carrying_cost_rate: Decimal,
    pub keep_archived_exceptions_days: u32,
    pub history_periods_to_keep: u32,
    pub max_workers: usize,

    /// §9 resolution #5: fraction below the vendor order point that
    /// marks an order as due under risk, not just schedule.
    pub order_due_risk_threshold: Decimal,
    /// Clamp on the empirical safety-stock adjustment step.
    pub safety_stock_max_adjustment_pct: Decimal,
    /// Minimum |slope| in a lead-time trend regression to flag a trend.
    pub lead_time_trend_threshold: Decimal,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            default_service_level: dec!(95),
            default_lead_time_days: dec!(7),
            default_lead_time_variance_pct: dec!(10),
            forecasting_periodicity_default: 13,

            basic_alpha_factor: dec!(10),
            forecast_demand_limit: dec!(3),
            update_frequency_impact: dec!(0.95),
            tracking_signal_limit: dec!(0.55),
            demand_filter_high: dec!(3.5),
            demand_filter_low: dec!(-3.5),
            madp_high_threshold: dec!(60),
            slow_mover_limit: dec!(0.5),
            op_prime_limit: dec!(90),

            carrying_cost_rate: dec!(0.25),
            keep_archived_exceptions_days: 90,
            history_periods_to_keep: 104,
            max_workers: 4,

            order_due_risk_threshold: dec!(0.20),
            safety_stock_max_adjustment_pct: dec!(0.10),
            lead_time_trend_threshold: dec!(0.05),
        }
    }
}

#[cfg(feature = "config")]
mod loader {
    use super::AsrConfig;
    use config::{Config, ConfigError, Environment, File};

    impl AsrConfig {
        /// Layers defaults → an optional file at `path` → environment
        /// variables prefixed `ASR_`. File format/path are the caller's
        /// concern; this only wires the three sources together.
        pub fn from_sources(path: Option<&str>) -> Result<Self, ConfigError> {
            let defaults = AsrConfig::default();
            let mut builder = Config::builder().add_source(
                Config::try_from(&defaults)?,
            );
            if let Some(path) = path {
                builder = builder.add_source(File::with_name(path).required(false));
            }
            builder = builder.add_source(Environment::with_prefix("ASR").separator("__"));
            builder.build()?.try_deserialize()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_worked_examples() {
        let cfg = AsrConfig::default();
        assert_eq!(cfg.default_service_level, dec!(95));
        assert_eq!(cfg.basic_alpha_factor, dec!(10));
    }

    #[test]
    fn order_due_risk_threshold_defaults_to_twenty_percent() {
        assert_eq!(AsrConfig::default().order_due_risk_threshold, dec!(0.20));
    }

    #[test]
    fn op_prime_limit_is_on_the_same_scale_as_service_level_goal() {
        let cfg = AsrConfig::default();
        assert!(cfg.op_prime_limit >= dec!(50) && cfg.op_prime_limit <= dec!(100));
    }
}

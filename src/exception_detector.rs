//! Exception Detector (C9): the rule table that inspects a SKU after
//! reforecasting and raises `ExceptionRecord`s for conditions a buyer
//! needs to see.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::AsrConfig;
use crate::forecast::sigma_from_madp;
use crate::models::{BuyerClass, ExceptionRecord, ExceptionType, SeasonalProfile, Sku, SystemClass};

/// Runs every rule against one SKU's post-reforecast state and the
/// period's actual demand, returning every exception that fires.
/// Rules are independent; a SKU can raise more than one.
pub fn detect_exceptions(sku: &Sku, actual_demand: Decimal, profile: Option<&SeasonalProfile>, cfg: &AsrConfig, today: NaiveDate) -> Vec<ExceptionRecord> {
    let mut exceptions = Vec::new();

    if sku.period_forecast <= Decimal::ZERO && actual_demand > Decimal::ZERO {
        exceptions.push(
            ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::InfinityCheck, today, "actual demand recorded against a zero or negative forecast")
                .with_values(actual_demand, sku.period_forecast),
        );
    } else if sku.period_forecast > Decimal::ZERO {
        let sigma = sigma_from_madp(sku.madp, sku.period_forecast);
        if sigma > Decimal::ZERO {
            let z = (actual_demand - sku.period_forecast) / sigma;
            if z > cfg.demand_filter_high {
                exceptions.push(
                    ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::DemandFilterHigh, today, "demand spiked beyond the high filter")
                        .with_values(z, cfg.demand_filter_high),
                );
            } else if z < cfg.demand_filter_low {
                exceptions.push(
                    ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::DemandFilterLow, today, "demand dropped below the low filter")
                        .with_values(z, cfg.demand_filter_low),
                );
            }
        } else {
            // Degenerate MADP=0: sigma collapses to zero, so fall back to
            // a plain ratio test against the forecast.
            if actual_demand > sku.period_forecast * dec!(2) {
                exceptions.push(
                    ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::DemandFilterHigh, today, "demand more than doubled the forecast with zero MADP")
                        .with_values(actual_demand, sku.period_forecast * dec!(2)),
                );
            } else if actual_demand < sku.period_forecast * dec!(0.5) {
                exceptions.push(
                    ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::DemandFilterLow, today, "demand fell below half the forecast with zero MADP")
                        .with_values(actual_demand, sku.period_forecast * dec!(0.5)),
                );
            }
        }
    }

    if sku.track > cfg.tracking_signal_limit {
        exceptions.push(
            ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::TrackingSignalHigh, today, "tracking signal exceeded the positive limit")
                .with_values(sku.track, cfg.tracking_signal_limit),
        );
    } else if sku.track < -cfg.tracking_signal_limit {
        exceptions.push(
            ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::TrackingSignalLow, today, "tracking signal exceeded the negative limit")
                .with_values(sku.track, -cfg.tracking_signal_limit),
        );
    }

    if let Some(attained) = sku.service_level_attained {
        let floor = sku.service_level_goal * dec!(0.95);
        if attained < floor {
            exceptions.push(
                ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::ServiceLevelCheck, today, "attained service level fell more than 5% short of the goal")
                    .with_values(attained, floor),
            );
        }
    }

    match sku.buyer_class {
        BuyerClass::Watch => {
            exceptions.push(ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::WatchSku, today, "buyer class is watch"))
        }
        BuyerClass::Manual => {
            exceptions.push(ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::ManualSku, today, "buyer class is manual"))
        }
        BuyerClass::Discontinued => exceptions.push(ExceptionRecord::new(
            sku.id,
            sku.warehouse_id,
            ExceptionType::DiscontinuedSku,
            today,
            "buyer class is discontinued",
        )),
        BuyerClass::Regular | BuyerClass::Uninitialized => {}
    }

    if matches!(sku.system_class, SystemClass::New) {
        exceptions.push(ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::NewSku, today, "system class is new"));
    }

    if profile.is_some() {
        exceptions.push(ExceptionRecord::new(sku.id, sku.warehouse_id, ExceptionType::SeasonalSku, today, "SKU carries a seasonal profile"));
    }

    exceptions
}

/// Drops newly detected exceptions that duplicate an already
/// unacknowledged exception of the same type for the same SKU.
pub fn dedup_against_existing(candidates: Vec<ExceptionRecord>, existing: &[ExceptionRecord]) -> Vec<ExceptionRecord> {
    candidates
        .into_iter()
        .filter(|candidate| {
            !existing
                .iter()
                .any(|e| !e.is_acknowledged && e.sku_id == candidate.sku_id && e.exception_type == candidate.exception_type)
        })
        .collect()
}

/// Ids of acknowledged exceptions older than `keep_days`, ready for
/// the caller to delete via the repository.
pub fn expired_exception_ids(existing: &[ExceptionRecord], today: NaiveDate, keep_days: u32) -> Vec<uuid::Uuid> {
    existing
        .iter()
        .filter(|e| e.is_acknowledged && (today - e.raised_on).num_days() >= keep_days as i64)
        .map(|e| e.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkuBuilder;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 26).unwrap()
    }

    #[test]
    fn zero_forecast_with_actual_demand_raises_infinity_check() {
        let sku = SkuBuilder::new("SKU-1", Uuid::new_v4(), Uuid::new_v4()).buyer_class(BuyerClass::Regular).build().unwrap();
        let cfg = AsrConfig::default();
        let exceptions = detect_exceptions(&sku, dec!(10), None, &cfg, today());
        assert!(exceptions.iter().any(|e| e.exception_type == ExceptionType::InfinityCheck));
        assert!(!exceptions.iter().any(|e| e.exception_type == ExceptionType::DemandFilterHigh));
    }

    #[test]
    fn service_level_check_only_fires_past_the_five_percent_cushion() {
        let mut sku = SkuBuilder::new("SKU-1", Uuid::new_v4(), Uuid::new_v4()).buyer_class(BuyerClass::Regular).build().unwrap();
        sku.service_level_goal = dec!(95);
        sku.service_level_attained = Some(dec!(91)); // within 95 * 0.95 = 90.25, should not fire
        let cfg = AsrConfig::default();
        let exceptions = detect_exceptions(&sku, Decimal::ZERO, None, &cfg, today());
        assert!(!exceptions.iter().any(|e| e.exception_type == ExceptionType::ServiceLevelCheck));

        sku.service_level_attained = Some(dec!(90)); // below 90.25, should fire
        let exceptions = detect_exceptions(&sku, Decimal::ZERO, None, &cfg, today());
        assert!(exceptions.iter().any(|e| e.exception_type == ExceptionType::ServiceLevelCheck));
    }

    #[test]
    fn zero_madp_falls_back_to_degenerate_demand_filter() {
        let sku = SkuBuilder::new("SKU-1", Uuid::new_v4(), Uuid::new_v4())
            .buyer_class(BuyerClass::Regular)
            .forecast_state(dec!(70), dec!(0), dec!(0))
            .build()
            .unwrap();
        let cfg = AsrConfig::default();

        // period_forecast = 280; actual > 2x forecast should raise high.
        let high = detect_exceptions(&sku, dec!(600), None, &cfg, today());
        assert!(high.iter().any(|e| e.exception_type == ExceptionType::DemandFilterHigh));

        // actual < 0.5x forecast should raise low.
        let low = detect_exceptions(&sku, dec!(100), None, &cfg, today());
        assert!(low.iter().any(|e| e.exception_type == ExceptionType::DemandFilterLow));
    }

    #[test]
    fn tracking_signal_beyond_limit_raises_high() {
        let sku = SkuBuilder::new("SKU-1", Uuid::new_v4(), Uuid::new_v4())
            .buyer_class(BuyerClass::Regular)
            .forecast_state(dec!(70), dec!(25), dec!(0.9))
            .build()
            .unwrap();
        let cfg = AsrConfig::default();
        let exceptions = detect_exceptions(&sku, dec!(280), None, &cfg, today());
        assert!(exceptions.iter().any(|e| e.exception_type == ExceptionType::TrackingSignalHigh));
    }

    #[test]
    fn dedup_drops_repeat_unacknowledged_exception() {
        let sku_id = Uuid::new_v4();
        let warehouse_id = Uuid::new_v4();
        let existing = vec![ExceptionRecord::new(sku_id, warehouse_id, ExceptionType::WatchSku, today(), "buyer class is watch")];
        let candidates = vec![ExceptionRecord::new(sku_id, warehouse_id, ExceptionType::WatchSku, today(), "buyer class is watch")];
        let result = dedup_against_existing(candidates, &existing);
        assert!(result.is_empty());
    }

    #[test]
    fn expired_ids_only_include_acknowledged_past_retention() {
        let sku_id = Uuid::new_v4();
        let warehouse_id = Uuid::new_v4();
        let mut old = ExceptionRecord::new(sku_id, warehouse_id, ExceptionType::WatchSku, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), "old");
        old.acknowledge(chrono::Utc::now());
        let fresh = ExceptionRecord::new(sku_id, warehouse_id, ExceptionType::WatchSku, today(), "fresh");
        let ids = expired_exception_ids(&[old.clone(), fresh], today(), 90);
        assert_eq!(ids, vec![old.id]);
    }
}

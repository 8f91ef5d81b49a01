//! Nightly Orchestrator (C10): drives the nightly and period-end
//! pipelines across every SKU and vendor, in bounded concurrency, with
//! per-entity failure isolation.

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::context::Context;
use crate::errors::AsrResult;
use crate::leadtime::{self, LeadTimeObservation};
use crate::models::Sku;
use crate::repository::*;
use crate::{exception_detector, forecast, history, order_builder, safety_stock};

/// Aggregate outcome of one pipeline run. `errors` carries one message
/// per failed entity; a failure never aborts the run, only skips that
/// entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub errors: Vec<String>,
}

impl RunStats {
    fn record(&mut self, result: AsrResult<()>, label: impl Into<String>) {
        self.processed += 1;
        match result {
            Ok(()) => self.succeeded += 1,
            Err(err) => {
                self.failed += 1;
                let label = label.into();
                #[cfg(feature = "observability")]
                tracing::warn!(entity = %label, error = %err, "entity failed during pipeline run");
                self.errors.push(format!("{label}: {err}"));
            }
        }
    }
}

/// Runs every per-SKU/per-vendor unit of work in `units` at a
/// concurrency bound of `ctx.cfg.max_workers`, folding each outcome
/// into a shared `RunStats`.
async fn run_bounded<F, Fut>(max_workers: usize, units: Vec<(String, F)>) -> RunStats
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = AsrResult<()>>,
{
    let stats = Mutex::new(RunStats::default());
    stream::iter(units)
        .for_each_concurrent(max_workers.max(1), |(label, unit)| {
            let stats = &stats;
            async move {
                let result = unit().await;
                stats.lock().await.record(result, label);
            }
        })
        .await;
    stats.into_inner()
}

/// The nightly pipeline: OOS backfill, safety-stock/order-point
/// recompute, weekly lead-time update, per-vendor order build, and
/// history purge. Stock-status ingestion, time-based-parameter
/// updates, and deal-expiry handling are delegated inputs this
/// pipeline assumes are already reflected on the SKU/vendor records it
/// reads (spec's external-feed boundary).
pub async fn run_nightly<S: RepositoryFactory>(ctx: &Context<S>) -> AsrResult<RunStats> {
    #[cfg(feature = "observability")]
    let _span = tracing::info_span!("nightly_run").entered();

    let today = ctx.clock.today();

    #[cfg(feature = "observability")]
    tracing::debug!(stage = "sku_recompute", "starting stage");
    let skus = ctx.store.sku_repository().get_all(None, None).await?;
    let sku_units: Vec<(String, _)> = skus
        .into_iter()
        .filter(|sku| sku.is_active())
        .map(|sku| {
            let label = sku.sku_id.clone();
            (label, move || process_sku_nightly(ctx, sku))
        })
        .collect();
    let sku_stats = run_bounded(ctx.cfg.max_workers, sku_units).await;

    #[cfg(feature = "observability")]
    tracing::debug!(stage = "lead_time_forecast", "starting stage");
    let lead_time_stats = if is_weekly_update_day(today) {
        run_lead_time_update(ctx).await
    } else {
        RunStats::default()
    };

    #[cfg(feature = "observability")]
    tracing::debug!(stage = "vendor_order_build", "starting stage");
    let vendors = ctx.store.vendor_repository().get_all(None, None).await?;
    let now = ctx.clock.now();
    let vendor_units: Vec<(String, _)> = vendors
        .into_iter()
        .map(|vendor| {
            let label = vendor.vendor_id.clone();
            (label, move || process_vendor_nightly(ctx, vendor, today, now))
        })
        .collect();
    let vendor_stats = run_bounded(ctx.cfg.max_workers, vendor_units).await;

    Ok(merge_stats(merge_stats(sku_stats, lead_time_stats), vendor_stats))
}

/// Weekly cadence for the lead-time recompute stage: Sunday.
fn is_weekly_update_day(today: chrono::NaiveDate) -> bool {
    use chrono::Datelike;
    today.weekday() == chrono::Weekday::Sun
}

/// Recomputes each vendor's lead-time forecast from its recent
/// receipt history, per spec's "(Weekly) update lead-time forecasts"
/// nightly step.
async fn run_lead_time_update<S: RepositoryFactory>(ctx: &Context<S>) -> RunStats {
    let vendors = match ctx.store.vendor_repository().get_all(None, None).await {
        Ok(vendors) => vendors,
        Err(err) => {
            let mut stats = RunStats::default();
            stats.record(Err(crate::errors::AsrError::from(err)), "lead_time_update:list_vendors");
            return stats;
        }
    };

    let units: Vec<(String, _)> = vendors
        .into_iter()
        .map(|vendor| {
            let label = vendor.vendor_id.clone();
            (label, move || update_vendor_lead_time(ctx, vendor))
        })
        .collect();
    run_bounded(ctx.cfg.max_workers, units).await
}

async fn update_vendor_lead_time<S: RepositoryFactory>(ctx: &Context<S>, vendor: crate::models::Vendor) -> AsrResult<()> {
    let orders = ctx.store.order_repository().get_by_vendor(vendor.id).await?;
    let observations: Vec<LeadTimeObservation> = orders.iter().map(LeadTimeObservation::from_order).collect();
    let filtered = leadtime::filter_observations(&observations, vendor.lead_time_quoted_days);

    let Some(stats) = leadtime::compute_stats(&filtered) else {
        return Ok(());
    };
    let forecast = leadtime::forecast_lead_time(&stats, ctx.cfg.lead_time_trend_threshold);

    let mut updated = vendor.clone();
    updated.lead_time_forecast_days = forecast.forecast_days;
    updated.lead_time_variance_pct = forecast.variance_pct;
    ctx.store.vendor_repository().update(&updated).await?;

    // SKUs inherit the vendor-level forecast; a SKU's own receipt
    // history isn't tracked separately from its vendor's orders in
    // this model, so `uses_own_lead_time` has nothing to gate here —
    // it stays a pure helper for a future per-SKU receipt feed.
    let skus = ctx.store.sku_repository().get_by_vendor(vendor.id).await?;
    for sku in skus {
        if sku.lead_time_forecast_days == forecast.forecast_days && sku.lead_time_variance_pct == forecast.variance_pct {
            continue;
        }
        let mut updated_sku = sku.clone();
        updated_sku.lead_time_forecast_days = forecast.forecast_days;
        updated_sku.lead_time_variance_pct = forecast.variance_pct;
        ctx.store.sku_repository().update(&updated_sku).await?;
    }

    Ok(())
}

async fn process_sku_nightly<S: RepositoryFactory>(ctx: &Context<S>, sku: Sku) -> AsrResult<()> {
    let profile = match sku.seasonal_profile_id {
        Some(id) => ctx.store.seasonal_profile_repository().get_by_id(id).await?,
        None => None,
    };
    history::backfill_lost_sales(ctx, &sku, profile.as_ref()).await?;

    let vendor = ctx
        .store
        .vendor_repository()
        .get_by_id(sku.vendor_id)
        .await?
        .ok_or_else(|| crate::errors::AsrError::not_found("Vendor", sku.vendor_id.to_string()))?;

    let (safety_stock_days, order_points) = safety_stock::recompute_for_sku(&sku, Decimal::from(vendor.order_cycle_days));
    let mut updated = sku.clone();
    updated.sstf_days = safety_stock_days;
    updated.item_order_point_days = order_points.item_order_point_days;
    updated.item_order_point_units = order_points.item_order_point_units;
    updated.vendor_order_point_days = order_points.vendor_order_point_days;
    updated.order_up_to_level_days = order_points.order_up_to_level_days;
    updated.order_up_to_level_units = order_points.order_up_to_level_units;
    ctx.store.sku_repository().update(&updated).await?;

    history::purge_expired(ctx, &updated).await?;
    Ok(())
}

async fn process_vendor_nightly<S: RepositoryFactory>(
    ctx: &Context<S>,
    vendor: crate::models::Vendor,
    today: chrono::NaiveDate,
    now: chrono::DateTime<chrono::Utc>,
) -> AsrResult<()> {
    if !vendor.matches_schedule(today) && !vendor.rebuild_policy.rebuilds_automatically() {
        return Ok(());
    }

    let skus = ctx.store.sku_repository().get_by_vendor(vendor.id).await?;
    let order = order_builder::build_vendor_order(&vendor, &skus, &ctx.cfg, today, now);
    if let Some(order) = order {
        ctx.store.order_repository().create(&order).await?;
    }
    Ok(())
}

fn merge_stats(mut a: RunStats, b: RunStats) -> RunStats {
    a.processed += b.processed;
    a.succeeded += b.succeeded;
    a.failed += b.failed;
    a.errors.extend(b.errors);
    a
}

/// The period-end pipeline: reforecast every SKU, detect and persist
/// new exceptions, and archive exceptions past the retention window.
pub async fn run_period_end<S: RepositoryFactory>(ctx: &Context<S>) -> AsrResult<RunStats> {
    let skus = ctx.store.sku_repository().get_all(None, None).await?;
    let now = ctx.clock.now();
    let today = ctx.clock.today();

    let units: Vec<(String, _)> = skus
        .into_iter()
        .filter(|sku| sku.is_active())
        .map(|sku| {
            let label = sku.sku_id.clone();
            (label, move || process_sku_period_end(ctx, sku, now))
        })
        .collect();
    let mut stats = run_bounded(ctx.cfg.max_workers, units).await;

    let archive_stats = archive_expired_exceptions(ctx, today).await?;
    stats.processed += archive_stats.processed;
    stats.succeeded += archive_stats.succeeded;
    stats.failed += archive_stats.failed;
    stats.errors.extend(archive_stats.errors);
    Ok(stats)
}

async fn process_sku_period_end<S: RepositoryFactory>(ctx: &Context<S>, sku: Sku, now: chrono::DateTime<chrono::Utc>) -> AsrResult<()> {
    let today = now.date_naive();
    let current = crate::calendar::period_for_date(today, sku.periodicity);
    let history_window =
        ctx.store.history_repository().read_window(sku.id, current.year, current.period_number, ctx.cfg.history_periods_to_keep).await?;

    let profile = match sku.seasonal_profile_id {
        Some(id) => ctx.store.seasonal_profile_repository().get_by_id(id).await?,
        None => None,
    };

    // Exceptions compare the period's actual demand against the
    // forecast that predicted it, so detection runs against the
    // pre-reforecast SKU before the new forecast overwrites it.
    let actual_demand = history_window.last().map(|r| r.total_demand).unwrap_or(Decimal::ZERO);
    let candidates = exception_detector::detect_exceptions(&sku, actual_demand, profile.as_ref(), &ctx.cfg, today);

    let reforecasted = forecast::reforecast(&sku, &history_window, profile.as_ref(), &ctx.cfg, now);
    ctx.store.sku_repository().update(&reforecasted).await?;

    let existing = ctx
        .store
        .exception_repository()
        .search(ExceptionFilters { sku_id: Some(sku.id), warehouse_id: None, exception_type: None, is_acknowledged: Some(false) })
        .await?;
    let fresh = exception_detector::dedup_against_existing(candidates, &existing);
    for exception in fresh {
        ctx.store.exception_repository().create(&exception).await?;
    }

    Ok(())
}

async fn archive_expired_exceptions<S: RepositoryFactory>(ctx: &Context<S>, today: chrono::NaiveDate) -> AsrResult<RunStats> {
    let mut stats = RunStats::default();
    let repo = ctx.store.exception_repository();
    let all = repo.get_all(None, None).await?;
    let expired = exception_detector::expired_exception_ids(&all, today, ctx.cfg.keep_archived_exceptions_days);
    for id in expired {
        let result = repo.delete(id).await.map(|_| ()).map_err(crate::errors::AsrError::from);
        stats.record(result, id.to_string());
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::AsrConfig;
    use crate::models::{BuyerClass, DemandHistoryRecord, SkuBuilder, SystemClass, VendorBuilder};
    use crate::repository::memory::MemoryRepositoryFactory;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    fn ctx() -> Context<MemoryRepositoryFactory> {
        let now = Utc.with_ymd_and_hms(2026, 7, 26, 0, 0, 0).unwrap();
        Context::new(AsrConfig::default(), MemoryRepositoryFactory::new(), Arc::new(FixedClock(now)))
    }

    #[tokio::test]
    async fn nightly_run_updates_order_points_for_active_skus() {
        let ctx = ctx();
        let vendor = VendorBuilder::new("V1", Uuid::new_v4()).order_cycle_days(14).build().unwrap();
        ctx.store.vendor_repository().create(&vendor).await.unwrap();

        let sku = SkuBuilder::new("SKU-1", vendor.warehouse_id, vendor.id)
            .buyer_class(BuyerClass::Regular)
            .forecast_state(dec!(70), dec!(25), dec!(0.1))
            .stock_position(dec!(50), dec!(0), dec!(0), dec!(0), dec!(0))
            .build()
            .unwrap();
        ctx.store.sku_repository().create(&sku).await.unwrap();

        let stats = run_nightly(&ctx).await.unwrap();
        assert_eq!(stats.failed, 0);

        let updated = ctx.store.sku_repository().get_by_id(sku.id).await.unwrap().unwrap();
        assert!(updated.item_order_point_units > Decimal::ZERO);
    }

    #[tokio::test]
    async fn period_end_reforecasts_and_raises_exceptions() {
        let ctx = ctx();
        let mut sku = SkuBuilder::new("SKU-1", Uuid::new_v4(), Uuid::new_v4())
            .buyer_class(BuyerClass::Regular)
            .forecast_state(dec!(0), dec!(25), dec!(0.1))
            .build()
            .unwrap();
        sku.system_class = SystemClass::Regular;
        sku.period_forecast = Decimal::ZERO;
        ctx.store.sku_repository().create(&sku).await.unwrap();

        let record = DemandHistoryRecord::new(sku.id, 2026, 1, dec!(40));
        ctx.store.history_repository().upsert_period(record).await.unwrap();

        let stats = run_period_end(&ctx).await.unwrap();
        assert_eq!(stats.failed, 0);

        let exceptions = ctx.store.exception_repository().get_all(None, None).await.unwrap();
        assert!(exceptions.iter().any(|e| e.exception_type == crate::models::ExceptionType::InfinityCheck));
    }
}

//! History Store (C2): the business rules layered on top of
//! `HistoryRepository`'s raw CRUD — idempotent upserts, ignore flags,
//! scaled copies, retention purges, and OOS backfill.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::context::Context;
use crate::errors::AsrResult;
use crate::models::{DemandHistoryRecord, SeasonalProfile, Sku};
use crate::repository::traits::HistoryRepository;
use crate::repository::RepositoryFactory;

/// Read the trailing `periods` of non-ignored history for `sku`, ending
/// at `(year, period_number)` inclusive.
pub async fn read_window<S: RepositoryFactory>(
    ctx: &Context<S>,
    sku_id: Uuid,
    year: i32,
    period_number: u32,
    periods: u32,
) -> AsrResult<Vec<DemandHistoryRecord>> {
    let records = ctx.store.history_repository().read_window(sku_id, year, period_number, periods).await?;
    Ok(records.into_iter().filter(|r| !r.is_ignored).collect())
}

/// Backfill `lost_sales` on every window record where
/// `out_of_stock_days > 0`, using `daily_demand * out_of_stock_days`,
/// optionally scaled by the record's seasonal index. Returns the number
/// of records touched.
pub async fn backfill_lost_sales<S: RepositoryFactory>(
    ctx: &Context<S>,
    sku: &Sku,
    profile: Option<&SeasonalProfile>,
) -> AsrResult<u64> {
    let today = ctx.clock.today();
    let periodicity = sku.periodicity;
    let current = crate::calendar::period_for_date(today, periodicity);
    let history_repo = ctx.store.history_repository();
    let window = history_repo
        .read_window(sku.id, current.year, current.period_number, ctx.cfg.history_periods_to_keep)
        .await?;

    let daily_demand = sku.daily_demand();
    let mut touched = 0u64;

    for mut record in window {
        if record.out_of_stock_days == 0 {
            continue;
        }
        let seasonal_factor = profile.map(|p| p.index_for(record.period_number)).unwrap_or(Decimal::ONE);
        let backfilled = daily_demand * Decimal::from(record.out_of_stock_days) * seasonal_factor;
        if backfilled == record.lost_sales {
            continue;
        }
        record.set_lost_sales(backfilled);
        history_repo.upsert_period(record).await?;
        touched += 1;
    }

    Ok(touched)
}

/// Purge history older than `history_periods_to_keep` relative to
/// today's period.
pub async fn purge_expired<S: RepositoryFactory>(ctx: &Context<S>, sku: &Sku) -> AsrResult<u64> {
    let today = ctx.clock.today();
    let current = crate::calendar::period_for_date(today, sku.periodicity);
    let periods_per_year = sku.periodicity.periods_per_year() as i32;
    let keep = ctx.cfg.history_periods_to_keep as i32;

    let mut year = current.year;
    let mut period_number = current.period_number as i32 - keep;
    while period_number < 1 {
        period_number += periods_per_year;
        year -= 1;
    }

    let purged = ctx
        .store
        .history_repository()
        .purge_before(sku.id, year, period_number as u32)
        .await?;
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::AsrConfig;
    use crate::models::SkuBuilder;
    use crate::repository::memory::MemoryRepositoryFactory;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn ctx() -> Context<MemoryRepositoryFactory> {
        let now = Utc.with_ymd_and_hms(2026, 7, 26, 0, 0, 0).unwrap();
        Context::new(AsrConfig::default(), MemoryRepositoryFactory::new(), Arc::new(FixedClock(now)))
    }

    #[tokio::test]
    async fn backfill_sets_lost_sales_from_oos_days() {
        let ctx = ctx();
        let sku = SkuBuilder::new("SKU-1", Uuid::new_v4(), Uuid::new_v4())
            .forecast_state(dec!(70), dec!(25), dec!(0.2))
            .build()
            .unwrap();
        let mut record = DemandHistoryRecord::new(sku.id, 2026, 30, dec!(50));
        record.out_of_stock_days = 2;
        ctx.store.history_repository().upsert_period(record).await.unwrap();

        let touched = backfill_lost_sales(&ctx, &sku, None).await.unwrap();
        assert_eq!(touched, 1);

        let window = read_window(&ctx, sku.id, 2026, 30, 1).await.unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].lost_sales, dec!(20));
    }

    #[tokio::test]
    async fn read_window_excludes_ignored_records() {
        let ctx = ctx();
        let sku_id = Uuid::new_v4();
        let record = DemandHistoryRecord::new(sku_id, 2026, 30, dec!(50));
        ctx.store.history_repository().upsert_period(record).await.unwrap();
        ctx.store.history_repository().set_ignored(sku_id, 2026, 30, true).await.unwrap();

        let window = read_window(&ctx, sku_id, 2026, 30, 1).await.unwrap();
        assert!(window.is_empty());
    }
}

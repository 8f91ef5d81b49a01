//! In-memory repository implementation.
//!
//! Default backend for tests and for running the engine without a
//! durable store wired in. All data is stored in `Arc<RwLock<HashMap<>>>`
//! for thread safety.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::models::{
    BuyerClass, DemandHistoryRecord, ExceptionRecord, ExceptionType, Order, OrderStatus,
    SeasonalProfile, Sku, SystemClass, Vendor,
};

use super::traits::{
    ExceptionFilters, ExceptionRepository, HistoryRepository, OrderFilters, OrderRepository,
    RepositoryFactory, SeasonalProfileFilters, SeasonalProfileRepository, SkuFilters,
    SkuRepository, VendorFilters, VendorRepository,
};
use super::{Repository, RepositoryError, RepositoryResult, SearchResult, SearchableRepository};

type Storage<T> = Arc<RwLock<HashMap<Uuid, T>>>;

fn read_lock<T>(storage: &Storage<T>) -> RepositoryResult<std::sync::RwLockReadGuard<'_, HashMap<Uuid, T>>> {
    storage.read().map_err(|_| RepositoryError::internal("failed to acquire read lock"))
}

fn write_lock<T>(storage: &Storage<T>) -> RepositoryResult<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, T>>> {
    storage.write().map_err(|_| RepositoryError::internal("failed to acquire write lock"))
}

fn paginate<T: Clone>(mut items: Vec<T>, offset: Option<u64>, limit: Option<u64>) -> Vec<T> {
    let offset = offset.unwrap_or(0) as usize;
    let limit = limit.unwrap_or(1000) as usize;
    if offset >= items.len() {
        return Vec::new();
    }
    items.drain(0..offset);
    items.truncate(limit);
    items
}

/// In-memory factory vending one repository per entity, all backed by
/// the same shared maps.
pub struct MemoryRepositoryFactory {
    pub skus: Storage<Sku>,
    pub vendors: Storage<Vendor>,
    pub history: Arc<RwLock<HashMap<(Uuid, i32, u32), DemandHistoryRecord>>>,
    pub seasonal_profiles: Storage<SeasonalProfile>,
    pub orders: Storage<Order>,
    pub exceptions: Storage<ExceptionRecord>,
}

impl MemoryRepositoryFactory {
    pub fn new() -> Self {
        Self {
            skus: Arc::new(RwLock::new(HashMap::new())),
            vendors: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(HashMap::new())),
            seasonal_profiles: Arc::new(RwLock::new(HashMap::new())),
            orders: Arc::new(RwLock::new(HashMap::new())),
            exceptions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn clear_all(&self) {
        self.skus.write().unwrap().clear();
        self.vendors.write().unwrap().clear();
        self.history.write().unwrap().clear();
        self.seasonal_profiles.write().unwrap().clear();
        self.orders.write().unwrap().clear();
        self.exceptions.write().unwrap().clear();
    }

    pub fn sku_repository(&self) -> MemorySkuRepository {
        MemorySkuRepository::new(self.skus.clone())
    }

    pub fn vendor_repository(&self) -> MemoryVendorRepository {
        MemoryVendorRepository::new(self.vendors.clone())
    }

    pub fn history_repository(&self) -> MemoryHistoryRepository {
        MemoryHistoryRepository::new(self.history.clone())
    }

    pub fn seasonal_profile_repository(&self) -> MemorySeasonalProfileRepository {
        MemorySeasonalProfileRepository::new(self.seasonal_profiles.clone())
    }

    pub fn order_repository(&self) -> MemoryOrderRepository {
        MemoryOrderRepository::new(self.orders.clone())
    }

    pub fn exception_repository(&self) -> MemoryExceptionRepository {
        MemoryExceptionRepository::new(self.exceptions.clone())
    }
}

impl Default for MemoryRepositoryFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryFactory for MemoryRepositoryFactory {
    type SkuRepo = MemorySkuRepository;
    type VendorRepo = MemoryVendorRepository;
    type HistoryRepo = MemoryHistoryRepository;
    type SeasonalProfileRepo = MemorySeasonalProfileRepository;
    type OrderRepo = MemoryOrderRepository;
    type ExceptionRepo = MemoryExceptionRepository;

    fn sku_repository(&self) -> Self::SkuRepo {
        MemoryRepositoryFactory::sku_repository(self)
    }

    fn vendor_repository(&self) -> Self::VendorRepo {
        MemoryRepositoryFactory::vendor_repository(self)
    }

    fn history_repository(&self) -> Self::HistoryRepo {
        MemoryRepositoryFactory::history_repository(self)
    }

    fn seasonal_profile_repository(&self) -> Self::SeasonalProfileRepo {
        MemoryRepositoryFactory::seasonal_profile_repository(self)
    }

    fn order_repository(&self) -> Self::OrderRepo {
        MemoryRepositoryFactory::order_repository(self)
    }

    fn exception_repository(&self) -> Self::ExceptionRepo {
        MemoryRepositoryFactory::exception_repository(self)
    }
}

macro_rules! impl_basic_repository {
    ($repo:ty, $entity:ty, $key_field:ident) => {
        #[async_trait]
        impl Repository<$entity> for $repo {
            async fn create(&self, entity: &$entity) -> RepositoryResult<$entity> {
                let mut storage = write_lock(&self.storage)?;
                if storage.contains_key(&entity.id) {
                    return Err(RepositoryError::duplicate(stringify!($entity), entity.id.to_string()));
                }
                storage.insert(entity.id, entity.clone());
                Ok(entity.clone())
            }

            async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<$entity>> {
                let storage = read_lock(&self.storage)?;
                Ok(storage.get(&id).cloned())
            }

            async fn update(&self, entity: &$entity) -> RepositoryResult<$entity> {
                let mut storage = write_lock(&self.storage)?;
                if !storage.contains_key(&entity.id) {
                    return Err(RepositoryError::not_found(stringify!($entity), entity.id.to_string()));
                }
                storage.insert(entity.id, entity.clone());
                Ok(entity.clone())
            }

            async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
                let mut storage = write_lock(&self.storage)?;
                Ok(storage.remove(&id).is_some())
            }

            async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
                let storage = read_lock(&self.storage)?;
                Ok(storage.contains_key(&id))
            }

            async fn get_all(&self, offset: Option<u64>, limit: Option<u64>) -> RepositoryResult<Vec<$entity>> {
                let storage = read_lock(&self.storage)?;
                let mut items: Vec<$entity> = storage.values().cloned().collect();
                items.sort_by_key(|item| item.$key_field);
                Ok(paginate(items, offset, limit))
            }

            async fn count(&self) -> RepositoryResult<u64> {
                let storage = read_lock(&self.storage)?;
                Ok(storage.len() as u64)
            }
        }
    };
}

/// SKU repository.
pub struct MemorySkuRepository {
    storage: Storage<Sku>,
}

impl MemorySkuRepository {
    pub fn new(storage: Storage<Sku>) -> Self {
        Self { storage }
    }
}

impl_basic_repository!(MemorySkuRepository, Sku, id);

#[async_trait]
impl SearchableRepository<Sku, SkuFilters> for MemorySkuRepository {
    async fn search(&self, filters: SkuFilters) -> RepositoryResult<Vec<Sku>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|sku| filters.warehouse_id.map_or(true, |w| sku.warehouse_id == w))
            .filter(|sku| filters.vendor_id.map_or(true, |v| sku.vendor_id == v))
            .filter(|sku| filters.sku_id.as_ref().map_or(true, |n| &sku.sku_id == n))
            .filter(|sku| filters.system_class.map_or(true, |c| sku.system_class == c))
            .filter(|sku| filters.buyer_class.map_or(true, |c| sku.buyer_class == c))
            .filter(|sku| filters.is_active.map_or(true, |a| sku.is_active() == a))
            .filter(|sku| filters.is_seasonal.map_or(true, |s| sku.seasonal_profile_id.is_some() == s))
            .cloned()
            .collect())
    }

    async fn search_paginated(
        &self,
        filters: SkuFilters,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> RepositoryResult<SearchResult<Sku>> {
        let all = self.search(filters).await?;
        let total = all.len() as u64;
        let items = paginate(all, offset, limit);
        Ok(SearchResult::new(items, total, offset.unwrap_or(0), limit.unwrap_or(1000)))
    }

    async fn count_filtered(&self, filters: SkuFilters) -> RepositoryResult<u64> {
        Ok(self.search(filters).await?.len() as u64)
    }
}

#[async_trait]
impl SkuRepository for MemorySkuRepository {
    async fn get_by_sku_id(&self, warehouse_id: Uuid, sku_id: &str) -> RepositoryResult<Option<Sku>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .find(|sku| sku.warehouse_id == warehouse_id && sku.sku_id == sku_id)
            .cloned())
    }

    async fn get_by_vendor(&self, vendor_id: Uuid) -> RepositoryResult<Vec<Sku>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage.values().filter(|sku| sku.vendor_id == vendor_id).cloned().collect())
    }

    async fn get_by_buyer_class(&self, warehouse_id: Uuid, buyer_class: BuyerClass) -> RepositoryResult<Vec<Sku>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|sku| sku.warehouse_id == warehouse_id && sku.buyer_class == buyer_class)
            .cloned()
            .collect())
    }

    async fn get_due_for_processing(&self, warehouse_id: Uuid, as_of: NaiveDate) -> RepositoryResult<Vec<Sku>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|sku| sku.warehouse_id == warehouse_id && sku.is_active())
            .filter(|sku| sku.next_review_date.map_or(true, |d| d <= as_of))
            .cloned()
            .collect())
    }

    async fn adjust_on_hand(&self, sku_id: Uuid, delta: Decimal) -> RepositoryResult<()> {
        let mut storage = write_lock(&self.storage)?;
        let sku = storage
            .get_mut(&sku_id)
            .ok_or_else(|| RepositoryError::not_found("Sku", sku_id.to_string()))?;
        sku.on_hand += delta;
        Ok(())
    }
}

/// Vendor repository.
pub struct MemoryVendorRepository {
    storage: Storage<Vendor>,
}

impl MemoryVendorRepository {
    pub fn new(storage: Storage<Vendor>) -> Self {
        Self { storage }
    }
}

impl_basic_repository!(MemoryVendorRepository, Vendor, id);

#[async_trait]
impl SearchableRepository<Vendor, VendorFilters> for MemoryVendorRepository {
    async fn search(&self, filters: VendorFilters) -> RepositoryResult<Vec<Vendor>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|v| filters.warehouse_id.map_or(true, |w| v.warehouse_id == w))
            .filter(|v| filters.vendor_number.as_ref().map_or(true, |n| &v.vendor_id == n))
            .cloned()
            .collect())
    }

    async fn search_paginated(
        &self,
        filters: VendorFilters,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> RepositoryResult<SearchResult<Vendor>> {
        let all = self.search(filters).await?;
        let total = all.len() as u64;
        let items = paginate(all, offset, limit);
        Ok(SearchResult::new(items, total, offset.unwrap_or(0), limit.unwrap_or(1000)))
    }

    async fn count_filtered(&self, filters: VendorFilters) -> RepositoryResult<u64> {
        Ok(self.search(filters).await?.len() as u64)
    }
}

#[async_trait]
impl VendorRepository for MemoryVendorRepository {
    async fn get_by_vendor_number(&self, warehouse_id: Uuid, vendor_number: &str) -> RepositoryResult<Option<Vendor>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .find(|v| v.warehouse_id == warehouse_id && v.vendor_id == vendor_number)
            .cloned())
    }

    async fn get_due_for_rebuild(&self, today: NaiveDate) -> RepositoryResult<Vec<Vendor>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|v| v.rebuild_policy.rebuilds_automatically() && v.matches_schedule(today))
            .cloned()
            .collect())
    }

    async fn set_current_bracket(&self, vendor_id: Uuid, bracket_number: Option<u32>) -> RepositoryResult<()> {
        let mut storage = write_lock(&self.storage)?;
        let vendor = storage
            .get_mut(&vendor_id)
            .ok_or_else(|| RepositoryError::not_found("Vendor", vendor_id.to_string()))?;
        vendor.current_bracket = bracket_number;
        Ok(())
    }
}

/// History repository. Keyed by (sku_id, year, period_number) rather
/// than a surrogate id, matching how the History Store is addressed.
pub struct MemoryHistoryRepository {
    storage: Arc<RwLock<HashMap<(Uuid, i32, u32), DemandHistoryRecord>>>,
}

impl MemoryHistoryRepository {
    pub fn new(storage: Arc<RwLock<HashMap<(Uuid, i32, u32), DemandHistoryRecord>>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl HistoryRepository for MemoryHistoryRepository {
    async fn upsert_period(&self, record: DemandHistoryRecord) -> RepositoryResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| RepositoryError::internal("failed to acquire write lock"))?;
        storage.insert(record.key(), record);
        Ok(())
    }

    async fn read_window(
        &self,
        sku_id: Uuid,
        year: i32,
        period_number: u32,
        periods: u32,
    ) -> RepositoryResult<Vec<DemandHistoryRecord>> {
        let storage = self
            .storage
            .read()
            .map_err(|_| RepositoryError::internal("failed to acquire read lock"))?;
        let mut matching: Vec<DemandHistoryRecord> = storage
            .values()
            .filter(|r| r.sku_id == sku_id && (r.period_year, r.period_number) <= (year, period_number))
            .cloned()
            .collect();
        matching.sort_by_key(|r| (r.period_year, r.period_number));
        let start = matching.len().saturating_sub(periods as usize);
        Ok(matching.split_off(start))
    }

    async fn set_ignored(&self, sku_id: Uuid, year: i32, period_number: u32, ignored: bool) -> RepositoryResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| RepositoryError::internal("failed to acquire write lock"))?;
        let record = storage
            .get_mut(&(sku_id, year, period_number))
            .ok_or_else(|| RepositoryError::not_found("DemandHistoryRecord", format!("{sku_id}/{year}/{period_number}")))?;
        record.is_ignored = ignored;
        Ok(())
    }

    async fn copy_scaled(&self, from_sku_id: Uuid, to_sku_id: Uuid, factor: Decimal) -> RepositoryResult<u64> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| RepositoryError::internal("failed to acquire write lock"))?;
        let source: Vec<DemandHistoryRecord> =
            storage.values().filter(|r| r.sku_id == from_sku_id).cloned().collect();
        let count = source.len() as u64;
        for mut record in source {
            record.sku_id = to_sku_id;
            record.shipped *= factor;
            record.lost_sales *= factor;
            record.promotional_demand *= factor;
            record.recompute_total();
            storage.insert(record.key(), record);
        }
        Ok(count)
    }

    async fn purge_before(&self, sku_id: Uuid, year: i32, period_number: u32) -> RepositoryResult<u64> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| RepositoryError::internal("failed to acquire write lock"))?;
        let before: Vec<(Uuid, i32, u32)> = storage
            .keys()
            .filter(|(sid, y, p)| *sid == sku_id && (*y, *p) < (year, period_number))
            .cloned()
            .collect();
        let count = before.len() as u64;
        for key in before {
            storage.remove(&key);
        }
        Ok(count)
    }
}

/// Seasonal profile repository.
pub struct MemorySeasonalProfileRepository {
    storage: Storage<SeasonalProfile>,
}

impl MemorySeasonalProfileRepository {
    pub fn new(storage: Storage<SeasonalProfile>) -> Self {
        Self { storage }
    }
}

impl_basic_repository!(MemorySeasonalProfileRepository, SeasonalProfile, id);

#[async_trait]
impl SearchableRepository<SeasonalProfile, SeasonalProfileFilters> for MemorySeasonalProfileRepository {
    async fn search(&self, filters: SeasonalProfileFilters) -> RepositoryResult<Vec<SeasonalProfile>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|p| filters.name.as_ref().map_or(true, |n| &p.name == n))
            .filter(|p| filters.periodicity.map_or(true, |per| p.periodicity == per))
            .cloned()
            .collect())
    }

    async fn search_paginated(
        &self,
        filters: SeasonalProfileFilters,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> RepositoryResult<SearchResult<SeasonalProfile>> {
        let all = self.search(filters).await?;
        let total = all.len() as u64;
        let items = paginate(all, offset, limit);
        Ok(SearchResult::new(items, total, offset.unwrap_or(0), limit.unwrap_or(1000)))
    }

    async fn count_filtered(&self, filters: SeasonalProfileFilters) -> RepositoryResult<u64> {
        Ok(self.search(filters).await?.len() as u64)
    }
}

#[async_trait]
impl SeasonalProfileRepository for MemorySeasonalProfileRepository {
    async fn get_by_name(&self, name: &str) -> RepositoryResult<Option<SeasonalProfile>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage.values().find(|p| p.name == name).cloned())
    }
}

/// Order repository.
pub struct MemoryOrderRepository {
    storage: Storage<Order>,
}

impl MemoryOrderRepository {
    pub fn new(storage: Storage<Order>) -> Self {
        Self { storage }
    }
}

impl_basic_repository!(MemoryOrderRepository, Order, id);

#[async_trait]
impl SearchableRepository<Order, OrderFilters> for MemoryOrderRepository {
    async fn search(&self, filters: OrderFilters) -> RepositoryResult<Vec<Order>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|o| filters.vendor_id.map_or(true, |v| o.vendor_id == v))
            .filter(|o| filters.warehouse_id.map_or(true, |w| o.warehouse_id == w))
            .filter(|o| filters.status.map_or(true, |s| o.status == s))
            .filter(|o| filters.order_date_range.map_or(true, |(start, end)| o.order_date >= start && o.order_date <= end))
            .cloned()
            .collect())
    }

    async fn search_paginated(
        &self,
        filters: OrderFilters,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> RepositoryResult<SearchResult<Order>> {
        let all = self.search(filters).await?;
        let total = all.len() as u64;
        let items = paginate(all, offset, limit);
        Ok(SearchResult::new(items, total, offset.unwrap_or(0), limit.unwrap_or(1000)))
    }

    async fn count_filtered(&self, filters: OrderFilters) -> RepositoryResult<u64> {
        Ok(self.search(filters).await?.len() as u64)
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn get_by_vendor(&self, vendor_id: Uuid) -> RepositoryResult<Vec<Order>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage.values().filter(|o| o.vendor_id == vendor_id).cloned().collect())
    }

    async fn get_by_status(&self, warehouse_id: Uuid, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|o| o.warehouse_id == warehouse_id && o.status == status)
            .cloned()
            .collect())
    }

    async fn set_status(&self, order_id: Uuid, status: OrderStatus) -> RepositoryResult<()> {
        let mut storage = write_lock(&self.storage)?;
        let order = storage
            .get_mut(&order_id)
            .ok_or_else(|| RepositoryError::not_found("Order", order_id.to_string()))?;
        if !order.status.can_transition_to(status) {
            return Err(RepositoryError::invalid_operation(format!(
                "cannot transition order from {:?} to {:?}",
                order.status, status
            )));
        }
        order.status = status;
        Ok(())
    }
}

/// Exception repository.
pub struct MemoryExceptionRepository {
    storage: Storage<ExceptionRecord>,
}

impl MemoryExceptionRepository {
    pub fn new(storage: Storage<ExceptionRecord>) -> Self {
        Self { storage }
    }
}

impl_basic_repository!(MemoryExceptionRepository, ExceptionRecord, id);

#[async_trait]
impl SearchableRepository<ExceptionRecord, ExceptionFilters> for MemoryExceptionRepository {
    async fn search(&self, filters: ExceptionFilters) -> RepositoryResult<Vec<ExceptionRecord>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|e| filters.sku_id.map_or(true, |s| e.sku_id == s))
            .filter(|e| filters.warehouse_id.map_or(true, |w| e.warehouse_id == w))
            .filter(|e| filters.exception_type.map_or(true, |t| e.exception_type == t))
            .filter(|e| filters.is_acknowledged.map_or(true, |a| e.is_acknowledged == a))
            .cloned()
            .collect())
    }

    async fn search_paginated(
        &self,
        filters: ExceptionFilters,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> RepositoryResult<SearchResult<ExceptionRecord>> {
        let all = self.search(filters).await?;
        let total = all.len() as u64;
        let items = paginate(all, offset, limit);
        Ok(SearchResult::new(items, total, offset.unwrap_or(0), limit.unwrap_or(1000)))
    }

    async fn count_filtered(&self, filters: ExceptionFilters) -> RepositoryResult<u64> {
        Ok(self.search(filters).await?.len() as u64)
    }
}

#[async_trait]
impl ExceptionRepository for MemoryExceptionRepository {
    async fn get_unacknowledged(&self, warehouse_id: Uuid) -> RepositoryResult<Vec<ExceptionRecord>> {
        let storage = read_lock(&self.storage)?;
        Ok(storage
            .values()
            .filter(|e| e.warehouse_id == warehouse_id && !e.is_acknowledged)
            .cloned()
            .collect())
    }

    async fn acknowledge(&self, exception_id: Uuid) -> RepositoryResult<()> {
        let mut storage = write_lock(&self.storage)?;
        let exception = storage
            .get_mut(&exception_id)
            .ok_or_else(|| RepositoryError::not_found("ExceptionRecord", exception_id.to_string()))?;
        exception.acknowledge(chrono::Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkuBuilder;
    use rust_decimal_macros::dec;

    fn sample_sku(warehouse_id: Uuid, vendor_id: Uuid) -> Sku {
        SkuBuilder::new("SKU-1", warehouse_id, vendor_id).build().unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let factory = MemoryRepositoryFactory::new();
        let repo = factory.sku_repository();
        let sku = sample_sku(Uuid::new_v4(), Uuid::new_v4());
        repo.create(&sku).await.unwrap();
        let fetched = repo.get_by_id(sku.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, sku.id);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let factory = MemoryRepositoryFactory::new();
        let repo = factory.sku_repository();
        let sku = sample_sku(Uuid::new_v4(), Uuid::new_v4());
        repo.create(&sku).await.unwrap();
        assert!(repo.create(&sku).await.is_err());
    }

    #[tokio::test]
    async fn history_window_returns_trailing_periods_oldest_first() {
        let factory = MemoryRepositoryFactory::new();
        let repo = factory.history_repository();
        let sku_id = Uuid::new_v4();
        for period in 1..=5u32 {
            let record = DemandHistoryRecord::new(sku_id, 2026, period, dec!(10));
            repo.upsert_period(record).await.unwrap();
        }
        let window = repo.read_window(sku_id, 2026, 5, 3).await.unwrap();
        let periods: Vec<u32> = window.iter().map(|r| r.period_number).collect();
        assert_eq!(periods, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn order_status_transition_rejects_illegal_jump() {
        let factory = MemoryRepositoryFactory::new();
        let repo = factory.order_repository();
        let order = Order::new(Uuid::new_v4(), Uuid::new_v4(), chrono::Utc::now().date_naive());
        repo.create(&order).await.unwrap();
        let result = repo.set_status(order.id, OrderStatus::Received).await;
        assert!(result.is_err());
    }
}

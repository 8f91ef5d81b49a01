//! Repository trait definitions.
//!
//! One trait and one filter struct per domain entity, following the same
//! shape regardless of entity: a `SearchableRepository` supertrait plus
//! whatever bespoke accessors the entity's component needs. The history
//! repository carries the History Store's own read/write surface instead
//! of generic CRUD, since C2 addresses records by (sku, period) rather
//! than by id.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{
    BuyerClass, DemandHistoryRecord, ExceptionRecord, ExceptionType, Order, OrderStatus,
    SeasonalProfile, Sku, SystemClass, Vendor,
};

use super::{RepositoryResult, SearchableRepository};

/// SKU repository trait.
#[async_trait]
pub trait SkuRepository: SearchableRepository<Sku, SkuFilters> + Send + Sync {
    async fn get_by_sku_id(&self, warehouse_id: Uuid, sku_id: &str) -> RepositoryResult<Option<Sku>>;

    async fn get_by_vendor(&self, vendor_id: Uuid) -> RepositoryResult<Vec<Sku>>;

    async fn get_by_buyer_class(&self, warehouse_id: Uuid, buyer_class: BuyerClass) -> RepositoryResult<Vec<Sku>>;

    /// SKUs due for a nightly reforecast/order-check run in this warehouse.
    async fn get_due_for_processing(&self, warehouse_id: Uuid, as_of: NaiveDate) -> RepositoryResult<Vec<Sku>>;

    async fn adjust_on_hand(&self, sku_id: Uuid, delta: Decimal) -> RepositoryResult<()>;
}

/// SKU search filters.
#[derive(Debug, Clone, Default)]
pub struct SkuFilters {
    pub warehouse_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub sku_id: Option<String>,
    pub system_class: Option<SystemClass>,
    pub buyer_class: Option<BuyerClass>,
    pub is_active: Option<bool>,
    pub is_seasonal: Option<bool>,
}

/// Vendor repository trait.
#[async_trait]
pub trait VendorRepository: SearchableRepository<Vendor, VendorFilters> + Send + Sync {
    async fn get_by_vendor_number(&self, warehouse_id: Uuid, vendor_number: &str) -> RepositoryResult<Option<Vendor>>;

    /// Vendors whose order schedule matches `today` and who rebuild
    /// brackets/orders automatically.
    async fn get_due_for_rebuild(&self, today: NaiveDate) -> RepositoryResult<Vec<Vendor>>;

    async fn set_current_bracket(&self, vendor_id: Uuid, bracket_number: Option<u32>) -> RepositoryResult<()>;
}

/// Vendor search filters.
#[derive(Debug, Clone, Default)]
pub struct VendorFilters {
    pub warehouse_id: Option<Uuid>,
    pub vendor_number: Option<String>,
}

/// History repository trait. Addresses records by (sku, year, period)
/// rather than by a surrogate id, mirroring the History Store's own
/// addressing scheme.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Upsert a single period's record.
    async fn upsert_period(&self, record: DemandHistoryRecord) -> RepositoryResult<()>;

    /// Read a trailing window of `periods` records ending at
    /// `(year, period_number)` inclusive, oldest first.
    async fn read_window(
        &self,
        sku_id: Uuid,
        year: i32,
        period_number: u32,
        periods: u32,
    ) -> RepositoryResult<Vec<DemandHistoryRecord>>;

    async fn set_ignored(&self, sku_id: Uuid, year: i32, period_number: u32, ignored: bool) -> RepositoryResult<()>;

    /// Copy one SKU's history onto another, scaled by `factor` (used when
    /// seeding a new SKU from an analog).
    async fn copy_scaled(&self, from_sku_id: Uuid, to_sku_id: Uuid, factor: Decimal) -> RepositoryResult<u64>;

    /// Purge records strictly older than `(year, period_number)`.
    async fn purge_before(&self, sku_id: Uuid, year: i32, period_number: u32) -> RepositoryResult<u64>;
}

/// Seasonal profile repository trait.
#[async_trait]
pub trait SeasonalProfileRepository: SearchableRepository<SeasonalProfile, SeasonalProfileFilters> + Send + Sync {
    async fn get_by_name(&self, name: &str) -> RepositoryResult<Option<SeasonalProfile>>;
}

/// Seasonal profile search filters.
#[derive(Debug, Clone, Default)]
pub struct SeasonalProfileFilters {
    pub name: Option<String>,
    pub periodicity: Option<u32>,
}

/// Order repository trait.
#[async_trait]
pub trait OrderRepository: SearchableRepository<Order, OrderFilters> + Send + Sync {
    async fn get_by_vendor(&self, vendor_id: Uuid) -> RepositoryResult<Vec<Order>>;

    async fn get_by_status(&self, warehouse_id: Uuid, status: OrderStatus) -> RepositoryResult<Vec<Order>>;

    async fn set_status(&self, order_id: Uuid, status: OrderStatus) -> RepositoryResult<()>;
}

/// Order search filters.
#[derive(Debug, Clone, Default)]
pub struct OrderFilters {
    pub vendor_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub order_date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Exception repository trait.
#[async_trait]
pub trait ExceptionRepository: SearchableRepository<ExceptionRecord, ExceptionFilters> + Send + Sync {
    async fn get_unacknowledged(&self, warehouse_id: Uuid) -> RepositoryResult<Vec<ExceptionRecord>>;

    async fn acknowledge(&self, exception_id: Uuid) -> RepositoryResult<()>;
}

/// Exception search filters.
#[derive(Debug, Clone, Default)]
pub struct ExceptionFilters {
    pub sku_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub exception_type: Option<ExceptionType>,
    pub is_acknowledged: Option<bool>,
}

/// Repository factory trait for creating repository instances.
///
/// Accessors return owned handles rather than references: every
/// implementation (starting with `MemoryRepositoryFactory`) hands back a
/// thin wrapper around a shared `Arc`, cheap enough to construct per
/// call and simpler for a `Context<S>` to hold without borrow-checker
/// friction against its own fields.
pub trait RepositoryFactory: Send + Sync {
    type SkuRepo: SkuRepository;
    type VendorRepo: VendorRepository;
    type HistoryRepo: HistoryRepository;
    type SeasonalProfileRepo: SeasonalProfileRepository;
    type OrderRepo: OrderRepository;
    type ExceptionRepo: ExceptionRepository;

    fn sku_repository(&self) -> Self::SkuRepo;
    fn vendor_repository(&self) -> Self::VendorRepo;
    fn history_repository(&self) -> Self::HistoryRepo;
    fn seasonal_profile_repository(&self) -> Self::SeasonalProfileRepo;
    fn order_repository(&self) -> Self::OrderRepo;
    fn exception_repository(&self) -> Self::ExceptionRepo;
}

/// Configuration for repository connections.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub connection_string: String,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
    pub query_timeout_seconds: u64,
    pub enable_logging: bool,
    pub options: HashMap<String, String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            connection_string: "memory://default".to_string(),
            max_connections: 10,
            connection_timeout_seconds: 30,
            query_timeout_seconds: 60,
            enable_logging: false,
            options: HashMap::new(),
        }
    }
}

impl RepositoryConfig {
    /// Create in-memory config for testing.
    pub fn memory() -> Self {
        Self {
            connection_string: "memory://test".to_string(),
            max_connections: 1,
            connection_timeout_seconds: 1,
            query_timeout_seconds: 10,
            enable_logging: false,
            options: HashMap::new(),
        }
    }
}

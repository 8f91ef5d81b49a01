//! Domain models for the ASR engine.
//!
//! These are the entities named in the data model: SKUs, vendors and
//! their brackets, demand history, seasonal profiles, orders, and
//! exception records. SKU↔Vendor and SKU↔SeasonalProfile relationships
//! are modeled as id references resolved through the store, never as
//! object pointers, so transaction boundaries stay per-entity.

pub mod sku;
pub mod vendor;
pub mod history;
pub mod seasonality;
pub mod order;
pub mod exception;

pub use sku::{BuyerClass, ForecastMethod, Periodicity, Sku, SkuBuilder, SsType, SystemClass};
pub use vendor::{Bracket, BracketUnit, RebuildPolicy, Vendor, VendorBuilder};
pub use history::{DemandHistoryRecord, DemandHistoryRecordBuilder};
pub use seasonality::SeasonalProfile;
pub use order::{Order, OrderCheckCounts, OrderLine, OrderStatus};
pub use exception::{ExceptionRecord, ExceptionType};

/// Common, entity-agnostic conveniences shared across the model layer.
pub mod common {
    use chrono::{DateTime, Utc};

    /// Lightweight audit trail, stamped the same way on every entity
    /// that needs one (SKU, Vendor, Order).
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct AuditInfo {
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub version: i64,
    }

    impl AuditInfo {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self { created_at: now, updated_at: now, version: 1 }
        }

        pub fn touch(&mut self, now: DateTime<Utc>) {
            self.updated_at = now;
            self.version += 1;
        }
    }
}

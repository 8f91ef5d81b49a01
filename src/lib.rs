//! Automated stock replenishment engine.
//!
//! Given a SKU's stock position, demand history, and a vendor's terms,
//! this crate forecasts demand, sizes safety stock and order points,
//! and decides what (if anything) is due to be ordered tonight. The
//! ten components are organized as mostly pure, I/O-free modules; the
//! only places that touch storage are [`history`] (lost-sales backfill
//! and retention) and [`orchestrator`], which drives every other
//! component across a warehouse's SKUs and vendors.
//!
//! Callers bring their own [`repository::RepositoryFactory`]
//! implementation (an in-memory one lives at [`repository::memory`]
//! for tests) and assemble a [`context::Context`] from it, a
//! [`config::AsrConfig`], and a [`clock::Clock`]:
//!
//! ```
//! use asr_engine::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> AsrResult<()> {
//! let ctx = Context::new(
//!     AsrConfig::default(),
//!     MemoryRepositoryFactory::new(),
//!     Arc::new(SystemClock),
//! );
//!
//! let stats = orchestrator::run_nightly(&ctx).await?;
//! println!("{} of {} SKUs/vendors processed cleanly", stats.succeeded, stats.processed);
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod clock;
pub mod config;
pub mod context;
pub mod errors;
pub mod exception_detector;
pub mod forecast;
pub mod history;
pub mod leadtime;
pub mod models;
pub mod order_builder;
pub mod order_policy;
pub mod orchestrator;
pub mod repository;
pub mod safety_stock;
pub mod seasonality;
pub mod stats;

/// Everything a caller needs to wire up and drive the engine, in one import.
pub mod prelude {
    pub use crate::calendar::{self, PeriodKey};
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::AsrConfig;
    pub use crate::context::Context;
    pub use crate::errors::{AsrError, AsrResult};
    pub use crate::models::{
        Bracket, BracketUnit, BuyerClass, DemandHistoryRecord, ExceptionRecord, ExceptionType,
        ForecastMethod, Order, OrderCheckCounts, OrderLine, OrderStatus, Periodicity,
        RebuildPolicy, SeasonalProfile, Sku, SkuBuilder, SsType, SystemClass, Vendor,
        VendorBuilder,
    };
    pub use crate::orchestrator::{self, RunStats};
    pub use crate::repository::memory::MemoryRepositoryFactory;
    pub use crate::repository::{RepositoryError, RepositoryFactory, RepositoryResult};
    pub use crate::{
        exception_detector, forecast, history, leadtime, order_builder, order_policy,
        safety_stock, seasonality,
    };
}

//! The SKU (stock-keeping unit, a.k.a. Item) entity.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use super::common::AuditInfo;

/// How a SKU is classified for buying purposes. Drives whether the
/// order builder and reforecast pipeline touch it at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum BuyerClass {
    Regular,
    Watch,
    Manual,
    Discontinued,
    Uninitialized,
}

/// System-assigned demand-pattern classification, recomputed after
/// every reforecast once a SKU has enough history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum SystemClass {
    Regular,
    Slow,
    Lumpy,
    New,
    Alternate,
    Uninitialized,
}

/// Dispatch key for which forecaster runs against this SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    RegularAvs,
    EnhancedAvs,
    DemandImport,
    Alternate,
}

/// Number of forecast periods per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub enum Periodicity {
    Twelve = 12,
    Thirteen = 13,
    FiftyTwo = 52,
}

impl Periodicity {
    pub fn periods_per_year(self) -> u32 {
        self as u32
    }
}

/// How a manual safety-stock override combines with the computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum SsType {
    Never,
    LesserOf,
    Always,
}

/// Per-SKU forecast and safety-stock state, plus the commercial and
/// stock-position fields the rest of the engine reads and writes each
/// night.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Sku {
    pub id: Uuid,
    pub sku_id: String,
    pub warehouse_id: Uuid,
    pub vendor_id: Uuid,

    pub buyer_class: BuyerClass,
    pub system_class: SystemClass,
    pub forecast_method: ForecastMethod,
    pub periodicity: Periodicity,

    pub purchase_price: Decimal,
    pub sales_price: Decimal,
    pub buying_multiple: u32,
    pub ignore_multiple: bool,
    pub minimum_quantity: Decimal,
    pub shelf_life_days: Option<u32>,

    pub on_hand: Decimal,
    pub on_order: Decimal,
    pub customer_back_order: Decimal,
    pub reserved: Decimal,
    pub quantity_held: Decimal,

    pub weekly_forecast: Decimal,
    pub period_forecast: Decimal,
    pub quarterly_forecast: Decimal,
    pub yearly_forecast: Decimal,
    pub madp: Decimal,
    pub track: Decimal,
    pub last_forecast_date: Option<NaiveDate>,
    pub freeze_until_date: Option<NaiveDate>,
    pub periods_with_zero_demand: u32,

    pub service_level_goal: Decimal,
    pub service_level_attained: Option<Decimal>,
    pub lead_time_forecast_days: Decimal,
    pub lead_time_variance_pct: Decimal,
    pub sstf_days: Decimal,
    pub item_order_point_days: Decimal,
    pub item_order_point_units: Decimal,
    pub vendor_order_point_days: Decimal,
    pub order_up_to_level_days: Decimal,
    pub order_up_to_level_units: Decimal,
    pub manual_safety_stock: Option<Decimal>,
    pub ss_type: SsType,
    pub min_presentation_stock: Decimal,
    pub outl_hard_max: Option<Decimal>,

    pub item_cycle_days: Option<u32>,
    pub seasonal_profile_id: Option<Uuid>,
    pub next_review_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub audit: AuditInfo,
}

impl Sku {
    /// `on_hand + on_order - customer_back_order - reserved - quantity_held`.
    pub fn available_balance(&self) -> Decimal {
        self.on_hand + self.on_order - self.customer_back_order - self.reserved - self.quantity_held
    }

    /// Daily demand derived from the weekly forecast.
    pub fn daily_demand(&self) -> Decimal {
        self.weekly_forecast / dec!(7)
    }

    /// Days since the SKU was created, for the 180-day maturity gate
    /// on system-class transitions.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }

    pub fn is_mature(&self, now: DateTime<Utc>) -> bool {
        self.age_days(now) >= 180
    }

    /// Reforecasting is skipped for these methods and while frozen.
    pub fn skips_reforecast(&self, today: NaiveDate) -> bool {
        matches!(self.forecast_method, ForecastMethod::DemandImport | ForecastMethod::Alternate)
            || self.freeze_until_date.map(|d| d > today).unwrap_or(false)
    }

    /// Whether the order builder should consider this SKU for a new
    /// line (back-orders still flow through even for Manual/Discontinued).
    pub fn is_order_eligible(&self) -> bool {
        matches!(self.buyer_class, BuyerClass::Regular | BuyerClass::Watch)
    }

    /// Discontinued SKUs are excluded from reforecasting and ordering
    /// but stay in the store for historical reporting.
    pub fn is_active(&self) -> bool {
        !matches!(self.buyer_class, BuyerClass::Discontinued)
    }
}

pub struct SkuBuilder {
    sku_id: String,
    warehouse_id: Uuid,
    vendor_id: Uuid,
    buyer_class: BuyerClass,
    system_class: SystemClass,
    forecast_method: ForecastMethod,
    periodicity: Periodicity,
    purchase_price: Decimal,
    sales_price: Decimal,
    buying_multiple: u32,
    ignore_multiple: bool,
    minimum_quantity: Decimal,
    shelf_life_days: Option<u32>,
    on_hand: Decimal,
    on_order: Decimal,
    customer_back_order: Decimal,
    reserved: Decimal,
    quantity_held: Decimal,
    weekly_forecast: Decimal,
    period_forecast: Decimal,
    madp: Decimal,
    track: Decimal,
    service_level_goal: Decimal,
    lead_time_forecast_days: Decimal,
    lead_time_variance_pct: Decimal,
    ss_type: SsType,
    min_presentation_stock: Decimal,
    outl_hard_max: Option<Decimal>,
    item_cycle_days: Option<u32>,
    seasonal_profile_id: Option<Uuid>,
    manual_safety_stock: Option<Decimal>,
    next_review_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl SkuBuilder {
    pub fn new(sku_id: impl Into<String>, warehouse_id: Uuid, vendor_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            sku_id: sku_id.into(),
            warehouse_id,
            vendor_id,
            buyer_class: BuyerClass::Uninitialized,
            system_class: SystemClass::Uninitialized,
            forecast_method: ForecastMethod::RegularAvs,
            periodicity: Periodicity::Thirteen,
            purchase_price: Decimal::ZERO,
            sales_price: Decimal::ZERO,
            buying_multiple: 1,
            ignore_multiple: false,
            minimum_quantity: Decimal::ZERO,
            shelf_life_days: None,
            on_hand: Decimal::ZERO,
            on_order: Decimal::ZERO,
            customer_back_order: Decimal::ZERO,
            reserved: Decimal::ZERO,
            quantity_held: Decimal::ZERO,
            weekly_forecast: Decimal::ZERO,
            period_forecast: Decimal::ZERO,
            madp: dec!(25),
            track: dec!(0.2),
            service_level_goal: dec!(95),
            lead_time_forecast_days: dec!(7),
            lead_time_variance_pct: dec!(10),
            ss_type: SsType::Never,
            min_presentation_stock: Decimal::ZERO,
            outl_hard_max: None,
            item_cycle_days: None,
            seasonal_profile_id: None,
            manual_safety_stock: None,
            next_review_date: None,
            created_at: now,
        }
    }

    pub fn buyer_class(mut self, value: BuyerClass) -> Self {
        self.buyer_class = value;
        self
    }

    pub fn forecast_method(mut self, value: ForecastMethod) -> Self {
        self.forecast_method = value;
        self
    }

    pub fn periodicity(mut self, value: Periodicity) -> Self {
        self.periodicity = value;
        self
    }

    pub fn prices(mut self, purchase_price: Decimal, sales_price: Decimal) -> Self {
        self.purchase_price = purchase_price;
        self.sales_price = sales_price;
        self
    }

    pub fn buying_multiple(mut self, value: u32) -> Self {
        self.buying_multiple = value;
        self
    }

    pub fn stock_position(
        mut self,
        on_hand: Decimal,
        on_order: Decimal,
        customer_back_order: Decimal,
        reserved: Decimal,
        quantity_held: Decimal,
    ) -> Self {
        self.on_hand = on_hand;
        self.on_order = on_order;
        self.customer_back_order = customer_back_order;
        self.reserved = reserved;
        self.quantity_held = quantity_held;
        self
    }

    pub fn forecast_state(mut self, weekly_forecast: Decimal, madp: Decimal, track: Decimal) -> Self {
        self.weekly_forecast = weekly_forecast;
        self.period_forecast = weekly_forecast * dec!(4);
        self.madp = madp;
        self.track = track;
        self
    }

    pub fn service_level_goal(mut self, value: Decimal) -> Self {
        self.service_level_goal = value;
        self
    }

    pub fn lead_time(mut self, days: Decimal, variance_pct: Decimal) -> Self {
        self.lead_time_forecast_days = days;
        self.lead_time_variance_pct = variance_pct;
        self
    }

    pub fn ss_type(mut self, value: SsType) -> Self {
        self.ss_type = value;
        self
    }

    pub fn manual_safety_stock(mut self, value: Decimal) -> Self {
        self.manual_safety_stock = Some(value);
        self
    }

    pub fn seasonal_profile(mut self, profile_id: Uuid) -> Self {
        self.seasonal_profile_id = Some(profile_id);
        self
    }

    pub fn next_review_date(mut self, value: NaiveDate) -> Self {
        self.next_review_date = Some(value);
        self
    }

    pub fn build(self) -> Result<Sku, &'static str> {
        if self.buying_multiple < 1 {
            return Err("buying_multiple must be >= 1");
        }
        if self.service_level_goal < dec!(0) || self.service_level_goal > dec!(100) {
            return Err("service_level_goal must be within [0, 100]");
        }
        let now = Utc::now();
        Ok(Sku {
            id: Uuid::new_v4(),
            sku_id: self.sku_id,
            warehouse_id: self.warehouse_id,
            vendor_id: self.vendor_id,
            buyer_class: self.buyer_class,
            system_class: self.system_class,
            forecast_method: self.forecast_method,
            periodicity: self.periodicity,
            purchase_price: self.purchase_price,
            sales_price: self.sales_price,
            buying_multiple: self.buying_multiple,
            ignore_multiple: self.ignore_multiple,
            minimum_quantity: self.minimum_quantity,
            shelf_life_days: self.shelf_life_days,
            on_hand: self.on_hand,
            on_order: self.on_order,
            customer_back_order: self.customer_back_order,
            reserved: self.reserved,
            quantity_held: self.quantity_held,
            weekly_forecast: self.weekly_forecast,
            period_forecast: self.period_forecast,
            quarterly_forecast: self.period_forecast * dec!(3),
            yearly_forecast: self.period_forecast * dec!(13),
            madp: self.madp,
            track: self.track,
            last_forecast_date: None,
            freeze_until_date: None,
            periods_with_zero_demand: 0,
            service_level_goal: self.service_level_goal,
            service_level_attained: None,
            lead_time_forecast_days: self.lead_time_forecast_days,
            lead_time_variance_pct: self.lead_time_variance_pct,
            sstf_days: Decimal::ZERO,
            item_order_point_days: Decimal::ZERO,
            item_order_point_units: Decimal::ZERO,
            vendor_order_point_days: Decimal::ZERO,
            order_up_to_level_days: Decimal::ZERO,
            order_up_to_level_units: Decimal::ZERO,
            manual_safety_stock: self.manual_safety_stock,
            ss_type: self.ss_type,
            min_presentation_stock: self.min_presentation_stock,
            outl_hard_max: self.outl_hard_max,
            item_cycle_days: self.item_cycle_days,
            seasonal_profile_id: self.seasonal_profile_id,
            next_review_date: self.next_review_date,
            created_at: self.created_at,
            audit: AuditInfo::new(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Sku {
        SkuBuilder::new("SKU-1", Uuid::new_v4(), Uuid::new_v4())
            .stock_position(dec!(100), dec!(20), dec!(5), dec!(10), dec!(2))
            .build()
            .unwrap()
    }

    #[test]
    fn available_balance_matches_invariant() {
        let sku = base();
        assert_eq!(sku.available_balance(), dec!(103));
    }

    #[test]
    fn rejects_zero_buying_multiple() {
        let err = SkuBuilder::new("SKU-2", Uuid::new_v4(), Uuid::new_v4())
            .buying_multiple(0)
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn rejects_out_of_range_service_level() {
        let err = SkuBuilder::new("SKU-3", Uuid::new_v4(), Uuid::new_v4())
            .service_level_goal(dec!(150))
            .build();
        assert!(err.is_err());
    }
}

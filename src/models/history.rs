//! Per-period demand history records (the History Store's unit of storage).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// One period's demand facts for one SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct DemandHistoryRecord {
    pub sku_id: Uuid,
    pub period_year: i32,
    pub period_number: u32,

    pub shipped: Decimal,
    pub lost_sales: Decimal,
    pub promotional_demand: Decimal,
    pub total_demand: Decimal,
    pub out_of_stock_days: u32,
    pub is_ignored: bool,
    pub is_adjusted: bool,
}

impl DemandHistoryRecord {
    pub fn new(sku_id: Uuid, period_year: i32, period_number: u32, shipped: Decimal) -> Self {
        let mut record = Self {
            sku_id,
            period_year,
            period_number,
            shipped,
            lost_sales: Decimal::ZERO,
            promotional_demand: Decimal::ZERO,
            total_demand: Decimal::ZERO,
            out_of_stock_days: 0,
            is_ignored: false,
            is_adjusted: false,
        };
        record.recompute_total();
        record
    }

    /// `total_demand = shipped + lost_sales - promotional_demand`. Any
    /// write that changes one of the three inputs must call this and
    /// flag the record adjusted.
    pub fn recompute_total(&mut self) {
        self.total_demand = self.shipped + self.lost_sales - self.promotional_demand;
    }

    pub fn set_shipped(&mut self, shipped: Decimal) {
        self.shipped = shipped;
        self.recompute_total();
        self.is_adjusted = true;
    }

    pub fn set_lost_sales(&mut self, lost_sales: Decimal) {
        self.lost_sales = lost_sales;
        self.recompute_total();
        self.is_adjusted = true;
    }

    pub fn set_promotional_demand(&mut self, promotional_demand: Decimal) {
        self.promotional_demand = promotional_demand;
        self.recompute_total();
        self.is_adjusted = true;
    }

    pub fn key(&self) -> (Uuid, i32, u32) {
        (self.sku_id, self.period_year, self.period_number)
    }
}

pub struct DemandHistoryRecordBuilder {
    record: DemandHistoryRecord,
}

impl DemandHistoryRecordBuilder {
    pub fn new(sku_id: Uuid, period_year: i32, period_number: u32) -> Self {
        Self { record: DemandHistoryRecord::new(sku_id, period_year, period_number, Decimal::ZERO) }
    }

    pub fn shipped(mut self, value: Decimal) -> Self {
        self.record.shipped = value;
        self
    }

    pub fn lost_sales(mut self, value: Decimal) -> Self {
        self.record.lost_sales = value;
        self
    }

    pub fn promotional_demand(mut self, value: Decimal) -> Self {
        self.record.promotional_demand = value;
        self
    }

    pub fn out_of_stock_days(mut self, value: u32) -> Self {
        self.record.out_of_stock_days = value;
        self
    }

    pub fn build(mut self) -> DemandHistoryRecord {
        self.record.recompute_total();
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_demand_follows_invariant() {
        let record = DemandHistoryRecordBuilder::new(Uuid::new_v4(), 2026, 3)
            .shipped(dec!(100))
            .lost_sales(dec!(10))
            .promotional_demand(dec!(5))
            .build();
        assert_eq!(record.total_demand, dec!(105));
    }

    #[test]
    fn mutation_flags_adjusted_and_recomputes() {
        let mut record = DemandHistoryRecord::new(Uuid::new_v4(), 2026, 3, dec!(50));
        assert!(!record.is_adjusted);
        record.set_lost_sales(dec!(20));
        assert!(record.is_adjusted);
        assert_eq!(record.total_demand, dec!(70));
    }
}

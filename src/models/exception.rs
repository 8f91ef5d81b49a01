//! Exception records raised by the Exception Detector (C9).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// The kind of condition an exception records. Each variant corresponds
/// to one of the detector's checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum ExceptionType {
    DemandFilterHigh,
    DemandFilterLow,
    TrackingSignalHigh,
    TrackingSignalLow,
    ServiceLevelCheck,
    InfinityCheck,
    WatchSku,
    SeasonalSku,
    NewSku,
    ManualSku,
    DiscontinuedSku,
}

impl ExceptionType {
    /// Whether this exception type blocks automatic order generation
    /// until a buyer acknowledges it.
    pub fn blocks_auto_order(self) -> bool {
        matches!(self, Self::InfinityCheck | Self::ManualSku | Self::DiscontinuedSku)
    }
}

/// One raised exception, bound to the SKU and period that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ExceptionRecord {
    pub id: Uuid,
    pub sku_id: Uuid,
    pub warehouse_id: Uuid,
    pub exception_type: ExceptionType,
    pub raised_on: NaiveDate,
    pub detail: String,
    pub observed_value: Option<Decimal>,
    pub threshold_value: Option<Decimal>,
    pub is_acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl ExceptionRecord {
    pub fn new(
        sku_id: Uuid,
        warehouse_id: Uuid,
        exception_type: ExceptionType,
        raised_on: NaiveDate,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sku_id,
            warehouse_id,
            exception_type,
            raised_on,
            detail: detail.into(),
            observed_value: None,
            threshold_value: None,
            is_acknowledged: false,
            acknowledged_at: None,
        }
    }

    pub fn with_values(mut self, observed: Decimal, threshold: Decimal) -> Self {
        self.observed_value = Some(observed);
        self.threshold_value = Some(threshold);
        self
    }

    pub fn acknowledge(&mut self, now: DateTime<Utc>) {
        self.is_acknowledged = true;
        self.acknowledged_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinity_check_blocks_auto_order() {
        assert!(ExceptionType::InfinityCheck.blocks_auto_order());
        assert!(!ExceptionType::WatchSku.blocks_auto_order());
    }

    #[test]
    fn acknowledging_sets_timestamp() {
        let mut record = ExceptionRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            ExceptionType::TrackingSignalHigh,
            NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(),
            "tracking signal exceeded limit",
        );
        assert!(!record.is_acknowledged);
        record.acknowledge(Utc::now());
        assert!(record.is_acknowledged);
        assert!(record.acknowledged_at.is_some());
    }
}

//! Purchase order and order line entities (Order Builder output).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use super::common::AuditInfo;
use super::vendor::BracketUnit;

/// Order lifecycle. Transitions are one-way except Planned/Due, which
/// is re-runnable as the is-order-due test is re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Planned,
    Due,
    Accepted,
    Received,
    Purged,
    Deactivated,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Planned, Due) | (Due, Planned) => true,
            (Planned, Accepted) | (Due, Accepted) => true,
            (Accepted, Received) | (Accepted, Purged) => true,
            (_, Deactivated) => self != Deactivated,
            _ => false,
        }
    }
}

/// Totals broken out across the four unit dimensions brackets can be
/// defined on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct UnitTotals {
    pub amount: Decimal,
    pub eaches: Decimal,
    pub weight: Decimal,
    pub volume: Decimal,
}

impl UnitTotals {
    pub fn get(&self, unit: BracketUnit) -> Decimal {
        match unit {
            BracketUnit::Amount => self.amount,
            BracketUnit::Eaches => self.eaches,
            BracketUnit::Weight => self.weight,
            BracketUnit::Volume => self.volume,
        }
    }

    pub fn add_line(&mut self, amount: Decimal, eaches: Decimal, weight: Decimal, volume: Decimal) {
        self.amount += amount;
        self.eaches += eaches;
        self.weight += weight;
        self.volume += volume;
    }
}

/// Order-check counters recorded on an order after the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct OrderCheckCounts {
    pub order_point_a: u32,
    pub order_point: u32,
    pub watch: u32,
    pub manual: u32,
    pub new: u32,
    pub uninitialized: u32,
    pub quantity: u32,
    pub shelf_life: u32,
}

/// A purchase order for one vendor/warehouse pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Order {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: OrderStatus,

    pub order_date: NaiveDate,
    pub approval_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub receipt_date: Option<NaiveDate>,

    pub current_bracket: Option<u32>,
    pub extra_days: u32,
    pub order_delay: i32,
    pub is_expedited: bool,
    pub is_delayed: bool,

    pub independent_totals: UnitTotals,
    pub auto_adjust_totals: UnitTotals,
    pub final_adjust_totals: UnitTotals,

    pub checks: OrderCheckCounts,
    pub lines: Vec<OrderLine>,

    pub audit: AuditInfo,
}

impl Order {
    pub fn new(vendor_id: Uuid, warehouse_id: Uuid, order_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            vendor_id,
            warehouse_id,
            status: OrderStatus::Planned,
            order_date,
            approval_date: None,
            expected_delivery_date: None,
            receipt_date: None,
            current_bracket: None,
            extra_days: 0,
            order_delay: 0,
            is_expedited: false,
            is_delayed: false,
            independent_totals: UnitTotals::default(),
            auto_adjust_totals: UnitTotals::default(),
            final_adjust_totals: UnitTotals::default(),
            checks: OrderCheckCounts::default(),
            lines: Vec::new(),
            audit: AuditInfo::new(now),
        }
    }

    pub fn transition_to(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), &'static str> {
        if !self.status.can_transition_to(next) {
            return Err("illegal order status transition");
        }
        self.status = next;
        self.audit.touch(now);
        Ok(())
    }
}

/// One SKU's line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct OrderLine {
    pub order_id: Uuid,
    pub sku_id: Uuid,
    pub soq_units: Decimal,
    pub soq_days: Decimal,
    pub purchase_price: Decimal,
    pub extended_amount: Decimal,
    pub item_delay: Decimal,
    pub is_frozen: bool,
    pub is_manual: bool,
    pub is_order_point_driven: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planned_to_due_and_back_is_allowed() {
        assert!(OrderStatus::Planned.can_transition_to(OrderStatus::Due));
        assert!(OrderStatus::Due.can_transition_to(OrderStatus::Planned));
    }

    #[test]
    fn received_is_terminal_except_deactivation() {
        assert!(!OrderStatus::Received.can_transition_to(OrderStatus::Planned));
        assert!(!OrderStatus::Received.can_transition_to(OrderStatus::Deactivated));
    }

    #[test]
    fn accepted_can_reach_received_or_purged() {
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::Received));
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::Purged));
    }
}

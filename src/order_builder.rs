//! Order Builder (C7): sizes each SKU's suggested order quantity,
//! classifies every line for the order's check tally, decides at the
//! vendor level whether the order is due, and performs the
//! automatic-rebuild top-up when the vendor's policy calls for it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::config::AsrConfig;
use crate::models::{
    Bracket, BracketUnit, BuyerClass, Order, OrderCheckCounts, OrderLine, OrderStatus, RebuildPolicy, Sku, SystemClass,
    Vendor,
};

/// Which check tallies a SKU's line, mirroring `OrderCheckCounts`'s
/// fields one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineReason {
    OrderPointA,
    OrderPoint,
    Watch,
    Manual,
    New,
    Uninitialized,
    Quantity,
    ShelfLife,
}

/// Classifies one SKU's line after its SOQ has been sized. Returns
/// `None` when nothing about the SKU earns it a line this run.
/// Manual/Watch/New/Uninitialized are raised for visibility even
/// though only the order-point/quantity/shelf-life checks reflect
/// actual replenishment risk.
pub fn classify_line(sku: &Sku, soq_units: Decimal, soq_days: Decimal, cfg: &AsrConfig) -> Option<LineReason> {
    if matches!(sku.buyer_class, BuyerClass::Discontinued) {
        return None;
    }
    if matches!(sku.system_class, SystemClass::Uninitialized) {
        return Some(LineReason::Uninitialized);
    }
    if matches!(sku.system_class, SystemClass::New) {
        return Some(LineReason::New);
    }
    if matches!(sku.buyer_class, BuyerClass::Manual) {
        return Some(LineReason::Manual);
    }
    if matches!(sku.buyer_class, BuyerClass::Watch) {
        return Some(LineReason::Watch);
    }

    if let Some(shelf_life_days) = sku.shelf_life_days {
        if soq_days > Decimal::from(shelf_life_days) {
            return Some(LineReason::ShelfLife);
        }
    }
    if soq_units > sku.period_forecast * dec!(6) * dec!(1.5) {
        return Some(LineReason::Quantity);
    }

    let available = sku.available_balance();
    if available <= sku.item_order_point_units {
        return Some(if sku.service_level_goal >= cfg.op_prime_limit {
            LineReason::OrderPointA
        } else {
            LineReason::OrderPoint
        });
    }

    None
}

/// Raw suggested order quantity: enough to bring available balance up
/// to the order-up-to level.
pub fn suggested_order_quantity(sku: &Sku) -> Decimal {
    (sku.order_up_to_level_units - sku.available_balance()).max(Decimal::ZERO)
}

/// Rounds a raw SOQ up to the nearest buying multiple, unless the SKU
/// ignores its multiple.
pub fn round_to_buying_multiple(raw_quantity: Decimal, buying_multiple: u32, ignore_multiple: bool) -> Decimal {
    if ignore_multiple || buying_multiple <= 1 {
        return raw_quantity.max(Decimal::ZERO);
    }
    let multiple = Decimal::from(buying_multiple);
    if raw_quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((raw_quantity / multiple).ceil()) * multiple
}

/// Per-SKU delay applied to its order line: a slow mover gets pushed
/// out by its shelf life remaining, everything else orders immediately.
pub fn item_delay(sku: &Sku) -> Decimal {
    if matches!(sku.system_class, SystemClass::Slow) {
        dec!(7)
    } else {
        Decimal::ZERO
    }
}

/// Builds one order line, or `None` if the rounded SOQ is zero and the
/// SKU isn't carried for visibility only (Manual/Watch still get a
/// zero-quantity line so a buyer sees them).
pub fn build_order_line(order_id: Uuid, sku: &Sku, soq_units: Decimal, soq_days: Decimal, reason: LineReason) -> Option<OrderLine> {
    let is_manual = matches!(reason, LineReason::Manual | LineReason::Watch);
    if soq_units == Decimal::ZERO && !is_manual {
        return None;
    }

    Some(OrderLine {
        order_id,
        sku_id: sku.id,
        soq_units,
        soq_days,
        purchase_price: sku.purchase_price,
        extended_amount: soq_units * sku.purchase_price,
        item_delay: item_delay(sku),
        is_frozen: sku.freeze_until_date.is_some(),
        is_manual,
        is_order_point_driven: matches!(reason, LineReason::OrderPointA | LineReason::OrderPoint),
    })
}

/// Tallies `OrderCheckCounts` across a vendor's order lines.
pub fn tally_checks(reasons: &[LineReason]) -> OrderCheckCounts {
    let mut counts = OrderCheckCounts::default();
    for reason in reasons {
        match reason {
            LineReason::OrderPointA => counts.order_point_a += 1,
            LineReason::OrderPoint => counts.order_point += 1,
            LineReason::Watch => counts.watch += 1,
            LineReason::Manual => counts.manual += 1,
            LineReason::New => counts.new += 1,
            LineReason::Uninitialized => counts.uninitialized += 1,
            LineReason::Quantity => counts.quantity += 1,
            LineReason::ShelfLife => counts.shelf_life += 1,
        }
    }
    counts
}

/// The vendor-level is-order-due test: the order is `Due` if any of
/// (1) a scheduled order day/week/month matches today, (2)
/// `next_order_date <= today`, (3) `order_when_minimum_met` and the
/// independent order amount already clears the current bracket's
/// minimum, or (4) the fraction of the vendor's eligible SKUs at or
/// below their vendor order point exceeds the at-risk threshold.
/// Otherwise the order stays `Planned`.
pub fn is_order_due(vendor: &Vendor, skus: &[Sku], order: &Order, cfg: &AsrConfig, today: NaiveDate) -> bool {
    if vendor.matches_schedule(today) {
        return true;
    }
    if vendor.next_order_date.map(|date| date <= today).unwrap_or(false) {
        return true;
    }
    if vendor.order_when_minimum_met {
        if let Some(bracket_number) = order.current_bracket {
            if let Some(bracket) = vendor.brackets.iter().find(|b| b.bracket_number == bracket_number) {
                if order.independent_totals.amount >= bracket.minimum {
                    return true;
                }
            }
        }
    }

    let eligible: Vec<&Sku> = skus.iter().filter(|sku| sku.is_order_eligible()).collect();
    if eligible.is_empty() {
        return false;
    }
    let at_risk = eligible.iter().filter(|sku| sku.available_balance() <= sku.vendor_order_point_days * sku.daily_demand()).count();
    let fraction = Decimal::from(at_risk as u64) / Decimal::from(eligible.len() as u64);
    fraction > cfg.order_due_risk_threshold
}

/// Automatic rebuild (vendor policy 4|5, independent amount below the
/// current bracket minimum): tops up every non-frozen, non-manual SKU
/// — including ones not originally on the order — by
/// `daily_demand * days_to_add`, rounded to its buying multiple, where
/// `days_to_add = ceil((minimum - amount) / total_daily_demand_value)`.
fn apply_automatic_rebuild(order: &mut Order, skus: &[Sku], bracket_minimum: Decimal) {
    let eligible: Vec<&Sku> =
        skus.iter().filter(|sku| sku.freeze_until_date.is_none() && !matches!(sku.buyer_class, BuyerClass::Manual)).collect();

    let total_daily_demand_value: Decimal = eligible.iter().map(|sku| sku.daily_demand() * sku.purchase_price).sum();
    let shortfall = bracket_minimum - order.auto_adjust_totals.amount;
    if total_daily_demand_value <= Decimal::ZERO || shortfall <= Decimal::ZERO {
        return;
    }

    let days_to_add = (shortfall / total_daily_demand_value).ceil();
    order.extra_days = days_to_add.to_u32().unwrap_or(0);

    for sku in eligible {
        let daily_demand = sku.daily_demand();
        if daily_demand <= Decimal::ZERO {
            continue;
        }
        let raw_extra = daily_demand * days_to_add;
        let extra_units = round_to_buying_multiple(raw_extra, sku.buying_multiple, sku.ignore_multiple);
        if extra_units <= Decimal::ZERO {
            continue;
        }
        let extra_amount = extra_units * sku.purchase_price;

        if let Some(line) = order.lines.iter_mut().find(|line| line.sku_id == sku.id) {
            line.soq_units += extra_units;
            line.extended_amount += extra_amount;
            line.soq_days = line.soq_units / daily_demand;
        } else {
            order.lines.push(OrderLine {
                order_id: order.id,
                sku_id: sku.id,
                soq_units: extra_units,
                soq_days: extra_units / daily_demand,
                purchase_price: sku.purchase_price,
                extended_amount: extra_amount,
                item_delay: item_delay(sku),
                is_frozen: false,
                is_manual: false,
                is_order_point_driven: false,
            });
        }
        order.auto_adjust_totals.add_line(extra_amount, extra_units, Decimal::ZERO, Decimal::ZERO);
    }
}

/// Builds one order for a vendor from its eligible SKUs, or `None` if
/// nothing qualifies for a line. Promotes the order to `Due` when the
/// vendor-level is-order-due test passes.
pub fn build_vendor_order(vendor: &Vendor, skus: &[Sku], cfg: &AsrConfig, today: NaiveDate, now: DateTime<Utc>) -> Option<Order> {
    let mut lines_with_reason: Vec<(&Sku, Decimal, Decimal, LineReason)> = Vec::new();
    for sku in skus.iter().filter(|sku| sku.is_order_eligible() || matches!(sku.buyer_class, BuyerClass::Manual)) {
        let raw_soq = suggested_order_quantity(sku);
        let soq_units = round_to_buying_multiple(raw_soq, sku.buying_multiple, sku.ignore_multiple);
        let soq_days = if sku.daily_demand() > Decimal::ZERO { soq_units / sku.daily_demand() } else { Decimal::ZERO };

        if let Some(reason) = classify_line(sku, soq_units, soq_days, cfg) {
            lines_with_reason.push((sku, soq_units, soq_days, reason));
        }
    }
    if lines_with_reason.is_empty() {
        return None;
    }

    let mut order = Order::new(vendor.id, vendor.warehouse_id, today);
    order.checks = tally_checks(&lines_with_reason.iter().map(|(_, _, _, reason)| *reason).collect::<Vec<_>>());

    for (sku, soq_units, soq_days, reason) in &lines_with_reason {
        if let Some(line) = build_order_line(order.id, sku, *soq_units, *soq_days, *reason) {
            order.independent_totals.add_line(line.extended_amount, line.soq_units, Decimal::ZERO, Decimal::ZERO);
            order.lines.push(line);
        }
    }
    if order.lines.is_empty() {
        return None;
    }

    let bracket: Option<Bracket> = vendor.applicable_bracket(BracketUnit::Amount, order.independent_totals.amount).cloned();
    order.current_bracket = bracket.as_ref().map(|b| b.bracket_number);
    order.auto_adjust_totals = order.independent_totals;

    if vendor.rebuild_policy.rebuilds_automatically() {
        if let Some(bracket) = &bracket {
            if order.independent_totals.amount < bracket.minimum {
                apply_automatic_rebuild(&mut order, skus, bracket.minimum);
            }
        }
    }
    order.final_adjust_totals = order.auto_adjust_totals;

    if is_order_due(vendor, skus, &order, cfg, today) {
        let _ = order.transition_to(OrderStatus::Due, now);
    }

    Some(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SkuBuilder, VendorBuilder};

    fn sku_below_order_point() -> Sku {
        SkuBuilder::new("SKU-1", Uuid::new_v4(), Uuid::new_v4())
            .buyer_class(BuyerClass::Regular)
            .stock_position(dec!(5), dec!(0), dec!(0), dec!(0), dec!(0))
            .forecast_state(dec!(70), dec!(25), dec!(0.1))
            .buying_multiple(6)
            .build()
            .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn below_order_point_is_classified_order_point_a() {
        let mut sku = sku_below_order_point();
        sku.system_class = SystemClass::Regular;
        sku.item_order_point_units = dec!(20);
        sku.order_up_to_level_units = dec!(50);
        let cfg = AsrConfig::default();
        let soq = round_to_buying_multiple(suggested_order_quantity(&sku), sku.buying_multiple, sku.ignore_multiple);
        let soq_days = soq / sku.daily_demand();
        assert_eq!(classify_line(&sku, soq, soq_days, &cfg), Some(LineReason::OrderPointA));
    }

    #[test]
    fn below_op_prime_limit_is_classified_order_point() {
        let mut sku = sku_below_order_point();
        sku.system_class = SystemClass::Regular;
        sku.item_order_point_units = dec!(20);
        sku.order_up_to_level_units = dec!(50);
        sku.service_level_goal = dec!(50);
        let mut cfg = AsrConfig::default();
        cfg.op_prime_limit = dec!(90);
        let soq = round_to_buying_multiple(suggested_order_quantity(&sku), sku.buying_multiple, sku.ignore_multiple);
        let soq_days = soq / sku.daily_demand();
        assert_eq!(classify_line(&sku, soq, soq_days, &cfg), Some(LineReason::OrderPoint));
    }

    #[test]
    fn manual_sku_is_always_classified() {
        let mut sku = sku_below_order_point();
        sku.buyer_class = BuyerClass::Manual;
        sku.system_class = SystemClass::Regular;
        let cfg = AsrConfig::default();
        assert_eq!(classify_line(&sku, Decimal::ZERO, Decimal::ZERO, &cfg), Some(LineReason::Manual));
    }

    #[test]
    fn discontinued_sku_never_gets_a_line() {
        let mut sku = sku_below_order_point();
        sku.buyer_class = BuyerClass::Discontinued;
        let cfg = AsrConfig::default();
        assert_eq!(classify_line(&sku, dec!(100), dec!(10), &cfg), None);
    }

    #[test]
    fn quantity_check_fires_when_soq_exceeds_six_months_supply() {
        let mut sku = sku_below_order_point();
        sku.system_class = SystemClass::Regular;
        sku.item_order_point_units = dec!(1);
        sku.period_forecast = dec!(10);
        let cfg = AsrConfig::default();
        // > 6 * 10 * 1.5 = 90
        assert_eq!(classify_line(&sku, dec!(100), dec!(5), &cfg), Some(LineReason::Quantity));
    }

    #[test]
    fn shelf_life_check_fires_when_soq_days_exceeds_shelf_life() {
        let mut sku = sku_below_order_point();
        sku.system_class = SystemClass::Regular;
        sku.item_order_point_units = dec!(1);
        sku.shelf_life_days = Some(10);
        let cfg = AsrConfig::default();
        assert_eq!(classify_line(&sku, dec!(20), dec!(15), &cfg), Some(LineReason::ShelfLife));
    }

    #[test]
    fn soq_rounds_up_to_buying_multiple() {
        let rounded = round_to_buying_multiple(dec!(10), 6, false);
        assert_eq!(rounded, dec!(12));
    }

    #[test]
    fn vendor_order_builds_when_a_sku_is_below_order_point() {
        let vendor = VendorBuilder::new("V1", Uuid::new_v4()).build().unwrap();
        let mut sku = sku_below_order_point();
        sku.vendor_id = vendor.id;
        sku.warehouse_id = vendor.warehouse_id;
        sku.system_class = SystemClass::Regular;
        sku.item_order_point_units = dec!(20);
        sku.order_up_to_level_units = dec!(50);
        let cfg = AsrConfig::default();
        let order = build_vendor_order(&vendor, &[sku], &cfg, NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), now());
        assert!(order.is_some());
        assert_eq!(order.unwrap().lines.len(), 1);
    }

    #[test]
    fn order_is_due_when_risk_fraction_exceeds_threshold() {
        let vendor = VendorBuilder::new("V1", Uuid::new_v4()).build().unwrap();
        let mut sku = sku_below_order_point();
        sku.vendor_id = vendor.id;
        sku.warehouse_id = vendor.warehouse_id;
        sku.system_class = SystemClass::Regular;
        sku.item_order_point_units = dec!(20);
        sku.order_up_to_level_units = dec!(50);
        sku.vendor_order_point_days = dec!(100); // guarantees available <= vendor_order_point_units
        let cfg = AsrConfig::default();
        let order = build_vendor_order(&vendor, &[sku], &cfg, NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), now()).unwrap();
        assert_eq!(order.status, OrderStatus::Due);
    }

    #[test]
    fn order_stays_planned_when_not_due() {
        let vendor = VendorBuilder::new("V1", Uuid::new_v4()).build().unwrap();
        let mut sku = sku_below_order_point();
        sku.vendor_id = vendor.id;
        sku.warehouse_id = vendor.warehouse_id;
        sku.system_class = SystemClass::Regular;
        sku.item_order_point_units = dec!(20);
        sku.order_up_to_level_units = dec!(50);
        sku.vendor_order_point_days = Decimal::ZERO; // available will be far above this
        let cfg = AsrConfig::default();
        let order = build_vendor_order(&vendor, &[sku], &cfg, NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(), now()).unwrap();
        assert_eq!(order.status, OrderStatus::Planned);
    }

    #[test]
    fn automatic_rebuild_tops_up_non_manual_non_frozen_skus() {
        let vendor = VendorBuilder::new("V1", Uuid::new_v4())
            .rebuild_policy(RebuildPolicy::Automatic)
            .bracket(Bracket { bracket_number: 1, unit: BracketUnit::Amount, minimum: dec!(10_000), maximum: dec!(0), discount_percentage: dec!(0) })
            .build()
            .unwrap();

        let mut due_sku = sku_below_order_point();
        due_sku.vendor_id = vendor.id;
        due_sku.warehouse_id = vendor.warehouse_id;
        due_sku.system_class = SystemClass::Regular;
        due_sku.item_order_point_units = dec!(20);
        due_sku.order_up_to_level_units = dec!(50);
        due_sku.purchase_price = dec!(1);

        let mut topup_sku = SkuBuilder::new("SKU-2", vendor.warehouse_id, vendor.id)
            .buyer_class(BuyerClass::Regular)
            .stock_position(dec!(1000), dec!(0), dec!(0), dec!(0), dec!(0))
            .forecast_state(dec!(70), dec!(25), dec!(0.1))
            .prices(dec!(1), dec!(2))
            .build()
            .unwrap();
        topup_sku.system_class = SystemClass::Regular;
        topup_sku.item_order_point_units = dec!(5);
        topup_sku.order_up_to_level_units = dec!(10);

        let cfg = AsrConfig::default();
        let order = build_vendor_order(
            &vendor,
            &[due_sku, topup_sku.clone()],
            &cfg,
            NaiveDate::from_ymd_opt(2026, 7, 26).unwrap(),
            now(),
        )
        .unwrap();

        assert!(order.auto_adjust_totals.amount > order.independent_totals.amount);
        assert!(order.lines.iter().any(|line| line.sku_id == topup_sku.id && line.soq_units > Decimal::ZERO));
    }
}

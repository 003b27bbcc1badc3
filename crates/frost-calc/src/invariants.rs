//! 不變量檢核
//!
//! 在 MRP 交易提交前逐項驗證；任何違反都視為致命，
//! 讓整筆交易回滾。檢核只讀資料集。

use crate::capacity::CapacityModel;
use crate::stock::StockService;
use chrono::{Duration, NaiveDate};
use frost_core::{PlanError, PlannerConfig, Result};
use frost_store::Dataset;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// 執行全部不變量檢核
pub fn check_all(ds: &Dataset, config: &PlannerConfig) -> Result<()> {
    check_reservation_conservation(ds)?;
    check_capacity_budget(ds, config)?;
    check_slot_coverage(ds)?;
    check_material_coverage(ds)?;
    check_pegging_coverage(ds)?;
    check_delivery_dates(ds, config)?;
    Ok(())
}

/// 保留守恆：任一批次的生效中保留總量不得超過批次數量
fn check_reservation_conservation(ds: &Dataset) -> Result<()> {
    for batch in ds.finished_batches.values() {
        let reserved = ds.active_pt_reserved_for_batch(batch.id);
        if reserved > batch.qty {
            return Err(PlanError::InvariantViolation(format!(
                "成品批次 {} 保留 {reserved} 超過批次數量 {}",
                batch.id, batch.qty
            )));
        }
    }
    for batch in ds.raw_batches.values() {
        let reserved = ds.active_mp_reserved_for_batch(batch.id);
        if reserved > batch.qty {
            return Err(PlanError::InvariantViolation(format!(
                "原料批次 {} 保留 {reserved} 超過批次數量 {}",
                batch.id, batch.qty
            )));
        }
    }
    Ok(())
}

/// 產能預算：任一（產線, 日期）的軟保留加硬保留不得超過每日工時
fn check_capacity_budget(ds: &Dataset, config: &PlannerConfig) -> Result<()> {
    let budget_minutes = config.daily_minute_horizon();
    let mut load: BTreeMap<(frost_core::LineId, NaiveDate), i64> = BTreeMap::new();

    for slot in ds.calendar_slots.values() {
        let counts = ds
            .production_orders
            .get(&slot.op)
            .map(|op| op.state.holds_soft_capacity())
            .unwrap_or(false);
        if counts {
            *load.entry((slot.line, slot.date)).or_insert(0) += slot.hours_reserved * 60;
        }
    }
    for ot in ds.work_orders.values() {
        if ot.state.holds_hard_capacity() {
            *load
                .entry((ot.line, ot.start_programmed.date_naive()))
                .or_insert(0) += ot.programmed_minutes();
        }
    }

    for ((line, date), minutes) in load {
        if minutes > budget_minutes {
            return Err(PlanError::InvariantViolation(format!(
                "產線 {line} 於 {date} 負載 {minutes} 分鐘，超出預算 {budget_minutes}"
            )));
        }
    }
    Ok(())
}

/// 時段覆蓋：軟保留狀態的 OP 必須有時段，且逐日瓶頸工時總和等於所需工時
///
/// 缺產能規則或配方的產品（ConfigMissing 跳過者）不在此檢核。
fn check_slot_coverage(ds: &Dataset) -> Result<()> {
    for op in ds.production_orders.values() {
        if !op.state.holds_soft_capacity() {
            continue;
        }
        let capacities = ds.capacities_for_product(op.product);
        if capacities.is_empty() || ds.recipes.get(&op.product).is_none() {
            continue;
        }

        let slots: Vec<_> = ds
            .calendar_slots
            .values()
            .filter(|s| s.op == op.id)
            .collect();
        if slots.is_empty() {
            return Err(PlanError::InvariantViolation(format!(
                "{} 處於 {} 卻沒有日曆時段",
                op.id,
                op.state.descriptor()
            )));
        }

        // 每日各線工時相同（並行模型），取逐日最大即瓶頸工時
        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for slot in &slots {
            let entry = per_day.entry(slot.date).or_insert(0);
            *entry = (*entry).max(slot.hours_reserved);
        }
        let total_hours: i64 = per_day.values().sum();

        let total_rate = CapacityModel::total_units_per_hour(&capacities);
        let expected = CapacityModel::hours_needed(op.qty, total_rate);
        if total_hours != expected {
            return Err(PlanError::InvariantViolation(format!(
                "{} 的時段工時 {total_hours} 不等於所需 {expected}",
                op.id
            )));
        }
    }
    Ok(())
}

/// 原料覆蓋：PendingStart 的 OP 每項配方原料都有等量的生效中保留
fn check_material_coverage(ds: &Dataset) -> Result<()> {
    for op in ds.production_orders.values() {
        if op.state != frost_core::ProductionOrderState::PendingStart {
            continue;
        }
        let Some(recipe) = ds.recipes.get(&op.product) else {
            continue;
        };

        let mut reserved_per_material: BTreeMap<frost_core::RawMaterialId, i64> = BTreeMap::new();
        for rsv in ds.active_mp_reservations_for_op(op.id) {
            if let Some(batch) = ds.raw_batches.get(&rsv.batch) {
                *reserved_per_material.entry(batch.raw_material).or_insert(0) +=
                    rsv.qty_reserved;
            }
        }

        for item in &recipe.items {
            let need = (item.qty_per_unit * Decimal::from(op.qty))
                .ceil()
                .to_i64()
                .unwrap_or(0);
            let reserved = reserved_per_material
                .get(&item.raw_material)
                .copied()
                .unwrap_or(0);
            if reserved != need {
                return Err(PlanError::InvariantViolation(format!(
                    "{} 待開工但原料 {} 只保留 {reserved}，需求 {need}",
                    op.id, item.raw_material
                )));
            }
        }
    }
    Ok(())
}

/// 供需覆蓋：已處理 OV 的每條明細，保留 + pegging + 剩餘可用量須覆蓋需求
///
/// 吃庫存段在交付前一天才落成 JIT 保留，該部分以剩餘可用量代位。
fn check_pegging_coverage(ds: &Dataset) -> Result<()> {
    for ov in ds.sales_orders.values() {
        let processed = matches!(
            ov.state,
            frost_core::SalesOrderState::InPreparation
                | frost_core::SalesOrderState::PendingPayment
        );
        if !processed {
            continue;
        }
        for line in ds.lines_of_order(ov.id) {
            // 缺配置而被跳過的產品本就無法覆蓋（ConfigMissing 屬可恢復）
            if ds.recipes.get(&line.product).is_none()
                || ds.capacities_for_product(line.product).is_empty()
            {
                continue;
            }
            let reserved = ds.active_pt_reserved_for_line(line.id);
            let pegged = ds.pegged_qty_for_line(line.id);
            let available = StockService::available_pt(ds, line.product);
            if reserved + pegged + available < line.qty {
                return Err(PlanError::InvariantViolation(format!(
                    "明細 {} 覆蓋不足（保留 {reserved} + pegging {pegged} + 可用 {available} < {}）",
                    line.id, line.qty
                )));
            }
        }
    }
    Ok(())
}

/// 交期一致：可計劃 OV 的交期不得早於其 pegged OP 最晚完工日加出貨緩衝
fn check_delivery_dates(ds: &Dataset, config: &PlannerConfig) -> Result<()> {
    for ov in ds.sales_orders.values() {
        if !ov.state.is_plannable() {
            continue;
        }
        let line_ids: Vec<_> = ds.lines_of_order(ov.id).iter().map(|l| l.id).collect();
        let latest_end = ds
            .pegging_links
            .values()
            .filter(|p| line_ids.contains(&p.line))
            .filter_map(|p| ds.production_orders.get(&p.op))
            .filter(|op| op.state.is_open())
            .map(|op| op.planned_end)
            .max();

        if let Some(end) = latest_end {
            let min_due = end + Duration::days(config.delivery_buffer_days);
            if ov.delivery_due.date_naive() < min_due {
                return Err(PlanError::InvariantViolation(format!(
                    "{} 交期 {} 早於最晚完工日加出貨緩衝 {min_due}",
                    ov.id,
                    ov.delivery_due.date_naive()
                )));
            }
        }
    }
    Ok(())
}

//! 戰術排程（次日）與日內重排
//!
//! 輸入是 `planned_start = 明日` 且 PendingStart 的 OP。
//! 求解成功：逐批落成 OT（硬保留）、OP 升級 Scheduled、
//! 當日軟時段清除；沒排進任何批次的 OP 退回 Waiting。
//! 求解失敗或逾時：全部候選退回 Waiting，交給下次 MRP 重排。

use crate::constraint::DayModel;
use crate::solver::solve_day;
use chrono::{Duration, NaiveDate};
use frost_core::{
    OpId, PlannerConfig, ProductionOrderState, Result, WorkOrder,
};
use frost_store::{Dataset, PlanningStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 戰術排程結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    /// 排程目標日（明日）
    pub plan_date: NaiveDate,

    /// 求解是否可行（無候選 OP 時視為可行的空結果）
    pub feasible: bool,

    /// 建立的 OT 數
    pub ots_created: usize,

    /// 升級為 Scheduled 的 OP 數
    pub ops_scheduled: usize,

    /// 退回 Waiting 的 OP 數
    pub ops_reverted: usize,
}

impl ScheduleOutcome {
    fn empty(plan_date: NaiveDate) -> Self {
        Self {
            plan_date,
            feasible: true,
            ots_created: 0,
            ops_scheduled: 0,
            ops_reverted: 0,
        }
    }
}

/// 戰術排程器
pub struct TacticalScheduler<'a> {
    config: &'a PlannerConfig,
}

impl<'a> TacticalScheduler<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self { config }
    }

    /// 以獨立交易排明日的班
    pub fn schedule_next_day(
        &self,
        store: &PlanningStore,
        today: NaiveDate,
    ) -> Result<ScheduleOutcome> {
        store.transaction(|ds| self.schedule_in_tx(ds, today))
    }

    /// 在既有交易內排班（與 MRP 組成同一筆交易時使用）
    pub fn schedule_in_tx(&self, ds: &mut Dataset, today: NaiveDate) -> Result<ScheduleOutcome> {
        let plan_date = today + Duration::days(1);
        tracing::info!(run_date = %today, "戰術排程開始: 目標日 {plan_date}");

        let candidate_ops: Vec<OpId> = ds
            .pending_start_ops_on(plan_date)
            .iter()
            .map(|op| op.id)
            .collect();
        if candidate_ops.is_empty() {
            tracing::info!(run_date = %today, "沒有待開工的 OP，無需排程");
            return Ok(ScheduleOutcome::empty(plan_date));
        }

        let model = DayModel::build(ds, self.config, plan_date);
        let solution = solve_day(&model, &self.config.solver);

        let Some(solution) = solution else {
            // 無解屬正常結果：全部候選退回 Waiting，當日軟時段清掉
            tracing::warn!(
                run_date = %today,
                "{plan_date} 無可行排程，{} 張 OP 退回 Waiting",
                candidate_ops.len()
            );
            let mut outcome = ScheduleOutcome::empty(plan_date);
            outcome.feasible = false;
            for op_id in candidate_ops {
                self.revert_to_waiting(ds, op_id, plan_date);
                outcome.ops_reverted += 1;
            }
            return Ok(outcome);
        };

        let mut outcome = ScheduleOutcome::empty(plan_date);
        let base = plan_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| frost_core::PlanError::InvalidDate(plan_date.to_string()))?
            .and_utc();

        let mut placed_qty: BTreeMap<OpId, i64> = BTreeMap::new();
        for placement in &solution.placements {
            let ot_id = ds.alloc_ot_id();
            ds.work_orders.insert(
                ot_id,
                WorkOrder::new(
                    ot_id,
                    placement.op,
                    placement.line,
                    placement.size,
                    base + Duration::minutes(placement.start_min),
                    base + Duration::minutes(placement.end_min),
                ),
            );
            *placed_qty.entry(placement.op).or_insert(0) += placement.size;
            outcome.ots_created += 1;
        }

        for op_id in candidate_ops {
            if let Some(&placed) = placed_qty.get(&op_id) {
                // 軟保留轉硬：當日時段清除，改由 OT 占線。
                // 被剔除的尾批不算此 OP 的供給，數量縮為實際投產量，
                // 缺口由下次 MRP 以新的小 OP 補上。
                ds.clear_slots_for_op_on(op_id, plan_date);
                let shell = match ds.production_orders.get_mut(&op_id) {
                    Some(op) => {
                        op.state = ProductionOrderState::Scheduled;
                        if op.qty != placed {
                            tracing::info!(
                                run_date = %today,
                                "{op_id} 投產量 {placed} 低於訂單量 {}，縮量",
                                op.qty
                            );
                            op.qty = placed;
                        }
                        op.batch
                    }
                    None => None,
                };
                if let Some(batch_id) = shell {
                    if let Some(batch) = ds.finished_batches.get_mut(&batch_id) {
                        batch.qty = placed;
                    }
                }
                outcome.ops_scheduled += 1;
            } else {
                tracing::warn!(run_date = %today, "{op_id} 未能排入 {plan_date}，退回 Waiting");
                self.revert_to_waiting(ds, op_id, plan_date);
                outcome.ops_reverted += 1;
            }
        }

        tracing::info!(
            run_date = %today,
            "戰術排程完成: {} 張 OT，{} 張 OP 升級，{} 張退回",
            outcome.ots_created,
            outcome.ops_scheduled,
            outcome.ops_reverted
        );
        Ok(outcome)
    }

    /// 日內重排：指定日期已排程的 OP 拆回 PendingStart 後重新排班
    pub fn replan(
        &self,
        store: &PlanningStore,
        target_date: NaiveDate,
    ) -> Result<ScheduleOutcome> {
        store.transaction(|ds| self.replan_in_tx(ds, target_date))
    }

    /// 在既有交易內重排
    pub fn replan_in_tx(
        &self,
        ds: &mut Dataset,
        target_date: NaiveDate,
    ) -> Result<ScheduleOutcome> {
        tracing::info!("重排 {target_date} 的生產");

        let ops: Vec<OpId> = ds
            .scheduled_ops_on(target_date)
            .iter()
            .map(|op| op.id)
            .collect();
        if ops.is_empty() {
            tracing::info!("{target_date} 沒有已排程的 OP，無需重排");
            return Ok(ScheduleOutcome::empty(target_date));
        }

        for op_id in &ops {
            let deleted = ds.delete_pending_work_orders_for_op(*op_id);
            ds.clear_slots_for_op_on(*op_id, target_date);
            if let Some(op) = ds.production_orders.get_mut(op_id) {
                op.state = ProductionOrderState::PendingStart;
            }
            tracing::info!("{op_id}: 刪除 {deleted} 張未開工 OT，退回 PendingStart");
        }

        // 以前一天為「今天」重跑排程，目標日再次成為「明日」
        self.schedule_in_tx(ds, target_date - Duration::days(1))
    }

    fn revert_to_waiting(&self, ds: &mut Dataset, op_id: OpId, plan_date: NaiveDate) {
        ds.clear_slots_for_op_on(op_id, plan_date);
        if let Some(op) = ds.production_orders.get_mut(&op_id) {
            op.state = ProductionOrderState::Waiting;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_core::{
        LineCapacity, ProductId, ProductionLine, ProductionOrder, WorkOrderState,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        ds: Dataset,
        product: ProductId,
    }

    fn fixture(rate: i64, min_batch: i64) -> Fixture {
        let mut ds = Dataset::new();
        let product = ds.alloc_product_id();
        let line = ds.alloc_line_id();
        ds.lines.insert(line, ProductionLine::new(line, "L1"));
        ds.line_capacities
            .push(LineCapacity::new(product, line, rate).with_min_batch(min_batch));
        Fixture { ds, product }
    }

    fn pending_op(f: &mut Fixture, qty: i64, start: NaiveDate) -> OpId {
        let id = f.ds.alloc_op_id();
        let mut op = ProductionOrder::new(id, f.product, qty, start, start);
        op.state = ProductionOrderState::PendingStart;
        f.ds.production_orders.insert(id, op);
        // MRP 留下的當日軟時段
        let line = f.ds.lines.keys().next().copied().unwrap();
        f.ds.create_slot(id, line, start, 4, qty);
        id
    }

    #[test]
    fn test_schedule_promotes_and_materializes_ots() {
        let mut f = fixture(50, 0);
        let today = date(2025, 11, 3);
        let op = pending_op(&mut f, 100, date(2025, 11, 4));

        let config = PlannerConfig::default();
        let scheduler = TacticalScheduler::new(&config);
        let outcome = scheduler.schedule_in_tx(&mut f.ds, today).unwrap();

        assert!(outcome.feasible);
        assert_eq!(outcome.ots_created, 2);
        assert_eq!(outcome.ops_scheduled, 1);
        assert_eq!(outcome.ops_reverted, 0);

        let op_row = &f.ds.production_orders[&op];
        assert_eq!(op_row.state, ProductionOrderState::Scheduled);
        // 軟時段已轉硬
        assert!(f.ds.slot_ids_for_op(op).is_empty());

        let ots: Vec<_> = f.ds.work_orders.values().collect();
        assert_eq!(ots.len(), 2);
        assert!(ots.iter().all(|ot| ot.state == WorkOrderState::Pending));
        assert_eq!(
            ots.iter().map(|ot| ot.qty_programmed).sum::<i64>(),
            100
        );
        // 同線批次首尾相接
        let mut spans: Vec<_> = ots
            .iter()
            .map(|ot| (ot.start_programmed, ot.end_programmed))
            .collect();
        spans.sort();
        assert_eq!(spans[0].1, spans[1].0);
    }

    #[test]
    fn test_min_batch_tail_left_for_next_mrp_run() {
        let mut f = fixture(50, 30);
        let today = date(2025, 11, 3);
        let op = pending_op(&mut f, 105, date(2025, 11, 4));

        let config = PlannerConfig::default();
        let scheduler = TacticalScheduler::new(&config);
        let outcome = scheduler.schedule_in_tx(&mut f.ds, today).unwrap();

        // 尾批 5 < 30 被剔除：投產 100，OP 仍升級
        assert_eq!(outcome.ots_created, 2);
        assert_eq!(
            f.ds.work_orders
                .values()
                .map(|ot| ot.qty_programmed)
                .sum::<i64>(),
            100
        );
        assert_eq!(
            f.ds.production_orders[&op].state,
            ProductionOrderState::Scheduled
        );
        // 訂單量縮為實際投產量，缺口 5 留給下次 MRP
        assert_eq!(f.ds.production_orders[&op].qty, 100);
    }

    #[test]
    fn test_no_rules_reverts_all_candidates() {
        let mut f = fixture(50, 0);
        // 清掉產能規則：模型無候選 → 無解路徑
        f.ds.line_capacities.clear();
        let today = date(2025, 11, 3);
        let op = pending_op(&mut f, 100, date(2025, 11, 4));

        let config = PlannerConfig::default();
        let scheduler = TacticalScheduler::new(&config);
        let outcome = scheduler.schedule_in_tx(&mut f.ds, today).unwrap();

        assert!(!outcome.feasible);
        assert_eq!(outcome.ops_reverted, 1);
        assert_eq!(
            f.ds.production_orders[&op].state,
            ProductionOrderState::Waiting
        );
        // 當日軟時段清空，下次 MRP 可重排
        assert!(f.ds.slot_ids_for_op(op).is_empty());
        assert!(f.ds.work_orders.is_empty());
    }

    #[test]
    fn test_no_pending_ops_is_empty_success() {
        let mut f = fixture(50, 0);
        let config = PlannerConfig::default();
        let scheduler = TacticalScheduler::new(&config);

        let outcome = scheduler
            .schedule_in_tx(&mut f.ds, date(2025, 11, 3))
            .unwrap();

        assert!(outcome.feasible);
        assert_eq!(outcome.ots_created, 0);
    }

    #[test]
    fn test_replan_rebuilds_work_orders() {
        let mut f = fixture(50, 0);
        let today = date(2025, 11, 3);
        let plan_date = date(2025, 11, 4);
        let op = pending_op(&mut f, 100, plan_date);

        let config = PlannerConfig::default();
        let scheduler = TacticalScheduler::new(&config);
        scheduler.schedule_in_tx(&mut f.ds, today).unwrap();
        let first_ots: Vec<_> = f.ds.work_orders.keys().copied().collect();

        let outcome = scheduler.replan_in_tx(&mut f.ds, plan_date).unwrap();

        assert!(outcome.feasible);
        assert_eq!(outcome.ops_scheduled, 1);
        assert_eq!(
            f.ds.production_orders[&op].state,
            ProductionOrderState::Scheduled
        );
        // 舊 OT 刪除、新 OT 落成
        let new_ots: Vec<_> = f.ds.work_orders.keys().copied().collect();
        assert_eq!(new_ots.len(), 2);
        assert!(new_ots.iter().all(|id| !first_ots.contains(id)));
    }
}

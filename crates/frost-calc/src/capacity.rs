//! 有限產能模型
//!
//! 產線負載分兩層：Waiting / PendingStart 的 OP 以日曆時段佔「軟」額度，
//! Scheduled / InProcess 的 OP 只透過其 OT（硬保留）計入。
//! 日曆走訪採瓶頸模型：每日可用工時取各合格產線剩餘量的最小值。

use chrono::{Duration, NaiveDate};
use frost_core::{LineCapacity, LineId, OpId, PlanError, PlannerConfig, Result};
use frost_store::Dataset;

/// 走訪安全上限：超過十年仍排不完視為配置錯誤
const WALK_MAX_DAYS: i64 = 3650;

/// 走訪產出的單一時段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPlan {
    pub line: LineId,
    pub date: NaiveDate,
    pub hours: i64,
    pub qty: i64,
}

/// 日曆走訪結果
#[derive(Debug, Clone)]
pub struct WalkResult {
    /// 首個落點
    pub start: NaiveDate,
    /// 末個落點
    pub end: NaiveDate,
    /// 逐線逐日的時段計劃
    pub slots: Vec<SlotPlan>,
}

/// 產能模型
pub struct CapacityModel<'a> {
    config: &'a PlannerConfig,
}

impl<'a> CapacityModel<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self { config }
    }

    /// 某產線某日已占用的分鐘數
    ///
    /// `exclude_op` 用於重排同一張 OP 時忽略它自己的舊時段。
    pub fn load_minutes(
        &self,
        ds: &Dataset,
        line: LineId,
        date: NaiveDate,
        exclude_op: Option<OpId>,
    ) -> i64 {
        let soft: i64 = ds
            .calendar_slots
            .values()
            .filter(|s| s.line == line && s.date == date && Some(s.op) != exclude_op)
            .filter(|s| {
                ds.production_orders
                    .get(&s.op)
                    .map(|op| op.state.holds_soft_capacity())
                    .unwrap_or(false)
            })
            .map(|s| s.hours_reserved * 60)
            .sum();

        let hard: i64 = ds
            .work_orders
            .values()
            .filter(|ot| {
                ot.line == line
                    && ot.start_programmed.date_naive() == date
                    && ot.state.holds_hard_capacity()
            })
            .map(|ot| ot.programmed_minutes())
            .sum();

        soft + hard
    }

    /// 各合格產線的每小時總產量（並行模型）
    pub fn total_units_per_hour(capacities: &[&LineCapacity]) -> i64 {
        capacities.iter().map(|c| c.units_per_hour).sum()
    }

    /// 產量換算所需工時（無條件進位）
    pub fn hours_needed(qty: i64, total_units_per_hour: i64) -> i64 {
        if total_units_per_hour <= 0 {
            return 0;
        }
        (qty + total_units_per_hour - 1) / total_units_per_hour
    }

    /// 日曆走訪：從期望開工日起逐日塞入工時
    ///
    /// 每日可用工時 = min(各合格產線的剩餘額度)，取整數小時；
    /// 為每條合格產線各落一個時段（並行生產，工時相同、量依線速）。
    pub fn walk_forward(
        &self,
        ds: &Dataset,
        op: OpId,
        capacities: &[&LineCapacity],
        desired_start: NaiveDate,
        hours_needed: i64,
    ) -> Result<WalkResult> {
        if capacities.is_empty() {
            return Err(PlanError::ConfigMissing("無合格產線".to_string()));
        }

        let budget_minutes = self.config.daily_minute_horizon();
        let mut cursor = desired_start;
        let mut pending = hours_needed.max(1);
        let mut slots: Vec<SlotPlan> = Vec::new();
        let mut start: Option<NaiveDate> = None;
        let mut walked = 0i64;

        while pending > 0 {
            walked += 1;
            if walked > WALK_MAX_DAYS {
                return Err(PlanError::Calculation(format!(
                    "{op} 的日曆走訪超過 {WALK_MAX_DAYS} 天仍未排完"
                )));
            }

            let free_bottleneck_hours = capacities
                .iter()
                .map(|c| {
                    let free = budget_minutes - self.load_minutes(ds, c.line, cursor, Some(op));
                    free.max(0) / 60
                })
                .min()
                .unwrap_or(0);

            if free_bottleneck_hours <= 0 {
                cursor += Duration::days(1);
                continue;
            }

            let hours_today = pending.min(free_bottleneck_hours);
            for cap in capacities {
                slots.push(SlotPlan {
                    line: cap.line,
                    date: cursor,
                    hours: hours_today,
                    qty: hours_today * cap.units_per_hour,
                });
            }
            start.get_or_insert(cursor);
            pending -= hours_today;
            if pending > 0 {
                cursor += Duration::days(1);
            }
        }

        Ok(WalkResult {
            start: start.unwrap_or(desired_start),
            end: cursor,
            slots,
        })
    }

    /// 清除某 OP 的全部軟保留時段
    pub fn clear(ds: &mut Dataset, op: OpId) -> usize {
        ds.clear_slots_for_op(op)
    }
}

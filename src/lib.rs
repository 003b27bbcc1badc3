//! # frostmrp
//!
//! 冷凍食品廠的每日 MRP 與有限產能排程引擎。
//!
//! 外層觸發端點解析日期後呼叫 [`run_daily_planning`]：
//! 先跑六階段 MRP 管線決定生產與採購，再由戰術排程器
//! 把明日開工的 OP 落成工作訂單。兩步在同一筆交易內完成，
//! 任何致命錯誤整次回滾。

pub use frost_calc::{MrpPlanner, PlanWarning, RunReport, StockService, WarningKind};
pub use frost_core::*;
pub use frost_scheduler::{ScheduleOutcome, TacticalScheduler};
pub use frost_store::{Dataset, PlanningStore};

use chrono::NaiveDate;

/// 一次完整每日執行的結果
#[derive(Debug, Clone)]
pub struct DailyRunSummary {
    /// MRP 管線報告
    pub report: RunReport,

    /// 戰術排程結果
    pub schedule: ScheduleOutcome,
}

/// 執行一次完整的每日計劃：MRP 管線 + 次日戰術排程
///
/// 整體是一筆交易；同一資料集上的並行執行以諮詢鎖擋下
/// （[`PlanError::ConcurrentRun`]）。
pub fn run_daily_planning(
    store: &PlanningStore,
    config: &PlannerConfig,
    today: NaiveDate,
) -> Result<DailyRunSummary> {
    store.transaction(|ds| {
        let report = MrpPlanner::new(config).run_in_tx(ds, today)?;
        let schedule = TacticalScheduler::new(config).schedule_in_tx(ds, today)?;
        Ok(DailyRunSummary { report, schedule })
    })
}

/// 日內重排：把指定日期的已排程生產拆回並重新排班
pub fn replan_production(
    store: &PlanningStore,
    config: &PlannerConfig,
    target_date: NaiveDate,
) -> Result<ScheduleOutcome> {
    TacticalScheduler::new(config).replan(store, target_date)
}

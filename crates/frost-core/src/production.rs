//! 生產模型（OP、日曆時段、OT、pegging）

use crate::ids::{BatchId, LineId, OpId, OtId, PeggingId, ProductId, SalesOrderLineId, SlotId};
use crate::{PlanError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 生產訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionOrderState {
    /// 等待中（原料未齊或尚未進入戰術排程）
    Waiting,
    /// 待開工（原料齊備，等待次日排程）
    PendingStart,
    /// 已排程（OT 已生成，日曆軟保留轉為硬保留）
    Scheduled,
    /// 生產中
    InProcess,
    /// 已取消
    Cancelled,
}

impl ProductionOrderState {
    pub fn descriptor(&self) -> &'static str {
        match self {
            ProductionOrderState::Waiting => "Waiting",
            ProductionOrderState::PendingStart => "PendingStart",
            ProductionOrderState::Scheduled => "Scheduled",
            ProductionOrderState::InProcess => "InProcess",
            ProductionOrderState::Cancelled => "Cancelled",
        }
    }

    /// 非終態：計入既有供給
    pub fn is_open(&self) -> bool {
        !matches!(self, ProductionOrderState::Cancelled)
    }

    /// 軟保留狀態：日曆時段計入產能負載
    pub fn holds_soft_capacity(&self) -> bool {
        matches!(
            self,
            ProductionOrderState::Waiting | ProductionOrderState::PendingStart
        )
    }
}

impl FromStr for ProductionOrderState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Waiting" => Ok(ProductionOrderState::Waiting),
            "PendingStart" => Ok(ProductionOrderState::PendingStart),
            "Scheduled" => Ok(ProductionOrderState::Scheduled),
            "InProcess" => Ok(ProductionOrderState::InProcess),
            "Cancelled" => Ok(ProductionOrderState::Cancelled),
            other => Err(PlanError::UnknownState(other.to_string())),
        }
    }
}

/// 生產訂單（OP）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    /// 訂單ID
    pub id: OpId,

    /// 產品
    pub product: ProductId,

    /// 計劃產量
    pub qty: i64,

    /// 狀態
    pub state: ProductionOrderState,

    /// 計劃開工日（日曆走訪的首個落點）
    pub planned_start: NaiveDate,

    /// 計劃完工日（日曆走訪的末個落點）
    pub planned_end: NaiveDate,

    /// 原料備齊起算日（短缺時含供應商提前期）
    pub material_start: Option<NaiveDate>,

    /// 預建的成品批次殼（產出後轉 Available）
    pub batch: Option<BatchId>,
}

impl ProductionOrder {
    pub fn new(
        id: OpId,
        product: ProductId,
        qty: i64,
        planned_start: NaiveDate,
        planned_end: NaiveDate,
    ) -> Self {
        Self {
            id,
            product,
            qty,
            state: ProductionOrderState::Waiting,
            planned_start,
            planned_end,
            material_start: None,
            batch: None,
        }
    }
}

/// 日曆時段：某 OP 在某產線某日的軟產能保留
///
/// OP 被取消或升級為 OT（硬保留）時清除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSlot {
    /// 時段ID
    pub id: SlotId,

    /// 生產訂單
    pub op: OpId,

    /// 產線
    pub line: LineId,

    /// 日期
    pub date: NaiveDate,

    /// 保留工時
    pub hours_reserved: i64,

    /// 當日該線預計產量
    pub qty_to_produce: i64,
}

/// 工作訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderState {
    /// 待執行
    Pending,
    /// 執行中
    InProcess,
    /// 已完成
    Done,
    /// 已取消
    Cancelled,
}

impl WorkOrderState {
    pub fn descriptor(&self) -> &'static str {
        match self {
            WorkOrderState::Pending => "Pending",
            WorkOrderState::InProcess => "InProcess",
            WorkOrderState::Done => "Done",
            WorkOrderState::Cancelled => "Cancelled",
        }
    }

    /// 佔用產線的狀態（硬保留計入產能）
    pub fn holds_hard_capacity(&self) -> bool {
        matches!(
            self,
            WorkOrderState::Pending | WorkOrderState::InProcess | WorkOrderState::Done
        )
    }
}

impl FromStr for WorkOrderState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(WorkOrderState::Pending),
            "InProcess" => Ok(WorkOrderState::InProcess),
            "Done" => Ok(WorkOrderState::Done),
            "Cancelled" => Ok(WorkOrderState::Cancelled),
            other => Err(PlanError::UnknownState(other.to_string())),
        }
    }
}

/// 工作訂單（OT）：戰術排程落下的硬時段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    /// 訂單ID
    pub id: OtId,

    /// 所屬生產訂單
    pub op: OpId,

    /// 產線
    pub line: LineId,

    /// 排定產量
    pub qty_programmed: i64,

    /// 排定開始時刻
    pub start_programmed: DateTime<Utc>,

    /// 排定結束時刻
    pub end_programmed: DateTime<Utc>,

    /// 狀態
    pub state: WorkOrderState,

    /// 實際開始
    pub actual_start: Option<DateTime<Utc>>,

    /// 實際結束
    pub actual_end: Option<DateTime<Utc>>,
}

impl WorkOrder {
    pub fn new(
        id: OtId,
        op: OpId,
        line: LineId,
        qty_programmed: i64,
        start_programmed: DateTime<Utc>,
        end_programmed: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            op,
            line,
            qty_programmed,
            start_programmed,
            end_programmed,
            state: WorkOrderState::Pending,
            actual_start: None,
            actual_end: None,
        }
    }

    /// 排定工期（分鐘）
    pub fn programmed_minutes(&self) -> i64 {
        (self.end_programmed - self.start_programmed).num_minutes()
    }
}

/// 供需對應：OP 為哪條銷售明細而生、對應多少數量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeggingLink {
    /// 對應ID
    pub id: PeggingId,

    /// 生產訂單
    pub op: OpId,

    /// 銷售明細
    pub line: SalesOrderLineId,

    /// 對應數量
    pub qty_assigned: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_op_starts_waiting() {
        let op = ProductionOrder::new(
            OpId(1),
            ProductId(1),
            100,
            NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
        );

        assert_eq!(op.state, ProductionOrderState::Waiting);
        assert!(op.state.is_open());
        assert!(op.state.holds_soft_capacity());
        assert!(op.material_start.is_none());
    }

    #[test]
    fn test_soft_vs_hard_capacity_states() {
        assert!(ProductionOrderState::PendingStart.holds_soft_capacity());
        assert!(!ProductionOrderState::Scheduled.holds_soft_capacity());
        assert!(WorkOrderState::Pending.holds_hard_capacity());
        assert!(!WorkOrderState::Cancelled.holds_hard_capacity());
    }

    #[test]
    fn test_work_order_minutes() {
        let start = Utc.with_ymd_and_hms(2025, 11, 4, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 11, 4, 1, 30, 0).unwrap();
        let ot = WorkOrder::new(OtId(1), OpId(1), LineId(1), 75, start, end);

        assert_eq!(ot.programmed_minutes(), 90);
        assert_eq!(ot.state.descriptor(), "Pending");
    }
}

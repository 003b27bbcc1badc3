//! # Frost Core
//!
//! 核心資料模型與類型定義：目錄、銷售、庫存、生產、採購實體，
//! 狀態字彙（與 ERP 其他模組的契約）、計劃參數與錯誤類型。

pub mod catalog;
pub mod config;
pub mod ids;
pub mod production;
pub mod purchasing;
pub mod sales;
pub mod stock;

// Re-export 主要類型
pub use catalog::{
    LineCapacity, LineState, Product, ProductionLine, RawMaterial, Recipe, RecipeItem, Supplier,
};
pub use config::{PlannerConfig, SolverConfig};
pub use ids::{
    BatchId, LineId, MpReservationId, OcId, OpId, OtId, PeggingId, ProductId, PtReservationId,
    RawBatchId, RawMaterialId, SalesOrderId, SalesOrderLineId, SlotId, SupplierId,
};
pub use production::{
    CalendarSlot, PeggingLink, ProductionOrder, ProductionOrderState, WorkOrder, WorkOrderState,
};
pub use purchasing::{PurchaseOrder, PurchaseOrderLine, PurchaseOrderState};
pub use sales::{SalesOrder, SalesOrderLine, SalesOrderState};
pub use stock::{
    BatchState, FinishedBatch, MpReservation, MpReservationState, PtReservation,
    PtReservationState, RawBatch,
};

/// 計劃引擎錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// 產品缺少配方或產線配置；該 OP 跳過，其餘流程繼續
    #[error("缺少排產配置: {0}")]
    ConfigMissing(String),

    #[error("無效的日期: {0}")]
    InvalidDate(String),

    /// 求解器逾時或無解；候選 OP 退回 Waiting，屬可恢復結果
    #[error("找不到可行的排程方案: {0}")]
    NoFeasibleSchedule(String),

    /// 任一不變量在執行結束後被違反，整筆交易回滾
    #[error("計劃不變量被違反: {0}")]
    InvariantViolation(String),

    /// 同一資料集上已有另一次計劃執行（run 級別諮詢鎖）
    #[error("另一次計劃執行正在進行中")]
    ConcurrentRun,

    #[error("儲存層錯誤: {0}")]
    StoreFailure(String),

    #[error("計算錯誤: {0}")]
    Calculation(String),

    #[error("狀態描述不存在: {0}")]
    UnknownState(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;

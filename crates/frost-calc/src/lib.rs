//! # Frost Calc
//!
//! 核心 MRP 引擎：庫存視角、FEFO 保留、有限產能日曆走訪、
//! 六階段計劃管線、採購需求彙整與不變量檢核。

pub mod capacity;
pub mod invariants;
pub mod netting;
pub mod planner;
pub mod procurement;
pub mod reservation;
pub mod stock;

// Re-export 主要類型
pub use capacity::CapacityModel;
pub use netting::NettingCalculator;
pub use planner::MrpPlanner;
pub use procurement::PurchaseBook;
pub use reservation::ReservationEngine;
pub use stock::StockService;

use chrono::NaiveDate;
use frost_core::ProductId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 單次 MRP 執行報告
///
/// 與 tracing 日誌流共同構成一次執行的稽核軌跡。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// 執行批次戳記
    pub run_id: Uuid,

    /// 執行日（「今天」）
    pub run_date: NaiveDate,

    /// 階段 1 取消的成品保留數
    pub pt_reservations_cancelled: usize,

    /// 階段 3 建立的 JIT 成品保留數
    pub pt_reservations_created: usize,

    /// 階段 4 建立的原料保留數
    pub mp_reservations_created: usize,

    /// 新建 OP 數
    pub ops_created: usize,

    /// 改量（upsert 既有 Waiting OP）數
    pub ops_resized: usize,

    /// 取消 OP 數
    pub ops_cancelled: usize,

    /// 交期後推的 OV 數
    pub ovs_rescheduled: usize,

    /// upsert 的 OC 數
    pub ocs_upserted: usize,

    /// 警告（延誤、缺配置、低庫存）
    pub warnings: Vec<PlanWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl RunReport {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_date,
            pt_reservations_cancelled: 0,
            pt_reservations_created: 0,
            mp_reservations_created: 0,
            ops_created: 0,
            ops_resized: 0,
            ops_cancelled: 0,
            ovs_rescheduled: 0,
            ocs_upserted: 0,
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: PlanWarning) {
        self.warnings.push(warning);
    }

    /// 是否帶有指定類別的警告
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// 警告類別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// 交期或採購時點已無法準時（以夾緊後日期續行）
    LatenessAlert,
    /// 產品缺配方或產能規則，該 OP 跳過
    ConfigMissing,
    /// 執行後庫存低於最低門檻
    LowStock,
}

/// 計劃警告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanWarning {
    pub kind: WarningKind,
    pub product: Option<ProductId>,
    pub message: String,
}

impl PlanWarning {
    pub fn lateness(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LatenessAlert,
            product: None,
            message: message.into(),
        }
    }

    pub fn config_missing(product: ProductId, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ConfigMissing,
            product: Some(product),
            message: message.into(),
        }
    }

    pub fn low_stock(product: ProductId, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LowStock,
            product: Some(product),
            message: message.into(),
        }
    }
}

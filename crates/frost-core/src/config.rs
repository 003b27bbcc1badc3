//! 計劃參數配置
//!
//! 以不可變的 `PlannerConfig` 傳入每次執行，取代模組層級的全域常數。

use serde::{Deserialize, Serialize};

/// 計劃引擎參數
///
/// 預設值對應工廠目前的營運設定：每線每日 16 工時、
/// 成品出貨與原料收貨各留一天緩衝、需求視界 7 天。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// 每條產線每日最大可用工時
    pub daily_hour_budget: i64,

    /// 生產完成（planned_end）到銷售交期之間的緩衝天數
    pub delivery_buffer_days: i64,

    /// 原料到貨到 OP 開工之間的緩衝天數
    pub mp_receipt_buffer_days: i64,

    /// 需求視界長度（「今天」之後的天數）
    pub horizon_days: i64,

    /// 戰術排程求解器參數
    pub solver: SolverConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            daily_hour_budget: 16,
            delivery_buffer_days: 1,
            mp_receipt_buffer_days: 1,
            horizon_days: 7,
            solver: SolverConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// 建構器模式：設置每日工時上限
    pub fn with_daily_hour_budget(mut self, hours: i64) -> Self {
        self.daily_hour_budget = hours;
        self
    }

    /// 建構器模式：設置出貨緩衝
    pub fn with_delivery_buffer_days(mut self, days: i64) -> Self {
        self.delivery_buffer_days = days;
        self
    }

    /// 建構器模式：設置收貨緩衝
    pub fn with_mp_receipt_buffer_days(mut self, days: i64) -> Self {
        self.mp_receipt_buffer_days = days;
        self
    }

    /// 建構器模式：設置需求視界
    pub fn with_horizon_days(mut self, days: i64) -> Self {
        self.horizon_days = days;
        self
    }

    /// 建構器模式：設置求解器參數
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// 每日可用分鐘數（戰術排程的時間視界）
    pub fn daily_minute_horizon(&self) -> i64 {
        self.daily_hour_budget * 60
    }
}

/// 戰術排程求解器參數
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 牆鐘時間預算（秒）；超過即視為無解，屬正常結果
    pub max_seconds: u64,

    /// 並行搜尋工作者數量
    pub workers: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_seconds: 30,
            workers: 8,
        }
    }
}

impl SolverConfig {
    /// 建構器模式：設置時間預算
    pub fn with_max_seconds(mut self, seconds: u64) -> Self {
        self.max_seconds = seconds;
        self
    }

    /// 建構器模式：設置工作者數量
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

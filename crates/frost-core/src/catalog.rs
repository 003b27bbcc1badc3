//! 目錄實體
//!
//! 產品、原物料、供應商、配方與產線由目錄模組在外部維護；
//! 計劃核心只讀取這些資料。

use crate::ids::{LineId, ProductId, RawMaterialId, SupplierId};
use crate::{PlanError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 成品目錄項
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// 產品ID
    pub id: ProductId,

    /// 名稱
    pub name: String,

    /// 最低庫存門檻（低於此值時 MRP 補足）
    pub min_threshold: i64,

    /// 保存期限（天）
    pub shelf_life_days: i64,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, shelf_life_days: i64) -> Self {
        Self {
            id,
            name: name.into(),
            min_threshold: 0,
            shelf_life_days,
        }
    }

    /// 建構器模式：設置最低庫存門檻
    pub fn with_min_threshold(mut self, threshold: i64) -> Self {
        self.min_threshold = threshold;
        self
    }
}

/// 原物料目錄項
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMaterial {
    /// 原物料ID
    pub id: RawMaterialId,

    /// 名稱
    pub name: String,

    /// 供應商
    pub supplier: SupplierId,

    /// 最小訂購量
    pub min_order_qty: i64,
}

impl RawMaterial {
    pub fn new(id: RawMaterialId, name: impl Into<String>, supplier: SupplierId) -> Self {
        Self {
            id,
            name: name.into(),
            supplier,
            min_order_qty: 1,
        }
    }

    /// 建構器模式：設置最小訂購量
    pub fn with_min_order_qty(mut self, qty: i64) -> Self {
        self.min_order_qty = qty;
        self
    }
}

/// 供應商
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    /// 供應商ID
    pub id: SupplierId,

    /// 名稱
    pub name: String,

    /// 供貨提前期（天）
    pub lead_time_days: i64,
}

impl Supplier {
    pub fn new(id: SupplierId, name: impl Into<String>, lead_time_days: i64) -> Self {
        Self {
            id,
            name: name.into(),
            lead_time_days,
        }
    }
}

/// 配方明細：生產一單位成品所需的原物料用量
///
/// 用量為正有理數（定點），需求計算後無條件進位成整數單位。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeItem {
    /// 原物料
    pub raw_material: RawMaterialId,

    /// 每單位成品用量
    pub qty_per_unit: Decimal,
}

/// 配方（單層 BOM）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// 成品
    pub product: ProductId,

    /// 原料清單
    pub items: Vec<RecipeItem>,
}

impl Recipe {
    pub fn new(product: ProductId) -> Self {
        Self {
            product,
            items: Vec::new(),
        }
    }

    /// 建構器模式：加入一項原料用量
    pub fn with_item(mut self, raw_material: RawMaterialId, qty_per_unit: Decimal) -> Self {
        self.items.push(RecipeItem {
            raw_material,
            qty_per_unit,
        });
        self
    }
}

/// 產線狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineState {
    /// 可用
    Available,
    /// 佔用中（仍可排入後續時段）
    Busy,
}

impl LineState {
    /// 與 ERP 其他模組共用的狀態描述字串
    pub fn descriptor(&self) -> &'static str {
        match self {
            LineState::Available => "Available",
            LineState::Busy => "Busy",
        }
    }
}

impl FromStr for LineState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Available" => Ok(LineState::Available),
            "Busy" => Ok(LineState::Busy),
            other => Err(PlanError::UnknownState(other.to_string())),
        }
    }
}

/// 產線
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionLine {
    /// 產線ID
    pub id: LineId,

    /// 名稱
    pub name: String,

    /// 狀態
    pub state: LineState,
}

impl ProductionLine {
    pub fn new(id: LineId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: LineState::Available,
        }
    }

    /// 是否可承接排程（Available 與 Busy 皆可排入後續時段）
    pub fn is_schedulable(&self) -> bool {
        matches!(self.state, LineState::Available | LineState::Busy)
    }
}

/// 產品 × 產線產能規則
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineCapacity {
    /// 產品
    pub product: ProductId,

    /// 產線
    pub line: LineId,

    /// 每小時產量（單位/時）
    pub units_per_hour: i64,

    /// 最小批量（低於此量的尾批不投產）
    pub min_batch: i64,
}

impl LineCapacity {
    pub fn new(product: ProductId, line: LineId, units_per_hour: i64) -> Self {
        Self {
            product,
            line,
            units_per_hour,
            min_batch: 0,
        }
    }

    /// 建構器模式：設置最小批量
    pub fn with_min_batch(mut self, min_batch: i64) -> Self {
        self.min_batch = min_batch;
        self
    }
}

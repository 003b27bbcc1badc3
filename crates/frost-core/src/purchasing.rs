//! 採購模型（OC）

use crate::ids::{OcId, RawMaterialId, SupplierId};
use crate::{PlanError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 採購訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderState {
    /// 進行中（在途，計入虛擬供給）
    InProcess,
    /// 已收貨
    Received,
    /// 已取消
    Cancelled,
}

impl PurchaseOrderState {
    pub fn descriptor(&self) -> &'static str {
        match self {
            PurchaseOrderState::InProcess => "InProcess",
            PurchaseOrderState::Received => "Received",
            PurchaseOrderState::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for PurchaseOrderState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "InProcess" => Ok(PurchaseOrderState::InProcess),
            "Received" => Ok(PurchaseOrderState::Received),
            "Cancelled" => Ok(PurchaseOrderState::Cancelled),
            other => Err(PlanError::UnknownState(other.to_string())),
        }
    }
}

/// 採購訂單明細
///
/// 以 (訂單, 原物料) 為鍵；重複執行時數量整筆覆寫，不累加。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    /// 原物料
    pub raw_material: RawMaterialId,

    /// 訂購數量
    pub qty: i64,
}

/// 採購訂單（OC）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    /// 訂單ID
    pub id: OcId,

    /// 供應商
    pub supplier: SupplierId,

    /// 下單日期
    pub requested_on: NaiveDate,

    /// 預計到貨日（與供應商的 upsert 鍵）
    pub eta: NaiveDate,

    /// 狀態
    pub state: PurchaseOrderState,

    /// 明細
    pub lines: Vec<PurchaseOrderLine>,
}

impl PurchaseOrder {
    pub fn new(id: OcId, supplier: SupplierId, requested_on: NaiveDate, eta: NaiveDate) -> Self {
        Self {
            id,
            supplier,
            requested_on,
            eta,
            state: PurchaseOrderState::InProcess,
            lines: Vec::new(),
        }
    }

    /// 覆寫式明細 upsert：同一原物料已存在則改數量，否則新增
    pub fn upsert_line(&mut self, raw_material: RawMaterialId, qty: i64) {
        match self.lines.iter_mut().find(|l| l.raw_material == raw_material) {
            Some(line) => line.qty = qty,
            None => self.lines.push(PurchaseOrderLine { raw_material, qty }),
        }
    }

    /// 某原物料的在途數量
    pub fn qty_for(&self, raw_material: RawMaterialId) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.raw_material == raw_material)
            .map(|l| l.qty)
            .sum()
    }
}

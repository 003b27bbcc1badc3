//! 庫存模型：批次與保留
//!
//! 成品與原料皆以批次管理；可用量一律是「批次數量 − 生效中保留」，
//! 不在批次上存冗餘欄位。

use crate::ids::{
    BatchId, MpReservationId, OpId, ProductId, PtReservationId, RawBatchId, RawMaterialId,
    SalesOrderLineId,
};
use crate::{PlanError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 批次狀態（成品與原料共用字彙）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    /// 尚未產出（OP 的批次殼）
    Waiting,
    /// 在庫可用
    Available,
    /// 已耗盡
    Exhausted,
}

impl BatchState {
    pub fn descriptor(&self) -> &'static str {
        match self {
            BatchState::Waiting => "Waiting",
            BatchState::Available => "Available",
            BatchState::Exhausted => "Exhausted",
        }
    }
}

impl FromStr for BatchState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Waiting" => Ok(BatchState::Waiting),
            "Available" => Ok(BatchState::Available),
            "Exhausted" => Ok(BatchState::Exhausted),
            other => Err(PlanError::UnknownState(other.to_string())),
        }
    }
}

/// 成品批次（PT）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishedBatch {
    /// 批次ID
    pub id: BatchId,

    /// 產品
    pub product: ProductId,

    /// 批次數量
    pub qty: i64,

    /// 產出日期
    pub produced_on: NaiveDate,

    /// 到期日（FEFO 排序鍵）
    pub expires_on: NaiveDate,

    /// 狀態
    pub state: BatchState,
}

impl FinishedBatch {
    pub fn new(
        id: BatchId,
        product: ProductId,
        qty: i64,
        produced_on: NaiveDate,
        expires_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            product,
            qty,
            produced_on,
            expires_on,
            state: BatchState::Available,
        }
    }

    /// 建構器模式：設置狀態
    pub fn with_state(mut self, state: BatchState) -> Self {
        self.state = state;
        self
    }
}

/// 原料批次（MP）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBatch {
    /// 批次ID
    pub id: RawBatchId,

    /// 原物料
    pub raw_material: RawMaterialId,

    /// 批次數量
    pub qty: i64,

    /// 到期日（FEFO 排序鍵）
    pub expires_on: NaiveDate,

    /// 狀態
    pub state: BatchState,
}

impl RawBatch {
    pub fn new(id: RawBatchId, raw_material: RawMaterialId, qty: i64, expires_on: NaiveDate) -> Self {
        Self {
            id,
            raw_material,
            qty,
            expires_on,
            state: BatchState::Available,
        }
    }

    /// 建構器模式：設置狀態
    pub fn with_state(mut self, state: BatchState) -> Self {
        self.state = state;
        self
    }
}

/// 成品保留狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PtReservationState {
    /// 生效中（佔用可用量）
    Active,
    /// 已用於出貨扣帳
    Used,
    /// 已取消
    Cancelled,
    /// 貸項退回
    CreditNoteReturn,
}

impl PtReservationState {
    pub fn descriptor(&self) -> &'static str {
        match self {
            PtReservationState::Active => "Active",
            PtReservationState::Used => "Used",
            PtReservationState::Cancelled => "Cancelled",
            PtReservationState::CreditNoteReturn => "CreditNoteReturn",
        }
    }
}

impl FromStr for PtReservationState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Active" => Ok(PtReservationState::Active),
            "Used" => Ok(PtReservationState::Used),
            "Cancelled" => Ok(PtReservationState::Cancelled),
            "CreditNoteReturn" => Ok(PtReservationState::CreditNoteReturn),
            other => Err(PlanError::UnknownState(other.to_string())),
        }
    }
}

/// 成品保留：把某成品批次的一部分鎖給一條銷售明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PtReservation {
    /// 保留ID
    pub id: PtReservationId,

    /// 銷售明細
    pub line: SalesOrderLineId,

    /// 批次
    pub batch: BatchId,

    /// 保留數量
    pub qty_reserved: i64,

    /// 狀態
    pub state: PtReservationState,
}

impl PtReservation {
    pub fn new(id: PtReservationId, line: SalesOrderLineId, batch: BatchId, qty_reserved: i64) -> Self {
        Self {
            id,
            line,
            batch,
            qty_reserved,
            state: PtReservationState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == PtReservationState::Active
    }
}

/// 原料保留狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MpReservationState {
    /// 生效中
    Active,
    /// 已投產扣帳
    Used,
    /// 已取消
    Cancelled,
}

impl MpReservationState {
    pub fn descriptor(&self) -> &'static str {
        match self {
            MpReservationState::Active => "Active",
            MpReservationState::Used => "Used",
            MpReservationState::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for MpReservationState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Active" => Ok(MpReservationState::Active),
            "Used" => Ok(MpReservationState::Used),
            "Cancelled" => Ok(MpReservationState::Cancelled),
            other => Err(PlanError::UnknownState(other.to_string())),
        }
    }
}

/// 原料保留：把某原料批次的一部分鎖給一張生產訂單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpReservation {
    /// 保留ID
    pub id: MpReservationId,

    /// 生產訂單
    pub op: OpId,

    /// 原料批次
    pub batch: RawBatchId,

    /// 保留數量
    pub qty_reserved: i64,

    /// 狀態
    pub state: MpReservationState,
}

impl MpReservation {
    pub fn new(id: MpReservationId, op: OpId, batch: RawBatchId, qty_reserved: i64) -> Self {
        Self {
            id,
            op,
            batch,
            qty_reserved,
            state: MpReservationState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == MpReservationState::Active
    }
}

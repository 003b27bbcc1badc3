//! 銷售訂單模型（OV）

use crate::ids::{ProductId, SalesOrderId, SalesOrderLineId};
use crate::{PlanError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 銷售訂單狀態
///
/// 描述字串是與 ERP 其他模組（開票、出貨、通知）的契約，不可改名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderState {
    /// 已建立，等待計劃
    Created,
    /// 備貨中（至少一條明細需投產）
    InPreparation,
    /// 待付款（庫存已足額保留）
    PendingPayment,
    /// 待出貨
    PendingDelivery,
    /// 已付款
    Paid,
    /// 已取消
    Cancelled,
    /// 貸項退回
    CreditNoteReturn,
}

impl SalesOrderState {
    /// 與 ERP 其他模組共用的狀態描述字串
    pub fn descriptor(&self) -> &'static str {
        match self {
            SalesOrderState::Created => "Created",
            SalesOrderState::InPreparation => "InPreparation",
            SalesOrderState::PendingPayment => "PendingPayment",
            SalesOrderState::PendingDelivery => "PendingDelivery",
            SalesOrderState::Paid => "Paid",
            SalesOrderState::Cancelled => "Cancelled",
            SalesOrderState::CreditNoteReturn => "CreditNoteReturn",
        }
    }

    /// 是否仍在計劃範圍內（會被需求收集讀到）
    pub fn is_plannable(&self) -> bool {
        matches!(
            self,
            SalesOrderState::Created
                | SalesOrderState::InPreparation
                | SalesOrderState::PendingPayment
        )
    }

    /// 終態：計劃引擎不再碰這些訂單
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SalesOrderState::Paid | SalesOrderState::Cancelled | SalesOrderState::CreditNoteReturn
        )
    }
}

impl FromStr for SalesOrderState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Created" => Ok(SalesOrderState::Created),
            "InPreparation" => Ok(SalesOrderState::InPreparation),
            "PendingPayment" => Ok(SalesOrderState::PendingPayment),
            "PendingDelivery" => Ok(SalesOrderState::PendingDelivery),
            "Paid" => Ok(SalesOrderState::Paid),
            "Cancelled" => Ok(SalesOrderState::Cancelled),
            "CreditNoteReturn" => Ok(SalesOrderState::CreditNoteReturn),
            other => Err(PlanError::UnknownState(other.to_string())),
        }
    }
}

/// 銷售訂單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrder {
    /// 訂單ID
    pub id: SalesOrderId,

    /// 客戶（目錄由外部維護，這裡只留參照）
    pub client_ref: String,

    /// 交期（含時刻；計劃只會往後推，不會提前）
    pub delivery_due: DateTime<Utc>,

    /// 優先級（1-10，10最高）
    pub priority: u8,

    /// 狀態
    pub state: SalesOrderState,
}

impl SalesOrder {
    pub fn new(id: SalesOrderId, client_ref: impl Into<String>, delivery_due: DateTime<Utc>) -> Self {
        Self {
            id,
            client_ref: client_ref.into(),
            delivery_due,
            priority: 5,
            state: SalesOrderState::Created,
        }
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(10);
        self
    }

    /// 建構器模式：設置狀態
    pub fn with_state(mut self, state: SalesOrderState) -> Self {
        self.state = state;
        self
    }
}

/// 銷售訂單明細：一張訂單中的一項產品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderLine {
    /// 明細ID
    pub id: SalesOrderLineId,

    /// 所屬訂單
    pub order: SalesOrderId,

    /// 產品
    pub product: ProductId,

    /// 數量
    pub qty: i64,
}

impl SalesOrderLine {
    pub fn new(id: SalesOrderLineId, order: SalesOrderId, product: ProductId, qty: i64) -> Self {
        Self {
            id,
            order,
            product,
            qty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_descriptor_contract() {
        // 這些字串是對外契約，改名會破壞 ERP 其他模組
        assert_eq!(SalesOrderState::InPreparation.descriptor(), "InPreparation");
        assert_eq!(SalesOrderState::PendingPayment.descriptor(), "PendingPayment");
        assert_eq!(
            "CreditNoteReturn".parse::<SalesOrderState>().unwrap(),
            SalesOrderState::CreditNoteReturn
        );
    }

    #[test]
    fn test_plannable_states() {
        assert!(SalesOrderState::Created.is_plannable());
        assert!(SalesOrderState::InPreparation.is_plannable());
        assert!(SalesOrderState::PendingPayment.is_plannable());
        assert!(!SalesOrderState::Cancelled.is_plannable());
        assert!(!SalesOrderState::Paid.is_plannable());
    }

    #[test]
    fn test_priority_is_capped() {
        let due = Utc.with_ymd_and_hms(2025, 11, 20, 12, 0, 0).unwrap();
        let order = SalesOrder::new(SalesOrderId(1), "CLI-001", due).with_priority(99);

        assert_eq!(order.priority, 10);
        assert_eq!(order.state, SalesOrderState::Created);
    }
}

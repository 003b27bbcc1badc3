//! 實體識別碼
//!
//! 關聯式儲存層以自增整數為主鍵，這裡以 newtype 包裝避免跨表誤用。

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// 產品（成品 PT）
    ProductId,
    "PROD"
);
define_id!(
    /// 原物料（MP）
    RawMaterialId,
    "MP"
);
define_id!(
    /// 供應商
    SupplierId,
    "SUP"
);
define_id!(
    /// 產線
    LineId,
    "LINE"
);
define_id!(
    /// 銷售訂單（OV）
    SalesOrderId,
    "OV"
);
define_id!(
    /// 銷售訂單明細
    SalesOrderLineId,
    "OVL"
);
define_id!(
    /// 生產訂單（OP）
    OpId,
    "OP"
);
define_id!(
    /// 採購訂單（OC）
    OcId,
    "OC"
);
define_id!(
    /// 工作訂單（OT）
    OtId,
    "OT"
);
define_id!(
    /// 成品批次
    BatchId,
    "LOTE"
);
define_id!(
    /// 原料批次
    RawBatchId,
    "LOTE-MP"
);
define_id!(
    /// 成品保留
    PtReservationId,
    "RSV"
);
define_id!(
    /// 原料保留
    MpReservationId,
    "RSV-MP"
);
define_id!(
    /// 日曆時段（軟保留）
    SlotId,
    "SLOT"
);
define_id!(
    /// 供需對應（pegging）
    PeggingId,
    "PEG"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefix() {
        assert_eq!(OpId(7).to_string(), "OP-7");
        assert_eq!(RawBatchId(12).to_string(), "LOTE-MP-12");
    }

    #[test]
    fn test_ids_are_ordered() {
        // 排程走訪依 id 排序以保證決定性
        let mut ids = vec![ProductId(3), ProductId(1), ProductId(2)];
        ids.sort();
        assert_eq!(ids, vec![ProductId(1), ProductId(2), ProductId(3)]);
    }
}

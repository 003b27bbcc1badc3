//! 保留引擎
//!
//! 以 FEFO（最早到期先出）對批次建立保留。部分保留是合法結果：
//! 庫存不足時回傳實際保留量，由呼叫端決定缺口怎麼補。

use crate::stock::StockService;
use frost_core::{OpId, RawMaterialId, SalesOrderLineId};
use frost_store::Dataset;

/// 批次保留引擎
pub struct ReservationEngine;

impl ReservationEngine {
    /// 為一條銷售明細保留成品庫存
    ///
    /// 依 FEFO 走訪可用批次，逐批取 `min(可用, 尚需)`。
    /// 回傳實際保留量（可能小於請求量）。
    pub fn reserve_pt(ds: &mut Dataset, line: SalesOrderLineId, qty_requested: i64) -> i64 {
        let Some(product) = ds.sales_order_lines.get(&line).map(|l| l.product) else {
            return 0;
        };

        let rows = StockService::annotated_pt(ds, product);
        let mut remaining = qty_requested.max(0);
        let mut reserved_total = 0;

        for row in rows.iter().filter(|r| r.available > 0) {
            if remaining == 0 {
                break;
            }
            let take = row.available.min(remaining);
            ds.create_pt_reservation(line, row.batch, take);
            tracing::debug!("成品保留: 明細 {line} ← 批次 {} × {take}", row.batch);
            remaining -= take;
            reserved_total += take;
        }

        reserved_total
    }

    /// 為一張生產訂單保留原料庫存，與 `reserve_pt` 對稱
    pub fn reserve_mp(
        ds: &mut Dataset,
        op: OpId,
        raw_material: RawMaterialId,
        qty_requested: i64,
    ) -> i64 {
        let rows = StockService::annotated_mp(ds, raw_material);
        let mut remaining = qty_requested.max(0);
        let mut reserved_total = 0;

        for row in rows.iter().filter(|r| r.available > 0) {
            if remaining == 0 {
                break;
            }
            let take = row.available.min(remaining);
            ds.create_mp_reservation(op, row.batch, take);
            tracing::debug!("原料保留: {op} ← 批次 {} × {take}", row.batch);
            remaining -= take;
            reserved_total += take;
        }

        reserved_total
    }
}

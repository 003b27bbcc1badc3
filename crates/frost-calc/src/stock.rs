//! 庫存視角服務
//!
//! 可用量一律經由同一條註記管線計算：
//! 逐批次取（數量 − 生效中保留），StockService 與 ReservationEngine
//! 共用同一組列，兩邊對「可用」的認知在結構上一致。

use frost_core::{BatchId, ProductId, RawBatchId, RawMaterialId};
use frost_store::Dataset;

/// 批次可用量註記列
#[derive(Debug, Clone)]
pub struct BatchAvailability<Id> {
    /// 批次ID
    pub batch: Id,
    /// 批次數量
    pub qty: i64,
    /// 到期日
    pub expires_on: chrono::NaiveDate,
    /// 生效中保留總量
    pub reserved: i64,
    /// 可用量（qty − reserved）
    pub available: i64,
}

/// 純讀取的庫存服務
pub struct StockService;

impl StockService {
    /// 某產品 Available 批次的註記列，FEFO 排序
    pub fn annotated_pt(ds: &Dataset, product: ProductId) -> Vec<BatchAvailability<BatchId>> {
        ds.available_finished_batches_fefo(product)
            .into_iter()
            .map(|b| {
                let reserved = ds.active_pt_reserved_for_batch(b.id);
                BatchAvailability {
                    batch: b.id,
                    qty: b.qty,
                    expires_on: b.expires_on,
                    reserved,
                    available: b.qty - reserved,
                }
            })
            .collect()
    }

    /// 某原物料 Available 批次的註記列，FEFO 排序
    pub fn annotated_mp(ds: &Dataset, raw_material: RawMaterialId) -> Vec<BatchAvailability<RawBatchId>> {
        ds.available_raw_batches_fefo(raw_material)
            .into_iter()
            .map(|b| {
                let reserved = ds.active_mp_reserved_for_batch(b.id);
                BatchAvailability {
                    batch: b.id,
                    qty: b.qty,
                    expires_on: b.expires_on,
                    reserved,
                    available: b.qty - reserved,
                }
            })
            .collect()
    }

    /// 某產品的有效可用量；查無實體時回 0，不回錯誤
    pub fn available_pt(ds: &Dataset, product: ProductId) -> i64 {
        Self::annotated_pt(ds, product)
            .iter()
            .map(|row| row.available)
            .sum()
    }

    /// 某原物料的有效可用量
    pub fn available_mp(ds: &Dataset, raw_material: RawMaterialId) -> i64 {
        Self::annotated_mp(ds, raw_material)
            .iter()
            .map(|row| row.available)
            .sum()
    }

    /// 低於最低門檻的產品清單（可用量, 門檻）
    pub fn low_stock_products(ds: &Dataset) -> Vec<(ProductId, i64, i64)> {
        ds.products
            .values()
            .filter_map(|p| {
                let available = Self::available_pt(ds, p.id);
                (available < p.min_threshold).then_some((p.id, available, p.min_threshold))
            })
            .collect()
    }
}

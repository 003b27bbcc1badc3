//! 淨需求計算（階段 2：需求收集）
//!
//! 讀取視界內可計劃的銷售訂單，依（交期, 優先級）排序後以虛擬庫存
//! 貪婪分配：每條明細拆成「吃庫存」與「須生產」兩段，
//! 須生產段累計成逐產品淨需求並保留追溯來源。

use crate::stock::StockService;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use frost_core::{
    PlannerConfig, ProductId, SalesOrderId, SalesOrderLineId, SalesOrderState,
};
use frost_store::Dataset;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// 淨需求來源：哪條明細、交期、須生產多少
#[derive(Debug, Clone)]
pub struct DemandSource {
    pub line: SalesOrderLineId,
    pub order: SalesOrderId,
    pub due: DateTime<Utc>,
    pub qty_must_produce: i64,
}

/// 單一產品的淨需求
#[derive(Debug, Clone)]
pub struct NetDemand {
    /// 須生產總量
    pub qty: i64,
    /// 最早交期（決定期望開工日）
    pub earliest_due: NaiveDate,
    /// 追溯來源（pegging 用）
    pub sources: Vec<DemandSource>,
}

/// 吃庫存段：階段 3 只對「明日交付」的部分落成 JIT 保留
#[derive(Debug, Clone)]
pub struct StockTake {
    pub line: SalesOrderLineId,
    pub qty: i64,
    pub due_date: NaiveDate,
}

/// 階段 2 的收集結果
#[derive(Debug, Clone, Default)]
pub struct DemandCollection {
    /// 逐產品淨需求
    pub net_demand: BTreeMap<ProductId, NetDemand>,

    /// 分配後剩餘的虛擬成品庫存
    pub virtual_stock_pt: BTreeMap<ProductId, i64>,

    /// 各明細的吃庫存段
    pub stock_takes: Vec<StockTake>,

    /// 排隊的 OV 狀態更新（JIT 保留落地後才套用）
    pub ov_state_updates: Vec<(SalesOrderId, SalesOrderState)>,
}

impl Default for NetDemand {
    fn default() -> Self {
        Self {
            qty: 0,
            earliest_due: NaiveDate::MAX,
            sources: Vec::new(),
        }
    }
}

/// 淨需求計算器
pub struct NettingCalculator;

impl NettingCalculator {
    /// 收集視界內需求並完成虛擬庫存分配
    pub fn collect(ds: &Dataset, config: &PlannerConfig, today: NaiveDate) -> DemandCollection {
        let horizon_end = today + Duration::days(config.horizon_days);

        // 視界內、可計劃狀態的 OV，依（交期, 優先級高者先, 主鍵）排序
        let mut orders: Vec<_> = ds
            .sales_orders
            .values()
            .filter(|ov| ov.state.is_plannable())
            .filter(|ov| {
                let due = ov.delivery_due.date_naive();
                due >= today && due <= horizon_end
            })
            .collect();
        orders.sort_by_key(|ov| (ov.delivery_due, Reverse(ov.priority), ov.id));

        let mut collection = DemandCollection::default();

        for ov in orders {
            let mut any_must_produce = false;

            for line in ds.lines_of_order(ov.id) {
                let already_reserved = ds.active_pt_reserved_for_line(line.id);
                let remaining = (line.qty - already_reserved).max(0);
                if remaining == 0 {
                    continue;
                }

                let pool = collection
                    .virtual_stock_pt
                    .entry(line.product)
                    .or_insert_with(|| StockService::available_pt(ds, line.product));

                let stock_take = remaining.min(*pool);
                *pool -= stock_take;
                let must_produce = remaining - stock_take;

                if stock_take > 0 {
                    collection.stock_takes.push(StockTake {
                        line: line.id,
                        qty: stock_take,
                        due_date: ov.delivery_due.date_naive(),
                    });
                }

                if must_produce > 0 {
                    any_must_produce = true;
                    let entry = collection.net_demand.entry(line.product).or_default();
                    entry.qty += must_produce;
                    entry.earliest_due = entry.earliest_due.min(ov.delivery_due.date_naive());
                    entry.sources.push(DemandSource {
                        line: line.id,
                        order: ov.id,
                        due: ov.delivery_due,
                        qty_must_produce: must_produce,
                    });
                }
            }

            let next_state = if any_must_produce {
                SalesOrderState::InPreparation
            } else {
                SalesOrderState::PendingPayment
            };
            if ov.state != next_state {
                collection.ov_state_updates.push((ov.id, next_state));
            }

            tracing::debug!(
                run_date = %today,
                "需求收集: {} 交期 {} → {}",
                ov.id,
                ov.delivery_due.date_naive(),
                next_state.descriptor()
            );
        }

        collection
    }
}

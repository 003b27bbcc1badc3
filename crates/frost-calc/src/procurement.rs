//! 採購需求彙整與 OC 發出（階段 5/6）
//!
//! 原料短缺先逐供應商累計，整個階段 4 跑完後一次發出：
//! 每個供應商以 (供應商, 預計到貨日) upsert 一張 InProcess 採購單，
//! 明細數量整筆覆寫，重複執行收斂到同一組列。

use crate::{PlanWarning, RunReport};
use chrono::{Duration, NaiveDate};
use frost_core::{PurchaseOrder, RawMaterialId, SupplierId};
use frost_store::Dataset;
use std::collections::BTreeMap;

/// 單一供應商的待購需求
#[derive(Debug, Clone)]
pub struct PurchaseNeed {
    /// 逐原物料缺口
    pub items: BTreeMap<RawMaterialId, i64>,

    /// 最早需到貨日（各短缺 OP 的開工日減收貨緩衝取最小）
    pub earliest_required: NaiveDate,
}

/// 階段 4 累計、階段 5/6 發出的採購簿
#[derive(Debug, Clone, Default)]
pub struct PurchaseBook {
    needs: BTreeMap<SupplierId, PurchaseNeed>,
}

impl PurchaseBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.needs.is_empty()
    }

    /// 累計一筆缺口
    pub fn add(
        &mut self,
        supplier: SupplierId,
        raw_material: RawMaterialId,
        qty: i64,
        required_by: NaiveDate,
    ) {
        let need = self.needs.entry(supplier).or_insert_with(|| PurchaseNeed {
            items: BTreeMap::new(),
            earliest_required: required_by,
        });
        *need.items.entry(raw_material).or_insert(0) += qty;
        need.earliest_required = need.earliest_required.min(required_by);
    }

    /// 發出採購單
    ///
    /// 下單日落在過去時夾緊到今天、到貨日順延（延誤告警，非錯誤）。
    pub fn emit(self, ds: &mut Dataset, today: NaiveDate, report: &mut RunReport) {
        for (supplier_id, need) in self.needs {
            let Some(supplier) = ds.suppliers.get(&supplier_id).cloned() else {
                tracing::error!("採購需求指向不存在的供應商 {supplier_id}，跳過");
                continue;
            };

            let mut eta = need.earliest_required;
            let mut requested_on = eta - Duration::days(supplier.lead_time_days);
            if requested_on < today {
                requested_on = today;
                eta = today + Duration::days(supplier.lead_time_days);
                let message = format!(
                    "供應商 {} 的採購已無法準時：下單日夾緊為 {today}，到貨順延至 {eta}",
                    supplier.name
                );
                tracing::warn!(run_date = %today, "{message}");
                report.add_warning(PlanWarning::lateness(message));
            }

            let oc_id = match ds.find_inflight_oc(supplier_id, eta) {
                Some(id) => id,
                None => {
                    let id = ds.alloc_oc_id();
                    ds.purchase_orders
                        .insert(id, PurchaseOrder::new(id, supplier_id, requested_on, eta));
                    id
                }
            };

            let oc = ds
                .purchase_orders
                .get_mut(&oc_id)
                .expect("剛查到或插入的 OC 必然存在");
            for (raw_material_id, qty_needed) in &need.items {
                let min_order = ds
                    .raw_materials
                    .get(raw_material_id)
                    .map(|rm| rm.min_order_qty)
                    .unwrap_or(1);
                oc.upsert_line(*raw_material_id, (*qty_needed).max(min_order));
            }

            report.ocs_upserted += 1;
            tracing::info!(
                run_date = %today,
                "採購單 {oc_id}: 供應商 {} 到貨 {eta}，{} 項原料",
                supplier.name,
                need.items.len()
            );
        }
    }
}

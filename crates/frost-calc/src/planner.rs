//! MRP 主計劃器（六階段管線）
//!
//! 整次執行在單一交易內完成：
//! 1) 取消清理 → 2) 需求收集與淨額 → 3) JIT 成品保留 →
//! 4) 逐產品淨額排產與 pegging → 4b) 原料檢查 → 5/6) 採購單發出。
//! 單一產品的配置缺失只跳過該產品；其餘錯誤使整筆交易回滾。

use crate::capacity::CapacityModel;
use crate::invariants;
use crate::netting::{DemandCollection, NetDemand, NettingCalculator};
use crate::procurement::PurchaseBook;
use crate::reservation::ReservationEngine;
use crate::stock::StockService;
use crate::{PlanWarning, RunReport};
use chrono::{Duration, NaiveDate};
use frost_core::{
    BatchState, FinishedBatch, LineCapacity, OpId, PlanError, PlannerConfig, Product, ProductId,
    ProductionOrder, ProductionOrderState, RawMaterialId, Result, SalesOrderState,
};
use frost_store::{Dataset, PlanningStore};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// 階段 4 的共享虛擬池：逐產品處理時遞減，避免重複承諾同一份庫存
struct VirtualPools {
    stock_pt: BTreeMap<ProductId, i64>,
    stock_mp: BTreeMap<RawMaterialId, i64>,
    oc_inflight: BTreeMap<RawMaterialId, i64>,
}

/// MRP 計劃器
pub struct MrpPlanner<'a> {
    config: &'a PlannerConfig,
}

impl<'a> MrpPlanner<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self { config }
    }

    /// 以獨立交易執行一次 MRP
    pub fn run(&self, store: &PlanningStore, today: NaiveDate) -> Result<RunReport> {
        store.transaction(|ds| self.run_in_tx(ds, today))
    }

    /// 在既有交易內執行（與戰術排程組成同一筆交易時使用）
    pub fn run_in_tx(&self, ds: &mut Dataset, today: NaiveDate) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new(today);

        tracing::info!(run_date = %today, run_id = %report.run_id, "MRP 執行開始");

        tracing::info!(run_date = %today, "階段 1: 取消清理");
        self.phase_cancellations(ds, &mut report);

        tracing::info!(run_date = %today, "階段 2: 需求收集");
        let collection = NettingCalculator::collect(ds, self.config, today);

        tracing::info!(run_date = %today, "階段 3: JIT 成品保留");
        self.phase_jit_reservations(ds, today, &collection, &mut report);

        tracing::info!(run_date = %today, "階段 4: 淨額排產");
        let mut book = PurchaseBook::new();
        self.phase_plan_products(ds, today, collection, &mut book, &mut report)?;

        tracing::info!(run_date = %today, "階段 5/6: 採購單發出");
        book.emit(ds, today, &mut report);

        for (product, available, threshold) in StockService::low_stock_products(ds) {
            let message =
                format!("庫存低於最低門檻: {product} 可用 {available} < 門檻 {threshold}");
            tracing::warn!(run_date = %today, "{message}");
            report.add_warning(PlanWarning::low_stock(product, message));
        }

        invariants::check_all(ds, self.config)?;

        report.calculation_time_ms = Some(started.elapsed().as_millis());
        tracing::info!(
            run_date = %today,
            "MRP 執行完成: OP 新建 {} 改量 {} 取消 {}，OC {} 張，耗時 {:?}",
            report.ops_created,
            report.ops_resized,
            report.ops_cancelled,
            report.ocs_upserted,
            started.elapsed()
        );
        Ok(report)
    }

    /// 階段 1：已取消 OV 的生效中保留一併取消
    fn phase_cancellations(&self, ds: &mut Dataset, report: &mut RunReport) {
        let cancelled_orders: Vec<_> = ds
            .sales_orders
            .values()
            .filter(|ov| ov.state == SalesOrderState::Cancelled)
            .map(|ov| ov.id)
            .collect();

        for ov_id in cancelled_orders {
            for rsv_id in ds.active_pt_reservation_ids_for_order(ov_id) {
                if let Some(rsv) = ds.pt_reservations.get_mut(&rsv_id) {
                    rsv.state = frost_core::PtReservationState::Cancelled;
                    report.pt_reservations_cancelled += 1;
                }
            }
        }
    }

    /// 階段 3：明日交付的吃庫存段落成 JIT 保留，再套用排隊的 OV 狀態
    fn phase_jit_reservations(
        &self,
        ds: &mut Dataset,
        today: NaiveDate,
        collection: &DemandCollection,
        report: &mut RunReport,
    ) {
        let tomorrow = today + Duration::days(1);

        for take in &collection.stock_takes {
            if take.due_date != tomorrow || take.qty <= 0 {
                continue;
            }
            let before = ds.pt_reservations.len();
            let reserved = ReservationEngine::reserve_pt(ds, take.line, take.qty);
            report.pt_reservations_created += ds.pt_reservations.len() - before;
            if reserved < take.qty {
                tracing::warn!(
                    run_date = %today,
                    "JIT 保留不足: 明細 {} 請求 {} 實得 {reserved}",
                    take.line,
                    take.qty
                );
            }
        }

        for (ov_id, state) in &collection.ov_state_updates {
            if let Some(ov) = ds.sales_orders.get_mut(ov_id) {
                ov.state = *state;
            }
        }
    }

    /// 階段 4：逐產品淨額 → 排產 → pegging → 原料檢查
    fn phase_plan_products(
        &self,
        ds: &mut Dataset,
        today: NaiveDate,
        collection: DemandCollection,
        book: &mut PurchaseBook,
        report: &mut RunReport,
    ) -> Result<()> {
        let net_demand = collection.net_demand;
        let mut pools = VirtualPools {
            stock_pt: collection.virtual_stock_pt,
            stock_mp: BTreeMap::new(),
            oc_inflight: BTreeMap::new(),
        };

        let mut products: BTreeSet<ProductId> = net_demand.keys().copied().collect();
        products.extend(
            ds.production_orders
                .values()
                .filter(|op| op.state.is_open())
                .map(|op| op.product),
        );

        for product in products {
            match self.plan_product(
                ds,
                today,
                product,
                net_demand.get(&product),
                &mut pools,
                book,
                report,
            ) {
                Ok(()) => {}
                Err(PlanError::ConfigMissing(message)) => {
                    // 單一產品的配置缺失不中斷整次執行
                    tracing::error!(run_date = %today, "產品 {product} 跳過: {message}");
                    report.add_warning(PlanWarning::config_missing(product, message));
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    fn plan_product(
        &self,
        ds: &mut Dataset,
        today: NaiveDate,
        product: ProductId,
        demand: Option<&NetDemand>,
        pools: &mut VirtualPools,
        book: &mut PurchaseBook,
        report: &mut RunReport,
    ) -> Result<()> {
        let virtual_pt = *pools
            .stock_pt
            .entry(product)
            .or_insert_with(|| StockService::available_pt(ds, product));
        let product_row = ds
            .products
            .get(&product)
            .cloned()
            .ok_or_else(|| PlanError::ConfigMissing("產品不在目錄中".to_string()))?;

        let demand_qty = demand.map(|d| d.qty).unwrap_or(0);
        let need_total = demand_qty + (product_row.min_threshold - virtual_pt).max(0);

        let (existing_supply, fixed_supply) = {
            let open = ds.open_ops_for_product(product);
            let existing: i64 = open.iter().map(|op| op.qty).sum();
            let fixed: i64 = open
                .iter()
                .filter(|op| op.state != ProductionOrderState::Waiting)
                .map(|op| op.qty)
                .sum();
            (existing, fixed)
        };
        let target_waiting = (need_total - fixed_supply).max(0);

        tracing::debug!(
            run_date = %today,
            "產品 {product}: 需求 {demand_qty} 總需要 {need_total} 既有 {existing_supply} 固定 {fixed_supply} → 目標 {target_waiting}"
        );

        if target_waiting > 0 {
            self.upsert_waiting_op(
                ds,
                today,
                &product_row,
                demand,
                target_waiting,
                pools,
                book,
                report,
            )
        } else if need_total < existing_supply {
            self.cancel_surplus_waiting(ds, today, product, existing_supply - need_total, report);
            Ok(())
        } else {
            Ok(())
        }
    }

    /// 每產品每次執行維持恰好一張 Waiting OP（聚合模式）
    #[allow(clippy::too_many_arguments)]
    fn upsert_waiting_op(
        &self,
        ds: &mut Dataset,
        today: NaiveDate,
        product_row: &Product,
        demand: Option<&NetDemand>,
        target_waiting: i64,
        pools: &mut VirtualPools,
        book: &mut PurchaseBook,
        report: &mut RunReport,
    ) -> Result<()> {
        let product = product_row.id;

        // 排產前先驗證全部配置，避免半套寫入後才跳過
        let capacities: Vec<LineCapacity> = ds
            .capacities_for_product(product)
            .into_iter()
            .cloned()
            .collect();
        if capacities.is_empty() {
            return Err(PlanError::ConfigMissing(
                "沒有每小時產量為正的產線規則".to_string(),
            ));
        }
        let recipe = ds
            .recipes
            .get(&product)
            .cloned()
            .ok_or_else(|| PlanError::ConfigMissing("沒有配方".to_string()))?;
        for item in &recipe.items {
            let raw_material = ds.raw_materials.get(&item.raw_material).ok_or_else(|| {
                PlanError::ConfigMissing(format!("配方指向不存在的原物料 {}", item.raw_material))
            })?;
            if ds.suppliers.get(&raw_material.supplier).is_none() {
                return Err(PlanError::ConfigMissing(format!(
                    "原物料 {} 的供應商不存在",
                    raw_material.id
                )));
            }
        }

        // cancel-shrink 先於 upsert：只保留最早的一張 Waiting OP
        let mut waiting: Vec<(NaiveDate, OpId)> = ds
            .waiting_ops_for_product(product)
            .iter()
            .map(|op| (op.planned_start, op.id))
            .collect();
        waiting.sort();
        let kept = waiting.first().map(|(_, id)| *id);
        for (_, extra) in waiting.iter().skip(1) {
            self.cancel_op(ds, today, *extra, report);
        }

        let (op_id, created) = match kept {
            Some(id) => {
                // 重排：舊的時段、原料保留與 pegging 全部重建
                ds.clear_slots_for_op(id);
                ds.cancel_mp_reservations_for_op(id);
                ds.clear_pegging_for_op(id);
                (id, false)
            }
            None => {
                let id = ds.alloc_op_id();
                ds.production_orders.insert(
                    id,
                    ProductionOrder::new(id, product, target_waiting, today, today),
                );
                (id, true)
            }
        };

        let cap_refs: Vec<&LineCapacity> = capacities.iter().collect();
        let total_rate = CapacityModel::total_units_per_hour(&cap_refs);
        let hours = CapacityModel::hours_needed(target_waiting, total_rate);
        let days_needed = (hours + self.config.daily_hour_budget - 1) / self.config.daily_hour_budget;
        let earliest_due = demand.map(|d| d.earliest_due).unwrap_or(today);
        let desired_start = (earliest_due
            - Duration::days(days_needed + self.config.delivery_buffer_days))
        .max(today);

        let model = CapacityModel::new(self.config);
        let walk = model.walk_forward(ds, op_id, &cap_refs, desired_start, hours)?;

        if let Some(op) = ds.production_orders.get_mut(&op_id) {
            op.qty = target_waiting;
            op.state = ProductionOrderState::Waiting;
            op.planned_start = walk.start;
            op.planned_end = walk.end;
        }
        for slot in &walk.slots {
            ds.create_slot(op_id, slot.line, slot.date, slot.hours, slot.qty);
        }

        tracing::info!(
            run_date = %today,
            "{} {op_id}: 產品 {product} × {target_waiting}，{hours} 工時，{} → {}",
            if created { "新建" } else { "改量" },
            walk.start,
            walk.end
        );
        if created {
            report.ops_created += 1;
        } else {
            report.ops_resized += 1;
        }

        // pegging 與交期級聯：完工加緩衝晚於原交期時往後推，絕不提前
        if let Some(demand) = demand {
            let pushed_due_date = walk.end + Duration::days(self.config.delivery_buffer_days);
            for source in &demand.sources {
                ds.create_pegging(op_id, source.line, source.qty_must_produce);

                if pushed_due_date > source.due.date_naive() {
                    if let Some(ov) = ds.sales_orders.get_mut(&source.order) {
                        let candidate = pushed_due_date.and_time(ov.delivery_due.time()).and_utc();
                        if candidate > ov.delivery_due {
                            tracing::warn!(
                                run_date = %today,
                                "交期後推: {} {} → {}",
                                ov.id,
                                ov.delivery_due.date_naive(),
                                pushed_due_date
                            );
                            ov.delivery_due = candidate;
                            report.ovs_rescheduled += 1;
                            report.add_warning(PlanWarning::lateness(format!(
                                "{} 交期後推至 {pushed_due_date}",
                                ov.id
                            )));
                        }
                        ov.state = SalesOrderState::InPreparation;
                    }
                }
            }
        }

        // 成品批次殼：OP 產出落點的預建批次
        let expires_on = today + Duration::days(product_row.shelf_life_days);
        let shell = ds.production_orders.get(&op_id).and_then(|op| op.batch);
        match shell {
            Some(batch_id) => {
                if let Some(batch) = ds.finished_batches.get_mut(&batch_id) {
                    batch.qty = target_waiting;
                    batch.produced_on = today;
                    batch.expires_on = expires_on;
                    batch.state = BatchState::Waiting;
                }
            }
            None => {
                let batch_id = ds.alloc_batch_id();
                ds.finished_batches.insert(
                    batch_id,
                    FinishedBatch::new(batch_id, product, target_waiting, today, expires_on)
                        .with_state(BatchState::Waiting),
                );
                if let Some(op) = ds.production_orders.get_mut(&op_id) {
                    op.batch = Some(batch_id);
                }
            }
        }

        self.check_materials(ds, today, op_id, &recipe, pools, book, report);
        Ok(())
    }

    /// 階段 4b：原料檢查，依序扣減在庫、在途 OC，餘量轉採購缺口
    fn check_materials(
        &self,
        ds: &mut Dataset,
        today: NaiveDate,
        op_id: OpId,
        recipe: &frost_core::Recipe,
        pools: &mut VirtualPools,
        book: &mut PurchaseBook,
        report: &mut RunReport,
    ) {
        let Some((op_qty, planned_start)) = ds
            .production_orders
            .get(&op_id)
            .map(|op| (op.qty, op.planned_start))
        else {
            return;
        };

        let mut covered_by_stock_only = true;
        let mut max_shortage_lead = 0i64;

        for item in &recipe.items {
            let need = (item.qty_per_unit * Decimal::from(op_qty))
                .ceil()
                .to_i64()
                .unwrap_or(0);
            if need <= 0 {
                continue;
            }

            let pool = pools
                .stock_mp
                .entry(item.raw_material)
                .or_insert_with(|| StockService::available_mp(ds, item.raw_material));
            let take_onhand = need.min(*pool);
            if take_onhand > 0 {
                let before = ds.mp_reservations.len();
                let reserved = ReservationEngine::reserve_mp(ds, op_id, item.raw_material, take_onhand);
                report.mp_reservations_created += ds.mp_reservations.len() - before;
                pools
                    .stock_mp
                    .entry(item.raw_material)
                    .and_modify(|p| *p -= reserved);
            }

            let mut remaining = need - take_onhand;
            if remaining > 0 {
                covered_by_stock_only = false;

                let inflight = pools
                    .oc_inflight
                    .entry(item.raw_material)
                    .or_insert_with(|| ds.inflight_oc_qty(item.raw_material));
                let take_inflight = remaining.min(*inflight);
                *inflight -= take_inflight;
                remaining -= take_inflight;

                if remaining > 0 {
                    // upsert 前已驗證原物料與供應商存在
                    if let Some(raw_material) = ds.raw_materials.get(&item.raw_material) {
                        if let Some(supplier) = ds.suppliers.get(&raw_material.supplier) {
                            book.add(
                                supplier.id,
                                item.raw_material,
                                remaining,
                                planned_start - Duration::days(self.config.mp_receipt_buffer_days),
                            );
                            max_shortage_lead = max_shortage_lead.max(supplier.lead_time_days);
                            tracing::debug!(
                                run_date = %today,
                                "{op_id} 原料缺口: {} × {remaining} → 供應商 {}",
                                item.raw_material,
                                supplier.id
                            );
                        }
                    }
                }
            }
        }

        if let Some(op) = ds.production_orders.get_mut(&op_id) {
            op.state = if covered_by_stock_only {
                ProductionOrderState::PendingStart
            } else {
                ProductionOrderState::Waiting
            };
            op.material_start = Some(
                planned_start
                    - Duration::days(max_shortage_lead + self.config.mp_receipt_buffer_days),
            );
            tracing::debug!(
                run_date = %today,
                "{op_id} 原料檢查完成 → {}",
                op.state.descriptor()
            );
        }
    }

    /// 供給過剩：最晚開工的 Waiting OP 先取消，直到吸收完過剩量
    fn cancel_surplus_waiting(
        &self,
        ds: &mut Dataset,
        today: NaiveDate,
        product: ProductId,
        surplus: i64,
        report: &mut RunReport,
    ) {
        let mut waiting: Vec<(NaiveDate, OpId, i64)> = ds
            .waiting_ops_for_product(product)
            .iter()
            .map(|op| (op.planned_start, op.id, op.qty))
            .collect();
        waiting.sort_by_key(|(start, id, _)| (Reverse(*start), Reverse(*id)));

        let mut remaining = surplus;
        for (_, op_id, qty) in waiting {
            if remaining <= 0 {
                break;
            }
            tracing::info!(run_date = %today, "供給過剩 {remaining}: 取消 {op_id}（{qty} 單位）");
            self.cancel_op(ds, today, op_id, report);
            remaining -= qty;
        }
    }

    /// 取消 OP：清時段、取消原料保留、清 pegging、刪批次殼
    fn cancel_op(&self, ds: &mut Dataset, today: NaiveDate, op_id: OpId, report: &mut RunReport) {
        ds.clear_slots_for_op(op_id);
        ds.cancel_mp_reservations_for_op(op_id);
        ds.clear_pegging_for_op(op_id);

        let shell = match ds.production_orders.get_mut(&op_id) {
            Some(op) => {
                op.state = ProductionOrderState::Cancelled;
                op.batch.take()
            }
            None => None,
        };
        if let Some(batch_id) = shell {
            // 只刪未產出的殼，實體批次不動
            if ds
                .finished_batches
                .get(&batch_id)
                .map(|b| b.state == BatchState::Waiting)
                .unwrap_or(false)
            {
                ds.finished_batches.remove(&batch_id);
            }
        }

        report.ops_cancelled += 1;
        tracing::info!(run_date = %today, "{op_id} 已取消");
    }
}

//! 資料集：與關聯式資料表一一對應的實體集合
//!
//! 以 `BTreeMap` 保存，走訪順序即主鍵順序，計劃結果具決定性。
//! 欄位公開，查詢輔助方法提供核心引擎常用的過濾視角。

use chrono::NaiveDate;
use frost_core::{
    BatchId, BatchState, CalendarSlot, FinishedBatch, LineCapacity, LineId, MpReservation,
    MpReservationId, OcId, OpId, OtId, PeggingId, PeggingLink, Product, ProductId, ProductionLine,
    ProductionOrder, ProductionOrderState, PtReservation, PtReservationId, PurchaseOrder,
    PurchaseOrderState, RawBatch, RawBatchId, RawMaterial, RawMaterialId, Recipe, SalesOrder,
    SalesOrderId, SalesOrderLine, SalesOrderLineId, SlotId, Supplier, SupplierId, WorkOrder,
    WorkOrderState,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 主鍵計數器（AutoField 語義）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdCounters {
    product: u32,
    raw_material: u32,
    supplier: u32,
    line: u32,
    sales_order: u32,
    sales_order_line: u32,
    op: u32,
    oc: u32,
    ot: u32,
    batch: u32,
    raw_batch: u32,
    pt_reservation: u32,
    mp_reservation: u32,
    slot: u32,
    pegging: u32,
}

fn bump(counter: &mut u32) -> u32 {
    *counter += 1;
    *counter
}

/// 完整資料集
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    // 目錄（外部維護，核心唯讀）
    pub products: BTreeMap<ProductId, Product>,
    pub raw_materials: BTreeMap<RawMaterialId, RawMaterial>,
    pub suppliers: BTreeMap<SupplierId, Supplier>,
    pub recipes: BTreeMap<ProductId, Recipe>,
    pub lines: BTreeMap<LineId, ProductionLine>,
    pub line_capacities: Vec<LineCapacity>,

    // 銷售
    pub sales_orders: BTreeMap<SalesOrderId, SalesOrder>,
    pub sales_order_lines: BTreeMap<SalesOrderLineId, SalesOrderLine>,

    // 庫存
    pub finished_batches: BTreeMap<BatchId, FinishedBatch>,
    pub raw_batches: BTreeMap<RawBatchId, RawBatch>,
    pub pt_reservations: BTreeMap<PtReservationId, PtReservation>,
    pub mp_reservations: BTreeMap<MpReservationId, MpReservation>,

    // 生產
    pub production_orders: BTreeMap<OpId, ProductionOrder>,
    pub calendar_slots: BTreeMap<SlotId, CalendarSlot>,
    pub work_orders: BTreeMap<OtId, WorkOrder>,
    pub pegging_links: BTreeMap<PeggingId, PeggingLink>,

    // 採購
    pub purchase_orders: BTreeMap<OcId, PurchaseOrder>,

    counters: IdCounters,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- 主鍵分配 ----

    pub fn alloc_product_id(&mut self) -> ProductId {
        ProductId(bump(&mut self.counters.product))
    }

    pub fn alloc_raw_material_id(&mut self) -> RawMaterialId {
        RawMaterialId(bump(&mut self.counters.raw_material))
    }

    pub fn alloc_supplier_id(&mut self) -> SupplierId {
        SupplierId(bump(&mut self.counters.supplier))
    }

    pub fn alloc_line_id(&mut self) -> LineId {
        LineId(bump(&mut self.counters.line))
    }

    pub fn alloc_sales_order_id(&mut self) -> SalesOrderId {
        SalesOrderId(bump(&mut self.counters.sales_order))
    }

    pub fn alloc_sales_order_line_id(&mut self) -> SalesOrderLineId {
        SalesOrderLineId(bump(&mut self.counters.sales_order_line))
    }

    pub fn alloc_batch_id(&mut self) -> BatchId {
        BatchId(bump(&mut self.counters.batch))
    }

    pub fn alloc_raw_batch_id(&mut self) -> RawBatchId {
        RawBatchId(bump(&mut self.counters.raw_batch))
    }

    pub fn alloc_op_id(&mut self) -> OpId {
        OpId(bump(&mut self.counters.op))
    }

    pub fn alloc_oc_id(&mut self) -> OcId {
        OcId(bump(&mut self.counters.oc))
    }

    pub fn alloc_ot_id(&mut self) -> OtId {
        OtId(bump(&mut self.counters.ot))
    }

    pub fn alloc_pt_reservation_id(&mut self) -> PtReservationId {
        PtReservationId(bump(&mut self.counters.pt_reservation))
    }

    pub fn alloc_mp_reservation_id(&mut self) -> MpReservationId {
        MpReservationId(bump(&mut self.counters.mp_reservation))
    }

    pub fn alloc_slot_id(&mut self) -> SlotId {
        SlotId(bump(&mut self.counters.slot))
    }

    pub fn alloc_pegging_id(&mut self) -> PeggingId {
        PeggingId(bump(&mut self.counters.pegging))
    }

    // ---- 交易列建立（核心引擎熱路徑） ----

    /// 建立生效中的成品保留
    pub fn create_pt_reservation(
        &mut self,
        line: SalesOrderLineId,
        batch: BatchId,
        qty_reserved: i64,
    ) -> PtReservationId {
        let id = self.alloc_pt_reservation_id();
        self.pt_reservations
            .insert(id, PtReservation::new(id, line, batch, qty_reserved));
        id
    }

    /// 建立生效中的原料保留
    pub fn create_mp_reservation(
        &mut self,
        op: OpId,
        batch: RawBatchId,
        qty_reserved: i64,
    ) -> MpReservationId {
        let id = self.alloc_mp_reservation_id();
        self.mp_reservations
            .insert(id, MpReservation::new(id, op, batch, qty_reserved));
        id
    }

    /// 建立日曆軟保留時段
    pub fn create_slot(
        &mut self,
        op: OpId,
        line: LineId,
        date: NaiveDate,
        hours_reserved: i64,
        qty_to_produce: i64,
    ) -> SlotId {
        let id = self.alloc_slot_id();
        self.calendar_slots.insert(
            id,
            CalendarSlot {
                id,
                op,
                line,
                date,
                hours_reserved,
                qty_to_produce,
            },
        );
        id
    }

    /// 建立供需對應
    pub fn create_pegging(&mut self, op: OpId, line: SalesOrderLineId, qty_assigned: i64) -> PeggingId {
        let id = self.alloc_pegging_id();
        self.pegging_links.insert(
            id,
            PeggingLink {
                id,
                op,
                line,
                qty_assigned,
            },
        );
        id
    }

    // ---- 銷售查詢 ----

    /// 某訂單的全部明細（依主鍵序）
    pub fn lines_of_order(&self, order: SalesOrderId) -> Vec<&SalesOrderLine> {
        self.sales_order_lines
            .values()
            .filter(|l| l.order == order)
            .collect()
    }

    /// 某明細目前生效中保留的總量
    pub fn active_pt_reserved_for_line(&self, line: SalesOrderLineId) -> i64 {
        self.pt_reservations
            .values()
            .filter(|r| r.line == line && r.is_active())
            .map(|r| r.qty_reserved)
            .sum()
    }

    /// 某訂單底下生效中的成品保留
    pub fn active_pt_reservation_ids_for_order(&self, order: SalesOrderId) -> Vec<PtReservationId> {
        let line_ids: Vec<SalesOrderLineId> =
            self.lines_of_order(order).iter().map(|l| l.id).collect();
        self.pt_reservations
            .values()
            .filter(|r| r.is_active() && line_ids.contains(&r.line))
            .map(|r| r.id)
            .collect()
    }

    // ---- 庫存查詢 ----

    /// 某成品批次目前生效中保留的總量
    pub fn active_pt_reserved_for_batch(&self, batch: BatchId) -> i64 {
        self.pt_reservations
            .values()
            .filter(|r| r.batch == batch && r.is_active())
            .map(|r| r.qty_reserved)
            .sum()
    }

    /// 某原料批次目前生效中保留的總量
    pub fn active_mp_reserved_for_batch(&self, batch: RawBatchId) -> i64 {
        self.mp_reservations
            .values()
            .filter(|r| r.batch == batch && r.is_active())
            .map(|r| r.qty_reserved)
            .sum()
    }

    /// 某產品 Available 狀態的批次，依到期日排序（FEFO）
    pub fn available_finished_batches_fefo(&self, product: ProductId) -> Vec<&FinishedBatch> {
        let mut batches: Vec<&FinishedBatch> = self
            .finished_batches
            .values()
            .filter(|b| b.product == product && b.state == BatchState::Available)
            .collect();
        batches.sort_by_key(|b| (b.expires_on, b.id));
        batches
    }

    /// 某原物料 Available 狀態的批次，依到期日排序（FEFO）
    pub fn available_raw_batches_fefo(&self, raw_material: RawMaterialId) -> Vec<&RawBatch> {
        let mut batches: Vec<&RawBatch> = self
            .raw_batches
            .values()
            .filter(|b| b.raw_material == raw_material && b.state == BatchState::Available)
            .collect();
        batches.sort_by_key(|b| (b.expires_on, b.id));
        batches
    }

    // ---- 生產查詢 ----

    /// 某產品非終態的 OP（計入既有供給）
    pub fn open_ops_for_product(&self, product: ProductId) -> Vec<&ProductionOrder> {
        self.production_orders
            .values()
            .filter(|op| op.product == product && op.state.is_open())
            .collect()
    }

    /// 某產品 Waiting 狀態的 OP
    pub fn waiting_ops_for_product(&self, product: ProductId) -> Vec<&ProductionOrder> {
        self.production_orders
            .values()
            .filter(|op| op.product == product && op.state == ProductionOrderState::Waiting)
            .collect()
    }

    /// 指定日期開工、待開工狀態的 OP（戰術排程的輸入）
    pub fn pending_start_ops_on(&self, date: NaiveDate) -> Vec<&ProductionOrder> {
        self.production_orders
            .values()
            .filter(|op| op.state == ProductionOrderState::PendingStart && op.planned_start == date)
            .collect()
    }

    /// 指定日期開工、已排程狀態的 OP（重排程的輸入）
    pub fn scheduled_ops_on(&self, date: NaiveDate) -> Vec<&ProductionOrder> {
        self.production_orders
            .values()
            .filter(|op| op.state == ProductionOrderState::Scheduled && op.planned_start == date)
            .collect()
    }

    /// 某 OP 的全部軟保留時段
    pub fn slot_ids_for_op(&self, op: OpId) -> Vec<SlotId> {
        self.calendar_slots
            .values()
            .filter(|s| s.op == op)
            .map(|s| s.id)
            .collect()
    }

    /// 清除某 OP 的全部軟保留時段
    pub fn clear_slots_for_op(&mut self, op: OpId) -> usize {
        let ids = self.slot_ids_for_op(op);
        for id in &ids {
            self.calendar_slots.remove(id);
        }
        ids.len()
    }

    /// 清除某 OP 在指定日期的軟保留時段
    pub fn clear_slots_for_op_on(&mut self, op: OpId, date: NaiveDate) -> usize {
        let ids: Vec<SlotId> = self
            .calendar_slots
            .values()
            .filter(|s| s.op == op && s.date == date)
            .map(|s| s.id)
            .collect();
        for id in &ids {
            self.calendar_slots.remove(id);
        }
        ids.len()
    }

    /// 取消某 OP 的全部生效中原料保留
    pub fn cancel_mp_reservations_for_op(&mut self, op: OpId) -> usize {
        let ids: Vec<MpReservationId> = self
            .mp_reservations
            .values()
            .filter(|r| r.op == op && r.is_active())
            .map(|r| r.id)
            .collect();
        for id in &ids {
            if let Some(rsv) = self.mp_reservations.get_mut(id) {
                rsv.state = frost_core::MpReservationState::Cancelled;
            }
        }
        ids.len()
    }

    /// 某 OP 生效中的原料保留
    pub fn active_mp_reservations_for_op(&self, op: OpId) -> Vec<&MpReservation> {
        self.mp_reservations
            .values()
            .filter(|r| r.op == op && r.is_active())
            .collect()
    }

    /// 清除某 OP 的供需對應
    pub fn clear_pegging_for_op(&mut self, op: OpId) -> usize {
        let ids: Vec<PeggingId> = self
            .pegging_links
            .values()
            .filter(|p| p.op == op)
            .map(|p| p.id)
            .collect();
        for id in &ids {
            self.pegging_links.remove(id);
        }
        ids.len()
    }

    /// 某銷售明細被 pegging 到的產量總和
    pub fn pegged_qty_for_line(&self, line: SalesOrderLineId) -> i64 {
        self.pegging_links
            .values()
            .filter(|p| {
                p.line == line
                    && self
                        .production_orders
                        .get(&p.op)
                        .map(|op| op.state.is_open())
                        .unwrap_or(false)
            })
            .map(|p| p.qty_assigned)
            .sum()
    }

    /// 刪除某 OP 待執行狀態的 OT
    pub fn delete_pending_work_orders_for_op(&mut self, op: OpId) -> usize {
        let ids: Vec<OtId> = self
            .work_orders
            .values()
            .filter(|ot| ot.op == op && ot.state == WorkOrderState::Pending)
            .map(|ot| ot.id)
            .collect();
        for id in &ids {
            self.work_orders.remove(id);
        }
        ids.len()
    }

    // ---- 產能查詢 ----

    /// 某產品的產能規則（只含每小時產量為正的規則）
    pub fn capacities_for_product(&self, product: ProductId) -> Vec<&LineCapacity> {
        self.line_capacities
            .iter()
            .filter(|c| c.product == product && c.units_per_hour > 0)
            .collect()
    }

    /// 查某產品在某產線的產能規則
    pub fn capacity_rule(&self, product: ProductId, line: LineId) -> Option<&LineCapacity> {
        self.line_capacities
            .iter()
            .find(|c| c.product == product && c.line == line)
    }

    /// 可承接排程的產線
    pub fn schedulable_lines(&self) -> Vec<&ProductionLine> {
        self.lines.values().filter(|l| l.is_schedulable()).collect()
    }

    // ---- 採購查詢 ----

    /// 某原物料在途（InProcess 採購單）數量總和
    pub fn inflight_oc_qty(&self, raw_material: RawMaterialId) -> i64 {
        self.purchase_orders
            .values()
            .filter(|oc| oc.state == PurchaseOrderState::InProcess)
            .map(|oc| oc.qty_for(raw_material))
            .sum()
    }

    /// 以 (供應商, 預計到貨日) 為鍵查進行中的採購單
    pub fn find_inflight_oc(&self, supplier: SupplierId, eta: NaiveDate) -> Option<OcId> {
        self.purchase_orders
            .values()
            .find(|oc| {
                oc.supplier == supplier
                    && oc.eta == eta
                    && oc.state == PurchaseOrderState::InProcess
            })
            .map(|oc| oc.id)
    }
}

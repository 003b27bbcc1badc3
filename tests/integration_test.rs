//! 集成測試：核心情境與端到端性質
//!
//! 固定 `daily_hour_budget = 16`、出貨與收貨緩衝各 1 天、視界 7 天。
//! 每次執行結束前計劃器自行檢核全部不變量，這裡再對
//! 各情境的可觀察結果逐項斷言。

use chrono::{DateTime, Duration, NaiveDate, Utc};
use frostmrp::*;
use rust_decimal::Decimal;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()
}

fn due_in(days: i64) -> DateTime<Utc> {
    (today() + Duration::days(days))
        .and_hms_opt(10, 0, 0)
        .unwrap()
        .and_utc()
}

/// 基礎目錄：一個產品、一條產線、一條產能規則
fn base_dataset(units_per_hour: i64, min_batch: i64) -> (Dataset, ProductId, LineId) {
    let mut ds = Dataset::new();
    let product = ds.alloc_product_id();
    ds.products
        .insert(product, Product::new(product, "Pizza congelada", 30));
    let line = ds.alloc_line_id();
    ds.lines.insert(line, ProductionLine::new(line, "Linea 1"));
    ds.line_capacities
        .push(LineCapacity::new(product, line, units_per_hour).with_min_batch(min_batch));
    (ds, product, line)
}

/// 供應商 + 原物料 + 單項配方
fn add_material(
    ds: &mut Dataset,
    product: ProductId,
    qty_per_unit: i64,
    lead_time_days: i64,
) -> (RawMaterialId, SupplierId) {
    let supplier = ds.alloc_supplier_id();
    ds.suppliers
        .insert(supplier, Supplier::new(supplier, "Molinos SA", lead_time_days));
    let material = ds.alloc_raw_material_id();
    ds.raw_materials
        .insert(material, RawMaterial::new(material, "Harina", supplier));
    ds.recipes.insert(
        product,
        Recipe::new(product).with_item(material, Decimal::from(qty_per_unit)),
    );
    (material, supplier)
}

fn add_pt_stock(ds: &mut Dataset, product: ProductId, qty: i64, expires_in_days: i64) -> BatchId {
    let batch = ds.alloc_batch_id();
    ds.finished_batches.insert(
        batch,
        FinishedBatch::new(
            batch,
            product,
            qty,
            today() - Duration::days(1),
            today() + Duration::days(expires_in_days),
        ),
    );
    batch
}

fn add_mp_stock(ds: &mut Dataset, material: RawMaterialId, qty: i64) -> RawBatchId {
    let batch = ds.alloc_raw_batch_id();
    ds.raw_batches.insert(
        batch,
        RawBatch::new(batch, material, qty, today() + Duration::days(90)),
    );
    batch
}

fn add_order(
    ds: &mut Dataset,
    product: ProductId,
    qty: i64,
    due: DateTime<Utc>,
) -> (SalesOrderId, SalesOrderLineId) {
    let order = ds.alloc_sales_order_id();
    ds.sales_orders
        .insert(order, SalesOrder::new(order, "CLI-001", due));
    let line = ds.alloc_sales_order_line_id();
    ds.sales_order_lines
        .insert(line, SalesOrderLine::new(line, order, product, qty));
    (order, line)
}

#[test]
fn test_jit_reservation_covers_next_day_delivery() {
    // 明日交付 10 單位，庫存 20：只做 JIT 保留，不投產不採購
    let (mut ds, product, _line) = base_dataset(25, 0);
    let batch = add_pt_stock(&mut ds, product, 20, 30);
    let (order, line) = add_order(&mut ds, product, 10, due_in(1));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let summary = run_daily_planning(&store, &config, today()).unwrap();

    assert_eq!(summary.report.pt_reservations_created, 1);
    assert_eq!(summary.report.ops_created, 0);
    assert_eq!(summary.report.ocs_upserted, 0);

    store
        .read(|ds| {
            assert_eq!(ds.sales_orders[&order].state, SalesOrderState::PendingPayment);
            assert_eq!(ds.active_pt_reserved_for_line(line), 10);
            assert_eq!(ds.active_pt_reserved_for_batch(batch), 10);
            assert!(ds.production_orders.is_empty());
            assert!(ds.purchase_orders.is_empty());
            // 可用量 = 實體 − 保留
            assert_eq!(StockService::available_pt(ds, product), 10);
        })
        .unwrap();
}

#[test]
fn test_net_demand_with_materials_on_hand() {
    // 交期 +5、需產 100、MP 充足：OP 待開工，無採購
    let (mut ds, product, _line) = base_dataset(25, 0);
    let (material, _supplier) = add_material(&mut ds, product, 2, 3);
    add_mp_stock(&mut ds, material, 250);
    let (order, line) = add_order(&mut ds, product, 100, due_in(5));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let summary = run_daily_planning(&store, &config, today()).unwrap();

    assert_eq!(summary.report.ops_created, 1);
    assert_eq!(summary.report.ocs_upserted, 0);
    assert_eq!(summary.report.ovs_rescheduled, 0);

    store
        .read(|ds| {
            let op = ds.production_orders.values().next().unwrap();
            assert_eq!(op.qty, 100);
            assert_eq!(op.state, ProductionOrderState::PendingStart);
            // 4 小時工作 1 天：today+5 − 1 − 1 = today+3
            assert_eq!(op.planned_start, today() + Duration::days(3));
            assert_eq!(op.planned_end, today() + Duration::days(3));
            assert_eq!(op.material_start, Some(today() + Duration::days(2)));

            // 配方 2:1 → 保留 200
            let reserved: i64 = ds
                .active_mp_reservations_for_op(op.id)
                .iter()
                .map(|r| r.qty_reserved)
                .sum();
            assert_eq!(reserved, 200);
            assert_eq!(StockService::available_mp(ds, material), 50);

            // pegging 覆蓋整條明細
            assert_eq!(ds.pegged_qty_for_line(line), 100);
            assert_eq!(ds.sales_orders[&order].state, SalesOrderState::InPreparation);
            assert!(ds.purchase_orders.is_empty());

            // OP 產出落點的批次殼
            let shell = ds.finished_batches[&op.batch.unwrap()].clone();
            assert_eq!(shell.state, BatchState::Waiting);
            assert_eq!(shell.qty, 100);
        })
        .unwrap();
}

#[test]
fn test_material_shortage_raises_purchase_order() {
    // MP 只有 50：OP 停在 Waiting，缺口 150 轉採購，下單日夾緊到今天
    let (mut ds, product, _line) = base_dataset(25, 0);
    let (material, supplier) = add_material(&mut ds, product, 2, 3);
    add_mp_stock(&mut ds, material, 50);
    add_order(&mut ds, product, 100, due_in(5));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let summary = run_daily_planning(&store, &config, today()).unwrap();

    assert_eq!(summary.report.ocs_upserted, 1);
    assert!(summary.report.has_warning(WarningKind::LatenessAlert));

    store
        .read(|ds| {
            let op = ds.production_orders.values().next().unwrap();
            assert_eq!(op.state, ProductionOrderState::Waiting);
            // 短缺供應商 lead 3 + 收貨緩衝 1
            assert_eq!(op.material_start, Some(op.planned_start - Duration::days(4)));

            let reserved: i64 = ds
                .active_mp_reservations_for_op(op.id)
                .iter()
                .map(|r| r.qty_reserved)
                .sum();
            assert_eq!(reserved, 50);

            let oc = ds.purchase_orders.values().next().unwrap();
            assert_eq!(oc.supplier, supplier);
            assert_eq!(oc.state, PurchaseOrderState::InProcess);
            assert_eq!(oc.qty_for(material), 150);
            // eta 原為 planned_start − 1 = today+2，下單日 today−1 已過期：
            // 夾緊 requested_on = today、eta = today + lead
            assert_eq!(oc.requested_on, today());
            assert_eq!(oc.eta, today() + Duration::days(3));
        })
        .unwrap();
}

#[test]
fn test_capacity_slip_pushes_delivery_dates() {
    // 兩張 OV 各 600、同交期 +2：48 工時 = 3 天，完工 +2、
    // 加緩衝 = +3 晚於交期 → 兩張交期都後推（保留 10:00 時刻）
    let (mut ds, product, _line) = base_dataset(25, 0);
    let (material, _supplier) = add_material(&mut ds, product, 1, 3);
    add_mp_stock(&mut ds, material, 1200);
    let (order_a, _) = add_order(&mut ds, product, 600, due_in(2));
    let (order_b, _) = add_order(&mut ds, product, 600, due_in(2));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let summary = run_daily_planning(&store, &config, today()).unwrap();

    assert_eq!(summary.report.ovs_rescheduled, 2);

    store
        .read(|ds| {
            let op = ds.production_orders.values().next().unwrap();
            assert_eq!(op.qty, 1200);
            assert_eq!(op.planned_start, today());
            assert_eq!(op.planned_end, today() + Duration::days(2));

            for order in [order_a, order_b] {
                let ov = &ds.sales_orders[&order];
                assert_eq!(ov.state, SalesOrderState::InPreparation);
                assert_eq!(ov.delivery_due, due_in(3));
            }
        })
        .unwrap();
}

#[test]
fn test_exact_capacity_fit_keeps_due_date() {
    // 800 單位 = 32 工時 = 2 天：完工 +1、加緩衝 = 交期 +2，不後推（P6）
    let (mut ds, product, _line) = base_dataset(25, 0);
    let (material, _supplier) = add_material(&mut ds, product, 1, 3);
    add_mp_stock(&mut ds, material, 800);
    let (order, _) = add_order(&mut ds, product, 800, due_in(2));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let summary = run_daily_planning(&store, &config, today()).unwrap();

    assert_eq!(summary.report.ovs_rescheduled, 0);
    store
        .read(|ds| {
            let op = ds.production_orders.values().next().unwrap();
            assert_eq!(op.planned_end, today() + Duration::days(1));
            assert_eq!(ds.sales_orders[&order].delivery_due, due_in(2));
        })
        .unwrap();
}

#[test]
fn test_dropped_tail_recovered_by_next_mrp_run() {
    // 105 單位、批量 50、最小批量 30：尾批 5 不投產，
    // 排程日投 100；下次 MRP 以新的 5 單位 Waiting OP 補缺口
    let (mut ds, product, _line) = base_dataset(50, 30);
    let (material, _supplier) = add_material(&mut ds, product, 1, 3);
    add_mp_stock(&mut ds, material, 500);
    add_order(&mut ds, product, 105, due_in(3));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();

    let summary = run_daily_planning(&store, &config, today()).unwrap();
    assert_eq!(summary.schedule.ots_created, 2);
    assert_eq!(summary.schedule.ops_scheduled, 1);

    let first_op = store
        .read(|ds| {
            let op = ds.production_orders.values().next().unwrap().clone();
            assert_eq!(op.state, ProductionOrderState::Scheduled);
            // 投產量縮為 100
            assert_eq!(op.qty, 100);
            assert_eq!(
                ds.work_orders.values().map(|ot| ot.qty_programmed).sum::<i64>(),
                100
            );
            op.id
        })
        .unwrap();

    // 第二次 MRP：缺口 5 以新 OP 補上
    MrpPlanner::new(&config).run(&store, today()).unwrap();

    store
        .read(|ds| {
            let tail_op = ds
                .production_orders
                .values()
                .find(|op| op.id != first_op)
                .unwrap();
            assert_eq!(tail_op.qty, 5);
            assert_eq!(tail_op.state, ProductionOrderState::PendingStart);
        })
        .unwrap();
}

#[test]
fn test_surplus_waiting_op_is_cancelled() {
    // 視界內無需求、門檻 0：既有 Waiting OP 整張取消並清乾淨
    let (mut ds, product, line) = base_dataset(25, 0);
    let (material, _supplier) = add_material(&mut ds, product, 2, 3);
    let mp_batch = add_mp_stock(&mut ds, material, 400);

    let op_id = ds.alloc_op_id();
    let mut op = ProductionOrder::new(
        op_id,
        product,
        200,
        today() + Duration::days(1),
        today() + Duration::days(1),
    );
    let shell = ds.alloc_batch_id();
    ds.finished_batches.insert(
        shell,
        FinishedBatch::new(shell, product, 200, today(), today() + Duration::days(30))
            .with_state(BatchState::Waiting),
    );
    op.batch = Some(shell);
    ds.production_orders.insert(op_id, op);
    ds.create_slot(op_id, line, today() + Duration::days(1), 8, 200);
    ds.create_mp_reservation(op_id, mp_batch, 400);

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let summary = run_daily_planning(&store, &config, today()).unwrap();

    assert_eq!(summary.report.ops_cancelled, 1);

    store
        .read(|ds| {
            assert_eq!(
                ds.production_orders[&op_id].state,
                ProductionOrderState::Cancelled
            );
            assert!(ds.slot_ids_for_op(op_id).is_empty());
            assert!(ds.active_mp_reservations_for_op(op_id).is_empty());
            // 未產出的批次殼一併刪除
            assert!(!ds.finished_batches.contains_key(&shell));
            assert_eq!(StockService::available_mp(ds, material), 400);
        })
        .unwrap();
}

#[test]
fn test_purchase_emission_is_idempotent() {
    // 資料集不變時重跑：同一張 OC、同一組明細，不重複不漂移
    let (mut ds, product, _line) = base_dataset(25, 0);
    let (material, supplier) = add_material(&mut ds, product, 2, 3);
    add_mp_stock(&mut ds, material, 50);
    add_order(&mut ds, product, 100, due_in(5));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let planner = MrpPlanner::new(&config);

    planner.run(&store, today()).unwrap();
    let first: Vec<(SupplierId, NaiveDate, NaiveDate, Vec<(RawMaterialId, i64)>)> = store
        .read(|ds| {
            ds.purchase_orders
                .values()
                .map(|oc| {
                    (
                        oc.supplier,
                        oc.eta,
                        oc.requested_on,
                        oc.lines.iter().map(|l| (l.raw_material, l.qty)).collect(),
                    )
                })
                .collect()
        })
        .unwrap();

    planner.run(&store, today()).unwrap();
    let second = store
        .read(|ds| {
            ds.purchase_orders
                .values()
                .map(|oc| {
                    (
                        oc.supplier,
                        oc.eta,
                        oc.requested_on,
                        oc.lines.iter().map(|l| (l.raw_material, l.qty)).collect(),
                    )
                })
                .collect::<Vec<_>>()
        })
        .unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert_eq!(first[0].0, supplier);
}

#[test]
fn test_reruns_never_pull_due_dates_earlier() {
    // S4 後推過的交期在重跑時保持不變
    let (mut ds, product, _line) = base_dataset(25, 0);
    let (material, _supplier) = add_material(&mut ds, product, 1, 3);
    add_mp_stock(&mut ds, material, 1200);
    let (order_a, _) = add_order(&mut ds, product, 600, due_in(2));
    let (order_b, _) = add_order(&mut ds, product, 600, due_in(2));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let planner = MrpPlanner::new(&config);

    planner.run(&store, today()).unwrap();
    let pushed = store
        .read(|ds| {
            (
                ds.sales_orders[&order_a].delivery_due,
                ds.sales_orders[&order_b].delivery_due,
            )
        })
        .unwrap();
    assert_eq!(pushed.0, due_in(3));

    planner.run(&store, today()).unwrap();
    store
        .read(|ds| {
            assert_eq!(ds.sales_orders[&order_a].delivery_due, pushed.0);
            assert_eq!(ds.sales_orders[&order_b].delivery_due, pushed.1);
        })
        .unwrap();
}

#[test]
fn test_capacity_shared_across_products() {
    // 兩個產品共用一條線：同日總工時不得超過 16 小時，
    // 第二個產品被擠到隔天
    let (mut ds, product_a, line) = base_dataset(25, 0);
    let product_b = ds.alloc_product_id();
    ds.products
        .insert(product_b, Product::new(product_b, "Empanada", 60));
    ds.line_capacities
        .push(LineCapacity::new(product_b, line, 25));

    let (material, _supplier) = add_material(&mut ds, product_a, 1, 3);
    ds.recipes.insert(
        product_b,
        Recipe::new(product_b).with_item(material, Decimal::from(1)),
    );
    add_mp_stock(&mut ds, material, 800);

    // 各 300 單位 = 各 12 小時，單日塞不下兩張
    add_order(&mut ds, product_a, 300, due_in(4));
    add_order(&mut ds, product_b, 300, due_in(4));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    run_daily_planning(&store, &config, today()).unwrap();

    store
        .read(|ds| {
            let budget = config.daily_minute_horizon();
            let mut by_date: std::collections::BTreeMap<NaiveDate, i64> =
                std::collections::BTreeMap::new();
            for slot in ds.calendar_slots.values() {
                *by_date.entry(slot.date).or_insert(0) += slot.hours_reserved * 60;
            }
            assert!(by_date.values().all(|minutes| *minutes <= budget));
            // 確實分散在兩天以上
            assert!(by_date.len() >= 2);
        })
        .unwrap();
}

#[test]
fn test_replan_rebuilds_next_day_schedule() {
    let (mut ds, product, _line) = base_dataset(50, 0);
    let (material, _supplier) = add_material(&mut ds, product, 1, 3);
    add_mp_stock(&mut ds, material, 200);
    add_order(&mut ds, product, 100, due_in(3));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let summary = run_daily_planning(&store, &config, today()).unwrap();
    assert_eq!(summary.schedule.ops_scheduled, 1);
    let plan_date = summary.schedule.plan_date;
    let first_ots: Vec<OtId> = store
        .read(|ds| ds.work_orders.keys().copied().collect())
        .unwrap();

    let outcome = replan_production(&store, &config, plan_date).unwrap();

    assert!(outcome.feasible);
    assert_eq!(outcome.ops_scheduled, 1);
    store
        .read(|ds| {
            let new_ots: Vec<OtId> = ds.work_orders.keys().copied().collect();
            assert_eq!(new_ots.len(), first_ots.len());
            assert!(new_ots.iter().all(|id| !first_ots.contains(id)));
        })
        .unwrap();
}

#[test]
fn test_cancelled_order_releases_reservations() {
    // 階段 1：已取消 OV 的生效保留轉 Cancelled，庫存放回可用池
    let (mut ds, product, _line) = base_dataset(25, 0);
    let batch = add_pt_stock(&mut ds, product, 50, 30);
    let (order, line) = add_order(&mut ds, product, 20, due_in(2));
    ds.create_pt_reservation(line, batch, 20);
    ds.sales_orders.get_mut(&order).unwrap().state = SalesOrderState::Cancelled;

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let summary = run_daily_planning(&store, &config, today()).unwrap();

    assert_eq!(summary.report.pt_reservations_cancelled, 1);
    store
        .read(|ds| {
            assert_eq!(ds.active_pt_reserved_for_line(line), 0);
            assert_eq!(StockService::available_pt(ds, product), 50);
        })
        .unwrap();
}

#[test]
fn test_config_missing_skips_product_but_run_continues() {
    // 產品 A 缺配方 → 跳過並告警；產品 B 照常排產
    let (mut ds, product_a, line) = base_dataset(25, 0);
    let product_b = ds.alloc_product_id();
    ds.products
        .insert(product_b, Product::new(product_b, "Empanada", 60));
    ds.line_capacities
        .push(LineCapacity::new(product_b, line, 25));
    let (material, _supplier) = add_material(&mut ds, product_b, 1, 3);
    add_mp_stock(&mut ds, material, 100);

    add_order(&mut ds, product_a, 50, due_in(4));
    add_order(&mut ds, product_b, 50, due_in(4));

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    let summary = run_daily_planning(&store, &config, today()).unwrap();

    assert!(summary.report.has_warning(WarningKind::ConfigMissing));
    store
        .read(|ds| {
            let ops: Vec<_> = ds.production_orders.values().collect();
            assert_eq!(ops.len(), 1);
            assert_eq!(ops[0].product, product_b);
        })
        .unwrap();
}

#[test]
fn test_min_threshold_tops_up_stock() {
    // 門檻 80、庫存 30、無銷售需求但有既有 OP 讓產品進入淨額迴圈
    let (mut ds, product, _line) = base_dataset(25, 0);
    ds.products.get_mut(&product).unwrap().min_threshold = 80;
    let (material, _supplier) = add_material(&mut ds, product, 1, 3);
    add_mp_stock(&mut ds, material, 100);
    add_pt_stock(&mut ds, product, 30, 30);

    let stale = ds.alloc_op_id();
    ds.production_orders.insert(
        stale,
        ProductionOrder::new(stale, product, 10, today(), today()),
    );

    let store = PlanningStore::new(ds);
    let config = PlannerConfig::default();
    run_daily_planning(&store, &config, today()).unwrap();

    store
        .read(|ds| {
            // 80 − 30 = 50 的補貨 OP（upsert 既有 Waiting OP）
            let op = &ds.production_orders[&stale];
            assert_eq!(op.qty, 50);
            assert_eq!(op.state, ProductionOrderState::PendingStart);
        })
        .unwrap();
}

//! 每日計劃完整範例
//!
//! 建一個小型工廠資料集（兩個產品、兩條產線、一個供應商），
//! 跑一次完整的每日計劃並印出結果。

use chrono::{Duration, NaiveDate};
use frostmrp::*;
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    println!("===== Frost MRP Daily Planning Example =====\n");

    let today = NaiveDate::from_ymd_opt(2025, 11, 3).expect("固定示範日期");
    let store = PlanningStore::new(build_factory(today));
    let config = PlannerConfig::default();

    println!("[1] Run daily planning for {today}");
    let summary = run_daily_planning(&store, &config, today)?;

    println!("\n[2] MRP report");
    println!("{}", serde_json::to_string_pretty(&summary.report)?);

    println!("\n[3] Tactical schedule for {}", summary.schedule.plan_date);
    println!(
        "    OTs created: {}, OPs scheduled: {}, OPs reverted: {}",
        summary.schedule.ots_created, summary.schedule.ops_scheduled, summary.schedule.ops_reverted
    );

    store.read(|ds| {
        println!("\n[4] Resulting orders");
        for op in ds.production_orders.values() {
            println!(
                "    {} {} × {} [{}] {} → {}",
                op.id,
                op.product,
                op.qty,
                op.state.descriptor(),
                op.planned_start,
                op.planned_end
            );
        }
        for oc in ds.purchase_orders.values() {
            println!(
                "    {} supplier {} eta {} ({} lines)",
                oc.id,
                oc.supplier,
                oc.eta,
                oc.lines.len()
            );
        }
        for ot in ds.work_orders.values() {
            println!(
                "    {} op {} line {} × {} {} → {}",
                ot.id,
                ot.op,
                ot.line,
                ot.qty_programmed,
                ot.start_programmed.time(),
                ot.end_programmed.time()
            );
        }
    })?;

    Ok(())
}

/// 兩個產品：披薩明日可從庫存出貨，餡餅需投產且原料短缺
fn build_factory(today: NaiveDate) -> Dataset {
    let mut ds = Dataset::new();

    let pizza = ds.alloc_product_id();
    ds.products
        .insert(pizza, Product::new(pizza, "Pizza congelada", 30));
    let empanada = ds.alloc_product_id();
    ds.products
        .insert(empanada, Product::new(empanada, "Empanada", 60));

    let line_a = ds.alloc_line_id();
    ds.lines.insert(line_a, ProductionLine::new(line_a, "Linea A"));
    let line_b = ds.alloc_line_id();
    ds.lines.insert(line_b, ProductionLine::new(line_b, "Linea B"));
    ds.line_capacities
        .push(LineCapacity::new(pizza, line_a, 25).with_min_batch(10));
    ds.line_capacities
        .push(LineCapacity::new(empanada, line_b, 50).with_min_batch(20));

    let supplier = ds.alloc_supplier_id();
    ds.suppliers
        .insert(supplier, Supplier::new(supplier, "Molinos SA", 3));
    let harina = ds.alloc_raw_material_id();
    ds.raw_materials.insert(
        harina,
        RawMaterial::new(harina, "Harina", supplier).with_min_order_qty(50),
    );
    ds.recipes.insert(
        pizza,
        Recipe::new(pizza).with_item(harina, Decimal::from(2)),
    );
    ds.recipes.insert(
        empanada,
        Recipe::new(empanada).with_item(harina, Decimal::new(5, 1)), // 0.5
    );

    let pt = ds.alloc_batch_id();
    ds.finished_batches.insert(
        pt,
        FinishedBatch::new(pt, pizza, 80, today - Duration::days(3), today + Duration::days(27)),
    );
    let mp = ds.alloc_raw_batch_id();
    ds.raw_batches
        .insert(mp, RawBatch::new(mp, harina, 60, today + Duration::days(90)));

    // 明日出貨的披薩（純 JIT）
    let ov1 = ds.alloc_sales_order_id();
    ds.sales_orders.insert(
        ov1,
        SalesOrder::new(
            ov1,
            "CLI-001",
            (today + Duration::days(1)).and_hms_opt(9, 0, 0).expect("合法時刻").and_utc(),
        ),
    );
    let l1 = ds.alloc_sales_order_line_id();
    ds.sales_order_lines
        .insert(l1, SalesOrderLine::new(l1, ov1, pizza, 40));

    // 三天後的餡餅（投產 + 採購）
    let ov2 = ds.alloc_sales_order_id();
    ds.sales_orders.insert(
        ov2,
        SalesOrder::new(
            ov2,
            "CLI-002",
            (today + Duration::days(3)).and_hms_opt(15, 0, 0).expect("合法時刻").and_utc(),
        )
        .with_priority(8),
    );
    let l2 = ds.alloc_sales_order_line_id();
    ds.sales_order_lines
        .insert(l2, SalesOrderLine::new(l2, ov2, empanada, 300));

    ds
}

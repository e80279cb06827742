// Small dev utility: reset the database and seed the demo scenario
// (11 materials / 6 devices / 8 molds plus a schedulable backlog).
//
// Usage:
//   cargo run --bin seed_demo_db -- [db_path]
//
// This goes through the API layer so the same validation applies as in
// production writes.

use std::error::Error;
use std::fs;
use std::path::Path;

use aux_scheduler::api::material_api::CreateMaterialRequest;
use aux_scheduler::api::plan_api::CreatePlanRequest;
use aux_scheduler::api::relation_api::{CreateDeviceRelationRequest, CreateMoldRelationRequest};
use aux_scheduler::api::resource_api::{CreateDeviceRequest, CreateMoldRequest};
use aux_scheduler::app::{get_default_db_path, AppState};
use chrono::{Duration, Local};

fn main() -> Result<(), Box<dyn Error>> {
    aux_scheduler::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let app = AppState::new(&db_path)?;
    seed_reference_data(&app)?;
    seed_relations(&app)?;
    seed_plans(&app)?;

    let materials = app.material_api.list_materials(Some(1), Some(50))?;
    let devices = app.resource_api.list_devices()?;
    let molds = app.resource_api.list_molds()?;
    let plans = app.plan_api.list_plans(None, Some(1), Some(50))?;

    println!(
        "seeded: materials={} devices={} molds={} plans={}",
        materials.total,
        devices.len(),
        molds.len(),
        plans.total
    );
    println!("db: {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_reference_data(app: &AppState) -> Result<(), Box<dyn Error>> {
    for i in 1..=11 {
        app.material_api.create_material(CreateMaterialRequest {
            material_code: format!("MAT-{:03}", i),
            material_name: format!("物料{:03}", i),
            material_type: Some((if i % 2 == 0 { "外壳件" } else { "结构件" }).to_string()),
            spec: Some(format!("SPEC-{:03}", i)),
        })?;
    }

    // 设备: 小时产能各不相同, 便于观察产出率封顶
    let capacities = [240.0, 480.0, 300.0, 360.0, 200.0, 420.0];
    for (i, cap) in capacities.iter().enumerate() {
        app.resource_api.create_device(CreateDeviceRequest {
            device_code: format!("DEV-{:03}", i + 1),
            device_name: format!("{}号注塑机", i + 1),
            capacity_per_hour: Some(*cap),
        })?;
    }

    // 模具: MOLD-005 / MOLD-008 为单副本 (排他绑定场景)
    let quantities = [2, 3, 2, 1, 1, 2, 3, 1];
    for (i, qty) in quantities.iter().enumerate() {
        app.resource_api.create_mold(CreateMoldRequest {
            mold_code: format!("MOLD-{:03}", i + 1),
            mold_name: format!("{}号模具", i + 1),
            quantity: *qty,
        })?;
    }

    Ok(())
}

fn seed_relations(app: &AppState) -> Result<(), Box<dyn Error>> {
    // (物料序号, 设备序号, 权重)
    let device_relations: &[(u32, u32, i32)] = &[
        (1, 2, 95), // MAT-001 首选 DEV-002
        (1, 1, 60),
        (1, 3, 55),
        (2, 1, 90),
        (2, 4, 70),
        (3, 3, 85),
        (3, 5, 40),
        (4, 2, 80),
        (4, 6, 75),
        (5, 4, 88),
        (5, 5, 62),
        (6, 6, 92),
        (6, 1, 50),
        (7, 2, 78),
        (7, 3, 66),
        (8, 4, 84),
        (8, 6, 58),
        (9, 5, 90),
        (9, 1, 45),
        (10, 6, 82),
        (10, 2, 64),
        (11, 3, 76),
        (11, 4, 52),
    ];

    for (mat, dev, weight) in device_relations {
        app.relation_api
            .create_device_relation(CreateDeviceRelationRequest {
                material_code: format!("MAT-{:03}", mat),
                device_code: format!("DEV-{:03}", dev),
                weight: *weight,
            })?;
    }

    // (物料序号, 模具序号, 权重, 循环秒, 单循环产出)
    let mold_relations: &[(u32, u32, i32, f64, f64)] = &[
        (1, 5, 95, 36.0, 4.0), // MAT-001 首选 MOLD-005 (单副本)
        (1, 1, 70, 30.0, 2.0),
        (2, 2, 88, 45.0, 6.0),
        (2, 3, 60, 40.0, 4.0),
        (3, 4, 82, 50.0, 5.0),
        (4, 6, 86, 32.0, 3.0),
        (4, 2, 55, 45.0, 6.0),
        (5, 7, 90, 60.0, 8.0),
        (6, 8, 93, 48.0, 4.0), // MOLD-008 单副本
        (7, 1, 74, 30.0, 2.0),
        (8, 3, 80, 40.0, 4.0),
        (9, 7, 68, 60.0, 8.0),
        (10, 6, 77, 32.0, 3.0),
        (11, 4, 72, 50.0, 5.0),
    ];

    for (mat, mold, weight, cycle, output) in mold_relations {
        app.relation_api
            .create_mold_relation(CreateMoldRelationRequest {
                material_code: format!("MAT-{:03}", mat),
                mold_code: format!("MOLD-{:03}", mold),
                weight: *weight,
                cycle_time_s: *cycle,
                output_per_cycle: *output,
            })?;
    }

    Ok(())
}

fn seed_plans(app: &AppState) -> Result<(), Box<dyn Error>> {
    let today = Local::now().date_naive();

    // 紧迫度排序场景: 同物料两计划, 早交期先占首选资源
    let plans = [
        ("PL-URGENT-001", 1_u32, 200.0, 2_i64),
        ("PL-DEV-WEIGHT-001", 1, 150.0, 5),
        ("PL-202608-001", 2, 300.0, 7),
        ("PL-202608-002", 5, 480.0, 4),
        ("PL-202608-003", 6, 120.0, 9),
        ("PL-202608-004", 8, 260.0, 6),
    ];

    for (number, mat, qty, days) in plans {
        app.plan_api.create_plan(CreatePlanRequest {
            plan_number: number.to_string(),
            material_code: format!("MAT-{:03}", mat),
            planned_quantity: qty,
            due_date: today + Duration::days(days),
        })?;
    }

    Ok(())
}

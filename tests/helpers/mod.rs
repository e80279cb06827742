// ==========================================
// 测试辅助 - 临时库上的应用装配与数据构建
// ==========================================

use aux_scheduler::api::material_api::CreateMaterialRequest;
use aux_scheduler::api::plan_api::CreatePlanRequest;
use aux_scheduler::api::relation_api::{CreateDeviceRelationRequest, CreateMoldRelationRequest};
use aux_scheduler::api::resource_api::{CreateDeviceRequest, CreateMoldRequest};
use aux_scheduler::app::AppState;
use aux_scheduler::engine::{RunOptions, RunSummary};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use tempfile::TempDir;

/// 临时数据库上的完整应用
pub struct TestApp {
    pub app: AppState,
    _tmp: TempDir,
}

pub fn test_app() -> TestApp {
    aux_scheduler::logging::init_test();

    let tmp = TempDir::new().expect("创建临时目录失败");
    let db_path = tmp.path().join("aux_scheduler_test.db");
    let app = AppState::new(db_path.to_str().unwrap()).expect("初始化AppState失败");
    TestApp { app, _tmp: tmp }
}

/// 固定排程基准时刻 (确定性断言用)
pub fn base_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 8, 7)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

// ==========================================
// 数据构建
// ==========================================

pub fn create_material(app: &AppState, code: &str) {
    app.material_api
        .create_material(CreateMaterialRequest {
            material_code: code.to_string(),
            material_name: format!("物料{}", code),
            material_type: None,
            spec: None,
        })
        .expect("创建物料失败");
}

pub fn create_device(app: &AppState, code: &str, capacity_per_hour: Option<f64>) {
    app.resource_api
        .create_device(CreateDeviceRequest {
            device_code: code.to_string(),
            device_name: format!("设备{}", code),
            capacity_per_hour,
        })
        .expect("创建设备失败");
}

pub fn create_mold(app: &AppState, code: &str, quantity: i32) {
    app.resource_api
        .create_mold(CreateMoldRequest {
            mold_code: code.to_string(),
            mold_name: format!("模具{}", code),
            quantity,
        })
        .expect("创建模具失败");
}

pub fn relate_device(app: &AppState, material: &str, device: &str, weight: i32) {
    app.relation_api
        .create_device_relation(CreateDeviceRelationRequest {
            material_code: material.to_string(),
            device_code: device.to_string(),
            weight,
        })
        .expect("创建设备关系失败");
}

pub fn relate_mold(
    app: &AppState,
    material: &str,
    mold: &str,
    weight: i32,
    cycle_time_s: f64,
    output_per_cycle: f64,
) {
    app.relation_api
        .create_mold_relation(CreateMoldRelationRequest {
            material_code: material.to_string(),
            mold_code: mold.to_string(),
            weight,
            cycle_time_s,
            output_per_cycle,
        })
        .expect("创建模具关系失败");
}

pub fn create_plan(app: &AppState, number: &str, material: &str, quantity: f64, due_in_days: i64) {
    app.plan_api
        .create_plan(CreatePlanRequest {
            plan_number: number.to_string(),
            material_code: material.to_string(),
            planned_quantity: quantity,
            due_date: Local::now().date_naive() + Duration::days(due_in_days),
        })
        .expect("创建计划失败");
}

/// 以指定基准时刻触发一次排程运行
pub fn run_at(app: &AppState, now: NaiveDateTime) -> RunSummary {
    app.scheduling_api
        .run(RunOptions {
            max_plans: None,
            triggered_by: Some("test".to_string()),
            now: Some(now),
        })
        .expect("排程运行失败")
}

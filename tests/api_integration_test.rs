// ==========================================
// API 层集成测试
// ==========================================
// 覆盖: 写入时校验、重复拒绝、分页信封、
// 任务生命周期、运行记录
// ==========================================

mod helpers;

use aux_scheduler::api::plan_api::CreatePlanRequest;
use aux_scheduler::api::relation_api::{CreateDeviceRelationRequest, CreateMoldRelationRequest};
use aux_scheduler::api::ApiError;
use aux_scheduler::domain::types::{PlanStatus, TaskStatus};
use chrono::{Duration, Local};
use helpers::*;

// ==========================================
// 写入校验
// ==========================================

#[test]
fn test_duplicate_plan_number_rejected() {
    let t = test_app();
    let app = &t.app;

    create_material(app, "MAT-001");
    create_plan(app, "PL-001", "MAT-001", 100.0, 3);

    let result = app.plan_api.create_plan(CreatePlanRequest {
        plan_number: "PL-001".to_string(),
        material_code: "MAT-001".to_string(),
        planned_quantity: 50.0,
        due_date: Local::now().date_naive() + Duration::days(5),
    });

    assert!(matches!(result, Err(ApiError::Duplicate(_))));
}

#[test]
fn test_plan_requires_existing_material_and_positive_quantity() {
    let t = test_app();
    let app = &t.app;

    create_material(app, "MAT-001");

    let missing = app.plan_api.create_plan(CreatePlanRequest {
        plan_number: "PL-001".to_string(),
        material_code: "MAT-404".to_string(),
        planned_quantity: 100.0,
        due_date: Local::now().date_naive() + Duration::days(3),
    });
    assert!(matches!(missing, Err(ApiError::NotFound(_))));

    let non_positive = app.plan_api.create_plan(CreatePlanRequest {
        plan_number: "PL-002".to_string(),
        material_code: "MAT-001".to_string(),
        planned_quantity: 0.0,
        due_date: Local::now().date_naive() + Duration::days(3),
    });
    assert!(matches!(non_positive, Err(ApiError::InvalidInput(_))));
}

#[test]
fn test_relation_validation() {
    let t = test_app();
    let app = &t.app;

    create_material(app, "MAT-001");
    create_device(app, "DEV-001", None);
    create_mold(app, "MOLD-001", 1);

    // 权重越界
    let result = app
        .relation_api
        .create_device_relation(CreateDeviceRelationRequest {
            material_code: "MAT-001".to_string(),
            device_code: "DEV-001".to_string(),
            weight: 101,
        });
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    // 节拍非法
    let result = app
        .relation_api
        .create_mold_relation(CreateMoldRelationRequest {
            material_code: "MAT-001".to_string(),
            mold_code: "MOLD-001".to_string(),
            weight: 80,
            cycle_time_s: 0.0,
            output_per_cycle: 4.0,
        });
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    // 引用实体不存在
    let result = app
        .relation_api
        .create_device_relation(CreateDeviceRelationRequest {
            material_code: "MAT-001".to_string(),
            device_code: "DEV-404".to_string(),
            weight: 50,
        });
    assert!(matches!(result, Err(ApiError::NotFound(_))));

    // 同一 (物料, 设备) 重复
    relate_device(app, "MAT-001", "DEV-001", 60);
    let result = app
        .relation_api
        .create_device_relation(CreateDeviceRelationRequest {
            material_code: "MAT-001".to_string(),
            device_code: "DEV-001".to_string(),
            weight: 70,
        });
    assert!(matches!(result, Err(ApiError::Duplicate(_))));
}

// ==========================================
// 分页信封
// ==========================================

#[test]
fn test_plan_list_pagination_envelope() {
    let t = test_app();
    let app = &t.app;

    create_material(app, "MAT-001");
    for i in 1..=5 {
        create_plan(app, &format!("PL-{:03}", i), "MAT-001", 100.0, i);
    }

    let page = app.plan_api.list_plans(None, Some(2), Some(2)).unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 2);
    assert_eq!(page.items.len(), 2);
    // 交期升序 -> 第二页从第三早的交期开始
    assert_eq!(page.items[0].plan_number, "PL-003");

    // 信封字段名与系统数据访问约定一致
    let json = serde_json::to_value(&page).unwrap();
    assert!(json.get("items").is_some());
    assert!(json.get("total").is_some());
    assert!(json.get("page").is_some());
    assert!(json.get("pageSize").is_some());
}

// ==========================================
// 任务生命周期
// ==========================================

fn seed_single_pair(app: &aux_scheduler::app::AppState) {
    create_material(app, "MAT-001");
    create_device(app, "DEV-001", None);
    create_mold(app, "MOLD-001", 1);
    relate_device(app, "MAT-001", "DEV-001", 80);
    relate_mold(app, "MAT-001", "MOLD-001", 75, 30.0, 2.0);
}

#[test]
fn test_task_lifecycle_start_complete_frees_capacity() {
    let t = test_app();
    let app = &t.app;

    seed_single_pair(app);
    create_plan(app, "PL-001", "MAT-001", 240.0, 2);
    create_plan(app, "PL-002", "MAT-001", 240.0, 4);

    // 唯一配对: 第一个计划占用, 第二个阻塞
    let summary = run_at(app, base_now());
    assert_eq!(summary.scheduled.len(), 1);
    assert_eq!(summary.blocked.len(), 1);
    let task_id = summary.scheduled[0].task_id.clone();

    // 开工
    let task = app.task_api.start_task(&task_id).unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);
    let detail = app.plan_api.get_plan("PL-001").unwrap();
    assert_eq!(detail.plan.status, PlanStatus::InProgress);

    // 重复开工拒绝
    let result = app.task_api.start_task(&task_id);
    assert!(matches!(
        result,
        Err(ApiError::InvalidStateTransition { .. })
    ));

    // 完工: 计划完成, 产能释放, 绑定解除
    let task = app.task_api.complete_task(&task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    let detail = app.plan_api.get_plan("PL-001").unwrap();
    assert_eq!(detail.plan.status, PlanStatus::Completed);
    assert!(detail.active_task.is_none());

    let load = app.resource_api.get_mold_load("MOLD-001").unwrap();
    assert_eq!(load.active_load, 0);
    // 模具无后继任务, 绑定一并释放
    assert_eq!(load.bound_device, None);

    // 被阻塞的计划在下次运行拿到释放的资源
    let summary = run_at(app, base_now());
    assert_eq!(summary.scheduled.len(), 1);
    assert_eq!(summary.scheduled[0].plan_number, "PL-002");
}

#[test]
fn test_cancel_returns_plan_to_backlog() {
    let t = test_app();
    let app = &t.app;

    seed_single_pair(app);
    create_plan(app, "PL-001", "MAT-001", 240.0, 2);

    let summary = run_at(app, base_now());
    let task_id = summary.scheduled[0].task_id.clone();

    let task = app.task_api.cancel_task(&task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Cancelled);

    let detail = app.plan_api.get_plan("PL-001").unwrap();
    assert_eq!(detail.plan.status, PlanStatus::Unscheduled);
    assert!(detail.active_task.is_none());

    // 取消后可重新排程
    let summary = run_at(app, base_now());
    assert_eq!(summary.scheduled.len(), 1);
    assert_eq!(summary.scheduled[0].plan_number, "PL-001");
}

// ==========================================
// 运行记录
// ==========================================

#[test]
fn test_run_log_recorded_with_config_snapshot() {
    let t = test_app();
    let app = &t.app;

    seed_single_pair(app);
    create_plan(app, "PL-001", "MAT-001", 240.0, 2);
    create_plan(app, "PL-002", "MAT-001", 240.0, 4);

    let summary = run_at(app, base_now());

    let runs = app.scheduling_api.list_runs(None, None).unwrap();
    assert_eq!(runs.total, 1);

    let log = app
        .scheduling_api
        .get_run(&summary.run_id)
        .unwrap()
        .expect("运行记录缺失");
    assert_eq!(log.scheduled_count, 1);
    assert_eq!(log.blocked_count, 1);

    // 结果明细与配置快照可反序列化
    let outcome: serde_json::Value =
        serde_json::from_str(log.outcome_json.as_deref().unwrap()).unwrap();
    assert_eq!(outcome["scheduled"].as_array().unwrap().len(), 1);
    assert_eq!(outcome["blocked"][0]["reason"], "exhausted-capacity");

    let snapshot: serde_json::Value =
        serde_json::from_str(log.config_snapshot_json.as_deref().unwrap()).unwrap();
    assert!(snapshot.get("w_device").is_some());
}

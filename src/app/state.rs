// ==========================================
// MES辅助排程系统 - 应用状态
// ==========================================
// 职责: 共享连接/台账的装配, API 实例的组合根
// ==========================================

use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::api::{
    MaterialApi, PlanApi, RelationApi, ResourceApi, SchedulingApi, TaskApi,
};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{Allocator, ResourceLedger, TaskEmitter};
use crate::repository::{
    BindingRepository, ConsistencyRepository, DeviceRepository, MaterialDeviceRelationRepository,
    MaterialMoldRelationRepository, MaterialRepository, MoldRepository, PlanRepository,
    ReservationRepository, ScheduleRunLogRepository, TaskRepository,
};

/// 应用状态
///
/// 所有 API 共享同一个数据库连接与资源台账;
/// REST 边界 (外部协作方) 将各 API 挂载到对应路由
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 物料API
    pub material_api: Arc<MaterialApi>,

    /// 资源API (设备/模具)
    pub resource_api: Arc<ResourceApi>,

    /// 兼容关系API
    pub relation_api: Arc<RelationApi>,

    /// 生产计划API
    pub plan_api: Arc<PlanApi>,

    /// 生产任务API
    pub task_api: Arc<TaskApi>,

    /// 排程API
    pub scheduling_api: Arc<SchedulingApi>,
}

impl AppState {
    /// 打开数据库、初始化 schema 并装配全部 API
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        // 仓储
        let material_repo = Arc::new(MaterialRepository::new(conn.clone()));
        let device_repo = Arc::new(DeviceRepository::new(conn.clone()));
        let mold_repo = Arc::new(MoldRepository::new(conn.clone()));
        let device_relation_repo = Arc::new(MaterialDeviceRelationRepository::new(conn.clone()));
        let mold_relation_repo = Arc::new(MaterialMoldRelationRepository::new(conn.clone()));
        let plan_repo = Arc::new(PlanRepository::new(conn.clone()));
        let task_repo = Arc::new(TaskRepository::new(conn.clone()));
        let reservation_repo = Arc::new(ReservationRepository::new(conn.clone()));
        let binding_repo = Arc::new(BindingRepository::new(conn.clone()));
        let consistency_repo = Arc::new(ConsistencyRepository::new(conn.clone()));
        let schedule_log_repo = Arc::new(ScheduleRunLogRepository::new(conn.clone()));
        let config_manager = Arc::new(ConfigManager::new(conn));

        // 共享资源台账
        let ledger = Arc::new(Mutex::new(ResourceLedger::load(reservation_repo)?));

        // 引擎
        let emitter = TaskEmitter::new(task_repo.clone(), plan_repo.clone(), binding_repo.clone());
        let allocator = Arc::new(Allocator::new(
            plan_repo.clone(),
            device_repo.clone(),
            mold_repo.clone(),
            device_relation_repo.clone(),
            mold_relation_repo.clone(),
            binding_repo.clone(),
            consistency_repo,
            schedule_log_repo.clone(),
            config_manager,
            ledger.clone(),
            emitter,
        ));

        // API
        let material_api = Arc::new(MaterialApi::new(material_repo.clone()));
        let resource_api = Arc::new(ResourceApi::new(
            device_repo.clone(),
            mold_repo.clone(),
            binding_repo.clone(),
            ledger.clone(),
        ));
        let relation_api = Arc::new(RelationApi::new(
            material_repo.clone(),
            device_repo,
            mold_repo,
            device_relation_repo,
            mold_relation_repo,
        ));
        let plan_api = Arc::new(PlanApi::new(
            plan_repo.clone(),
            material_repo,
            task_repo.clone(),
        ));
        let task_api = Arc::new(TaskApi::new(task_repo, plan_repo, binding_repo, ledger));
        let scheduling_api = Arc::new(SchedulingApi::new(allocator, schedule_log_repo));

        Ok(Self {
            db_path: db_path.to_string(),
            material_api,
            resource_api,
            relation_api,
            plan_api,
            task_api,
            scheduling_api,
        })
    }
}

/// 缺省数据库路径 (系统数据目录下)
pub fn get_default_db_path() -> String {
    let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    let dir = base.join("aux-scheduler");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!("创建数据目录失败, 回落到当前目录: {}", e);
        return "aux_scheduler.db".to_string();
    }
    dir.join("aux_scheduler.db").to_string_lossy().to_string()
}

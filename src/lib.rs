// ==========================================
// MES辅助排程系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 辅助排程服务 (生产计划自动分配)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排程规则
pub mod engine;

// 配置层 - 排程参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/schema 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配与入口
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BlockReason, PlanStatus, ResourceStatus, TaskStatus};

// 领域实体
pub use domain::{
    Device, DeviceMoldBinding, Material, MaterialDeviceRelation, MaterialMoldRelation, Mold,
    ProductionPlan, ProductionTask, ResourceReservation, ScheduleRunLog,
};

// 引擎
pub use engine::{
    Allocator, ConsistencyTracker, ConstraintResolver, PreferenceRanker, RelationCatalog,
    ResourceLedger, RunOptions, RunSummary, TaskEmitter,
};

// API
pub use api::{
    MaterialApi, PlanApi, RelationApi, ResourceApi, SchedulingApi, TaskApi,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "MES辅助排程系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// MES辅助排程系统 - 领域层
// ==========================================
// 职责: 实体与类型定义, 不含业务规则与 SQL
// ==========================================

pub mod material;
pub mod plan;
pub mod relation;
pub mod resource;
pub mod schedule_log;
pub mod task;
pub mod types;

// 重导出核心实体
pub use material::Material;
pub use plan::ProductionPlan;
pub use relation::{MaterialDeviceRelation, MaterialMoldRelation, MAX_RELATION_WEIGHT};
pub use resource::{Device, Mold};
pub use schedule_log::ScheduleRunLog;
pub use task::{DeviceMoldBinding, ProductionTask, ResourceReservation};
pub use types::{BlockReason, PlanStatus, ResourceStatus, TaskStatus};

// ==========================================
// MES辅助排程系统 - 数据仓储层
// ==========================================
// 职责: 数据访问, 不含业务规则
// 约定: 仓储共享 Arc<Mutex<Connection>>, 日期时间
// 统一以 "%Y-%m-%d %H:%M:%S" 文本存储
// ==========================================

pub mod binding_repo;
pub mod consistency_repo;
pub mod error;
pub mod material_repo;
pub mod plan_repo;
pub mod relation_repo;
pub mod reservation_repo;
pub mod resource_repo;
pub mod schedule_log_repo;
pub mod task_repo;

pub use binding_repo::BindingRepository;
pub use consistency_repo::ConsistencyRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use material_repo::MaterialRepository;
pub use plan_repo::PlanRepository;
pub use relation_repo::{MaterialDeviceRelationRepository, MaterialMoldRelationRepository};
pub use reservation_repo::{ReservationConflict, ReservationRepository, ReserveOutcome};
pub use resource_repo::{DeviceRepository, MoldRepository};
pub use schedule_log_repo::ScheduleRunLogRepository;
pub use task_repo::TaskRepository;

use chrono::{NaiveDate, NaiveDateTime};

/// 数据库日期时间格式
pub(crate) const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// 数据库日期格式
pub(crate) const DB_DATE_FORMAT: &str = "%Y-%m-%d";

/// 日期时间 -> 数据库文本
pub(crate) fn datetime_to_db(dt: &NaiveDateTime) -> String {
    dt.format(DB_DATETIME_FORMAT).to_string()
}

/// 数据库文本 -> 日期时间 (map_row 专用, 错误折算为 rusqlite 转换错误)
pub(crate) fn datetime_from_db(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DB_DATETIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// 日期 -> 数据库文本
pub(crate) fn date_to_db(date: &NaiveDate) -> String {
    date.format(DB_DATE_FORMAT).to_string()
}

/// 数据库文本 -> 日期 (map_row 专用)
pub(crate) fn date_from_db(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DB_DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// 状态文本 -> 枚举 (map_row 专用, 未知值折算为转换错误)
pub(crate) fn status_from_db<T>(
    idx: usize,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("未知状态值: {}", raw).into(),
        )
    })
}

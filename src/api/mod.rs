// ==========================================
// MES辅助排程系统 - API 层
// ==========================================
// 职责: 排程服务的业务接口, REST 边界挂载于此
// 约定: 列表接口统一 {items, total, page, pageSize}
// 分页信封
// ==========================================

pub mod error;
pub mod material_api;
pub mod plan_api;
pub mod relation_api;
pub mod resource_api;
pub mod scheduling_api;
pub mod task_api;

pub use error::{ApiError, ApiResult};
pub use material_api::MaterialApi;
pub use plan_api::PlanApi;
pub use relation_api::RelationApi;
pub use resource_api::ResourceApi;
pub use scheduling_api::SchedulingApi;
pub use task_api::TaskApi;

use serde::Serialize;

/// 分页查询参数上限
pub const MAX_PAGE_SIZE: i64 = 200;
/// 分页查询参数缺省值
pub const DEFAULT_PAGE_SIZE: i64 = 20;

// ==========================================
// Paginated - 分页信封
// ==========================================
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// 规范化分页参数并换算偏移量
///
/// # 返回
/// (page, page_size, offset)
pub(crate) fn normalize_page(page: Option<i64>, page_size: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, page_size, (page - 1) * page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_defaults() {
        assert_eq!(normalize_page(None, None), (1, DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn test_normalize_page_clamps() {
        let (page, page_size, offset) = normalize_page(Some(0), Some(10_000));
        assert_eq!(page, 1);
        assert_eq!(page_size, MAX_PAGE_SIZE);
        assert_eq!(offset, 0);

        let (page, page_size, offset) = normalize_page(Some(3), Some(25));
        assert_eq!((page, page_size, offset), (3, 25, 50));
    }
}

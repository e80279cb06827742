// ==========================================
// MES辅助排程系统 - 排程 API
// ==========================================
// 职责: 触发排程运行 (POST /scheduling/run 的挂载点)
// 与运行记录查询
// ==========================================

use crate::api::error::ApiResult;
use crate::api::{normalize_page, Paginated};
use crate::domain::ScheduleRunLog;
use crate::engine::{Allocator, RunOptions, RunSummary};
use crate::repository::ScheduleRunLogRepository;
use std::sync::Arc;

// ==========================================
// SchedulingApi - 排程 API
// ==========================================
pub struct SchedulingApi {
    allocator: Arc<Allocator>,
    schedule_log_repo: Arc<ScheduleRunLogRepository>,
}

impl SchedulingApi {
    pub fn new(
        allocator: Arc<Allocator>,
        schedule_log_repo: Arc<ScheduleRunLogRepository>,
    ) -> Self {
        Self {
            allocator,
            schedule_log_repo,
        }
    }

    /// 触发一次排程运行, 返回运行摘要
    ///
    /// 阻塞的计划随摘要返回 (不是错误), 下次运行自动重试
    pub fn run(&self, options: RunOptions) -> ApiResult<RunSummary> {
        Ok(self.allocator.run(options)?)
    }

    /// 分页查询运行记录 (最近在前)
    pub fn list_runs(
        &self,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> ApiResult<Paginated<ScheduleRunLog>> {
        let (page, page_size, offset) = normalize_page(page, page_size);

        let items = self.schedule_log_repo.list(page_size, offset)?;
        let total = self.schedule_log_repo.count()?;

        Ok(Paginated {
            items,
            total,
            page,
            page_size,
        })
    }

    /// 单条运行记录
    pub fn get_run(&self, run_id: &str) -> ApiResult<Option<ScheduleRunLog>> {
        Ok(self.schedule_log_repo.find_by_id(run_id)?)
    }
}

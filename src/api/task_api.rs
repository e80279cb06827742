// ==========================================
// MES辅助排程系统 - 生产任务 API
// ==========================================
// 职责: 任务查询与生命周期推进
// SCHEDULED -> IN_PROGRESS -> COMPLETED (+CANCELLED)
// 终态释放产能预留; 模具无后继任务时释放绑定
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::{normalize_page, Paginated};
use crate::domain::types::{PlanStatus, TaskStatus};
use crate::domain::ProductionTask;
use crate::engine::ResourceLedger;
use crate::repository::{
    BindingRepository, PlanRepository, RepositoryError, TaskRepository,
};
use chrono::Local;
use std::sync::{Arc, Mutex};
use tracing::info;

// ==========================================
// TaskApi - 生产任务 API
// ==========================================
pub struct TaskApi {
    task_repo: Arc<TaskRepository>,
    plan_repo: Arc<PlanRepository>,
    binding_repo: Arc<BindingRepository>,
    ledger: Arc<Mutex<ResourceLedger>>,
}

impl TaskApi {
    pub fn new(
        task_repo: Arc<TaskRepository>,
        plan_repo: Arc<PlanRepository>,
        binding_repo: Arc<BindingRepository>,
        ledger: Arc<Mutex<ResourceLedger>>,
    ) -> Self {
        Self {
            task_repo,
            plan_repo,
            binding_repo,
            ledger,
        }
    }

    /// 分页查询任务 (可按状态过滤)
    pub fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> ApiResult<Paginated<ProductionTask>> {
        let (page, page_size, offset) = normalize_page(page, page_size);

        let items = self.task_repo.list(status, page_size, offset)?;
        let total = self.task_repo.count(status)?;

        Ok(Paginated {
            items,
            total,
            page,
            page_size,
        })
    }

    /// 任务详情
    pub fn get_task(&self, task_id: &str) -> ApiResult<ProductionTask> {
        self.task_repo
            .find_by_id(task_id)?
            .ok_or_else(|| ApiError::NotFound(format!("任务 {}", task_id)))
    }

    /// 开工: SCHEDULED -> IN_PROGRESS (计划同步推进)
    pub fn start_task(&self, task_id: &str) -> ApiResult<ProductionTask> {
        let task = self.get_task(task_id)?;
        if task.status != TaskStatus::Scheduled {
            return Err(ApiError::InvalidStateTransition {
                from: task.status.to_string(),
                to: TaskStatus::InProgress.to_string(),
            });
        }

        let now = Local::now().naive_local();
        self.task_repo
            .update_status(task_id, TaskStatus::InProgress, now)?;
        self.plan_repo
            .update_status(&task.plan_number, PlanStatus::InProgress, None, now)?;

        self.get_task(task_id)
    }

    /// 完工: -> COMPLETED
    ///
    /// 释放产能预留; 模具无其余未终结任务时释放绑定
    /// (不变式: 绑定随最后一个任务终结而解除)
    pub fn complete_task(&self, task_id: &str) -> ApiResult<ProductionTask> {
        let task = self.get_task(task_id)?;
        if !task.status.is_active() {
            return Err(ApiError::InvalidStateTransition {
                from: task.status.to_string(),
                to: TaskStatus::Completed.to_string(),
            });
        }

        let now = Local::now().naive_local();
        self.task_repo
            .update_status(task_id, TaskStatus::Completed, now)?;
        self.plan_repo
            .update_status(&task.plan_number, PlanStatus::Completed, None, now)?;

        self.release_resources(&task)?;

        info!(task_id = %task_id, plan = %task.plan_number, "任务完工");
        self.get_task(task_id)
    }

    /// 取消: -> CANCELLED, 计划回到待排程
    pub fn cancel_task(&self, task_id: &str) -> ApiResult<ProductionTask> {
        let task = self.get_task(task_id)?;
        if !task.status.is_active() {
            return Err(ApiError::InvalidStateTransition {
                from: task.status.to_string(),
                to: TaskStatus::Cancelled.to_string(),
            });
        }

        let now = Local::now().naive_local();
        self.task_repo
            .update_status(task_id, TaskStatus::Cancelled, now)?;
        self.plan_repo
            .update_status(&task.plan_number, PlanStatus::Unscheduled, None, now)?;

        self.release_resources(&task)?;

        info!(task_id = %task_id, plan = %task.plan_number, "任务取消, 计划回到待排程");
        self.get_task(task_id)
    }

    /// 释放任务占用的预留与 (可能的) 绑定
    fn release_resources(&self, task: &ProductionTask) -> ApiResult<()> {
        let mut ledger = self
            .ledger
            .lock()
            .map_err(|e| ApiError::from(RepositoryError::LockError(e.to_string())))?;
        ledger.release(&task.reservation_id, &task.device_code, &task.mold_code)?;
        drop(ledger);

        // 绑定粘滞: 仍有后继任务占用该模具时保留
        if self.task_repo.active_count_for_mold(&task.mold_code)? == 0 {
            self.binding_repo.release(&task.mold_code)?;
            info!(mold = %task.mold_code, "模具绑定释放");
        }

        Ok(())
    }
}

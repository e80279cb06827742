// ==========================================
// MES辅助排程系统 - 任务生成器
// ==========================================
// 职责: 将排程决策物化为生产任务并推进状态:
// 1. 建 ProductionTask (背靠已成功的产能预留)
// 2. 计划状态 -> SCHEDULED
// 3. 更新一致性记忆
// 4. 单副本模具: 建立/延续设备-模具绑定
// ==========================================

use crate::domain::types::{PlanStatus, TaskStatus};
use crate::domain::{DeviceMoldBinding, ProductionPlan, ProductionTask};
use crate::engine::consistency::ConsistencyTracker;
use crate::engine::constraint::CandidatePair;
use crate::repository::{BindingRepository, PlanRepository, RepositoryResult, TaskRepository};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// ==========================================
// TaskEmitter - 任务生成器
// ==========================================
pub struct TaskEmitter {
    task_repo: Arc<TaskRepository>,
    plan_repo: Arc<PlanRepository>,
    binding_repo: Arc<BindingRepository>,
}

impl TaskEmitter {
    pub fn new(
        task_repo: Arc<TaskRepository>,
        plan_repo: Arc<PlanRepository>,
        binding_repo: Arc<BindingRepository>,
    ) -> Self {
        Self {
            task_repo,
            plan_repo,
            binding_repo,
        }
    }

    /// 物化一次指派
    pub fn emit(
        &self,
        plan: &ProductionPlan,
        pair: &CandidatePair,
        reservation_id: &str,
        tracker: &mut ConsistencyTracker,
        now: NaiveDateTime,
    ) -> RepositoryResult<ProductionTask> {
        let task = ProductionTask {
            task_id: Uuid::new_v4().to_string(),
            plan_number: plan.plan_number.clone(),
            device_code: pair.device_code.clone(),
            mold_code: pair.mold_code.clone(),
            reservation_id: reservation_id.to_string(),
            scheduled_start: pair.window_start,
            scheduled_end: pair.window_end,
            status: TaskStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };

        self.task_repo.create(&task)?;
        self.plan_repo
            .update_status(&plan.plan_number, PlanStatus::Scheduled, None, now)?;
        tracker.record(&plan.material_code, &pair.device_code, &pair.mold_code, now)?;

        if pair.mold_quantity == 1 {
            self.binding_repo.upsert(&DeviceMoldBinding {
                mold_code: pair.mold_code.clone(),
                device_code: pair.device_code.clone(),
                origin_task_id: Some(task.task_id.clone()),
                bound_at: now,
            })?;
        }

        info!(
            plan = %plan.plan_number,
            device = %pair.device_code,
            mold = %pair.mold_code,
            task_id = %task.task_id,
            "生产任务已生成"
        );

        Ok(task)
    }
}

// ==========================================
// MES辅助排程系统 - 生产计划 API
// ==========================================
// 职责: 计划创建 (计划单号唯一)、查询
// 计划的状态推进归排程器与任务生命周期, 不在此暴露
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::{normalize_page, Paginated};
use crate::domain::types::PlanStatus;
use crate::domain::{ProductionPlan, ProductionTask};
use crate::repository::{MaterialRepository, PlanRepository, TaskRepository};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 创建计划请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanRequest {
    pub plan_number: String,
    pub material_code: String,
    pub planned_quantity: f64,
    pub due_date: NaiveDate,
}

/// 计划详情 (含未终结任务)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetailView {
    pub plan: ProductionPlan,
    pub active_task: Option<ProductionTask>,
}

// ==========================================
// PlanApi - 生产计划 API
// ==========================================
pub struct PlanApi {
    plan_repo: Arc<PlanRepository>,
    material_repo: Arc<MaterialRepository>,
    task_repo: Arc<TaskRepository>,
}

impl PlanApi {
    pub fn new(
        plan_repo: Arc<PlanRepository>,
        material_repo: Arc<MaterialRepository>,
        task_repo: Arc<TaskRepository>,
    ) -> Self {
        Self {
            plan_repo,
            material_repo,
            task_repo,
        }
    }

    /// 创建计划
    ///
    /// # 返回
    /// - `Err(Duplicate)`: 计划单号已存在
    /// - `Err(NotFound)`: 物料不存在
    pub fn create_plan(&self, request: CreatePlanRequest) -> ApiResult<ProductionPlan> {
        if request.plan_number.trim().is_empty() {
            return Err(ApiError::InvalidInput("计划单号不能为空".to_string()));
        }
        if request.planned_quantity <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "计划数量必须 > 0: {}",
                request.planned_quantity
            )));
        }
        if !self.material_repo.exists(&request.material_code)? {
            return Err(ApiError::NotFound(format!("物料 {}", request.material_code)));
        }
        // 先显式查重, 给出比约束冲突更可读的错误
        if self.plan_repo.exists(request.plan_number.trim())? {
            return Err(ApiError::Duplicate(format!(
                "计划单号已存在: {}",
                request.plan_number.trim()
            )));
        }

        let now = Local::now().naive_local();
        let plan = ProductionPlan {
            plan_number: request.plan_number.trim().to_string(),
            material_code: request.material_code,
            planned_quantity: request.planned_quantity,
            due_date: request.due_date,
            status: PlanStatus::Unscheduled,
            block_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.plan_repo.create(&plan)?;
        Ok(plan)
    }

    /// 计划详情
    pub fn get_plan(&self, plan_number: &str) -> ApiResult<PlanDetailView> {
        let plan = self
            .plan_repo
            .find_by_number(plan_number)?
            .ok_or_else(|| ApiError::NotFound(format!("计划 {}", plan_number)))?;

        let active_task = self.task_repo.find_active_by_plan(plan_number)?;

        Ok(PlanDetailView { plan, active_task })
    }

    /// 分页查询计划 (可按状态过滤, 交期升序)
    pub fn list_plans(
        &self,
        status: Option<PlanStatus>,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> ApiResult<Paginated<ProductionPlan>> {
        let (page, page_size, offset) = normalize_page(page, page_size);

        let items = self.plan_repo.list(status, page_size, offset)?;
        let total = self.plan_repo.count(status)?;

        Ok(Paginated {
            items,
            total,
            page,
            page_size,
        })
    }
}

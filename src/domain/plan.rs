// ==========================================
// MES辅助排程系统 - 生产计划领域模型
// ==========================================
// 计划由外部 CRUD 流程创建; 排程器只读取
// UNSCHEDULED/BLOCKED 计划, 并写回 SCHEDULED
// ==========================================

use crate::domain::types::{BlockReason, PlanStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionPlan - 生产计划
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionPlan {
    pub plan_number: String,               // 计划单号 (唯一)
    pub material_code: String,             // 所需物料
    pub planned_quantity: f64,             // 计划数量 (件)
    pub due_date: NaiveDate,               // 交期
    pub status: PlanStatus,                // 状态
    pub block_reason: Option<BlockReason>, // 阻塞原因 (仅 BLOCKED 状态)
    pub created_at: NaiveDateTime,         // 创建时间
    pub updated_at: NaiveDateTime,         // 更新时间
}

impl ProductionPlan {
    /// 是否参与下一次排程运行
    pub fn is_schedulable(&self) -> bool {
        self.status.is_schedulable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_blocked_plan_stays_schedulable() {
        let now = Utc::now().naive_utc();
        let mut plan = ProductionPlan {
            plan_number: "PL-001".to_string(),
            material_code: "MAT-001".to_string(),
            planned_quantity: 100.0,
            due_date: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
            status: PlanStatus::Unscheduled,
            block_reason: None,
            created_at: now,
            updated_at: now,
        };
        assert!(plan.is_schedulable());

        plan.status = PlanStatus::Blocked;
        plan.block_reason = Some(BlockReason::NoRelation);
        assert!(plan.is_schedulable());

        plan.status = PlanStatus::Scheduled;
        assert!(!plan.is_schedulable());
    }
}

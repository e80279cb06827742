// ==========================================
// MES辅助排程系统 - 领域类型定义
// ==========================================
// 序列化格式: 状态枚举与数据库一致 (SCREAMING_SNAKE_CASE)
// 阻塞原因对外输出 kebab-case (与运行摘要约定一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 计划状态 (Plan Status)
// ==========================================
// 状态机: UNSCHEDULED -> SCHEDULED -> IN_PROGRESS -> COMPLETED
// UNSCHEDULED <-> BLOCKED (无可行资源时进入, 下次运行重试)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Unscheduled, // 待排程
    Scheduled,   // 已排程
    InProgress,  // 生产中
    Completed,   // 已完成
    Blocked,     // 无可行资源
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Unscheduled => "UNSCHEDULED",
            PlanStatus::Scheduled => "SCHEDULED",
            PlanStatus::InProgress => "IN_PROGRESS",
            PlanStatus::Completed => "COMPLETED",
            PlanStatus::Blocked => "BLOCKED",
        }
    }

    /// 从数据库字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNSCHEDULED" => Some(PlanStatus::Unscheduled),
            "SCHEDULED" => Some(PlanStatus::Scheduled),
            "IN_PROGRESS" => Some(PlanStatus::InProgress),
            "COMPLETED" => Some(PlanStatus::Completed),
            "BLOCKED" => Some(PlanStatus::Blocked),
            _ => None,
        }
    }

    /// 是否可进入排程循环 (待排程/被阻塞均参与下次运行)
    pub fn is_schedulable(&self) -> bool {
        matches!(self, PlanStatus::Unscheduled | PlanStatus::Blocked)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 任务状态 (Task Status)
// ==========================================
// COMPLETED / CANCELLED 为终态: 释放产能预留与模具绑定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Scheduled,  // 已排程
    InProgress, // 生产中
    Completed,  // 已完成
    Cancelled,  // 已取消
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Scheduled => "SCHEDULED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(TaskStatus::Scheduled),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "COMPLETED" => Some(TaskStatus::Completed),
            "CANCELLED" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// 是否占用资源 (设备/模具/预留)
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Scheduled | TaskStatus::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 资源状态 (Resource Status)
// ==========================================
// MAINTENANCE 为硬约束: 检修中的设备/模具不参与排程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    Normal,      // 正常
    Maintenance, // 检修中
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Normal => "NORMAL",
            ResourceStatus::Maintenance => "MAINTENANCE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(ResourceStatus::Normal),
            "MAINTENANCE" => Some(ResourceStatus::Maintenance),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        *self == ResourceStatus::Normal
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 阻塞原因 (Block Reason)
// ==========================================
// 阻塞不是错误, 是带机器可读原因的正常输出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    NoRelation,          // 无兼容资源关系
    ExhaustedCapacity,   // 设备/模具产能耗尽
    ExclusivityConflict, // 模具排他绑定冲突
    Maintenance,         // 资源检修中
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::NoRelation => "no-relation",
            BlockReason::ExhaustedCapacity => "exhausted-capacity",
            BlockReason::ExclusivityConflict => "exclusivity-conflict",
            BlockReason::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no-relation" => Some(BlockReason::NoRelation),
            "exhausted-capacity" => Some(BlockReason::ExhaustedCapacity),
            "exclusivity-conflict" => Some(BlockReason::ExclusivityConflict),
            "maintenance" => Some(BlockReason::Maintenance),
            _ => None,
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_status_roundtrip() {
        for status in [
            PlanStatus::Unscheduled,
            PlanStatus::Scheduled,
            PlanStatus::InProgress,
            PlanStatus::Completed,
            PlanStatus::Blocked,
        ] {
            assert_eq!(PlanStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PlanStatus::parse("UNKNOWN"), None);
    }

    #[test]
    fn test_schedulable_states() {
        assert!(PlanStatus::Unscheduled.is_schedulable());
        assert!(PlanStatus::Blocked.is_schedulable());
        assert!(!PlanStatus::Scheduled.is_schedulable());
        assert!(!PlanStatus::Completed.is_schedulable());
    }

    #[test]
    fn test_block_reason_kebab_case() {
        assert_eq!(BlockReason::NoRelation.as_str(), "no-relation");
        assert_eq!(
            BlockReason::parse("exclusivity-conflict"),
            Some(BlockReason::ExclusivityConflict)
        );
        let json = serde_json::to_string(&BlockReason::ExhaustedCapacity).unwrap();
        assert_eq!(json, "\"exhausted-capacity\"");
    }
}

// ==========================================
// MES辅助排程系统 - 生产任务领域模型
// ==========================================
// 任务是排程决策的物化结果:
// - 每个任务背靠一条产能预留 (reservation)
// - 一个计划最多一个未终结任务 (唯一性不变式)
// - 单副本模具的任务会建立/延续设备-模具绑定
// ==========================================

use crate::domain::types::TaskStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionTask - 生产任务
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionTask {
    pub task_id: String,               // 任务ID (uuid)
    pub plan_number: String,           // 关联计划 (1:1 活动任务)
    pub device_code: String,           // 指派设备
    pub mold_code: String,             // 指派模具
    pub reservation_id: String,        // 背靠的产能预留
    pub scheduled_start: NaiveDateTime, // 计划开始
    pub scheduled_end: NaiveDateTime,  // 计划结束 (由数量/产出率推导)
    pub status: TaskStatus,            // 状态
    pub created_at: NaiveDateTime,     // 创建时间
    pub updated_at: NaiveDateTime,     // 更新时间
}

impl ProductionTask {
    /// 是否仍占用资源
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

// ==========================================
// ResourceReservation - 产能预留
// ==========================================
// Ledger 的持久化形态: 未释放的预留即资源占用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceReservation {
    pub reservation_id: String,        // 预留ID (uuid)
    pub device_code: String,           // 设备
    pub mold_code: String,             // 模具
    pub window_start: NaiveDateTime,   // 占用窗口起点
    pub window_end: NaiveDateTime,     // 占用窗口终点
    pub released: bool,                // 已释放标志
    pub created_at: NaiveDateTime,     // 创建时间
}

// ==========================================
// DeviceMoldBinding - 设备-模具排他绑定
// ==========================================
// 单副本模具一旦与设备配对即排他且粘滞:
// 后续需要该模具的计划应复用同一设备, 直到绑定释放
// (任务完成且无后继任务占用该模具)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceMoldBinding {
    pub mold_code: String,             // 模具 (主键, 一个模具最多一条绑定)
    pub device_code: String,           // 绑定设备
    pub origin_task_id: Option<String>, // 建立绑定的任务
    pub bound_at: NaiveDateTime,       // 绑定时间
}

// ==========================================
// MES辅助排程系统 - 资源领域模型 (设备/模具)
// ==========================================
// 硬约束:
// - 设备同一时刻最多执行一个任务
// - 模具并发任务数 <= quantity (物理副本数)
// - 检修中的资源不可用
// ==========================================

use crate::domain::types::ResourceStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Device - 设备
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub device_code: String,            // 设备编码 (如 DEV-002)
    pub device_name: String,            // 设备名称
    pub capacity_per_hour: Option<f64>, // 小时产能上限 (件/时, 可空)
    pub status: ResourceStatus,         // 状态 (正常/检修)
    pub created_at: NaiveDateTime,      // 创建时间
    pub updated_at: NaiveDateTime,      // 更新时间
}

impl Device {
    /// 是否可参与排程
    pub fn is_available(&self) -> bool {
        self.status.is_available()
    }
}

// ==========================================
// Mold - 模具
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mold {
    pub mold_code: String,         // 模具编码 (如 MOLD-005)
    pub mold_name: String,         // 模具名称
    pub status: ResourceStatus,    // 状态 (正常/检修)
    pub quantity: i32,             // 物理副本数 (并发上限)
    pub created_at: NaiveDateTime, // 创建时间
    pub updated_at: NaiveDateTime, // 更新时间
}

impl Mold {
    pub fn is_available(&self) -> bool {
        self.status.is_available()
    }

    /// 单副本模具: 触发设备-模具排他绑定
    pub fn is_single_copy(&self) -> bool {
        self.quantity == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mold(quantity: i32, status: ResourceStatus) -> Mold {
        Mold {
            mold_code: "MOLD-001".to_string(),
            mold_name: "一号模".to_string(),
            status,
            quantity,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_single_copy_detection() {
        assert!(mold(1, ResourceStatus::Normal).is_single_copy());
        assert!(!mold(2, ResourceStatus::Normal).is_single_copy());
    }

    #[test]
    fn test_maintenance_unavailable() {
        assert!(mold(1, ResourceStatus::Normal).is_available());
        assert!(!mold(1, ResourceStatus::Maintenance).is_available());
    }
}

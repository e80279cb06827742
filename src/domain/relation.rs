// ==========================================
// MES辅助排程系统 - 物料兼容关系领域模型
// ==========================================
// 权重为软偏好 (0-100), 仅影响排序, 不构成硬约束
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 权重取值上限
pub const MAX_RELATION_WEIGHT: i32 = 100;

// ==========================================
// MaterialDeviceRelation - 物料-设备兼容关系
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDeviceRelation {
    pub relation_id: String,       // 关系ID
    pub material_code: String,     // 物料编码
    pub device_code: String,       // 设备编码
    pub weight: i32,               // 偏好权重 [0, 100]
    pub created_at: NaiveDateTime, // 创建时间
}

// ==========================================
// MaterialMoldRelation - 物料-模具兼容关系
// ==========================================
// 节拍数据用于任务工期估算与产出率排序信号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialMoldRelation {
    pub relation_id: String,       // 关系ID
    pub material_code: String,     // 物料编码
    pub mold_code: String,         // 模具编码
    pub weight: i32,               // 偏好权重 [0, 100]
    pub cycle_time_s: f64,         // 单次循环时间 (秒)
    pub output_per_cycle: f64,     // 单次循环产出 (件)
    pub created_at: NaiveDateTime, // 创建时间
}

impl MaterialMoldRelation {
    /// 小时产出率 (件/时)
    pub fn hourly_output(&self) -> f64 {
        if self.cycle_time_s <= 0.0 {
            return 0.0;
        }
        self.output_per_cycle * 3600.0 / self.cycle_time_s
    }
}

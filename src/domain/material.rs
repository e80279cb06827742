// ==========================================
// MES辅助排程系统 - 物料领域模型
// ==========================================
// 物料为不可变参照数据, 由外部 CRUD 流程维护
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Material - 物料主数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub material_code: String,         // 物料编码 (如 MAT-001)
    pub material_name: String,         // 物料名称
    pub material_type: Option<String>, // 物料类型
    pub spec: Option<String>,          // 规格
    pub created_at: NaiveDateTime,     // 创建时间
    pub updated_at: NaiveDateTime,     // 更新时间
}

// ==========================================
// MES辅助排程系统 - 兼容关系 API
// ==========================================
// 职责: 物料-设备/物料-模具关系 CRUD
// 校验红线: 权重 [0,100]、节拍 > 0、引用实体必须
// 存在; 非法关系在写入时拒绝, 不进入排程器
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{MaterialDeviceRelation, MaterialMoldRelation, MAX_RELATION_WEIGHT};
use crate::repository::{
    DeviceRepository, MaterialDeviceRelationRepository, MaterialMoldRelationRepository,
    MaterialRepository, MoldRepository,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// 创建物料-设备关系请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRelationRequest {
    pub material_code: String,
    pub device_code: String,
    pub weight: i32,
}

/// 创建物料-模具关系请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMoldRelationRequest {
    pub material_code: String,
    pub mold_code: String,
    pub weight: i32,
    pub cycle_time_s: f64,
    pub output_per_cycle: f64,
}

/// 某物料的关系全景
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRelationsView {
    pub material_code: String,
    pub device_relations: Vec<MaterialDeviceRelation>,
    pub mold_relations: Vec<MaterialMoldRelation>,
}

// ==========================================
// RelationApi - 兼容关系 API
// ==========================================
pub struct RelationApi {
    material_repo: Arc<MaterialRepository>,
    device_repo: Arc<DeviceRepository>,
    mold_repo: Arc<MoldRepository>,
    device_relation_repo: Arc<MaterialDeviceRelationRepository>,
    mold_relation_repo: Arc<MaterialMoldRelationRepository>,
}

impl RelationApi {
    pub fn new(
        material_repo: Arc<MaterialRepository>,
        device_repo: Arc<DeviceRepository>,
        mold_repo: Arc<MoldRepository>,
        device_relation_repo: Arc<MaterialDeviceRelationRepository>,
        mold_relation_repo: Arc<MaterialMoldRelationRepository>,
    ) -> Self {
        Self {
            material_repo,
            device_repo,
            mold_repo,
            device_relation_repo,
            mold_relation_repo,
        }
    }

    fn validate_weight(weight: i32) -> ApiResult<()> {
        if !(0..=MAX_RELATION_WEIGHT).contains(&weight) {
            return Err(ApiError::InvalidInput(format!(
                "权重必须在 [0, {}] 区间: {}",
                MAX_RELATION_WEIGHT, weight
            )));
        }
        Ok(())
    }

    /// 创建物料-设备关系
    pub fn create_device_relation(
        &self,
        request: CreateDeviceRelationRequest,
    ) -> ApiResult<MaterialDeviceRelation> {
        Self::validate_weight(request.weight)?;

        if !self.material_repo.exists(&request.material_code)? {
            return Err(ApiError::NotFound(format!("物料 {}", request.material_code)));
        }
        if !self.device_repo.exists(&request.device_code)? {
            return Err(ApiError::NotFound(format!("设备 {}", request.device_code)));
        }

        let relation = MaterialDeviceRelation {
            relation_id: Uuid::new_v4().to_string(),
            material_code: request.material_code,
            device_code: request.device_code,
            weight: request.weight,
            created_at: Local::now().naive_local(),
        };

        self.device_relation_repo.create(&relation)?;
        Ok(relation)
    }

    /// 创建物料-模具关系
    pub fn create_mold_relation(
        &self,
        request: CreateMoldRelationRequest,
    ) -> ApiResult<MaterialMoldRelation> {
        Self::validate_weight(request.weight)?;

        if request.cycle_time_s <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "循环时间必须 > 0: {}",
                request.cycle_time_s
            )));
        }
        if request.output_per_cycle <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "单循环产出必须 > 0: {}",
                request.output_per_cycle
            )));
        }

        if !self.material_repo.exists(&request.material_code)? {
            return Err(ApiError::NotFound(format!("物料 {}", request.material_code)));
        }
        if !self.mold_repo.exists(&request.mold_code)? {
            return Err(ApiError::NotFound(format!("模具 {}", request.mold_code)));
        }

        let relation = MaterialMoldRelation {
            relation_id: Uuid::new_v4().to_string(),
            material_code: request.material_code,
            mold_code: request.mold_code,
            weight: request.weight,
            cycle_time_s: request.cycle_time_s,
            output_per_cycle: request.output_per_cycle,
            created_at: Local::now().naive_local(),
        };

        self.mold_relation_repo.create(&relation)?;
        Ok(relation)
    }

    /// 某物料的关系全景 (设备/模具各按权重降序)
    pub fn list_by_material(&self, material_code: &str) -> ApiResult<MaterialRelationsView> {
        if !self.material_repo.exists(material_code)? {
            return Err(ApiError::NotFound(format!("物料 {}", material_code)));
        }

        Ok(MaterialRelationsView {
            material_code: material_code.to_string(),
            device_relations: self.device_relation_repo.list_by_material(material_code)?,
            mold_relations: self.mold_relation_repo.list_by_material(material_code)?,
        })
    }
}

// ==========================================
// MES辅助排程系统 - 物料 API
// ==========================================
// 职责: 物料参照数据 CRUD (外部协作方入口)
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::{normalize_page, Paginated};
use crate::domain::Material;
use crate::repository::MaterialRepository;
use chrono::Local;
use serde::Deserialize;
use std::sync::Arc;

/// 创建物料请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMaterialRequest {
    pub material_code: String,
    pub material_name: String,
    pub material_type: Option<String>,
    pub spec: Option<String>,
}

// ==========================================
// MaterialApi - 物料 API
// ==========================================
pub struct MaterialApi {
    material_repo: Arc<MaterialRepository>,
}

impl MaterialApi {
    pub fn new(material_repo: Arc<MaterialRepository>) -> Self {
        Self { material_repo }
    }

    /// 创建物料
    pub fn create_material(&self, request: CreateMaterialRequest) -> ApiResult<Material> {
        if request.material_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("物料编码不能为空".to_string()));
        }
        if request.material_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("物料名称不能为空".to_string()));
        }

        let now = Local::now().naive_local();
        let material = Material {
            material_code: request.material_code.trim().to_string(),
            material_name: request.material_name.trim().to_string(),
            material_type: request.material_type,
            spec: request.spec,
            created_at: now,
            updated_at: now,
        };

        self.material_repo.create(&material)?;
        Ok(material)
    }

    /// 查询单个物料
    pub fn get_material(&self, material_code: &str) -> ApiResult<Material> {
        self.material_repo
            .find_by_code(material_code)?
            .ok_or_else(|| ApiError::NotFound(format!("物料 {}", material_code)))
    }

    /// 分页查询物料
    pub fn list_materials(
        &self,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> ApiResult<Paginated<Material>> {
        let (page, page_size, offset) = normalize_page(page, page_size);

        let items = self.material_repo.list(page_size, offset)?;
        let total = self.material_repo.count()?;

        Ok(Paginated {
            items,
            total,
            page,
            page_size,
        })
    }
}

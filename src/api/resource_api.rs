// ==========================================
// MES辅助排程系统 - 资源 API (设备/模具)
// ==========================================
// 职责: 设备与模具 CRUD、检修状态切换、
// 模具占用查询
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::ResourceStatus;
use crate::domain::{Device, Mold};
use crate::engine::ResourceLedger;
use crate::repository::{BindingRepository, DeviceRepository, MoldRepository, RepositoryError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 创建设备请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRequest {
    pub device_code: String,
    pub device_name: String,
    pub capacity_per_hour: Option<f64>,
}

/// 创建模具请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMoldRequest {
    pub mold_code: String,
    pub mold_name: String,
    pub quantity: i32,
}

/// 模具占用视图
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoldLoadView {
    pub mold_code: String,
    pub quantity: i32,
    pub active_load: usize,
    /// 生效的排他绑定设备 (单副本模具)
    pub bound_device: Option<String>,
}

// ==========================================
// ResourceApi - 资源 API
// ==========================================
pub struct ResourceApi {
    device_repo: Arc<DeviceRepository>,
    mold_repo: Arc<MoldRepository>,
    binding_repo: Arc<BindingRepository>,
    ledger: Arc<Mutex<ResourceLedger>>,
}

impl ResourceApi {
    pub fn new(
        device_repo: Arc<DeviceRepository>,
        mold_repo: Arc<MoldRepository>,
        binding_repo: Arc<BindingRepository>,
        ledger: Arc<Mutex<ResourceLedger>>,
    ) -> Self {
        Self {
            device_repo,
            mold_repo,
            binding_repo,
            ledger,
        }
    }

    // ==========================================
    // 设备
    // ==========================================

    /// 创建设备
    pub fn create_device(&self, request: CreateDeviceRequest) -> ApiResult<Device> {
        if request.device_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("设备编码不能为空".to_string()));
        }
        if let Some(cap) = request.capacity_per_hour {
            if cap <= 0.0 {
                return Err(ApiError::InvalidInput(format!(
                    "设备小时产能必须 > 0: {}",
                    cap
                )));
            }
        }

        let now = Local::now().naive_local();
        let device = Device {
            device_code: request.device_code.trim().to_string(),
            device_name: request.device_name.trim().to_string(),
            capacity_per_hour: request.capacity_per_hour,
            status: ResourceStatus::Normal,
            created_at: now,
            updated_at: now,
        };

        self.device_repo.create(&device)?;
        Ok(device)
    }

    /// 查询全部设备
    pub fn list_devices(&self) -> ApiResult<Vec<Device>> {
        Ok(self.device_repo.list_all()?)
    }

    /// 切换设备状态 (正常/检修)
    pub fn set_device_status(&self, device_code: &str, status: ResourceStatus) -> ApiResult<()> {
        self.device_repo
            .update_status(device_code, status, Local::now().naive_local())?;
        Ok(())
    }

    // ==========================================
    // 模具
    // ==========================================

    /// 创建模具
    pub fn create_mold(&self, request: CreateMoldRequest) -> ApiResult<Mold> {
        if request.mold_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("模具编码不能为空".to_string()));
        }
        if request.quantity < 1 {
            return Err(ApiError::InvalidInput(format!(
                "模具副本数必须 >= 1: {}",
                request.quantity
            )));
        }

        let now = Local::now().naive_local();
        let mold = Mold {
            mold_code: request.mold_code.trim().to_string(),
            mold_name: request.mold_name.trim().to_string(),
            status: ResourceStatus::Normal,
            quantity: request.quantity,
            created_at: now,
            updated_at: now,
        };

        self.mold_repo.create(&mold)?;
        Ok(mold)
    }

    /// 查询全部模具
    pub fn list_molds(&self) -> ApiResult<Vec<Mold>> {
        Ok(self.mold_repo.list_all()?)
    }

    /// 切换模具状态 (正常/检修)
    pub fn set_mold_status(&self, mold_code: &str, status: ResourceStatus) -> ApiResult<()> {
        self.mold_repo
            .update_status(mold_code, status, Local::now().naive_local())?;
        Ok(())
    }

    /// 模具当前占用视图 (副本数 vs 未释放预留数 + 生效绑定)
    pub fn get_mold_load(&self, mold_code: &str) -> ApiResult<MoldLoadView> {
        let mold = self
            .mold_repo
            .find_by_code(mold_code)?
            .ok_or_else(|| ApiError::NotFound(format!("模具 {}", mold_code)))?;

        let bound_device = self
            .binding_repo
            .find_by_mold(&mold.mold_code)?
            .map(|b| b.device_code);

        let mut ledger = self
            .ledger
            .lock()
            .map_err(|e| ApiError::from(RepositoryError::LockError(e.to_string())))?;
        ledger.refresh()?;

        Ok(MoldLoadView {
            active_load: ledger.active_load(&mold.mold_code),
            mold_code: mold.mold_code,
            quantity: mold.quantity,
            bound_device,
        })
    }
}

// ==========================================
// MES辅助排程系统 - 配置管理器
// ==========================================
// 职责: 排程评分参数的加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================
// 一致性加分与权重的具体数值属业务可调项,
// 全部入库, 代码只提供缺省值
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ===== 缺省值 =====
// 满配对一致性加分 (120 + 120) 必须压过权重分的最大可能
// 差距 (两项各 100 分 + 产出率 10 分), 使一致性优先于原始权重
const DEFAULT_W_DEVICE: f64 = 1.0;
const DEFAULT_W_MOLD: f64 = 1.0;
const DEFAULT_W_THROUGHPUT: f64 = 1.0;
const DEFAULT_BONUS_MATERIAL_DEVICE: f64 = 120.0;
const DEFAULT_BONUS_MATERIAL_MOLD: f64 = 120.0;
const DEFAULT_BONUS_MOLD_DEVICE: f64 = 80.0;
const DEFAULT_RESERVE_RETRY_LIMIT: u32 = 1;
const DEFAULT_MAX_PLANS_PER_RUN: usize = 200;

// ==========================================
// SchedulerConfig - 排程参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub w_device: f64,              // 设备权重系数
    pub w_mold: f64,                // 模具权重系数
    pub w_throughput: f64,          // 产出率系数 (作用于归一化 0-10 分)
    pub bonus_material_device: f64, // 同物料-设备一致性加分
    pub bonus_material_mold: f64,   // 同物料-模具一致性加分
    pub bonus_mold_device: f64,     // 同模具-设备一致性加分
    pub reserve_retry_limit: u32,   // 预留冲突重试次数
    pub max_plans_per_run: usize,   // 单次运行计划数上限 (0 不限)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            w_device: DEFAULT_W_DEVICE,
            w_mold: DEFAULT_W_MOLD,
            w_throughput: DEFAULT_W_THROUGHPUT,
            bonus_material_device: DEFAULT_BONUS_MATERIAL_DEVICE,
            bonus_material_mold: DEFAULT_BONUS_MATERIAL_MOLD,
            bonus_mold_device: DEFAULT_BONUS_MOLD_DEVICE,
            reserve_retry_limit: DEFAULT_RESERVE_RETRY_LIMIT,
            max_plans_per_run: DEFAULT_MAX_PLANS_PER_RUN,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入配置值（scope_id='global'）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?, ?, datetime('now'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at"#,
            params![key, value],
        )?;

        Ok(())
    }

    fn get_f64_or(&self, key: &str, default: f64) -> RepositoryResult<f64> {
        Ok(self
            .get_config_value(key)?
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(default))
    }

    /// 加载排程参数 (缺失项回落到缺省值)
    pub fn load_scheduler_config(&self) -> RepositoryResult<SchedulerConfig> {
        let retry = self
            .get_config_value("scheduler/reserve_retry_limit")?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RESERVE_RETRY_LIMIT);

        let max_plans = self
            .get_config_value("scheduler/max_plans_per_run")?
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_PLANS_PER_RUN);

        Ok(SchedulerConfig {
            w_device: self.get_f64_or("scheduler/w_device", DEFAULT_W_DEVICE)?,
            w_mold: self.get_f64_or("scheduler/w_mold", DEFAULT_W_MOLD)?,
            w_throughput: self.get_f64_or("scheduler/w_throughput", DEFAULT_W_THROUGHPUT)?,
            bonus_material_device: self
                .get_f64_or("scheduler/bonus_material_device", DEFAULT_BONUS_MATERIAL_DEVICE)?,
            bonus_material_mold: self
                .get_f64_or("scheduler/bonus_material_mold", DEFAULT_BONUS_MATERIAL_MOLD)?,
            bonus_mold_device: self
                .get_f64_or("scheduler/bonus_mold_device", DEFAULT_BONUS_MOLD_DEVICE)?,
            reserve_retry_limit: retry,
            max_plans_per_run: max_plans,
        })
    }

    /// 配置快照 (JSON), 随运行记录落库保证可解释性
    pub fn snapshot_json(&self) -> RepositoryResult<String> {
        let config = self.load_scheduler_config()?;
        serde_json::to_string(&config)
            .map_err(|e| RepositoryError::InternalError(format!("配置快照序列化失败: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        ConfigManager::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let manager = setup();
        let config = manager.load_scheduler_config().unwrap();
        assert_eq!(config.w_device, DEFAULT_W_DEVICE);
        assert_eq!(config.bonus_material_device, DEFAULT_BONUS_MATERIAL_DEVICE);
        assert_eq!(config.reserve_retry_limit, DEFAULT_RESERVE_RETRY_LIMIT);
    }

    #[test]
    fn test_override_roundtrip() {
        let manager = setup();
        manager
            .set_config_value("scheduler/w_throughput", "2.5")
            .unwrap();
        manager
            .set_config_value("scheduler/max_plans_per_run", "50")
            .unwrap();

        let config = manager.load_scheduler_config().unwrap();
        assert_eq!(config.w_throughput, 2.5);
        assert_eq!(config.max_plans_per_run, 50);
    }

    #[test]
    fn test_invalid_value_falls_back_to_default() {
        let manager = setup();
        manager
            .set_config_value("scheduler/w_device", "not-a-number")
            .unwrap();

        let config = manager.load_scheduler_config().unwrap();
        assert_eq!(config.w_device, DEFAULT_W_DEVICE);
    }
}

// ==========================================
// MES辅助排程系统 - 指派记忆仓储
// ==========================================
// 记录"同物料一致性"与"同模具一致性"的历史指派:
// - scope=MATERIAL: 物料上次使用的 (设备, 模具)
// - scope=MOLD: 模具上次配对的设备
// 仅作评分偏置, 不构成硬约束
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::datetime_to_db;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 物料维度的历史指派
#[derive(Debug, Clone)]
pub struct MaterialMemory {
    pub material_code: String,
    pub device_code: String,
    pub mold_code: String,
}

/// 模具维度的历史指派
#[derive(Debug, Clone)]
pub struct MoldMemory {
    pub mold_code: String,
    pub device_code: String,
}

const SCOPE_MATERIAL: &str = "MATERIAL";
const SCOPE_MOLD: &str = "MOLD";

// ==========================================
// ConsistencyRepository - 指派记忆仓储
// ==========================================
pub struct ConsistencyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ConsistencyRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 记录一次成功指派 (物料与模具两个维度同时更新)
    pub fn record_assignment(
        &self,
        material_code: &str,
        device_code: &str,
        mold_code: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now_db = datetime_to_db(&now);

        conn.execute(
            r#"INSERT INTO assignment_memory (scope, key_code, device_code, mold_code, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(scope, key_code) DO UPDATE SET
                 device_code = excluded.device_code,
                 mold_code = excluded.mold_code,
                 updated_at = excluded.updated_at"#,
            params![SCOPE_MATERIAL, material_code, device_code, mold_code, now_db],
        )?;

        conn.execute(
            r#"INSERT INTO assignment_memory (scope, key_code, device_code, mold_code, updated_at)
               VALUES (?, ?, ?, NULL, ?)
               ON CONFLICT(scope, key_code) DO UPDATE SET
                 device_code = excluded.device_code,
                 updated_at = excluded.updated_at"#,
            params![SCOPE_MOLD, mold_code, device_code, now_db],
        )?;

        Ok(())
    }

    /// 加载全部物料维度记忆
    pub fn list_material_memory(&self) -> RepositoryResult<Vec<MaterialMemory>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT key_code, device_code, mold_code
               FROM assignment_memory
               WHERE scope = ? AND device_code IS NOT NULL AND mold_code IS NOT NULL"#,
        )?;

        let rows = stmt
            .query_map(params![SCOPE_MATERIAL], |row| {
                Ok(MaterialMemory {
                    material_code: row.get(0)?,
                    device_code: row.get(1)?,
                    mold_code: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<MaterialMemory>, _>>()?;

        Ok(rows)
    }

    /// 加载全部模具维度记忆
    pub fn list_mold_memory(&self) -> RepositoryResult<Vec<MoldMemory>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT key_code, device_code
               FROM assignment_memory
               WHERE scope = ? AND device_code IS NOT NULL"#,
        )?;

        let rows = stmt
            .query_map(params![SCOPE_MOLD], |row| {
                Ok(MoldMemory {
                    mold_code: row.get(0)?,
                    device_code: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<MoldMemory>, _>>()?;

        Ok(rows)
    }
}

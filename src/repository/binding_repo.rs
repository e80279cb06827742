// ==========================================
// MES辅助排程系统 - 设备-模具绑定仓储
// ==========================================
// 绑定行存在即生效; 释放即删除
// 一个模具最多一条绑定 (主键约束)
// ==========================================

use crate::domain::DeviceMoldBinding;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{datetime_from_db, datetime_to_db};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// BindingRepository - 绑定仓储
// ==========================================
pub struct BindingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BindingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 建立或延续绑定 (后继任务使用同一配对时刷新来源任务)
    pub fn upsert(&self, binding: &DeviceMoldBinding) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO device_mold_binding (mold_code, device_code, origin_task_id, bound_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(mold_code) DO UPDATE SET
                 device_code = excluded.device_code,
                 origin_task_id = excluded.origin_task_id,
                 bound_at = excluded.bound_at"#,
            params![
                &binding.mold_code,
                &binding.device_code,
                &binding.origin_task_id,
                datetime_to_db(&binding.bound_at),
            ],
        )?;

        Ok(())
    }

    /// 查询模具的生效绑定
    pub fn find_by_mold(&self, mold_code: &str) -> RepositoryResult<Option<DeviceMoldBinding>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT mold_code, device_code, origin_task_id, bound_at
               FROM device_mold_binding
               WHERE mold_code = ?"#,
            params![mold_code],
            |row| Self::map_row(row),
        ) {
            Ok(binding) => Ok(Some(binding)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部生效绑定 (运行快照用)
    pub fn list_all(&self) -> RepositoryResult<Vec<DeviceMoldBinding>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT mold_code, device_code, origin_task_id, bound_at
               FROM device_mold_binding
               ORDER BY mold_code ASC"#,
        )?;

        let bindings = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<DeviceMoldBinding>, _>>()?;

        Ok(bindings)
    }

    /// 释放绑定 (模具无后继任务时调用; 不存在则为空操作)
    pub fn release(&self, mold_code: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "DELETE FROM device_mold_binding WHERE mold_code = ?",
            params![mold_code],
        )?;

        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DeviceMoldBinding> {
        Ok(DeviceMoldBinding {
            mold_code: row.get(0)?,
            device_code: row.get(1)?,
            origin_task_id: row.get(2)?,
            bound_at: datetime_from_db(3, &row.get::<_, String>(3)?)?,
        })
    }
}

// ==========================================
// MES辅助排程系统 - 资源仓储 (设备/模具)
// ==========================================

use crate::domain::types::ResourceStatus;
use crate::domain::{Device, Mold};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{datetime_from_db, datetime_to_db, status_from_db};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// DeviceRepository - 设备仓储
// ==========================================
pub struct DeviceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeviceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建设备
    pub fn create(&self, device: &Device) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO device (
                device_code, device_name, capacity_per_hour, status,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &device.device_code,
                &device.device_name,
                &device.capacity_per_hour,
                device.status.as_str(),
                datetime_to_db(&device.created_at),
                datetime_to_db(&device.updated_at),
            ],
        )?;

        Ok(device.device_code.clone())
    }

    /// 按编码查询设备
    pub fn find_by_code(&self, device_code: &str) -> RepositoryResult<Option<Device>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT device_code, device_name, capacity_per_hour, status,
                      created_at, updated_at
               FROM device
               WHERE device_code = ?"#,
            params![device_code],
            |row| Self::map_row(row),
        ) {
            Ok(device) => Ok(Some(device)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, device_code: &str) -> RepositoryResult<bool> {
        Ok(self.find_by_code(device_code)?.is_some())
    }

    /// 查询所有设备 (按编码升序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Device>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT device_code, device_name, capacity_per_hour, status,
                      created_at, updated_at
               FROM device
               ORDER BY device_code ASC"#,
        )?;

        let devices = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<Device>, _>>()?;

        Ok(devices)
    }

    /// 更新设备状态 (正常/检修)
    pub fn update_status(
        &self,
        device_code: &str,
        status: ResourceStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE device SET status = ?, updated_at = ? WHERE device_code = ?",
            params![status.as_str(), datetime_to_db(&now), device_code],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Device".to_string(),
                id: device_code.to_string(),
            });
        }

        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Device> {
        Ok(Device {
            device_code: row.get(0)?,
            device_name: row.get(1)?,
            capacity_per_hour: row.get(2)?,
            status: status_from_db(3, &row.get::<_, String>(3)?, ResourceStatus::parse)?,
            created_at: datetime_from_db(4, &row.get::<_, String>(4)?)?,
            updated_at: datetime_from_db(5, &row.get::<_, String>(5)?)?,
        })
    }
}

// ==========================================
// MoldRepository - 模具仓储
// ==========================================
pub struct MoldRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MoldRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建模具
    ///
    /// # 返回
    /// - `Err(ValidationError)`: quantity < 1
    pub fn create(&self, mold: &Mold) -> RepositoryResult<String> {
        if mold.quantity < 1 {
            return Err(RepositoryError::ValidationError(format!(
                "模具副本数必须 >= 1: mold={}, quantity={}",
                mold.mold_code, mold.quantity
            )));
        }

        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO mold (
                mold_code, mold_name, status, quantity,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &mold.mold_code,
                &mold.mold_name,
                mold.status.as_str(),
                mold.quantity,
                datetime_to_db(&mold.created_at),
                datetime_to_db(&mold.updated_at),
            ],
        )?;

        Ok(mold.mold_code.clone())
    }

    /// 按编码查询模具
    pub fn find_by_code(&self, mold_code: &str) -> RepositoryResult<Option<Mold>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT mold_code, mold_name, status, quantity, created_at, updated_at
               FROM mold
               WHERE mold_code = ?"#,
            params![mold_code],
            |row| Self::map_row(row),
        ) {
            Ok(mold) => Ok(Some(mold)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, mold_code: &str) -> RepositoryResult<bool> {
        Ok(self.find_by_code(mold_code)?.is_some())
    }

    /// 查询所有模具 (按编码升序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Mold>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT mold_code, mold_name, status, quantity, created_at, updated_at
               FROM mold
               ORDER BY mold_code ASC"#,
        )?;

        let molds = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<Mold>, _>>()?;

        Ok(molds)
    }

    /// 更新模具状态 (正常/检修)
    pub fn update_status(
        &self,
        mold_code: &str,
        status: ResourceStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE mold SET status = ?, updated_at = ? WHERE mold_code = ?",
            params![status.as_str(), datetime_to_db(&now), mold_code],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Mold".to_string(),
                id: mold_code.to_string(),
            });
        }

        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Mold> {
        Ok(Mold {
            mold_code: row.get(0)?,
            mold_name: row.get(1)?,
            status: status_from_db(2, &row.get::<_, String>(2)?, ResourceStatus::parse)?,
            quantity: row.get(3)?,
            created_at: datetime_from_db(4, &row.get::<_, String>(4)?)?,
            updated_at: datetime_from_db(5, &row.get::<_, String>(5)?)?,
        })
    }
}

// ==========================================
// MES辅助排程系统 - 物料仓储
// ==========================================

use crate::domain::Material;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{datetime_from_db, datetime_to_db};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// MaterialRepository - 物料仓储
// ==========================================
pub struct MaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建物料
    ///
    /// # 返回
    /// - `Ok(material_code)`: 成功
    /// - `Err(UniqueConstraintViolation)`: 编码重复
    pub fn create(&self, material: &Material) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO material (
                material_code, material_name, material_type, spec,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &material.material_code,
                &material.material_name,
                &material.material_type,
                &material.spec,
                datetime_to_db(&material.created_at),
                datetime_to_db(&material.updated_at),
            ],
        )?;

        Ok(material.material_code.clone())
    }

    /// 按编码查询物料
    pub fn find_by_code(&self, material_code: &str) -> RepositoryResult<Option<Material>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT material_code, material_name, material_type, spec,
                      created_at, updated_at
               FROM material
               WHERE material_code = ?"#,
            params![material_code],
            |row| Self::map_row(row),
        ) {
            Ok(material) => Ok(Some(material)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 物料是否存在
    pub fn exists(&self, material_code: &str) -> RepositoryResult<bool> {
        Ok(self.find_by_code(material_code)?.is_some())
    }

    /// 分页查询物料列表 (按编码升序)
    pub fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Material>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT material_code, material_name, material_type, spec,
                      created_at, updated_at
               FROM material
               ORDER BY material_code ASC
               LIMIT ? OFFSET ?"#,
        )?;

        let materials = stmt
            .query_map(params![limit, offset], |row| Self::map_row(row))?
            .collect::<Result<Vec<Material>, _>>()?;

        Ok(materials)
    }

    /// 物料总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM material", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 映射数据库行到Material对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Material> {
        Ok(Material {
            material_code: row.get(0)?,
            material_name: row.get(1)?,
            material_type: row.get(2)?,
            spec: row.get(3)?,
            created_at: datetime_from_db(4, &row.get::<_, String>(4)?)?,
            updated_at: datetime_from_db(5, &row.get::<_, String>(5)?)?,
        })
    }
}

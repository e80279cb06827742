// ==========================================
// MES辅助排程系统 - 物料兼容关系仓储
// ==========================================
// 关系行定义候选集: 不在关系表中的 (物料, 资源)
// 配对对排程不可见
// ==========================================

use crate::domain::{MaterialDeviceRelation, MaterialMoldRelation};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{datetime_from_db, datetime_to_db};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// MaterialDeviceRelationRepository
// ==========================================
pub struct MaterialDeviceRelationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialDeviceRelationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建物料-设备关系
    ///
    /// # 返回
    /// - `Err(UniqueConstraintViolation)`: (物料, 设备) 已存在
    pub fn create(&self, relation: &MaterialDeviceRelation) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO material_device_relation (
                relation_id, material_code, device_code, weight, created_at
            ) VALUES (?, ?, ?, ?, ?)"#,
            params![
                &relation.relation_id,
                &relation.material_code,
                &relation.device_code,
                relation.weight,
                datetime_to_db(&relation.created_at),
            ],
        )?;

        Ok(relation.relation_id.clone())
    }

    /// 查询某物料的全部设备关系
    pub fn list_by_material(
        &self,
        material_code: &str,
    ) -> RepositoryResult<Vec<MaterialDeviceRelation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT relation_id, material_code, device_code, weight, created_at
               FROM material_device_relation
               WHERE material_code = ?
               ORDER BY weight DESC, device_code ASC"#,
        )?;

        let relations = stmt
            .query_map(params![material_code], |row| Self::map_row(row))?
            .collect::<Result<Vec<MaterialDeviceRelation>, _>>()?;

        Ok(relations)
    }

    /// 查询全部设备关系 (构建目录索引用)
    pub fn list_all(&self) -> RepositoryResult<Vec<MaterialDeviceRelation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT relation_id, material_code, device_code, weight, created_at
               FROM material_device_relation
               ORDER BY material_code ASC, weight DESC, device_code ASC"#,
        )?;

        let relations = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<MaterialDeviceRelation>, _>>()?;

        Ok(relations)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<MaterialDeviceRelation> {
        Ok(MaterialDeviceRelation {
            relation_id: row.get(0)?,
            material_code: row.get(1)?,
            device_code: row.get(2)?,
            weight: row.get(3)?,
            created_at: datetime_from_db(4, &row.get::<_, String>(4)?)?,
        })
    }
}

// ==========================================
// MaterialMoldRelationRepository
// ==========================================
pub struct MaterialMoldRelationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialMoldRelationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建物料-模具关系
    pub fn create(&self, relation: &MaterialMoldRelation) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO material_mold_relation (
                relation_id, material_code, mold_code, weight,
                cycle_time_s, output_per_cycle, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &relation.relation_id,
                &relation.material_code,
                &relation.mold_code,
                relation.weight,
                relation.cycle_time_s,
                relation.output_per_cycle,
                datetime_to_db(&relation.created_at),
            ],
        )?;

        Ok(relation.relation_id.clone())
    }

    /// 查询某物料的全部模具关系
    pub fn list_by_material(
        &self,
        material_code: &str,
    ) -> RepositoryResult<Vec<MaterialMoldRelation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT relation_id, material_code, mold_code, weight,
                      cycle_time_s, output_per_cycle, created_at
               FROM material_mold_relation
               WHERE material_code = ?
               ORDER BY weight DESC, mold_code ASC"#,
        )?;

        let relations = stmt
            .query_map(params![material_code], |row| Self::map_row(row))?
            .collect::<Result<Vec<MaterialMoldRelation>, _>>()?;

        Ok(relations)
    }

    /// 查询全部模具关系 (构建目录索引用)
    pub fn list_all(&self) -> RepositoryResult<Vec<MaterialMoldRelation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT relation_id, material_code, mold_code, weight,
                      cycle_time_s, output_per_cycle, created_at
               FROM material_mold_relation
               ORDER BY material_code ASC, weight DESC, mold_code ASC"#,
        )?;

        let relations = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<MaterialMoldRelation>, _>>()?;

        Ok(relations)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<MaterialMoldRelation> {
        Ok(MaterialMoldRelation {
            relation_id: row.get(0)?,
            material_code: row.get(1)?,
            mold_code: row.get(2)?,
            weight: row.get(3)?,
            cycle_time_s: row.get(4)?,
            output_per_cycle: row.get(5)?,
            created_at: datetime_from_db(6, &row.get::<_, String>(6)?)?,
        })
    }
}

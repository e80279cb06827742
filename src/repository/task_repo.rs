// ==========================================
// MES辅助排程系统 - 生产任务仓储
// ==========================================
// 唯一性不变式由部分唯一索引 idx_task_active_plan
// 兜底: 同一计划不可能同时存在两个未终结任务
// ==========================================

use crate::domain::types::TaskStatus;
use crate::domain::ProductionTask;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{datetime_from_db, datetime_to_db, status_from_db};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// TaskRepository - 生产任务仓储
// ==========================================
pub struct TaskRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TaskRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建任务
    pub fn create(&self, task: &ProductionTask) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO production_task (
                task_id, plan_number, device_code, mold_code, reservation_id,
                scheduled_start, scheduled_end, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &task.task_id,
                &task.plan_number,
                &task.device_code,
                &task.mold_code,
                &task.reservation_id,
                datetime_to_db(&task.scheduled_start),
                datetime_to_db(&task.scheduled_end),
                task.status.as_str(),
                datetime_to_db(&task.created_at),
                datetime_to_db(&task.updated_at),
            ],
        )?;

        Ok(task.task_id.clone())
    }

    /// 按任务ID查询
    pub fn find_by_id(&self, task_id: &str) -> RepositoryResult<Option<ProductionTask>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT task_id, plan_number, device_code, mold_code, reservation_id,
                      scheduled_start, scheduled_end, status, created_at, updated_at
               FROM production_task
               WHERE task_id = ?"#,
            params![task_id],
            |row| Self::map_row(row),
        ) {
            Ok(task) => Ok(Some(task)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询计划的未终结任务
    pub fn find_active_by_plan(&self, plan_number: &str) -> RepositoryResult<Option<ProductionTask>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT task_id, plan_number, device_code, mold_code, reservation_id,
                      scheduled_start, scheduled_end, status, created_at, updated_at
               FROM production_task
               WHERE plan_number = ? AND status IN ('SCHEDULED', 'IN_PROGRESS')"#,
            params![plan_number],
            |row| Self::map_row(row),
        ) {
            Ok(task) => Ok(Some(task)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 分页查询任务 (可按状态过滤, 按计划开始时间升序)
    pub fn list(
        &self,
        status: Option<TaskStatus>,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<ProductionTask>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT task_id, plan_number, device_code, mold_code, reservation_id,
                      scheduled_start, scheduled_end, status, created_at, updated_at
               FROM production_task
               WHERE (?1 IS NULL OR status = ?1)
               ORDER BY scheduled_start ASC, task_id ASC
               LIMIT ?2 OFFSET ?3"#,
        )?;

        let tasks = stmt
            .query_map(
                params![status.map(|s| s.as_str()), limit, offset],
                |row| Self::map_row(row),
            )?
            .collect::<Result<Vec<ProductionTask>, _>>()?;

        Ok(tasks)
    }

    /// 任务总数 (可按状态过滤)
    pub fn count(&self, status: Option<TaskStatus>) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM production_task WHERE (?1 IS NULL OR status = ?1)",
            params![status.map(|s| s.as_str())],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 某模具的未终结任务数 (绑定释放判定用)
    pub fn active_count_for_mold(&self, mold_code: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*) FROM production_task
               WHERE mold_code = ? AND status IN ('SCHEDULED', 'IN_PROGRESS')"#,
            params![mold_code],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 任务状态转换
    pub fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE production_task SET status = ?, updated_at = ? WHERE task_id = ?",
            params![status.as_str(), datetime_to_db(&now), task_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductionTask".to_string(),
                id: task_id.to_string(),
            });
        }

        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ProductionTask> {
        Ok(ProductionTask {
            task_id: row.get(0)?,
            plan_number: row.get(1)?,
            device_code: row.get(2)?,
            mold_code: row.get(3)?,
            reservation_id: row.get(4)?,
            scheduled_start: datetime_from_db(5, &row.get::<_, String>(5)?)?,
            scheduled_end: datetime_from_db(6, &row.get::<_, String>(6)?)?,
            status: status_from_db(7, &row.get::<_, String>(7)?, TaskStatus::parse)?,
            created_at: datetime_from_db(8, &row.get::<_, String>(8)?)?,
            updated_at: datetime_from_db(9, &row.get::<_, String>(9)?)?,
        })
    }
}

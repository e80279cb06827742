// ==========================================
// MES辅助排程系统 - 排程运行记录仓储
// ==========================================

use crate::domain::ScheduleRunLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{datetime_from_db, datetime_to_db};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ScheduleRunLogRepository - 运行记录仓储
// ==========================================
pub struct ScheduleRunLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleRunLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 落一条完整的运行记录 (运行结束时一次性写入)
    pub fn create(&self, log: &ScheduleRunLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO schedule_run_log (
                run_id, triggered_by, started_at, finished_at,
                scheduled_count, blocked_count, outcome_json, config_snapshot_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &log.run_id,
                &log.triggered_by,
                datetime_to_db(&log.started_at),
                log.finished_at.as_ref().map(datetime_to_db),
                log.scheduled_count,
                log.blocked_count,
                &log.outcome_json,
                &log.config_snapshot_json,
            ],
        )?;

        Ok(log.run_id.clone())
    }

    /// 按运行ID查询
    pub fn find_by_id(&self, run_id: &str) -> RepositoryResult<Option<ScheduleRunLog>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT run_id, triggered_by, started_at, finished_at,
                      scheduled_count, blocked_count, outcome_json, config_snapshot_json
               FROM schedule_run_log
               WHERE run_id = ?"#,
            params![run_id],
            |row| Self::map_row(row),
        ) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 分页查询运行记录 (按开始时间降序)
    pub fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<ScheduleRunLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT run_id, triggered_by, started_at, finished_at,
                      scheduled_count, blocked_count, outcome_json, config_snapshot_json
               FROM schedule_run_log
               ORDER BY started_at DESC, run_id ASC
               LIMIT ? OFFSET ?"#,
        )?;

        let logs = stmt
            .query_map(params![limit, offset], |row| Self::map_row(row))?
            .collect::<Result<Vec<ScheduleRunLog>, _>>()?;

        Ok(logs)
    }

    /// 运行记录总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM schedule_run_log", [], |row| row.get(0))?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ScheduleRunLog> {
        let finished_at = match row.get::<_, Option<String>>(3)? {
            Some(raw) => Some(datetime_from_db(3, &raw)?),
            None => None,
        };

        Ok(ScheduleRunLog {
            run_id: row.get(0)?,
            triggered_by: row.get(1)?,
            started_at: datetime_from_db(2, &row.get::<_, String>(2)?)?,
            finished_at,
            scheduled_count: row.get(4)?,
            blocked_count: row.get(5)?,
            outcome_json: row.get(6)?,
            config_snapshot_json: row.get(7)?,
        })
    }
}

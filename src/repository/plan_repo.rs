// ==========================================
// MES辅助排程系统 - 生产计划仓储
// ==========================================
// 排程器对计划的写入仅限状态转换;
// 计划的创建/修改属于外部 CRUD 流程
// ==========================================

use crate::domain::types::{BlockReason, PlanStatus};
use crate::domain::ProductionPlan;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{date_from_db, date_to_db, datetime_from_db, datetime_to_db, status_from_db};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// PlanRepository - 生产计划仓储
// ==========================================
pub struct PlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建计划
    ///
    /// # 返回
    /// - `Ok(plan_number)`: 成功
    /// - `Err(UniqueConstraintViolation)`: 计划单号重复
    pub fn create(&self, plan: &ProductionPlan) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO production_plan (
                plan_number, material_code, planned_quantity, due_date,
                status, block_reason, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &plan.plan_number,
                &plan.material_code,
                plan.planned_quantity,
                date_to_db(&plan.due_date),
                plan.status.as_str(),
                plan.block_reason.map(|r| r.as_str()),
                datetime_to_db(&plan.created_at),
                datetime_to_db(&plan.updated_at),
            ],
        )?;

        Ok(plan.plan_number.clone())
    }

    /// 按计划单号查询
    pub fn find_by_number(&self, plan_number: &str) -> RepositoryResult<Option<ProductionPlan>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT plan_number, material_code, planned_quantity, due_date,
                      status, block_reason, created_at, updated_at
               FROM production_plan
               WHERE plan_number = ?"#,
            params![plan_number],
            |row| Self::map_row(row),
        ) {
            Ok(plan) => Ok(Some(plan)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, plan_number: &str) -> RepositoryResult<bool> {
        Ok(self.find_by_number(plan_number)?.is_some())
    }

    /// 查询待排程积压 (UNSCHEDULED/BLOCKED)
    ///
    /// 交期升序为首要排序键 (紧迫度优先), 单号升序保证确定性;
    /// limit 为单次运行的计划数上限 (0 表示不限)
    pub fn list_schedulable(&self, limit: usize) -> RepositoryResult<Vec<ProductionPlan>> {
        let conn = self.get_conn()?;

        let effective_limit = if limit == 0 { i64::MAX } else { limit as i64 };

        let mut stmt = conn.prepare(
            r#"SELECT plan_number, material_code, planned_quantity, due_date,
                      status, block_reason, created_at, updated_at
               FROM production_plan
               WHERE status IN ('UNSCHEDULED', 'BLOCKED')
               ORDER BY due_date ASC, plan_number ASC
               LIMIT ?"#,
        )?;

        let plans = stmt
            .query_map(params![effective_limit], |row| Self::map_row(row))?
            .collect::<Result<Vec<ProductionPlan>, _>>()?;

        Ok(plans)
    }

    /// 分页查询计划 (可按状态过滤, 按交期升序)
    pub fn list(
        &self,
        status: Option<PlanStatus>,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<ProductionPlan>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT plan_number, material_code, planned_quantity, due_date,
                      status, block_reason, created_at, updated_at
               FROM production_plan
               WHERE (?1 IS NULL OR status = ?1)
               ORDER BY due_date ASC, plan_number ASC
               LIMIT ?2 OFFSET ?3"#,
        )?;

        let plans = stmt
            .query_map(
                params![status.map(|s| s.as_str()), limit, offset],
                |row| Self::map_row(row),
            )?
            .collect::<Result<Vec<ProductionPlan>, _>>()?;

        Ok(plans)
    }

    /// 计划总数 (可按状态过滤)
    pub fn count(&self, status: Option<PlanStatus>) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM production_plan WHERE (?1 IS NULL OR status = ?1)",
            params![status.map(|s| s.as_str())],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 状态转换
    ///
    /// BLOCKED 状态须携带阻塞原因, 其余状态清空原因字段
    pub fn update_status(
        &self,
        plan_number: &str,
        status: PlanStatus,
        block_reason: Option<BlockReason>,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        if status == PlanStatus::Blocked && block_reason.is_none() {
            return Err(RepositoryError::ValidationError(format!(
                "BLOCKED 状态必须携带阻塞原因: plan={}",
                plan_number
            )));
        }

        let reason = if status == PlanStatus::Blocked {
            block_reason.map(|r| r.as_str())
        } else {
            None
        };

        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE production_plan
               SET status = ?, block_reason = ?, updated_at = ?
               WHERE plan_number = ?"#,
            params![status.as_str(), reason, datetime_to_db(&now), plan_number],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductionPlan".to_string(),
                id: plan_number.to_string(),
            });
        }

        Ok(())
    }

    /// 映射数据库行到ProductionPlan对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ProductionPlan> {
        let block_reason = row
            .get::<_, Option<String>>(5)?
            .as_deref()
            .and_then(BlockReason::parse);

        Ok(ProductionPlan {
            plan_number: row.get(0)?,
            material_code: row.get(1)?,
            planned_quantity: row.get(2)?,
            due_date: date_from_db(3, &row.get::<_, String>(3)?)?,
            status: status_from_db(4, &row.get::<_, String>(4)?, PlanStatus::parse)?,
            block_reason,
            created_at: datetime_from_db(6, &row.get::<_, String>(6)?)?,
            updated_at: datetime_from_db(7, &row.get::<_, String>(7)?)?,
        })
    }
}

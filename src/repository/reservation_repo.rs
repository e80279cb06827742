// ==========================================
// MES辅助排程系统 - 产能预留仓储
// ==========================================
// try_reserve 是跨运行并发的唯一串行化点:
// 同一 IMMEDIATE 事务内完成 "设备空闲 + 模具负载 <
// 副本数 + 资源非检修" 校验与预留落库, 保障容量
// 不变式在并发排程下不被破坏
// ==========================================
// 说明: 文本日期时间为固定格式, 字典序即时间序,
// 窗口重叠判断可直接在 SQL 中完成
// ==========================================

use crate::domain::ResourceReservation;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{datetime_from_db, datetime_to_db};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// 预留结果
// ==========================================

/// 预留冲突类别 (冲突不是错误, 由 Allocator 决定重试或阻塞)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationConflict {
    /// 设备在目标窗口内已被占用
    DeviceBusy,
    /// 模具并发负载已达物理副本数
    MoldExhausted,
    /// 设备或模具处于检修状态
    ResourceMaintenance,
}

/// 预留尝试的结果
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// 预留成功, 返回预留ID
    Reserved(String),
    /// 预留失败, 返回冲突类别
    Conflict(ReservationConflict),
}

// ==========================================
// ReservationRepository - 产能预留仓储
// ==========================================
pub struct ReservationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReservationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 原子预留 (check-and-set)
    ///
    /// 校验与写入在同一 IMMEDIATE 事务内完成:
    /// 1. 设备/模具存在且状态非 MAINTENANCE
    /// 2. 设备在 [start, end) 内无未释放预留
    /// 3. 模具在 [start, end) 内的未释放预留数 < quantity
    ///
    /// # 返回
    /// - `Ok(Reserved(id))`: 预留成功
    /// - `Ok(Conflict(kind))`: 校验未通过 (正常结果, 非错误)
    /// - `Err`: 存储故障
    pub fn try_reserve(
        &self,
        device_code: &str,
        mold_code: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        now: NaiveDateTime,
    ) -> RepositoryResult<ReserveOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let start_db = datetime_to_db(&window_start);
        let end_db = datetime_to_db(&window_end);

        // 1. 资源状态校验
        let device_status: String = tx
            .query_row(
                "SELECT status FROM device WHERE device_code = ?",
                params![device_code],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "Device".to_string(),
                    id: device_code.to_string(),
                },
                other => other.into(),
            })?;

        let (mold_status, mold_quantity): (String, i64) = tx
            .query_row(
                "SELECT status, quantity FROM mold WHERE mold_code = ?",
                params![mold_code],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "Mold".to_string(),
                    id: mold_code.to_string(),
                },
                other => other.into(),
            })?;

        if device_status != "NORMAL" || mold_status != "NORMAL" {
            return Ok(ReserveOutcome::Conflict(
                ReservationConflict::ResourceMaintenance,
            ));
        }

        // 2. 设备独占: 目标窗口内不得有任何未释放预留
        let device_overlap: i64 = tx.query_row(
            r#"SELECT COUNT(*) FROM resource_reservation
               WHERE device_code = ? AND released = 0
                 AND window_start < ? AND window_end > ?"#,
            params![device_code, end_db, start_db],
            |row| row.get(0),
        )?;

        if device_overlap > 0 {
            return Ok(ReserveOutcome::Conflict(ReservationConflict::DeviceBusy));
        }

        // 3. 模具并发上限
        let mold_load: i64 = tx.query_row(
            r#"SELECT COUNT(*) FROM resource_reservation
               WHERE mold_code = ? AND released = 0
                 AND window_start < ? AND window_end > ?"#,
            params![mold_code, end_db, start_db],
            |row| row.get(0),
        )?;

        if mold_load >= mold_quantity {
            return Ok(ReserveOutcome::Conflict(ReservationConflict::MoldExhausted));
        }

        // 4. 落库
        let reservation_id = Uuid::new_v4().to_string();
        tx.execute(
            r#"INSERT INTO resource_reservation (
                reservation_id, device_code, mold_code,
                window_start, window_end, released, created_at
            ) VALUES (?, ?, ?, ?, ?, 0, ?)"#,
            params![
                &reservation_id,
                device_code,
                mold_code,
                start_db,
                end_db,
                datetime_to_db(&now),
            ],
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(ReserveOutcome::Reserved(reservation_id))
    }

    /// 释放预留 (任务完成/取消时调用)
    pub fn release(&self, reservation_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE resource_reservation SET released = 1 WHERE reservation_id = ?",
            params![reservation_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ResourceReservation".to_string(),
                id: reservation_id.to_string(),
            });
        }

        Ok(())
    }

    /// 查询全部未释放预留 (Ledger 运行快照用)
    pub fn list_live(&self) -> RepositoryResult<Vec<ResourceReservation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT reservation_id, device_code, mold_code,
                      window_start, window_end, released, created_at
               FROM resource_reservation
               WHERE released = 0
               ORDER BY window_start ASC, reservation_id ASC"#,
        )?;

        let reservations = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<ResourceReservation>, _>>()?;

        Ok(reservations)
    }

    /// 某模具当前未释放预留数
    pub fn live_count_for_mold(&self, mold_code: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM resource_reservation WHERE mold_code = ? AND released = 0",
            params![mold_code],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ResourceReservation> {
        Ok(ResourceReservation {
            reservation_id: row.get(0)?,
            device_code: row.get(1)?,
            mold_code: row.get(2)?,
            window_start: datetime_from_db(3, &row.get::<_, String>(3)?)?,
            window_end: datetime_from_db(4, &row.get::<_, String>(4)?)?,
            released: row.get::<_, i64>(5)? != 0,
            created_at: datetime_from_db(6, &row.get::<_, String>(6)?)?,
        })
    }
}

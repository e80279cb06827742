// ==========================================
// MES辅助排程系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发排程时的偶发 busy 错误
// - 统一建表入口: init_schema 幂等，可重复执行
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 排程服务自管以下表:
/// - 参照数据: material / device / mold
/// - 关系数据: material_device_relation / material_mold_relation
/// - 计划与任务: production_plan / production_task
/// - 排程状态: resource_reservation / device_mold_binding / assignment_memory
/// - 运行记录与配置: schedule_run_log / config_kv
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS material (
          material_code TEXT PRIMARY KEY,
          material_name TEXT NOT NULL,
          material_type TEXT,
          spec TEXT,
          created_at TEXT NOT NULL DEFAULT (datetime('now')),
          updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS device (
          device_code TEXT PRIMARY KEY,
          device_name TEXT NOT NULL,
          capacity_per_hour REAL,
          status TEXT NOT NULL DEFAULT 'NORMAL',
          created_at TEXT NOT NULL DEFAULT (datetime('now')),
          updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS mold (
          mold_code TEXT PRIMARY KEY,
          mold_name TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'NORMAL',
          quantity INTEGER NOT NULL DEFAULT 1,
          created_at TEXT NOT NULL DEFAULT (datetime('now')),
          updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS material_device_relation (
          relation_id TEXT PRIMARY KEY,
          material_code TEXT NOT NULL,
          device_code TEXT NOT NULL,
          weight INTEGER NOT NULL,
          created_at TEXT NOT NULL DEFAULT (datetime('now')),
          FOREIGN KEY (material_code) REFERENCES material(material_code),
          FOREIGN KEY (device_code) REFERENCES device(device_code),
          UNIQUE(material_code, device_code)
        );

        CREATE INDEX IF NOT EXISTS idx_mdr_material
          ON material_device_relation(material_code);

        CREATE TABLE IF NOT EXISTS material_mold_relation (
          relation_id TEXT PRIMARY KEY,
          material_code TEXT NOT NULL,
          mold_code TEXT NOT NULL,
          weight INTEGER NOT NULL,
          cycle_time_s REAL NOT NULL,
          output_per_cycle REAL NOT NULL,
          created_at TEXT NOT NULL DEFAULT (datetime('now')),
          FOREIGN KEY (material_code) REFERENCES material(material_code),
          FOREIGN KEY (mold_code) REFERENCES mold(mold_code),
          UNIQUE(material_code, mold_code)
        );

        CREATE INDEX IF NOT EXISTS idx_mmr_material
          ON material_mold_relation(material_code);

        CREATE TABLE IF NOT EXISTS production_plan (
          plan_number TEXT PRIMARY KEY,
          material_code TEXT NOT NULL,
          planned_quantity REAL NOT NULL,
          due_date TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'UNSCHEDULED',
          block_reason TEXT,
          created_at TEXT NOT NULL DEFAULT (datetime('now')),
          updated_at TEXT NOT NULL DEFAULT (datetime('now')),
          FOREIGN KEY (material_code) REFERENCES material(material_code)
        );

        CREATE INDEX IF NOT EXISTS idx_plan_status_due
          ON production_plan(status, due_date);

        CREATE TABLE IF NOT EXISTS resource_reservation (
          reservation_id TEXT PRIMARY KEY,
          device_code TEXT NOT NULL,
          mold_code TEXT NOT NULL,
          window_start TEXT NOT NULL,
          window_end TEXT NOT NULL,
          released INTEGER NOT NULL DEFAULT 0,
          created_at TEXT NOT NULL DEFAULT (datetime('now')),
          FOREIGN KEY (device_code) REFERENCES device(device_code),
          FOREIGN KEY (mold_code) REFERENCES mold(mold_code)
        );

        CREATE INDEX IF NOT EXISTS idx_reservation_device
          ON resource_reservation(device_code, released);
        CREATE INDEX IF NOT EXISTS idx_reservation_mold
          ON resource_reservation(mold_code, released);

        CREATE TABLE IF NOT EXISTS production_task (
          task_id TEXT PRIMARY KEY,
          plan_number TEXT NOT NULL,
          device_code TEXT NOT NULL,
          mold_code TEXT NOT NULL,
          reservation_id TEXT NOT NULL,
          scheduled_start TEXT NOT NULL,
          scheduled_end TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'SCHEDULED',
          created_at TEXT NOT NULL DEFAULT (datetime('now')),
          updated_at TEXT NOT NULL DEFAULT (datetime('now')),
          FOREIGN KEY (plan_number) REFERENCES production_plan(plan_number),
          FOREIGN KEY (device_code) REFERENCES device(device_code),
          FOREIGN KEY (mold_code) REFERENCES mold(mold_code),
          FOREIGN KEY (reservation_id) REFERENCES resource_reservation(reservation_id)
        );

        -- 一个计划最多一个未终结任务
        CREATE UNIQUE INDEX IF NOT EXISTS idx_task_active_plan
          ON production_task(plan_number)
          WHERE status IN ('SCHEDULED', 'IN_PROGRESS');

        CREATE INDEX IF NOT EXISTS idx_task_mold_status
          ON production_task(mold_code, status);

        CREATE TABLE IF NOT EXISTS device_mold_binding (
          mold_code TEXT PRIMARY KEY,
          device_code TEXT NOT NULL,
          origin_task_id TEXT,
          bound_at TEXT NOT NULL DEFAULT (datetime('now')),
          FOREIGN KEY (mold_code) REFERENCES mold(mold_code),
          FOREIGN KEY (device_code) REFERENCES device(device_code)
        );

        CREATE TABLE IF NOT EXISTS assignment_memory (
          scope TEXT NOT NULL,
          key_code TEXT NOT NULL,
          device_code TEXT,
          mold_code TEXT,
          updated_at TEXT NOT NULL DEFAULT (datetime('now')),
          PRIMARY KEY (scope, key_code)
        );

        CREATE TABLE IF NOT EXISTS schedule_run_log (
          run_id TEXT PRIMARY KEY,
          triggered_by TEXT,
          started_at TEXT NOT NULL,
          finished_at TEXT,
          scheduled_count INTEGER NOT NULL DEFAULT 0,
          blocked_count INTEGER NOT NULL DEFAULT 0,
          outcome_json TEXT,
          config_snapshot_json TEXT
        );

        CREATE TABLE IF NOT EXISTS config_kv (
          scope_id TEXT NOT NULL DEFAULT 'global',
          key TEXT NOT NULL,
          value TEXT NOT NULL,
          updated_at TEXT NOT NULL DEFAULT (datetime('now')),
          PRIMARY KEY (scope_id, key)
        );
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        // 重复执行不报错
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='production_plan'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}

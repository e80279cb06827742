// ==========================================
// MES辅助排程系统 - 资源台账
// ==========================================
// 职责: 产能占用的运行期视图与预留入口
// - 内存镜像: 设备占用窗口 / 模具占用窗口,
//   同一运行内先排的计划对后排的计划可见
// - reserve: 委托仓储在单事务内完成原子校验落库,
//   跨运行并发在此收敛 (不变式 1-2 的保护点)
// ==========================================

use crate::repository::{
    RepositoryResult, ReservationRepository, ReserveOutcome,
};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 台账窗口条目
#[derive(Debug, Clone)]
struct LedgerWindow {
    reservation_id: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl LedgerWindow {
    fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && self.end > start
    }

    fn covers(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }
}

// ==========================================
// ResourceLedger - 资源台账
// ==========================================
pub struct ResourceLedger {
    reservation_repo: Arc<ReservationRepository>,
    device_windows: HashMap<String, Vec<LedgerWindow>>,
    mold_windows: HashMap<String, Vec<LedgerWindow>>,
}

impl ResourceLedger {
    /// 创建并加载当前未释放预留的快照
    pub fn load(reservation_repo: Arc<ReservationRepository>) -> RepositoryResult<Self> {
        let mut ledger = Self {
            reservation_repo,
            device_windows: HashMap::new(),
            mold_windows: HashMap::new(),
        };
        ledger.refresh()?;
        Ok(ledger)
    }

    /// 重新同步内存镜像 (运行开始时与预留冲突重试前调用)
    pub fn refresh(&mut self) -> RepositoryResult<()> {
        self.device_windows.clear();
        self.mold_windows.clear();

        for reservation in self.reservation_repo.list_live()? {
            let window = LedgerWindow {
                reservation_id: reservation.reservation_id.clone(),
                start: reservation.window_start,
                end: reservation.window_end,
            };
            self.device_windows
                .entry(reservation.device_code.clone())
                .or_default()
                .push(window.clone());
            self.mold_windows
                .entry(reservation.mold_code)
                .or_default()
                .push(window);
        }

        Ok(())
    }

    /// 设备在指定时刻是否空闲
    pub fn is_device_free(&self, device_code: &str, at: NaiveDateTime) -> bool {
        self.device_windows
            .get(device_code)
            .map(|windows| !windows.iter().any(|w| w.covers(at)))
            .unwrap_or(true)
    }

    /// 设备在目标窗口内是否无占用
    pub fn is_device_window_free(
        &self,
        device_code: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> bool {
        self.device_windows
            .get(device_code)
            .map(|windows| !windows.iter().any(|w| w.overlaps(start, end)))
            .unwrap_or(true)
    }

    /// 模具当前未释放预留总数
    pub fn active_load(&self, mold_code: &str) -> usize {
        self.mold_windows
            .get(mold_code)
            .map(|windows| windows.len())
            .unwrap_or(0)
    }

    /// 模具在目标窗口内的并发占用数
    pub fn window_load(&self, mold_code: &str, start: NaiveDateTime, end: NaiveDateTime) -> usize {
        self.mold_windows
            .get(mold_code)
            .map(|windows| windows.iter().filter(|w| w.overlaps(start, end)).count())
            .unwrap_or(0)
    }

    /// 原子预留
    ///
    /// 持久层校验成功后更新内存镜像, 使同一运行内
    /// 后续计划立即看到该占用
    pub fn reserve(
        &mut self,
        device_code: &str,
        mold_code: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        now: NaiveDateTime,
    ) -> RepositoryResult<ReserveOutcome> {
        let outcome = self.reservation_repo.try_reserve(
            device_code,
            mold_code,
            window_start,
            window_end,
            now,
        )?;

        if let ReserveOutcome::Reserved(ref reservation_id) = outcome {
            debug!(
                device = device_code,
                mold = mold_code,
                reservation_id = %reservation_id,
                "产能预留成功"
            );
            let window = LedgerWindow {
                reservation_id: reservation_id.clone(),
                start: window_start,
                end: window_end,
            };
            self.device_windows
                .entry(device_code.to_string())
                .or_default()
                .push(window.clone());
            self.mold_windows
                .entry(mold_code.to_string())
                .or_default()
                .push(window);
        }

        Ok(outcome)
    }

    /// 释放预留 (任务完成/取消时调用)
    pub fn release(
        &mut self,
        reservation_id: &str,
        device_code: &str,
        mold_code: &str,
    ) -> RepositoryResult<()> {
        self.reservation_repo.release(reservation_id)?;

        if let Some(windows) = self.device_windows.get_mut(device_code) {
            windows.retain(|w| w.reservation_id != reservation_id);
        }
        if let Some(windows) = self.mold_windows.get_mut(mold_code) {
            windows.retain(|w| w.reservation_id != reservation_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::NaiveDate;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup() -> Arc<ReservationRepository> {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();

        conn.execute_batch(
            r#"
            INSERT INTO device (device_code, device_name, status) VALUES ('DEV-001', '一号机', 'NORMAL');
            INSERT INTO device (device_code, device_name, status) VALUES ('DEV-002', '二号机', 'NORMAL');
            INSERT INTO mold (mold_code, mold_name, status, quantity) VALUES ('MOLD-001', '一号模', 'NORMAL', 2);
            "#,
        )
        .unwrap();

        Arc::new(ReservationRepository::new(Arc::new(Mutex::new(conn))))
    }

    fn t(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_reserve_updates_mirror() {
        let mut ledger = ResourceLedger::load(setup()).unwrap();

        assert!(ledger.is_device_free("DEV-001", t(9)));
        assert_eq!(ledger.active_load("MOLD-001"), 0);

        let outcome = ledger
            .reserve("DEV-001", "MOLD-001", t(8), t(12), t(8))
            .unwrap();
        assert!(matches!(outcome, ReserveOutcome::Reserved(_)));

        // 镜像立即反映占用, 无需重新加载
        assert!(!ledger.is_device_free("DEV-001", t(9)));
        assert!(ledger.is_device_free("DEV-001", t(12)));
        assert!(!ledger.is_device_window_free("DEV-001", t(10), t(14)));
        assert_eq!(ledger.active_load("MOLD-001"), 1);
        assert_eq!(ledger.window_load("MOLD-001", t(9), t(10)), 1);
        assert_eq!(ledger.window_load("MOLD-001", t(12), t(13)), 0);
    }

    #[test]
    fn test_release_removes_window() {
        let mut ledger = ResourceLedger::load(setup()).unwrap();

        let reservation_id = match ledger
            .reserve("DEV-001", "MOLD-001", t(8), t(12), t(8))
            .unwrap()
        {
            ReserveOutcome::Reserved(id) => id,
            other => panic!("预期预留成功: {:?}", other),
        };

        ledger
            .release(&reservation_id, "DEV-001", "MOLD-001")
            .unwrap();

        assert!(ledger.is_device_free("DEV-001", t(9)));
        assert_eq!(ledger.active_load("MOLD-001"), 0);
    }

    #[test]
    fn test_refresh_syncs_cross_run_state() {
        let repo = setup();
        let mut ledger_a = ResourceLedger::load(repo.clone()).unwrap();
        let mut ledger_b = ResourceLedger::load(repo).unwrap();

        let outcome = ledger_a
            .reserve("DEV-002", "MOLD-001", t(8), t(10), t(8))
            .unwrap();
        assert!(matches!(outcome, ReserveOutcome::Reserved(_)));

        // 另一份台账在 refresh 前看不到, refresh 后看到
        assert!(ledger_b.is_device_free("DEV-002", t(9)));
        ledger_b.refresh().unwrap();
        assert!(!ledger_b.is_device_free("DEV-002", t(9)));
    }
}

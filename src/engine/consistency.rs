// ==========================================
// MES辅助排程系统 - 一致性追踪器
// ==========================================
// 职责: "同物料一致性" / "同模具一致性" 的历史视图
// 只作评分偏置: 历史资源不可行时 (检修/产能耗尽)
// Ranker 仍须考虑其他候选
// ==========================================

use crate::repository::{ConsistencyRepository, RepositoryResult};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Arc;

// ==========================================
// ConsistencyTracker - 一致性追踪器
// ==========================================
pub struct ConsistencyTracker {
    repo: Arc<ConsistencyRepository>,
    // 物料 -> 上次使用的 (设备, 模具)
    by_material: HashMap<String, (String, String)>,
    // 模具 -> 上次配对的设备
    by_mold: HashMap<String, String>,
}

impl ConsistencyTracker {
    /// 加载历史指派视图 (每次排程运行一次)
    pub fn load(repo: Arc<ConsistencyRepository>) -> RepositoryResult<Self> {
        let by_material = repo
            .list_material_memory()?
            .into_iter()
            .map(|m| (m.material_code, (m.device_code, m.mold_code)))
            .collect();

        let by_mold = repo
            .list_mold_memory()?
            .into_iter()
            .map(|m| (m.mold_code, m.device_code))
            .collect();

        Ok(Self {
            repo,
            by_material,
            by_mold,
        })
    }

    /// 物料上次使用的设备
    pub fn prior_device_for(&self, material_code: &str) -> Option<&str> {
        self.by_material
            .get(material_code)
            .map(|(device, _)| device.as_str())
    }

    /// 物料上次使用的模具
    pub fn prior_mold_for(&self, material_code: &str) -> Option<&str> {
        self.by_material
            .get(material_code)
            .map(|(_, mold)| mold.as_str())
    }

    /// 模具上次配对的设备
    pub fn prior_device_for_mold(&self, mold_code: &str) -> Option<&str> {
        self.by_mold.get(mold_code).map(|s| s.as_str())
    }

    /// 记录一次成功指派 (Task Emitter 在每次指派后调用)
    ///
    /// 同时更新内存视图与持久层, 同一运行内的
    /// 后续计划立即受益于新的一致性偏置
    pub fn record(
        &mut self,
        material_code: &str,
        device_code: &str,
        mold_code: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        self.repo
            .record_assignment(material_code, device_code, mold_code, now)?;

        self.by_material.insert(
            material_code.to_string(),
            (device_code.to_string(), mold_code.to_string()),
        );
        self.by_mold
            .insert(mold_code.to_string(), device_code.to_string());

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

    fn setup() -> Arc<ConsistencyRepository> {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        Arc::new(ConsistencyRepository::new(Arc::new(Mutex::new(conn))))
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_history() {
        let tracker = ConsistencyTracker::load(setup()).unwrap();
        assert_eq!(tracker.prior_device_for("MAT-001"), None);
        assert_eq!(tracker.prior_mold_for("MAT-001"), None);
        assert_eq!(tracker.prior_device_for_mold("MOLD-001"), None);
    }

    #[test]
    fn test_record_then_query() {
        let mut tracker = ConsistencyTracker::load(setup()).unwrap();

        tracker
            .record("MAT-001", "DEV-002", "MOLD-005", now())
            .unwrap();

        assert_eq!(tracker.prior_device_for("MAT-001"), Some("DEV-002"));
        assert_eq!(tracker.prior_mold_for("MAT-001"), Some("MOLD-005"));
        assert_eq!(tracker.prior_device_for_mold("MOLD-005"), Some("DEV-002"));
    }

    #[test]
    fn test_record_persists_across_reload() {
        let repo = setup();
        {
            let mut tracker = ConsistencyTracker::load(repo.clone()).unwrap();
            tracker
                .record("MAT-001", "DEV-002", "MOLD-005", now())
                .unwrap();
            // 同一物料的新指派覆盖旧记录
            tracker
                .record("MAT-001", "DEV-003", "MOLD-006", now())
                .unwrap();
        }

        let reloaded = ConsistencyTracker::load(repo).unwrap();
        assert_eq!(reloaded.prior_device_for("MAT-001"), Some("DEV-003"));
        assert_eq!(reloaded.prior_mold_for("MAT-001"), Some("MOLD-006"));
        assert_eq!(reloaded.prior_device_for_mold("MOLD-005"), Some("DEV-002"));
    }
}

// ==========================================
// MES辅助排程系统 - 偏好评分引擎
// ==========================================
// 综合评分 = w_device·设备权重 + w_mold·模具权重
//          + w_throughput·产出率分 + 一致性加分
// 业务意图: 换型成本规避压过权重边际差异, 即
// "同物料一致性"/"同模具一致性" 优先于原始权重;
// 其后平局依次按原始权重、产出率、编码裁决
// ==========================================
// 产出率分归一化到 0-10: 以候选集中最大产出率为基准,
// 避免节拍数值尺度污染权重分
// ==========================================

use crate::config::SchedulerConfig;
use crate::engine::consistency::ConsistencyTracker;
use crate::engine::constraint::CandidatePair;

/// 带评分的候选配对
#[derive(Debug, Clone)]
pub struct ScoredPair {
    pub pair: CandidatePair,
    pub score: f64,
}

// ==========================================
// PreferenceRanker - 偏好评分引擎
// ==========================================
pub struct PreferenceRanker {
    config: SchedulerConfig,
}

impl PreferenceRanker {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// 单配对评分
    ///
    /// # 参数
    /// - `max_hourly_output`: 候选集中的最大产出率 (归一化基准)
    pub fn score(
        &self,
        material_code: &str,
        pair: &CandidatePair,
        tracker: &ConsistencyTracker,
        max_hourly_output: f64,
    ) -> f64 {
        let throughput_score = if max_hourly_output > 0.0 {
            pair.hourly_output / max_hourly_output * 10.0
        } else {
            0.0
        };

        let mut score = self.config.w_device * pair.device_weight as f64
            + self.config.w_mold * pair.mold_weight as f64
            + self.config.w_throughput * throughput_score;

        // 同物料一致性
        if tracker.prior_device_for(material_code) == Some(pair.device_code.as_str()) {
            score += self.config.bonus_material_device;
        }
        if tracker.prior_mold_for(material_code) == Some(pair.mold_code.as_str()) {
            score += self.config.bonus_material_mold;
        }

        // 同模具一致性: 该模具上次就在这台设备上
        if tracker.prior_device_for_mold(&pair.mold_code) == Some(pair.device_code.as_str()) {
            score += self.config.bonus_mold_device;
        }

        score
    }

    /// 评分并排序 (最优在前)
    ///
    /// 平局裁决链: 综合分 > 原始权重和 > 产出率 > 设备编码 > 模具编码
    pub fn rank(
        &self,
        material_code: &str,
        pairs: Vec<CandidatePair>,
        tracker: &ConsistencyTracker,
    ) -> Vec<ScoredPair> {
        let max_hourly_output = pairs
            .iter()
            .map(|p| p.hourly_output)
            .fold(0.0_f64, f64::max);

        let mut scored: Vec<ScoredPair> = pairs
            .into_iter()
            .map(|pair| {
                let score = self.score(material_code, &pair, tracker, max_hourly_output);
                ScoredPair { pair, score }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| {
                    let raw_a = a.pair.device_weight + a.pair.mold_weight;
                    let raw_b = b.pair.device_weight + b.pair.mold_weight;
                    raw_b.cmp(&raw_a)
                })
                .then_with(|| b.pair.hourly_output.total_cmp(&a.pair.hourly_output))
                .then_with(|| a.pair.device_code.cmp(&b.pair.device_code))
                .then_with(|| a.pair.mold_code.cmp(&b.pair.mold_code))
        });

        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::repository::ConsistencyRepository;
    use chrono::{NaiveDate, NaiveDateTime};
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn pair(device: &str, mold: &str, device_weight: i32, mold_weight: i32) -> CandidatePair {
        CandidatePair {
            device_code: device.to_string(),
            mold_code: mold.to_string(),
            device_weight,
            mold_weight,
            hourly_output: 100.0,
            mold_quantity: 2,
            window_start: now(),
            window_end: now() + chrono::Duration::hours(1),
        }
    }

    fn empty_tracker() -> ConsistencyTracker {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        ConsistencyTracker::load(Arc::new(ConsistencyRepository::new(Arc::new(Mutex::new(
            conn,
        )))))
        .unwrap()
    }

    #[test]
    fn test_weight_ordering_without_history() {
        let ranker = PreferenceRanker::new(SchedulerConfig::default());
        let tracker = empty_tracker();

        let ranked = ranker.rank(
            "MAT-001",
            vec![
                pair("DEV-001", "MOLD-001", 60, 70),
                pair("DEV-002", "MOLD-001", 95, 70),
            ],
            &tracker,
        );

        assert_eq!(ranked[0].pair.device_code, "DEV-002");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn test_consistency_dominates_marginal_weight() {
        let ranker = PreferenceRanker::new(SchedulerConfig::default());
        let mut tracker = empty_tracker();
        tracker
            .record("MAT-001", "DEV-002", "MOLD-005", now())
            .unwrap();

        // 另一配对权重略高, 但历史配对带满额一致性加分
        let ranked = ranker.rank(
            "MAT-001",
            vec![
                pair("DEV-003", "MOLD-006", 98, 98),
                pair("DEV-002", "MOLD-005", 95, 95),
            ],
            &tracker,
        );

        assert_eq!(ranked[0].pair.device_code, "DEV-002");
        assert_eq!(ranked[0].pair.mold_code, "MOLD-005");
    }

    #[test]
    fn test_mold_device_consistency_bonus() {
        let ranker = PreferenceRanker::new(SchedulerConfig::default());
        let mut tracker = empty_tracker();
        // 历史: MOLD-001 曾在 DEV-001 上 (由另一物料建立)
        tracker
            .record("MAT-009", "DEV-001", "MOLD-001", now())
            .unwrap();

        let ranked = ranker.rank(
            "MAT-001",
            vec![
                pair("DEV-001", "MOLD-001", 60, 70),
                pair("DEV-002", "MOLD-001", 95, 70),
            ],
            &tracker,
        );

        // 同模具一致性加分 80 压过 35 的权重差
        assert_eq!(ranked[0].pair.device_code, "DEV-001");
    }

    #[test]
    fn test_deterministic_tie_break_by_code() {
        let ranker = PreferenceRanker::new(SchedulerConfig::default());
        let tracker = empty_tracker();

        let ranked = ranker.rank(
            "MAT-001",
            vec![
                pair("DEV-002", "MOLD-001", 80, 80),
                pair("DEV-001", "MOLD-001", 80, 80),
            ],
            &tracker,
        );

        assert_eq!(ranked[0].pair.device_code, "DEV-001");
    }

    #[test]
    fn test_throughput_breaks_equal_weights() {
        let ranker = PreferenceRanker::new(SchedulerConfig::default());
        let tracker = empty_tracker();

        let mut slow = pair("DEV-001", "MOLD-001", 80, 80);
        slow.hourly_output = 50.0;
        let fast = pair("DEV-002", "MOLD-002", 80, 80);

        let ranked = ranker.rank("MAT-001", vec![slow, fast], &tracker);
        assert_eq!(ranked[0].pair.device_code, "DEV-002");
    }
}

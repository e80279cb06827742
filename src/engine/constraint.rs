// ==========================================
// MES辅助排程系统 - 硬约束裁决器
// ==========================================
// 职责: 候选设备 × 候选模具的可行性过滤
// 硬约束 (不可违反):
// 1. 资源状态非检修
// 2. 设备窗口独占 / 模具窗口并发 < 副本数
// 3. 单副本模具的排他绑定: 绑定在他设备时丢弃配对
// 权重是软偏好, 不在此处参与裁决
// ==========================================
// 结果为空时输出机器可读原因, 供运行摘要与
// 计划阻塞原因使用
// ==========================================

use crate::domain::types::BlockReason;
use crate::domain::{DeviceMoldBinding, ProductionPlan};
use crate::engine::catalog::{DeviceCandidate, MoldCandidate};
use crate::engine::ledger::ResourceLedger;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use tracing::warn;

// ==========================================
// CandidatePair - 可行配对
// ==========================================
// 携带评分所需的权重/产出率与预留所需的窗口
#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub device_code: String,
    pub mold_code: String,
    pub device_weight: i32,
    pub mold_weight: i32,
    pub hourly_output: f64, // 有效产出率 (件/时, 受设备小时产能封顶)
    pub mold_quantity: i32,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
}

/// 可行性裁决结果
#[derive(Debug, Clone)]
pub struct FeasibilityOutcome {
    pub pairs: Vec<CandidatePair>,
    /// 结果为空时的阻塞原因
    pub block_reason: Option<BlockReason>,
}

// ==========================================
// ConstraintResolver - 硬约束裁决器
// ==========================================
pub struct ConstraintResolver {
    // 无状态引擎
}

impl ConstraintResolver {
    pub fn new() -> Self {
        Self {}
    }

    /// 裁决计划的可行配对集合
    ///
    /// 任务窗口从 now 起算, 工期 = 计划数量 / 有效产出率
    /// (向上取整到分钟); 占用中的设备不参与排队,
    /// 直接判不可行, 紧迫的计划先到先得
    pub fn feasible_pairs(
        &self,
        plan: &ProductionPlan,
        device_candidates: &[DeviceCandidate],
        mold_candidates: &[MoldCandidate],
        ledger: &ResourceLedger,
        bindings: &HashMap<String, DeviceMoldBinding>,
        now: NaiveDateTime,
    ) -> FeasibilityOutcome {
        if device_candidates.is_empty() || mold_candidates.is_empty() {
            return FeasibilityOutcome {
                pairs: Vec::new(),
                block_reason: Some(BlockReason::NoRelation),
            };
        }

        let mut pairs = Vec::new();
        let mut saw_exclusivity = false;
        let mut saw_maintenance = false;

        for mold_candidate in mold_candidates {
            let mold = &mold_candidate.mold;

            // 绑定数据一致性: 绑定设备须仍与物料兼容
            let binding = bindings.get(&mold.mold_code);
            if let Some(b) = binding {
                let bound_device_related = device_candidates
                    .iter()
                    .any(|d| d.device.device_code == b.device_code);
                if !bound_device_related {
                    warn!(
                        plan = %plan.plan_number,
                        mold = %mold.mold_code,
                        device = %b.device_code,
                        "绑定引用的设备与物料无兼容关系, 该模具按不可行处理"
                    );
                }
            }

            for device_candidate in device_candidates {
                let device = &device_candidate.device;

                // 硬约束 1: 资源状态
                if !device.is_available() || !mold.is_available() {
                    saw_maintenance = true;
                    continue;
                }

                // 硬约束 3: 排他绑定 (物理模具不可能同时在两台设备上)
                if let Some(b) = binding {
                    if b.device_code != device.device_code {
                        saw_exclusivity = true;
                        continue;
                    }
                }

                // 有效产出率: 模具节拍受设备小时产能封顶
                let mut hourly_output = mold_candidate.hourly_output();
                if let Some(cap) = device.capacity_per_hour {
                    if cap > 0.0 && cap < hourly_output {
                        hourly_output = cap;
                    }
                }
                if hourly_output <= 0.0 {
                    warn!(
                        plan = %plan.plan_number,
                        mold = %mold.mold_code,
                        "节拍数据无效 (产出率 <= 0), 配对跳过"
                    );
                    continue;
                }

                let window_start = now;
                let window_end = window_start + task_duration(plan.planned_quantity, hourly_output);

                // 硬约束 2: 产能 (设备独占 + 模具副本数)
                if !ledger.is_device_window_free(&device.device_code, window_start, window_end) {
                    continue;
                }
                if ledger.window_load(&mold.mold_code, window_start, window_end)
                    >= mold.quantity as usize
                {
                    continue;
                }

                pairs.push(CandidatePair {
                    device_code: device.device_code.clone(),
                    mold_code: mold.mold_code.clone(),
                    device_weight: device_candidate.weight,
                    mold_weight: mold_candidate.weight,
                    hourly_output,
                    mold_quantity: mold.quantity,
                    window_start,
                    window_end,
                });
            }
        }

        let block_reason = if pairs.is_empty() {
            // 原因优先级按约束硬度: 排他绑定 > 检修 > 产能耗尽
            Some(if saw_exclusivity {
                BlockReason::ExclusivityConflict
            } else if saw_maintenance {
                BlockReason::Maintenance
            } else {
                BlockReason::ExhaustedCapacity
            })
        } else {
            None
        };

        FeasibilityOutcome {
            pairs,
            block_reason,
        }
    }
}

impl Default for ConstraintResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// 任务工期 (向上取整到分钟, 最少 1 分钟)
pub(crate) fn task_duration(planned_quantity: f64, hourly_output: f64) -> Duration {
    let minutes = (planned_quantity / hourly_output * 60.0).ceil().max(1.0);
    Duration::minutes(minutes as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::domain::types::{PlanStatus, ResourceStatus};
    use crate::domain::{Device, Mold};
    use crate::repository::ReservationRepository;
    use chrono::NaiveDate;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn test_plan(quantity: f64) -> ProductionPlan {
        ProductionPlan {
            plan_number: "PL-001".to_string(),
            material_code: "MAT-001".to_string(),
            planned_quantity: quantity,
            due_date: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
            status: PlanStatus::Unscheduled,
            block_reason: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn device_candidate(code: &str, weight: i32, status: ResourceStatus) -> DeviceCandidate {
        DeviceCandidate {
            device: Device {
                device_code: code.to_string(),
                device_name: format!("设备{}", code),
                capacity_per_hour: None,
                status,
                created_at: now(),
                updated_at: now(),
            },
            weight,
        }
    }

    fn mold_candidate(code: &str, weight: i32, quantity: i32) -> MoldCandidate {
        MoldCandidate {
            mold: Mold {
                mold_code: code.to_string(),
                mold_name: format!("模具{}", code),
                status: ResourceStatus::Normal,
                quantity,
                created_at: now(),
                updated_at: now(),
            },
            weight,
            cycle_time_s: 30.0,
            output_per_cycle: 2.0,
        }
    }

    fn empty_ledger() -> ResourceLedger {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        ResourceLedger::load(Arc::new(ReservationRepository::new(Arc::new(Mutex::new(
            conn,
        )))))
        .unwrap()
    }

    fn binding(mold: &str, device: &str) -> DeviceMoldBinding {
        DeviceMoldBinding {
            mold_code: mold.to_string(),
            device_code: device.to_string(),
            origin_task_id: None,
            bound_at: now(),
        }
    }

    #[test]
    fn test_no_relation_when_candidates_empty() {
        let resolver = ConstraintResolver::new();
        let outcome = resolver.feasible_pairs(
            &test_plan(100.0),
            &[],
            &[mold_candidate("MOLD-001", 80, 1)],
            &empty_ledger(),
            &HashMap::new(),
            now(),
        );

        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.block_reason, Some(BlockReason::NoRelation));
    }

    #[test]
    fn test_cross_product_with_window() {
        let resolver = ConstraintResolver::new();
        let outcome = resolver.feasible_pairs(
            &test_plan(240.0),
            &[
                device_candidate("DEV-001", 60, ResourceStatus::Normal),
                device_candidate("DEV-002", 95, ResourceStatus::Normal),
            ],
            &[mold_candidate("MOLD-001", 80, 2)],
            &empty_ledger(),
            &HashMap::new(),
            now(),
        );

        assert_eq!(outcome.pairs.len(), 2);
        // 240 件 / 240 件每时 = 1 小时
        let pair = &outcome.pairs[0];
        assert_eq!(pair.window_end - pair.window_start, Duration::minutes(60));
    }

    #[test]
    fn test_maintenance_device_dropped() {
        let resolver = ConstraintResolver::new();
        let outcome = resolver.feasible_pairs(
            &test_plan(100.0),
            &[device_candidate("DEV-001", 60, ResourceStatus::Maintenance)],
            &[mold_candidate("MOLD-001", 80, 1)],
            &empty_ledger(),
            &HashMap::new(),
            now(),
        );

        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.block_reason, Some(BlockReason::Maintenance));
    }

    #[test]
    fn test_binding_excludes_other_devices() {
        let resolver = ConstraintResolver::new();
        let mut bindings = HashMap::new();
        bindings.insert("MOLD-001".to_string(), binding("MOLD-001", "DEV-002"));

        let outcome = resolver.feasible_pairs(
            &test_plan(100.0),
            &[
                device_candidate("DEV-001", 95, ResourceStatus::Normal),
                device_candidate("DEV-002", 60, ResourceStatus::Normal),
            ],
            &[mold_candidate("MOLD-001", 80, 1)],
            &empty_ledger(),
            &HashMap::new(),
            now(),
        );
        // 无绑定时两个配对均可行
        assert_eq!(outcome.pairs.len(), 2);

        let outcome = resolver.feasible_pairs(
            &test_plan(100.0),
            &[
                device_candidate("DEV-001", 95, ResourceStatus::Normal),
                device_candidate("DEV-002", 60, ResourceStatus::Normal),
            ],
            &[mold_candidate("MOLD-001", 80, 1)],
            &empty_ledger(),
            &bindings,
            now(),
        );
        // 绑定生效: 仅绑定设备可配对, 权重更高的 DEV-001 被硬规则排除
        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.pairs[0].device_code, "DEV-002");
    }

    #[test]
    fn test_binding_conflict_reason_when_bound_device_unavailable() {
        let resolver = ConstraintResolver::new();
        let mut bindings = HashMap::new();
        bindings.insert("MOLD-001".to_string(), binding("MOLD-001", "DEV-999"));

        // 绑定设备不在候选集中 (关系已被删除): 所有配对被排他规则排除
        let outcome = resolver.feasible_pairs(
            &test_plan(100.0),
            &[device_candidate("DEV-001", 95, ResourceStatus::Normal)],
            &[mold_candidate("MOLD-001", 80, 1)],
            &empty_ledger(),
            &bindings,
            now(),
        );

        assert!(outcome.pairs.is_empty());
        assert_eq!(
            outcome.block_reason,
            Some(BlockReason::ExclusivityConflict)
        );
    }

    #[test]
    fn test_device_capacity_caps_throughput() {
        let resolver = ConstraintResolver::new();
        let mut candidate = device_candidate("DEV-001", 60, ResourceStatus::Normal);
        candidate.device.capacity_per_hour = Some(120.0);

        let outcome = resolver.feasible_pairs(
            &test_plan(120.0),
            &[candidate],
            &[mold_candidate("MOLD-001", 80, 1)], // 模具产出率 240 件/时
            &empty_ledger(),
            &HashMap::new(),
            now(),
        );

        assert_eq!(outcome.pairs.len(), 1);
        assert!((outcome.pairs[0].hourly_output - 120.0).abs() < f64::EPSILON);
        // 120 件 / 120 件每时 = 1 小时
        let pair = &outcome.pairs[0];
        assert_eq!(pair.window_end - pair.window_start, Duration::minutes(60));
    }
}

// ==========================================
// MES辅助排程系统 - 排程分配器
// ==========================================
// 核心循环 (每次触发一遍):
// 1. 读取 UNSCHEDULED/BLOCKED 积压, 交期升序
// 2. 逐计划: 目录候选 -> 硬约束裁决 -> 偏好评分
//    -> 最优配对 -> 台账预留 -> 任务物化
// 3. 预留竞争失败重新裁决重试一次, 再失败则阻塞
// 阻塞是正常结果, 随运行摘要返回并在下次运行重试;
// 单计划失败不中止运行, 只有存储故障才中止
// ==========================================

use crate::config::ConfigManager;
use crate::domain::types::{BlockReason, PlanStatus};
use crate::domain::{DeviceMoldBinding, ProductionPlan, ScheduleRunLog};
use crate::engine::catalog::RelationCatalog;
use crate::engine::consistency::ConsistencyTracker;
use crate::engine::constraint::ConstraintResolver;
use crate::engine::emitter::TaskEmitter;
use crate::engine::ledger::ResourceLedger;
use crate::engine::ranker::PreferenceRanker;
use crate::repository::{
    BindingRepository, ConsistencyRepository, DeviceRepository, MaterialDeviceRelationRepository,
    MaterialMoldRelationRepository, MoldRepository, PlanRepository, RepositoryError,
    RepositoryResult, ReservationConflict, ReserveOutcome, ScheduleRunLogRepository,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 运行参数与摘要
// ==========================================

/// 单次运行参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunOptions {
    /// 单次处理计划数上限 (缺省取配置值; 0 不限)
    pub max_plans: Option<usize>,
    /// 触发者标识
    pub triggered_by: Option<String>,
    /// 排程基准时刻 (缺省为当前时间; 测试注入用)
    pub now: Option<NaiveDateTime>,
}

/// 成功排程的计划
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledOutcome {
    pub plan_number: String,
    pub task_id: String,
    pub device_code: String,
    pub mold_code: String,
    pub scheduled_start: NaiveDateTime,
    pub scheduled_end: NaiveDateTime,
    pub score: f64,
}

/// 被阻塞的计划
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedOutcome {
    pub plan_number: String,
    pub reason: BlockReason,
}

/// 运行摘要
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub examined: usize,
    pub scheduled: Vec<ScheduledOutcome>,
    pub blocked: Vec<BlockedOutcome>,
}

// ==========================================
// Allocator - 排程分配器
// ==========================================
pub struct Allocator {
    plan_repo: Arc<PlanRepository>,
    device_repo: Arc<DeviceRepository>,
    mold_repo: Arc<MoldRepository>,
    device_relation_repo: Arc<MaterialDeviceRelationRepository>,
    mold_relation_repo: Arc<MaterialMoldRelationRepository>,
    binding_repo: Arc<BindingRepository>,
    consistency_repo: Arc<ConsistencyRepository>,
    schedule_log_repo: Arc<ScheduleRunLogRepository>,
    config_manager: Arc<ConfigManager>,
    ledger: Arc<Mutex<ResourceLedger>>,
    resolver: ConstraintResolver,
    emitter: TaskEmitter,
}

impl Allocator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plan_repo: Arc<PlanRepository>,
        device_repo: Arc<DeviceRepository>,
        mold_repo: Arc<MoldRepository>,
        device_relation_repo: Arc<MaterialDeviceRelationRepository>,
        mold_relation_repo: Arc<MaterialMoldRelationRepository>,
        binding_repo: Arc<BindingRepository>,
        consistency_repo: Arc<ConsistencyRepository>,
        schedule_log_repo: Arc<ScheduleRunLogRepository>,
        config_manager: Arc<ConfigManager>,
        ledger: Arc<Mutex<ResourceLedger>>,
        emitter: TaskEmitter,
    ) -> Self {
        Self {
            plan_repo,
            device_repo,
            mold_repo,
            device_relation_repo,
            mold_relation_repo,
            binding_repo,
            consistency_repo,
            schedule_log_repo,
            config_manager,
            ledger,
            resolver: ConstraintResolver::new(),
            emitter,
        }
    }

    /// 执行一次排程运行
    ///
    /// 运行内逐计划串行处理, 结果确定;
    /// 已提交的预留不回滚 (中途失败保留部分进度)
    #[instrument(skip(self, options), fields(triggered_by = options.triggered_by.as_deref().unwrap_or("-")))]
    pub fn run(&self, options: RunOptions) -> RepositoryResult<RunSummary> {
        let started_at = options
            .now
            .unwrap_or_else(|| Local::now().naive_local());
        let run_id = Uuid::new_v4().to_string();

        let config = self.config_manager.load_scheduler_config()?;
        let max_plans = options.max_plans.unwrap_or(config.max_plans_per_run);

        // 每次运行构建一次的只读索引与可变运行状态
        let catalog = RelationCatalog::load(
            &self.device_relation_repo,
            &self.mold_relation_repo,
            &self.device_repo,
            &self.mold_repo,
        )?;
        let mut tracker = ConsistencyTracker::load(self.consistency_repo.clone())?;
        let mut bindings: HashMap<String, DeviceMoldBinding> = self
            .binding_repo
            .list_all()?
            .into_iter()
            .map(|b| (b.mold_code.clone(), b))
            .collect();

        let mut ledger = self
            .ledger
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        ledger.refresh()?;

        let ranker = PreferenceRanker::new(config.clone());
        let plans = self.plan_repo.list_schedulable(max_plans)?;

        info!(
            run_id = %run_id,
            backlog = plans.len(),
            "排程运行开始"
        );

        let mut scheduled = Vec::new();
        let mut blocked = Vec::new();
        let examined = plans.len();

        for plan in &plans {
            match self.schedule_one(
                plan,
                &catalog,
                &ranker,
                &mut ledger,
                &mut tracker,
                &mut bindings,
                config.reserve_retry_limit,
                started_at,
            )? {
                PlanOutcome::Scheduled(outcome) => scheduled.push(outcome),
                PlanOutcome::Blocked(reason) => {
                    self.plan_repo.update_status(
                        &plan.plan_number,
                        PlanStatus::Blocked,
                        Some(reason),
                        started_at,
                    )?;
                    debug!(
                        plan = %plan.plan_number,
                        reason = %reason,
                        "计划阻塞"
                    );
                    blocked.push(BlockedOutcome {
                        plan_number: plan.plan_number.clone(),
                        reason,
                    });
                }
                PlanOutcome::Skipped => {}
            }
        }

        let finished_at = Local::now().naive_local().max(started_at);
        let summary = RunSummary {
            run_id: run_id.clone(),
            started_at,
            finished_at,
            examined,
            scheduled,
            blocked,
        };

        self.write_run_log(&summary, options.triggered_by.clone())?;

        info!(
            run_id = %run_id,
            scheduled = summary.scheduled.len(),
            blocked = summary.blocked.len(),
            "排程运行结束"
        );

        Ok(summary)
    }

    /// 处理单个计划
    #[allow(clippy::too_many_arguments)]
    fn schedule_one(
        &self,
        plan: &ProductionPlan,
        catalog: &RelationCatalog,
        ranker: &PreferenceRanker,
        ledger: &mut ResourceLedger,
        tracker: &mut ConsistencyTracker,
        bindings: &mut HashMap<String, DeviceMoldBinding>,
        retry_limit: u32,
        now: NaiveDateTime,
    ) -> RepositoryResult<PlanOutcome> {
        let device_candidates = catalog.candidate_devices(&plan.material_code);
        let mold_candidates = catalog.candidate_molds(&plan.material_code);

        // 预留竞争失败时重新裁决一次 (attempt = 0..=retry_limit)
        let mut last_conflict: Option<ReservationConflict> = None;
        for attempt in 0..=retry_limit {
            if attempt > 0 {
                ledger.refresh()?;
            }

            let outcome = self.resolver.feasible_pairs(
                plan,
                device_candidates,
                mold_candidates,
                ledger,
                bindings,
                now,
            );

            let ranked = match outcome.block_reason {
                Some(reason) => return Ok(PlanOutcome::Blocked(reason)),
                None => ranker.rank(&plan.material_code, outcome.pairs, tracker),
            };

            let best = match ranked.into_iter().next() {
                Some(best) => best,
                None => return Ok(PlanOutcome::Blocked(BlockReason::ExhaustedCapacity)),
            };

            match ledger.reserve(
                &best.pair.device_code,
                &best.pair.mold_code,
                best.pair.window_start,
                best.pair.window_end,
                now,
            )? {
                ReserveOutcome::Reserved(reservation_id) => {
                    let task = match self.emitter.emit(plan, &best.pair, &reservation_id, tracker, now)
                    {
                        Ok(task) => task,
                        Err(RepositoryError::UniqueConstraintViolation(msg)) => {
                            // 并发运行已为该计划建任务: 让出并释放本次预留
                            warn!(
                                plan = %plan.plan_number,
                                detail = %msg,
                                "计划已被并发运行排程, 本次预留回收"
                            );
                            ledger.release(
                                &reservation_id,
                                &best.pair.device_code,
                                &best.pair.mold_code,
                            )?;
                            return Ok(PlanOutcome::Skipped);
                        }
                        Err(e) => return Err(e),
                    };

                    // 同一运行内的后续计划须看到新绑定
                    if best.pair.mold_quantity == 1 {
                        bindings.insert(
                            best.pair.mold_code.clone(),
                            DeviceMoldBinding {
                                mold_code: best.pair.mold_code.clone(),
                                device_code: best.pair.device_code.clone(),
                                origin_task_id: Some(task.task_id.clone()),
                                bound_at: now,
                            },
                        );
                    }

                    return Ok(PlanOutcome::Scheduled(ScheduledOutcome {
                        plan_number: plan.plan_number.clone(),
                        task_id: task.task_id,
                        device_code: best.pair.device_code.clone(),
                        mold_code: best.pair.mold_code.clone(),
                        scheduled_start: best.pair.window_start,
                        scheduled_end: best.pair.window_end,
                        score: best.score,
                    }));
                }
                ReserveOutcome::Conflict(conflict) => {
                    debug!(
                        plan = %plan.plan_number,
                        attempt = attempt,
                        conflict = ?conflict,
                        "预留冲突"
                    );
                    last_conflict = Some(conflict);
                }
            }
        }

        // 重试耗尽: 冲突类别折算为阻塞原因
        let reason = match last_conflict {
            Some(ReservationConflict::ResourceMaintenance) => BlockReason::Maintenance,
            _ => BlockReason::ExhaustedCapacity,
        };
        Ok(PlanOutcome::Blocked(reason))
    }

    /// 落运行记录 (含结果明细与配置快照)
    fn write_run_log(
        &self,
        summary: &RunSummary,
        triggered_by: Option<String>,
    ) -> RepositoryResult<()> {
        let outcome_json = serde_json::json!({
            "scheduled": summary.scheduled,
            "blocked": summary.blocked,
        });

        self.schedule_log_repo.create(&ScheduleRunLog {
            run_id: summary.run_id.clone(),
            triggered_by,
            started_at: summary.started_at,
            finished_at: Some(summary.finished_at),
            scheduled_count: summary.scheduled.len() as i32,
            blocked_count: summary.blocked.len() as i32,
            outcome_json: Some(outcome_json.to_string()),
            config_snapshot_json: Some(self.config_manager.snapshot_json()?),
        })?;

        Ok(())
    }
}

/// 单计划处理结果
enum PlanOutcome {
    Scheduled(ScheduledOutcome),
    Blocked(BlockReason),
    /// 并发运行已处理该计划, 本次不计入摘要
    Skipped,
}

// ==========================================
// MES辅助排程系统 - 排程运行记录领域模型
// ==========================================
// 每次 Allocator 运行落一条记录, 含结果明细与
// 当次生效的评分配置快照 (可解释性)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRunLog {
    pub run_id: String,                       // 运行ID (uuid)
    pub triggered_by: Option<String>,         // 触发者 (用户/定时任务)
    pub started_at: NaiveDateTime,            // 开始时间
    pub finished_at: Option<NaiveDateTime>,   // 结束时间
    pub scheduled_count: i32,                 // 成功排程计划数
    pub blocked_count: i32,                   // 阻塞计划数
    pub outcome_json: Option<String>,         // 结果明细 (JSON)
    pub config_snapshot_json: Option<String>, // 评分配置快照 (JSON)
}

// ==========================================
// MES辅助排程系统 - 引擎层
// ==========================================
// 职责: 实现排程业务规则, SQL 收敛在仓储层
// 红线: 所有不可行结果必须输出 reason
// ==========================================

pub mod allocator;
pub mod catalog;
pub mod consistency;
pub mod constraint;
pub mod emitter;
pub mod ledger;
pub mod ranker;

// 重导出核心引擎
pub use allocator::{Allocator, BlockedOutcome, RunOptions, RunSummary, ScheduledOutcome};
pub use catalog::{DeviceCandidate, MoldCandidate, RelationCatalog};
pub use consistency::ConsistencyTracker;
pub use constraint::{CandidatePair, ConstraintResolver, FeasibilityOutcome};
pub use emitter::TaskEmitter;
pub use ledger::ResourceLedger;
pub use ranker::{PreferenceRanker, ScoredPair};

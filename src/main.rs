// ==========================================
// MES辅助排程系统 - 服务入口
// ==========================================
// 用法:
//   aux-scheduler [db_path] [max_plans]
//
// 初始化数据库后执行一次排程运行, 摘要以 JSON
// 输出; REST 边界由外部协作方挂载 AppState 各 API
// ==========================================

use aux_scheduler::app::{get_default_db_path, AppState};
use aux_scheduler::engine::RunOptions;
use aux_scheduler::logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", aux_scheduler::APP_NAME);
    tracing::info!("系统版本: {}", aux_scheduler::VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let max_plans = args.next().and_then(|s| s.parse::<usize>().ok());

    tracing::info!("使用数据库: {}", db_path);

    let app_state = AppState::new(&db_path)?;

    let summary = app_state.scheduling_api.run(RunOptions {
        max_plans,
        triggered_by: Some("aux-scheduler bin".to_string()),
        now: None,
    })?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

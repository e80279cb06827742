// ==========================================
// MES辅助排程系统 - 应用层
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};

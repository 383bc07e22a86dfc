// ==========================================
// 学业进程管理系统 - 应用层
// ==========================================
// 职责: 组装引擎，供外层（CLI / HTTP 适配）调用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};

// ==========================================
// 学业进程管理系统 - 主入口
// ==========================================
// 职责: 初始化日志与数据库，输出当前学年状态
// ==========================================

use academic_progression::app::{get_default_db_path, AppState};
use academic_progression::{logging, CourseYearStatus};
use anyhow::{anyhow, Result};

fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", academic_progression::APP_NAME);
    tracing::info!("系统版本: {}", academic_progression::VERSION);
    tracing::info!("==================================================");

    // 命令行第一个参数可覆盖数据库路径
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match state.course_years.get_current()? {
        Some(current) => {
            let status = current.status();
            tracing::info!(
                "当前学年: {} ({} - {}), 状态={}",
                current.name,
                current.start_date.format("%Y-%m-%d"),
                current.end_date.format("%Y-%m-%d"),
                status
            );
            if status == CourseYearStatus::Active {
                let pending = state.evaluations.non_compliant_students(current.id)?;
                tracing::info!("尚缺评分的在籍学生: {}", pending.len());
            }
        }
        None => tracing::info!("尚未创建任何学年"),
    }

    Ok(())
}

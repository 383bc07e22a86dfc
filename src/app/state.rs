// ==========================================
// 学业进程管理系统 - 应用状态
// ==========================================
// 职责: 组装共享数据库、配置、时钟、审计与各引擎
// ==========================================

use std::sync::Arc;

use crate::config::config_manager::ConfigManager;
use crate::db::Database;
use crate::engine::{
    AuditRecorder, Clock, ClassroomStaffingValidator, CourseYearLifecycle,
    EnrollmentEligibilityEngine, EvaluationConsistencyEngine, MonthWindow, ReenrollmentWindow,
    RosterService, SqliteAuditSink, SystemClock, TrackCompletionTracker,
};

/// 应用状态
///
/// 所有引擎共享同一个 `Database`（同一条连接）。
/// 多进程/多实例部署时由 SQLite 的 IMMEDIATE 事务 + busy_timeout 串行化写入。
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub db: Database,

    /// 配置管理器（读取 config_kv）
    pub config_manager: Arc<ConfigManager>,

    /// 学年生命周期
    pub course_years: Arc<CourseYearLifecycle>,

    /// 注册资格引擎
    pub enrollments: Arc<EnrollmentEligibilityEngine>,

    /// 评分一致性引擎
    pub evaluations: Arc<EvaluationConsistencyEngine>,

    /// 师资完整性校验
    pub staffing: Arc<ClassroomStaffingValidator>,

    /// 方向完成判定
    pub track_completion: Arc<TrackCompletionTracker>,

    /// 人员/教室/排课
    pub roster: Arc<RosterService>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时创建并建表）
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_clock(db_path, Arc::new(SystemClock))
    }

    /// 指定时钟创建（测试与回放使用）
    pub fn with_clock(db_path: String, clock: Arc<dyn Clock>) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let db = Database::open(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(db.shared_connection())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let window: Arc<dyn ReenrollmentWindow> = Arc::new(
            MonthWindow::from_config(&config_manager)
                .map_err(|e| format!("无法读取注册开放月份: {}", e))?,
        );

        let audit_sink = SqliteAuditSink::from_config(db.clone(), clock.clone(), &config_manager)
            .map_err(|e| format!("无法创建审计sink: {}", e))?;
        let audit = AuditRecorder::with_sink(audit_sink);

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let course_years = Arc::new(CourseYearLifecycle::new(
            db.clone(),
            clock.clone(),
            audit.clone(),
        ));
        let enrollments = Arc::new(EnrollmentEligibilityEngine::new(
            db.clone(),
            clock.clone(),
            audit.clone(),
            window,
        ));
        let evaluations = Arc::new(EvaluationConsistencyEngine::new(
            db.clone(),
            clock.clone(),
            audit.clone(),
        ));
        let staffing = Arc::new(ClassroomStaffingValidator::new(db.clone()));
        let track_completion = Arc::new(TrackCompletionTracker::new(db.clone()));
        let roster = Arc::new(RosterService::new(db.clone(), clock, audit));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            db,
            config_manager,
            course_years,
            enrollments,
            evaluations,
            staffing,
            track_completion,
            roster,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 ACADEMIC_PROGRESSION_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("ACADEMIC_PROGRESSION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./academic_progression.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("academic-progression-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("academic-progression");

        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("academic_progression.db");
        }
    }

    path.to_string_lossy().to_string()
}

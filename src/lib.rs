// ==========================================
// 学业进程管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 学年/注册/评分一致性引擎（外层 HTTP/UI 不在本库）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 引擎组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CourseYearStatus, Subject, Track};

// 领域实体
pub use domain::{
    AuditEntry, Classroom, ClassroomTeacherAssignment, CourseYear, Enrollment, Evaluation,
    OperationType, Student, Teacher,
};

// 引擎
pub use engine::{
    ClassroomStaffingValidator, CourseYearLifecycle, EngineError, EngineResult,
    EnrollmentEligibilityEngine, EvaluationConsistencyEngine, RosterService,
    TrackCompletionTracker,
};

pub use db::Database;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "学业进程管理系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

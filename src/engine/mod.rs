// ==========================================
// 学业进程管理系统 - 引擎层
// ==========================================
// 职责: 实现业务规则，不拼 SQL
// 红线:
// - Engine 不拼 SQL，存储访问全部经由 repository
// - 所有拒绝必须给出稳定的 reason code
// - 每个写操作是一个 IMMEDIATE 事务，审计在提交后落地
// ==========================================

pub mod audit;
pub mod clock;
pub mod course_year;
pub mod enrollment;
pub mod error;
pub mod evaluation;
pub mod roster;
pub mod staffing;
pub mod track_completion;
pub mod window;

use crate::domain::audit_log::OperationType;

// 重导出核心引擎
pub use audit::{AuditRecorder, AuditSink, NoOpAuditSink, SqliteAuditSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use course_year::{check_course_year_dates, CourseYearLifecycle};
pub use enrollment::EnrollmentEligibilityEngine;
pub use error::{
    ConflictReason, EngineError, EngineResult, FieldError, IncompleteStudent, NotFoundError,
};
pub use evaluation::EvaluationConsistencyEngine;
pub use roster::{ClassroomOccupancy, RosterService};
pub use staffing::ClassroomStaffingValidator;
pub use track_completion::TrackCompletionTracker;
pub use window::{AlwaysOpen, MonthWindow, ReenrollmentWindow};

/// 记录被拒绝的操作
///
/// Internal 已在错误转换处以 error 级别记录，这里不重复。
pub(crate) fn log_rejection(operation: OperationType, err: &EngineError) {
    match err {
        EngineError::Conflict(reason) => {
            tracing::warn!(
                operation = %operation,
                code = reason.code(),
                "操作被拒绝: {}",
                reason
            );
        }
        EngineError::Validation(_) | EngineError::NotFound(_) => {
            tracing::debug!(
                operation = %operation,
                code = err.code(),
                "操作被拒绝: {}",
                err
            );
        }
        EngineError::Internal { .. } => {}
    }
}

// ==========================================
// 学业进程管理系统 - 引擎层错误类型
// ==========================================
// 职责: 将业务规则违反收敛为四类结果
// - Validation: 输入格式错误（不开启事务）
// - Conflict:   具名业务规则违反（稳定编码，无部分写入）
// - NotFound:   引用对象不存在
// - Internal:   存储/事务失败（已回滚，不向调用方泄露细节）
// ==========================================

use crate::domain::types::{Subject, Track};
use crate::repository::error::RepositoryError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

// ==========================================
// 辅助结构
// ==========================================

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// 结业门槛中未完成评分的学生
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteStudent {
    pub student_id: i64,
    pub full_name: String,
    pub track: Track,
    pub missing_subjects: Vec<Subject>,
}

// ==========================================
// 冲突原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictReason {
    // ===== 学年 =====
    #[error("已存在进行中的学年")]
    ActiveCourseYearExists,

    #[error("学年日期与已有学年重叠")]
    CourseYearOverlap,

    #[error("结束时间必须晚于开始时间")]
    InvalidDateRange,

    #[error("学年时长不足 1 天")]
    CourseYearTooShort,

    #[error("学年日期不能早于当前时间")]
    CourseYearInPast,

    #[error("学年跨度超过 2 年")]
    CourseYearTooLong,

    #[error("学年已结业")]
    CourseYearAlreadyClosed,

    #[error("当前没有进行中的学年")]
    NoActiveCourseYear,

    #[error("{} 名学生尚未完成全部必修学科评分", .0.len())]
    IncompleteEvaluations(Vec<IncompleteStudent>),

    // ===== 注册 =====
    #[error("学生在当前学年已注册该方向")]
    DuplicateEnrollment,

    #[error("方向与教室方向不一致")]
    TrackMismatch,

    #[error("教室已满（最多 5 名在籍学生）")]
    ClassroomFull,

    #[error("教室师资不完整")]
    IncompleteStaffing(Vec<Subject>),

    #[error("学生已退学")]
    StudentInactive,

    #[error("学生已达到 3 次注册上限")]
    EnrollmentLimitReached,

    #[error("上一年度存在未评分的必修学科")]
    PriorYearUnresolved(Vec<Subject>),

    #[error("学生已完成方向 {0}，只能注册另一方向")]
    TrackAlreadyCompleted(Track),

    #[error("当前不在调整注册的开放时段")]
    ReenrollmentWindowClosed,

    #[error("只能调整当前学年的注册")]
    StaleEnrollment,

    // ===== 评分 =====
    #[error("学生在当前学年没有注册")]
    StudentNotEnrolled,

    #[error("教师学科不属于该方向必修")]
    SubjectNotInTrack,

    #[error("教师未被分配到该学生的教室")]
    TeacherNotAssigned,

    #[error("该学科在当前学年已有评分")]
    DuplicateEvaluation,

    #[error("只能修改当前学年的评分")]
    StaleEvaluation,

    #[error("往年评分不可删除")]
    HistoricalEvaluation,

    #[error("评分已随学年结业锁定")]
    EvaluationLocked,

    // ===== 人员/教室/排课 =====
    #[error("身份证号已被使用")]
    DuplicateNationalId,

    #[error("教室编号已存在")]
    DuplicateClassroomNumber,

    #[error("教室仍有在籍学生或在职教师，方向不可修改")]
    ClassroomTrackLocked,

    #[error("该学科在本学年已由其他教师承担")]
    SubjectAlreadyStaffed,

    #[error("教师已被分配到该教室")]
    DuplicateAssignment,

    #[error("教师仍有排课，不能离职")]
    TeacherHasAssignments,

    #[error("教师已有排课或评分记录，学科不可修改")]
    TeacherSubjectLocked,

    #[error("记录已处于在籍/在职状态")]
    AlreadyActive,
}

impl ConflictReason {
    /// 稳定编码（供调用方分支判断）
    pub fn code(&self) -> &'static str {
        match self {
            ConflictReason::ActiveCourseYearExists => "ACTIVE_COURSE_YEAR_EXISTS",
            ConflictReason::CourseYearOverlap => "COURSE_YEAR_OVERLAP",
            ConflictReason::InvalidDateRange => "INVALID_DATE_RANGE",
            ConflictReason::CourseYearTooShort => "COURSE_YEAR_TOO_SHORT",
            ConflictReason::CourseYearInPast => "COURSE_YEAR_IN_PAST",
            ConflictReason::CourseYearTooLong => "COURSE_YEAR_TOO_LONG",
            ConflictReason::CourseYearAlreadyClosed => "COURSE_YEAR_ALREADY_CLOSED",
            ConflictReason::NoActiveCourseYear => "NO_ACTIVE_COURSE_YEAR",
            ConflictReason::IncompleteEvaluations(_) => "INCOMPLETE_EVALUATIONS",
            ConflictReason::DuplicateEnrollment => "DUPLICATE_ENROLLMENT",
            ConflictReason::TrackMismatch => "TRACK_MISMATCH",
            ConflictReason::ClassroomFull => "CLASSROOM_FULL",
            ConflictReason::IncompleteStaffing(_) => "INCOMPLETE_STAFFING",
            ConflictReason::StudentInactive => "STUDENT_INACTIVE",
            ConflictReason::EnrollmentLimitReached => "ENROLLMENT_LIMIT_REACHED",
            ConflictReason::PriorYearUnresolved(_) => "PRIOR_YEAR_UNRESOLVED",
            ConflictReason::TrackAlreadyCompleted(_) => "TRACK_ALREADY_COMPLETED",
            ConflictReason::ReenrollmentWindowClosed => "REENROLLMENT_WINDOW_CLOSED",
            ConflictReason::StaleEnrollment => "STALE_ENROLLMENT",
            ConflictReason::StudentNotEnrolled => "STUDENT_NOT_ENROLLED",
            ConflictReason::SubjectNotInTrack => "SUBJECT_NOT_IN_TRACK",
            ConflictReason::TeacherNotAssigned => "TEACHER_NOT_ASSIGNED",
            ConflictReason::DuplicateEvaluation => "DUPLICATE_EVALUATION",
            ConflictReason::StaleEvaluation => "STALE_EVALUATION",
            ConflictReason::HistoricalEvaluation => "HISTORICAL_EVALUATION",
            ConflictReason::EvaluationLocked => "EVALUATION_LOCKED",
            ConflictReason::DuplicateNationalId => "DUPLICATE_NATIONAL_ID",
            ConflictReason::DuplicateClassroomNumber => "DUPLICATE_CLASSROOM_NUMBER",
            ConflictReason::ClassroomTrackLocked => "CLASSROOM_TRACK_LOCKED",
            ConflictReason::SubjectAlreadyStaffed => "SUBJECT_ALREADY_STAFFED",
            ConflictReason::DuplicateAssignment => "DUPLICATE_ASSIGNMENT",
            ConflictReason::TeacherHasAssignments => "TEACHER_HAS_ASSIGNMENTS",
            ConflictReason::TeacherSubjectLocked => "TEACHER_SUBJECT_LOCKED",
            ConflictReason::AlreadyActive => "ALREADY_ACTIVE",
        }
    }

    /// 附带的诊断数据
    fn details(&self) -> Value {
        match self {
            ConflictReason::IncompleteEvaluations(students) => json!({ "students": students }),
            ConflictReason::IncompleteStaffing(missing) => json!({ "missing_subjects": missing }),
            ConflictReason::PriorYearUnresolved(missing) => json!({ "missing_subjects": missing }),
            ConflictReason::TrackAlreadyCompleted(track) => json!({ "completed_track": track }),
            _ => Value::Null,
        }
    }
}

// ==========================================
// 未找到
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("学生不存在: id={0}")]
    Student(i64),

    #[error("教师不存在或已离职: id={0}")]
    Teacher(i64),

    #[error("教室不存在: id={0}")]
    Classroom(i64),

    #[error("学年不存在: id={0}")]
    CourseYear(i64),

    #[error("尚未创建任何学年")]
    NoCourseYear,

    #[error("注册记录不存在: id={0}")]
    Enrollment(i64),

    #[error("评分记录不存在: id={0}")]
    Evaluation(i64),

    #[error("排课不存在: classroom_id={classroom_id}, teacher_id={teacher_id}")]
    Assignment { classroom_id: i64, teacher_id: i64 },

    #[error("记录不存在: {entity}(id={id})")]
    Record { entity: String, id: String },
}

impl NotFoundError {
    pub fn code(&self) -> &'static str {
        match self {
            NotFoundError::Student(_) => "STUDENT_NOT_FOUND",
            NotFoundError::Teacher(_) => "TEACHER_NOT_FOUND",
            NotFoundError::Classroom(_) => "CLASSROOM_NOT_FOUND",
            NotFoundError::CourseYear(_) => "COURSE_YEAR_NOT_FOUND",
            NotFoundError::NoCourseYear => "NO_COURSE_YEAR",
            NotFoundError::Enrollment(_) => "ENROLLMENT_NOT_FOUND",
            NotFoundError::Evaluation(_) => "EVALUATION_NOT_FOUND",
            NotFoundError::Assignment { .. } => "ASSIGNMENT_NOT_FOUND",
            NotFoundError::Record { .. } => "RECORD_NOT_FOUND",
        }
    }
}

// ==========================================
// EngineError - 引擎操作结果的失败分支
// ==========================================
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("输入校验失败: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("业务冲突 [{}]: {0}", .0.code())]
    Conflict(ConflictReason),

    #[error("{0}")]
    NotFound(NotFoundError),

    /// detail 只进日志，不进 Display
    #[error("内部错误，操作已回滚")]
    Internal { detail: String },
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        EngineError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "INVALID_INPUT",
            EngineError::Conflict(reason) => reason.code(),
            EngineError::NotFound(nf) => nf.code(),
            EngineError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn conflict_reason(&self) -> Option<&ConflictReason> {
        match self {
            EngineError::Conflict(reason) => Some(reason),
            _ => None,
        }
    }

    /// 调用方（HTTP 层）使用的 JSON 负载
    pub fn to_payload(&self) -> Value {
        let details = match self {
            EngineError::Validation(errors) => json!({ "fields": errors }),
            EngineError::Conflict(reason) => reason.details(),
            EngineError::NotFound(_) | EngineError::Internal { .. } => Value::Null,
        };
        json!({
            "kind": self.kind(),
            "code": self.code(),
            "message": self.to_string(),
            "details": details,
        })
    }
}

impl From<ConflictReason> for EngineError {
    fn from(reason: ConflictReason) -> Self {
        EngineError::Conflict(reason)
    }
}

impl From<NotFoundError> for EngineError {
    fn from(err: NotFoundError) -> Self {
        EngineError::NotFound(err)
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
// 提交期约束违反是最终裁决：唯一索引/触发器 -> 对应 Conflict
impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueConstraintViolation(msg) => match unique_violation_reason(&msg) {
                Some(reason) => EngineError::Conflict(reason),
                None => internal(format!("唯一约束违反: {}", msg)),
            },
            RepositoryError::RuleConstraintViolation(msg) => match msg.as_str() {
                "CLASSROOM_FULL" => EngineError::Conflict(ConflictReason::ClassroomFull),
                "ENROLLMENT_LIMIT" => EngineError::Conflict(ConflictReason::EnrollmentLimitReached),
                "DUPLICATE_NATIONAL_ID" => EngineError::Conflict(ConflictReason::DuplicateNationalId),
                _ => internal(format!("约束违反: {}", msg)),
            },
            RepositoryError::NotFound { entity, id } => {
                EngineError::NotFound(NotFoundError::Record { entity, id })
            }
            other => internal(other.to_string()),
        }
    }
}

fn unique_violation_reason(msg: &str) -> Option<ConflictReason> {
    if msg.contains("enrollment.") {
        Some(ConflictReason::DuplicateEnrollment)
    } else if msg.contains("evaluation.") {
        Some(ConflictReason::DuplicateEvaluation)
    } else if msg.contains("classroom_teacher.") {
        Some(ConflictReason::SubjectAlreadyStaffed)
    } else if msg.contains("course_year.") {
        Some(ConflictReason::ActiveCourseYearExists)
    } else if msg.contains("classroom.number") {
        Some(ConflictReason::DuplicateClassroomNumber)
    } else if msg.contains("national_id") {
        Some(ConflictReason::DuplicateNationalId)
    } else {
        None
    }
}

fn internal(detail: String) -> EngineError {
    tracing::error!("存储层失败，事务已回滚: {}", detail);
    EngineError::Internal { detail }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

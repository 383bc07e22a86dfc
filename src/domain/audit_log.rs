// ==========================================
// 学业进程管理系统 - 审计日志领域模型
// ==========================================
// 对齐: migrations/v0.1_init.sql audit_log 表
// 红线: 审计失败不得回滚业务事务
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// AuditEntry - 审计记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: String,         // UUID
    pub operation: String,        // OperationType::as_str()
    pub message: String,          // 人类可读描述
    pub actor: String,            // 操作人
    pub recorded_at: NaiveDateTime,
}

// ==========================================
// OperationType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    OpenCourseYear,
    CloseCourseYear,
    Enroll,
    UpdateEnrollment,
    CreateEvaluation,
    UpdateEvaluation,
    DeleteEvaluation,
    AdmitStudent,
    WithdrawStudent,
    RestoreStudent,
    HireTeacher,
    ChangeTeacherSubject,
    WithdrawTeacher,
    RestoreTeacher,
    CreateClassroom,
    ChangeClassroomTrack,
    AssignTeacher,
    RemoveTeacherAssignment,
}

impl OperationType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::OpenCourseYear => "OpenCourseYear",
            OperationType::CloseCourseYear => "CloseCourseYear",
            OperationType::Enroll => "Enroll",
            OperationType::UpdateEnrollment => "UpdateEnrollment",
            OperationType::CreateEvaluation => "CreateEvaluation",
            OperationType::UpdateEvaluation => "UpdateEvaluation",
            OperationType::DeleteEvaluation => "DeleteEvaluation",
            OperationType::AdmitStudent => "AdmitStudent",
            OperationType::WithdrawStudent => "WithdrawStudent",
            OperationType::RestoreStudent => "RestoreStudent",
            OperationType::HireTeacher => "HireTeacher",
            OperationType::ChangeTeacherSubject => "ChangeTeacherSubject",
            OperationType::WithdrawTeacher => "WithdrawTeacher",
            OperationType::RestoreTeacher => "RestoreTeacher",
            OperationType::CreateClassroom => "CreateClassroom",
            OperationType::ChangeClassroomTrack => "ChangeClassroomTrack",
            OperationType::AssignTeacher => "AssignTeacher",
            OperationType::RemoveTeacherAssignment => "RemoveTeacherAssignment",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

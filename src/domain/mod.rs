// ==========================================
// 学业进程管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则常量
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod audit_log;
pub mod classroom;
pub mod course_year;
pub mod enrollment;
pub mod evaluation;
pub mod rules;
pub mod student;
pub mod teacher;
pub mod types;

// 重导出核心类型
pub use audit_log::{AuditEntry, OperationType};
pub use classroom::{Classroom, ClassroomTeacherAssignment};
pub use course_year::CourseYear;
pub use enrollment::Enrollment;
pub use evaluation::Evaluation;
pub use student::{NewStudent, Student};
pub use teacher::{NewTeacher, Teacher};
pub use types::{CourseYearStatus, Subject, Track};

// ==========================================
// 学业进程管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: 仓储借用 &Connection；事务内传入 &Transaction（Deref 到 Connection）
// ==========================================

pub mod audit_log_repo;
pub mod classroom_repo;
pub mod course_year_repo;
pub mod enrollment_repo;
pub mod error;
pub mod evaluation_repo;
mod row_codec;
pub mod student_repo;
pub mod teacher_repo;

// 重导出核心仓储
pub use audit_log_repo::AuditLogRepository;
pub use classroom_repo::ClassroomRepository;
pub use course_year_repo::CourseYearRepository;
pub use enrollment_repo::EnrollmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use evaluation_repo::{EvaluationRepository, NewEvaluation};
pub use student_repo::StudentRepository;
pub use teacher_repo::TeacherRepository;

// ==========================================
// 学业进程管理系统 - 人员/教室/排课服务
// ==========================================
// 职责: 注册与评分引擎所依赖的记录生命周期
// - 学生: 入学 / 退学 / 复学
// - 教师: 入职 / 变更学科 / 离职 / 复职
// - 教室: 新建 / 变更方向
// - 排课: 分配 / 撤销（当前学年）
// 红线:
// - 身份证号在学生与教师之间唯一
// - (教室, 学科, 学年) 至多一位教师；替换必须先撤销
// ==========================================

use crate::db::Database;
use crate::domain::audit_log::{AuditEntry, OperationType};
use crate::domain::classroom::{Classroom, ClassroomTeacherAssignment};
use crate::domain::rules::{
    is_valid_classroom_number, is_valid_full_name, is_valid_national_id, CLASSROOM_CAPACITY,
    CLASSROOM_NUMBER_MAX, CLASSROOM_NUMBER_MIN, FULL_NAME_MAX_LEN, NATIONAL_ID_LEN,
};
use crate::domain::student::{NewStudent, Student};
use crate::domain::teacher::{NewTeacher, Teacher};
use crate::domain::types::{Subject, Track};
use crate::engine::audit::AuditRecorder;
use crate::engine::clock::Clock;
use crate::engine::course_year::require_active_course_year;
use crate::engine::error::{ConflictReason, EngineError, EngineResult, FieldError, NotFoundError};
use crate::engine::log_rejection;
use crate::repository::{
    AuditLogRepository, ClassroomRepository, CourseYearRepository, EnrollmentRepository,
    EvaluationRepository, StudentRepository, TeacherRepository,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// 教室在某学年的就坐情况
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassroomOccupancy {
    pub classroom_id: i64,
    pub course_year_id: i64,
    pub seated: i64,
    pub capacity: i64,
}

impl ClassroomOccupancy {
    pub fn is_full(&self) -> bool {
        self.seated >= self.capacity
    }
}

/// 姓名 + 身份证号字段校验
fn validate_person(full_name: &str, national_id: &str) -> EngineResult<()> {
    let mut errors = Vec::new();
    if !is_valid_full_name(full_name) {
        errors.push(FieldError::new(
            "full_name",
            format!("姓名不能为空且不超过 {} 个字符", FULL_NAME_MAX_LEN),
        ));
    }
    if !is_valid_national_id(national_id) {
        errors.push(FieldError::new(
            "national_id",
            format!("身份证号必须为 {} 位数字", NATIONAL_ID_LEN),
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(errors))
    }
}

// ==========================================
// RosterService
// ==========================================
pub struct RosterService {
    db: Database,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
}

impl RosterService {
    pub fn new(db: Database, clock: Arc<dyn Clock>, audit: AuditRecorder) -> Self {
        Self { db, clock, audit }
    }

    // ==========================================
    // 学生
    // ==========================================

    #[instrument(skip(self, full_name, operator))]
    pub fn admit_student(
        &self,
        full_name: &str,
        national_id: &str,
        operator: &str,
    ) -> EngineResult<Student> {
        validate_person(full_name, national_id)
            .inspect_err(|e| log_rejection(OperationType::AdmitStudent, e))?;

        let student = self
            .db
            .write(|tx| -> EngineResult<Student> {
                let repo = StudentRepository::new(tx);
                if repo.national_id_in_use(national_id)? {
                    return Err(ConflictReason::DuplicateNationalId.into());
                }
                let id = repo.insert(&NewStudent {
                    full_name: full_name.to_string(),
                    national_id: national_id.to_string(),
                })?;
                Ok(repo.find_by_id(id)?.ok_or(NotFoundError::Student(id))?)
            })
            .inspect_err(|e| log_rejection(OperationType::AdmitStudent, e))?;

        tracing::info!("学生入学: id={}", student.id);
        self.audit.record(
            &format!("学生入学: {}", student.full_name),
            OperationType::AdmitStudent,
            operator,
        );
        Ok(student)
    }

    /// 退学: 非在籍、清空教室、记录退学时间（保留历史）
    #[instrument(skip(self, operator))]
    pub fn withdraw_student(&self, student_id: i64, operator: &str) -> EngineResult<Student> {
        let now = self.clock.now();
        let student = self
            .db
            .write(|tx| -> EngineResult<Student> {
                let repo = StudentRepository::new(tx);
                repo.find_by_id(student_id)?
                    .filter(|s| s.active)
                    .ok_or(NotFoundError::Student(student_id))?;
                repo.mark_withdrawn(student_id, now)?;
                Ok(repo.find_by_id(student_id)?.ok_or(NotFoundError::Student(student_id))?)
            })
            .inspect_err(|e| log_rejection(OperationType::WithdrawStudent, e))?;

        tracing::info!("学生退学: id={}", student.id);
        self.audit.record(
            &format!("学生退学: {}", student.full_name),
            OperationType::WithdrawStudent,
            operator,
        );
        Ok(student)
    }

    /// 复学: 恢复在籍；方向/教室留待重新注册
    #[instrument(skip(self, operator))]
    pub fn restore_student(&self, student_id: i64, operator: &str) -> EngineResult<Student> {
        let now = self.clock.now();
        let student = self
            .db
            .write(|tx| -> EngineResult<Student> {
                let repo = StudentRepository::new(tx);
                let student = repo
                    .find_by_id(student_id)?
                    .ok_or(NotFoundError::Student(student_id))?;
                if student.active {
                    return Err(ConflictReason::AlreadyActive.into());
                }
                repo.mark_restored(student_id, now)?;
                Ok(repo.find_by_id(student_id)?.ok_or(NotFoundError::Student(student_id))?)
            })
            .inspect_err(|e| log_rejection(OperationType::RestoreStudent, e))?;

        tracing::info!("学生复学: id={}", student.id);
        self.audit.record(
            &format!("学生复学: {}", student.full_name),
            OperationType::RestoreStudent,
            operator,
        );
        Ok(student)
    }

    pub fn get_student(&self, student_id: i64) -> EngineResult<Student> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(StudentRepository::new(conn)
                .find_by_id(student_id)?
                .ok_or(NotFoundError::Student(student_id))?)
        })
    }

    // ==========================================
    // 教师
    // ==========================================

    #[instrument(skip(self, full_name, operator), fields(subject = %subject))]
    pub fn hire_teacher(
        &self,
        full_name: &str,
        national_id: &str,
        subject: Subject,
        operator: &str,
    ) -> EngineResult<Teacher> {
        validate_person(full_name, national_id)
            .inspect_err(|e| log_rejection(OperationType::HireTeacher, e))?;

        let teacher = self
            .db
            .write(|tx| -> EngineResult<Teacher> {
                if StudentRepository::new(tx).national_id_in_use(national_id)? {
                    return Err(ConflictReason::DuplicateNationalId.into());
                }
                let repo = TeacherRepository::new(tx);
                let id = repo.insert(&NewTeacher {
                    full_name: full_name.to_string(),
                    national_id: national_id.to_string(),
                    subject,
                })?;
                Ok(repo.find_by_id(id)?.ok_or(NotFoundError::Teacher(id))?)
            })
            .inspect_err(|e| log_rejection(OperationType::HireTeacher, e))?;

        tracing::info!("教师入职: id={}, subject={}", teacher.id, teacher.subject);
        self.audit.record(
            &format!("教师入职: {}, 学科 {}", teacher.full_name, teacher.subject),
            OperationType::HireTeacher,
            operator,
        );
        Ok(teacher)
    }

    /// 变更学科（持有排课或已评过分的教师不可变更）
    #[instrument(skip(self, operator), fields(subject = %subject))]
    pub fn change_teacher_subject(
        &self,
        teacher_id: i64,
        subject: Subject,
        operator: &str,
    ) -> EngineResult<Teacher> {
        let (before, after) = self
            .db
            .write(|tx| -> EngineResult<(Subject, Teacher)> {
                let repo = TeacherRepository::new(tx);
                let teacher = repo
                    .find_by_id(teacher_id)?
                    .filter(|t| t.active)
                    .ok_or(NotFoundError::Teacher(teacher_id))?;

                if ClassroomRepository::new(tx).count_for_teacher(teacher_id)? > 0
                    || EvaluationRepository::new(tx).exists_by_teacher(teacher_id)?
                {
                    return Err(ConflictReason::TeacherSubjectLocked.into());
                }

                repo.set_subject(teacher_id, subject)?;
                let updated = repo.find_by_id(teacher_id)?.ok_or(NotFoundError::Teacher(teacher_id))?;
                Ok((teacher.subject, updated))
            })
            .inspect_err(|e| log_rejection(OperationType::ChangeTeacherSubject, e))?;

        tracing::info!("教师学科变更: id={}, {} -> {}", after.id, before, after.subject);
        self.audit.record(
            &format!("教师学科变更: {}, {} -> {}", after.full_name, before, after.subject),
            OperationType::ChangeTeacherSubject,
            operator,
        );
        Ok(after)
    }

    /// 离职（仍持有排课时拒绝）
    #[instrument(skip(self, operator))]
    pub fn withdraw_teacher(&self, teacher_id: i64, operator: &str) -> EngineResult<Teacher> {
        let teacher = self
            .db
            .write(|tx| -> EngineResult<Teacher> {
                let repo = TeacherRepository::new(tx);
                repo.find_by_id(teacher_id)?
                    .filter(|t| t.active)
                    .ok_or(NotFoundError::Teacher(teacher_id))?;
                if ClassroomRepository::new(tx).count_for_teacher(teacher_id)? > 0 {
                    return Err(ConflictReason::TeacherHasAssignments.into());
                }
                repo.set_active(teacher_id, false)?;
                Ok(repo.find_by_id(teacher_id)?.ok_or(NotFoundError::Teacher(teacher_id))?)
            })
            .inspect_err(|e| log_rejection(OperationType::WithdrawTeacher, e))?;

        tracing::info!("教师离职: id={}", teacher.id);
        self.audit.record(
            &format!("教师离职: {}", teacher.full_name),
            OperationType::WithdrawTeacher,
            operator,
        );
        Ok(teacher)
    }

    #[instrument(skip(self, operator))]
    pub fn restore_teacher(&self, teacher_id: i64, operator: &str) -> EngineResult<Teacher> {
        let teacher = self
            .db
            .write(|tx| -> EngineResult<Teacher> {
                let repo = TeacherRepository::new(tx);
                let teacher = repo
                    .find_by_id(teacher_id)?
                    .ok_or(NotFoundError::Teacher(teacher_id))?;
                if teacher.active {
                    return Err(ConflictReason::AlreadyActive.into());
                }
                repo.set_active(teacher_id, true)?;
                Ok(repo.find_by_id(teacher_id)?.ok_or(NotFoundError::Teacher(teacher_id))?)
            })
            .inspect_err(|e| log_rejection(OperationType::RestoreTeacher, e))?;

        tracing::info!("教师复职: id={}", teacher.id);
        self.audit.record(
            &format!("教师复职: {}", teacher.full_name),
            OperationType::RestoreTeacher,
            operator,
        );
        Ok(teacher)
    }

    /// 教师（含已离职）
    pub fn get_teacher(&self, teacher_id: i64) -> EngineResult<Teacher> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(TeacherRepository::new(conn)
                .find_by_id(teacher_id)?
                .ok_or(NotFoundError::Teacher(teacher_id))?)
        })
    }

    // ==========================================
    // 教室
    // ==========================================

    #[instrument(skip(self, operator), fields(track = %track))]
    pub fn create_classroom(&self, number: i32, track: Track, operator: &str) -> EngineResult<Classroom> {
        if !is_valid_classroom_number(number) {
            let err = EngineError::validation(
                "number",
                format!(
                    "教室编号必须在 {}..={} 之间",
                    CLASSROOM_NUMBER_MIN, CLASSROOM_NUMBER_MAX
                ),
            );
            log_rejection(OperationType::CreateClassroom, &err);
            return Err(err);
        }

        let classroom = self
            .db
            .write(|tx| -> EngineResult<Classroom> {
                let repo = ClassroomRepository::new(tx);
                if repo.number_exists(number)? {
                    return Err(ConflictReason::DuplicateClassroomNumber.into());
                }
                let id = repo.insert(number, track)?;
                Ok(repo.find_by_id(id)?.ok_or(NotFoundError::Classroom(id))?)
            })
            .inspect_err(|e| log_rejection(OperationType::CreateClassroom, e))?;

        tracing::info!("教室已创建: id={}, number={}", classroom.id, classroom.number);
        self.audit.record(
            &format!("教室创建: {}, 方向 {}", classroom.number, classroom.track),
            OperationType::CreateClassroom,
            operator,
        );
        Ok(classroom)
    }

    /// 变更方向（仍有就坐的在籍学生，或在职教师的排课时拒绝）
    #[instrument(skip(self, operator), fields(track = %track))]
    pub fn change_classroom_track(
        &self,
        classroom_id: i64,
        track: Track,
        operator: &str,
    ) -> EngineResult<Classroom> {
        let (before, after) = self
            .db
            .write(|tx| -> EngineResult<(Track, Classroom)> {
                let repo = ClassroomRepository::new(tx);
                let classroom = repo
                    .find_by_id(classroom_id)?
                    .ok_or(NotFoundError::Classroom(classroom_id))?;
                if classroom.track == track {
                    return Ok((classroom.track, classroom));
                }

                if StudentRepository::new(tx).count_active_in_classroom(classroom_id)? > 0
                    || repo.count_active_teacher_assignments(classroom_id)? > 0
                {
                    return Err(ConflictReason::ClassroomTrackLocked.into());
                }

                repo.set_track(classroom_id, track)?;
                let updated = repo
                    .find_by_id(classroom_id)?
                    .ok_or(NotFoundError::Classroom(classroom_id))?;
                Ok((classroom.track, updated))
            })
            .inspect_err(|e| log_rejection(OperationType::ChangeClassroomTrack, e))?;

        if before != after.track {
            tracing::info!("教室方向变更: id={}, {} -> {}", after.id, before, after.track);
            self.audit.record(
                &format!("教室方向变更: {}, {} -> {}", after.number, before, after.track),
                OperationType::ChangeClassroomTrack,
                operator,
            );
        }
        Ok(after)
    }

    pub fn get_classroom(&self, classroom_id: i64) -> EngineResult<Classroom> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(ClassroomRepository::new(conn)
                .find_by_id(classroom_id)?
                .ok_or(NotFoundError::Classroom(classroom_id))?)
        })
    }

    /// 教室在当前学年（active，否则最近开始的学年）的就坐情况
    pub fn classroom_occupancy(&self, classroom_id: i64) -> EngineResult<ClassroomOccupancy> {
        self.db.read(|conn| -> EngineResult<_> {
            ClassroomRepository::new(conn)
                .find_by_id(classroom_id)?
                .ok_or(NotFoundError::Classroom(classroom_id))?;
            let course_year_repo = CourseYearRepository::new(conn);
            let current = match course_year_repo.find_active()? {
                Some(cy) => cy,
                None => course_year_repo
                    .find_latest_started()?
                    .ok_or(NotFoundError::NoCourseYear)?,
            };
            let seated = EnrollmentRepository::new(conn).count_seated(classroom_id, current.id)?;
            Ok(ClassroomOccupancy {
                classroom_id,
                course_year_id: current.id,
                seated,
                capacity: CLASSROOM_CAPACITY,
            })
        })
    }

    // ==========================================
    // 排课
    // ==========================================

    /// 为当前学年分配教师（学科取教师学科）
    #[instrument(skip(self, operator))]
    pub fn assign_teacher(
        &self,
        classroom_id: i64,
        teacher_id: i64,
        operator: &str,
    ) -> EngineResult<ClassroomTeacherAssignment> {
        let (assignment, classroom_number, teacher_name) = self
            .db
            .write(|tx| -> EngineResult<(ClassroomTeacherAssignment, i32, String)> {
                let repo = ClassroomRepository::new(tx);
                let classroom = repo
                    .find_by_id(classroom_id)?
                    .ok_or(NotFoundError::Classroom(classroom_id))?;
                let teacher = TeacherRepository::new(tx)
                    .find_by_id(teacher_id)?
                    .filter(|t| t.active)
                    .ok_or(NotFoundError::Teacher(teacher_id))?;
                let current = require_active_course_year(tx)?;

                if !classroom.track.requires(teacher.subject) {
                    return Err(ConflictReason::SubjectNotInTrack.into());
                }
                match repo.find_assignment(classroom.id, teacher.subject, current.id)? {
                    Some(existing) if existing.teacher_id == teacher.id => {
                        return Err(ConflictReason::DuplicateAssignment.into());
                    }
                    Some(_) => return Err(ConflictReason::SubjectAlreadyStaffed.into()),
                    None => {}
                }

                let id = repo.insert_assignment(classroom.id, teacher.id, teacher.subject, current.id)?;
                let assignment = repo
                    .find_assignment(classroom.id, teacher.subject, current.id)?
                    .ok_or_else(|| NotFoundError::Record {
                        entity: "ClassroomTeacherAssignment".to_string(),
                        id: id.to_string(),
                    })?;
                Ok((assignment, classroom.number, teacher.full_name))
            })
            .inspect_err(|e| log_rejection(OperationType::AssignTeacher, e))?;

        tracing::info!(
            "排课已分配: classroom_id={}, teacher_id={}, subject={}",
            assignment.classroom_id,
            assignment.teacher_id,
            assignment.subject
        );
        self.audit.record(
            &format!(
                "排课分配: 教室 {}, 教师 {}, 学科 {}",
                classroom_number, teacher_name, assignment.subject
            ),
            OperationType::AssignTeacher,
            operator,
        );
        Ok(assignment)
    }

    /// 撤销当前学年的排课
    #[instrument(skip(self, operator))]
    pub fn remove_teacher_assignment(
        &self,
        classroom_id: i64,
        teacher_id: i64,
        operator: &str,
    ) -> EngineResult<()> {
        let removed = self
            .db
            .write(|tx| -> EngineResult<ClassroomTeacherAssignment> {
                let current = require_active_course_year(tx)?;
                let repo = ClassroomRepository::new(tx);
                let assignment = repo
                    .find_teacher_assignment(classroom_id, teacher_id, current.id)?
                    .ok_or(NotFoundError::Assignment {
                        classroom_id,
                        teacher_id,
                    })?;
                repo.delete_assignment(assignment.id)?;
                Ok(assignment)
            })
            .inspect_err(|e| log_rejection(OperationType::RemoveTeacherAssignment, e))?;

        tracing::info!(
            "排课已撤销: classroom_id={}, teacher_id={}, subject={}",
            removed.classroom_id,
            removed.teacher_id,
            removed.subject
        );
        self.audit.record(
            &format!(
                "排课撤销: 教室 {}, 教师 {}, 学科 {}",
                removed.classroom_id, removed.teacher_id, removed.subject
            ),
            OperationType::RemoveTeacherAssignment,
            operator,
        );
        Ok(())
    }

    /// 教室在指定学年的排课
    pub fn list_classroom_assignments(
        &self,
        classroom_id: i64,
        course_year_id: i64,
    ) -> EngineResult<Vec<ClassroomTeacherAssignment>> {
        self.db.read(|conn| -> EngineResult<_> {
            let repo = ClassroomRepository::new(conn);
            repo.find_by_id(classroom_id)?
                .ok_or(NotFoundError::Classroom(classroom_id))?;
            Ok(repo.list_assignments(classroom_id, course_year_id)?)
        })
    }

    // ==========================================
    // 审计查询
    // ==========================================

    pub fn recent_audit_entries(&self, limit: usize) -> EngineResult<Vec<AuditEntry>> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(AuditLogRepository::new(conn).list_recent(limit)?)
        })
    }
}

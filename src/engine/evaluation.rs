// ==========================================
// 学业进程管理系统 - 评分一致性引擎
// ==========================================
// 职责:
// - 评分的创建/修改/删除校验与落库
// - 结业门槛查询（未完成必修学科评分的在籍学生）
// 红线:
// - (学生, 学科, 学年) 至多一条评分（唯一索引兜底）
// - 往年评分不可修改/删除；结业后评分锁定
// ==========================================

use crate::db::Database;
use crate::domain::audit_log::OperationType;
use crate::domain::evaluation::Evaluation;
use crate::domain::rules::{is_valid_grade, GRADE_MAX, GRADE_MIN};
use crate::domain::types::Subject;
use crate::engine::audit::AuditRecorder;
use crate::engine::clock::Clock;
use crate::engine::course_year::require_active_course_year;
use crate::engine::error::{
    ConflictReason, EngineError, EngineResult, IncompleteStudent, NotFoundError,
};
use crate::engine::log_rejection;
use crate::repository::{
    ClassroomRepository, CourseYearRepository, EnrollmentRepository, EvaluationRepository,
    NewEvaluation, RepositoryResult, StudentRepository, TeacherRepository,
};
use chrono::Datelike;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::instrument;

/// 学年内在籍注册学生中，缺少方向必修学科评分者
///
/// 以注册方向的必修学科集合为准（两个方向各 3 门，但集合不同）。
pub(crate) fn non_compliant_students_in(
    conn: &Connection,
    course_year_id: i64,
) -> RepositoryResult<Vec<IncompleteStudent>> {
    let enrollments = EnrollmentRepository::new(conn).list_active_students_in_year(course_year_id)?;
    let evaluation_repo = EvaluationRepository::new(conn);
    let student_repo = StudentRepository::new(conn);

    let mut pending = Vec::new();
    for enrollment in enrollments {
        let evaluated: Vec<Subject> = evaluation_repo
            .list_for_student_in_year(enrollment.student_id, course_year_id)?
            .into_iter()
            .map(|e| e.subject)
            .collect();

        let missing: Vec<Subject> = enrollment
            .track
            .required_subjects()
            .iter()
            .copied()
            .filter(|s| !evaluated.contains(s))
            .collect();
        if missing.is_empty() {
            continue;
        }

        let full_name = student_repo
            .find_by_id(enrollment.student_id)?
            .map(|s| s.full_name)
            .unwrap_or_default();
        pending.push(IncompleteStudent {
            student_id: enrollment.student_id,
            full_name,
            track: enrollment.track,
            missing_subjects: missing,
        });
    }
    Ok(pending)
}

fn validate_grade(grade: i32) -> EngineResult<()> {
    if is_valid_grade(grade) {
        Ok(())
    } else {
        Err(EngineError::validation(
            "grade",
            format!("成绩必须在 {}..={} 之间，实际为 {}", GRADE_MIN, GRADE_MAX, grade),
        ))
    }
}

// ==========================================
// EvaluationConsistencyEngine
// ==========================================
pub struct EvaluationConsistencyEngine {
    db: Database,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
}

impl EvaluationConsistencyEngine {
    pub fn new(db: Database, clock: Arc<dyn Clock>, audit: AuditRecorder) -> Self {
        Self { db, clock, audit }
    }

    /// 录入评分
    ///
    /// 学科取教师的学科，学年取当前 active 学年。
    #[instrument(skip(self, operator), fields(student_id = %student_id, teacher_id = %teacher_id, grade = %grade))]
    pub fn create_evaluation(
        &self,
        student_id: i64,
        teacher_id: i64,
        grade: i32,
        operator: &str,
    ) -> EngineResult<Evaluation> {
        validate_grade(grade).inspect_err(|e| log_rejection(OperationType::CreateEvaluation, e))?;

        let now = self.clock.now();
        let (evaluation, student_name, subject) = self
            .db
            .write(|tx| -> EngineResult<(Evaluation, String, Subject)> {
                let student = StudentRepository::new(tx)
                    .find_by_id(student_id)?
                    .filter(|s| s.active)
                    .ok_or(NotFoundError::Student(student_id))?;
                let teacher = TeacherRepository::new(tx)
                    .find_by_id(teacher_id)?
                    .filter(|t| t.active)
                    .ok_or(NotFoundError::Teacher(teacher_id))?;

                let current = require_active_course_year(tx)?;

                let enrollments =
                    EnrollmentRepository::new(tx).list_for_student_in_year(student.id, current.id)?;
                let enrollment = enrollments
                    .iter()
                    .find(|e| student.classroom_id == Some(e.classroom_id))
                    .or_else(|| enrollments.first())
                    .ok_or(ConflictReason::StudentNotEnrolled)?;

                if !enrollment.track.requires(teacher.subject) {
                    return Err(ConflictReason::SubjectNotInTrack.into());
                }

                let assigned = ClassroomRepository::new(tx)
                    .find_teacher_assignment(enrollment.classroom_id, teacher.id, current.id)?
                    .map(|a| a.subject == teacher.subject)
                    .unwrap_or(false);
                if !assigned {
                    return Err(ConflictReason::TeacherNotAssigned.into());
                }

                let repo = EvaluationRepository::new(tx);
                if repo.exists_for(student.id, teacher.subject, current.id)? {
                    return Err(ConflictReason::DuplicateEvaluation.into());
                }

                let id = repo.insert(&NewEvaluation {
                    student_id: student.id,
                    teacher_id: teacher.id,
                    subject: teacher.subject,
                    course_year_id: current.id,
                    grade,
                    evaluation_date: now,
                })?;
                let evaluation = repo.find_by_id(id)?.ok_or(NotFoundError::Evaluation(id))?;
                Ok((evaluation, student.full_name, teacher.subject))
            })
            .inspect_err(|e| log_rejection(OperationType::CreateEvaluation, e))?;

        tracing::info!(
            "评分已录入: id={}, student_id={}, subject={}, grade={}",
            evaluation.id,
            evaluation.student_id,
            subject,
            evaluation.grade
        );
        self.audit.record(
            &format!("评分录入: 学生 {}, 学科 {}, 成绩 {}", student_name, subject, grade),
            OperationType::CreateEvaluation,
            operator,
        );
        Ok(evaluation)
    }

    /// 修改成绩（仅限当前学年、未锁定的评分）
    #[instrument(skip(self, operator), fields(evaluation_id = %evaluation_id, new_grade = %new_grade))]
    pub fn update_evaluation(
        &self,
        evaluation_id: i64,
        new_grade: i32,
        operator: &str,
    ) -> EngineResult<Evaluation> {
        validate_grade(new_grade).inspect_err(|e| log_rejection(OperationType::UpdateEvaluation, e))?;

        let now = self.clock.now();
        let (before, after) = self
            .db
            .write(|tx| -> EngineResult<(Evaluation, Evaluation)> {
                let repo = EvaluationRepository::new(tx);
                let evaluation = repo
                    .find_by_id(evaluation_id)?
                    .ok_or(NotFoundError::Evaluation(evaluation_id))?;

                if !evaluation.editable {
                    return Err(ConflictReason::EvaluationLocked.into());
                }
                let active_id = CourseYearRepository::new(tx).find_active()?.map(|cy| cy.id);
                if active_id != Some(evaluation.course_year_id) {
                    return Err(ConflictReason::StaleEvaluation.into());
                }

                repo.update_grade(evaluation_id, new_grade, now)?;
                let updated = repo
                    .find_by_id(evaluation_id)?
                    .ok_or(NotFoundError::Evaluation(evaluation_id))?;
                Ok((evaluation, updated))
            })
            .inspect_err(|e| log_rejection(OperationType::UpdateEvaluation, e))?;

        tracing::info!(
            "成绩已修改: id={}, {} -> {}",
            after.id,
            before.grade,
            after.grade
        );
        self.audit.record(
            &format!(
                "成绩修改: 评分 {}, 学科 {}, {} -> {}",
                after.id, after.subject, before.grade, after.grade
            ),
            OperationType::UpdateEvaluation,
            operator,
        );
        Ok(after)
    }

    /// 删除评分（往年评分不可删除）
    #[instrument(skip(self, operator), fields(evaluation_id = %evaluation_id))]
    pub fn delete_evaluation(&self, evaluation_id: i64, operator: &str) -> EngineResult<()> {
        let now = self.clock.now();
        let removed = self
            .db
            .write(|tx| -> EngineResult<Evaluation> {
                let repo = EvaluationRepository::new(tx);
                let evaluation = repo
                    .find_by_id(evaluation_id)?
                    .ok_or(NotFoundError::Evaluation(evaluation_id))?;

                if !evaluation.editable {
                    return Err(ConflictReason::EvaluationLocked.into());
                }
                if evaluation.evaluation_date.year() < now.year() {
                    return Err(ConflictReason::HistoricalEvaluation.into());
                }

                repo.delete(evaluation_id)?;
                Ok(evaluation)
            })
            .inspect_err(|e| log_rejection(OperationType::DeleteEvaluation, e))?;

        tracing::info!("评分已删除: id={}", removed.id);
        self.audit.record(
            &format!(
                "评分删除: 学生 {}, 学科 {}, 成绩 {}",
                removed.student_id, removed.subject, removed.grade
            ),
            OperationType::DeleteEvaluation,
            operator,
        );
        Ok(())
    }

    /// 结业门槛诊断: 未完成必修学科评分的在籍学生
    pub fn non_compliant_students(&self, course_year_id: i64) -> EngineResult<Vec<IncompleteStudent>> {
        self.db.read(|conn| -> EngineResult<_> {
            CourseYearRepository::new(conn)
                .find_by_id(course_year_id)?
                .ok_or(NotFoundError::CourseYear(course_year_id))?;
            Ok(non_compliant_students_in(conn, course_year_id)?)
        })
    }

    pub fn get_evaluation(&self, evaluation_id: i64) -> EngineResult<Evaluation> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(EvaluationRepository::new(conn)
                .find_by_id(evaluation_id)?
                .ok_or(NotFoundError::Evaluation(evaluation_id))?)
        })
    }

    /// 学生全部评分（按时间倒序）
    pub fn list_evaluations_for_student(&self, student_id: i64) -> EngineResult<Vec<Evaluation>> {
        self.db.read(|conn| -> EngineResult<_> {
            StudentRepository::new(conn)
                .find_by_id(student_id)?
                .ok_or(NotFoundError::Student(student_id))?;
            Ok(EvaluationRepository::new(conn).list_for_student(student_id)?)
        })
    }
}

// ==========================================
// 学业进程管理系统 - 注册资格引擎
// ==========================================
// 职责: 学生注册到教室/方向（当前学年）的校验与落库；调整注册教室
// 红线:
// - 全部校验与写入在同一个 IMMEDIATE 事务内完成
// - 容量/终身上限/唯一性由存储层触发器与唯一索引再次裁决
// ==========================================

use crate::db::Database;
use crate::domain::audit_log::OperationType;
use crate::domain::enrollment::Enrollment;
use crate::domain::rules::{CLASSROOM_CAPACITY, MAX_LIFETIME_ENROLLMENTS};
use crate::domain::types::{Subject, Track};
use crate::engine::audit::AuditRecorder;
use crate::engine::clock::Clock;
use crate::engine::course_year::require_active_course_year;
use crate::engine::error::{ConflictReason, EngineError, EngineResult, NotFoundError};
use crate::engine::log_rejection;
use crate::engine::staffing::missing_subjects_in;
use crate::engine::track_completion::has_ever_completed_track_in;
use crate::engine::window::ReenrollmentWindow;
use crate::repository::{
    ClassroomRepository, EnrollmentRepository, EvaluationRepository, RepositoryResult,
    StudentRepository,
};
use chrono::{Datelike, NaiveDateTime};
use rusqlite::Connection;
use std::sync::Arc;
use tracing::instrument;

/// 上一自然年已有评分时，方向必修学科中未被评分的学科
///
/// 上一年没有任何评分时返回空（新生或中断后复学）。
fn prior_year_unresolved_in(
    conn: &Connection,
    student_id: i64,
    track: Track,
    now: NaiveDateTime,
) -> RepositoryResult<Vec<Subject>> {
    let evaluated = EvaluationRepository::new(conn).subjects_in_calendar_year(student_id, now.year() - 1)?;
    if evaluated.is_empty() {
        return Ok(Vec::new());
    }
    Ok(track
        .required_subjects()
        .iter()
        .copied()
        .filter(|s| !evaluated.contains(s))
        .collect())
}

// ==========================================
// EnrollmentEligibilityEngine
// ==========================================
pub struct EnrollmentEligibilityEngine {
    db: Database,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
    window: Arc<dyn ReenrollmentWindow>,
}

impl EnrollmentEligibilityEngine {
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        audit: AuditRecorder,
        window: Arc<dyn ReenrollmentWindow>,
    ) -> Self {
        Self {
            db,
            clock,
            audit,
            window,
        }
    }

    /// 注册
    ///
    /// 校验顺序:
    /// 1. 学生/教室/当前学年存在
    /// 2. 当前学年未注册过该方向
    /// 3. 教室方向一致
    /// 4. 教室未满
    /// 5. 教室师资完整
    /// 6. 学生在籍
    /// 7. 未达终身注册上限
    /// 8. 上一年度必修学科已全部评分
    /// 9. 未曾完成该方向
    #[instrument(skip(self, operator), fields(student_id = %student_id, classroom_id = %classroom_id, track = %track))]
    pub fn enroll(
        &self,
        student_id: i64,
        classroom_id: i64,
        track: Track,
        operator: &str,
    ) -> EngineResult<Enrollment> {
        let now = self.clock.now();
        let (enrollment, student_name, classroom_number) = self
            .db
            .write(|tx| -> EngineResult<(Enrollment, String, i32)> {
                let students = StudentRepository::new(tx);
                let enrollments = EnrollmentRepository::new(tx);

                // 1
                let student = students
                    .find_by_id(student_id)?
                    .ok_or(NotFoundError::Student(student_id))?;
                let classroom = ClassroomRepository::new(tx)
                    .find_by_id(classroom_id)?
                    .ok_or(NotFoundError::Classroom(classroom_id))?;
                let current = require_active_course_year(tx)?;

                // 2
                if enrollments.exists_for(student.id, track, current.id)? {
                    return Err(ConflictReason::DuplicateEnrollment.into());
                }
                // 3
                if classroom.track != track {
                    return Err(ConflictReason::TrackMismatch.into());
                }
                // 4
                if enrollments.count_seated(classroom.id, current.id)? >= CLASSROOM_CAPACITY {
                    return Err(ConflictReason::ClassroomFull.into());
                }
                // 5
                let missing = missing_subjects_in(tx, classroom.id, track, current.id)?;
                if !missing.is_empty() {
                    return Err(ConflictReason::IncompleteStaffing(missing).into());
                }
                // 6
                if !student.active {
                    return Err(ConflictReason::StudentInactive.into());
                }
                // 7
                if enrollments.count_for_student(student.id)? >= MAX_LIFETIME_ENROLLMENTS {
                    return Err(ConflictReason::EnrollmentLimitReached.into());
                }
                // 8
                let unresolved = prior_year_unresolved_in(tx, student.id, track, now)?;
                if !unresolved.is_empty() {
                    return Err(ConflictReason::PriorYearUnresolved(unresolved).into());
                }
                // 9
                if has_ever_completed_track_in(tx, student.id, track)? {
                    return Err(ConflictReason::TrackAlreadyCompleted(track).into());
                }

                let id = enrollments.insert(student.id, classroom.id, track, current.id, now)?;
                students.set_placement(student.id, classroom.id, track)?;

                let enrollment = enrollments
                    .find_by_id(id)?
                    .ok_or(NotFoundError::Enrollment(id))?;
                Ok((enrollment, student.full_name, classroom.number))
            })
            .inspect_err(|e| log_rejection(OperationType::Enroll, e))?;

        tracing::info!(
            "注册成功: enrollment_id={}, student_id={}, classroom={}, track={}",
            enrollment.id,
            enrollment.student_id,
            classroom_number,
            enrollment.track
        );
        self.audit.record(
            &format!(
                "注册: 学生 {}, 教室 {}, 方向 {}",
                student_name, classroom_number, enrollment.track
            ),
            OperationType::Enroll,
            operator,
        );
        Ok(enrollment)
    }

    /// 调整注册教室（仅开放时段内；学年与方向保持不变）
    #[instrument(skip(self, operator), fields(enrollment_id = %enrollment_id, new_classroom_id = %new_classroom_id, track = %track))]
    pub fn update_enrollment(
        &self,
        enrollment_id: i64,
        new_classroom_id: i64,
        track: Track,
        operator: &str,
    ) -> EngineResult<Enrollment> {
        let now = self.clock.now();
        if !self.window.is_open(now) {
            let err: EngineError = ConflictReason::ReenrollmentWindowClosed.into();
            log_rejection(OperationType::UpdateEnrollment, &err);
            return Err(err);
        }

        let (before, after) = self
            .db
            .write(|tx| -> EngineResult<(Enrollment, Enrollment)> {
                let enrollments = EnrollmentRepository::new(tx);
                let students = StudentRepository::new(tx);

                let enrollment = enrollments
                    .find_by_id(enrollment_id)?
                    .ok_or(NotFoundError::Enrollment(enrollment_id))?;
                let current = require_active_course_year(tx)?;
                if enrollment.course_year_id != current.id {
                    return Err(ConflictReason::StaleEnrollment.into());
                }

                let classroom = ClassroomRepository::new(tx)
                    .find_by_id(new_classroom_id)?
                    .ok_or(NotFoundError::Classroom(new_classroom_id))?;
                let student = students
                    .find_by_id(enrollment.student_id)?
                    .ok_or(NotFoundError::Student(enrollment.student_id))?;

                if track != enrollment.track || classroom.track != track {
                    return Err(ConflictReason::TrackMismatch.into());
                }
                if !student.active {
                    return Err(ConflictReason::StudentInactive.into());
                }

                // 就坐以 student.classroom_id 为准；另一方向的注册可能已把学生移出本教室
                let reseating = student.classroom_id != Some(classroom.id);
                if reseating && enrollments.count_seated(classroom.id, current.id)? >= CLASSROOM_CAPACITY {
                    return Err(ConflictReason::ClassroomFull.into());
                }

                let missing = missing_subjects_in(tx, classroom.id, track, current.id)?;
                if !missing.is_empty() {
                    return Err(ConflictReason::IncompleteStaffing(missing).into());
                }

                enrollments.move_to_classroom(enrollment.id, classroom.id, now)?;
                students.set_classroom(student.id, classroom.id)?;

                let updated = enrollments
                    .find_by_id(enrollment.id)?
                    .ok_or(NotFoundError::Enrollment(enrollment.id))?;
                Ok((enrollment, updated))
            })
            .inspect_err(|e| log_rejection(OperationType::UpdateEnrollment, e))?;

        tracing::info!(
            "注册已调整: enrollment_id={}, classroom {} -> {}",
            after.id,
            before.classroom_id,
            after.classroom_id
        );
        self.audit.record(
            &format!(
                "注册调整: 学生 {}, 教室 {} -> {}",
                after.student_id, before.classroom_id, after.classroom_id
            ),
            OperationType::UpdateEnrollment,
            operator,
        );
        Ok(after)
    }

    pub fn get_enrollment(&self, enrollment_id: i64) -> EngineResult<Enrollment> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(EnrollmentRepository::new(conn)
                .find_by_id(enrollment_id)?
                .ok_or(NotFoundError::Enrollment(enrollment_id))?)
        })
    }

    /// 学生全部注册（按注册时间）
    pub fn list_enrollments_for_student(&self, student_id: i64) -> EngineResult<Vec<Enrollment>> {
        self.db.read(|conn| -> EngineResult<_> {
            StudentRepository::new(conn)
                .find_by_id(student_id)?
                .ok_or(NotFoundError::Student(student_id))?;
            Ok(EnrollmentRepository::new(conn).list_for_student(student_id)?)
        })
    }
}

// ==========================================
// 学业进程管理系统 - 学年生命周期
// ==========================================
// 状态: Planned -> Active -> Closed（线性、不可逆）
// 红线:
// - 同一时刻至多一个 active 学年（部分唯一索引兜底）
// - “当前学年”每次调用时从存储重新解析，不做进程内缓存
// - 结业门槛: 在籍注册学生的方向必修学科全部有评分
// ==========================================

use crate::db::Database;
use crate::domain::audit_log::OperationType;
use crate::domain::course_year::CourseYear;
use crate::domain::rules::latest_course_year_end;
use crate::engine::audit::AuditRecorder;
use crate::engine::clock::Clock;
use crate::engine::error::{ConflictReason, EngineError, EngineResult, NotFoundError};
use crate::engine::evaluation::non_compliant_students_in;
use crate::engine::log_rejection;
use crate::repository::{ClassroomRepository, CourseYearRepository, EvaluationRepository};
use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use std::sync::Arc;
use tracing::instrument;

/// 写操作所需的 active 学年
///
/// - 从未创建过学年: NotFound
/// - 只有已结业学年: Conflict(NO_ACTIVE_COURSE_YEAR)
pub(crate) fn require_active_course_year(conn: &Connection) -> EngineResult<CourseYear> {
    let repo = CourseYearRepository::new(conn);
    if let Some(active) = repo.find_active()? {
        return Ok(active);
    }
    if repo.count_all()? == 0 {
        Err(NotFoundError::NoCourseYear.into())
    } else {
        Err(ConflictReason::NoActiveCourseYear.into())
    }
}

/// 新学年日期校验（与存储无关的部分）
pub fn check_course_year_dates(
    start: NaiveDateTime,
    end: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<(), ConflictReason> {
    if end <= start {
        return Err(ConflictReason::InvalidDateRange);
    }
    if end - start < Duration::days(1) {
        return Err(ConflictReason::CourseYearTooShort);
    }
    if start <= now || end <= now {
        return Err(ConflictReason::CourseYearInPast);
    }
    match latest_course_year_end(start) {
        Some(latest) if end <= latest => Ok(()),
        _ => Err(ConflictReason::CourseYearTooLong),
    }
}

// ==========================================
// CourseYearLifecycle
// ==========================================
pub struct CourseYearLifecycle {
    db: Database,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
}

impl CourseYearLifecycle {
    pub fn new(db: Database, clock: Arc<dyn Clock>, audit: AuditRecorder) -> Self {
        Self { db, clock, audit }
    }

    /// 开启新学年
    ///
    /// 成功后将在职教师的排课改挂到新学年，并直接置为 active。
    #[instrument(skip(self, operator), fields(name = %name, start = %start, end = %end))]
    pub fn open_course_year(
        &self,
        name: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        operator: &str,
    ) -> EngineResult<CourseYear> {
        if name.trim().is_empty() {
            let err = EngineError::validation("name", "学年名称不能为空");
            log_rejection(OperationType::OpenCourseYear, &err);
            return Err(err);
        }

        let now = self.clock.now();
        let (course_year, carried) = self
            .db
            .write(|tx| -> EngineResult<(CourseYear, usize)> {
                let repo = CourseYearRepository::new(tx);

                if repo.find_active()?.is_some() {
                    return Err(ConflictReason::ActiveCourseYearExists.into());
                }
                check_course_year_dates(start, end, now)?;
                if let Some(existing) = repo.find_overlapping(start, end)? {
                    tracing::debug!("与学年重叠: id={}, name={}", existing.id, existing.name);
                    return Err(ConflictReason::CourseYearOverlap.into());
                }

                let id = repo.insert_active(name, start, end)?;
                let carried = ClassroomRepository::new(tx).restamp_active_assignments(id)?;
                let created = repo.find_by_id(id)?.ok_or(NotFoundError::CourseYear(id))?;
                Ok((created, carried))
            })
            .inspect_err(|e| log_rejection(OperationType::OpenCourseYear, e))?;

        tracing::info!(
            "学年已开启: id={}, name={}, 沿用排课={}",
            course_year.id,
            course_year.name,
            carried
        );
        self.audit.record(
            &format!(
                "学年开启: {} ({} - {})",
                course_year.name,
                course_year.start_date.format("%Y"),
                course_year.end_date.format("%Y")
            ),
            OperationType::OpenCourseYear,
            operator,
        );
        Ok(course_year)
    }

    /// 结业
    ///
    /// 任一在籍注册学生缺少方向必修学科评分时拒绝，并列出这些学生。
    #[instrument(skip(self, operator), fields(course_year_id = %course_year_id))]
    pub fn close_course_year(&self, course_year_id: i64, operator: &str) -> EngineResult<CourseYear> {
        let now = self.clock.now();
        let (closed, locked) = self
            .db
            .write(|tx| -> EngineResult<(CourseYear, usize)> {
                let repo = CourseYearRepository::new(tx);
                let course_year = repo
                    .find_by_id(course_year_id)?
                    .ok_or(NotFoundError::CourseYear(course_year_id))?;

                if !course_year.active {
                    return Err(ConflictReason::CourseYearAlreadyClosed.into());
                }

                let pending = non_compliant_students_in(tx, course_year_id)?;
                if !pending.is_empty() {
                    return Err(ConflictReason::IncompleteEvaluations(pending).into());
                }

                repo.mark_closed(course_year_id, now)?;
                let locked = EvaluationRepository::new(tx).lock_course_year(course_year_id)?;
                let closed = repo
                    .find_by_id(course_year_id)?
                    .ok_or(NotFoundError::CourseYear(course_year_id))?;
                Ok((closed, locked))
            })
            .inspect_err(|e| log_rejection(OperationType::CloseCourseYear, e))?;

        tracing::info!("学年已结业: id={}, 锁定评分={}", closed.id, locked);
        self.audit.record(
            &format!("学年结业: {}", closed.name),
            OperationType::CloseCourseYear,
            operator,
        );
        Ok(closed)
    }

    /// 当前学年（只读）
    ///
    /// 有 active 学年时返回之，否则回退到开始时间最晚的学年；不代表可写。
    pub fn get_current(&self) -> EngineResult<Option<CourseYear>> {
        self.db.read(|conn| -> EngineResult<_> {
            let repo = CourseYearRepository::new(conn);
            match repo.find_active()? {
                Some(active) => Ok(Some(active)),
                None => Ok(repo.find_latest_started()?),
            }
        })
    }

    pub fn get_course_year(&self, course_year_id: i64) -> EngineResult<CourseYear> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(CourseYearRepository::new(conn)
                .find_by_id(course_year_id)?
                .ok_or(NotFoundError::CourseYear(course_year_id))?)
        })
    }

    /// 全部学年（开始时间倒序）
    pub fn list_course_years(&self) -> EngineResult<Vec<CourseYear>> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(CourseYearRepository::new(conn).list_all()?)
        })
    }
}

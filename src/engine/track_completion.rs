// ==========================================
// 学业进程管理系统 - 方向完成判定
// ==========================================
// 职责:
// - 学生是否在某学年通过方向全部必修学科（每科取该学年最近一次评分，>= 3）
// - 学生是否曾完成某方向 / 已完成的方向（理科优先）
// ==========================================

use crate::db::Database;
use crate::domain::evaluation::Evaluation;
use crate::domain::types::{Subject, Track};
use crate::engine::error::EngineResult;
use crate::repository::{EnrollmentRepository, EvaluationRepository, RepositoryResult};
use rusqlite::Connection;

/// 每门学科最近一次评分（输入须按评分时间倒序）
fn latest_per_subject(evaluations: &[Evaluation], subject: Subject) -> Option<&Evaluation> {
    evaluations.iter().find(|e| e.subject == subject)
}

pub(crate) fn has_passed_track_in_course_year_in(
    conn: &Connection,
    student_id: i64,
    track: Track,
    course_year_id: i64,
) -> RepositoryResult<bool> {
    let evaluations =
        EvaluationRepository::new(conn).list_for_student_in_year(student_id, course_year_id)?;

    Ok(track.required_subjects().iter().all(|&subject| {
        latest_per_subject(&evaluations, subject)
            .map(|e| e.is_passing())
            .unwrap_or(false)
    }))
}

pub(crate) fn has_ever_completed_track_in(
    conn: &Connection,
    student_id: i64,
    track: Track,
) -> RepositoryResult<bool> {
    let course_years = EnrollmentRepository::new(conn).course_years_for_track(student_id, track)?;
    for course_year_id in course_years {
        if has_passed_track_in_course_year_in(conn, student_id, track, course_year_id)? {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn completed_track_in(conn: &Connection, student_id: i64) -> RepositoryResult<Option<Track>> {
    for track in Track::ALL {
        if has_ever_completed_track_in(conn, student_id, track)? {
            return Ok(Some(track));
        }
    }
    Ok(None)
}

// ==========================================
// TrackCompletionTracker
// ==========================================
pub struct TrackCompletionTracker {
    db: Database,
}

impl TrackCompletionTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn has_passed_track_in_course_year(
        &self,
        student_id: i64,
        track: Track,
        course_year_id: i64,
    ) -> EngineResult<bool> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(has_passed_track_in_course_year_in(conn, student_id, track, course_year_id)?)
        })
    }

    pub fn has_ever_completed_track(&self, student_id: i64, track: Track) -> EngineResult<bool> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(has_ever_completed_track_in(conn, student_id, track)?)
        })
    }

    /// 已完成的方向（理科优先），未完成返回 None
    pub fn completed_track(&self, student_id: i64) -> EngineResult<Option<Track>> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(completed_track_in(conn, student_id)?)
        })
    }
}

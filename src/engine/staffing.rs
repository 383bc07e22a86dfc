// ==========================================
// 学业进程管理系统 - 教室师资校验
// ==========================================
// 职责: 判断教室在某学年是否为方向的每门必修学科都配有在职教师
// 红线: 纯读，无副作用
// ==========================================

use crate::db::Database;
use crate::domain::types::{Subject, Track};
use crate::engine::error::EngineResult;
use crate::repository::{ClassroomRepository, RepositoryResult};
use rusqlite::Connection;

// ==========================================
// 事务内可复用的查询（由其他引擎在写事务中调用）
// ==========================================

/// 方向必修学科中缺少在职教师的学科（按方向定义顺序）
pub(crate) fn missing_subjects_in(
    conn: &Connection,
    classroom_id: i64,
    track: Track,
    course_year_id: i64,
) -> RepositoryResult<Vec<Subject>> {
    let staffed = ClassroomRepository::new(conn).staffed_subjects(classroom_id, course_year_id)?;
    Ok(track
        .required_subjects()
        .iter()
        .copied()
        .filter(|subject| !staffed.contains(subject))
        .collect())
}

pub(crate) fn is_staffing_complete_in(
    conn: &Connection,
    classroom_id: i64,
    track: Track,
    course_year_id: i64,
) -> RepositoryResult<bool> {
    Ok(missing_subjects_in(conn, classroom_id, track, course_year_id)?.is_empty())
}

// ==========================================
// ClassroomStaffingValidator
// ==========================================
pub struct ClassroomStaffingValidator {
    db: Database,
}

impl ClassroomStaffingValidator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 教室在该学年是否师资完整
    pub fn is_staffing_complete(
        &self,
        classroom_id: i64,
        track: Track,
        course_year_id: i64,
    ) -> EngineResult<bool> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(is_staffing_complete_in(conn, classroom_id, track, course_year_id)?)
        })
    }

    /// 诊断: 缺少教师的必修学科
    pub fn missing_subjects(
        &self,
        classroom_id: i64,
        track: Track,
        course_year_id: i64,
    ) -> EngineResult<Vec<Subject>> {
        self.db.read(|conn| -> EngineResult<_> {
            Ok(missing_subjects_in(conn, classroom_id, track, course_year_id)?)
        })
    }
}

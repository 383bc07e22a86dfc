// ==========================================
// 学业进程管理系统 - 注册数据仓储
// ==========================================
// 约束: UNIQUE(student_id, track, course_year_id)
// 触发器: CLASSROOM_FULL / ENROLLMENT_LIMIT（见 migrations/v0.1_init.sql）
// ==========================================

use crate::domain::enrollment::Enrollment;
use crate::domain::types::Track;
use crate::repository::error::RepositoryResult;
use crate::repository::row_codec::{format_ts, parse_track, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT e.id, e.student_id, e.classroom_id, e.track, e.course_year_id, e.enrollment_date
    FROM enrollment e
"#;

pub struct EnrollmentRepository<'c> {
    conn: &'c Connection,
}

impl<'c> EnrollmentRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Enrollment>> {
        let sql = format!("{} WHERE e.id = ?1", SELECT_COLUMNS);
        let enrollment = self.conn.query_row(&sql, params![id], map_enrollment).optional()?;
        Ok(enrollment)
    }

    pub fn exists_for(
        &self,
        student_id: i64,
        track: Track,
        course_year_id: i64,
    ) -> RepositoryResult<bool> {
        let exists: bool = self.conn.query_row(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM enrollment
                WHERE student_id = ?1 AND track = ?2 AND course_year_id = ?3
            )
            "#,
            params![student_id, track.to_db_str(), course_year_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// 学生终身注册次数
    pub fn count_for_student(&self, student_id: i64) -> RepositoryResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM enrollment WHERE student_id = ?1",
            params![student_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 教室在该学年的就坐人数（在籍且仍就坐于该教室）
    pub fn count_seated(&self, classroom_id: i64, course_year_id: i64) -> RepositoryResult<i64> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM enrollment e
            JOIN student s ON s.id = e.student_id
            WHERE e.classroom_id = ?1
              AND e.course_year_id = ?2
              AND s.active = 1
              AND s.classroom_id = e.classroom_id
            "#,
            params![classroom_id, course_year_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn list_for_student(&self, student_id: i64) -> RepositoryResult<Vec<Enrollment>> {
        let sql = format!(
            "{} WHERE e.student_id = ?1 ORDER BY e.enrollment_date, e.id",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id], map_enrollment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_for_student_in_year(
        &self,
        student_id: i64,
        course_year_id: i64,
    ) -> RepositoryResult<Vec<Enrollment>> {
        let sql = format!(
            "{} WHERE e.student_id = ?1 AND e.course_year_id = ?2 ORDER BY e.id",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id, course_year_id], map_enrollment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 学年内在籍学生的全部注册
    pub fn list_active_students_in_year(&self, course_year_id: i64) -> RepositoryResult<Vec<Enrollment>> {
        let sql = format!(
            r#"{}
            JOIN student s ON s.id = e.student_id
            WHERE e.course_year_id = ?1 AND s.active = 1
            ORDER BY e.student_id, e.id"#,
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![course_year_id], map_enrollment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 学生以该方向注册过的学年
    pub fn course_years_for_track(&self, student_id: i64, track: Track) -> RepositoryResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT course_year_id
            FROM enrollment
            WHERE student_id = ?1 AND track = ?2
            ORDER BY course_year_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![student_id, track.to_db_str()], |row| row.get(0))?
            .collect::<SqliteResult<Vec<i64>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 写入
    // ==========================================

    pub fn insert(
        &self,
        student_id: i64,
        classroom_id: i64,
        track: Track,
        course_year_id: i64,
        enrollment_date: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO enrollment (student_id, classroom_id, track, course_year_id, enrollment_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                student_id,
                classroom_id,
                track.to_db_str(),
                course_year_id,
                format_ts(enrollment_date)
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn move_to_classroom(
        &self,
        id: i64,
        classroom_id: i64,
        enrollment_date: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE enrollment SET classroom_id = ?2, enrollment_date = ?3 WHERE id = ?1",
            params![id, classroom_id, format_ts(enrollment_date)],
        )?;
        Ok(rows)
    }
}

fn map_enrollment(row: &Row) -> rusqlite::Result<Enrollment> {
    let track_raw: String = row.get(3)?;
    let date_raw: String = row.get(5)?;
    Ok(Enrollment {
        id: row.get(0)?,
        student_id: row.get(1)?,
        classroom_id: row.get(2)?,
        track: parse_track(3, &track_raw)?,
        course_year_id: row.get(4)?,
        enrollment_date: parse_ts(5, &date_raw)?,
    })
}

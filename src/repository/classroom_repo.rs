// ==========================================
// 学业进程管理系统 - 教室与排课数据仓储
// ==========================================
// 表: classroom / classroom_teacher
// 约束: UNIQUE(classroom_id, subject, course_year_id) 由存储层保证
// ==========================================

use crate::domain::classroom::{Classroom, ClassroomTeacherAssignment};
use crate::domain::types::{Subject, Track};
use crate::repository::error::RepositoryResult;
use crate::repository::row_codec::{parse_subject, parse_track};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

const ASSIGNMENT_COLUMNS: &str = r#"
    SELECT id, classroom_id, teacher_id, subject, course_year_id
    FROM classroom_teacher
"#;

pub struct ClassroomRepository<'c> {
    conn: &'c Connection,
}

impl<'c> ClassroomRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==========================================
    // 教室
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Classroom>> {
        let classroom = self
            .conn
            .query_row(
                "SELECT id, number, track FROM classroom WHERE id = ?1",
                params![id],
                map_classroom,
            )
            .optional()?;
        Ok(classroom)
    }

    pub fn number_exists(&self, number: i32) -> RepositoryResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM classroom WHERE number = ?1)",
            params![number],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn insert(&self, number: i32, track: Track) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO classroom (number, track) VALUES (?1, ?2)",
            params![number, track.to_db_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_track(&self, id: i64, track: Track) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE classroom SET track = ?2 WHERE id = ?1",
            params![id, track.to_db_str()],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 排课 (classroom_teacher)
    // ==========================================

    /// (教室, 学科, 学年) 唯一的排课记录
    pub fn find_assignment(
        &self,
        classroom_id: i64,
        subject: Subject,
        course_year_id: i64,
    ) -> RepositoryResult<Option<ClassroomTeacherAssignment>> {
        let sql = format!(
            "{} WHERE classroom_id = ?1 AND subject = ?2 AND course_year_id = ?3",
            ASSIGNMENT_COLUMNS
        );
        let assignment = self
            .conn
            .query_row(
                &sql,
                params![classroom_id, subject.to_db_str(), course_year_id],
                map_assignment,
            )
            .optional()?;
        Ok(assignment)
    }

    pub fn find_teacher_assignment(
        &self,
        classroom_id: i64,
        teacher_id: i64,
        course_year_id: i64,
    ) -> RepositoryResult<Option<ClassroomTeacherAssignment>> {
        let sql = format!(
            "{} WHERE classroom_id = ?1 AND teacher_id = ?2 AND course_year_id = ?3",
            ASSIGNMENT_COLUMNS
        );
        let assignment = self
            .conn
            .query_row(&sql, params![classroom_id, teacher_id, course_year_id], map_assignment)
            .optional()?;
        Ok(assignment)
    }

    pub fn list_assignments(
        &self,
        classroom_id: i64,
        course_year_id: i64,
    ) -> RepositoryResult<Vec<ClassroomTeacherAssignment>> {
        let sql = format!(
            "{} WHERE classroom_id = ?1 AND course_year_id = ?2 ORDER BY subject",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![classroom_id, course_year_id], map_assignment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 由在职教师承担的学科（排课学科 = 教师学科）
    pub fn staffed_subjects(
        &self,
        classroom_id: i64,
        course_year_id: i64,
    ) -> RepositoryResult<Vec<Subject>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT ct.subject
            FROM classroom_teacher ct
            JOIN teacher t ON t.id = ct.teacher_id
            WHERE ct.classroom_id = ?1
              AND ct.course_year_id = ?2
              AND t.active = 1
              AND t.subject = ct.subject
            "#,
        )?;
        let subjects = stmt
            .query_map(params![classroom_id, course_year_id], |row| {
                let raw: String = row.get(0)?;
                parse_subject(0, &raw)
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(subjects)
    }

    pub fn insert_assignment(
        &self,
        classroom_id: i64,
        teacher_id: i64,
        subject: Subject,
        course_year_id: i64,
    ) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO classroom_teacher (classroom_id, teacher_id, subject, course_year_id)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![classroom_id, teacher_id, subject.to_db_str(), course_year_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete_assignment(&self, assignment_id: i64) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "DELETE FROM classroom_teacher WHERE id = ?1",
            params![assignment_id],
        )?;
        Ok(rows)
    }

    /// 教师持有的排课数（全部学年）
    pub fn count_for_teacher(&self, teacher_id: i64) -> RepositoryResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM classroom_teacher WHERE teacher_id = ?1",
            params![teacher_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 教室中由在职教师持有的排课数（全部学年）
    pub fn count_active_teacher_assignments(&self, classroom_id: i64) -> RepositoryResult<i64> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM classroom_teacher ct
            JOIN teacher t ON t.id = ct.teacher_id
            WHERE ct.classroom_id = ?1 AND t.active = 1
            "#,
            params![classroom_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 将在职教师的排课改挂到新学年
    pub fn restamp_active_assignments(&self, new_course_year_id: i64) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            r#"
            UPDATE classroom_teacher
            SET course_year_id = ?1
            WHERE course_year_id <> ?1
              AND teacher_id IN (SELECT id FROM teacher WHERE active = 1)
            "#,
            params![new_course_year_id],
        )?;
        Ok(rows)
    }
}

fn map_classroom(row: &Row) -> rusqlite::Result<Classroom> {
    let track_raw: String = row.get(2)?;
    Ok(Classroom {
        id: row.get(0)?,
        number: row.get(1)?,
        track: parse_track(2, &track_raw)?,
    })
}

fn map_assignment(row: &Row) -> rusqlite::Result<ClassroomTeacherAssignment> {
    let subject_raw: String = row.get(3)?;
    Ok(ClassroomTeacherAssignment {
        id: row.get(0)?,
        classroom_id: row.get(1)?,
        teacher_id: row.get(2)?,
        subject: parse_subject(3, &subject_raw)?,
        course_year_id: row.get(4)?,
    })
}

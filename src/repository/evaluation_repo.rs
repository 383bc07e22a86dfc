// ==========================================
// 学业进程管理系统 - 评分数据仓储
// ==========================================
// 约束: UNIQUE(student_id, subject, course_year_id)，CHECK grade 0..5
// ==========================================

use crate::domain::evaluation::Evaluation;
use crate::domain::types::Subject;
use crate::repository::error::RepositoryResult;
use crate::repository::row_codec::{format_ts, parse_subject, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT id, student_id, teacher_id, subject, course_year_id,
           grade, evaluation_date, editable
    FROM evaluation
"#;

/// 新评分记录
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub student_id: i64,
    pub teacher_id: i64,
    pub subject: Subject,
    pub course_year_id: i64,
    pub grade: i32,
    pub evaluation_date: NaiveDateTime,
}

pub struct EvaluationRepository<'c> {
    conn: &'c Connection,
}

impl<'c> EvaluationRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Evaluation>> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let evaluation = self.conn.query_row(&sql, params![id], map_evaluation).optional()?;
        Ok(evaluation)
    }

    pub fn exists_for(
        &self,
        student_id: i64,
        subject: Subject,
        course_year_id: i64,
    ) -> RepositoryResult<bool> {
        let exists: bool = self.conn.query_row(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM evaluation
                WHERE student_id = ?1 AND subject = ?2 AND course_year_id = ?3
            )
            "#,
            params![student_id, subject.to_db_str(), course_year_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// 学生在学年内的评分，按评分时间倒序
    pub fn list_for_student_in_year(
        &self,
        student_id: i64,
        course_year_id: i64,
    ) -> RepositoryResult<Vec<Evaluation>> {
        let sql = format!(
            "{} WHERE student_id = ?1 AND course_year_id = ?2 ORDER BY evaluation_date DESC, id DESC",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id, course_year_id], map_evaluation)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 学生在某个自然年内被评分的学科
    pub fn subjects_in_calendar_year(
        &self,
        student_id: i64,
        calendar_year: i32,
    ) -> RepositoryResult<Vec<Subject>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT subject
            FROM evaluation
            WHERE student_id = ?1 AND strftime('%Y', evaluation_date) = ?2
            "#,
        )?;
        let subjects = stmt
            .query_map(params![student_id, format!("{:04}", calendar_year)], |row| {
                let raw: String = row.get(0)?;
                parse_subject(0, &raw)
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(subjects)
    }

    pub fn list_for_student(&self, student_id: i64) -> RepositoryResult<Vec<Evaluation>> {
        let sql = format!(
            "{} WHERE student_id = ?1 ORDER BY evaluation_date DESC, id DESC",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id], map_evaluation)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn exists_by_teacher(&self, teacher_id: i64) -> RepositoryResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM evaluation WHERE teacher_id = ?1)",
            params![teacher_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // ==========================================
    // 写入
    // ==========================================

    pub fn insert(&self, evaluation: &NewEvaluation) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO evaluation (
                student_id, teacher_id, subject, course_year_id,
                grade, evaluation_date, editable
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
            "#,
            params![
                evaluation.student_id,
                evaluation.teacher_id,
                evaluation.subject.to_db_str(),
                evaluation.course_year_id,
                evaluation.grade,
                format_ts(evaluation.evaluation_date),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_grade(
        &self,
        id: i64,
        grade: i32,
        evaluation_date: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE evaluation SET grade = ?2, evaluation_date = ?3 WHERE id = ?1",
            params![id, grade, format_ts(evaluation_date)],
        )?;
        Ok(rows)
    }

    pub fn delete(&self, id: i64) -> RepositoryResult<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM evaluation WHERE id = ?1", params![id])?;
        Ok(rows)
    }

    /// 锁定学年内全部评分（结业时）
    pub fn lock_course_year(&self, course_year_id: i64) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE evaluation SET editable = 0 WHERE course_year_id = ?1",
            params![course_year_id],
        )?;
        Ok(rows)
    }
}

fn map_evaluation(row: &Row) -> rusqlite::Result<Evaluation> {
    let subject_raw: String = row.get(3)?;
    let date_raw: String = row.get(6)?;
    Ok(Evaluation {
        id: row.get(0)?,
        student_id: row.get(1)?,
        teacher_id: row.get(2)?,
        subject: parse_subject(3, &subject_raw)?,
        course_year_id: row.get(4)?,
        grade: row.get(5)?,
        evaluation_date: parse_ts(6, &date_raw)?,
        editable: row.get(7)?,
    })
}

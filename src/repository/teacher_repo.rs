// ==========================================
// 学业进程管理系统 - 教师数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::teacher::{NewTeacher, Teacher};
use crate::domain::types::Subject;
use crate::repository::error::RepositoryResult;
use crate::repository::row_codec::parse_subject;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct TeacherRepository<'c> {
    conn: &'c Connection,
}

impl<'c> TeacherRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Teacher>> {
        let teacher = self
            .conn
            .query_row(
                "SELECT id, full_name, national_id, subject, active FROM teacher WHERE id = ?1",
                params![id],
                map_teacher,
            )
            .optional()?;
        Ok(teacher)
    }

    pub fn insert(&self, teacher: &NewTeacher) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO teacher (full_name, national_id, subject, active) VALUES (?1, ?2, ?3, 1)",
            params![
                teacher.full_name.trim(),
                teacher.national_id,
                teacher.subject.to_db_str()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_subject(&self, id: i64, subject: Subject) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE teacher SET subject = ?2 WHERE id = ?1",
            params![id, subject.to_db_str()],
        )?;
        Ok(rows)
    }

    pub fn set_active(&self, id: i64, active: bool) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE teacher SET active = ?2 WHERE id = ?1",
            params![id, active],
        )?;
        Ok(rows)
    }
}

fn map_teacher(row: &Row) -> rusqlite::Result<Teacher> {
    let subject_raw: String = row.get(3)?;
    Ok(Teacher {
        id: row.get(0)?,
        full_name: row.get(1)?,
        national_id: row.get(2)?,
        subject: parse_subject(3, &subject_raw)?,
        active: row.get(4)?,
    })
}

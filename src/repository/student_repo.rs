// ==========================================
// 学业进程管理系统 - 学生数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 借用 &Connection，事务内传入 &Transaction 即可（Deref）
// ==========================================

use crate::domain::student::{NewStudent, Student};
use crate::domain::types::Track;
use crate::repository::error::RepositoryResult;
use crate::repository::row_codec::{format_ts, parse_opt_track, parse_opt_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT id, full_name, national_id, active, withdrawal_date,
           restoration_date, track, classroom_id
    FROM student
"#;

pub struct StudentRepository<'c> {
    conn: &'c Connection,
}

impl<'c> StudentRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Student>> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let student = self
            .conn
            .query_row(&sql, params![id], map_student)
            .optional()?;
        Ok(student)
    }

    /// 身份证号是否已被学生或教师占用
    pub fn national_id_in_use(&self, national_id: &str) -> RepositoryResult<bool> {
        let used: bool = self.conn.query_row(
            r#"
            SELECT EXISTS(SELECT 1 FROM student WHERE national_id = ?1)
                OR EXISTS(SELECT 1 FROM teacher WHERE national_id = ?1)
            "#,
            params![national_id],
            |row| row.get(0),
        )?;
        Ok(used)
    }

    /// 当前就坐于教室的在籍学生数（不区分学年）
    pub fn count_active_in_classroom(&self, classroom_id: i64) -> RepositoryResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM student WHERE classroom_id = ?1 AND active = 1",
            params![classroom_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 写入
    // ==========================================

    pub fn insert(&self, student: &NewStudent) -> RepositoryResult<i64> {
        self.conn.execute(
            "INSERT INTO student (full_name, national_id, active) VALUES (?1, ?2, 1)",
            params![student.full_name.trim(), student.national_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// 设置学生当前教室与方向（注册时）
    pub fn set_placement(&self, id: i64, classroom_id: i64, track: Track) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE student SET classroom_id = ?2, track = ?3 WHERE id = ?1",
            params![id, classroom_id, track.to_db_str()],
        )?;
        Ok(rows)
    }

    pub fn set_classroom(&self, id: i64, classroom_id: i64) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            "UPDATE student SET classroom_id = ?2 WHERE id = ?1",
            params![id, classroom_id],
        )?;
        Ok(rows)
    }

    /// 退学: 置为非在籍并清空教室，保留方向与历史
    pub fn mark_withdrawn(&self, id: i64, at: NaiveDateTime) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            r#"
            UPDATE student
            SET active = 0, classroom_id = NULL, withdrawal_date = ?2
            WHERE id = ?1
            "#,
            params![id, format_ts(at)],
        )?;
        Ok(rows)
    }

    /// 复学: 恢复在籍，清空退学时间
    pub fn mark_restored(&self, id: i64, at: NaiveDateTime) -> RepositoryResult<usize> {
        let rows = self.conn.execute(
            r#"
            UPDATE student
            SET active = 1, withdrawal_date = NULL, restoration_date = ?2
            WHERE id = ?1
            "#,
            params![id, format_ts(at)],
        )?;
        Ok(rows)
    }
}

fn map_student(row: &Row) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        full_name: row.get(1)?,
        national_id: row.get(2)?,
        active: row.get(3)?,
        withdrawal_date: parse_opt_ts(4, row.get(4)?)?,
        restoration_date: parse_opt_ts(5, row.get(5)?)?,
        track: parse_opt_track(6, row.get(6)?)?,
        classroom_id: row.get(7)?,
    })
}

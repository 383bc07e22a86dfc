// ==========================================
// 学业进程管理系统 - 学年数据仓储
// ==========================================
// 约束: 部分唯一索引 ux_course_year_single_active 保证至多一个 active
// ==========================================

use crate::domain::course_year::CourseYear;
use crate::repository::error::RepositoryResult;
use crate::repository::row_codec::{format_ts, parse_opt_ts, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, start_date, end_date, active, closed_at
    FROM course_year
"#;

pub struct CourseYearRepository<'c> {
    conn: &'c Connection,
}

impl<'c> CourseYearRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<CourseYear>> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let cy = self.conn.query_row(&sql, params![id], map_course_year).optional()?;
        Ok(cy)
    }

    pub fn find_active(&self) -> RepositoryResult<Option<CourseYear>> {
        let sql = format!("{} WHERE active = 1 LIMIT 1", SELECT_COLUMNS);
        let cy = self.conn.query_row(&sql, [], map_course_year).optional()?;
        Ok(cy)
    }

    /// 开始时间最晚的学年
    pub fn find_latest_started(&self) -> RepositoryResult<Option<CourseYear>> {
        let sql = format!("{} ORDER BY start_date DESC, id DESC LIMIT 1", SELECT_COLUMNS);
        let cy = self.conn.query_row(&sql, [], map_course_year).optional()?;
        Ok(cy)
    }

    /// 与 [start, end] 有交集（含端点）的任一学年
    pub fn find_overlapping(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepositoryResult<Option<CourseYear>> {
        let sql = format!(
            "{} WHERE start_date <= ?2 AND end_date >= ?1 ORDER BY start_date LIMIT 1",
            SELECT_COLUMNS
        );
        let cy = self
            .conn
            .query_row(&sql, params![format_ts(start), format_ts(end)], map_course_year)
            .optional()?;
        Ok(cy)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<CourseYear>> {
        let sql = format!("{} ORDER BY start_date DESC, id DESC", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_course_year)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count_all(&self) -> RepositoryResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM course_year", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 插入并直接置为 active
    pub fn insert_active(
        &self,
        name: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO course_year (name, start_date, end_date, active)
            VALUES (?1, ?2, ?3, 1)
            "#,
            params![name.trim(), format_ts(start), format_ts(end)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// 结业: 取消 active，结束时间改写为结业时间
    pub fn mark_closed(&self, id: i64, closed_at: NaiveDateTime) -> RepositoryResult<usize> {
        let ts = format_ts(closed_at);
        let rows = self.conn.execute(
            r#"
            UPDATE course_year
            SET active = 0, end_date = ?2, closed_at = ?2
            WHERE id = ?1 AND active = 1
            "#,
            params![id, ts],
        )?;
        Ok(rows)
    }
}

fn map_course_year(row: &Row) -> rusqlite::Result<CourseYear> {
    let start_raw: String = row.get(2)?;
    let end_raw: String = row.get(3)?;
    Ok(CourseYear {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: parse_ts(2, &start_raw)?,
        end_date: parse_ts(3, &end_raw)?,
        active: row.get(4)?,
        closed_at: parse_opt_ts(5, row.get(5)?)?,
    })
}

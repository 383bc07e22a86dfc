// ==========================================
// 学业进程管理系统 - 审计日志数据仓储
// ==========================================
// 表: audit_log
// 红线: 只追加，不更新/删除
// ==========================================

use crate::domain::audit_log::AuditEntry;
use crate::repository::error::RepositoryResult;
use crate::repository::row_codec::{format_ts, parse_ts};
use rusqlite::{params, Connection, Result as SqliteResult, Row};

pub struct AuditLogRepository<'c> {
    conn: &'c Connection,
}

impl<'c> AuditLogRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// 插入审计记录
    ///
    /// # 返回
    /// - `Ok(audit_id)`: 成功插入
    pub fn insert(&self, entry: &AuditEntry) -> RepositoryResult<String> {
        self.conn.execute(
            r#"
            INSERT INTO audit_log (audit_id, operation, message, actor, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                entry.audit_id,
                entry.operation,
                entry.message,
                entry.actor,
                format_ts(entry.recorded_at),
            ],
        )?;
        Ok(entry.audit_id.clone())
    }

    /// 最近的审计记录（按时间倒序）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT audit_id, operation, message, actor, recorded_at
            FROM audit_log
            ORDER BY recorded_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], map_entry)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_by_operation(&self, operation: &str, limit: usize) -> RepositoryResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT audit_id, operation, message, actor, recorded_at
            FROM audit_log
            WHERE operation = ?1
            ORDER BY recorded_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt
            .query_map(params![operation, limit as i64], map_entry)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_entry(row: &Row) -> rusqlite::Result<AuditEntry> {
    let recorded_raw: String = row.get(4)?;
    Ok(AuditEntry {
        audit_id: row.get(0)?,
        operation: row.get(1)?,
        message: row.get(2)?,
        actor: row.get(3)?,
        recorded_at: parse_ts(4, &recorded_raw)?,
    })
}

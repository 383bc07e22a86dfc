// ==========================================
// 学业进程管理系统 - 行映射辅助
// ==========================================
// 职责: TEXT 时间戳与枚举字段的编解码（仅供仓储层使用）
// ==========================================

use crate::domain::types::{Subject, Track};
use crate::repository::error::RepositoryError;
use chrono::NaiveDateTime;
use rusqlite::types::Type;

/// 时间戳存储格式
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<NaiveDateTime>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

fn bad_value(idx: usize, field: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("无法识别的取值: {}", raw),
        }),
    )
}

pub fn parse_track(idx: usize, raw: &str) -> rusqlite::Result<Track> {
    Track::from_db_str(raw).ok_or_else(|| bad_value(idx, "track", raw))
}

pub fn parse_opt_track(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<Track>> {
    raw.map(|s| parse_track(idx, &s)).transpose()
}

pub fn parse_subject(idx: usize, raw: &str) -> rusqlite::Result<Subject> {
    Subject::from_db_str(raw).ok_or_else(|| bad_value(idx, "subject", raw))
}

// ==========================================
// 学业进程管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// 说明: 业务不变量（容量/上限/及格线）不可配置，见 domain::rules
// ==========================================

use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 默认复注册窗口（7、8 月）
pub const DEFAULT_REENROLL_WINDOW_MONTHS: [u32; 2] = [7, 8];

/// 默认操作人
pub const DEFAULT_ACTOR: &str = "Desconocido";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!("配置已更新: {}={}", key, value);
        Ok(())
    }

    // ===== 注册配置 =====

    /// 允许调整注册（updateEnrollment）的月份
    pub fn get_reenroll_window_months(&self) -> Result<Vec<u32>, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::REENROLL_WINDOW_MONTHS, "7,8")?;
        Ok(parse_month_list(&value))
    }

    // ===== 审计配置 =====

    pub fn is_audit_enabled(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::AUDIT_ENABLED, "true")?;
        Ok(parse_bool_flag(&value, true))
    }

    pub fn get_default_actor(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::AUDIT_DEFAULT_ACTOR, DEFAULT_ACTOR)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(DEFAULT_ACTOR.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }
}

/// 解析逗号分隔的月份列表；非法项忽略，全部非法时回退默认值
fn parse_month_list(value: &str) -> Vec<u32> {
    let months: Vec<u32> = value
        .split(',')
        .filter_map(|s| s.trim().parse::<u32>().ok())
        .filter(|&m| (1..=12).contains(&m))
        .collect();

    if months.is_empty() {
        DEFAULT_REENROLL_WINDOW_MONTHS.to_vec()
    } else {
        months
    }
}

fn parse_bool_flag(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 注册
    pub const REENROLL_WINDOW_MONTHS: &str = "enrollment.reenroll_window_months";

    // 审计
    pub const AUDIT_ENABLED: &str = "audit.enabled";
    pub const AUDIT_DEFAULT_ACTOR: &str = "audit.default_actor";
}

// ==========================================
// 学业进程管理系统 - 复注册时段
// ==========================================
// 职责: 判断 updateEnrollment 是否处于开放时段
// 说明: 时段由外部决定（配置），引擎只断言其开放
// ==========================================

use crate::config::ConfigManager;
use chrono::{Datelike, NaiveDateTime};
use std::error::Error;

pub trait ReenrollmentWindow: Send + Sync {
    fn is_open(&self, now: NaiveDateTime) -> bool;
}

/// 按月份开放（默认 7、8 月）
#[derive(Debug, Clone)]
pub struct MonthWindow {
    months: Vec<u32>,
}

impl MonthWindow {
    pub fn new(months: Vec<u32>) -> Self {
        Self { months }
    }

    /// 从 config_kv 读取 enrollment.reenroll_window_months
    pub fn from_config(config: &ConfigManager) -> Result<Self, Box<dyn Error>> {
        Ok(Self::new(config.get_reenroll_window_months()?))
    }

    pub fn months(&self) -> &[u32] {
        &self.months
    }
}

impl ReenrollmentWindow for MonthWindow {
    fn is_open(&self, now: NaiveDateTime) -> bool {
        self.months.contains(&now.month())
    }
}

/// 始终开放（测试/运维场景）
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl ReenrollmentWindow for AlwaysOpen {
    fn is_open(&self, _now: NaiveDateTime) -> bool {
        true
    }
}

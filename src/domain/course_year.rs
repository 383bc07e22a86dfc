// ==========================================
// 学业进程管理系统 - 学年领域模型
// ==========================================
// 对齐: migrations/v0.1_init.sql course_year 表
// 红线: 全系统同一时刻至多一个 active 学年
// ==========================================

use crate::domain::types::CourseYearStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// CourseYear - 学年
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseYear {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime, // 结业时改写为实际结业时间
    pub active: bool,
    pub closed_at: Option<NaiveDateTime>,
}

impl CourseYear {
    /// 推导学年状态
    pub fn status(&self) -> CourseYearStatus {
        if self.active {
            CourseYearStatus::Active
        } else if self.closed_at.is_some() {
            CourseYearStatus::Closed
        } else {
            CourseYearStatus::Planned
        }
    }

    /// 闭区间重叠判断（端点相接也视为重叠）
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start <= self.end_date && end >= self.start_date
    }
}

// ==========================================
// 学业进程管理系统 - 教师领域模型
// ==========================================
// 对齐: migrations/v0.1_init.sql teacher 表
// ==========================================

use crate::domain::types::Subject;
use serde::{Deserialize, Serialize};

// ==========================================
// Teacher - 教师
// ==========================================
// 红线: 任教期间只教一门学科；持有排课或已评分时不得改科
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: i64,
    pub full_name: String,
    pub national_id: String,
    pub subject: Subject,
    pub active: bool,
}

/// 新教师入职登记
#[derive(Debug, Clone)]
pub struct NewTeacher {
    pub full_name: String,
    pub national_id: String,
    pub subject: Subject,
}

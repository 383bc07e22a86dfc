// ==========================================
// 学业进程管理系统 - 学生领域模型
// ==========================================
// 对齐: migrations/v0.1_init.sql student 表
// 红线: 不持有教室/注册对象引用，只保存 ID
// ==========================================

use crate::domain::types::Track;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Student - 学生
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub full_name: String,
    pub national_id: String, // 与教师共享唯一性

    // ===== 在籍状态 =====
    pub active: bool,
    pub withdrawal_date: Option<NaiveDateTime>,  // 退学时间
    pub restoration_date: Option<NaiveDateTime>, // 复学时间

    // ===== 当前就读位置 =====
    pub track: Option<Track>,
    pub classroom_id: Option<i64>,
}

impl Student {
    /// 是否就坐于指定教室
    pub fn is_seated_in(&self, classroom_id: i64) -> bool {
        self.active && self.classroom_id == Some(classroom_id)
    }
}

/// 新学生入学登记
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub full_name: String,
    pub national_id: String,
}

// ==========================================
// 学业进程管理系统 - 注册领域模型
// ==========================================
// 对齐: migrations/v0.1_init.sql enrollment 表
// 唯一键: (student_id, track, course_year_id)
// ==========================================

use crate::domain::types::Track;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Enrollment - 注册
// ==========================================
// 学生与学年双方共同拥有，不属于任何一方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub classroom_id: i64,
    pub track: Track,
    pub course_year_id: i64,
    pub enrollment_date: NaiveDateTime,
}

// ==========================================
// 学业进程管理系统 - 评分领域模型
// ==========================================
// 对齐: migrations/v0.1_init.sql evaluation 表
// 唯一键: (student_id, subject, course_year_id)
// ==========================================

use crate::domain::rules::is_passing_grade;
use crate::domain::types::Subject;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Evaluation - 评分
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub subject: Subject,
    pub course_year_id: i64,
    pub grade: i32, // 0..=5
    pub evaluation_date: NaiveDateTime,
    pub editable: bool, // 学年结业后锁定
}

impl Evaluation {
    pub fn is_passing(&self) -> bool {
        is_passing_grade(self.grade)
    }
}

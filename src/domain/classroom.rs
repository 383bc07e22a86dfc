// ==========================================
// 学业进程管理系统 - 教室与排课领域模型
// ==========================================
// 对齐: migrations/v0.1_init.sql classroom / classroom_teacher 表
// ==========================================

use crate::domain::types::{Subject, Track};
use serde::{Deserialize, Serialize};

// ==========================================
// Classroom - 教室
// ==========================================
// 红线: 有在读学生或在职教师排课时方向不可改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: i64,
    pub number: i32, // 1..=10，唯一
    pub track: Track,
}

// ==========================================
// ClassroomTeacherAssignment - 教室排课
// ==========================================
// 唯一键: (classroom_id, subject, course_year_id)
// 同一学年同一教室同一学科只能有一位教师
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomTeacherAssignment {
    pub id: i64,
    pub classroom_id: i64,
    pub teacher_id: i64,
    pub subject: Subject,
    pub course_year_id: i64,
}

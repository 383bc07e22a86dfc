// ==========================================
// 学业进程管理系统 - 业务规则常量
// ==========================================
// 职责: 固定业务阈值与纯函数校验
// 红线: 这些常量同时写入数据库触发器（migrations/v0.1_init.sql），修改需同步
// ==========================================

use chrono::{Months, NaiveDateTime};

/// 每个教室同时在读的在籍学生上限
pub const CLASSROOM_CAPACITY: i64 = 5;

/// 学生终身注册次数上限
pub const MAX_LIFETIME_ENROLLMENTS: i64 = 3;

/// 成绩下限
pub const GRADE_MIN: i32 = 0;

/// 成绩上限
pub const GRADE_MAX: i32 = 5;

/// 及格线（含）
pub const PASS_GRADE: i32 = 3;

/// 教室编号范围
pub const CLASSROOM_NUMBER_MIN: i32 = 1;
pub const CLASSROOM_NUMBER_MAX: i32 = 10;

/// 学年最长跨度（月）
pub const MAX_COURSE_YEAR_SPAN_MONTHS: u32 = 24;

/// 姓名最大长度
pub const FULL_NAME_MAX_LEN: usize = 250;

/// 身份证号固定位数
pub const NATIONAL_ID_LEN: usize = 11;

pub fn is_valid_grade(grade: i32) -> bool {
    (GRADE_MIN..=GRADE_MAX).contains(&grade)
}

pub fn is_passing_grade(grade: i32) -> bool {
    grade >= PASS_GRADE
}

pub fn is_valid_classroom_number(number: i32) -> bool {
    (CLASSROOM_NUMBER_MIN..=CLASSROOM_NUMBER_MAX).contains(&number)
}

/// 身份证号: 恰好 11 位数字
pub fn is_valid_national_id(national_id: &str) -> bool {
    national_id.len() == NATIONAL_ID_LEN && national_id.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_full_name(full_name: &str) -> bool {
    let trimmed = full_name.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= FULL_NAME_MAX_LEN
}

/// 学年允许的最晚结束时间（开始时间 + 2 年）
pub fn latest_course_year_end(start: NaiveDateTime) -> Option<NaiveDateTime> {
    start.checked_add_months(Months::new(MAX_COURSE_YEAR_SPAN_MONTHS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_grade_bounds() {
        assert!(is_valid_grade(0));
        assert!(is_valid_grade(5));
        assert!(!is_valid_grade(-1));
        assert!(!is_valid_grade(6));

        assert!(!is_passing_grade(2));
        assert!(is_passing_grade(3));
    }

    #[test]
    fn test_national_id_format() {
        assert!(is_valid_national_id("01020304050"));
        assert!(!is_valid_national_id("0102030405"));
        assert!(!is_valid_national_id("0102030405a"));
        assert!(!is_valid_national_id(""));
    }

    #[test]
    fn test_classroom_number_range() {
        assert!(!is_valid_classroom_number(0));
        assert!(is_valid_classroom_number(1));
        assert!(is_valid_classroom_number(10));
        assert!(!is_valid_classroom_number(11));
    }

    #[test]
    fn test_latest_course_year_end() {
        let start = NaiveDate::from_ymd_opt(2026, 9, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let latest = latest_course_year_end(start).unwrap();
        assert_eq!(latest.date(), NaiveDate::from_ymd_opt(2028, 9, 1).unwrap());
    }

    #[test]
    fn test_full_name() {
        assert!(is_valid_full_name("Ana Pérez"));
        assert!(!is_valid_full_name("   "));
        assert!(!is_valid_full_name(&"x".repeat(251)));
    }
}

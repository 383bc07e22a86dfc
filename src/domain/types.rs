// ==========================================
// 学业进程管理系统 - 领域类型定义
// ==========================================
// 职责: 方向(Track)、学科(Subject)、学年状态等枚举
// 红线: 方向的必修学科集合是数据，不是分支逻辑
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 学科 (Subject)
// ==========================================
// 每位教师终身只教授一门学科
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subject {
    Math,        // 数学
    Informatics, // 信息学
    PhysicalEd,  // 体育
    Language,    // 语言
    History,     // 历史
}

impl Subject {
    /// 全部学科
    pub const ALL: [Subject; 5] = [
        Subject::Math,
        Subject::Informatics,
        Subject::PhysicalEd,
        Subject::Language,
        Subject::History,
    ];

    /// 转换为数据库存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Subject::Math => "MATH",
            Subject::Informatics => "INFORMATICS",
            Subject::PhysicalEd => "PHYSICAL_ED",
            Subject::Language => "LANGUAGE",
            Subject::History => "HISTORY",
        }
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "MATH" => Some(Subject::Math),
            "INFORMATICS" => Some(Subject::Informatics),
            "PHYSICAL_ED" => Some(Subject::PhysicalEd),
            "LANGUAGE" => Some(Subject::Language),
            "HISTORY" => Some(Subject::History),
            _ => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 方向 (Track)
// ==========================================
// 新增方向时 required_subjects 的 match 会在编译期报缺失分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Track {
    Sciences, // 理科
    Letras,   // 文科
}

const SCIENCES_SUBJECTS: [Subject; 3] = [Subject::Math, Subject::Informatics, Subject::PhysicalEd];
const LETRAS_SUBJECTS: [Subject; 3] = [Subject::Language, Subject::History, Subject::PhysicalEd];

impl Track {
    /// 判定已完成方向时的检查顺序（理科优先）
    pub const ALL: [Track; 2] = [Track::Sciences, Track::Letras];

    /// 方向的必修学科集合
    pub fn required_subjects(&self) -> &'static [Subject] {
        match self {
            Track::Sciences => &SCIENCES_SUBJECTS,
            Track::Letras => &LETRAS_SUBJECTS,
        }
    }

    /// 学科是否属于本方向必修
    pub fn requires(&self, subject: Subject) -> bool {
        self.required_subjects().contains(&subject)
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Track::Sciences => "SCIENCES",
            Track::Letras => "LETRAS",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "SCIENCES" => Some(Track::Sciences),
            "LETRAS" => Some(Track::Letras),
            _ => None,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 学年状态 (Course Year Status)
// ==========================================
// 线性且不可逆: Planned -> Active -> Closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseYearStatus {
    Planned, // 已登记未启用
    Active,  // 当前学年
    Closed,  // 已结业
}

impl fmt::Display for CourseYearStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseYearStatus::Planned => write!(f, "PLANNED"),
            CourseYearStatus::Active => write!(f, "ACTIVE"),
            CourseYearStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_subjects_per_track() {
        assert_eq!(
            Track::Sciences.required_subjects(),
            &[Subject::Math, Subject::Informatics, Subject::PhysicalEd]
        );
        assert_eq!(
            Track::Letras.required_subjects(),
            &[Subject::Language, Subject::History, Subject::PhysicalEd]
        );

        // 体育是两个方向共同的必修
        assert!(Track::Sciences.requires(Subject::PhysicalEd));
        assert!(Track::Letras.requires(Subject::PhysicalEd));
        assert!(!Track::Sciences.requires(Subject::History));
        assert!(!Track::Letras.requires(Subject::Informatics));
    }

    #[test]
    fn test_db_str_parsing() {
        for subject in Subject::ALL {
            assert_eq!(Subject::from_db_str(subject.to_db_str()), Some(subject));
        }
        assert_eq!(Track::from_db_str(" LETRAS "), Some(Track::Letras));
        assert_eq!(Track::from_db_str("ARTS"), None);
        assert_eq!(Subject::from_db_str("CHEMISTRY"), None);
    }
}

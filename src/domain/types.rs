// ==========================================
// PI 产能对账引擎 - 领域类型定义
// ==========================================
// 职责: 分配类别 / 产能窗口 / 工作项类型
// 红线: 分配类别声明顺序即匹配优先级，不可调整
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 未分配团队/角色的哨兵名称
pub const UNASSIGNED: &str = "Unassigned";

// ==========================================
// 分配类别 (Allocation Category)
// ==========================================
// 顺序: Features > Tech/Platform > KLO > Quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AllocationCategory {
    Features,     // 功能需求
    TechPlatform, // 技术/平台
    Klo,          // 运维保障 (Keep the Lights On)
    Quality,      // 质量
}

impl AllocationCategory {
    /// 全部类别（按声明顺序）
    pub const ALL: [AllocationCategory; 4] = [
        AllocationCategory::Features,
        AllocationCategory::TechPlatform,
        AllocationCategory::Klo,
        AllocationCategory::Quality,
    ];
}

impl fmt::Display for AllocationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationCategory::Features => write!(f, "Features"),
            AllocationCategory::TechPlatform => write!(f, "Tech/Platform"),
            AllocationCategory::Klo => write!(f, "KLO"),
            AllocationCategory::Quality => write!(f, "Quality"),
        }
    }
}

// ==========================================
// 产能窗口 (Capacity Window)
// ==========================================
// EntirePi = beforeFF + afterFF
// CodeFreeze = beforeFF
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapacityWindow {
    EntirePi,
    CodeFreeze,
}

impl CapacityWindow {
    pub const ALL: [CapacityWindow; 2] = [CapacityWindow::EntirePi, CapacityWindow::CodeFreeze];

    /// 按窗口口径计算产能
    pub fn capacity_of(&self, before_ff: i64, after_ff: i64) -> i64 {
        match self {
            CapacityWindow::EntirePi => before_ff + after_ff,
            CapacityWindow::CodeFreeze => before_ff,
        }
    }
}

impl fmt::Display for CapacityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityWindow::EntirePi => write!(f, "Entire PI"),
            CapacityWindow::CodeFreeze => write!(f, "Code Freeze"),
        }
    }
}

// ==========================================
// 工作项类型 (Issue Type)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    Epic,
    Story,
    Bug,
    Dependency,
    Other(String),
}

impl IssueType {
    /// 宽松解析（大小写不敏感，未知类型保留原文）
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "epic" => IssueType::Epic,
            "story" => IssueType::Story,
            "bug" => IssueType::Bug,
            "dependency" => IssueType::Dependency,
            _ => IssueType::Other(trimmed.to_string()),
        }
    }

    /// 是否计入已用产能（Story / Bug）
    pub fn is_point_estimated(&self) -> bool {
        matches!(self, IssueType::Story | IssueType::Bug)
    }

    pub fn is_dependency(&self) -> bool {
        matches!(self, IssueType::Dependency)
    }
}

/// 缺省为空的未知类型
impl Default for IssueType {
    fn default() -> Self {
        IssueType::Other(String::new())
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueType::Epic => write!(f, "Epic"),
            IssueType::Story => write!(f, "Story"),
            IssueType::Bug => write!(f, "Bug"),
            IssueType::Dependency => write!(f, "Dependency"),
            IssueType::Other(name) => write!(f, "{}", name),
        }
    }
}

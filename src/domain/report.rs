// ==========================================
// PI 产能对账引擎 - 汇总报告模型
// ==========================================
// 职责: 产能/使用/剩余指标、排除决策、TOTAL 行
// 红线: 超产能只是报告标记，不是错误
// ==========================================

use crate::domain::types::{AllocationCategory, CapacityWindow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// WindowMetrics - 单窗口指标
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub capacity: i64,
    pub used: i64,
    pub remaining: i64,
    pub planned_load: i64,
    pub planned_remaining: i64,
    pub actual_load: i64,
    pub actual_remaining: i64,
    pub over_capacity: bool, // remaining < 0
}

impl WindowMetrics {
    /// 由基础量派生全部指标
    pub fn compute(capacity: i64, used: i64, planned_load: i64, actual_load: i64) -> Self {
        let remaining = capacity - used;
        Self {
            capacity,
            used,
            remaining,
            planned_load,
            planned_remaining: capacity - planned_load,
            actual_load,
            actual_remaining: capacity - actual_load,
            over_capacity: remaining < 0,
        }
    }

    /// 行累加（用于 TOTAL 行，基于已展示行重新求和）
    pub fn plus(&self, other: &WindowMetrics) -> Self {
        Self::compute(
            self.capacity + other.capacity,
            self.used + other.used,
            self.planned_load + other.planned_load,
            self.actual_load + other.actual_load,
        )
    }
}

pub type WindowTable = BTreeMap<CapacityWindow, WindowMetrics>;

/// 按分配类别的 Story/Bug 点数（四个类别齐全，缺省为 0）
pub type CategoryTable = BTreeMap<AllocationCategory, i64>;

/// 四个类别全为 0 的表
pub fn empty_category_table() -> CategoryTable {
    AllocationCategory::ALL.iter().map(|c| (*c, 0)).collect()
}

/// 单迭代产能与使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationMetrics {
    pub iteration: usize, // 1..=6
    pub capacity: i64,
    pub used: i64,
}

// ==========================================
// RoleReport / TeamReport
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleReport {
    pub role: String,
    pub windows: WindowTable,
    pub iterations: Vec<IterationMetrics>,
    pub by_category: CategoryTable,
}

impl RoleReport {
    pub fn window(&self, window: CapacityWindow) -> WindowMetrics {
        self.windows.get(&window).copied().unwrap_or_default()
    }

    pub fn category(&self, category: AllocationCategory) -> i64 {
        self.by_category.get(&category).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamReport {
    pub team: String,                    // 规范化团队名（报告主键）
    pub display_name: String,
    pub value_stream: Option<String>,
    pub has_capacity_block: bool,        // 产能表中未找到时为 false，产能按 0 计
    pub windows: WindowTable,
    pub iterations: Vec<IterationMetrics>,
    pub by_category: CategoryTable,
    pub roles: BTreeMap<String, RoleReport>,
}

impl TeamReport {
    pub fn window(&self, window: CapacityWindow) -> WindowMetrics {
        self.windows.get(&window).copied().unwrap_or_default()
    }

    pub fn role(&self, role: &str) -> Option<&RoleReport> {
        self.roles.get(role)
    }

    pub fn category(&self, category: AllocationCategory) -> i64 {
        self.by_category.get(&category).copied().unwrap_or(0)
    }
}

// ==========================================
// TotalRow - 展示用 TOTAL 行
// ==========================================
// 口径: TOTAL = subtotal(其余已展示团队) + 特殊团队行
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalRow {
    pub special_team: Option<String>,
    pub subtotal: WindowTable,
    pub special: Option<WindowTable>,
    pub total: WindowTable,
}

impl TotalRow {
    pub fn total(&self, window: CapacityWindow) -> WindowMetrics {
        self.total.get(&window).copied().unwrap_or_default()
    }

    pub fn subtotal(&self, window: CapacityWindow) -> WindowMetrics {
        self.subtotal.get(&window).copied().unwrap_or_default()
    }
}

// ==========================================
// ExclusionDecision - 团队排除决策
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionDecision {
    pub team: String,         // 规范化团队名
    pub display_name: String,
    pub context: String,      // 规范化上下文
    pub excluded: bool,
    pub reason: String,
}

// ==========================================
// UtilizationReport - 引擎唯一输出
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationReport {
    pub context: String,
    pub excluded_teams: BTreeSet<String>,
    pub teams: BTreeMap<String, TeamReport>,
    pub total: TotalRow,
}

impl UtilizationReport {
    pub fn team(&self, team: &str) -> Option<&TeamReport> {
        self.teams.get(team)
    }

    /// 指定窗口下超产能的团队
    pub fn over_capacity_teams(&self, window: CapacityWindow) -> Vec<&str> {
        self.teams
            .values()
            .filter(|t| t.window(window).over_capacity)
            .map(|t| t.team.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_remaining_is_flagged() {
        let m = WindowMetrics::compute(40, 45, 0, 0);
        assert_eq!(m.remaining, -5);
        assert!(m.over_capacity);
    }

    #[test]
    fn test_planned_and_actual_remaining() {
        let m = WindowMetrics::compute(100, 20, 80, 35);
        assert_eq!(m.remaining, 80);
        assert_eq!(m.planned_remaining, 20);
        assert_eq!(m.actual_remaining, 65);
        assert!(!m.over_capacity);
    }

    #[test]
    fn test_plus_recomputes_remaining() {
        let a = WindowMetrics::compute(10, 12, 0, 0);
        let b = WindowMetrics::compute(20, 5, 10, 3);
        let sum = a.plus(&b);
        assert_eq!(sum.capacity, 30);
        assert_eq!(sum.used, 17);
        assert_eq!(sum.remaining, 13);
        assert!(!sum.over_capacity);
    }

    #[test]
    fn test_empty_category_table_has_every_category() {
        let table = empty_category_table();
        assert_eq!(table.len(), AllocationCategory::ALL.len());
        assert!(table.values().all(|v| *v == 0));
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"Klo\""));
    }

    #[test]
    fn test_window_keys_serialize_as_strings() {
        let mut windows = WindowTable::new();
        windows.insert(CapacityWindow::CodeFreeze, WindowMetrics::compute(1, 0, 0, 0));
        let json = serde_json::to_string(&windows).unwrap();
        assert!(json.contains("\"CODE_FREEZE\""));
    }
}

// ==========================================
// PI 产能对账引擎 - 产能领域模型
// ==========================================
// 职责: 产能表快照 / 团队产能块 / 角色产能
// 红线: RoleCapacity.total 永远等于 before_ff + after_ff
// ==========================================

use serde::{Deserialize, Serialize};

/// 每个 PI 的迭代数量
pub const ITERATION_COUNT: usize = 6;

// ==========================================
// CapacityGrid - 产能表不可变快照
// ==========================================
// 用途: Locator 的唯一输入，构造后不再修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityGrid {
    rows: Vec<Vec<String>>,
}

impl CapacityGrid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 最宽一行的列数（行长度允许不一致）
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(|c| c.trim().is_empty()))
    }

    /// 读取单元格（越界返回空串）
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|c| c.as_str())
            .unwrap_or("")
    }

    pub fn row(&self, row: usize) -> &[String] {
        self.rows.get(row).map(|r| r.as_slice()).unwrap_or(&[])
    }
}

// ==========================================
// RoleCapacity - 团队内单角色产能
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCapacity {
    pub role: String,                       // 规范化角色名
    before_ff: i64,                         // Feature Freeze 前产能
    after_ff: i64,                          // Feature Freeze 后产能
    pub by_iteration: [i64; ITERATION_COUNT], // 迭代 1..6 产能
}

impl RoleCapacity {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            before_ff: 0,
            after_ff: 0,
            by_iteration: [0; ITERATION_COUNT],
        }
    }

    pub fn before_ff(&self) -> i64 {
        self.before_ff
    }

    pub fn after_ff(&self) -> i64 {
        self.after_ff
    }

    /// 总产能（派生值，不单独存储）
    pub fn total(&self) -> i64 {
        self.before_ff + self.after_ff
    }

    pub fn add_before_ff(&mut self, value: i64) {
        self.before_ff += value;
    }

    pub fn add_after_ff(&mut self, value: i64) {
        self.after_ff += value;
    }

    pub fn add_iterations(&mut self, values: &[i64; ITERATION_COUNT]) {
        for (slot, v) in self.by_iteration.iter_mut().zip(values.iter()) {
            *slot += v;
        }
    }
}

// ==========================================
// TeamCapacityBlock - 团队产能块
// ==========================================
// 生命周期: 单次 Locator 扫描产出，之后只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCapacityBlock {
    pub team: String,                         // 规范化团队名
    pub display_name: String,                 // 产能表原始名称
    pub value_stream: String,                 // 规范化价值流
    pub roles: Vec<RoleCapacity>,
    pub anchor_row: usize,                    // 锚点位置（用于排查）
    pub anchor_col: usize,
}

impl TeamCapacityBlock {
    pub fn before_ff(&self) -> i64 {
        self.roles.iter().map(|r| r.before_ff()).sum()
    }

    pub fn after_ff(&self) -> i64 {
        self.roles.iter().map(|r| r.after_ff()).sum()
    }

    pub fn total(&self) -> i64 {
        self.before_ff() + self.after_ff()
    }

    pub fn by_iteration(&self) -> [i64; ITERATION_COUNT] {
        let mut sums = [0; ITERATION_COUNT];
        for role in &self.roles {
            for (slot, v) in sums.iter_mut().zip(role.by_iteration.iter()) {
                *slot += v;
            }
        }
        sums
    }

    /// 按规范化角色名查找
    pub fn role(&self, role: &str) -> Option<&RoleCapacity> {
        self.roles.iter().find(|r| r.role == role)
    }
}

// ==========================================
// PI 产能对账引擎 - 产能块布局配置
// ==========================================
// 职责: 以命名偏移描述产能表中团队块的位置关系
// 红线: Locator 只通过本结构读取偏移，不写死行列号
// ==========================================

use crate::domain::capacity::ITERATION_COUNT;
use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};

/// 相对锚点行的闭区间行窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWindow {
    pub start: usize,
    pub end: usize,
}

impl RowWindow {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

// ==========================================
// CapacityBlockLayout
// ==========================================
// 默认值对应当前产能模板：
// - 团队块 11 列宽、25 行高
// - 锚点下一行为 "Allocation Type"
// - before FF 标记在锚点 +8..+12 行，after FF 在 +16..+20 行
// - 角色合计列 +9，迭代列 +3..+8
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityBlockLayout {
    pub header_row: usize,             // 价值流表头所在行
    pub block_width: usize,
    pub block_height: usize,
    pub anchor_marker: String,         // 锚点确认标记（锚点正下方）
    pub marker_col_offset: usize,      // before/after FF 标记所在列
    pub role_label_col_offset: usize,  // 角色名所在列
    pub before_ff_marker: String,      // 子串匹配，大小写不敏感
    pub before_ff_window: RowWindow,
    pub after_ff_marker: String,
    pub after_ff_window: RowWindow,
    pub max_role_rows: usize,
    pub stop_marker: String,           // 角色行提前结束标记
    pub role_total_col_offset: usize,
    pub first_iteration_col_offset: usize,
}

impl Default for CapacityBlockLayout {
    fn default() -> Self {
        Self {
            header_row: 0,
            block_width: 11,
            block_height: 25,
            anchor_marker: "Allocation Type".to_string(),
            marker_col_offset: 0,
            role_label_col_offset: 1,
            before_ff_marker: "before ff".to_string(),
            before_ff_window: RowWindow::new(8, 12),
            after_ff_marker: "after ff".to_string(),
            after_ff_window: RowWindow::new(16, 20),
            max_role_rows: 6,
            stop_marker: "base capacity".to_string(),
            role_total_col_offset: 9,
            first_iteration_col_offset: 3,
        }
    }
}

impl CapacityBlockLayout {
    /// 迭代列偏移（first..first+6）
    pub fn iteration_col_offsets(&self) -> impl Iterator<Item = usize> {
        let first = self.first_iteration_col_offset;
        first..first + ITERATION_COUNT
    }

    /// 布局自洽性校验（调用方契约，违反即报错）
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| Err(EngineError::InvalidLayout(msg));

        if self.block_width == 0 || self.block_height == 0 {
            return invalid("block_width/block_height 必须大于 0".to_string());
        }
        for (name, window) in [
            ("before_ff_window", self.before_ff_window),
            ("after_ff_window", self.after_ff_window),
        ] {
            if window.start == 0 || window.start > window.end {
                return invalid(format!(
                    "{} 非法: start={}, end={}",
                    name, window.start, window.end
                ));
            }
            if window.end >= self.block_height {
                return invalid(format!(
                    "{} 超出块高度: end={}, block_height={}",
                    name, window.end, self.block_height
                ));
            }
        }
        if self.role_total_col_offset >= self.block_width {
            return invalid(format!(
                "role_total_col_offset={} 超出块宽度 {}",
                self.role_total_col_offset, self.block_width
            ));
        }
        if self.first_iteration_col_offset + ITERATION_COUNT > self.block_width {
            return invalid(format!(
                "迭代列 {}..{} 超出块宽度 {}",
                self.first_iteration_col_offset,
                self.first_iteration_col_offset + ITERATION_COUNT,
                self.block_width
            ));
        }
        for (name, marker) in [
            ("anchor_marker", &self.anchor_marker),
            ("before_ff_marker", &self.before_ff_marker),
            ("after_ff_marker", &self.after_ff_marker),
        ] {
            if marker.trim().is_empty() {
                return invalid(format!("{} 不能为空", name));
            }
        }
        Ok(())
    }
}

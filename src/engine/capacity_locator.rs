// ==========================================
// PI 产能对账引擎 - 产能块定位器
// ==========================================
// 输入: 产能表不可变快照 + 已知团队白名单（按价值流）
// 输出: TeamCapacityBlock 列表
// ==========================================
// 扫描规则:
// 1) 表头行的非空单元格划分价值流列区域（未配置的表头同样截断区域，计入统计）
// 2) 区域内按块宽度步进得到团队列，自上而下扫描
// 3) 单元格正下方为 "Allocation Type" 才视为团队锚点
// 4) 锚点 +8..+12 行找 before FF 标记，+16..+20 行找 after FF 标记（首个命中）
// 5) 标记后最多 6 行为角色行，遇 "base capacity" 提前结束
// 6) 处理完（或白名单拒绝）一个锚点后跳过整块高度，避免重复处理
// 红线: 缺失标记只跳过该子块；未知团队静默跳过；数值宽松解析
// ==========================================

use crate::config::{CapacityBlockLayout, EngineConfig, RowWindow};
use crate::domain::capacity::{CapacityGrid, RoleCapacity, TeamCapacityBlock, ITERATION_COUNT};
use crate::engine::normalizer::IdentifierNormalizer;
use crate::engine::role_detector::RoleTable;
use crate::importer::data_cleaner::ceil_points;
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// 价值流列区域
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueStreamRegion {
    pub value_stream: String, // 规范化后的价值流
    pub header: String,       // 表头原文
    pub start_col: usize,
    pub end_col: usize,       // 不含
}

/// 单次扫描统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorStats {
    pub regions: usize,
    pub unknown_regions: usize,
    pub truncated_regions: usize, // 已配置区域被紧随的未配置表头截断

    pub anchors: usize,
    pub matched_teams: usize,
    pub skipped_teams: usize,
    pub missing_before_ff: usize,
    pub missing_after_ff: usize,
}

/// 单个角色行
#[derive(Debug, Clone, PartialEq, Eq)]
struct RoleRow {
    role: String,
    total: i64,
    iterations: [i64; ITERATION_COUNT],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FreezeSection {
    BeforeFf,
    AfterFf,
}

// ==========================================
// CapacityBlockLocator
// ==========================================
#[derive(Debug, Clone)]
pub struct CapacityBlockLocator {
    layout: CapacityBlockLayout,
    normalizer: IdentifierNormalizer,
    role_table: RoleTable,
    known_teams: HashMap<String, HashSet<String>>, // 规范化价值流 → 规范化团队
}

impl CapacityBlockLocator {
    pub fn new(
        config: &EngineConfig,
        normalizer: IdentifierNormalizer,
        role_table: RoleTable,
    ) -> Self {
        let mut known_teams: HashMap<String, HashSet<String>> = HashMap::new();
        for vs in &config.value_streams {
            let teams = known_teams.entry(normalizer.canonical(&vs.name)).or_default();
            teams.extend(vs.teams.iter().map(|t| normalizer.canonical(t)));
        }

        Self {
            layout: config.capacity_layout.clone(),
            normalizer,
            role_table,
            known_teams,
        }
    }

    pub fn layout(&self) -> &CapacityBlockLayout {
        &self.layout
    }

    /// 定位全部团队产能块
    pub fn locate(&self, grid: &CapacityGrid) -> Vec<TeamCapacityBlock> {
        self.locate_with_stats(grid).0
    }

    /// 定位全部团队产能块（附扫描统计）
    #[instrument(skip(self, grid), fields(rows = grid.row_count(), cols = grid.column_count()))]
    pub fn locate_with_stats(&self, grid: &CapacityGrid) -> (Vec<TeamCapacityBlock>, LocatorStats) {
        let mut stats = LocatorStats::default();
        let mut blocks = Vec::new();

        if grid.is_empty() {
            tracing::warn!("产能表为空，跳过产能块定位");
            return (blocks, stats);
        }

        let regions = self.value_stream_regions(grid);
        for pair in regions.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            if self.known_teams.contains_key(&current.value_stream)
                && !self.known_teams.contains_key(&next.value_stream)
            {
                stats.truncated_regions += 1;
                tracing::debug!(
                    value_stream = %current.value_stream,
                    header = %next.header,
                    col = next.start_col,
                    "未配置的表头单元格截断了价值流区域"
                );
            }
        }

        for region in regions {
            stats.regions += 1;
            let known = match self.known_teams.get(&region.value_stream) {
                Some(teams) => teams,
                None => {
                    stats.unknown_regions += 1;
                    tracing::debug!(
                        header = %region.header,
                        start_col = region.start_col,
                        "未配置的价值流区域，跳过"
                    );
                    continue;
                }
            };

            let mut col = region.start_col;
            while col < region.end_col {
                self.scan_team_column(grid, col, &region, known, &mut blocks, &mut stats);
                col += self.layout.block_width;
            }
        }

        tracing::info!(
            regions = stats.regions,
            anchors = stats.anchors,
            matched = stats.matched_teams,
            skipped = stats.skipped_teams,
            "产能块定位完成"
        );
        (blocks, stats)
    }

    /// 按表头行划分价值流列区域
    pub fn value_stream_regions(&self, grid: &CapacityGrid) -> Vec<ValueStreamRegion> {
        let header = grid.row(self.layout.header_row);
        let starts: Vec<(usize, &str)> = header
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.trim()))
            .filter(|(_, c)| !c.is_empty())
            .collect();
        let width = grid.column_count();

        starts
            .iter()
            .enumerate()
            .map(|(i, (start, text))| ValueStreamRegion {
                value_stream: self.normalizer.canonical(text),
                header: text.to_string(),
                start_col: *start,
                end_col: starts.get(i + 1).map(|(next, _)| *next).unwrap_or(width),
            })
            .collect()
    }

    // ==========================================
    // 列扫描
    // ==========================================

    fn scan_team_column(
        &self,
        grid: &CapacityGrid,
        col: usize,
        region: &ValueStreamRegion,
        known: &HashSet<String>,
        blocks: &mut Vec<TeamCapacityBlock>,
        stats: &mut LocatorStats,
    ) {
        let mut row = self.layout.header_row + 1;
        while row + 1 < grid.row_count() {
            if !self.is_anchor(grid, row, col) {
                row += 1;
                continue;
            }

            stats.anchors += 1;
            let display_name = grid.cell(row, col).trim().to_string();
            let team = self.normalizer.canonical(&display_name);

            if known.contains(&team) {
                stats.matched_teams += 1;
                blocks.push(self.read_block(grid, row, col, team, display_name, region, stats));
            } else {
                stats.skipped_teams += 1;
                tracing::debug!(
                    team = %display_name,
                    value_stream = %region.value_stream,
                    row,
                    col,
                    "团队不在白名单，跳过"
                );
            }

            row += self.layout.block_height;
        }
    }

    /// 锚点判定：非空名称 + 正下方为锚点标记
    fn is_anchor(&self, grid: &CapacityGrid, row: usize, col: usize) -> bool {
        let name = grid.cell(row, col).trim();
        if name.is_empty() || self.is_anchor_marker(name) {
            return false;
        }
        self.is_anchor_marker(grid.cell(row + 1, col))
    }

    fn is_anchor_marker(&self, cell: &str) -> bool {
        cell.trim()
            .eq_ignore_ascii_case(self.layout.anchor_marker.trim())
    }

    // ==========================================
    // 块读取
    // ==========================================

    #[allow(clippy::too_many_arguments)]
    fn read_block(
        &self,
        grid: &CapacityGrid,
        anchor_row: usize,
        col: usize,
        team: String,
        display_name: String,
        region: &ValueStreamRegion,
        stats: &mut LocatorStats,
    ) -> TeamCapacityBlock {
        let mut roles: Vec<RoleCapacity> = Vec::new();

        for section in [FreezeSection::BeforeFf, FreezeSection::AfterFf] {
            let (window, marker) = match section {
                FreezeSection::BeforeFf => {
                    (self.layout.before_ff_window, &self.layout.before_ff_marker)
                }
                FreezeSection::AfterFf => (self.layout.after_ff_window, &self.layout.after_ff_marker),
            };

            let marker_row = match self.find_marker(grid, anchor_row, col, window, marker) {
                Some(r) => r,
                None => {
                    match section {
                        FreezeSection::BeforeFf => stats.missing_before_ff += 1,
                        FreezeSection::AfterFf => stats.missing_after_ff += 1,
                    }
                    tracing::debug!(
                        team = %display_name,
                        ?section,
                        anchor_row,
                        "未找到 FF 标记，跳过该子块"
                    );
                    continue;
                }
            };

            for role_row in self.read_role_rows(grid, marker_row, col) {
                let idx = match roles.iter().position(|r| r.role == role_row.role) {
                    Some(i) => i,
                    None => {
                        roles.push(RoleCapacity::new(role_row.role.clone()));
                        roles.len() - 1
                    }
                };
                let role = &mut roles[idx];
                match section {
                    FreezeSection::BeforeFf => role.add_before_ff(role_row.total),
                    FreezeSection::AfterFf => role.add_after_ff(role_row.total),
                }
                role.add_iterations(&role_row.iterations);
            }
        }

        TeamCapacityBlock {
            team,
            display_name,
            value_stream: region.value_stream.clone(),
            roles,
            anchor_row,
            anchor_col: col,
        }
    }

    /// 在窗口内查找 FF 标记（大小写不敏感子串，首个命中）
    fn find_marker(
        &self,
        grid: &CapacityGrid,
        anchor_row: usize,
        col: usize,
        window: RowWindow,
        marker: &str,
    ) -> Option<usize> {
        let marker_col = col + self.layout.marker_col_offset;
        (anchor_row + window.start..=anchor_row + window.end)
            .find(|&r| contains_ignore_case(grid.cell(r, marker_col), marker))
    }

    /// 读取标记之后的角色行
    fn read_role_rows(&self, grid: &CapacityGrid, marker_row: usize, col: usize) -> Vec<RoleRow> {
        let layout = &self.layout;
        let label_col = col + layout.role_label_col_offset;
        let marker_col = col + layout.marker_col_offset;
        let mut rows = Vec::new();

        for r in marker_row + 1..=marker_row + layout.max_role_rows {
            let label = grid.cell(r, label_col).trim();
            let marker_cell = grid.cell(r, marker_col);

            let hits_stop = contains_ignore_case(label, &layout.stop_marker)
                || contains_ignore_case(marker_cell, &layout.stop_marker);
            // 下一段 FF 标记出现时同样结束
            let hits_next_section = contains_ignore_case(marker_cell, &layout.before_ff_marker)
                || contains_ignore_case(marker_cell, &layout.after_ff_marker);
            if hits_stop || hits_next_section {
                break;
            }
            if label.is_empty() {
                continue;
            }

            let mut iterations = [0i64; ITERATION_COUNT];
            for (slot, offset) in iterations.iter_mut().zip(layout.iteration_col_offsets()) {
                *slot = ceil_points(grid.cell(r, col + offset));
            }

            rows.push(RoleRow {
                role: self.role_table.key(label),
                total: ceil_points(grid.cell(r, col + layout.role_total_col_offset)),
                iterations,
            });
        }

        rows
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ==========================================
// PI 产能对账引擎 - 工作项领域模型
// ==========================================
// 职责: 定义引擎只读的工作项结构
// 红线: 点数字段在导入阶段已向上取整，引擎内只做整数求和
// ==========================================

use crate::domain::types::{IssueType, UNASSIGNED};
use serde::{Deserialize, Serialize};

// ==========================================
// Issue - 工作项
// ==========================================
// 来源: 外部工作项系统（导入后只读）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    // ===== 标识 =====
    pub key: String,
    pub issue_type: IssueType,
    pub summary: String,

    // ===== 归属 =====
    pub scrum_team: String,              // 空串视为 Unassigned
    pub value_stream: String,
    pub allocation: String,              // 原始分配标签

    // ===== 点数（已取整） =====
    pub story_points: i64,
    pub story_point_estimate: i64,
    pub feature_points: i64,

    // ===== 迭代与标签 =====
    pub sprint_name: Option<String>,
    pub labels: Vec<String>,

    // ===== 依赖信息 =====
    pub depends_on_value_stream: Option<String>,
    pub depends_on_team: Option<String>,

    // ===== 所属 Epic（parent 优先，其次 epic link） =====
    pub epic_key: Option<String>,
}

impl Issue {
    /// 所属团队（空值回落为 Unassigned）
    pub fn team_or_unassigned(&self) -> &str {
        let team = self.scrum_team.trim();
        if team.is_empty() {
            UNASSIGNED
        } else {
            team
        }
    }

    /// 从 sprint 名称末尾解析迭代序号（1..=6）
    ///
    /// 例: "PI 26.1 Sprint 3" → Some(3)；"Backlog" → None
    pub fn iteration_number(&self) -> Option<usize> {
        let name = self.sprint_name.as_deref()?.trim();
        let digits: String = name
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let n = digits.parse::<usize>().ok()?;
        if (1..=crate::domain::capacity::ITERATION_COUNT).contains(&n) {
            Some(n)
        } else {
            None
        }
    }
}

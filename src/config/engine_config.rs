// ==========================================
// PI 产能对账引擎 - 引擎配置
// ==========================================
// 职责: 汇总引擎所需的全部外部配置
// - 价值流 / 已知团队白名单 / 名称别名
// - 分配类别关键词表（有序）
// - 角色规范化表 / 标题前缀模式（有序）
// - 产能块布局 / 特殊团队
// ==========================================

use crate::config::capacity_layout::CapacityBlockLayout;
use crate::domain::types::AllocationCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

/// 价值流配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueStreamConfig {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>, // 已知团队白名单
}

impl ValueStreamConfig {
    pub fn new(name: &str, aliases: &[&str], teams: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            teams: teams.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// 分配类别规则（关键词子串匹配）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRule {
    pub category: AllocationCategory,
    pub keywords: Vec<String>,
}

impl AllocationRule {
    fn new(category: AllocationCategory, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ==========================================
// EngineConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub value_streams: Vec<ValueStreamConfig>,
    pub identifier_aliases: BTreeMap<String, String>, // 别名 → 规范名（团队/价值流通用）
    pub allocation_rules: Vec<AllocationRule>,         // 声明顺序 = 优先级
    pub role_aliases: BTreeMap<String, String>,        // 原始角色标记 → 角色代码
    pub role_title_patterns: Vec<String>,              // 正则，第 1 个捕获组为角色标记
    pub capacity_layout: CapacityBlockLayout,
    pub special_team: Option<String>,                  // TOTAL 行单独累加的团队
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            value_streams: vec![
                ValueStreamConfig::new("RCM Genie", &["RCM"], &[]),
                ValueStreamConfig::new("EMA RAC", &["EMA RaC"], &[]),
                ValueStreamConfig::new("MMPM", &[], &[]),
            ],
            identifier_aliases: BTreeMap::new(),
            allocation_rules: default_allocation_rules(),
            role_aliases: default_role_aliases(),
            role_title_patterns: default_role_title_patterns(),
            capacity_layout: CapacityBlockLayout::default(),
            special_team: None,
        }
    }
}

impl EngineConfig {
    /// 从 JSON 文本加载（缺失字段取默认值）
    pub fn from_json_str(json: &str) -> Result<Self, Box<dyn Error>> {
        Ok(serde_json::from_str(json)?)
    }

    /// 从 JSON 文件加载
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// 按名称查找价值流配置（规范化比较由调用方完成）
    pub fn value_stream(&self, name: &str) -> Option<&ValueStreamConfig> {
        self.value_streams.iter().find(|vs| vs.name == name)
    }
}

/// 默认分配类别规则
pub fn default_allocation_rules() -> Vec<AllocationRule> {
    vec![
        AllocationRule::new(
            AllocationCategory::Features,
            &["feature", "product", "compliance", "story", "requirement"],
        ),
        AllocationRule::new(
            AllocationCategory::TechPlatform,
            &["tech", "platform", "infrastructure", "architecture"],
        ),
        AllocationRule::new(
            AllocationCategory::Klo,
            &["klo", "maintenance", "support", "bau"],
        ),
        AllocationRule::new(
            AllocationCategory::Quality,
            &["quality", "defect", "bug", "fix", "qa"],
        ),
    ]
}

/// 默认角色规范化表
pub fn default_role_aliases() -> BTreeMap<String, String> {
    [
        ("BE", "BE"),
        ("FE", "FE"),
        ("QA", "QA"),
        ("AQA", "QA"),
        ("MQA", "QA"),
        ("W-DEV", "W-DEV"),
        ("WDEV", "W-DEV"),
        ("M-DEV", "M-DEV"),
        ("MDEV", "M-DEV"),
        ("DEVOPS", "DEVOPS"),
        ("UX", "UX"),
        ("BA", "BA"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// 默认标题前缀模式（顺序即优先级）
pub fn default_role_title_patterns() -> Vec<String> {
    [
        r"^\s*\[([^\]]+)\]",                   // [BE] ...
        r"^\s*\(([^)]+)\)",                    // (BE) ...
        r"^\s*([A-Za-z][A-Za-z0-9_-]*)\s*:",   // BE: ...
        r"^\s*([A-Za-z][A-Za-z0-9_-]*)\s+-",   // BE - ...
        r"^\s*([A-Za-z][A-Za-z0-9_-]*)\b",     // BE ...
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

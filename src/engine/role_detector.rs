// ==========================================
// PI 产能对账引擎 - 角色识别
// ==========================================
// 规则（顺序执行，命中即返回）:
// 1) 逐个标签查角色规范化表（规范化后精确匹配）
// 2) 标题按前缀模式顺序匹配：[BE] / (BE) / BE: / BE - / 首个词
//    捕获的标记再查同一张规范化表，查不到则尝试下一个模式
// 3) 均未命中 → None（调用方归入 Unassigned）
// 红线: 全函数，不抛错，不猜测
// ==========================================

use crate::config::EngineConfig;
use crate::domain::issue::Issue;
use crate::domain::types::UNASSIGNED;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::normalizer::normalize;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

// ==========================================
// RoleTable - 角色规范化表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    codes: HashMap<String, String>, // 规范化标记 → 角色代码
}

impl RoleTable {
    pub fn new(aliases: &BTreeMap<String, String>) -> Self {
        let codes = aliases
            .iter()
            .map(|(raw, code)| (normalize(raw), code.trim().to_uppercase()))
            .filter(|(raw, code)| !raw.is_empty() && !code.is_empty())
            .collect();
        Self { codes }
    }

    /// 精确查表（大小写/分隔符不敏感）
    pub fn lookup(&self, token: &str) -> Option<String> {
        self.codes.get(&normalize(token)).cloned()
    }

    /// 产能表角色名 → 角色键（表中没有时使用规范化原名）
    pub fn key(&self, label: &str) -> String {
        self.lookup(label).unwrap_or_else(|| normalize(label))
    }
}

// ==========================================
// RoleDetector
// ==========================================
#[derive(Debug, Clone)]
pub struct RoleDetector {
    table: RoleTable,
    title_patterns: Vec<Regex>,
}

impl RoleDetector {
    /// 由配置构建（模式无法编译或缺少捕获组视为配置错误）
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let mut title_patterns = Vec::with_capacity(config.role_title_patterns.len());
        for pattern in &config.role_title_patterns {
            let regex = Regex::new(pattern).map_err(|e| EngineError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            if regex.captures_len() < 2 {
                return Err(EngineError::PatternWithoutCapture(pattern.clone()));
            }
            title_patterns.push(regex);
        }

        Ok(Self {
            table: RoleTable::new(&config.role_aliases),
            title_patterns,
        })
    }

    pub fn table(&self) -> &RoleTable {
        &self.table
    }

    /// 识别工作项角色
    pub fn detect_role(&self, issue: &Issue) -> Option<String> {
        if let Some(code) = issue.labels.iter().find_map(|l| self.table.lookup(l)) {
            return Some(code);
        }
        self.detect_from_title(&issue.summary)
    }

    /// 从标题前缀识别角色
    pub fn detect_from_title(&self, title: &str) -> Option<String> {
        self.title_patterns.iter().find_map(|pattern| {
            pattern
                .captures(title)
                .and_then(|caps| caps.get(1))
                .and_then(|token| self.table.lookup(token.as_str()))
        })
    }

    /// 识别角色，未命中归入 Unassigned
    pub fn role_or_unassigned(&self, issue: &Issue) -> String {
        self.detect_role(issue)
            .unwrap_or_else(|| UNASSIGNED.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> RoleDetector {
        RoleDetector::from_config(&EngineConfig::default()).unwrap()
    }

    fn issue(labels: &[&str], summary: &str) -> Issue {
        Issue {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            summary: summary.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_label_wins_over_title() {
        let d = detector();
        assert_eq!(
            d.detect_role(&issue(&["BE"], "[QA] fix login")),
            Some("BE".to_string())
        );
    }

    #[test]
    fn test_label_normalization_table() {
        let d = detector();
        assert_eq!(d.detect_role(&issue(&["aqa"], "")), Some("QA".to_string()));
        assert_eq!(d.detect_role(&issue(&[" WDEV "], "")), Some("W-DEV".to_string()));
        // 首个可识别标签生效
        assert_eq!(
            d.detect_role(&issue(&["customer-x", "fe", "be"], "")),
            Some("FE".to_string())
        );
    }

    #[test]
    fn test_title_prefix_patterns() {
        let d = detector();
        assert_eq!(d.detect_from_title("[BE] add endpoint"), Some("BE".to_string()));
        assert_eq!(d.detect_from_title("(fe) tweak layout"), Some("FE".to_string()));
        assert_eq!(d.detect_from_title("QA: regression pack"), Some("QA".to_string()));
        assert_eq!(d.detect_from_title("WDEV - widget"), Some("W-DEV".to_string()));
        assert_eq!(d.detect_from_title("AQA smoke suite"), Some("QA".to_string()));
    }

    #[test]
    fn test_no_signal_is_none() {
        let d = detector();
        assert_eq!(d.detect_role(&issue(&["urgent"], "Fix login page")), None);
        assert_eq!(d.detect_role(&issue(&[], "")), None);
        assert_eq!(d.role_or_unassigned(&issue(&[], "misc")), UNASSIGNED);
    }

    #[test]
    fn test_unknown_bracket_falls_through_to_later_pattern() {
        let d = detector();
        // [Spike] 不在表中；后续模式均从标题开头匹配，也得不到角色
        assert_eq!(d.detect_from_title("[Spike] BE research"), None);
        // 括号内非角色，但首词模式命中
        assert_eq!(d.detect_from_title("BE: (draft) api"), Some("BE".to_string()));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = EngineConfig {
            role_title_patterns: vec!["([".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            RoleDetector::from_config(&config),
            Err(EngineError::InvalidPattern { .. })
        ));

        let config = EngineConfig {
            role_title_patterns: vec![r"^\w+".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            RoleDetector::from_config(&config),
            Err(EngineError::PatternWithoutCapture(_))
        ));
    }

    #[test]
    fn test_role_table_key_for_capacity_labels() {
        let d = detector();
        assert_eq!(d.table().key("w_dev"), "W-DEV");
        assert_eq!(d.table().key("Scrum Master"), "SCRUM MASTER");
    }
}

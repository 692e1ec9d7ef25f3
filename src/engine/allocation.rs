// ==========================================
// PI 产能对账引擎 - 分配类别分类器
// ==========================================
// 规则: 标签转小写后，按声明顺序逐类检查关键词子串，首个命中即返回
// 红线: 多类命中时以声明顺序为准（Features 优先），不得改为打分制
// 默认: 空标签或无命中 → Features
// ==========================================

use crate::config::AllocationRule;
use crate::domain::types::AllocationCategory;

// ==========================================
// AllocationClassifier
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocationClassifier {
    rules: Vec<(AllocationCategory, Vec<String>)>, // 关键词已转小写
}

impl AllocationClassifier {
    pub fn new(rules: &[AllocationRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| {
                    let keywords = r
                        .keywords
                        .iter()
                        .map(|k| k.trim().to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect();
                    (r.category, keywords)
                })
                .collect(),
        }
    }

    /// 分类（全函数）
    pub fn classify(&self, label: &str) -> AllocationCategory {
        let lowered = label.trim().to_lowercase();
        if lowered.is_empty() {
            return AllocationCategory::Features;
        }

        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k.as_str())))
            .map(|(category, _)| *category)
            .unwrap_or(AllocationCategory::Features)
    }

    pub fn is_features(&self, label: &str) -> bool {
        self.classify(label) == AllocationCategory::Features
    }
}

impl Default for AllocationClassifier {
    fn default() -> Self {
        Self::new(&crate::config::engine_config::default_allocation_rules())
    }
}

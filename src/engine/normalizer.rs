// ==========================================
// PI 产能对账引擎 - 标识符规范化
// ==========================================
// 职责: 团队 / 价值流 / 角色名称的规范化比较
// 规则: 大写 + 去首尾空白 + 将连续的 '-' '_' 空白 折叠为单个空格
// 红线: 纯函数、全函数、幂等（normalize(normalize(x)) == normalize(x)）
// ==========================================

use crate::config::EngineConfig;
use std::collections::{BTreeSet, HashMap};

/// 规范化名称
///
/// # 示例
/// ```
/// use pi_capacity_recon::engine::normalizer::normalize;
/// assert_eq!(normalize("RCM-Genie"), "RCM GENIE");
/// assert_eq!(normalize("  rcm__genie "), "RCM GENIE");
/// ```
pub fn normalize(name: &str) -> String {
    let upper = name.to_uppercase();
    let mut out = String::with_capacity(upper.len());
    let mut pending_separator = false;

    for ch in upper.chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            pending_separator = true;
            continue;
        }
        if pending_separator && !out.is_empty() {
            out.push(' ');
        }
        pending_separator = false;
        out.push(ch);
    }

    out
}

/// 可选值规范化（None → 空串）
pub fn normalize_opt(name: Option<&str>) -> String {
    name.map(normalize).unwrap_or_default()
}

// ==========================================
// IdentifierNormalizer - 带别名表的规范化器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct IdentifierNormalizer {
    aliases: HashMap<String, String>, // 规范化别名 → 规范化目标（已展开链式别名）
}

impl IdentifierNormalizer {
    /// 由引擎配置构建：价值流别名 + 通用标识符别名
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for vs in &config.value_streams {
            for alias in &vs.aliases {
                pairs.push((alias.clone(), vs.name.clone()));
            }
        }
        for (alias, target) in &config.identifier_aliases {
            pairs.push((alias.clone(), target.clone()));
        }
        Self::with_aliases(pairs)
    }

    pub fn with_aliases<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let raw: HashMap<String, String> = pairs
            .into_iter()
            .map(|(a, b)| (normalize(a.as_ref()), normalize(b.as_ref())))
            .filter(|(a, b)| !a.is_empty() && a != b)
            .collect();

        // 展开链式别名，保证 canonical 幂等；成环时整个环归并到环内最小的名称
        let mut resolved = HashMap::with_capacity(raw.len());
        let mut cycles = BTreeSet::new();
        for key in raw.keys() {
            let mut path: Vec<&String> = vec![key];
            let mut current = key;
            let target = loop {
                let next = match raw.get(current) {
                    Some(next) => next,
                    None => break current.clone(),
                };
                if let Some(pos) = path.iter().position(|p| *p == next) {
                    let representative = path[pos..]
                        .iter()
                        .min()
                        .map(|s| (*s).clone())
                        .unwrap_or_else(|| next.clone());
                    cycles.insert(representative.clone());
                    break representative;
                }
                path.push(next);
                current = next;
            };
            if &target != key {
                resolved.insert(key.clone(), target);
            }
        }
        if !cycles.is_empty() {
            tracing::warn!(representatives = ?cycles, "别名表存在环，已归并到环内代表名称");
        }

        Self { aliases: resolved }
    }

    /// 规范化并解析别名
    pub fn canonical(&self, name: &str) -> String {
        let normalized = normalize(name);
        match self.aliases.get(&normalized) {
            Some(target) => target.clone(),
            None => normalized,
        }
    }

    /// 规范化后是否相等
    pub fn same(&self, a: &str, b: &str) -> bool {
        self.canonical(a) == self.canonical(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize("RCM-Genie"), "RCM GENIE");
        assert_eq!(normalize("rcm_genie"), "RCM GENIE");
        assert_eq!(normalize("RCM  Genie"), "RCM GENIE");
        assert_eq!(normalize(" -RCM - _Genie_ "), "RCM GENIE");
        assert_eq!(normalize("EMA RaC"), "EMA RAC");
    }

    #[test]
    fn test_normalize_total() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  \t-_ "), "");
        assert_eq!(normalize_opt(None), "");
        assert_eq!(normalize_opt(Some("borg")), "BORG");
    }

    #[test]
    fn test_normalize_idempotent() {
        for s in [
            "RCM-Genie",
            "  a__b--c  d ",
            "Ärger-straße",
            "W-DEV",
            "\u{00a0}x\u{2003}y",
            "",
            "___",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input: {:?}", s);
        }
    }

    #[test]
    fn test_alias_resolution() {
        let n = IdentifierNormalizer::with_aliases([("RCM", "RCM Genie"), ("EMA RaC", "EMA RAC")]);
        assert_eq!(n.canonical("rcm"), "RCM GENIE");
        assert_eq!(n.canonical("RCM-Genie"), "RCM GENIE");
        assert_eq!(n.canonical("ema_rac"), "EMA RAC");
        assert!(n.same("RCM", "rcm genie"));
        assert!(!n.same("RCM", "MMPM"));
    }

    #[test]
    fn test_alias_chain_and_cycle() {
        let n = IdentifierNormalizer::with_aliases([("A", "B"), ("B", "C")]);
        assert_eq!(n.canonical("a"), "C");
        assert_eq!(n.canonical(&n.canonical("a")), "C");

        let cyclic = IdentifierNormalizer::with_aliases([("X", "Y"), ("Y", "X")]);
        assert_eq!(cyclic.canonical("x"), "X");
        assert_eq!(cyclic.canonical("y"), "X");
        assert!(cyclic.same("x", "y"));
    }

    #[test]
    fn test_canonical_idempotent_with_cyclic_aliases() {
        let n = IdentifierNormalizer::with_aliases([
            ("X", "Y"),
            ("Y", "X"),
            ("W", "X"),
            ("P", "Q"),
            ("Q", "R"),
            ("R", "P"),
            ("Z", "Z-Team"),
        ]);
        for s in ["x", "y", "w", "p", "q", "r", "z", "z_team", "other"] {
            let once = n.canonical(s);
            assert_eq!(n.canonical(&once), once, "input: {:?}", s);
        }
        assert_eq!(n.canonical("w"), "X");
        assert_eq!(n.canonical("q"), "P");
        assert_eq!(n.canonical("z"), "Z TEAM");
    }

    #[test]
    fn test_from_config_uses_value_stream_aliases() {
        let n = IdentifierNormalizer::from_config(&EngineConfig::default());
        assert_eq!(n.canonical("RCM"), "RCM GENIE");
    }
}

// ==========================================
// PI 产能对账引擎 - 跨上下文团队排除
// ==========================================
// 规则: 团队被排除 当且仅当
//   常规工作数 == 0 且 依赖数 > 0 且 跨上下文依赖数 == 依赖数
// 跨上下文依赖: dependsOnValueStream（规范化）≠ 当前上下文（规范化）
// 红线: 纯函数，每次按 (issues, context) 重新计算，不做缓存
// ==========================================

use crate::domain::issue::Issue;
use crate::domain::report::ExclusionDecision;
use crate::engine::normalizer::IdentifierNormalizer;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

/// 单团队在当前上下文中的工作足迹
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TeamFootprint {
    display_name: String,
    regular_work: usize,
    dependencies: usize,
    cross_context_dependencies: usize,
}

impl TeamFootprint {
    fn is_excluded(&self) -> bool {
        self.regular_work == 0
            && self.dependencies > 0
            && self.cross_context_dependencies == self.dependencies
    }

    fn reason(&self) -> String {
        if self.regular_work > 0 {
            format!("REGULAR_WORK_PRESENT: regular_work={}", self.regular_work)
        } else if self.dependencies == 0 {
            "NO_DEPENDENCIES".to_string()
        } else if self.is_excluded() {
            format!(
                "ALL_DEPENDENCIES_CROSS_CONTEXT: dependencies={}",
                self.dependencies
            )
        } else {
            format!(
                "SAME_CONTEXT_DEPENDENCY: cross_context={}/{}",
                self.cross_context_dependencies, self.dependencies
            )
        }
    }
}

// ==========================================
// ExclusionResolver
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ExclusionResolver {
    normalizer: IdentifierNormalizer,
}

impl ExclusionResolver {
    pub fn new(normalizer: IdentifierNormalizer) -> Self {
        Self { normalizer }
    }

    /// 计算当前上下文需排除的团队
    ///
    /// # 返回
    /// - 规范化团队名集合（`IdentifierNormalizer::canonical` 的结果，如 "BORG"），
    ///   与 `TeamReport.team` / `UtilizationReport.excluded_teams` 使用同一套键；
    ///   展示名见 `resolve_excluded_display_names` 或 `resolve_decisions`
    pub fn resolve_exclusions(&self, issues: &[Issue], context: &str) -> BTreeSet<String> {
        self.resolve_decisions(issues, context)
            .into_iter()
            .filter(|d| d.excluded)
            .map(|d| d.team)
            .collect()
    }

    /// 需排除团队的展示名（工作项中首次出现的原始写法，如 "Borg"）
    pub fn resolve_excluded_display_names(&self, issues: &[Issue], context: &str) -> BTreeSet<String> {
        self.resolve_decisions(issues, context)
            .into_iter()
            .filter(|d| d.excluded)
            .map(|d| d.display_name)
            .collect()
    }

    /// 计算每个团队的排除决策（含原因）
    ///
    /// 上下文为空时返回空列表（不排除任何团队）
    #[instrument(skip(self, issues), fields(issues = issues.len()))]
    pub fn resolve_decisions(&self, issues: &[Issue], context: &str) -> Vec<ExclusionDecision> {
        let context_key = self.normalizer.canonical(context);
        if context_key.is_empty() {
            tracing::debug!("上下文为空，不计算排除");
            return Vec::new();
        }

        let mut footprints: BTreeMap<String, TeamFootprint> = BTreeMap::new();
        for issue in issues {
            let display = issue.team_or_unassigned();
            let fp = footprints
                .entry(self.normalizer.canonical(display))
                .or_insert_with(|| TeamFootprint {
                    display_name: display.to_string(),
                    ..Default::default()
                });

            if issue.issue_type.is_dependency() {
                fp.dependencies += 1;
                let origin = self
                    .normalizer
                    .canonical(issue.depends_on_value_stream.as_deref().unwrap_or(""));
                if origin != context_key {
                    fp.cross_context_dependencies += 1;
                }
            } else {
                fp.regular_work += 1;
            }
        }

        let decisions: Vec<ExclusionDecision> = footprints
            .into_iter()
            .map(|(team, fp)| ExclusionDecision {
                excluded: fp.is_excluded(),
                reason: fp.reason(),
                display_name: fp.display_name,
                team,
                context: context_key.clone(),
            })
            .collect();

        let excluded = decisions.iter().filter(|d| d.excluded).count();
        tracing::debug!(
            context = %context_key,
            teams = decisions.len(),
            excluded,
            "排除决策计算完成"
        );
        decisions
    }
}

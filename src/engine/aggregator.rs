// ==========================================
// PI 产能对账引擎 - 产能/使用汇总
// ==========================================
// 输入: 团队产能块 + 工作项 + 排除团队
// 输出: UtilizationReport（团队 → 角色 → 窗口 → 指标）
// ==========================================
// 口径:
// - capacity: Code Freeze = beforeFF；Entire PI = beforeFF + afterFF
// - used: Features 类 Story/Bug 的 storyPoints 之和
// - plannedLoad: Features 类 Epic 的 featurePoints × 10 之和
// - actualLoad: 同一批 Epic 的 storyPointEstimate 之和
// - 点数在导入时已取整，这里只做整数求和
// - TOTAL 行走 special_team_rollup：其余已展示团队小计 + 特殊团队行
// ==========================================

use crate::domain::capacity::{TeamCapacityBlock, ITERATION_COUNT};
use crate::domain::issue::Issue;
use crate::domain::report::{
    empty_category_table, CategoryTable, IterationMetrics, RoleReport, TeamReport, TotalRow,
    UtilizationReport, WindowMetrics, WindowTable,
};
use crate::domain::types::{AllocationCategory, CapacityWindow, IssueType};
use crate::engine::allocation::AllocationClassifier;
use crate::engine::normalizer::IdentifierNormalizer;
use crate::engine::role_detector::RoleDetector;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

/// Epic 的 featurePoints 折算系数
pub const FEATURE_POINT_FACTOR: i64 = 10;

// ==========================================
// 累加器
// ==========================================
#[derive(Debug, Clone, Default)]
struct Tally {
    before_ff: i64,
    after_ff: i64,
    capacity_by_iteration: [i64; ITERATION_COUNT],
    used: i64,
    used_by_iteration: [i64; ITERATION_COUNT],
    planned_load: i64,
    actual_load: i64,
    by_category: CategoryTable,
}

impl Tally {
    fn windows(&self) -> WindowTable {
        CapacityWindow::ALL
            .iter()
            .map(|w| {
                (
                    *w,
                    WindowMetrics::compute(
                        w.capacity_of(self.before_ff, self.after_ff),
                        self.used,
                        self.planned_load,
                        self.actual_load,
                    ),
                )
            })
            .collect()
    }

    fn iterations(&self) -> Vec<IterationMetrics> {
        (0..ITERATION_COUNT)
            .map(|i| IterationMetrics {
                iteration: i + 1,
                capacity: self.capacity_by_iteration[i],
                used: self.used_by_iteration[i],
            })
            .collect()
    }

    fn add_capacity(&mut self, before_ff: i64, after_ff: i64, by_iteration: &[i64; ITERATION_COUNT]) {
        self.before_ff += before_ff;
        self.after_ff += after_ff;
        for (slot, v) in self.capacity_by_iteration.iter_mut().zip(by_iteration.iter()) {
            *slot += v;
        }
    }

    /// 四个类别齐全的分类点数
    fn categories(&self) -> CategoryTable {
        let mut table = empty_category_table();
        for (category, points) in &self.by_category {
            *table.entry(*category).or_insert(0) += points;
        }
        table
    }

    fn add_category(&mut self, category: AllocationCategory, points: i64) {
        *self.by_category.entry(category).or_insert(0) += points;
    }

    fn add_issue(&mut self, issue: &Issue) {
        if issue.issue_type.is_point_estimated() {
            self.used += issue.story_points;
            if let Some(n) = issue.iteration_number() {
                self.used_by_iteration[n - 1] += issue.story_points;
            }
        } else if issue.issue_type == IssueType::Epic {
            self.planned_load += issue.feature_points * FEATURE_POINT_FACTOR;
            self.actual_load += issue.story_point_estimate;
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TeamTally {
    display_name: String,
    value_stream: Option<String>,
    has_capacity_block: bool,
    tally: Tally,
    roles: BTreeMap<String, Tally>,
}

// ==========================================
// Aggregator
// ==========================================
#[derive(Debug, Clone)]
pub struct Aggregator {
    normalizer: IdentifierNormalizer,
    classifier: AllocationClassifier,
    role_detector: RoleDetector,
    special_team: Option<String>, // 规范化
}

impl Aggregator {
    pub fn new(
        normalizer: IdentifierNormalizer,
        classifier: AllocationClassifier,
        role_detector: RoleDetector,
        special_team: Option<&str>,
    ) -> Self {
        let special_team = special_team
            .map(|s| normalizer.canonical(s))
            .filter(|s| !s.is_empty());
        Self {
            normalizer,
            classifier,
            role_detector,
            special_team,
        }
    }

    /// 汇总产能与使用
    #[instrument(skip_all, fields(blocks = capacity_blocks.len(), issues = issues.len(), excluded = excluded_teams.len()))]
    pub fn aggregate(
        &self,
        capacity_blocks: &[TeamCapacityBlock],
        issues: &[Issue],
        excluded_teams: &BTreeSet<String>,
    ) -> UtilizationReport {
        let mut teams: BTreeMap<String, TeamTally> = BTreeMap::new();

        // 1. 产能
        for block in capacity_blocks {
            if excluded_teams.contains(&block.team) {
                continue;
            }
            let entry = teams.entry(block.team.clone()).or_default();
            if entry.display_name.is_empty() {
                entry.display_name = block.display_name.clone();
            }
            entry.value_stream = Some(block.value_stream.clone());
            entry.has_capacity_block = true;

            for role in &block.roles {
                entry
                    .tally
                    .add_capacity(role.before_ff(), role.after_ff(), &role.by_iteration);
                entry
                    .roles
                    .entry(role.role.clone())
                    .or_default()
                    .add_capacity(role.before_ff(), role.after_ff(), &role.by_iteration);
            }
        }

        // 2. 使用（used / planned / actual 仅 Features 类；分类点数覆盖全部 Story / Bug）
        let mut skipped_non_features = 0usize;
        for issue in issues {
            let display = issue.team_or_unassigned();
            let team_key = self.normalizer.canonical(display);
            if excluded_teams.contains(&team_key) {
                continue;
            }

            let entry = teams.entry(team_key).or_default();
            if entry.display_name.is_empty() {
                entry.display_name = display.to_string();
            }

            let category = self.classifier.classify(&issue.allocation);
            if issue.issue_type.is_point_estimated() {
                let role = self.role_detector.role_or_unassigned(issue);
                entry.tally.add_category(category, issue.story_points);
                entry
                    .roles
                    .entry(role)
                    .or_default()
                    .add_category(category, issue.story_points);
            }

            if category != AllocationCategory::Features {
                skipped_non_features += 1;
                continue;
            }
            if !(issue.issue_type.is_point_estimated() || issue.issue_type == IssueType::Epic) {
                continue;
            }

            entry.tally.add_issue(issue);
            entry
                .roles
                .entry(self.role_detector.role_or_unassigned(issue))
                .or_default()
                .add_issue(issue);
        }

        // 3. 输出
        let team_reports: BTreeMap<String, TeamReport> = teams
            .into_iter()
            .map(|(team, t)| {
                let roles = t
                    .roles
                    .iter()
                    .map(|(role, tally)| {
                        (
                            role.clone(),
                            RoleReport {
                                role: role.clone(),
                                windows: tally.windows(),
                                iterations: tally.iterations(),
                                by_category: tally.categories(),
                            },
                        )
                    })
                    .collect();
                let report = TeamReport {
                    team: team.clone(),
                    display_name: t.display_name,
                    value_stream: t.value_stream,
                    has_capacity_block: t.has_capacity_block,
                    windows: t.tally.windows(),
                    iterations: t.tally.iterations(),
                    by_category: t.tally.categories(),
                    roles,
                };
                (team, report)
            })
            .collect();

        let total = self.special_team_rollup(&team_reports);

        let over: Vec<&str> = team_reports
            .values()
            .filter(|t| t.window(CapacityWindow::EntirePi).over_capacity)
            .map(|t| t.team.as_str())
            .collect();
        if !over.is_empty() {
            tracing::info!(teams = ?over, "存在超产能团队（Entire PI）");
        }
        tracing::debug!(
            teams = team_reports.len(),
            skipped_non_features,
            "汇总完成"
        );

        UtilizationReport {
            context: String::new(),
            excluded_teams: excluded_teams.clone(),
            teams: team_reports,
            total,
        }
    }

    /// TOTAL 行：其余已展示团队的小计 + 特殊团队行
    ///
    /// 基于已展示的团队行重新累加，而不是回到工作项重新计算。
    /// 特殊团队未配置或未展示时，TOTAL 等于小计。
    pub fn special_team_rollup(&self, teams: &BTreeMap<String, TeamReport>) -> TotalRow {
        let special_key = self.special_team.as_deref();

        let mut subtotal = WindowTable::new();
        for window in CapacityWindow::ALL {
            let sum = teams
                .values()
                .filter(|t| Some(t.team.as_str()) != special_key)
                .fold(WindowMetrics::default(), |acc, t| acc.plus(&t.window(window)));
            subtotal.insert(window, sum);
        }

        let special = special_key
            .and_then(|key| teams.get(key))
            .map(|t| t.windows.clone());

        let total = CapacityWindow::ALL
            .iter()
            .map(|w| {
                let base = subtotal.get(w).copied().unwrap_or_default();
                let row = special
                    .as_ref()
                    .and_then(|s| s.get(w).copied())
                    .unwrap_or_default();
                (*w, base.plus(&row))
            })
            .collect();

        TotalRow {
            special_team: self.special_team.clone(),
            subtotal,
            special,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::domain::capacity::RoleCapacity;

    fn aggregator(special: Option<&str>) -> Aggregator {
        let config = EngineConfig::default();
        Aggregator::new(
            IdentifierNormalizer::from_config(&config),
            AllocationClassifier::default(),
            RoleDetector::from_config(&config).unwrap(),
            special,
        )
    }

    fn block(team: &str, roles: &[(&str, i64, i64)]) -> TeamCapacityBlock {
        TeamCapacityBlock {
            team: team.to_uppercase(),
            display_name: team.to_string(),
            value_stream: "MMPM".to_string(),
            roles: roles
                .iter()
                .map(|(name, before, after)| {
                    let mut r = RoleCapacity::new(*name);
                    r.add_before_ff(*before);
                    r.add_after_ff(*after);
                    r
                })
                .collect(),
            anchor_row: 1,
            anchor_col: 0,
        }
    }

    fn story(team: &str, points: i64, labels: &[&str], allocation: &str) -> Issue {
        Issue {
            scrum_team: team.to_string(),
            issue_type: IssueType::Story,
            story_points: points,
            labels: labels.iter().map(|s| s.to_string()).collect(),
            allocation: allocation.to_string(),
            ..Default::default()
        }
    }

    fn epic(team: &str, feature_points: i64, estimate: i64, allocation: &str) -> Issue {
        Issue {
            scrum_team: team.to_string(),
            issue_type: IssueType::Epic,
            feature_points,
            story_point_estimate: estimate,
            allocation: allocation.to_string(),
            labels: vec!["BE".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_windows_and_remaining() {
        let blocks = vec![block("Borg", &[("BE", 30, 10)])];
        let issues = vec![story("Borg", 45, &["BE"], "Feature")];
        let report = aggregator(None).aggregate(&blocks, &issues, &BTreeSet::new());

        let borg = report.team("BORG").unwrap();
        let pi = borg.window(CapacityWindow::EntirePi);
        assert_eq!(pi.capacity, 40);
        assert_eq!(pi.used, 45);
        assert_eq!(pi.remaining, -5);
        assert!(pi.over_capacity);

        let cf = borg.window(CapacityWindow::CodeFreeze);
        assert_eq!(cf.capacity, 30);
        assert_eq!(cf.remaining, -15);
        assert_eq!(report.over_capacity_teams(CapacityWindow::EntirePi), vec!["BORG"]);
    }

    #[test]
    fn test_sum_of_rounded_parts() {
        // 3.2 与 2.1 在导入时已分别取整为 4 和 3
        let issues = vec![
            story("Borg", crate::importer::ceil_points("3.2"), &[], ""),
            story("Borg", crate::importer::ceil_points("2.1"), &[], ""),
        ];
        let report = aggregator(None).aggregate(&[], &issues, &BTreeSet::new());
        assert_eq!(report.team("BORG").unwrap().window(CapacityWindow::EntirePi).used, 7);
    }

    #[test]
    fn test_only_features_allocation_counts() {
        let issues = vec![
            story("Borg", 5, &["BE"], "Feature"),
            story("Borg", 8, &["BE"], "KLO"),
            story("Borg", 3, &["BE"], "Quality"),
            Issue {
                issue_type: IssueType::Bug,
                ..story("Borg", 2, &["BE"], "")
            },
        ];
        let report = aggregator(None).aggregate(&[], &issues, &BTreeSet::new());
        let borg = report.team("BORG").unwrap();
        assert_eq!(borg.window(CapacityWindow::EntirePi).used, 7);
        assert!(!borg.has_capacity_block);
    }

    #[test]
    fn test_points_by_category_per_team_and_role() {
        let blocks = vec![block("Borg", &[("BE", 40, 0)])];
        let issues = vec![
            story("Borg", 5, &["BE"], "Feature"),
            story("Borg", 7, &["BE"], "Platform"),
            story("Borg", 13, &["BE"], "KLO"),
            story("Borg", 8, &["QA"], "QA"),
            epic("Borg", 4, 9, "Tech debt"), // Epic 不计入分类点数
        ];
        let report = aggregator(None).aggregate(&blocks, &issues, &BTreeSet::new());
        let borg = report.team("BORG").unwrap();

        assert_eq!(borg.by_category.len(), AllocationCategory::ALL.len());
        assert_eq!(borg.category(AllocationCategory::Features), 5);
        assert_eq!(borg.category(AllocationCategory::TechPlatform), 7);
        assert_eq!(borg.category(AllocationCategory::Klo), 13);
        assert_eq!(borg.category(AllocationCategory::Quality), 8);
        // used 仍只含 Features
        assert_eq!(borg.window(CapacityWindow::EntirePi).used, 5);
        assert_eq!(borg.window(CapacityWindow::EntirePi).planned_load, 0);

        let be = borg.role("BE").unwrap();
        assert_eq!(be.category(AllocationCategory::Features), 5);
        assert_eq!(be.category(AllocationCategory::TechPlatform), 7);
        assert_eq!(be.category(AllocationCategory::Klo), 13);
        assert_eq!(be.category(AllocationCategory::Quality), 0);

        // 只有非 Features 点数的角色也会出现，used 为 0
        let qa = borg.role("QA").unwrap();
        assert_eq!(qa.category(AllocationCategory::Quality), 8);
        assert_eq!(qa.category(AllocationCategory::Features), 0);
        assert_eq!(qa.window(CapacityWindow::EntirePi).used, 0);
    }

    #[test]
    fn test_epic_planned_and_actual_load() {
        let blocks = vec![block("Borg", &[("BE", 50, 30)])];
        let issues = vec![
            epic("Borg", 3, 25, "Product"),
            epic("Borg", 2, 10, "Tech debt"), // 非 Features，不计
        ];
        let report = aggregator(None).aggregate(&blocks, &issues, &BTreeSet::new());
        let be = report.team("BORG").unwrap().role("BE").unwrap();
        let pi = be.window(CapacityWindow::EntirePi);

        assert_eq!(pi.planned_load, 30);
        assert_eq!(pi.planned_remaining, 50);
        assert_eq!(pi.actual_load, 25);
        assert_eq!(pi.actual_remaining, 55);
        assert_eq!(pi.used, 0);
    }

    #[test]
    fn test_roles_and_unassigned_bucket() {
        let blocks = vec![block("Borg", &[("BE", 20, 0), ("QA", 10, 0)])];
        let issues = vec![
            story("Borg", 5, &["BE"], ""),
            story("Borg", 4, &["AQA"], ""),
            story("Borg", 2, &[], ""),
        ];
        let report = aggregator(None).aggregate(&blocks, &issues, &BTreeSet::new());
        let borg = report.team("BORG").unwrap();

        assert_eq!(borg.role("BE").unwrap().window(CapacityWindow::CodeFreeze).remaining, 15);
        assert_eq!(borg.role("QA").unwrap().window(CapacityWindow::CodeFreeze).remaining, 6);
        let unassigned = borg.role("Unassigned").unwrap().window(CapacityWindow::CodeFreeze);
        assert_eq!(unassigned.capacity, 0);
        assert_eq!(unassigned.used, 2);
        // 团队层面是全部角色之和
        assert_eq!(borg.window(CapacityWindow::CodeFreeze).used, 11);
    }

    #[test]
    fn test_excluded_teams_are_omitted() {
        let blocks = vec![block("Borg", &[("BE", 20, 0)]), block("Hive", &[("BE", 10, 0)])];
        let issues = vec![story("Borg", 5, &[], ""), story("Hive", 1, &[], "")];
        let excluded = BTreeSet::from(["BORG".to_string()]);
        let report = aggregator(None).aggregate(&blocks, &issues, &excluded);

        assert!(report.team("BORG").is_none());
        assert!(report.team("HIVE").is_some());
        assert_eq!(report.excluded_teams, excluded);
        assert_eq!(report.total.total(CapacityWindow::CodeFreeze).capacity, 10);
    }

    #[test]
    fn test_iteration_breakdown() {
        let mut b = block("Borg", &[("BE", 10, 0)]);
        b.roles[0].add_iterations(&[2, 2, 2, 2, 2, 0]);
        let issues = vec![Issue {
            sprint_name: Some("PI 26.1 Sprint 2".to_string()),
            ..story("Borg", 3, &["BE"], "")
        }];
        let report = aggregator(None).aggregate(&[b], &issues, &BTreeSet::new());
        let iterations = &report.team("BORG").unwrap().iterations;

        assert_eq!(iterations.len(), ITERATION_COUNT);
        assert_eq!(iterations[1].iteration, 2);
        assert_eq!(iterations[1].capacity, 2);
        assert_eq!(iterations[1].used, 3);
        assert_eq!(iterations[0].used, 0);
    }

    #[test]
    fn test_special_team_rollup() {
        let blocks = vec![
            block("Borg", &[("BE", 20, 5)]),
            block("Hive", &[("BE", 10, 5)]),
            block("Ops", &[("BE", 7, 1)]),
        ];
        let issues = vec![story("Ops", 9, &[], "")];
        let report = aggregator(Some("ops")).aggregate(&blocks, &issues, &BTreeSet::new());
        let total = &report.total;

        assert_eq!(total.special_team.as_deref(), Some("OPS"));
        assert_eq!(total.subtotal(CapacityWindow::EntirePi).capacity, 40);
        let special = total.special.as_ref().unwrap();
        assert_eq!(special[&CapacityWindow::EntirePi].capacity, 8);
        assert_eq!(total.total(CapacityWindow::EntirePi).capacity, 48);
        assert_eq!(total.total(CapacityWindow::EntirePi).used, 9);
        assert_eq!(total.total(CapacityWindow::EntirePi).remaining, 39);
    }

    #[test]
    fn test_rollup_without_special_team_equals_subtotal() {
        let blocks = vec![block("Borg", &[("BE", 20, 5)])];
        let report = aggregator(None).aggregate(&blocks, &[], &BTreeSet::new());
        assert_eq!(report.total.special, None);
        assert_eq!(report.total.total, report.total.subtotal);
    }
}

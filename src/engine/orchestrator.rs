// ==========================================
// PI 产能对账引擎 - 引擎编排器
// ==========================================
// 用途: 协调六个组件的执行顺序
// 流程: 产能网格 → Locator → 团队产能块
//       工作项 + 上下文 → ExclusionResolver → 排除团队
//       产能块 + 工作项 + 排除团队 → Aggregator → UtilizationReport
// 红线: 同步、无内部共享可变状态；可按上下文拆分多次调用
// ==========================================

use crate::config::EngineConfig;
use crate::domain::capacity::{CapacityGrid, TeamCapacityBlock};
use crate::domain::issue::Issue;
use crate::domain::report::{ExclusionDecision, UtilizationReport};
use crate::engine::aggregator::Aggregator;
use crate::engine::allocation::AllocationClassifier;
use crate::engine::capacity_locator::CapacityBlockLocator;
use crate::engine::error::EngineResult;
use crate::engine::exclusion::ExclusionResolver;
use crate::engine::normalizer::IdentifierNormalizer;
use crate::engine::role_detector::RoleDetector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

// ==========================================
// ContextRun - 单上下文对账结果
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRun {
    pub run_id: String,
    pub context: String,
    pub generated_at: DateTime<Utc>,
    pub report: UtilizationReport,
    pub decisions: Vec<ExclusionDecision>,
}

impl ContextRun {
    /// 被排除的团队决策
    pub fn excluded(&self) -> impl Iterator<Item = &ExclusionDecision> {
        self.decisions.iter().filter(|d| d.excluded)
    }
}

// ==========================================
// ReconcileEngine - 引擎编排器
// ==========================================

#[derive(Debug, Clone)]
pub struct ReconcileEngine {
    normalizer: IdentifierNormalizer,
    locator: CapacityBlockLocator,
    exclusion: ExclusionResolver,
    aggregator: Aggregator,
}

impl ReconcileEngine {
    /// 创建引擎实例
    ///
    /// # 参数
    /// - config: 引擎配置
    ///
    /// # 返回
    /// - Err: 布局非法 / 角色标题模式无法编译
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.capacity_layout.validate()?;

        let normalizer = IdentifierNormalizer::from_config(&config);
        let role_detector = RoleDetector::from_config(&config)?;
        let classifier = AllocationClassifier::new(&config.allocation_rules);

        let locator =
            CapacityBlockLocator::new(&config, normalizer.clone(), role_detector.table().clone());
        let exclusion = ExclusionResolver::new(normalizer.clone());
        let aggregator = Aggregator::new(
            normalizer.clone(),
            classifier,
            role_detector,
            config.special_team.as_deref(),
        );

        debug!(
            value_streams = config.value_streams.len(),
            special_team = ?config.special_team,
            "对账引擎初始化完成"
        );

        Ok(Self {
            normalizer,
            locator,
            exclusion,
            aggregator,
        })
    }

    pub fn locator(&self) -> &CapacityBlockLocator {
        &self.locator
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn normalizer(&self) -> &IdentifierNormalizer {
        &self.normalizer
    }

    /// 一次定位产能块，供多个上下文复用
    pub fn locate(&self, grid: &CapacityGrid) -> Vec<TeamCapacityBlock> {
        self.locator.locate(grid)
    }

    /// 单上下文对账
    ///
    /// # 参数
    /// - blocks: locate() 输出（全部价值流）
    /// - issues: 当前上下文的工作项
    /// - context: 报告上下文（价值流名）
    ///
    /// # 说明
    /// - 只使用价值流与上下文规范化相等的产能块
    /// - 工作项为空时按 MissingSource 降级：报告只含产能
    #[instrument(skip(self, blocks, issues), fields(blocks = blocks.len(), issues = issues.len()))]
    pub fn run_context(
        &self,
        blocks: &[TeamCapacityBlock],
        issues: &[Issue],
        context: &str,
    ) -> ContextRun {
        let context_key = self.normalizer.canonical(context);

        if blocks.is_empty() {
            tracing::warn!(context = %context_key, "产能块为空，仅按工作项汇总");
        }
        if issues.is_empty() {
            tracing::warn!(context = %context_key, "工作项为空，仅按产能汇总");
        }

        let context_blocks: Vec<TeamCapacityBlock> = blocks
            .iter()
            .filter(|b| self.normalizer.same(&b.value_stream, &context_key))
            .cloned()
            .collect();

        // 1. 排除决策
        let decisions = self.exclusion.resolve_decisions(issues, &context_key);
        let excluded = decisions
            .iter()
            .filter(|d| d.excluded)
            .map(|d| d.team.clone())
            .collect();

        // 2. 汇总
        let mut report = self.aggregator.aggregate(&context_blocks, issues, &excluded);
        report.context = context_key.clone();

        let run = ContextRun {
            run_id: Uuid::new_v4().to_string(),
            context: context_key,
            generated_at: Utc::now(),
            report,
            decisions,
        };

        info!(
            run_id = %run.run_id,
            context = %run.context,
            teams = run.report.teams.len(),
            excluded = run.report.excluded_teams.len(),
            "上下文对账完成"
        );
        run
    }

    /// 从混合工作项集合中取出属于上下文的部分
    ///
    /// 按 valueStream 规范化匹配；全部工作项都没有 valueStream 时原样返回
    pub fn issues_for_context(&self, issues: &[Issue], context: &str) -> Vec<Issue> {
        if issues.iter().all(|i| i.value_stream.trim().is_empty()) {
            return issues.to_vec();
        }
        let context_key = self.normalizer.canonical(context);
        issues
            .iter()
            .filter(|i| self.normalizer.canonical(&i.value_stream) == context_key)
            .cloned()
            .collect()
    }

    /// 批量对账：一次定位，逐上下文汇总
    #[instrument(skip(self, grid, contexts), fields(rows = grid.row_count(), contexts = contexts.len()))]
    pub fn run_contexts(&self, grid: &CapacityGrid, contexts: &[(String, Vec<Issue>)]) -> Vec<ContextRun> {
        let blocks = self.locate(grid);
        contexts
            .iter()
            .map(|(context, issues)| self.run_context(&blocks, issues, context))
            .collect()
    }
}

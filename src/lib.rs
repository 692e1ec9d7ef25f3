// ==========================================
// PI 产能对账引擎 - 核心库
// ==========================================
// 系统定位: 计划产能 × 实际工作项 → 团队/角色利用率报告
// 输入: 产能网格、工作项列表、报告上下文（价值流）
// 输出: UtilizationReport + 排除决策
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 对账规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 引擎配置
pub mod config;

// 报告缓存（引擎外部）
pub mod cache;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AllocationCategory, CapacityWindow, IssueType, UNASSIGNED};

// 领域实体
pub use domain::{
    CapacityGrid, ExclusionDecision, Issue, RoleCapacity, TeamCapacityBlock, TeamReport,
    UtilizationReport, WindowMetrics,
};

// 引擎
pub use engine::{
    Aggregator, AllocationClassifier, CapacityBlockLocator, ContextRun, EngineError,
    ExclusionResolver, IdentifierNormalizer, ReconcileEngine, RoleDetector,
};

// 配置
pub use config::{CapacityBlockLayout, ConfigManager, EngineConfig};

// 缓存
pub use cache::ReportCache;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "pi-capacity-recon";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_engine_builds() {
        assert!(ReconcileEngine::new(EngineConfig::default()).is_ok());
    }
}

// ==========================================
// PI 产能对账引擎 - 引擎层
// ==========================================
// 组件（依赖顺序，叶子在前）:
// 1. normalizer       - 标识符规范化
// 2. capacity_locator - 产能块定位
// 3. allocation       - 分配类别分类
// 4. role_detector    - 角色识别
// 5. exclusion        - 跨上下文团队排除
// 6. aggregator       - 产能/使用汇总
// orchestrator 负责编排
// ==========================================
// 红线: 引擎不做 I/O，所有决策输出 reason
// ==========================================

pub mod aggregator;
pub mod allocation;
pub mod capacity_locator;
pub mod error;
pub mod exclusion;
pub mod normalizer;
pub mod orchestrator;
pub mod role_detector;

// 重导出核心引擎
pub use aggregator::Aggregator;
pub use allocation::AllocationClassifier;
pub use capacity_locator::{CapacityBlockLocator, LocatorStats, ValueStreamRegion};
pub use error::{EngineError, EngineResult};
pub use exclusion::ExclusionResolver;
pub use normalizer::{normalize, IdentifierNormalizer};
pub use orchestrator::{ContextRun, ReconcileEngine};
pub use role_detector::{RoleDetector, RoleTable};

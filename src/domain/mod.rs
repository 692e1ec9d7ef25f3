// ==========================================
// PI 产能对账引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod capacity;
pub mod issue;
pub mod report;
pub mod types;

// 重导出核心类型
pub use capacity::{CapacityGrid, RoleCapacity, TeamCapacityBlock, ITERATION_COUNT};
pub use issue::Issue;
pub use report::{
    ExclusionDecision, IterationMetrics, RoleReport, TeamReport, TotalRow, UtilizationReport,
    WindowMetrics, WindowTable,
};
pub use types::{AllocationCategory, CapacityWindow, IssueType, UNASSIGNED};

// ==========================================
// PI 产能对账引擎 - 配置层
// ==========================================
// 职责: 引擎配置定义与加载（JSON 文件 / config_kv 表）
// ==========================================

pub mod capacity_layout;
pub mod config_manager;
pub mod engine_config;

// 重导出核心配置
pub use capacity_layout::{CapacityBlockLayout, RowWindow};
pub use config_manager::{config_keys, ensure_schema, ConfigManager};
pub use engine_config::{AllocationRule, EngineConfig, ValueStreamConfig};

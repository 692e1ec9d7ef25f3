// ==========================================
// PI 产能对账引擎 - 引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 业务数据缺失/格式错误一律降级处理，不走错误通道；
//       这里只承载调用方契约违反（配置/参数非法）
// ==========================================

use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("产能块布局非法: {0}")]
    InvalidLayout(String),

    #[error("角色标题模式无法编译 (pattern: {pattern}): {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("角色标题模式缺少捕获组 (pattern: {0})")]
    PatternWithoutCapture(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

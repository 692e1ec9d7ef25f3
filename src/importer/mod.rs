// ==========================================
// PI 产能对账引擎 - 导入层
// ==========================================
// 职责: 外部数据导入,生成引擎输入
// - 产能表 → CapacityGrid
// - 工作项文件 → Issue 列表
// 支持: Excel, CSV, JSON
// ==========================================

pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;

// 重导出核心类型
pub use data_cleaner::{ceil_points, parse_lenient_number, DataCleaner};
pub use error::{ImportError, ImportResult};
pub use field_mapper::IssueFieldMapper;
pub use file_parser::{GridParser, IssueFileParser};

use crate::domain::issue::Issue;
use std::path::Path;

/// 读取工作项文件并映射为 Issue 列表
pub fn load_issues<P: AsRef<Path>>(path: P) -> ImportResult<Vec<Issue>> {
    let records = IssueFileParser.parse_to_raw_records(path.as_ref())?;
    let issues = IssueFieldMapper::new().map_all(&records);
    tracing::info!(path = %path.as_ref().display(), count = issues.len(), "工作项导入完成");
    Ok(issues)
}

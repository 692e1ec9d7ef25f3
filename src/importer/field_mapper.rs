// ==========================================
// PI 产能对账引擎 - 工作项字段映射器
// ==========================================
// 职责: 行记录 → Issue
// - 列名别名（大小写 / 空格 / 分隔符不敏感）
// - 点数宽松解析并立即向上取整
// - 空团队 → Unassigned；epic 取 parent 优先，其次 epic link
// 红线: 字段缺失按默认值处理，不报错
// ==========================================

use crate::domain::issue::Issue;
use crate::domain::types::{IssueType, UNASSIGNED};
use crate::importer::data_cleaner::{ceil_points, DataCleaner};
use std::collections::HashMap;

/// 列名归一：小写并去除非字母数字
fn header_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

// 标准字段 → 可接受列名（归一后）
const KEY: &[&str] = &["issuekey", "key"];
const ISSUE_TYPE: &[&str] = &["issuetype", "type"];
const SUMMARY: &[&str] = &["summary", "title"];
const SCRUM_TEAM: &[&str] = &["scrumteam", "team"];
const VALUE_STREAM: &[&str] = &["valuestream"];
const ALLOCATION: &[&str] = &["allocation", "allocationtype"];
const STORY_POINTS: &[&str] = &["storypoints"];
const STORY_POINT_ESTIMATE: &[&str] = &["storypointestimate"];
const FEATURE_POINTS: &[&str] = &["featurepoints"];
const SPRINT: &[&str] = &["sprintname", "sprint"];
const LABELS: &[&str] = &["labels", "label"];
const DEPENDS_ON_VALUE_STREAM: &[&str] = &["dependsonvaluestream"];
const DEPENDS_ON_TEAM: &[&str] = &["dependsonteam"];
const PARENT: &[&str] = &["parentkey", "parent"];
const EPIC_LINK: &[&str] = &["epiclink"];

pub struct IssueFieldMapper {
    cleaner: DataCleaner,
}

impl Default for IssueFieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueFieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 批量映射
    pub fn map_all(&self, records: &[HashMap<String, String>]) -> Vec<Issue> {
        let issues: Vec<Issue> = records.iter().map(|r| self.map_to_issue(r)).collect();

        let missing_key = issues.iter().filter(|i| i.key.is_empty()).count();
        if missing_key > 0 {
            tracing::debug!(missing_key, total = issues.len(), "部分工作项缺少 key");
        }
        issues
    }

    /// 单行映射（全函数）
    pub fn map_to_issue(&self, row: &HashMap<String, String>) -> Issue {
        let row: HashMap<String, &str> = row
            .iter()
            .map(|(k, v)| (header_key(k), v.as_str()))
            .collect();

        let team = self.get_string(&row, SCRUM_TEAM);
        let parent = self.get_string(&row, PARENT);
        let epic_link = self.get_string(&row, EPIC_LINK);

        Issue {
            key: self.get_string(&row, KEY).unwrap_or_default(),
            issue_type: IssueType::parse(&self.get_string(&row, ISSUE_TYPE).unwrap_or_default()),
            summary: self.get_string(&row, SUMMARY).unwrap_or_default(),

            scrum_team: team.unwrap_or_else(|| UNASSIGNED.to_string()),
            value_stream: self.get_string(&row, VALUE_STREAM).unwrap_or_default(),
            allocation: self.get_string(&row, ALLOCATION).unwrap_or_default(),

            story_points: self.get_points(&row, STORY_POINTS),
            story_point_estimate: self.get_points(&row, STORY_POINT_ESTIMATE),
            feature_points: self.get_points(&row, FEATURE_POINTS),

            sprint_name: self.get_string(&row, SPRINT),
            labels: self
                .get_string(&row, LABELS)
                .map(|v| self.cleaner.split_labels(&v))
                .unwrap_or_default(),

            depends_on_value_stream: self.get_string(&row, DEPENDS_ON_VALUE_STREAM),
            depends_on_team: self.get_string(&row, DEPENDS_ON_TEAM),

            epic_key: parent.or(epic_link),
        }
    }

    /// 按别名顺序取第一个非空值
    fn get_string(&self, row: &HashMap<String, &str>, aliases: &[&str]) -> Option<String> {
        aliases.iter().find_map(|alias| {
            self.cleaner
                .normalize_null(row.get(*alias).map(|v| v.to_string()))
        })
    }

    fn get_points(&self, row: &HashMap<String, &str>, aliases: &[&str]) -> i64 {
        self.get_string(row, aliases)
            .map(|v| ceil_points(&v))
            .unwrap_or(0)
    }
}

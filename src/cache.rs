// ==========================================
// PI 产能对账引擎 - 报告缓存
// ==========================================
// 职责: 按 (上下文, 工作项指纹) 记忆 ContextRun
// 红线: 引擎本身从不读取缓存；过期条目不返回
//       键使用解析别名后的规范上下文，与 ContextRun.context 一致
// ==========================================

use crate::config::EngineConfig;
use crate::domain::issue::Issue;
use crate::engine::normalizer::IdentifierNormalizer;
use crate::engine::orchestrator::ContextRun;
use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// 默认有效期（分钟）
pub const DEFAULT_TTL_MINUTES: i64 = 10;

/// 工作项集合指纹（序列化后哈希）
pub fn issue_fingerprint(issues: &[Issue]) -> u64 {
    let mut hasher = DefaultHasher::new();
    match serde_json::to_string(issues) {
        Ok(json) => json.hash(&mut hasher),
        Err(e) => {
            // Issue 只含字符串/整数字段，理论上不会失败
            tracing::warn!(error = %e, "工作项序列化失败，退回按 key 计算指纹");
            for issue in issues {
                issue.key.hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    run: ContextRun,
}

// ==========================================
// ReportCache
// ==========================================
#[derive(Debug, Clone)]
pub struct ReportCache {
    ttl: Duration,
    normalizer: IdentifierNormalizer,
    entries: HashMap<(String, u64), CacheEntry>,
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_TTL_MINUTES))
    }
}

impl ReportCache {
    /// 使用默认配置的别名表
    pub fn new(ttl: Duration) -> Self {
        Self::with_normalizer(ttl, IdentifierNormalizer::from_config(&EngineConfig::default()))
    }

    /// 与引擎共用同一份配置的别名表
    pub fn for_config(ttl: Duration, config: &EngineConfig) -> Self {
        Self::with_normalizer(ttl, IdentifierNormalizer::from_config(config))
    }

    pub fn with_normalizer(ttl: Duration, normalizer: IdentifierNormalizer) -> Self {
        Self {
            ttl,
            normalizer,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, context: &str, issues: &[Issue]) -> Option<&ContextRun> {
        self.get_at(context, issues, Utc::now())
    }

    /// 按指定时刻查询（过期视为未命中）
    pub fn get_at(&self, context: &str, issues: &[Issue], now: DateTime<Utc>) -> Option<&ContextRun> {
        let key = (self.normalizer.canonical(context), issue_fingerprint(issues));
        match self.entries.get(&key) {
            Some(entry) if now - entry.stored_at < self.ttl => Some(&entry.run),
            Some(_) => {
                tracing::debug!(context = %key.0, "缓存已过期");
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, issues: &[Issue], run: ContextRun) {
        self.insert_at(issues, run, Utc::now())
    }

    pub fn insert_at(&mut self, issues: &[Issue], run: ContextRun, now: DateTime<Utc>) {
        let key = (self.normalizer.canonical(&run.context), issue_fingerprint(issues));
        self.entries.insert(key, CacheEntry { stored_at: now, run });
    }

    /// 清除过期条目，返回清除数量
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| now - e.stored_at < ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            tracing::debug!(purged, remaining = self.entries.len(), "已清除过期缓存");
        }
        purged
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

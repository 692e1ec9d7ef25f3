// ==========================================
// PI 产能对账引擎 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表加载引擎配置覆写
// 存储: config_kv 表 (scope_id + key → JSON value)
// 红线: 配置格式错误只告警并回落默认值，不阻断对账
// ==========================================

use crate::config::capacity_layout::CapacityBlockLayout;
use crate::config::engine_config::{AllocationRule, EngineConfig, ValueStreamConfig};
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 对账报告附带配置快照，便于复盘
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 加载引擎配置
    ///
    /// 以 `EngineConfig::default()` 为基线，逐项应用 config_kv 覆写。
    pub fn load_engine_config(&self) -> Result<EngineConfig, Box<dyn Error>> {
        let mut config = EngineConfig::default();

        if let Some(v) = self.get_json::<Vec<ValueStreamConfig>>(config_keys::VALUE_STREAMS)? {
            config.value_streams = v;
        }
        if let Some(v) = self.get_json::<BTreeMap<String, String>>(config_keys::IDENTIFIER_ALIASES)? {
            config.identifier_aliases = v;
        }
        if let Some(v) = self.get_json::<Vec<AllocationRule>>(config_keys::ALLOCATION_RULES)? {
            config.allocation_rules = v;
        }
        if let Some(v) = self.get_json::<BTreeMap<String, String>>(config_keys::ROLE_ALIASES)? {
            config.role_aliases = v;
        }
        if let Some(v) = self.get_json::<Vec<String>>(config_keys::ROLE_TITLE_PATTERNS)? {
            config.role_title_patterns = v;
        }
        if let Some(v) = self.get_json::<CapacityBlockLayout>(config_keys::CAPACITY_LAYOUT)? {
            config.capacity_layout = v;
        }
        if let Some(v) = self.get_config_value(config_keys::SPECIAL_TEAM)? {
            let trimmed = v.trim().trim_matches('"').trim();
            config.special_team = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }

        tracing::debug!(
            value_streams = config.value_streams.len(),
            special_team = ?config.special_team,
            "引擎配置加载完成"
        );
        Ok(config)
    }

    /// 读取 JSON 配置项，格式错误时告警并返回 None
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Box<dyn Error>> {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(None),
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    error = %e,
                    "配置格式错误，使用默认配置"
                );
                Ok(None)
            }
        }
    }
}

/// 建立 config_kv 表（幂等）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const VALUE_STREAMS: &str = "value_streams";
    pub const IDENTIFIER_ALIASES: &str = "identifier_aliases";
    pub const ALLOCATION_RULES: &str = "allocation_rules";
    pub const ROLE_ALIASES: &str = "role_aliases";
    pub const ROLE_TITLE_PATTERNS: &str = "role_title_patterns";
    pub const CAPACITY_LAYOUT: &str = "capacity_layout";
    pub const SPECIAL_TEAM: &str = "special_team";
}

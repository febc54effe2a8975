//! 应用配置模块
//!
//! 分为两部分：
//! - 服务器配置（监听地址、端口），启动时从环境变量加载一次
//! - 函数配置（Supabase、OpenAI、SerpAPI 等密钥），通过 [`ConfigProvider`]
//!   在每次请求时重新读取，不做任何缓存

use anyhow::{Context, Result};
#[cfg(test)]
use std::collections::HashMap;

/// Supabase 项目地址
pub const SUPABASE_URL: &str = "SUPABASE_URL";
/// Supabase 匿名（受限）密钥
pub const SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
/// Supabase service role（高权限）密钥
pub const SUPABASE_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
/// 为 "true"/"1" 时 send-message 使用 service role 写入
pub const MESSAGES_USE_SERVICE_ROLE: &str = "MESSAGES_USE_SERVICE_ROLE";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_API_BASE: &str = "OPENAI_API_BASE";
pub const OPENAI_VISION_MODEL: &str = "OPENAI_VISION_MODEL";
pub const SERPAPI_KEY: &str = "SERPAPI_KEY";
pub const SERPAPI_BASE_URL: &str = "SERPAPI_BASE_URL";
/// get-config 可查询的键白名单（逗号分隔），未设置时不限制
pub const CONFIG_ALLOWED_KEYS: &str = "CONFIG_ALLOWED_KEYS";

/// 服务器配置
#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器监听地址（如 "0.0.0.0" 或 "127.0.0.1"）
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// # 环境变量
    ///
    /// - `ARMORY_HOST`: 服务器监听地址（默认: "0.0.0.0"）
    /// - `ARMORY_PORT`: 服务器监听端口（默认: 8080）
    ///
    /// # 错误
    ///
    /// - 如果 `ARMORY_PORT` 不是有效的端口号
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("ARMORY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("ARMORY_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("ARMORY_PORT must be a valid port number")?;

        Ok(Self { host, port })
    }
}

/// 只读配置源
///
/// 每次调用都会重新查询，实现方不得缓存结果。
pub trait ConfigProvider: Send + Sync {
    /// 按键名读取配置值，不存在时返回 `None`
    fn get(&self, key: &str) -> Option<String>;

    /// 读取非空配置值，空字符串视为未设置
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// 读取布尔开关（"1" 或 "true"，忽略大小写）
    fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// 基于进程环境变量的配置源
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigProvider for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// 固定键值的配置源，用于测试
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    values: HashMap<String, String>,
}

#[cfg(test)]
impl StaticConfig {
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
impl ConfigProvider for StaticConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

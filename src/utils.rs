use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::{ConfigProvider, EnvConfig};

/// 是否禁用 TLS 验证（用于调试 mitmproxy 等场景）
pub fn should_disable_tls_verify() -> bool {
    EnvConfig.flag("ARMORY_DISABLE_TLS_VERIFY")
}

/// 获取共享的 HTTP 客户端（Supabase、OpenAI、SerpAPI 请求共用底层连接）
static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

pub fn get_shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        let mut builder = Client::builder().timeout(Duration::from_secs(30));

        if should_disable_tls_verify() {
            tracing::warn!("TLS certificate verification is DISABLED - for debugging only!");
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().expect("Failed to create HTTP client")
    })
}

/// 将文本中出现的密钥替换为 `[REDACTED]`
///
/// 空密钥不做替换，避免把整段文本打散。
pub fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "[REDACTED]")
}

/// 判断 JSON 值是否为"真值"
///
/// `null`、`false`、`0`、空字符串视为假，其余（包括空数组和空对象）为真。
#[inline]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 真值转为字符串，非字符串标量（数字、布尔）按 JSON 文本表示
pub fn truthy_text(value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

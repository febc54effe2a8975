//! 配置查询处理器

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_body, present_text, ApiError};
use crate::config::{ConfigProvider, CONFIG_ALLOWED_KEYS};
use crate::gateway::state::AppState;

#[derive(Debug, Deserialize)]
struct GetConfigRequest {
    key: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ConfigValue {
    value: String,
}

/// 白名单未配置时允许任意键
fn is_allowed(config: &dyn ConfigProvider, key: &str) -> bool {
    match config.get_non_empty(CONFIG_ALLOWED_KEYS) {
        Some(allowed) => allowed.split(',').map(str::trim).any(|k| k == key),
        None => true,
    }
}

/// POST /get-config
pub async fn handle_get_config(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ConfigValue>, ApiError> {
    let request: GetConfigRequest = parse_body(&body)?;
    let key = present_text(request.key)
        .ok_or_else(|| ApiError::BadRequest("No config key provided".to_string()))?;

    let not_found = || ApiError::NotFound(format!("Config key '{key}' not found"));

    if !is_allowed(state.config(), &key) {
        tracing::warn!(key = %key, "config key outside allow-list");
        return Err(not_found());
    }

    let value = state.config().get_non_empty(&key).ok_or_else(not_found)?;
    Ok(Json(ConfigValue { value }))
}

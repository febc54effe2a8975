//! 新闻搜索处理器

use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use serde_json::Value;

use super::{parse_body, present_text, ApiError};
use crate::gateway::state::AppState;
use crate::providers::serpapi::DEFAULT_NEWS_QUERY;
use crate::providers::{NewsClient, NewsQuery, UpstreamError};

#[derive(Debug, Deserialize)]
struct GetNewsRequest {
    query: Option<Value>,
    category: Option<Value>,
}

impl From<GetNewsRequest> for NewsQuery {
    fn from(request: GetNewsRequest) -> Self {
        Self {
            // 只有缺省或 null 时使用默认查询，空字符串原样传递
            query: match request.query {
                None | Some(Value::Null) => DEFAULT_NEWS_QUERY.to_string(),
                Some(Value::String(query)) => query,
                Some(other) => other.to_string(),
            },
            category: present_text(request.category),
        }
    }
}

/// POST /get-news
pub async fn handle_get_news(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: GetNewsRequest = parse_body(&body)?;
    let query = NewsQuery::from(request);

    let news = NewsClient::from_config(state.config(), state.http()).map_err(|e| match e {
        UpstreamError::MissingKey(key) => {
            ApiError::Config(format!("{key} is not set in environment variables"))
        }
        other => other.into(),
    })?;

    let result = news.search(&query).await.map_err(|e| {
        tracing::error!("Error fetching news: {}", e);
        match e {
            UpstreamError::Status { status, body } => ApiError::Upstream {
                error: format!(
                    "SerpAPI request failed: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                ),
                details: body,
            },
            other => other.into(),
        }
    })?;

    Ok(Json(result))
}

//! SerpAPI Google News 搜索

use reqwest::{Client, Url};
use serde_json::Value;

use super::{status_error, UpstreamError};
use crate::config::{ConfigProvider, SERPAPI_BASE_URL, SERPAPI_KEY};
use crate::utils::redact;

pub const DEFAULT_SERPAPI_BASE_URL: &str = "https://serpapi.com";
pub const DEFAULT_NEWS_QUERY: &str = "firearms";

/// 新闻查询参数
///
/// 指定 `category`（topic token）时忽略 `query`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub query: String,
    pub category: Option<String>,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            query: DEFAULT_NEWS_QUERY.to_string(),
            category: None,
        }
    }
}

/// 单次请求的新闻搜索客户端
pub struct NewsClient<'a> {
    client: &'a Client,
    base_url: String,
    api_key: String,
}

impl<'a> NewsClient<'a> {
    /// 从配置源读取密钥和地址
    pub fn from_config(config: &dyn ConfigProvider, client: &'a Client) -> Result<Self, UpstreamError> {
        let api_key = config
            .get_non_empty(SERPAPI_KEY)
            .ok_or(UpstreamError::MissingKey(SERPAPI_KEY))?;

        let base_url = config
            .get_non_empty(SERPAPI_BASE_URL)
            .unwrap_or_else(|| DEFAULT_SERPAPI_BASE_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// 构建搜索 URL（包含密钥，不可直接记录日志）
    fn search_url(&self, query: &NewsQuery) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&format!("{}/search", self.base_url))
            .map_err(|e| UpstreamError::InvalidUrl(e.to_string()))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("engine", "google_news")
                .append_pair("api_key", &self.api_key);

            match query.category.as_deref() {
                Some(category) => pairs.append_pair("topic_token", category),
                None => pairs.append_pair("q", &query.query),
            };

            pairs.append_pair("gl", "us").append_pair("hl", "en");
        }

        Ok(url)
    }

    /// 执行搜索，原样返回上游 JSON
    pub async fn search(&self, query: &NewsQuery) -> Result<Value, UpstreamError> {
        let url = self.search_url(query)?;
        tracing::info!(
            url = %redact(url.as_str(), &self.api_key),
            "fetching news"
        );

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(response.json().await?)
    }
}

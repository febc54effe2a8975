//! 第三方 API Provider
//!
//! - [`openai`]: 视觉模型，识别图片中的枪支
//! - [`serpapi`]: Google News 搜索
//!
//! 两者都只使用服务端持有的密钥，从不转发调用方的凭证。

pub mod openai;
pub mod serpapi;

use reqwest::StatusCode;

pub use openai::{FirearmAnalysis, VisionClient};
pub use serpapi::{NewsClient, NewsQuery};

/// 上游调用错误
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// 服务端密钥未配置，此时不会发起任何网络请求
    #[error("{0} is not configured")]
    MissingKey(&'static str),

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),

    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 上游返回非 2xx，`body` 为原始响应体
    #[error("Upstream returned {status}")]
    Status { status: StatusCode, body: String },

    #[error("Malformed upstream response: {0}")]
    Decode(String),
}

/// 读取非 2xx 响应并转换为 [`UpstreamError::Status`]
pub(crate) async fn status_error(response: reqwest::Response) -> UpstreamError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    UpstreamError::Status { status, body }
}
